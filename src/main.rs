use colored::*;

use lagrange_cas::*;

fn section(title: &str) {
    println!("\n{}", title.bold().underline());
}

fn show(name: &str, m: &Matrix) {
    for r in 0..m.rows() {
        let cells: Vec<String> = (0..m.cols()).map(|col| m[(r, col)].to_pretty_string()).collect();
        let label = if r == 0 { name } else { "" };
        println!("{:>8}  [{}]", label.yellow(), cells.join(", "));
    }
}

/// Cart with a pendulum hanging from it, force on the cart.
#[allow(non_snake_case)]
fn cart_pole() -> Result<SymbolicModel> {
    let ttheta = Matrix::from_symbols(&symbols("p1, q1"));
    vars!(p1, q1, m0, m1, l1, g, F1);

    let ex = Matrix::column(vec![c(1), c(0)]);
    let ey = Matrix::column(vec![c(0), c(1)]);

    let s0 = ex.scale(&q1);
    let s1 = &s0 - &(&rz(&p1) * &ey).scale(&l1);

    let mut table = DerivativeTable::new();
    let thetas = ttheta.symbols()?;
    let s0d = table.time_deriv(&s0, &thetas, 1);
    let s1d = table.time_deriv(&s1, &thetas, 1);

    let t_trans = (&m0 * &(&s0d.transpose() * &s0d)[0] + &m1 * &(&s1d.transpose() * &s1d)[0]) / 2;
    let v = &m1 * &g * &s1[1];

    generate_symbolic_model(&t_trans, &v, &ttheta, vec![c(0), F1], true)
}

fn main() -> Result<()> {
    let mut model = cart_pole()?;

    section("Equations of motion");
    show("eqns", model.eqns());
    show("MM", model.mass_matrix());

    model.calc_state_eq(true)?;
    section("Explicit state equation");
    show("xx", model.xx()?);
    show("ff", model.ff()?);
    show("gg", model.gg()?);

    model.calc_coll_part_lin_state_eq(true)?;
    section("Collocated partial linearization");
    show("ff", model.ff()?);
    show("gg", model.gg()?);
    show("aa", model.aa()?);

    model.calc_lbi_nf_state_eq(true)?;
    section("Lagrange-Byrnes-Isidori normal form");
    show("zz", model.zz()?);
    show("fz", model.fz()?);
    show("gz", model.gz()?);
    show("ww_def", model.ww_def()?);

    Ok(())
}
