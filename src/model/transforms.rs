//! Explicit and partially linearized state equations and the
//! Lagrange-Byrnes-Isidori normal form.

use tracing::{debug, info, warn};

use super::{DeriveOptions, NormalForm, StateEquation, SymbolicModel};
use crate::error::{ModelError, Result};
use crate::expr::{zip0, Expr, Substitution};
use crate::matrix::Matrix;
use crate::symbol::Symbol;

fn pick(syms: &[Symbol], idx: &[usize]) -> Vec<Symbol> {
    idx.iter().map(|&i| syms[i].clone()).collect()
}

fn pairs(from: &[Symbol], to: &Matrix) -> Substitution {
    from.iter().cloned().zip(to.iter().cloned()).collect()
}

impl SymbolicModel {
    /// Indices of the coordinates with a zero force (passive) and with a
    /// nonzero force (actuated).
    pub fn actuator_layout(&self) -> (Vec<usize>, Vec<usize>) {
        (0..self.dim()).partition(|&i| self.qq[i].is_zero())
    }

    /// `xdot = ff + gg·tau` with `xx = (ttheta, ttd)`, solving the
    /// equations for all accelerations.
    pub fn calc_state_eq(&mut self, opts: impl Into<DeriveOptions>) -> Result<()> {
        let opts = opts.into();
        info!(coordinates = self.dim(), inputs = self.tau.len(), "Computing explicit state equation");

        let rest = self.rest();
        let acc = self.mass_matrix().solve(&-rest)?;
        let xdot = Matrix::from_symbols(&self.ttd).col_join(&acc);

        let xx = Matrix::from_symbols(&self.ttheta).col_join(&Matrix::from_symbols(&self.ttd));
        let ff = opts.finish(xdot.subs(&zip0(&self.tau)));
        let gg = opts.finish(xdot.jacobian(&self.tau));

        self.state = Some(StateEquation { xx, ff, gg });
        Ok(())
    }

    /// Collocated partial linearization: the accelerations of the actuated
    /// coordinates become the new inputs `aa`.
    pub fn calc_coll_part_lin_state_eq(&mut self, opts: impl Into<DeriveOptions>) -> Result<()> {
        let opts = opts.into();
        let n = self.dim();
        let (passive, actuated) = self.actuator_layout();
        if actuated.is_empty() {
            return Err(ModelError::Precondition(
                "partial linearization needs at least one actuated coordinate".into(),
            ));
        }
        let nq = actuated.len();
        info!(passive = passive.len(), actuated = nq, "Computing collocated partial linearization");

        let mm = self.mass_matrix();
        let m11 = mm.select_rows(&passive).select_cols(&passive);
        let m12 = mm.select_rows(&passive).select_cols(&actuated);
        let d1 = self.eqns.select_rows(&passive).subs(&zip0(&self.ttdd));

        // columns: drift, then one per actuated acceleration
        let sol = m11.solve(&d1.row_join(&m12))?;

        let mut drift = vec![Expr::zero(); n];
        let mut input = Matrix::zeros(n, nq);
        for (k, &i) in passive.iter().enumerate() {
            drift[i] = -&sol[(k, 0)];
            for j in 0..nq {
                input[(i, j)] = -&sol[(k, j + 1)];
            }
        }
        for (j, &i) in actuated.iter().enumerate() {
            input[(i, j)] = Expr::one();
        }

        let xx = Matrix::from_symbols(&self.ttheta).col_join(&Matrix::from_symbols(&self.ttd));
        let ff = opts.finish(Matrix::from_symbols(&self.ttd).col_join(&Matrix::column(drift)));
        let gg = opts.finish(Matrix::zeros(n, nq).col_join(&input));
        let aa = Matrix::from_symbols(&pick(&self.ttdd, &actuated));

        self.state = Some(StateEquation { xx, ff, gg });
        self.aa = Some(aa);
        Ok(())
    }

    /// Lagrange-Byrnes-Isidori normal form. The leading `np` coordinates are
    /// taken as unactuated and the trailing `nq` as actuated, where `nq` is
    /// the number of nonzero forces.
    ///
    /// New state `zz = (qq, vv, pp, ww)` with `ww = uu + M11⁻¹·M12·vv`, where
    /// `pp, uu` are the unactuated positions and velocities and `qq, vv` the
    /// actuated ones.
    pub fn calc_lbi_nf_state_eq(&mut self, opts: impl Into<DeriveOptions>) -> Result<()> {
        let opts = opts.into();
        let n = self.dim();
        let nq = self.qq.iter().filter(|f| !f.is_zero()).count();
        let np = n - nq;
        if nq == 0 || np == 0 {
            return Err(ModelError::Precondition(format!(
                "normal form needs both unactuated and actuated coordinates (np = {np}, nq = {nq})"
            )));
        }
        let (_, actuated) = self.actuator_layout();
        if actuated.iter().copied().ne(np..n) {
            warn!(
                ?actuated,
                np, "Forces do not act on the trailing coordinates; using the positional split"
            );
        }
        info!(np, nq, "Computing Lagrange-Byrnes-Isidori normal form");

        let p: Vec<usize> = (0..np).collect();
        let a: Vec<usize> = (np..n).collect();
        let mm = self.mass_matrix();
        let m11 = mm.select_rows(&p).select_cols(&p);
        let m12 = mm.select_rows(&p).select_cols(&a);

        let pp = Matrix::from_symbols(&self.ttheta[..np]);
        let qq = Matrix::from_symbols(&self.ttheta[np..]);
        let uu = Matrix::from_symbols(&self.ttd[..np]);
        let vv = Matrix::from_symbols(&self.ttd[np..]);
        let aa = Matrix::from_symbols(&self.ttdd[np..]);

        let kk = m11.solve(&m12)?;
        let ww = self.fresh_symbols("w", np);
        let ww_m = Matrix::from_symbols(&ww);
        let ww_def = &uu + &kk * &vv;
        let uu_of_w = &ww_m - &kk * &vv;

        // passive equations without forces
        let rest_p = (&self.eqns + &self.qq)
            .select_rows(&p)
            .subs(&zip0(&self.ttdd));

        // d/dt(uu + K·vv) with K = M11⁻¹·M12: the actuated accelerations
        // cancel and only M11·wdot = (M12' - M11'·K)·vv - rest_p is left
        let mut table = self.table.clone();
        let m11_dot = table.time_deriv(&m11, &self.ttheta, 1);
        let m12_dot = table.time_deriv(&m12, &self.ttheta, 1);
        let drift = (&m12_dot - &m11_dot * &kk) * &vv - &rest_p;
        let mut wdot = m11.solve(&drift)?;
        if wdot.iter().any(|e| self.ttdd[..np].iter().any(|s| e.depends_on(s))) {
            // velocity dependent inertia
            let pdd = m11.solve(&-(rest_p + &m12 * &aa))?;
            wdot = wdot.subs(&pairs(&self.ttdd[..np], &pdd));
        }
        debug!(rows = wdot.rows(), "Eliminated passive accelerations");

        let det = m11.det()?;
        let to_w = pairs(&self.ttd[..np], &uu_of_w);
        let gz_w = wdot
            .jacobian(&self.ttdd[np..])
            .subs(&to_w)
            .map(|e| e.cancel_factor(&det));
        let fz_w = wdot
            .subs(&zip0(&self.ttdd[np..]))
            .subs(&to_w)
            .map(|e| e.cancel_factor(&det));
        if !gz_w.is_zero() {
            warn!("Input enters the normalized momenta directly");
        }

        let zz = Matrix::col_stack(&[&qq, &vv, &pp, &ww_m]);
        let fz = opts.finish(Matrix::col_stack(&[&vv, &Matrix::zeros(nq, 1), &uu_of_w, &fz_w]));
        let gz = opts.finish(Matrix::col_stack(&[
            &Matrix::zeros(nq, nq),
            &Matrix::eye(nq),
            &Matrix::zeros(np, nq),
            &gz_w,
        ]));
        let ww_def = opts.finish(ww_def);

        self.table = table;
        self.aa = Some(aa);
        self.normal_form = Some(NormalForm { zz, fz, gz, ww, ww_def });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{c, sym};
    use crate::model::generate_symbolic_model;
    use crate::symbol::symbols;

    fn double_mass() -> SymbolicModel {
        let ttheta = Matrix::from_symbols(&symbols("p1, q1"));
        let (m, k) = (sym("m"), sym("k"));
        let t = (&m * sym("pdot1").powi(2) + &m * sym("qdot1").powi(2)) / 2;
        let v = &k * (sym("p1") - sym("q1")).powi(2) / 2;
        generate_symbolic_model(&t, &v, &ttheta, vec![c(0), sym("F")], false).unwrap()
    }

    #[test]
    fn layout_follows_nonzero_forces() {
        let model = double_mass();
        assert_eq!(model.actuator_layout(), (vec![0], vec![1]));
    }

    #[test]
    fn outputs_unavailable_before_transform() {
        let model = double_mass();
        assert_eq!(model.ff().unwrap_err(), ModelError::Unavailable("ff"));
        assert_eq!(model.ww_def().unwrap_err(), ModelError::Unavailable("ww_def"));
        assert!(model.aa().is_err());
    }

    #[test]
    fn state_equation_of_coupled_masses() {
        let mut model = double_mass();
        model.calc_state_eq(true).unwrap();
        let (m, k) = (sym("m"), sym("k"));
        let stretch = sym("p1") - sym("q1");
        let ff = model.ff().unwrap();
        assert!(ff[2].equiv(&(-&k * &stretch / &m)));
        assert!(ff[3].equiv(&(&k * &stretch / &m)));
        assert_eq!(model.gg().unwrap().shape(), (4, 1));
        assert!(model.gg().unwrap()[3].equiv(&(c(1) / &m)));
    }

    #[test]
    fn unactuated_model_is_rejected() {
        let ttheta = Matrix::from_symbols(&symbols("p1"));
        let t = sym("m") * sym("pdot1").powi(2) / 2;
        let mut model = generate_symbolic_model(&t, &c(0), &ttheta, vec![c(0)], false).unwrap();
        assert!(matches!(
            model.calc_coll_part_lin_state_eq(false),
            Err(ModelError::Precondition(_))
        ));
        assert!(matches!(model.calc_lbi_nf_state_eq(false), Err(ModelError::Precondition(_))));
    }

    #[test]
    fn failed_transform_leaves_model_untouched() {
        let ttheta = Matrix::from_symbols(&symbols("p1, q1"));
        let t = sym("m") * sym("qdot1").powi(2) / 2;
        let mut model =
            generate_symbolic_model(&t, &c(0), &ttheta, vec![c(0), sym("F")], false).unwrap();
        assert!(matches!(model.calc_state_eq(false), Err(ModelError::Unsolvable(_))));
        assert!(model.xx().is_err());
    }
}
