//! The radial Schrödinger equation for the deuteron as a first-order boundary
//! value problem.
//!
//! With `P(r) = r R(r)` the reduced radial wavefunction of the *S*-wave
//! neutron-proton system, the state vector is `y = [P, P']` and
//! ```text
//! dP/dr  = P'
//! dP'/dr = (2 / (ħ²/2m)) (V(r) - E) P
//!
//! P(r_min) = 0,  P(r_max) = 0
//! ```

use ndarray as nd;
use crate::{
    Arr1,
    Arr2,
    bvp::{ self, BvpOptions, BvpResult, BvpSolution, BvpSystem },
    error::BvpError,
    interp::{ self, InterpResult },
    potential::SquareWell,
};

/// Physical and numerical parameters of the deuteron problem.
///
/// The default reproduces the reference calculation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Params {
    /// `ħ²/2m` (MeV fm²).
    pub hbar2_over_2m: f64,
    /// Bound-state energy (MeV).
    pub e_bound: f64,
    /// Well radius (fm).
    pub radius: f64,
    /// Well depth (MeV).
    pub depth: f64,
    /// Inner radial cutoff (fm).
    pub r_min: f64,
    /// Outer radial cutoff (fm).
    pub r_max: f64,
    /// Number of points in the initial mesh.
    pub n_mesh: usize,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            hbar2_over_2m: 20.735,
            e_bound: -2.2,
            radius: 2.1,
            depth: 35.0,
            r_min: 0.01,
            r_max: 10.0,
            n_mesh: 500,
        }
    }
}

impl Params {
    /// The square well described by these parameters.
    pub fn well(&self) -> SquareWell { SquareWell::new(self.depth, self.radius) }

    /// Return a copy of `self` with a different well depth.
    pub fn with_depth(&self, depth: f64) -> Self { Self { depth, ..*self } }

    /// Initial radial mesh: `n_mesh` evenly spaced points over `[r_min,
    /// r_max]`.
    pub fn mesh(&self) -> nd::Array1<f64> {
        nd::Array1::linspace(self.r_min, self.r_max, self.n_mesh)
    }

    /// Uniform display mesh of `n` points over `[0, r_max]`.
    pub fn display_mesh(&self, n: usize) -> nd::Array1<f64> {
        nd::Array1::linspace(0.0, self.r_max, n)
    }

    /// The ODE system for these parameters.
    pub fn system(&self) -> RadialSystem {
        RadialSystem {
            coeff: 2.0 / self.hbar2_over_2m,
            e_bound: self.e_bound,
            well: self.well(),
        }
    }

    /// The two-region ODE system with the well depth left free, normalized
    /// to `P'(r_min) = slope`.
    pub fn depth_system(&self, slope: f64) -> DepthSystem {
        DepthSystem {
            coeff: 2.0 / self.hbar2_over_2m,
            e_bound: self.e_bound,
            l_in: self.radius - self.r_min,
            l_out: self.r_max - self.radius,
            slope,
        }
    }
}

/// Radial Schrödinger equation in first-order form for a square well.
#[derive(Copy, Clone, Debug)]
pub struct RadialSystem {
    // 2 / (ħ²/2m)
    coeff: f64,
    e_bound: f64,
    well: SquareWell,
}

impl RadialSystem {
    /// Second-derivative coefficient `(2 / (ħ²/2m)) (V(r) - E)` at a single
    /// radius.
    pub fn q(&self, r: f64) -> f64 {
        self.coeff * (self.well.eval(r) - self.e_bound)
    }

    /// Right-hand side at a single point.
    pub fn deriv(&self, r: f64, p: f64, dp: f64) -> (f64, f64) {
        (dp, self.q(r) * p)
    }

    /// The potential used by this system.
    pub fn well(&self) -> SquareWell { self.well }
}

impl BvpSystem for RadialSystem {
    fn ncomp(&self) -> usize { 2 }

    fn rhs(
        &self,
        r: nd::ArrayView1<f64>,
        y: nd::ArrayView2<f64>,
        _p: nd::ArrayView1<f64>,
    ) -> nd::Array2<f64>
    {
        let mut out: nd::Array2<f64> = nd::Array2::zeros(y.raw_dim());
        out.row_mut(0).assign(&y.row(1));
        nd::Zip::from(out.row_mut(1)).and(&r).and(y.row(0))
            .for_each(|d2p, &rk, &pk| { *d2p = self.q(rk) * pk; });
        out
    }

    /// Enforce `P(r_min) = 0` and `P(r_max) = 0`.
    fn bc(
        &self,
        ya: nd::ArrayView1<f64>,
        yb: nd::ArrayView1<f64>,
        _p: nd::ArrayView1<f64>,
    ) -> nd::Array1<f64>
    {
        nd::array![ya[0], yb[0]]
    }

    fn rhs_jac(
        &self,
        r: nd::ArrayView1<f64>,
        _y: nd::ArrayView2<f64>,
        _p: nd::ArrayView1<f64>,
    ) -> Option<nd::Array3<f64>>
    {
        let mut jac: nd::Array3<f64> = nd::Array3::zeros((r.len(), 2, 2));
        jac.outer_iter_mut().zip(r)
            .for_each(|(mut jk, &rk)| {
                jk[[0, 1]] = 1.0;
                jk[[1, 0]] = self.q(rk);
            });
        Some(jac)
    }
}

/// Radial equation with the well depth promoted to an unknown parameter,
/// split at the well edge into two smooth pieces.
///
/// The regions `[r_min, R]` and `[R, r_max]` are each mapped onto `s ∈ [0,
/// 1]`, giving the state `y = [P_in, P'_in, P_out, P'_out]` (with derivatives
/// taken with respect to `r`). Continuity of `P` and `P'` at `R` and the
/// normalization `P'(r_min) = slope` join the outer boundary conditions, so
/// that the solver can tune `p[0] = V0` until the bound state sits at exactly
/// `E`.
#[derive(Copy, Clone, Debug)]
pub struct DepthSystem {
    coeff: f64,
    e_bound: f64,
    // lengths of the inner and outer regions
    l_in: f64,
    l_out: f64,
    slope: f64,
}

impl DepthSystem {
    /// Second-derivative coefficients `(q_in, q_out)` for a given depth.
    pub fn q(&self, depth: f64) -> (f64, f64) {
        (self.coeff * (-depth - self.e_bound), -self.coeff * self.e_bound)
    }
}

impl BvpSystem for DepthSystem {
    fn ncomp(&self) -> usize { 4 }

    fn nparam(&self) -> usize { 1 }

    fn rhs(
        &self,
        _s: nd::ArrayView1<f64>,
        y: nd::ArrayView2<f64>,
        p: nd::ArrayView1<f64>,
    ) -> nd::Array2<f64>
    {
        let (q_in, q_out) = self.q(p[0]);
        nd::stack![
            nd::Axis(0),
            &y.row(1) * self.l_in,
            &y.row(0) * (self.l_in * q_in),
            &y.row(3) * self.l_out,
            &y.row(2) * (self.l_out * q_out)
        ]
    }

    fn bc(
        &self,
        ya: nd::ArrayView1<f64>,
        yb: nd::ArrayView1<f64>,
        _p: nd::ArrayView1<f64>,
    ) -> nd::Array1<f64>
    {
        nd::array![
            ya[0],
            yb[2],
            yb[0] - ya[2],
            yb[1] - ya[3],
            ya[1] - self.slope,
        ]
    }

    fn rhs_jac(
        &self,
        s: nd::ArrayView1<f64>,
        _y: nd::ArrayView2<f64>,
        p: nd::ArrayView1<f64>,
    ) -> Option<nd::Array3<f64>>
    {
        let (q_in, q_out) = self.q(p[0]);
        let mut jac: nd::Array3<f64> = nd::Array3::zeros((s.len(), 4, 4));
        jac.outer_iter_mut()
            .for_each(|mut jk| {
                jk[[0, 1]] = self.l_in;
                jk[[1, 0]] = self.l_in * q_in;
                jk[[2, 3]] = self.l_out;
                jk[[3, 2]] = self.l_out * q_out;
            });
        Some(jac)
    }
}

/// Output of [`solve_depth`].
#[derive(Clone, Debug)]
pub struct DepthSolution {
    /// Well depth (MeV).
    pub depth: f64,
    /// Radial mesh over `[r_min, r_max]`, with a node at the well edge.
    pub r: nd::Array1<f64>,
    /// `[P, P']` over `r`.
    pub y: nd::Array2<f64>,
    /// Raw solver output over the two-region system.
    pub bvp: BvpSolution,
}

impl DepthSolution {
    /// `true` if the solver converged.
    pub fn success(&self) -> bool { self.bvp.success }

    /// Locate the zeros of `P` strictly between `r_min` and `r_max`.
    ///
    /// See [`BvpSolution::nodes`].
    pub fn nodes(&self) -> InterpResult<Vec<f64>> {
        bvp::interior_zeros(&self.r, &self.y.row(0))
    }
}

/// Solve the radial problem on the parameters' initial mesh from a given
/// guess.
///
/// The guess must have shape `(2, params.n_mesh)`.
pub fn solve_with_guess<S>(params: &Params, guess: &Arr2<S>, opts: BvpOptions)
    -> BvpResult<BvpSolution>
where S: nd::Data<Elem = f64>
{
    let r = params.mesh();
    bvp::solve_bvp(&params.system(), &r, guess, opts)
}

/// Solve the radial problem from the all-zero initial guess.
pub fn solve(params: &Params, opts: BvpOptions) -> BvpResult<BvpSolution> {
    let guess: nd::Array2<f64> = nd::Array2::zeros((2, params.n_mesh));
    solve_with_guess(params, &guess, opts)
}

/// Solve for the well depth that places the bound state at `params.e_bound`,
/// starting from `params.depth` and a guess `[P, P']` sampled over `r`.
///
/// The wavefunction is normalized to the initial slope of the guess, which
/// must be nonzero and finite ([`BvpError::BadSlope`] otherwise). Each region
/// is meshed with `n_mesh / 2` nodes.
pub fn solve_depth<S, T>(
    params: &Params,
    r: &Arr1<S>,
    guess: &Arr2<T>,
    opts: BvpOptions,
) -> Result<DepthSolution, BvpError>
where
    S: nd::Data<Elem = f64>,
    T: nd::Data<Elem = f64>,
{
    BvpError::check_mesh(r)?;
    if guess.dim() != (2, r.len()) {
        return Err(BvpError::GuessShape(2, r.len(), guess.nrows(), guess.ncols()));
    }
    let slope = guess[[1, 0]];
    if slope == 0.0 || !slope.is_finite() {
        return Err(BvpError::BadSlope(slope));
    }
    let sys_fixed = params.system();
    let p_none: nd::Array1<f64> = nd::Array1::zeros(0);
    let yp = sys_fixed.rhs(r.view(), guess.view(), p_none.view());
    let spline = interp::hermite_from(r, guess, &yp)?;

    let l_in = params.radius - params.r_min;
    let l_out = params.r_max - params.radius;
    let sys = params.depth_system(slope);
    let s: nd::Array1<f64>
        = nd::Array1::linspace(0.0, 1.0, (params.n_mesh / 2).max(5));
    let r_in = s.mapv(|sk| params.r_min + l_in * sk);
    let r_out = s.mapv(|sk| params.radius + l_out * sk);
    let y0: nd::Array2<f64>
        = nd::concatenate![nd::Axis(0), spline.eval(&r_in), spline.eval(&r_out)];
    let p0: nd::Array1<f64> = nd::array![params.depth];
    let sol = bvp::solve_bvp_params(&sys, &s, &y0, &p0, opts)?;

    let m = sol.x.len();
    let r: nd::Array1<f64>
        = sol.x.iter().map(|sk| params.r_min + l_in * sk)
        .chain(sol.x.iter().skip(1).map(|sk| params.radius + l_out * sk))
        .collect();
    let y: nd::Array2<f64>
        = nd::concatenate![
            nd::Axis(1),
            sol.y.slice(nd::s![0..2, ..]),
            sol.y.slice(nd::s![2..4, 1..m])
        ];
    Ok(DepthSolution { depth: sol.p[0], r, y, bvp: sol })
}

/// Evaluate the potential over a display mesh, returning `(r, V(r))`.
pub fn potential_curve<S>(params: &Params, r: &Arr1<S>) -> (nd::Array1<f64>, nd::Array1<f64>)
where S: nd::Data<Elem = f64>
{
    (r.to_owned(), params.well().eval_arr(r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rhs_identity() {
        let params = Params::default();
        let sys = params.system();
        let r: nd::Array1<f64> = nd::Array1::linspace(0.01, 10.0, 37);
        let y = nd::stack![nd::Axis(0), r.mapv(|rk| rk.sin()), r.mapv(|rk| rk.cos())];
        let p: nd::Array1<f64> = nd::Array1::zeros(0);
        let f = sys.rhs(r.view(), y.view(), p.view());
        assert_eq!(f.dim(), (2, 37));
        for k in 0..r.len() {
            let v = params.well().eval(r[k]);
            let expected = (2.0 / params.hbar2_over_2m) * (v - params.e_bound) * y[[0, k]];
            assert_eq!(f[[0, k]], y[[1, k]]);
            assert_relative_eq!(f[[1, k]], expected, epsilon = 1e-14);
        }
    }

    #[test]
    fn bc_is_projection() {
        let sys = Params::default().system();
        let ya = nd::array![0.25, -3.0];
        let yb = nd::array![-1.5, 7.0];
        let p: nd::Array1<f64> = nd::Array1::zeros(0);
        assert_eq!(sys.bc(ya.view(), yb.view(), p.view()), nd::array![0.25, -1.5]);
    }

    #[test]
    fn analytic_jac_matches_rhs() {
        let sys = Params::default().system();
        let r: nd::Array1<f64> = nd::array![0.5, 2.1, 2.2, 9.0];
        let y: nd::Array2<f64> = nd::Array2::zeros((2, 4));
        let p: nd::Array1<f64> = nd::Array1::zeros(0);
        let jac = sys.rhs_jac(r.view(), y.view(), p.view()).unwrap();
        for (k, &rk) in r.iter().enumerate() {
            let (dp, d2p) = sys.deriv(rk, 1.0, 0.0);
            assert_eq!(jac[[k, 0, 0]], dp);
            assert_eq!(jac[[k, 1, 0]], d2p);
            assert_eq!(jac[[k, 0, 1]], 1.0);
            assert_eq!(jac[[k, 1, 1]], 0.0);
        }
    }

    #[test]
    fn depth_system_joins_regions() {
        let params = Params::default();
        let sys = params.depth_system(0.5);
        assert_eq!((sys.ncomp(), sys.nparam()), (4, 1));
        let depth: nd::Array1<f64> = nd::array![20.0];
        let (q_in, q_out) = sys.q(20.0);
        assert_relative_eq!(q_in, params.with_depth(20.0).system().q(1.0));
        assert_relative_eq!(q_out, params.system().q(5.0));

        let s: nd::Array1<f64> = nd::array![0.0, 0.5, 1.0];
        let y: nd::Array2<f64> = nd::Array2::ones((4, 3));
        let f = sys.rhs(s.view(), y.view(), depth.view());
        assert_relative_eq!(f[[0, 1]], 2.09, epsilon = 1e-12);
        assert_relative_eq!(f[[1, 1]], 2.09 * q_in, epsilon = 1e-12);
        assert_relative_eq!(f[[2, 1]], 7.9, epsilon = 1e-12);
        assert_relative_eq!(f[[3, 1]], 7.9 * q_out, epsilon = 1e-12);

        // continuous at the edge, zero at both ends, correct slope
        let ya = nd::array![0.0, 0.5, 0.3, -0.2];
        let yb = nd::array![0.3, -0.2, 0.0, -0.1];
        assert_eq!(
            sys.bc(ya.view(), yb.view(), depth.view()),
            nd::Array1::<f64>::zeros(5),
        );
    }

    #[test]
    fn zero_guess_solution_satisfies_boundaries() {
        let params = Params::default();
        let sol = solve(&params, BvpOptions::default()).unwrap();
        assert!(sol.success, "{}", sol.message());
        let m = sol.x.len();
        assert_relative_eq!(sol.x[0], 0.01);
        assert_relative_eq!(sol.x[m - 1], 10.0);
        assert!(sol.y[[0, 0]].abs() < 1e-3);
        assert!(sol.y[[0, m - 1]].abs() < 1e-3);
    }

    #[test]
    fn depth_solve_needs_nonzero_slope() {
        let params = Params::default();
        let r = params.mesh();
        let guess: nd::Array2<f64> = nd::Array2::zeros((2, r.len()));
        assert!(matches!(
            solve_depth(&params, &r, &guess, BvpOptions::default()),
            Err(BvpError::BadSlope(s)) if s == 0.0,
        ));
        let mut guess = guess;
        guess[[1, 0]] = f64::NAN;
        assert!(matches!(
            solve_depth(&params, &r, &guess, BvpOptions::default()),
            Err(BvpError::BadSlope(_)),
        ));
    }

    #[test]
    fn default_mesh() {
        let params = Params::default();
        let r = params.mesh();
        assert_eq!(r.len(), 500);
        assert_relative_eq!(r[0], 0.01);
        assert_relative_eq!(r[499], 10.0);
        let (rd, v) = potential_curve(&params, &params.display_mesh(500));
        assert_eq!(rd[0], 0.0);
        assert_eq!(v[0], -35.0);
        assert_eq!(v[499], 0.0);
    }
}
