//! Fixed-step shooting for the radial equation and a well-depth search built on
//! it.
//!
//! Shooting integrates `P'' = q(r) P` outward from `P(r_min) = 0`, `P'(r_min) =
//! 1` with the classical fourth-order Runge-Kutta method. For fixed `E`, the
//! number of interior nodes of the shot grows with the well depth by one each
//! time the depth passes an eigenvalue, which is used to bracket a particular
//! state before refining on the outer boundary value `P(r_max)`.

use ndarray as nd;
use crate::{
    DEF_EPSILON,
    DEF_MAXITERS,
    error::ShootError,
    radial::{ Params, RadialSystem },
};

pub type ShootResult<T> = Result<T, ShootError>;

/// Output of [`shoot`].
#[derive(Clone, Debug)]
pub struct Shot {
    /// Radial coordinates.
    pub r: nd::Array1<f64>,
    /// `[P, P']` at each coordinate, with one row per component.
    pub y: nd::Array2<f64>,
}

impl Shot {
    /// Value of `P` at the outer boundary.
    pub fn outer(&self) -> f64 { self.y[[0, self.y.ncols() - 1]] }

    /// Number of sign changes in `P` after the starting point.
    pub fn node_count(&self) -> usize { node_count(&self.y.row(0)) }
}

/// Count the sign changes in a sampled function, ignoring exact zeros.
///
/// ```
/// use ndarray as nd;
/// use deuteron::shoot::node_count;
///
/// let p: nd::Array1<f64> = nd::array![0.0, 1.0, 0.0, -2.0, -1.0, 3.0];
/// assert_eq!(node_count(&p), 2);
/// ```
pub fn node_count<S>(p: &nd::ArrayBase<S, nd::Ix1>) -> usize
where S: nd::Data<Elem = f64>
{
    p.iter()
        .filter(|pk| **pk != 0.0)
        .fold((0, None), |(n, last): (usize, Option<bool>), pk| {
            let pos = *pk > 0.0;
            match last {
                Some(l) if l != pos => (n + 1, Some(pos)),
                _ => (n, Some(pos)),
            }
        })
        .0
}

// classical RK4 step over a piece of the mesh on which the potential is flat;
// every stage samples q at the piece midpoint so that a piece ending or
// starting on the well edge sees only its own side of the jump
fn rk4_step(sys: &RadialSystem, r: f64, h: f64, y: (f64, f64)) -> (f64, f64) {
    let rm = r + h / 2.0;
    let deriv = |p: f64, dp: f64| sys.deriv(rm, p, dp);
    let k1 = deriv(y.0, y.1);
    let k2 = deriv(y.0 + h / 2.0 * k1.0, y.1 + h / 2.0 * k1.1);
    let k3 = deriv(y.0 + h / 2.0 * k2.0, y.1 + h / 2.0 * k2.1);
    let k4 = deriv(y.0 + h * k3.0, y.1 + h * k3.1);
    (
        y.0 + h / 6.0 * (k1.0 + 2.0 * k2.0 + 2.0 * k3.0 + k4.0),
        y.1 + h / 6.0 * (k1.1 + 2.0 * k2.1 + 2.0 * k3.1 + k4.1),
    )
}

/// Integrate the radial equation for a given well depth over `[r_min, r_max]`
/// in `steps` equal steps, starting from `P = 0` and `P' = 1`.
///
/// The step containing the well edge is taken as two pieces split at `R`, so
/// the jump in `V(r)` never falls inside a single Runge-Kutta step. With
/// `steps = params.n_mesh - 1`, the returned coordinates coincide with
/// [`Params::mesh`].
pub fn shoot(params: &Params, depth: f64, steps: usize) -> ShootResult<Shot> {
    ShootError::check_steps(steps)?;
    let sys = params.with_depth(depth).system();
    let edge = params.radius;
    let r: nd::Array1<f64>
        = nd::Array1::linspace(params.r_min, params.r_max, steps + 1);
    let mut y: nd::Array2<f64> = nd::Array2::zeros((2, steps + 1));
    let mut state: (f64, f64) = (0.0, 1.0);
    y[[1, 0]] = state.1;
    for k in 0..steps {
        let (a, b) = (r[k], r[k + 1]);
        state = if a < edge && edge < b {
            let inner = rk4_step(&sys, a, edge - a, state);
            rk4_step(&sys, edge, b - edge, inner)
        } else {
            rk4_step(&sys, a, b - a, state)
        };
        y[[0, k + 1]] = state.0;
        y[[1, k + 1]] = state.1;
    }
    Ok(Shot { r, y })
}

#[derive(Copy, Clone, Debug)]
struct Bounds<T>(T, T);

impl Bounds<f64> {
    fn midpoint(self) -> f64 { (self.0 + self.1) / 2.0 }
}

impl<T> Bounds<T> {
    fn map<U, F: FnMut(T) -> U>(self, mut f: F) -> Bounds<U> {
        (f(self.0), f(self.1)).into()
    }
}

impl<T: PartialOrd> Bounds<T> {
    fn from_ord(xx: (T, T)) -> Self {
        if xx.0 > xx.1 { Self(xx.1, xx.0) } else { Self(xx.0, xx.1) }
    }
}

impl<T> From<(T, T)> for Bounds<T> {
    fn from(xx: (T, T)) -> Self { Self(xx.0, xx.1) }
}

/// Output of [`fit_depth`].
#[derive(Clone, Debug)]
pub struct DepthFit {
    /// Well depth (MeV) placing the `nu`-th state at `params.e_bound`.
    pub depth: f64,
    /// Shot at the final depth.
    pub shot: Shot,
    /// Number of refinement iterations taken.
    pub niter: usize,
}

impl DepthFit {
    /// `params` with the fitted depth.
    pub fn params(&self, params: &Params) -> Params {
        params.with_depth(self.depth)
    }
}

/// Find the well depth for which the state with `nu` interior nodes has energy
/// `params.e_bound`.
///
/// This search is divided into two parts:
///
/// - A coarse level search, bisecting the depth bounds until the shots at the
///   lower and upper bounds have `nu` and `nu + 1` nodes, respectively.
/// - A finer regula falsi search (Illinois variant) on `P(r_max)`, which
///   changes sign across the bracket.
///
/// The second part iterates until the relative change in depth falls below
/// `epsilon > 0`; both parts are limited to `maxiters` iterations. Returns
/// [`ShootError::DepthLevel`] if the bounds do not contain the desired level.
pub fn fit_depth(
    params: &Params,
    bounds: (f64, f64),
    nu: usize,
    epsilon: f64,
    maxiters: usize,
    steps: usize,
) -> ShootResult<DepthFit>
{
    ShootError::check_epsilon(epsilon)?;
    ShootError::check_maxiters(maxiters)?;
    ShootError::check_steps(steps)?;

    let count = |d: f64| -> ShootResult<usize> {
        shoot(params, d, steps).map(|shot| shot.node_count())
    };

    let mut db: Bounds<f64> = Bounds::from_ord(bounds);
    let nb0 = db.map(count);
    let mut nb: Bounds<usize> = Bounds(nb0.0?, nb0.1?);
    if nb.0 > nu || nb.1 <= nu {
        return Err(ShootError::DepthLevel(nb.0, nb.1));
    }
    let mut k: usize = 0;
    while (nb.0 != nu || nb.1 != nu + 1) && k < maxiters {
        let d = db.midpoint();
        let n = count(d)?;
        if n <= nu {
            db.0 = d;
            nb.0 = n;
        } else {
            db.1 = d;
            nb.1 = n;
        }
        k += 1;
    }
    if nb.0 != nu || nb.1 != nu + 1 {
        return Err(ShootError::DepthLevel(nb.0, nb.1));
    }
    log::debug!(
        "shoot::fit_depth: level search bracketed depth in [{:.6}, {:.6}] \
        after {} iterations",
        db.0, db.1, k,
    );

    let outer = |d: f64| -> ShootResult<f64> {
        shoot(params, d, steps).map(|shot| shot.outer())
    };
    let fb0 = db.map(outer);
    let mut fb: Bounds<f64> = Bounds(fb0.0?, fb0.1?);
    let mut depth: f64 = db.midpoint();
    let mut depth_last: f64;
    let mut niter: usize = 0;
    for i in 0..maxiters {
        niter = i + 1;
        depth_last = depth;
        depth = if fb.1 == fb.0 {
            db.midpoint()
        } else {
            (db.0 * fb.1 - db.1 * fb.0) / (fb.1 - fb.0)
        };
        let f = outer(depth)?;
        if f == 0.0 { break; }
        if f * fb.1 < 0.0 {
            db.0 = db.1;
            fb.0 = fb.1;
        } else {
            fb.0 /= 2.0;
        }
        db.1 = depth;
        fb.1 = f;
        if ((depth - depth_last) / depth).abs() < epsilon
            || ((db.1 - db.0) / depth).abs() < epsilon
        { break; }
    }
    if niter == maxiters {
        log::warn!("shoot::fit_depth: depth convergence reached maxiters");
    }

    let shot = shoot(params, depth, steps)?;
    Ok(DepthFit { depth, shot, niter })
}

/// Find the depth of the well supporting a ground state at `params.e_bound`
/// with default search parameters.
///
/// The depth is searched between `|E|` and `upper`, and shots are taken over
/// [`Params::mesh`] so that [`DepthFit::shot`] can seed
/// [`radial::solve_depth`][crate::radial::solve_depth].
pub fn fit_ground_depth(params: &Params, upper: f64) -> ShootResult<DepthFit> {
    fit_depth(
        params,
        (params.e_bound.abs(), upper),
        0,
        DEF_EPSILON,
        DEF_MAXITERS,
        params.n_mesh.saturating_sub(1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    // depth for which k cot(k (R - r_min)) = -κ coth(κ (r_max - R)), with the
    // inner phase k (R - r_min) restricted to the branch of the `nu`-th state
    fn analytic_depth(params: &Params, nu: usize) -> f64 {
        let c = 2.0 / params.hbar2_over_2m;
        let kappa = (c * params.e_bound.abs()).sqrt();
        let l = params.radius - params.r_min;
        let m = params.r_max - params.radius;
        let g = |phase: f64| {
            let k = phase / l;
            k / phase.tan() + kappa / (kappa * m).tanh()
        };
        let mut lo = PI / 2.0 + nu as f64 * PI + 1e-9;
        let mut hi = PI + nu as f64 * PI - 1e-9;
        for _ in 0..200 {
            let mid = (lo + hi) / 2.0;
            if g(mid) > 0.0 { lo = mid; } else { hi = mid; }
        }
        let k = (lo + hi) / 2.0 / l;
        k * k / c - params.e_bound
    }

    #[test]
    fn counts_sign_changes() {
        assert_eq!(node_count(&nd::array![0.0, 1.0, 2.0, 1.0]), 0);
        assert_eq!(node_count(&nd::array![0.0, 1.0, -1.0, 0.0, -2.0, 3.0]), 2);
        assert_eq!(node_count(&nd::Array1::<f64>::zeros(5)), 0);
    }

    #[test]
    fn free_shot_in_flat_region() {
        // with no well and E < 0, P = sinh(κ (r - r_min)) / κ
        let params = Params { e_bound: -2.2, ..Params::default() };
        let shot = shoot(&params, 0.0, 2000).unwrap();
        let kappa = (2.0 / params.hbar2_over_2m * 2.2_f64).sqrt();
        shot.r.iter().zip(shot.y.row(0))
            .for_each(|(rk, pk)| {
                let exact = (kappa * (rk - params.r_min)).sinh() / kappa;
                assert!((pk - exact).abs() < 1e-8 * (1.0 + exact.abs()));
            });
        assert_eq!(shot.node_count(), 0);
    }

    #[test]
    fn shot_matches_mesh() {
        let params = Params::default();
        let shot = shoot(&params, params.depth, params.n_mesh - 1).unwrap();
        let mesh = params.mesh();
        assert_eq!(shot.r.len(), mesh.len());
        shot.r.iter().zip(&mesh)
            .for_each(|(a, b)| assert!((a - b).abs() < 1e-12));
        assert_eq!(shot.y[[0, 0]], 0.0);
        assert_eq!(shot.y[[1, 0]], 1.0);
    }

    #[test]
    fn ground_state_depth_matches_analytic() {
        let params = Params::default();
        let fit = fit_depth(&params, (2.2, 100.0), 0, 1e-10, 1000, 2000)
            .unwrap();
        let exact = analytic_depth(&params, 0);
        assert!((fit.depth - exact).abs() < 1e-6, "{} vs {}", fit.depth, exact);
        let n = fit.shot.r.len();
        assert_eq!(node_count(&fit.shot.y.slice(nd::s![0, ..n - 10])), 0);
        assert!(fit.shot.outer().abs() < 1e-3 * max_abs(&fit.shot.y.row(0)));
    }

    #[test]
    fn excited_state_depth_matches_analytic() {
        let params = Params::default();
        let fit = fit_depth(&params, (2.2, 300.0), 1, 1e-10, 1000, 2000)
            .unwrap();
        let exact = analytic_depth(&params, 1);
        assert!((fit.depth - exact).abs() < 1e-5, "{} vs {}", fit.depth, exact);
        assert!(fit.depth > analytic_depth(&params, 0));
    }

    #[test]
    fn depth_error_is_fourth_order_across_well_edge() {
        // neither mesh has a node at R; halving the step should cut the error
        // by about 16
        let params = Params::default();
        let exact = analytic_depth(&params, 0);
        let err = |steps: usize| {
            let fit = fit_depth(&params, (2.2, 100.0), 0, 1e-13, 1000, steps)
                .unwrap();
            (fit.depth - exact).abs()
        };
        let (coarse, fine) = (err(250), err(500));
        assert!(coarse > 0.0 && coarse < 1e-3, "{coarse}");
        assert!(fine * 8.0 < coarse, "{coarse} vs {fine}");
    }

    #[test]
    fn split_step_lands_on_edge() {
        // a mesh with a node exactly at R and one without agree closely
        let params = Params { r_min: 0.1, r_max: 10.1, ..Params::default() };
        let on_edge = shoot(&params, 30.0, 1000).unwrap();
        assert!(on_edge.r.iter().any(|rk| (rk - params.radius).abs() < 1e-12));
        let off_edge = shoot(&params, 30.0, 999).unwrap();
        let scale = max_abs(&on_edge.y.row(0));
        assert!((on_edge.outer() - off_edge.outer()).abs() < 1e-8 * scale);
    }

    #[test]
    fn default_search_uses_mesh() {
        let params = Params::default();
        let fit = fit_ground_depth(&params, 100.0).unwrap();
        assert_eq!(fit.shot.r.len(), params.n_mesh);
        let exact = analytic_depth(&params, 0);
        assert!((fit.depth - exact).abs() < 1e-4, "{} vs {}", fit.depth, exact);
        assert_eq!(fit.params(&params).depth, fit.depth);
    }

    #[test]
    fn unbracketed_level_is_an_error() {
        let params = Params::default();
        assert!(matches!(
            fit_depth(&params, (2.5, 5.0), 0, 1e-8, 100, 500),
            Err(ShootError::DepthLevel(0, 0)),
        ));
        assert!(matches!(
            fit_depth(&params, (2.5, 100.0), 0, 0.0, 100, 500),
            Err(ShootError::BadEpsilon(_)),
        ));
        assert!(matches!(shoot(&params, 35.0, 1), Err(ShootError::BadSteps(1))));
    }

    fn max_abs(p: &nd::ArrayView1<f64>) -> f64 {
        p.iter().fold(0.0, |acc, pk| acc.max(pk.abs()))
    }
}
