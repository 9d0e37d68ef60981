//! General solver for two-point boundary value problems (BVPs) in first-order
//! form, optionally with unknown parameters,
//! ```text
//! dy/dx = f(x, y, p),  a ≤ x ≤ b
//! bc(y(a), y(b), p) = 0
//! ```
//! using fourth-order Lobatto IIIA collocation with control of the residual of
//! the continuous (cubic) solution and adaptive mesh refinement.
//!
//! For `n` components and `k` unknown parameters, `bc` must return `n + k`
//! residuals.
//!
//! See [`docs`][crate::docs#boundary-value-problems] for a description of the
//! method.

use ndarray as nd;
use ndarray_linalg::{ FactorizeInto, Solve };
use crate::{
    Arr1,
    Arr2,
    error::BvpError,
    interp::{ self, Hermite, InterpResult, Zero },
};

pub type BvpResult<T> = Result<T, BvpError>;

pub(crate) const DEF_TOL: f64 = 1e-3;
pub(crate) const DEF_MAX_NODES: usize = 1000;
pub(crate) const DEF_MAX_ITERATIONS: usize = 10;

// damped Newton parameters
const NEWTON_MAX_NJEV: usize = 4;
const NEWTON_MAX_ITER: usize = 8;
const ARMIJO_SIGMA: f64 = 0.2;
const BACKTRACK_TAU: f64 = 0.5;
const BACKTRACK_TRIALS: usize = 4;

/// Description of a first-order BVP.
///
/// `rhs` is evaluated over whole arrays of points at once: `x` has one element
/// per point and `y` has one row per component and one column per point.
pub trait BvpSystem {
    /// Number of components in the state vector.
    fn ncomp(&self) -> usize;

    /// Number of unknown parameters (default: 0).
    fn nparam(&self) -> usize { 0 }

    /// Evaluate the right-hand side `f(x, y, p)`, returning an array with the
    /// same shape as `y`.
    fn rhs(
        &self,
        x: nd::ArrayView1<f64>,
        y: nd::ArrayView2<f64>,
        p: nd::ArrayView1<f64>,
    ) -> nd::Array2<f64>;

    /// Evaluate the boundary residual, which must have exactly
    /// [`ncomp`][Self::ncomp]` + `[`nparam`][Self::nparam] elements.
    fn bc(
        &self,
        ya: nd::ArrayView1<f64>,
        yb: nd::ArrayView1<f64>,
        p: nd::ArrayView1<f64>,
    ) -> nd::Array1<f64>;

    /// Jacobian of `rhs` with respect to `y` at each point, with shape `(m, n,
    /// n)` for `m` points and `n` components, where element `[k, i, j]` is
    /// `∂f_i/∂y_j` at point `k`.
    ///
    /// Returning `None` (the default) causes the Jacobian to be estimated by
    /// forward differences. Derivatives with respect to parameters and all
    /// boundary residual derivatives are always estimated.
    fn rhs_jac(
        &self,
        _x: nd::ArrayView1<f64>,
        _y: nd::ArrayView2<f64>,
        _p: nd::ArrayView1<f64>,
    ) -> Option<nd::Array3<f64>>
    {
        None
    }
}

/// A parameter-free [`BvpSystem`] built from a pair of closures.
#[derive(Clone)]
pub struct FnSystem<F, G> {
    n: usize,
    rhs: F,
    bc: G,
}

impl<F, G> FnSystem<F, G>
where
    F: Fn(nd::ArrayView1<f64>, nd::ArrayView2<f64>) -> nd::Array2<f64>,
    G: Fn(nd::ArrayView1<f64>, nd::ArrayView1<f64>) -> nd::Array1<f64>,
{
    pub fn new(n: usize, rhs: F, bc: G) -> Self { Self { n, rhs, bc } }
}

impl<F, G> BvpSystem for FnSystem<F, G>
where
    F: Fn(nd::ArrayView1<f64>, nd::ArrayView2<f64>) -> nd::Array2<f64>,
    G: Fn(nd::ArrayView1<f64>, nd::ArrayView1<f64>) -> nd::Array1<f64>,
{
    fn ncomp(&self) -> usize { self.n }

    fn rhs(
        &self,
        x: nd::ArrayView1<f64>,
        y: nd::ArrayView2<f64>,
        _p: nd::ArrayView1<f64>,
    ) -> nd::Array2<f64>
    {
        (self.rhs)(x, y)
    }

    fn bc(
        &self,
        ya: nd::ArrayView1<f64>,
        yb: nd::ArrayView1<f64>,
        _p: nd::ArrayView1<f64>,
    ) -> nd::Array1<f64>
    {
        (self.bc)(ya, yb)
    }
}

/// Solver parameters; `None` selects the default.
#[derive(Copy, Clone, Debug, Default)]
pub struct BvpOptions {
    /// Desired relative tolerance on the collocation residual (default:
    /// `1e-3`).
    pub tol: Option<f64>,
    /// Tolerance on boundary residuals (default: `tol`).
    pub bc_tol: Option<f64>,
    /// Maximum number of mesh nodes (default: `1000`).
    pub max_nodes: Option<usize>,
    /// Maximum number of solve/refine iterations (default: `10`).
    pub max_iterations: Option<usize>,
}

impl BvpOptions {
    fn tol(&self) -> f64 { self.tol.unwrap_or(DEF_TOL) }

    fn bc_tol(&self) -> f64 { self.bc_tol.unwrap_or_else(|| self.tol()) }

    fn max_nodes(&self) -> usize { self.max_nodes.unwrap_or(DEF_MAX_NODES) }

    fn max_iterations(&self) -> usize {
        self.max_iterations.unwrap_or(DEF_MAX_ITERATIONS)
    }
}

/// Reason for solver termination.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BvpStatus {
    /// The residual and boundary tolerances were met.
    Converged,
    /// Refinement would exceed the maximum number of mesh nodes.
    MaxNodes,
    /// The collocation system had a singular Jacobian.
    Singular,
    /// Boundary conditions were not satisfied within the iteration budget.
    BcTolerance,
}

impl BvpStatus {
    /// Numerical status code.
    pub fn code(&self) -> u8 {
        match self {
            Self::Converged => 0,
            Self::MaxNodes => 1,
            Self::Singular => 2,
            Self::BcTolerance => 3,
        }
    }

    /// Human-readable termination message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Converged =>
                "The algorithm converged to the desired accuracy.",
            Self::MaxNodes =>
                "The maximum number of mesh nodes is exceeded.",
            Self::Singular =>
                "A singular Jacobian encountered when solving the collocation \
                system.",
            Self::BcTolerance =>
                "The solver was unable to satisfy boundary conditions \
                tolerance within the iteration budget.",
        }
    }
}

/// Output of [`solve_bvp`] and [`solve_bvp_params`].
///
/// The solution is produced even when the solver fails to converge; check
/// [`success`][Self::success] before relying on it.
#[derive(Clone, Debug)]
pub struct BvpSolution {
    /// Final mesh.
    pub x: nd::Array1<f64>,
    /// Solution values at the mesh nodes, one row per component.
    pub y: nd::Array2<f64>,
    /// Solution derivatives at the mesh nodes.
    pub yp: nd::Array2<f64>,
    /// Found values of unknown parameters (empty if there are none).
    pub p: nd::Array1<f64>,
    /// RMS relative residual of the continuous solution on each mesh interval.
    pub rms_residuals: nd::Array1<f64>,
    /// Number of completed solve/refine iterations.
    pub niter: usize,
    /// Reason for termination.
    pub status: BvpStatus,
    /// `true` if `status` is [`BvpStatus::Converged`].
    pub success: bool,
    spline: Hermite,
}

impl BvpSolution {
    /// Termination message.
    pub fn message(&self) -> &'static str { self.status.message() }

    /// Evaluate the continuous (cubic) solution at arbitrary points.
    pub fn sol<S>(&self, x: &Arr1<S>) -> nd::Array2<f64>
    where S: nd::Data<Elem = f64>
    {
        self.spline.eval(x)
    }

    /// Evaluate the derivative of the continuous solution at arbitrary points.
    pub fn sol_deriv<S>(&self, x: &Arr1<S>) -> nd::Array2<f64>
    where S: nd::Data<Elem = f64>
    {
        self.spline.eval_deriv(x)
    }

    /// Locate the zeros of one solution component strictly between the
    /// boundaries.
    ///
    /// Only sign changes among interior nodes are counted, so that values
    /// pinned to zero by boundary conditions do not register. Fails with
    /// [`InterpError::Lagrange`][crate::error::InterpError::Lagrange] if there
    /// are fewer than 5 interior nodes.
    ///
    /// *Panics if `comp` is out of range*.
    pub fn nodes(&self, comp: usize) -> InterpResult<Vec<f64>> {
        interior_zeros(&self.x, &self.y.row(comp))
    }

    /// Maximum RMS residual over all intervals.
    pub fn max_rms_residual(&self) -> f64 {
        self.rms_residuals.iter().copied().fold(0.0, f64::max)
    }
}

// zeros of a sampled component strictly between the first and last nodes; a
// component held exactly at zero (e.g. the trivial solution) has none
pub(crate) fn interior_zeros<S, T>(x: &Arr1<S>, y: &Arr1<T>)
    -> InterpResult<Vec<f64>>
where
    S: nd::Data<Elem = f64>,
    T: nd::Data<Elem = f64>,
{
    if y.iter().all(|yk| *yk == 0.0) { return Ok(Vec::new()); }
    let hi = x.len().saturating_sub(1);
    let lo = hi.min(1);
    interp::find_zeros(
        &x.slice(nd::s![lo..hi]),
        &y.slice(nd::s![lo..hi]),
        Zero::All,
    )
}

// collocation quantities for a single mesh
struct Collocation {
    // residuals, shape (n, m - 1)
    res: nd::Array2<f64>,
    // cubic midpoint values, shape (n, m - 1)
    y_middle: nd::Array2<f64>,
    // rhs at nodes, shape (n, m)
    f: nd::Array2<f64>,
    // rhs at midpoints, shape (n, m - 1)
    f_middle: nd::Array2<f64>,
}

fn mesh_diff<S>(x: &Arr1<S>) -> nd::Array1<f64>
where S: nd::Data<Elem = f64>
{
    x.iter().zip(x.iter().skip(1))
        .map(|(xk, xkp1)| *xkp1 - *xk)
        .collect()
}

fn midpoints<S, T>(x: &Arr1<S>, h: &Arr1<T>) -> nd::Array1<f64>
where
    S: nd::Data<Elem = f64>,
    T: nd::Data<Elem = f64>,
{
    x.iter().zip(h).map(|(xk, hk)| xk + 0.5 * hk).collect()
}

// evaluate the collocation residuals for the Lobatto IIIA scheme
//
// the cubic through (y[k], f[k]) and (y[k + 1], f[k + 1]) is evaluated at the
// interval midpoint, and the residual is the difference between the step in y
// and its Simpson's-rule integral
fn collocation<B>(
    sys: &B,
    x: &nd::Array1<f64>,
    h: &nd::Array1<f64>,
    y: &nd::Array2<f64>,
    p: &nd::Array1<f64>,
) -> Collocation
where B: BvpSystem + ?Sized
{
    let m = x.len();
    let f = sys.rhs(x.view(), y.view(), p.view());
    let yl = y.slice(nd::s![.., ..m - 1]);
    let yr = y.slice(nd::s![.., 1..]);
    let fl = f.slice(nd::s![.., ..m - 1]);
    let fr = f.slice(nd::s![.., 1..]);
    let y_middle: nd::Array2<f64>
        = (&yl + &yr) * 0.5 - &(&(&fr - &fl) * &(h * 0.125));
    let x_middle = midpoints(x, h);
    let f_middle = sys.rhs(x_middle.view(), y_middle.view(), p.view());
    let res: nd::Array2<f64>
        = &(&yr - &yl)
        - &(&(&(&fl + &fr) + &(&f_middle * 4.0)) * &(h / 6.0));
    Collocation { res, y_middle, f, f_middle }
}

// rhs Jacobians with respect to y, shape (m, n, n), and p, shape (m, n, k);
// the latter, and the former if the system does not supply it, are estimated
// by forward differences
fn rhs_jacobians<B>(
    sys: &B,
    x: nd::ArrayView1<f64>,
    y: nd::ArrayView2<f64>,
    p: nd::ArrayView1<f64>,
    f0: nd::ArrayView2<f64>,
) -> (nd::Array3<f64>, nd::Array3<f64>)
where B: BvpSystem + ?Sized
{
    let (n, m) = y.dim();
    let k = p.len();
    let eps = f64::EPSILON.sqrt();
    let df_dy
        = sys.rhs_jac(x, y, p)
        .unwrap_or_else(|| {
            let mut df_dy: nd::Array3<f64> = nd::Array3::zeros((m, n, n));
            for j in 0..n {
                let mut y_new = y.to_owned();
                let mut dy: nd::Array1<f64> = nd::Array1::zeros(m);
                y_new.row_mut(j).iter_mut().zip(dy.iter_mut())
                    .for_each(|(yl, dyl)| {
                        let y0 = *yl;
                        *yl += eps * (1.0 + y0.abs());
                        *dyl = *yl - y0;
                    });
                let f_new = sys.rhs(x, y_new.view(), p);
                for l in 0..m {
                    for i in 0..n {
                        df_dy[[l, i, j]] = (f_new[[i, l]] - f0[[i, l]]) / dy[l];
                    }
                }
            }
            df_dy
        });
    let mut df_dp: nd::Array3<f64> = nd::Array3::zeros((m, n, k));
    for j in 0..k {
        let mut p_new = p.to_owned();
        p_new[j] += eps * (1.0 + p[j].abs());
        let dp = p_new[j] - p[j];
        let f_new = sys.rhs(x, y, p_new.view());
        for l in 0..m {
            for i in 0..n {
                df_dp[[l, i, j]] = (f_new[[i, l]] - f0[[i, l]]) / dp;
            }
        }
    }
    (df_dy, df_dp)
}

// forward-difference estimate of the boundary residual Jacobians with respect
// to ya, yb, and p
fn bc_jacobians<B>(
    sys: &B,
    ya: nd::ArrayView1<f64>,
    yb: nd::ArrayView1<f64>,
    p: nd::ArrayView1<f64>,
) -> (nd::Array2<f64>, nd::Array2<f64>, nd::Array2<f64>)
where B: BvpSystem + ?Sized
{
    let n = ya.len();
    let k = p.len();
    let eps = f64::EPSILON.sqrt();
    let bc0 = sys.bc(ya, yb, p);
    let mut dbc_dya: nd::Array2<f64> = nd::Array2::zeros((n + k, n));
    let mut dbc_dyb: nd::Array2<f64> = nd::Array2::zeros((n + k, n));
    let mut dbc_dp: nd::Array2<f64> = nd::Array2::zeros((n + k, k));
    for j in 0..n {
        let mut ya_new = ya.to_owned();
        ya_new[j] += eps * (1.0 + ya[j].abs());
        let d = ya_new[j] - ya[j];
        let bc_new = sys.bc(ya_new.view(), yb, p);
        dbc_dya.column_mut(j).assign(&((&bc_new - &bc0) / d));

        let mut yb_new = yb.to_owned();
        yb_new[j] += eps * (1.0 + yb[j].abs());
        let d = yb_new[j] - yb[j];
        let bc_new = sys.bc(ya, yb_new.view(), p);
        dbc_dyb.column_mut(j).assign(&((&bc_new - &bc0) / d));
    }
    for j in 0..k {
        let mut p_new = p.to_owned();
        p_new[j] += eps * (1.0 + p[j].abs());
        let d = p_new[j] - p[j];
        let bc_new = sys.bc(ya, yb, p_new.view());
        dbc_dp.column_mut(j).assign(&((&bc_new - &bc0) / d));
    }
    (dbc_dya, dbc_dyb, dbc_dp)
}

// assemble the dense Jacobian of the full residual vector (collocation
// residuals, node-major, followed by boundary residuals) with respect to the
// node-major flattened solution followed by the parameters
fn global_jac<B>(
    sys: &B,
    x: &nd::Array1<f64>,
    h: &nd::Array1<f64>,
    y: &nd::Array2<f64>,
    p: &nd::Array1<f64>,
    col: &Collocation,
) -> nd::Array2<f64>
where B: BvpSystem + ?Sized
{
    let (n, m) = y.dim();
    let k = p.len();
    let x_middle = midpoints(x, h);
    let (df_dy, df_dp)
        = rhs_jacobians(sys, x.view(), y.view(), p.view(), col.f.view());
    let (df_dy_middle, df_dp_middle)
        = rhs_jacobians(
            sys,
            x_middle.view(),
            col.y_middle.view(),
            p.view(),
            col.f_middle.view(),
        );
    let (dbc_dya, dbc_dyb, dbc_dp)
        = bc_jacobians(sys, y.column(0), y.column(m - 1), p.view());

    let nm = n * m;
    let size = nm + k;
    let eye: nd::Array2<f64> = nd::Array2::eye(n);
    let mut jac: nd::Array2<f64> = nd::Array2::zeros((size, size));
    for (l, &hl) in h.iter().enumerate() {
        let jl = df_dy.index_axis(nd::Axis(0), l);
        let jr = df_dy.index_axis(nd::Axis(0), l + 1);
        let jm = df_dy_middle.index_axis(nd::Axis(0), l);
        let jm2 = &jm * 2.0;
        let dphi_dyl: nd::Array2<f64>
            = -&eye
            - &((&jl + &jm2) * (hl / 6.0))
            - &(jm.dot(&jl) * (hl * hl / 12.0));
        let dphi_dyr: nd::Array2<f64>
            = &eye
            - &((&jr + &jm2) * (hl / 6.0))
            + &(jm.dot(&jr) * (hl * hl / 12.0));
        let rows = l * n..(l + 1) * n;
        jac.slice_mut(nd::s![rows.clone(), l * n..(l + 1) * n])
            .assign(&dphi_dyl);
        jac.slice_mut(nd::s![rows.clone(), (l + 1) * n..(l + 2) * n])
            .assign(&dphi_dyr);
        if k > 0 {
            let pl = df_dp.index_axis(nd::Axis(0), l);
            let pr = df_dp.index_axis(nd::Axis(0), l + 1);
            let pm = df_dp_middle.index_axis(nd::Axis(0), l);
            let t = jm.dot(&(&pl - &pr));
            let dphi_dp: nd::Array2<f64>
                = (&(&(&pl + &pr) + &(&pm * 4.0)) + &(t * (0.5 * hl)))
                * (-hl / 6.0);
            jac.slice_mut(nd::s![rows, nm..size]).assign(&dphi_dp);
        }
    }
    let rows = nm - n..size;
    jac.slice_mut(nd::s![rows.clone(), 0..n]).assign(&dbc_dya);
    jac.slice_mut(nd::s![rows.clone(), nm - n..nm]).assign(&dbc_dyb);
    if k > 0 {
        jac.slice_mut(nd::s![rows, nm..size]).assign(&dbc_dp);
    }
    jac
}

// flatten collocation and boundary residuals into a single vector, node-major
fn flat_residual(col_res: &nd::Array2<f64>, bc_res: &nd::Array1<f64>)
    -> nd::Array1<f64>
{
    col_res.t().iter().chain(bc_res.iter()).copied().collect()
}

// split a step in the flattened unknowns into solution and parameter parts
fn unflatten(step: &nd::Array1<f64>, n: usize, m: usize)
    -> (nd::Array2<f64>, nd::Array1<f64>)
{
    let y_step = nd::Array2::from_shape_fn((n, m), |(i, l)| step[l * n + i]);
    let p_step = step.slice(nd::s![n * m..]).to_owned();
    (y_step, p_step)
}

fn max_abs<S, D>(a: &nd::ArrayBase<S, D>) -> f64
where
    S: nd::Data<Elem = f64>,
    D: nd::Dimension,
{
    a.iter().fold(0.0, |acc, ak| acc.max(ak.abs()))
}

// result of the Newton solve on a fixed mesh
struct Newton {
    y: nd::Array2<f64>,
    p: nd::Array1<f64>,
    singular: bool,
}

// solve the collocation system on a fixed mesh with a damped Newton method
//
// the Jacobian is only recomputed when a full step fails the Armijo test
fn solve_newton<B>(
    sys: &B,
    x: &nd::Array1<f64>,
    h: &nd::Array1<f64>,
    mut y: nd::Array2<f64>,
    mut p: nd::Array1<f64>,
    tol: f64,
    bc_tol: f64,
) -> Newton
where B: BvpSystem + ?Sized
{
    let (n, m) = y.dim();
    let tol_r: nd::Array1<f64> = h * (2.0 / 3.0 * 5e-2 * tol);
    let mut col = collocation(sys, x, h, &y, &p);
    let mut bc_res = sys.bc(y.column(0), y.column(m - 1), p.view());
    let mut res = flat_residual(&col.res, &bc_res);

    let mut njev: usize = 0;
    let mut lu = None;
    let mut step: nd::Array1<f64> = nd::Array1::zeros(res.len());
    let mut cost: f64 = 0.0;
    let mut recompute_jac = true;
    for _ in 0..NEWTON_MAX_ITER {
        if recompute_jac {
            let jac = global_jac(sys, x, h, &y, &p, &col);
            njev += 1;
            let Ok(factorized) = jac.factorize_into() else {
                return Newton { y, p, singular: true };
            };
            step = match factorized.solve(&res) {
                Ok(s) if s.iter().all(|sk| sk.is_finite()) => s,
                _ => return Newton { y, p, singular: true },
            };
            cost = step.dot(&step);
            lu = Some(factorized);
        }
        let Some(factorized) = lu.as_ref() else {
            return Newton { y, p, singular: true };
        };

        let (y_step, p_step) = unflatten(&step, n, m);
        let mut alpha: f64 = 1.0;
        let mut trial: usize = 0;
        let (y_new, p_new, step_new, cost_new)
            = loop {
                let y_trial = &y - &(&y_step * alpha);
                let p_trial = &p - &(&p_step * alpha);
                col = collocation(sys, x, h, &y_trial, &p_trial);
                bc_res
                    = sys.bc(
                        y_trial.column(0), y_trial.column(m - 1), p_trial.view());
                res = flat_residual(&col.res, &bc_res);
                let Ok(step_trial) = factorized.solve(&res) else {
                    return Newton { y: y_trial, p: p_trial, singular: true };
                };
                let cost_trial = step_trial.dot(&step_trial);
                if cost_trial < (1.0 - 2.0 * alpha * ARMIJO_SIGMA) * cost
                    || trial == BACKTRACK_TRIALS
                {
                    break (y_trial, p_trial, step_trial, cost_trial);
                }
                alpha *= BACKTRACK_TAU;
                trial += 1;
            };
        y = y_new;
        p = p_new;

        if njev == NEWTON_MAX_NJEV { break; }
        let col_converged
            = nd::Zip::from(&col.res).and(&col.f_middle)
            .and_broadcast(&tol_r)
            .all(|r, fm, tr| r.abs() < tr * (1.0 + fm.abs()));
        if col_converged && max_abs(&bc_res) < bc_tol { break; }

        if alpha == 1.0 {
            step = step_new;
            cost = cost_new;
            recompute_jac = false;
        } else {
            recompute_jac = true;
        }
    }
    Newton { y, p, singular: false }
}

// RMS of the relative residual of the continuous solution on each interval,
// integrated with 5-point Lobatto quadrature; the endpoint contributions
// vanish by construction
fn estimate_rms_residuals<B>(
    sys: &B,
    spline: &Hermite,
    x: &nd::Array1<f64>,
    h: &nd::Array1<f64>,
    p: &nd::Array1<f64>,
    r_middle: nd::Array2<f64>,
    f_middle: &nd::Array2<f64>,
) -> nd::Array1<f64>
where B: BvpSystem + ?Sized
{
    let x_middle = midpoints(x, h);
    let s: nd::Array1<f64> = h * (0.5 * (3.0_f64 / 7.0).sqrt());
    let x1 = &x_middle + &s;
    let x2 = &x_middle - &s;

    let rel_sq = |xq: &nd::Array1<f64>| -> nd::Array1<f64> {
        let yq = spline.eval(xq);
        let ypq = spline.eval_deriv(xq);
        let fq = sys.rhs(xq.view(), yq.view(), p.view());
        let r = (&ypq - &fq) / &fq.mapv(|fk| 1.0 + fk.abs());
        r.mapv(|rk| rk * rk).sum_axis(nd::Axis(0))
    };
    let r1 = rel_sq(&x1);
    let r2 = rel_sq(&x2);
    let rm
        = (r_middle / &f_middle.mapv(|fk| 1.0 + fk.abs()))
        .mapv(|rk| rk * rk)
        .sum_axis(nd::Axis(0));
    nd::Zip::from(&rm).and(&r1).and(&r2)
        .map_collect(|rmk, r1k, r2k| {
            (0.5 * (32.0 / 45.0 * rmk + 49.0 / 90.0 * (r1k + r2k))).sqrt()
        })
}

// insert one node at the midpoint of intervals in `insert_1` and two nodes
// splitting intervals in `insert_2` into thirds
fn modify_mesh(x: &nd::Array1<f64>, insert_1: &[usize], insert_2: &[usize])
    -> nd::Array1<f64>
{
    let mut new: Vec<f64>
        = Vec::with_capacity(x.len() + insert_1.len() + 2 * insert_2.len());
    new.extend(x.iter().copied());
    new.extend(insert_1.iter().map(|&l| 0.5 * (x[l] + x[l + 1])));
    insert_2.iter()
        .for_each(|&l| {
            new.push((2.0 * x[l] + x[l + 1]) / 3.0);
            new.push((x[l] + 2.0 * x[l + 1]) / 3.0);
        });
    new.sort_by(f64::total_cmp);
    nd::Array1::from(new)
}

fn check_inputs<B, S, T, U>(
    sys: &B,
    x: &Arr1<S>,
    y: &Arr2<T>,
    p: &Arr1<U>,
    opts: &BvpOptions,
) -> BvpResult<()>
where
    B: BvpSystem + ?Sized,
    S: nd::Data<Elem = f64>,
    T: nd::Data<Elem = f64>,
    U: nd::Data<Elem = f64>,
{
    let n = sys.ncomp();
    let k = sys.nparam();
    let m = x.len();
    BvpError::check_mesh(x)?;
    BvpError::check_tol(opts.tol())?;
    BvpError::check_tol(opts.bc_tol())?;
    if y.dim() != (n, m) {
        return Err(BvpError::GuessShape(n, m, y.nrows(), y.ncols()));
    }
    if p.len() != k { return Err(BvpError::ParamLength(k, p.len())); }
    if opts.max_nodes() < m {
        return Err(BvpError::BadMaxNodes(opts.max_nodes(), m));
    }
    let f = sys.rhs(x.view(), y.view(), p.view());
    if f.dim() != (n, m) {
        return Err(BvpError::RhsShape(n, m, f.nrows(), f.ncols()));
    }
    let bc = sys.bc(y.column(0), y.column(m - 1), p.view());
    if bc.len() != n + k { return Err(BvpError::BcLength(n + k, bc.len())); }
    Ok(())
}

/// Solve a boundary value problem with no unknown parameters.
///
/// `x` is the initial mesh (strictly increasing, with the boundary points as
/// its first and last elements) and `y` is the initial guess, with one row per
/// component and one column per mesh node.
///
/// Returns `Err` only for malformed input. Non-convergence is reported through
/// [`BvpSolution::status`] and [`BvpSolution::success`].
pub fn solve_bvp<B, S, T>(sys: &B, x: &Arr1<S>, y: &Arr2<T>, opts: BvpOptions)
    -> BvpResult<BvpSolution>
where
    B: BvpSystem + ?Sized,
    S: nd::Data<Elem = f64>,
    T: nd::Data<Elem = f64>,
{
    let p: nd::Array1<f64> = nd::Array1::zeros(0);
    solve_bvp_params(sys, x, y, &p, opts)
}

/// Solve a boundary value problem with unknown parameters, starting from the
/// initial parameter guess `p`.
///
/// See [`solve_bvp`].
pub fn solve_bvp_params<B, S, T, U>(
    sys: &B,
    x: &Arr1<S>,
    y: &Arr2<T>,
    p: &Arr1<U>,
    opts: BvpOptions,
) -> BvpResult<BvpSolution>
where
    B: BvpSystem + ?Sized,
    S: nd::Data<Elem = f64>,
    T: nd::Data<Elem = f64>,
    U: nd::Data<Elem = f64>,
{
    check_inputs(sys, x, y, p, &opts)?;
    let mut tol = opts.tol();
    if tol < 100.0 * f64::EPSILON {
        log::warn!(
            "bvp::solve_bvp: tol {:.2e} is too small; setting to {:.2e}",
            tol, 100.0 * f64::EPSILON,
        );
        tol = 100.0 * f64::EPSILON;
    }
    let bc_tol = opts.bc_tol();
    let max_nodes = opts.max_nodes();
    let max_iterations = opts.max_iterations();

    let mut x: nd::Array1<f64> = x.to_owned();
    let mut y: nd::Array2<f64> = y.to_owned();
    let mut p: nd::Array1<f64> = p.to_owned();
    let mut h = mesh_diff(&x);
    let mut niter: usize = 0;

    let (status, col, spline, rms_residuals)
        = loop {
            let m = x.len();
            let newton = solve_newton(sys, &x, &h, y, p, tol, bc_tol);
            y = newton.y;
            p = newton.p;
            niter += 1;

            let col = collocation(sys, &x, &h, &y, &p);
            let bc_res = sys.bc(y.column(0), y.column(m - 1), p.view());
            let max_bc_res = max_abs(&bc_res);
            let r_middle: nd::Array2<f64>
                = &col.res * &(h.mapv(f64::recip) * 1.5);
            let spline = interp::hermite_from(&x, &y, &col.f)?;
            let rms_res
                = estimate_rms_residuals(
                    sys, &spline, &x, &h, &p, r_middle, &col.f_middle);
            let max_rms_res = rms_res.iter().copied().fold(0.0, f64::max);

            if newton.singular {
                break (BvpStatus::Singular, col, spline, rms_res);
            }

            let insert_1: Vec<usize>
                = rms_res.iter().enumerate()
                .filter(|(_, r)| **r > tol && **r < 100.0 * tol)
                .map(|(l, _)| l)
                .collect();
            let insert_2: Vec<usize>
                = rms_res.iter().enumerate()
                .filter(|(_, r)| **r >= 100.0 * tol)
                .map(|(l, _)| l)
                .collect();
            let nodes_added = insert_1.len() + 2 * insert_2.len();
            if m + nodes_added > max_nodes {
                break (BvpStatus::MaxNodes, col, spline, rms_res);
            }
            log::debug!(
                "bvp::solve_bvp: iteration {}: max residual {:.2e}, max bc \
                residual {:.2e}, total nodes {}, nodes added {}",
                niter, max_rms_res, max_bc_res, m, nodes_added,
            );

            if nodes_added > 0 {
                x = modify_mesh(&x, &insert_1, &insert_2);
                h = mesh_diff(&x);
                y = spline.eval(&x);
            } else if max_bc_res <= bc_tol {
                break (BvpStatus::Converged, col, spline, rms_res);
            } else if niter >= max_iterations {
                break (BvpStatus::BcTolerance, col, spline, rms_res);
            }
        };

    log::debug!("bvp::solve_bvp: {} ({} iterations)", status.message(), niter);
    Ok(BvpSolution {
        x,
        y,
        yp: col.f,
        p,
        rms_residuals,
        niter,
        status,
        success: status == BvpStatus::Converged,
        spline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{ FRAC_PI_2, PI };
    use crate::error::{ InterpError, LagrangeError };

    fn harmonic() -> FnSystem<
        impl Fn(nd::ArrayView1<f64>, nd::ArrayView2<f64>) -> nd::Array2<f64>,
        impl Fn(nd::ArrayView1<f64>, nd::ArrayView1<f64>) -> nd::Array1<f64>,
    > {
        FnSystem::new(
            2,
            |_x, y| nd::stack![nd::Axis(0), y.row(1), y.row(0).mapv(|yk| -yk)],
            |ya, yb| nd::array![ya[0], yb[0] - 1.0],
        )
    }

    // y'' = -λ y with y(0) = y(π) = 0, y'(0) = 1; eigenvalues λ = j²
    struct Sturm;

    impl BvpSystem for Sturm {
        fn ncomp(&self) -> usize { 2 }

        fn nparam(&self) -> usize { 1 }

        fn rhs(
            &self,
            _x: nd::ArrayView1<f64>,
            y: nd::ArrayView2<f64>,
            p: nd::ArrayView1<f64>,
        ) -> nd::Array2<f64>
        {
            nd::stack![nd::Axis(0), y.row(1), y.row(0).mapv(|yk| -p[0] * yk)]
        }

        fn bc(
            &self,
            ya: nd::ArrayView1<f64>,
            yb: nd::ArrayView1<f64>,
            _p: nd::ArrayView1<f64>,
        ) -> nd::Array1<f64>
        {
            nd::array![ya[0], yb[0], ya[1] - 1.0]
        }
    }

    #[test]
    fn collocation_residual_vanishes_for_exact_cubic() {
        // y' = 3x², y = x³ is reproduced exactly by the Lobatto IIIA cubic
        let sys = FnSystem::new(
            1,
            |x, _y| x.mapv(|xk| 3.0 * xk * xk).insert_axis(nd::Axis(0)),
            |ya, _yb| nd::array![ya[0]],
        );
        let x: nd::Array1<f64> = nd::Array1::linspace(0.0, 2.0, 7);
        let h = mesh_diff(&x);
        let y = x.mapv(|xk| xk.powi(3)).insert_axis(nd::Axis(0));
        let col = collocation(&sys, &x, &h, &y, &nd::Array1::zeros(0));
        assert!(max_abs(&col.res) < 1e-12);
    }

    #[test]
    fn global_jac_matches_finite_difference() {
        let x: nd::Array1<f64> = nd::Array1::linspace(0.0, 1.0, 4);
        let h = mesh_diff(&x);
        let y = nd::stack![nd::Axis(0), x.mapv(|xk| xk + 0.3), x.mapv(f64::cos)];
        let p: nd::Array1<f64> = nd::array![2.5];
        let col = collocation(&Sturm, &x, &h, &y, &p);
        let jac = global_jac(&Sturm, &x, &h, &y, &p, &col);
        assert_eq!(jac.dim(), (9, 9));
        let residual = |y: &nd::Array2<f64>, p: &nd::Array1<f64>| {
            let col = collocation(&Sturm, &x, &h, y, p);
            flat_residual(&col.res, &Sturm.bc(y.column(0), y.column(3), p.view()))
        };
        let res0 = residual(&y, &p);
        let d = 1e-7;
        for l in 0..4 {
            for i in 0..2 {
                let mut yd = y.clone();
                yd[[i, l]] += d;
                let fd = (&residual(&yd, &p) - &res0) / d;
                fd.iter().zip(jac.column(l * 2 + i))
                    .for_each(|(a, b)| assert!((a - b).abs() < 1e-5, "{a} vs {b}"));
            }
        }
        let pd = &p + d;
        let fd = (&residual(&y, &pd) - &res0) / d;
        fd.iter().zip(jac.column(8))
            .for_each(|(a, b)| assert!((a - b).abs() < 1e-5, "{a} vs {b}"));
    }

    #[test]
    fn solves_harmonic_oscillator() {
        let sys = harmonic();
        let x: nd::Array1<f64> = nd::Array1::linspace(0.0, FRAC_PI_2, 11);
        let y: nd::Array2<f64> = nd::Array2::zeros((2, 11));
        let sol = solve_bvp(&sys, &x, &y, BvpOptions::default()).unwrap();
        assert!(sol.success, "{}", sol.message());
        assert_eq!(sol.status.code(), 0);
        assert!(sol.p.is_empty());
        sol.x.iter().zip(sol.y.row(0))
            .for_each(|(xk, yk)| assert!((yk - xk.sin()).abs() < 1e-3));
        sol.x.iter().zip(sol.yp.row(0))
            .for_each(|(xk, dyk)| assert!((dyk - xk.cos()).abs() < 1e-3));
        let t: nd::Array1<f64> = nd::array![0.123, 0.777, 1.4];
        let interp = sol.sol(&t);
        t.iter().zip(interp.row(0))
            .for_each(|(tk, yk)| assert!((yk - tk.sin()).abs() < 1e-3));
        assert!(sol.max_rms_residual() < 1e-3);
    }

    #[test]
    fn solves_bratu_lower_branch() {
        let sys = FnSystem::new(
            2,
            |_x, y| nd::stack![nd::Axis(0), y.row(1), y.row(0).mapv(|yk| -yk.exp())],
            |ya, yb| nd::array![ya[0], yb[0]],
        );
        let x: nd::Array1<f64> = nd::Array1::linspace(0.0, 1.0, 5);
        let y: nd::Array2<f64> = nd::Array2::zeros((2, 5));
        let sol = solve_bvp(&sys, &x, &y, BvpOptions::default()).unwrap();
        assert!(sol.success, "{}", sol.message());
        let mid = sol.sol(&nd::array![0.5]);
        assert!((mid[[0, 0]] - 0.140539).abs() < 1e-3);
    }

    #[test]
    fn finds_sturm_liouville_eigenvalue() {
        // start near the second eigenvalue with a guess having one node
        let x: nd::Array1<f64> = nd::Array1::linspace(0.0, PI, 21);
        let y = nd::stack![
            nd::Axis(0),
            x.mapv(|xk| (2.0 * xk).sin() / 2.0),
            x.mapv(|xk| (2.0 * xk).cos())
        ];
        let p: nd::Array1<f64> = nd::array![3.5];
        let sol = solve_bvp_params(&Sturm, &x, &y, &p, BvpOptions::default())
            .unwrap();
        assert!(sol.success, "{}", sol.message());
        assert!((sol.p[0] - 4.0).abs() < 1e-3, "{}", sol.p[0]);
        let nodes = sol.nodes(0).unwrap();
        assert_eq!(nodes.len(), 1);
        assert!((nodes[0] - FRAC_PI_2).abs() < 1e-2);
    }

    #[test]
    fn refines_boundary_layer() {
        let k: f64 = 10.0;
        let sys = FnSystem::new(
            2,
            move |_x, y| nd::stack![nd::Axis(0), y.row(1), y.row(0).mapv(|yk| k * k * yk)],
            |ya, yb| nd::array![ya[0] - 1.0, yb[0]],
        );
        let x: nd::Array1<f64> = nd::Array1::linspace(0.0, 1.0, 5);
        let y: nd::Array2<f64> = nd::Array2::zeros((2, 5));
        let sol = solve_bvp(&sys, &x, &y, BvpOptions::default()).unwrap();
        assert!(sol.success, "{}", sol.message());
        assert!(sol.x.len() > 5);
        let exact = |xk: f64| (k * (1.0 - xk)).sinh() / k.sinh();
        sol.x.iter().zip(sol.y.row(0))
            .for_each(|(xk, yk)| assert!((yk - exact(*xk)).abs() < 1e-2));
    }

    #[test]
    fn reports_node_budget_exhaustion() {
        let k: f64 = 10.0;
        let sys = FnSystem::new(
            2,
            move |_x, y| nd::stack![nd::Axis(0), y.row(1), y.row(0).mapv(|yk| k * k * yk)],
            |ya, yb| nd::array![ya[0] - 1.0, yb[0]],
        );
        let x: nd::Array1<f64> = nd::Array1::linspace(0.0, 1.0, 5);
        let y: nd::Array2<f64> = nd::Array2::zeros((2, 5));
        let opts = BvpOptions { max_nodes: Some(5), ..Default::default() };
        let sol = solve_bvp(&sys, &x, &y, opts).unwrap();
        assert_eq!(sol.status, BvpStatus::MaxNodes);
        assert_eq!(sol.status.code(), 1);
        assert!(!sol.success);
        assert_eq!(sol.x.len(), 5);
    }

    #[test]
    fn reports_singular_jacobian() {
        let sys = FnSystem::new(
            2,
            |_x, y| nd::stack![nd::Axis(0), y.row(1), y.row(0).mapv(|yk| -yk)],
            |ya, _yb| nd::array![ya[0] - 1.0, 0.0],
        );
        let x: nd::Array1<f64> = nd::Array1::linspace(0.0, 1.0, 5);
        let y: nd::Array2<f64> = nd::Array2::zeros((2, 5));
        let sol = solve_bvp(&sys, &x, &y, BvpOptions::default()).unwrap();
        assert_eq!(sol.status, BvpStatus::Singular);
        assert!(!sol.success);
    }

    #[test]
    fn reports_unsatisfied_boundary_condition() {
        // y' = 0 with exp(y(0)) = 0 has no solution; every Newton step only
        // lowers y, and the residual stays far above bc_tol
        let sys = FnSystem::new(
            1,
            |x, _y| nd::Array2::zeros((1, x.len())),
            |ya, _yb| nd::array![ya[0].exp()],
        );
        let x: nd::Array1<f64> = nd::Array1::linspace(0.0, 1.0, 5);
        let y: nd::Array2<f64> = nd::Array2::zeros((1, 5));
        let opts = BvpOptions {
            bc_tol: Some(1e-12),
            max_iterations: Some(1),
            ..Default::default()
        };
        let sol = solve_bvp(&sys, &x, &y, opts).unwrap();
        assert_eq!(sol.status, BvpStatus::BcTolerance);
        assert_eq!(sol.status.code(), 3);
        assert!(!sol.success);
        assert_eq!(sol.niter, 1);
        assert_eq!(sol.x.len(), 5);
        assert!(sol.y.iter().all(|yk| *yk < 0.0 && *yk > -20.0));
    }

    #[test]
    fn interior_zeros_skip_trivial_and_report_short_meshes() {
        let x: nd::Array1<f64> = nd::Array1::linspace(0.0, 1.0, 9);
        let zero: nd::Array1<f64> = nd::Array1::zeros(9);
        assert!(interior_zeros(&x, &zero).unwrap().is_empty());

        // boundary values pinned at zero are not interior zeros
        let y = x.mapv(|xk| (2.0 * PI * xk).sin());
        let zeros = interior_zeros(&x, &y).unwrap();
        assert_eq!(zeros.len(), 1);
        assert!((zeros[0] - 0.5).abs() < 1e-6);

        let x: nd::Array1<f64> = nd::Array1::linspace(0.0, 1.0, 5);
        let y: nd::Array1<f64> = nd::array![0.0, -1.0, 0.5, 1.0, 0.0];
        assert!(matches!(
            interior_zeros(&x, &y),
            Err(InterpError::Lagrange(LagrangeError(3))),
        ));
    }

    #[test]
    fn rejects_malformed_input() {
        let sys = harmonic();
        let x: nd::Array1<f64> = nd::array![0.0, 0.5, 0.5, 1.0];
        let y: nd::Array2<f64> = nd::Array2::zeros((2, 4));
        assert!(matches!(
            solve_bvp(&sys, &x, &y, BvpOptions::default()),
            Err(BvpError::MeshNotIncreasing(2)),
        ));

        let x: nd::Array1<f64> = nd::Array1::linspace(0.0, 1.0, 4);
        let y: nd::Array2<f64> = nd::Array2::zeros((2, 3));
        assert!(matches!(
            solve_bvp(&sys, &x, &y, BvpOptions::default()),
            Err(BvpError::GuessShape(2, 4, 2, 3)),
        ));

        let y: nd::Array2<f64> = nd::Array2::zeros((2, 4));
        let opts = BvpOptions { tol: Some(-1.0), ..Default::default() };
        assert!(matches!(
            solve_bvp(&sys, &x, &y, opts),
            Err(BvpError::BadTolerance(_)),
        ));

        assert!(matches!(
            solve_bvp(&Sturm, &x, &y, BvpOptions::default()),
            Err(BvpError::ParamLength(1, 0)),
        ));

        let x: nd::Array1<f64> = nd::array![0.0];
        let y: nd::Array2<f64> = nd::Array2::zeros((2, 1));
        assert!(matches!(
            solve_bvp(&sys, &x, &y, BvpOptions::default()),
            Err(BvpError::TooFewNodes(1)),
        ));
    }

    #[test]
    fn mesh_insertion() {
        let x: nd::Array1<f64> = nd::array![0.0, 1.0, 2.0, 3.0];
        let new = modify_mesh(&x, &[0], &[2]);
        let expected: nd::Array1<f64>
            = nd::array![0.0, 0.5, 1.0, 2.0, 7.0 / 3.0, 8.0 / 3.0, 3.0];
        new.iter().zip(&expected)
            .for_each(|(a, b)| assert!((a - b).abs() < 1e-15));
    }
}
