//! Collection of all error types.
//!
//! All errors derive [`thiserror::Error`], making them composable when allowed
//! and compatible with application code using [`anyhow`][anyhow].
//!
//! [anyhow]: https://crates.io/crates/anyhow

use ndarray as nd;
use thiserror::Error;

/// Returned when an operation requiring equal-length arrays encounters arrays
/// with unequal length.
#[derive(Debug, Error)]
#[error("encountered arrays with incompatible lengths; got {0} and {1}")]
pub struct LengthError(pub usize, pub usize);

impl LengthError {
    pub(crate) fn check<S, A, T, B>(
        a: &nd::ArrayBase<S, nd::Ix1>,
        b: &nd::ArrayBase<T, nd::Ix1>,
    ) -> Result<(), Self>
    where
        S: nd::Data<Elem = A>,
        T: nd::Data<Elem = B>,
    {
        let na = a.len();
        let nb = b.len();
        (na == nb).then_some(()).ok_or(Self(na, nb))
    }
}

/// Returned from a call to [`find_zeros`][crate::interp::find_zeros] when data
/// arrays are less than 5 elements long.
#[derive(Debug, Error)]
#[error("coordinate arrays in interpolation must be longer than 4 elements; got {0}")]
pub struct LagrangeError(pub usize);

impl LagrangeError {
    pub(crate) fn check<S, A>(a: &nd::ArrayBase<S, nd::Ix1>)
        -> Result<(), Self>
    where S: nd::Data<Elem = A>
    {
        let n = a.len();
        (n > 4).then_some(()).ok_or(Self(n))
    }
}

/// Returned from functions in [`interp`][crate::interp].
#[derive(Debug, Error)]
pub enum InterpError {
    /// [`LengthError`]
    #[error("length error: {0}")]
    Length(#[from] LengthError),

    /// [`LagrangeError`]
    #[error("lagrange error: {0}")]
    Lagrange(#[from] LagrangeError),

    /// Returned when interpolation nodes number fewer than 2 or are not
    /// strictly increasing.
    #[error("interpolation nodes must be at least 2 and strictly increasing; failed at index {0}")]
    BadNodes(usize),

    /// Returned when sampled values and derivatives do not have one column per
    /// node.
    #[error("sampled data must have {0} columns; got shapes {1:?} and {2:?}")]
    Shape(usize, (usize, usize), (usize, usize)),
}

impl InterpError {
    pub(crate) fn check_nodes<S>(x: &nd::ArrayBase<S, nd::Ix1>)
        -> Result<(), Self>
    where S: nd::Data<Elem = f64>
    {
        if x.len() < 2 { return Err(Self::BadNodes(0)); }
        x.iter().zip(x.iter().skip(1)).enumerate()
            .find(|(_, (xk, xkp1))| !(*xkp1 > *xk))
            .map_or(Ok(()), |(k, _)| Err(Self::BadNodes(k + 1)))
    }
}

/// Returned from [`solve_bvp`][crate::bvp::solve_bvp] when the problem is
/// malformed.
///
/// Failure to converge on a well-formed problem is not an error; see
/// [`BvpStatus`][crate::bvp::BvpStatus].
#[derive(Debug, Error)]
pub enum BvpError {
    /// Returned when a non-positive tolerance is encountered.
    #[error("tolerances must be greater than 0; got {0}")]
    BadTolerance(f64),

    /// Returned when a node budget smaller than the initial mesh is given.
    #[error("max_nodes must be at least the initial mesh size {1}; got {0}")]
    BadMaxNodes(usize, usize),

    /// Returned when the initial mesh has fewer than two nodes.
    #[error("initial mesh must have at least 2 nodes; got {0}")]
    TooFewNodes(usize),

    /// Returned when the initial mesh is not strictly increasing.
    #[error("initial mesh must be strictly increasing; failed at index {0}")]
    MeshNotIncreasing(usize),

    /// Returned when the initial guess does not have one column per mesh
    /// node.
    #[error("initial guess must have shape ({0}, {1}); got ({2}, {3})")]
    GuessShape(usize, usize, usize, usize),

    /// Returned when the initial parameter guess has the wrong number of
    /// elements.
    #[error("initial parameter guess must have {0} elements; got {1}")]
    ParamLength(usize, usize),

    /// Returned when the boundary residual has the wrong number of elements.
    #[error("boundary residual must have {0} elements; got {1}")]
    BcLength(usize, usize),

    /// Returned when a right-hand side evaluation returns the wrong shape.
    #[error("right-hand side must return shape ({0}, {1}); got ({2}, {3})")]
    RhsShape(usize, usize, usize, usize),

    /// Returned when a depth solve is seeded with a guess whose slope at the
    /// inner boundary is zero or not finite.
    #[error("initial guess must have a nonzero, finite slope at the inner boundary; got {0}")]
    BadSlope(f64),

    /// [`InterpError`]
    #[error("interpolation error: {0}")]
    Interp(#[from] InterpError),
}

impl BvpError {
    pub(crate) fn check_tol(tol: f64) -> Result<(), Self> {
        (tol > 0.0).then_some(()).ok_or(Self::BadTolerance(tol))
    }

    pub(crate) fn check_mesh<S>(x: &nd::ArrayBase<S, nd::Ix1>)
        -> Result<(), Self>
    where S: nd::Data<Elem = f64>
    {
        if x.len() < 2 { return Err(Self::TooFewNodes(x.len())); }
        x.iter().zip(x.iter().skip(1)).enumerate()
            .find(|(_, (xk, xkp1))| !(*xkp1 > *xk))
            .map_or(Ok(()), |(k, _)| Err(Self::MeshNotIncreasing(k + 1)))
    }
}

/// Returned from shooting and well-depth search functions in
/// [`shoot`][crate::shoot].
#[derive(Debug, Error)]
pub enum ShootError {
    /// Returned when a non-positive `epsilon` value is encountered.
    #[error("epsilon values must be greater than 0; got {0}")]
    BadEpsilon(f64),

    /// Returned when a non-positive `maxiters` value is encountered.
    #[error("maxiters must be greater than 0; got {0}")]
    BadMaxiters(usize),

    /// Returned when fewer than two integration steps are requested.
    #[error("shooting requires at least 2 steps; got {0}")]
    BadSteps(usize),

    /// Returned when the initial level search fails to reach the desired node
    /// count in [`fit_depth`][crate::shoot::fit_depth].
    #[error("shoot::fit_depth: FATAL: level search failed to find the correct depth interval; node counts at bounds were {0} and {1}")]
    DepthLevel(usize, usize),
}

impl ShootError {
    pub(crate) fn check_epsilon(epsilon: f64) -> Result<(), Self> {
        (epsilon > 0.0).then_some(()).ok_or(Self::BadEpsilon(epsilon))
    }

    pub(crate) fn check_maxiters(maxiters: usize) -> Result<(), Self> {
        (maxiters != 0).then_some(()).ok_or(Self::BadMaxiters(maxiters))
    }

    pub(crate) fn check_steps(steps: usize) -> Result<(), Self> {
        (steps >= 2).then_some(()).ok_or(Self::BadSteps(steps))
    }
}

/// Returned from [`plot`][crate::plot] functions.
#[derive(Debug, Error)]
pub enum PlotError {
    /// Returned when the output path has an extension other than `png` or
    /// `svg`.
    #[error("unsupported output format {0:?}; expected png or svg")]
    Format(String),

    /// Returned when a series to be drawn is empty or has mismatched lengths.
    #[error("array length error: {0}")]
    Length(#[from] LengthError),

    /// Returned when there is nothing to draw.
    #[error("cannot plot an empty series")]
    Empty,

    /// Errors raised by the drawing backend, stringified.
    #[error("drawing error: {0}")]
    Drawing(String),
}
