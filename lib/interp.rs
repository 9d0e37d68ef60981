//! Interpolation of array-sampled (continuous) functions: piecewise cubic
//! Hermite interpolation for vector-valued solutions, and zero finding via
//! Lagrange interpolation.
//!
//! ```
//! use ndarray as nd;
//! use deuteron::interp::{ Zero, find_zeros };
//!
//! let x: nd::Array1<f64> = nd::Array::linspace(0.5, 10.0, 1000);
//! let y = x.mapv(f64::sin);
//! let zeros = find_zeros(&x, &y, Zero::All).unwrap();
//! assert_eq!(zeros.len(), 3);
//! assert!(
//!     [1.0, 2.0, 3.0].into_iter()
//!         .zip(zeros)
//!         .all(|(n, computed)| (computed - n * std::f64::consts::PI).abs() < 1e-6)
//! )
//! ```

use std::cmp;
use ndarray as nd;
use num_traits::Num;
use crate::{ Arr1, Arr2, error::* };

pub type InterpResult<T> = Result<T, InterpError>;

/// Specifies a set of zeros to look for in [`find_zeros`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Zero {
    /// Points at which a function changes from positive to negative.
    Falling,
    /// Points at which a function changes from negative to positive.
    Rising,
    /// Either/both of the above.
    All,
}

impl Zero {
    fn matches<A>(&self, a: &A, b: &A) -> bool
    where A: PartialEq + PartialOrd
    {
        match self {
            Self::Falling if a > b => true,
            Self::Rising if a < b => true,
            Self::All if a != b => true,
            _ => false,
        }
    }
}

/// Compute the value of a sampled function via a Lagrange polynomial.
pub fn lagrange<S, T, A>(
    data_x: &nd::ArrayBase<S, nd::Ix1>,
    data_y: &nd::ArrayBase<T, nd::Ix1>,
    x: A,
) -> InterpResult<A>
where
    S: nd::Data<Elem = A>,
    T: nd::Data<Elem = A>,
    A: Num + Copy
{
    LengthError::check(data_x, data_y)?;
    let res: A
        = data_x.iter().zip(data_y).enumerate()
        .map(|(j, (xj, yj))| {
            let xj = *xj;
            let inner
                = data_x.iter().enumerate()
                .filter(|(m, _)| *m != j)
                .map(|(_, xm)| (x - *xm) / (xj - *xm))
                .fold(A::one(), A::mul);
            *yj * inner
        })
        .fold(A::zero(), A::add);
    Ok(res)
}

/// Return a list of all zeros of a given kind in a sampled function.
///
/// The function must be locally invertible on the scale of a few grid points.
pub fn find_zeros<S, T, A>(
    data_x: &nd::ArrayBase<S, nd::Ix1>,
    data_y: &nd::ArrayBase<T, nd::Ix1>,
    kind: Zero,
) -> InterpResult<Vec<A>>
where
    S: nd::Data<Elem = A>,
    T: nd::Data<Elem = A>,
    A: Num + PartialOrd + Copy,
{
    LengthError::check(data_x, data_y)?;
    LagrangeError::check(data_x)?;
    let n = data_x.len();
    let z = A::zero();
    let zeros: Vec<A>
        = data_x.iter().zip(data_y).skip(1)
        .zip(data_y)
        .enumerate()
        .filter_map(|(i, ((xi, yi), yim1))| {
            if *yi == z {
                Some(Ok(*xi))
            } else if *yim1 == z {
                // already recorded as an exact zero on the previous sample
                None
            } else if *yi * *yim1 <= z && kind.matches(yim1, yi) {
                let il = i.saturating_sub(2);
                let ir = cmp::min(n, i + 2);
                if ir - il < 4 {
                    log::warn!(
                        "interp::find_zeros: attempting to interpolate near an \
                        edge of the given data; some accuracy may be lost"
                    );
                }
                let interp
                    = lagrange(
                        &data_y.slice(nd::s![il..ir]),
                        &data_x.slice(nd::s![il..ir]),
                        z,
                    );
                Some(interp)
            } else {
                None
            }
        })
        .collect::<InterpResult<_>>()?;
    Ok(zeros)
}

/// Piecewise cubic Hermite interpolant of a vector-valued function sampled
/// along with its derivative.
///
/// Rows of `y` and `yp` index vector components; columns index nodes.
/// Evaluation outside of the node range extrapolates the first or last cubic.
#[derive(Clone, Debug)]
pub struct Hermite {
    x: nd::Array1<f64>,
    y: nd::Array2<f64>,
    yp: nd::Array2<f64>,
}

impl Hermite {
    /// Create a new interpolant.
    ///
    /// Returns [`InterpError::BadNodes`] if `x` has fewer than 2 elements or is
    /// not strictly increasing, and [`InterpError::Shape`] if `y` and `yp` do
    /// not both have one column per node.
    pub fn new(x: nd::Array1<f64>, y: nd::Array2<f64>, yp: nd::Array2<f64>)
        -> InterpResult<Self>
    {
        InterpError::check_nodes(&x)?;
        if y.ncols() != x.len() || y.dim() != yp.dim() {
            return Err(InterpError::Shape(x.len(), y.dim(), yp.dim()));
        }
        Ok(Self { x, y, yp })
    }

    /// Number of vector components.
    pub fn ncomp(&self) -> usize { self.y.nrows() }

    // index of the interval containing `t`, clamped to the valid range
    fn interval(&self, t: f64) -> usize {
        let m = self.x.len();
        let k = self.x.as_slice()
            .map(|xs| xs.partition_point(|xk| *xk <= t))
            .unwrap_or_else(|| self.x.iter().take_while(|xk| **xk <= t).count());
        k.saturating_sub(1).min(m - 2)
    }

    fn eval_single(&self, t: f64, deriv: bool, out: nd::ArrayViewMut1<f64>) {
        let k = self.interval(t);
        let h = self.x[k + 1] - self.x[k];
        let s = (t - self.x[k]) / h;
        let (c0, d0, c1, d1)
            = if deriv {
                (
                    6.0 * s * (s - 1.0) / h,
                    (3.0 * s - 4.0) * s + 1.0,
                    -6.0 * s * (s - 1.0) / h,
                    (3.0 * s - 2.0) * s,
                )
            } else {
                (
                    (2.0 * s - 3.0) * s * s + 1.0,
                    h * ((s - 2.0) * s + 1.0) * s,
                    (3.0 - 2.0 * s) * s * s,
                    h * (s - 1.0) * s * s,
                )
            };
        nd::Zip::from(out)
            .and(self.y.column(k))
            .and(self.yp.column(k))
            .and(self.y.column(k + 1))
            .and(self.yp.column(k + 1))
            .for_each(|o, &y0, &m0, &y1, &m1| {
                *o = c0 * y0 + d0 * m0 + c1 * y1 + d1 * m1;
            });
    }

    /// Evaluate the interpolant at each point in `t`, returning an array with
    /// one column per point.
    pub fn eval<S>(&self, t: &Arr1<S>) -> nd::Array2<f64>
    where S: nd::Data<Elem = f64>
    {
        let mut out: nd::Array2<f64> = nd::Array2::zeros((self.ncomp(), t.len()));
        out.columns_mut().into_iter().zip(t)
            .for_each(|(col, &tk)| self.eval_single(tk, false, col));
        out
    }

    /// Evaluate the first derivative of the interpolant at each point in `t`.
    pub fn eval_deriv<S>(&self, t: &Arr1<S>) -> nd::Array2<f64>
    where S: nd::Data<Elem = f64>
    {
        let mut out: nd::Array2<f64> = nd::Array2::zeros((self.ncomp(), t.len()));
        out.columns_mut().into_iter().zip(t)
            .for_each(|(col, &tk)| self.eval_single(tk, true, col));
        out
    }
}

// build an interpolant from borrowed arrays
pub(crate) fn hermite_from<S, T, U>(x: &Arr1<S>, y: &Arr2<T>, yp: &Arr2<U>)
    -> InterpResult<Hermite>
where
    S: nd::Data<Elem = f64>,
    T: nd::Data<Elem = f64>,
    U: nd::Data<Elem = f64>,
{
    Hermite::new(x.to_owned(), y.to_owned(), yp.to_owned())
}
