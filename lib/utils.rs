//! Miscellaneous tools for wavefunctions sampled on non-uniform meshes.

use std::ops::Add;
use ndarray::{ self as nd, Ix1 };
use ndarray_linalg::Scalar;
use num_traits::{ One, Zero };
use crate::error::LengthError;

/// Integrate `y(x)` using the trapezoidal rule over an arbitrary mesh.
///
/// Fewer than 2 samples integrate to zero.
pub fn trapz<S, T, A>(x: &nd::ArrayBase<S, Ix1>, y: &nd::ArrayBase<T, Ix1>)
    -> Result<A, LengthError>
where
    S: nd::Data<Elem = A::Real>,
    T: nd::Data<Elem = A>,
    A: Scalar,
{
    LengthError::check(x, y)?;
    let two = A::one() + A::one();
    let res
        = x.iter().zip(x.iter().skip(1))
        .zip(y.iter().zip(y.iter().skip(1)))
        .fold(A::zero(), |acc, ((xk, xkp1), (yk, ykp1))| {
            acc + A::from_real(*xkp1 - *xk) * (*yk + *ykp1) / two
        });
    Ok(res)
}

/// Calculate the norm `∫ |P|² dr` of a wavefunction.
///
/// Fewer than 2 samples give a norm of zero.
pub fn wf_norm<S, T, A>(x: &nd::ArrayBase<S, Ix1>, q: &nd::ArrayBase<T, Ix1>)
    -> Result<A::Real, LengthError>
where
    S: nd::Data<Elem = A::Real>,
    T: nd::Data<Elem = A>,
    A: Scalar,
{
    LengthError::check(x, q)?;
    let two = <A as Scalar>::Real::one() + <A as Scalar>::Real::one();
    let res
        = x.iter().zip(x.iter().skip(1))
        .zip(q.iter().zip(q.iter().skip(1)))
        .map(|((xk, xkp1), (qk, qkp1))| {
            (*xkp1 - *xk) * (qk.square() + qkp1.square()) / two
        })
        .fold(<A as Scalar>::Real::zero(), <A as Scalar>::Real::add);
    Ok(res)
}

/// Calculate the inner product of two wavefunctions on the same mesh.
///
/// Fewer than 2 samples give a product of zero.
pub fn wf_dot<S, T, U, A>(
    x: &nd::ArrayBase<S, Ix1>,
    q: &nd::ArrayBase<T, Ix1>,
    p: &nd::ArrayBase<U, Ix1>,
) -> Result<A, LengthError>
where
    S: nd::Data<Elem = A::Real>,
    T: nd::Data<Elem = A>,
    U: nd::Data<Elem = A>,
    A: Scalar,
{
    LengthError::check(q, p)?;
    let prod: nd::Array1<A>
        = q.iter().zip(p).map(|(qk, pk)| qk.conj() * *pk).collect();
    trapz(x, &prod)
}

/// Renormalize a wavefunction in place.
///
/// A wavefunction of zero norm is left unchanged.
pub fn wf_renormalize<S, T, A>(
    x: &nd::ArrayBase<S, Ix1>,
    q: &mut nd::ArrayBase<T, Ix1>,
) -> Result<(), LengthError>
where
    S: nd::Data<Elem = A::Real>,
    T: nd::DataMut<Elem = A>,
    A: Scalar,
{
    let norm = wf_norm(x, q)?;
    if norm == <A as Scalar>::Real::zero() { return Ok(()); }
    let norm = A::from_real(norm.sqrt());
    q.iter_mut().for_each(|qk| { *qk /= norm; });
    Ok(())
}

/// Return a normalized copy of a wavefunction.
///
/// A wavefunction of zero norm is returned as-is.
pub fn wf_normalized<S, T, A>(
    x: &nd::ArrayBase<S, Ix1>,
    q: &nd::ArrayBase<T, Ix1>,
) -> Result<nd::Array1<A>, LengthError>
where
    S: nd::Data<Elem = A::Real>,
    T: nd::Data<Elem = A>,
    A: Scalar,
{
    let mut q = q.to_owned();
    wf_renormalize(x, &mut q)?;
    Ok(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn trapz_exact_for_linear() {
        let x: nd::Array1<f64> = nd::array![0.0, 0.1, 0.5, 1.7, 2.0];
        let y = x.mapv(|xk| 3.0 * xk + 1.0);
        assert_relative_eq!(trapz(&x, &y).unwrap(), 8.0, epsilon = 1e-12);
        assert!(trapz(&x, &nd::array![1.0, 2.0]).is_err());
    }

    #[test]
    fn normalizes_sine() {
        let x: nd::Array1<f64> = nd::Array1::linspace(0.0, std::f64::consts::PI, 2001);
        let q = x.mapv(|xk| 5.0 * xk.sin());
        let qn = wf_normalized(&x, &q).unwrap();
        assert_relative_eq!(wf_norm(&x, &qn).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(
            wf_dot(&x, &qn, &qn).unwrap(),
            1.0,
            epsilon = 1e-12,
        );
        assert_relative_eq!(
            qn[1000],
            (2.0 / std::f64::consts::PI).sqrt(),
            epsilon = 1e-5,
        );
    }

    #[test]
    fn short_data_integrates_to_zero() {
        let x: nd::Array1<f64> = nd::array![1.5];
        let y: nd::Array1<f64> = nd::array![4.0];
        assert_eq!(trapz(&x, &y).unwrap(), 0.0);
        assert_eq!(wf_norm(&x, &y).unwrap(), 0.0);
        assert_eq!(wf_dot(&x, &y, &y).unwrap(), 0.0);
        let empty: nd::Array1<f64> = nd::Array1::zeros(0);
        assert_eq!(trapz(&empty, &empty).unwrap(), 0.0);
        assert_eq!(wf_normalized(&x, &y).unwrap(), y);
    }

    #[test]
    fn zero_wavefunction_unchanged() {
        let x: nd::Array1<f64> = nd::Array1::linspace(0.0, 1.0, 11);
        let q: nd::Array1<f64> = nd::Array1::zeros(11);
        assert_eq!(wf_normalized(&x, &q).unwrap(), q);
    }
}
