#![allow(non_snake_case)]

//! Provides functions and higher-level constructs for computing the bound-state
//! radial wavefunction of the deuteron in a square-well nuclear potential.
//!
//! The radial Schrödinger equation is posed as a two-point boundary value
//! problem (BVP) and handed to a general collocation solver. Provides
//! implementations for the following numerical routines:
//! - Fourth-order Lobatto IIIA collocation with residual-controlled mesh
//!   refinement and damped Newton iteration[^1]
//! - Fixed-step fourth-order Runge-Kutta shooting
//! - Well-depth search (node-count bisection followed by regula falsi on
//!   the outer boundary value)
//!
//! See [`docs`] for theoretical background.
//!
//! [^1]: J. Kierzenka and L. F. Shampine, "A BVP Solver Based on Residual
//! Control and the Matlab PSE." ACM Trans. Math. Softw. **27** 3 299-316
//! (2001).

pub mod error;
pub mod interp;
pub mod units;
pub mod potential;
pub mod radial;
pub mod bvp;
pub mod shoot;
pub mod utils;
pub mod plot;

pub mod docs;

pub(crate) const DEF_EPSILON: f64 = 1e-6;
pub(crate) const DEF_MAXITERS: usize = 1000;

pub type Arr1<S> = ndarray::ArrayBase<S, ndarray::Ix1>;
pub type Arr2<S> = ndarray::ArrayBase<S, ndarray::Ix2>;
