//! Square-well nuclear potential.

use ndarray as nd;
use crate::Arr1;

/// A spherically symmetric square well of depth `depth` (MeV, positive for an
/// attractive well) and range `radius` (fm).
///
/// ```text
/// V(r) = -V0  for r ≤ R
///         0   for r > R
/// ```
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SquareWell {
    /// Well depth `V0` (MeV).
    pub depth: f64,
    /// Well radius `R` (fm).
    pub radius: f64,
}

impl SquareWell {
    pub fn new(depth: f64, radius: f64) -> Self { Self { depth, radius } }

    /// Evaluate the potential at a single radius.
    pub fn eval(&self, r: f64) -> f64 {
        if r <= self.radius { -self.depth } else { 0.0 }
    }

    /// Evaluate the potential elementwise over an array of radii.
    pub fn eval_arr<S>(&self, r: &Arr1<S>) -> nd::Array1<f64>
    where S: nd::Data<Elem = f64>
    {
        r.mapv(|rk| self.eval(rk))
    }

    /// Return a copy of `self` with a different depth.
    pub fn with_depth(&self, depth: f64) -> Self {
        Self { depth, ..*self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inside_and_outside() {
        let well = SquareWell::new(35.0, 2.1);
        assert_eq!(well.eval(0.0), -35.0);
        assert_eq!(well.eval(1.0), -35.0);
        assert_eq!(well.eval(2.1), -35.0);
        assert_eq!(well.eval(2.1 + 1e-12), 0.0);
        assert_eq!(well.eval(10.0), 0.0);
    }

    #[test]
    fn broadcast_matches_scalar() {
        let well = SquareWell::new(35.0, 2.1);
        let r: nd::Array1<f64> = nd::Array1::linspace(0.0, 10.0, 500);
        let v = well.eval_arr(&r);
        assert_eq!(v.len(), r.len());
        r.iter().zip(&v).for_each(|(rk, vk)| assert_eq!(*vk, well.eval(*rk)));
        assert!(
            r.iter().zip(&v)
                .all(|(rk, vk)| if *rk > 2.1 { *vk == 0.0 } else { *vk == -35.0 })
        );
    }

    #[test]
    fn repeated_calls_agree() {
        let well = SquareWell::new(12.5, 1.7);
        let r: nd::Array1<f64> = nd::Array1::linspace(0.0, 5.0, 101);
        assert_eq!(well.eval_arr(&r), well.eval_arr(&r));
        assert_eq!(well, SquareWell::new(12.5, 1.7));
    }
}
