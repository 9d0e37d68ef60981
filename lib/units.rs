#![allow(non_upper_case_globals)]

//! Physical constants in the nuclear unit system (MeV, fm) and conversion to
//! the kinetic-energy scale used by the radial equation.
//!
//! Concrete physical constants are taken from NIST (CODATA 2018).

/// reduced Planck constant times the speed of light (MeV fm)
pub const hbar_c: f64 = 197.3269804;
//                  +/- 0 (exact)

/// proton mass energy (MeV)
pub const mp: f64 = 938.27208816;
//              +/- 0.00000029

/// neutron mass energy (MeV)
pub const mn: f64 = 939.56542052;
//              +/- 0.00000054

/// average nucleon mass energy (MeV)
pub const mN: f64 = (mp + mn) / 2.0;

/// proton-neutron reduced mass energy (MeV)
pub const mu_np: f64 = mp * mn / (mp + mn);

/// deuteron binding energy (MeV), as the (negative) energy of the J=1⁺ ground
/// state
pub const E_d: f64 = -2.224;
//               +/- 0.0000002 (rounded)

/// Kinetic-energy scale for a particle of a given mass.
///
/// Constructor methods produce `ħ²/2m` in MeV fm², the coefficient of the
/// second derivative in the radial Schrödinger equation.
#[derive(Copy, Clone, Debug)]
pub struct Units {
    /// Particle mass energy (MeV).
    pub m: f64,
    /// `ħ²/2m` (MeV fm²).
    pub hbar2_over_2m: f64,
}

impl Units {
    /// Construct from a mass energy in MeV.
    pub fn from_mass(mass: f64) -> Self {
        Self { m: mass, hbar2_over_2m: hbar_c.powi(2) / 2.0 / mass }
    }

    /// Construct for the average nucleon mass.
    ///
    /// This gives `ħ²/2m ≈ 20.735 MeV fm²`.
    pub fn nucleon() -> Self { Self::from_mass(mN) }

    /// Construct for the proton-neutron reduced mass.
    pub fn reduced_np() -> Self { Self::from_mass(mu_np) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn nucleon_scale_matches_tabulated() {
        assert_relative_eq!(Units::nucleon().hbar2_over_2m, 20.735, epsilon = 1e-3);
    }

    #[test]
    fn reduced_mass_doubles_scale() {
        let ratio = Units::reduced_np().hbar2_over_2m / Units::nucleon().hbar2_over_2m;
        assert_relative_eq!(ratio, 2.0, epsilon = 1e-5);
    }
}
