//! Axisymmetric galactic potentials evaluated in cylindrical coordinates.
//!
//! A [`CylindricalPotential`] exposes the radial and vertical force at
//! `(R, z)`; [`GalacticGravity`] adapts it to a Cartesian [`GravityModel`].
//! The concrete Miyamoto–Nagai, NFW and Hernquist profiles use natural
//! units (G = 1, amplitude = mass) and are compiled with the `galactic`
//! feature. Without it [`lookup`] reports every name as unavailable.

use super::GravityModel;
use nalgebra::Vector3;

/// Potential names understood by [`lookup`]
pub const POTENTIAL_NAMES: &[&str] = &["MiyamotoNagai", "NFWPotential", "HernquistPotential"];

/// Whether the galactic potentials were compiled in
pub const fn is_available() -> bool {
    cfg!(feature = "galactic")
}

/// A potential with cylindrical symmetry about the z axis
pub trait CylindricalPotential: Send + Sync {
    /// Radial force per unit mass at cylindrical radius `r` and height `z`
    fn r_force(&self, r: f64, z: f64) -> f64;

    /// Vertical force per unit mass at cylindrical radius `r` and height `z`
    fn z_force(&self, r: f64, z: f64) -> f64;

    fn name(&self) -> &str;
}

/// Cartesian view of a cylindrical potential
pub struct GalacticGravity {
    potential: Box<dyn CylindricalPotential>,
}

impl GalacticGravity {
    pub fn new(potential: Box<dyn CylindricalPotential>) -> Self {
        Self { potential }
    }
}

impl GravityModel for GalacticGravity {
    fn acceleration(&self, position: &Vector3<f64>) -> Vector3<f64> {
        let r = position.xy().norm();
        let a_r = self.potential.r_force(r, position.z);
        let a_z = self.potential.z_force(r, position.z);
        // the radial direction is undefined on the symmetry axis
        let (a_x, a_y) = if r > 0.0 {
            (a_r * position.x / r, a_r * position.y / r)
        } else {
            (0.0, 0.0)
        };
        Vector3::new(a_x, a_y, a_z)
    }

    fn name(&self) -> &str {
        self.potential.name()
    }
}

/// Looks up a galactic potential by name with its default shape parameters.
///
/// Returns `None` when the name is not a galactic potential or when the
/// crate was built without the `galactic` feature.
pub fn lookup(name: &str) -> Option<Box<dyn CylindricalPotential>> {
    #[cfg(feature = "galactic")]
    {
        profiles::by_name(name)
    }
    #[cfg(not(feature = "galactic"))]
    {
        let _ = name;
        None
    }
}

#[cfg(feature = "galactic")]
pub use profiles::{HernquistPotential, MiyamotoNagaiPotential, NfwPotential};

#[cfg(feature = "galactic")]
mod profiles {
    use super::CylindricalPotential;

    pub(super) fn by_name(name: &str) -> Option<Box<dyn CylindricalPotential>> {
        match name {
            "MiyamotoNagai" => Some(Box::new(MiyamotoNagaiPotential::default())),
            "NFWPotential" => Some(Box::new(NfwPotential::default())),
            "HernquistPotential" => Some(Box::new(HernquistPotential::default())),
            _ => None,
        }
    }

    /// Disk potential `Φ = -amp / sqrt(R² + (a + sqrt(z² + b²))²)`
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct MiyamotoNagaiPotential {
        pub amp: f64,
        /// Disk scale length
        pub a: f64,
        /// Disk scale height
        pub b: f64,
    }

    impl Default for MiyamotoNagaiPotential {
        fn default() -> Self {
            Self {
                amp: 1.0,
                a: 1.0,
                b: 0.1,
            }
        }
    }

    impl MiyamotoNagaiPotential {
        fn denominator(&self, r: f64, z: f64) -> (f64, f64) {
            let zb = (z * z + self.b * self.b).sqrt();
            let s = self.a + zb;
            ((r * r + s * s).powf(1.5), zb)
        }
    }

    impl CylindricalPotential for MiyamotoNagaiPotential {
        fn r_force(&self, r: f64, z: f64) -> f64 {
            let (d, _) = self.denominator(r, z);
            -self.amp * r / d
        }

        fn z_force(&self, r: f64, z: f64) -> f64 {
            let (d, zb) = self.denominator(r, z);
            // razor-thin disk (b = 0) has no vertical force in its plane
            if zb == 0.0 {
                return 0.0;
            }
            -self.amp * z * (self.a + zb) / (zb * d)
        }

        fn name(&self) -> &str {
            "MiyamotoNagai"
        }
    }

    pub(super) const NFW_SERIES_CUTOFF: f64 = 1e-3;

    /// Spherical halo `Φ = -amp ln(1 + r/a) / r`
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct NfwPotential {
        pub amp: f64,
        /// Scale radius
        pub a: f64,
    }

    impl Default for NfwPotential {
        fn default() -> Self {
            Self { amp: 1.0, a: 1.0 }
        }
    }

    impl NfwPotential {
        /// Spherical radial force `-dΦ/dr`.
        ///
        /// Near the center the closed form cancels, so a series in `r / a`
        /// takes over; it tends to `-amp / (2 a²)`.
        fn spherical_force(&self, r: f64) -> f64 {
            let x = r / self.a;
            let scale = self.amp / (self.a * self.a);
            if x < NFW_SERIES_CUTOFF {
                scale * (-0.5 + x * (2.0 / 3.0 + x * (-0.75 + x * 0.8)))
            } else {
                scale * (x / (1.0 + x) - x.ln_1p()) / (x * x)
            }
        }
    }

    impl CylindricalPotential for NfwPotential {
        fn r_force(&self, r: f64, z: f64) -> f64 {
            let sr = r.hypot(z);
            if sr == 0.0 {
                return 0.0;
            }
            self.spherical_force(sr) * r / sr
        }

        fn z_force(&self, r: f64, z: f64) -> f64 {
            let sr = r.hypot(z);
            if sr == 0.0 {
                return 0.0;
            }
            self.spherical_force(sr) * z / sr
        }

        fn name(&self) -> &str {
            "NFWPotential"
        }
    }

    /// Spherical bulge `Φ = -amp / (2 (r + a))`
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct HernquistPotential {
        pub amp: f64,
        /// Scale radius
        pub a: f64,
    }

    impl Default for HernquistPotential {
        fn default() -> Self {
            Self { amp: 1.0, a: 1.0 }
        }
    }

    impl HernquistPotential {
        fn spherical_force(&self, r: f64) -> f64 {
            -self.amp / (2.0 * (r + self.a) * (r + self.a))
        }
    }

    impl CylindricalPotential for HernquistPotential {
        fn r_force(&self, r: f64, z: f64) -> f64 {
            let sr = r.hypot(z);
            if sr == 0.0 {
                return 0.0;
            }
            self.spherical_force(sr) * r / sr
        }

        fn z_force(&self, r: f64, z: f64) -> f64 {
            let sr = r.hypot(z);
            if sr == 0.0 {
                return 0.0;
            }
            self.spherical_force(sr) * z / sr
        }

        fn name(&self) -> &str {
            "HernquistPotential"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Point mass in cylindrical form, used to exercise the adapter alone
    struct Kepler;

    impl CylindricalPotential for Kepler {
        fn r_force(&self, r: f64, z: f64) -> f64 {
            -r / (r * r + z * z).powf(1.5)
        }

        fn z_force(&self, r: f64, z: f64) -> f64 {
            -z / (r * r + z * z).powf(1.5)
        }

        fn name(&self) -> &str {
            "kepler"
        }
    }

    #[test]
    fn test_adapter_projects_radial_force() {
        let gravity = GalacticGravity::new(Box::new(Kepler));
        let p = Vector3::new(3.0, 4.0, 0.0);
        let a = gravity.acceleration(&p);
        // |a| = 1/r² along -p
        let expected = -p / 125.0;
        assert_relative_eq!(a, expected, epsilon = 1e-15);
    }

    #[test]
    fn test_adapter_on_symmetry_axis() {
        let gravity = GalacticGravity::new(Box::new(Kepler));
        let a = gravity.acceleration(&Vector3::new(0.0, 0.0, 2.0));
        assert_eq!(a.x, 0.0);
        assert_eq!(a.y, 0.0);
        assert_relative_eq!(a.z, -0.25);
        assert!(a.iter().all(|c| c.is_finite()));
    }

    #[cfg(feature = "galactic")]
    #[test]
    fn test_lookup_known_names() {
        for name in POTENTIAL_NAMES {
            let potential = lookup(name).expect("registered potential");
            assert_eq!(potential.name(), *name);
        }
        assert!(lookup("squared_potential_force").is_none());
        assert!(lookup("MWPotential2014").is_none());
        // names outside the published list never resolve
        assert!(lookup("MiyamotoNagaiPotential").is_none());
    }

    #[cfg(not(feature = "galactic"))]
    #[test]
    fn test_lookup_unavailable_without_feature() {
        assert!(!is_available());
        assert!(lookup("MiyamotoNagai").is_none());
    }

    #[cfg(feature = "galactic")]
    #[test]
    fn test_potentials_attract_towards_center() {
        let p = Vector3::new(1.0, -0.5, 0.3);
        for name in POTENTIAL_NAMES {
            let gravity = GalacticGravity::new(lookup(name).unwrap());
            let a = gravity.acceleration(&p);
            assert!(a.dot(&p) < 0.0, "{name} should attract");
        }
    }

    #[cfg(feature = "galactic")]
    #[test]
    fn test_miyamoto_nagai_forces_match_gradient() {
        let mn = MiyamotoNagaiPotential::default();
        let phi = |r: f64, z: f64| {
            let s = mn.a + (z * z + mn.b * mn.b).sqrt();
            -mn.amp / (r * r + s * s).sqrt()
        };
        let (r, z, h) = (1.3, 0.4, 1e-6);
        let fr = -(phi(r + h, z) - phi(r - h, z)) / (2.0 * h);
        let fz = -(phi(r, z + h) - phi(r, z - h)) / (2.0 * h);
        assert_relative_eq!(mn.r_force(r, z), fr, max_relative = 1e-7);
        assert_relative_eq!(mn.z_force(r, z), fz, max_relative = 1e-7);
    }

    #[cfg(feature = "galactic")]
    #[test]
    fn test_spherical_profiles_match_gradient() {
        let nfw = NfwPotential::default();
        let hq = HernquistPotential::default();
        let nfw_phi = |r: f64| -nfw.amp * (1.0 + r / nfw.a).ln() / r;
        let hq_phi = |r: f64| -hq.amp / (2.0 * (r + hq.a));
        let (r, z, h): (f64, f64, f64) = (0.8, 0.6, 1e-6);
        let sr = (r * r + z * z).sqrt();

        let nfw_f = -(nfw_phi(sr + h) - nfw_phi(sr - h)) / (2.0 * h);
        assert_relative_eq!(nfw.r_force(r, z), nfw_f * r / sr, max_relative = 1e-7);
        assert_relative_eq!(nfw.z_force(r, z), nfw_f * z / sr, max_relative = 1e-7);

        let hq_f = -(hq_phi(sr + h) - hq_phi(sr - h)) / (2.0 * h);
        assert_relative_eq!(hq.r_force(r, z), hq_f * r / sr, max_relative = 1e-7);
        assert_relative_eq!(hq.z_force(r, z), hq_f * z / sr, max_relative = 1e-7);
    }

    #[cfg(feature = "galactic")]
    #[test]
    fn test_nfw_force_tends_to_central_limit() {
        let nfw = NfwPotential::default();
        for z in [1e-4, 1e-6, 1e-9, 1e-12, 1e-17] {
            assert_relative_eq!(nfw.z_force(0.0, z), -0.5, max_relative = 1e-3);
            assert_relative_eq!(nfw.z_force(0.0, -z), 0.5, max_relative = 1e-3);
        }
        let scaled = NfwPotential { amp: 3.0, a: 2.0 };
        assert_relative_eq!(scaled.r_force(1e-12, 0.0), -3.0 / 8.0, max_relative = 1e-9);
    }

    #[cfg(feature = "galactic")]
    #[test]
    fn test_nfw_force_continuous_at_series_cutoff() {
        let nfw = NfwPotential::default();
        let below = nfw.z_force(0.0, profiles::NFW_SERIES_CUTOFF * (1.0 - 1e-9));
        let above = nfw.z_force(0.0, profiles::NFW_SERIES_CUTOFF * (1.0 + 1e-9));
        assert_relative_eq!(below, above, max_relative = 1e-9);
    }

    #[cfg(feature = "galactic")]
    #[test]
    fn test_thin_disk_midplane_is_finite() {
        let disk = MiyamotoNagaiPotential {
            b: 0.0,
            ..MiyamotoNagaiPotential::default()
        };
        assert_eq!(disk.z_force(1.0, 0.0), 0.0);
        assert!(disk.r_force(1.0, 0.0) < 0.0);
        assert!(disk.z_force(1.0, 0.1) < 0.0);
    }

    #[cfg(feature = "galactic")]
    #[test]
    fn test_spherical_profiles_finite_at_center() {
        for name in ["NFWPotential", "HernquistPotential"] {
            let gravity = GalacticGravity::new(lookup(name).unwrap());
            assert_eq!(gravity.acceleration(&Vector3::zeros()), Vector3::zeros());
        }
    }
}
