//! Viscous-plastic rheology closure for sea ice.
//!
//! The internal ice stress follows the elliptic-yield-curve VP model: ice
//! strength grows linearly with thickness and exponentially with
//! compactness, and the bulk/shear viscosities are regularized by a
//! minimum deformation rate Δ_min so the stress stays bounded as the
//! deformation vanishes.

use crate::basis::DGBasis2D;
use crate::fields::{DGField2D, StressField2D};
use crate::operators::GeometricFactors2D;
use crate::projection::diagonal_mass;

/// Physical and numerical parameters of the VP/mEVP rheology.
///
/// Defaults are the standard box-benchmark values.
#[derive(Clone, Copy, Debug)]
pub struct VPParameters {
    /// Ice density (kg/m³)
    pub rho_ice: f64,
    /// Air density (kg/m³)
    pub rho_atm: f64,
    /// Ocean water density (kg/m³)
    pub rho_ocean: f64,
    /// Atmospheric drag coefficient
    pub c_atm: f64,
    /// Ocean drag coefficient
    pub c_ocean: f64,
    /// Coriolis parameter (1/s)
    pub fc: f64,
    /// Ice strength parameter P* (N/m²)
    pub p_star: f64,
    /// Compaction hardening constant C
    pub c_compaction: f64,
    /// Yield-ellipse aspect ratio e
    pub ellipse: f64,
    /// Minimum deformation rate Δ_min (1/s)
    pub delta_min: f64,
}

impl Default for VPParameters {
    fn default() -> Self {
        Self {
            rho_ice: 900.0,
            rho_atm: 1.3,
            rho_ocean: 1026.0,
            c_atm: 1.2e-3,
            c_ocean: 5.5e-3,
            fc: 1.46e-4,
            p_star: 27_500.0,
            c_compaction: 20.0,
            ellipse: 2.0,
            delta_min: 2.0e-9,
        }
    }
}

impl VPParameters {
    /// Atmospheric drag factor ρ_atm · C_atm.
    #[inline]
    pub fn f_atm(&self) -> f64 {
        self.rho_atm * self.c_atm
    }

    /// Ocean drag factor ρ_ocean · C_ocean.
    #[inline]
    pub fn f_ocean(&self) -> f64 {
        self.rho_ocean * self.c_ocean
    }

    /// Ice strength P = P* · h · exp(-C(1 - a)).
    #[inline]
    pub fn ice_strength(&self, h: f64, a: f64) -> f64 {
        self.p_star * h * (-self.c_compaction * (1.0 - a)).exp()
    }

    /// Regularized deformation rate Δ of the elliptic yield curve:
    ///
    /// Δ² = Δ_min² + (1 + e⁻²)(ε₁₁² + ε₂₂²) + 4e⁻² ε₁₂² + 2(1 - e⁻²) ε₁₁ε₂₂
    #[inline]
    pub fn delta(&self, e11: f64, e12: f64, e22: f64) -> f64 {
        let e_inv2 = 1.0 / (self.ellipse * self.ellipse);
        (self.delta_min * self.delta_min
            + (1.0 + e_inv2) * (e11 * e11 + e22 * e22)
            + 4.0 * e_inv2 * e12 * e12
            + 2.0 * (1.0 - e_inv2) * e11 * e22)
            .sqrt()
    }

    /// Bulk viscosity ζ = P / (2Δ).
    #[inline]
    pub fn bulk_viscosity(&self, p: f64, delta: f64) -> f64 {
        p / (2.0 * delta)
    }

    /// Shear viscosity η = ζ / e².
    #[inline]
    pub fn shear_viscosity(&self, zeta: f64) -> f64 {
        zeta / (self.ellipse * self.ellipse)
    }
}

/// Diagnostic: project the regularized deformation rate Δ of a strain
/// field into the stress-space DG basis (for output writers).
pub fn delta_field(
    geom: &GeometricFactors2D,
    basis: &DGBasis2D,
    strain: &StressField2D,
    params: &VPParameters,
) -> DGField2D {
    project_pointwise(geom, basis, strain, |e11, e12, e22| {
        params.delta(e11, e12, e22)
    })
}

/// Diagnostic: project the maximum shear rate
/// sqrt(Δ_min² + (ε₁₁ - ε₂₂)² + 4ε₁₂²) into the stress-space DG basis.
pub fn shear_field(
    geom: &GeometricFactors2D,
    basis: &DGBasis2D,
    strain: &StressField2D,
    params: &VPParameters,
) -> DGField2D {
    let dmin2 = params.delta_min * params.delta_min;
    project_pointwise(geom, basis, strain, move |e11, e12, e22| {
        (dmin2 + (e11 - e22) * (e11 - e22) + 4.0 * e12 * e12).sqrt()
    })
}

fn project_pointwise<F>(
    geom: &GeometricFactors2D,
    basis: &DGBasis2D,
    strain: &StressField2D,
    f: F,
) -> DGField2D
where
    F: Fn(f64, f64, f64) -> f64,
{
    assert_eq!(strain.xx.n_comp, basis.n_comp, "strain arity must match basis");

    let mut out = DGField2D::new(strain.xx.n_elements, basis.n_comp);
    let mut mass = vec![0.0; basis.n_comp];

    for k in 0..out.n_elements {
        diagonal_mass(basis, geom, k, &mut mass);
        let coeffs = out.cell_mut(k);
        for q in 0..geom.n_q {
            let e11 = basis.evaluate_at_q(strain.xx.cell(k), q);
            let e12 = basis.evaluate_at_q(strain.xy.cell(k), q);
            let e22 = basis.evaluate_at_q(strain.yy.cell(k), q);
            let w_v = geom.w_det_j[geom.idx(k, q)] * f(e11, e12, e22);
            for i in 0..basis.n_comp {
                coeffs[i] += w_v * basis.psi[(i, q)];
            }
        }
        for i in 0..basis.n_comp {
            coeffs[i] /= mass[i];
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_floor() {
        let params = VPParameters::default();
        assert!((params.delta(0.0, 0.0, 0.0) - params.delta_min).abs() < 1e-20);
    }

    #[test]
    fn test_delta_uniaxial() {
        // Pure divergence ε₁₁ = d, e = 2:
        // Δ² ≈ (1 + 1/4) d² for d >> Δ_min
        let params = VPParameters::default();
        let d = 1e-5;
        let delta = params.delta(d, 0.0, 0.0);
        assert!((delta - (1.25_f64).sqrt() * d).abs() < 1e-12);
    }

    #[test]
    fn test_ice_strength() {
        let params = VPParameters::default();

        // Fully compact ice: P = P* h
        assert!((params.ice_strength(2.0, 1.0) - 2.0 * params.p_star).abs() < 1e-9);

        // Strength decays with open water fraction
        let p1 = params.ice_strength(2.0, 1.0);
        let p2 = params.ice_strength(2.0, 0.8);
        let p3 = params.ice_strength(2.0, 0.5);
        assert!(p1 > p2 && p2 > p3);

        // And the decay is exponential in C(1 - a)
        assert!((p2 / p1 - (-params.c_compaction * 0.2).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_viscosities() {
        let params = VPParameters::default();
        let p = 1000.0;
        let delta = 1e-6;
        let zeta = params.bulk_viscosity(p, delta);
        assert!((zeta - 5.0e8).abs() < 1.0);
        assert!((params.shear_viscosity(zeta) - zeta / 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_delta_field_constant_strain() {
        use crate::mesh::Mesh2D;
        use crate::polynomial::Quadrature2D;

        let mesh = Mesh2D::rectangle(0.0, 1.0, 0.0, 1.0, 2, 2).unwrap();
        let quad = Quadrature2D::for_degree(1);
        let basis = DGBasis2D::new(3, &quad);
        let geom = GeometricFactors2D::compute(&mesh, &quad).unwrap();
        let params = VPParameters::default();

        let mut strain = StressField2D::new(mesh.n_elements, 3);
        strain.xx.fill_constant(1e-6);
        strain.yy.fill_constant(-0.5e-6);

        let delta = delta_field(&geom, &basis, &strain, &params);
        let expected = params.delta(1e-6, 0.0, -0.5e-6);
        for k in 0..mesh.n_elements {
            assert!((delta.mean(k) - expected).abs() < 1e-18);
            assert!(delta.cell(k)[1].abs() < 1e-18);
        }
    }
}
