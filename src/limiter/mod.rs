//! Bound (slope) limiting for DG fields.
//!
//! After a transport step, concentration must stay in [0, 1] and thickness
//! non-negative. The limiter rescales each element's non-constant
//! coefficients toward zero by the minimal factor that brings every
//! sampled value within bound, leaving the constant (mean) coefficient
//! untouched, so local mass is preserved exactly.
//!
//! Sampling covers the volume and face quadrature points of the basis
//! tables. The guarantee therefore holds at those points, not for the
//! continuous polynomial range; with the product rules used here the
//! difference is negligible for the smooth fields this is applied to.
//!
//! An element whose mean already violates the bound has its slopes
//! collapsed to zero and keeps its mean: the limiter never manufactures or
//! destroys mass to repair a non-physical average.

use crate::basis::DGBasis2D;
use crate::fields::DGField2D;

/// Largest sampled value of an element polynomial.
fn sample_max(coeffs: &[f64], basis: &DGBasis2D) -> f64 {
    let mut extreme = f64::NEG_INFINITY;
    for q in 0..basis.n_q {
        extreme = extreme.max(basis.evaluate_at_q(coeffs, q));
    }
    for face in 0..4 {
        for q in 0..basis.n_edge_q {
            extreme = extreme.max(basis.evaluate_on_face(coeffs, face, q));
        }
    }
    extreme
}

/// Smallest sampled value of an element polynomial.
fn sample_min(coeffs: &[f64], basis: &DGBasis2D) -> f64 {
    let mut extreme = f64::INFINITY;
    for q in 0..basis.n_q {
        extreme = extreme.min(basis.evaluate_at_q(coeffs, q));
    }
    for face in 0..4 {
        for q in 0..basis.n_edge_q {
            extreme = extreme.min(basis.evaluate_on_face(coeffs, face, q));
        }
    }
    extreme
}

/// Scale the non-constant coefficients of element polynomials so that no
/// sampled value exceeds `bound`.
pub fn limit_max(field: &mut DGField2D, basis: &DGBasis2D, bound: f64) {
    assert_eq!(field.n_comp, basis.n_comp, "field arity must match basis");
    if field.n_comp == 1 {
        return; // piecewise constants have no slopes to limit
    }

    for k in 0..field.n_elements {
        let coeffs = field.cell_mut(k);
        let max = sample_max(coeffs, basis);
        if max <= bound {
            continue;
        }

        let mean = coeffs[0];
        let theta = if mean >= bound {
            0.0
        } else {
            ((bound - mean) / (max - mean)).min(1.0)
        };
        for c in &mut coeffs[1..] {
            *c *= theta;
        }
    }
}

/// Scale the non-constant coefficients of element polynomials so that no
/// sampled value falls below `bound`.
pub fn limit_min(field: &mut DGField2D, basis: &DGBasis2D, bound: f64) {
    assert_eq!(field.n_comp, basis.n_comp, "field arity must match basis");
    if field.n_comp == 1 {
        return;
    }

    for k in 0..field.n_elements {
        let coeffs = field.cell_mut(k);
        let min = sample_min(coeffs, basis);
        if min >= bound {
            continue;
        }

        let mean = coeffs[0];
        let theta = if mean <= bound {
            0.0
        } else {
            ((mean - bound) / (mean - min)).min(1.0)
        };
        for c in &mut coeffs[1..] {
            *c *= theta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polynomial::Quadrature2D;

    fn basis6() -> (Quadrature2D, DGBasis2D) {
        let quad = Quadrature2D::for_degree(2);
        let basis = DGBasis2D::new(6, &quad);
        (quad, basis)
    }

    #[test]
    fn test_limit_max_clamps_samples() {
        let (_, basis) = basis6();
        let mut field = DGField2D::new(2, 6);
        field.cell_mut(0).copy_from_slice(&[0.5, 2.0, -3.0, 1.5, 1.0, -2.0]);
        field.cell_mut(1).copy_from_slice(&[0.9, 0.05, 0.0, 0.0, 0.0, 0.0]);

        limit_max(&mut field, &basis, 1.0);

        for k in 0..2 {
            let max = sample_max(field.cell(k), &basis);
            assert!(max <= 1.0 + 1e-12, "element {}: max {} > bound", k, max);
        }
        // Means untouched
        assert!((field.mean(0) - 0.5).abs() < 1e-15);
        assert!((field.mean(1) - 0.9).abs() < 1e-15);
        // Element 1 was already within bound and is unchanged
        assert!((field.cell(1)[1] - 0.05).abs() < 1e-15);
    }

    #[test]
    fn test_limit_min_clamps_samples() {
        let (_, basis) = basis6();
        let mut field = DGField2D::new(1, 6);
        field.cell_mut(0).copy_from_slice(&[0.3, -1.0, 2.0, 0.4, -0.7, 1.1]);

        limit_min(&mut field, &basis, 0.0);

        let min = sample_min(field.cell(0), &basis);
        assert!(min >= -1e-12, "min {} below bound", min);
        assert!((field.mean(0) - 0.3).abs() < 1e-15);
    }

    #[test]
    fn test_limit_sequence_keeps_both_bounds() {
        // limit_max then limit_min: shrinking slopes pulls samples toward
        // the (in-bounds) mean, so the second pass cannot break the first.
        let (_, basis) = basis6();
        let mut field = DGField2D::new(1, 6);
        field.cell_mut(0).copy_from_slice(&[0.6, 3.0, -2.5, 1.2, -0.8, 2.0]);

        limit_max(&mut field, &basis, 1.0);
        limit_min(&mut field, &basis, 0.0);

        let max = sample_max(field.cell(0), &basis);
        let min = sample_min(field.cell(0), &basis);
        assert!(max <= 1.0 + 1e-12 && min >= -1e-12);
        assert!((field.mean(0) - 0.6).abs() < 1e-15);
    }

    #[test]
    fn test_out_of_bound_mean_zeroes_slopes() {
        let (_, basis) = basis6();
        let mut field = DGField2D::new(1, 6);
        field.cell_mut(0).copy_from_slice(&[1.5, 0.3, -0.2, 0.1, 0.0, 0.05]);

        limit_max(&mut field, &basis, 1.0);

        let c = field.cell(0);
        assert!((c[0] - 1.5).abs() < 1e-15, "mean must be preserved");
        for &ci in &c[1..] {
            assert!(ci.abs() < 1e-15, "slopes must collapse to zero");
        }
    }

    #[test]
    fn test_degree0_untouched() {
        let quad = Quadrature2D::for_degree(0);
        let basis = DGBasis2D::new(1, &quad);
        let mut field = DGField2D::new(3, 1);
        field.data.copy_from_slice(&[2.0, -1.0, 0.5]);

        let before = field.data.clone();
        limit_max(&mut field, &basis, 1.0);
        limit_min(&mut field, &basis, 0.0);
        assert_eq!(field.data, before);
    }
}
