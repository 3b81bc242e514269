//! L2 projection and transfers between the function, CG and DG spaces.
//!
//! All operations here are element-local and side-effect free: the modal
//! basis is orthogonal on the reference square, so the local mass matrix is
//! diagonal and projection is a per-coefficient scalar divide. On distorted
//! (non-affine) elements the position-dependent Jacobian couples the modes
//! weakly; the diagonal is kept and the coupling dropped (mass lumping),
//! which is exact on affine elements and preserves the element mean
//! everywhere.

use crate::basis::{CGBasis2D, DGBasis2D};
use crate::fields::{CGDofMap2D, DGField2D};
use crate::forcing::Forcing2D;
use crate::operators::GeometricFactors2D;

/// Diagonal of the local mass matrix of element k:
/// mass[i] = Σ_q w_q |J_q| ψ_i(q)².
pub fn diagonal_mass(basis: &DGBasis2D, geom: &GeometricFactors2D, k: usize, mass: &mut [f64]) {
    assert_eq!(mass.len(), basis.n_comp);

    mass.fill(0.0);
    for q in 0..geom.n_q {
        let w = geom.w_det_j[geom.idx(k, q)];
        for i in 0..basis.n_comp {
            let p = basis.psi[(i, q)];
            mass[i] += w * p * p;
        }
    }
}

/// L2-project a continuous function into a DG field (in place).
///
/// Per element: c_i = Σ_q w_q |J_q| ψ_i(q) f(x_q, y_q) / m_i.
pub fn l2_project_into<F>(
    geom: &GeometricFactors2D,
    basis: &DGBasis2D,
    f: F,
    field: &mut DGField2D,
) where
    F: Fn(f64, f64) -> f64,
{
    assert_eq!(field.n_comp, basis.n_comp, "field arity must match basis");
    assert_eq!(field.n_elements, geom.n_elements, "field sized for a different mesh");

    let mut mass = vec![0.0; basis.n_comp];
    for k in 0..geom.n_elements {
        diagonal_mass(basis, geom, k, &mut mass);

        let coeffs = field.cell_mut(k);
        coeffs.fill(0.0);
        for q in 0..geom.n_q {
            let idx = geom.idx(k, q);
            let (x, y) = geom.xy[idx];
            let w_f = geom.w_det_j[idx] * f(x, y);
            for i in 0..basis.n_comp {
                coeffs[i] += w_f * basis.psi[(i, q)];
            }
        }
        for i in 0..basis.n_comp {
            coeffs[i] /= mass[i];
        }
    }
}

/// L2-project a continuous function into a fresh DG field.
pub fn l2_project<F>(geom: &GeometricFactors2D, basis: &DGBasis2D, f: F) -> DGField2D
where
    F: Fn(f64, f64) -> f64,
{
    let mut field = DGField2D::new(geom.n_elements, basis.n_comp);
    l2_project_into(geom, basis, f, &mut field);
    field
}

/// Project a CG field into a DG field (in place).
///
/// Evaluates the continuous field at the volume quadrature points through
/// the shape tables and applies the diagonal-mass projection. The result
/// is a possibly-discontinuous DG representation of the continuous field;
/// this is how the transport operator obtains its advecting velocity from
/// the CG momentum solution.
pub fn project_cg_to_dg(
    geom: &GeometricFactors2D,
    basis: &DGBasis2D,
    cg: &[f64],
    dofs: &CGDofMap2D,
    cg_basis: &CGBasis2D,
    field: &mut DGField2D,
) {
    assert_eq!(cg.len(), dofs.n_dofs, "CG field sized for a different space");
    assert_eq!(field.n_comp, basis.n_comp, "field arity must match basis");
    assert_eq!(cg_basis.n_q, geom.n_q, "CG tables built for a different rule");

    let mut mass = vec![0.0; basis.n_comp];
    for k in 0..geom.n_elements {
        diagonal_mass(basis, geom, k, &mut mass);
        let local = dofs.element_dofs(k);

        let coeffs = field.cell_mut(k);
        coeffs.fill(0.0);
        for q in 0..geom.n_q {
            let mut value = 0.0;
            for (j, &dof) in local.iter().enumerate() {
                value += cg[dof] * cg_basis.phi[(j, q)];
            }
            let w_v = geom.w_det_j[geom.idx(k, q)] * value;
            for i in 0..basis.n_comp {
                coeffs[i] += w_v * basis.psi[(i, q)];
            }
        }
        for i in 0..basis.n_comp {
            coeffs[i] /= mass[i];
        }
    }
}

/// Nodal interpolation of a vector forcing into a pair of CG fields.
///
/// Evaluates the forcing at every dof coordinate; used each step for the
/// wind and ocean surface fields.
pub fn interpolate_cg(
    dofs: &CGDofMap2D,
    forcing: &dyn Forcing2D,
    t: f64,
    cg_x: &mut [f64],
    cg_y: &mut [f64],
) {
    assert_eq!(cg_x.len(), dofs.n_dofs);
    assert_eq!(cg_y.len(), dofs.n_dofs);

    for (dof, &(x, y)) in dofs.coords.iter().enumerate() {
        let (u, v) = forcing.evaluate(x, y, t);
        cg_x[dof] = u;
        cg_y[dof] = v;
    }
}

/// Transfer a DG field to CG dofs by evaluating at the node positions and
/// averaging the element contributions at shared dofs.
///
/// Used by the momentum solver to obtain pointwise thickness and
/// concentration values at velocity dofs.
pub fn interpolate_dg_to_cg(
    basis: &DGBasis2D,
    field: &DGField2D,
    dofs: &CGDofMap2D,
    cg_basis: &CGBasis2D,
    cg: &mut [f64],
) {
    assert_eq!(field.n_comp, basis.n_comp, "field arity must match basis");
    assert_eq!(cg.len(), dofs.n_dofs);

    let mut counts = vec![0u32; dofs.n_dofs];
    cg.fill(0.0);

    for k in 0..field.n_elements {
        let coeffs = field.cell(k);
        for (j, &dof) in dofs.element_dofs(k).iter().enumerate() {
            let (r, s) = cg_basis.node_coords[j];
            cg[dof] += basis.evaluate(coeffs, r, s);
            counts[dof] += 1;
        }
    }

    for (v, &n) in cg.iter_mut().zip(&counts) {
        if n > 0 {
            *v /= n as f64;
        }
    }
}
