//! Geometric factors for 2D parametric elements.
//!
//! The bilinear map of a distorted quadrilateral has a position-dependent
//! Jacobian, so the determinant and inverse-Jacobian entries are evaluated
//! and cached at every volume quadrature point of every element. This is
//! done once at setup; the time loop only reads the tables. The factors
//! transform derivatives from reference to physical space:
//!
//! du/dx = rx * du/dr + sx * du/ds
//! du/dy = ry * du/dr + sy * du/ds
//!
//! Element edges are straight (they connect two vertices), so each face
//! has a constant outward unit normal and a physical length.

use crate::mesh::{Mesh2D, MeshError};
use crate::polynomial::Quadrature2D;

/// Cached Jacobian and edge geometry, evaluated at the quadrature points
/// of a fixed rule.
///
/// Volume tables use the flat layout `[k * n_q + q]`.
#[derive(Clone)]
pub struct GeometricFactors2D {
    /// Jacobian determinant at each (element, quadrature point)
    pub det_j: Vec<f64>,

    /// Quadrature weight times Jacobian determinant at each
    /// (element, quadrature point), the measure every volume integral
    /// loop multiplies by
    pub w_det_j: Vec<f64>,

    /// dr/dx at each (element, quadrature point)
    pub rx: Vec<f64>,

    /// dr/dy at each (element, quadrature point)
    pub ry: Vec<f64>,

    /// ds/dx at each (element, quadrature point)
    pub sx: Vec<f64>,

    /// ds/dy at each (element, quadrature point)
    pub sy: Vec<f64>,

    /// Physical position of each (element, quadrature point)
    pub xy: Vec<(f64, f64)>,

    /// Element areas: area[k] = Σ_q w_q det_j
    pub area: Vec<f64>,

    /// Physical edge length for each face of each element
    pub edge_len: Vec<[f64; 4]>,

    /// Outward unit normal for each face of each element
    pub normals: Vec<[(f64, f64); 4]>,

    /// Number of elements
    pub n_elements: usize,

    /// Number of volume quadrature points per element
    pub n_q: usize,
}

impl GeometricFactors2D {
    /// Evaluate all geometric data for `mesh` at the points of `quad`.
    ///
    /// Fails if any element has a non-positive Jacobian determinant at a
    /// quadrature point.
    pub fn compute(mesh: &Mesh2D, quad: &Quadrature2D) -> Result<Self, MeshError> {
        let n_elements = mesh.n_elements;
        let n_q = quad.n_volume();

        let mut det_j = Vec::with_capacity(n_elements * n_q);
        let mut w_det_j = Vec::with_capacity(n_elements * n_q);
        let mut rx = Vec::with_capacity(n_elements * n_q);
        let mut ry = Vec::with_capacity(n_elements * n_q);
        let mut sx = Vec::with_capacity(n_elements * n_q);
        let mut sy = Vec::with_capacity(n_elements * n_q);
        let mut xy = Vec::with_capacity(n_elements * n_q);
        let mut area = Vec::with_capacity(n_elements);
        let mut edge_len = Vec::with_capacity(n_elements);
        let mut normals = Vec::with_capacity(n_elements);

        for k in 0..n_elements {
            let mut area_k = 0.0;
            for (q, &(r, s)) in quad.points.iter().enumerate() {
                let (x_r, x_s, y_r, y_s) = mesh.jacobian(k, r, s);
                let det = x_r * y_s - x_s * y_r;
                if det <= 0.0 {
                    return Err(MeshError::DegenerateElement {
                        element: k,
                        det_j: det,
                    });
                }

                det_j.push(det);
                w_det_j.push(quad.weights[q] * det);
                rx.push(y_s / det);
                ry.push(-x_s / det);
                sx.push(-y_r / det);
                sy.push(x_r / det);
                xy.push(mesh.reference_to_physical(k, r, s));
                area_k += quad.weights[q] * det;
            }
            area.push(area_k);

            let verts = mesh.element_vertices(k);
            let (len_k, norm_k) = edge_geometry(&verts);
            edge_len.push(len_k);
            normals.push(norm_k);
        }

        Ok(Self {
            det_j,
            w_det_j,
            rx,
            ry,
            sx,
            sy,
            xy,
            area,
            edge_len,
            normals,
            n_elements,
            n_q,
        })
    }

    /// Flat table index for (element, quadrature point).
    #[inline]
    pub fn idx(&self, k: usize, q: usize) -> usize {
        k * self.n_q + q
    }

    /// Transform reference derivatives to physical derivatives at a
    /// quadrature point.
    #[inline]
    pub fn transform_derivatives(
        &self,
        k: usize,
        q: usize,
        du_dr: f64,
        du_ds: f64,
    ) -> (f64, f64) {
        let i = self.idx(k, q);
        (
            self.rx[i] * du_dr + self.sx[i] * du_ds,
            self.ry[i] * du_dr + self.sy[i] * du_ds,
        )
    }

    /// Total mesh area.
    pub fn total_area(&self) -> f64 {
        self.area.iter().sum()
    }
}

/// Edge lengths and outward unit normals for one element.
///
/// Faces traverse the boundary counter-clockwise (v0→v1, v1→v2, v2→v3,
/// v3→v0); rotating the tangent by -90° gives the outward normal.
fn edge_geometry(verts: &[(f64, f64); 4]) -> ([f64; 4], [(f64, f64); 4]) {
    let mut len = [0.0; 4];
    let mut normals = [(0.0, 0.0); 4];

    for face in 0..4 {
        let (xa, ya) = verts[face];
        let (xb, yb) = verts[(face + 1) % 4];
        let dx = xb - xa;
        let dy = yb - ya;
        let l = (dx * dx + dy * dy).sqrt();
        len[face] = l;
        normals[face] = (dy / l, -dx / l);
    }

    (len, normals)
}
