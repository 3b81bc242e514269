//! Field containers for the DG and CG spaces.
//!
//! - [`DGField2D`]: one fixed-arity coefficient vector per element,
//!   discontinuous across element boundaries. The arity is uniform over
//!   the field and must match the basis it is used with; consumers assert
//!   this and fail fast on mismatch.
//! - [`StressField2D`]: the symmetric-tensor triple (xx, xy, yy) of DG
//!   fields used for strain rates and stresses.
//! - [`CGDofMap2D`]: global numbering for the continuous velocity space.
//!   A CG field itself is a plain `Vec<f64>` indexed by global dof; a
//!   vertex shared by several elements has exactly one value, so
//!   continuity holds by construction.

use crate::basis::DGBasis2D;
use crate::mesh::Mesh2D;
use crate::operators::GeometricFactors2D;

/// Per-element modal coefficients of a scalar DG field.
#[derive(Clone, Debug)]
pub struct DGField2D {
    /// Coefficients, element-major: data[k * n_comp + i]
    pub data: Vec<f64>,
    /// Coefficients per element (1, 3, 6 or 8)
    pub n_comp: usize,
    /// Number of elements
    pub n_elements: usize,
}

impl DGField2D {
    /// Create a zero field sized for a mesh.
    pub fn new(n_elements: usize, n_comp: usize) -> Self {
        Self {
            data: vec![0.0; n_elements * n_comp],
            n_comp,
            n_elements,
        }
    }

    /// Coefficient slice of element k.
    #[inline]
    pub fn cell(&self, k: usize) -> &[f64] {
        &self.data[k * self.n_comp..(k + 1) * self.n_comp]
    }

    /// Mutable coefficient slice of element k.
    #[inline]
    pub fn cell_mut(&mut self, k: usize) -> &mut [f64] {
        &mut self.data[k * self.n_comp..(k + 1) * self.n_comp]
    }

    /// Element mean (the constant-mode coefficient: all other modes have
    /// zero reference mean).
    #[inline]
    pub fn mean(&self, k: usize) -> f64 {
        self.data[k * self.n_comp]
    }

    /// Evaluate the field at reference coordinates (r, s) of element k.
    pub fn evaluate(&self, k: usize, r: f64, s: f64, basis: &DGBasis2D) -> f64 {
        assert_eq!(self.n_comp, basis.n_comp, "field arity must match basis");
        basis.evaluate(self.cell(k), r, s)
    }

    /// Set every coefficient; constant-mode to `value`, the rest to zero.
    pub fn fill_constant(&mut self, value: f64) {
        self.data.fill(0.0);
        for k in 0..self.n_elements {
            self.data[k * self.n_comp] = value;
        }
    }

    /// Multiply all coefficients by a scalar.
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.data {
            *v *= factor;
        }
    }

    /// self += alpha * other.
    pub fn axpy(&mut self, alpha: f64, other: &Self) {
        assert_eq!(self.data.len(), other.data.len(), "field size mismatch");
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += alpha * b;
        }
    }

    /// Integral of the field over the whole mesh (the transported "mass").
    pub fn total_integral(&self, basis: &DGBasis2D, geom: &GeometricFactors2D) -> f64 {
        assert_eq!(self.n_comp, basis.n_comp, "field arity must match basis");
        assert_eq!(self.n_elements, geom.n_elements, "field sized for a different mesh");

        let mut total = 0.0;
        for k in 0..self.n_elements {
            let coeffs = self.cell(k);
            for q in 0..geom.n_q {
                total += geom.w_det_j[geom.idx(k, q)] * basis.evaluate_at_q(coeffs, q);
            }
        }
        total
    }

    /// L2 norm of the field over the whole mesh.
    pub fn l2_norm(&self, basis: &DGBasis2D, geom: &GeometricFactors2D) -> f64 {
        assert_eq!(self.n_comp, basis.n_comp, "field arity must match basis");

        let mut total = 0.0;
        for k in 0..self.n_elements {
            let coeffs = self.cell(k);
            for q in 0..geom.n_q {
                let v = basis.evaluate_at_q(coeffs, q);
                total += geom.w_det_j[geom.idx(k, q)] * v * v;
            }
        }
        total.sqrt()
    }

    /// True if every coefficient is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

/// Symmetric-tensor DG field (strain rate or stress): components
/// (xx, xy, yy), all of the same stress-space arity.
#[derive(Clone, Debug)]
pub struct StressField2D {
    pub xx: DGField2D,
    pub xy: DGField2D,
    pub yy: DGField2D,
}

impl StressField2D {
    /// Create a zero tensor field sized for a mesh.
    pub fn new(n_elements: usize, n_comp: usize) -> Self {
        Self {
            xx: DGField2D::new(n_elements, n_comp),
            xy: DGField2D::new(n_elements, n_comp),
            yy: DGField2D::new(n_elements, n_comp),
        }
    }

    /// True if every component coefficient is finite.
    pub fn is_finite(&self) -> bool {
        self.xx.is_finite() && self.xy.is_finite() && self.yy.is_finite()
    }
}

/// Global dof numbering for the tensor-Lagrange CG space of degree 1 or 2
/// on a closed-boundary quad mesh.
///
/// Degree 1 dofs are the mesh vertices. Degree 2 adds one dof per edge
/// (midpoint) and one per element (center):
/// dof layout = [vertices | edges | centers].
#[derive(Clone)]
pub struct CGDofMap2D {
    /// Polynomial degree (1 or 2)
    pub degree: usize,
    /// Total number of global dofs
    pub n_dofs: usize,
    /// Local dofs per element: (degree + 1)²
    pub n_local: usize,
    /// Element-major local→global dof table: element_dofs[k * n_local + j],
    /// tensor order (r fastest, matching `CGBasis2D::node_coords`)
    element_dofs: Vec<usize>,
    /// Physical coordinates of each global dof
    pub coords: Vec<(f64, f64)>,
    /// Dofs lying on the domain boundary
    pub boundary_dofs: Vec<usize>,
}

impl CGDofMap2D {
    /// Build the dof map for a mesh.
    ///
    /// The mesh must have a closed boundary: periodic meshes duplicate
    /// dofs along the wrap seam and cannot carry a continuous space.
    pub fn new(mesh: &Mesh2D, degree: usize) -> Self {
        assert!(
            degree == 1 || degree == 2,
            "unsupported CG degree {degree}; expected 1 or 2"
        );
        assert!(
            mesh.n_boundary_edges > 0,
            "CG spaces require a closed-boundary mesh"
        );

        let n_local = (degree + 1) * (degree + 1);
        let n_dofs = if degree == 1 {
            mesh.n_vertices
        } else {
            mesh.n_vertices + mesh.n_edges + mesh.n_elements
        };

        let mut element_dofs = Vec::with_capacity(mesh.n_elements * n_local);
        for k in 0..mesh.n_elements {
            let [v0, v1, v2, v3] = mesh.elements[k];
            if degree == 1 {
                // Tensor order: (-1,-1), (1,-1), (-1,1), (1,1)
                element_dofs.extend_from_slice(&[v0, v1, v3, v2]);
            } else {
                let e = &mesh.element_edges[k];
                let edge_dof = |face: usize| mesh.n_vertices + e[face];
                let center = mesh.n_vertices + mesh.n_edges + k;
                // 3x3 tensor order, r fastest, s slowest
                element_dofs.extend_from_slice(&[
                    v0,
                    edge_dof(0),
                    v1,
                    edge_dof(3),
                    center,
                    edge_dof(1),
                    v3,
                    edge_dof(2),
                    v2,
                ]);
            }
        }

        // Dof coordinates from the element maps at the local node
        // positions; shared dofs get written more than once with the same
        // value on a conforming mesh.
        let local_nodes: Vec<(f64, f64)> = {
            let nodes_1d: &[f64] = if degree == 1 {
                &[-1.0, 1.0]
            } else {
                &[-1.0, 0.0, 1.0]
            };
            let n_1d = degree + 1;
            let mut nodes = Vec::with_capacity(n_local);
            for b in 0..n_1d {
                for a in 0..n_1d {
                    nodes.push((nodes_1d[a], nodes_1d[b]));
                }
            }
            nodes
        };

        let mut coords = vec![(0.0, 0.0); n_dofs];
        for k in 0..mesh.n_elements {
            for (j, &(r, s)) in local_nodes.iter().enumerate() {
                let dof = element_dofs[k * n_local + j];
                coords[dof] = mesh.reference_to_physical(k, r, s);
            }
        }

        // Boundary dofs: endpoints of every boundary edge, plus its
        // midpoint dof for degree 2.
        let mut on_boundary = vec![false; n_dofs];
        for (edge_idx, edge) in mesh.edges.iter().enumerate() {
            if edge.is_boundary() {
                on_boundary[edge.vertices.0] = true;
                on_boundary[edge.vertices.1] = true;
                if degree == 2 {
                    on_boundary[mesh.n_vertices + edge_idx] = true;
                }
            }
        }
        let boundary_dofs: Vec<usize> = (0..n_dofs).filter(|&d| on_boundary[d]).collect();

        Self {
            degree,
            n_dofs,
            n_local,
            element_dofs,
            coords,
            boundary_dofs,
        }
    }

    /// Local→global dof slice of element k.
    #[inline]
    pub fn element_dofs(&self, k: usize) -> &[usize] {
        &self.element_dofs[k * self.n_local..(k + 1) * self.n_local]
    }

    /// Create a zero CG field sized for this space.
    pub fn zero_field(&self) -> Vec<f64> {
        vec![0.0; self.n_dofs]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dg_field_basics() {
        let mut f = DGField2D::new(4, 3);
        assert_eq!(f.data.len(), 12);

        f.fill_constant(2.5);
        assert!((f.mean(2) - 2.5).abs() < 1e-15);
        assert_eq!(f.cell(1), &[2.5, 0.0, 0.0]);

        let g = f.clone();
        f.scale(2.0);
        f.axpy(-2.0, &g);
        assert!(f.data.iter().all(|&v| v.abs() < 1e-15));
    }

    #[test]
    fn test_total_integral_constant() {
        use crate::polynomial::Quadrature2D;

        let mesh = Mesh2D::rectangle(0.0, 2.0, 0.0, 1.0, 4, 2).unwrap();
        let quad = Quadrature2D::for_degree(1);
        let basis = crate::basis::DGBasis2D::new(3, &quad);
        let geom = GeometricFactors2D::compute(&mesh, &quad).unwrap();

        let mut f = DGField2D::new(mesh.n_elements, 3);
        f.fill_constant(3.0);

        // ∫ 3 over a 2 × 1 domain = 6
        assert!((f.total_integral(&basis, &geom) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_dofmap_degree1_counts() {
        let mesh = Mesh2D::rectangle(0.0, 1.0, 0.0, 1.0, 3, 2).unwrap();
        let dofs = CGDofMap2D::new(&mesh, 1);

        assert_eq!(dofs.n_dofs, 12);
        assert_eq!(dofs.n_local, 4);
        // Boundary ring of a 3 × 2 grid: 2*(3+2) = 10 vertices
        assert_eq!(dofs.boundary_dofs.len(), 10);
    }

    #[test]
    fn test_dofmap_degree2_counts() {
        let mesh = Mesh2D::rectangle(0.0, 1.0, 0.0, 1.0, 2, 2).unwrap();
        let dofs = CGDofMap2D::new(&mesh, 2);

        // Equivalent to a (2*2+1)² nodal grid
        assert_eq!(dofs.n_dofs, 25);
        assert_eq!(dofs.n_local, 9);
        // Boundary of the 5 × 5 nodal grid: 16 nodes
        assert_eq!(dofs.boundary_dofs.len(), 16);
    }

    #[test]
    fn test_dofmap_shared_dofs() {
        let mesh = Mesh2D::rectangle(0.0, 1.0, 0.0, 1.0, 2, 1).unwrap();
        let dofs = CGDofMap2D::new(&mesh, 1);

        // Elements 0 and 1 share the vertical edge dofs
        let d0 = dofs.element_dofs(0);
        let d1 = dofs.element_dofs(1);
        assert_eq!(d0[1], d1[0]); // bottom shared vertex
        assert_eq!(d0[3], d1[2]); // top shared vertex
    }

    #[test]
    fn test_dofmap_coordinates() {
        let mesh = Mesh2D::rectangle(0.0, 2.0, 0.0, 2.0, 2, 2).unwrap();
        let dofs = CGDofMap2D::new(&mesh, 2);

        // Center dof of element 0 sits at the element midpoint (0.5, 0.5)
        let center = mesh.n_vertices + mesh.n_edges;
        let (x, y) = dofs.coords[center];
        assert!((x - 0.5).abs() < 1e-14 && (y - 0.5).abs() < 1e-14);
    }

    #[test]
    #[should_panic(expected = "closed-boundary")]
    fn test_dofmap_rejects_periodic() {
        let mesh = Mesh2D::periodic(0.0, 1.0, 0.0, 1.0, 2, 2).unwrap();
        let _ = CGDofMap2D::new(&mesh, 1);
    }
}
