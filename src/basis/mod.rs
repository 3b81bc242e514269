//! Basis descriptors for the DG and CG spaces.
//!
//! Two families live here:
//! - [`DGBasis2D`]: modal, orthogonal Legendre-product modes on the
//!   reference square [-1, 1]², selected by arity (1, 3, 6 or 8
//!   coefficients). All non-constant modes have zero mean over the
//!   reference square, so coefficient 0 is the element mean and the
//!   reference mass matrix is diagonal, making projection a
//!   per-coefficient scalar divide.
//! - [`CGBasis2D`]: nodal tensor-Lagrange shape functions of degree 1 or 2
//!   for the continuous velocity space.
//!
//! Both tabulate their values and reference gradients at the quadrature
//! points of a [`Quadrature2D`] once, at construction; the per-element
//! loops only read these tables.
//!
//! Face convention (counter-clockwise around the element):
//! - Face 0 (bottom): (ξ, -1), ξ from -1 to +1
//! - Face 1 (right):  (+1, ξ)
//! - Face 2 (top):    (-ξ, +1)
//! - Face 3 (left):   (-1, -ξ)
//!
//! Two elements sharing an edge traverse it in opposite directions, so
//! edge quadrature point q on one side coincides with point n-1-q on the
//! other (Gauss points are symmetric about 0).

use crate::polynomial::Quadrature2D;
use faer::Mat;

/// Number of faces of a quadrilateral element.
pub const N_FACES: usize = 4;

/// Map a face-local coordinate ξ ∈ [-1, 1] to reference coordinates (r, s).
#[inline]
pub fn face_reference_coords(face: usize, xi: f64) -> (f64, f64) {
    match face {
        0 => (xi, -1.0),
        1 => (1.0, xi),
        2 => (-xi, 1.0),
        3 => (-1.0, -xi),
        _ => unreachable!("face index out of range"),
    }
}

/// Evaluate modal basis function `i` at reference coordinates (r, s).
///
/// Mode ordering: 1, r, s, r² - 1/3, s² - 1/3, rs, (r² - 1/3)s, r(s² - 1/3).
#[inline]
pub fn dg_mode(i: usize, r: f64, s: f64) -> f64 {
    match i {
        0 => 1.0,
        1 => r,
        2 => s,
        3 => r * r - 1.0 / 3.0,
        4 => s * s - 1.0 / 3.0,
        5 => r * s,
        6 => (r * r - 1.0 / 3.0) * s,
        7 => r * (s * s - 1.0 / 3.0),
        _ => unreachable!("modal index out of range"),
    }
}

/// Reference gradient (d/dr, d/ds) of modal basis function `i`.
#[inline]
pub fn dg_mode_gradient(i: usize, r: f64, s: f64) -> (f64, f64) {
    match i {
        0 => (0.0, 0.0),
        1 => (1.0, 0.0),
        2 => (0.0, 1.0),
        3 => (2.0 * r, 0.0),
        4 => (0.0, 2.0 * s),
        5 => (s, r),
        6 => (2.0 * r * s, r * r - 1.0 / 3.0),
        7 => (s * s - 1.0 / 3.0, 2.0 * r * s),
        _ => unreachable!("modal index out of range"),
    }
}

/// Modal DG basis of arity 1, 3, 6 or 8 with precomputed quadrature tables.
///
/// Arity 8 is the "stress space": the gradient space of the biquadratic CG
/// velocity (arity 3 plays the same role for bilinear CG).
#[derive(Clone)]
pub struct DGBasis2D {
    /// Number of coefficients per element
    pub n_comp: usize,
    /// Maximum polynomial degree of the modes (0, 1, 2 or 3)
    pub degree: usize,
    /// Number of volume quadrature points
    pub n_q: usize,
    /// Number of edge quadrature points
    pub n_edge_q: usize,
    /// Mode values at volume points: psi[(i, q)]
    pub psi: Mat<f64>,
    /// d(psi)/dr at volume points
    pub dpsi_dr: Mat<f64>,
    /// d(psi)/ds at volume points
    pub dpsi_ds: Mat<f64>,
    /// Mode values along each face at edge points: psi_face[f][(i, q)]
    pub psi_face: [Mat<f64>; N_FACES],
}

impl DGBasis2D {
    /// Create a basis of the given arity, tabulated on `quad`.
    ///
    /// Panics on an arity outside {1, 3, 6, 8}: the degree/arity pairing
    /// is a construction-time contract, not a runtime condition.
    pub fn new(n_comp: usize, quad: &Quadrature2D) -> Self {
        let degree = match n_comp {
            1 => 0,
            3 => 1,
            6 => 2,
            8 => 3,
            _ => panic!("unsupported DG arity {n_comp}; expected 1, 3, 6 or 8"),
        };

        let n_q = quad.n_volume();
        let n_edge_q = quad.n_edge();

        let mut psi = Mat::zeros(n_comp, n_q);
        let mut dpsi_dr = Mat::zeros(n_comp, n_q);
        let mut dpsi_ds = Mat::zeros(n_comp, n_q);
        for (q, &(r, s)) in quad.points.iter().enumerate() {
            for i in 0..n_comp {
                psi[(i, q)] = dg_mode(i, r, s);
                let (dr, ds) = dg_mode_gradient(i, r, s);
                dpsi_dr[(i, q)] = dr;
                dpsi_ds[(i, q)] = ds;
            }
        }

        let psi_face = std::array::from_fn(|face| {
            let mut m = Mat::zeros(n_comp, n_edge_q);
            for (q, &xi) in quad.edge_points.iter().enumerate() {
                let (r, s) = face_reference_coords(face, xi);
                for i in 0..n_comp {
                    m[(i, q)] = dg_mode(i, r, s);
                }
            }
            m
        });

        Self {
            n_comp,
            degree,
            n_q,
            n_edge_q,
            psi,
            dpsi_dr,
            dpsi_ds,
            psi_face,
        }
    }

    /// Evaluate a coefficient vector at reference coordinates (r, s).
    #[inline]
    pub fn evaluate(&self, coeffs: &[f64], r: f64, s: f64) -> f64 {
        debug_assert_eq!(coeffs.len(), self.n_comp);
        let mut value = 0.0;
        for i in 0..self.n_comp {
            value += coeffs[i] * dg_mode(i, r, s);
        }
        value
    }

    /// Evaluate a coefficient vector at volume quadrature point q.
    #[inline]
    pub fn evaluate_at_q(&self, coeffs: &[f64], q: usize) -> f64 {
        let mut value = 0.0;
        for i in 0..self.n_comp {
            value += coeffs[i] * self.psi[(i, q)];
        }
        value
    }

    /// Evaluate a coefficient vector at edge quadrature point q of a face.
    #[inline]
    pub fn evaluate_on_face(&self, coeffs: &[f64], face: usize, q: usize) -> f64 {
        let table = &self.psi_face[face];
        let mut value = 0.0;
        for i in 0..self.n_comp {
            value += coeffs[i] * table[(i, q)];
        }
        value
    }
}

/// Nodal tensor-Lagrange basis of degree 1 or 2 for the CG velocity space,
/// with shape values and reference gradients tabulated at volume
/// quadrature points.
#[derive(Clone)]
pub struct CGBasis2D {
    /// Polynomial degree (1 or 2)
    pub degree: usize,
    /// Local nodes per element: (degree + 1)²
    pub n_local: usize,
    /// Number of volume quadrature points
    pub n_q: usize,
    /// Reference coordinates of the local nodes, tensor order (r fastest)
    pub node_coords: Vec<(f64, f64)>,
    /// Shape values at volume points: phi[(j, q)]
    pub phi: Mat<f64>,
    /// d(phi)/dr at volume points
    pub dphi_dr: Mat<f64>,
    /// d(phi)/ds at volume points
    pub dphi_ds: Mat<f64>,
}

/// 1-D Lagrange value and derivative on {-1, +1} (degree 1) or
/// {-1, 0, +1} (degree 2).
#[inline]
fn lagrange_1d(degree: usize, node: usize, x: f64) -> (f64, f64) {
    match (degree, node) {
        (1, 0) => ((1.0 - x) / 2.0, -0.5),
        (1, 1) => ((1.0 + x) / 2.0, 0.5),
        (2, 0) => (x * (x - 1.0) / 2.0, x - 0.5),
        (2, 1) => (1.0 - x * x, -2.0 * x),
        (2, 2) => (x * (x + 1.0) / 2.0, x + 0.5),
        _ => unreachable!("lagrange node out of range"),
    }
}

impl CGBasis2D {
    /// Create a CG basis of the given degree, tabulated on `quad`.
    pub fn new(degree: usize, quad: &Quadrature2D) -> Self {
        assert!(
            degree == 1 || degree == 2,
            "unsupported CG degree {degree}; expected 1 or 2"
        );

        let n_1d = degree + 1;
        let n_local = n_1d * n_1d;
        let n_q = quad.n_volume();

        let nodes_1d: &[f64] = if degree == 1 {
            &[-1.0, 1.0]
        } else {
            &[-1.0, 0.0, 1.0]
        };

        let mut node_coords = Vec::with_capacity(n_local);
        for b in 0..n_1d {
            for a in 0..n_1d {
                node_coords.push((nodes_1d[a], nodes_1d[b]));
            }
        }

        let mut phi = Mat::zeros(n_local, n_q);
        let mut dphi_dr = Mat::zeros(n_local, n_q);
        let mut dphi_ds = Mat::zeros(n_local, n_q);
        for (q, &(r, s)) in quad.points.iter().enumerate() {
            for b in 0..n_1d {
                for a in 0..n_1d {
                    let j = b * n_1d + a;
                    let (la, dla) = lagrange_1d(degree, a, r);
                    let (lb, dlb) = lagrange_1d(degree, b, s);
                    phi[(j, q)] = la * lb;
                    dphi_dr[(j, q)] = dla * lb;
                    dphi_ds[(j, q)] = la * dlb;
                }
            }
        }

        Self {
            degree,
            n_local,
            n_q,
            node_coords,
            phi,
            dphi_dr,
            dphi_ds,
        }
    }

    /// Arity of the DG space that holds gradients of this CG space exactly.
    ///
    /// Bilinear velocity gradients live in {1, r, s}; biquadratic gradients
    /// need the full 8-mode space.
    #[inline]
    pub fn stress_arity(&self) -> usize {
        if self.degree == 1 { 3 } else { 8 }
    }
}
