//! Legendre polynomials and Gauss–Legendre quadrature rules.
//!
//! The modal DG basis is built from Legendre-product polynomials, so the
//! quadrature here is classical Gauss–Legendre (interior points): an n-point
//! rule integrates polynomials of degree 2n-1 exactly, which is what the
//! diagonal mass matrices and flux integrals rely on.

/// Evaluate the Legendre polynomial P_n and its derivative at x.
///
/// Uses the three-term recurrence and the derivative identity
/// P_n'(x) = n * (x * P_n(x) - P_{n-1}(x)) / (x² - 1).
pub fn legendre_with_derivative(n: usize, x: f64) -> (f64, f64) {
    if n == 0 {
        return (1.0, 0.0);
    }

    let mut p_prev = 1.0;
    let mut p = x;
    for k in 1..n {
        let k_f = k as f64;
        let p_next = ((2.0 * k_f + 1.0) * x * p - k_f * p_prev) / (k_f + 1.0);
        p_prev = p;
        p = p_next;
    }

    let dp = if (x * x - 1.0).abs() < 1e-14 {
        // Endpoint limit: P_n'(±1) = (±1)^{n+1} n(n+1)/2
        let sign = if x > 0.0 { 1.0_f64 } else { -1.0_f64 };
        let n_f = n as f64;
        sign.powi(n as i32 + 1) * n_f * (n_f + 1.0) / 2.0
    } else {
        n as f64 * (x * p - p_prev) / (x * x - 1.0)
    };

    (p, dp)
}

/// Compute the n-point Gauss–Legendre rule on [-1, 1].
///
/// Nodes are the roots of P_n, found by Newton iteration from a
/// Chebyshev-type initial guess; weights are 2 / ((1 - x²) P_n'(x)²).
/// Returns (nodes, weights) with nodes in ascending order.
pub fn gauss_legendre(n: usize) -> (Vec<f64>, Vec<f64>) {
    assert!(n >= 1, "Quadrature rule needs at least one point");

    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];

    for i in 0..n {
        // Initial guess; this formula orders roots descending in i
        let mut x = (std::f64::consts::PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();

        for _ in 0..100 {
            let (p, dp) = legendre_with_derivative(n, x);
            let dx = p / dp;
            x -= dx;
            if dx.abs() < 1e-15 {
                break;
            }
        }

        let (_, dp) = legendre_with_derivative(n, x);
        // Store ascending
        nodes[n - 1 - i] = x;
        weights[n - 1 - i] = 2.0 / ((1.0 - x * x) * dp * dp);
    }

    (nodes, weights)
}

/// Tensor-product Gauss–Legendre rule on the reference square [-1, 1]²
/// plus the matching 1-D rule for element edges.
///
/// Volume point ordering: q = j * n_1d + i corresponds to (x_i, x_j),
/// i.e. the r-coordinate varies fastest.
#[derive(Clone)]
pub struct Quadrature2D {
    /// Points per direction
    pub n_1d: usize,
    /// Volume quadrature points (r, s), length n_1d²
    pub points: Vec<(f64, f64)>,
    /// Volume quadrature weights, length n_1d²
    pub weights: Vec<f64>,
    /// 1-D edge quadrature points, length n_1d
    pub edge_points: Vec<f64>,
    /// 1-D edge quadrature weights, length n_1d
    pub edge_weights: Vec<f64>,
}

impl Quadrature2D {
    /// Create a rule with `n_1d` points per direction.
    pub fn new(n_1d: usize) -> Self {
        let (nodes, w_1d) = gauss_legendre(n_1d);

        let mut points = Vec::with_capacity(n_1d * n_1d);
        let mut weights = Vec::with_capacity(n_1d * n_1d);
        for j in 0..n_1d {
            for i in 0..n_1d {
                points.push((nodes[i], nodes[j]));
                weights.push(w_1d[i] * w_1d[j]);
            }
        }

        Self {
            n_1d,
            points,
            weights,
            edge_points: nodes,
            edge_weights: w_1d,
        }
    }

    /// Create a rule sufficient for a basis of polynomial degree `p`.
    ///
    /// `p + 2` points per direction integrate all products appearing in the
    /// mass matrices and flux integrals of such a basis exactly (on affine
    /// elements).
    pub fn for_degree(p: usize) -> Self {
        Self::new(p + 2)
    }

    /// Number of volume quadrature points.
    #[inline]
    pub fn n_volume(&self) -> usize {
        self.n_1d * self.n_1d
    }

    /// Number of quadrature points along one edge.
    #[inline]
    pub fn n_edge(&self) -> usize {
        self.n_1d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legendre_values() {
        // P_2(x) = (3x² - 1)/2
        let (p, dp) = legendre_with_derivative(2, 0.5);
        assert!((p - (3.0 * 0.25 - 1.0) / 2.0).abs() < 1e-14);
        assert!((dp - 3.0 * 0.5).abs() < 1e-14);
    }

    #[test]
    fn test_gauss_legendre_weights_sum() {
        for n in 1..=6 {
            let (_, w) = gauss_legendre(n);
            let sum: f64 = w.iter().sum();
            assert!(
                (sum - 2.0).abs() < 1e-13,
                "n = {}: weights should sum to 2, got {}",
                n,
                sum
            );
        }
    }

    #[test]
    fn test_gauss_legendre_exactness() {
        // 3-point rule integrates degree 5 exactly: ∫ x⁴ dx = 2/5
        let (x, w) = gauss_legendre(3);
        let integral: f64 = x.iter().zip(&w).map(|(&xi, &wi)| wi * xi.powi(4)).sum();
        assert!((integral - 0.4).abs() < 1e-14);
    }

    #[test]
    fn test_nodes_ascending_and_symmetric() {
        let (x, _) = gauss_legendre(4);
        for i in 1..x.len() {
            assert!(x[i] > x[i - 1], "Nodes should be ascending");
        }
        for i in 0..x.len() {
            assert!(
                (x[i] + x[x.len() - 1 - i]).abs() < 1e-14,
                "Nodes should be symmetric about 0"
            );
        }
    }

    #[test]
    fn test_quadrature_2d_volume() {
        let quad = Quadrature2D::new(3);
        assert_eq!(quad.n_volume(), 9);
        assert_eq!(quad.n_edge(), 3);

        let area: f64 = quad.weights.iter().sum();
        assert!((area - 4.0).abs() < 1e-13, "Reference square has area 4");

        // ∫∫ r² s² dr ds = (2/3)² = 4/9
        let integral: f64 = quad
            .points
            .iter()
            .zip(&quad.weights)
            .map(|(&(r, s), &w)| w * r * r * s * s)
            .sum();
        assert!((integral - 4.0 / 9.0).abs() < 1e-13);
    }

    #[test]
    fn test_for_degree_sizing() {
        assert_eq!(Quadrature2D::for_degree(1).n_1d, 3);
        assert_eq!(Quadrature2D::for_degree(3).n_1d, 5);
    }
}
