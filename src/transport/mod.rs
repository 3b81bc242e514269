//! DG transport (advection) operator with upwind edge fluxes.
//!
//! Advances a scalar DG field under a given advecting velocity with an
//! explicit strong-stability-preserving Runge–Kutta scheme. The
//! semi-discrete right-hand side of element K is
//!
//!   M⁻¹ [ ∫_K φ v·∇ψ_i dx  -  Σ_faces ∫_e u_n φ↑ ψ_i ds ]
//!
//! with full upwinding: φ↑ is the trace of the upstream element, selected
//! by the sign of the edge normal velocity u_n. The normal velocity is
//! cached per edge quadrature point and must be recomputed with
//! [`DGTransport2D::reinit_normal_velocity`] whenever the advecting
//! velocity changes.
//!
//! Stability: the operator does not check the CFL condition; choosing a
//! stable `dt` is the caller's responsibility ([`DGTransport2D::max_stable_dt`]
//! gives the standard estimate). Mass conservation additionally assumes a
//! divergence-free advecting velocity; this is a documented precondition,
//! not a validated one.

use crate::basis::DGBasis2D;
use crate::fields::DGField2D;
use crate::mesh::Mesh2D;
use crate::operators::GeometricFactors2D;
use crate::polynomial::Quadrature2D;
use crate::projection::diagonal_mass;

/// Explicit SSP Runge–Kutta time stepping schemes.
///
/// Heun's method is the default: its convex-combination form preserves the
/// bounds that the limiter establishes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimeScheme {
    /// Forward Euler (one stage)
    Euler,
    /// Heun / SSP-RK2 (two stages)
    #[default]
    Heun,
    /// Shu–Osher SSP-RK3 (three stages)
    SspRk3,
}

/// DG advection operator holding the advecting velocity and its cached
/// per-edge normal traces.
pub struct DGTransport2D {
    /// Advecting velocity, x-component (same arity as transported fields)
    pub vx: DGField2D,
    /// Advecting velocity, y-component
    pub vy: DGField2D,
    /// Time stepping scheme used by [`step`](Self::step)
    pub scheme: TimeScheme,
    /// Normal velocity at each edge quadrature point, indexed
    /// [edge * n_edge_q + q] in the left element's face parameterization,
    /// positive in the direction of the left element's outward normal
    normal_vel: Vec<f64>,
    n_edge_q: usize,
}

impl DGTransport2D {
    /// Create a transport operator with zero advecting velocity.
    pub fn new(mesh: &Mesh2D, basis: &DGBasis2D, quad: &Quadrature2D) -> Self {
        Self {
            vx: DGField2D::new(mesh.n_elements, basis.n_comp),
            vy: DGField2D::new(mesh.n_elements, basis.n_comp),
            scheme: TimeScheme::default(),
            normal_vel: vec![0.0; mesh.n_edges * quad.n_edge()],
            n_edge_q: quad.n_edge(),
        }
    }

    /// Select the Runge–Kutta scheme.
    pub fn set_time_scheme(&mut self, scheme: TimeScheme) {
        self.scheme = scheme;
    }

    /// Recompute the cached edge normal velocities from the current
    /// advecting velocity.
    ///
    /// Interior edges average the two adjacent traces; boundary edges use
    /// the single interior trace. Must be called after every change to
    /// `vx` / `vy`; the upwind flux direction is derived from this cache.
    pub fn reinit_normal_velocity(
        &mut self,
        mesh: &Mesh2D,
        basis: &DGBasis2D,
        geom: &GeometricFactors2D,
    ) {
        assert_eq!(self.vx.n_comp, basis.n_comp, "velocity arity must match basis");
        let n_q = self.n_edge_q;

        for (e, edge) in mesh.edges.iter().enumerate() {
            let kl = edge.left.element;
            let fl = edge.left.face;
            let (nx, ny) = geom.normals[kl][fl];

            for q in 0..n_q {
                let mut un = basis.evaluate_on_face(self.vx.cell(kl), fl, q) * nx
                    + basis.evaluate_on_face(self.vy.cell(kl), fl, q) * ny;

                if let Some(right) = edge.right {
                    // The neighbor traverses the shared edge in the
                    // opposite direction: its point n-1-q is this point.
                    let qr = n_q - 1 - q;
                    let un_r = basis.evaluate_on_face(self.vx.cell(right.element), right.face, qr)
                        * nx
                        + basis.evaluate_on_face(self.vy.cell(right.element), right.face, qr) * ny;
                    un = 0.5 * (un + un_r);
                }

                self.normal_vel[e * n_q + q] = un;
            }
        }
    }

    /// Semi-discrete right-hand side L(φ) for the current velocity.
    pub fn compute_rhs(
        &self,
        mesh: &Mesh2D,
        basis: &DGBasis2D,
        geom: &GeometricFactors2D,
        quad: &Quadrature2D,
        phi: &DGField2D,
    ) -> DGField2D {
        assert_eq!(phi.n_comp, basis.n_comp, "field arity must match basis");
        assert_eq!(phi.n_elements, mesh.n_elements, "field sized for a different mesh");

        let mut rhs = DGField2D::new(mesh.n_elements, basis.n_comp);
        for k in 0..mesh.n_elements {
            let mut out = vec![0.0; basis.n_comp];
            self.element_rhs(k, mesh, basis, geom, quad, phi, &mut out);
            rhs.cell_mut(k).copy_from_slice(&out);
        }
        rhs
    }

    /// Parallel twin of [`compute_rhs`](Self::compute_rhs); identical
    /// result, elements processed independently.
    #[cfg(feature = "parallel")]
    pub fn compute_rhs_parallel(
        &self,
        mesh: &Mesh2D,
        basis: &DGBasis2D,
        geom: &GeometricFactors2D,
        quad: &Quadrature2D,
        phi: &DGField2D,
    ) -> DGField2D {
        use rayon::prelude::*;

        assert_eq!(phi.n_comp, basis.n_comp, "field arity must match basis");
        assert_eq!(phi.n_elements, mesh.n_elements, "field sized for a different mesh");

        let mut rhs = DGField2D::new(mesh.n_elements, basis.n_comp);
        rhs.data
            .par_chunks_mut(basis.n_comp)
            .enumerate()
            .for_each(|(k, out)| {
                self.element_rhs(k, mesh, basis, geom, quad, phi, out);
            });
        rhs
    }

    /// Volume term, four surface terms and mass inversion for one element.
    fn element_rhs(
        &self,
        k: usize,
        mesh: &Mesh2D,
        basis: &DGBasis2D,
        geom: &GeometricFactors2D,
        quad: &Quadrature2D,
        phi: &DGField2D,
        out: &mut [f64],
    ) {
        let n_comp = basis.n_comp;
        let n_q = self.n_edge_q;
        out.fill(0.0);

        // Volume term: ∫ φ v·∇ψ_i
        let coeffs = phi.cell(k);
        let vx_k = self.vx.cell(k);
        let vy_k = self.vy.cell(k);
        for q in 0..geom.n_q {
            let idx = geom.idx(k, q);
            let w = geom.w_det_j[idx];
            let value = basis.evaluate_at_q(coeffs, q);
            let vx_q = basis.evaluate_at_q(vx_k, q);
            let vy_q = basis.evaluate_at_q(vy_k, q);

            let (rx, ry, sx, sy) = (geom.rx[idx], geom.ry[idx], geom.sx[idx], geom.sy[idx]);
            for i in 0..n_comp {
                let dpr = basis.dpsi_dr[(i, q)];
                let dps = basis.dpsi_ds[(i, q)];
                let dpsi_dx = rx * dpr + sx * dps;
                let dpsi_dy = ry * dpr + sy * dps;
                out[i] += w * value * (vx_q * dpsi_dx + vy_q * dpsi_dy);
            }
        }

        // Surface terms: - ∫ u_n φ↑ ψ_i over each face
        for face in 0..4 {
            let e = mesh.element_edges[k][face];
            let edge = &mesh.edges[e];
            let is_left = edge.left.element == k && edge.left.face == face;
            let edge_jac = geom.edge_len[k][face] / 2.0;

            for q in 0..n_q {
                // Edge cache is indexed in the left element's
                // parameterization; flip index and sign on the right side.
                let un_k = if is_left {
                    self.normal_vel[e * n_q + q]
                } else {
                    -self.normal_vel[e * n_q + (n_q - 1 - q)]
                };

                let upwind = if un_k >= 0.0 {
                    basis.evaluate_on_face(coeffs, face, q)
                } else {
                    let neighbor = if is_left { edge.right } else { Some(edge.left) };
                    match neighbor {
                        Some(nb) => basis.evaluate_on_face(
                            phi.cell(nb.element),
                            nb.face,
                            n_q - 1 - q,
                        ),
                        // Closed boundary: nothing advects in
                        None => 0.0,
                    }
                };

                let flux = quad.edge_weights[q] * edge_jac * un_k * upwind;
                for i in 0..n_comp {
                    out[i] -= flux * basis.psi_face[face][(i, q)];
                }
            }
        }

        // Diagonal mass inversion
        let mut mass = vec![0.0; n_comp];
        diagonal_mass(basis, geom, k, &mut mass);
        for i in 0..n_comp {
            out[i] /= mass[i];
        }
    }

    /// Advance a field by one time step with the selected scheme.
    pub fn step(
        &self,
        mesh: &Mesh2D,
        basis: &DGBasis2D,
        geom: &GeometricFactors2D,
        quad: &Quadrature2D,
        dt: f64,
        phi: &mut DGField2D,
    ) {
        match self.scheme {
            TimeScheme::Euler => {
                let l0 = self.compute_rhs(mesh, basis, geom, quad, phi);
                phi.axpy(dt, &l0);
            }
            TimeScheme::Heun => {
                // u1 = u + dt L(u); u <- 1/2 u + 1/2 (u1 + dt L(u1))
                let l0 = self.compute_rhs(mesh, basis, geom, quad, phi);
                let mut u1 = phi.clone();
                u1.axpy(dt, &l0);

                let l1 = self.compute_rhs(mesh, basis, geom, quad, &u1);
                phi.scale(0.5);
                phi.axpy(0.5, &u1);
                phi.axpy(0.5 * dt, &l1);
            }
            TimeScheme::SspRk3 => {
                // Shu–Osher form:
                // u1 = u + dt L(u)
                // u2 = 3/4 u + 1/4 u1 + 1/4 dt L(u1)
                // u  = 1/3 u + 2/3 u2 + 2/3 dt L(u2)
                let l0 = self.compute_rhs(mesh, basis, geom, quad, phi);
                let mut u1 = phi.clone();
                u1.axpy(dt, &l0);

                let l1 = self.compute_rhs(mesh, basis, geom, quad, &u1);
                let mut u2 = phi.clone();
                u2.scale(0.75);
                u2.axpy(0.25, &u1);
                u2.axpy(0.25 * dt, &l1);

                let l2 = self.compute_rhs(mesh, basis, geom, quad, &u2);
                phi.scale(1.0 / 3.0);
                phi.axpy(2.0 / 3.0, &u2);
                phi.axpy(2.0 / 3.0 * dt, &l2);
            }
        }
    }

    /// Advisory CFL time step: cfl · h_min / ((2p + 1) |v|_max), from the
    /// velocity currently stored in the operator.
    pub fn max_stable_dt(
        &self,
        mesh: &Mesh2D,
        basis: &DGBasis2D,
        geom: &GeometricFactors2D,
        cfl: f64,
    ) -> f64 {
        let mut v_max: f64 = 0.0;
        for k in 0..mesh.n_elements {
            let vx_k = self.vx.cell(k);
            let vy_k = self.vy.cell(k);
            for q in 0..geom.n_q {
                let u = basis.evaluate_at_q(vx_k, q);
                let v = basis.evaluate_at_q(vy_k, q);
                v_max = v_max.max((u * u + v * v).sqrt());
            }
        }

        if v_max < 1e-14 {
            return f64::INFINITY;
        }
        let dg_factor = 2.0 * basis.degree as f64 + 1.0;
        cfl * mesh.h_min() / (dg_factor * v_max)
    }
}
