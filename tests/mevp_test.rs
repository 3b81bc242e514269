//! Integration tests for the CG momentum / mEVP rheology solver.
//!
//! These tests verify:
//! 1. Strain rates computed exactly for a linear velocity field
//! 2. Bounded fields over a multi-step box-benchmark run
//! 3. The biquadratic velocity / 8-mode stress pairing
//! 4. Dof numbering identities of the velocity space

use ice_dg::{
    interpolate_cg, l2_project, limit_max, limit_min, CGDofMap2D, CircularOcean2D, CyclonicWind2D,
    DGBasis2D, DGTransport2D, GeometricFactors2D, MEVPSolver2D, Mesh2D, Quadrature2D,
    StabilityMonitor2D, StabilityThresholds, StressField2D, VPParameters,
};

/// Box-benchmark domain size (m).
const DOMAIN: f64 = 1.0e6;

fn setup(
    nx: usize,
    cg_degree: usize,
) -> (Mesh2D, Quadrature2D, GeometricFactors2D, MEVPSolver2D) {
    let mesh = Mesh2D::rectangle(0.0, DOMAIN, 0.0, DOMAIN, nx, nx).unwrap();
    let quad = Quadrature2D::for_degree(3);
    let geom = GeometricFactors2D::compute(&mesh, &quad).unwrap();
    let solver = MEVPSolver2D::new(&mesh, &geom, &quad, cg_degree, VPParameters::default());
    (mesh, quad, geom, solver)
}

// ============================================================================
// Strain rates
// ============================================================================

/// The strain of a linear velocity is constant and lands exactly in the
/// stress space: after one subcycle the strain field holds sym ∇u of the
/// starting velocity.
#[test]
fn test_strain_exact_for_linear_velocity() {
    let (mesh, quad, geom, mut solver) = setup(4, 1);
    let adv_basis = DGBasis2D::new(3, &quad);
    let stress_basis = DGBasis2D::new(solver.stress_arity(), &quad);

    // u = a x + b y, v = c x + d y (scaled to m/s over the megameter box)
    let (a, b, c, d) = (2.0e-7, 1.0e-7, -3.0e-7, 0.5e-7);
    for (dof, &(x, y)) in solver.dofs.coords.clone().iter().enumerate() {
        solver.vx[dof] = a * x + b * y;
        solver.vy[dof] = c * x + d * y;
    }

    let h = l2_project(&geom, &adv_basis, |_, _| 2.0);
    let conc = l2_project(&geom, &adv_basis, |_, _| 1.0);
    let mut strain = StressField2D::new(mesh.n_elements, stress_basis.n_comp);
    let mut stress = StressField2D::new(mesh.n_elements, stress_basis.n_comp);

    solver.mevp_step(
        &mesh,
        &geom,
        &adv_basis,
        &stress_basis,
        120.0,
        1,
        300.0,
        300.0,
        &h,
        &conc,
        &mut strain,
        &mut stress,
    );

    for k in 0..mesh.n_elements {
        assert!(
            (strain.xx.mean(k) - a).abs() < 1e-18,
            "element {}: e11 = {}, expected {}",
            k,
            strain.xx.mean(k),
            a
        );
        assert!((strain.yy.mean(k) - d).abs() < 1e-18);
        assert!((strain.xy.mean(k) - 0.5 * (b + c)).abs() < 1e-18);
        // Constant strain: all higher modes vanish
        for i in 1..stress_basis.n_comp {
            assert!(strain.xx.cell(k)[i].abs() < 1e-18);
            assert!(strain.xy.cell(k)[i].abs() < 1e-18);
            assert!(strain.yy.cell(k)[i].abs() < 1e-18);
        }
    }
}

// ============================================================================
// Box benchmark boundedness
// ============================================================================

/// The full macro-step pipeline (forcing → advection → limiting → mEVP)
/// stays bounded over a multi-step run with the benchmark parameters:
/// cyclone wind, rotating ocean, NT_evp = 100, alpha = beta = 300.
#[test]
fn test_box_benchmark_bounded() {
    let (mesh, quad, geom, mut solver) = setup(8, 1);
    let adv_basis = DGBasis2D::new(3, &quad);
    let stress_basis = DGBasis2D::new(solver.stress_arity(), &quad);

    let dt = 120.0;
    let n_subcycles = 100;
    let (alpha, beta) = (300.0, 300.0);

    let wind = CyclonicWind2D::new(DOMAIN);
    let ocean = CircularOcean2D::new(DOMAIN, 0.1);
    solver.set_ocean_forcing(&ocean, 0.0);

    let mut h = l2_project(&geom, &adv_basis, |_, _| 2.0);
    let mut a = l2_project(&geom, &adv_basis, |x, _| x / DOMAIN);
    let initial_ice_volume = h.total_integral(&adv_basis, &geom);

    let mut transport = DGTransport2D::new(&mesh, &adv_basis, &quad);
    let mut strain = StressField2D::new(mesh.n_elements, stress_basis.n_comp);
    let mut stress = StressField2D::new(mesh.n_elements, stress_basis.n_comp);

    let mut monitor = StabilityMonitor2D::new(StabilityThresholds::default());

    for step in 1..=10 {
        let time = dt * step as f64;
        solver.set_wind_forcing(&wind, time);

        solver.velocity_to_dg(&geom, &adv_basis, &mut transport.vx, &mut transport.vy);
        transport.reinit_normal_velocity(&mesh, &adv_basis, &geom);
        transport.step(&mesh, &adv_basis, &geom, &quad, dt, &mut a);
        transport.step(&mesh, &adv_basis, &geom, &quad, dt, &mut h);

        limit_max(&mut a, &adv_basis, 1.0);
        limit_min(&mut a, &adv_basis, 0.0);
        limit_min(&mut h, &adv_basis, 0.0);

        solver.mevp_step(
            &mesh,
            &geom,
            &adv_basis,
            &stress_basis,
            dt,
            n_subcycles,
            alpha,
            beta,
            &h,
            &a,
            &mut strain,
            &mut stress,
        );

        let status = monitor.check(&solver.vx, &solver.vy, &stress);
        assert!(
            status.is_stable,
            "step {}: stability warnings {:?}",
            step, status.warnings
        );
    }

    // Fields stay physical
    assert!(h.is_finite() && a.is_finite());
    assert!(strain.is_finite() && stress.is_finite());
    for k in 0..mesh.n_elements {
        for q in 0..geom.n_q {
            let a_q = adv_basis.evaluate_at_q(a.cell(k), q);
            let h_q = adv_basis.evaluate_at_q(h.cell(k), q);
            assert!(
                (-1e-10..=1.0 + 1e-10).contains(&a_q),
                "concentration escaped [0, 1]: {}",
                a_q
            );
            assert!(h_q >= -1e-10, "thickness went negative: {}", h_q);
        }
    }

    // Drift velocities stay in the physical range (free drift is < 1 m/s)
    let v_max = solver
        .vx
        .iter()
        .zip(&solver.vy)
        .map(|(&u, &v)| (u * u + v * v).sqrt())
        .fold(0.0_f64, f64::max);
    assert!(v_max < 2.0, "ice speed blew up: {} m/s", v_max);

    // The closed box neither creates nor destroys much ice over 20 minutes
    let volume_drift = ((h.total_integral(&adv_basis, &geom) - initial_ice_volume)
        / initial_ice_volume)
        .abs();
    assert!(
        volume_drift < 1e-2,
        "ice volume drifted by {:.3e}",
        volume_drift
    );
}

/// Quiescent ice with no forcing stays at rest through the full pipeline.
#[test]
fn test_quiescent_ice_stays_at_rest() {
    let (mesh, quad, geom, mut solver) = setup(4, 1);
    let adv_basis = DGBasis2D::new(3, &quad);
    let stress_basis = DGBasis2D::new(solver.stress_arity(), &quad);

    let h = l2_project(&geom, &adv_basis, |_, _| 2.0);
    let a = l2_project(&geom, &adv_basis, |_, _| 1.0);
    let mut strain = StressField2D::new(mesh.n_elements, stress_basis.n_comp);
    let mut stress = StressField2D::new(mesh.n_elements, stress_basis.n_comp);

    for _ in 0..3 {
        solver.mevp_step(
            &mesh,
            &geom,
            &adv_basis,
            &stress_basis,
            120.0,
            20,
            300.0,
            300.0,
            &h,
            &a,
            &mut strain,
            &mut stress,
        );
    }

    for dof in 0..solver.dofs.n_dofs {
        assert!(
            solver.vx[dof].abs() < 1e-9 && solver.vy[dof].abs() < 1e-9,
            "dof {} moved without forcing: ({}, {})",
            dof,
            solver.vx[dof],
            solver.vy[dof]
        );
    }
}

// ============================================================================
// Biquadratic velocity
// ============================================================================

/// CG degree 2 pairs with the 8-mode stress space; a short forced run
/// stays finite and honors the boundary condition.
#[test]
fn test_cg2_stress8_smoke() {
    let (mesh, quad, geom, mut solver) = setup(4, 2);
    assert_eq!(solver.stress_arity(), 8);

    let adv_basis = DGBasis2D::new(3, &quad);
    let stress_basis = DGBasis2D::new(8, &quad);

    let wind = CyclonicWind2D::new(DOMAIN);
    let ocean = CircularOcean2D::new(DOMAIN, 0.1);
    solver.set_wind_forcing(&wind, 0.0);
    solver.set_ocean_forcing(&ocean, 0.0);

    let h = l2_project(&geom, &adv_basis, |_, _| 2.0);
    let a = l2_project(&geom, &adv_basis, |x, _| x / DOMAIN);
    let mut strain = StressField2D::new(mesh.n_elements, 8);
    let mut stress = StressField2D::new(mesh.n_elements, 8);

    for _ in 0..2 {
        solver.mevp_step(
            &mesh,
            &geom,
            &adv_basis,
            &stress_basis,
            120.0,
            50,
            300.0,
            300.0,
            &h,
            &a,
            &mut strain,
            &mut stress,
        );
    }

    assert!(strain.is_finite() && stress.is_finite());
    for &d in &solver.dofs.boundary_dofs {
        assert_eq!(solver.vx[d], 0.0);
        assert_eq!(solver.vy[d], 0.0);
    }
    let moving = (0..solver.dofs.n_dofs).any(|d| solver.vx[d].abs() > 1e-8);
    assert!(moving, "forced ice should drift");
}

// ============================================================================
// Dof numbering
// ============================================================================

/// The degree-2 space on an nx × ny grid is the (2nx+1) × (2ny+1) nodal
/// grid; degree 1 is the vertex grid.
#[test]
fn test_dof_counts_match_nodal_grids() {
    let mesh = Mesh2D::rectangle(0.0, 1.0, 0.0, 1.0, 5, 3).unwrap();

    let d1 = CGDofMap2D::new(&mesh, 1);
    assert_eq!(d1.n_dofs, 6 * 4);
    assert_eq!(d1.boundary_dofs.len(), 2 * (5 + 3));

    let d2 = CGDofMap2D::new(&mesh, 2);
    assert_eq!(d2.n_dofs, 11 * 7);
    assert_eq!(d2.boundary_dofs.len(), 2 * (10 + 6));
}

/// Forcing interpolation writes every dof of both components.
#[test]
fn test_forcing_reaches_every_dof() {
    let mesh = Mesh2D::rectangle(0.0, DOMAIN, 0.0, DOMAIN, 3, 3).unwrap();
    let dofs = CGDofMap2D::new(&mesh, 2);

    let ocean = CircularOcean2D::new(DOMAIN, 0.1);
    let mut cg_x = vec![f64::NAN; dofs.n_dofs];
    let mut cg_y = vec![f64::NAN; dofs.n_dofs];
    interpolate_cg(&dofs, &ocean, 0.0, &mut cg_x, &mut cg_y);

    assert!(cg_x.iter().all(|v| v.is_finite()));
    assert!(cg_y.iter().all(|v| v.is_finite()));

    // Spot-check the ocean formula at a known dof coordinate
    for (d, &(x, y)) in dofs.coords.iter().enumerate() {
        let expected_u = 0.1 * (2.0 * y / DOMAIN - 1.0);
        let expected_v = 0.1 * (1.0 - 2.0 * x / DOMAIN);
        assert!((cg_x[d] - expected_u).abs() < 1e-14);
        assert!((cg_y[d] - expected_v).abs() < 1e-14);
    }
}
