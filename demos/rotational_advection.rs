//! Rotational advection refinement study.
//!
//! A smooth bump is carried once around the unit square by a rigid rotation
//! whose angular speed varies in time (one net revolution over t = 2π). The
//! final field is compared against the initial projection; under mesh
//! refinement the L2 error drops at the rate set by the DG arity.
//!
//! Runs arities 1, 3 and 6 over a doubling refinement sequence and prints
//! the transported mass and L2 error for each run.

use ice_dg::{
    l2_project, l2_project_into, DGBasis2D, DGTransport2D, GeometricFactors2D, Mesh2D,
    Quadrature2D, TimeMesh, TimeScheme,
};
use std::f64::consts::PI;

/// C∞ transition from 0 at x = 0 to 1 at x = 1.
fn smooth_step(x: f64) -> f64 {
    if x <= 0.0 {
        0.0
    } else if x >= 1.0 {
        1.0
    } else if x < 0.5 {
        0.5 * (-1.0 / x).exp() / (-2.0_f64).exp()
    } else {
        1.0 - 0.5 * (-1.0 / (1.0 - x)).exp() / (-2.0_f64).exp()
    }
}

/// Smooth bump centered at (0.4, 0.4): 1 inside r = 0.1, 0 beyond r = 0.3.
fn bump(x: f64, y: f64) -> f64 {
    let r = ((x - 0.4).powi(2) + (y - 0.4).powi(2)).sqrt();
    if r < 0.1 {
        1.0
    } else if r < 0.3 {
        1.0 - smooth_step(5.0 * (r - 0.1))
    } else {
        0.0
    }
}

/// Angular speed at time t: integrates to 2π over [0, 2π].
fn angular_speed(t: f64) -> f64 {
    0.5 * PI * (0.5 * t).sin()
}

/// Advect the bump for one revolution; return (mass, L2 error vs initial).
fn run(nx: usize, n_comp: usize) -> (f64, f64) {
    let mesh = Mesh2D::rectangle(0.0, 1.0, 0.0, 1.0, nx, nx).expect("valid unit-square mesh");
    let degree = match n_comp {
        1 => 0,
        3 => 1,
        _ => 2,
    };
    let quad = Quadrature2D::for_degree(degree.max(1));
    let basis = DGBasis2D::new(n_comp, &quad);
    let geom = GeometricFactors2D::compute(&mesh, &quad).expect("non-degenerate elements");

    let mut transport = DGTransport2D::new(&mesh, &basis, &quad);
    transport.set_time_scheme(TimeScheme::SspRk3);

    // CFL from the peak speed: |omega| <= π/2, farthest corner ~0.71 away
    let cfl = 0.2;
    let v_max = 0.5 * PI * (0.5_f64).sqrt();
    let dt_cfl = cfl * mesh.h_min() / ((2.0 * degree as f64 + 1.0) * v_max);
    let t_max = 2.0 * PI;
    let time_mesh = TimeMesh::new(t_max, (t_max / dt_cfl).ceil() as usize);

    let phi0 = l2_project(&geom, &basis, bump);
    let mut phi = phi0.clone();

    for (_, time) in time_mesh.steps() {
        // The rotation speed changes each step; re-project the velocity
        // and refresh the edge-normal cache before stepping.
        let omega = angular_speed(time);
        l2_project_into(&geom, &basis, |_, y| -omega * (y - 0.5), &mut transport.vx);
        l2_project_into(&geom, &basis, |x, _| omega * (x - 0.5), &mut transport.vy);
        transport.reinit_normal_velocity(&mesh, &basis, &geom);

        transport.step(&mesh, &basis, &geom, &quad, time_mesh.dt, &mut phi);
    }

    let mass = phi.total_integral(&basis, &geom);
    let mut error = phi;
    error.axpy(-1.0, &phi0);
    (mass, error.l2_norm(&basis, &geom))
}

fn main() {
    println!("Rotational advection refinement study");
    println!("=====================================");

    for n_comp in [1, 3, 6] {
        println!();
        println!("DG arity {}", n_comp);
        println!("{:>6} {:>20} {:>14} {:>8}", "n", "mass", "L2 error", "order");

        let mut previous_error: Option<f64> = None;
        let mut nx = 16;
        for _ in 0..3 {
            let (mass, error) = run(nx, n_comp);
            match previous_error {
                Some(prev) => println!(
                    "{:>6} {:>20.16} {:>14.4e} {:>8.2}",
                    nx,
                    mass,
                    error,
                    (prev / error).log2()
                ),
                None => println!("{:>6} {:>20.16} {:>14.4e} {:>8}", nx, mass, error, "-"),
            }
            previous_error = Some(error);
            nx *= 2;
        }
    }
}
