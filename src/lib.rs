//! # ice-dg
//!
//! A Discontinuous Galerkin library for sea-ice dynamics and transport.
//!
//! This crate provides the numerical kernel of a sea-ice model:
//! - Parametric quadrilateral meshes with cached per-element geometry
//! - Modal DG scalar fields (thickness, concentration, stress components)
//! - CG (vertex-continuous) velocity of degree 1 or 2
//! - L2 projection and CG/DG transfers
//! - Upwind DG transport with SSP Runge–Kutta time stepping
//! - Bound (slope) limiting that preserves element means
//! - mEVP momentum solver for the viscous-plastic rheology
//!
//! A macro time step runs the fixed sequence: project forcing → advect
//! thickness and concentration → restore bounds → relax stress and
//! velocity through the mEVP subcycles. The demo drivers under `demos/`
//! wire the pieces together for the standard box benchmark.

pub mod analysis;
pub mod basis;
pub mod fields;
pub mod forcing;
pub mod limiter;
pub mod mesh;
pub mod momentum;
pub mod operators;
pub mod polynomial;
pub mod projection;
pub mod rheology;
pub mod time;
pub mod transport;

// Re-export main types for convenience
pub use analysis::{StabilityMonitor2D, StabilityStatus, StabilityThresholds, StabilityWarning};
pub use basis::{CGBasis2D, DGBasis2D};
pub use fields::{CGDofMap2D, DGField2D, StressField2D};
pub use forcing::{CircularOcean2D, ConstantForcing2D, CyclonicWind2D, Forcing2D};
pub use limiter::{limit_max, limit_min};
pub use mesh::{Edge, ElementFace, Mesh2D, MeshError};
pub use momentum::MEVPSolver2D;
pub use operators::GeometricFactors2D;
pub use polynomial::Quadrature2D;
pub use projection::{
    interpolate_cg, interpolate_dg_to_cg, l2_project, l2_project_into, project_cg_to_dg,
};
pub use rheology::{delta_field, shear_field, VPParameters};
pub use time::TimeMesh;
pub use transport::{DGTransport2D, TimeScheme};
