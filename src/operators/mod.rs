//! Precomputed per-element geometry.

pub mod geometric;

pub use geometric::GeometricFactors2D;
