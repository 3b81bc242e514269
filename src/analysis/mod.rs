//! Stability monitoring for sea-ice simulations.

pub mod stability;

pub use stability::{StabilityMonitor2D, StabilityStatus, StabilityThresholds, StabilityWarning};
