//! Stability monitoring for sea-ice simulations.
//!
//! The mEVP iteration does not detect its own divergence: a blow-up
//! surfaces as NaN/∞ or absurd magnitudes in the velocity and stress
//! fields. This monitor is the supported, explicitly injected check:
//! drivers call it between macro steps; it is never invoked inside the
//! numerical loops and never alters the fields.
//!
//! # Example
//!
//! ```ignore
//! let mut monitor = StabilityMonitor2D::new(StabilityThresholds::default());
//!
//! // After each macro step:
//! let status = monitor.check(&solver.vx, &solver.vy, &stress);
//! for warning in &status.warnings {
//!     eprintln!("step {step}: {warning:?}");
//! }
//! if monitor.should_stop() {
//!     return; // repeated warnings, the run is lost
//! }
//! ```

use crate::fields::StressField2D;

/// Limits a healthy simulation stays inside.
#[derive(Debug, Clone, Copy)]
pub struct StabilityThresholds {
    /// Largest acceptable ice speed (m/s). Free drift rarely exceeds
    /// ~1 m/s; the default is far above that and catches blow-up only.
    pub max_velocity: f64,
    /// Largest acceptable stress magnitude (N/m), bounded by the ice
    /// strength in a healthy run.
    pub max_stress: f64,
    /// Failing checks in a row before a stop is recommended.
    pub max_consecutive_warnings: usize,
}

impl Default for StabilityThresholds {
    fn default() -> Self {
        Self {
            max_velocity: 5.0,
            max_stress: 1.0e6,
            max_consecutive_warnings: 3,
        }
    }
}

/// One detected problem.
#[derive(Debug, Clone, PartialEq)]
pub enum StabilityWarning {
    /// A velocity dof is NaN or infinite.
    NonFiniteVelocity,
    /// A stress coefficient is NaN or infinite.
    NonFiniteStress,
    /// Largest velocity magnitude exceeded the threshold.
    ExcessiveVelocity { max: f64 },
    /// Largest stress coefficient exceeded the threshold.
    ExcessiveStress { max: f64 },
}

/// Result of one check.
#[derive(Debug, Clone)]
pub struct StabilityStatus {
    /// True when no warning was raised.
    pub is_stable: bool,
    /// All warnings raised by this check.
    pub warnings: Vec<StabilityWarning>,
    /// Largest velocity magnitude seen.
    pub max_velocity: f64,
}

/// Between-steps divergence detector.
pub struct StabilityMonitor2D {
    thresholds: StabilityThresholds,
    consecutive_warnings: usize,
}

impl StabilityMonitor2D {
    /// Create a monitor with the given thresholds.
    pub fn new(thresholds: StabilityThresholds) -> Self {
        Self {
            thresholds,
            consecutive_warnings: 0,
        }
    }

    /// Check velocity components and a stress field.
    pub fn check(&mut self, vx: &[f64], vy: &[f64], stress: &StressField2D) -> StabilityStatus {
        let mut warnings = Vec::new();

        let mut max_velocity: f64 = 0.0;
        let mut velocity_finite = true;
        for (&u, &v) in vx.iter().zip(vy) {
            if !u.is_finite() || !v.is_finite() {
                velocity_finite = false;
                break;
            }
            max_velocity = max_velocity.max((u * u + v * v).sqrt());
        }
        if !velocity_finite {
            warnings.push(StabilityWarning::NonFiniteVelocity);
        } else if max_velocity > self.thresholds.max_velocity {
            warnings.push(StabilityWarning::ExcessiveVelocity { max: max_velocity });
        }

        if !stress.is_finite() {
            warnings.push(StabilityWarning::NonFiniteStress);
        } else {
            let max_stress = stress
                .xx
                .data
                .iter()
                .chain(&stress.xy.data)
                .chain(&stress.yy.data)
                .fold(0.0_f64, |m, &s| m.max(s.abs()));
            if max_stress > self.thresholds.max_stress {
                warnings.push(StabilityWarning::ExcessiveStress { max: max_stress });
            }
        }

        let is_stable = warnings.is_empty();
        if is_stable {
            self.consecutive_warnings = 0;
        } else {
            self.consecutive_warnings += 1;
        }

        StabilityStatus {
            is_stable,
            warnings,
            max_velocity,
        }
    }

    /// True when enough consecutive checks failed that continuing is
    /// pointless.
    pub fn should_stop(&self) -> bool {
        self.consecutive_warnings >= self.thresholds.max_consecutive_warnings
    }
}
