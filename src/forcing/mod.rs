//! Surface forcing fields for the momentum equation.
//!
//! Wind and ocean velocities enter the solver only through the
//! [`Forcing2D`] capability interface: any concrete forcing (analytic
//! benchmark, file-driven, coupled-model supplied) implements
//! `evaluate(x, y, t)` and the projection routines depend on nothing else.
//!
//! The concrete types here are the standard box-benchmark fields: a
//! cyclone-like wind whose strength alternates sign with a 4-day period,
//! and a steady rigid-rotation ocean current.

use std::f64::consts::PI;

/// Seconds in the wind cycle of the box benchmark (4 days).
const WIND_PERIOD: f64 = 4.0 * 24.0 * 60.0 * 60.0;

/// A time-dependent vector field over the domain.
pub trait Forcing2D: Send + Sync {
    /// Evaluate the (u, v) components at position (x, y) and time t.
    fn evaluate(&self, x: f64, y: f64, t: f64) -> (f64, f64);
}

/// Any suitable closure is a forcing.
impl<F> Forcing2D for F
where
    F: Fn(f64, f64, f64) -> (f64, f64) + Send + Sync,
{
    fn evaluate(&self, x: f64, y: f64, t: f64) -> (f64, f64) {
        self(x, y, t)
    }
}

/// Spatially and temporally constant forcing.
#[derive(Clone, Copy, Debug)]
pub struct ConstantForcing2D {
    pub u: f64,
    pub v: f64,
}

impl ConstantForcing2D {
    pub fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }
}

impl Forcing2D for ConstantForcing2D {
    fn evaluate(&self, _x: f64, _y: f64, _t: f64) -> (f64, f64) {
        (self.u, self.v)
    }
}

/// Box-benchmark wind: a cyclone pattern whose amplitude alternates sign
/// over a 4-day period (in m/s, for a square domain of side `domain_size`
/// in meters).
///
/// u = 5 + (sin(2πt/T) - 3) sin(2X) sin(Y)
/// v = 5 + (sin(2πt/T) - 3) sin(2Y) sin(X)
///
/// with X = πx/L, Y = πy/L and T = 4 days.
#[derive(Clone, Copy, Debug)]
pub struct CyclonicWind2D {
    /// Side length L of the square domain (m)
    pub domain_size: f64,
}

impl CyclonicWind2D {
    pub fn new(domain_size: f64) -> Self {
        Self { domain_size }
    }
}

impl Forcing2D for CyclonicWind2D {
    fn evaluate(&self, x: f64, y: f64, t: f64) -> (f64, f64) {
        let big_x = PI * x / self.domain_size;
        let big_y = PI * y / self.domain_size;
        let amplitude = (2.0 * PI * t / WIND_PERIOD).sin() - 3.0;

        let u = 5.0 + amplitude * (2.0 * big_x).sin() * big_y.sin();
        let v = 5.0 + amplitude * (2.0 * big_y).sin() * big_x.sin();
        (u, v)
    }
}

/// Box-benchmark ocean current: steady rigid rotation about the domain
/// center with maximum speed `v_max` at the domain edges.
///
/// u = v_max (2y/L - 1), v = v_max (1 - 2x/L)
#[derive(Clone, Copy, Debug)]
pub struct CircularOcean2D {
    /// Side length L of the square domain (m)
    pub domain_size: f64,
    /// Maximum current speed (m/s)
    pub v_max: f64,
}

impl CircularOcean2D {
    pub fn new(domain_size: f64, v_max: f64) -> Self {
        Self { domain_size, v_max }
    }
}

impl Forcing2D for CircularOcean2D {
    fn evaluate(&self, x: f64, y: f64, _t: f64) -> (f64, f64) {
        let u = self.v_max * (2.0 * y / self.domain_size - 1.0);
        let v = self.v_max * (1.0 - 2.0 * x / self.domain_size);
        (u, v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_forcing() {
        let f = ConstantForcing2D::new(2.0, -1.0);
        assert_eq!(f.evaluate(10.0, 20.0, 30.0), (2.0, -1.0));
    }

    #[test]
    fn test_closure_forcing() {
        let f = |x: f64, _y: f64, t: f64| (x * t, 0.0);
        let dyn_f: &dyn Forcing2D = &f;
        assert_eq!(dyn_f.evaluate(2.0, 0.0, 3.0), (6.0, 0.0));
    }

    #[test]
    fn test_cyclonic_wind_center_background() {
        // At the domain center sin(2X) = sin(π) = 0: only the 5 m/s
        // background remains.
        let l = 1.0e6;
        let wind = CyclonicWind2D::new(l);
        let (u, v) = wind.evaluate(l / 2.0, l / 2.0, 0.0);
        assert!((u - 5.0).abs() < 1e-12);
        assert!((v - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_cyclonic_wind_period() {
        let l = 1.0e6;
        let wind = CyclonicWind2D::new(l);
        let (u0, v0) = wind.evaluate(0.3 * l, 0.7 * l, 1000.0);
        let (u1, v1) = wind.evaluate(0.3 * l, 0.7 * l, 1000.0 + WIND_PERIOD);
        assert!((u0 - u1).abs() < 1e-9);
        assert!((v0 - v1).abs() < 1e-9);
    }

    #[test]
    fn test_circular_ocean() {
        let l = 1.0e6;
        let ocean = CircularOcean2D::new(l, 0.1);

        // Center is at rest
        let (u, v) = ocean.evaluate(l / 2.0, l / 2.0, 0.0);
        assert!(u.abs() < 1e-14 && v.abs() < 1e-14);

        // Top edge flows in +x at full speed
        let (u, v) = ocean.evaluate(l / 2.0, l, 0.0);
        assert!((u - 0.1).abs() < 1e-14);
        assert!(v.abs() < 1e-14);
    }
}
