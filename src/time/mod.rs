//! Macro time stepping.
//!
//! The core is stateless between macro steps apart from the field
//! containers; the time mesh is just the fixed-size step sequence the
//! driver iterates over. Step sizes are chosen by the caller under the
//! CFL constraint of the transport operator.

/// An ordered sequence of macro time steps of fixed size.
#[derive(Clone, Copy, Debug)]
pub struct TimeMesh {
    /// Final time (s)
    pub t_max: f64,
    /// Number of macro steps
    pub n_steps: usize,
    /// Step size t_max / n_steps (s)
    pub dt: f64,
}

impl TimeMesh {
    /// Create a time mesh covering [0, t_max] in `n_steps` equal steps.
    pub fn new(t_max: f64, n_steps: usize) -> Self {
        assert!(n_steps > 0, "time mesh needs at least one step");
        assert!(t_max > 0.0, "time horizon must be positive");
        Self {
            t_max,
            n_steps,
            dt: t_max / n_steps as f64,
        }
    }

    /// Iterate over (step index, time at end of step), 1-based like the
    /// driver loops: the first item is (1, dt).
    pub fn steps(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        let dt = self.dt;
        (1..=self.n_steps).map(move |i| (i, dt * i as f64))
    }
}
