//! Run and discretization settings.

/// Settings for choosing the global time step.
#[derive(Clone, Debug, PartialEq)]
pub struct DiscretizationConfig {
    /// Largest accepted relative change of any pipe's wave speed.
    pub celerity_tolerance: f64,
    /// Upper bound on reaches per pipe.
    pub max_reaches: u32,
}

impl Default for DiscretizationConfig {
    fn default() -> Self {
        Self {
            celerity_tolerance: 0.05,
            max_reaches: 50,
        }
    }
}

/// Options for a transient run.
#[derive(Clone, Debug, PartialEq)]
pub struct SolveOptions {
    /// Simulated duration (seconds).
    pub duration_s: f64,
    /// Force this time step instead of searching for one.
    pub dt_override: Option<f64>,
    /// Record every N-th step (decimation); the final step is always recorded.
    pub record_every: usize,
    /// Sweep pipes and boundary groups on the rayon pool.
    pub parallel: bool,
    /// Abort when any |head| exceeds this (m).
    pub head_limit_m: f64,
    /// Abort when any |flow| exceeds this (m³/s).
    pub flow_limit_m3s: f64,
    pub discretization: DiscretizationConfig,
    /// Pressure head below which a cavitation warning is logged (m, gauge).
    pub vapour_head_m: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            duration_s: 10.0,
            dt_override: None,
            record_every: 1,
            parallel: true,
            head_limit_m: 1.0e5,
            flow_limit_m3s: 1.0e4,
            discretization: DiscretizationConfig::default(),
            vapour_head_m: -10.0,
        }
    }
}

impl SolveOptions {
    pub fn with_duration(duration_s: f64) -> Self {
        Self {
            duration_s,
            ..Self::default()
        }
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        if !(self.duration_s.is_finite() && self.duration_s >= 0.0) {
            return Err(format!("duration must be non-negative, got {}", self.duration_s));
        }
        if let Some(dt) = self.dt_override
            && !(dt.is_finite() && dt > 0.0)
        {
            return Err(format!("dt override must be positive, got {dt}"));
        }
        if self.record_every == 0 {
            return Err("record_every must be at least 1".into());
        }
        if !(self.head_limit_m > 0.0 && self.flow_limit_m3s > 0.0) {
            return Err("divergence limits must be positive".into());
        }
        Ok(())
    }
}
