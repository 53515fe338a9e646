//! Resource utilization models of cloudlets.

use dyn_clone::{clone_trait_object, DynClone};
use rand::prelude::*;
use rand_pcg::Pcg64;

use crate::error::{invalid, SimResult};

/// A utilization model is a function, which defines the fraction of requested resource used at the moment.
///
/// The returned value must lie in `[0, 1]`.
pub trait UtilizationModel: DynClone {
    fn utilization(&self, time: f64) -> f64;
}

clone_trait_object!(UtilizationModel);

/// The simplest model, the constant utilization.
#[derive(Clone)]
pub struct ConstantUtilization {
    value: f64,
}

impl ConstantUtilization {
    pub fn new(value: f64) -> Self {
        Self {
            value: value.clamp(0., 1.),
        }
    }

    /// Full utilization of requested resource.
    pub fn full() -> Self {
        Self::new(1.)
    }
}

impl UtilizationModel for ConstantUtilization {
    fn utilization(&self, _time: f64) -> f64 {
        self.value
    }
}

/// Uniformly distributed utilization which depends only on the seed and the time,
/// so that repeated queries for the same time return the same value.
#[derive(Clone)]
pub struct StochasticUtilization {
    seed: u64,
}

impl StochasticUtilization {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }
}

impl UtilizationModel for StochasticUtilization {
    fn utilization(&self, time: f64) -> f64 {
        let mut rand = Pcg64::seed_from_u64(self.seed ^ time.to_bits());
        rand.gen_range(0.0..=1.0)
    }
}

/// Utilization defined by samples taken with a fixed interval, linearly interpolated between samples.
///
/// After the last sample the utilization stays equal to it.
#[derive(Clone)]
pub struct TraceUtilization {
    interval: f64,
    samples: Vec<f64>,
}

impl TraceUtilization {
    pub fn new(interval: f64, samples: Vec<f64>) -> SimResult<Self> {
        if !(interval > 0.) {
            return invalid(format!("trace sampling interval must be positive, got {}", interval));
        }
        if samples.is_empty() {
            return invalid("trace must contain at least one sample");
        }
        if let Some(s) = samples.iter().find(|s| !(0. ..=1.).contains(*s)) {
            return invalid(format!("trace sample {} is out of [0, 1]", s));
        }
        Ok(Self { interval, samples })
    }
}

impl UtilizationModel for TraceUtilization {
    fn utilization(&self, time: f64) -> f64 {
        let pos = time.max(0.) / self.interval;
        let idx = pos.floor() as usize;
        if idx + 1 >= self.samples.len() {
            return self.samples[self.samples.len() - 1];
        }
        let frac = pos - idx as f64;
        self.samples[idx] + (self.samples[idx + 1] - self.samples[idx]) * frac
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_constant() {
        assert_eq!(ConstantUtilization::new(0.3).utilization(100.), 0.3);
        assert_eq!(ConstantUtilization::new(1.5).utilization(0.), 1.);
        assert_eq!(ConstantUtilization::full().utilization(7.), 1.);
    }

    #[test]
    fn test_stochastic_is_stable_in_time() {
        let model = StochasticUtilization::new(42);
        for t in [0., 1.5, 300., 12345.] {
            let u = model.utilization(t);
            assert!((0. ..=1.).contains(&u));
            assert_eq!(u, model.utilization(t));
        }
    }

    #[test]
    fn test_trace_interpolation() {
        let model = TraceUtilization::new(300., vec![0.2, 0.8, 0.5]).unwrap();
        assert_abs_diff_eq!(model.utilization(0.), 0.2);
        assert_abs_diff_eq!(model.utilization(150.), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(model.utilization(300.), 0.8);
        assert_abs_diff_eq!(model.utilization(450.), 0.65, epsilon = 1e-12);
        assert_abs_diff_eq!(model.utilization(10_000.), 0.5);
    }

    #[test]
    fn test_trace_validation() {
        assert!(TraceUtilization::new(0., vec![0.5]).is_err());
        assert!(TraceUtilization::new(10., vec![]).is_err());
        assert!(TraceUtilization::new(10., vec![0.5, 1.2]).is_err());
    }
}
