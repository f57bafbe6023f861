//! Post-processing applied to a finished signal.

use num_complex::Complex64;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use crate::error::{Result, SimError};
use crate::signal::Signal;

pub trait SignalProcessor {
    fn process(&self,signal:Signal,adc_mask:&[bool]) -> Result<Signal>;
}

/// Additive zero-mean Gaussian receiver noise on ADC samples only
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GaussianNoise {
    pub std:f64,
    pub seed:u64,
}

impl GaussianNoise {
    pub fn new(std:f64,seed:u64) -> Self {
        Self { std, seed }
    }

    pub(crate) fn add_to(&self,signal:&mut Signal,adc_mask:&[bool]) -> Result<()> {
        let (n_coils,n_events,n_reps) = signal.dims();
        if adc_mask.len() != n_events {
            return Err(SimError::shape("adc_mask",&[n_events],&[adc_mask.len()]));
        }
        if !(self.std.is_finite() && self.std >= 0.0) {
            return Err(SimError::invalid("noise_std",format!("must be finite and non-negative, got {}",self.std)));
        }
        let normal = Normal::new(0.0,self.std).map_err(|e| SimError::invalid("noise_std",e.to_string()))?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let data = signal.data_mut();
        for coil in 0..n_coils {
            for event in (0..n_events).filter(|e| adc_mask[*e]) {
                for rep in 0..n_reps {
                    data[[coil,event,rep,0]] += normal.sample(&mut rng);
                    data[[coil,event,rep,1]] += normal.sample(&mut rng);
                }
            }
        }
        Ok(())
    }
}

impl SignalProcessor for GaussianNoise {
    fn process(&self,mut signal:Signal,adc_mask:&[bool]) -> Result<Signal> {
        self.add_to(&mut signal,adc_mask)?;
        Ok(signal)
    }
}

/// Weighted complex sum over the coil axis into a single channel
#[derive(Clone, Debug, PartialEq)]
pub struct CoilCombine {
    pub weights:Vec<Complex64>,
}

impl CoilCombine {
    pub fn uniform(n_coils:usize) -> Self {
        Self { weights:vec![Complex64::new(1.0,0.0);n_coils] }
    }
}

impl SignalProcessor for CoilCombine {
    fn process(&self,signal:Signal,_adc_mask:&[bool]) -> Result<Signal> {
        let (n_coils,n_events,n_reps) = signal.dims();
        if self.weights.len() != n_coils {
            return Err(SimError::shape("coil weights",&[n_coils],&[self.weights.len()]));
        }
        let mut out = Signal::zeros(1,n_events,n_reps);
        for event in 0..n_events {
            for rep in 0..n_reps {
                let s:Complex64 = self.weights.iter().enumerate().map(|(c,w)| w*signal.get(c,event,rep)).sum();
                out.set(0,event,rep,s);
            }
        }
        Ok(out)
    }
}
