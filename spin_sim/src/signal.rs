use ndarray::{s, Array2, Array4};
use num_complex::Complex64;
use crate::error::{Result, SimError};

/// Receiver signal indexed by (coil, event, repetition, re/im)
#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    data:Array4<f64>,
}

impl Signal {
    pub fn zeros(n_coils:usize,n_events:usize,n_reps:usize) -> Signal {
        Signal {
            data:Array4::zeros((n_coils,n_events,n_reps,2))
        }
    }

    /// wrap an externally produced array, e.g. a measured signal loaded from disk
    pub fn from_array(data:Array4<f64>) -> Result<Signal> {
        if data.shape()[3] != 2 {
            let sh = data.shape();
            return Err(SimError::shape("signal",&[sh[0],sh[1],sh[2],2],sh));
        }
        Ok(Signal{data})
    }

    /// (coils, events, repetitions)
    pub fn dims(&self) -> (usize,usize,usize) {
        let sh = self.data.shape();
        (sh[0],sh[1],sh[2])
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn get(&self,coil:usize,event:usize,rep:usize) -> Complex64 {
        Complex64::new(self.data[[coil,event,rep,0]],self.data[[coil,event,rep,1]])
    }

    pub(crate) fn set(&mut self,coil:usize,event:usize,rep:usize,value:Complex64) {
        self.data[[coil,event,rep,0]] = value.re;
        self.data[[coil,event,rep,1]] = value.im;
    }

    pub fn data(&self) -> &Array4<f64> {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut Array4<f64> {
        &mut self.data
    }

    pub fn into_array(self) -> Array4<f64> {
        self.data
    }

    /// Samples of ADC-enabled events as a complex (adc events, repetitions) array
    pub fn adc_samples(&self,coil:usize,adc_mask:&[bool]) -> Result<Array2<Complex64>> {
        let (n_coils,n_events,n_reps) = self.dims();
        if adc_mask.len() != n_events {
            return Err(SimError::shape("adc_mask",&[n_events],&[adc_mask.len()]));
        }
        if coil >= n_coils {
            return Err(SimError::invalid("coil",format!("{} out of range for {} coils",coil,n_coils)));
        }
        let events:Vec<usize> = (0..n_events).filter(|e| adc_mask[*e]).collect();
        let mut out = Array2::<Complex64>::zeros((events.len(),n_reps));
        for (i,e) in events.iter().enumerate() {
            for rep in 0..n_reps {
                out[[i,rep]] = self.get(coil,*e,rep);
            }
        }
        Ok(out)
    }

    /// Every event of every repetition in acquisition order
    pub fn trace(&self,coil:usize) -> Vec<Complex64> {
        let (_,n_events,n_reps) = self.dims();
        let mut out = Vec::with_capacity(n_events*n_reps);
        for rep in 0..n_reps {
            for event in 0..n_events {
                out.push(self.get(coil,event,rep));
            }
        }
        out
    }

    pub fn magnitude_trace(&self,coil:usize) -> Vec<f64> {
        self.trace(coil).iter().map(|c| c.norm()).collect()
    }

    pub fn peak_magnitude(&self,coil:usize) -> f64 {
        let re = self.data.slice(s![coil,..,..,0]);
        let im = self.data.slice(s![coil,..,..,1]);
        re.iter().zip(im.iter()).map(|(a,b)| a.hypot(*b)).fold(0.0,f64::max)
    }

    /// Normalized RMS error against a reference of the same shape, in percent
    pub fn nrmse(&self,reference:&Signal) -> Result<f64> {
        if self.shape() != reference.shape() {
            return Err(SimError::shape("signal",reference.shape(),self.shape()));
        }
        let diff:f64 = self.data.iter().zip(reference.data.iter()).map(|(a,b)| (a-b).powi(2)).sum();
        let norm:f64 = reference.data.iter().map(|a| a*a).sum();
        if norm == 0.0 {
            return Err(SimError::invalid("reference","signal has zero norm"));
        }
        Ok(100.0*(diff/norm).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn samples_are_gathered_from_adc_events_only() {
        let mut sig = Signal::zeros(1,4,2);
        sig.set(0,1,0,Complex64::new(1.0,2.0));
        sig.set(0,2,1,Complex64::new(-3.0,0.5));
        sig.set(0,3,1,Complex64::new(9.0,9.0));
        let k = sig.adc_samples(0,&[false,true,true,false]).unwrap();
        assert_eq!(k.dim(),(2,2));
        assert_eq!(k[[0,0]],Complex64::new(1.0,2.0));
        assert_eq!(k[[1,1]],Complex64::new(-3.0,0.5));
        assert!(sig.adc_samples(1,&[true;4]).is_err());
        assert!(sig.adc_samples(0,&[true;3]).is_err());
    }

    #[test]
    fn trace_runs_events_within_repetitions() {
        let mut sig = Signal::zeros(1,2,2);
        sig.set(0,0,1,Complex64::new(5.0,0.0));
        let t = sig.trace(0);
        assert_eq!(t.len(),4);
        assert_eq!(t[2].re,5.0);
        assert_eq!(sig.magnitude_trace(0),vec![0.0,0.0,5.0,0.0]);
        assert_abs_diff_eq!(sig.peak_magnitude(0),5.0);
    }

    #[test]
    fn nrmse_of_identical_signals_is_zero() {
        let mut a = Signal::zeros(1,2,1);
        a.set(0,0,0,Complex64::new(3.0,4.0));
        assert_abs_diff_eq!(a.nrmse(&a.clone()).unwrap(),0.0);
        let b = Signal::zeros(1,2,1);
        assert_abs_diff_eq!(b.nrmse(&a).unwrap(),100.0);
        assert!(a.nrmse(&Signal::zeros(1,3,1)).is_err());
    }

    #[test]
    fn external_arrays_must_carry_two_components() {
        assert!(Signal::from_array(Array4::zeros((1,2,3,5))).is_err());
        assert!(Signal::from_array(Array4::zeros((1,2,3,2))).is_ok());
    }
}
