//! The sequence "program": per event and repetition RF rotation, gradient
//! moment and duration, plus the per-event ADC flag.

use std::fmt;
use std::str::FromStr;
use std::f64::consts::{FRAC_PI_2, PI};
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};
use crate::error::{Result, SimError};

const REFOCUSING_TOLERANCE:f64 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceClass {
    Gre,
    GreDream,
    Bssfp,
    Se,
    Rare,
    Epi,
}

/// Whether the k-space location restarts at the origin every repetition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KspaceAccumulation {
    PerRepetition,
    Continuous,
}

impl SequenceClass {
    pub fn kspace_accumulation(&self) -> KspaceAccumulation {
        match self {
            SequenceClass::Epi => KspaceAccumulation::Continuous,
            _ => KspaceAccumulation::PerRepetition,
        }
    }

    /// spin-echo trains mirror the k-space location at every refocusing pulse
    pub fn refocusing(&self) -> bool {
        matches!(self,SequenceClass::Se | SequenceClass::Rare)
    }
}

impl FromStr for SequenceClass {
    type Err = SimError;
    fn from_str(s:&str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "gre" => Ok(SequenceClass::Gre),
            "gre_dream" => Ok(SequenceClass::GreDream),
            "bssfp" => Ok(SequenceClass::Bssfp),
            "se" => Ok(SequenceClass::Se),
            "rare" => Ok(SequenceClass::Rare),
            "epi" => Ok(SequenceClass::Epi),
            _ => Err(SimError::UnknownSequenceClass(s.to_string()))
        }
    }
}

impl fmt::Display for SequenceClass {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            SequenceClass::Gre => "gre",
            SequenceClass::GreDream => "gre_dream",
            SequenceClass::Bssfp => "bssfp",
            SequenceClass::Se => "se",
            SequenceClass::Rare => "rare",
            SequenceClass::Epi => "epi",
        };
        write!(f,"{}",s)
    }
}

#[derive(Clone, Debug)]
pub struct EventSequence {
    rf:Array3<f64>,
    gradients:Array3<f64>,
    durations:Array2<f64>,
    adc_mask:Vec<bool>,
    class:SequenceClass,
    kspace_accumulation:KspaceAccumulation,
    excitation_event:Option<usize>,
    adc_rotation:Option<Vec<f64>>,
}

impl EventSequence {
    /// An empty program of uniform `event_time` steps with no RF, gradients or ADC
    pub fn new(n_events:usize,n_reps:usize,event_time:f64,class:SequenceClass) -> Result<Self> {
        if n_events == 0 || n_reps == 0 {
            return Err(SimError::invalid("sequence",format!("need at least one event and repetition, got {}x{}",n_events,n_reps)));
        }
        let seq = Self {
            rf:Array3::zeros((n_events,n_reps,2)),
            gradients:Array3::zeros((n_events,n_reps,2)),
            durations:Array2::from_elem((n_events,n_reps),event_time),
            adc_mask:vec![false;n_events],
            class,
            kspace_accumulation:class.kspace_accumulation(),
            excitation_event:None,
            adc_rotation:None,
        };
        seq.validate()?;
        Ok(seq)
    }

    pub fn from_tensors(rf:Array3<f64>,gradients:Array3<f64>,durations:Array2<f64>,adc_mask:Vec<bool>,class:SequenceClass) -> Result<Self> {
        let seq = Self {
            rf,
            gradients,
            durations,
            adc_mask,
            class,
            kspace_accumulation:class.kspace_accumulation(),
            excitation_event:None,
            adc_rotation:None,
        };
        seq.validate()?;
        Ok(seq)
    }

    /// Shape and value checks on every tensor
    pub fn validate(&self) -> Result<()> {
        let (n_events,n_reps) = self.durations.dim();
        if n_events == 0 || n_reps == 0 {
            return Err(SimError::invalid("sequence","no events or repetitions"));
        }
        if self.rf.shape() != [n_events,n_reps,2] {
            return Err(SimError::shape("rf",&[n_events,n_reps,2],self.rf.shape()));
        }
        if self.gradients.shape() != [n_events,n_reps,2] {
            return Err(SimError::shape("gradients",&[n_events,n_reps,2],self.gradients.shape()));
        }
        if self.adc_mask.len() != n_events {
            return Err(SimError::shape("adc_mask",&[n_events],&[self.adc_mask.len()]));
        }
        if self.durations.iter().any(|t| !(t.is_finite() && *t > 0.0)) {
            return Err(SimError::invalid("durations","every event duration must be finite and positive"));
        }
        if self.rf.iter().chain(self.gradients.iter()).any(|x| !x.is_finite()) {
            return Err(SimError::invalid("rf/gradients","non-finite entry"));
        }
        if let Some(e) = self.excitation_event {
            self.check_index(e,0)?;
        }
        if let Some(rot) = &self.adc_rotation {
            if rot.len() != n_reps {
                return Err(SimError::shape("adc_rotation",&[n_reps],&[rot.len()]));
            }
        }
        Ok(())
    }

    fn check_index(&self,event:usize,rep:usize) -> Result<()> {
        if event >= self.n_events() || rep >= self.n_reps() {
            return Err(SimError::invalid("index",format!("({},{}) outside {}x{} sequence",event,rep,self.n_events(),self.n_reps())));
        }
        Ok(())
    }

    pub fn set_rf(&mut self,event:usize,rep:usize,flip:f64,phase:f64) -> Result<()> {
        self.check_index(event,rep)?;
        self.rf[[event,rep,0]] = flip;
        self.rf[[event,rep,1]] = phase;
        Ok(())
    }

    pub fn set_gradient(&mut self,event:usize,rep:usize,gx:f64,gy:f64) -> Result<()> {
        self.check_index(event,rep)?;
        self.gradients[[event,rep,0]] = gx;
        self.gradients[[event,rep,1]] = gy;
        Ok(())
    }

    pub fn set_duration(&mut self,event:usize,rep:usize,seconds:f64) -> Result<()> {
        self.check_index(event,rep)?;
        if !(seconds.is_finite() && seconds > 0.0) {
            return Err(SimError::invalid("duration",format!("must be finite and positive, got {}",seconds)));
        }
        self.durations[[event,rep]] = seconds;
        Ok(())
    }

    pub fn set_adc(&mut self,event:usize,enabled:bool) -> Result<()> {
        self.check_index(event,0)?;
        self.adc_mask[event] = enabled;
        Ok(())
    }

    /// enable the ADC on events [start,end)
    pub fn set_adc_range(&mut self,start:usize,end:usize) -> Result<()> {
        for e in start..end {
            self.set_adc(e,true)?;
        }
        Ok(())
    }

    pub fn set_excitation_event(&mut self,event:usize) -> Result<()> {
        self.check_index(event,0)?;
        self.excitation_event = Some(event);
        Ok(())
    }

    /// explicit receiver phase per repetition, replaces the derived one
    pub fn set_adc_rotation(&mut self,rotation:Vec<f64>) -> Result<()> {
        if rotation.len() != self.n_reps() {
            return Err(SimError::shape("adc_rotation",&[self.n_reps()],&[rotation.len()]));
        }
        self.adc_rotation = Some(rotation);
        Ok(())
    }

    pub fn set_kspace_accumulation(&mut self,policy:KspaceAccumulation) {
        self.kspace_accumulation = policy;
    }

    pub fn n_events(&self) -> usize {
        self.durations.dim().0
    }

    pub fn n_reps(&self) -> usize {
        self.durations.dim().1
    }

    /// (flip, phase) in radians
    pub fn rf(&self,event:usize,rep:usize) -> (f64,f64) {
        (self.rf[[event,rep,0]],self.rf[[event,rep,1]])
    }

    pub fn gradient(&self,event:usize,rep:usize) -> (f64,f64) {
        (self.gradients[[event,rep,0]],self.gradients[[event,rep,1]])
    }

    pub fn duration(&self,event:usize,rep:usize) -> f64 {
        self.durations[[event,rep]]
    }

    pub fn durations(&self) -> &Array2<f64> {
        &self.durations
    }

    pub fn rf_tensor(&self) -> &Array3<f64> {
        &self.rf
    }

    pub fn gradient_tensor(&self) -> &Array3<f64> {
        &self.gradients
    }

    pub fn adc(&self,event:usize) -> bool {
        self.adc_mask[event]
    }

    pub fn adc_mask(&self) -> &[bool] {
        &self.adc_mask
    }

    pub fn n_adc(&self) -> usize {
        self.adc_mask.iter().filter(|a| **a).count()
    }

    pub fn class(&self) -> SequenceClass {
        self.class
    }

    pub fn kspace_accumulation(&self) -> KspaceAccumulation {
        self.kspace_accumulation
    }

    pub fn total_duration(&self) -> f64 {
        self.durations.sum()
    }

    fn excitation(&self,rep:usize) -> Option<usize> {
        match self.excitation_event {
            Some(e) => Some(e),
            None => (0..self.n_events()).find(|e| self.rf[[*e,rep,0]] != 0.0)
        }
    }

    /// Receiver phase per repetition: -phase + pi/2 + pi*[flip < 0] of the excitation.
    /// Repetitions without their own excitation inherit the previous one.
    pub fn adc_rotation(&self) -> Vec<f64> {
        if let Some(rot) = &self.adc_rotation {
            return rot.clone();
        }
        let mut last = (0.0,0.0);
        (0..self.n_reps()).map(|rep|{
            if let Some(e) = self.excitation(rep) {
                let (flip,phase) = self.rf(e,rep);
                if flip != 0.0 || self.excitation_event.is_some() {
                    last = (flip,phase);
                }
            }
            let (flip,phase) = last;
            let sign = if flip < 0.0 { PI } else { 0.0 };
            -phase + FRAC_PI_2 + sign
        }).collect()
    }

    /// Accumulated gradient moment after each event, shape (events, reps, 2)
    pub fn kspace_trajectory(&self) -> Array3<f64> {
        let (n_events,n_reps) = (self.n_events(),self.n_reps());
        let mut traj = Array3::<f64>::zeros((n_events,n_reps,2));
        let mut k = [0.0,0.0];
        for rep in 0..n_reps {
            if self.kspace_accumulation == KspaceAccumulation::PerRepetition {
                k = [0.0,0.0];
            }
            for event in 0..n_events {
                if self.class.refocusing() && is_refocusing(self.rf[[event,rep,0]]) {
                    k = [-k[0],-k[1]];
                }
                k[0] += self.gradients[[event,rep,0]];
                k[1] += self.gradients[[event,rep,1]];
                traj[[event,rep,0]] = k[0];
                traj[[event,rep,1]] = k[1];
            }
        }
        traj
    }
}

fn is_refocusing(flip:f64) -> bool {
    (flip.abs() - PI).abs() < REFOCUSING_TOLERANCE
}
