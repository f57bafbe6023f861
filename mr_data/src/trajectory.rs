use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use serde::{Deserialize, Serialize};
use spin_sim::EventSequence;
use crate::error::{io_err, Result};

/// Cumulative gradient moment per event, stored repetition by repetition
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub n_events:usize,
    pub n_reps:usize,
    pub adc_mask:Vec<bool>,
    pub kx:Vec<Vec<f64>>,
    pub ky:Vec<Vec<f64>>,
}

impl Trajectory {
    pub fn from_sequence(seq:&EventSequence) -> Self {
        let traj = seq.kspace_trajectory();
        let (n_events,n_reps) = (seq.n_events(),seq.n_reps());
        let kx = (0..n_reps).map(|r| (0..n_events).map(|e| traj[[e,r,0]]).collect()).collect();
        let ky = (0..n_reps).map(|r| (0..n_events).map(|e| traj[[e,r,1]]).collect()).collect();
        Self {
            n_events,
            n_reps,
            adc_mask:seq.adc_mask().to_vec(),
            kx,
            ky
        }
    }

    /// k-space locations of the ADC samples in acquisition order
    pub fn adc_points(&self) -> Vec<(f64,f64)> {
        let mut points = vec![];
        for rep in 0..self.n_reps {
            for event in 0..self.n_events {
                if self.adc_mask[event] {
                    points.push((self.kx[rep][event],self.ky[rep][event]));
                }
            }
        }
        points
    }

    pub fn from_file(file_path:&Path) -> Result<Self> {
        let mut f = File::open(file_path).map_err(io_err(file_path))?;
        let mut s = String::new();
        f.read_to_string(&mut s).map_err(io_err(file_path))?;
        Ok(serde_json::from_str(&s)?)
    }

    pub fn to_file(&self,file_path:&Path) -> Result<()> {
        let s = serde_json::to_string_pretty(&self)?;
        let mut f = File::create(file_path).map_err(io_err(file_path))?;
        f.write_all(s.as_bytes()).map_err(io_err(file_path))?;
        Ok(())
    }
}
