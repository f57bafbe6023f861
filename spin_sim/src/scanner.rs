//! Forward simulator: runs the event program over a spin system and
//! integrates the receiver signal.
//!
//! Each (event, repetition) step is RF rotation, then exact relaxation with
//! off-resonance and gradient precession over the event duration, then an
//! optional readout. Repetitions run in order and events within a
//! repetition strictly increase. Within a step every voxel is independent
//! and is updated on the rayon pool.

use std::f64::consts::PI;
use std::time::Instant;
use ndarray::{Array2, Array3};
use num_complex::Complex64;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use crate::context::Precision;
use crate::error::{Result, SimError};
use crate::matmath::{Matrix, Vector};
use crate::process::GaussianNoise;
use crate::sequence::EventSequence;
use crate::signal::Signal;
use crate::spin::SpinSystem;
use crate::spin_operators::{relax_precess, relax_spoil, relaxation_factors, rf_rotation};
use crate::tissue::voxel_ramp;

/// What happens to the magnetization between repetitions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RepetitionReset {
    /// state carries over, steady state builds up
    #[default]
    SteadyState,
    /// every repetition starts from thermal equilibrium
    Equilibrium,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScannerConfig {
    pub n_coils:usize,
    #[serde(default)]
    pub noise_std:f64,
    #[serde(default)]
    pub noise_seed:u64,
    #[serde(default)]
    pub kill_transverse:bool,
    #[serde(default)]
    pub repetition_reset:RepetitionReset,
    /// spread the isochromats of a voxel across its width so gradients dephase them
    #[serde(default)]
    pub intravoxel_dephasing:bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            n_coils:1,
            noise_std:0.0,
            noise_seed:0,
            kill_transverse:false,
            repetition_reset:RepetitionReset::default(),
            intravoxel_dephasing:false,
        }
    }
}

/// Per-voxel precession caused by the gradient moment of each event
#[derive(Clone, Debug)]
pub struct GradientPrecession {
    moments:Array3<f64>,
    ramp_x:Vec<f64>,
    ramp_y:Vec<f64>,
    spin_offsets:Option<(Vec<f64>,Vec<f64>)>,
}

/// golden-ratio step, spreads the y offsets without lining up with x
const GOLDEN_STEP:f64 = 0.618_033_988_749_894_9;

impl GradientPrecession {
    pub fn new(moments:&Array3<f64>,grid:(usize,usize)) -> Self {
        let (rows,cols) = grid;
        let mut ramp_x = Vec::with_capacity(rows*cols);
        let mut ramp_y = Vec::with_capacity(rows*cols);
        for row in 0..rows {
            for col in 0..cols {
                ramp_x.push(voxel_ramp(row,rows));
                ramp_y.push(voxel_ramp(col,cols));
            }
        }
        Self {
            moments:moments.clone(),
            ramp_x,
            ramp_y,
            spin_offsets:None
        }
    }

    /// Fixed positions of the `n_spins` isochromats inside a voxel, in [-1/2,1/2) of the voxel pitch,
    /// stored as radians per unit moment. x offsets are evenly spaced midpoints.
    pub fn with_intravoxel(mut self,n_spins:usize,grid:(usize,usize)) -> Self {
        let pitch_x = 2.0*PI/grid.0 as f64;
        let pitch_y = 2.0*PI/grid.1 as f64;
        let ox = (0..n_spins).map(|s| pitch_x*((s as f64 + 0.5)/n_spins as f64 - 0.5)).collect();
        let oy = (0..n_spins).map(|s| pitch_y*((s as f64*GOLDEN_STEP).fract() - 0.5)).collect();
        self.spin_offsets = Some((ox,oy));
        self
    }

    /// phase increment in radians: moment . position
    pub fn phase(&self,event:usize,rep:usize,voxel:usize) -> f64 {
        self.moments[[event,rep,0]]*self.ramp_x[voxel] + self.moments[[event,rep,1]]*self.ramp_y[voxel]
    }

    /// extra phase of every isochromat from its position inside the voxel, None when spins share the voxel center
    pub fn spin_phases(&self,event:usize,rep:usize) -> Option<Vec<f64>> {
        let (gx,gy) = (self.moments[[event,rep,0]],self.moments[[event,rep,1]]);
        self.spin_offsets.as_ref().map(|(ox,oy)| ox.iter().zip(oy.iter()).map(|(x,y)| gx*x + gy*y).collect())
    }
}

pub struct Scanner {
    config:ScannerConfig,
    grid:(usize,usize),
    n_spins:usize,
    b1plus:Vec<f64>,
    coil_sensitivity:Array2<Complex64>,
    rf:Option<Array3<f64>>,
    rf_ops:Vec<Option<Vec<Matrix>>>,
    gradient:Option<GradientPrecession>,
    adc_mask:Vec<bool>,
    adc_rotation:Vec<f64>,
    signal:Signal,
}

impl Scanner {
    pub fn new(config:ScannerConfig,spins:&SpinSystem) -> Result<Scanner> {
        if config.n_coils == 0 {
            return Err(SimError::invalid("n_coils","at least one receive coil is required"));
        }
        if !(config.noise_std.is_finite() && config.noise_std >= 0.0) {
            return Err(SimError::invalid("noise_std",format!("must be finite and non-negative, got {}",config.noise_std)));
        }
        let n_vox = spins.n_voxels();
        let mut scanner = Scanner {
            grid:spins.grid(),
            n_spins:spins.n_spins(),
            b1plus:vec![1.0;n_vox],
            coil_sensitivity:Array2::from_elem((config.n_coils,n_vox),Complex64::new(1.0,0.0)),
            rf:None,
            rf_ops:Vec::new(),
            gradient:None,
            adc_mask:Vec::new(),
            adc_rotation:Vec::new(),
            signal:Signal::zeros(config.n_coils,0,0),
            config,
        };
        scanner.set_b1plus(&spins.b1plus())?;
        Ok(scanner)
    }

    fn n_voxels(&self) -> usize {
        self.grid.0*self.grid.1
    }

    /// Transmit field map; zeros mean no measurement and fall back to unity gain
    pub fn set_b1plus(&mut self,b1plus:&[f64]) -> Result<()> {
        if b1plus.len() != self.n_voxels() {
            return Err(SimError::shape("b1plus",&[self.n_voxels()],&[b1plus.len()]));
        }
        if b1plus.iter().any(|b| !b.is_finite()) {
            return Err(SimError::invalid("b1plus","non-finite entry"));
        }
        self.b1plus = b1plus.iter().map(|b| if *b == 0.0 { 1.0 } else { *b }).collect();
        if let Some(rf) = self.rf.take() {
            self.set_flip_tensor(rf);
        }
        Ok(())
    }

    /// Receive sensitivity, shape (coils, voxels)
    pub fn set_coil_sensitivity(&mut self,sensitivity:Array2<Complex64>) -> Result<()> {
        let expected = [self.config.n_coils,self.n_voxels()];
        if sensitivity.shape() != expected {
            return Err(SimError::shape("coil_sensitivity",&expected,sensitivity.shape()));
        }
        self.coil_sensitivity = sensitivity;
        Ok(())
    }

    /// Snapshot the RF, gradient and ADC configuration of a sequence
    pub fn set_sequence(&mut self,seq:&EventSequence) -> Result<()> {
        seq.validate()?;
        self.set_flip_tensor(seq.rf_tensor().clone());
        let gradient = GradientPrecession::new(seq.gradient_tensor(),self.grid);
        self.gradient = Some(match self.config.intravoxel_dephasing {
            true => gradient.with_intravoxel(self.n_spins,self.grid),
            false => gradient
        });
        self.adc_mask = seq.adc_mask().to_vec();
        self.adc_rotation = seq.adc_rotation();
        if seq.n_adc() == 0 {
            warn!("sequence has no ADC events, the signal will be empty");
        }
        debug!(n_events = seq.n_events(), n_reps = seq.n_reps(), class = %seq.class(), "sequence configured");
        Ok(())
    }

    /// Per event, repetition and voxel rotation with the flip angle scaled by local B1+.
    /// Events without RF keep no operator.
    fn set_flip_tensor(&mut self,rf:Array3<f64>) {
        let (n_events,n_reps,_) = rf.dim();
        let b1plus = &self.b1plus;
        self.rf_ops = (0..n_events*n_reps).map(|i|{
            let (event,rep) = (i/n_reps,i%n_reps);
            let (flip,phase) = (rf[[event,rep,0]],rf[[event,rep,1]]);
            if flip == 0.0 {
                return None;
            }
            Some(b1plus.iter().map(|b| rf_rotation(flip*b,phase)).collect())
        }).collect();
        self.rf = Some(rf);
    }

    pub fn init_signal(&mut self) {
        let (n_events,n_reps) = match &self.rf {
            Some(rf) => (rf.dim().0,rf.dim().1),
            None => (0,0)
        };
        self.signal = Signal::zeros(self.config.n_coils,n_events,n_reps);
    }

    /// Run every event of every repetition, mutating `spins` and filling the signal
    pub fn forward(&mut self,spins:&mut SpinSystem,event_time:&Array2<f64>) -> Result<&Signal> {
        let (n_events,n_reps) = match &self.rf {
            Some(rf) => (rf.dim().0,rf.dim().1),
            None => return Err(SimError::NotConfigured("no sequence set"))
        };
        if spins.grid() != self.grid {
            return Err(SimError::GridMismatch{expected:self.grid,found:spins.grid()});
        }
        if spins.n_spins() != self.n_spins {
            return Err(SimError::invalid("n_spins",format!("scanner built for {} spins, system has {}",self.n_spins,spins.n_spins())));
        }
        if event_time.dim() != (n_events,n_reps) {
            return Err(SimError::shape("event_time",&[n_events,n_reps],event_time.shape()));
        }
        if event_time.iter().any(|t| !(t.is_finite() && *t > 0.0)) {
            return Err(SimError::invalid("event_time","every event duration must be finite and positive"));
        }
        spins.validate()?;

        self.init_signal();
        let start = Instant::now();
        info!(
            rows = self.grid.0, cols = self.grid.1, n_spins = self.n_spins,
            n_events, n_reps, n_coils = self.config.n_coils, "forward simulation started"
        );
        let ctx = *spins.context();
        ctx.install(|| self.run(spins,event_time,ctx.precision))??;

        if self.config.noise_std > 0.0 {
            GaussianNoise::new(self.config.noise_std,self.config.noise_seed).add_to(&mut self.signal,&self.adc_mask)?;
        }
        info!(elapsed_ms = start.elapsed().as_millis() as u64, "forward simulation finished");
        Ok(&self.signal)
    }

    fn run(&mut self,spins:&mut SpinSystem,event_time:&Array2<f64>,precision:Precision) -> Result<()> {
        let (n_events,n_reps) = event_time.dim();
        for rep in 0..n_reps {
            if rep > 0 && self.config.repetition_reset == RepetitionReset::Equilibrium {
                spins.reset();
            }
            for event in 0..n_events {
                self.step(spins,event,rep,event_time[[event,rep]],precision)?;
                if self.adc_mask[event] {
                    self.readout(spins,event,rep)?;
                }
            }
            debug!(rep, "repetition complete");
        }
        Ok(())
    }

    /// RF rotation followed by relaxation and precession over `dt`
    fn step(&self,spins:&mut SpinSystem,event:usize,rep:usize,dt:f64,precision:Precision) -> Result<()> {
        let gradient = self.gradient.as_ref().ok_or(SimError::NotConfigured("no gradient precession"))?;
        let n_reps = self.adc_rotation.len();
        let ops = self.rf_ops[event*n_reps + rep].as_deref();
        let kill_transverse = self.config.kill_transverse;
        let single = precision == Precision::Single;
        let spin_phases = gradient.spin_phases(event,rep);
        let n_spins = self.n_spins;
        let (m,omega,tissue) = spins.state_mut();
        m.par_chunks_mut(n_spins)
            .zip(omega.par_chunks(n_spins))
            .zip(tissue.par_iter())
            .enumerate()
            .for_each(|(voxel,((mv,wv),t))|{
                let rot = ops.map(|o| o[voxel]);
                let (e1,e2) = relaxation_factors(t.t1,t.t2,dt);
                let grad_phase = gradient.phase(event,rep,voxel);
                mv.iter_mut().zip(wv.iter()).enumerate().for_each(|(s,(m,w))|{
                    let phase = (w + t.db0)*dt + grad_phase + spin_phases.as_ref().map_or(0.0,|p| p[s]);
                    let mut v = match rot {
                        Some(r) => r*(*m),
                        None => *m
                    };
                    v = match kill_transverse {
                        true => relax_spoil(v,e1,t.pd),
                        false => relax_precess(v,e1,e2,phase,t.pd)
                    };
                    *m = if single { v.to_single() } else { v };
                });
            });
        Ok(())
    }

    /// Coil-weighted sum of ensemble-averaged transverse magnetization, rotated by the receiver phase
    fn readout(&mut self,spins:&SpinSystem,event:usize,rep:usize) -> Result<()> {
        let means:Vec<Vector> = (0..spins.n_voxels()).into_par_iter()
            .map(|v| spins.voxel_mean(v))
            .collect();
        if means.iter().any(|m| !m.is_finite()) {
            return Err(SimError::NonFinite{event,repetition:rep});
        }
        let adc = Complex64::from_polar(1.0,self.adc_rotation[rep]);
        for coil in 0..self.config.n_coils {
            let s:Complex64 = means.iter().enumerate()
                .map(|(v,m)| self.coil_sensitivity[[coil,v]]*m.transverse())
                .sum();
            let s = s*adc;
            if !(s.re.is_finite() && s.im.is_finite()) {
                return Err(SimError::NonFinite{event,repetition:rep});
            }
            self.signal.set(coil,event,rep,s);
        }
        Ok(())
    }

    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    pub fn into_signal(self) -> Signal {
        self.signal
    }

    pub fn adc_mask(&self) -> &[bool] {
        &self.adc_mask
    }

    pub fn adc_rotation(&self) -> &[f64] {
        &self.adc_rotation
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }
}
