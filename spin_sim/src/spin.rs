use std::fmt;
use std::f64::consts::PI;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::context::{ExecutionContext, Precision};
use crate::error::{Result, SimError};
use crate::matmath::Vector;
use crate::tissue::{TissueMap, TissueVoxel};

/// quantiles are pulled in from +-0.5 by this factor to keep tan() finite
pub const QUANTILE_CLIP:f64 = 0.99;

/// Static intra-voxel frequency spread used to model T2* dephasing
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrequencyDistribution {
    None,
    Lorentzian { r2star:f64 },
    LorentzianPerVoxel { r2star:Vec<f64> },
}

/// Evenly spaced Cauchy quantiles scaled by `r2star` (rad/s).
/// The ensemble average of exp(i*w*t) over these decays like exp(-r2star*t).
pub fn lorentzian_offsets(n_spins:usize,r2star:f64) -> Vec<f64> {
    if n_spins == 1 {
        return vec![0.0];
    }
    let last = (n_spins - 1) as f64;
    (0..n_spins).map(|k|{
        let u = QUANTILE_CLIP*(k as f64/last - 0.5);
        r2star*(PI*u).tan()
    }).collect()
}

/// Magnetization state of n_spins isochromats in every voxel of a 2D grid.
/// Spins are stored grouped by voxel: index = voxel*n_spins + spin.
#[derive(Clone, Debug)]
pub struct SpinSystem {
    rows:usize,
    cols:usize,
    n_spins:usize,
    ctx:ExecutionContext,
    tissue:Vec<TissueVoxel>,
    m:Vec<Vector>,
    omega:Vec<f64>,
}

impl SpinSystem {
    pub fn new(rows:usize,cols:usize,n_spins:usize,ctx:ExecutionContext) -> Result<SpinSystem> {
        if n_spins == 0 {
            return Err(SimError::invalid("n_spins","at least one spin per voxel is required"));
        }
        if rows == 0 || cols == 0 {
            return Err(SimError::invalid("grid",format!("voxel grid must be non-empty, got {}x{}",rows,cols)));
        }
        let n_vox = rows*cols;
        Ok(SpinSystem {
            rows,
            cols,
            n_spins,
            ctx,
            tissue:vec![TissueVoxel::empty();n_vox],
            m:vec![Vector::null();n_vox*n_spins],
            omega:vec![0.0;n_vox*n_spins],
        })
    }

    /// Broadcast tissue parameters to every spin of each voxel and return to equilibrium
    pub fn set_system(&mut self,map:&TissueMap) -> Result<()> {
        if map.grid() != self.grid() {
            return Err(SimError::GridMismatch{expected:self.grid(),found:map.grid()});
        }
        self.tissue.copy_from_slice(map.voxels());
        self.reset();
        debug!(rows = self.rows, cols = self.cols, n_spins = self.n_spins, "spin system set");
        Ok(())
    }

    pub fn set_off_resonance(&mut self,distribution:&FrequencyDistribution) -> Result<()> {
        let n_spins = self.n_spins;
        match distribution {
            FrequencyDistribution::None => {
                self.omega.iter_mut().for_each(|w| *w = 0.0);
            }
            FrequencyDistribution::Lorentzian{r2star} => {
                check_r2star(*r2star)?;
                let offsets = lorentzian_offsets(n_spins,*r2star);
                self.omega.chunks_mut(n_spins).for_each(|voxel| voxel.copy_from_slice(&offsets));
            }
            FrequencyDistribution::LorentzianPerVoxel{r2star} => {
                if r2star.len() != self.n_voxels() {
                    return Err(SimError::shape("r2star",&[self.n_voxels()],&[r2star.len()]));
                }
                r2star.iter().try_for_each(|r| check_r2star(*r))?;
                let unit = lorentzian_offsets(n_spins,1.0);
                self.omega.chunks_mut(n_spins).zip(r2star.iter()).for_each(|(voxel,r)|{
                    voxel.iter_mut().zip(unit.iter()).for_each(|(w,u)| *w = r*u);
                });
            }
        }
        Ok(())
    }

    /// Every spin back to (0, 0, PD); tissue and frequency offsets are untouched
    pub fn reset(&mut self) {
        let n_spins = self.n_spins;
        let single = self.ctx.precision == Precision::Single;
        self.m.chunks_mut(n_spins).zip(self.tissue.iter()).for_each(|(voxel,t)|{
            let eq = Vector::equilibrium(t.pd);
            let eq = if single { eq.to_single() } else { eq };
            voxel.iter_mut().for_each(|m| *m = eq);
        });
    }

    /// Fails when a relaxation constant is not strictly positive and finite
    pub fn validate(&self) -> Result<()> {
        for (voxel,t) in self.tissue.iter().enumerate() {
            if !(t.t1 > 0.0 && t.t1.is_finite() && t.t2 > 0.0 && t.t2.is_finite()) {
                return Err(SimError::NumericalDomain{voxel,message:format!("t1 = {}, t2 = {}",t.t1,t.t2)});
            }
            if !t.pd.is_finite() || t.pd < 0.0 {
                return Err(SimError::NumericalDomain{voxel,message:format!("pd = {}",t.pd)});
            }
        }
        if self.omega.iter().any(|w| !w.is_finite()) {
            return Err(SimError::invalid("omega","non-finite frequency offset"));
        }
        Ok(())
    }

    pub fn magnetization(&self,voxel:usize) -> &[Vector] {
        &self.m[voxel*self.n_spins..(voxel+1)*self.n_spins]
    }

    pub fn omega(&self,voxel:usize) -> &[f64] {
        &self.omega[voxel*self.n_spins..(voxel+1)*self.n_spins]
    }

    pub fn tissue(&self,voxel:usize) -> &TissueVoxel {
        &self.tissue[voxel]
    }

    pub fn b1plus(&self) -> Vec<f64> {
        self.tissue.iter().map(|t| t.b1plus).collect()
    }

    /// ensemble-averaged magnetization of one voxel
    pub fn voxel_mean(&self,voxel:usize) -> Vector {
        let mut sum = Vector::null();
        self.magnetization(voxel).iter().for_each(|m| sum += *m);
        sum*(1.0/self.n_spins as f64)
    }

    /// sum over voxels of the ensemble-averaged transverse magnetization
    pub fn transverse_sum(&self) -> Complex64 {
        (0..self.n_voxels()).map(|v| self.voxel_mean(v).transverse()).sum()
    }

    pub fn grid(&self) -> (usize,usize) {
        (self.rows,self.cols)
    }

    pub fn n_voxels(&self) -> usize {
        self.rows*self.cols
    }

    pub fn n_spins(&self) -> usize {
        self.n_spins
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    /// split borrow for the forward simulator: mutable state, frequency offsets, tissue
    pub(crate) fn state_mut(&mut self) -> (&mut [Vector],&[f64],&[TissueVoxel]) {
        (&mut self.m,&self.omega,&self.tissue)
    }
}

fn check_r2star(r2star:f64) -> Result<()> {
    if !r2star.is_finite() || r2star < 0.0 {
        return Err(SimError::invalid("r2star",format!("must be finite and non-negative, got {}",r2star)));
    }
    Ok(())
}

impl fmt::Display for SpinSystem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "grid:{}x{}\nn_spins:{}\nprecision:{:?}",
        self.rows,self.cols,self.n_spins,self.ctx.precision)
    }
}
