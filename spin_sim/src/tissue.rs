//! Per-voxel physical parameters of the scanned object.
//!
//! Channel order of the dense ingestion array is PD, T1, T2, dB0, B1+.
//! Values are clamped on the way in so the simulator never sees a
//! non-positive relaxation time or a negative proton density.

use ndarray::{Array3, ArrayView3};
use serde::{Deserialize, Serialize};
use crate::error::{Result, SimError};

pub const N_CHANNELS:usize = 5;

/// T1/T2 floor applied at ingestion (seconds)
pub const RELAXATION_FLOOR:f64 = 1e-12;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TissueVoxel {
    pub pd:f64,
    pub t1:f64,
    pub t2:f64,
    pub db0:f64,
    pub b1plus:f64,
}

impl TissueVoxel {
    pub fn new(pd:f64,t1:f64,t2:f64,db0:f64,b1plus:f64) -> Self {
        Self { pd, t1, t2, db0, b1plus }
    }

    /// an empty voxel: no protons, nominal transmit gain
    pub fn empty() -> Self {
        Self::new(0.0,RELAXATION_FLOOR,RELAXATION_FLOOR,0.0,1.0)
    }

    fn clamped(self) -> Self {
        let b1plus = if self.b1plus == 0.0 { 1.0 } else { self.b1plus };
        Self {
            pd:self.pd.max(0.0),
            t1:self.t1.max(RELAXATION_FLOOR),
            t2:self.t2.max(RELAXATION_FLOOR),
            db0:self.db0,
            b1plus
        }
    }

    fn is_finite(&self) -> bool {
        self.pd.is_finite() && self.t1.is_finite() && self.t2.is_finite() && self.db0.is_finite() && self.b1plus.is_finite()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TissueMap {
    rows:usize,
    cols:usize,
    voxels:Vec<TissueVoxel>,
}

impl TissueMap {
    pub fn new(rows:usize,cols:usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(SimError::invalid("grid",format!("voxel grid must be non-empty, got {}x{}",rows,cols)));
        }
        Ok(Self {
            rows,
            cols,
            voxels:vec![TissueVoxel::empty();rows*cols]
        })
    }

    /// Ingest a dense (rows, cols, 5) parameter array
    pub fn from_array(array:ArrayView3<f64>) -> Result<Self> {
        let shape = array.shape();
        if shape[2] != N_CHANNELS {
            return Err(SimError::shape("tissue map",&[shape[0],shape[1],N_CHANNELS],shape));
        }
        let mut map = TissueMap::new(shape[0],shape[1])?;
        for row in 0..shape[0] {
            for col in 0..shape[1] {
                let p = |ch:usize| array[[row,col,ch]];
                map.set_voxel(row,col,TissueVoxel::new(p(0),p(1),p(2),p(3),p(4)))?;
            }
        }
        Ok(map)
    }

    pub fn to_array(&self) -> Array3<f64> {
        Array3::from_shape_fn((self.rows,self.cols,N_CHANNELS),|(row,col,ch)|{
            let v = &self.voxels[row*self.cols + col];
            match ch {
                0 => v.pd,
                1 => v.t1,
                2 => v.t2,
                3 => v.db0,
                _ => v.b1plus
            }
        })
    }

    pub fn set_voxel(&mut self,row:usize,col:usize,voxel:TissueVoxel) -> Result<()> {
        if row >= self.rows || col >= self.cols {
            return Err(SimError::invalid("voxel",format!("({},{}) is outside the {}x{} grid",row,col,self.rows,self.cols)));
        }
        if !voxel.is_finite() {
            return Err(SimError::invalid("voxel",format!("non-finite parameters at ({},{}): {:?}",row,col,voxel)));
        }
        let idx = row*self.cols + col;
        self.voxels[idx] = voxel.clamped();
        Ok(())
    }

    /// Write the same tissue into the half-open block [row0,row1) x [col0,col1)
    pub fn fill_block(&mut self,rows:(usize,usize),cols:(usize,usize),voxel:TissueVoxel) -> Result<()> {
        for row in rows.0..rows.1 {
            for col in cols.0..cols.1 {
                self.set_voxel(row,col,voxel)?;
            }
        }
        Ok(())
    }

    pub fn voxel(&self,row:usize,col:usize) -> &TissueVoxel {
        &self.voxels[row*self.cols + col]
    }

    pub fn voxels(&self) -> &[TissueVoxel] {
        &self.voxels
    }

    pub fn grid(&self) -> (usize,usize) {
        (self.rows,self.cols)
    }

    pub fn n_voxels(&self) -> usize {
        self.voxels.len()
    }

    pub fn b1plus(&self) -> Vec<f64> {
        self.voxels.iter().map(|v| v.b1plus).collect()
    }
}

/// Gradient-encoding position of a voxel in radians per unit moment.
/// A unit moment advances k-space by one sample across the field of view.
pub fn voxel_ramp(index:usize,n:usize) -> f64 {
    std::f64::consts::PI*(-1.0 + 2.0*(index as f64)/(n as f64))
}
