//! Experiment description read from a TOML file.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use spin_sim::{
    ExecutionContext, FrequencyDistribution, Precision, RepetitionReset, ScannerConfig, TissueMap,
    TissueVoxel,
};
use crate::args::ProtocolKind;
use crate::protocol::Protocol;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub simulation:SimulationSettings,
    #[serde(default)]
    pub off_resonance:OffResonance,
    pub phantom:Phantom,
    pub protocol:Protocol,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    pub rows:usize,
    pub cols:usize,
    pub n_spins:usize,
    #[serde(default = "one")]
    pub n_coils:usize,
    #[serde(default)]
    pub noise_std:f64,
    #[serde(default)]
    pub noise_seed:u64,
    #[serde(default)]
    pub kill_transverse:bool,
    #[serde(default)]
    pub repetition_reset:RepetitionReset,
    #[serde(default)]
    pub intravoxel_dephasing:bool,
    #[serde(default)]
    pub precision:Precision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads:Option<usize>,
}

fn one() -> usize {
    1
}

/// Intra-voxel spread, r2star in 1/s. Zero leaves every isochromat on resonance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct OffResonance {
    #[serde(default)]
    pub r2star:f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct Phantom {
    #[serde(default)]
    pub block:Vec<PhantomBlock>,
}

/// Rectangle [rows.0,rows.1) x [cols.0,cols.1) of uniform tissue.
/// Later blocks overwrite earlier ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhantomBlock {
    pub rows:[usize;2],
    pub cols:[usize;2],
    pub pd:f64,
    pub t1:f64,
    pub t2:f64,
    #[serde(default)]
    pub db0:f64,
    #[serde(default = "unity")]
    pub b1plus:f64,
}

fn unity() -> f64 {
    1.0
}

impl ExperimentConfig {
    pub fn default_for(kind:ProtocolKind) -> Self {
        match kind {
            ProtocolKind::Fid => Self {
                simulation:SimulationSettings::new(4,4,576),
                off_resonance:OffResonance{r2star:250.0},
                phantom:Phantom {
                    block:vec![PhantomBlock::new((0,4),(0,4),1.0,1.0,0.1)]
                },
                protocol:Protocol::default_fid(),
            },
            ProtocolKind::GreEpi => Self {
                simulation:SimulationSettings::new(16,16,16),
                off_resonance:OffResonance{r2star:30.0},
                phantom:Phantom {
                    block:vec![
                        PhantomBlock::new((3,13),(3,13),1.0,1.0,0.1),
                        PhantomBlock {
                            db0:10.0,
                            ..PhantomBlock::new((6,10),(5,9),0.5,0.8,0.05)
                        },
                    ]
                },
                protocol:Protocol::default_gre_epi(16,16),
            },
        }
    }

    pub fn from_file(file_path:&Path) -> anyhow::Result<Self> {
        let mut f = File::open(file_path).with_context(|| format!("cannot open config {:?}",file_path))?;
        let mut s = String::new();
        f.read_to_string(&mut s).with_context(|| format!("cannot read config {:?}",file_path))?;
        let cfg:Self = toml::from_str(&s).with_context(|| format!("config {:?} is malformed",file_path))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_file(&self,file_path:&Path) -> anyhow::Result<()> {
        let s = toml::to_string_pretty(&self)?;
        let mut f = File::create(file_path).with_context(|| format!("cannot create config {:?}",file_path))?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let sim = &self.simulation;
        if sim.rows == 0 || sim.cols == 0 || sim.n_spins == 0 {
            bail!("grid {}x{} with {} spins is empty",sim.rows,sim.cols,sim.n_spins);
        }
        if self.off_resonance.r2star < 0.0 {
            bail!("r2star must be non-negative, got {}",self.off_resonance.r2star);
        }
        for (i,b) in self.phantom.block.iter().enumerate() {
            if b.rows[0] >= b.rows[1] || b.cols[0] >= b.cols[1] || b.rows[1] > sim.rows || b.cols[1] > sim.cols {
                bail!("phantom block {} ({:?},{:?}) does not fit the {}x{} grid",i,b.rows,b.cols,sim.rows,sim.cols);
            }
        }
        self.protocol.validate()
    }

    pub fn tissue_map(&self) -> spin_sim::Result<TissueMap> {
        let mut map = TissueMap::new(self.simulation.rows,self.simulation.cols)?;
        for b in &self.phantom.block {
            let voxel = TissueVoxel::new(b.pd,b.t1,b.t2,b.db0,b.b1plus);
            map.fill_block((b.rows[0],b.rows[1]),(b.cols[0],b.cols[1]),voxel)?;
        }
        Ok(map)
    }

    pub fn frequency_distribution(&self) -> FrequencyDistribution {
        match self.off_resonance.r2star {
            r if r > 0.0 => FrequencyDistribution::Lorentzian{r2star:r},
            _ => FrequencyDistribution::None
        }
    }

    pub fn context(&self) -> ExecutionContext {
        ExecutionContext::new(self.simulation.precision,self.simulation.threads)
    }

    pub fn scanner_config(&self) -> ScannerConfig {
        let sim = &self.simulation;
        ScannerConfig {
            n_coils:sim.n_coils,
            noise_std:sim.noise_std,
            noise_seed:sim.noise_seed,
            kill_transverse:sim.kill_transverse,
            repetition_reset:sim.repetition_reset,
            intravoxel_dephasing:sim.intravoxel_dephasing,
        }
    }
}

impl SimulationSettings {
    pub fn new(rows:usize,cols:usize,n_spins:usize) -> Self {
        Self {
            rows,
            cols,
            n_spins,
            n_coils:1,
            noise_std:0.0,
            noise_seed:0,
            kill_transverse:false,
            repetition_reset:RepetitionReset::SteadyState,
            intravoxel_dephasing:false,
            precision:Precision::Double,
            threads:None,
        }
    }
}

impl PhantomBlock {
    pub fn new(rows:(usize,usize),cols:(usize,usize),pd:f64,t1:f64,t2:f64) -> Self {
        Self {
            rows:[rows.0,rows.1],
            cols:[cols.0,cols.1],
            pd,
            t1,
            t2,
            db0:0.0,
            b1plus:1.0,
        }
    }
}
