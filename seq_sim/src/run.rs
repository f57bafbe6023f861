use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use mr_data::cfl::{cfl_base_decode, write_kspace, write_signal};
use mr_data::trajectory::Trajectory;
use spin_sim::{CoilCombine, Scanner, SignalProcessor, SpinSystem};
use crate::config::ExperimentConfig;
use crate::protocol::Protocol;

/// What a run produced and where it went
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub protocol:String,
    pub sequence_class:String,
    pub grid:(usize,usize),
    pub n_spins:usize,
    pub n_events:usize,
    pub n_reps:usize,
    pub n_adc:usize,
    pub scan_time_s:f64,
    pub elapsed_ms:u64,
    pub peak_magnitude:Vec<f64>,
    pub combined_peak_magnitude:Option<f64>,
    pub signal:PathBuf,
    pub kspace:PathBuf,
    pub trajectory:PathBuf,
}

impl RunSummary {
    pub fn to_file(&self,file_path:&Path) -> anyhow::Result<()> {
        let s = serde_json::to_string_pretty(&self)?;
        let mut f = File::create(file_path).with_context(|| format!("cannot create {:?}",file_path))?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }
}

/// `<base><suffix>` next to the output base
pub fn suffixed(base:&Path,suffix:&str) -> PathBuf {
    let name = base.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    base.with_file_name(format!("{}{}",name,suffix))
}

pub fn run_experiment(cfg:&ExperimentConfig,output_base:&Path) -> anyhow::Result<RunSummary> {
    let sim = &cfg.simulation;
    let map = cfg.tissue_map()?;
    let mut spins = SpinSystem::new(sim.rows,sim.cols,sim.n_spins,cfg.context())?;
    spins.set_system(&map)?;
    spins.set_off_resonance(&cfg.frequency_distribution())?;

    let seq = cfg.protocol.build()?;
    if let Protocol::GreEpi{n_read,n_phase,..} = cfg.protocol {
        if (n_phase,n_read) != (sim.rows,sim.cols) {
            warn!(n_phase, n_read, rows = sim.rows, cols = sim.cols, "epi matrix does not match the phantom grid");
        }
    }
    info!(protocol = cfg.protocol.name(), class = %seq.class(), scan_time_s = seq.total_duration(), "sequence built");

    let mut scanner = Scanner::new(cfg.scanner_config(),&spins)?;
    scanner.set_sequence(&seq)?;
    let start = Instant::now();
    scanner.forward(&mut spins,seq.durations())?;
    let elapsed_ms = start.elapsed().as_millis() as u64;
    let signal = scanner.into_signal();

    if let Some(dir) = output_base.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_dir_all(dir).with_context(|| format!("cannot create output directory {:?}",dir))?;
    }
    write_signal(&signal,output_base)?;
    let kspace = suffixed(output_base,"_kspace");
    write_kspace(&signal.adc_samples(0,seq.adc_mask())?,&kspace)?;
    let trajectory = suffixed(output_base,"_traj.json");
    Trajectory::from_sequence(&seq).to_file(&trajectory)?;

    let (n_coils,_,_) = signal.dims();
    let combined_peak_magnitude = match n_coils > 1 {
        true => Some(CoilCombine::uniform(n_coils).process(signal.clone(),seq.adc_mask())?.peak_magnitude(0)),
        false => None,
    };
    let summary = RunSummary {
        protocol:cfg.protocol.name().to_string(),
        sequence_class:seq.class().to_string(),
        grid:(sim.rows,sim.cols),
        n_spins:sim.n_spins,
        n_events:seq.n_events(),
        n_reps:seq.n_reps(),
        n_adc:seq.n_adc(),
        scan_time_s:seq.total_duration(),
        elapsed_ms,
        peak_magnitude:(0..n_coils).map(|c| signal.peak_magnitude(c)).collect(),
        combined_peak_magnitude,
        signal:cfl_base_decode(output_base).1,
        kspace:cfl_base_decode(&kspace).1,
        trajectory,
    };
    let summary_path = suffixed(output_base,"_summary.json");
    summary.to_file(&summary_path)?;
    info!(path = ?summary_path, elapsed_ms, "run complete");
    Ok(summary)
}
