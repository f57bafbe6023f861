use clap::Parser;
use tracing::info;
use seq_sim::args::*;
use seq_sim::config::ExperimentConfig;
use seq_sim::logging::init_tracing;
use seq_sim::run::run_experiment;

fn main() -> anyhow::Result<()> {
    let args = SeqSimArgs::parse();
    use Action::*;
    match &args.action {
        Run(args) => {
            init_tracing(args.verbose)?;
            let cfg = ExperimentConfig::from_file(&args.config)?;
            let base = args.output.clone().unwrap_or_else(|| args.config.with_extension(""));
            let summary = run_experiment(&cfg,&base)?;
            println!("{}",serde_json::to_string_pretty(&summary)?);
        }
        NewConfig(args) => {
            init_tracing(false)?;
            ExperimentConfig::default_for(args.protocol).to_file(&args.path)?;
            info!(path = ?args.path, protocol = ?args.protocol, "wrote default config");
        }
    }
    Ok(())
}
