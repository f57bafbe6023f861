use clap;
use std::path::PathBuf;

#[derive(clap::Parser,Debug)]
#[command(name = "seq_sim", about = "Bloch simulation of MR pulse sequence experiments")]
pub struct SeqSimArgs {
    #[command(subcommand)]
    pub action: Action,
}

#[derive(clap::Subcommand,Debug)]
pub enum Action {
    /// simulate the experiment described by a config file
    Run(RunArgs),
    /// write a default experiment config for a built-in protocol
    NewConfig(NewConfigArgs),
}

#[derive(clap::Args,Debug)]
pub struct RunArgs {
    pub config:PathBuf,
    /// output base path, defaults to the config path without extension
    #[clap(short, long)]
    pub output:Option<PathBuf>,
    #[clap(short, long)]
    pub verbose:bool,
}

#[derive(clap::Args,Debug)]
pub struct NewConfigArgs {
    pub path:PathBuf,
    #[clap(short, long, value_enum, default_value = "fid")]
    pub protocol:ProtocolKind,
}

#[derive(clap::ValueEnum,Clone,Copy,Debug,PartialEq,Eq)]
pub enum ProtocolKind {
    Fid,
    GreEpi,
}
