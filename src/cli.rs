use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "synthctl", about = "Terminal remote control for a synthesizer engine")]
pub struct Cli {
    /// Engine host (default: 127.0.0.1)
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Engine control port (default: 10000)
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Write log output to this file while the interactive view is open
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the engine's parameter hierarchy and exit
    Params,
    /// Send one raw command and print the response
    Send {
        /// Command words, e.g. `record status`
        #[arg(required = true, num_args = 1..)]
        words: Vec<String>,
    },
}
