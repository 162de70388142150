mod cli;
mod config;
mod correlator;
mod error;
mod logger;
mod nav;
mod params;
mod session;
mod status;
mod transport;
mod tui;

use clap::Parser;
use cli::{Cli, Command};
use config::Config;
use params::ParamTree;
use session::Session;
use status::Status;
use transport::Transport;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(file) = cli.log_file {
        config.log.file = Some(file);
    }

    match cli.command {
        None => interactive(&config),
        Some(Command::Params) => {
            init_env_logger(&config);
            print_params(&config)
        }
        Some(Command::Send { words }) => {
            init_env_logger(&config);
            send(&config, &words.join(" "))
        }
    }
}

fn init_env_logger(config: &Config) {
    env_logger::Builder::new()
        .filter_level(config.log_level())
        .init();
}

fn interactive(config: &Config) -> anyhow::Result<()> {
    logger::RawModeLogger::install(config.log.file.as_deref(), config.log_level())?;

    let mut transport = Transport::connect(&config.addr())?;

    let rows = crossterm::terminal::size()
        .map(|(_, h)| tui::view_rows(h))
        .unwrap_or(1);
    let result = match Session::start(&transport, config.timeouts(), rows) {
        Ok(mut session) => tui::run(&mut session, transport.addr(), config.log.file.is_some()),
        Err(e) => Err(e.into()),
    };

    transport.stop();
    result
}

fn print_params(config: &Config) -> anyhow::Result<()> {
    let mut transport = Transport::connect(&config.addr())?;
    let resp = correlator::send_command(&transport, "list_params", config.timeouts().long)?;
    transport.stop();

    if !resp.is_ok() {
        anyhow::bail!("{}", Status::from_token(&resp.status).message);
    }
    let tree = ParamTree::from_lines(&resp.payload)?;
    for line in params::tree::dump(&tree) {
        println!("{line}");
    }
    Ok(())
}

fn send(config: &Config, command: &str) -> anyhow::Result<()> {
    let mut transport = Transport::connect(&config.addr())?;
    let resp = correlator::send_command(&transport, command, config.timeouts().long)?;
    transport.stop();

    for line in &resp.payload {
        println!("{line}");
    }
    let status = Status::from_token(&resp.status);
    if !status.ok {
        anyhow::bail!("{}", status.message);
    }
    println!("{}", status.message);
    Ok(())
}
