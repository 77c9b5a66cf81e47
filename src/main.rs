use clap::Parser;
use geoscope::cli::{Cli, Command};
use geoscope::config::load_config;
use geoscope::{cooccur, disambiguate, scope, GeoscopeError};
use std::process::ExitCode;

fn run() -> Result<(), GeoscopeError> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Classify(args) => cooccur::handle_classify(&args),
        Command::Disambiguate(args) => disambiguate::handle_disambiguate(&args, &config),
        Command::Scope(args) => scope::handle_scope(&args, &config),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::new().filter_or("GEOSCOPE_LOG", "warn")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("geoscope: {e}");
            ExitCode::from(1)
        }
    }
}
