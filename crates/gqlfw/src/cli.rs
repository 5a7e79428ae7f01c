use std::process::ExitCode;

use anyhow::Context;
use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use gqlfw_conf::Settings;

use crate::args::Args;
use crate::commands::Command;
use crate::commands::GqlfwCommand;
use crate::logging;

/// The main CLI structure that defines the command-line interface
#[derive(Parser)]
#[command(name = "gqlfw")]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: GqlfwCommand,

    #[command(flatten)]
    pub args: Args,
}

/// Parse CLI arguments and execute the chosen command
pub fn run(args: Vec<String>) -> Result<ExitCode> {
    let cli = Cli::try_parse_from(args).unwrap_or_else(|e| {
        e.exit();
    });

    let project_root = resolve_project_root()?;
    let settings = Settings::new(&project_root).context("Failed to load settings")?;
    logging::init_tracing(&cli.args.global, settings.debug)?;

    let exit = cli.command.execute(&cli.args, &settings)?;
    Ok(exit.process(cli.args.global.quiet))
}

fn resolve_project_root() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    Utf8PathBuf::from_path_buf(cwd)
        .map_err(|_| anyhow::anyhow!("Current directory is not valid UTF-8"))
}
