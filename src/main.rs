mod archive;
mod config;
mod remote;
mod sync;
mod version;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use dialoguer::Password;

use crate::archive::ArchiveManager;
use crate::archive::sevenzip::SevenZip;
use crate::config::SyncConfig;
use crate::remote::mega::MegaRemote;
use crate::sync::{Outcome, SyncEngine};
use crate::version::FilenameCodec;

/// Megasync main parser
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Pack the tracked directory and upload it unconditionally
    #[arg(short, long)]
    commit: bool,

    /// Path to the configuration file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// MEGA account password (falls back to $MEGASYNC_PASSWORD, then a prompt)
    #[arg(short, long)]
    password: Option<String>,

    /// Print external commands before running them
    #[arg(short, long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli) {
        Ok(Outcome::Sent(name)) => {
            println!("File '{}' has been sent successfully.", name.green());
            ExitCode::SUCCESS
        }
        Ok(Outcome::Downloaded(name)) => {
            println!("File '{}' downloaded successfully.", name.green());
            ExitCode::SUCCESS
        }
        Ok(Outcome::UpToDate) => {
            println!("Nothing to do.");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{} {err:#}", "error:".red());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<Outcome> {
    let config = SyncConfig::load(&cli.config)?;
    let mega_password = remote_password(cli)?;

    let codec = FilenameCodec::new(&config.prefix);
    let archiver = SevenZip::new(cli.debug);
    let remote = MegaRemote::new(&config.username, mega_password, cli.debug);

    let workdir = PathBuf::from(".");
    let manager = ArchiveManager::new(
        &archiver,
        &codec,
        &workdir,
        &config.platform_tag,
        &config.archive_password,
    );
    let engine = SyncEngine::new(&remote, &manager, &codec, config.container_path(), &workdir);

    engine.run(cli.commit)
}

fn remote_password(cli: &Cli) -> Result<String> {
    if let Some(password) = &cli.password {
        return Ok(password.clone());
    }
    if let Ok(password) = env::var("MEGASYNC_PASSWORD")
        && !password.is_empty()
    {
        return Ok(password);
    }
    Password::new()
        .with_prompt("Enter MEGA password")
        .interact()
        .context("reading MEGA password")
}
