use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::info;
use tino_core::build_site;

use crate::config::TinoConfig;

/// Arguments shared by every command that builds the site. None of them
/// carry clap defaults so that unset flags fall through to the config file
/// and environment.
pub fn add_build_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("source")
                .short('s')
                .long("source")
                .value_name("DIR")
                .help("Directory containing partials/, content/ and static/ [default: .]"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory for the generated site [default: dist]"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file [default: tino.toml]"),
        )
        .arg(
            Arg::new("exclude-content")
                .long("exclude-content")
                .help("Skip content; page and list templates are dropped")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-tag-lists")
                .long("no-tag-lists")
                .help("Do not generate per-tag listings")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-clean")
                .long("no-clean")
                .help("Keep existing files in the output directory")
                .action(ArgAction::SetTrue),
        )
}

pub fn make_subcommand() -> Command {
    add_build_args(Command::new("build")).about("Build the site once")
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    let config = TinoConfig::load(args)?;
    let report = build_site(&config.build)?;

    info!(
        "Site built in {} ({} files, {} pages, {} listing pages)",
        config.build.output.display(),
        report.written.len(),
        report.pages,
        report.listings
    );
    Ok(())
}
