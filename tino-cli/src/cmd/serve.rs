use std::time::{Duration, SystemTime};

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{debug, error, info, warn};
use notify::Watcher;
use notify_debouncer_mini::{DebounceEventResult, new_debouncer};
use tino_core::tree::{CONTENT, PARTIALS, STATIC};
use tino_core::{BuildOptions, BuildReport, SiteBuilder, SiteScanner};
use tino_dev_server::{DevServer, DevServerConfig, Reloader, inject_livereload_script, livereload_script};

use crate::cmd::build::add_build_args;
use crate::config::TinoConfig;

pub fn make_subcommand() -> Command {
    add_build_args(Command::new("serve"))
        .about("Build, serve and rebuild on changes with live reload")
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Port to serve on [default: 8000]")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Host to bind to [default: 127.0.0.1]"),
        )
        .arg(
            Arg::new("open")
                .long("open")
                .help("Open browser automatically")
                .action(ArgAction::SetTrue),
        )
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    let config = TinoConfig::load(args)?;
    let options = config.build.clone();
    let script = livereload_script(&config.serve.host, config.serve.port);

    let report = rebuild(&options, &script)?;
    info!("Built {} files", report.written.len());

    let server = DevServer::new(DevServerConfig {
        host: config.serve.host.clone(),
        port: config.serve.port,
        root: options.output.clone(),
        open: config.serve.open,
    });
    let reloader = server.reloader();

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server.run().await {
            error!("Dev server error: {e:#}");
        }
    });
    let watcher_handle = tokio::spawn(async move {
        if let Err(e) = watch_sources(options, script, reloader).await {
            error!("Source watcher error: {e:#}");
        }
    });

    tokio::try_join!(server_handle, watcher_handle)?;
    Ok(())
}

fn rebuild(options: &BuildOptions, script: &str) -> Result<BuildReport> {
    let script = script.to_string();
    let report = SiteBuilder::from_options(options.clone())
        .html_filter(Box::new(move |html: String| {
            inject_livereload_script(&html, &script)
        }))
        .build()?
        .render_all()?;
    Ok(report)
}

async fn watch_sources(options: BuildOptions, script: String, reloader: Reloader) -> Result<()> {
    let (tx, mut rx) = tokio::sync::mpsc::channel(16);

    let mut debouncer = new_debouncer(
        Duration::from_millis(300),
        move |res: DebounceEventResult| match res {
            Ok(events) if !events.is_empty() => {
                let _ = tx.blocking_send(());
            }
            Ok(_) => {}
            Err(e) => warn!("Watch error: {e}"),
        },
    )?;

    for root in [PARTIALS, CONTENT, STATIC] {
        let dir = options.source.join(root);
        if dir.is_dir() {
            debouncer
                .watcher()
                .watch(&dir, notify::RecursiveMode::Recursive)?;
            info!("Watching {}", dir.display());
        }
    }

    let mut scanner = SiteScanner::new(&options.source);
    if options.exclude_content {
        scanner = scanner.without_content();
    }
    let mut last_build = SystemTime::now();

    while rx.recv().await.is_some() {
        if !scanner.changed_since(last_build) {
            debug!("Change event without newer sources, skipping rebuild");
            continue;
        }
        last_build = SystemTime::now();

        match rebuild(&options, &script) {
            Ok(report) => {
                info!("Rebuilt {} files", report.written.len());
                reloader.reload();
            }
            Err(e) => error!("Build failed: {e:#}"),
        }
    }

    Ok(())
}
