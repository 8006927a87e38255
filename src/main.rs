use capview::app::NavigatorApp;
use capview::cli::Args;
use capview::config::{self, NavigatorSettings, LOG_FILE, SETTINGS_FILE};
use capview::core::workers::Workers;
use capview::source::{SessionArchive, SessionSource};

use anyhow::{Context, Result};
use clap::Parser;
use eframe::egui;
use log::{debug, info};
use std::sync::Arc;

/// eframe window-state file (kept apart from our own settings JSON)
const WINDOW_STATE_FILE: &str = "capview_window.ron";

fn init_logging(args: &Args, path_config: &config::PathConfig) -> Result<()> {
    // 0 (default) = warn, 1 (-v) = info, 2 (-vv) = debug, 3+ (-vvv) = trace
    let log_level = match args.verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    if let Some(log_path_opt) = &args.log_file {
        let log_path = log_path_opt
            .clone()
            .unwrap_or_else(|| config::data_file(LOG_FILE, path_config));
        let file = std::fs::File::create(&log_path)
            .with_context(|| format!("Failed to create log file {}", log_path.display()))?;

        env_logger::Builder::new()
            .filter_level(log_level)
            .filter_module("egui", log::LevelFilter::Info) // Suppress egui DEBUG spam
            .filter_module("eframe", log::LevelFilter::Info)
            .format_timestamp_millis()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();

        info!("Logging to file: {} (level: {:?})", log_path.display(), log_level);
    } else {
        // Console logging (respects RUST_LOG if set)
        let default_level = match args.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
            .filter_module("egui", log::LevelFilter::Info)
            .filter_module("eframe", log::LevelFilter::Info)
            .format_timestamp_millis()
            .init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let path_config = config::PathConfig::from_env_and_cli(args.config_dir.clone());
    if let Err(e) = config::ensure_dirs(&path_config) {
        eprintln!("Warning: Failed to create application directories: {:#}", e);
    }

    init_logging(&args, &path_config)?;
    info!("capview {} starting...", env!("CARGO_PKG_VERSION"));
    debug!("Command-line args: {:?}", args);

    let settings_path = config::config_file(SETTINGS_FILE, &path_config);
    info!("Config path: {}", settings_path.display());
    let mut settings = NavigatorSettings::load(&settings_path);
    if args.snap {
        settings.snap_to_detections = true;
    }

    let archive = SessionArchive::open(&args.session_dir, Some(settings.timeline_interval_minutes))
        .with_context(|| format!("Failed to open session at {}", args.session_dir.display()))?
        .with_page_size(settings.page_size.max(1));
    let session = archive.info().clone();
    let source: Arc<dyn SessionSource> = Arc::new(archive);

    let num_workers = settings
        .worker_count()
        .unwrap_or_else(Workers::default_thread_count);
    let workers = Arc::new(Workers::new(num_workers).context("Failed to start worker pool")?);
    info!("Worker pool: {} threads", workers.num_threads());

    let params = args.initial_params();
    if !params.is_empty() {
        info!("Initial link: {}", params.to_query_string());
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(format!("capview v{} • {}", env!("CARGO_PKG_VERSION"), session.name))
            .with_inner_size([1280.0, 800.0])
            .with_resizable(true),
        persist_window: true,
        persistence_path: Some(config::config_file(WINDOW_STATE_FILE, &path_config)),
        ..Default::default()
    };

    eframe::run_native(
        "capview",
        native_options,
        Box::new(move |_cc| {
            let app = NavigatorApp::new(source, session, params, settings, workers)
                .with_settings_path(settings_path);
            Ok(Box::new(app))
        }),
    )
    .map_err(|e| anyhow::anyhow!("UI error: {}", e))?;

    info!("Application exiting");
    Ok(())
}
