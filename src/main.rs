use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod controller;
mod domain;
mod inputter;
mod model;
mod ui;

use controller::Controller;
use domain::{TVConfig, TVError};
use model::{Model, Status, expand_path};
use tabedit::pagination::PageSize;
use ui::TableUI;

/// A tui based tabular record editor.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// CSV, TSV, XLSX/XLS/ODS, Parquet or Arrow file to open
    file: Option<String>,

    /// Rows per page: 10, 25, 50 or 100
    #[arg(short, long, default_value_t = 10)]
    page_size: usize,

    /// Directory exports are written to
    #[arg(short, long, default_value = ".")]
    export_dir: String,

    /// Log file, the terminal belongs to the UI
    #[arg(long, default_value = "tabedit.log")]
    log_file: String,

    /// Event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_tracing(&expand_path(&args.log_file)) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let result = run(args);
    ratatui::restore();
    match result {
        Err(e) => {
            error!("Exiting with error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn init_tracing(log_file: &Path) -> Result<(), TVError> {
    let file = File::create(log_file)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn config_from_args(args: &Args) -> Result<TVConfig, TVError> {
    let page_size = PageSize::from_rows(args.page_size).ok_or_else(|| {
        TVError::InvalidArgument(format!(
            "page size {} is not one of 10, 25, 50, 100",
            args.page_size
        ))
    })?;
    Ok(TVConfig::default()
        .with_page_size(page_size)
        .with_export_dir(expand_path(&args.export_dir))
        .with_event_poll_time(args.poll_ms))
}

fn run(args: Args) -> Result<(), TVError> {
    let cfg = config_from_args(&args)?;
    info!("Starting tabedit with {:?}", cfg);

    let mut terminal = ratatui::init();
    let size = terminal.size()?;
    let mut model = Model::init(&cfg, size.width as usize, size.height as usize);
    if let Some(file) = &args.file {
        let path: PathBuf = expand_path(file);
        // A failed load is shown in the status line, the editor still starts empty.
        if let Err(e) = model.load_data_file(path) {
            error!("Initial load failed: {e}");
        }
    }

    let ui = TableUI::new();
    let controller = Controller::new(&cfg);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model.get_uidata(), f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(&model)? {
            model.update(Some(message))?;
        }
    }

    Ok(())
}
