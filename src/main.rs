use std::fs::File;
use std::io::stdout;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::EnableMouseCapture,
    execute,
    terminal::{EnterAlternateScreen, enable_raw_mode},
};
use log::{error, info};
use ratatui::{Terminal, backend::CrosstermBackend, layout::Rect};
use simplelog::{Config, LevelFilter, WriteLogger};

use folio::app::{App, run_app_with_event_source};
use folio::config::load_config;
use folio::document::AutoBackend;
use folio::event_source::TerminalEventSource;
use folio::panic_handler::{install_panic_hook, restore_terminal};
use folio::ui;
use folio::viewer::Viewer;

/// Terminal viewer for paginated documents
#[derive(Parser, Debug)]
#[command(name = "folio", version, about, long_about = None)]
struct Args {
    /// PDF file, page image, or directory of page images
    locator: String,

    /// Start in two-page book mode
    #[arg(long)]
    book: bool,

    /// Initial zoom for scroll mode
    #[arg(long)]
    zoom: Option<f32>,

    /// Page to open at (1-indexed)
    #[arg(long, default_value_t = 1)]
    page: usize,

    /// Settings file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "folio.log")]
    log_file: PathBuf,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,

    /// Hide the controls bar
    #[arg(long)]
    no_controls: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_file = File::create(&args.log_file)
        .with_context(|| format!("cannot create log file {}", args.log_file.display()))?;
    WriteLogger::init(args.log_level, Config::default(), log_file)?;

    info!("Starting folio");

    let mut config = load_config(args.config.as_deref());
    if args.book {
        config.double_page_default = true;
    }
    if let Some(zoom) = args.zoom {
        config.initial_zoom = zoom;
    }
    if args.no_controls {
        config.show_controls = false;
    }

    install_panic_hook();

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut viewer = Viewer::new(config, Arc::new(AutoBackend));
    let size = terminal.size()?;
    let area = ui::pages_area(
        Rect::new(0, 0, size.width, size.height),
        viewer.config().show_controls,
    );
    let (width, height) = ui::container_size(area);
    viewer.init(width, height);

    // A failed open stays on screen as a banner
    if let Err(err) = viewer.load_document_at(&args.locator, args.page) {
        error!("{err}");
    }

    let mut app = App::new(viewer);
    let res = run_app_with_event_source(&mut terminal, &mut app, &mut TerminalEventSource);

    restore_terminal();
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("Application error: {err:?}");
        eprintln!("{err:?}");
    }

    info!("Shutting down folio");
    Ok(())
}
