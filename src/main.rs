use std::io::stdout;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info};

use iv::controller::Controller;
use iv::dataset::{Dataset, Generator};
use iv::detail;
use iv::domain::{IvConfig, IvError};
use iv::logging;
use iv::model::{Model, Status};
use iv::terminal::{MouseCapture, setup_panic_handler};
use iv::ui::TableUI;

/// A tui based inventory table viewer.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// CSV, Parquet or Arrow file with id, name, type, status and lastUpdated columns
    #[arg(short, long)]
    file: Option<String>,

    /// Number of records to generate when no file is given
    #[arg(short, long, default_value_t = 50_000)]
    count: usize,

    /// Quiet period before filter and sort changes are applied
    #[arg(long, default_value_t = 400)]
    delay_ms: u64,

    /// Height of one row in terminal lines
    #[arg(long, default_value_t = 1)]
    row_height: usize,

    /// Rows rendered beyond the visible region
    #[arg(long, default_value_t = 5)]
    overscan: usize,

    #[arg(long, default_value = logging::DEFAULT_LOG_FILE)]
    log_file: String,

    /// Print the detail view of one id and exit
    #[arg(long)]
    detail: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            error!("Exiting with error: {e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

fn run(args: Args) -> Result<(), IvError> {
    logging::init(&expand(&args.log_file))?;

    let config = IvConfig::default()
        .with_count(args.count)
        .with_refresh_delay(Duration::from_millis(args.delay_ms))
        .with_row_height(args.row_height)
        .with_overscan(args.overscan);
    info!("Starting iv with {:?}", config);

    if let Some(param) = &args.detail {
        let outcome = match &args.file {
            Some(path) => detail::resolve(param, &Dataset::load_data_file(expand(path))?),
            None => detail::resolve(param, &Generator::new(config.count)),
        };
        print!("{outcome}");
        return Ok(());
    }

    let dataset = match &args.file {
        Some(path) => Dataset::load_data_file(expand(path))?,
        None => Dataset::generate(config.count),
    };

    let mut terminal = ratatui::init();
    setup_panic_handler();
    let result = event_loop(&config, dataset, &mut terminal);
    ratatui::restore();
    result
}

fn event_loop(
    config: &IvConfig,
    dataset: Dataset,
    terminal: &mut DefaultTerminal,
) -> Result<(), IvError> {
    let _mouse = MouseCapture::enable(stdout())?;
    let size = terminal.size()?;

    let mut model = Model::init(config, dataset, size.width as usize, size.height as usize)?;
    let result = drive(config, &mut model, terminal);
    model.teardown();
    result
}

fn drive(
    config: &IvConfig,
    model: &mut Model,
    terminal: &mut DefaultTerminal,
) -> Result<(), IvError> {
    let mut ui = TableUI::new(config);
    let controller = Controller::new(config);

    while model.status != Status::Quitting {
        // Render the current view
        terminal.draw(|f| ui.draw(model, f))?;

        // Handle events and map to a Message, timers fire inside update
        let message = controller.handle_event(model)?;
        model.update(message)?;
    }
    Ok(())
}
