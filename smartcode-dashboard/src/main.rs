//! smartcode: terminal front end for call-flow diagrams and live test runs.
//!
//! `flow` lays out an analysis result and prints the render scene as JSON
//! for a diagram renderer. `watch` follows the test runner's event stream
//! and prints one report row per result until Ctrl-C or disconnect.

mod report;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use smartcode_core::{AnalysisResult, Direction};
use smartcode_layout::DiagramBridge;
use smartcode_stream::{
    ConnectionState, EventStreamConsumer, LogView, ScrollToLatest, StreamConfig,
    DEFAULT_SCROLL_DELAY, TEST_UPDATE_EVENT,
};

use report::ReportTable;

const DEFAULT_ENDPOINT: &str = "http://localhost:8080/api/events";

#[derive(Parser)]
#[command(name = "smartcode", version, about = "Call-flow diagrams and live test reports")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lay out the call flow of an analysis result and print the scene as JSON
    Flow {
        /// Analysis result JSON file, or `-` for stdin
        input: PathBuf,
        /// Flow direction: LR or TB
        #[arg(long, short, default_value = "LR")]
        direction: Direction,
        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
    /// Follow the live test-result stream
    Watch {
        /// Event-stream endpoint
        #[arg(long, env = "SMARTCODE_EVENTS_URL", default_value = DEFAULT_ENDPOINT)]
        endpoint: String,
        /// Event name carrying test results
        #[arg(long, default_value = TEST_UPDATE_EVENT)]
        event_name: String,
        /// Bound on establishing the connection, in seconds
        #[arg(long)]
        connect_timeout: Option<u64>,
        /// Report width in columns
        #[arg(long, default_value_t = report::DEFAULT_WIDTH)]
        width: usize,
    },
}

fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read analysis result from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(input)
        .with_context(|| format!("Failed to read analysis result {}", input.display()))
}

fn run_flow(input: &Path, direction: Direction, pretty: bool) -> Result<()> {
    println!("{}", render_flow(&read_input(input)?, direction, pretty)?);
    Ok(())
}

/// Scene JSON for one analysis result document.
fn render_flow(text: &str, direction: Direction, pretty: bool) -> Result<String> {
    let analysis = AnalysisResult::from_json(text).context("Invalid analysis result")?;
    if let Some(metrics) = &analysis.metrics {
        info!(
            "Metrics: {} lines, {} methods, complexity {}",
            metrics.total_lines, metrics.total_methods, metrics.overall_complexity
        );
    }

    let scene = DiagramBridge::scene_for(&analysis, direction)?;
    info!(
        "Laid out {} nodes / {} edges ({direction})",
        scene.nodes.len(),
        scene.edges.len()
    );

    let json = if pretty {
        scene.to_json_pretty()?
    } else {
        scene.to_json()?
    };
    Ok(json)
}

/// Print every row up to and including `upto` that is not printed yet.
fn print_rows(view: &LogView, table: &ReportTable, printed: &mut usize, upto: usize) {
    view.read(|store| {
        for event in store.all().iter().take(upto + 1).skip(*printed) {
            println!("{}", table.row(event));
            *printed += 1;
        }
    });
}

async fn run_watch(config: StreamConfig, width: usize) -> Result<()> {
    let consumer = EventStreamConsumer::new(config).context("Failed to build HTTP client")?;
    let table = ReportTable::new(width);

    // The terminal is the viewport: rows are printed when the scroll
    // position catches up with them.
    let (scroll, mut latest) = ScrollToLatest::new(DEFAULT_SCROLL_DELAY);
    let mut view = LogView::new().with_hook(scroll);
    view.attach(consumer.connect());

    let Some(handle) = view.handle() else {
        bail!("Stream handle missing after attach");
    };
    let mut state_rx = handle.subscribe_state();

    println!("{}", table.header());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut printed = 0usize;

    let final_state = loop {
        let state = *state_rx.borrow_and_update();
        if state.is_terminal() {
            break state;
        }
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted, closing stream");
                break ConnectionState::Closed;
            }
            changed = latest.changed() => {
                if changed.is_err() {
                    break view.connection_state().unwrap_or(ConnectionState::Closed);
                }
                let upto = *latest.borrow_and_update();
                if let Some(upto) = upto {
                    print_rows(&view, &table, &mut printed, upto);
                }
            }
            changed = state_rx.changed() => {
                let state = *state_rx.borrow();
                if changed.is_err() {
                    break state;
                }
                info!("Connection {state}");
            }
        }
    };

    let stats = view.handle().map(|h| h.stats()).unwrap_or_default();
    let last_error = view.handle().and_then(|h| h.last_error());
    view.detach();

    let total = view.len();
    if total > printed {
        print_rows(&view, &table, &mut printed, total - 1);
    }
    println!("{}", "─".repeat(table.width()));
    println!("{}", report::summary_line(view.summary(), stats));

    if final_state == ConnectionState::Errored {
        bail!(
            "Connection lost: {}",
            last_error.unwrap_or_else(|| "unknown error".to_string())
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Flow {
            input,
            direction,
            pretty,
        } => run_flow(&input, direction, pretty),
        Command::Watch {
            endpoint,
            event_name,
            connect_timeout,
            width,
        } => {
            let config = StreamConfig {
                endpoint,
                event_name,
                connect_timeout: connect_timeout.map(Duration::from_secs),
                ..StreamConfig::default()
            };
            info!("Watching {}", config.endpoint);
            run_watch(config, width).await
        }
    }
}
