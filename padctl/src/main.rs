use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use pad::examples::{self, CATALOG};
use pad::{Config, ExampleSource, RunStatus, Session};

mod editor;
mod repl;
mod report;

use report::ExecutionReport;

#[derive(Parser, Debug)]
#[command(version, about = "Run charting snippets against the playground environment")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Where examples are fetched from: a base URL, a directory, or `offline`
    #[arg(long, global = true, env = "PAD_EXAMPLES", default_value = "offline")]
    examples: String,

    /// Viewport width in CSS pixels
    #[arg(long, global = true, env = "PAD_VIEWPORT_WIDTH")]
    viewport_width: Option<f64>,

    /// Default device pixel ratio for canvases
    #[arg(long, global = true)]
    dpi: Option<f64>,

    /// Evaluation steps allowed per run
    #[arg(long, global = true)]
    step_limit: Option<u64>,

    /// Quiet period after an edit before auto-run fires
    #[arg(long, global = true)]
    auto_run_delay_ms: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a snippet file, or stdin with `-`, and print the rendered output
    Run {
        file: PathBuf,

        /// Print a JSON report instead of markup
        #[arg(long)]
        json: bool,
    },
    /// Print the text of an example
    Example { name: String },
    /// List available examples
    Examples,
}

impl Cli {
    fn config(&self) -> Config {
        let mut config = Config::default();
        if let Some(w) = self.viewport_width {
            config.viewport_width = w;
        }
        if let Some(dpi) = self.dpi {
            config.device_pixel_ratio = dpi;
        }
        if let Some(limit) = self.step_limit {
            config.step_limit = limit;
        }
        if let Some(delay) = self.auto_run_delay_ms {
            config.auto_run_delay_ms = delay;
        }
        config
    }

    fn source(&self) -> ExampleSource {
        ExampleSource::parse(&self.examples)
    }
}

/// Read snippet at `path`, with `-` for stdin
fn read_snippet(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .with_context(|| "Failed to read snippet from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Run a single snippet
fn run_cmd(config: Config, source: ExampleSource, path: &Path, json: bool) -> Result<ExitCode> {
    let text = read_snippet(path)?;
    let mut session = Session::new(config, source);
    session.set_text(&text);
    let status = session.run();
    let report = ExecutionReport::of(&session);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if let Some(error) = &report.error {
        eprintln!("{}: {error}", report.status_text);
    } else if !report.output.is_empty() {
        println!("{}", report.output);
    }

    Ok(match status {
        RunStatus::Failed => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}

/// Print text of example `name`
async fn example_cmd(source: ExampleSource, name: &str) -> Result<ExitCode> {
    let example = source.load(name).await;
    if example.fallback {
        eprintln!("Using built-in example for {name}");
    }
    println!("{}", example.text);
    Ok(ExitCode::SUCCESS)
}

fn examples_cmd() -> Result<ExitCode> {
    for name in CATALOG {
        println!("{name:<28}{}", examples::title(name));
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    debug!("{cli:?}");
    let config = cli.config();
    let source = cli.source();

    match &cli.command {
        Some(Command::Run { file, json }) => run_cmd(config, source, file, *json),
        Some(Command::Example { name }) => example_cmd(source, name).await,
        Some(Command::Examples) => examples_cmd(),
        None => {
            let handle = pad::playground::start(config, source);
            repl::run(&handle).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
