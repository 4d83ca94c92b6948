//! REPL for padctl
use anyhow::Result;

use pad::{PlaygroundHandle, Snapshot};
use std::path::PathBuf;

use crate::editor::{self, Editor};
use rustyline::{error::ReadlineError, ExternalPrinter};

const HELP: &str = "\
Lines are appended to the snippet. Commands:
  :run         run the snippet
  :clear       clear the output
  :auto        toggle auto-run
  :load NAME   load an example
  :show        print the snippet
  :reset       empty the snippet
  :status      print the status
  :quit        exit";

/// REPL command
#[derive(Debug, PartialEq)]
enum Cmd<'a> {
    Run,
    Clear,
    Auto,
    Load(&'a str),
    Show,
    Reset,
    Status,
    Quit,
    Help,
    Line(&'a str),
}

impl<'a> Cmd<'a> {
    fn parse(line: &'a str) -> std::result::Result<Self, String> {
        let Some(cmd) = line.trim().strip_prefix(':') else {
            return Ok(Cmd::Line(line));
        };
        let (word, rest) = cmd.split_once(' ').unwrap_or((cmd, ""));
        let cmd = match word {
            "run" | "r" => Cmd::Run,
            "clear" => Cmd::Clear,
            "auto" => Cmd::Auto,
            "load" | "l" => Cmd::Load(rest.trim()),
            "show" => Cmd::Show,
            "reset" => Cmd::Reset,
            "status" => Cmd::Status,
            "quit" | "q" => Cmd::Quit,
            "help" | "h" => Cmd::Help,
            _ => return Err(format!("Unknown command :{word} - try :help")),
        };
        Ok(cmd)
    }
}

/// Entrypoint for running REPL.
/// Returns Err if REPL terminated with error
pub(crate) async fn run(handle: &PlaygroundHandle) -> Result<()> {
    let mut rl = editor::editor()?;
    let printer = rl.create_external_printer()?;
    let history = history_file();

    load_history(&mut rl, &history);
    let watcher = tokio::spawn(print_runs(handle.clone(), printer));

    let mut buffer = String::new();
    loop {
        let line = match rl.readline("pad> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                line
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        };
        let cmd = match Cmd::parse(&line) {
            Ok(cmd) => cmd,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };
        let result = match cmd {
            Cmd::Quit => break,
            Cmd::Help => {
                println!("{HELP}");
                Ok(())
            }
            Cmd::Line(line) => {
                buffer.push_str(line);
                buffer.push('\n');
                handle.edit(&buffer).await
            }
            Cmd::Run => handle.run().await.map(|_| ()),
            Cmd::Clear => handle.clear_output().await,
            Cmd::Auto => handle.toggle_auto_run().await.map(|on| {
                println!("Auto-run {}", if on { "on" } else { "off" });
            }),
            Cmd::Load(name) => match handle.load_example(name).await {
                Ok(status) => {
                    println!("{status}");
                    handle.snapshot().await.map(|snap| buffer = snap.text)
                }
                Err(e) => Err(e),
            },
            Cmd::Show => {
                print!("{buffer}");
                Ok(())
            }
            Cmd::Reset => {
                buffer.clear();
                handle.set_text("").await
            }
            Cmd::Status => handle.snapshot().await.map(|snap| {
                println!(
                    "{} (runs: {}, auto-run: {})",
                    snap.status, snap.runs, snap.auto_run
                );
            }),
        };
        if let Err(e) = result {
            eprintln!("{}", e);
            break;
        }
    }

    save_history(&mut rl, &history);
    watcher.abort();

    Ok(())
}

/// Print status and output of every run as it completes
async fn print_runs(handle: PlaygroundHandle, mut printer: impl ExternalPrinter + Send + 'static) {
    let mut rx = handle.subscribe();
    let mut last = rx.borrow_and_update().clone();
    while rx.changed().await.is_ok() {
        let snap = rx.borrow_and_update().clone();
        if let Some(msg) = run_message(&last, &snap) {
            if printer.print(msg).is_err() {
                break;
            }
        }
        last = snap;
    }
}

/// What to print when state moves from `last` to `snap`
fn run_message(last: &Snapshot, snap: &Snapshot) -> Option<String> {
    let ran = snap.runs != last.runs;
    let output_changed = snap.output != last.output;
    if !ran && !output_changed {
        return None;
    }
    if snap.output.is_empty() {
        Some(format!("[{}]\n", snap.status))
    } else {
        Some(format!("[{}]\n{}\n", snap.status, snap.output))
    }
}

/// Path to file to use for history
fn history_file() -> Option<PathBuf> {
    let dir = dirs::data_local_dir()
        .or_else(dirs::data_dir)
        .or_else(dirs::home_dir)?;
    Some(dir.as_path().join(".padctl_history"))
}

fn load_history(rl: &mut Editor, history: &Option<PathBuf>) {
    if let Some(history) = history {
        if let Err(e) = rl.load_history(&history) {
            eprintln!("Failed to load {} - {}", history.to_string_lossy(), e);
        }
    }
}

fn save_history(rl: &mut Editor, history: &Option<PathBuf>) {
    if let Some(history) = history {
        if let Err(e) = rl.save_history(&history) {
            eprintln!("Failed to save {} - {}", history.to_string_lossy(), e);
        }
    }
}
