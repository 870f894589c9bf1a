use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use testdeck_application::Session;
use testdeck_core::artifact::NodeId;
use testdeck_core::session::EntryRole;
use testdeck_telemetry::ActivityEvent;

use crate::app::App;
use crate::render;

const COMMANDS: &[&str] = &[
    "/select", "/unselect", "/expand", "/tree", "/log", "/status", "/cancel", "/reset", "/reload",
    "/help",
];

/// Completion, highlighting and hints for slash commands.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: COMMANDS.iter().map(|c| c.to_string()).collect(),
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            let candidates = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

/// A parsed line of REPL input.
#[derive(Debug, PartialEq)]
enum Input<'a> {
    Quit,
    Select(&'a str),
    Unselect,
    Expand(&'a str),
    Tree,
    Log,
    Status,
    Cancel,
    Reset,
    Reload,
    Help,
    Unknown(&'a str),
    Request(&'a str),
}

fn parse(line: &str) -> Input<'_> {
    if line == "quit" || line == "exit" {
        return Input::Quit;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Request(line);
    };
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match (name, arg) {
        ("select", id) if !id.is_empty() => Input::Select(id),
        ("unselect", _) => Input::Unselect,
        ("expand", id) if !id.is_empty() => Input::Expand(id),
        ("tree", _) => Input::Tree,
        ("log", _) => Input::Log,
        ("status", _) => Input::Status,
        ("cancel", _) => Input::Cancel,
        ("reset", _) => Input::Reset,
        ("reload", _) => Input::Reload,
        ("help", _) => Input::Help,
        _ => Input::Unknown(line),
    }
}

fn print_help() {
    let lines = [
        ("/select ID", "select a node as context for the next request"),
        ("/unselect", "send the next request without context"),
        ("/expand ID", "expand or collapse a folder"),
        ("/tree", "show the visible tree"),
        ("/log", "show the whole session log"),
        ("/status", "show whether a request is in flight"),
        ("/cancel", "abandon the request in flight"),
        ("/reset", "cancel and clear the log"),
        ("/reload", "reload the project, keeping the selection if possible"),
        ("quit", "leave"),
    ];
    for (command, help) in lines {
        println!("  {:<12} {}", command.bright_cyan(), help.bright_black());
    }
    println!("{}", "Anything else is sent as a request.".bright_black());
}

/// Prints engine entries as they are appended.
fn spawn_watcher(session: Arc<Session>) -> JoinHandle<()> {
    let mut versions = session.subscribe();
    tokio::spawn(async move {
        let mut last_seen = session.entries().last().map(|e| e.id);
        while versions.changed().await.is_ok() {
            let entries = session.entries();
            for entry in entries.iter() {
                if last_seen.is_some_and(|seen| entry.id <= seen) {
                    continue;
                }
                if entry.role == EntryRole::Engine {
                    println!("{}", render::entry(entry));
                }
                last_seen = Some(entry.id);
            }
        }
    })
}

/// Prints warnings and errors from the activity feed.
fn spawn_feed(mut feed: mpsc::UnboundedReceiver<ActivityEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = feed.recv().await {
            if event.level == "WARN" || event.level == "ERROR" {
                println!("{}", format!("[{}] {}", event.level, event.message).yellow());
            }
        }
    })
}

fn handle(session: &Session, input: Input<'_>) -> testdeck_core::Result<()> {
    match input {
        Input::Select(id) => {
            let result = session.select(&NodeId::from(id))?;
            let path = session.with_tree(|tree| tree.path_of(&result.current));
            println!(
                "{} {}",
                "Selected".green(),
                path.unwrap_or_else(|| result.current.to_string())
            );
        }
        Input::Unselect => match session.clear_selection() {
            Some(previous) => println!("{} {}", "Cleared selection".green(), previous),
            None => println!("{}", "Nothing selected".bright_black()),
        },
        Input::Expand(id) => {
            session.toggle_expand(&NodeId::from(id))?;
            render::print_rows(&session.visible_rows());
        }
        Input::Tree => render::print_rows(&session.visible_rows()),
        Input::Log => render::print_entries(session.entries().iter()),
        Input::Status => {
            let pending = session
                .pending()
                .map(|p| format!(" (request {})", p.request_id))
                .unwrap_or_default();
            println!("{}{}", render::status(session.status()), pending);
        }
        Input::Cancel => {
            if !session.cancel() {
                println!("{}", "Nothing to cancel".bright_black());
            }
        }
        Input::Reset => {
            session.reset();
            println!("{}", "Session cleared".green());
        }
        Input::Help => print_help(),
        Input::Unknown(line) => println!("{} {}", "Unknown command".bright_black(), line),
        Input::Request(text) => {
            println!("{}", format!("> {}", text).green());
            session.submit_with_selection(text)?;
        }
        Input::Reload | Input::Quit => {}
    }
    Ok(())
}

pub async fn run(
    app: &App,
    project: Option<&Path>,
    feed: Option<mpsc::UnboundedReceiver<ActivityEvent>>,
) -> Result<()> {
    let session = app.open_session(project).await?;
    let watcher = spawn_watcher(Arc::clone(&session));
    let feed = feed.map(spawn_feed);

    let mut rl: Editor<CliHelper, DefaultHistory> = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== testdeck ===".bright_magenta().bold());
    println!(
        "{}",
        format!(
            "engine: {} | timeout: {}s | /help for commands, 'quit' to exit",
            app.config.engine.kind, app.config.session.engine_timeout_secs
        )
        .bright_black()
    );
    render::print_rows(&session.visible_rows());
    println!();

    loop {
        // The editor blocks on the terminal; keep the runtime's other workers free.
        let readline = tokio::task::block_in_place(|| rl.readline(">> "));

        match readline {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let result = match parse(trimmed) {
                    Input::Quit => {
                        println!("{}", "Goodbye!".bright_green());
                        break;
                    }
                    Input::Reload => match session.reload_tree().await {
                        Ok(_) => {
                            render::print_rows(&session.visible_rows());
                            Ok(())
                        }
                        Err(e) => Err(e),
                    },
                    input => handle(&session, input),
                };

                match result {
                    Ok(()) => {}
                    Err(e) if e.is_recoverable() => println!("{}", e.to_string().yellow()),
                    Err(e) => {
                        eprintln!("{}", format!("Error: {}", e).red());
                        break;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                if session.cancel() {
                    println!("{}", "Request cancelled. Type 'quit' to exit.".yellow());
                } else {
                    println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
                }
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    app.registry.remove(session.id()).await;
    watcher.abort();
    if let Some(feed) = feed {
        feed.abort();
    }
    Ok(())
}
