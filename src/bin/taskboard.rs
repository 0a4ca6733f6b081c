//! An interactive terminal client for the planner backend

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use taskboard_sync::classifier::{Buckets, RenderFlags};
use taskboard_sync::client::Client;
use taskboard_sync::config::SyncConfig;
use taskboard_sync::traits::{AffordanceState, Presenter};
use taskboard_sync::view::BoardView;
use taskboard_sync::{HttpOrchestrator, SyncOrchestrator, TaskId, TaskStore};

const HELP: &str = "\
Commands:
    sync [url]            run a full sync (ingesting the calendar at url)
    add <text>            let the agent plan some text
    rm <id>               delete a task
    answer <id> <text>    answer the pending question of a task
    show                  print the board again
    refresh               fetch the tasks again
    help                  print this help
    quit";

#[derive(Parser, Debug)]
#[command(name = "taskboard", about = "Plan your day with the agent")]
struct Args {
    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Backend base URL (overrides the config)
    #[arg(long)]
    base_url: Option<String>,
    /// Calendar feed used by `sync` when no URL is given (overrides the config)
    #[arg(long)]
    calendar_url: Option<String>,
}


/// Prints the board every time it changes
struct TerminalPresenter;

impl Presenter for TerminalPresenter {
    fn render(&self, buckets: &Buckets, flags: RenderFlags) {
        let board = BoardView::new(buckets, flags, &Local);
        println!();
        taskboard_sync::utils::print_board(&board);
    }

    fn show_status(&self, text: &str) {
        println!("[{}]", text);
    }

    fn alert(&self, text: &str) {
        eprintln!("!! {}", text);
    }

    fn set_affordances(&self, state: AffordanceState) {
        log::debug!("Input enabled: {}, sync busy: {}", state.input_enabled, state.sync_busy);
    }
}


fn load_config(args: &Args) -> Result<SyncConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => SyncConfig::from_file(path)?,
        None => SyncConfig::default(),
    };
    config = config.with_env_overrides()?;
    if let Some(url) = &args.base_url {
        config.base_url = url.parse()?;
    }
    if let Some(url) = &args.calendar_url {
        config.calendar_url = Some(url.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    let client = match Client::from_url(config.base_url.clone()) {
        Ok(client) => client,
        Err(err) => {
            eprintln!("Unable to create the HTTP client: {}", err);
            std::process::exit(1);
        }
    };
    match client.ping().await {
        Ok(message) => log::info!("Backend says: {}", message),
        Err(err) => log::warn!("Backend is not reachable yet: {}", err),
    }

    let store = Arc::new(TaskStore::new(Arc::new(client), Arc::new(TerminalPresenter)));
    let orchestrator: Arc<HttpOrchestrator<TerminalPresenter>> = Arc::new(SyncOrchestrator::new(store.clone(), config));
    orchestrator.start();
    store.refresh().await;
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                log::error!("Unable to read stdin: {}", err);
                break;
            }
        };

        let line = line.trim();
        let (command, rest) = match line.find(' ') {
            Some(pos) => (&line[..pos], line[pos..].trim()),
            None => (line, ""),
        };

        match command {
            "" => continue,
            "quit" | "exit" => break,
            "help" => println!("{}", HELP),
            "show" => store.render(),
            "refresh" => {
                let store = store.clone();
                tokio::spawn(async move { store.refresh().await; });
            },
            "sync" => {
                let url = if rest.is_empty() { orchestrator.config().calendar_url.clone() } else { Some(rest.to_string()) };
                let url = match url {
                    Some(url) => url,
                    None => {
                        eprintln!("No calendar URL configured, use `sync <url>`");
                        continue;
                    }
                };
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move {
                    let _ = orchestrator.run_full_sync(&url).await;
                });
            },
            "add" => {
                let text = rest.to_string();
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move {
                    let _ = orchestrator.submit_text(&text).await;
                });
            },
            "rm" => {
                let id = TaskId::from(rest);
                let task = match store.get(&id) {
                    Some(task) => task,
                    None => {
                        eprintln!("No task {}", id);
                        continue;
                    }
                };
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move {
                    orchestrator.delete_task(task.id(), task.is_external()).await;
                });
            },
            "answer" => {
                let (id, answer) = match rest.find(' ') {
                    Some(pos) => (TaskId::from(&rest[..pos]), rest[pos..].trim().to_string()),
                    None => {
                        eprintln!("Usage: answer <id> <text>");
                        continue;
                    }
                };
                let question = match store.get(&id).and_then(|t| t.first_question().map(String::from)) {
                    Some(question) => question,
                    None => {
                        eprintln!("Task {} has no pending question", id);
                        continue;
                    }
                };
                let orchestrator = orchestrator.clone();
                tokio::spawn(async move {
                    let _ = orchestrator.answer_clarification(&id, &question, &answer).await;
                });
            },
            other => eprintln!("Unknown command {:?}. Type `help` for help.", other),
        }
    }
}
