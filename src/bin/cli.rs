//! Decision-inspection tool: evaluate the access engine against task/actor
//! fixtures without standing up the rest of the system.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;

use taskgate::access::{assignment, audit};
use taskgate::models::{ChangeSet, Task};
use taskgate::{authorize, resolve_access, Action, Actor, TaskRecord, TierConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "taskgate decision inspector", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve the access mode for an actor on a task
    Check {
        /// JSON task record fixture
        task: PathBuf,
        /// JSON actor fixture
        actor: PathBuf,
    },
    /// Authorize a specific action, optionally with a change-set payload
    Authorize {
        task: PathBuf,
        actor: PathBuf,
        /// One of: read, comment, mark_seen, assign, accept, approve,
        /// upload_final, remove_file, record_changes
        action: String,
        /// JSON change-set fixture
        #[arg(long)]
        changes: Option<PathBuf>,
    },
    /// Print the derived facts for a task (assignee, watchers, metadata mode)
    Facts { task: PathBuf },
}

fn main() -> anyhow::Result<()> {
    // Env from CWD when present; absence is fine, the engine defaults to the
    // untiered regime.
    let _ = dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = TierConfig::from_env();

    match cli.command {
        Commands::Check { task, actor } => {
            let task = load_task(&task)?;
            let actor = load_actor(&actor)?;
            let decision = resolve_access(&task, &actor, &config);
            println!("mode:     {}", decision.mode);
            println!("assignee: {}", display_or_dash(&decision.effective_assignee));
            println!("watchers: {}", list_or_dash(&decision.watchers));
        }
        Commands::Authorize {
            task,
            actor,
            action,
            changes,
        } => {
            let task = load_task(&task)?;
            let actor = load_actor(&actor)?;
            let action: Action = action
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            let payload: Option<ChangeSet> = match changes {
                Some(path) => Some(load_json(&path).context("failed to parse change set")?),
                None => None,
            };
            match authorize(&task, &actor, action, payload.as_ref(), &config) {
                v if v.is_allowed() => println!("allow"),
                v => println!("deny: {}", v.reason().unwrap_or("unspecified")),
            }
        }
        Commands::Facts { task } => {
            let task = load_task(&task)?;
            let mode = if audit::has_assignment_metadata(&task) {
                "current"
            } else {
                "legacy"
            };
            println!("metadata: {mode}");
            println!(
                "assignee: {}",
                display_or_dash(&assignment::resolve_assignee(&task))
            );
            println!("watchers: {}", list_or_dash(&audit::watcher_emails(&task)));
            println!("approval: {:?}", task.approval_state);
        }
    }

    Ok(())
}

fn load_task(path: &Path) -> anyhow::Result<Task> {
    let record: TaskRecord = load_json(path).context("failed to parse task record")?;
    Ok(Task::from(record))
}

fn load_actor(path: &Path) -> anyhow::Result<Actor> {
    load_json(path).context("failed to parse actor")
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

fn display_or_dash(value: &str) -> &str {
    if value.is_empty() {
        "-"
    } else {
        value
    }
}

fn list_or_dash(values: &[String]) -> String {
    if values.is_empty() {
        "-".to_string()
    } else {
        values.join(", ")
    }
}
