mod approval_ui;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use operon_core::approval::ApprovalGate;
use operon_core::{Phase, PhaseMachine};
use operon_index::SymbolGraph;

#[derive(Parser)]
#[command(name = "operon", about = "Local code-intelligence agent", version)]
struct Cli {
    /// Repository root (defaults to the current directory)
    #[arg(long, global = true)]
    repo: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print definition, signature, docstring, and callers of a symbol, or the
    /// enclosing symbol at `<file>:<line>`.
    Explain {
        /// Symbol name, `<file>:<line>`, or `flow <func>`
        target: String,
        /// Second positional for `explain flow <func>`
        func: Option<String>,
    },
    /// Print all usage sites of a symbol.
    Usages { symbol: String },
    /// Dry-run rename across the repo; `--apply` writes.
    Rename {
        old: String,
        new: String,
        #[arg(long)]
        apply: bool,
    },
    /// Emit a docs tree, with oracle summaries unless `--no-llm`.
    Docs {
        #[arg(long)]
        no_llm: bool,
    },
    /// Emit per-symbol summaries for one file.
    Summarize { file: String },
    /// Change a function's signature and update call sites.
    Signature {
        func: String,
        params: String,
        #[arg(long)]
        apply: bool,
    },
    /// Drive the planner/coder/reviewer loop toward a goal.
    Agent {
        goal: String,
        #[arg(long)]
        auto_approve: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let repo_root = commands::repo_root_or_cwd(cli.repo);

    let mut graph = match SymbolGraph::load(&repo_root) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("internal_error: failed to load symbol graph: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = graph.build(true) {
        eprintln!("internal_error: failed to build symbol graph: {e}");
        std::process::exit(1);
    }

    let exit_code = match cli.command {
        Commands::Explain { target, func } => match func {
            Some(func) if target == "flow" => commands::explain_flow(&graph, &func),
            _ => match commands::resolve_file_line(&target) {
                Some((file, line)) => commands::explain_location(&graph, &file, line),
                None => commands::explain_symbol(&graph, &target),
            },
        },
        Commands::Usages { symbol } => commands::usages(&graph, &symbol),
        Commands::Rename { old, new, apply } => commands::rename(&graph, &old, &new, apply),
        Commands::Docs { no_llm } => {
            let oracle = if no_llm {
                None
            } else {
                Some(build_oracle(&repo_root))
            };
            commands::docs(&graph, no_llm, oracle.as_deref()).await
        }
        Commands::Summarize { file } => commands::summarize(&graph, &file),
        Commands::Signature { func, params, apply } => {
            commands::signature(&graph, &func, &params, apply)
        }
        Commands::Agent { goal, auto_approve } => run_agent(&repo_root, &graph, goal, auto_approve).await,
    };

    std::process::exit(exit_code);
}

fn build_oracle(repo_root: &std::path::Path) -> std::sync::Arc<dyn operon_core::Oracle> {
    let config = operon_config::Config::load(repo_root).unwrap_or_default();
    operon_provider::oracle_for_config(repo_root, &config.provider)
}

async fn run_agent(repo_root: &PathBuf, graph: &SymbolGraph, goal: String, auto_approve: bool) -> i32 {
    let config = operon_config::Config::load(repo_root).unwrap_or_default();
    let oracle = build_oracle(repo_root);
    let approval = ApprovalGate::new(auto_approve || config.auto_approve);

    let mut machine = PhaseMachine::new(goal, repo_root.clone(), graph, oracle.as_ref(), &approval);
    match machine.run().await {
        Phase::Done => {
            println!("done: {} file(s) modified", machine.state.history.files_modified.len());
            commands::EXIT_OK
        }
        Phase::Failed => {
            eprintln!("failed after {} steps", machine.state.budgets.step_counter);
            commands::EXIT_FAILURE
        }
        other => {
            eprintln!("internal_error: unexpected terminal phase {other:?}");
            1
        }
    }
}
