use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use stk::commands;
use stk::error::StackError;
use tracing::Level;

#[derive(Parser)]
#[command(name = "stk")]
#[command(about = "Stacked branches that stay consistent", long_about = None)]
struct Cli {
    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long, global = true)]
    yes: bool,

    /// Verbosity level (0-4)
    #[arg(short, action = ArgAction::Count, global = true)]
    v: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a branch stacked on the current one
    #[command(visible_alias = "c")]
    Create {
        name: String,
        /// Commit all changes with this message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Create a branch between the current one and its child
    Insert {
        name: String,
        /// Commit all changes with this message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Squash the current branch into a single commit
    Squash {
        /// Message for the squashed commit (defaults to the first commit's)
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Track the current branch on a parent
    Track {
        /// Parent branch (interactive if not provided)
        #[arg(short, long)]
        parent: Option<String>,
    },

    /// Stop tracking a branch
    Untrack {
        /// Branch to untrack (defaults to current)
        branch: Option<String>,
    },

    /// Delete a branch and move its child onto its parent
    #[command(visible_alias = "rm")]
    Delete {
        /// Branch to delete (defaults to current)
        branch: Option<String>,
        /// Close the branch's pull request
        #[arg(long)]
        close_review: bool,
    },

    /// Fetch, update trunk, clean up merged branches and restack
    Sync,

    /// Rebase the current stack from its first out-of-date branch
    #[command(visible_alias = "rs")]
    Restack,

    /// Amend the current commit with all changes and restack
    #[command(visible_alias = "m")]
    Amend {
        /// Replace the commit message
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Push the branches of the current stack that changed
    Push,

    /// Push the stack and create/update pull requests
    #[command(visible_alias = "ss")]
    Submit {
        /// Create PRs as drafts
        #[arg(short, long)]
        draft: bool,
    },

    /// Open the current branch's pull request in the browser
    Open,

    /// Resume an operation stopped by a conflict
    #[command(visible_alias = "cont")]
    Continue,

    /// Show all stacks
    #[command(visible_alias = "ls")]
    List,

    /// Show the current stack
    #[command(visible_alias = "s")]
    Status {
        /// Output JSON for scripting
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing_subscriber(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::ERROR,
        1 => Level::WARN,
        2 => Level::INFO,
        3 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let yes = cli.yes;
    match cli.command {
        Commands::Create { name, message } => commands::branch::create::run(name, message),
        Commands::Insert { name, message } => commands::branch::insert::run(name, message),
        Commands::Squash { message } => commands::branch::squash::run(message),
        Commands::Track { parent } => commands::branch::track::run(parent),
        Commands::Untrack { branch } => commands::branch::untrack::run(branch),
        Commands::Delete {
            branch,
            close_review,
        } => commands::branch::delete::run(branch, close_review, yes),
        Commands::Sync => commands::sync::run(yes),
        Commands::Restack => commands::restack::run(yes),
        Commands::Amend { message } => commands::amend::run(message),
        Commands::Push => commands::push::run(),
        Commands::Submit { draft } => commands::submit::run(draft),
        Commands::Open => commands::open::run(),
        Commands::Continue => commands::continue_cmd::run(yes),
        Commands::List => commands::list::run(),
        Commands::Status { json } => commands::status::run(json),
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = init_tracing_subscriber(cli.v) {
        eprintln!("warning: could not install logger: {}", err);
    }

    if let Err(err) = run(cli) {
        let stack_err = err.downcast_ref::<StackError>();
        // The conflict report was already printed by the rebase executor
        if !matches!(stack_err, Some(StackError::ConflictPaused { .. })) {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            if let Some(hint) = stack_err.and_then(StackError::hint) {
                eprintln!("{} {}", "hint:".cyan(), hint);
            }
        }
        std::process::exit(stack_err.map_or(1, StackError::exit_code));
    }
}
