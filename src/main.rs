use clap::{Parser, Subcommand, ValueEnum};
use eyre::{Result, eyre};
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use todostore::{Priority, Session, SessionConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "todostore")]
#[command(about = "TodoStore CLI - In-memory to-do list session")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// When to colour text output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Priority for tasks added without an explicit !priority
    #[arg(long, value_enum, default_value_t = PriorityArg::Medium)]
    default_priority: PriorityArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read commands interactively from stdin
    Shell,

    /// Execute a command script, one command per line
    Run {
        /// Path to the script
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

#[derive(Clone, Copy, ValueEnum)]
enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Priority::Low,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::High => Priority::High,
        }
    }
}

fn main() -> Result<()> {
    // Setup tracing on stderr so it never mixes with command output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Auto => colored::control::set_override(io::stdout().is_terminal()),
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
    }

    let config = SessionConfig {
        default_priority: cli.default_priority.into(),
        json: cli.json,
    };
    let mut session = Session::new(config);
    let mut stdout = io::stdout().lock();

    match cli.command {
        Commands::Shell => {
            let interactive = io::stdin().is_terminal();
            session.run(io::stdin().lock(), &mut stdout, interactive)?;
        }
        Commands::Run { file } => {
            let summary = session.run_file(&file, &mut stdout)?;
            if summary.failures > 0 {
                return Err(eyre!(
                    "{} of {} commands in {:?} failed",
                    summary.failures,
                    summary.commands,
                    file
                ));
            }
        }
    }

    Ok(())
}
