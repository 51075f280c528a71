#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use laneboard_core::config::resolve_config;
use output::{CliError, OutputMode, render_error};
use std::env;
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "laneboard: plan posts across distribution lanes",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format; overrides `--json`, `FORMAT`, and the user config.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Resolve the output mode: explicit flag first, then the config layer.
    fn output_mode(&self, project_root: &Path) -> anyhow::Result<OutputMode> {
        if let Some(mode) = self.format {
            return Ok(mode);
        }
        let effective = resolve_config(project_root, self.json)?;
        Ok(OutputMode::from_resolved(&effective.resolved_output))
    }

    /// Mode used when the config layer itself could not be read.
    const fn fallback_mode(&self) -> OutputMode {
        match self.format {
            Some(mode) => mode,
            None if self.json => OutputMode::Json,
            None => OutputMode::Text,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a board",
        long_about = "Create .laneboard/ with a default config and an empty board database.",
        after_help = "EXAMPLES:\n    # Initialize a board in the current directory\n    lb init\n\n    # Emit machine-readable output\n    lb init --json"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Content",
        about = "Manage ideas",
        after_help = "EXAMPLES:\n    # Record an idea\n    lb idea add --title \"Spring launch\" --link https://example.com/brief\n\n    # Show idea #3 with its posts\n    lb idea show 3"
    )]
    Idea {
        #[command(subcommand)]
        command: cmd::idea::IdeaCommand,
    },

    #[command(
        next_help_heading = "Content",
        about = "Create, edit, and approve posts",
        after_help = "EXAMPLES:\n    # Draft a post from idea #3\n    lb post create --title \"Teaser\" --lane instagram --idea 3\n\n    # Schedule it\n    lb post update POST-3-1 --status scheduled --pillar education --date 2030-05-01 --time 09:00\n\n    # Approve and publish in one step\n    lb post update POST-3-1 --status published --approve"
    )]
    Post {
        #[command(subcommand)]
        command: cmd::post::PostCommand,
    },

    #[command(
        next_help_heading = "Read",
        about = "Show one lane",
        long_about = "Show the posts of one lane, ordered by schedule or freshness.",
        after_help = "EXAMPLES:\n    # Instagram lane in schedule order\n    lb lane instagram\n\n    # Most recently touched first\n    lb lane x --sort freshness"
    )]
    Lane(cmd::lane::LaneArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show every visible lane",
        after_help = "EXAMPLES:\n    # Whole board\n    lb board\n\n    # Include archived posts\n    lb board --archived --json"
    )]
    Board(cmd::board::BoardArgs),

    #[command(
        next_help_heading = "Read",
        about = "List evergreen posts due for repurposing",
        after_help = "EXAMPLES:\n    # What is due today\n    lb resurface\n\n    # Push a post to its next cycle\n    lb resurface --roll POST-D004"
    )]
    Resurface(cmd::resurface::ResurfaceArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Show effective configuration",
        after_help = "EXAMPLES:\n    # Show config\n    lb config\n\n    # As JSON\n    lb config --json"
    )]
    Config,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LANEBOARD_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "laneboard=debug,info"
        } else {
            "laneboard=info,warn"
        })
    });

    let format = env::var("LANEBOARD_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, output, project_root),
        Commands::Idea { command } => cmd::idea::run_idea(command, output, project_root),
        Commands::Post { command } => cmd::post::run_post(command, output, project_root),
        Commands::Lane(args) => cmd::lane::run_lane(args, output, project_root),
        Commands::Board(args) => cmd::board::run_board(args, output, project_root),
        Commands::Resurface(args) => cmd::resurface::run_resurface(args, output, project_root),
        Commands::Config => cmd::config::run_config(output, cli.json, project_root),
    }
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let project_root = match env::current_dir() {
        Ok(root) => root,
        Err(err) => {
            report(cli.fallback_mode(), &err.into());
            return ExitCode::FAILURE;
        }
    };
    let output = match cli.output_mode(&project_root) {
        Ok(mode) => mode,
        Err(err) => {
            report(cli.fallback_mode(), &err);
            return ExitCode::FAILURE;
        }
    };
    debug!(?output, root = %project_root.display(), "resolved output mode");

    match run(&cli, output, &project_root) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(output, &err);
            ExitCode::FAILURE
        }
    }
}

fn report(output: OutputMode, err: &anyhow::Error) {
    if render_error(output, &CliError::from_anyhow(err)).is_err() {
        eprintln!("error: {err:#}");
    }
}
