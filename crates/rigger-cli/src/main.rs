mod config;
mod setup_cmd;
mod status_cmd;
mod terminal;

use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use config::{CliOverrides, RiggerConfig};
use setup_cmd::Mode;

#[derive(Parser)]
#[command(
    name = "rigger",
    version,
    about = "Resumable installer for the Claude Code bundle: merges CLAUDE.md, hooks and settings"
)]
struct Cli {
    /// Claude Code home directory (overrides RIGGER_CLAUDE_HOME / CLAUDE_CONFIG_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    claude_home: Option<PathBuf>,

    /// Setup state file (overrides RIGGER_STATE_FILE)
    #[arg(long, global = true, value_name = "PATH")]
    state_file: Option<PathBuf>,

    /// Project directory for the local scope (defaults to the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    project_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the setup from the first step, offering earlier answers as defaults
    Run,
    /// Continue an interrupted setup from the last completed step
    Resume,
    /// Show setup progress and decisions
    Status {
        /// Print the raw state as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage the rigger config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Print a shell completion script
    Completions {
        /// Target shell
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write a commented default config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Show the resolved configuration
    Show,
    /// Set one key (paths.claude_home, paths.state_file, status_line.command)
    Set { key: String, value: String },
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            claude_home: self.claude_home.clone(),
            state_file: self.state_file.clone(),
            project_dir: self.project_dir.clone(),
        }
    }
}

/// Execute `rigger config show`.
fn cmd_config_show(cfg: &RiggerConfig) {
    let found = if cfg.config_file_found { "" } else { " (not found)" };
    println!("config file: {}{found}", cfg.config_file.display());
    println!("claude_home = {}", cfg.claude_home.display());
    println!("state_file = {}", cfg.state_file.display());
    println!("project_dir = {}", cfg.project_dir.display());
    match &cfg.status_line_command {
        Some(cmd) => println!("status_line.command = {cmd}"),
        None => println!(
            "status_line.command = {} (bundle default)",
            rigger_core::Catalog::embedded().status_line_command
        ),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run => {
            let cfg = RiggerConfig::resolve(&cli.overrides())?;
            setup_cmd::run_setup(&cfg, Mode::Run)?;
        }
        Commands::Resume => {
            let cfg = RiggerConfig::resolve(&cli.overrides())?;
            setup_cmd::run_setup(&cfg, Mode::Resume)?;
        }
        Commands::Status { json } => {
            let cfg = RiggerConfig::resolve(&cli.overrides())?;
            status_cmd::run_status(&cfg, json)?;
        }
        Commands::Config { ref command } => match command {
            ConfigCommands::Init { force } => {
                let path = config::config_path();
                config::init_config_at(&path, *force)?;
                println!("Config written to {}", path.display());
            }
            ConfigCommands::Show => {
                let cfg = RiggerConfig::resolve(&cli.overrides())?;
                cmd_config_show(&cfg);
            }
            ConfigCommands::Set { key, value } => {
                let path = config::config_path();
                config::set_config_value(&path, key, value)?;
                println!("{key} = {value:?} written to {}", path.display());
            }
        },
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "rigger", &mut io::stdout());
        }
    }

    Ok(())
}

fn main() {
    // Prompts go to stdout; keep logs on stderr and quiet unless asked for.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let resumable = matches!(cli.command, Commands::Run | Commands::Resume);

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        if resumable {
            eprintln!("Fix the problem above, then run `rigger resume` to continue.");
        }
        std::process::exit(1);
    }
}
