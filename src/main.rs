use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod cmd;

#[derive(Parser)]
#[command(name = "taskboard")]
#[command(version, about = "Session, permission and board client for Taskboard")]
pub struct Cli {
    /// Debug-level logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Path to taskboard.toml (defaults to the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend base URL. Overrides the config file and TASKBOARD_BASE_URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Directory holding the persisted session
    #[arg(long, global = true, env = "TASKBOARD_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with username and password
    Login {
        /// Prompted for when omitted
        username: Option<String>,
        /// Read the password from the first line of stdin
        #[arg(long)]
        password_stdin: bool,
    },
    /// Forget the stored session
    Logout,
    /// Show whether a session is stored and when it expires
    Status,
    /// Refresh the access token now
    Refresh,
    /// Show the logged-in user
    Whoami,
    /// Check one permission in a workspace
    Can {
        workspace: String,
        /// Field name (`cardEdit`) or `resource:action` (`card:edit`)
        permission: String,
        /// Assert that you own the target
        #[arg(long)]
        owner: bool,
    },
    /// Show every permission level in a workspace
    Permissions { workspace: String },
    /// List the cards of a board
    Cards {
        board: String,
        /// Include archived cards
        #[arg(long)]
        archived: bool,
    },
    /// Attach a file to a card
    Upload { card: String, file: PathBuf },
    /// Manage workspace roles
    Roles {
        #[command(subcommand)]
        command: RolesCommands,
    },
    /// Follow session events until the session ends or Ctrl-C
    Watch {
        /// Also send presence heartbeats for this board and print viewers
        #[arg(long)]
        board: Option<String>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum RolesCommands {
    /// List roles
    List {
        #[arg(long)]
        workspace: Option<String>,
    },
    /// Delete a role
    Delete {
        id: String,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Assign a role to a workspace member
    Assign {
        workspace: String,
        user: String,
        role: String,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Validate configuration
    Validate,
    /// Print the default config file location
    Path,
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug,hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn,h2=warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    // A missing .env is normal.
    let _ = dotenvy::dotenv();
    init_tracing(cli.verbose, cli.log_json);

    match &cli.command {
        Commands::Login {
            username,
            password_stdin,
        } => cmd::cmd_login(&cli, username.as_deref(), *password_stdin).await?,
        Commands::Logout => cmd::cmd_logout(&cli)?,
        Commands::Status => cmd::cmd_status(&cli)?,
        Commands::Refresh => cmd::cmd_refresh(&cli).await?,
        Commands::Whoami => cmd::cmd_whoami(&cli).await?,
        Commands::Can {
            workspace,
            permission,
            owner,
        } => cmd::cmd_can(&cli, workspace, permission, *owner).await?,
        Commands::Permissions { workspace } => cmd::cmd_permissions(&cli, workspace).await?,
        Commands::Cards { board, archived } => cmd::cmd_cards(&cli, board, *archived).await?,
        Commands::Upload { card, file } => cmd::cmd_upload(&cli, card, file).await?,
        Commands::Roles { command } => cmd::cmd_roles(&cli, command.clone()).await?,
        Commands::Watch { board } => cmd::cmd_watch(&cli, board.as_deref()).await?,
        Commands::Config { command } => cmd::cmd_config(&cli, command.clone())?,
    }

    Ok(())
}
