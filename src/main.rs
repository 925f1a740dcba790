mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::commands::App;
use docchat::config::Config;

#[derive(Parser)]
#[command(name = "docchat")]
#[command(version = "0.1.0")]
#[command(about = "Ask questions about your documents", long_about = None)]
struct Cli {
    /// Service base URL (overrides config and DOCCHAT_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        full_name: String,
        /// Prompted for (with echo) when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign in to an existing account
    Login {
        #[arg(long)]
        email: String,
        /// Prompted for (with echo) when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Sign out and forget the stored credential
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List your documents
    Docs,
    /// Upload a PDF or TXT document
    Upload { path: PathBuf },
    /// Delete a document by id
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show previous questions and answers
    History,
    /// Ask a single question
    Ask { question: String },
    /// Start an interactive chat
    Chat,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load()?;
    config.apply_api_url_override(cli.api_url);

    let mut app = App::start(config).await?;

    match cli.command {
        None => {
            // docchat with no args = show session status
            commands::whoami(&app);
            println!("Run 'docchat --help' to see what you can do.");
        }
        Some(Commands::Signup {
            email,
            full_name,
            password,
        }) => commands::signup(&mut app, &email, &full_name, password).await?,
        Some(Commands::Login { email, password }) => {
            commands::login(&mut app, &email, password).await?
        }
        Some(Commands::Logout) => commands::logout(&mut app),
        Some(Commands::Whoami) => commands::whoami(&app),
        Some(Commands::Docs) => commands::list_documents(&app).await?,
        Some(Commands::Upload { path }) => commands::upload(&app, &path).await?,
        Some(Commands::Delete { id, yes }) => commands::delete(&app, &id, yes).await?,
        Some(Commands::History) => commands::history(&app).await?,
        Some(Commands::Ask { question }) => commands::ask(&app, &question).await?,
        Some(Commands::Chat) => commands::chat(&app).await?,
    }

    Ok(())
}
