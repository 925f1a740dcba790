use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;

use docchat::api::{auth_channel, Citation, DocChatApi, DocumentInfo, HistoryItem, HttpApi};
use docchat::config::Config;
use docchat::conversation::{
    get_help_text, parse_slash_command, ConversationController, Message, Role, SlashCommand,
    SubmitOutcome,
};
use docchat::library::{format_size, DocumentLibrary, DELETE_FAILED_NOTICE, UPLOAD_FAILED_NOTICE};
use docchat::session::{Gate, SessionManager};
use docchat::storage::StorageManager;
use docchat::views::{load_history, ListView};

const AUTH_FAILED_NOTICE: &str = "Authentication failed";

/// Everything a command needs: configuration, the service client and the session.
pub struct App {
    config: Config,
    api: Arc<HttpApi>,
    session: SessionManager<HttpApi>,
}

impl App {
    /// Wire the client together and restore any stored session.
    pub async fn start(config: Config) -> Result<Self> {
        let (writer, channel) = auth_channel();
        let api = Arc::new(HttpApi::new(&config, channel).context("Failed to create HTTP client")?);
        let storage = StorageManager::with_root(&config.docchat_home);
        let mut session = SessionManager::new(api.clone(), storage, writer);
        session.init().await;

        Ok(Self {
            config,
            api,
            session,
        })
    }

    /// Print a hint and return false unless the session is verified.
    fn require_signed_in(&self) -> bool {
        match self.session.gate() {
            Gate::Allowed(_) => true,
            Gate::Pending => {
                println!("⏳ Your session is still being verified. Try again in a moment.");
                false
            }
            Gate::Denied => {
                println!("🔒 You are not signed in. Run 'docchat login' or 'docchat signup' first.");
                false
            }
        }
    }
}

pub async fn signup(
    app: &mut App,
    email: &str,
    full_name: &str,
    password: Option<String>,
) -> Result<()> {
    if full_name.trim().is_empty() {
        println!("❌ Full name is required");
        return Ok(());
    }
    let password = match password {
        Some(password) => password,
        None => prompt("🔑 Choose a password: ")?,
    };

    match app.session.sign_up(email, &password, full_name).await {
        Ok((_, user)) => {
            println!("🎉 Account created successfully!");
            println!("👋 Welcome, {}", user.display_name());
        }
        Err(e) => println!("❌ {}", e.user_message(AUTH_FAILED_NOTICE)),
    }
    Ok(())
}

pub async fn login(app: &mut App, email: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(password) => password,
        None => prompt("🔑 Password: ")?,
    };

    match app.session.sign_in(email, &password).await {
        Ok((_, user)) => println!("👋 Welcome back, {}!", user.display_name()),
        Err(e) => println!("❌ {}", e.user_message(AUTH_FAILED_NOTICE)),
    }
    Ok(())
}

pub fn logout(app: &mut App) {
    app.session.sign_out();
    println!("👋 Signed out.");
}

pub fn whoami(app: &App) {
    match app.session.gate() {
        Gate::Allowed(user) => {
            println!("👤 {}", user.display_name());
            println!("   📧 {}", user.email);
            println!("   🌐 {}", app.config.api_base_url);
        }
        Gate::Pending => println!("⏳ Verifying your session..."),
        Gate::Denied => println!("🔒 Not signed in."),
    }
}

pub async fn list_documents(app: &App) -> Result<()> {
    if !app.require_signed_in() {
        return Ok(());
    }

    let library = DocumentLibrary::new(app.api.clone());
    match library.list().await {
        ListView::Loaded(documents) => {
            println!("📁 Your Documents:");
            println!("{}", "=".repeat(50));
            for document in &documents {
                print_document(document);
            }
        }
        ListView::Empty => {
            println!("📭 No documents yet. Run 'docchat upload <file>' to add your first one!");
        }
        ListView::Failed(notice) => println!("❌ {}", notice),
        ListView::Loading => {}
    }
    Ok(())
}

pub async fn upload(app: &App, path: &Path) -> Result<()> {
    if !app.require_signed_in() {
        return Ok(());
    }

    println!("⏳ Processing {}...", path.display());
    let library = DocumentLibrary::new(app.api.clone());
    match library.upload(path).await {
        Ok(document) => {
            println!("✅ Document uploaded successfully!");
            print_document(&document);
        }
        Err(e) => println!("❌ {}", e.user_message(UPLOAD_FAILED_NOTICE)),
    }
    Ok(())
}

pub async fn delete(app: &App, id: &str, yes: bool) -> Result<()> {
    if !app.require_signed_in() {
        return Ok(());
    }
    if !yes {
        let answer = prompt("⚠️  Are you sure you want to delete this document? [y/N] ")?;
        if !is_confirmed(&answer) {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let library = DocumentLibrary::new(app.api.clone());
    match library.delete(id).await {
        Ok(()) => println!("🗑️  Document deleted"),
        Err(_) => println!("❌ {}", DELETE_FAILED_NOTICE),
    }
    Ok(())
}

pub async fn history(app: &App) -> Result<()> {
    if !app.require_signed_in() {
        return Ok(());
    }

    match load_history(app.api.as_ref()).await {
        ListView::Loaded(items) => {
            println!("🕒 Chat History:");
            println!("{}", "=".repeat(50));
            for item in &items {
                print_history_item(item, app.config.ui.show_sources);
            }
        }
        ListView::Empty => println!("📭 No questions asked yet. Run 'docchat chat' to start!"),
        ListView::Failed(notice) => println!("❌ {}", notice),
        ListView::Loading => {}
    }
    Ok(())
}

/// One-shot question.
pub async fn ask(app: &App, question: &str) -> Result<()> {
    if !app.require_signed_in() {
        return Ok(());
    }

    let mut controller = ConversationController::open(app.api.clone()).await;
    let outcome = controller.submit(question).await;
    report_outcome(&controller, &outcome, app.config.ui.show_sources);
    Ok(())
}

/// Interactive chat loop on stdin.
pub async fn chat(app: &App) -> Result<()> {
    if !app.require_signed_in() {
        return Ok(());
    }

    let mut controller = ConversationController::open(app.api.clone()).await;
    println!("💬 Ask me anything");
    println!("I'll search through your {} document(s) to find the best answer.", controller.document_count());
    if controller.document_count() == 0 {
        println!("📭 Upload documents first to start chatting.");
    }
    println!("Type /help for commands, /bye to leave.");
    println!();

    let stdin = io::stdin();
    loop {
        print!("💭 > ");
        io::stdout().flush()?;

        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .context("Failed to read user input")?;
        if read == 0 {
            println!();
            break;
        }
        let line = line.trim_end_matches(&['\r', '\n'][..]);

        if let Some(command) = parse_slash_command(line) {
            match command.command {
                SlashCommand::Bye => break,
                SlashCommand::Help => println!("{}", get_help_text()),
                SlashCommand::Docs => {
                    controller.refresh_documents().await;
                    list_documents(app).await?;
                }
                SlashCommand::History => history(app).await?,
                SlashCommand::Clear => {
                    controller.clear();
                    println!("🧹 Started a fresh conversation.");
                }
            }
            continue;
        }

        controller.set_input(line);
        let outcome = controller.submit(line).await;
        report_outcome(&controller, &outcome, app.config.ui.show_sources);
    }

    println!("👋 Bye!");
    Ok(())
}

fn report_outcome<A: DocChatApi>(
    controller: &ConversationController<A>,
    outcome: &SubmitOutcome,
    show_sources: bool,
) {
    match outcome {
        SubmitOutcome::Answered => {
            if let Some(message) = controller.messages().last() {
                println!("{}", format_message(message, show_sources));
            }
        }
        SubmitOutcome::Blocked { notice } | SubmitOutcome::RolledBack { notice } => {
            println!("❌ {}", notice);
        }
        SubmitOutcome::Ignored => {}
    }
}

/// Render a chat message for the terminal.
pub fn format_message(message: &Message, show_sources: bool) -> String {
    let icon = match message.role {
        Role::User => "🧑",
        Role::Assistant => "🤖",
    };
    let mut out = format!("{} {}", icon, message.content);
    if show_sources && !message.citations().is_empty() {
        out.push_str(&format_sources(message.citations()));
    }
    out
}

fn format_sources(sources: &[Citation]) -> String {
    let mut out = String::from("\n   Sources:");
    for source in sources {
        out.push_str(&format!("\n   📄 {}\n      {}", source.document, source.excerpt));
    }
    out
}

fn print_document(document: &DocumentInfo) {
    println!("📄 {}", document.filename);
    println!("   🆔 {}", document.id);
    println!(
        "   📦 {} · {} chunks",
        format_size(document.file_size),
        document.chunk_count
    );
    println!("   🕒 Uploaded: {}", format_timestamp(&document.uploaded_at));
    println!();
}

fn print_history_item(item: &HistoryItem, show_sources: bool) {
    println!("🕒 {}", format_timestamp(&item.created_at));
    println!("🧑 {}", item.question);
    println!("🤖 {}", item.answer);
    if show_sources && !item.sources.is_empty() {
        println!("{}", format_sources(&item.sources).trim_start_matches('\n'));
    }
    println!();
}

/// Service timestamps are ISO-8601; show them in local time when they parse.
fn format_timestamp(raw: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(raw) {
        Ok(timestamp) => timestamp
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Only an explicit yes confirms; anything else, including no answer, declines.
fn is_confirmed(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Read one line from stdin. Input is echoed, so secrets should come from a
/// flag such as `--password` or from piped stdin.
fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read user input")?;
    Ok(input.trim_end_matches(&['\r', '\n'][..]).to_string())
}
