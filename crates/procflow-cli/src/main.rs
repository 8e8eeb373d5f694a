use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use procflow_core::conversation::TurnSide;
use std::path::PathBuf;

mod app;
mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "procflow")]
#[command(about = "procflow CLI - turn spoken or typed descriptions into process models", long_about = None)]
struct Cli {
    /// Session to act on (a new one is opened when omitted)
    #[arg(long, global = true)]
    session: Option<String>,

    /// Path to an alternate config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe a process or ask a question
    Ask {
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Transcribe an audio file and submit the transcript
    Transcribe { audio: PathBuf },
    /// Edit the user message of a turn and generate again
    Edit {
        turn: String,
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Generate another answer for a turn
    Regenerate { turn: String },
    /// Choose which version of a turn is active
    SelectVersion {
        turn: String,
        side: Side,
        index: usize,
    },
    /// Manage conversation history
    Sessions {
        #[command(subcommand)]
        action: SessionsAction,
    },
    /// Manage projects
    Projects {
        #[command(subcommand)]
        action: ProjectsAction,
    },
}

#[derive(Subcommand)]
enum SessionsAction {
    /// List sessions, most recent first
    List,
    /// Print every turn of a session
    Show { id: String },
    /// Rename a session
    Rename { id: String, title: String },
    /// Delete a session
    Delete { id: String },
    /// Delete every session (projects are kept)
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Export a session as JSON
    Export {
        id: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Move a session into a project (omit --project to detach it)
    Move {
        id: String,
        #[arg(long)]
        project: Option<String>,
    },
    /// Put the given sessions first, in this order
    Reorder {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ProjectsAction {
    /// List projects
    List,
    /// Create a project
    Create {
        name: String,
        #[arg(long, default_value = "#6366f1")]
        color: String,
    },
    /// Rename a project
    Rename { id: String, name: String },
    /// Delete a project; its sessions are kept and detached
    Delete { id: String },
}

#[derive(Clone, Copy, ValueEnum)]
enum Side {
    User,
    Assistant,
}

impl From<Side> for TurnSide {
    fn from(side: Side) -> Self {
        match side {
            Side::User => TurnSide::User,
            Side::Assistant => TurnSide::Assistant,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_service = app::config_service(cli.config.clone())?;
    let config = config_service.get_config();
    let _log_guard = logging::init(&config.logging)?;

    let service = app::build_service(&config)?;
    service.load_history().await;

    let session = cli.session.as_deref();
    match cli.command {
        Commands::Ask { text } => {
            commands::conversation::ask(&service, session, &text.join(" ")).await?
        }
        Commands::Transcribe { audio } => {
            commands::conversation::transcribe(&service, session, &audio).await?
        }
        Commands::Edit { turn, text } => {
            commands::conversation::edit(&service, session, &turn, &text.join(" ")).await?
        }
        Commands::Regenerate { turn } => {
            commands::conversation::regenerate(&service, session, &turn).await?
        }
        Commands::SelectVersion { turn, side, index } => {
            commands::conversation::select_version(&service, session, &turn, side.into(), index)
                .await?
        }
        Commands::Sessions { action } => match action {
            SessionsAction::List => commands::sessions::list(&service).await,
            SessionsAction::Show { id } => commands::sessions::show(&service, &id).await?,
            SessionsAction::Rename { id, title } => {
                commands::sessions::rename(&service, &id, &title).await?
            }
            SessionsAction::Delete { id } => commands::sessions::delete(&service, &id).await?,
            SessionsAction::Clear { yes } => commands::sessions::clear(&service, yes).await?,
            SessionsAction::Export { id, output } => {
                commands::sessions::export(&service, &id, output.as_deref()).await?
            }
            SessionsAction::Move { id, project } => {
                commands::sessions::move_to_project(&service, &id, project.as_deref()).await?
            }
            SessionsAction::Reorder { ids } => commands::sessions::reorder(&service, &ids).await,
        },
        Commands::Projects { action } => match action {
            ProjectsAction::List => commands::projects::list(&service).await,
            ProjectsAction::Create { name, color } => {
                commands::projects::create(&service, &name, &color).await
            }
            ProjectsAction::Rename { id, name } => {
                commands::projects::rename(&service, &id, &name).await?
            }
            ProjectsAction::Delete { id } => commands::projects::delete(&service, &id).await?,
        },
    }

    if let Some(error) = service.synchronizer().last_error() {
        tracing::warn!("Some changes were not saved: {}", error);
    }

    Ok(())
}
