use anyhow::{Context, Result, bail};
use procflow_application::{ConversationService, GenerationOutcome, GenerationReport};
use procflow_core::conversation::{Turn, TurnSide, VersionKind};
use procflow_core::error::Result as ProcflowResult;
use procflow_core::generation::AudioInput;
use std::future::Future;
use std::path::Path;

pub async fn ask(service: &ConversationService, session: Option<&str>, text: &str) -> Result<()> {
    match session {
        Some(id) => {
            service.load_session(id).await?;
        }
        None => service.start_new_session().await,
    }
    let report = interruptible(service, service.submit_user_message(text)).await?;
    print_report(service, &report).await
}

pub async fn transcribe(
    service: &ConversationService,
    session: Option<&str>,
    audio: &Path,
) -> Result<()> {
    let input = read_audio(audio).await?;
    match session {
        Some(id) => {
            service.load_session(id).await?;
        }
        None => service.start_new_session().await,
    }
    let report = match interruptible(service, service.upload_audio(input)).await {
        Ok(report) => report,
        Err(e) if e.is_cancelled() => {
            println!("Transcription cancelled.");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    if let Some(turn) = find_turn(service, &report).await {
        println!("> {}", turn.user.active_content().unwrap_or_default());
    }
    print_report(service, &report).await
}

pub async fn edit(
    service: &ConversationService,
    session: Option<&str>,
    turn: &str,
    text: &str,
) -> Result<()> {
    open_required(service, session).await?;
    let report = interruptible(service, service.edit_turn(turn, text)).await?;
    print_report(service, &report).await
}

pub async fn regenerate(
    service: &ConversationService,
    session: Option<&str>,
    turn: &str,
) -> Result<()> {
    open_required(service, session).await?;
    let report = interruptible(service, service.regenerate_turn(turn)).await?;
    print_report(service, &report).await
}

pub async fn select_version(
    service: &ConversationService,
    session: Option<&str>,
    turn_id: &str,
    side: TurnSide,
    index: usize,
) -> Result<()> {
    let session_id = open_required(service, session).await?;
    service.set_turn_version(turn_id, side, index).await?;

    let session = service
        .session(&session_id)
        .await
        .with_context(|| format!("Session {} disappeared", session_id))?;
    if let Some(turn) = session.turn(turn_id) {
        let stack = turn.stack(side);
        println!("Version {}/{} selected", index + 1, stack.len());
        println!("{}", stack.active_content().unwrap_or_default());
    }
    Ok(())
}

async fn open_required(service: &ConversationService, session: Option<&str>) -> Result<String> {
    let Some(id) = session else {
        bail!("This command needs --session <id>; see `procflow sessions list`");
    };
    service.load_session(id).await?;
    Ok(id.to_string())
}

async fn read_audio(path: &Path) -> Result<AudioInput> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mime_type = mime_guess::from_path(path)
        .first()
        .filter(|mime| mime.type_() == mime_guess::mime::AUDIO)
        .map(|mime| mime.essence_str().to_string());
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(AudioInput::new(file_name, mime_type, bytes))
}

/// Runs `action`, cancelling the in-flight attempt on Ctrl-C.
async fn interruptible<F>(service: &ConversationService, action: F) -> ProcflowResult<GenerationReport>
where
    F: Future<Output = ProcflowResult<GenerationReport>>,
{
    let watcher = {
        let service = service.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupted, cancelling the current attempt");
                service.cancel_generation().await;
            }
        })
    };
    let result = action.await;
    watcher.abort();
    result
}

async fn find_turn(service: &ConversationService, report: &GenerationReport) -> Option<Turn> {
    service
        .session(&report.session_id)
        .await
        .and_then(|session| session.turn(&report.turn_id).cloned())
}

async fn print_report(service: &ConversationService, report: &GenerationReport) -> Result<()> {
    match &report.outcome {
        GenerationOutcome::Cancelled => {
            println!("Generation cancelled.");
            Ok(())
        }
        GenerationOutcome::Failed { message } => bail!("Generation failed: {}", message),
        GenerationOutcome::Done => {
            let turn = find_turn(service, report)
                .await
                .context("Generated turn is no longer in the session")?;
            if let Some(version) = turn.assistant.active() {
                if version.kind == VersionKind::Map {
                    println!("Process model:");
                }
                println!("{}", version.content);
            }
            println!();
            println!(
                "session {}  turn {}  ({} ms)",
                report.session_id,
                report.turn_id,
                turn.duration_ms.unwrap_or_default()
            );
            Ok(())
        }
    }
}
