//! services/viewer/src/bin/viewer.rs
//!
//! Command-line front end of the learning content viewer.
//!
//! ```text
//! viewer generate <query...>
//! viewer upload <title> <subject> <chapter> <file>
//! viewer history
//! viewer open <id>
//! viewer delete <id>
//! viewer clear
//! viewer play
//! ```

use learning_viewer_core::domain::{CurrentSession, DEFAULT_TARGET_DURATION_SECS};
use learning_viewer_core::ports::NarrationSource;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use viewer_lib::{
    config::Config,
    error::ViewerError,
    playback::{
        HeadlessMedia, MediaEvent, PlaybackNotice, PlaybackState, PlaybackSynchronizer,
        TranscriptCatalog,
    },
    workflow::{AppState, GenerationStage},
};

/// Seconds of playback simulated per tick by `viewer play`.
const PLAY_TICK_SECS: f64 = 5.0;

#[tokio::main]
async fn main() -> Result<(), ViewerError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Using generation service at {}", config.api_base_url);

    // --- 2. Initialize Service Adapters ---
    let app_state = Arc::new(AppState::from_config(config)?);

    // --- 3. Dispatch the Command ---
    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("generate") => generate(&app_state, &args[1..].join(" ")).await,
        Some("upload") => upload(&app_state, &args[1..]).await,
        Some("history") => history(&app_state).await,
        Some("open") => open(&app_state, args.get(1)).await,
        Some("delete") => delete(&app_state, args.get(1)).await,
        Some("clear") => {
            app_state.history().clear().await?;
            println!("All content history cleared");
            Ok(())
        }
        Some("play") => play(&app_state).await,
        _ => Err(ViewerError::Internal(
            "usage: viewer <generate|upload|history|open|delete|clear|play> [args]".to_string(),
        )),
    };

    if let Err(e) = &result {
        error!("{}", e);
    }
    result
}

async fn generate(app_state: &AppState, query: &str) -> Result<(), ViewerError> {
    let session = app_state.learning_session();
    let cancel = CancellationToken::new();

    // Ctrl-C abandons the poll loop instead of leaving it running.
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let mut progress = session.subscribe();
    let reporter = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let p = *progress.borrow_and_update();
            if p.stage != GenerationStage::Idle {
                println!("[{:>3}%] {}", p.percent, p.stage);
            }
        }
    });

    let content = session.generate_query(query, &cancel).await;
    drop(session);
    reporter.await.ok();
    let content = content?;

    println!("Content generated for: {}", content.topic);
    println!("Session: {}", content.session_id);
    println!("Audio:   {}", content.audio_url);
    println!("Video:   {}", content.video_url);
    println!();
    println!("{}", content.mindmap_code);
    Ok(())
}

async fn upload(app_state: &AppState, args: &[String]) -> Result<(), ViewerError> {
    let [title, subject, chapter, path] = args else {
        return Err(ViewerError::Internal(
            "usage: viewer upload <title> <subject> <chapter> <file>".to_string(),
        ));
    };
    let text = tokio::fs::read_to_string(path).await?;
    let session = app_state.learning_session();
    let current = session
        .upload(title, Some(subject.as_str()), Some(chapter.as_str()), &text)
        .await?;
    println!("Content processed! Mindmap for {}:", current.item.query);
    println!();
    println!("{}", current.mindmap().unwrap_or_default());
    Ok(())
}

async fn history(app_state: &AppState) -> Result<(), ViewerError> {
    let groups = app_state.history().grouped_by_subject().await?;
    if groups.is_empty() {
        println!("No content history yet");
        return Ok(());
    }
    for (subject, items) in groups {
        println!("{}", subject);
        for item in items {
            let chapter = item.chapter.as_deref().unwrap_or("-");
            println!(
                "  {}  {}  {}  ({})",
                item.id,
                item.query,
                chapter,
                item.created_at.format("%Y-%m-%d %H:%M")
            );
        }
    }
    Ok(())
}

async fn open(app_state: &AppState, id: Option<&String>) -> Result<(), ViewerError> {
    let id = id.ok_or_else(|| ViewerError::Internal("usage: viewer open <id>".to_string()))?;
    let current = app_state.history().open(id).await?;
    println!("Content loaded successfully: {}", current.item.query);
    Ok(())
}

async fn delete(app_state: &AppState, id: Option<&String>) -> Result<(), ViewerError> {
    let id = id.ok_or_else(|| ViewerError::Internal("usage: viewer delete <id>".to_string()))?;
    if app_state.history().delete(id).await? {
        println!("Content removed from history");
    } else {
        println!("No history entry {}", id);
    }
    Ok(())
}

/// Plays the current content's narration on a headless clock, printing the
/// transcript as it is reached.
async fn play(app_state: &AppState) -> Result<(), ViewerError> {
    let Some(current) = app_state.history().load_current().await? else {
        println!("No content yet. Generate or upload something first.");
        return Ok(());
    };
    let (topic, duration) = describe(&current);

    let narrative = current.generated.as_ref().map(|g| &g.narrative);
    let track = app_state
        .narration
        .prepare(NarrationSource {
            audio_url: current.generated.as_ref().map(|g| g.audio_url.as_str()),
            narrative,
        })
        .await?;
    let lines = TranscriptCatalog::builtin().for_content(&topic, narrative);

    let mut sync = PlaybackSynchronizer::new(
        HeadlessMedia::new(duration),
        Vec::new(),
        app_state.config.reset_policy,
    );
    sync.load(&track, lines)?;
    sync.handle_event(MediaEvent::LoadedMetadata { duration });

    println!("{:?}", sync.toggle_play());
    let mut last_line = None;
    while sync.state() == PlaybackState::Playing {
        let events = sync.media_mut().advance(PLAY_TICK_SECS);
        for event in events {
            if let Some(notice) = sync.handle_event(event) {
                if let PlaybackNotice::Error(message) = &notice {
                    error!("{}", message);
                }
                println!("{:?}", notice);
            }
        }
        if let Some(line) = sync.active_line() {
            if last_line.as_ref() != Some(line) {
                println!("{}  {}", sync.time_label(), line);
                last_line = Some(line.clone());
            }
        }
    }
    println!("Progress: {:.0}%", sync.progress());
    Ok(())
}

/// Topic and playback length to use for the current content.
fn describe(current: &CurrentSession) -> (String, f64) {
    match &current.generated {
        Some(g) => {
            let duration = if g.narrative.total_duration > 0.0 {
                g.narrative.total_duration
            } else {
                f64::from(DEFAULT_TARGET_DURATION_SECS)
            };
            (g.topic.clone(), duration)
        }
        None => (
            current.item.query.clone(),
            f64::from(DEFAULT_TARGET_DURATION_SECS),
        ),
    }
}
