//! Line-driven editor session.
//!
//! Each input line is either a complete JSON document (the editor's new
//! state) or a `:directive`. The session feeds edits to an [`AutoSave`]
//! handle and writes one line of feedback per directive.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;

use offerte_autosave::{AutoSave, AutoSaveConfig, AutoSaveError, Persister, SaveStatus};
use offerte_interaction::{Connectivity, SaveIndicator};

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// The complete new document.
    Edit(Value),
    /// `:save`
    Save,
    /// `:pause`
    Pause,
    /// `:resume`
    Resume,
    /// `:status`
    Status,
    /// `:quit`
    Quit,
}

/// Parse a line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Input>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if let Some(directive) = line.strip_prefix(':') {
        let input = match directive {
            "save" | "w" => Input::Save,
            "pause" => Input::Pause,
            "resume" => Input::Resume,
            "status" => Input::Status,
            "quit" | "q" => Input::Quit,
            other => bail!("Unknown directive ':{other}'"),
        };
        return Ok(Some(input));
    }
    let value = serde_json::from_str(line).context("Input is neither JSON nor a directive")?;
    Ok(Some(Input::Edit(value)))
}

/// What happened during a session.
#[derive(Debug, Clone, Default)]
pub struct SessionReport {
    pub edits: usize,
    pub manual_saves: usize,
    pub rejected_lines: usize,
    /// Outcome of the save that runs when input ends.
    pub final_save: Option<String>,
    /// Status right before the session was disposed.
    pub status: SaveStatus,
}

impl SessionReport {
    /// Whether everything typed ended up persisted.
    pub fn is_clean(&self) -> bool {
        self.final_save.is_none() && !self.status.is_dirty
    }
}

/// Run a session until `input` ends or `:quit`, then save once more and
/// dispose.
pub async fn run_session<R, W, P>(
    input: R,
    out: &mut W,
    initial: Value,
    persister: P,
    config: AutoSaveConfig,
) -> Result<SessionReport>
where
    R: AsyncBufRead + Unpin,
    W: Write,
    P: Persister<Value>,
{
    let autosave = AutoSave::spawn(initial, persister, config)?;
    let watcher = tokio::spawn(log_transitions(autosave.subscribe()));
    let mut report = SessionReport::default();
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let input = match parse_line(&line) {
            Ok(Some(input)) => input,
            Ok(None) => continue,
            Err(error) => {
                tracing::warn!("Ignoring input line: {error:#}");
                report.rejected_lines += 1;
                continue;
            }
        };

        match input {
            Input::Edit(value) => {
                autosave.update(value)?;
                report.edits += 1;
            }
            Input::Save => {
                report.manual_saves += 1;
                if let Err(error) = autosave.save_now().await {
                    tracing::warn!("Manual save failed: {error}");
                }
                let status = autosave.sync_status().await?;
                writeln!(out, "{}", status_line(&status, Utc::now()))?;
            }
            Input::Pause => autosave.set_enabled(false)?,
            Input::Resume => autosave.set_enabled(true)?,
            Input::Status => {
                let status = autosave.sync_status().await?;
                writeln!(out, "{}", status_line(&status, Utc::now()))?;
            }
            Input::Quit => break,
        }
    }

    report.final_save = autosave
        .save_now()
        .await
        .err()
        .as_ref()
        .map(AutoSaveError::user_message);
    report.status = autosave.status();
    autosave.dispose().await;
    if let Err(error) = watcher.await {
        tracing::debug!(%error, "Status watcher ended abnormally");
    }
    Ok(report)
}

/// One-line status, e.g. `Opgeslagen (zojuist)` or `Opslaan mislukt: ...`.
pub fn status_line(status: &SaveStatus, now: DateTime<Utc>) -> String {
    let indicator = SaveIndicator::from_status(status, Connectivity::Online);
    match &indicator {
        SaveIndicator::Failed { message } => format!("{}: {}", indicator.label(), message),
        _ => match indicator.relative_saved_label(now) {
            Some(relative) => format!("{} ({})", indicator.label(), relative),
            None => indicator.label().to_string(),
        },
    }
}

async fn log_transitions(mut status: watch::Receiver<SaveStatus>) {
    let mut last = status.borrow_and_update().state().name();
    while status.changed().await.is_ok() {
        let current = status.borrow_and_update().state().name();
        if current != last {
            tracing::info!(from = last, to = current, "Save state changed");
            last = current;
        }
    }
}
