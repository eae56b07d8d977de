//! Speech adapter.
//!
//! A single-utterance, non-continuous recognition session. The host capability is a
//! [`SpeechRecognizer`]; when the host has none, [`listen`] reports
//! [`CaptureError::Unsupported`] so the caller can show a notice instead of failing silently.

use super::split_command;
use crate::constants::SPEECH_LANGUAGE;
use crate::error::CaptureError;
use async_trait::async_trait;
use medinfo_types::QueryText;
use std::process::Stdio;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    /// Final transcript of the utterance.
    Transcript(QueryText),
    /// The session ended without recognising anything.
    NoResult,
    /// The listener was dismissed before a final result.
    Cancelled,
}

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Recognise one utterance in `language`, resolving early with
    /// [`SpeechOutcome::Cancelled`] once `cancel` fires.
    async fn recognize_once(
        &self,
        language: &str,
        cancel: CancellationToken,
    ) -> Result<SpeechOutcome, CaptureError>;
}

/// Run one speech session on whichever recognizer the host exposes.
pub async fn listen(
    recognizer: Option<&dyn SpeechRecognizer>,
    cancel: CancellationToken,
) -> Result<SpeechOutcome, CaptureError> {
    let Some(recognizer) = recognizer else {
        return Err(CaptureError::Unsupported("voice search"));
    };
    if cancel.is_cancelled() {
        return Ok(SpeechOutcome::Cancelled);
    }

    let outcome = recognizer.recognize_once(SPEECH_LANGUAGE, cancel).await;
    match &outcome {
        Ok(SpeechOutcome::Transcript(t)) => tracing::debug!("speech transcript: {}", t),
        Ok(other) => tracing::debug!("speech session ended: {:?}", other),
        Err(e) => tracing::warn!("speech recognition error: {}", e),
    }
    outcome
}

/// Recognizer backed by an external command that prints the final transcript on stdout.
///
/// The requested language is passed in the `MEDINFO_SPEECH_LANG` environment variable.
/// The child is killed when the session is cancelled.
#[derive(Debug, Clone)]
pub struct CommandSpeechRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandSpeechRecognizer {
    /// `None` for a blank command line.
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let (program, args) = split_command(command_line)?;
        Some(Self { program, args })
    }
}

#[async_trait]
impl SpeechRecognizer for CommandSpeechRecognizer {
    async fn recognize_once(
        &self,
        language: &str,
        cancel: CancellationToken,
    ) -> Result<SpeechOutcome, CaptureError> {
        let child = Command::new(&self.program)
            .args(&self.args)
            .env("MEDINFO_SPEECH_LANG", language)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CaptureError::Spawn {
                command: self.program.clone(),
                source,
            })?;

        let output = tokio::select! {
            _ = cancel.cancelled() => return Ok(SpeechOutcome::Cancelled),
            output = child.wait_with_output() => output.map_err(|source| CaptureError::Spawn {
                command: self.program.clone(),
                source,
            })?,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let reason = if stderr.is_empty() {
                format!("recognizer exited with {}", output.status)
            } else {
                stderr
            };
            return Err(CaptureError::Speech(reason));
        }

        let transcript = String::from_utf8_lossy(&output.stdout);
        Ok(match QueryText::new(transcript.as_ref()) {
            Ok(text) => SpeechOutcome::Transcript(text),
            Err(_) => SpeechOutcome::NoResult,
        })
    }
}
