//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. Services never read environment variables while handling a
//! query; binaries read them once and hand the parsed values to [`CoreConfig::new`].

use crate::constants::{DEFAULT_OCR_COMMAND, DEFAULT_SUMMARY_ENDPOINT, STORAGE_FILENAME};
use crate::{CoreResult, MedinfoError};
use reqwest::Url;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    summary_endpoint: Url,
    fallback_timeout: Option<Duration>,
    ocr_command: String,
    speech_command: Option<String>,
    camera_command: Option<String>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `MedinfoError::InvalidEndpoint` if the summary endpoint is not an http(s) URL
    /// that can carry a path segment, and `MedinfoError::InvalidInput` for a zero timeout or a
    /// blank OCR command.
    pub fn new(
        data_dir: PathBuf,
        summary_endpoint: Url,
        fallback_timeout: Option<Duration>,
        ocr_command: String,
        speech_command: Option<String>,
        camera_command: Option<String>,
    ) -> CoreResult<Self> {
        if !matches!(summary_endpoint.scheme(), "http" | "https") || summary_endpoint.cannot_be_a_base()
        {
            return Err(MedinfoError::InvalidEndpoint(summary_endpoint.to_string()));
        }
        if fallback_timeout.is_some_and(|t| t.is_zero()) {
            return Err(MedinfoError::InvalidInput(
                "fallback timeout must be greater than zero".into(),
            ));
        }
        if ocr_command.trim().is_empty() {
            return Err(MedinfoError::InvalidInput(
                "OCR command cannot be empty".into(),
            ));
        }

        Ok(Self {
            data_dir,
            summary_endpoint,
            fallback_timeout,
            ocr_command,
            speech_command: non_blank(speech_command),
            camera_command: non_blank(camera_command),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn storage_path(&self) -> PathBuf {
        self.data_dir.join(STORAGE_FILENAME)
    }

    pub fn summary_endpoint(&self) -> &Url {
        &self.summary_endpoint
    }

    pub fn fallback_timeout(&self) -> Option<Duration> {
        self.fallback_timeout
    }

    pub fn ocr_command(&self) -> &str {
        &self.ocr_command
    }

    pub fn speech_command(&self) -> Option<&str> {
        self.speech_command.as_deref()
    }

    pub fn camera_command(&self) -> Option<&str> {
        self.camera_command.as_deref()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the summary endpoint from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default encyclopedia endpoint.
/// A trailing `/` is appended when missing so query segments are joined under the endpoint.
pub fn summary_endpoint_from_env_value(value: Option<String>) -> CoreResult<Url> {
    let raw = non_blank(value).unwrap_or_else(|| DEFAULT_SUMMARY_ENDPOINT.into());
    let raw = if raw.ends_with('/') {
        raw
    } else {
        format!("{raw}/")
    };
    Url::parse(&raw).map_err(|e| MedinfoError::InvalidEndpoint(format!("{raw}: {e}")))
}

/// Parse the optional fallback timeout (whole seconds).
///
/// `None` or empty/whitespace means no timeout, matching the default behaviour.
pub fn fallback_timeout_from_env_value(value: Option<String>) -> CoreResult<Option<Duration>> {
    non_blank(value)
        .map(|v| {
            v.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                MedinfoError::InvalidInput(format!(
                    "fallback timeout must be a whole number of seconds, got {v:?}"
                ))
            })
        })
        .transpose()
}

/// Parse the OCR command, falling back to the default engine.
pub fn ocr_command_from_env_value(value: Option<String>) -> String {
    non_blank(value).unwrap_or_else(|| DEFAULT_OCR_COMMAND.into())
}
