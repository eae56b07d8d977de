//! Image adapter: OCR over an image file or camera frame, reduced to one candidate token.

use super::split_command;
use crate::constants::{MIN_OCR_TOKEN_EXCLUSIVE, OCR_LANGUAGE, UNKNOWN_CANDIDATE};
use crate::error::CaptureError;
use async_trait::async_trait;
use medinfo_types::QueryText;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Where the pixels come from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// A user-selected image file.
    File(PathBuf),
    /// Encoded bytes of a frame captured from the camera.
    Frame(Vec<u8>),
}

/// Progress callback receiving whole percentages in `0..=100`.
pub type ProgressFn<'a> = &'a (dyn Fn(u8) + Send + Sync);

#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognise all text in `image`, reporting progress along the way.
    async fn recognize(&self, image: &ImageSource, progress: ProgressFn<'_>) -> Result<String, CaptureError>;
}

/// Pick the query candidate from recognised text.
///
/// Tokens are split on whitespace and stripped of everything but ASCII letters; tokens of
/// three letters or fewer are dropped. The longest survivor wins, the earliest on a tie.
/// With no survivor the candidate is `"Unknown"`.
pub fn best_candidate(text: &str) -> String {
    let mut best: Option<String> = None;
    for token in text.split_whitespace() {
        let letters: String = token.chars().filter(char::is_ascii_alphabetic).collect();
        if letters.len() <= MIN_OCR_TOKEN_EXCLUSIVE {
            continue;
        }
        if best.as_ref().map_or(true, |b| letters.len() > b.len()) {
            best = Some(letters);
        }
    }
    best.unwrap_or_else(|| UNKNOWN_CANDIDATE.to_owned())
}

/// Run OCR on `image` and return the candidate query.
pub async fn scan_image(
    recognizer: &dyn TextRecognizer,
    image: &ImageSource,
    progress: ProgressFn<'_>,
) -> Result<QueryText, CaptureError> {
    let text = recognizer
        .recognize(image, progress)
        .await
        .inspect_err(|e| tracing::warn!("OCR failed: {}", e))?;

    let candidate = best_candidate(&text);
    tracing::debug!("OCR candidate {:?} from {} chars", candidate, text.len());
    QueryText::new(&candidate).map_err(|e| CaptureError::Ocr(e.to_string()))
}

/// OCR through the `tesseract` command-line engine.
///
/// Files are passed by path; frames are piped on stdin. The engine gives no incremental
/// progress, so only 0 and 100 are reported.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    program: String,
    args: Vec<String>,
}

impl TesseractRecognizer {
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let (program, args) = split_command(command_line)?;
        Some(Self { program, args })
    }

    fn spawn_error(&self, source: std::io::Error) -> CaptureError {
        CaptureError::Spawn {
            command: self.program.clone(),
            source,
        }
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(&self, image: &ImageSource, progress: ProgressFn<'_>) -> Result<String, CaptureError> {
        progress(0);

        let input = match image {
            ImageSource::File(path) => path.as_os_str().to_owned(),
            ImageSource::Frame(_) => "stdin".into(),
        };

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(input)
            .arg("stdout")
            .args(["-l", OCR_LANGUAGE])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // Closing stdin (by dropping it) lets the engine see end of input.
        if let Some(mut stdin) = child.stdin.take() {
            if let ImageSource::Frame(bytes) = image {
                stdin
                    .write_all(bytes)
                    .await
                    .map_err(|e| CaptureError::Ocr(format!("failed to send frame: {e}")))?;
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(CaptureError::Ocr(if stderr.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                stderr
            }));
        }

        progress(100);
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedText(&'static str);

    #[async_trait]
    impl TextRecognizer for FixedText {
        async fn recognize(&self, _image: &ImageSource, progress: ProgressFn<'_>) -> Result<String, CaptureError> {
            progress(50);
            progress(100);
            Ok(self.0.to_owned())
        }
    }

    struct Failing;

    #[async_trait]
    impl TextRecognizer for Failing {
        async fn recognize(&self, _image: &ImageSource, _progress: ProgressFn<'_>) -> Result<String, CaptureError> {
            Err(CaptureError::Ocr("engine crashed".into()))
        }
    }

    #[test]
    fn test_best_candidate_first_longest_wins() {
        assert_eq!(best_candidate("Take 2 tablets daily Aspirin 81mg"), "tablets");
    }

    #[test]
    fn test_best_candidate_strips_non_letters() {
        assert_eq!(best_candidate("Amoxi-cillin 500mg caps."), "Amoxicillin");
        assert_eq!(best_candidate("OMEPRAZOLE\n20mg\tGastro-resistant"), "Gastroresistant");
    }

    #[test]
    fn test_best_candidate_discards_short_tokens() {
        assert_eq!(best_candidate("one two 123 a-b"), "Unknown");
        assert_eq!(best_candidate(""), "Unknown");
        assert_eq!(best_candidate("tab Dose"), "Dose");
    }

    #[tokio::test]
    async fn test_scan_image_reports_progress_and_candidate() {
        let seen = Mutex::new(Vec::new());
        let progress = |p: u8| seen.lock().unwrap().push(p);

        let candidate = scan_image(
            &FixedText("Lisinopril 10 mg"),
            &ImageSource::Frame(vec![0xFF, 0xD8]),
            &progress,
        )
        .await
        .unwrap();

        assert_eq!(candidate.as_str(), "Lisinopril");
        assert_eq!(*seen.lock().unwrap(), vec![50, 100]);
    }

    #[tokio::test]
    async fn test_scan_image_failure_is_recoverable() {
        let result = scan_image(&Failing, &ImageSource::File("x.png".into()), &|_: u8| {}).await;
        match result {
            Err(e) => assert!(!e.is_unsupported()),
            Ok(q) => panic!("expected error, got {q}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_missing_engine_is_spawn_error() {
        let recognizer =
            TesseractRecognizer::from_command_line("medinfo-no-such-ocr-engine").unwrap();
        let result = recognizer
            .recognize(&ImageSource::File("label.png".into()), &|_: u8| {})
            .await;
        assert!(matches!(result, Err(CaptureError::Spawn { .. })));
    }
}
