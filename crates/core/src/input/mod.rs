//! Input normalizer.
//!
//! Each adapter reduces its modality to at most one [`QueryText`](medinfo_types::QueryText)
//! for the matcher: typed text, a speech transcript, or the best token of an OCR pass over
//! an image file or camera frame.

pub mod camera;
pub mod image;
pub mod speech;
pub mod typed;

pub use camera::{Camera, CameraSession, CommandCamera, FacingMode, MediaStream};
pub use image::{
    best_candidate, scan_image, ImageSource, ProgressFn, TesseractRecognizer, TextRecognizer,
};
pub use speech::{listen, CommandSpeechRecognizer, SpeechOutcome, SpeechRecognizer};
pub use typed::normalize_typed;

/// Split a configured command line into program and arguments.
pub(crate) fn split_command(command_line: &str) -> Option<(String, Vec<String>)> {
    let mut parts = command_line.split_whitespace().map(str::to_owned);
    let program = parts.next()?;
    Some((program, parts.collect()))
}
