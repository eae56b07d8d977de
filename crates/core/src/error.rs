#[derive(Debug, thiserror::Error)]
pub enum MedinfoError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to read storage file: {0}")]
    StorageRead(std::io::Error),
    #[error("failed to write storage file: {0}")]
    StorageWrite(std::io::Error),
    #[error("failed to serialize stored value: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize stored value: {0}")]
    Deserialization(serde_json::Error),
    #[error("invalid summary endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(reqwest::Error),
    #[error(
        "sign-in failed and rolling back the stored profile also failed: sign_in={sign_in_error}; rollback={rollback_error}"
    )]
    RollbackAfterSignInFailed {
        #[source]
        sign_in_error: Box<MedinfoError>,
        rollback_error: Box<MedinfoError>,
    },
    #[error("text error: {0}")]
    Text(#[from] medinfo_types::TextError),
}

pub type CoreResult<T> = std::result::Result<T, MedinfoError>;

/// Failures from the speech, camera and OCR input adapters.
///
/// None of these are fatal. `Unsupported` must be shown as a blocking notice; every other
/// variant is a dismissible notice after which the pipeline is idle again.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("{0} is not supported on this host")]
    Unsupported(&'static str),
    #[error("could not access camera: {0}")]
    CameraUnavailable(String),
    #[error("speech recognition failed: {0}")]
    Speech(String),
    #[error("could not process image: {0}")]
    Ocr(String),
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

impl CaptureError {
    /// True when the capability is missing altogether rather than failing transiently.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, CaptureError::Unsupported(_))
    }
}
