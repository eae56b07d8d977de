//! # MedInfo Core
//!
//! Core logic for the MedInfo medicine lookup:
//! - the embedded medicine catalogue and the local substring matcher
//! - input adapters for typed text, speech and OCR (image file or camera frame)
//! - the remote encyclopedia fallback used when nothing matches locally
//! - search history and the client-side session, persisted through a [`KeyValueStore`]
//! - the [`SearchPipeline`] that ties these together
//!
//! **No API concerns**: HTTP handlers and the command-line surface belong in `api-rest` and
//! `medinfo-cli`.

pub mod catalogue;
pub mod config;
pub mod constants;
pub mod error;
pub mod fallback;
pub mod history;
pub mod input;
pub mod matcher;
pub mod pipeline;
pub mod session;
pub mod store;

pub use catalogue::MedicineRecord;
pub use config::CoreConfig;
pub use error::{CaptureError, CoreResult, MedinfoError};
pub use fallback::{HttpSummaryClient, LookupOutcome, RemoteSummary, SummaryLookup};
pub use history::SearchHistory;
pub use medinfo_types::{ColorTag, QueryText};
pub use pipeline::{QueryTicket, SearchOutcome, SearchPipeline, SearchView};
pub use session::{Credentials, SessionStore, UserProfile};
pub use store::{FileStore, KeyValueStore, MemoryStore};

use input::{
    Camera, CommandCamera, CommandSpeechRecognizer, SpeechRecognizer, TesseractRecognizer,
    TextRecognizer,
};
use std::sync::Arc;

/// Everything a front end needs, wired from one [`CoreConfig`].
#[derive(Clone)]
pub struct Services {
    pub pipeline: Arc<SearchPipeline>,
    pub session: Arc<SessionStore>,
    pub ocr: Option<Arc<dyn TextRecognizer>>,
    pub speech: Option<Arc<dyn SpeechRecognizer>>,
    pub camera: Option<Arc<dyn Camera>>,
}

impl Services {
    /// Open the file-backed store under the data directory and build the services on it.
    pub fn from_config(cfg: &CoreConfig) -> CoreResult<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(cfg.storage_path())?);
        let resolver: Arc<dyn SummaryLookup> = Arc::new(HttpSummaryClient::from_config(cfg)?);
        Self::with_parts(cfg, store, resolver)
    }

    /// Build the services on an explicit store and resolver.
    pub fn with_parts(
        cfg: &CoreConfig,
        store: Arc<dyn KeyValueStore>,
        resolver: Arc<dyn SummaryLookup>,
    ) -> CoreResult<Self> {
        let history = SearchHistory::load(store.clone())?;

        Ok(Self {
            pipeline: Arc::new(SearchPipeline::new(resolver, history)),
            session: Arc::new(SessionStore::new(store)),
            ocr: TesseractRecognizer::from_command_line(cfg.ocr_command())
                .map(|r| Arc::new(r) as Arc<dyn TextRecognizer>),
            speech: cfg
                .speech_command()
                .and_then(CommandSpeechRecognizer::from_command_line)
                .map(|r| Arc::new(r) as Arc<dyn SpeechRecognizer>),
            camera: cfg
                .camera_command()
                .and_then(CommandCamera::from_command_line)
                .map(|c| Arc::new(c) as Arc<dyn Camera>),
        })
    }
}
