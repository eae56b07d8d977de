//! Search pipeline: normalizer → local matcher → (conditionally) remote fallback.
//!
//! Each query takes a [`QueryTicket`] when it starts. Results are committed to the current
//! view only if no newer ticket has been issued in the meantime, so a slow fallback lookup
//! or OCR pass never overwrites the results of a query typed after it.
//!
//! History and view state sit behind short-lived mutexes that are never held across an
//! `.await`.

use crate::catalogue::{self, MedicineRecord};
use crate::error::CaptureError;
use crate::fallback::{LookupOutcome, RemoteSummary, SummaryLookup};
use crate::history::SearchHistory;
use crate::input::camera::{Camera, CameraSession, FacingMode};
use crate::input::image::{scan_image, ImageSource, ProgressFn, TextRecognizer};
use crate::input::speech::{listen, SpeechOutcome, SpeechRecognizer};
use crate::input::typed::normalize_typed;
use crate::matcher::{match_query, MatchOutcome};
use crate::CoreResult;
use medinfo_types::QueryText;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;

/// Identity of one issued query. Later queries carry larger tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueryTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Blank input: results cleared, nothing looked up.
    NoQuery,
    Local(Vec<&'static MedicineRecord>),
    Remote(RemoteSummary),
    /// No local match and no usable remote summary.
    NoInformation,
    /// A newer query was issued before this one finished; its results were discarded.
    Superseded,
}

/// What is currently on display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchView {
    pub ticket: Option<QueryTicket>,
    pub query: Option<String>,
    pub outcome: SearchOutcome,
}

impl Default for SearchView {
    fn default() -> Self {
        Self {
            ticket: None,
            query: None,
            outcome: SearchOutcome::NoQuery,
        }
    }
}

pub struct SearchPipeline {
    records: &'static [MedicineRecord],
    resolver: Arc<dyn SummaryLookup>,
    history: Mutex<SearchHistory>,
    latest: AtomicU64,
    view: Mutex<SearchView>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SearchPipeline {
    pub fn new(resolver: Arc<dyn SummaryLookup>, history: SearchHistory) -> Self {
        Self {
            records: catalogue::all(),
            resolver,
            history: Mutex::new(history),
            latest: AtomicU64::new(0),
            view: Mutex::new(SearchView::default()),
        }
    }

    /// Start a new query, superseding every earlier one.
    pub fn issue_ticket(&self) -> QueryTicket {
        QueryTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: QueryTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Typed (or deep-linked) query.
    pub async fn search(&self, raw: &str) -> SearchOutcome {
        let ticket = self.issue_ticket();
        match normalize_typed(raw) {
            Some(query) => self.run(ticket, query.as_str()).await,
            None => self.commit(ticket, None, SearchOutcome::NoQuery),
        }
    }

    /// Listen for one utterance and search for its transcript.
    ///
    /// Returns `Ok(None)` when the session ended without a transcript or was cancelled.
    pub async fn search_speech(
        &self,
        recognizer: Option<&dyn SpeechRecognizer>,
        cancel: CancellationToken,
    ) -> Result<Option<SearchOutcome>, CaptureError> {
        let ticket = self.issue_ticket();
        match listen(recognizer, cancel).await? {
            SpeechOutcome::Transcript(text) if !self.is_current(ticket) => {
                tracing::debug!("discarding transcript {:?}: superseded", text.as_str());
                Ok(Some(SearchOutcome::Superseded))
            }
            SpeechOutcome::Transcript(text) => Ok(Some(self.run(ticket, text.as_str()).await)),
            SpeechOutcome::NoResult | SpeechOutcome::Cancelled => Ok(None),
        }
    }

    /// OCR an image and search for the best candidate token.
    pub async fn search_image(
        &self,
        recognizer: &dyn TextRecognizer,
        image: &ImageSource,
        progress: ProgressFn<'_>,
    ) -> Result<SearchOutcome, CaptureError> {
        let ticket = self.issue_ticket();
        self.scan_and_run(ticket, recognizer, image, progress).await
    }

    /// Open the camera, capture one frame, release the camera, then OCR the frame.
    pub async fn search_camera(
        &self,
        camera: &dyn Camera,
        facing: FacingMode,
        recognizer: &dyn TextRecognizer,
        progress: ProgressFn<'_>,
    ) -> Result<SearchOutcome, CaptureError> {
        let ticket = self.issue_ticket();
        let frame = {
            let mut session = CameraSession::open(camera, facing).await?;
            let frame = session.capture_frame().await?;
            session.close();
            frame
        };
        self.scan_and_run(ticket, recognizer, &ImageSource::Frame(frame), progress)
            .await
    }

    async fn scan_and_run(
        &self,
        ticket: QueryTicket,
        recognizer: &dyn TextRecognizer,
        image: &ImageSource,
        progress: ProgressFn<'_>,
    ) -> Result<SearchOutcome, CaptureError> {
        let candidate = scan_image(recognizer, image, progress).await?;
        if !self.is_current(ticket) {
            tracing::debug!("discarding OCR result {:?}: superseded", candidate.as_str());
            return Ok(SearchOutcome::Superseded);
        }
        Ok(self.run(ticket, candidate.as_str()).await)
    }

    async fn run(&self, ticket: QueryTicket, raw: &str) -> SearchOutcome {
        let query = match match_query(self.records, raw) {
            MatchOutcome::NoQuery => {
                return self.commit(ticket, None, SearchOutcome::NoQuery);
            }
            MatchOutcome::Matches(records) => {
                let query = QueryText::new(raw).ok();
                if let Some(q) = &query {
                    self.remember(q);
                }
                tracing::debug!("{} local match(es) for {:?}", records.len(), raw.trim());
                return self.commit(ticket, query, SearchOutcome::Local(records));
            }
            MatchOutcome::NoMatches(query) => query,
        };

        self.remember(&query);
        tracing::debug!("no local match for {:?}, trying fallback", query.as_str());

        let outcome = match self.resolver.lookup(&query).await {
            LookupOutcome::Found(summary) => SearchOutcome::Remote(summary),
            LookupOutcome::NotFound => SearchOutcome::NoInformation,
            LookupOutcome::Error(reason) => {
                tracing::warn!("summary fallback failed for {:?}: {}", query.as_str(), reason);
                SearchOutcome::NoInformation
            }
        };
        self.commit(ticket, Some(query), outcome)
    }

    fn commit(&self, ticket: QueryTicket, query: Option<QueryText>, outcome: SearchOutcome) -> SearchOutcome {
        let mut view = lock(&self.view);
        if !self.is_current(ticket) {
            tracing::debug!("discarding results for superseded query {:?}", ticket);
            return SearchOutcome::Superseded;
        }
        *view = SearchView {
            ticket: Some(ticket),
            query: query.map(QueryText::into_string),
            outcome: outcome.clone(),
        };
        outcome
    }

    fn remember(&self, query: &QueryText) {
        if let Err(e) = lock(&self.history).record(query) {
            tracing::warn!("failed to record search history: {}", e);
        }
    }

    pub fn current_view(&self) -> SearchView {
        lock(&self.view).clone()
    }

    /// Recent queries, most recent first.
    pub fn history(&self) -> Vec<String> {
        lock(&self.history).entries().to_vec()
    }

    pub fn remove_history_entry(&self, entry: &str) -> CoreResult<bool> {
        lock(&self.history).remove(entry)
    }

    pub fn clear_history(&self) -> CoreResult<()> {
        lock(&self.history).clear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::camera::fake::FakeCamera;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    /// Records every lookup; answers `Found` for "Malaria" and `NotFound` otherwise.
    #[derive(Default)]
    struct RecordingLookup {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingLookup {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn malaria() -> RemoteSummary {
        RemoteSummary {
            title: "Malaria".into(),
            description: None,
            extract: "Malaria is a mosquito-borne infectious disease.".into(),
            thumbnail_url: None,
            page_url: "https://en.wikipedia.org/wiki/Malaria".into(),
        }
    }

    #[async_trait]
    impl SummaryLookup for RecordingLookup {
        async fn lookup(&self, query: &QueryText) -> LookupOutcome {
            self.calls.lock().unwrap().push(query.as_str().to_owned());
            match query.as_str() {
                "Malaria" => LookupOutcome::Found(malaria()),
                "Offline" => LookupOutcome::Error("transport: connection refused".into()),
                _ => LookupOutcome::NotFound,
            }
        }
    }

    /// Lookup that blocks until released, to simulate a slow network.
    struct GatedLookup {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl SummaryLookup for GatedLookup {
        async fn lookup(&self, _query: &QueryText) -> LookupOutcome {
            self.gate.notified().await;
            LookupOutcome::Found(malaria())
        }
    }

    struct FixedText(&'static str);

    #[async_trait]
    impl TextRecognizer for FixedText {
        async fn recognize(&self, _image: &ImageSource, progress: ProgressFn<'_>) -> Result<String, CaptureError> {
            progress(100);
            Ok(self.0.to_owned())
        }
    }

    struct FixedSpeech(&'static str);

    /// Recognizer that hears its transcript only once released.
    struct GatedSpeech {
        gate: Arc<Notify>,
        transcript: &'static str,
    }

    #[async_trait]
    impl SpeechRecognizer for GatedSpeech {
        async fn recognize_once(
            &self,
            _language: &str,
            _cancel: CancellationToken,
        ) -> Result<SpeechOutcome, CaptureError> {
            self.gate.notified().await;
            Ok(SpeechOutcome::Transcript(QueryText::new(self.transcript).unwrap()))
        }
    }

    #[async_trait]
    impl SpeechRecognizer for FixedSpeech {
        async fn recognize_once(
            &self,
            _language: &str,
            _cancel: CancellationToken,
        ) -> Result<SpeechOutcome, CaptureError> {
            Ok(SpeechOutcome::Transcript(QueryText::new(self.0).unwrap()))
        }
    }

    fn pipeline_with(resolver: Arc<dyn SummaryLookup>) -> SearchPipeline {
        let history = SearchHistory::load(Arc::new(MemoryStore::new())).unwrap();
        SearchPipeline::new(resolver, history)
    }

    fn ids(outcome: &SearchOutcome) -> Vec<u32> {
        match outcome {
            SearchOutcome::Local(records) => records.iter().map(|m| m.id).collect(),
            _ => Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_blank_query_never_calls_fallback() {
        let lookup = Arc::new(RecordingLookup::default());
        let pipeline = pipeline_with(lookup.clone());

        for raw in ["", "   ", "\t\n"] {
            assert_eq!(pipeline.search(raw).await, SearchOutcome::NoQuery);
        }

        assert!(lookup.calls().is_empty());
        assert!(pipeline.history().is_empty());
    }

    #[tokio::test]
    async fn test_local_match_suppresses_fallback() {
        let lookup = Arc::new(RecordingLookup::default());
        let pipeline = pipeline_with(lookup.clone());

        assert_eq!(ids(&pipeline.search("Paracetamol").await), vec![1]);
        assert_eq!(ids(&pipeline.search("aspirin").await), vec![5]);

        assert!(lookup.calls().is_empty());
        assert_eq!(pipeline.history(), vec!["aspirin", "Paracetamol"]);
    }

    #[tokio::test]
    async fn test_no_local_match_invokes_fallback_with_query() {
        let lookup = Arc::new(RecordingLookup::default());
        let pipeline = pipeline_with(lookup.clone());

        let outcome = pipeline.search("Malaria").await;

        assert_eq!(outcome, SearchOutcome::Remote(malaria()));
        assert_eq!(lookup.calls(), vec!["Malaria"]);
        assert_eq!(pipeline.current_view().query.as_deref(), Some("Malaria"));
    }

    #[tokio::test]
    async fn test_fallback_failures_are_no_information() {
        let lookup = Arc::new(RecordingLookup::default());
        let pipeline = pipeline_with(lookup.clone());

        assert_eq!(pipeline.search("Unheardofitis").await, SearchOutcome::NoInformation);
        assert_eq!(pipeline.search("Offline").await, SearchOutcome::NoInformation);
        assert_eq!(lookup.calls(), vec!["Unheardofitis", "Offline"]);
    }

    #[tokio::test]
    async fn test_same_query_twice_is_identical() {
        let pipeline = pipeline_with(Arc::new(RecordingLookup::default()));
        let first = pipeline.search("Inhibitors").await;
        let second = pipeline.search("Inhibitors").await;

        assert_eq!(first, second);
        assert_eq!(ids(&first), vec![4, 6, 7]);
        assert_eq!(pipeline.history(), vec!["Inhibitors"]);
    }

    #[tokio::test]
    async fn test_stale_fallback_does_not_overwrite_newer_results() {
        let gate = Arc::new(Notify::new());
        let pipeline = Arc::new(pipeline_with(Arc::new(GatedLookup { gate: gate.clone() })));

        let slow = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move { pipeline.search("Malaria").await })
        };
        // Let the slow query reach the fallback before the next one is typed.
        tokio::task::yield_now().await;
        while pipeline.history().is_empty() {
            tokio::task::yield_now().await;
        }

        let fresh = pipeline.search("Metformin").await;
        assert_eq!(ids(&fresh), vec![3]);

        gate.notify_one();
        assert_eq!(slow.await.unwrap(), SearchOutcome::Superseded);

        let view = pipeline.current_view();
        assert_eq!(view.query.as_deref(), Some("Metformin"));
        assert_eq!(ids(&view.outcome), vec![3]);
    }

    #[tokio::test]
    async fn test_image_search_uses_best_token() {
        let lookup = Arc::new(RecordingLookup::default());
        let pipeline = pipeline_with(lookup.clone());

        let outcome = pipeline
            .search_image(
                &FixedText("Take 2 tablets daily Aspirin 81mg"),
                &ImageSource::File("label.jpg".into()),
                &|_: u8| {},
            )
            .await
            .unwrap();

        // "tablets" beats "Aspirin" on first occurrence and matches nothing locally.
        assert_eq!(outcome, SearchOutcome::NoInformation);
        assert_eq!(lookup.calls(), vec!["tablets"]);
    }

    #[tokio::test]
    async fn test_image_result_superseded_by_typed_query() {
        let pipeline = pipeline_with(Arc::new(RecordingLookup::default()));
        let ticket = pipeline.issue_ticket();
        pipeline.search("Omeprazole").await;

        let outcome = pipeline
            .scan_and_run(
                ticket,
                &FixedText("Lisinopril"),
                &ImageSource::Frame(vec![1, 2, 3]),
                &|_: u8| {},
            )
            .await
            .unwrap();

        assert_eq!(outcome, SearchOutcome::Superseded);
        assert_eq!(pipeline.history(), vec!["Omeprazole"]);
        assert_eq!(ids(&pipeline.current_view().outcome), vec![6]);
    }

    #[tokio::test]
    async fn test_camera_search_releases_camera() {
        let pipeline = pipeline_with(Arc::new(RecordingLookup::default()));
        let camera = FakeCamera::default();

        let outcome = pipeline
            .search_camera(
                &camera,
                FacingMode::Environment,
                &FixedText("ALBUTEROL inhaler"),
                &|_: u8| {},
            )
            .await
            .unwrap();

        assert_eq!(ids(&outcome), vec![8]);
        assert_eq!(camera.stop_count(), 1);
        assert_eq!(camera.facings(), vec![FacingMode::Environment]);
    }

    #[tokio::test]
    async fn test_camera_search_honours_facing() {
        let pipeline = pipeline_with(Arc::new(RecordingLookup::default()));
        let camera = FakeCamera::default();

        pipeline
            .search_camera(&camera, FacingMode::User, &FixedText("Lisinopril"), &|_: u8| {})
            .await
            .unwrap();

        assert_eq!(camera.facings(), vec![FacingMode::User]);
        assert_eq!(camera.stop_count(), 1);
    }

    #[tokio::test]
    async fn test_camera_denied_leaves_pipeline_idle() {
        let pipeline = pipeline_with(Arc::new(RecordingLookup::default()));
        let camera = FakeCamera {
            deny: true,
            ..FakeCamera::default()
        };

        let result = pipeline
            .search_camera(&camera, FacingMode::User, &FixedText("Aspirin"), &|_: u8| {})
            .await;

        assert!(matches!(result, Err(CaptureError::CameraUnavailable(_))));
        assert_eq!(pipeline.current_view(), SearchView::default());
        assert!(pipeline.history().is_empty());
    }

    #[tokio::test]
    async fn test_speech_search() {
        let pipeline = pipeline_with(Arc::new(RecordingLookup::default()));

        let outcome = pipeline
            .search_speech(Some(&FixedSpeech("metformin")), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(ids(&outcome.unwrap()), vec![3]);

        let unsupported = pipeline
            .search_speech(None, CancellationToken::new())
            .await;
        assert!(matches!(unsupported, Err(ref e) if e.is_unsupported()));
    }

    #[tokio::test]
    async fn test_overtaken_speech_leaves_history_and_fallback_alone() {
        let lookup = Arc::new(RecordingLookup::default());
        let pipeline = Arc::new(pipeline_with(lookup.clone()));
        let gate = Arc::new(Notify::new());
        let recognizer = Arc::new(GatedSpeech {
            gate: gate.clone(),
            transcript: "Malaria",
        });

        let listening = {
            let pipeline = pipeline.clone();
            let recognizer = recognizer.clone();
            tokio::spawn(async move {
                pipeline
                    .search_speech(Some(recognizer.as_ref()), CancellationToken::new())
                    .await
            })
        };
        // Wait for the speech session to take its ticket.
        while pipeline.latest.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(ids(&pipeline.search("Metformin").await), vec![3]);
        gate.notify_one();

        let outcome = listening.await.unwrap().unwrap();
        assert_eq!(outcome, Some(SearchOutcome::Superseded));
        assert_eq!(pipeline.history(), vec!["Metformin"]);
        assert!(lookup.calls().is_empty());
        assert_eq!(ids(&pipeline.current_view().outcome), vec![3]);
    }

    #[tokio::test]
    async fn test_typed_search_is_trimmed() {
        let pipeline = pipeline_with(Arc::new(RecordingLookup::default()));

        assert_eq!(ids(&pipeline.search("  Metformin \n").await), vec![3]);
        assert_eq!(pipeline.history(), vec!["Metformin"]);
        assert_eq!(pipeline.current_view().query.as_deref(), Some("Metformin"));
    }

    #[tokio::test]
    async fn test_history_management_through_pipeline() {
        let pipeline = pipeline_with(Arc::new(RecordingLookup::default()));
        for q in ["Aspirin", "Metformin", "Lisinopril"] {
            pipeline.search(q).await;
        }

        assert!(pipeline.remove_history_entry("Metformin").unwrap());
        assert_eq!(pipeline.history(), vec!["Lisinopril", "Aspirin"]);

        pipeline.clear_history().unwrap();
        assert!(pipeline.history().is_empty());
    }
}
