//! Constants used throughout the MedInfo core crate.
//!
//! Storage keys live here so every component agrees on the persisted namespace.

/// Storage key for the authenticated flag (`"true"` when signed in).
pub const AUTH_FLAG_KEY: &str = "medinfo_authenticated";

/// Storage key for the JSON-encoded user profile.
pub const USER_PROFILE_KEY: &str = "medinfo_user";

/// Storage key for the JSON array of recent search queries.
pub const SEARCH_HISTORY_KEY: &str = "medinfo_search_history";

/// Maximum number of entries kept in search history.
pub const MAX_HISTORY_ENTRIES: usize = 5;

/// Default directory for the file-backed key-value store.
pub const DEFAULT_DATA_DIR: &str = "medinfo_data";

/// Filename of the key-value store inside the data directory.
pub const STORAGE_FILENAME: &str = "storage.json";

/// Default encyclopedia summary endpoint used by the fallback resolver.
pub const DEFAULT_SUMMARY_ENDPOINT: &str = "https://en.wikipedia.org/api/rest_v1/page/summary/";

/// Default OCR engine command.
pub const DEFAULT_OCR_COMMAND: &str = "tesseract";

/// OCR language passed to the engine.
pub const OCR_LANGUAGE: &str = "eng";

/// Language requested from speech recognizers.
pub const SPEECH_LANGUAGE: &str = "en-US";

/// Candidate returned by the image adapter when no token survives filtering.
pub const UNKNOWN_CANDIDATE: &str = "Unknown";

/// Tokens with this many characters or fewer are discarded by the image adapter.
pub const MIN_OCR_TOKEN_EXCLUSIVE: usize = 3;

/// Suggested queries shown on the landing page.
pub const TRENDING_QUERIES: [&str; 4] = [
    "Diabetes Type 2",
    "Aspirin",
    "Chest Pain Protocol",
    "Amoxicillin",
];
