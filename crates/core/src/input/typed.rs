use medinfo_types::QueryText;

/// Typed text adapter: the trimmed value, or `None` for a blank box.
pub fn normalize_typed(value: &str) -> Option<QueryText> {
    QueryText::new(value).ok()
}
