/// Namespace segment the ingestion side prepends to record ids (`prompts/<id>`).
pub const RECORD_NAMESPACE: &str = "prompts/";

/// Canonical record id for a raw reference.
///
/// Any leading path segments (`prompts/`, `drive/prompts/`, ...) are stripped and the
/// remainder trimmed. Returns `None` when nothing usable is left, so callers treat the
/// owning record as a root. Existence of the id is checked by the record store, not here.
pub fn normalize_ref(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    let id = match raw.rfind('/') {
        Some(pos) => &raw[pos + 1..],
        None => raw,
    };
    let id = id.trim();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Normalize an optional raw reference in one step.
pub fn normalize_opt_ref(raw: Option<&str>) -> Option<&str> {
    raw.and_then(normalize_ref)
}

/// Namespaced form of an id, as written back by link repair.
pub fn namespaced(id: &str) -> String {
    format!("{RECORD_NAMESPACE}{id}")
}
