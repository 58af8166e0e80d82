/// Which soft-delete states a lookup considers.
///
/// Rows are never physically removed; they carry a nullable `deleted_at`
/// marker and soft-deleted rows stay eligible for revival. Every query names
/// its scope explicitly rather than relying on an implicit active-only
/// convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordScope {
    Active,
    Deleted,
    Any,
}

impl RecordScope {
    pub fn filter(&self) -> Option<&'static str> {
        match self {
            RecordScope::Active => Some("deleted_at=is.null"),
            RecordScope::Deleted => Some("deleted_at=not.is.null"),
            RecordScope::Any => None,
        }
    }

    /// Append this scope's predicate to an existing PostgREST filter string.
    pub fn apply(&self, filters: &str) -> String {
        match self.filter() {
            Some(f) if filters.is_empty() => f.to_string(),
            Some(f) => format!("{}&{}", filters, f),
            None => filters.to_string(),
        }
    }
}
