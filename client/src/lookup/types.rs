use std::collections::BTreeMap;

use serde::Serialize;

/// Auxiliary key marking an entry typed by the user rather than returned by a lookup.
pub const CREATED_FROM_SEARCH: &str = "created_from_search";

/// One selectable lookup result.
///
/// `label` is what the list shows, `value` is what gets submitted, and
/// `aux` carries extra fields a selection may fill in elsewhere (e.g. the
/// town of a postal code).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupEntry {
    pub label: String,
    pub value: String,
    pub aux: BTreeMap<String, String>,
}

impl LookupEntry {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            aux: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_aux(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.aux.insert(key.into(), value.into());
        self
    }

    /// Free-text entry: label and value are both the typed text.
    pub fn from_search(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(text.clone(), text).with_aux(CREATED_FROM_SEARCH, "true")
    }

    #[must_use]
    pub fn aux(&self, key: &str) -> Option<&str> {
        self.aux.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_created_from_search(&self) -> bool {
        self.aux(CREATED_FROM_SEARCH) == Some("true")
    }
}

/// Sort ascending by label, the order every result list is exposed in.
pub fn sort_by_label(entries: &mut [LookupEntry]) {
    entries.sort_by(|a, b| a.label.cmp(&b.label).then_with(|| a.value.cmp(&b.value)));
}

/// Lifecycle of one dependent-field lookup.
///
/// `Idle` means "not searched"; `NoResults` means a search ran and came back
/// empty. The two are never conflated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverState {
    Idle,
    Searching { query: String },
    Resolved { results: Vec<LookupEntry> },
    NoResults { query: String },
}

/// Message shown under the field instead of a result list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    /// Search text is below the minimum length
    TypeMore { remaining: usize },
    /// A field this lookup depends on does not allow it (e.g. foreign country)
    PrerequisiteUnmet,
    /// The lookup ran and found nothing
    NoResults,
    /// The lookup failed; the caller has the error
    LookupFailed,
}

/// Point-in-time view of a resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSnapshot {
    pub state: ResolverState,
    pub hint: Option<Hint>,
    pub search: String,
    pub selection: Option<LookupEntry>,
}

/// What a call to `Resolver::search` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// No request issued; this many more characters are needed
    BelowThreshold { remaining: usize },
    /// No request issued; the prerequisite field does not allow a lookup
    PrerequisiteUnmet,
    /// Results applied
    Resolved { count: usize },
    /// Lookup ran and found nothing
    NoResults,
    /// A newer search (or a blur) overtook this one; its response was dropped
    Superseded,
}
