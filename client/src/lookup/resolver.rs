//! Dependent-field resolver state machine.
//!
//! ```text
//! Idle ──edit (len ≥ min, prerequisite met)──▶ Searching
//! Searching ──≥1 result──▶ Resolved
//! Searching ──0 results──▶ NoResults
//! Resolved | NoResults | Searching ──blur──▶ Idle
//! ```
//!
//! Every issued lookup takes the next sequence number. A response is only
//! applied if its number is still the latest one, so a slow early response
//! can never overwrite a later one.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::types::{
    sort_by_label, Hint, LookupEntry, ResolverSnapshot, ResolverState, SearchOutcome,
};
use crate::dispatch::DispatchError;

/// Minimum search length used by the forms.
pub const DEFAULT_MIN_QUERY_LEN: usize = 4;

/// Where a resolver gets its candidates from.
#[async_trait]
pub trait LookupSource: Send + Sync {
    async fn lookup(&self, query: &str) -> Result<Vec<LookupEntry>, DispatchError>;
}

struct Inner {
    search: String,
    state: ResolverState,
    hint: Option<Hint>,
    selection: Option<LookupEntry>,
    prerequisite_met: bool,
    latest: u64,
}

impl Inner {
    /// Invalidate whatever lookup is in flight.
    fn bump(&mut self) -> u64 {
        self.latest += 1;
        self.latest
    }
}

/// Drives remote lookups for one dependent field.
///
/// Methods take `&self` so overlapping searches can run concurrently; state
/// is only locked between suspension points.
pub struct Resolver<S> {
    source: S,
    min_len: usize,
    inner: Mutex<Inner>,
}

impl<S: LookupSource> Resolver<S> {
    pub fn new(source: S, min_len: usize) -> Self {
        Self {
            source,
            min_len,
            inner: Mutex::new(Inner {
                search: String::new(),
                state: ResolverState::Idle,
                hint: None,
                selection: None,
                prerequisite_met: true,
                latest: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub const fn source(&self) -> &S {
        &self.source
    }

    /// Enable or disable lookups, e.g. when the country field changes.
    /// Disabling drops any results and in-flight query.
    pub fn set_prerequisite(&self, met: bool) {
        let mut inner = self.lock();
        inner.prerequisite_met = met;
        if !met {
            inner.bump();
            inner.state = ResolverState::Idle;
            inner.hint = None;
        }
    }

    /// React to an edit of the search text.
    ///
    /// Below the minimum length or with the prerequisite unmet, no request
    /// is issued and the resolver stays `Idle` with the matching hint.
    ///
    /// # Errors
    /// Returns the lookup's `DispatchError` when it is still the latest
    /// query; the resolver is then `Idle` with [`Hint::LookupFailed`].
    pub async fn search(&self, text: &str) -> Result<SearchOutcome, DispatchError> {
        let ticket = {
            let mut inner = self.lock();
            inner.search = text.to_string();

            let len = text.chars().count();
            if len < self.min_len {
                let remaining = self.min_len - len;
                inner.bump();
                inner.state = ResolverState::Idle;
                inner.hint = Some(Hint::TypeMore { remaining });
                return Ok(SearchOutcome::BelowThreshold { remaining });
            }

            if !inner.prerequisite_met {
                inner.bump();
                inner.state = ResolverState::Idle;
                inner.hint = Some(Hint::PrerequisiteUnmet);
                return Ok(SearchOutcome::PrerequisiteUnmet);
            }

            inner.state = ResolverState::Searching {
                query: text.to_string(),
            };
            inner.hint = None;
            inner.bump()
        };

        tracing::debug!(query = %text, seq = ticket, "Issuing lookup");
        let result = self.source.lookup(text).await;

        let mut inner = self.lock();
        if inner.latest != ticket {
            tracing::warn!(
                query = %text,
                seq = ticket,
                latest = inner.latest,
                "Discarding stale lookup response"
            );
            return Ok(SearchOutcome::Superseded);
        }

        match result {
            Ok(mut results) if !results.is_empty() => {
                sort_by_label(&mut results);
                let count = results.len();
                inner.state = ResolverState::Resolved { results };
                inner.hint = None;
                Ok(SearchOutcome::Resolved { count })
            }
            Ok(_) => {
                inner.state = ResolverState::NoResults {
                    query: text.to_string(),
                };
                inner.hint = Some(Hint::NoResults);
                Ok(SearchOutcome::NoResults)
            }
            Err(e) => {
                inner.state = ResolverState::Idle;
                inner.hint = Some(Hint::LookupFailed);
                Err(e)
            }
        }
    }

    /// Select the result whose value is `value`.
    pub fn select(&self, value: &str) -> Option<LookupEntry> {
        self.select_by(|e| e.value == value)
    }

    /// Select the first result matching `pred`.
    pub fn select_by(&self, pred: impl Fn(&LookupEntry) -> bool) -> Option<LookupEntry> {
        let mut inner = self.lock();
        let entry = match &inner.state {
            ResolverState::Resolved { results } => results.iter().find(|e| pred(e)).cloned(),
            _ => None,
        }?;
        inner.selection = Some(entry.clone());
        Some(entry)
    }

    /// Accept free text that is not in any result list. Treated as a
    /// `Resolved` state holding the single synthesized entry.
    pub fn create_from_search(&self, text: &str) -> Option<LookupEntry> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let entry = LookupEntry::from_search(text);

        let mut inner = self.lock();
        inner.bump();
        inner.search = text.to_string();
        inner.state = ResolverState::Resolved {
            results: vec![entry.clone()],
        };
        inner.hint = None;
        inner.selection = Some(entry.clone());
        Some(entry)
    }

    pub fn clear_selection(&self) {
        self.lock().selection = None;
    }

    /// Field lost focus: drop transient results so the next focus queries again.
    pub fn blur(&self) {
        let mut inner = self.lock();
        inner.bump();
        inner.state = ResolverState::Idle;
        inner.hint = None;
    }

    #[must_use]
    pub fn snapshot(&self) -> ResolverSnapshot {
        let inner = self.lock();
        ResolverSnapshot {
            state: inner.state.clone(),
            hint: inner.hint,
            search: inner.search.clone(),
            selection: inner.selection.clone(),
        }
    }

    #[must_use]
    pub fn state(&self) -> ResolverState {
        self.lock().state.clone()
    }

    #[must_use]
    pub fn hint(&self) -> Option<Hint> {
        self.lock().hint
    }

    /// Current results, empty unless `Resolved`.
    #[must_use]
    pub fn results(&self) -> Vec<LookupEntry> {
        match &self.lock().state {
            ResolverState::Resolved { results } => results.clone(),
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn selection(&self) -> Option<LookupEntry> {
        self.lock().selection.clone()
    }

    /// The field holds a non-empty selection.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.lock()
            .selection
            .as_ref()
            .is_some_and(|e| !e.value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    struct FixedSource {
        entries: Vec<LookupEntry>,
        calls: AtomicUsize,
    }

    impl FixedSource {
        fn new(entries: Vec<LookupEntry>) -> Self {
            Self {
                entries,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl LookupSource for FixedSource {
        async fn lookup(&self, _query: &str) -> Result<Vec<LookupEntry>, DispatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.entries.clone())
        }
    }

    /// Each query waits until the test releases it.
    struct GatedSource {
        gates: std::sync::Mutex<HashMap<String, oneshot::Receiver<Vec<LookupEntry>>>>,
    }

    #[async_trait]
    impl LookupSource for GatedSource {
        async fn lookup(&self, query: &str) -> Result<Vec<LookupEntry>, DispatchError> {
            let gate = self.gates.lock().unwrap().remove(query);
            match gate {
                Some(rx) => Ok(rx.await.unwrap_or_default()),
                None => Ok(Vec::new()),
            }
        }
    }

    struct FailingSource;

    #[async_trait]
    impl LookupSource for FailingSource {
        async fn lookup(&self, _query: &str) -> Result<Vec<LookupEntry>, DispatchError> {
            Err(DispatchError::Status {
                code: 500,
                message: "boom".into(),
            })
        }
    }

    fn towns() -> Vec<LookupEntry> {
        vec![
            LookupEntry::new("64100 - Bayonne", "64100").with_aux("town", "Bayonne"),
            LookupEntry::new("64100 - Anglet", "64100").with_aux("town", "Anglet"),
        ]
    }

    #[tokio::test]
    async fn short_search_issues_no_request_and_hints_type_more() {
        let resolver = Resolver::new(FixedSource::new(towns()), 4);

        for (text, remaining) in [("", 4), ("6", 3), ("64", 2), ("641", 1)] {
            let outcome = resolver.search(text).await.unwrap();
            assert_eq!(outcome, SearchOutcome::BelowThreshold { remaining });
            assert_eq!(resolver.hint(), Some(Hint::TypeMore { remaining }));
            assert_eq!(resolver.state(), ResolverState::Idle);
        }
        assert_eq!(resolver.source().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn results_are_sorted_by_label() {
        let resolver = Resolver::new(FixedSource::new(towns()), 4);

        let outcome = resolver.search("64100").await.unwrap();
        assert_eq!(outcome, SearchOutcome::Resolved { count: 2 });

        let labels: Vec<_> = resolver.results().into_iter().map(|e| e.label).collect();
        assert_eq!(labels, vec!["64100 - Anglet", "64100 - Bayonne"]);
        assert_eq!(resolver.hint(), None);
    }

    #[tokio::test]
    async fn empty_result_is_no_results_not_type_more() {
        let resolver = Resolver::new(FixedSource::new(Vec::new()), 4);

        let outcome = resolver.search("99999").await.unwrap();
        assert_eq!(outcome, SearchOutcome::NoResults);
        assert_eq!(resolver.hint(), Some(Hint::NoResults));
        assert!(matches!(resolver.state(), ResolverState::NoResults { .. }));
    }

    #[tokio::test]
    async fn unmet_prerequisite_blocks_lookup() {
        let resolver = Resolver::new(FixedSource::new(towns()), 4);
        resolver.set_prerequisite(false);

        let outcome = resolver.search("64100").await.unwrap();
        assert_eq!(outcome, SearchOutcome::PrerequisiteUnmet);
        assert_eq!(resolver.hint(), Some(Hint::PrerequisiteUnmet));
        assert_eq!(resolver.source().calls.load(Ordering::SeqCst), 0);

        resolver.set_prerequisite(true);
        assert_eq!(
            resolver.search("64100").await.unwrap(),
            SearchOutcome::Resolved { count: 2 }
        );
    }

    #[tokio::test]
    async fn select_and_blur() {
        let resolver = Resolver::new(FixedSource::new(towns()), 4);
        resolver.search("64100").await.unwrap();

        assert!(resolver.select("nope").is_none());
        let picked = resolver.select("64100").unwrap();
        assert_eq!(picked.value, "64100");
        assert!(resolver.is_complete());

        resolver.blur();
        assert_eq!(resolver.state(), ResolverState::Idle);
        assert!(resolver.results().is_empty());
        // Selection survives the blur; only the transient list is dropped.
        assert!(resolver.is_complete());
    }

    #[tokio::test]
    async fn create_from_search_synthesizes_resolved_entry() {
        let resolver = Resolver::new(FixedSource::new(Vec::new()), 4);

        assert!(resolver.create_from_search("   ").is_none());
        let entry = resolver.create_from_search("Ikastola Bayonne").unwrap();

        assert!(entry.is_created_from_search());
        assert_eq!(
            resolver.state(),
            ResolverState::Resolved {
                results: vec![entry.clone()]
            }
        );
        assert_eq!(resolver.selection(), Some(entry));
    }

    #[tokio::test]
    async fn failed_lookup_returns_to_idle() {
        let resolver = Resolver::new(FailingSource, 4);

        let err = resolver.search("64100").await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(resolver.state(), ResolverState::Idle);
        assert_eq!(resolver.hint(), Some(Hint::LookupFailed));
    }

    #[tokio::test]
    async fn slow_earlier_response_does_not_overwrite_later_one() {
        let (slow_tx, slow_rx) = oneshot::channel();
        let (fast_tx, fast_rx) = oneshot::channel();
        let gates = HashMap::from([
            ("6410".to_string(), slow_rx),
            ("64100".to_string(), fast_rx),
        ]);
        let resolver = Resolver::new(
            GatedSource {
                gates: std::sync::Mutex::new(gates),
            },
            4,
        );

        let release = async {
            fast_tx
                .send(vec![LookupEntry::new("64100 - Bayonne", "64100")])
                .unwrap();
            tokio::task::yield_now().await;
            slow_tx
                .send(vec![
                    LookupEntry::new("64100 - Bayonne", "64100"),
                    LookupEntry::new("64102 - Bayonne Cedex", "64102"),
                ])
                .unwrap();
        };

        let (slow, fast, ()) =
            tokio::join!(resolver.search("6410"), resolver.search("64100"), release);

        assert_eq!(slow.unwrap(), SearchOutcome::Superseded);
        assert_eq!(fast.unwrap(), SearchOutcome::Resolved { count: 1 });
        assert_eq!(resolver.results().len(), 1);
        assert_eq!(resolver.snapshot().search, "64100");
    }

    #[tokio::test]
    async fn blur_discards_in_flight_response() {
        let (tx, rx) = oneshot::channel();
        let resolver = Resolver::new(
            GatedSource {
                gates: std::sync::Mutex::new(HashMap::from([("64100".to_string(), rx)])),
            },
            4,
        );

        let blur_then_release = async {
            tokio::task::yield_now().await;
            resolver.blur();
            tx.send(towns()).unwrap();
        };

        let (outcome, ()) = tokio::join!(resolver.search("64100"), blur_then_release);
        assert_eq!(outcome.unwrap(), SearchOutcome::Superseded);
        assert_eq!(resolver.state(), ResolverState::Idle);
    }
}
