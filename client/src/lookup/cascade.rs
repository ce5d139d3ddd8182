//! Postal code → town cascade.
//!
//! One query feeds two lists: the postal-code entries and the town names
//! derived from them. Picking a postal code fills the town; picking a town
//! leaves the postal code alone.

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::resolver::{LookupSource, Resolver};
use super::sources::AUX_TOWN;
use super::types::{sort_by_label, LookupEntry, SearchOutcome};
use crate::dispatch::DispatchError;

pub struct ZipTownCascade<S> {
    zip: Resolver<S>,
    town: Mutex<Option<LookupEntry>>,
}

impl<S: LookupSource> ZipTownCascade<S> {
    pub fn new(source: S, min_len: usize) -> Self {
        Self {
            zip: Resolver::new(source, min_len),
            town: Mutex::new(None),
        }
    }

    fn town_slot(&self) -> MutexGuard<'_, Option<LookupEntry>> {
        self.town.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub const fn zip_resolver(&self) -> &Resolver<S> {
        &self.zip
    }

    /// Postal-code lookups only run for the default country.
    pub fn set_default_country(&self, is_default: bool) {
        self.zip.set_prerequisite(is_default);
    }

    /// # Errors
    /// Propagates the lookup's `DispatchError`.
    pub async fn search_zip(&self, text: &str) -> Result<SearchOutcome, DispatchError> {
        self.zip.search(text).await
    }

    #[must_use]
    pub fn zip_options(&self) -> Vec<LookupEntry> {
        self.zip.results()
    }

    /// Town names derived from the current postal-code results, deduplicated.
    #[must_use]
    pub fn town_options(&self) -> Vec<LookupEntry> {
        let mut towns: Vec<LookupEntry> = Vec::new();
        for entry in self.zip.results() {
            let Some(town) = entry.aux(AUX_TOWN) else {
                continue;
            };
            if towns.iter().any(|t| t.value == town) {
                continue;
            }
            towns.push(LookupEntry::new(town, town));
        }
        sort_by_label(&mut towns);
        towns
    }

    /// Pick a postal-code result by label and fill the town from it.
    ///
    /// Selection is by label because several towns can share one postal code.
    pub fn select_zip(&self, label: &str) -> Option<LookupEntry> {
        let entry = self.zip.select_by(|e| e.label == label)?;
        if let Some(town) = entry.aux(AUX_TOWN) {
            *self.town_slot() = Some(LookupEntry::new(town, town));
        }
        Some(entry)
    }

    /// Pick a town from the derived list. The postal code is not touched.
    pub fn select_town(&self, value: &str) -> Option<LookupEntry> {
        let town = self.town_options().into_iter().find(|t| t.value == value)?;
        *self.town_slot() = Some(town.clone());
        Some(town)
    }

    /// Free-text postal code, used when the lookup is disabled.
    pub fn enter_zip(&self, text: &str) -> Option<LookupEntry> {
        self.zip.create_from_search(text)
    }

    /// Free-text town, used when the lookup is disabled.
    pub fn enter_town(&self, text: &str) -> Option<LookupEntry> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let town = LookupEntry::from_search(text);
        *self.town_slot() = Some(town.clone());
        Some(town)
    }

    pub fn clear(&self) {
        self.zip.clear_selection();
        *self.town_slot() = None;
    }

    pub fn blur_zip(&self) {
        self.zip.blur();
    }

    #[must_use]
    pub fn zip(&self) -> Option<LookupEntry> {
        self.zip.selection()
    }

    #[must_use]
    pub fn town(&self) -> Option<LookupEntry> {
        self.town_slot().clone()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.zip.is_complete() && self.town().is_some_and(|t| !t.value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Towns;

    #[async_trait]
    impl LookupSource for Towns {
        async fn lookup(&self, _query: &str) -> Result<Vec<LookupEntry>, DispatchError> {
            Ok(vec![
                LookupEntry::new("64100 - Bayonne", "64100").with_aux(AUX_TOWN, "Bayonne"),
                LookupEntry::new("64600 - Anglet", "64600").with_aux(AUX_TOWN, "Anglet"),
                LookupEntry::new("64600 - Anglet", "64600").with_aux(AUX_TOWN, "Anglet"),
            ])
        }
    }

    #[tokio::test]
    async fn town_options_are_deduplicated_and_sorted() {
        let cascade = ZipTownCascade::new(Towns, 4);
        cascade.search_zip("6410").await.unwrap();

        let towns: Vec<_> = cascade.town_options().into_iter().map(|t| t.value).collect();
        assert_eq!(towns, vec!["Anglet", "Bayonne"]);
    }

    #[tokio::test]
    async fn selecting_zip_fills_town() {
        let cascade = ZipTownCascade::new(Towns, 4);
        cascade.search_zip("6410").await.unwrap();

        let zip = cascade.select_zip("64100 - Bayonne").unwrap();
        assert_eq!(zip.value, "64100");
        assert!(!zip.is_created_from_search());
        assert_eq!(cascade.town().unwrap().value, "Bayonne");
        assert!(cascade.is_complete());
    }

    #[tokio::test]
    async fn selecting_town_leaves_zip_alone() {
        let cascade = ZipTownCascade::new(Towns, 4);
        cascade.search_zip("6410").await.unwrap();

        cascade.select_town("Anglet").unwrap();
        assert_eq!(cascade.town().unwrap().value, "Anglet");
        assert!(cascade.zip().is_none());
        assert!(!cascade.is_complete());
    }

    #[tokio::test]
    async fn foreign_country_takes_free_text() {
        let cascade = ZipTownCascade::new(Towns, 4);
        cascade.set_default_country(false);

        let outcome = cascade.search_zip("1000").await.unwrap();
        assert_eq!(outcome, SearchOutcome::PrerequisiteUnmet);

        cascade.enter_zip("1000").unwrap();
        cascade.enter_town("Bruxelles").unwrap();
        assert_eq!(cascade.zip().unwrap().value, "1000");
        assert_eq!(cascade.town().unwrap().value, "Bruxelles");
        assert!(cascade.is_complete());

        cascade.clear();
        assert!(cascade.zip().is_none());
        assert!(cascade.town().is_none());
    }

    #[test]
    fn blank_free_text_is_ignored() {
        let cascade = ZipTownCascade::new(Towns, 4);
        assert!(cascade.enter_town("   ").is_none());
        assert!(cascade.enter_zip("").is_none());
    }
}
