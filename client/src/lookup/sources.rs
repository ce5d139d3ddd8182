//! Lookup sources backed by the API.

use async_trait::async_trait;

use super::resolver::LookupSource;
use super::types::{sort_by_label, LookupEntry};
use crate::api::{BureauApi, MemberFilter};
use crate::dispatch::DispatchError;
use crate::validation::is_valid_member_identifier;

/// Auxiliary key holding the town of a postal-code entry.
pub const AUX_TOWN: &str = "town";
/// Auxiliary key holding the login of a member entry.
pub const AUX_LOGIN: &str = "login";

/// Postal code → towns. One entry per (zip, town) pair.
pub struct TownsByZip {
    api: BureauApi,
}

impl TownsByZip {
    pub const fn new(api: BureauApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl LookupSource for TownsByZip {
    async fn lookup(&self, query: &str) -> Result<Vec<LookupEntry>, DispatchError> {
        let towns = self.api.towns(query).await?;
        let mut entries: Vec<_> = towns
            .into_iter()
            .map(|t| {
                LookupEntry::new(format!("{} - {}", t.zip, t.town), t.zip).with_aux(AUX_TOWN, t.town)
            })
            .collect();
        sort_by_label(&mut entries);
        Ok(entries)
    }
}

/// Association name → candidate associations.
///
/// The API has no name filter, so the list is fetched and matched here
/// (case-insensitive substring).
pub struct AssociationsByName {
    api: BureauApi,
    approved_only: bool,
}

impl AssociationsByName {
    pub const fn new(api: BureauApi, approved_only: bool) -> Self {
        Self { api, approved_only }
    }
}

#[async_trait]
impl LookupSource for AssociationsByName {
    async fn lookup(&self, query: &str) -> Result<Vec<LookupEntry>, DispatchError> {
        let needle = query.to_lowercase();
        let mut entries: Vec<_> = self
            .api
            .associations(self.approved_only)
            .await?
            .into_iter()
            .filter(|a| a.nom.to_lowercase().contains(&needle))
            .map(|a| LookupEntry::new(a.nom, a.id))
            .collect();
        sort_by_label(&mut entries);
        Ok(entries)
    }
}

/// Member search by identifier or by name.
///
/// A query shaped like a member identifier searches by login, anything else
/// by name.
pub struct MembersByLoginOrName {
    api: BureauApi,
    prefixes: Vec<char>,
}

impl MembersByLoginOrName {
    pub const fn new(api: BureauApi, prefixes: Vec<char>) -> Self {
        Self { api, prefixes }
    }

    #[must_use]
    pub fn filter_for(&self, query: &str) -> MemberFilter {
        if is_valid_member_identifier(query, &self.prefixes) {
            MemberFilter::Login(query.to_string())
        } else {
            MemberFilter::Name(query.to_string())
        }
    }
}

#[async_trait]
impl LookupSource for MembersByLoginOrName {
    async fn lookup(&self, query: &str) -> Result<Vec<LookupEntry>, DispatchError> {
        let members = self.api.search_members(&self.filter_for(query)).await?;
        let mut entries: Vec<_> = members
            .into_iter()
            .map(|m| {
                let label = m.display_name();
                LookupEntry::new(label, m.id).with_aux(AUX_LOGIN, m.login)
            })
            .collect();
        sort_by_label(&mut entries);
        Ok(entries)
    }
}
