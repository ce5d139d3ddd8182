//! Dependent-field lookups.
//!
//! A [`Resolver`] turns keystrokes in one field into remote lookups and
//! exposes the results as a sorted list of [`LookupEntry`] values. Sources
//! adapt the API to [`LookupSource`]; [`ZipTownCascade`] chains the postal
//! code and town fields.

mod cascade;
mod resolver;
mod sources;
mod types;

pub use cascade::ZipTownCascade;
pub use resolver::{LookupSource, Resolver, DEFAULT_MIN_QUERY_LEN};
pub use sources::{AssociationsByName, MembersByLoginOrName, TownsByZip, AUX_LOGIN, AUX_TOWN};
pub use types::{
    sort_by_label, Hint, LookupEntry, ResolverSnapshot, ResolverState, SearchOutcome,
    CREATED_FROM_SEARCH,
};
