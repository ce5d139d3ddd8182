use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::types::{Association, Country, Member, PaymentMode, Town};
use crate::dispatch::{DispatchError, Dispatcher, Method};

pub const MEMBERS: &str = "members/";
pub const MEMBER_SUBSCRIPTIONS: &str = "members-subscriptions/";
pub const PAYMENT_MODES: &str = "payment-modes/";
pub const COUNTRIES: &str = "countries/";
pub const TOWNS: &str = "towns/";
pub const ASSOCIATIONS: &str = "associations/";

/// How the member list is filtered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberFilter {
    /// Exact member identifier
    Login(String),
    /// Free-text name search
    Name(String),
}

/// Typed read access to the API, on top of any [`Dispatcher`].
#[derive(Clone)]
pub struct BureauApi {
    dispatcher: Arc<dyn Dispatcher>,
}

impl BureauApi {
    pub fn new(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self { dispatcher }
    }

    #[must_use]
    pub fn dispatcher(&self) -> Arc<dyn Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, DispatchError> {
        let value = self.dispatcher.dispatch(url, Method::Get, None).await?;
        decode(value)
    }

    /// # Errors
    /// Propagates any `DispatchError`; a body that is not a member is a `Parse` error.
    pub async fn member(&self, id: &str) -> Result<Member, DispatchError> {
        self.get(&format!("{MEMBERS}{}/", urlencoding::encode(id)))
            .await
    }

    /// # Errors
    /// Propagates any `DispatchError`.
    pub async fn search_members(&self, filter: &MemberFilter) -> Result<Vec<Member>, DispatchError> {
        let url = match filter {
            MemberFilter::Login(login) => format!("{MEMBERS}?login={}", urlencoding::encode(login)),
            MemberFilter::Name(name) => format!("{MEMBERS}?name={}", urlencoding::encode(name)),
        };
        self.get(&url).await
    }

    /// # Errors
    /// Propagates any `DispatchError`.
    pub async fn payment_modes(&self) -> Result<Vec<PaymentMode>, DispatchError> {
        self.get(PAYMENT_MODES).await
    }

    /// # Errors
    /// Propagates any `DispatchError`.
    pub async fn countries(&self) -> Result<Vec<Country>, DispatchError> {
        self.get(COUNTRIES).await
    }

    /// Towns sharing a postal code.
    ///
    /// # Errors
    /// Propagates any `DispatchError`.
    pub async fn towns(&self, zipcode: &str) -> Result<Vec<Town>, DispatchError> {
        self.get(&format!("{TOWNS}?zipcode={}", urlencoding::encode(zipcode)))
            .await
    }

    /// All associations, or only those with enough sponsors.
    ///
    /// # Errors
    /// Propagates any `DispatchError`.
    pub async fn associations(&self, approved_only: bool) -> Result<Vec<Association>, DispatchError> {
        if approved_only {
            self.get(&format!("{ASSOCIATIONS}?approved=yes")).await
        } else {
            self.get(ASSOCIATIONS).await
        }
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, DispatchError> {
    serde_json::from_value(value).map_err(|e| DispatchError::Parse(e.to_string()))
}
