//! Records returned by the bureau de change API.

use serde::{Deserialize, Serialize};
use serde_aux::prelude::{deserialize_number_from_string, deserialize_string_from_number};

/// A member record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Member {
    #[serde(deserialize_with = "deserialize_string_from_number")]
    pub id: String,
    /// Member identifier (e.g., "E12345")
    pub login: String,
    #[serde(default)]
    pub firstname: String,
    #[serde(default)]
    pub lastname: String,
    /// Company name, set for organisation members
    #[serde(default, alias = "societe")]
    pub company: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub zip: String,
    #[serde(default)]
    pub town: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Member {
    /// Name shown in lists: the company for organisations, otherwise first and last name.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.company.as_deref() {
            Some(company) if self.login.starts_with('Z') && !company.is_empty() => {
                company.to_string()
            }
            _ => format!("{} {}", self.firstname, self.lastname)
                .trim()
                .to_string(),
        }
    }
}

/// A payment mode offered for subscriptions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentMode {
    /// Code sent back on submission (e.g., "Euro-LIQ")
    pub value: String,
    pub label: String,
    #[serde(default)]
    pub cyclos_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Country {
    #[serde(deserialize_with = "deserialize_string_from_number")]
    pub id: String,
    #[serde(default)]
    pub code: String,
    pub label: String,
}

/// A town for a postal code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Town {
    pub zip: String,
    pub town: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Association {
    #[serde(deserialize_with = "deserialize_string_from_number")]
    pub id: String,
    pub nom: String,
    /// Number of sponsoring members
    #[serde(default, deserialize_with = "deserialize_number_from_string")]
    pub nb_parrains: u32,
}
