use chrono::NaiveDate;
use serde_json::{Map, Value};

use crate::api::{BureauApi, Country, MEMBERS};
use crate::config::Config;
use crate::dispatch::DispatchError;
use crate::form::{FieldRule, FieldSpec, FormError, ValidationGate};
use crate::lookup::{
    AssociationsByName, LookupEntry, Resolver, SearchOutcome, TownsByZip, ZipTownCascade,
};
use crate::submission::{SubmissionPipeline, SubmissionResult, SubmissionTarget, SubmitError};

pub const LOGIN: &str = "login";
pub const CIVILITY: &str = "civility_id";
pub const LASTNAME: &str = "lastname";
pub const FIRSTNAME: &str = "firstname";
pub const BIRTH: &str = "birth";
pub const ADDRESS: &str = "address";
pub const ZIP: &str = "zip";
pub const TOWN: &str = "town";
pub const COUNTRY: &str = "country_id";
pub const PHONE: &str = "phone";
pub const EMAIL: &str = "email";
pub const NEWSLETTER: &str = "options_recevoir_actus";

/// Submitted when the association was picked from the list.
pub const ASSOCIATION_ID: &str = "fk_asso";
/// Submitted when the association name was typed freely.
pub const ASSOCIATION_FREE_TEXT: &str = "options_asso_saisie_libre";

const NAME_MAX_LEN: usize = 50;
const LONG_TEXT_MAX_LEN: usize = 255;

/// Civility options, `(value, label)`.
pub const CIVILITIES: [(&str, &str); 2] = [("MR", "Monsieur"), ("MME", "Madame")];

/// Member creation: static identity fields, the postal code → town cascade
/// gated on the country, and an optional sponsored association.
pub struct MemberCreationForm {
    api: BureauApi,
    default_country: String,
    follow_on: String,
    gate: ValidationGate,
    countries: Vec<Country>,
    zip_town: ZipTownCascade<TownsByZip>,
    association: Resolver<AssociationsByName>,
}

impl MemberCreationForm {
    pub fn new(api: BureauApi, config: &Config) -> Self {
        let prefixes = config.forms.prefix_chars();
        let gate = ValidationGate::new([
            FieldSpec::new(LOGIN)
                .required()
                .rule(FieldRule::MemberIdentifier(prefixes)),
            FieldSpec::new(CIVILITY).required(),
            FieldSpec::new(LASTNAME)
                .required()
                .rule(FieldRule::MaxLength(NAME_MAX_LEN)),
            FieldSpec::new(FIRSTNAME)
                .required()
                .rule(FieldRule::MaxLength(NAME_MAX_LEN)),
            FieldSpec::new(BIRTH).required(),
            FieldSpec::new(ADDRESS)
                .required()
                .rule(FieldRule::MaxLength(LONG_TEXT_MAX_LEN)),
            FieldSpec::dependent(ZIP).required(),
            FieldSpec::dependent(TOWN).required(),
            FieldSpec::new(COUNTRY).required(),
            FieldSpec::new(PHONE).rule(FieldRule::FrenchPhone),
            FieldSpec::new(EMAIL)
                .required()
                .rule(FieldRule::MaxLength(LONG_TEXT_MAX_LEN))
                .rule(FieldRule::Email),
            FieldSpec::new(NEWSLETTER).required(),
        ]);
        let min_len = config.lookup.min_query_len;

        Self {
            zip_town: ZipTownCascade::new(TownsByZip::new(api.clone()), min_len),
            association: Resolver::new(AssociationsByName::new(api.clone(), false), min_len),
            api,
            default_country: config.forms.default_country.clone(),
            follow_on: config.navigation.member_follow_on.clone(),
            gate,
            countries: Vec::new(),
        }
    }

    /// Load the country list and preselect the default country.
    ///
    /// # Errors
    /// Propagates the `DispatchError` of the country request.
    pub async fn mount(&mut self) -> Result<(), DispatchError> {
        self.countries = self.api.countries().await?;
        if let Some(id) = self.default_country_id() {
            if let Err(e) = self.select_country(&id) {
                tracing::warn!(error = %e, "Could not preselect default country");
            }
        } else {
            tracing::warn!(country = %self.default_country, "Default country missing from country list");
        }
        Ok(())
    }

    fn default_country_id(&self) -> Option<String> {
        self.countries
            .iter()
            .find(|c| c.label.eq_ignore_ascii_case(&self.default_country))
            .map(|c| c.id.clone())
    }

    #[must_use]
    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    /// Choose a country by id. The postal-code lookup only runs for the
    /// default country; changing country drops the current zip and town.
    ///
    /// # Errors
    /// `UnknownField` when `id` is not in the loaded list.
    pub fn select_country(&mut self, id: &str) -> Result<(), FormError> {
        let country = self
            .countries
            .iter()
            .find(|c| c.id == id)
            .ok_or_else(|| FormError::UnknownField(format!("{COUNTRY}={id}")))?;
        let is_default = country.label.eq_ignore_ascii_case(&self.default_country);
        let entry = LookupEntry::new(country.label.clone(), country.id.clone());

        let changed = self
            .gate
            .form()
            .value(COUNTRY)
            .is_some_and(|v| v.to_json() != Some(Value::String(id.to_string())));
        self.gate.set_choice(COUNTRY, entry)?;
        self.zip_town.set_default_country(is_default);
        if changed {
            self.zip_town.clear();
            self.sync_zip_town()?;
        }
        Ok(())
    }

    /// # Errors
    /// `UnknownField` for a name that is not a static text field of this form.
    pub fn set_text(&mut self, name: &str, text: &str) -> Result<(), FormError> {
        self.gate.set_text(name, text)
    }

    /// # Errors
    /// Never in practice; the birth field always exists.
    pub fn set_birth(&mut self, date: NaiveDate) -> Result<(), FormError> {
        self.gate.set_date(BIRTH, date)
    }

    /// # Errors
    /// `UnknownField` for a civility value not in [`CIVILITIES`].
    pub fn set_civility(&mut self, value: &str) -> Result<(), FormError> {
        let (value, label) = CIVILITIES
            .iter()
            .find(|(v, _)| *v == value)
            .ok_or_else(|| FormError::UnknownField(format!("{CIVILITY}={value}")))?;
        self.gate.set_choice(CIVILITY, LookupEntry::new(*label, *value))
    }

    /// # Errors
    /// Never in practice; the newsletter field always exists.
    pub fn set_newsletter(&mut self, subscribe: bool) -> Result<(), FormError> {
        let (label, value) = if subscribe { ("Yes", "1") } else { ("No", "0") };
        self.gate.set_choice(NEWSLETTER, LookupEntry::new(label, value))
    }

    /// # Errors
    /// Propagates the lookup's `DispatchError`.
    pub async fn search_zip(&self, text: &str) -> Result<SearchOutcome, DispatchError> {
        self.zip_town.search_zip(text).await
    }

    #[must_use]
    pub const fn zip_town(&self) -> &ZipTownCascade<TownsByZip> {
        &self.zip_town
    }

    /// Pick a postal-code result by label; fills the town too.
    ///
    /// # Errors
    /// Never in practice; zip and town always exist.
    pub fn select_zip(&mut self, label: &str) -> Result<Option<LookupEntry>, FormError> {
        let entry = self.zip_town.select_zip(label);
        self.sync_zip_town()?;
        Ok(entry)
    }

    /// # Errors
    /// Never in practice; zip and town always exist.
    pub fn select_town(&mut self, value: &str) -> Result<Option<LookupEntry>, FormError> {
        let entry = self.zip_town.select_town(value);
        self.sync_zip_town()?;
        Ok(entry)
    }

    /// Free-text postal code, for countries without lookup.
    ///
    /// # Errors
    /// Never in practice; zip and town always exist.
    pub fn enter_zip(&mut self, text: &str) -> Result<Option<LookupEntry>, FormError> {
        let entry = self.zip_town.enter_zip(text);
        self.sync_zip_town()?;
        Ok(entry)
    }

    /// Free-text town, for countries without lookup.
    ///
    /// # Errors
    /// Never in practice; zip and town always exist.
    pub fn enter_town(&mut self, text: &str) -> Result<Option<LookupEntry>, FormError> {
        let entry = self.zip_town.enter_town(text);
        self.sync_zip_town()?;
        Ok(entry)
    }

    fn sync_zip_town(&mut self) -> Result<(), FormError> {
        self.gate.set_dependent(ZIP, self.zip_town.zip())?;
        self.gate.set_dependent(TOWN, self.zip_town.town())
    }

    /// # Errors
    /// Propagates the lookup's `DispatchError`.
    pub async fn search_association(&self, text: &str) -> Result<SearchOutcome, DispatchError> {
        self.association.search(text).await
    }

    #[must_use]
    pub const fn association(&self) -> &Resolver<AssociationsByName> {
        &self.association
    }

    pub fn select_association(&self, id: &str) -> Option<LookupEntry> {
        self.association.select(id)
    }

    /// Sponsor an association that is not in the list yet.
    pub fn create_association(&self, name: &str) -> Option<LookupEntry> {
        self.association.create_from_search(name)
    }

    #[must_use]
    pub const fn gate(&self) -> &ValidationGate {
        &self.gate
    }

    /// Fields derived at submit time: the association goes out either as a
    /// foreign key or as free text.
    #[must_use]
    pub fn computed(&self) -> Map<String, Value> {
        let mut computed = Map::new();
        if let Some(association) = self.association.selection() {
            let key = if association.is_created_from_search() {
                ASSOCIATION_FREE_TEXT
            } else {
                ASSOCIATION_ID
            };
            computed.insert(key.to_string(), Value::String(association.value));
        }
        computed
    }

    #[must_use]
    pub fn target(&self) -> SubmissionTarget {
        SubmissionTarget::new(MEMBERS)
            .with_follow_on(self.follow_on.clone())
            .with_messages(
                "Member created.",
                "The member could not be created. Please try again.",
            )
    }

    /// # Errors
    /// `NotReady` while the gate is closed.
    pub async fn submit(
        &self,
        pipeline: &SubmissionPipeline,
    ) -> Result<SubmissionResult, SubmitError> {
        pipeline
            .submit(&self.target(), &self.gate, self.computed())
            .await
    }
}
