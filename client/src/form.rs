//! Form state and the submit gate.
//!
//! A [`ValidationGate`] owns the ordered [`FormState`] of one form. Every
//! setter revalidates the touched field and republishes the "can submit"
//! flag before returning, so subscribers never observe a stale value.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use tokio::sync::watch;
use validator::ValidationError;

use crate::lookup::LookupEntry;
use crate::validation::{
    validate_custom_amount, validate_email, validate_french_phone, validate_max_length,
    validate_member_identifier,
};

/// Wire format of date fields.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FormError {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("field '{field}' is {origin:?} and cannot be set this way")]
    OriginMismatch { field: String, origin: FieldOrigin },
}

/// How a field gets its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOrigin {
    /// Typed or picked directly; validated by predicates
    Static,
    /// Filled from a resolver selection; valid once something is selected
    Dependent,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldValue {
    #[default]
    Empty,
    Text(String),
    Date(NaiveDate),
    Choice(LookupEntry),
}

impl FieldValue {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Date(_) => false,
            Self::Choice(entry) => entry.value.is_empty(),
        }
    }

    /// Text the predicates run against. Dates have none.
    fn text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Choice(entry) => Some(&entry.value),
            Self::Empty | Self::Date(_) => None,
        }
    }

    /// Submitted form: dates as `DD/MM/YYYY`, choices by value, not label.
    #[must_use]
    pub fn to_json(&self) -> Option<Value> {
        if self.is_empty() {
            return None;
        }
        match self {
            Self::Empty => None,
            Self::Text(s) => Some(Value::String(s.clone())),
            Self::Date(d) => Some(Value::String(d.format(DATE_FORMAT).to_string())),
            Self::Choice(entry) => Some(Value::String(entry.value.clone())),
        }
    }
}

/// A synchronous check on a static field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRule {
    MemberIdentifier(Vec<char>),
    FrenchPhone,
    Email,
    MaxLength(usize),
    /// Only applies to amounts typed by the user; preset choices pass.
    CustomAmount { minimum: u32 },
}

impl FieldRule {
    fn check(&self, value: &FieldValue) -> Result<(), ValidationError> {
        let Some(text) = value.text() else {
            return Ok(());
        };
        match self {
            Self::MemberIdentifier(prefixes) => validate_member_identifier(text, prefixes),
            Self::FrenchPhone => validate_french_phone(text),
            Self::Email => validate_email(text),
            Self::MaxLength(max) => validate_max_length(text, *max),
            Self::CustomAmount { minimum } => match value {
                FieldValue::Choice(entry) if !entry.is_created_from_search() => Ok(()),
                _ => validate_custom_amount(text, *minimum),
            },
        }
    }
}

/// Declaration of one field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub origin: FieldOrigin,
    pub required: bool,
    pub rules: Vec<FieldRule>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            origin: FieldOrigin::Static,
            required: false,
            rules: Vec::new(),
        }
    }

    pub fn dependent(name: impl Into<String>) -> Self {
        Self {
            origin: FieldOrigin::Dependent,
            ..Self::new(name)
        }
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FieldState {
    pub spec: FieldSpec,
    pub value: FieldValue,
    pub valid: bool,
    /// Inline message for the field, if any.
    pub error: Option<ValidationError>,
}

impl FieldState {
    fn new(spec: FieldSpec) -> Self {
        let mut state = Self {
            spec,
            value: FieldValue::Empty,
            valid: false,
            error: None,
        };
        state.revalidate();
        state
    }

    /// An empty field is valid only when optional. Empty fields carry no
    /// inline error; they show up in [`ValidationGate::missing`] instead.
    fn revalidate(&mut self) {
        self.error = None;
        if self.value.is_empty() {
            self.valid = !self.spec.required;
            return;
        }
        match self.spec.origin {
            FieldOrigin::Dependent => self.valid = true,
            FieldOrigin::Static => {
                self.error = self
                    .spec
                    .rules
                    .iter()
                    .find_map(|rule| rule.check(&self.value).err());
                self.valid = self.error.is_none();
            }
        }
    }
}

/// Field name → state, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    fields: Vec<FieldState>,
}

impl FormState {
    pub fn new(specs: impl IntoIterator<Item = FieldSpec>) -> Self {
        Self {
            fields: specs.into_iter().map(FieldState::new).collect(),
        }
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldState> {
        self.fields.iter().find(|f| f.spec.name == name)
    }

    #[must_use]
    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.field(name).map(|f| &f.value)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldState> {
        self.fields.iter()
    }

    /// Every non-empty field in submitted form.
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .filter_map(|f| f.value.to_json().map(|v| (f.spec.name.clone(), v)))
            .collect()
    }

    /// All fields are valid, which covers every required one.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.fields.iter().all(|f| f.valid)
    }

    fn field_mut(&mut self, name: &str) -> Result<&mut FieldState, FormError> {
        self.fields
            .iter_mut()
            .find(|f| f.spec.name == name)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))
    }
}

/// Aggregates field validity into one "can submit" signal.
pub struct ValidationGate {
    form: FormState,
    can_submit: watch::Sender<bool>,
}

impl ValidationGate {
    pub fn new(specs: impl IntoIterator<Item = FieldSpec>) -> Self {
        let form = FormState::new(specs);
        let (can_submit, _) = watch::channel(form.is_valid());
        Self { form, can_submit }
    }

    /// # Errors
    /// `UnknownField`, or `OriginMismatch` for a dependent field.
    pub fn set_text(&mut self, name: &str, text: &str) -> Result<(), FormError> {
        let value = if text.trim().is_empty() {
            FieldValue::Empty
        } else {
            FieldValue::Text(text.to_string())
        };
        self.set(name, FieldOrigin::Static, value)
    }

    /// # Errors
    /// `UnknownField`, or `OriginMismatch` for a dependent field.
    pub fn set_date(&mut self, name: &str, date: NaiveDate) -> Result<(), FormError> {
        self.set(name, FieldOrigin::Static, FieldValue::Date(date))
    }

    /// Pick an option of a static select (country, payment mode, ...).
    ///
    /// # Errors
    /// `UnknownField`, or `OriginMismatch` for a dependent field.
    pub fn set_choice(&mut self, name: &str, entry: LookupEntry) -> Result<(), FormError> {
        self.set(name, FieldOrigin::Static, FieldValue::Choice(entry))
    }

    /// Mirror a resolver selection into a dependent field.
    ///
    /// # Errors
    /// `UnknownField`, or `OriginMismatch` for a static field.
    pub fn set_dependent(
        &mut self,
        name: &str,
        selection: Option<LookupEntry>,
    ) -> Result<(), FormError> {
        let value = selection.map_or(FieldValue::Empty, FieldValue::Choice);
        self.set(name, FieldOrigin::Dependent, value)
    }

    /// # Errors
    /// `UnknownField`.
    pub fn clear(&mut self, name: &str) -> Result<(), FormError> {
        let field = self.form.field_mut(name)?;
        field.value = FieldValue::Empty;
        field.revalidate();
        self.publish();
        Ok(())
    }

    fn set(&mut self, name: &str, origin: FieldOrigin, value: FieldValue) -> Result<(), FormError> {
        let field = self.form.field_mut(name)?;
        if field.spec.origin != origin {
            return Err(FormError::OriginMismatch {
                field: name.to_string(),
                origin: field.spec.origin,
            });
        }
        field.value = value;
        field.revalidate();
        self.publish();
        Ok(())
    }

    fn publish(&self) {
        let valid = self.form.is_valid();
        self.can_submit.send_if_modified(|current| {
            if *current == valid {
                return false;
            }
            tracing::debug!(can_submit = valid, "Submit gate changed");
            *current = valid;
            true
        });
    }

    #[must_use]
    pub fn can_submit(&self) -> bool {
        *self.can_submit.borrow()
    }

    /// Receiver notified on every flip of the "can submit" flag.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.can_submit.subscribe()
    }

    #[must_use]
    pub const fn form(&self) -> &FormState {
        &self.form
    }

    /// Inline validation messages, by field.
    #[must_use]
    pub fn errors(&self) -> Vec<(String, ValidationError)> {
        self.form
            .fields()
            .filter_map(|f| f.error.clone().map(|e| (f.spec.name.clone(), e)))
            .collect()
    }

    /// Required fields still empty.
    #[must_use]
    pub fn missing(&self) -> Vec<String> {
        self.form
            .fields()
            .filter(|f| f.spec.required && f.value.is_empty())
            .map(|f| f.spec.name.clone())
            .collect()
    }
}
