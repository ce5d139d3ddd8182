use serde_json::{Map, Value};

use crate::api::{BureauApi, Member, PaymentMode, MEMBER_SUBSCRIPTIONS};
use crate::config::Config;
use crate::dispatch::DispatchError;
use crate::form::{FieldRule, FieldSpec, FieldValue, FormError, ValidationGate};
use crate::lookup::LookupEntry;
use crate::submission::{SubmissionPipeline, SubmissionResult, SubmissionTarget, SubmitError};

pub const MEMBER_ID: &str = "member_id";
pub const AMOUNT: &str = "amount";
pub const PAYMENT_MODE: &str = "payment_mode";
pub const CYCLOS_PAYMENT_MODE: &str = "cyclos_id_payment_mode";

/// Amounts offered in the list; anything else is a custom amount.
pub const PRESET_AMOUNTS: [u32; 3] = [5, 10, 20];

const AUX_CYCLOS_ID: &str = "cyclos_id";

/// Subscription of an existing member.
pub struct SubscriptionForm {
    api: BureauApi,
    gate: ValidationGate,
    member: Option<Member>,
    payment_modes: Vec<PaymentMode>,
}

impl SubscriptionForm {
    pub fn new(api: BureauApi, config: &Config) -> Self {
        let gate = ValidationGate::new([
            FieldSpec::new(MEMBER_ID).required(),
            FieldSpec::new(AMOUNT)
                .required()
                .rule(FieldRule::CustomAmount {
                    minimum: config.forms.minimum_custom_amount,
                }),
            FieldSpec::new(PAYMENT_MODE).required(),
        ]);
        Self {
            api,
            gate,
            member: None,
            payment_modes: Vec::new(),
        }
    }

    /// Load the member being subscribed and the payment modes.
    ///
    /// # Errors
    /// Propagates the first failing request's `DispatchError`.
    pub async fn mount(&mut self, member_id: &str) -> Result<(), DispatchError> {
        let member = self.api.member(member_id).await?;
        self.payment_modes = self.api.payment_modes().await?;
        if let Err(e) = self.gate.set_text(MEMBER_ID, &member.id) {
            tracing::warn!(error = %e, "Could not set member id");
        }
        self.member = Some(member);
        Ok(())
    }

    #[must_use]
    pub const fn member(&self) -> Option<&Member> {
        self.member.as_ref()
    }

    #[must_use]
    pub fn payment_modes(&self) -> &[PaymentMode] {
        &self.payment_modes
    }

    /// The preset amounts as selectable entries.
    #[must_use]
    pub fn amount_options() -> Vec<LookupEntry> {
        PRESET_AMOUNTS
            .iter()
            .map(|a| LookupEntry::new(format!("{a} €"), a.to_string()))
            .collect()
    }

    /// # Errors
    /// `UnknownField` when `value` is not a preset amount.
    pub fn select_amount(&mut self, value: &str) -> Result<(), FormError> {
        let entry = Self::amount_options()
            .into_iter()
            .find(|e| e.value == value)
            .ok_or_else(|| FormError::UnknownField(format!("{AMOUNT}={value}")))?;
        self.gate.set_choice(AMOUNT, entry)
    }

    /// A typed amount; valid when all digits and at least the configured minimum.
    ///
    /// # Errors
    /// Never in practice; the amount field always exists.
    pub fn enter_custom_amount(&mut self, text: &str) -> Result<(), FormError> {
        let text = text.trim();
        if text.is_empty() {
            return self.gate.clear(AMOUNT);
        }
        self.gate.set_choice(AMOUNT, LookupEntry::from_search(text))
    }

    /// # Errors
    /// `UnknownField` when `value` is not a loaded payment mode.
    pub fn select_payment_mode(&mut self, value: &str) -> Result<(), FormError> {
        let mode = self
            .payment_modes
            .iter()
            .find(|m| m.value == value)
            .ok_or_else(|| FormError::UnknownField(format!("{PAYMENT_MODE}={value}")))?;
        let entry = LookupEntry::new(mode.label.clone(), mode.value.clone())
            .with_aux(AUX_CYCLOS_ID, mode.cyclos_id.clone());
        self.gate.set_choice(PAYMENT_MODE, entry)
    }

    #[must_use]
    pub const fn gate(&self) -> &ValidationGate {
        &self.gate
    }

    /// The payment mode also goes out under its Cyclos id.
    #[must_use]
    pub fn computed(&self) -> Map<String, Value> {
        let mut computed = Map::new();
        let cyclos_id = self
            .gate
            .form()
            .field(PAYMENT_MODE)
            .and_then(|f| match &f.value {
                FieldValue::Choice(entry) => entry.aux(AUX_CYCLOS_ID).map(str::to_string),
                _ => None,
            });
        if let Some(id) = cyclos_id {
            computed.insert(CYCLOS_PAYMENT_MODE.to_string(), Value::String(id));
        }
        computed
    }

    #[must_use]
    pub fn target() -> SubmissionTarget {
        SubmissionTarget::new(MEMBER_SUBSCRIPTIONS)
            .with_id_field("id_subscription")
            .with_messages(
                "Subscription recorded.",
                "The subscription could not be recorded. Please try again.",
            )
    }

    /// # Errors
    /// `NotReady` while the gate is closed.
    pub async fn submit(
        &self,
        pipeline: &SubmissionPipeline,
    ) -> Result<SubmissionResult, SubmitError> {
        pipeline
            .submit(&Self::target(), &self.gate, self.computed())
            .await
    }
}
