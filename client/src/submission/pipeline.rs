use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;

use super::notify::{Navigator, Notification, Notifier};
use super::payload::{extract_id, follow_on_route, merge};
use crate::config::{NavigationConfig, NotificationConfig};
use crate::dispatch::{Dispatcher, Method};
use crate::form::ValidationGate;

/// Refusal to submit; nothing was sent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("form is not ready, invalid fields: {}", .fields.join(", "))]
    NotReady { fields: Vec<String> },
}

/// Outcome of one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResult {
    /// `id` is absent when the response carried none.
    Success { id: Option<String> },
    Failure { status: Option<u16>, message: String },
}

impl SubmissionResult {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Where a form is posted and what happens afterwards.
#[derive(Debug, Clone)]
pub struct SubmissionTarget {
    pub path: String,
    /// Key of the identifier in an object response
    pub id_field: String,
    /// Route template with `{id}`, followed after a delay on success
    pub follow_on: Option<String>,
    pub success_message: String,
    pub error_message: String,
}

impl SubmissionTarget {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            id_field: "id".to_string(),
            follow_on: None,
            success_message: "Saved.".to_string(),
            error_message: "Something went wrong. Please try again.".to_string(),
        }
    }

    #[must_use]
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = field.into();
        self
    }

    #[must_use]
    pub fn with_follow_on(mut self, template: impl Into<String>) -> Self {
        self.follow_on = Some(template.into());
        self
    }

    #[must_use]
    pub fn with_messages(mut self, success: impl Into<String>, error: impl Into<String>) -> Self {
        self.success_message = success.into();
        self.error_message = error.into();
        self
    }
}

/// Posts a validated form and turns the outcome into notifications.
pub struct SubmissionPipeline {
    dispatcher: Arc<dyn Dispatcher>,
    notifier: Arc<dyn Notifier>,
    navigator: Arc<dyn Navigator>,
    notifications: NotificationConfig,
    navigation_delay: Duration,
}

impl SubmissionPipeline {
    pub fn new(
        dispatcher: Arc<dyn Dispatcher>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
        notifications: NotificationConfig,
        navigation: &NavigationConfig,
    ) -> Self {
        Self {
            dispatcher,
            notifier,
            navigator,
            notifications,
            navigation_delay: Duration::from_millis(navigation.delay_ms),
        }
    }

    /// Submit the form behind `gate` to `target`.
    ///
    /// Dispatch failures are not errors here: they become a
    /// [`SubmissionResult::Failure`] plus one generic error notification,
    /// and the gate is left as it was so the user can resubmit.
    ///
    /// # Errors
    /// `NotReady` when the gate is closed; no request is made.
    pub async fn submit(
        &self,
        target: &SubmissionTarget,
        gate: &ValidationGate,
        computed: Map<String, Value>,
    ) -> Result<SubmissionResult, SubmitError> {
        if !gate.can_submit() {
            let fields = gate
                .form()
                .fields()
                .filter(|f| !f.valid)
                .map(|f| f.spec.name.clone())
                .collect();
            return Err(SubmitError::NotReady { fields });
        }

        let payload = Value::Object(merge(gate.form(), computed));
        match self
            .dispatcher
            .dispatch(&target.path, Method::Post, Some(&payload))
            .await
        {
            Ok(body) => {
                let id = extract_id(&body, &target.id_field);
                tracing::info!(path = %target.path, id = ?id, "Submission succeeded");
                self.notifier
                    .notify(Notification::success(&target.success_message, &self.notifications));

                if let (Some(id), Some(template)) = (&id, &target.follow_on) {
                    self.schedule_navigation(follow_on_route(template, id));
                }
                Ok(SubmissionResult::Success { id })
            }
            Err(e) => {
                tracing::error!(path = %target.path, error = %e, "Submission failed");
                self.notifier
                    .notify(Notification::error(&target.error_message, &self.notifications));
                Ok(SubmissionResult::Failure {
                    status: e.status(),
                    message: e.to_string(),
                })
            }
        }
    }

    fn schedule_navigation(&self, route: String) {
        let navigator = Arc::clone(&self.navigator);
        let delay = self.navigation_delay;
        tracing::debug!(%route, ?delay, "Scheduling follow-on navigation");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.navigate(&route);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::mock::MockDispatcher;
    use crate::dispatch::DispatchError;
    use crate::form::FieldSpec;
    use crate::submission::notify::{ChannelNavigator, ChannelNotifier, NotificationLevel};
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Harness {
        mock: Arc<MockDispatcher>,
        pipeline: SubmissionPipeline,
        notifications: UnboundedReceiver<Notification>,
        routes: UnboundedReceiver<String>,
    }

    fn harness() -> Harness {
        let mock = Arc::new(MockDispatcher::new());
        let (notifier, notifications) = ChannelNotifier::new();
        let (navigator, routes) = ChannelNavigator::new();
        let pipeline = SubmissionPipeline::new(
            Arc::clone(&mock) as Arc<dyn Dispatcher>,
            Arc::new(notifier),
            Arc::new(navigator),
            NotificationConfig {
                display_ms: 5000,
                extended_ms: 10000,
            },
            &NavigationConfig {
                delay_ms: 3000,
                member_follow_on: "/members/subscription/add/{id}".into(),
            },
        );
        Harness {
            mock,
            pipeline,
            notifications,
            routes,
        }
    }

    fn ready_gate() -> ValidationGate {
        let mut gate = ValidationGate::new([FieldSpec::new("lastname").required()]);
        gate.set_text("lastname", "Etxeberri").unwrap();
        gate
    }

    #[tokio::test]
    async fn closed_gate_sends_nothing() {
        let h = harness();
        let gate = ValidationGate::new([FieldSpec::new("lastname").required()]);

        let err = h
            .pipeline
            .submit(&SubmissionTarget::new("members/"), &gate, Map::new())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            SubmitError::NotReady {
                fields: vec!["lastname".into()]
            }
        );
        assert!(h.mock.calls().is_empty());
    }

    #[tokio::test]
    async fn failure_notifies_once_and_keeps_gate_open() {
        let mut h = harness();
        h.mock.push(
            Method::Post,
            "members/",
            Err(DispatchError::Status {
                code: 500,
                message: "Internal Server Error".into(),
            }),
        );
        let gate = ready_gate();

        let result = h
            .pipeline
            .submit(&SubmissionTarget::new("members/"), &gate, Map::new())
            .await
            .unwrap();

        assert!(matches!(
            result,
            SubmissionResult::Failure {
                status: Some(500),
                ..
            }
        ));
        let n = h.notifications.try_recv().unwrap();
        assert_eq!(n.level, NotificationLevel::Error);
        assert!(!n.message.contains("500"));
        assert!(h.notifications.try_recv().is_err());
        assert!(gate.can_submit());
    }

    #[tokio::test(start_paused = true)]
    async fn success_with_id_navigates_after_delay() {
        let mut h = harness();
        h.mock.push_post("members/", json!(42));
        let target =
            SubmissionTarget::new("members/").with_follow_on("/members/subscription/add/{id}");

        let result = h
            .pipeline
            .submit(&target, &ready_gate(), Map::new())
            .await
            .unwrap();
        assert_eq!(
            result,
            SubmissionResult::Success {
                id: Some("42".into())
            }
        );
        assert_eq!(
            h.notifications.try_recv().unwrap().level,
            NotificationLevel::Success
        );

        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_millis(2999)).await;
        assert!(h.routes.try_recv().is_err());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(
            h.routes.recv().await.unwrap(),
            "/members/subscription/add/42"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn success_without_id_skips_navigation() {
        let mut h = harness();
        h.mock.push_post("members-subscriptions/", json!({"status": "ok"}));
        let target = SubmissionTarget::new("members-subscriptions/")
            .with_id_field("id_subscription")
            .with_follow_on("/next/{id}");

        let result = h
            .pipeline
            .submit(&target, &ready_gate(), Map::new())
            .await
            .unwrap();

        assert_eq!(result, SubmissionResult::Success { id: None });
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(h.routes.try_recv().is_err());
    }

    #[tokio::test]
    async fn payload_is_posted_with_computed_fields() {
        let h = harness();
        h.mock.push_post("members/", json!({"id": 3}));
        let mut computed = Map::new();
        computed.insert("fk_asso".into(), json!("12"));

        h.pipeline
            .submit(&SubmissionTarget::new("members/"), &ready_gate(), computed)
            .await
            .unwrap();

        let calls = h.mock.calls_to("members/");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::Post);
        assert_eq!(
            calls[0].body,
            Some(json!({"lastname": "Etxeberri", "fk_asso": "12"}))
        );
    }
}
