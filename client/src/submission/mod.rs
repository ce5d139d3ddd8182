//! Form submission.
//!
//! [`SubmissionPipeline::submit`] merges computed fields into the form's
//! values, posts them through the dispatcher and reports the outcome with
//! a timed notification. A success carrying an identifier can schedule a
//! delayed navigation to a follow-on route.

mod notify;
mod payload;
mod pipeline;

pub use notify::{
    ChannelNavigator, ChannelNotifier, Navigator, Notification, NotificationLevel,
    Notifier,
};
pub use payload::{extract_id, follow_on_route, merge};
pub use pipeline::{SubmissionPipeline, SubmissionResult, SubmissionTarget, SubmitError};
