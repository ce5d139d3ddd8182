//! Form controllers.
//!
//! Each controller owns a [`ValidationGate`](crate::form::ValidationGate)
//! and the resolvers feeding its dependent fields, and knows where its
//! payload is posted.

pub mod member;
pub mod subscription;

pub use member::MemberCreationForm;
pub use subscription::SubscriptionForm;
