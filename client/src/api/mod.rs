//! Typed wrappers over the read endpoints of the API.
//!
//! Every call goes through a [`Dispatcher`](crate::dispatch::Dispatcher), so
//! the same code runs against [`HttpDispatcher`](crate::dispatch::HttpDispatcher)
//! or the mock.

mod client;
mod types;

pub use client::{
    BureauApi, MemberFilter, ASSOCIATIONS, COUNTRIES, MEMBERS, MEMBER_SUBSCRIPTIONS,
    PAYMENT_MODES, TOWNS,
};
pub use types::{Association, Country, Member, PaymentMode, Town};
