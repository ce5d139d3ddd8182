#![deny(
    clippy::expect_used,
    clippy::panic,
    clippy::print_stdout,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used
)]

pub mod api;
pub mod config;
pub mod dispatch;
pub mod form;
pub mod forms;
pub mod lookup;
pub mod session;
pub mod submission;
pub mod validation;
