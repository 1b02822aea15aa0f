//! Client SDK for the Gotenberg document-conversion service.
//!
//! Requests go through a [`http::RetryPolicy`] built from [`config::ClientOptions`];
//! [`strings::StringPresence`] classifies optional text values.

pub mod config;
pub mod http;
pub mod strings;

pub use config::{ClientOptions, ConfigError, RetryOptions};
pub use http::{GotenbergClient, RetryPolicy};
pub use strings::StringPresence;
