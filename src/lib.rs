//! Client integration layer for the Chama 365 portal: session handling,
//! profile and document management, subscription checkout and payment
//! confirmation.

pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{ErrorCode, PortalError, Result};
