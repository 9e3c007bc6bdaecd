#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the sso-smoketest application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod browser;
pub mod directory;
pub mod error;
pub mod flow;
pub mod forms;
pub mod grants;
pub mod models;
pub mod settings;

/// Re-export commonly used items
pub use error::{FatalError, SessionError};
pub use flow::FlowRunner;
pub use models::{FlowReport, StepResult, TokenResponse};
pub use settings::SmokeSettings;
