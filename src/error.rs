//! Error taxonomy for the verification flow
//!
//! Two tiers: `SessionError` covers everything that makes a single
//! verification step fail (transport failures, missing login forms, form
//! schema drift) and is always converted into a recorded [`StepResult`].
//! `FatalError` covers local invariant violations (an HTTP client that cannot
//! be built, serialization of a known-good struct failing) that abort the
//! whole run instead of producing a step outcome.
//!
//! [`StepResult`]: crate::models::StepResult

use thiserror::Error;

/// Failures of one browser-less login attempt or token request.
///
/// Every variant maps to a failed step in the flow report; none of them
/// aborts the run.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Network-level failure: connection refused, timeout, TLS error.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The fetched page contains no `<form>` element.
    #[error("no login form found in response document")]
    NoFormFound,

    /// None of the extracted input fields matched a credential name. Without
    /// this check a renamed username field would submit empty credentials
    /// and the failure would surface much later, as a confusing 401.
    #[error("login form fields not found: {names}")]
    FieldsNotFound { names: String },

    /// The form action could not be resolved into an absolute URL.
    #[error("invalid form action URL: {0}")]
    InvalidActionUrl(#[from] url::ParseError),
}

/// Unrecoverable local failures that abort the current run.
///
/// These are distinct from the per-step failure path: a `FatalError` means
/// the process could not even construct a valid request from validated
/// configuration, which valid input is expected never to trigger.
#[derive(Debug, Error)]
pub enum FatalError {
    /// The cookie-bearing HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// A known-good request body failed to serialize.
    #[error("failed to serialize request body: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A configured endpoint URL is not a valid URL.
    #[error("invalid configured URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
