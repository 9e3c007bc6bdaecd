//! Browser-less form submission session
//!
//! Drives an interactive login the way a browser would, minus the browser:
//! GET the protected resource, receive a login form somewhere down the
//! redirect chain, fill in credentials, POST the form back on the same
//! cookie-bearing client. Each session owns a fresh cookie store, so
//! concurrent flow runs and different identity providers never
//! cross-contaminate each other's sessions.

use log::debug;
use reqwest::Method;
use url::Url;

use crate::error::{FatalError, SessionError};
use crate::forms::{extract_login_form, FormField, LoginForm};

/// A login form fetched from a protected resource, plus the URL the fetch
/// finally landed on (the base for resolving a relative form action).
#[derive(Debug)]
pub struct FetchedForm {
    pub form: LoginForm,
    pub fields: Vec<FormField>,
    pub base: Url,
}

/// Outcome of one form submission round-trip.
#[derive(Debug)]
pub struct SubmittedForm {
    pub status: u16,
    pub body: String,
    pub final_url: Url,
}

/// HTTP session with persistent cookies for one authorization-code flow
/// attempt. Not shared across grant types or concurrent runs.
pub struct FormSession {
    client: reqwest::Client,
}

impl FormSession {
    /// Create a session with a fresh cookie store.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::HttpClient`] if the client cannot be built;
    /// this aborts the run rather than failing a single step.
    pub fn new() -> Result<Self, FatalError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .map_err(FatalError::HttpClient)?;
        Ok(Self { client })
    }

    /// GET `url`, follow redirects, and extract the login form from the
    /// final response body.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] on network failure and
    /// [`SessionError::NoFormFound`] when the final page has no form.
    pub async fn fetch_form(&self, url: &str) -> Result<FetchedForm, SessionError> {
        let response = self.client.get(url).send().await?;
        // The authorization endpoint may itself redirect to a login host;
        // the form action is relative to wherever we finally landed.
        let base = response.url().clone();
        let body = response.text().await?;
        debug!("fetched login page from {base}");

        let (form, fields) = extract_login_form(&body)?;
        Ok(FetchedForm { form, fields, base })
    }

    /// POST the filled fields as a URL-encoded form body, with the method
    /// taken from the form (uppercased) and a relative action resolved
    /// against `base`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidActionUrl`] when the action cannot be
    /// resolved and [`SessionError::Transport`] on network failure.
    pub async fn submit_form(
        &self,
        base: &Url,
        form: &LoginForm,
        fields: &[FormField],
    ) -> Result<SubmittedForm, SessionError> {
        let action_url = base.join(&form.action)?;
        // Login forms without a method attribute post back.
        let method = Method::from_bytes(form.method.to_uppercase().as_bytes())
            .unwrap_or(Method::POST);
        debug!("submitting login form: {method} {action_url}");

        let pairs: Vec<(&str, &str)> = fields
            .iter()
            .map(|field| (field.name.as_str(), field.value.as_str()))
            .collect();

        let response = self
            .client
            .request(method, action_url)
            .form(&pairs)
            .send()
            .await?;

        let status = response.status().as_u16();
        let final_url = response.url().clone();
        let body = response.text().await?;
        Ok(SubmittedForm {
            status,
            body,
            final_url,
        })
    }

    /// One full login round-trip: fetch the form at `start_url`, overlay
    /// `credentials`, submit.
    ///
    /// # Errors
    ///
    /// Returns any [`SessionError`] raised by fetching, credential overlay,
    /// or submission.
    pub async fn login(
        &self,
        start_url: &str,
        credentials: &[(&str, &str)],
    ) -> Result<SubmittedForm, SessionError> {
        let fetched = self.fetch_form(start_url).await?;
        let fields = overlay_credentials(fetched.fields, credentials)?;
        self.submit_form(&fetched.base, &fetched.form, &fields).await
    }

    /// Extract the form contained in a previous submission's response body
    /// and resubmit it unchanged. Used for the federated provider's
    /// auto-post-back form, which carries the SAML response in hidden
    /// fields.
    ///
    /// # Errors
    ///
    /// Returns any [`SessionError`] raised by extraction or submission.
    pub async fn resubmit_body_form(
        &self,
        previous: &SubmittedForm,
    ) -> Result<SubmittedForm, SessionError> {
        let (form, fields) = extract_login_form(&previous.body)?;
        self.submit_form(&previous.final_url, &form, &fields).await
    }
}

/// Overlay credential values onto extracted form fields by exact,
/// case-sensitive name match. Unmatched extracted fields keep their default
/// values, so hidden CSRF and state tokens are forwarded unchanged.
///
/// # Errors
///
/// Returns [`SessionError::FieldsNotFound`] when any credential name matched
/// no extracted field: form schema drift must never silently authenticate
/// with empty credentials.
pub fn overlay_credentials(
    mut fields: Vec<FormField>,
    credentials: &[(&str, &str)],
) -> Result<Vec<FormField>, SessionError> {
    let mut missing: Vec<&str> = Vec::new();
    for (name, value) in credentials {
        let mut matched = false;
        for field in &mut fields {
            if field.name == *name {
                field.value = (*value).to_string();
                matched = true;
            }
        }
        if !matched {
            missing.push(name);
        }
    }
    if missing.is_empty() {
        Ok(fields)
    } else {
        Err(SessionError::FieldsNotFound {
            names: missing.join(", "),
        })
    }
}
