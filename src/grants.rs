//! OAuth2 grant executors
//!
//! One executor per supported grant type: client credentials and resource
//! owner password against the token endpoint, plus two scripted
//! authorization-code logins (direct against the primary provider, and
//! federated through the ADFS login + auto-post-back chain). Every executor
//! returns the token alongside a [`StepResult`]; failures are recorded, not
//! raised, except for local invariant violations which surface as
//! [`FatalError`].

use log::{debug, info};

use crate::browser::{FormSession, SubmittedForm};
use crate::error::FatalError;
use crate::models::{StepResult, TokenResponse};
use crate::settings::{FederatedSettings, UaaSettings};

const CLIENT_CREDENTIALS_GRANT_TYPE: &str = "client_credentials";
const PASSWORD_GRANT_TYPE: &str = "password";

/// Perform the OAuth2 client credentials flow against the token endpoint.
///
/// Success iff HTTP 200. On a non-200 status the step result carries the
/// status code and, when the body parses as `{error, error_description}`,
/// those fields verbatim.
///
/// # Errors
///
/// Only [`FatalError`] for unreachable local conditions; transport and
/// protocol failures are recorded in the returned [`StepResult`].
pub async fn client_credentials(
    client: &reqwest::Client,
    settings: &UaaSettings,
) -> Result<(TokenResponse, StepResult), FatalError> {
    info!("requesting client_credentials grant from {}", settings.auth_domain);
    let params = [
        ("grant_type", CLIENT_CREDENTIALS_GRANT_TYPE),
        ("client_id", settings.client_id.as_str()),
        ("client_secret", settings.client_secret.as_str()),
    ];
    Ok(post_token_request(client, &settings.token_url(), &params).await)
}

/// Perform the OAuth2 resource owner password flow against the token
/// endpoint. Same success and error contract as [`client_credentials`].
///
/// # Errors
///
/// Only [`FatalError`] for unreachable local conditions.
pub async fn password_grant(
    client: &reqwest::Client,
    settings: &UaaSettings,
    username: &str,
    password: &str,
) -> Result<(TokenResponse, StepResult), FatalError> {
    info!("requesting password grant from {}", settings.auth_domain);
    let params = [
        ("grant_type", PASSWORD_GRANT_TYPE),
        ("client_id", settings.client_id.as_str()),
        ("client_secret", settings.client_secret.as_str()),
        ("response_type", "token"),
        ("username", username),
        ("password", password),
    ];
    Ok(post_token_request(client, &settings.token_url(), &params).await)
}

/// Authorization-code flow against the primary provider, driven through its
/// HTML login form.
///
/// Fetches the protected resource, fills `username`/`password` into the
/// login form, submits it, and parses the final response as a token payload
/// (status 400 is parsed as an error body instead). A fresh cookie session
/// is created per attempt.
///
/// # Errors
///
/// Only [`FatalError`] when the cookie-bearing client cannot be built.
pub async fn authorization_code_uaa(
    settings: &UaaSettings,
) -> Result<(TokenResponse, StepResult), FatalError> {
    info!("running authorization-code login against {}", settings.resource_url);
    let session = FormSession::new()?;
    let submitted = match session
        .login(
            &settings.resource_url,
            &[
                ("username", settings.smoke_username.as_str()),
                ("password", settings.smoke_password.as_str()),
            ],
        )
        .await
    {
        Ok(submitted) => submitted,
        Err(err) => {
            debug!("direct authorization-code login failed: {err}");
            return Ok((TokenResponse::default(), StepResult::failed_error(err)));
        }
    };

    Ok(parse_login_outcome(&submitted))
}

/// Authorization-code flow through the federated provider.
///
/// Two chained round-trips on one cookie session: the ADFS login form
/// (fields `UserName`/`Password`), then the auto-post-back form it returns,
/// resubmitted verbatim to carry the SAML handoff back to the primary
/// provider. Only then is a token payload reachable.
///
/// # Errors
///
/// Only [`FatalError`] when the cookie-bearing client cannot be built.
pub async fn authorization_code_federated(
    settings: &FederatedSettings,
) -> Result<(TokenResponse, StepResult), FatalError> {
    info!("running federated authorization-code login against {}", settings.resource_url);
    let session = FormSession::new()?;

    let login_response = match session
        .login(
            &settings.resource_url,
            &[
                ("UserName", settings.username.as_str()),
                ("Password", settings.password.as_str()),
            ],
        )
        .await
    {
        Ok(submitted) => submitted,
        Err(err) => {
            debug!("federated login round-trip failed: {err}");
            return Ok((TokenResponse::default(), StepResult::failed_error(err)));
        }
    };

    let submitted = match session.resubmit_body_form(&login_response).await {
        Ok(submitted) => submitted,
        Err(err) => {
            debug!("federated post-back round-trip failed: {err}");
            return Ok((TokenResponse::default(), StepResult::failed_error(err)));
        }
    };

    Ok(parse_login_outcome(&submitted))
}

/// Shared token endpoint round-trip for the non-interactive grants.
async fn post_token_request(
    client: &reqwest::Client,
    token_url: &str,
    params: &[(&str, &str)],
) -> (TokenResponse, StepResult) {
    let response = match client
        .post(token_url)
        .header("Accept", "application/json")
        .form(params)
        .send()
        .await
    {
        Ok(response) => response,
        Err(err) => return (TokenResponse::default(), StepResult::failed_error(err)),
    };

    let status = response.status().as_u16();
    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => return (TokenResponse::default(), StepResult::failed_error(err)),
    };

    if status != 200 {
        return (TokenResponse::default(), StepResult::failed_status(status, &body));
    }

    match serde_json::from_str::<TokenResponse>(&body) {
        Ok(token) => (token, StepResult::success()),
        // A 200 whose body is not a token payload is still a failure, with
        // the raw status code and empty error fields.
        Err(_) => (TokenResponse::default(), StepResult::failed_status(status, &body)),
    }
}

/// Interpret the final response of a scripted authorization-code login.
///
/// Status 400 carries an `{error, error_description}` body; anything else is
/// expected to be a token payload. A body that parses as neither is recorded
/// as failed with the raw status code, never a silent success.
fn parse_login_outcome(submitted: &SubmittedForm) -> (TokenResponse, StepResult) {
    if submitted.status == 400 {
        return (
            TokenResponse::default(),
            StepResult::failed_status(400, &submitted.body),
        );
    }

    match serde_json::from_str::<TokenResponse>(&submitted.body) {
        Ok(token) if !token.access_token.is_empty() => (token, StepResult::success()),
        _ => (
            TokenResponse::default(),
            StepResult::failed_status(submitted.status, &submitted.body),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn submitted(status: u16, body: &str) -> SubmittedForm {
        SubmittedForm {
            status,
            body: body.to_string(),
            final_url: Url::parse("http://login.example.test/callback").unwrap(),
        }
    }

    #[test]
    fn test_login_outcome_token_payload() {
        let (token, result) =
            parse_login_outcome(&submitted(200, r#"{"access_token":"tok","token_type":"bearer"}"#));
        assert!(result.succeeded);
        assert_eq!(token.access_token, "tok");
    }

    #[test]
    fn test_login_outcome_bad_request_error_body() {
        let (token, result) = parse_login_outcome(&submitted(
            400,
            r#"{"error":"Invalid oauth2 state","error_description":"state mismatch"}"#,
        ));
        assert!(!result.succeeded);
        assert_eq!(result.status_code, Some(400));
        assert_eq!(result.error, "Invalid oauth2 state");
        assert_eq!(result.error_description, "state mismatch");
        assert!(token.access_token.is_empty());
    }

    #[test]
    fn test_login_outcome_unparseable_body_never_silently_succeeds() {
        let (_, result) = parse_login_outcome(&submitted(502, "<html>bad gateway</html>"));
        assert!(!result.succeeded);
        assert_eq!(result.status_code, Some(502));
        assert!(result.error.is_empty());
        assert!(result.error_description.is_empty());
    }

    #[test]
    fn test_login_outcome_empty_token_object_is_failure() {
        // A 200 whose JSON object lacks access_token must not pass as a login.
        let (_, result) = parse_login_outcome(&submitted(200, "{}"));
        assert!(!result.succeeded);
        assert_eq!(result.status_code, Some(200));
    }
}
