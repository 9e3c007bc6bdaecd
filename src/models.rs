//! Wire types shared across the verification flow
//!
//! Contains the token endpoint response shape, the uniform per-step outcome
//! type ([`StepResult`]), the aggregated report ([`FlowReport`]) and the
//! SCIM-style resource types used by the directory API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token endpoint response on HTTP 200.
///
/// Opaque credential returned by a grant; it lives only for the duration of
/// the calls that consume it and is never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub jti: String,
}

/// Error body returned by the token endpoint and the directory API on 4xx.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthErrorBody {
    #[serde(default)]
    pub error: String,
    #[serde(default)]
    pub error_description: String,
}

/// Uniform outcome of one verification step.
///
/// Serialized field names match the report consumed by the smoke-test
/// dashboard: `result`, `statusCode`, `error`, `errorDescription`.
/// Invariant: `succeeded == false` implies at least one of `status_code`
/// and `error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    #[serde(rename = "result")]
    pub succeeded: bool,
    #[serde(
        rename = "statusCode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(
        rename = "errorDescription",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub error_description: String,
}

impl Default for StepResult {
    fn default() -> Self {
        Self {
            succeeded: true,
            status_code: None,
            error: String::new(),
            error_description: String::new(),
        }
    }
}

impl StepResult {
    /// Successful step with no error fields.
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    /// Failed step carrying an unexpected HTTP status and, when the body
    /// parses as `{error, error_description}`, those fields verbatim.
    #[must_use]
    pub fn failed_status(status_code: u16, body: &str) -> Self {
        let mut result = Self {
            succeeded: false,
            status_code: Some(status_code),
            ..Self::default()
        };
        result.apply_error_body(body);
        result
    }

    /// Failed step carrying a local error message (transport failure,
    /// missing form) with no HTTP status.
    #[must_use]
    pub fn failed_error(error: impl std::fmt::Display) -> Self {
        Self {
            succeeded: false,
            error: error.to_string(),
            ..Self::default()
        }
    }

    /// Overlay `error`/`error_description` from a JSON error body.
    ///
    /// Best effort: a body that is not a JSON object, or lacks the keys,
    /// leaves the fields untouched. This never fails on its own.
    pub fn apply_error_body(&mut self, body: &str) {
        if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(body) {
            if let Some(error) = map.get("error").and_then(serde_json::Value::as_str) {
                self.error = error.to_string();
            }
            if let Some(description) = map
                .get("error_description")
                .and_then(serde_json::Value::as_str)
            {
                self.error_description = description.to_string();
            }
        }
    }

    /// Whether this step failed.
    #[must_use]
    pub fn has_error(&self) -> bool {
        !self.succeeded
    }
}

/// Aggregated report of one verification run.
///
/// Each field is present only if the step was attempted, so the serialized
/// JSON object holds exactly the attempted steps in flow order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowReport {
    #[serde(
        rename = "clientCredentials",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub client_credentials: Option<StepResult>,
    #[serde(rename = "createUser", default, skip_serializing_if = "Option::is_none")]
    pub create_user: Option<StepResult>,
    #[serde(rename = "getGroups", default, skip_serializing_if = "Option::is_none")]
    pub get_groups: Option<StepResult>,
    #[serde(
        rename = "addGroupMemberResult",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub add_group_member: Option<StepResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<StepResult>,
    #[serde(
        rename = "authCodeUAA",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub auth_code_uaa: Option<StepResult>,
    #[serde(
        rename = "authCodeAdfs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub auth_code_adfs: Option<StepResult>,
    #[serde(rename = "deleteUser", default, skip_serializing_if = "Option::is_none")]
    pub delete_user: Option<StepResult>,
}

impl FlowReport {
    /// All attempted steps in flow order.
    fn steps(&self) -> [&Option<StepResult>; 8] {
        [
            &self.client_credentials,
            &self.create_user,
            &self.get_groups,
            &self.add_group_member,
            &self.password,
            &self.auth_code_uaa,
            &self.auth_code_adfs,
            &self.delete_user,
        ]
    }

    /// Whether any attempted step failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.steps()
            .into_iter()
            .flatten()
            .any(StepResult::has_error)
    }
}

/// Common SCIM resource fields (`id`, `externalId`, `meta`, `displayName`,
/// `schemas`), shared by users and groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScimResource {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "externalId", default)]
    pub external_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<ScimMeta>,
    #[serde(rename = "displayName", default)]
    pub display_name: String,
    #[serde(default)]
    pub schemas: Vec<String>,
}

/// SCIM user resource, as accepted and returned by `POST /Users`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScimUser {
    #[serde(flatten)]
    pub resource: ScimResource,
    #[serde(rename = "userName", default)]
    pub user_name: String,
    #[serde(default)]
    pub name: ScimUserName,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub emails: Vec<ScimAttribute>,
    #[serde(default)]
    pub origin: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<ScimAttribute>,
}

/// SCIM list response envelope, as returned by `GET /Groups`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScimListResponse {
    #[serde(rename = "totalResults", default)]
    pub total_results: i64,
    #[serde(rename = "itemsPerPage", default)]
    pub items_per_page: i64,
    #[serde(rename = "startIndex", default)]
    pub start_index: i64,
    #[serde(rename = "Resources", default)]
    pub resources: Vec<ScimResource>,
}

/// SCIM resource metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScimMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(rename = "lastModified", default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default)]
    pub version: i64,
}

/// SCIM composite name attribute.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScimUserName {
    #[serde(default)]
    pub formatted: String,
    #[serde(rename = "familyName", default)]
    pub family_name: String,
    #[serde(rename = "givenName", default)]
    pub given_name: String,
    #[serde(rename = "middleName", default)]
    pub middle_name: String,
    #[serde(rename = "honorificPrefix", default)]
    pub honorific_prefix: String,
    #[serde(rename = "honorificSuffix", default)]
    pub honorific_suffix: String,
}

/// SCIM multi-valued attribute (emails, group references).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScimAttribute {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub display: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub operation: String,
}

/// Membership record posted to `POST /Groups/{id}/members`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMembership {
    pub origin: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

impl GroupMembership {
    /// Membership record for a directory user.
    #[must_use]
    pub fn user(origin: &str, user_id: &str) -> Self {
        Self {
            origin: origin.to_string(),
            kind: "USER".to_string(),
            value: user_id.to_string(),
        }
    }
}
