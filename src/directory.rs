//! SCIM-style directory operations
//!
//! Bearer-authenticated CRUD calls against the identity directory: create
//! the throwaway user, list groups, add a group member, delete the user.
//! Every operation reports its outcome as a [`StepResult`]; error-body
//! parsing is best effort and never raises an error of its own.

use log::{debug, info};

use crate::error::FatalError;
use crate::models::{GroupMembership, ScimListResponse, ScimResource, ScimUser, StepResult};
use crate::settings::UaaSettings;

/// Origin recorded on membership records for locally provisioned users.
const USER_ORIGIN: &str = "uaa";

/// HTTP client for the directory API, bound to one bearer token.
pub struct DirectoryClient {
    client: reqwest::Client,
    auth_domain: String,
    access_token: String,
}

impl DirectoryClient {
    /// Create a directory client for `settings.auth_domain`, authenticating
    /// every call with `access_token`.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::HttpClient`] if the client cannot be built.
    pub fn new(settings: &UaaSettings, access_token: &str) -> Result<Self, FatalError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(FatalError::HttpClient)?;
        Ok(Self {
            client,
            auth_domain: settings.auth_domain.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        })
    }

    /// `POST /Users`: provision a user. On 201 the created resource (with
    /// its server-assigned id) is returned; any other status yields a failed
    /// step with a best-effort parsed error body.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::Serialize`] if the user payload cannot be
    /// serialized, which valid input never triggers.
    pub async fn create_user(
        &self,
        user: &ScimUser,
    ) -> Result<(Option<ScimUser>, StepResult), FatalError> {
        info!("creating directory user {}", user.user_name);
        let payload = serde_json::to_string(user)?;

        let response = match self
            .client
            .post(format!("{}/Users", self.auth_domain))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .bearer_auth(&self.access_token)
            .body(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return Ok((None, StepResult::failed_error(err))),
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => return Ok((None, StepResult::failed_error(err))),
        };

        if status != 201 {
            return Ok((None, StepResult::failed_status(status, &body)));
        }

        match serde_json::from_str::<ScimUser>(&body) {
            Ok(created) => {
                debug!("created user id {}", created.resource.id);
                Ok((Some(created), StepResult::success()))
            }
            Err(_) => Ok((None, StepResult::failed_status(status, &body))),
        }
    }

    /// `GET /Groups`: list all directory groups.
    pub async fn get_groups(&self) -> (Option<Vec<ScimResource>>, StepResult) {
        info!("listing directory groups");
        let response = match self
            .client
            .get(format!("{}/Groups", self.auth_domain))
            .header("Accept", "application/json")
            .bearer_auth(&self.access_token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return (None, StepResult::failed_error(err)),
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => return (None, StepResult::failed_error(err)),
        };

        if status != 200 {
            return (None, StepResult::failed_status(status, &body));
        }

        match serde_json::from_str::<ScimListResponse>(&body) {
            Ok(list) => (Some(list.resources), StepResult::success()),
            Err(_) => (None, StepResult::failed_status(status, &body)),
        }
    }

    /// `POST /Groups/{id}/members`: add the user to a group. Success iff
    /// HTTP 201.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::Serialize`] if the membership record cannot be
    /// serialized, which valid input never triggers.
    pub async fn add_group_member(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<StepResult, FatalError> {
        info!("adding user {user_id} to group '{group_id}'");
        let membership = GroupMembership::user(USER_ORIGIN, user_id);
        let payload = serde_json::to_string(&membership)?;

        let response = match self
            .client
            .post(format!("{}/Groups/{}/members", self.auth_domain, group_id))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .bearer_auth(&self.access_token)
            .body(payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return Ok(StepResult::failed_error(err)),
        };

        let status = response.status().as_u16();
        if status == 201 {
            return Ok(StepResult::success());
        }

        let body = response.text().await.unwrap_or_default();
        Ok(StepResult::failed_status(status, &body))
    }

    /// `DELETE /Users/{id}`: remove the throwaway user. Success iff
    /// HTTP 200.
    pub async fn delete_user(&self, user_id: &str) -> StepResult {
        info!("deleting directory user {user_id}");
        let response = match self
            .client
            .delete(format!("{}/Users/{}", self.auth_domain, user_id))
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .bearer_auth(&self.access_token)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => return StepResult::failed_error(err),
        };

        let status = response.status().as_u16();
        if status == 200 {
            return StepResult::success();
        }

        let body = response.text().await.unwrap_or_default();
        StepResult::failed_status(status, &body)
    }
}
