//! Verification flow orchestrator
//!
//! Sequences the grant executors and directory operations into one
//! end-to-end scenario: acquire a client-credentials token, provision a
//! throwaway user, look up and join the target scope group, then verify the
//! password grant and both authorization-code logins. The first failed step
//! stops new steps; the provisioned user is always cleaned up once it
//! exists, and every attempted step lands in the [`FlowReport`].

use log::{info, warn};

use crate::directory::DirectoryClient;
use crate::error::FatalError;
use crate::grants;
use crate::models::{
    FlowReport, ScimAttribute, ScimResource, ScimUser, ScimUserName, StepResult,
};
use crate::settings::SmokeSettings;

const SCIM_CORE_SCHEMA: &str = "urn:scim:schemas:core:1.0";

/// Runs one verification flow against the configured deployment.
///
/// Holds only immutable configuration and a plain (cookie-less) HTTP client
/// for the token endpoint; interactive logins allocate their own cookie
/// sessions, so independent runners may execute concurrently.
pub struct FlowRunner {
    settings: SmokeSettings,
    client: reqwest::Client,
}

impl FlowRunner {
    /// Create a runner for the given settings.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError::HttpClient`] if the HTTP client cannot be
    /// built.
    pub fn new(settings: SmokeSettings) -> Result<Self, FatalError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(FatalError::HttpClient)?;
        Ok(Self { settings, client })
    }

    /// Run the full verification scenario once.
    ///
    /// # Errors
    ///
    /// Returns [`FatalError`] only for local invariant violations; every
    /// externally-observable failure is recorded as a step in the returned
    /// report instead. Cleanup of a provisioned user is attempted even when
    /// a fatal error aborts the run.
    pub async fn run(&self) -> Result<FlowReport, FatalError> {
        let mut report = FlowReport::default();

        // Authenticate with the client_credentials grant; its token (with
        // scim.write scope) authenticates all directory operations below.
        let (token, result) =
            grants::client_credentials(&self.client, &self.settings.uaa).await?;
        report.client_credentials = Some(result.clone());
        if result.has_error() {
            return Ok(report);
        }

        let directory = DirectoryClient::new(&self.settings.uaa, &token.access_token)?;

        // Provision the throwaway user the later logins authenticate as.
        let (created, result) = directory.create_user(&self.smoke_user()).await?;
        report.create_user = Some(result.clone());
        if result.has_error() {
            return Ok(report);
        }
        let Some(created) = created else {
            return Ok(report);
        };

        // From here on the user exists: run the remaining steps, then delete
        // the user no matter how far they got.
        let outcome = self
            .run_provisioned_steps(&mut report, &directory, &created)
            .await;

        report.delete_user = Some(directory.delete_user(&created.resource.id).await);

        outcome?;
        Ok(report)
    }

    /// Steps that require the provisioned user. A failed step returns early;
    /// the caller owns cleanup.
    async fn run_provisioned_steps(
        &self,
        report: &mut FlowReport,
        directory: &DirectoryClient,
        created: &ScimUser,
    ) -> Result<(), FatalError> {
        let (groups, result) = directory.get_groups().await;
        report.get_groups = Some(result.clone());
        if result.has_error() {
            return Ok(());
        }
        let groups = groups.unwrap_or_default();

        let result = self
            .add_to_scope_group(directory, &groups, &created.resource.id)
            .await?;
        report.add_group_member = Some(result.clone());
        if result.has_error() {
            return Ok(());
        }

        // Password grant directly against the token endpoint, as the new
        // user; does not involve the federated provider.
        let (_, result) = grants::password_grant(
            &self.client,
            &self.settings.uaa,
            &self.settings.uaa.smoke_username,
            &self.settings.uaa.smoke_password,
        )
        .await?;
        report.password = Some(result.clone());
        if result.has_error() {
            return Ok(());
        }

        // Authorization-code login against the primary provider's form.
        let (_, result) = grants::authorization_code_uaa(&self.settings.uaa).await?;
        report.auth_code_uaa = Some(result.clone());
        if result.has_error() {
            return Ok(());
        }

        // Authorization-code login through the federated SAML handoff.
        let (_, result) =
            grants::authorization_code_federated(&self.settings.federated).await?;
        report.auth_code_adfs = Some(result);
        Ok(())
    }

    /// Find the configured scope group and add the user to it.
    ///
    /// When the group is absent the behavior is configurable: with
    /// `require_scope_group` unset the membership call proceeds with an
    /// empty group id and the directory's own failure is reported; when set,
    /// the step fails locally without a network call.
    async fn add_to_scope_group(
        &self,
        directory: &DirectoryClient,
        groups: &[ScimResource],
        user_id: &str,
    ) -> Result<StepResult, FatalError> {
        let scope_group = groups
            .iter()
            .find(|group| group.display_name == self.settings.uaa.scope_group);

        match scope_group {
            Some(group) => {
                info!(
                    "found scope group '{}' with id {}",
                    group.display_name, group.id
                );
                directory.add_group_member(&group.id, user_id).await
            }
            None if self.settings.uaa.require_scope_group => {
                Ok(StepResult {
                    succeeded: false,
                    status_code: None,
                    error: "scope_group_not_found".to_string(),
                    error_description: format!(
                        "no group with display name '{}'",
                        self.settings.uaa.scope_group
                    ),
                })
            }
            None => {
                warn!(
                    "scope group '{}' not found, attempting membership with empty group id",
                    self.settings.uaa.scope_group
                );
                directory.add_group_member("", user_id).await
            }
        }
    }

    /// The throwaway user provisioned for this run.
    fn smoke_user(&self) -> ScimUser {
        ScimUser {
            resource: ScimResource {
                schemas: vec![SCIM_CORE_SCHEMA.to_string()],
                ..ScimResource::default()
            },
            user_name: self.settings.uaa.smoke_username.clone(),
            name: ScimUserName {
                formatted: "Smoke User".to_string(),
                family_name: "User".to_string(),
                given_name: "Smoke".to_string(),
                ..ScimUserName::default()
            },
            active: true,
            password: self.settings.uaa.smoke_password.clone(),
            verified: true,
            emails: vec![ScimAttribute {
                value: self.settings.uaa.smoke_email.clone(),
                ..ScimAttribute::default()
            }],
            origin: "uaa".to_string(),
            ..ScimUser::default()
        }
    }

    /// The settings this runner was constructed with.
    #[must_use]
    pub fn settings(&self) -> &SmokeSettings {
        &self.settings
    }
}
