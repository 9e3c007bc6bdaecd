//! Integration tests for the verification flow against a mock deployment.
//!
//! Covers the orchestrator's gating rules (short-circuit on first failure,
//! unconditional cleanup), grant executor success and error contracts, and
//! the full happy path including both scripted authorization-code logins.

use serde_json::json;
use sso_smoketest::models::StepResult;
use sso_smoketest::settings::{FederatedSettings, SmokeSettings, UaaSettings};
use sso_smoketest::{grants, FlowRunner};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper: settings pointing every endpoint at the mock server.
fn settings_for(server: &MockServer) -> SmokeSettings {
    SmokeSettings {
        uaa: UaaSettings {
            auth_domain: server.uri(),
            client_id: "smoke-client".to_string(),
            client_secret: "smoke-secret".to_string(),
            resource_url: format!("{}/uaaLogin", server.uri()),
            ..UaaSettings::default()
        },
        federated: FederatedSettings {
            username: "aduser".to_string(),
            password: "adpassword".to_string(),
            resource_url: format!("{}/adfsLogin", server.uri()),
        },
        ..SmokeSettings::default()
    }
}

/// Helper: standard token endpoint 200 body.
fn token_json() -> serde_json::Value {
    json!({
        "access_token": "admin-token",
        "token_type": "bearer",
        "expires_in": 43199,
        "refresh_token": "refresh-token",
        "scope": "scim.write scim.read",
        "jti": "jti-1"
    })
}

/// Helper: the keys present in the serialized report.
fn report_keys(report: &sso_smoketest::FlowReport) -> Vec<String> {
    let value = serde_json::to_value(report).unwrap();
    let mut keys: Vec<String> = value.as_object().unwrap().keys().cloned().collect();
    keys.sort();
    keys
}

fn sorted(mut keys: Vec<&str>) -> Vec<String> {
    keys.sort_unstable();
    keys.into_iter().map(str::to_string).collect()
}

/// Mount the token endpoint, the user CRUD pair, and the groups listing for
/// a run that reaches the group phase.
async fn mount_provisioning(server: &MockServer, groups: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_json()))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/Users"))
        .and(header("Authorization", "Bearer admin-token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "u-1",
            "externalId": "",
            "displayName": "",
            "schemas": ["urn:scim:schemas:core:1.0"],
            "userName": "smokeuser",
            "active": true,
            "verified": true,
            "origin": "uaa",
            "emails": [{"value": "smokeuser@smoke.example"}]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/Groups"))
        .and(header("Authorization", "Bearer admin-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(groups))
        .mount(server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/Users/u-1"))
        .and(header("Authorization", "Bearer admin-token"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

#[tokio::test]
async fn client_credentials_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=smoke-client"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_json()))
        .expect(2)
        .mount(&server)
        .await;

    let settings = settings_for(&server);
    let client = reqwest::Client::new();

    let (first_token, first) = grants::client_credentials(&client, &settings.uaa)
        .await
        .unwrap();
    let (second_token, second) = grants::client_credentials(&client, &settings.uaa)
        .await
        .unwrap();

    assert!(first.succeeded);
    assert!(second.succeeded);
    assert_eq!(first_token, second_token);
    assert_eq!(first_token.access_token, "admin-token");
    assert_eq!(first_token.jti, "jti-1");
}

#[tokio::test]
async fn token_endpoint_error_body_is_propagated_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "bad secret"
        })))
        .mount(&server)
        .await;

    let settings = settings_for(&server);
    let client = reqwest::Client::new();
    let (token, result) = grants::client_credentials(&client, &settings.uaa)
        .await
        .unwrap();

    assert!(!result.succeeded);
    assert_eq!(result.status_code, Some(400));
    assert_eq!(result.error, "invalid_client");
    assert_eq!(result.error_description, "bad secret");
    assert!(token.access_token.is_empty());
}

#[tokio::test]
async fn password_grant_sends_user_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("username=smokeuser"))
        .and(body_string_contains("password=smokepassword"))
        .and(body_string_contains("response_type=token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_json()))
        .expect(1)
        .mount(&server)
        .await;

    let settings = settings_for(&server);
    let client = reqwest::Client::new();
    let (_, result) =
        grants::password_grant(&client, &settings.uaa, "smokeuser", "smokepassword")
            .await
            .unwrap();
    assert!(result.succeeded);
}

#[tokio::test]
async fn unreachable_token_endpoint_is_a_failed_step_not_a_panic() {
    // Point at a closed port: transport error, no retry.
    let settings = SmokeSettings {
        uaa: UaaSettings {
            auth_domain: "http://127.0.0.1:1".to_string(),
            ..UaaSettings::default()
        },
        ..SmokeSettings::default()
    };
    let client = reqwest::Client::new();
    let (_, result) = grants::client_credentials(&client, &settings.uaa)
        .await
        .unwrap();

    assert!(!result.succeeded);
    assert_eq!(result.status_code, None);
    assert!(!result.error.is_empty());
}

#[tokio::test]
async fn orchestrator_short_circuits_on_first_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "unauthorized",
            "error_description": "Bad credentials"
        })))
        .mount(&server)
        .await;

    let runner = FlowRunner::new(settings_for(&server)).unwrap();
    let report = runner.run().await.unwrap();

    assert_eq!(report_keys(&report), sorted(vec!["clientCredentials"]));
    let step = report.client_credentials.unwrap();
    assert!(!step.succeeded);
    assert_eq!(step.status_code, Some(401));
    assert_eq!(step.error, "unauthorized");
}

#[tokio::test]
async fn cleanup_runs_even_when_group_lookup_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oauth/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_json()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/Users"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "u-1",
            "userName": "smokeuser",
            "schemas": ["urn:scim:schemas:core:1.0"]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/Groups"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/Users/u-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let runner = FlowRunner::new(settings_for(&server)).unwrap();
    let report = runner.run().await.unwrap();

    assert_eq!(
        report_keys(&report),
        sorted(vec!["clientCredentials", "createUser", "getGroups", "deleteUser"])
    );
    assert!(report.create_user.unwrap().succeeded);
    let groups_step = report.get_groups.unwrap();
    assert!(!groups_step.succeeded);
    assert_eq!(groups_step.status_code, Some(500));
    assert!(report.delete_user.unwrap().succeeded);
}

#[tokio::test]
async fn missing_scope_group_proceeds_and_reports_directory_failure() {
    let server = MockServer::start().await;
    mount_provisioning(
        &server,
        json!({
            "totalResults": 1,
            "itemsPerPage": 1,
            "startIndex": 1,
            "Resources": [
                {"id": "g-9", "displayName": "uaa.admin", "schemas": []}
            ]
        }),
    )
    .await;

    // The membership call goes out with an empty group id; the directory
    // answers with its own not-found error.
    Mock::given(method("POST"))
        .and(path("/Groups//members"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": "not_found",
            "error_description": "Group  does not exist"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let runner = FlowRunner::new(settings_for(&server)).unwrap();
    let report = runner.run().await.unwrap();

    assert_eq!(
        report_keys(&report),
        sorted(vec![
            "clientCredentials",
            "createUser",
            "getGroups",
            "addGroupMemberResult",
            "deleteUser",
        ])
    );
    let member_step = report.add_group_member.unwrap();
    assert!(!member_step.succeeded);
    assert_eq!(member_step.status_code, Some(404));
    assert_eq!(member_step.error, "not_found");
    // Later steps were never attempted.
    assert!(report.password.is_none());
    assert!(report.auth_code_uaa.is_none());
    assert!(report.auth_code_adfs.is_none());
}

#[tokio::test]
async fn missing_scope_group_fails_locally_when_required() {
    let server = MockServer::start().await;
    mount_provisioning(
        &server,
        json!({
            "totalResults": 0,
            "itemsPerPage": 0,
            "startIndex": 1,
            "Resources": []
        }),
    )
    .await;

    let mut settings = settings_for(&server);
    settings.uaa.require_scope_group = true;

    let runner = FlowRunner::new(settings).unwrap();
    let report = runner.run().await.unwrap();

    let member_step = report.add_group_member.unwrap();
    assert!(!member_step.succeeded);
    assert_eq!(member_step.error, "scope_group_not_found");
    assert_eq!(member_step.status_code, None);
    // Cleanup still ran.
    assert!(report.delete_user.unwrap().succeeded);
}

#[tokio::test]
async fn full_flow_succeeds_end_to_end() {
    let server = MockServer::start().await;
    mount_provisioning(
        &server,
        json!({
            "totalResults": 2,
            "itemsPerPage": 2,
            "startIndex": 1,
            "Resources": [
                {"id": "g-1", "displayName": "uaa.admin", "schemas": []},
                {"id": "g-2", "displayName": "smoketest.extinguish", "schemas": []}
            ]
        }),
    )
    .await;

    Mock::given(method("POST"))
        .and(path("/Groups/g-2/members"))
        .and(body_string_contains("\"type\":\"USER\""))
        .and(body_string_contains("\"value\":\"u-1\""))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"value": "u-1"})))
        .expect(1)
        .mount(&server)
        .await;

    // Direct authorization-code login: protected resource redirects to the
    // login form, the posted form answers with a token payload.
    Mock::given(method("GET"))
        .and(path("/uaaLogin"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", format!("{}/login", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html><body>
               <form action="/login.do" method="post">
                 <input type="hidden" name="X-Uaa-Csrf" value="csrf-1" />
                 <input type="text" name="username" value="" />
                 <input type="password" name="password" value="" />
                 <input type="submit" name="commit" value="Sign in" />
               </form></body></html>"#,
            "text/html",
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login.do"))
        .and(body_string_contains("X-Uaa-Csrf=csrf-1"))
        .and(body_string_contains("username=smokeuser"))
        .and(body_string_contains("password=smokepassword"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "user-token",
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Federated login: ADFS form first, then the auto-post-back form that
    // carries the SAML response home.
    Mock::given(method("GET"))
        .and(path("/adfsLogin"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<html><body>
               <form action="/adfs/ls" method="post">
                 <input type="text" name="UserName" value="" />
                 <input type="password" name="Password" value="" />
                 <input type="hidden" name="AuthMethod" value="FormsAuthentication" />
                 <input type="submit" name="SignIn" value="Sign in" />
               </form></body></html>"#,
            "text/html",
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/adfs/ls"))
        .and(body_string_contains("UserName=aduser"))
        .and(body_string_contains("Password=adpassword"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            format!(
                r#"<html><body onload="document.forms[0].submit()">
                   <form action="{}/saml/callback" method="POST">
                     <input type="hidden" name="SAMLResponse" value="c2FtbA==" />
                     <input type="hidden" name="RelayState" value="rs-1" />
                   </form></body></html>"#,
                server.uri()
            ),
            "text/html",
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/saml/callback"))
        .and(body_string_contains("SAMLResponse=c2FtbA%3D%3D"))
        .and(body_string_contains("RelayState=rs-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "federated-token",
            "token_type": "bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let runner = FlowRunner::new(settings_for(&server)).unwrap();
    let report = runner.run().await.unwrap();

    assert_eq!(
        report_keys(&report),
        sorted(vec![
            "clientCredentials",
            "createUser",
            "getGroups",
            "addGroupMemberResult",
            "password",
            "authCodeUAA",
            "authCodeAdfs",
            "deleteUser",
        ])
    );
    assert!(!report.has_failures());
}

#[tokio::test]
async fn authorization_code_400_is_recorded_with_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/uaaLogin"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"<form action="/login.do" method="post">
                 <input type="text" name="username" value="" />
                 <input type="password" name="password" value="" />
               </form>"#,
            "text/html",
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/login.do"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "Invalid oauth2 state",
            "error_description": "Expected oauth2 state but no state was found"
        })))
        .mount(&server)
        .await;

    let settings = settings_for(&server);
    let (_, result) = grants::authorization_code_uaa(&settings.uaa).await.unwrap();

    assert_eq!(
        result,
        StepResult {
            succeeded: false,
            status_code: Some(400),
            error: "Invalid oauth2 state".to_string(),
            error_description: "Expected oauth2 state but no state was found".to_string(),
        }
    );
}
