use std::sync::Arc;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use qaflow_api::app::{AppServices, build_app, services::NewUser};
use qaflow_auth::{AuthConfig, PasswordParams, Principal, PrincipalDirectory, Role, TeamRole};
use qaflow_core::{ManualClock, ProjectId, UserId};
use qaflow_infra::StaticGeoLocator;
use reqwest::{StatusCode, header};
use serde_json::json;

const PASSWORD: &str = "correct horse battery";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(services: Arc<AppServices>) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = build_app(services);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn cheap_config() -> AuthConfig {
    AuthConfig {
        password: PasswordParams {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        },
        ..AuthConfig::default()
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

struct Seed {
    admin: UserId,
    qa: UserId,
    lead: UserId,
}

/// admin (global admin), qa (team qa on project 1), lead (leads project 2).
fn seed(services: &AppServices) -> Seed {
    let user = |name: &str, role: Role| NewUser {
        username: name.to_string(),
        email: format!("{name}@example.test"),
        display_name: name.to_string(),
        role,
        password: PASSWORD.to_string(),
    };
    let admin = services.create_user(user("admin", Role::Admin)).unwrap();
    let qa = services.create_user(user("qa", Role::Qa)).unwrap();
    let lead = services.create_user(user("lead", Role::ProjectLead)).unwrap();

    services.add_project(ProjectId::new(1), None, admin).unwrap();
    services.add_project(ProjectId::new(2), Some(lead), admin).unwrap();
    services.assign(ProjectId::new(1), qa, TeamRole::Qa).unwrap();

    Seed { admin, qa, lead }
}

fn standard_services() -> (Arc<AppServices>, Seed) {
    let services = AppServices::build(cheap_config()).unwrap();
    let seed = seed(&services);
    (Arc::new(services), seed)
}

fn manual_services(config: AuthConfig) -> (Arc<AppServices>, Arc<ManualClock>, Seed) {
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()));
    let services = AppServices::build_with(config, clock.clone(), Arc::new(StaticGeoLocator::new())).unwrap();
    let seed = seed(&services);
    (Arc::new(services), clock, seed)
}

fn principal(services: &AppServices, id: UserId) -> Principal {
    Principal::from(&services.principals.get(id).unwrap().unwrap())
}

async fn login(client: &reqwest::Client, srv: &TestServer, identifier: &str) -> String {
    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "identifier": identifier, "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

fn location(res: &reqwest::Response) -> String {
    res.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn health_is_public() {
    let (services, _) = standard_services();
    let srv = TestServer::spawn(services).await;

    let res = client().get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn anonymous_request_is_redirected_to_login() {
    let (services, _) = standard_services();
    let srv = TestServer::spawn(services).await;

    let res = client().get(srv.url("/me")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login?reason=anonymous");
    let cookie = res.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with("qaflow_session=;"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn bad_credentials_and_inactive_accounts_are_rejected() {
    let (services, seed) = standard_services();
    let admin = principal(&services, seed.admin);
    services.gate.set_principal_active(seed.lead, false, &admin).unwrap();
    let srv = TestServer::spawn(services).await;
    let client = client();

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "identifier": "qa", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "identifier": "nobody", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "identifier": "lead", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "account_inactive");
}

#[tokio::test]
async fn login_issues_cookie_and_token_works_both_ways() {
    let (services, seed) = standard_services();
    let srv = TestServer::spawn(services).await;
    let client = client();

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "identifier": "qa@example.test", "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap().to_string();
    assert!(cookie.starts_with("qaflow_session="));
    assert!(cookie.contains("HttpOnly"));
    let body: serde_json::Value = res.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();
    assert_eq!(body["user_id"], seed.qa.get());
    assert_eq!(body["role"], "qa");

    let res = client.get(srv.url("/me")).bearer_auth(&token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let me: serde_json::Value = res.json().await.unwrap();
    assert_eq!(me["user_id"], seed.qa.get());
    assert_eq!(me["username"], "qa");

    let res = client
        .get(srv.url("/me"))
        .header(header::COOKIE, format!("qaflow_session={token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn admin_routes_require_admin_role() {
    let (services, seed) = standard_services();
    let srv = TestServer::spawn(services).await;
    let client = client();
    let qa = login(&client, &srv, "qa").await;
    let admin = login(&client, &srv, "admin").await;

    let path = format!("/admin/users/{}/sessions", seed.qa);
    let res = client.get(srv.url(&path)).bearer_auth(&qa).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["kind"], "insufficient_role");

    let res = client.get(srv.url(&path)).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    let sessions = body["sessions"].as_array().unwrap();
    assert_eq!(sessions.len(), 1);
    assert!(sessions[0].get("token").is_none());
}

#[tokio::test]
async fn project_permission_checks_follow_team_role_and_lead() {
    let (services, _) = standard_services();
    let srv = TestServer::spawn(services).await;
    let client = client();
    let qa = login(&client, &srv, "qa").await;
    let lead = login(&client, &srv, "lead").await;

    let res = client
        .get(srv.url("/projects/1/permissions/issues_create"))
        .bearer_auth(&qa)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url("/projects/1/permissions/issues_delete"))
        .bearer_auth(&qa)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["kind"], "missing_permission");

    // Lead designation covers everything except the denylist.
    let res = client
        .get(srv.url("/projects/2/permissions/team_manage"))
        .bearer_auth(&lead)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let res = client
        .get(srv.url("/projects/2/permissions/project_delete"))
        .bearer_auth(&lead)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client.get(srv.url("/projects")).bearer_auth(&qa).send().await.unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["projects"], json!([1]));

    let res = client.get(srv.url("/projects")).bearer_auth(&lead).send().await.unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["projects"], json!([2]));
}

#[tokio::test]
async fn malformed_path_values_are_bad_requests() {
    let (services, _) = standard_services();
    let srv = TestServer::spawn(services).await;
    let client = client();
    let qa = login(&client, &srv, "qa").await;

    let res = client
        .get(srv.url("/projects/abc/permissions"))
        .bearer_auth(&qa)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .get(srv.url("/projects/1/permissions/fly_to_moon"))
        .bearer_auth(&qa)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unknown_permission");
}

#[tokio::test]
async fn grant_and_revoke_flow() {
    let (services, seed) = standard_services();
    let srv = TestServer::spawn(services).await;
    let client = client();
    let qa = login(&client, &srv, "qa").await;
    let admin = login(&client, &srv, "admin").await;

    // qa cannot hand out permissions.
    let res = client
        .post(srv.url("/projects/1/grants"))
        .bearer_auth(&qa)
        .json(&json!({ "user_id": seed.qa.get(), "permission": "issues_delete" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(srv.url("/projects/1/grants"))
        .bearer_auth(&admin)
        .json(&json!({
            "user_id": seed.qa.get(),
            "permission": "issues_delete",
            "notes": "cleanup sprint",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let grant: serde_json::Value = res.json().await.unwrap();
    assert_eq!(grant["granted_by"], seed.admin.get());
    assert_eq!(grant["is_active"], true);

    let res = client
        .get(srv.url("/projects/1/permissions/issues_delete"))
        .bearer_auth(&qa)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url("/projects/1/permissions/issues_delete/explain"))
        .bearer_auth(&qa)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["explanation"]["granted"], true);
    assert_eq!(body["explanation"]["layer"]["layer"], "explicit_grant");

    let path = format!("/projects/1/grants/{}/issues_delete", seed.qa);
    let res = client.delete(srv.url(&path)).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["revoked"], true);

    let res = client.delete(srv.url(&path)).bearer_auth(&admin).send().await.unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["revoked"], false);

    let res = client
        .get(srv.url("/projects/1/permissions/issues_delete"))
        .bearer_auth(&qa)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn lead_cannot_grant_itself_denylisted_permissions() {
    let (services, seed) = standard_services();
    let srv = TestServer::spawn(services).await;
    let client = client();
    let lead = login(&client, &srv, "lead").await;

    for permission in ["project_delete", "project_settings"] {
        let res = client
            .post(srv.url("/projects/2/grants"))
            .bearer_auth(&lead)
            .json(&json!({ "user_id": seed.lead.get(), "permission": permission }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "forbidden");

        let res = client
            .get(srv.url(&format!("/projects/2/permissions/{permission}")))
            .bearer_auth(&lead)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    // Delegating an ordinary permission still works.
    let res = client
        .post(srv.url("/projects/2/grants"))
        .bearer_auth(&lead)
        .json(&json!({ "user_id": seed.qa.get(), "permission": "hours_view" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn grant_with_non_positive_user_id_is_rejected() {
    let (services, _) = standard_services();
    let srv = TestServer::spawn(services).await;
    let client = client();
    let admin = login(&client, &srv, "admin").await;

    for user_id in [0, -5] {
        let res = client
            .post(srv.url("/projects/1/grants"))
            .bearer_auth(&admin)
            .json(&json!({ "user_id": user_id, "permission": "chat" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "invalid_id");
    }
}

#[tokio::test]
async fn grant_with_past_expiry_is_rejected() {
    let (services, seed) = standard_services();
    let srv = TestServer::spawn(services).await;
    let client = client();
    let admin = login(&client, &srv, "admin").await;

    let res = client
        .post(srv.url("/projects/1/grants"))
        .bearer_auth(&admin)
        .json(&json!({
            "user_id": seed.qa.get(),
            "permission": "files_upload",
            "expires_at": (Utc::now() - ChronoDuration::hours(1)).to_rfc3339(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn force_logout_revokes_open_sessions() {
    let (services, seed) = standard_services();
    let srv = TestServer::spawn(services).await;
    let client = client();
    let qa = login(&client, &srv, "qa").await;
    let admin = login(&client, &srv, "admin").await;

    let res = client
        .post(srv.url(&format!("/admin/users/{}/force-logout", seed.qa)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["ended"], 1);

    let res = client.get(srv.url("/me")).bearer_auth(&qa).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login?reason=revoked");

    let res = client.get(srv.url("/me")).bearer_auth(&admin).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn deactivated_user_is_rejected_on_next_request() {
    let (services, seed) = standard_services();
    let srv = TestServer::spawn(services).await;
    let client = client();
    let qa = login(&client, &srv, "qa").await;
    let admin = login(&client, &srv, "admin").await;

    let res = client
        .put(srv.url(&format!("/admin/users/{}/active", seed.qa)))
        .bearer_auth(&admin)
        .json(&json!({ "active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/me")).bearer_auth(&qa).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login?reason=deactivated");

    let res = client
        .put(srv.url("/admin/users/999/active"))
        .bearer_auth(&admin)
        .json(&json!({ "active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn role_change_applies_to_open_session() {
    let (services, seed) = standard_services();
    let srv = TestServer::spawn(services).await;
    let client = client();
    let qa = login(&client, &srv, "qa").await;
    let admin = login(&client, &srv, "admin").await;

    let res = client
        .put(srv.url(&format!("/admin/users/{}/role", seed.qa)))
        .bearer_auth(&admin)
        .json(&json!({ "role": "admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/me")).bearer_auth(&qa).send().await.unwrap();
    let me: serde_json::Value = res.json().await.unwrap();
    assert_eq!(me["role"], "admin");

    let res = client
        .put(srv.url(&format!("/admin/users/{}/role", seed.qa)))
        .bearer_auth(&admin)
        .json(&json!({ "role": "overlord" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_cannot_reach_super_admin_rank() {
    let (services, seed) = standard_services();
    let owner = services
        .create_user(NewUser {
            username: "owner".to_string(),
            email: "owner@example.test".to_string(),
            display_name: "owner".to_string(),
            role: Role::SuperAdmin,
            password: PASSWORD.to_string(),
        })
        .unwrap();
    let srv = TestServer::spawn(services).await;
    let client = client();
    let admin = login(&client, &srv, "admin").await;

    let res = client
        .put(srv.url(&format!("/admin/users/{}/role", seed.admin)))
        .bearer_auth(&admin)
        .json(&json!({ "role": "super_admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");

    let res = client
        .put(srv.url(&format!("/admin/users/{owner}/active")))
        .bearer_auth(&admin)
        .json(&json!({ "active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .put(srv.url(&format!("/admin/users/{owner}/role")))
        .bearer_auth(&admin)
        .json(&json!({ "role": "qa" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client.get(srv.url("/me")).bearer_auth(&admin).send().await.unwrap();
    let me: serde_json::Value = res.json().await.unwrap();
    assert_eq!(me["role"], "admin");

    // The owner is untouched and can still sign in and promote.
    let root = login(&client, &srv, "owner").await;
    let res = client
        .put(srv.url(&format!("/admin/users/{}/role", seed.admin)))
        .bearer_auth(&root)
        .json(&json!({ "role": "super_admin" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn logout_clears_cookie_and_ends_session() {
    let (services, _) = standard_services();
    let srv = TestServer::spawn(services).await;
    let client = client();
    let qa = login(&client, &srv, "qa").await;

    let res = client.post(srv.url("/auth/logout")).bearer_auth(&qa).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.contains("Max-Age=0"));

    let res = client.get(srv.url("/me")).bearer_auth(&qa).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login?reason=anonymous");
}

#[tokio::test]
async fn idle_session_expires() {
    let config = AuthConfig {
        rotation_interval: None,
        ..cheap_config()
    };
    let (services, clock, _) = manual_services(config);
    let srv = TestServer::spawn(services).await;
    let client = client();
    let qa = login(&client, &srv, "qa").await;

    clock.advance(ChronoDuration::minutes(30));
    let res = client.get(srv.url("/me")).bearer_auth(&qa).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    clock.advance(ChronoDuration::minutes(31));
    let res = client.get(srv.url("/me")).bearer_auth(&qa).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&res), "/login?reason=idle_timeout");
}

#[tokio::test]
async fn rotated_token_is_returned_and_old_one_stops_working() {
    let config = AuthConfig {
        rotation_interval: Some(ChronoDuration::minutes(5)),
        ..cheap_config()
    };
    let (services, clock, _) = manual_services(config);
    let srv = TestServer::spawn(services).await;
    let client = client();
    let old = login(&client, &srv, "qa").await;

    clock.advance(ChronoDuration::minutes(6));
    let res = client.get(srv.url("/me")).bearer_auth(&old).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let fresh = res
        .headers()
        .get("x-session-token")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_ne!(fresh, old);
    let cookie = res.headers().get(header::SET_COOKIE).unwrap().to_str().unwrap();
    assert!(cookie.starts_with(&format!("qaflow_session={fresh}")));

    let res = client.get(srv.url("/me")).bearer_auth(&fresh).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url("/me")).bearer_auth(&old).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn expiring_and_sweep_endpoints() {
    let config = AuthConfig {
        idle_timeout: ChronoDuration::days(7),
        rotation_interval: None,
        ..cheap_config()
    };
    let (services, clock, seed) = manual_services(config);
    let srv = TestServer::spawn(services).await;
    let client = client();
    let admin = login(&client, &srv, "admin").await;

    let expires = Utc.with_ymd_and_hms(2026, 3, 4, 9, 0, 0).unwrap();
    let res = client
        .post(srv.url("/projects/1/grants"))
        .bearer_auth(&admin)
        .json(&json!({
            "user_id": seed.qa.get(),
            "permission": "hours_view",
            "expires_at": expires.to_rfc3339(),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .get(srv.url("/admin/grants/expiring"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["days"], 7);
    assert_eq!(body["grants"].as_array().unwrap().len(), 1);

    let res = client
        .get(srv.url("/admin/grants/expiring?days=1"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["grants"].as_array().unwrap().is_empty());

    let res = client
        .get(srv.url("/admin/grants/expiring?days=0"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client.post(srv.url("/admin/grants/sweep")).bearer_auth(&admin).send().await.unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["swept"], 0);

    clock.advance(ChronoDuration::days(3));
    let res = client.post(srv.url("/admin/grants/sweep")).bearer_auth(&admin).send().await.unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["swept"], 1);
}
