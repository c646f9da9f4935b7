//! Black-box tests for the portal: real router, real HTTP, scripted backend.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{redirect, StatusCode};

use edugate_auth::{
    GuardPolicy, HodProfile, IdentityVerifier, InMemorySessionStore, RemoteSession,
    SessionResolver, SignInError, VerifierError,
};
use edugate_core::UserId;
use edugate_portal::app::build_app;
use edugate_portal::context::AuthContext;

const HOD_EMAIL: &str = "hod.cse@college.edu";
const HOD_PASSWORD: &str = "chalk-and-timetables";

/// Backend stand-in with scriptable membership and a call ledger.
struct ScriptedBackend {
    user_id: UserId,
    member: AtomicBool,
    signed_in: AtomicBool,
    sign_out_calls: AtomicUsize,
}

impl ScriptedBackend {
    fn new(member: bool) -> Arc<Self> {
        Arc::new(Self {
            user_id: UserId::new(),
            member: AtomicBool::new(member),
            signed_in: AtomicBool::new(false),
            sign_out_calls: AtomicUsize::new(0),
        })
    }

    fn session(&self) -> RemoteSession {
        RemoteSession {
            user_id: self.user_id,
            email: HOD_EMAIL.to_string(),
        }
    }
}

#[async_trait]
impl IdentityVerifier for ScriptedBackend {
    async fn sign_in_with_password(
        &self,
        _email: &str,
        password: &str,
    ) -> Result<RemoteSession, SignInError> {
        if password != HOD_PASSWORD {
            return Err(SignInError::Credential);
        }
        self.signed_in.store(true, Ordering::SeqCst);
        Ok(self.session())
    }

    async fn current_session(&self) -> Result<Option<RemoteSession>, VerifierError> {
        if self.signed_in.load(Ordering::SeqCst) {
            Ok(Some(self.session()))
        } else {
            Ok(None)
        }
    }

    async fn is_role_member(&self, user_id: UserId) -> bool {
        self.member.load(Ordering::SeqCst) && user_id == self.user_id
    }

    async fn fetch_profile(&self, user_id: UserId) -> Result<HodProfile, VerifierError> {
        Ok(HodProfile {
            id: user_id,
            display_name: "Dr. Asha Verma".to_string(),
            email: HOD_EMAIL.to_string(),
            email_verified: true,
            profile_complete: true,
        })
    }

    async fn sign_out(&self) -> Result<(), VerifierError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        self.signed_in.store(false, Ordering::SeqCst);
        Ok(())
    }
}

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn(backend: Arc<ScriptedBackend>) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let resolver = Arc::new(SessionResolver::new(
            Arc::new(InMemorySessionStore::new()),
            backend,
        ));
        let policy = GuardPolicy {
            wait: Duration::from_secs(2),
            max_retries: 3,
        };
        let app = build_app(AuthContext::new(resolver, policy));

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
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn http_client() -> reqwest::Client {
    // Redirects stay visible so the guard's 303 can be asserted on.
    reqwest::Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .unwrap()
}

#[tokio::test]
async fn health_is_reachable() {
    let server = TestServer::spawn(ScriptedBackend::new(true)).await;
    let client = http_client();

    let res = client
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn anonymous_visitor_is_redirected_to_login() {
    let server = TestServer::spawn(ScriptedBackend::new(true)).await;
    let client = http_client();

    let res = client
        .get(format!("{}/hod/dashboard", server.base_url))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        res.headers().get("location").unwrap(),
        "/admin/hod/login"
    );
}

#[tokio::test]
async fn wrong_password_surfaces_as_invalid_credentials() {
    let server = TestServer::spawn(ScriptedBackend::new(true)).await;
    let client = http_client();

    let res = client
        .post(format!("{}/admin/hod/login", server.base_url))
        .json(&serde_json::json!({ "email": HOD_EMAIL, "password": "guesswork" }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_credentials");
}

#[tokio::test]
async fn enrolled_hod_reaches_the_dashboard() {
    let server = TestServer::spawn(ScriptedBackend::new(true)).await;
    let client = http_client();

    let res = client
        .post(format!("{}/admin/hod/login", server.base_url))
        .json(&serde_json::json!({ "email": HOD_EMAIL, "password": HOD_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["user"]["displayName"], "Dr. Asha Verma");

    let res = client
        .get(format!("{}/hod/dashboard", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["user"]["email"], HOD_EMAIL);

    let res = client
        .get(format!("{}/hod/session", server.base_url))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["state"], "authorized");
}

#[tokio::test]
async fn unenrolled_account_is_denied_and_signed_out() {
    let backend = ScriptedBackend::new(false);
    let server = TestServer::spawn(Arc::clone(&backend)).await;
    let client = http_client();

    let res = client
        .post(format!("{}/admin/hod/login", server.base_url))
        .json(&serde_json::json!({ "email": HOD_EMAIL, "password": HOD_PASSWORD }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "access_denied");
    assert_eq!(backend.sign_out_calls.load(Ordering::SeqCst), 1);

    // The denial leaves no resurrectable session behind.
    let res = client
        .get(format!("{}/hod/dashboard", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn logout_revokes_dashboard_access() {
    let server = TestServer::spawn(ScriptedBackend::new(true)).await;
    let client = http_client();

    let res = client
        .post(format!("{}/admin/hod/login", server.base_url))
        .json(&serde_json::json!({ "email": HOD_EMAIL, "password": HOD_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(format!("{}/hod/logout", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(format!("{}/hod/dashboard", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
}
