use std::net::SocketAddr;
use std::sync::Arc;

use common::RetryPolicy;
use docstore::{DocumentStore, MemoryDocumentStore};
use reqwest::Client;
use serde_json::Value;

use server::config::{AppConfig, AuthConfig, CorsConfig, ServerConfig, StoreBackend, StoreConfig};
use server::database::build_registry;
use server::identity::JwtIdentityVerifier;
use server::state::AppState;
use server::utils::jwt;

pub const JWT_SECRET: &str = "test-secret-for-integration-tests";

pub mod routes {
    pub const REGISTER: &str = "/api/v1/auth/register";
    pub const LOGIN: &str = "/api/v1/auth/login";
    pub const ME: &str = "/api/v1/auth/me";
    pub const VMS: &str = "/api/v1/vms";
    pub const PAYOUTS: &str = "/api/v1/payouts";

    pub fn vm(id: &str) -> String {
        format!("/api/v1/vms/{id}")
    }

    pub fn vm_metrics(id: &str) -> String {
        format!("/api/v1/vms/{id}/metrics")
    }

    pub fn payout(id: &str) -> String {
        format!("/api/v1/payouts/{id}")
    }

    pub fn payout_status(id: &str) -> String {
        format!("/api/v1/payouts/{id}/status")
    }
}

/// A running test server backed by a fresh in-memory document store.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestResponse {
    async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self { status, text, body }
    }
}

/// Mint an identity token for `subject` the way the identity provider would.
pub fn token_for(subject: &str) -> String {
    jwt::sign(
        subject,
        Some(&format!("{subject}@idp.example")),
        JWT_SECRET,
        chrono::Duration::hours(1),
    )
    .expect("Failed to sign test token")
}

impl TestApp {
    pub async fn spawn() -> Self {
        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig::default(),
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
                url: None,
                max_connections: 1,
                retry: RetryPolicy::default(),
            },
            auth: AuthConfig {
                jwt_secret: JWT_SECRET.to_string(),
                public_key_pem: None,
                issuer: None,
                audience: None,
            },
        };

        let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
        let registry = build_registry(store, app_config.store.retry);
        let identity = JwtIdentityVerifier::from_config(&app_config.auth)
            .expect("Failed to build identity verifier");
        let state = AppState::new(app_config, Arc::new(identity), &registry)
            .expect("Failed to wire application state");

        let app = server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn post_without_token(&self, path: &str, body: &Value) -> TestResponse {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to send POST request");

        TestResponse::from_response(res).await
    }

    pub async fn get_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn get_without_token(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn patch_with_token(&self, path: &str, body: &Value, token: &str) -> TestResponse {
        let res = self
            .client
            .patch(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .json(body)
            .send()
            .await
            .expect("Failed to send PATCH request");

        TestResponse::from_response(res).await
    }

    pub async fn delete_with_token(&self, path: &str, token: &str) -> TestResponse {
        let res = self
            .client
            .delete(self.url(path))
            .header("Authorization", format!("Bearer {token}"))
            .send()
            .await
            .expect("Failed to send DELETE request");

        TestResponse::from_response(res).await
    }

    /// Register a provider for `subject` and return its token.
    pub async fn create_registered_provider(&self, subject: &str, name: &str) -> String {
        let token = token_for(subject);
        let res = self
            .post_with_token(routes::REGISTER, &serde_json::json!({ "name": name }), &token)
            .await;
        assert_eq!(res.status, 201, "Registration failed: {}", res.text);
        token
    }

    /// Create a VM via the API and return its `vm_id`.
    pub async fn create_vm(&self, token: &str, vm_id: &str, name: &str) -> String {
        let res = self
            .post_with_token(
                routes::VMS,
                &serde_json::json!({
                    "vm_id": vm_id,
                    "name": name,
                    "cpu_cores": 8,
                    "ram_gb": 32,
                    "cost_per_hour": "1.25",
                }),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "create_vm failed: {}", res.text);
        res.body["vm_id"]
            .as_str()
            .expect("VM response should contain a vm_id")
            .to_string()
    }

    /// Create a payout via the API and return its `id`.
    pub async fn create_payout(&self, token: &str, amount: &str) -> String {
        let res = self
            .post_with_token(
                routes::PAYOUTS,
                &serde_json::json!({ "amount": amount, "method": "bank_transfer" }),
                token,
            )
            .await;
        assert_eq!(res.status, 201, "create_payout failed: {}", res.text);
        res.body["id"]
            .as_str()
            .expect("Payout response should contain an id")
            .to_string()
    }
}
