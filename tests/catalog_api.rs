use std::sync::Arc;

use cerebrum::api::{AppState, TokenVerifier};
use cerebrum::config::AuthConfig;
use cerebrum::{build_app, MemoryStore};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;

const SECRET: &str = "catalog-integration-secret";
const WRITER_SUB: &str = "writer-sub-0001";

const KIT_ID: &str = "org-1b2c3d4e-5e1f-11ea-8a4b-0242ac130002";
const DESY_ID: &str = "org-2b2c3d4e-5e1f-11ea-8a4b-0242ac130002";
const MISSING_ORG_ID: &str = "org-9f9f9f9f-5e1f-11ea-8a4b-0242ac130002";

// Test client wrapper for making API calls
struct TestClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl TestClient {
    fn new(base_url: String, token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            token,
        }
    }

    fn anonymous(&self) -> Self {
        Self::new(self.base_url.clone(), None)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> reqwest::Result<Response> {
        self.authorized(self.client.get(self.url(path))).send().await
    }

    async fn post(&self, path: &str, json: Value) -> reqwest::Result<Response> {
        self.authorized(self.client.post(self.url(path)).json(&json))
            .send()
            .await
    }

    async fn put(&self, path: &str, json: Value) -> reqwest::Result<Response> {
        self.authorized(self.client.put(self.url(path)).json(&json))
            .send()
            .await
    }

    async fn patch(&self, path: &str, operations: Value) -> reqwest::Result<Response> {
        let builder = self
            .client
            .patch(self.url(path))
            .header("content-type", "application/json-patch+json")
            .body(operations.to_string());
        self.authorized(builder).send().await
    }

    async fn delete(&self, path: &str) -> reqwest::Result<Response> {
        self.authorized(self.client.delete(self.url(path))).send().await
    }
}

fn mint_token(subject: &str) -> String {
    let exp = chrono::Utc::now().timestamp() + 3600;
    encode(
        &Header::default(),
        &json!({ "sub": subject, "exp": exp, "roles": ["catalog-writer"] }),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn spawn_app() -> TestClient {
    let auth = AuthConfig {
        jwt_secret: Some(SECRET.to_string()),
        ..AuthConfig::default()
    };
    let verifier = TokenVerifier::from_config(&auth).unwrap();
    let state = AppState::new(Arc::new(MemoryStore::new()), verifier);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_app(state)).await.unwrap();
    });

    TestClient::new(format!("http://{}", address), Some(mint_token(WRITER_SUB)))
}

async fn body(response: Response) -> Value {
    response.json::<Value>().await.unwrap()
}

fn kit() -> Value {
    json!({
        "name": "Karlsruhe Institute of Technology",
        "abbreviation": "KIT",
        "url": "https://www.kit.edu"
    })
}

fn desy() -> Value {
    json!({
        "name": "Deutsches Elektronen-Synchrotron",
        "abbreviation": "DESY",
        "url": "https://www.desy.de"
    })
}

#[tokio::test]
async fn test_health_check() {
    let client = spawn_app().await;
    let response = client.get("/health").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_put_creates_then_updates_organization() {
    let client = spawn_app().await;
    let path = format!("/api/v0/organizations/{}", KIT_ID);

    let response = client.put(&path, kit()).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    assert_eq!(location.as_deref(), Some(path.as_str()));
    let created = body(response).await;
    assert_eq!(created["uuid"], KIT_ID);
    assert_eq!(created["abbreviation"], "KIT");

    let mut renamed = kit();
    renamed["name"] = json!("KIT - The Research University in the Helmholtz Association");
    let response = client.put(&path, renamed).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body(response).await;
    assert_eq!(updated["uuid"], KIT_ID);
    assert_eq!(
        updated["name"],
        "KIT - The Research University in the Helmholtz Association"
    );

    let fetched = body(client.get(&path).await.unwrap()).await;
    assert_eq!(fetched, updated);
}

#[tokio::test]
async fn test_post_generates_identifier() {
    let client = spawn_app().await;
    let response = client.post("/api/v0/organizations", kit()).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let created = body(response).await;
    let id = created["uuid"].as_str().unwrap().to_string();
    assert!(id.starts_with("org-"));
    assert!(cerebrum::model::is_valid(&id));

    let response = client
        .get(&format!("/api/v0/organizations/{}", id))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_post_without_url_is_rejected() {
    let client = spawn_app().await;
    let response = client
        .post("/api/v0/organizations", json!({ "name": "Helmholtz Munich" }))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let error = body(response).await;
    assert_eq!(error["status"], 400);
    let errors: Vec<&str> = error["errors"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(errors.contains(&"url: must not be null"));

    let page = body(client.get("/api/v0/organizations").await.unwrap()).await;
    assert_eq!(page["totalElements"], 0);
}

#[tokio::test]
async fn test_patch_unknown_entity_is_not_found() {
    let client = spawn_app().await;
    let response = client
        .patch(
            &format!("/api/v0/organizations/{}", MISSING_ORG_ID),
            json!([{ "op": "replace", "path": "/name", "value": "Nobody" }]),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body(response).await["errors"][0], "Entity not found");
}

#[tokio::test]
async fn test_patch_applies_operations() {
    let client = spawn_app().await;
    let path = format!("/api/v0/organizations/{}", KIT_ID);
    client.put(&path, kit()).await.unwrap();

    let response = client
        .patch(
            &path,
            json!([
                { "op": "replace", "path": "/abbreviation", "value": "K.I.T." },
                { "op": "add", "path": "/img", "value": "https://www.kit.edu/logo.svg" }
            ]),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let patched = body(response).await;
    assert_eq!(patched["uuid"], KIT_ID);
    assert_eq!(patched["abbreviation"], "K.I.T.");
    assert_eq!(patched["img"], "https://www.kit.edu/logo.svg");

    // Patched documents are validated like full bodies
    let response = client
        .patch(&path, json!([{ "op": "remove", "path": "/url" }]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .patch(&path, json!({ "op": "replace", "path": "/name", "value": "x" }))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_provider_relationships() {
    let client = spawn_app().await;
    client
        .put(&format!("/api/v0/organizations/{}", KIT_ID), kit())
        .await
        .unwrap();

    // Unresolvable target: the provider is stored without the edge
    let response = client
        .post(
            "/api/v0/serviceProviders",
            json!({ "organization": MISSING_ORG_ID }),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body(response).await["organization"], Value::Null);

    let response = client
        .post("/api/v0/serviceProviders", json!({ "organization": KIT_ID }))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let provider = body(response).await;
    assert_eq!(provider["organization"], KIT_ID);
    let provider_id = provider["uuid"].as_str().unwrap().to_string();
    assert!(provider_id.starts_with("svc-"));

    let response = client
        .post(
            "/api/v0/services",
            json!({
                "name": "Helmholtz Cloud Storage",
                "url": "https://storage.example.org",
                "lifecycleStatus": "PRODUCTION",
                "providedBy": provider_id
            }),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let service = body(response).await;
    assert_eq!(service["providedBy"], provider_id.as_str());
    assert!(service["created"].is_string());
    let service_id = service["uuid"].as_str().unwrap().to_string();

    let provider = body(
        client
            .get(&format!("/api/v0/serviceProviders/{}", provider_id))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(provider["serviceList"], json!([service_id]));

    let organization = body(
        client
            .get(&format!("/api/v0/organizations/{}", KIT_ID))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(organization["serviceList"], json!([service_id]));
}

#[tokio::test]
async fn test_identifier_bound_to_other_kind_is_rejected() {
    let client = spawn_app().await;
    let response = client
        .post("/api/v0/serviceProviders", json!({ "organization": KIT_ID }))
        .await
        .unwrap();
    let provider_id = body(response).await["uuid"].as_str().unwrap().to_string();

    let response = client
        .put(
            &format!("/api/v0/services/{}", provider_id),
            json!({ "name": "Clash", "lifecycleStatus": "PRODUCTION", "providedBy": provider_id }),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_identifier_is_bad_request() {
    let client = spawn_app().await;
    for path in [
        "/api/v0/organizations/not-an-id",
        "/api/v0/organizations/abc-1b2c3d4e-5e1f-11ea-8a4b-0242ac130002",
    ] {
        let response = client.get(path).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(response).await["errors"][0], "Invalid uuid");
    }
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let client = spawn_app().await;
    let path = format!("/api/v0/organizations/{}", KIT_ID);
    client.put(&path, kit()).await.unwrap();

    let response = client.delete(&path).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = client.get(&path).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client.delete(&path).await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_paging_and_sorting() {
    let client = spawn_app().await;
    client
        .put(&format!("/api/v0/organizations/{}", KIT_ID), kit())
        .await
        .unwrap();
    client
        .put(&format!("/api/v0/organizations/{}", DESY_ID), desy())
        .await
        .unwrap();

    let page = body(client.get("/api/v0/organizations").await.unwrap()).await;
    assert_eq!(page["totalElements"], 2);
    assert_eq!(page["content"][0]["abbreviation"], "DESY");

    let page = body(
        client
            .get("/api/v0/organizations?sort=abbreviation.desc&size=1")
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(page["content"].as_array().unwrap().len(), 1);
    assert_eq!(page["content"][0]["abbreviation"], "KIT");
    assert_eq!(page["totalPages"], 2);
    assert_eq!(page["sort"][0]["direction"], "DESC");

    for query in ["page=-1", "size=0", "sort=color.asc"] {
        let response = client
            .get(&format!("/api/v0/organizations?{}", query))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", query);
    }
}

#[tokio::test]
async fn test_mutations_require_token() {
    let client = spawn_app().await;
    let anonymous = client.anonymous();

    let response = anonymous.post("/api/v0/organizations", kit()).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body(response).await["status"], 401);

    // Reads stay public
    let response = anonymous.get("/api/v0/organizations").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let forged = TestClient::new(client.base_url.clone(), Some("not.a.jwt".to_string()));
    let response = forged.delete(&format!("/api/v0/organizations/{}", KIT_ID)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_whoami() {
    let client = spawn_app().await;

    let response = client.get("/api/v0/users/whoami").await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .post(
            "/api/v0/users",
            json!({
                "firstName": "Ada",
                "lastName": "Lovelace",
                "screenName": "ada",
                "email": "ada@example.org",
                "sub": WRITER_SUB
            }),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client.get("/api/v0/users/whoami").await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let me = body(response).await;
    assert_eq!(me["sub"], WRITER_SUB);
    assert!(me["uuid"].as_str().unwrap().starts_with("usr-"));

    let response = client.anonymous().get("/api/v0/users/whoami").await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route() {
    let client = spawn_app().await;
    let response = client.get("/api/v0/widgets").await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body(response).await["message"],
        "No handler found for GET /api/v0/widgets"
    );
}

#[tokio::test]
async fn test_put_with_unresolved_organization() {
    let client = spawn_app().await;
    let provider_path = "/api/v0/serviceProviders/svc-3b2c3d4e-5e1f-11ea-8a4b-0242ac130002";

    let response = client
        .put(provider_path, json!({ "organization": MISSING_ORG_ID }))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body(response).await["organization"], Value::Null);

    client
        .put(&format!("/api/v0/organizations/{}", KIT_ID), kit())
        .await
        .unwrap();
    let response = client
        .put(provider_path, json!({ "organization": KIT_ID }))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await["organization"], KIT_ID);

    let response = client
        .put(provider_path, json!({ "organization": MISSING_ORG_ID }))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await["organization"], Value::Null);

    let provider = body(client.get(provider_path).await.unwrap()).await;
    assert_eq!(provider["organization"], Value::Null);
}

#[tokio::test]
async fn test_patch_service_with_unresolved_provider() {
    let client = spawn_app().await;
    let response = client
        .post(
            "/api/v0/services",
            json!({ "name": "Rocket.Chat", "providedBy": MISSING_ORG_ID }),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = body(response).await["uuid"].as_str().unwrap().to_string();

    let response = client
        .patch(
            &format!("/api/v0/services/{}", id),
            json!([{ "op": "add", "path": "/description", "value": "Team chat" }]),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let patched = body(response).await;
    assert_eq!(patched["description"], "Team chat");
    assert_eq!(patched["providedBy"], Value::Null);
}
