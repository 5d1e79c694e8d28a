use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Value, json};

use rollcall_api::app::{build_app_with, services::AppServices};
use rollcall_audit::{AuditError, AuditLog, InMemoryAuditLog, LogEntry, NewLogEntry};
use rollcall_auth::{CreateUser, JwtClaims, PasswordHasher, User};
use rollcall_core::{FileId, PageRequest, PersonId, UserId};
use rollcall_infra::{
    AppConfig, ConflictPolicy, FileRepository, InMemoryStore, PersonRepository, StoreError,
    StoredFile, UserRepository,
};
use rollcall_people::{NewPerson, Person};

const ADMIN: i32 = 3;
const OPERATOR: i32 = 2;
const MEMBER: i32 = 1;

struct TestServer {
    base_url: String,
    config: AppConfig,
    store: Arc<InMemoryStore>,
    audit: Arc<InMemoryAuditLog>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(AppConfig::for_tests()).await
    }

    async fn spawn_with(config: AppConfig) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let audit = Arc::new(InMemoryAuditLog::new());
        let services = AppServices::with_stores(
            config.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            audit.clone(),
        )
        .expect("test config is valid");
        let (base_url, handle) = serve(services).await;

        Self {
            base_url,
            config,
            store,
            audit,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn token(&self, profile: i32) -> String {
        mint_jwt(&self.config.jwt_secret, UserId::new(), profile, ChronoDuration::minutes(10))
    }

    async fn seed_person(&self, name: &str, document: &str) -> Person {
        let new = NewPerson::validate(
            Some(name.to_string()),
            Some("555-0100".to_string()),
            Some(document.to_string()),
        )
        .unwrap();
        let person = Person::register(new, Utc::now());
        PersonRepository::insert(self.store.as_ref(), &person).await.unwrap();
        person
    }

    async fn seed_user(&self, person: &Person, email: &str, password: &str, profile: i32) -> User {
        let cmd = CreateUser::validate(
            Some(email.to_string()),
            Some(password.to_string()),
            Some(profile),
        )
        .unwrap();
        let hash = PasswordHasher::new(4).unwrap().hash(password).unwrap();
        let user = User::register(person.id, cmd, hash, Utc::now());
        UserRepository::insert(self.store.as_ref(), &user).await.unwrap();
        user
    }

    async fn stored_user(&self, id: UserId) -> User {
        UserRepository::get(self.store.as_ref(), id).await.unwrap().unwrap()
    }

    async fn stored_person(&self, id: PersonId) -> Person {
        PersonRepository::get(self.store.as_ref(), id).await.unwrap().unwrap()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Same router as prod, bound to an ephemeral port.
async fn serve(services: AppServices) -> (String, tokio::task::JoinHandle<()>) {
    let app = build_app_with(Arc::new(services));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind ephemeral port");
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), handle)
}

fn mint_jwt(jwt_secret: &str, sub: UserId, profile: i32, ttl: ChronoDuration) -> String {
    let claims = JwtClaims::new(sub, profile, Utc::now(), ttl);

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

async fn error_of(res: reqwest::Response) -> String {
    let body: Value = res.json().await.unwrap();
    body["error"].as_str().unwrap_or_default().to_string()
}

// -------------------------
// Authentication
// -------------------------

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/people")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .get(srv.url("/people"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_tokens_are_rejected() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(
        &srv.config.jwt_secret,
        UserId::new(),
        ADMIN,
        ChronoDuration::minutes(-1),
    );

    let res = srv
        .client
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn whoami_reports_the_classified_role() {
    let srv = TestServer::spawn().await;
    let user_id = UserId::new();
    let token = mint_jwt(&srv.config.jwt_secret, user_id, OPERATOR, ChronoDuration::minutes(5));

    let res = srv
        .client
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user_id"], user_id.to_string());
    assert_eq!(body["profile"], OPERATOR);
    assert_eq!(body["role"], "operator");
}

#[tokio::test]
async fn session_login_issues_a_usable_token() {
    let srv = TestServer::spawn().await;
    let person = srv.seed_person("Ada", "111").await;
    let user = srv.seed_user(&person, "ada@example.com", "123456", ADMIN).await;

    let res = srv
        .client
        .post(srv.url("/sessions"))
        .json(&json!({ "email": "ADA@example.com", "password": "123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user"]["id"], user.id.to_string());
    assert_eq!(body["user"]["profile"], ADMIN);
    let token = body["token"].as_str().unwrap().to_string();

    let res = srv
        .client
        .get(srv.url("/people?page=1"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn session_login_rejects_bad_credentials() {
    let srv = TestServer::spawn().await;
    let person = srv.seed_person("Ada", "111").await;
    srv.seed_user(&person, "ada@example.com", "123456", ADMIN).await;

    for body in [
        json!({ "email": "ada@example.com", "password": "654321" }),
        json!({ "email": "bob@example.com", "password": "123456" }),
        json!({ "email": "ada@example.com" }),
    ] {
        let res = srv
            .client
            .post(srv.url("/sessions"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_of(res).await, "Invalid credentials");
    }
}

// -------------------------
// Permission gate
// -------------------------

#[tokio::test]
async fn non_admin_cannot_list_people() {
    let srv = TestServer::spawn().await;

    for level in [MEMBER, OPERATOR] {
        let res = srv
            .client
            .get(srv.url("/people?page=1"))
            .bearer_auth(srv.token(level))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body, json!({ "error": "User does not have permission" }));
    }
}

#[tokio::test]
async fn non_admin_update_leaves_person_untouched() {
    let srv = TestServer::spawn().await;
    let person = srv.seed_person("Ada", "111").await;

    let res = srv
        .client
        .put(srv.url(&format!("/people/{}", person.id)))
        .bearer_auth(srv.token(OPERATOR))
        .json(&json!({ "name": "Mallory" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(res).await, "User does not have permission");
    assert_eq!(srv.stored_person(person.id).await.name, "Ada");
}

#[tokio::test]
async fn members_cannot_create_users() {
    let srv = TestServer::spawn().await;
    let person = srv.seed_person("Ada", "111").await;

    let res = srv
        .client
        .post(srv.url(&format!("/users/{}", person.id)))
        .bearer_auth(srv.token(MEMBER))
        .json(&json!({ "email": "a@b.com", "password": "123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(srv.audit.entries().is_empty());
}

#[tokio::test]
async fn thresholds_come_from_config() {
    let mut config = AppConfig::for_tests();
    config.thresholds = rollcall_auth::ProfileThresholds::new(10, 5).unwrap();
    let srv = TestServer::spawn_with(config).await;

    let res = srv
        .client
        .get(srv.url("/people"))
        .bearer_auth(srv.token(ADMIN))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .get(srv.url("/people"))
        .bearer_auth(srv.token(10))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

// -------------------------
// People
// -------------------------

#[tokio::test]
async fn person_lifecycle_create_show_update() {
    let srv = TestServer::spawn().await;
    let token = srv.token(ADMIN);

    let res = srv
        .client
        .post(srv.url("/people"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Ada", "phone": "555-0100", "document": "111" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let created: Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["document"], "111");

    let res = srv
        .client
        .get(srv.url(&format!("/people/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let shown: Value = res.json().await.unwrap();
    assert_eq!(shown["name"], "Ada");

    let res = srv
        .client
        .put(srv.url(&format!("/people/{id}")))
        .bearer_auth(&token)
        .json(&json!({ "phone": "555-0199" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["phone"], "555-0199");
    assert_eq!(updated["name"], "Ada");
}

#[tokio::test]
async fn duplicate_document_is_rejected() {
    let srv = TestServer::spawn().await;
    srv.seed_person("Ada", "111").await;

    let res = srv
        .client
        .post(srv.url("/people"))
        .bearer_auth(srv.token(MEMBER))
        .json(&json!({ "name": "Impostor", "phone": "555-0111", "document": "111" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(res).await, "Person already exists.");
}

#[tokio::test]
async fn person_create_requires_every_field() {
    let srv = TestServer::spawn().await;

    for body in [
        json!({ "name": "Ada", "phone": "555-0100" }),
        json!({ "name": "", "phone": "555-0100", "document": "111" }),
        json!("not an object"),
    ] {
        let res = srv
            .client
            .post(srv.url("/people"))
            .bearer_auth(srv.token(MEMBER))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            error_of(res).await,
            "Validation fail. Some required field is missing"
        );
    }
}

#[tokio::test]
async fn show_returns_null_for_absent_person_and_400_for_bad_id() {
    let srv = TestServer::spawn().await;
    let token = srv.token(MEMBER);

    let res = srv
        .client
        .get(srv.url(&format!("/people/{}", PersonId::new())))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert!(body.is_null());

    let res = srv
        .client
        .get(srv.url("/people/42"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(res).await, "Invalid id");
}

#[tokio::test]
async fn update_unknown_person_is_404() {
    let srv = TestServer::spawn().await;

    let res = srv
        .client
        .put(srv.url(&format!("/people/{}", PersonId::new())))
        .bearer_auth(srv.token(ADMIN))
        .json(&json!({ "name": "Ghost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_of(res).await, "Person not found");
}

#[tokio::test]
async fn update_reports_only_the_first_validation_issue() {
    let srv = TestServer::spawn().await;
    let ada = srv.seed_person("Ada", "111").await;
    srv.seed_person("Bob", "222").await;
    let token = srv.token(ADMIN);

    let res = srv
        .client
        .put(srv.url(&format!("/people/{}", ada.id)))
        .bearer_auth(&token)
        .json(&json!({ "name": "", "phone": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let issue: Value = res.json().await.unwrap();
    assert_eq!(issue["message"], "Validation notEmpty on name failed");
    assert_eq!(issue["type"], "Validation error");
    assert_eq!(issue["path"], "name");

    let res = srv
        .client
        .put(srv.url(&format!("/people/{}", ada.id)))
        .bearer_auth(&token)
        .json(&json!({ "document": "222" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let issue: Value = res.json().await.unwrap();
    assert_eq!(issue["type"], "unique violation");
    assert_eq!(issue["value"], "222");
    assert_eq!(srv.stored_person(ada.id).await.document, "111");
}

#[tokio::test]
async fn unreadable_update_bodies_are_validation_issues() {
    let srv = TestServer::spawn().await;
    let ada = srv.seed_person("Ada", "111").await;
    let token = srv.token(ADMIN);
    let url = srv.url(&format!("/people/{}", ada.id));

    let requests = [
        srv.client.put(&url).json(&json!({ "name": 5 })),
        srv.client
            .put(&url)
            .header(CONTENT_TYPE, "application/json")
            .body("not json"),
        srv.client.put(&url),
    ];
    for request in requests {
        let res = request.bearer_auth(&token).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let issue: Value = res.json().await.unwrap();
        assert_eq!(issue["message"], "Validation failed. Malformed request body");
        assert_eq!(issue["type"], "Validation error");
        assert_eq!(issue["path"], "body");
    }

    assert_eq!(srv.stored_person(ada.id).await, ada);
}

#[tokio::test]
async fn person_pages_are_offset_by_twenty() {
    let srv = TestServer::spawn().await;
    for i in 0..25 {
        srv.seed_person(&format!("person-{i:02}"), &format!("doc-{i}")).await;
    }
    let token = srv.token(ADMIN);

    let page = |n: u32| {
        let srv = &srv;
        let token = token.clone();
        async move {
            let res = srv
                .client
                .get(srv.url(&format!("/people?page={n}")))
                .bearer_auth(token)
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
            res.json::<Vec<Value>>().await.unwrap()
        }
    };

    let first = page(1).await;
    let second = page(2).await;
    assert_eq!(first.len(), 20);
    assert_eq!(second.len(), 5);
    assert_eq!(first[0]["name"], "person-00");
    assert_eq!(second[0]["name"], "person-20");

    for bad in ["0", "abc", "-1"] {
        let res = srv
            .client
            .get(srv.url(&format!("/people?page={bad}")))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_of(res).await, "Invalid page");
    }
}

#[tokio::test]
async fn unreadable_page_queries_are_invalid_pages() {
    let srv = TestServer::spawn().await;
    let token = srv.token(ADMIN);

    for path in ["/people?page=1&page=2", "/users?page=1&page=2"] {
        let res = srv
            .client
            .get(srv.url(path))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_of(res).await, "Invalid page");
    }
}

// -------------------------
// Users
// -------------------------

#[tokio::test]
async fn create_user_succeeds_and_is_audited() {
    let srv = TestServer::spawn().await;
    let person = srv.seed_person("Ada", "111").await;
    let actor = UserId::new();
    let token = mint_jwt(&srv.config.jwt_secret, actor, OPERATOR, ChronoDuration::minutes(5));

    let res = srv
        .client
        .post(srv.url(&format!("/users/{}", person.id)))
        .bearer_auth(token)
        .json(&json!({ "email": "a@b.com", "password": "123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["person_id"], person.id.to_string());
    assert_eq!(body["email"], "a@b.com");
    assert_eq!(body["profile"], 1);
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());

    let entries = srv.audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].body.user, actor);
    assert_eq!(entries[0].body.application, "rollcall/acme");
    assert!(entries[0].body.content.starts_with("Um novo usuário para Ada foi criado na "));
}

#[tokio::test]
async fn create_user_validation_and_missing_person() {
    let srv = TestServer::spawn().await;
    let person = srv.seed_person("Ada", "111").await;
    let token = srv.token(ADMIN);

    let res = srv
        .client
        .post(srv.url(&format!("/users/{}", person.id)))
        .bearer_auth(&token)
        .json(&json!({ "email": "not-an-email", "password": "123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(res).await, "Validation fail. Some field is missing.");

    let res = srv
        .client
        .post(srv.url(&format!("/users/{}", person.id)))
        .bearer_auth(&token)
        .json(&json!({ "email": "a@b.com", "password": "12345" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .post(srv.url(&format!("/users/{}", PersonId::new())))
        .bearer_auth(&token)
        .json(&json!({ "email": "a@b.com", "password": "123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(res).await, "Person not found");
    assert!(srv.audit.entries().is_empty());
}

#[tokio::test]
async fn observed_policy_reports_duplicate_email_but_still_writes() {
    let srv = TestServer::spawn().await;
    let ada = srv.seed_person("Ada", "111").await;
    let bob = srv.seed_person("Bob", "222").await;
    srv.seed_user(&ada, "a@b.com", "123456", MEMBER).await;

    let res = srv
        .client
        .post(srv.url(&format!("/users/{}", bob.id)))
        .bearer_auth(srv.token(ADMIN))
        .json(&json!({ "email": "a@b.com", "password": "123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(res).await, "Email already exists.");

    assert!(srv.store.find_by_person(bob.id).await.unwrap().is_some());
    assert_eq!(srv.audit.entries().len(), 1);
}

#[tokio::test]
async fn strict_policy_stops_at_the_first_conflict() {
    let mut config = AppConfig::for_tests();
    config.conflict_policy = ConflictPolicy::Strict;
    let srv = TestServer::spawn_with(config).await;
    let ada = srv.seed_person("Ada", "111").await;
    srv.seed_user(&ada, "a@b.com", "123456", MEMBER).await;

    let res = srv
        .client
        .post(srv.url(&format!("/users/{}", ada.id)))
        .bearer_auth(srv.token(ADMIN))
        .json(&json!({ "email": "other@b.com", "password": "123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(res).await, "Person already has a user.");

    assert!(srv.store.find_by_email("other@b.com").await.unwrap().is_none());
    assert!(srv.audit.entries().is_empty());
}

#[tokio::test]
async fn user_listing_is_admin_only_and_joined_with_person() {
    let srv = TestServer::spawn().await;
    let ada = srv.seed_person("Ada", "111").await;
    srv.seed_user(&ada, "ada@example.com", "123456", MEMBER).await;

    let res = srv
        .client
        .get(srv.url("/users"))
        .bearer_auth(srv.token(OPERATOR))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .get(srv.url("/users?page=1"))
        .bearer_auth(srv.token(ADMIN))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let rows: Vec<Value> = res.json().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["email"], "ada@example.com");
    assert_eq!(rows[0]["person"], json!({ "name": "Ada", "phone": "555-0100" }));
    assert!(rows[0].get("password_hash").is_none());
}

#[tokio::test]
async fn user_pages_are_offset_by_twenty() {
    let srv = TestServer::spawn().await;
    for i in 0..23 {
        let person = srv.seed_person(&format!("person-{i:02}"), &format!("doc-{i}")).await;
        srv.seed_user(&person, &format!("user-{:02}@example.com", 22 - i), "123456", MEMBER)
            .await;
    }

    let res = srv
        .client
        .get(srv.url("/users?page=2"))
        .bearer_auth(srv.token(ADMIN))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let rows: Vec<Value> = res.json().await.unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["email"], "user-20@example.com");
    assert_eq!(rows[0]["person"]["name"], "person-02");
    assert_eq!(rows[2]["email"], "user-22@example.com");
}

#[tokio::test]
async fn update_user_changes_password_and_avatar() {
    let srv = TestServer::spawn().await;
    let ada = srv.seed_person("Ada", "111").await;
    let user = srv.seed_user(&ada, "ada@example.com", "123456", MEMBER).await;
    let avatar = StoredFile {
        id: FileId::new(),
        name: "ada.png".to_string(),
        path: "avatars/ada.png".to_string(),
    };
    FileRepository::insert(srv.store.as_ref(), &avatar).await.unwrap();

    let res = srv
        .client
        .put(srv.url(&format!("/users/{}", user.id)))
        .bearer_auth(srv.token(OPERATOR))
        .json(&json!({
            "profile": 2,
            "avatar_id": avatar.id.to_string(),
            "oldPassword": "123456",
            "password": "abcdef",
            "confirmPassword": "abcdef",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["name"], "Ada");
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["profile"], 2);
    assert_eq!(body["avatar"]["id"], avatar.id.to_string());
    assert_eq!(body["avatar"]["url"], "http://localhost/files/avatars/ada.png");

    let stored = srv.stored_user(user.id).await;
    let hasher = PasswordHasher::new(4).unwrap();
    assert!(hasher.verify("abcdef", &stored.password_hash).unwrap());

    let entries = srv.audit.entries();
    assert_eq!(entries.len(), 1);
    assert!(entries[0]
        .body
        .content
        .starts_with("O usuário de login ada@example.com foi modificado em "));
}

#[tokio::test]
async fn update_user_validation_rules() {
    let srv = TestServer::spawn().await;
    let ada = srv.seed_person("Ada", "111").await;
    let user = srv.seed_user(&ada, "ada@example.com", "123456", MEMBER).await;
    let token = srv.token(ADMIN);

    for body in [
        json!({ "oldPassword": "123456" }),
        json!({ "password": "abcdef" }),
        json!({ "password": "abcdef", "confirmPassword": "abcdeg" }),
        json!({ "email": "nope" }),
        json!({ "avatar_id": "42" }),
    ] {
        let res = srv
            .client
            .put(srv.url(&format!("/users/{}", user.id)))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "body: {body}");
        assert_eq!(error_of(res).await, "Validation fail. Some field is missing.");
    }

    let res = srv
        .client
        .put(srv.url(&format!("/users/{}", UserId::new())))
        .bearer_auth(&token)
        .json(&json!({ "profile": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_of(res).await, "User not found");

    let res = srv
        .client
        .put(srv.url(&format!("/users/{}", user.id)))
        .bearer_auth(&token)
        .json(&json!({ "avatar_id": FileId::new().to_string() }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(res).await, "Avatar not found");
    assert!(srv.audit.entries().is_empty());
}

#[tokio::test]
async fn wrong_old_password_is_reported_but_applied_under_observed_policy() {
    let srv = TestServer::spawn().await;
    let ada = srv.seed_person("Ada", "111").await;
    let user = srv.seed_user(&ada, "ada@example.com", "123456", MEMBER).await;

    let res = srv
        .client
        .put(srv.url(&format!("/users/{}", user.id)))
        .bearer_auth(srv.token(ADMIN))
        .json(&json!({
            "profile": 3,
            "oldPassword": "wrong-password",
            "password": "abcdef",
            "confirmPassword": "abcdef",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(res).await, "Password does not match");

    let stored = srv.stored_user(user.id).await;
    assert_eq!(stored.profile, 3);
    assert_eq!(srv.audit.entries().len(), 1);
}

#[tokio::test]
async fn wrong_old_password_changes_nothing_under_strict_policy() {
    let mut config = AppConfig::for_tests();
    config.conflict_policy = ConflictPolicy::Strict;
    let srv = TestServer::spawn_with(config).await;
    let ada = srv.seed_person("Ada", "111").await;
    let user = srv.seed_user(&ada, "ada@example.com", "123456", MEMBER).await;

    let res = srv
        .client
        .put(srv.url(&format!("/users/{}", user.id)))
        .bearer_auth(srv.token(ADMIN))
        .json(&json!({
            "profile": 3,
            "oldPassword": "wrong-password",
            "password": "abcdef",
            "confirmPassword": "abcdef",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let stored = srv.stored_user(user.id).await;
    assert_eq!(stored.profile, MEMBER);
    assert!(srv.audit.entries().is_empty());
}

#[tokio::test]
async fn taken_email_on_update_is_reported() {
    let srv = TestServer::spawn().await;
    let ada = srv.seed_person("Ada", "111").await;
    let bob = srv.seed_person("Bob", "222").await;
    let user = srv.seed_user(&ada, "ada@example.com", "123456", MEMBER).await;
    srv.seed_user(&bob, "bob@example.com", "123456", MEMBER).await;

    let res = srv
        .client
        .put(srv.url(&format!("/users/{}", user.id)))
        .bearer_auth(srv.token(ADMIN))
        .json(&json!({ "email": "bob@example.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(res).await, "User already exists.");
}

// -------------------------
// Downstream failures
// -------------------------

const DOWNSTREAM_FAILURE: &str = "Error occurred. Contact the system manager";

struct UnavailableAuditLog;

#[async_trait]
impl AuditLog for UnavailableAuditLog {
    async fn append(&self, _entry: NewLogEntry) -> Result<LogEntry, AuditError> {
        Err(AuditError::Store("connection refused".to_string()))
    }
}

struct UnavailablePeople;

fn unavailable() -> StoreError {
    StoreError::Database("connection refused".to_string())
}

#[async_trait]
impl PersonRepository for UnavailablePeople {
    async fn list(&self, _page: PageRequest) -> Result<Vec<Person>, StoreError> {
        Err(unavailable())
    }

    async fn get(&self, _id: PersonId) -> Result<Option<Person>, StoreError> {
        Err(unavailable())
    }

    async fn find_by_document(&self, _document: &str) -> Result<Option<Person>, StoreError> {
        Err(unavailable())
    }

    async fn insert(&self, _person: &Person) -> Result<(), StoreError> {
        Err(unavailable())
    }

    async fn update(&self, _person: &Person) -> Result<(), StoreError> {
        Err(unavailable())
    }
}

#[tokio::test]
async fn audit_failure_is_502_but_the_user_is_already_written() {
    let config = AppConfig::for_tests();
    let store = Arc::new(InMemoryStore::new());
    let services = AppServices::with_stores(
        config.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(UnavailableAuditLog),
    )
    .unwrap();
    let (base_url, _handle) = serve(services).await;

    let new = NewPerson::validate(
        Some("Ada".to_string()),
        Some("555-0100".to_string()),
        Some("111".to_string()),
    )
    .unwrap();
    let ada = Person::register(new, Utc::now());
    PersonRepository::insert(store.as_ref(), &ada).await.unwrap();

    let token = mint_jwt(&config.jwt_secret, UserId::new(), OPERATOR, ChronoDuration::minutes(5));
    let res = reqwest::Client::new()
        .post(format!("{base_url}/users/{}", ada.id))
        .bearer_auth(token)
        .json(&json!({ "email": "ada@example.com", "password": "123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "error": DOWNSTREAM_FAILURE }));

    // The write is not rolled back.
    let written = store.find_by_person(ada.id).await.unwrap().unwrap();
    assert_eq!(written.email, "ada@example.com");
}

#[tokio::test]
async fn store_failure_is_502() {
    let config = AppConfig::for_tests();
    let store = Arc::new(InMemoryStore::new());
    let services = AppServices::with_stores(
        config.clone(),
        Arc::new(UnavailablePeople),
        store.clone(),
        store,
        Arc::new(InMemoryAuditLog::new()),
    )
    .unwrap();
    let (base_url, _handle) = serve(services).await;
    let token = mint_jwt(&config.jwt_secret, UserId::new(), ADMIN, ChronoDuration::minutes(5));
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{base_url}/people"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(error_of(res).await, DOWNSTREAM_FAILURE);

    let res = client
        .post(format!("{base_url}/people"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Ada", "phone": "555-0100", "document": "111" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(error_of(res).await, DOWNSTREAM_FAILURE);
}
