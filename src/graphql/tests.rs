use std::sync::Arc;

use async_graphql::{Request, Response};
use axum_extra::extract::cookie::Cookie;
use serde_json::Value;

use super::AppSchema;
use crate::{
    auth::{password::verify_password, Session},
    config::AppConfig,
    state::AppState,
    store::{MemoryStore, Store, UserFilter},
    users::{
        dto::UserInput,
        repo_types::{Role, User},
        services::build_user,
    },
};

const PASSWORD: &str = "password123";

struct Harness {
    schema: AppSchema,
    store: Arc<MemoryStore>,
}

impl Harness {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::from_parts(Arc::new(AppConfig::test()), store.clone());
        Self { schema: state.schema, store }
    }

    async fn seed(&self, id: &str, email: &str, role: Role) -> User {
        let input = UserInput {
            id: id.into(),
            first_name: "First".into(),
            last_name: id.into(),
            middle_initial: None,
            email: email.into(),
            password: PASSWORD.into(),
            role: None,
        };
        let user = build_user(input, Some(role), None).unwrap();
        self.store.insert_users(std::slice::from_ref(&user)).await.unwrap();
        user
    }

    async fn exec(&self, query: &str, token: Option<&str>) -> Response {
        let request = Request::new(query).data(Session::new(token.map(str::to_string)));
        self.schema.execute(request).await
    }

    async fn login(&self, email: &str) -> String {
        let resp = self.exec(&login_query(email, PASSWORD), None).await;
        assert!(resp.errors.is_empty(), "login failed: {:?}", resp.errors);
        session_token(&resp).expect("login sets the session cookie")
    }

    async fn user_count(&self) -> usize {
        self.store.find_users(&UserFilter::default()).await.unwrap().len()
    }
}

fn login_query(email: &str, password: &str) -> String {
    format!(r#"mutation {{ login(email: "{email}", password: "{password}") {{ _id id email }} }}"#)
}

fn session_token(resp: &Response) -> Option<String> {
    let header = resp.http_headers.get("set-cookie")?.to_str().ok()?;
    let cookie = Cookie::parse(header.to_string()).ok()?;
    Some(cookie.value().to_string())
}

fn error_code(resp: &Response) -> Option<String> {
    let err = serde_json::to_value(resp.errors.first()?).ok()?;
    err["extensions"]["code"].as_str().map(str::to_string)
}

fn data(resp: Response) -> Value {
    assert!(resp.errors.is_empty(), "unexpected errors: {:?}", resp.errors);
    resp.data.into_json().unwrap()
}

#[tokio::test]
async fn login_then_guarded_query_succeeds() {
    let h = Harness::new();
    h.seed("A", "a@school.test", Role::SchoolAdmin).await;
    h.seed("T", "t@school.test", Role::Teacher).await;

    let token = h.login("a@school.test").await;
    let json = data(h.exec("{ users { id role { type } } }", Some(&token)).await);
    let users = json["users"].as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["role"]["type"], "schoolAdmin");
}

#[tokio::test]
async fn login_sets_http_only_cookie_and_hides_hash() {
    let h = Harness::new();
    h.seed("A", "a@school.test", Role::Admin).await;

    let resp = h.exec(&login_query("a@school.test", PASSWORD), None).await;
    let header = resp.http_headers.get("set-cookie").unwrap().to_str().unwrap().to_string();
    assert!(header.starts_with("token="));
    assert!(header.contains("HttpOnly"));
    assert!(header.contains("Max-Age=31536000"));

    let json = data(resp);
    assert_eq!(json["login"]["id"], "A");

    let resp = h
        .exec(r#"mutation { login(email: "a@school.test", password: "password123") { password } }"#, None)
        .await;
    assert!(!resp.errors.is_empty());
}

#[tokio::test]
async fn bad_logins_are_indistinguishable() {
    let h = Harness::new();
    h.seed("A", "a@school.test", Role::Admin).await;

    let wrong_password = h.exec(&login_query("a@school.test", "nope-nope-nope"), None).await;
    let unknown_email = h.exec(&login_query("ghost@school.test", PASSWORD), None).await;

    assert_eq!(error_code(&wrong_password).as_deref(), Some("INVALID_CREDENTIALS"));
    assert_eq!(error_code(&unknown_email).as_deref(), Some("INVALID_CREDENTIALS"));
    assert_eq!(wrong_password.errors[0].message, unknown_email.errors[0].message);
    assert!(session_token(&wrong_password).is_none());
    assert!(session_token(&unknown_email).is_none());
}

#[tokio::test]
async fn me_is_null_without_valid_session() {
    let h = Harness::new();
    h.seed("A", "a@school.test", Role::Teacher).await;

    let anon = data(h.exec("{ me { id } }", None).await);
    assert!(anon["me"].is_null());

    let forged = data(h.exec("{ me { id } }", Some("forged.token.value")).await);
    assert!(forged["me"].is_null());

    let token = h.login("a@school.test").await;
    let me = data(h.exec("{ me { id email } }", Some(&token)).await);
    assert_eq!(me["me"]["id"], "A");
}

#[tokio::test]
async fn guarded_queries_reject_missing_and_invalid_tokens() {
    let h = Harness::new();

    let anon = h.exec("{ users { id } }", None).await;
    assert_eq!(error_code(&anon).as_deref(), Some("UNAUTHORIZED"));

    let forged = h.exec("{ users { id } }", Some("forged.token.value")).await;
    assert_eq!(error_code(&forged).as_deref(), Some("INVALID_TOKEN"));
}

#[tokio::test]
async fn teacher_reads_sections_but_not_users() {
    let h = Harness::new();
    h.seed("T", "t@school.test", Role::Teacher).await;
    let token = h.login("t@school.test").await;

    let sections = data(h.exec("{ sections { id } }", Some(&token)).await);
    assert!(sections["sections"].as_array().unwrap().is_empty());

    let users = h.exec("{ users { id } }", Some(&token)).await;
    assert_eq!(error_code(&users).as_deref(), Some("UNAUTHORIZED"));
}

#[tokio::test]
async fn student_cannot_read_sections() {
    let h = Harness::new();
    h.seed("S", "s@school.test", Role::Student { section_id: None }).await;
    let token = h.login("s@school.test").await;

    let resp = h.exec("{ sections { id } }", Some(&token)).await;
    assert_eq!(error_code(&resp).as_deref(), Some("UNAUTHORIZED"));
}

#[tokio::test]
async fn add_user_stores_only_a_hash() {
    let h = Harness::new();
    let admin = h.seed("A", "a@school.test", Role::Admin).await;
    let token = h.login("a@school.test").await;

    let json = data(
        h.exec(
            r#"mutation {
                addUser(user: {
                    id: "T1", firstName: "Maria", lastName: "Santos", middleInitial: "L",
                    email: "Maria@School.test", password: "s3cret-pass", role: { type: teacher }
                }) { _id id email createdBy role { type } }
            }"#,
            Some(&token),
        )
        .await,
    );
    assert_eq!(json["addUser"]["email"], "maria@school.test");
    assert_eq!(json["addUser"]["createdBy"], admin.internal_id.to_string());

    let stored = h.store.find_user_by_external_id("T1").await.unwrap().unwrap();
    assert_ne!(stored.password_hash, "s3cret-pass");
    assert!(verify_password("s3cret-pass", &stored.password_hash).unwrap());
}

#[tokio::test]
async fn add_users_is_all_or_nothing() {
    let h = Harness::new();
    h.seed("A", "a@school.test", Role::SchoolAdmin).await;
    let token = h.login("a@school.test").await;

    let resp = h
        .exec(
            r#"mutation {
                addUsers(users: [
                    { id: "U1", firstName: "One", lastName: "X", email: "one@school.test",
                      password: "password123", role: { type: student } },
                    { id: "U2", firstName: "Two", lastName: "X", email: "a@school.test",
                      password: "password123", role: { type: student } }
                ]) { id }
            }"#,
            Some(&token),
        )
        .await;
    assert_eq!(error_code(&resp).as_deref(), Some("CONFLICT"));
    assert_eq!(h.user_count().await, 1);

    let json = data(
        h.exec(
            r#"mutation {
                addUsers(users: [
                    { id: "U1", firstName: "One", lastName: "X", email: "one@school.test",
                      password: "password123", role: { type: student } },
                    { id: "U2", firstName: "Two", lastName: "X", email: "two@school.test",
                      password: "password123", role: { type: teacher } }
                ]) { id }
            }"#,
            Some(&token),
        )
        .await,
    );
    assert_eq!(json["addUsers"].as_array().unwrap().len(), 2);
    assert_eq!(h.user_count().await, 3);
}

#[tokio::test]
async fn delete_users_spares_admins() {
    let h = Harness::new();
    h.seed("A1", "a1@school.test", Role::Admin).await;
    h.seed("A2", "a2@school.test", Role::Admin).await;
    h.seed("SA", "sa@school.test", Role::SchoolAdmin).await;
    h.seed("T", "t@school.test", Role::Teacher).await;
    h.seed("S", "s@school.test", Role::Student { section_id: None }).await;

    let school_admin = h.login("sa@school.test").await;
    let denied = h.exec("mutation { deleteUsers }", Some(&school_admin)).await;
    assert_eq!(error_code(&denied).as_deref(), Some("UNAUTHORIZED"));
    assert_eq!(h.user_count().await, 5);

    let admin = h.login("a1@school.test").await;
    let json = data(h.exec("mutation { deleteUsers }", Some(&admin)).await);
    assert_eq!(json["deleteUsers"], 3);

    let left = h.store.find_users(&UserFilter::default()).await.unwrap();
    assert_eq!(left.len(), 2);
    assert!(left.iter().all(|u| u.role == Role::Admin));
}

#[tokio::test]
async fn add_section_with_unknown_adviser_creates_nothing() {
    let h = Harness::new();
    h.seed("A", "a@school.test", Role::SchoolAdmin).await;
    let token = h.login("a@school.test").await;

    let resp = h
        .exec(
            r#"mutation {
                addSection(id: "S1", name: "Homeroom", adviserId: "missing", students: [
                    { id: "U1", firstName: "Ana", lastName: "Reyes", email: "u1@school.test",
                      password: "password123", role: { type: student } }
                ]) { id }
            }"#,
            Some(&token),
        )
        .await;
    assert_eq!(error_code(&resp).as_deref(), Some("ADVISER_NOT_FOUND"));
    assert!(h.store.list_sections().await.unwrap().is_empty());
    assert_eq!(h.user_count().await, 1);
}

#[tokio::test]
async fn homeroom_scenario() {
    let h = Harness::new();
    let a = h.seed("A", "a@school.test", Role::SchoolAdmin).await;
    let token = h.login("a@school.test").await;

    let json = data(
        h.exec(
            r#"mutation {
                addSection(id: "S1", name: "Homeroom", adviserId: "A", students: [
                    { id: "U1", firstName: "Ana", lastName: "Reyes", email: "u1@school.test",
                      password: "password123", role: { type: student } }
                ]) { _id id name adviserId adviser { id } }
            }"#,
            Some(&token),
        )
        .await,
    );
    let section = &json["addSection"];
    assert_eq!(section["id"], "S1");
    assert_eq!(section["adviserId"], a.internal_id.to_string());
    assert_eq!(section["adviser"]["id"], "A");
    let section_id = section["_id"].as_str().unwrap().to_string();

    let json = data(
        h.exec(r#"{ users(filter: { id: "U1" }) { role { type sectionId } } }"#, Some(&token))
            .await,
    );
    assert_eq!(json["users"][0]["role"]["type"], "student");
    assert_eq!(json["users"][0]["role"]["sectionId"], section_id.as_str());

    let json = data(
        h.exec("{ sections { id adviser { id } students { id } } }", Some(&token)).await,
    );
    assert_eq!(json["sections"][0]["adviser"]["id"], "A");
    assert_eq!(json["sections"][0]["students"][0]["id"], "U1");
}

#[tokio::test]
async fn user_lookup_is_limited_to_staff_or_self() {
    let h = Harness::new();
    let teacher = h.seed("T", "t@school.test", Role::Teacher).await;
    let other = h.seed("O", "o@school.test", Role::Teacher).await;
    h.seed("A", "a@school.test", Role::Admin).await;

    let token = h.login("t@school.test").await;
    let own = data(h.exec(&format!(r#"{{ user(_id: "{}") {{ id }} }}"#, teacher.internal_id), Some(&token)).await);
    assert_eq!(own["user"]["id"], "T");

    let foreign = h
        .exec(&format!(r#"{{ user(_id: "{}") {{ id }} }}"#, other.internal_id), Some(&token))
        .await;
    assert_eq!(error_code(&foreign).as_deref(), Some("UNAUTHORIZED"));

    let admin = h.login("a@school.test").await;
    let json = data(h.exec(&format!(r#"{{ user(_id: "{}") {{ id }} }}"#, other.internal_id), Some(&admin)).await);
    assert_eq!(json["user"]["id"], "O");
}

#[tokio::test]
async fn logout_without_session_is_a_no_op() {
    let h = Harness::new();
    let json = data(h.exec("mutation { logout }", None).await);
    assert_eq!(json["logout"], true);

    let resp = h.exec("mutation { logout }", None).await;
    assert!(resp.http_headers.get("set-cookie").is_none());
}

#[tokio::test]
async fn logout_expires_the_cookie() {
    let h = Harness::new();
    h.seed("A", "a@school.test", Role::Admin).await;
    let token = h.login("a@school.test").await;

    let resp = h.exec("mutation { logout }", Some(&token)).await;
    let header = resp.http_headers.get("set-cookie").unwrap().to_str().unwrap();
    assert!(header.starts_with("token=;"));
    assert!(header.contains("Max-Age=0"));
}
