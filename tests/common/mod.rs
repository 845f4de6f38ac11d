#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};
use tempfile::TempDir;
use uuid::Uuid;

use devcamper_api::auth::hash_password;
use devcamper_api::config::AppConfig;
use devcamper_api::database::models::NewUser;
use devcamper_api::database::{MemoryStore, UserStore};
use devcamper_api::policy::Role;
use devcamper_api::uploads::AssetUploader;
use devcamper_api::{router, AppState};

pub const PASSWORD: &str = "123456";

/// In-process server over a fresh in-memory store, one per test
pub struct TestServer {
    pub base_url: String,
    pub store: MemoryStore,
    pub client: reqwest::Client,
    pub uploads: TempDir,
}

/// A signed-in user
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with(|_| {}).await
    }

    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Result<Self> {
        Self::start(configure, |_, _| None).await
    }

    /// Swap in a different photo uploader, built from the store and config
    pub async fn spawn_with_uploader(
        uploader: impl FnOnce(&MemoryStore, &AppConfig) -> Arc<dyn AssetUploader>,
    ) -> Result<Self> {
        Self::start(|_| {}, |store, config| Some(uploader(store, config))).await
    }

    async fn start(
        configure: impl FnOnce(&mut AppConfig),
        uploader: impl FnOnce(&MemoryStore, &AppConfig) -> Option<Arc<dyn AssetUploader>>,
    ) -> Result<Self> {
        let uploads = tempfile::tempdir()?;
        let mut config = AppConfig::development();
        config.uploads.directory = uploads.path().to_path_buf();
        config.api.enable_request_logging = false;
        configure(&mut config);

        let store = MemoryStore::new();
        let custom = uploader(&store, &config);
        let mut state = AppState::new(Arc::new(store.clone()), config);
        if let Some(custom) = custom {
            state = state.with_uploader(custom);
        }
        let app = router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await;
        });

        Ok(Self {
            base_url: format!("http://{}", addr),
            store,
            client: reqwest::Client::new(),
            uploads,
        })
    }

    /// URL below the versioned API prefix
    pub fn api(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    pub async fn register(&self, name: &str, email: &str) -> Result<Session> {
        let res = self
            .client
            .post(self.api("/auth/register"))
            .json(&json!({"name": name, "email": email, "password": PASSWORD}))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "register failed: {}", res.status());
        let token = body(res).await?["data"]["token"]
            .as_str()
            .context("token missing")?
            .to_string();

        let me = body(self.client.get(self.api("/auth/me")).bearer_auth(&token).send().await?).await?;
        let id = me["data"]["id"].as_str().context("id missing")?.parse()?;
        Ok(Session { id, email: email.to_string(), token })
    }

    /// Admins cannot register over HTTP; seed one in the store and log in
    pub async fn admin(&self) -> Result<Session> {
        let email = format!("admin-{}@devcamper.io", Uuid::new_v4().simple());
        let input = NewUser {
            name: "Admin".into(),
            email: email.clone(),
            password: PASSWORD.into(),
            role: Some(Role::Admin),
        };
        let user = input.into_user(Uuid::new_v4(), hash_password(PASSWORD)?, Utc::now());
        let user = self.store.create_user(user).await?;

        let token = self.login(&email, PASSWORD).await?;
        Ok(Session { id: user.id, email, token })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let res = self
            .client
            .post(self.api("/auth/login"))
            .json(&json!({"email": email, "password": password}))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());
        Ok(body(res).await?["data"]["token"]
            .as_str()
            .context("token missing")?
            .to_string())
    }

    pub async fn create_bootcamp(&self, session: &Session, name: &str) -> Result<Response> {
        Ok(self
            .client
            .post(self.api("/bootcamps"))
            .bearer_auth(&session.token)
            .json(&bootcamp_body(name))
            .send()
            .await?)
    }

    /// Create a bootcamp that must succeed and return its id
    pub async fn bootcamp_for(&self, session: &Session, name: &str) -> Result<Uuid> {
        let res = self.create_bootcamp(session, name).await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "create failed: {}", res.status());
        Ok(body(res).await?["data"]["id"].as_str().context("id missing")?.parse()?)
    }

    pub async fn get_bootcamp(&self, id: Uuid) -> Result<Response> {
        Ok(self.client.get(self.api(&format!("/bootcamps/{}", id))).send().await?)
    }

    pub async fn add_course(&self, session: &Session, bootcamp_id: Uuid, title: &str, tuition: i32) -> Result<Response> {
        Ok(self
            .client
            .post(self.api(&format!("/bootcamps/{}/courses", bootcamp_id)))
            .bearer_auth(&session.token)
            .json(&json!({
                "title": title,
                "description": "Hands-on course",
                "weeks": 8,
                "tuition": tuition,
                "minimum_skill": "beginner",
                "scholarship_available": false
            }))
            .send()
            .await?)
    }
}

pub fn bootcamp_body(name: &str) -> Value {
    json!({
        "name": name,
        "description": "Full stack JavaScript bootcamp",
        "website": "https://example.com",
        "careers": ["Web Development", "UI/UX"],
        "housing": true
    })
}

pub async fn body(res: Response) -> Result<Value> {
    Ok(res.json::<Value>().await?)
}
