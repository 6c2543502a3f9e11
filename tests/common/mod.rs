use std::env;

use anyhow::{anyhow, ensure, Context, Result};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::NaiveDateTime;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use http_body_util::BodyExt;
use jobtrack::assistant::AssistantProxy;
use jobtrack::auth::jwt::JwtService;
use jobtrack::config::{AppConfig, AssistantConfig};
use jobtrack::db::{self, PgPool};
use jobtrack::models::NewStatusChange;
use jobtrack::routes;
use jobtrack::schema::application_status_history;
use jobtrack::state::AppState;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::with_assistant(AssistantProxy::disabled()).await
    }

    pub async fn with_assistant(assistant: AssistantProxy) -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url,
            database_max_pool_size: db::DEFAULT_MAX_POOL_SIZE,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            jwt_expiry_minutes: 60,
            cors_allowed_origin: None,
            assistant: AssistantConfig::default(),
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let jwt = JwtService::from_config(&config)?;
        let state = AppState::new(pool, config, jwt, assistant);
        let router = routes::create_router(state.clone());

        Ok(Self { state, router })
    }

    pub async fn cleanup(&self) -> Result<()> {
        self.with_conn(truncate_all).await
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<hyper::Response<Body>> {
        self.post_json(
            "/register",
            &serde_json::json!({ "email": email, "password": password }),
            None,
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<hyper::Response<Body>> {
        self.post_json(
            "/login",
            &serde_json::json!({ "email": email, "password": password }),
            None,
        )
        .await
    }

    /// Registers a fresh account and returns its bearer token.
    pub async fn signup(&self, email: &str, password: &str) -> Result<String> {
        let response = self.register(email, password).await?;
        ensure!(
            response.status() == StatusCode::OK,
            "register failed with status {}",
            response.status()
        );

        let response = self.login(email, password).await?;
        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );

        #[derive(serde::Deserialize)]
        struct LoginResponse {
            access_token: String,
        }
        let parsed: LoginResponse = json_body(response).await?;
        Ok(parsed.access_token)
    }

    #[allow(dead_code)]
    /// Appends a history entry with an explicit timestamp, bypassing the API.
    pub async fn insert_status_at(
        &self,
        application_id: Uuid,
        status: &str,
        changed_at: NaiveDateTime,
    ) -> Result<()> {
        let status = status.to_string();
        self.with_conn(move |conn| {
            diesel::insert_into(application_status_history::table)
                .values(&NewStatusChange {
                    application_id,
                    status,
                    note: None,
                    changed_at,
                })
                .execute(conn)
                .context("failed to insert status change")?;
            Ok(())
        })
        .await
    }

    #[allow(dead_code)]
    /// Moves every history entry of an application to `changed_at`.
    pub async fn backdate_history(
        &self,
        application_id: Uuid,
        changed_at: NaiveDateTime,
    ) -> Result<()> {
        self.with_conn(move |conn| {
            diesel::update(
                application_status_history::table
                    .filter(application_status_history::application_id.eq(application_id)),
            )
            .set(application_status_history::changed_at.eq(changed_at))
            .execute(conn)
            .context("failed to backdate history")?;
            Ok(())
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn history_len(&self, application_id: Uuid) -> Result<i64> {
        self.with_conn(move |conn| {
            application_status_history::table
                .filter(application_status_history::application_id.eq(application_id))
                .count()
                .get_result(conn)
                .context("failed to count history")
        })
        .await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

pub async fn json_body<T: DeserializeOwned>(response: hyper::Response<Body>) -> Result<T> {
    let body = body_to_vec(response.into_body()).await?;
    serde_json::from_slice(&body).with_context(|| {
        format!(
            "unexpected response body: {}",
            String::from_utf8_lossy(&body)
        )
    })
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        db::run_migrations(&pool)?;
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "TRUNCATE TABLE application_status_history, applications, users RESTART IDENTITY CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}
