#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::{
    body::Bytes,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};

use ibmi_gateway::auth::SessionSigner;
use ibmi_gateway::catalog::{CatalogQueryBuilder, SqlStatement};
use ibmi_gateway::config::AppConfig;
use ibmi_gateway::remote::{
    ConnectionDescriptor, Credentials, RemoteConnection, RemoteDriver, RemoteError, RowSet,
};
use ibmi_gateway::{app, AppState};

/// Everything the scripted host saw.
#[derive(Debug, Default)]
pub struct Journal {
    pub descriptors: Vec<String>,
    pub statements: Vec<SqlStatement>,
    pub opened: usize,
    pub closed: usize,
    pub detached: usize,
}

/// In-memory stand-in for the IBM i host. Answers the login probe, returns
/// `rows` for everything else, and can be told to fail.
#[derive(Clone, Default)]
pub struct ScriptedDriver {
    journal: Arc<Mutex<Journal>>,
    rows: RowSet,
    connect_error: Option<String>,
    query_error: Option<String>,
    connect_stall: Option<Duration>,
    query_stall: Option<Duration>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returning(mut self, rows: RowSet) -> Self {
        self.rows = rows;
        self
    }

    pub fn failing_connect(mut self, message: &str) -> Self {
        self.connect_error = Some(message.to_string());
        self
    }

    pub fn failing_query(mut self, message: &str) -> Self {
        self.query_error = Some(message.to_string());
        self
    }

    /// Sit on connect for `delay` before answering.
    pub fn stalling_connect(mut self, delay: Duration) -> Self {
        self.connect_stall = Some(delay);
        self
    }

    /// Sit on every query, and on close, for `delay`. Close blocks the same
    /// way an ODBC worker join does while its statement is still running.
    pub fn stalling_query(mut self, delay: Duration) -> Self {
        self.query_stall = Some(delay);
        self
    }

    pub fn statements(&self) -> Vec<SqlStatement> {
        self.journal.lock().unwrap().statements.clone()
    }

    /// Statements other than the login probe.
    pub fn queries(&self) -> Vec<SqlStatement> {
        let probe = CatalogQueryBuilder::probe();
        self.statements().into_iter().filter(|s| *s != probe).collect()
    }

    pub fn opened(&self) -> usize {
        self.journal.lock().unwrap().opened
    }

    pub fn closed(&self) -> usize {
        self.journal.lock().unwrap().closed
    }

    pub fn detached(&self) -> usize {
        self.journal.lock().unwrap().detached
    }

    pub fn descriptors(&self) -> Vec<String> {
        self.journal.lock().unwrap().descriptors.clone()
    }
}

#[async_trait]
impl RemoteDriver for ScriptedDriver {
    async fn connect(&self, descriptor: &ConnectionDescriptor) -> Result<Box<dyn RemoteConnection>, RemoteError> {
        if let Some(delay) = self.connect_stall {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = &self.connect_error {
            return Err(RemoteError::Connect(message.clone()));
        }
        {
            let mut journal = self.journal.lock().unwrap();
            journal.opened += 1;
            journal.descriptors.push(descriptor.to_string());
        }
        Ok(Box::new(ScriptedConnection {
            journal: self.journal.clone(),
            rows: self.rows.clone(),
            query_error: self.query_error.clone(),
            stall: self.query_stall,
        }))
    }
}

struct ScriptedConnection {
    journal: Arc<Mutex<Journal>>,
    rows: RowSet,
    query_error: Option<String>,
    stall: Option<Duration>,
}

#[async_trait]
impl RemoteConnection for ScriptedConnection {
    async fn query(&mut self, statement: &SqlStatement) -> Result<RowSet, RemoteError> {
        self.journal.lock().unwrap().statements.push(statement.clone());
        if let Some(delay) = self.stall {
            tokio::time::sleep(delay).await;
        }

        if *statement == CatalogQueryBuilder::probe() {
            return Ok(RowSet::new(vec!["00001".into()], vec![vec![json!(1)]]));
        }
        match &self.query_error {
            Some(message) => Err(RemoteError::Query(message.clone())),
            None => Ok(self.rows.clone()),
        }
    }

    async fn close(self: Box<Self>) -> Result<(), RemoteError> {
        if let Some(delay) = self.stall {
            tokio::time::sleep(delay).await;
        }
        self.journal.lock().unwrap().closed += 1;
        Ok(())
    }

    fn detach(self: Box<Self>) {
        self.journal.lock().unwrap().detached += 1;
    }
}

pub const SECRET: &str = "integration-test-secret";

/// A gateway served on an ephemeral local port.
pub struct TestApp {
    pub base_url: String,
    pub driver: ScriptedDriver,
    pub signer: SessionSigner,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// A valid session for host `h`, user `u`, password `p`.
    pub fn token(&self) -> String {
        self.signer
            .sign(&Credentials::new("h", "u", "p"), "u")
            .map(|t| t.access_token)
            .unwrap()
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<reqwest::Response> {
        Ok(self
            .client
            .post(self.url(path))
            .bearer_auth(self.token())
            .json(body)
            .send()
            .await?)
    }
}

pub async fn spawn_app(driver: ScriptedDriver) -> Result<TestApp> {
    spawn_app_with(driver, &[]).await
}

pub async fn spawn_app_with(driver: ScriptedDriver, env: &[(&str, &str)]) -> Result<TestApp> {
    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("JWT_SECRET".into(), SECRET.into());
    vars.insert("IBMI_ODBC_DRIVER".into(), "IBM i Access ODBC Driver".into());
    for (key, value) in env {
        vars.insert(key.to_string(), value.to_string());
    }

    let config = AppConfig::from_lookup(move |key: &str| vars.get(key).cloned())?;
    let signer = SessionSigner::new(&config.security);
    let state = AppState::new(config, Arc::new(driver.clone()))?;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app(state)).await;
    });

    Ok(TestApp {
        base_url: format!("http://{}", addr),
        driver,
        signer,
        client: reqwest::Client::builder().no_proxy().build()?,
    })
}

/// Fake n8n: `/` answers 200, `/webhook/echo` returns 202 with the body it
/// got, `/webhook/fail` returns 500 and `/webhook/long` a 2000 char reply.
pub async fn spawn_webhook() -> Result<String> {
    let router = Router::new()
        .route("/", get(|| async { "n8n up" }))
        .route("/webhook/echo", post(|body: Bytes| async move { (StatusCode::ACCEPTED, body) }))
        .route("/webhook/fail", post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "workflow crashed") }))
        .route("/webhook/long", post(|| async { "x".repeat(2000) }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    Ok(format!("http://{}", addr))
}

/// A local URL nothing listens on.
pub fn closed_url(path: &str) -> Result<String> {
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    Ok(format!("http://127.0.0.1:{}{}", port, path))
}

pub fn orders() -> RowSet {
    RowSet::new(
        vec!["ID".into(), "CUSTOMER".into(), "TOTAL".into()],
        vec![
            vec![json!(1), json!("ACME"), json!(12.5)],
            vec![json!(2), json!("Globex, Inc."), Value::Null],
            vec![json!(3), json!("Initech"), json!(7)],
        ],
    )
}
