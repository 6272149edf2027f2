//! Startup ordering and optional subsystem isolation against a real listener.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

use edge_gateway::collaborators::{StorageConnector, StorageError, StorageHandle};
use edge_gateway::lifecycle::startup::start_observed;
use edge_gateway::lifecycle::{
    start, Collaborators, DrainOutcome, LifecyclePhase, StartupError, Subsystem, SubsystemError,
    SubsystemRegistry,
};

mod common;
use common::test_config;

struct InMemoryStorage;

#[async_trait]
impl StorageConnector for InMemoryStorage {
    async fn connect(&self) -> Result<StorageHandle, StorageError> {
        Ok(StorageHandle::detached("memory"))
    }
}

struct BrokenSubsystem;

#[async_trait]
impl Subsystem for BrokenSubsystem {
    fn name(&self) -> &str {
        "bot"
    }

    async fn activate(&self) -> Result<(), SubsystemError> {
        Err(SubsystemError::Failed("module not found".into()))
    }
}

struct PanickingSubsystem;

#[async_trait]
impl Subsystem for PanickingSubsystem {
    fn name(&self) -> &str {
        "matchmaker"
    }

    async fn activate(&self) -> Result<(), SubsystemError> {
        panic!("matchmaker failed to initialize");
    }
}

#[tokio::test]
async fn test_failing_subsystems_do_not_affect_serving() {
    let config = test_config();
    let mut collaborators = Collaborators::from_config(&config);
    collaborators.storage = Arc::new(InMemoryStorage);

    let mut subsystems = SubsystemRegistry::new();
    subsystems.register(BrokenSubsystem).register(PanickingSubsystem);

    let mut gateway = start(&config, collaborators, subsystems).await.unwrap();
    assert!(*gateway.phase().borrow() >= LifecyclePhase::AcceptingTraffic);

    let report = gateway.activation().await.unwrap();
    assert!(report.activated.is_empty());
    assert_eq!(report.failed, vec!["bot", "matchmaker"]);

    let response = reqwest::get(format!("http://{}/health", gateway.local_addr()))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");

    assert_eq!(
        gateway.shutdown(Duration::from_secs(5)).await,
        DrainOutcome::Drained
    );
}

/// A loopback port that was free a moment ago.
fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn is_listening(port: u16) -> bool {
    tokio::net::TcpStream::connect(("127.0.0.1", port))
        .await
        .is_ok()
}

#[tokio::test]
async fn test_unreachable_storage_never_listens() {
    let port = free_port();

    let mut config = test_config();
    config.server.port = port;
    config.storage.url = "mongodb://127.0.0.1:1/gateway".into();
    config.storage.connect_timeout_secs = 2;
    let collaborators = Collaborators::from_config(&config);

    let result = start(&config, collaborators, SubsystemRegistry::new()).await;
    assert!(matches!(result, Err(StartupError::Storage(_))));
    assert!(!is_listening(port).await);
}

#[tokio::test]
async fn test_missing_routes_directory_never_listens() {
    let dir = tempfile::tempdir().unwrap();
    let port = free_port();

    let mut config = test_config();
    config.server.port = port;
    config.routes.directory = Some(dir.path().join("missing"));
    let mut collaborators = Collaborators::from_config(&config);
    collaborators.storage = Arc::new(InMemoryStorage);

    let (phase, observer) = watch::channel(LifecyclePhase::Start);
    let result = start_observed(&config, collaborators, SubsystemRegistry::new(), phase).await;

    assert!(matches!(result, Err(StartupError::Routes(_))));
    assert_eq!(*observer.borrow(), LifecyclePhase::LoadRoutes);
    assert!(!is_listening(port).await);
}

#[tokio::test]
async fn test_loaded_routes_are_served() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("version.json"),
        r#"[{ "method": "GET", "path": "/fortnite/api/version", "body": { "version": "1.0" } }]"#,
    )
    .unwrap();

    let mut config = test_config();
    config.routes.directory = Some(dir.path().to_path_buf());
    let mut collaborators = Collaborators::from_config(&config);
    collaborators.storage = Arc::new(InMemoryStorage);

    let gateway = start(&config, collaborators, SubsystemRegistry::new())
        .await
        .unwrap();

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{}/fortnite/api/version", gateway.local_addr()))
        .header("x-forwarded-for", "203.0.113.7")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["version"], "1.0");

    gateway.shutdown(Duration::from_secs(5)).await;
}
