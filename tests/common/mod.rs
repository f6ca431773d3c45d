//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};

use service_scaffold::http::build_router;
use service_scaffold::lifecycle::RunningServer;
use service_scaffold::{LifecycleController, ServerConfig, StatusReporter};

/// Loopback config on an ephemeral port.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".into(),
        port: 0,
        shutdown_deadline: Duration::from_secs(2),
        ..ServerConfig::default()
    }
}

/// Start the full service in-process, without touching signal handlers.
pub async fn start_server(config: ServerConfig) -> (RunningServer, StatusReporter) {
    let config = Arc::new(config);
    let status = StatusReporter::new();
    let app = build_router(&config, status.clone()).unwrap();
    let server = LifecycleController::new(config, status.clone())
        .start(app)
        .await
        .unwrap();
    (server, status)
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

pub fn url(addr: SocketAddr, path: &str) -> String {
    format!("http://{addr}{path}")
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Run the service binary on `port` with extra environment options.
pub fn spawn_binary(port: u16, env: &[(&str, &str)]) -> Child {
    let mut command = Command::new(env!("CARGO_BIN_EXE_service-scaffold"));
    command
        .current_dir(std::env::temp_dir())
        .env("ip", "127.0.0.1")
        .env("port", port.to_string())
        .env("RUST_LOG", "off")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    for (key, value) in env {
        command.env(key, value);
    }
    command.spawn().expect("failed to spawn service binary")
}

/// Poll the health endpoint until the service answers.
pub async fn wait_until_ready(addr: SocketAddr) {
    let client = client();
    for _ in 0..100 {
        if let Ok(res) = client.get(url(addr, "/api/v1/health/full")).send().await {
            if res.status().is_success() {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    panic!("service at {addr} never became ready");
}

/// Send SIGINT to a child process.
#[cfg(unix)]
pub fn interrupt(child: &Child) {
    let pid = child.id().expect("child already exited");
    let status = std::process::Command::new("kill")
        .args(["-INT", &pid.to_string()])
        .status()
        .expect("failed to run kill");
    assert!(status.success());
}
