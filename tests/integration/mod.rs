//! Integration tests for Tuning Lab.

pub mod api_test;
#[cfg(unix)]
pub mod pipeline_test;
pub mod policy_test;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tuning_lab::api::{self, AppState};
use tuning_lab::config::Config;
use tuning_lab::error::Result;
use tuning_lab::runner::ScriptRunner;

/// A server bound to an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: CancellationToken,
    pub handle: JoinHandle<Result<()>>,
}

impl TestServer {
    pub async fn start(config: &Config, runner: Arc<dyn ScriptRunner>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(api::serve(
            listener,
            AppState::new(config, runner),
            shutdown.clone(),
        ));
        Self {
            addr,
            shutdown,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn stop(self) {
        self.shutdown.cancel();
        self.handle.await.unwrap().unwrap();
    }
}
