//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which creates an in-memory DB, a temp upload
//! directory, a fake encoder and a full [`AppContext`]. The [`with_server`]
//! constructors start the real server loop on a random port for HTTP-level
//! testing; [`TestHarness::shutdown`] stops it.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use vs_av::{EncodeOptions, Encoder, MediaMetadata, ToolRegistry};
use vs_core::config::Config;
use vs_core::{Error, Result};
use vs_db::pool::{init_memory_pool, DbPool};
use vs_pipeline::{IngestPipeline, PipelineSettings};
use vs_server::context::AppContext;

// ---------------------------------------------------------------------------
// Fake encoder
// ---------------------------------------------------------------------------

/// Encoder that writes small placeholder files instead of running ffmpeg.
#[derive(Default)]
pub struct FakeEncoder {
    /// Output file names in the order they were requested.
    pub outputs: Mutex<Vec<String>>,
    /// Fail probing of any input whose name contains this.
    pub fail_probe_on: Option<&'static str>,
    /// Fail any encode whose output name contains this.
    pub fail_on: Option<&'static str>,
    pub delay: Option<Duration>,
}

impl FakeEncoder {
    pub fn failing_probe(pattern: &'static str) -> Self {
        Self {
            fail_probe_on: Some(pattern),
            ..Self::default()
        }
    }

    pub fn failing_on(pattern: &'static str) -> Self {
        Self {
            fail_on: Some(pattern),
            ..Self::default()
        }
    }
}

fn name_of(p: &Path) -> String {
    p.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[async_trait]
impl Encoder for FakeEncoder {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn probe(&self, input: &Path) -> Result<MediaMetadata> {
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if self.fail_probe_on.is_some_and(|s| name_of(input).contains(s)) {
            return Err(Error::Probe(format!("{}: invalid data", input.display())));
        }
        let size = std::fs::metadata(input)?.len();
        Ok(MediaMetadata {
            duration_secs: Some(12.5),
            format_name: Some("mov,mp4,m4a,3gp,3g2,mj2".into()),
            size_bytes: Some(size),
            width: Some(1920),
            height: Some(1080),
            video_codec: Some("h264".into()),
            audio_codec: Some("aac".into()),
        })
    }

    async fn run_encode(
        &self,
        input: &Path,
        output: &Path,
        _options: &EncodeOptions,
    ) -> Result<PathBuf> {
        self.outputs.lock().unwrap().push(name_of(output));
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        if !input.exists() {
            return Err(Error::tool("fake", format!("missing input {}", input.display())));
        }
        if self.fail_on.is_some_and(|s| name_of(output).contains(s)) {
            std::fs::write(output, b"partial")?;
            return Err(Error::tool("fake", "exited with status 1"));
        }
        std::fs::write(output, b"encoded")?;
        Ok(output.to_path_buf())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory database and a temporary upload directory.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub encoder: Arc<FakeEncoder>,
    cancel: CancellationToken,
    server: Option<JoinHandle<Result<()>>>,
    _uploads: TempDir,
}

/// Default test configuration: rate limits off, fixed secret.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.auth.jwt_secret = "integration-test-secret".into();
    config.rate_limit.enabled = false;
    config
}

impl TestHarness {
    pub fn new() -> Self {
        Self::build(test_config(), FakeEncoder::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::build(config, FakeEncoder::default())
    }

    /// Create a harness with a custom configuration and encoder.
    pub fn build(mut config: Config, encoder: FakeEncoder) -> Self {
        let uploads = tempfile::tempdir().expect("failed to create upload dir");
        config.storage.upload_dir = uploads.path().to_path_buf();
        std::fs::create_dir_all(config.storage.processed_dir()).expect("processed dir");

        let db = init_memory_pool().expect("failed to create in-memory pool");
        let tools = Arc::new(ToolRegistry::from_paths(Vec::new()));
        let encoder = Arc::new(encoder);
        let settings = PipelineSettings::from_config(&config.pipeline);
        let pipeline = Arc::new(IngestPipeline::new(
            encoder.clone() as Arc<dyn Encoder>,
            Arc::new(settings),
        ));

        let ctx = AppContext::new(db.clone(), config, tools, pipeline);
        Self {
            ctx,
            db,
            encoder,
            cancel: CancellationToken::new(),
            server: None,
            _uploads: uploads,
        }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::serve(Self::new()).await
    }

    /// Start an Axum server with custom config on a random port.
    pub async fn with_server_config(config: Config) -> (Self, SocketAddr) {
        Self::serve(Self::with_config(config)).await
    }

    pub async fn with_server_encoder(encoder: FakeEncoder) -> (Self, SocketAddr) {
        Self::serve(Self::build(test_config(), encoder)).await
    }

    pub async fn serve_built(config: Config, encoder: FakeEncoder) -> (Self, SocketAddr) {
        Self::serve(Self::build(config, encoder)).await
    }

    async fn serve(mut harness: Self) -> (Self, SocketAddr) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        harness.server = Some(tokio::spawn(vs_server::serve(
            harness.ctx.clone(),
            listener,
            harness.cancel.clone(),
        )));

        (harness, addr)
    }

    /// Cancel the server and wait for it to finish draining.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.cancel.cancel();
        match self.server.take() {
            Some(handle) => tokio::time::timeout(Duration::from_secs(5), handle)
                .await
                .expect("server did not stop in time")
                .expect("server task panicked"),
            None => Ok(()),
        }
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> vs_db::pool::PooledConnection {
        vs_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }

    pub fn upload_dir(&self) -> &Path {
        self.ctx.upload_root()
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.ctx.processed_root()
    }
}

impl Drop for TestHarness {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ---------------------------------------------------------------------------
// HTTP helpers
// ---------------------------------------------------------------------------

pub struct Account {
    pub id: String,
    pub token: String,
}

/// Register and log in, returning the user id and bearer token.
pub async fn signup(addr: SocketAddr, username: &str, role: &str) -> Account {
    let client = reqwest::Client::new();
    let email = format!("{username}@example.com");

    let resp = client
        .post(format!("http://{addr}/api/auth/register"))
        .json(&json!({
            "username": username,
            "email": email,
            "password": "hunter22",
            "role": role,
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201, "register {username}");

    let resp = client
        .post(format!("http://{addr}/api/auth/login"))
        .json(&json!({ "email": email, "password": "hunter22" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200, "login {username}");
    let body: Value = resp.json().await.unwrap();

    Account {
        id: body["userId"].as_str().unwrap().to_string(),
        token: body["token"].as_str().unwrap().to_string(),
    }
}

pub fn video_form(title: &str, description: &str, file_name: &str, bytes: Vec<u8>) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str("video/mp4")
        .unwrap();
    reqwest::multipart::Form::new()
        .text("title", title.to_string())
        .text("description", description.to_string())
        .part("video", part)
}

/// Upload a small file and return the 201 response body.
pub async fn upload(addr: SocketAddr, token: &str, title: &str, file_name: &str) -> Value {
    upload_bytes(addr, token, title, file_name, vec![7u8; 2048]).await
}

pub async fn upload_bytes(
    addr: SocketAddr,
    token: &str,
    title: &str,
    file_name: &str,
    bytes: Vec<u8>,
) -> Value {
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/api/videos/upload"))
        .bearer_auth(token)
        .multipart(video_form(title, "A test upload", file_name, bytes))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201, "upload {title}");
    resp.json().await.unwrap()
}

/// Poll a video until its status leaves `processing`.
pub async fn wait_for_settled(addr: SocketAddr, video_id: &str) -> Value {
    let client = reqwest::Client::new();
    for _ in 0..200 {
        let body: Value = client
            .get(format!("http://{addr}/api/videos/{video_id}"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if body["status"] != "processing" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("video {video_id} never settled");
}
