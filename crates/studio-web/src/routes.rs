use std::path::Path;
use std::sync::Arc;

use anyhow::{Error, anyhow};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path as UrlPath, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use studio_core::{JobKind, JobReport, Studio, StudioError, ToolSpec, tool_catalog};
use tokio::sync::{Mutex, MutexGuard};
use tower_http::services::ServeDir;
use tracing::{info, warn};
use uuid::Uuid;

use crate::form::{StageError, StagedForm, build_request, stage_multipart};

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Serializes job execution: one ffmpeg run at a time, later submissions wait their turn.
#[derive(Clone, Default)]
pub struct JobQueue {
    slot: Arc<Mutex<()>>,
}

impl JobQueue {
    async fn acquire(&self, job_id: Uuid) -> MutexGuard<'_, ()> {
        match self.slot.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                info!(%job_id, "job queued behind running work");
                self.slot.lock().await
            }
        }
    }
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    studio: Studio,
    queue: JobQueue,
    upload_root: Option<Arc<Path>>,
}

impl AppState {
    pub fn new(studio: Studio, upload_root: Option<&Path>) -> Self {
        Self {
            studio,
            queue: JobQueue::default(),
            upload_root: upload_root.map(Arc::from),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    let files = ServeDir::new(&state.studio.workspace().output_dir);

    Router::new()
        .route("/", get(index_handler))
        .route("/api/health", get(health_handler))
        .route("/api/tools", get(tools_handler))
        .route("/api/jobs/:tool", post(job_handler))
        .nest_service("/files", files)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn tools_handler() -> Json<Vec<ToolSpec>> {
    Json(tool_catalog())
}

async fn job_handler(
    State(state): State<AppState>,
    UrlPath(tool): UrlPath<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<JobResponse>, ApiError> {
    let kind: JobKind = tool
        .parse()
        .map_err(|_| ApiError::not_found(format!("Unknown tool '{tool}'")))?;
    let multipart = multipart?;

    let form = stage_multipart(multipart, state.upload_root.as_deref()).await?;
    run_job(&state, kind, form).await.map(Json)
}

/// Queue, run and report one job. The staged uploads are removed once the job is done.
async fn run_job(state: &AppState, kind: JobKind, form: StagedForm) -> Result<JobResponse, ApiError> {
    let job_id = Uuid::new_v4();
    let request = build_request(kind, &form)?;
    info!(%job_id, job = %kind, "job accepted");

    let _slot = state.queue.acquire(job_id).await;
    let studio = state.studio.clone();
    let outcome = tokio::task::spawn_blocking(move || studio.run(&request))
        .await
        .map_err(|err| ApiError::from(anyhow!("job worker panicked: {err}")))?;
    drop(form);

    match outcome {
        Ok(report) => {
            info!(%job_id, job = %kind, elapsed_ms = report.elapsed_ms, "job completed");
            Ok(JobResponse::from_report(job_id, report))
        }
        Err(err) => {
            warn!(%job_id, job = %kind, error = %err, "job failed");
            Err(err.into())
        }
    }
}

#[derive(Debug, Serialize)]
struct JobResponse {
    job_id: String,
    kind: JobKind,
    outputs: Vec<OutputLink>,
    diagnostics: String,
    elapsed_ms: f64,
    finished_at: DateTime<Utc>,
}

/// A result file and the URL it is served under.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct OutputLink {
    name: String,
    url: String,
}

impl JobResponse {
    fn from_report(job_id: Uuid, report: JobReport) -> Self {
        let outputs = report
            .outputs
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| {
                let name = name.to_string_lossy().into_owned();
                let url = format!("/files/{}", urlencoding::encode(&name));
                OutputLink { name, url }
            })
            .collect();
        Self {
            job_id: job_id.to_string(),
            kind: report.kind,
            outputs,
            diagnostics: report.diagnostics,
            elapsed_ms: report.elapsed_ms,
            finished_at: report.finished_at,
        }
    }
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    inner: Error,
}

impl ApiError {
    fn new(status: StatusCode, inner: Error) -> Self {
        Self { status, inner }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, anyhow!(message.into()))
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, anyhow!(message.into()))
    }
}

impl From<Error> for ApiError {
    fn from(value: Error) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, value)
    }
}

impl From<StudioError> for ApiError {
    fn from(value: StudioError) -> Self {
        if value.is_client_error() {
            Self::bad_request(value.to_string())
        } else {
            Self::from(Error::new(value))
        }
    }
}

impl From<StageError> for ApiError {
    fn from(value: StageError) -> Self {
        let status = match &value {
            StageError::Multipart(err) => err.status(),
            StageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, Error::new(value))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(value: MultipartRejection) -> Self {
        Self::new(value.status(), anyhow!(value.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = Json(ErrorBody {
            error: self.inner.to_string(),
        });
        (self.status, payload).into_response()
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use studio_core::{RecordingRunner, Workspace};
    use tempfile::tempdir;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const BOUNDARY: &str = "studio-route-boundary";

    fn state_in(dir: &Path, runner: RecordingRunner) -> AppState {
        let workspace = Workspace {
            output_dir: dir.join("out"),
            denoise_model: dir.join("std.rnnn"),
            ffmpeg: "ffmpeg".to_string(),
        };
        AppState::new(Studio::new(workspace, Arc::new(runner)), Some(dir))
    }

    /// Serve `app` on an ephemeral port, send one raw HTTP/1.1 request and return the
    /// whole response.
    async fn raw_exchange(app: Router, request: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move { axum::serve(listener, app).await });

        let mut stream = TcpStream::connect(addr).await.expect("connect");
        stream.write_all(request.as_bytes()).await.expect("send request");
        let mut response = String::new();
        stream.read_to_string(&mut response).await.expect("read response");
        response
    }

    /// Status code and body of one request against `app`.
    async fn exchange(app: Router, request: String) -> (u16, String) {
        let response = raw_exchange(app, request).await;
        let (head, body) = response.split_once("\r\n\r\n").expect("response head");
        let status = head
            .split_whitespace()
            .nth(1)
            .and_then(|code| code.parse().ok())
            .expect("status code");
        (status, body.to_string())
    }

    fn upload_request(path: &str, content: &str) -> String {
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"input\"; filename=\"take.wav\"\r\n\r\n\
             {content}\r\n--{BOUNDARY}--\r\n"
        );
        format!(
            "POST {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
             Content-Type: multipart/form-data; boundary={BOUNDARY}\r\n\
             Content-Length: {}\r\n\r\n{body}",
            body.len()
        )
    }

    fn error_message(body: &str) -> String {
        let json: serde_json::Value = serde_json::from_str(body).expect("json error body");
        json["error"].as_str().expect("error field").to_string()
    }

    fn staged_input(form: &mut StagedForm, field: &str, name: &str) -> PathBuf {
        let path = form.dir().join(name);
        fs::write(&path, b"fake media").expect("write upload");
        form.insert_file(field, path.clone());
        path
    }

    #[tokio::test]
    async fn health_reports_version() {
        let Json(body) = health_handler().await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn tools_catalog_covers_every_tab() {
        let Json(tools) = tools_handler().await;
        assert_eq!(tools.len(), JobKind::ALL.len());
        let json = serde_json::to_value(&tools).expect("serialize");
        assert_eq!(json[0]["kind"], "ultra-clean");
        assert_eq!(json[0]["params"][0]["name"], "highpass");
    }

    #[tokio::test]
    async fn compress_job_returns_links_and_cleans_uploads() {
        let temp = tempdir().expect("tempdir");
        let runner = RecordingRunner::new();
        let state = state_in(temp.path(), runner.clone());

        let mut form = StagedForm::new(Some(temp.path())).expect("form");
        let upload = staged_input(&mut form, "input", "my podcast.wav");
        form.insert_field("intensity", "3");
        let staging = form.dir().to_path_buf();

        let response = run_job(&state, JobKind::Compress, form)
            .await
            .expect("job succeeds");

        assert_eq!(response.kind, JobKind::Compress);
        assert_eq!(response.job_id.len(), 36);
        assert_eq!(
            response.outputs,
            vec![OutputLink {
                name: "compressed_my podcast.mp3".to_string(),
                url: "/files/compressed_my%20podcast.mp3".to_string(),
            }]
        );
        assert!(!staging.exists(), "staged uploads should be removed");

        let command = runner.last().expect("command recorded");
        let args = command.args_lossy();
        assert_eq!(args[2], upload.to_string_lossy());
        assert!(args.windows(2).any(|pair| pair == ["-ab", "236k"]));
    }

    #[tokio::test]
    async fn missing_upload_is_a_bad_request() {
        let temp = tempdir().expect("tempdir");
        let runner = RecordingRunner::new();
        let state = state_in(temp.path(), runner.clone());
        let form = StagedForm::new(Some(temp.path())).expect("form");

        let err = run_job(&state, JobKind::UltraClean, form)
            .await
            .expect_err("missing input");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.inner.to_string(), "missing required input: input");
        assert!(runner.commands().is_empty());
    }

    #[tokio::test]
    async fn out_of_range_slider_is_a_bad_request() {
        let temp = tempdir().expect("tempdir");
        let state = state_in(temp.path(), RecordingRunner::new());
        let mut form = StagedForm::new(Some(temp.path())).expect("form");
        staged_input(&mut form, "video", "clip.mp4");
        staged_input(&mut form, "audio", "voice.wav");
        form.insert_field("crf", "40");

        let err = run_job(&state, JobKind::Merge, form)
            .await
            .expect_err("crf out of range");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.inner.to_string().contains("crf"));
    }

    #[tokio::test]
    async fn tool_failure_maps_to_server_error_with_stderr() {
        let temp = tempdir().expect("tempdir");
        let state = state_in(temp.path(), RecordingRunner::failing("No such filter: 'arnndn'"));
        let mut form = StagedForm::new(Some(temp.path())).expect("form");
        staged_input(&mut form, "input", "take.wav");

        let err = run_job(&state, JobKind::UltraClean, form)
            .await
            .expect_err("tool fails");
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(
            body,
            serde_json::json!({ "error": "FFmpeg error: No such filter: 'arnndn'" })
        );
    }

    #[tokio::test]
    async fn queued_jobs_run_one_at_a_time() {
        let temp = tempdir().expect("tempdir");
        let runner = RecordingRunner::new();
        let state = state_in(temp.path(), runner.clone());

        let mut handles = Vec::new();
        for name in ["a.wav", "b.wav", "c.wav"] {
            let state = state.clone();
            let mut form = StagedForm::new(Some(temp.path())).expect("form");
            staged_input(&mut form, "input", name);
            handles.push(tokio::spawn(async move {
                run_job(&state, JobKind::StandardClean, form).await
            }));
        }
        for handle in handles {
            handle.await.expect("join").expect("job succeeds");
        }
        assert_eq!(runner.commands().len(), 3);
        assert!(state.queue.slot.try_lock().is_ok());
    }

    #[tokio::test]
    async fn unknown_tool_is_not_found() {
        let temp = tempdir().expect("tempdir");
        let runner = RecordingRunner::new();
        let app = router(state_in(temp.path(), runner.clone()), 1024 * 1024);

        let (status, body) = exchange(app, upload_request("/api/jobs/normalize", "fake media")).await;
        assert_eq!(status, 404);
        assert_eq!(error_message(&body), "Unknown tool 'normalize'");
        assert!(runner.commands().is_empty());
    }

    #[tokio::test]
    async fn oversized_upload_is_a_json_payload_too_large() {
        let temp = tempdir().expect("tempdir");
        let runner = RecordingRunner::new();
        let app = router(state_in(temp.path(), runner.clone()), 64);

        let content = "x".repeat(1024);
        let (status, body) = exchange(app, upload_request("/api/jobs/compress", &content)).await;
        assert_eq!(status, 413);
        assert!(error_message(&body).starts_with("upload rejected"));
        assert!(runner.commands().is_empty());
    }

    #[tokio::test]
    async fn non_multipart_job_post_is_a_json_bad_request() {
        let temp = tempdir().expect("tempdir");
        let app = router(state_in(temp.path(), RecordingRunner::new()), 1024);
        let request = "POST /api/jobs/compress HTTP/1.1\r\nHost: localhost\r\n\
                       Connection: close\r\nContent-Type: text/plain\r\n\
                       Content-Length: 5\r\n\r\nhello"
            .to_string();

        let (status, body) = exchange(app, request).await;
        assert_eq!(status, 400);
        assert!(!error_message(&body).is_empty());
    }

    #[tokio::test]
    async fn responses_carry_no_cross_origin_grant() {
        let temp = tempdir().expect("tempdir");
        let app = router(state_in(temp.path(), RecordingRunner::new()), 1024);
        let request = "GET /api/health HTTP/1.1\r\nHost: localhost\r\n\
                       Origin: https://elsewhere.example\r\nConnection: close\r\n\r\n"
            .to_string();

        let response = raw_exchange(app, request).await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(!response.to_ascii_lowercase().contains("access-control-allow-origin"));
    }
}
