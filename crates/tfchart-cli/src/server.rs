//! HTTP front end
//!
//! `POST /render` renders a chart into a per-request temporary directory
//! and returns the produced files inline. `GET /healthz` reports liveness.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tfchart_core::{Chart, Values};
use tfchart_engine::Engine;
use tfchart_repo::ChartSource;
use walkdir::WalkDir;

use crate::error::{CliError, Result};

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    /// Chart directory, `.tgz` archive or `oci://` reference
    pub chart_path: String,
    #[serde(default)]
    pub values_file: Option<PathBuf>,
    /// Inline values, merged over `values_file`
    #[serde(default)]
    pub values: Option<JsonValue>,
    /// Overrides the chart's `engine.strict`
    #[serde(default)]
    pub strict: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct RenderResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RenderResponse {
    fn success(files: BTreeMap<String, String>) -> Self {
        Self {
            status: "success",
            files: Some(files),
            error: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            files: None,
            error: Some(message.into()),
        }
    }
}

impl CliError {
    fn status_code(&self) -> StatusCode {
        match self {
            CliError::Io { .. } | CliError::Repo { .. } | CliError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            CliError::Validation { .. }
            | CliError::Template { .. }
            | CliError::Chart { .. }
            | CliError::LintFailed { .. } => StatusCode::BAD_REQUEST,
        }
    }

    fn detail(&self) -> String {
        match self {
            CliError::Template { error, .. } => format!("{}: {}", self, error),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for CliError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(RenderResponse::error(self.detail()))).into_response()
    }
}

pub fn router() -> Router {
    Router::new()
        .route("/render", post(render))
        .route("/healthz", get(healthz))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn render(payload: std::result::Result<Json<RenderRequest>, JsonRejection>) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "rejected render request");
            return (
                StatusCode::BAD_REQUEST,
                Json(RenderResponse::error(rejection.body_text())),
            )
                .into_response();
        }
    };

    let chart_path = request.chart_path.clone();
    match render_request(request).await {
        Ok(files) => {
            tracing::info!(chart = %chart_path, files = files.len(), "render request served");
            Json(RenderResponse::success(files)).into_response()
        }
        Err(err) => {
            tracing::warn!(chart = %chart_path, error = %err, "render request failed");
            err.into_response()
        }
    }
}

async fn render_request(request: RenderRequest) -> Result<BTreeMap<String, String>> {
    let workdir = tempfile::tempdir()?;
    let chart_dir = ChartSource::parse(&request.chart_path)
        .resolve(&workdir.path().join("charts"))
        .await?;

    let RenderRequest {
        values_file,
        values,
        strict,
        ..
    } = request;

    tokio::task::spawn_blocking(move || {
        let values = request_values(values_file.as_deref(), values)?;
        let chart = Chart::load(&chart_dir)?.with_values(values);
        let strict = strict.unwrap_or(chart.metadata.engine.strict);

        let output_dir = workdir.path().join("output");
        Engine::builder()
            .strict(strict)
            .build()
            .render_chart(&chart, &output_dir)?;
        collect_files(&output_dir)
    })
    .await
    .map_err(|e| CliError::internal(format!("render task failed: {}", e)))?
}

fn request_values(values_file: Option<&Path>, inline: Option<JsonValue>) -> Result<Values> {
    let mut values = match values_file {
        Some(path) => Values::from_file(path)?,
        None => Values::new(),
    };
    if let Some(inline) = inline {
        values.merge(&Values::from_value(inline, "request values")?);
    }
    Ok(values)
}

/// Read every file under `root`, keyed by its `/`-separated relative path
fn collect_files(root: &Path) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();
    if !root.exists() {
        return Ok(files);
    }

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| CliError::Io {
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| CliError::internal(e.to_string()))?;
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.insert(key, std::fs::read_to_string(entry.path())?);
    }

    Ok(files)
}
