// Copyright 2026 Revtail Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use tower_http::cors::CorsLayer;

use revtail_rs::{FileSession, LineStream, ReverseTailReader, TailOptions};

use crate::config::ServeConfig;
use crate::validate::{self, ResolveError, TailParams};

// Embed the browser form so the binary can serve it directly.
const TAIL_INDEX_TEMPLATE: &str = include_str!("../static/tail/index.html");

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<ServeConfig>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let cors = if state.cfg.cors_all {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([axum::http::Method::GET])
    };

    Router::new()
        .route("/file", get(tail_handler))
        .route("/health", get(health_handler))
        .route("/", get(index_handler))
        .layer(cors)
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "OK"
}

async fn index_handler() -> Html<&'static str> {
    Html(TAIL_INDEX_TEMPLATE)
}

fn error_body(status: StatusCode, msg: String) -> Response {
    let body = serde_json::json!({ "error": msg });
    (status, Json(body)).into_response()
}

/// `GET /file?filepath=<path>&entries=<n>&search=<term>`
///
/// Validation and path resolution happen before any file handle is acquired;
/// after that the response streams incrementally, so mid-stream failures
/// (encoding, concurrent mutation) surface as a reset connection rather than
/// a trailing error body.
async fn tail_handler(
    State(state): State<AppState>,
    Query(params): Query<TailParams>,
) -> Response {
    let req = match validate::validate(&params) {
        Ok(req) => req,
        Err(msg) => {
            tracing::debug!(error = %msg, "rejected tail request");
            return error_body(StatusCode::BAD_REQUEST, msg);
        }
    };

    let path = match validate::resolve_under_base(&state.cfg.base_dir, &req.filepath) {
        Ok(p) => p,
        Err(ResolveError::NotFound) => {
            return error_body(
                StatusCode::NOT_FOUND,
                format!("no such file: {}", req.filepath),
            );
        }
        Err(ResolveError::Escapes) => {
            tracing::warn!(filepath = %req.filepath, "rejected path escaping base directory");
            return error_body(
                StatusCode::BAD_REQUEST,
                "filepath resolves outside the served directory".to_string(),
            );
        }
        Err(ResolveError::NotAFile) => {
            return error_body(
                StatusCode::BAD_REQUEST,
                format!("not a regular file: {}", req.filepath),
            );
        }
    };

    let session = match FileSession::open(&path) {
        Ok(s) => s,
        Err(e) => {
            // Raced with deletion between resolve and open.
            tracing::warn!(path = %path.display(), error = %e, "failed to open file");
            return error_body(
                StatusCode::NOT_FOUND,
                format!("could not open file: {}", req.filepath),
            );
        }
    };

    tracing::info!(
        path = %path.display(),
        entries = ?req.entries,
        search = ?req.search,
        "streaming tail"
    );

    let reader = ReverseTailReader::new(
        session,
        TailOptions {
            block_size: state.cfg.block_size,
            ceiling: state.cfg.leftover_ceiling,
            entries: req.entries,
            search: req.search,
        },
    );
    let stream = LineStream::spawn(reader);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(stream),
    )
        .into_response()
}
