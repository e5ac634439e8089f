//! Static file endpoint
//!
//! The file is read from disk on every request; nothing is cached.
//! `Last-Modified` is the time of the read, not the file's mtime, so
//! conditional requests cannot detect real changes.

use super::sniff::detect_content_type;
use super::AppState;
use crate::clock::http_date;
use axum::{
    extract::State,
    http::{
        header::{CONTENT_TYPE, LAST_MODIFIED},
        StatusCode,
    },
    response::{IntoResponse, Response},
};
use tracing::error;

pub(super) async fn serve_file(State(state): State<AppState>) -> Response {
    let data = match tokio::fs::read(state.file.as_path()).await {
        Ok(data) => data,
        Err(e) => {
            error!(path = %state.file.display(), error = %e, "Failed to read served file");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read file\n").into_response();
        }
    };

    let content_type = detect_content_type(&data);
    let last_modified = http_date(state.clock.now());

    (
        StatusCode::OK,
        [
            (CONTENT_TYPE, content_type.to_string()),
            (LAST_MODIFIED, last_modified),
        ],
        data,
    )
        .into_response()
}
