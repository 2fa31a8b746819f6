//! Lineage analysis API server using axum
//!
//! Exposes the same analysis pipeline as `analyze` over HTTP so the
//! visualization layer can submit SQL payloads and receive the wire-format
//! lineage document.

use anyhow::{Context, Result};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;

use st_core::resolver::Resolver;
use st_core::statement::FileExtraction;
use st_sql::{extract_statements, supported_dialects, SqlParser};

use crate::cli::{GlobalArgs, ServeArgs};

/// One named SQL payload in an analyze request
#[derive(Debug, Deserialize)]
struct SqlPayload {
    name: String,
    sql: String,
}

/// Body of POST /api/analyze
#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    files: Vec<SqlPayload>,
    #[serde(default)]
    dialect: Option<String>,
    #[serde(default = "default_include_columns")]
    include_columns: bool,
}

fn default_include_columns() -> bool {
    true
}

/// Per-file parse failure reported alongside the wire document
#[derive(Debug, Serialize)]
struct FileError {
    file: String,
    error: String,
}

#[derive(Debug, Serialize)]
struct DialectsResponse {
    dialects: Vec<&'static str>,
}

/// Execute the serve command
pub async fn execute(args: &ServeArgs, _global: &GlobalArgs) -> Result<()> {
    let app = Router::new()
        .route("/api/dialects", get(get_dialects))
        .route("/api/analyze", post(post_analyze))
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .context("Invalid host:port")?;

    println!("Serving lineage API at http://{}:{}", args.host, args.port);
    println!("Press Ctrl+C to stop.\n");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}:{}", args.host, args.port))?;
    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}

/// GET /api/dialects
async fn get_dialects() -> Json<DialectsResponse> {
    Json(DialectsResponse {
        dialects: supported_dialects(),
    })
}

/// POST /api/analyze
async fn post_analyze(
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let dialect = request.dialect.as_deref().unwrap_or("generic");
    let parser = SqlParser::from_dialect_name(dialect)
        .map_err(|err| (StatusCode::BAD_REQUEST, err.to_string()))?;

    let mut extractions = Vec::new();
    let mut errors = Vec::new();
    for payload in &request.files {
        match parser.parse(&payload.sql) {
            Ok(statements) => extractions.push(FileExtraction {
                file: payload.name.clone(),
                statements: extract_statements(&statements),
            }),
            Err(err) => errors.push(FileError {
                file: payload.name.clone(),
                error: err.to_string(),
            }),
        }
    }

    let resolution = Resolver::resolve(&extractions, request.include_columns);
    let mut document = serde_json::to_value(resolution.to_wire())
        .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?;

    if let Some(object) = document.as_object_mut() {
        object.insert(
            "errors".to_string(),
            serde_json::to_value(&errors)
                .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?,
        );
        if let Some(cycle) = &resolution.cycle {
            object.insert(
                "cycle".to_string(),
                serde_json::to_value(cycle)
                    .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))?,
            );
        }
    }

    Ok(Json(document))
}
