//! Read-only query API over topic tables
//!
//! Storage faults on these paths are logged and answered with empty results;
//! only a malformed id is reported to the client.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::response::Json;
use serde::Serialize;

use crate::context::AppContext;
use crate::error::AppError;
use crate::models::LogRecord;

/// Table name that selects every topic in `GET /logs/:table`
pub const ALL_TABLES: &str = "all";

/// Response for `GET /logs/:table`
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum LogsResponse {
    Table(Vec<LogRecord>),
    All(BTreeMap<String, Vec<LogRecord>>),
}

/// GET /tables - Names of all topic tables
pub async fn list_tables(State(ctx): State<AppContext>) -> Json<Vec<String>> {
    Json(topic_tables(&ctx).await)
}

/// GET /logs/{table} - Recent records of one table, or of every table for `all`
pub async fn list_logs(
    State(ctx): State<AppContext>,
    Path(table): Path<String>,
) -> Json<LogsResponse> {
    if table == ALL_TABLES {
        let mut all = BTreeMap::new();
        for name in topic_tables(&ctx).await {
            let records = recent_records(&ctx, &name).await;
            all.insert(name, records);
        }
        return Json(LogsResponse::All(all));
    }

    Json(LogsResponse::Table(recent_records(&ctx, &table).await))
}

/// GET /{table}/{id} - A single record, or `null` when absent
pub async fn get_log(
    State(ctx): State<AppContext>,
    Path((table, log_id)): Path<(String, String)>,
) -> Result<Json<Option<LogRecord>>, AppError> {
    let id: i64 = log_id
        .trim()
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid logID".to_string()))?;

    match ctx.storage.get_by_id(&table, id).await {
        Ok(record) => Ok(Json(record)),
        Err(e) => {
            tracing::warn!(table = %table, id = id, error = %e, "Failed to get log");
            Ok(Json(None))
        }
    }
}

async fn topic_tables(ctx: &AppContext) -> Vec<String> {
    ctx.storage.list_topic_tables().await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to get all table names");
        Vec::new()
    })
}

async fn recent_records(ctx: &AppContext, table: &str) -> Vec<LogRecord> {
    ctx.storage
        .list_recent(table, ctx.recent_limit)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(table = %table, error = %e, "Failed to get logs");
            Vec::new()
        })
}
