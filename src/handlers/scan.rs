use axum::{
    Json,
    extract::{Multipart, State},
};
use std::sync::Arc;

use crate::client_ip::ClientIp;
use crate::error::Error;
use crate::metrics::{ADMISSIONS_DENIED, RATE_LIMIT_KEYS, REQUEST_TOTAL};
use crate::models::{ScanResponse, WorkItem};
use crate::orchestrator::run_batch;
use crate::rate_limit::{Admission, RateKey};
use crate::state::AppState;

const OPERATION: &str = "scan";

// "a,b" or ["a","b"] -> ordered field names
pub fn parse_columns(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.starts_with('[') {
        if let Ok(columns) = serde_json::from_str::<Vec<String>>(text) {
            return columns
                .into_iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }
    }
    text.split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

// Rate limit check, before any of the body is read
fn check_admission(state: &AppState, client: &ClientIp) -> Result<(), Error> {
    let key = RateKey::new(&client.0, OPERATION);
    let admission = state
        .admission
        .admit(&key, state.rate_limit, state.rate_window);
    RATE_LIMIT_KEYS.set(state.admission.tracked_keys() as f64);

    match admission {
        Admission::Allowed => Ok(()),
        Admission::Denied { retry_after } => {
            ADMISSIONS_DENIED.inc();
            tracing::info!(%key, ?retry_after, "admission denied");
            Err(Error::RateLimited {
                limit: state.rate_limit,
                window_secs: state.rate_window.as_secs(),
                retry_after,
            })
        }
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<(Vec<String>, Vec<WorkItem>), Error> {
    let mut columns = Vec::new();
    let mut items = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("columns") => columns.extend(parse_columns(&field.text().await?)),
            Some("files") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                let mut item = WorkItem::new(items.len(), filename, bytes);
                item.content_type = content_type;
                items.push(item);
            }
            other => tracing::debug!(field = ?other, "ignoring unknown multipart field"),
        }
    }

    Ok((columns, items))
}

pub async fn scan_handler(
    State(state): State<Arc<AppState>>,
    client: ClientIp,
    multipart: Multipart,
) -> Result<Json<ScanResponse>, Error> {
    REQUEST_TOTAL.inc();
    check_admission(&state, &client)?;

    let (columns, items) = read_upload(multipart).await?;
    if items.is_empty() {
        return Err(Error::Unprocessable {
            message: "At least one image is required in the `files` field.".to_string(),
        });
    }
    if columns.is_empty() {
        return Err(Error::Unprocessable {
            message: "At least one field name is required in the `columns` field.".to_string(),
        });
    }

    tracing::info!(client = %client.0, images = items.len(), ?columns, "scan accepted");

    let extractor = Arc::clone(&state.extractor);
    let fields: Arc<[String]> = columns.into();
    let batch = run_batch(
        items,
        move |item| {
            let extractor = Arc::clone(&extractor);
            let fields = Arc::clone(&fields);
            async move { extractor.extract(&item, &fields).await }
        },
        state.extraction_timeout,
    )
    .await;

    Ok(Json(ScanResponse::from(batch)))
}
