use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Extension, Json, Router};
use chrono::{DateTime, TimeDelta, Utc};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::devices::{Device, DeviceRegistry};
use crate::error::{ApiError, ApiResult};
use crate::request_context::RequestContext;
use crate::state::AppState;
use crate::time::{format_duration, parse_rfc3339_utc};

#[derive(Debug, Clone, serde::Deserialize)]
pub(crate) struct HeartbeatRequest {
    #[serde(default)]
    sent_at: Option<String>,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub(crate) struct UploadStatsRequest {
    #[serde(default)]
    sent_at: Option<String>,
    /// Upload duration in nanoseconds.
    #[serde(default)]
    upload_time: i64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DeviceStatsResponse {
    pub uptime: f64,
    pub avg_upload_time: String,
}

fn reject(ctx: &RequestContext, err: ApiError) -> ApiError {
    tracing::warn!(
        request_id = %ctx.request_id,
        status = err.status.as_u16(),
        error = %err.message,
        "request error"
    );
    err
}

async fn resolve_device(
    ctx: &RequestContext,
    registry: &DeviceRegistry,
    device_id: &str,
) -> ApiResult<Arc<Device>> {
    if device_id.is_empty() {
        return Err(reject(ctx, ApiError::bad_request("device_id is required")));
    }
    registry
        .get(device_id)
        .await
        .map_err(|err| reject(ctx, err.into()))
}

/// Decodes the first JSON value in the body; anything after it is ignored.
fn decode_json<T: DeserializeOwned>(ctx: &RequestContext, body: &Bytes) -> ApiResult<T> {
    serde_json::Deserializer::from_slice(body)
        .into_iter::<T>()
        .next()
        .and_then(Result::ok)
        .ok_or_else(|| reject(ctx, ApiError::bad_request("invalid JSON body")))
}

fn parse_sent_at(ctx: &RequestContext, raw: &str) -> ApiResult<DateTime<Utc>> {
    parse_rfc3339_utc(raw).ok_or_else(|| {
        reject(
            ctx,
            ApiError::bad_request("sent_at must be RFC3339 formatted"),
        )
    })
}

pub(crate) async fn record_heartbeat(
    State(registry): State<Arc<DeviceRegistry>>,
    Extension(ctx): Extension<RequestContext>,
    Path(device_id): Path<String>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let device = resolve_device(&ctx, &registry, &device_id).await?;
    let payload: HeartbeatRequest = decode_json(&ctx, &body)?;

    let raw_sent_at = payload
        .sent_at
        .as_deref()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| reject(&ctx, ApiError::bad_request("sent_at is required")))?;
    let sent_at = parse_sent_at(&ctx, raw_sent_at)?;

    let new_minute = device.record_heartbeat(sent_at).await;

    tracing::info!(
        request_id = %ctx.request_id,
        device_id = %device.id(),
        sent_at = %sent_at.to_rfc3339(),
        new_minute,
        "heartbeat recorded"
    );
    Ok(StatusCode::OK)
}

pub(crate) async fn record_upload_stats(
    State(registry): State<Arc<DeviceRegistry>>,
    Extension(ctx): Extension<RequestContext>,
    Path(device_id): Path<String>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let device = resolve_device(&ctx, &registry, &device_id).await?;
    let payload: UploadStatsRequest = decode_json(&ctx, &body)?;

    if let Some(raw) = payload.sent_at.as_deref().filter(|value| !value.is_empty()) {
        parse_sent_at(&ctx, raw)?;
    }
    if payload.upload_time < 0 {
        return Err(reject(
            &ctx,
            ApiError::bad_request("upload_time must be >= 0"),
        ));
    }

    let totals = device
        .record_upload(TimeDelta::nanoseconds(payload.upload_time))
        .await
        .map_err(|err| reject(&ctx, err.into()))?;

    tracing::info!(
        request_id = %ctx.request_id,
        device_id = %device.id(),
        upload_time_ns = payload.upload_time,
        upload_count = totals.upload_count,
        upload_sum_ns = %totals.upload_duration_sum_ns,
        "stats recorded"
    );
    Ok(StatusCode::OK)
}

pub(crate) async fn get_device_stats(
    State(registry): State<Arc<DeviceRegistry>>,
    Extension(ctx): Extension<RequestContext>,
    Path(device_id): Path<String>,
) -> ApiResult<Json<DeviceStatsResponse>> {
    let device = resolve_device(&ctx, &registry, &device_id).await?;

    let snapshot = device.snapshot().await;
    let uptime = snapshot.uptime_percentage();
    let avg_upload_time = format_duration(snapshot.average_upload_duration());

    tracing::info!(
        request_id = %ctx.request_id,
        device_id = %device.id(),
        uptime,
        avg_upload_time = %avg_upload_time,
        "stats retrieved"
    );
    Ok(Json(DeviceStatsResponse {
        uptime,
        avg_upload_time,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/devices/{device_id}/heartbeat", post(record_heartbeat))
        .route(
            "/devices/{device_id}/stats",
            post(record_upload_stats).get(get_device_stats),
        )
}
