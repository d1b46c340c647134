use crate::contact::{self, Delivery};
use crate::content::{find_tool, WEB_TOOLS};
use crate::error::ApiError;
use crate::model::{
    trimmed_string, ContactSpecification, LinkStatistics, ShortenResponse, ShortenSpecification,
    UsageSpecification,
};
use crate::open_source::OpenSourceData;
use crate::palette;
use crate::rate_limit::RateLimitDecision;
use crate::state::AppState;
use crate::usage::DEFAULT_TOP_TOOLS;
use crate::utils::client_identity;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{ConnectInfo, Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;

const SHORTENER_TOOL_ID: &str = "url-shortener";
const CACHE_CONTROL_HEADER_VALUE: &str = "no-store";

/// Parses a JSON body regardless of the declared content type.
fn parse_body<T: DeserializeOwned>(body: &Bytes, message: &str) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|_| ApiError::validation(message))
}

fn parse_query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(query)| query)
        .map_err(|err| ApiError::validation(format!("Invalid query string: {}", err.body_text())))
}

pub async fn create_link(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<ShortenResponse>), ApiError> {
    let specification: ShortenSpecification = parse_body(&body, "Invalid JSON.")?;
    let url = trimmed_string(&specification.url);
    if url.is_empty() {
        return Err(ApiError::validation("url is required."));
    }

    let normalized_url = state.shortener.validate(&url)?;
    let link = state.shortener.allocate(state.store(), &normalized_url).await?;
    tracing::info!("Created short link {} for {}", link.short_code, link.original_url);
    state.usage.increment(state.store(), SHORTENER_TOOL_ID).await;

    Ok((
        StatusCode::CREATED,
        Json(ShortenResponse {
            success: true,
            short_code: link.short_code,
            original_url: link.original_url,
        }),
    ))
}

pub async fn redirect(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response, ApiError> {
    let original_url = state.shortener.resolve(state.store(), &code).await?;
    tracing::debug!("Redirecting {} to {}", code, original_url);
    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, original_url),
            (header::CACHE_CONTROL, CACHE_CONTROL_HEADER_VALUE.to_string()),
        ],
    )
        .into_response())
}

pub async fn get_link_statistics(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<LinkStatistics>, ApiError> {
    let link = state.shortener.stats(state.store(), &code).await?;
    Ok(Json(link.into()))
}

pub async fn send_contact(
    State(state): State<AppState>,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let specification: ContactSpecification =
        parse_body(&body, "Request body must be valid JSON.")?;
    let message = contact::validate(&specification)
        .map_err(|errors| ApiError::fields("Please provide valid contact details.", errors))?;

    let identity = client_identity(
        &headers,
        connect_info.map(|ConnectInfo(addr)| addr),
        state.trust_proxy_headers,
    );
    if state.contact_limiter.check_and_record(&identity, Utc::now()) == RateLimitDecision::Denied {
        tracing::debug!("Contact form rate limited for {}", identity);
        return Err(ApiError::RateLimited(
            "Please wait a minute before sending another message.".into(),
        ));
    }

    let delivery = state.mailer.send(&message).await.map_err(|err| {
        tracing::error!("Sending contact message failed: {}", err);
        ApiError::Upstream("Unable to send message right now. Please try again later.".into())
    })?;
    let text = match delivery {
        Delivery::Sent => "Message sent successfully. I will reply soon.",
        Delivery::Local => {
            "Message received. Email sending is disabled locally, but your submission was accepted."
        }
    };
    Ok(Json(json!({ "success": true, "message": text })))
}

pub async fn increment_usage(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let specification: UsageSpecification = parse_body(&body, "Invalid JSON.")?;
    let tool_id = trimmed_string(&specification.tool_id);
    if tool_id.is_empty() {
        return Err(ApiError::validation("toolId is required."));
    }
    if find_tool(&tool_id).is_none() {
        return Err(ApiError::NotFound("Unknown tool.".into()));
    }
    state.usage.increment(state.store(), &tool_id).await;
    Ok(Json(json!({ "success": true })))
}

pub async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    let tools = state.usage.all_tools(state.store()).await;
    Json(json!({ "success": true, "tools": tools }))
}

#[derive(Deserialize)]
pub struct TopToolsQuery {
    limit: Option<usize>,
}

pub async fn top_tools(
    State(state): State<AppState>,
    query: Result<Query<TopToolsQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let query = parse_query(query)?;
    let limit = query.limit.unwrap_or(DEFAULT_TOP_TOOLS).min(WEB_TOOLS.len());
    let tools = state.usage.top_tools(state.store(), limit).await;
    Ok(Json(json!({ "success": true, "tools": tools })))
}

pub async fn get_open_source(State(state): State<AppState>) -> Json<OpenSourceData> {
    Json(state.open_source.get(state.store.as_ref()).await)
}

#[derive(Deserialize)]
pub struct PaletteQuery {
    q: Option<String>,
}

pub async fn command_palette(
    State(state): State<AppState>,
    query: Result<Query<PaletteQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let query = parse_query(query)?.q.unwrap_or_default();
    let commands = palette::filter(&state.commands, &query);
    let result = palette::resolve(&state.commands, &query, None).map(palette::execute);
    Ok(Json(json!({ "commands": commands, "result": result })))
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let db = match state.store() {
        None => "disconnected",
        Some(store) => match store.ping().await {
            Ok(()) => "connected",
            Err(err) => {
                tracing::warn!("Health check could not reach the database: {}", err);
                "error"
            }
        },
    };
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "db": db,
            "uptime": state.started_at.elapsed().as_secs(),
        })),
    )
}
