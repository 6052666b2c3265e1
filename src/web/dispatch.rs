//! Per-call argument binding and handler invocation.
//!
//! For every request the dispatcher picks a keyword source (JSON body, form, multipart or
//! query string), narrows it to the handler's declared keywords, merges path captures over
//! it, attaches the request when asked for, checks required keywords, then calls the
//! handler. An [`ApiError`](crate::error::ApiError) raised by the handler becomes a regular
//! mapping reply.

use crate::error::AppError;
use crate::web::handler::{CallArgs, RequestContext};
use crate::web::reply::{normalize, Reply, TemplateRenderer};
use crate::web::routes::RouteEntry;
use crate::web::signature::Classification;
use axum::body::Body;
use axum::extract::{FromRequest, FromRequestParts, Multipart, Path, Request};
use axum::http::{header, HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use http_body_util::LengthLimitError;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Handle one request for `entry` and always produce a response.
pub async fn dispatch(entry: Arc<RouteEntry>, templates: Arc<dyn TemplateRenderer>, req: Request) -> Response {
    let reply = match run(&entry, req).await {
        Ok(reply) => reply,
        Err(e) => return e.into_response(),
    };
    normalize(reply, templates.as_ref()).unwrap_or_else(IntoResponse::into_response)
}

async fn run(entry: &RouteEntry, req: Request) -> Result<Reply, AppError> {
    let (mut parts, body) = req.into_parts();
    let path_params = if entry.has_captures() {
        Path::<Vec<(String, String)>>::from_request_parts(&mut parts, &())
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
            .0
    } else {
        Vec::new()
    };
    let classification = entry.classification();
    let source = if classification.needs_keywords() {
        read_source(&parts.method, parts.uri.query(), &parts.headers, body).await?
    } else {
        None
    };
    let request = classification.takes_request.then(|| RequestContext {
        method: parts.method.clone(),
        uri: parts.uri.clone(),
        headers: parts.headers.clone(),
    });
    let args = bind_arguments(classification, source, path_params, request)?;
    tracing::debug!(handler = %entry.name(), args = ?args.kw(), "call");
    match entry.handler().call(args).await {
        Ok(reply) => Ok(reply),
        Err(AppError::Api(e)) => {
            tracing::info!(handler = %entry.name(), error = %e, "api error");
            Ok(Reply::Mapping(e.to_mapping()))
        }
        Err(e) => Err(e),
    }
}

/// Pick and parse the keyword source. `None` when the request carries none.
async fn read_source(
    method: &Method,
    query: Option<&str>,
    headers: &HeaderMap,
    body: Body,
) -> Result<Option<Map<String, Value>>, AppError> {
    if *method == Method::POST {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::BadRequest("Missing Content-Type.".into()))?;
        let ct = content_type.to_ascii_lowercase();
        if ct.starts_with("application/json") {
            let bytes = read_body(body).await?;
            return parse_json_object(&bytes).map(Some);
        }
        if ct.starts_with("application/x-www-form-urlencoded") {
            let bytes = read_body(body).await?;
            return parse_pairs(&bytes).map(Some);
        }
        if ct.starts_with("multipart/form-data") {
            return read_multipart(headers, body).await.map(Some);
        }
        return Err(AppError::BadRequest(format!("Unsupported Content-Type: {}", content_type)));
    }
    if *method == Method::GET {
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            return parse_pairs(q.as_bytes()).map(Some);
        }
    }
    Ok(None)
}

async fn read_body(body: Body) -> Result<axum::body::Bytes, AppError> {
    axum::body::to_bytes(body, usize::MAX).await.map_err(|e| {
        if exceeds_limit(&e) {
            AppError::PayloadTooLarge
        } else {
            AppError::BadRequest(format!("failed to read body: {}", e))
        }
    })
}

/// Whether a body error was caused by the request body limit anywhere in its source chain.
fn exceeds_limit(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}

pub fn parse_json_object(bytes: &[u8]) -> Result<Map<String, Value>, AppError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))?;
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("JSON body must be object.".into())),
    }
}

/// Parse `a=1&b=2` style pairs. The first value of a repeated key wins; blank values are kept.
pub fn parse_pairs(bytes: &[u8]) -> Result<Map<String, Value>, AppError> {
    let pairs: Vec<(String, String)> =
        serde_urlencoded::from_bytes(bytes).map_err(|e| AppError::BadRequest(format!("Invalid form data: {}", e)))?;
    let mut map = Map::new();
    for (k, v) in pairs {
        map.entry(k).or_insert(Value::String(v));
    }
    Ok(map)
}

async fn read_multipart(headers: &HeaderMap, body: Body) -> Result<Map<String, Value>, AppError> {
    let mut req = Request::new(body);
    *req.headers_mut() = headers.clone();
    let mut multipart = Multipart::from_request(req, &())
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    let mut map = Map::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let text = field.text().await.map_err(|e| AppError::BadRequest(e.body_text()))?;
        map.entry(name).or_insert(Value::String(text));
    }
    Ok(map)
}

/// Assemble the call arguments from an already-parsed keyword source and path captures.
pub fn bind_arguments(
    classification: &Classification,
    source: Option<Map<String, Value>>,
    path_params: Vec<(String, String)>,
    request: Option<RequestContext>,
) -> Result<CallArgs, AppError> {
    let kw = match source {
        None => path_params
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect::<Map<String, Value>>(),
        Some(mut kw) => {
            if !classification.accepts_var_kw {
                kw.retain(|k, _| classification.named.iter().any(|n| n == k));
            }
            for (k, v) in path_params {
                if kw.contains_key(&k) {
                    tracing::warn!("Duplicate arg name in named arg and kw args: {}", k);
                }
                kw.insert(k, Value::String(v));
            }
            kw
        }
    };
    if let Some(missing) = classification.required.iter().find(|name| !kw.contains_key(name.as_str())) {
        return Err(AppError::BadRequest(format!("Missing argument: {}", missing)));
    }
    let request = if classification.takes_request { request } else { None };
    Ok(CallArgs::new(kw, request))
}
