//! Handler return values and their mapping onto HTTP responses.

use crate::error::{ApiError, AppError};
use crate::orm::Model;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use minijinja::ErrorKind;
use serde_json::{Map, Value};

/// Mapping key naming the template to render with the mapping as context.
pub const TEMPLATE_KEY: &str = "__template__";

const REDIRECT_PREFIX: &str = "redirect:";
const HTML: &str = "text/html;charset=utf-8";
const JSON: &str = "application/json;charset=utf-8";
const PLAIN: &str = "text/plain;charset=utf-8";
const OCTET: &str = "application/octet-stream";

/// Renders a named template with a mapping as its variables.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, name: &str, vars: &Map<String, Value>) -> Result<String, AppError>;
}

/// Everything a handler may return.
#[derive(Debug)]
pub enum Reply {
    /// Passed through untouched.
    Native(Response),
    Bytes(Bytes),
    /// HTML, or a redirect when prefixed with `redirect:`.
    Text(String),
    /// JSON, or a rendered template when it carries `__template__`.
    Mapping(Map<String, Value>),
    Status(i64),
    StatusMessage(i64, String),
    /// Stringified as `text/plain`.
    Plain(String),
}

impl Reply {
    /// Mapping that renders `template` with `vars`.
    pub fn template(template: &str, mut vars: Map<String, Value>) -> Self {
        vars.insert(TEMPLATE_KEY.into(), Value::String(template.into()));
        Reply::Mapping(vars)
    }

    pub fn redirect(to: &str) -> Self {
        Reply::Text(format!("{}{}", REDIRECT_PREFIX, to))
    }
}

impl From<Response> for Reply {
    fn from(r: Response) -> Self {
        Reply::Native(r)
    }
}

impl From<Bytes> for Reply {
    fn from(b: Bytes) -> Self {
        Reply::Bytes(b)
    }
}

impl From<Vec<u8>> for Reply {
    fn from(b: Vec<u8>) -> Self {
        Reply::Bytes(Bytes::from(b))
    }
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Reply::Text(s)
    }
}

impl From<&str> for Reply {
    fn from(s: &str) -> Self {
        Reply::Text(s.to_string())
    }
}

impl From<Map<String, Value>> for Reply {
    fn from(m: Map<String, Value>) -> Self {
        Reply::Mapping(m)
    }
}

impl From<u16> for Reply {
    fn from(code: u16) -> Self {
        Reply::Status(i64::from(code))
    }
}

impl From<i64> for Reply {
    fn from(code: i64) -> Self {
        Reply::Status(code)
    }
}

impl<M: Into<String>> From<(u16, M)> for Reply {
    fn from((code, message): (u16, M)) -> Self {
        Reply::StatusMessage(i64::from(code), message.into())
    }
}

impl From<Model> for Reply {
    fn from(m: Model) -> Self {
        Reply::Mapping(m.into_values())
    }
}

impl From<ApiError> for Reply {
    fn from(e: ApiError) -> Self {
        Reply::Mapping(e.to_mapping())
    }
}

impl From<Value> for Reply {
    fn from(v: Value) -> Self {
        match v {
            Value::String(s) => Reply::Text(s),
            Value::Object(m) => Reply::Mapping(m),
            Value::Number(ref n) if n.is_i64() => Reply::Status(n.as_i64().unwrap_or_default()),
            Value::Array(ref items) if items.len() == 2 && items[0].is_i64() => {
                let message = match &items[1] {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Reply::StatusMessage(items[0].as_i64().unwrap_or_default(), message)
            }
            other => Reply::Plain(other.to_string()),
        }
    }
}

fn with_type(status: StatusCode, content_type: &'static str, body: impl Into<Body>) -> Response {
    let mut resp = Response::new(body.into());
    *resp.status_mut() = status;
    resp.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    resp
}

fn valid_status(code: i64) -> Option<StatusCode> {
    if (100..600).contains(&code) {
        u16::try_from(code).ok().and_then(|c| StatusCode::from_u16(c).ok())
    } else {
        None
    }
}

/// Map a reply onto a response. Template failures surface as errors.
pub fn normalize(reply: Reply, templates: &dyn TemplateRenderer) -> Result<Response, AppError> {
    Ok(match reply {
        Reply::Native(resp) => resp,
        Reply::Bytes(b) => with_type(StatusCode::OK, OCTET, b),
        Reply::Text(s) => match s.strip_prefix(REDIRECT_PREFIX) {
            Some(to) => {
                let location = HeaderValue::from_str(to)
                    .map_err(|_| AppError::BadRequest(format!("invalid redirect target: {}", to)))?;
                let mut resp = StatusCode::FOUND.into_response();
                resp.headers_mut().insert(header::LOCATION, location);
                resp
            }
            None => with_type(StatusCode::OK, HTML, s),
        },
        Reply::Mapping(m) => match m.get(TEMPLATE_KEY) {
            Some(Value::String(name)) => {
                let html = templates.render(name, &m)?;
                with_type(StatusCode::OK, HTML, html)
            }
            Some(other) => {
                return Err(minijinja::Error::new(
                    ErrorKind::InvalidOperation,
                    format!("{} must be a template name, got {}", TEMPLATE_KEY, other),
                )
                .into())
            }
            None => with_type(StatusCode::OK, JSON, serde_json::to_vec(&m).unwrap_or_default()),
        },
        Reply::Status(code) => match valid_status(code) {
            Some(status) => status.into_response(),
            None => with_type(StatusCode::OK, PLAIN, code.to_string()),
        },
        Reply::StatusMessage(code, message) => match valid_status(code) {
            Some(status) => with_type(status, PLAIN, message),
            None => with_type(StatusCode::OK, PLAIN, format!("({}, '{}')", code, message)),
        },
        Reply::Plain(s) => with_type(StatusCode::OK, PLAIN, s),
    })
}
