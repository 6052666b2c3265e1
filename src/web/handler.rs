//! Handler trait and the arguments the dispatcher assembles for each call.

use crate::error::AppError;
use crate::web::reply::Reply;
use async_trait::async_trait;
use axum::http::{header, HeaderMap, Method, Uri};
use cookie::Cookie;
use serde_json::{Map, Value};
use std::future::Future;

/// Request data handed to handlers that declare a `request` parameter.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestContext {
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decoded value of a cookie from the `Cookie` headers. Surrounding double quotes are
    /// stripped and percent-escapes decoded; malformed pairs are skipped.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(Cookie::split_parse_encoded)
            .filter_map(Result::ok)
            .find(|c| c.name() == name)
            .map(|c| c.value_trimmed().to_string())
    }
}

/// Keyword arguments bound for one call, plus the request when the handler asked for it.
#[derive(Clone, Debug, Default)]
pub struct CallArgs {
    kw: Map<String, Value>,
    request: Option<RequestContext>,
}

impl CallArgs {
    pub fn new(kw: Map<String, Value>, request: Option<RequestContext>) -> Self {
        CallArgs { kw, request }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.kw.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.kw.get(name).and_then(Value::as_str)
    }

    /// Argument declared required; missing ones are rejected before the handler runs, so
    /// this only fails when the signature and handler disagree.
    pub fn require(&self, name: &str) -> Result<&Value, AppError> {
        self.kw
            .get(name)
            .ok_or_else(|| AppError::BadRequest(format!("Missing argument: {}", name)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kw.contains_key(name)
    }

    pub fn kw(&self) -> &Map<String, Value> {
        &self.kw
    }

    pub fn request(&self) -> Option<&RequestContext> {
        self.request.as_ref()
    }
}

#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, args: CallArgs) -> Result<Reply, AppError>;
}

#[async_trait]
impl<F, Fut, R> Handler for F
where
    F: Fn(CallArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, AppError>> + Send + 'static,
    R: Into<Reply> + Send + 'static,
{
    async fn call(&self, args: CallArgs) -> Result<Reply, AppError> {
        (self)(args).await.map(Into::into)
    }
}
