//! Route registration and conversion into an axum router.

use crate::error::RegistrationError;
use crate::web::dispatch::dispatch;
use crate::web::handler::Handler;
use crate::web::reply::TemplateRenderer;
use crate::web::signature::{inspect, Classification, Signature};
use axum::extract::Request;
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::Router;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    Get,
    Post,
}

impl RouteMethod {
    fn filter(self) -> MethodFilter {
        match self {
            RouteMethod::Get => MethodFilter::GET,
            RouteMethod::Post => MethodFilter::POST,
        }
    }
}

impl fmt::Display for RouteMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
        })
    }
}

impl FromStr for RouteMethod {
    type Err = RegistrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(RouteMethod::Get),
            "POST" => Ok(RouteMethod::Post),
            _ => Err(RegistrationError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// A registered route: where it lives and how to call its handler.
pub struct RouteEntry {
    method: RouteMethod,
    path: String,
    router_path: String,
    name: String,
    classification: Classification,
    handler: Arc<dyn Handler>,
    has_captures: bool,
}

impl RouteEntry {
    pub fn method(&self) -> RouteMethod {
        self.method
    }

    /// Path template as registered, with `{name}` captures.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn classification(&self) -> &Classification {
        &self.classification
    }

    pub fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }

    pub fn has_captures(&self) -> bool {
        self.has_captures
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("name", &self.name)
            .field("classification", &self.classification)
            .finish_non_exhaustive()
    }
}

/// Declarative route definition. Built with [`get`] or [`post`], or with
/// [`RouteDef::new`] when the method and path are filled in later.
pub struct RouteDef {
    method: Option<RouteMethod>,
    path: Option<String>,
    name: String,
    signature: Signature,
    handler: Option<Arc<dyn Handler>>,
}

pub fn get(path: impl Into<String>) -> RouteDef {
    RouteDef::new().method(RouteMethod::Get).path(path)
}

pub fn post(path: impl Into<String>) -> RouteDef {
    RouteDef::new().method(RouteMethod::Post).path(path)
}

impl RouteDef {
    pub fn new() -> Self {
        RouteDef {
            method: None,
            path: None,
            name: String::new(),
            signature: Signature::new(),
            handler: None,
        }
    }

    pub fn method(mut self, method: RouteMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn signature(mut self, signature: Signature) -> Self {
        self.signature = signature;
        self
    }

    pub fn handler(mut self, handler: impl Handler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }
}

impl Default for RouteDef {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert `/blog/{id}` to axum's `/blog/:id`. Returns the router path and whether it captures.
pub fn to_router_path(path: &str) -> Result<(String, bool), RegistrationError> {
    let invalid = |reason: &str| RegistrationError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    };
    if !path.starts_with('/') {
        return Err(invalid("must start with '/'"));
    }
    let capture_re = Regex::new(r"\{([^{}]*)\}").map_err(|e| invalid(&e.to_string()))?;
    let ident_re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").map_err(|e| invalid(&e.to_string()))?;
    let mut captures = 0usize;
    for cap in capture_re.captures_iter(path) {
        let name = &cap[1];
        if !ident_re.is_match(name) {
            return Err(invalid(&format!("bad capture name '{}'", name)));
        }
        captures += 1;
    }
    let converted = capture_re.replace_all(path, ":$1").into_owned();
    if converted.contains('{') || converted.contains('}') {
        return Err(invalid("unbalanced braces"));
    }
    Ok((converted, captures > 0))
}

/// Router path with capture names erased: `/blog/:id` and `/blog/:blog_id` share `/blog/:`.
fn path_shape(router_path: &str) -> String {
    router_path
        .split('/')
        .map(|segment| if segment.starts_with(':') { ":" } else { segment })
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one handler. Signature problems and duplicate routes fail here, before any
    /// request is served.
    pub fn register(
        &mut self,
        method: &str,
        path: &str,
        name: &str,
        handler: impl Handler,
        signature: Signature,
    ) -> Result<(), RegistrationError> {
        let def = RouteDef::new()
            .method(method.parse()?)
            .path(path)
            .name(name)
            .signature(signature)
            .handler(handler);
        self.add_route(def)
    }

    pub fn add_route(&mut self, def: RouteDef) -> Result<(), RegistrationError> {
        let path = def.path.ok_or_else(|| RegistrationError::MissingPath(def.name.clone()))?;
        let method = def.method.ok_or_else(|| RegistrationError::MissingMethod(def.name.clone()))?;
        let handler = def.handler.ok_or_else(|| RegistrationError::MissingHandler {
            method: method.to_string(),
            path: path.clone(),
        })?;
        let name = if def.name.is_empty() {
            format!("{} {}", method, path)
        } else {
            def.name
        };
        let (router_path, has_captures) = to_router_path(&path)?;
        let shape = path_shape(&router_path);
        for existing in self.entries.iter().filter(|e| path_shape(&e.router_path) == shape) {
            if existing.method == method {
                return Err(RegistrationError::DuplicateRoute {
                    method: method.to_string(),
                    path,
                });
            }
            if existing.router_path != router_path {
                return Err(RegistrationError::InvalidPath {
                    reason: format!("capture names differ from {} {}", existing.method, existing.path),
                    path,
                });
            }
        }
        let classification = inspect(&name, &def.signature)?;
        tracing::info!("add route {} {} => {}{}", method, path, name, def.signature);
        self.entries.push(RouteEntry {
            method,
            path,
            router_path,
            name,
            classification,
            handler,
            has_captures,
        });
        Ok(())
    }

    /// Register a module's worth of definitions; stops at the first bad one.
    pub fn add_routes(&mut self, defs: impl IntoIterator<Item = RouteDef>) -> Result<(), RegistrationError> {
        for def in defs {
            self.add_route(def)?;
        }
        Ok(())
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Mount every entry on a router; each request goes through the dispatcher.
    pub fn into_router(self, templates: Arc<dyn TemplateRenderer>) -> Router {
        let mut by_path: BTreeMap<String, MethodRouter> = BTreeMap::new();
        for entry in self.entries {
            let router_path = entry.router_path.clone();
            let filter = entry.method.filter();
            let entry = Arc::new(entry);
            let templates = Arc::clone(&templates);
            let handler = move |req: Request| {
                let entry = Arc::clone(&entry);
                let templates = Arc::clone(&templates);
                async move { dispatch(entry, templates, req).await }
            };
            let method_router = match by_path.remove(&router_path) {
                Some(existing) => existing.on(filter, handler),
                None => on(filter, handler),
            };
            by_path.insert(router_path, method_router);
        }
        by_path
            .into_iter()
            .fold(Router::new(), |router, (path, method_router)| router.route(&path, method_router))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::web::handler::CallArgs;

    async fn index(_: CallArgs) -> Result<String, AppError> {
        Ok("ok".into())
    }

    #[test]
    fn captures_are_converted() {
        assert_eq!(to_router_path("/blog/{id}").unwrap(), ("/blog/:id".to_string(), true));
        assert_eq!(to_router_path("/api/blogs").unwrap(), ("/api/blogs".to_string(), false));
        assert!(to_router_path("blog").is_err());
        assert!(to_router_path("/blog/{id").is_err());
        assert!(to_router_path("/blog/{1x}").is_err());
    }

    #[test]
    fn method_parsing() {
        assert_eq!("get".parse::<RouteMethod>().unwrap(), RouteMethod::Get);
        assert_eq!("POST".parse::<RouteMethod>().unwrap(), RouteMethod::Post);
        assert!(matches!(
            "DELETE".parse::<RouteMethod>(),
            Err(RegistrationError::UnsupportedMethod(_))
        ));
    }

    #[test]
    fn register_records_classification() {
        let mut table = RouteTable::new();
        table
            .register("GET", "/blog/{id}", "get_blog", index, Signature::new().positional("id").request())
            .unwrap();
        let entry = &table.entries()[0];
        assert_eq!(entry.name(), "get_blog");
        assert!(entry.has_captures());
        assert!(entry.classification().takes_request);
    }

    #[test]
    fn missing_method_or_path_fails() {
        let mut table = RouteTable::new();
        let err = table.add_route(RouteDef::new().path("/").name("index").handler(index)).unwrap_err();
        assert!(matches!(err, RegistrationError::MissingMethod(n) if n == "index"));
        let err = table
            .add_route(RouteDef::new().method(RouteMethod::Get).name("index").handler(index))
            .unwrap_err();
        assert!(matches!(err, RegistrationError::MissingPath(_)));
        assert!(table.is_empty());
    }

    #[test]
    fn duplicate_routes_fail() {
        let mut table = RouteTable::new();
        table.add_route(get("/blog/{id}").name("a").handler(index)).unwrap();
        table.add_route(post("/blog/{id}").name("b").handler(index)).unwrap();
        let err = table.add_route(get("/blog/{id}").name("c").handler(index)).unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateRoute { .. }));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn same_shape_with_other_capture_names_fails() {
        let mut table = RouteTable::new();
        table.add_route(get("/blog/{id}").name("a").handler(index)).unwrap();
        let err = table.add_route(post("/blog/{blog_id}").name("b").handler(index)).unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidPath { ref path, .. } if path == "/blog/{blog_id}"));
        let err = table.add_route(get("/blog/{blog_id}").name("c").handler(index)).unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateRoute { .. }));
        assert_eq!(table.len(), 1);
        let _router = table.into_router(Arc::new(crate::web::template::Templates::new(true)));
    }

    #[test]
    fn shapes_erase_capture_names() {
        assert_eq!(path_shape("/blog/:id"), "/blog/:");
        assert_eq!(path_shape("/api/blogs/:id/comments"), "/api/blogs/:/comments");
        assert_eq!(path_shape("/api/blogs"), "/api/blogs");
    }

    #[test]
    fn bad_signature_fails_registration() {
        let mut table = RouteTable::new();
        let def = get("/x").name("x").signature(Signature::new().request().positional("id")).handler(index);
        assert!(matches!(
            table.add_route(def),
            Err(RegistrationError::RequestParamPlacement { .. })
        ));
    }

    #[test]
    fn add_routes_registers_all() {
        let mut table = RouteTable::new();
        table
            .add_routes([get("/").name("index").handler(index), post("/api/users").handler(index)])
            .unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.entries()[1].name(), "POST /api/users");
    }
}
