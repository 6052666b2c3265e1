use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower::ServiceExt;
use webstrate::web::TemplateRenderer;
use webstrate::{get, post, ApiError, AppError, CallArgs, Reply, RouteTable, Signature, Templates};

async fn hello(args: CallArgs) -> Result<String, AppError> {
    Ok(format!("hello {}", args.str("name").unwrap_or("?")))
}

async fn blog(args: CallArgs) -> Result<String, AppError> {
    let path = args.request().map(|r| r.path().to_string()).unwrap_or_default();
    Ok(format!("{} {}", args.str("id").unwrap_or("?"), path))
}

async fn item(args: CallArgs) -> Result<String, AppError> {
    Ok(args.str("id").unwrap_or("?").to_string())
}

async fn echo(args: CallArgs) -> Result<Map<String, Value>, AppError> {
    Ok(args.kw().clone())
}

async fn login(_: CallArgs) -> Result<&'static str, AppError> {
    Ok("redirect:/login")
}

async fn page(_: CallArgs) -> Result<Reply, AppError> {
    let mut vars = Map::new();
    vars.insert("user".into(), json!("ana"));
    Ok(Reply::template("page.html", vars))
}

async fn data(_: CallArgs) -> Result<Value, AppError> {
    Ok(json!({"a": 1}))
}

async fn denied(_: CallArgs) -> Result<String, AppError> {
    Err(ApiError::permission_denied("admin only").into())
}

fn templates() -> Arc<dyn TemplateRenderer> {
    let mut t = Templates::new(true);
    t.add_template("page.html", "<p>hi {{ user }}</p>").unwrap();
    Arc::new(t)
}

fn app() -> axum::Router {
    let mut table = RouteTable::new();
    table
        .add_routes([
            post("/hello").name("hello").signature(Signature::new().required("name")).handler(hello),
            get("/blog/{id}")
                .name("blog")
                .signature(Signature::new().positional("id").request())
                .handler(blog),
            get("/item/{id}").name("item").signature(Signature::new().optional("id")).handler(item),
            get("/echo").name("echo").signature(Signature::new().var_kw()).handler(echo),
            get("/login").name("login").handler(login),
            get("/page").name("page").handler(page),
            get("/data").name("data").handler(data),
            get("/admin").name("admin").handler(denied),
        ])
        .unwrap();
    table.into_router(templates())
}

async fn send(req: Request<Body>) -> Response {
    app().oneshot(req).await.unwrap()
}

async fn text(resp: Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn post_with(uri: &str, content_type: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(body.into())
        .unwrap()
}

fn get_req(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn json_body_binds_required_keyword() {
    let resp = send(post_with("/hello", "application/json", r#"{"name": "x"}"#)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(text(resp).await, "hello x");
}

#[tokio::test]
async fn missing_required_keyword_is_a_client_error() {
    let resp = send(post_with("/hello", "application/json", "{}")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(text(resp).await.contains("Missing argument: name"));
}

#[tokio::test]
async fn post_without_content_type_is_rejected() {
    let req = Request::builder().method("POST").uri("/hello").body(Body::from("name=x")).unwrap();
    let resp = send(req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(text(resp).await.contains("Missing Content-Type."));
}

#[tokio::test]
async fn unsupported_content_type_is_rejected() {
    let resp = send(post_with("/hello", "text/plain", "name=x")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(text(resp).await.contains("Unsupported Content-Type: text/plain"));
}

#[tokio::test]
async fn json_array_body_is_rejected() {
    let resp = send(post_with("/hello", "application/json", "[1]")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(text(resp).await.contains("JSON body must be object."));
}

#[tokio::test]
async fn form_body_binds() {
    let resp = send(post_with("/hello", "application/x-www-form-urlencoded", "name=form&other=1")).await;
    assert_eq!(text(resp).await, "hello form");
}

#[tokio::test]
async fn multipart_body_binds() {
    let body = "--XBOUNDARY\r\n\
                Content-Disposition: form-data; name=\"name\"\r\n\r\n\
                multi\r\n\
                --XBOUNDARY--\r\n";
    let resp = send(post_with("/hello", "multipart/form-data; boundary=XBOUNDARY", body)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(text(resp).await, "hello multi");
}

#[tokio::test]
async fn path_capture_binds_positional_and_request() {
    let resp = send(get_req("/blog/42")).await;
    assert_eq!(text(resp).await, "42 /blog/42");
}

#[tokio::test]
async fn path_capture_wins_over_query() {
    let resp = send(get_req("/item/42?id=1")).await;
    assert_eq!(text(resp).await, "42");
}

#[tokio::test]
async fn var_kw_keeps_every_query_key() {
    let resp = send(get_req("/echo?a=1&b=&a=2")).await;
    let v: Value = serde_json::from_str(&text(resp).await).unwrap();
    assert_eq!(v, json!({"a": "1", "b": ""}));
}

#[tokio::test]
async fn redirect_reply() {
    let resp = send(get_req("/login")).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");
}

#[tokio::test]
async fn template_reply_is_rendered() {
    let resp = send(get_req("/page")).await;
    assert_eq!(resp.headers().get(header::CONTENT_TYPE).unwrap(), "text/html;charset=utf-8");
    assert_eq!(text(resp).await, "<p>hi ana</p>");
}

#[tokio::test]
async fn mapping_reply_is_json() {
    let resp = send(get_req("/data")).await;
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json;charset=utf-8"
    );
    assert_eq!(text(resp).await, r#"{"a":1}"#);
}

#[tokio::test]
async fn api_error_becomes_mapping() {
    let resp = send(get_req("/admin")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let v: Value = serde_json::from_str(&text(resp).await).unwrap();
    assert_eq!(
        v,
        json!({"error": "permission:forbidden", "data": "permission", "message": "admin only"})
    );
}

#[tokio::test]
async fn unregistered_method_is_not_allowed() {
    let req = Request::builder().method("POST").uri("/data").body(Body::empty()).unwrap();
    let resp = send(req).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}
