//! Blog handlers and their route definitions.

use crate::models::Models;
use serde_json::{json, Map, Value};
use std::future::Future;
use std::sync::Arc;
use webstrate::{get, post, ApiError, AppError, CallArgs, Database, Model, Reply, RouteDef, Signature};

const MASKED: &str = "******";
const ANONYMOUS_IMAGE: &str = "about:blank";

#[derive(Clone)]
pub struct Ctx {
    pub db: Database,
    pub models: Models,
}

/// Adapt `async fn(Ctx, CallArgs)` into a route handler that owns a clone of the context.
fn bind<F, Fut>(ctx: &Ctx, f: F) -> impl Fn(CallArgs) -> Fut + Send + Sync + 'static
where
    F: Fn(Ctx, CallArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply, AppError>> + Send + 'static,
{
    let ctx = ctx.clone();
    move |args| f(ctx.clone(), args)
}

pub fn routes(ctx: &Ctx) -> Vec<RouteDef> {
    vec![
        get("/").name("index").handler(bind(ctx, index)),
        get("/blog/{id}")
            .name("get_blog")
            .signature(Signature::new().positional("id").request())
            .handler(bind(ctx, get_blog)),
        get("/manage").name("manage").handler(|_: CallArgs| async { Ok::<_, AppError>("redirect:/") }),
        get("/api/users")
            .name("api_get_users")
            .signature(Signature::new().optional("limit"))
            .handler(bind(ctx, api_get_users)),
        post("/api/users")
            .name("api_register_user")
            .signature(Signature::new().required("email").required("name").required("passwd"))
            .handler(bind(ctx, api_register_user)),
        post("/api/blogs")
            .name("api_create_blog")
            .signature(Signature::new().request().required("name").required("summary").required("content"))
            .handler(bind(ctx, api_create_blog)),
        post("/api/blogs/{id}/comments")
            .name("api_create_comment")
            .signature(Signature::new().positional("id").request().required("content"))
            .handler(bind(ctx, api_create_comment)),
        post("/api/blogs/{id}/delete")
            .name("api_delete_blog")
            .signature(Signature::new().positional("id"))
            .handler(bind(ctx, api_delete_blog)),
    ]
}

fn to_values(models: Vec<Model>) -> Value {
    Value::Array(models.into_iter().map(|m| Value::Object(m.into_values())).collect())
}

fn require_text<'a>(args: &'a CallArgs, name: &str) -> Result<&'a str, AppError> {
    match args.str(name).map(str::trim) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(ApiError::value_error(name, format!("{} cannot be empty.", name)).into()),
    }
}

async fn index(ctx: Ctx, _: CallArgs) -> Result<Reply, AppError> {
    let blogs = Model::find_all(&ctx.db, &ctx.models.blogs, Some(20)).await?;
    let mut vars = Map::new();
    vars.insert("blogs".into(), to_values(blogs));
    Ok(Reply::template("blogs.html", vars))
}

async fn get_blog(ctx: Ctx, args: CallArgs) -> Result<Reply, AppError> {
    let id = args.require("id")?.clone();
    let blog = Model::find(&ctx.db, &ctx.models.blogs, id.clone())
        .await?
        .ok_or_else(|| ApiError::resource_not_found("blog", "Blog not found."))?;
    let comments: Vec<Model> = Model::find_all(&ctx.db, &ctx.models.comments, None)
        .await?
        .into_iter()
        .filter(|c| c.get("blog_id") == Some(&id))
        .collect();
    if let Some(req) = args.request() {
        tracing::info!(path = %req.path(), comments = comments.len(), "render blog");
    }
    let mut vars = Map::new();
    vars.insert("blog".into(), Value::Object(blog.into_values()));
    vars.insert("comments".into(), to_values(comments));
    Ok(Reply::template("blog.html", vars))
}

async fn api_get_users(ctx: Ctx, args: CallArgs) -> Result<Reply, AppError> {
    let limit = args.str("limit").and_then(|l| l.parse().ok());
    let users: Vec<Model> = Model::find_all(&ctx.db, &ctx.models.users, limit)
        .await?
        .into_iter()
        .map(|u| u.with("passwd", MASKED))
        .collect();
    Ok(json!({ "users": to_values(users) }).into())
}

async fn api_register_user(ctx: Ctx, args: CallArgs) -> Result<Reply, AppError> {
    let name = require_text(&args, "name")?;
    let email = require_text(&args, "email")?.to_lowercase();
    if !email.contains('@') {
        return Err(ApiError::value_error("email", "Invalid email.").into());
    }
    let passwd = require_text(&args, "passwd")?;
    let mut user = Model::new(Arc::clone(&ctx.models.users))
        .with("name", name)
        .with("email", email)
        .with("passwd", passwd)
        .with("image", ANONYMOUS_IMAGE);
    user.save(&ctx.db).await?;
    user.set("passwd", MASKED);
    Ok(user.into())
}

/// Author identity comes from the `user` cookie, falling back to an anonymous author.
fn author(args: &CallArgs) -> (String, String) {
    let id = args
        .request()
        .and_then(|r| r.cookie("user"))
        .unwrap_or_else(|| "anonymous".to_string());
    let name = id.clone();
    (id, name)
}

async fn api_create_blog(ctx: Ctx, args: CallArgs) -> Result<Reply, AppError> {
    let name = require_text(&args, "name")?;
    let summary = require_text(&args, "summary")?;
    let content = require_text(&args, "content")?;
    let (user_id, user_name) = author(&args);
    let mut blog = Model::new(Arc::clone(&ctx.models.blogs))
        .with("user_id", user_id)
        .with("user_name", user_name)
        .with("user_image", ANONYMOUS_IMAGE)
        .with("name", name)
        .with("summary", summary)
        .with("content", content);
    blog.save(&ctx.db).await?;
    Ok(blog.into())
}

async fn api_create_comment(ctx: Ctx, args: CallArgs) -> Result<Reply, AppError> {
    let blog_id = args.require("id")?.clone();
    let content = require_text(&args, "content")?;
    if Model::find(&ctx.db, &ctx.models.blogs, blog_id.clone()).await?.is_none() {
        return Err(ApiError::resource_not_found("blog", "Blog not found.").into());
    }
    let (user_id, user_name) = author(&args);
    let mut comment = Model::new(Arc::clone(&ctx.models.comments))
        .with("blog_id", blog_id)
        .with("user_id", user_id)
        .with("user_name", user_name)
        .with("user_image", ANONYMOUS_IMAGE)
        .with("content", content);
    comment.save(&ctx.db).await?;
    Ok(comment.into())
}

async fn api_delete_blog(ctx: Ctx, args: CallArgs) -> Result<Reply, AppError> {
    let id = args.require("id")?.clone();
    let blog = Model::find(&ctx.db, &ctx.models.blogs, id.clone())
        .await?
        .ok_or_else(|| ApiError::resource_not_found("blog", "Blog not found."))?;
    blog.remove(&ctx.db).await?;
    Ok(json!({ "id": id }).into())
}
