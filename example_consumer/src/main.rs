//! Blog demo on top of webstrate.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Needs a MySQL database initialised with `schema.sql`, or `DATABASE_URL` pointing elsewhere.

mod handlers;
mod models;

use handlers::Ctx;
use models::Models;
use std::path::Path;
use std::sync::Arc;
use webstrate::{build_app, init_pool, init_tracing, load_config, serve, AppState, RouteTable, Templates};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base = Path::new(env!("CARGO_MANIFEST_DIR"));
    let mut config = load_config(
        Some(base.join("config/default.toml").as_path()),
        Some(base.join("config/override.toml").as_path()),
    )?;
    init_tracing(&config.log_filter);
    tracing::info!(debug = config.debug, "configuration loaded");
    if Path::new(&config.templates.path).is_relative() {
        config.templates.path = base.join(&config.templates.path).display().to_string();
    }

    let db = init_pool(&config.database).await?;
    let ctx = Ctx {
        db: db.clone(),
        models: Models::new(db.dialect())?,
    };
    let mut routes = RouteTable::new();
    routes.add_routes(handlers::routes(&ctx))?;

    let templates = Arc::new(Templates::from_config(&config.templates));
    let app = build_app(AppState::new(db, templates), routes, &config.server)?;
    serve(app, &config.server).await?;
    Ok(())
}
