//! Webstrate: a small web application substrate.
//!
//! Handlers are registered on a [`RouteTable`] with an explicit [`Signature`]; the
//! dispatcher binds request data to them and normalizes whatever they return. Models are
//! declared with [`ModelDescriptor::builder`] and persisted through a pooled [`Database`].

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod orm;
pub mod routes;
pub mod sql;
pub mod state;
pub mod web;

pub use app::{build_app, init_tracing, serve};
pub use config::{load_config, AppConfig, DatabaseConfig, ServerConfig, TemplateConfig, WritePolicy};
pub use db::{init_pool, Database, Row};
pub use error::{ApiError, AppError, ConfigError, RegistrationError};
pub use orm::{next_id, now_timestamp, Field, Model, ModelDescriptor};
pub use routes::common_routes;
pub use sql::Dialect;
pub use state::AppState;
pub use web::{get, post, CallArgs, Handler, Reply, RequestContext, RouteDef, RouteTable, Signature, Templates};
