//! Shared application state for the built-in routes and for handlers that capture it.

use crate::db::Database;
use crate::web::TemplateRenderer;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub templates: Arc<dyn TemplateRenderer>,
}

impl AppState {
    pub fn new(db: Database, templates: Arc<dyn TemplateRenderer>) -> Self {
        AppState { db, templates }
    }
}
