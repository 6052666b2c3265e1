//! Persistence operations over the precomputed statement templates.

use crate::db::{check_affected, Database};
use crate::error::AppError;
use crate::orm::instance::Model;
use crate::orm::model::ModelDescriptor;
use serde_json::Value;
use std::sync::Arc;

/// Templates are quoted for one dialect; running them on another backend is refused.
fn check_dialect(db: &Database, descriptor: &ModelDescriptor) -> Result<(), AppError> {
    if descriptor.dialect() == db.dialect() {
        return Ok(());
    }
    Err(AppError::DialectMismatch {
        table: descriptor.table().to_string(),
        model: descriptor.dialect(),
        database: db.dialect(),
    })
}

impl Model {
    /// Find by primary key.
    pub async fn find(db: &Database, descriptor: &Arc<ModelDescriptor>, pk: impl Into<Value>) -> Result<Option<Model>, AppError> {
        check_dialect(db, descriptor)?;
        let rows = db.select(descriptor.find_sql(), &[pk.into()], Some(1)).await?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| Model::from_row(Arc::clone(descriptor), row)))
    }

    /// Every row of the table, optionally capped at `limit`.
    pub async fn find_all(db: &Database, descriptor: &Arc<ModelDescriptor>, limit: Option<usize>) -> Result<Vec<Model>, AppError> {
        check_dialect(db, descriptor)?;
        let rows = db.select(descriptor.select_sql(), &[], limit).await?;
        Ok(rows
            .into_iter()
            .map(|row| Model::from_row(Arc::clone(descriptor), row))
            .collect())
    }

    /// Insert this instance. Defaults are resolved and kept on the instance.
    pub async fn save(&mut self, db: &Database) -> Result<(), AppError> {
        check_dialect(db, self.descriptor())?;
        let args = self.insert_args()?;
        let rows = db.execute(self.descriptor().insert_sql(), &args).await?;
        check_affected(db.write_policy(), "insert", self.descriptor().table(), rows)
    }

    pub async fn update(&self, db: &Database) -> Result<(), AppError> {
        check_dialect(db, self.descriptor())?;
        let args = self.update_args();
        let rows = db.execute(self.descriptor().update_sql(), &args).await?;
        check_affected(db.write_policy(), "update", self.descriptor().table(), rows)
    }

    pub async fn remove(&self, db: &Database) -> Result<(), AppError> {
        check_dialect(db, self.descriptor())?;
        let args = [self.primary_key_value()];
        let rows = db.execute(self.descriptor().delete_sql(), &args).await?;
        check_affected(db.write_policy(), "remove", self.descriptor().table(), rows)
    }
}
