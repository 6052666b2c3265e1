//! Model descriptors: ordered field mappings compiled into statement templates.
//!
//! A descriptor is built once per table from an explicit, ordered list of field
//! declarations and is immutable afterwards. Templates use the portable `?` marker.

use crate::error::RegistrationError;
use crate::orm::field::Field;
use crate::sql::{placeholders, Dialect};

#[derive(Debug)]
pub struct ModelDescriptor {
    table: String,
    dialect: Dialect,
    mappings: Vec<(String, Field)>,
    primary_key: String,
    fields: Vec<String>,
    select_sql: String,
    insert_sql: String,
    update_sql: String,
    delete_sql: String,
    find_sql: String,
}

pub struct ModelBuilder {
    table: String,
    dialect: Dialect,
    mappings: Vec<(String, Field)>,
}

impl ModelDescriptor {
    pub fn builder(table: impl Into<String>) -> ModelBuilder {
        ModelBuilder {
            table: table.into(),
            dialect: Dialect::default(),
            mappings: Vec::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Attribute name of the primary key.
    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Non-key attribute names in declaration order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn mappings(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.mappings.iter().map(|(k, f)| (k.as_str(), f))
    }

    pub fn field(&self, attr: &str) -> Option<&Field> {
        self.mappings.iter().find(|(k, _)| k == attr).map(|(_, f)| f)
    }

    /// Column name for an attribute: the field's name override, else the attribute itself.
    pub fn column_name<'a>(&'a self, attr: &'a str) -> &'a str {
        self.field(attr).and_then(Field::name).unwrap_or(attr)
    }

    /// Attribute for a result column.
    pub fn attribute_for_column<'a>(&'a self, column: &'a str) -> &'a str {
        self.mappings
            .iter()
            .find(|(k, f)| f.name().unwrap_or(k.as_str()) == column)
            .map(|(k, _)| k.as_str())
            .unwrap_or(column)
    }

    pub fn select_sql(&self) -> &str {
        &self.select_sql
    }

    pub fn insert_sql(&self) -> &str {
        &self.insert_sql
    }

    pub fn update_sql(&self) -> &str {
        &self.update_sql
    }

    pub fn delete_sql(&self) -> &str {
        &self.delete_sql
    }

    /// Select template restricted to one primary key.
    pub fn find_sql(&self) -> &str {
        &self.find_sql
    }
}

impl ModelBuilder {
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn field(mut self, attr: impl Into<String>, field: Field) -> Self {
        self.mappings.push((attr.into(), field));
        self
    }

    pub fn build(self) -> Result<ModelDescriptor, RegistrationError> {
        let ModelBuilder { table, dialect, mappings } = self;
        tracing::info!("found model: {}", table);

        let mut primary_key: Option<String> = None;
        let mut fields = Vec::new();
        for (i, (attr, field)) in mappings.iter().enumerate() {
            if mappings[..i].iter().any(|(k, _)| k == attr) {
                return Err(RegistrationError::DuplicateField {
                    table,
                    field: attr.clone(),
                });
            }
            tracing::debug!("  found mapping: {} ==> {}", attr, field);
            if field.is_primary_key() {
                if primary_key.is_some() {
                    return Err(RegistrationError::DuplicatePrimaryKey {
                        table,
                        field: attr.clone(),
                    });
                }
                primary_key = Some(attr.clone());
            } else {
                fields.push(attr.clone());
            }
        }
        let primary_key = primary_key.ok_or_else(|| RegistrationError::MissingPrimaryKey(table.clone()))?;

        let column = |attr: &str| -> String {
            let name = mappings
                .iter()
                .find(|(k, _)| k == attr)
                .and_then(|(_, f)| f.name())
                .unwrap_or(attr);
            dialect.quote(name)
        };
        let q_table = dialect.quote(&table);
        let q_pk = column(&primary_key);
        let q_fields: Vec<String> = fields.iter().map(|f| column(f)).collect();

        let select_sql = if q_fields.is_empty() {
            format!("select {} from {}", q_pk, q_table)
        } else {
            format!("select {}, {} from {}", q_pk, q_fields.join(", "), q_table)
        };
        let insert_columns: Vec<&str> = q_fields.iter().map(String::as_str).chain([q_pk.as_str()]).collect();
        let insert_sql = format!(
            "insert into {} ({}) values ({})",
            q_table,
            insert_columns.join(", "),
            placeholders(q_fields.len() + 1)
        );
        let set_clause = if q_fields.is_empty() {
            format!("{}=?", q_pk)
        } else {
            q_fields.iter().map(|f| format!("{}=?", f)).collect::<Vec<_>>().join(", ")
        };
        let update_sql = format!("update {} set {} where {}=?", q_table, set_clause, q_pk);
        let delete_sql = format!("delete from {} where {}=?", q_table, q_pk);
        let find_sql = format!("{} where {}=?", select_sql, q_pk);

        Ok(ModelDescriptor {
            table,
            dialect,
            mappings,
            primary_key,
            fields,
            select_sql,
            insert_sql,
            update_sql,
            delete_sql,
            find_sql,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orm::field::next_id;

    fn users() -> ModelDescriptor {
        ModelDescriptor::builder("users")
            .field("id", Field::string().primary_key().default_with(next_id).ddl("varchar(50)"))
            .field("email", Field::string().ddl("varchar(50)"))
            .field("admin", Field::boolean())
            .field("created_at", Field::float())
            .build()
            .unwrap()
    }

    #[test]
    fn templates_match_canonical_shape() {
        let m = users();
        assert_eq!(m.select_sql(), "select `id`, `email`, `admin`, `created_at` from `users`");
        assert_eq!(
            m.insert_sql(),
            "insert into `users` (`email`, `admin`, `created_at`, `id`) values (?, ?, ?, ?)"
        );
        assert_eq!(
            m.update_sql(),
            "update `users` set `email`=?, `admin`=?, `created_at`=? where `id`=?"
        );
        assert_eq!(m.delete_sql(), "delete from `users` where `id`=?");
        assert_eq!(
            m.find_sql(),
            "select `id`, `email`, `admin`, `created_at` from `users` where `id`=?"
        );
    }

    #[test]
    fn templates_are_deterministic() {
        let a = users();
        let b = users();
        assert_eq!(a.select_sql(), b.select_sql());
        assert_eq!(a.insert_sql(), b.insert_sql());
        assert_eq!(a.update_sql(), b.update_sql());
        assert_eq!(a.delete_sql(), b.delete_sql());
    }

    #[test]
    fn primary_key_and_fields_split() {
        let m = users();
        assert_eq!(m.primary_key(), "id");
        assert_eq!(m.fields(), ["email", "admin", "created_at"]);
        assert_eq!(m.mappings().count(), 4);
    }

    #[test]
    fn missing_primary_key_fails() {
        let err = ModelDescriptor::builder("t").field("a", Field::string()).build().unwrap_err();
        assert!(matches!(err, RegistrationError::MissingPrimaryKey(t) if t == "t"));
    }

    #[test]
    fn two_primary_keys_fail() {
        let err = ModelDescriptor::builder("t")
            .field("a", Field::string().primary_key())
            .field("b", Field::integer().primary_key())
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicatePrimaryKey { field, .. } if field == "b"));
    }

    #[test]
    fn duplicate_attribute_fails() {
        let err = ModelDescriptor::builder("t")
            .field("a", Field::string().primary_key())
            .field("a", Field::text())
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateField { .. }));
    }

    #[test]
    fn name_override_used_as_column() {
        let m = ModelDescriptor::builder("posts")
            .field("id", Field::integer().primary_key())
            .field("title", Field::string().named("post_title"))
            .build()
            .unwrap();
        assert_eq!(m.select_sql(), "select `id`, `post_title` from `posts`");
        assert_eq!(m.update_sql(), "update `posts` set `post_title`=? where `id`=?");
        assert_eq!(m.column_name("title"), "post_title");
        assert_eq!(m.attribute_for_column("post_title"), "title");
        assert_eq!(m.attribute_for_column("id"), "id");
    }

    #[test]
    fn key_only_model_is_well_formed() {
        let m = ModelDescriptor::builder("tags")
            .field("id", Field::string().primary_key())
            .build()
            .unwrap();
        assert_eq!(m.select_sql(), "select `id` from `tags`");
        assert_eq!(m.insert_sql(), "insert into `tags` (`id`) values (?)");
    }

    #[test]
    fn postgres_dialect_quotes_differently() {
        let m = ModelDescriptor::builder("users")
            .dialect(Dialect::Postgres)
            .field("id", Field::integer().primary_key())
            .field("name", Field::string())
            .build()
            .unwrap();
        assert_eq!(m.delete_sql(), "delete from \"users\" where \"id\"=?");
        assert_eq!(m.dialect(), Dialect::Postgres);
    }
}
