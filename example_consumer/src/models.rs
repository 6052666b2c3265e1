//! Users, blogs and comments.

use std::sync::Arc;
use webstrate::{next_id, now_timestamp, Dialect, Field, ModelDescriptor, RegistrationError};

fn id_field() -> Field {
    Field::string().ddl("varchar(50)").primary_key().default_with(next_id)
}

fn created_at() -> Field {
    Field::float().default_with(now_timestamp)
}

fn short(len: u32) -> Field {
    Field::string().ddl(format!("varchar({})", len))
}

pub fn user(dialect: Dialect) -> Result<ModelDescriptor, RegistrationError> {
    ModelDescriptor::builder("users")
        .dialect(dialect)
        .field("id", id_field())
        .field("email", short(50))
        .field("passwd", short(50))
        .field("admin", Field::boolean())
        .field("name", short(50))
        .field("image", short(500))
        .field("created_at", created_at())
        .build()
}

pub fn blog(dialect: Dialect) -> Result<ModelDescriptor, RegistrationError> {
    ModelDescriptor::builder("blogs")
        .dialect(dialect)
        .field("id", id_field())
        .field("user_id", short(50))
        .field("user_name", short(50))
        .field("user_image", short(500))
        .field("name", short(50))
        .field("summary", short(200))
        .field("content", Field::text())
        .field("created_at", created_at())
        .build()
}

pub fn comment(dialect: Dialect) -> Result<ModelDescriptor, RegistrationError> {
    ModelDescriptor::builder("comments")
        .dialect(dialect)
        .field("id", id_field())
        .field("blog_id", short(50))
        .field("user_id", short(50))
        .field("user_name", short(50))
        .field("user_image", short(500))
        .field("content", Field::text())
        .field("created_at", created_at())
        .build()
}

#[derive(Clone, Debug)]
pub struct Models {
    pub users: Arc<ModelDescriptor>,
    pub blogs: Arc<ModelDescriptor>,
    pub comments: Arc<ModelDescriptor>,
}

impl Models {
    pub fn new(dialect: Dialect) -> Result<Self, RegistrationError> {
        Ok(Models {
            users: Arc::new(user(dialect)?),
            blogs: Arc::new(blog(dialect)?),
            comments: Arc::new(comment(dialect)?),
        })
    }
}
