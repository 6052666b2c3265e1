//! minijinja-backed template rendering.

use crate::config::TemplateConfig;
use crate::error::AppError;
use crate::web::reply::TemplateRenderer;
use chrono::DateTime;
use minijinja::{path_loader, AutoEscape, Environment};
use serde_json::{Map, Value};

pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Environment without a loader; templates are added by hand.
    pub fn new(autoescape: bool) -> Self {
        let mut env = Environment::new();
        env.set_auto_escape_callback(move |_| if autoescape { AutoEscape::Html } else { AutoEscape::None });
        env.add_filter("datetime", datetime_filter);
        Templates { env }
    }

    /// Environment loading templates from the configured directory on first use.
    pub fn from_config(config: &TemplateConfig) -> Self {
        tracing::info!(path = %config.path, autoescape = config.autoescape, "init templates");
        let mut templates = Self::new(config.autoescape);
        templates.env.set_loader(path_loader(&config.path));
        templates
    }

    pub fn add_template(&mut self, name: impl Into<String>, source: impl Into<String>) -> Result<(), AppError> {
        self.env.add_template_owned(name.into(), source.into())?;
        Ok(())
    }
}

impl TemplateRenderer for Templates {
    fn render(&self, name: &str, vars: &Map<String, Value>) -> Result<String, AppError> {
        let tmpl = self.env.get_template(name)?;
        Ok(tmpl.render(vars)?)
    }
}

fn datetime_filter(t: f64) -> String {
    let now = chrono::Utc::now().timestamp_millis() as f64 / 1000.0;
    humanize_elapsed(now, t)
}

/// Relative age of UNIX timestamp `t` as seen at `now`; older than a week renders the date.
pub fn humanize_elapsed(now: f64, t: f64) -> String {
    let delta = (now - t) as i64;
    match delta {
        d if d < 60 => "1 minute ago".to_string(),
        d if d < 3600 => format!("{} minutes ago", d / 60),
        d if d < 86400 => format!("{} hours ago", d / 3600),
        d if d < 604800 => format!("{} days ago", d / 86400),
        _ => DateTime::from_timestamp(t as i64, 0)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn elapsed_buckets() {
        let now = 1_700_000_000.0;
        assert_eq!(humanize_elapsed(now, now - 5.0), "1 minute ago");
        assert_eq!(humanize_elapsed(now, now - 150.0), "2 minutes ago");
        assert_eq!(humanize_elapsed(now, now - 7200.0), "2 hours ago");
        assert_eq!(humanize_elapsed(now, now - 3.0 * 86400.0), "3 days ago");
        assert_eq!(humanize_elapsed(now, 0.0), "1970-01-01");
    }

    #[test]
    fn renders_with_mapping_and_escapes() {
        let mut t = Templates::new(true);
        t.add_template("hello.html", "<p>{{ name }}</p>").unwrap();
        let vars = json!({"name": "<b>"}).as_object().cloned().unwrap();
        assert_eq!(t.render("hello.html", &vars).unwrap(), "<p>&lt;b&gt;</p>");
    }

    #[test]
    fn datetime_filter_is_registered() {
        let mut t = Templates::new(false);
        t.add_template("age.html", "{{ created_at|datetime }}").unwrap();
        let vars = json!({"created_at": 0.0}).as_object().cloned().unwrap();
        assert_eq!(t.render("age.html", &vars).unwrap(), "1970-01-01");
    }

    #[test]
    fn missing_template_is_an_error() {
        let t = Templates::new(true);
        assert!(matches!(t.render("nope.html", &Map::new()), Err(AppError::Template(_))));
    }
}
