use crate::error::NotificationError;
use anyhow::Context;
use handlebars::Handlebars;
use serde::Serialize;

pub const DEFAULT_SUBJECT: &str = "ALERT: {{name}} is not updating!";
pub const DEFAULT_BODY: &str = "The most recent activity at {{source}} is {{age}} old \
(maximum allowed age: {{max_age}}).\nLatest activity: {{latest}}.\n\
There could be a problem with the upstream processing.";

const SUBJECT: &str = "subject";
const BODY: &str = "body";

/// A rendered alert, ready for a notification sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

/// Values available to alert templates.
#[derive(Debug, Clone, Serialize)]
pub struct AlertContext {
    pub name: String,
    pub source: String,
    pub age: String,
    pub max_age: String,
    pub latest: String,
}

/// Subject and body templates of one check, compiled up front so that
/// malformed copy is rejected while loading configuration.
pub struct AlertTemplate {
    registry: Handlebars<'static>,
}

impl std::fmt::Debug for AlertTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertTemplate").finish_non_exhaustive()
    }
}

impl AlertTemplate {
    pub fn new(subject: &str, body: &str) -> anyhow::Result<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(true);
        registry
            .register_template_string(SUBJECT, subject)
            .context("registering alert subject template")?;
        registry
            .register_template_string(BODY, body)
            .context("registering alert body template")?;
        Ok(Self { registry })
    }

    pub fn render(&self, context: &AlertContext) -> Result<AlertMessage, NotificationError> {
        let render = |name: &str| {
            self.registry
                .render(name, context)
                .map_err(|e| NotificationError::Template(e.to_string()))
        };
        Ok(AlertMessage {
            subject: render(SUBJECT)?.trim().to_string(),
            body: render(BODY)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> AlertContext {
        AlertContext {
            name: "l0-tx".to_string(),
            source: "/data/aws-l0/tx".to_string(),
            age: "1h 30m".to_string(),
            max_age: "1h".to_string(),
            latest: "2023-01-16 10:32 UTC".to_string(),
        }
    }

    #[test]
    fn test_static_copy_is_passed_through() {
        let template = AlertTemplate::new(
            "ALERT: aws-l0/tx files are not updating!",
            "The most recently updated file at aws-l0/tx is >1 hr old.",
        )
        .unwrap();
        let message = template.render(&context()).unwrap();
        assert_eq!(message.subject, "ALERT: aws-l0/tx files are not updating!");
        assert_eq!(
            message.body,
            "The most recently updated file at aws-l0/tx is >1 hr old."
        );
    }

    #[test]
    fn test_default_template_interpolates() {
        let template = AlertTemplate::new(DEFAULT_SUBJECT, DEFAULT_BODY).unwrap();
        let message = template.render(&context()).unwrap();
        assert_eq!(message.subject, "ALERT: l0-tx is not updating!");
        assert!(message.body.contains("/data/aws-l0/tx is 1h 30m old"));
        assert!(message.body.contains("maximum allowed age: 1h"));
    }

    #[test]
    fn test_no_html_escaping() {
        let template = AlertTemplate::new("{{name}} <stale>", "age > {{max_age}}").unwrap();
        let message = template.render(&context()).unwrap();
        assert_eq!(message.subject, "l0-tx <stale>");
        assert_eq!(message.body, "age > 1h");
    }

    #[test]
    fn test_malformed_template_is_rejected() {
        assert!(AlertTemplate::new("{{#if name}}", "body").is_err());
    }

    #[test]
    fn test_unknown_variable_fails_render() {
        let template = AlertTemplate::new("{{nonexistent}}", "body").unwrap();
        assert!(matches!(
            template.render(&context()),
            Err(NotificationError::Template(_))
        ));
    }
}
