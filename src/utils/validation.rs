//! Checks the UI runs before handing input to the session.

use crate::error::ValidationError;
use crate::models::connection::ConnectionConfig;
use crate::models::message::ContentType;

pub fn validate_config(config: &ConnectionConfig) -> Result<(), ValidationError> {
    if config.url.trim().is_empty() {
        return Err(ValidationError::MissingUrl);
    }
    if config.subscription_url.trim().is_empty() {
        return Err(ValidationError::MissingSubscriptionUrl);
    }
    Ok(())
}

pub fn validate_outgoing(destination: &str, content: &str, content_type: ContentType) -> Result<(), ValidationError> {
    if destination.trim().is_empty() {
        return Err(ValidationError::MissingDestination);
    }
    if content.is_empty() {
        return Err(ValidationError::MissingContent);
    }
    if content_type == ContentType::Json {
        serde_json::from_str::<serde_json::Value>(content)?;
    }
    Ok(())
}

/// Re-indent a JSON payload with two spaces.
pub fn format_json(content: &str) -> Result<String, ValidationError> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    Ok(serde_json::to_string_pretty(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_requires_url_and_subscription() {
        let missing_url = ConnectionConfig::new(" ", "/topic/a");
        let missing_sub = ConnectionConfig::new("ws://localhost/ws", "");

        assert!(matches!(validate_config(&missing_url), Err(ValidationError::MissingUrl)));
        assert!(matches!(
            validate_config(&missing_sub),
            Err(ValidationError::MissingSubscriptionUrl)
        ));
        assert!(validate_config(&ConnectionConfig::new("ws://localhost/ws", "/topic/a")).is_ok());
    }

    #[test]
    fn outgoing_json_must_parse() {
        assert!(matches!(
            validate_outgoing("/queue/a", "{not json", ContentType::Json),
            Err(ValidationError::InvalidJson(_))
        ));
        assert!(validate_outgoing("/queue/a", "{not json", ContentType::Text).is_ok());
        assert!(validate_outgoing("/queue/a", r#"{"ok":true}"#, ContentType::Json).is_ok());
    }

    #[test]
    fn outgoing_requires_destination_and_content() {
        assert!(matches!(
            validate_outgoing("", "x", ContentType::Text),
            Err(ValidationError::MissingDestination)
        ));
        assert!(matches!(
            validate_outgoing("/queue/a", "", ContentType::Text),
            Err(ValidationError::MissingContent)
        ));
    }

    #[test]
    fn format_json_pretty_prints_or_rejects() {
        assert_eq!(format_json(r#"[1,2]"#).unwrap(), "[\n  1,\n  2\n]");
        assert!(format_json("nope").is_err());
    }
}
