//! Scheduled rich notifications.
//!
//! Both calls are synchronous on the host: scheduling hands over the options
//! as JSON, unscheduling names the notification by its identifier.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::{Sdk, SdkError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    /// Key used to unschedule the notification later.
    pub identifier: String,
    pub plain_text: String,
    pub body: String,
    pub cta_text: String,
    /// Image URL or base64 data URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub priority: Priority,
    /// ISO 8601 timestamp.
    pub scheduled_at: String,
    /// Handed back to the game as its entry payload when the player taps
    /// through. Sent as a JSON string.
    #[serde(serialize_with = "as_json_string")]
    pub entry_payload: Map<String, Value>,
}

fn as_json_string<S: Serializer>(map: &Map<String, Value>, serializer: S) -> Result<S::Ok, S::Error> {
    let json = serde_json::to_string(map).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&json)
}

impl Sdk {
    pub fn schedule_notification(&self, options: &NotificationOptions) -> Result<(), SdkError> {
        let args = serde_json::to_string(options).map_err(|source| SdkError::Serialize {
            what: "notification options",
            source,
        })?;
        self.bridge.invoke_sync("scheduleNotificationV2", &args)?;
        tracing::debug!(identifier = %options.identifier, "Notification scheduled");
        Ok(())
    }

    pub fn unschedule_notification(&self, key: &str) -> Result<(), SdkError> {
        if key.trim().is_empty() {
            return Err(SdkError::MissingArgument("notification key"));
        }
        self.bridge.invoke_sync("unscheduleNotificationV2", key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use relay_core::mock::SyncSurface;

    use super::*;

    fn sdk() -> (Sdk, Arc<SyncSurface>) {
        let surface = Arc::new(
            SyncSurface::new()
                .value("scheduleNotificationV2", "")
                .value("unscheduleNotificationV2", ""),
        );
        (Sdk::with_surface(surface.clone()), surface)
    }

    #[test]
    fn options_are_sent_in_camel_case_with_stringified_payload() {
        let (sdk, surface) = sdk();
        let mut entry_payload = Map::new();
        entry_payload.insert("reward".to_string(), Value::from("gems"));
        let options = NotificationOptions {
            identifier: "daily-reward".to_string(),
            plain_text: "Your reward is ready".to_string(),
            body: "Come back and claim it".to_string(),
            cta_text: "Claim".to_string(),
            priority: Priority::High,
            scheduled_at: "2026-10-20T09:00:00Z".to_string(),
            entry_payload,
            ..NotificationOptions::default()
        };

        sdk.schedule_notification(&options).unwrap();

        let calls = surface.sync_calls();
        assert_eq!(calls[0].0, "scheduleNotificationV2");
        let sent: Value = serde_json::from_str(&calls[0].1).unwrap();
        assert_eq!(
            sent,
            serde_json::json!({
                "identifier": "daily-reward",
                "plainText": "Your reward is ready",
                "body": "Come back and claim it",
                "ctaText": "Claim",
                "priority": "high",
                "scheduledAt": "2026-10-20T09:00:00Z",
                "entryPayload": r#"{"reward":"gems"}"#,
            })
        );
    }

    #[test]
    fn unschedule_passes_key_through() {
        let (sdk, surface) = sdk();
        sdk.unschedule_notification("daily-reward").unwrap();
        assert_eq!(
            surface.sync_calls(),
            vec![("unscheduleNotificationV2".to_string(), "daily-reward".to_string())]
        );
    }

    #[test]
    fn blank_key_is_refused_before_reaching_host() {
        let (sdk, surface) = sdk();
        assert!(matches!(
            sdk.unschedule_notification("  "),
            Err(SdkError::MissingArgument("notification key"))
        ));
        assert!(surface.sync_calls().is_empty());
    }
}
