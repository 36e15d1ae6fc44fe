//! Login messages and explicit login.

use std::collections::BTreeMap;

use relay_core::Deferred;
use serde::{Deserialize, Serialize};

use crate::{Sdk, SdkError};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveLoginMessageOptions {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_message: Option<CustomTextMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_message: Option<CustomTextMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_payload: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTextMessage {
    pub body: String,
    pub plain_text: String,
    pub cta_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReserveLoginMessageResponse {
    pub reservation: Option<LoginReservation>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginReservation {
    pub id: String,
    pub message: String,
}

impl Sdk {
    /// Reserve a login message for later sending.
    ///
    /// Options without a message are refused here and never reach the
    /// foreign side.
    pub fn reserve_login_message(
        &self,
        options: &ReserveLoginMessageOptions,
    ) -> Result<Deferred<ReserveLoginMessageResponse>, SdkError> {
        if options.message.is_empty() {
            return Err(SdkError::MissingArgument("message"));
        }
        let json = serde_json::to_string(options).map_err(|source| SdkError::Serialize {
            what: "login message options",
            source,
        })?;
        Ok(self.call_json("reserveLoginMessage", json))
    }

    pub fn send_reserved_login_message(
        &self,
        reservation: &LoginReservation,
    ) -> Result<(), SdkError> {
        let json = serde_json::to_string(reservation).map_err(|source| SdkError::Serialize {
            what: "login reservation",
            source,
        })?;
        self.bridge.invoke_sync("sendReservedLoginMessage", &json)?;
        Ok(())
    }

    /// Prompt the player to log in. `payload` is handed back to the game on
    /// the next launch.
    pub fn login(&self, payload: Option<&serde_json::Value>) -> Result<(), SdkError> {
        let json = match payload {
            Some(payload) => payload.to_string(),
            None => String::new(),
        };
        self.bridge.invoke_sync("login", &json)?;
        tracing::debug!("Login requested");
        Ok(())
    }
}
