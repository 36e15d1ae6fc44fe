use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{Sdk, SdkError};

impl Sdk {
    pub fn player_id(&self) -> Result<String, SdkError> {
        Ok(self.bridge.invoke_sync("getPlayerId", "")?)
    }

    pub fn is_registered(&self) -> Result<bool, SdkError> {
        let raw = self.bridge.invoke_sync("getIsRegistered", "")?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" | "" => Ok(false),
            _ => Err(SdkError::InvalidResponse {
                what: "registration flag",
                reason: format!("'{raw}' is not true/false"),
            }),
        }
    }

    /// Opaque player data blob kept by the foreign side.
    pub fn player_data(&self) -> Result<String, SdkError> {
        Ok(self.bridge.invoke_sync("getPlayerData", "")?)
    }

    /// Data the game was launched with, or `None` when there is none.
    pub fn entry_payload(&self) -> Result<Option<Map<String, Value>>, SdkError> {
        let raw = self.bridge.invoke_sync("getEntryPayload", "")?;
        if raw.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| SdkError::InvalidResponse {
                what: "entry payload",
                reason: e.to_string(),
            })
    }

    /// Stored value for `key`, or `None` if unset.
    pub fn player_value(&self, key: &str) -> Result<Option<String>, SdkError> {
        let value = self.bridge.invoke_sync("getPlayerValue", key)?;
        Ok((!value.is_empty()).then_some(value))
    }

    /// Stored value for `key`, decoded from JSON.
    pub fn player_value_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SdkError> {
        self.player_value(key)?
            .map(|raw| {
                serde_json::from_str(&raw).map_err(|e| SdkError::InvalidResponse {
                    what: "player value",
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    pub fn set_player_value(&self, key: &str, value: &str) -> Result<(), SdkError> {
        let args = serde_json::json!({ "key": key, "value": value }).to_string();
        self.bridge.invoke_sync("setPlayerValue", &args)?;
        Ok(())
    }

    /// Store `value` under `key` as JSON.
    pub fn set_player_value_as<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), SdkError> {
        let json = serde_json::to_string(value).map_err(|source| SdkError::Serialize {
            what: "player value",
            source,
        })?;
        self.set_player_value(key, &json)
    }

    pub fn delete_player_value(&self, key: &str) -> Result<(), SdkError> {
        self.bridge.invoke_sync("deletePlayerValue", key)?;
        Ok(())
    }
}
