//! Leaving the current game: redirects, legal pages, and the debug login.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{Sdk, SdkError};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RedirectToGameOptions {
    pub game_slug: String,
    /// Readable by the target game through its entry payload.
    pub entry_payload: Option<Map<String, Value>>,
    pub skip_game_exit_confirm: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegalPage {
    PrivacyPolicy,
    TermsOfService,
    Copyright,
}

impl LegalPage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LegalPage::PrivacyPolicy => "privacy",
            LegalPage::TermsOfService => "terms",
            LegalPage::Copyright => "copyright",
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RedirectMessage<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_to_flagship: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    game_slug: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entry_payload: Option<String>,
    skip_game_exit_confirm: bool,
}

fn payload_string(payload: Option<&Map<String, Value>>) -> Result<Option<String>, SdkError> {
    payload
        .map(serde_json::to_string)
        .transpose()
        .map_err(|source| SdkError::Serialize {
            what: "entry payload",
            source,
        })
}

impl Sdk {
    pub fn redirect_to_game(&self, options: &RedirectToGameOptions) -> Result<(), SdkError> {
        let slug = options.game_slug.trim();
        if slug.is_empty() {
            return Err(SdkError::MissingArgument("game slug"));
        }
        self.send_redirect(&RedirectMessage {
            redirect_to_flagship: None,
            game_slug: Some(slug),
            entry_payload: payload_string(options.entry_payload.as_ref())?,
            skip_game_exit_confirm: options.skip_game_exit_confirm,
        })
    }

    /// Send the player from an onboarding game to its flagship game. The
    /// host ignores this for games that are not onboarding games.
    pub fn redirect_to_flagship_game(
        &self,
        entry_payload: Option<&Map<String, Value>>,
    ) -> Result<(), SdkError> {
        self.send_redirect(&RedirectMessage {
            redirect_to_flagship: Some(true),
            game_slug: None,
            entry_payload: payload_string(entry_payload)?,
            skip_game_exit_confirm: false,
        })
    }

    pub fn redirect_to_explore_page(&self) -> Result<(), SdkError> {
        self.bridge.invoke_sync("redirectToExplorePage", "")?;
        Ok(())
    }

    pub fn open_legal_page(&self, page: LegalPage) -> Result<(), SdkError> {
        self.bridge.invoke_sync("openLegalPage", page.as_str())?;
        Ok(())
    }

    /// Register the player without the login flow. Only meaningful on
    /// development hosts.
    pub fn debug_register(&self) -> Result<(), SdkError> {
        self.bridge.invoke_sync("debugRegister", "")?;
        Ok(())
    }

    fn send_redirect(&self, message: &RedirectMessage<'_>) -> Result<(), SdkError> {
        let args = serde_json::to_string(message).map_err(|source| SdkError::Serialize {
            what: "redirect options",
            source,
        })?;
        self.bridge.invoke_sync("redirectToGame", &args)?;
        Ok(())
    }
}
