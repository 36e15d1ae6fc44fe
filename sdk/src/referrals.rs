//! Referral dialog and referral listing.

use std::collections::BTreeMap;

use relay_core::Deferred;
use serde::{Deserialize, Serialize};

use crate::Sdk;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenDialogOptions {
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_payload: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub share_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub onboarding_slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReferralInfo {
    pub reference: String,
    #[serde(default)]
    pub registrations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListReferralsResponse {
    pub referrals: Vec<ReferralInfo>,
    pub referrals_signed: String,
}

impl Sdk {
    pub fn open_referral_dialog(&self, options: &OpenDialogOptions) -> Deferred<()> {
        self.bridge.dispatch_json("openReferralDialog", options)
    }

    pub fn list_referrals(&self) -> Deferred<ListReferralsResponse> {
        self.call_json("listReferrals", "")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use relay_core::mock::{Reply, SyncSurface};

    use super::*;

    #[test]
    fn dialog_options_skip_unset_fields() {
        let surface = Arc::new(SyncSurface::new().reply("openReferralDialog", Reply::Void));
        let sdk = Sdk::with_surface(surface.clone());
        let options = OpenDialogOptions {
            reference: "spring".to_string(),
            share_title: Some("Join me".to_string()),
            ..OpenDialogOptions::default()
        };

        assert_eq!(sdk.open_referral_dialog(&options).result(), Ok(()));
        assert_eq!(
            surface.calls()[0].args,
            r#"{"reference":"spring","shareTitle":"Join me"}"#
        );
    }

    #[test]
    fn empty_referral_list_decodes() {
        let surface = Arc::new(SyncSurface::new().reply(
            "listReferrals",
            Reply::text(r#"{"referrals":[],"referralsSigned":""}"#),
        ));
        let sdk = Sdk::with_surface(surface);
        assert_eq!(
            sdk.list_referrals().result(),
            Ok(ListReferralsResponse::default())
        );
    }

    #[test]
    fn referrals_carry_registrations() {
        let surface = Arc::new(SyncSurface::new().reply(
            "listReferrals",
            Reply::text(
                r#"{"referrals":[{"reference":"spring","registrations":["p1","p2"]}],"referralsSigned":"sig"}"#,
            ),
        ));
        let response = Sdk::with_surface(surface).list_referrals().result().unwrap();
        assert_eq!(response.referrals_signed, "sig");
        assert_eq!(response.referrals[0].registrations, vec!["p1", "p2"]);
    }
}
