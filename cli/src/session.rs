//! A scripted player session exercising every facade operation.

use std::future::IntoFuture;

use anyhow::{Context, Result};
use relay_sdk::login::ReserveLoginMessageOptions;
use relay_sdk::navigation::LegalPage;
use relay_sdk::notifications::{NotificationOptions, Priority};
use relay_sdk::referrals::OpenDialogOptions;
use relay_sdk::Sdk;

const LOGIN_REQUIRED: &str = "Login Required";
const REMINDER_ID: &str = "relay-session-reminder";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub products: usize,
    pub purchases_completed: usize,
    pub logged_in_during_session: bool,
    pub incomplete_after: usize,
}

pub async fn run(sdk: &Sdk) -> Result<SessionReport> {
    let mut report = SessionReport::default();

    sdk.init().await.context("initializing")?;
    sdk.is_ready().await.context("waiting for host")?;
    let player = sdk.player_id()?;
    let registered = sdk.is_registered()?;
    let launched_with = sdk.entry_payload()?.map_or(0, |payload| payload.len());
    tracing::info!(player = %player, registered, launched_with, "Session started");
    tracing::debug!(data = %sdk.player_data()?, "Player data");

    let products = sdk.get_products().await.context("listing products")?;
    report.products = products.len();
    let sku = products
        .first()
        .map_or_else(|| "gems_100".to_string(), |p| p.sku.clone());

    match sdk.get_feature_flag("new_shop").await? {
        Some(value) => tracing::info!(flag = "new_shop", value = %value, "Feature flag set"),
        None => tracing::info!(flag = "new_shop", "Feature flag undefined"),
    }

    let purchase = match sdk.begin_purchase(&sku).await {
        Ok(purchase) => purchase,
        Err(err) if err.foreign_message() == Some(LOGIN_REQUIRED) => {
            tracing::warn!(sku = %sku, "Purchase needs login; logging in and retrying");
            sdk.login(None)?;
            report.logged_in_during_session = true;
            sdk.begin_purchase(&sku).await.context("retrying purchase")?
        }
        Err(err) => return Err(err).context("beginning purchase"),
    };

    if let Some(token) = purchase.purchase_token.as_deref() {
        let done = sdk.complete_purchase(token).await?;
        if done.error.is_none() {
            report.purchases_completed += 1;
        }
    }
    report.incomplete_after = sdk.get_incomplete_purchases().await?.len();

    // Several calls in flight at once; each resolves against its own token.
    let (number, text, void) = tokio::join!(
        sdk.call_async_number("getCoins").into_future(),
        sdk.call_async_string("getNickname").into_future(),
        sdk.call_async_void("ping").into_future(),
    );
    let (coins, nickname) = (number?, text?);
    void?;
    tracing::info!(coins, nickname = %nickname, "Concurrent calls settled");

    sdk.open_referral_dialog(&OpenDialogOptions {
        reference: "session".to_string(),
        ..OpenDialogOptions::default()
    })
    .await?;
    let referrals = sdk.list_referrals().await?;
    tracing::info!(count = referrals.referrals.len(), "Referrals listed");

    let reserved = sdk
        .reserve_login_message(&ReserveLoginMessageOptions {
            message: "Your gems are waiting".to_string(),
            ..ReserveLoginMessageOptions::default()
        })?
        .await?;
    if let Some(reservation) = reserved.reservation {
        sdk.send_reserved_login_message(&reservation)?;
    }

    let visits = sdk.player_value_as::<u32>("visits")?.unwrap_or(0) + 1;
    sdk.set_player_value_as("visits", &visits)?;
    let signed = sdk.get_player_signed().await?;
    tracing::debug!(signed = %signed, "Signed player payload");

    // Replace any reminder left over from an earlier session.
    sdk.unschedule_notification(REMINDER_ID)?;
    sdk.schedule_notification(&NotificationOptions {
        identifier: REMINDER_ID.to_string(),
        plain_text: "Your gems are waiting".to_string(),
        body: format!("Come back, {player}"),
        cta_text: "Play".to_string(),
        priority: Priority::Medium,
        scheduled_at: "2030-01-01T09:00:00Z".to_string(),
        ..NotificationOptions::default()
    })?;

    sdk.flush().await.context("flushing")?;
    sdk.open_legal_page(LegalPage::PrivacyPolicy)?;
    sdk.redirect_to_explore_page()?;
    Ok(report)
}
