//! A stand-in for the remote host: answers every call after a fixed delay,
//! from a tokio task, the way a real foreign environment calls back later on
//! some other thread.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use relay_config::DemoConfig;
use relay_core::mock::Reply;
use relay_core::{ForeignCall, ForeignSurface, SurfaceError};
use serde_json::json;
use tokio::runtime::Handle;

const LOGIN_REQUIRED: &str = "Login Required";

struct PlayerState {
    registered: bool,
    values: HashMap<String, String>,
    /// Purchase token -> sku, for purchases begun but not completed.
    incomplete: Vec<(String, String)>,
    next_purchase: u64,
    notifications: BTreeSet<String>,
}

pub struct SimulatedSurface {
    runtime: Handle,
    latency: Duration,
    player_id: String,
    products_json: String,
    state: Mutex<PlayerState>,
}

impl SimulatedSurface {
    pub fn new(runtime: Handle, demo: &DemoConfig) -> Self {
        let products_json = serde_json::to_string(&demo.products).unwrap_or_else(|e| {
            tracing::warn!("Could not encode demo products: {e}");
            "[]".to_string()
        });
        Self {
            runtime,
            latency: Duration::from_millis(demo.latency_ms),
            player_id: demo.player_id.clone(),
            products_json,
            state: Mutex::new(PlayerState {
                registered: demo.registered,
                values: HashMap::new(),
                incomplete: Vec::new(),
                next_purchase: 1,
                notifications: BTreeSet::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, PlayerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Identifiers of the notifications currently scheduled.
    pub fn scheduled_notifications(&self) -> Vec<String> {
        self.state().notifications.iter().cloned().collect()
    }

    fn answer(&self, operation: &str, args: &str) -> Option<Reply> {
        let reply = match operation {
            "initSdk" | "flush" | "callAsyncVoid" => Reply::Void,
            "callAsyncString" => Reply::text(""),
            "callAsyncNumber" => Reply::Number(0.0),
            "openReferralDialog" => {
                tracing::info!(options = args, "Referral dialog opened");
                Reply::Void
            }
            "getProducts" => Reply::text(self.products_json.clone()),
            "beginPurchase" => self.begin_purchase(args),
            "completePurchase" => self.complete_purchase(args),
            "getIncompletePurchases" => self.incomplete_purchases(),
            "listReferrals" => Reply::text(r#"{"referrals":[],"referralsSigned":""}"#),
            "getPlayerSigned" => {
                let registered = self.state().registered;
                Reply::text(
                    json!({
                        "player": { "playerId": self.player_id, "registered": registered },
                        "playerSigned": "mock_signed_data",
                    })
                    .to_string(),
                )
            }
            // Undefined flag.
            "getFeatureFlag" => Reply::text(""),
            "reserveLoginMessage" => Reply::text(
                r#"{"reservation":{"id":"mock-reservation-id","message":"mock-message"}}"#,
            ),
            _ => return None,
        };
        Some(reply)
    }

    fn begin_purchase(&self, sku: &str) -> Reply {
        let mut state = self.state();
        if !state.registered {
            return Reply::error(LOGIN_REQUIRED);
        }
        let token = format!("purchase-{}", state.next_purchase);
        state.next_purchase += 1;
        state.incomplete.push((token.clone(), sku.to_string()));
        Reply::text(json!({ "result": "success", "purchaseToken": token }).to_string())
    }

    fn complete_purchase(&self, token: &str) -> Reply {
        let mut state = self.state();
        let before = state.incomplete.len();
        state.incomplete.retain(|(pending, _)| pending != token);
        let body = if state.incomplete.len() < before {
            json!({ "result": "success" })
        } else {
            json!({ "result": "error", "error": "unknown purchase token" })
        };
        Reply::text(body.to_string())
    }

    fn incomplete_purchases(&self) -> Reply {
        let state = self.state();
        if !state.registered {
            return Reply::error(LOGIN_REQUIRED);
        }
        let purchases: Vec<_> = state
            .incomplete
            .iter()
            .map(|(token, sku)| {
                json!({
                    "productSku": sku,
                    "purchaseToken": token,
                    "timestamp": 0,
                    "platform": "simulated",
                })
            })
            .collect();
        Reply::text(json!({ "hasMore": false, "purchases": purchases }).to_string())
    }
}

fn invalid(operation: &str, reason: impl Into<String>) -> SurfaceError {
    SurfaceError::InvalidArguments {
        operation: operation.to_string(),
        reason: reason.into(),
    }
}

fn parse_args(operation: &str, args: &str) -> Result<serde_json::Value, SurfaceError> {
    serde_json::from_str(args).map_err(|e| invalid(operation, e.to_string()))
}

impl ForeignSurface for SimulatedSurface {
    fn name(&self) -> &str {
        "simulated"
    }

    fn invoke(&self, call: ForeignCall) -> Result<(), SurfaceError> {
        let reply = self
            .answer(call.operation(), call.args())
            .ok_or_else(|| SurfaceError::UnknownOperation(call.operation().to_string()))?;

        let latency = self.latency;
        self.runtime.spawn(async move {
            tokio::time::sleep(latency).await;
            let token = call.token();
            if let Err(e) = reply.deliver(call) {
                tracing::warn!(token = %token, "Simulated callback failed: {e}");
            }
        });
        Ok(())
    }

    fn invoke_sync(&self, operation: &str, args: &str) -> Result<String, SurfaceError> {
        let mut state = self.state();
        match operation {
            "getPlayerId" => Ok(self.player_id.clone()),
            "getIsRegistered" => Ok(state.registered.to_string()),
            "getPlayerData" => Ok(self.player_id.clone()),
            // Launched directly, not from a redirect or notification.
            "getEntryPayload" => Ok(String::new()),
            "getPlayerValue" => Ok(state.values.get(args).cloned().unwrap_or_default()),
            "setPlayerValue" => {
                let entry = parse_args(operation, args)?;
                let (Some(key), Some(value)) = (entry["key"].as_str(), entry["value"].as_str())
                else {
                    return Err(invalid(operation, "expected string key and value"));
                };
                state.values.insert(key.to_string(), value.to_string());
                Ok(String::new())
            }
            "deletePlayerValue" => {
                state.values.remove(args);
                Ok(String::new())
            }
            "scheduleNotificationV2" => {
                let options = parse_args(operation, args)?;
                let Some(identifier) = options["identifier"].as_str() else {
                    return Err(invalid(operation, "expected string identifier"));
                };
                tracing::info!(identifier, "Notification scheduled");
                state.notifications.insert(identifier.to_string());
                Ok(String::new())
            }
            "unscheduleNotificationV2" => {
                state.notifications.remove(args);
                Ok(String::new())
            }
            "redirectToGame" => {
                parse_args(operation, args)?;
                tracing::info!(options = args, "Redirect to game");
                Ok(String::new())
            }
            "redirectToExplorePage" => {
                tracing::info!("Redirect to explore page");
                Ok(String::new())
            }
            "openLegalPage" => {
                tracing::info!(page = args, "Legal page opened");
                Ok(String::new())
            }
            "login" | "debugRegister" => {
                state.registered = true;
                tracing::info!("Player logged in");
                Ok(String::new())
            }
            "sendReservedLoginMessage" => {
                tracing::info!(reservation = args, "Reserved login message sent");
                Ok(String::new())
            }
            _ => Err(SurfaceError::UnknownOperation(operation.to_string())),
        }
    }
}
