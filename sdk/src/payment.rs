//! In-app purchases.

use relay_core::Deferred;
use serde::{Deserialize, Serialize};

use crate::Sdk;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PurchaseResult {
    pub result: Option<String>,
    pub error: Option<String>,
    pub purchase_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PurchaseCompleteResult {
    pub result: Option<String>,
    pub error: Option<String>,
}

/// A purchase that was paid for but never completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncompletePurchase {
    pub product_sku: String,
    pub purchase_token: String,
    pub timestamp: i64,
    #[serde(default)]
    pub platform: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IncompletePurchasesResponse {
    pub has_more: bool,
    pub purchases: Vec<IncompletePurchase>,
}

impl Sdk {
    pub fn get_products(&self) -> Deferred<Vec<Product>> {
        self.call_json("getProducts", "")
    }

    /// Start a purchase. Fails with the foreign message (e.g. "Login
    /// Required") when the player cannot buy.
    pub fn begin_purchase(&self, sku: &str) -> Deferred<PurchaseResult> {
        self.call_json("beginPurchase", sku)
    }

    pub fn complete_purchase(&self, purchase_token: &str) -> Deferred<PurchaseCompleteResult> {
        self.call_json("completePurchase", purchase_token)
    }

    pub fn get_incomplete_purchases(&self) -> Deferred<Vec<IncompletePurchase>> {
        self.call_json::<IncompletePurchasesResponse>("getIncompletePurchases", "")
            .then(|result| result.map(|response| response.purchases))
    }
}
