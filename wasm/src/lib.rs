//! WebAssembly module for the Harvest Hub browser client
//!
//! Provides client-side computation for:
//! - Listing and order totals
//! - Directory filtering over already-fetched users
//! - Workflow status checks (can this record still be answered?)
//! - Contract deadline checks
//! - User-facing messages for API error statuses

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::{
    ApplicationStatus, ContractStatus, DirectoryFilter, InvitationStatus, OrderStatus, User,
    WorkflowStatus,
};
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&JsValue::from_str(&format!(
        "harvest-hub-wasm {} loaded",
        version()
    )));
}

/// Crate version, for cache busting on the client
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn parse_amount(value: &str, field: &str) -> Result<Decimal, String> {
    Decimal::from_str(value.trim()).map_err(|e| format!("Invalid {}: {}", field, e))
}

/// Listing total value as a decimal string
#[wasm_bindgen]
pub fn calculate_listing_total(quantity_in_tons: &str, price_per_ton: &str) -> Result<String, JsValue> {
    let quantity = parse_amount(quantity_in_tons, "quantity").map_err(|e| JsValue::from_str(&e))?;
    let price = parse_amount(price_per_ton, "price").map_err(|e| JsValue::from_str(&e))?;
    listing_total_value(quantity, price)
        .map(|total| total.to_string())
        .map_err(JsValue::from_str)
}

/// Order total amount as a decimal string
#[wasm_bindgen]
pub fn calculate_order_total(quantity_wanted: &str, proposed_price: &str) -> Result<String, JsValue> {
    let quantity = parse_amount(quantity_wanted, "quantity").map_err(|e| JsValue::from_str(&e))?;
    let price = parse_amount(proposed_price, "price").map_err(|e| JsValue::from_str(&e))?;
    order_total_amount(quantity, price)
        .map(|total| total.to_string())
        .map_err(JsValue::from_str)
}

/// Message shown to the user for an API error status
#[wasm_bindgen]
pub fn describe_http_error(status: u16) -> String {
    match status {
        400 => "Please check the highlighted fields and try again.",
        401 => "Your session has expired. Please log in again.",
        403 => "Your role does not allow this action.",
        404 => "The requested item was not found.",
        409 => "A request between you and this party is already pending or accepted.",
        422 => "This request has already been answered.",
        429 => "This invitation was resent recently. Please wait before resending.",
        500..=599 => "Something went wrong on our side. Please try again later.",
        _ => "Unexpected error. Please try again.",
    }
    .to_string()
}

/// Whether a record of `kind` in `status` can still be accepted or rejected
#[wasm_bindgen]
pub fn can_respond(kind: &str, status: &str) -> bool {
    fn pending<S: WorkflowStatus + FromStr>(status: &str) -> bool {
        S::from_str(status).map(|s| s.is_pending()).unwrap_or(false)
    }

    match kind {
        "invitation" => pending::<InvitationStatus>(status),
        "contract" => pending::<ContractStatus>(status),
        "order" => pending::<OrderStatus>(status),
        "application" => pending::<ApplicationStatus>(status),
        _ => false,
    }
}

/// Whether a pending contract is past its response deadline
///
/// Timestamps are JavaScript epoch milliseconds.
#[wasm_bindgen]
pub fn contract_is_overdue(status: &str, created_at_ms: f64, grace_period_days: i32, now_ms: f64) -> bool {
    let (Ok(status), Some(created_at), Some(now)) = (
        ContractStatus::from_str(status),
        from_millis(created_at_ms),
        from_millis(now_ms),
    ) else {
        return false;
    };
    shared::is_overdue(status, created_at, grace_period_days, now)
}

/// Same as [`contract_is_overdue`] against the browser clock
#[wasm_bindgen]
pub fn contract_is_overdue_now(status: &str, created_at_ms: f64, grace_period_days: i32) -> bool {
    contract_is_overdue(status, created_at_ms, grace_period_days, js_sys::Date::now())
}

/// Response deadline in epoch milliseconds
#[wasm_bindgen]
pub fn contract_deadline_ms(created_at_ms: f64, grace_period_days: i32) -> f64 {
    match from_millis(created_at_ms) {
        Some(created_at) => shared::response_deadline(created_at, grace_period_days).timestamp_millis() as f64,
        None => created_at_ms,
    }
}

fn from_millis(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(ms as i64)
}

/// Filter a JSON array of users the same way the directory endpoint does
#[wasm_bindgen]
pub fn filter_directory(
    users_json: &str,
    location: Option<String>,
    search: Option<String>,
    skill: Option<String>,
) -> Result<String, JsValue> {
    let users: Vec<User> = serde_json::from_str(users_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid users JSON: {}", e)))?;

    let filter = DirectoryFilter {
        location,
        search,
        skill,
    };
    let matched = filter.apply(&users);

    serde_json::to_string(&matched).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Validate signup fields before submitting; returns the first problem found
#[wasm_bindgen]
pub fn check_signup_fields(username: &str, email: &str, password: &str, phone: Option<String>) -> Option<String> {
    let result = validate_username(username)
        .and_then(|_| validate_email(email))
        .and_then(|_| validate_password(password))
        .and_then(|_| phone.as_deref().map_or(Ok(()), validate_phone));
    result.err().map(str::to_string)
}


#[cfg(all(test, target_arch = "wasm32"))]
mod browser_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn overdue_against_browser_clock() {
        let now = js_sys::Date::now();
        let day_ms = 86_400_000.0;
        assert!(contract_is_overdue_now("farmer_pending", now - 5.0 * day_ms, 3));
        assert!(!contract_is_overdue_now("farmer_pending", now - day_ms, 3));
    }

    #[wasm_bindgen_test]
    fn oversized_totals_are_rejected() {
        let huge = Decimal::MAX.to_string();
        assert!(calculate_listing_total(&huge, "2").is_err());
        assert!(calculate_order_total("10", &huge).is_err());
    }
}
