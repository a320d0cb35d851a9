//! Buy orders placed against listings

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::workflow::WorkflowStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Accepted,
    Rejected,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "accepted" => Ok(OrderStatus::Accepted),
            "rejected" => Ok(OrderStatus::Rejected),
            other => Err(format!("Unknown order status: {}", other)),
        }
    }
}

impl WorkflowStatus for OrderStatus {
    const KIND: &'static str = "order";

    fn pending() -> Self {
        OrderStatus::Pending
    }

    fn accepted() -> Self {
        OrderStatus::Accepted
    }

    fn rejected() -> Self {
        OrderStatus::Rejected
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Normal => "normal",
            Urgency::High => "high",
        }
    }
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Urgency::Low),
            "normal" | "medium" => Ok(Urgency::Normal),
            "high" | "urgent" => Ok(Urgency::High),
            other => Err(format!("Unknown urgency: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub quantity_wanted: Decimal,
    pub proposed_price: Decimal,
    pub delivery_location: String,
    pub message: Option<String>,
    #[serde(default)]
    pub urgency: Urgency,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: Uuid,
    pub listing_id: Uuid,
    /// Seller
    pub farmer_id: Uuid,
    pub buyer_id: Uuid,
    pub order_details: OrderDetails,
    pub status: OrderStatus,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Proposed price is per ton
pub fn order_total_amount(
    quantity_wanted: Decimal,
    proposed_price: Decimal,
) -> Result<Decimal, &'static str> {
    quantity_wanted
        .checked_mul(proposed_price)
        .ok_or("Order total is too large")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_amount() {
        assert_eq!(
            order_total_amount(Decimal::new(55, 1), Decimal::from(3200)),
            Ok(Decimal::from(17600))
        );
    }

    #[test]
    fn total_amount_overflow_is_an_error() {
        assert!(order_total_amount(Decimal::from(10), Decimal::MAX).is_err());
    }

    #[test]
    fn urgency_defaults_to_normal() {
        let details: OrderDetails = serde_json::from_value(serde_json::json!({
            "quantityWanted": "5",
            "proposedPrice": "3000",
            "deliveryLocation": "Kolhapur mill gate",
            "message": null,
            "totalAmount": "15000"
        }))
        .unwrap();
        assert_eq!(details.urgency, Urgency::Normal);
    }
}
