//! Marketplace listings

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Active,
    Sold,
    Reserved,
    Inactive,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Sold => "sold",
            ListingStatus::Reserved => "reserved",
            ListingStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ListingStatus::Active),
            "sold" => Ok(ListingStatus::Sold),
            "reserved" => Ok(ListingStatus::Reserved),
            "inactive" => Ok(ListingStatus::Inactive),
            other => Err(format!("Unknown listing status: {}", other)),
        }
    }
}

/// A farmer's offer of a sugarcane quantity for sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub farmer_id: Uuid,
    pub title: String,
    pub crop_variety: String,
    pub quantity_in_tons: Decimal,
    pub expected_price_per_ton: Decimal,
    pub harvest_availability_date: NaiveDate,
    pub location: String,
    pub status: ListingStatus,
    pub description: Option<String>,
    /// Always `quantity_in_tons * expected_price_per_ton`
    pub total_value: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn listing_total_value(
    quantity_in_tons: Decimal,
    expected_price_per_ton: Decimal,
) -> Result<Decimal, &'static str> {
    quantity_in_tons
        .checked_mul(expected_price_per_ton)
        .ok_or("Listing value is too large")
}

impl Listing {
    /// Recompute the derived value after the quantity or price changed
    pub fn refresh_total_value(&mut self) -> Result<(), &'static str> {
        self.total_value = listing_total_value(self.quantity_in_tons, self.expected_price_per_ton)?;
        Ok(())
    }

    pub fn is_open_for_orders(&self) -> bool {
        self.status == ListingStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn total_value_is_quantity_times_price() {
        let q = Decimal::from_str("12.5").unwrap();
        let p = Decimal::from(3150);
        assert_eq!(listing_total_value(q, p), Ok(Decimal::from(39375)));
    }

    #[test]
    fn total_value_overflow_is_an_error() {
        assert!(listing_total_value(Decimal::MAX, Decimal::from(2)).is_err());
    }

    #[test]
    fn refresh_after_edit() {
        let now = Utc::now();
        let mut listing = Listing {
            id: Uuid::new_v4(),
            farmer_id: Uuid::new_v4(),
            title: "Co-86032 ratoon".to_string(),
            crop_variety: "Co-86032".to_string(),
            quantity_in_tons: Decimal::from(10),
            expected_price_per_ton: Decimal::from(3000),
            harvest_availability_date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
            location: "Satara".to_string(),
            status: ListingStatus::Active,
            description: None,
            total_value: Decimal::from(30000),
            created_at: now,
            updated_at: now,
        };
        listing.quantity_in_tons = Decimal::from(20);
        listing.refresh_total_value().unwrap();
        assert_eq!(listing.total_value, Decimal::from(60000));
        assert!(listing.is_open_for_orders());

        listing.status = ListingStatus::Reserved;
        assert!(!listing.is_open_for_orders());
    }
}
