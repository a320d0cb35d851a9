//! Property-based tests for listings and orders
//!
//! Properties covered:
//! - Listing total value is always quantity times price per ton
//! - Order total amount is always quantity wanted times proposed price
//! - An order may ask for any positive quantity up to the listed quantity
//! - Only active listings accept orders
//! - Amounts past the stored precision are rejected instead of overflowing

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    listing_total_value, max_price_per_ton, max_quantity_tons, max_total_amount, order_total_amount,
    validate_order_quantity, validate_positive_amount, validate_price_per_ton, validate_quantity_tons,
    validate_total_amount, Listing, ListingStatus,
};
use uuid::Uuid;

// ============================================================================
// Strategies
// ============================================================================

/// Tons with up to two decimal places
fn tons_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..500_000).prop_map(|cents| Decimal::new(cents, 2))
}

/// Rupees per ton with up to two decimal places
fn price_strategy() -> impl Strategy<Value = Decimal> {
    (100i64..1_000_000).prop_map(|paise| Decimal::new(paise, 2))
}

fn listing_status_strategy() -> impl Strategy<Value = ListingStatus> {
    prop_oneof![
        Just(ListingStatus::Active),
        Just(ListingStatus::Sold),
        Just(ListingStatus::Reserved),
        Just(ListingStatus::Inactive),
    ]
}

fn listing(quantity: Decimal, price: Decimal, status: ListingStatus) -> Listing {
    let now = Utc::now();
    let mut listing = Listing {
        id: Uuid::new_v4(),
        farmer_id: Uuid::new_v4(),
        title: "Co-86032 ready for crushing".to_string(),
        crop_variety: "Co-86032".to_string(),
        quantity_in_tons: quantity,
        expected_price_per_ton: price,
        harvest_availability_date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
        location: "Kolhapur".to_string(),
        status,
        description: None,
        total_value: Decimal::ZERO,
        created_at: now,
        updated_at: now,
    };
    listing.refresh_total_value().unwrap();
    listing
}

// ============================================================================
// Property-Based Tests
// ============================================================================

proptest! {
    /// totalValue = quantityInTons * expectedPricePerTon after every refresh
    #[test]
    fn prop_listing_total_value(quantity in tons_strategy(), price in price_strategy()) {
        let listing = listing(quantity, price, ListingStatus::Active);
        prop_assert_eq!(listing.total_value, quantity * price);
        prop_assert_eq!(Ok(listing.total_value), listing_total_value(quantity, price));
    }

    /// Updating quantity or price and refreshing keeps the value derived
    #[test]
    fn prop_listing_value_follows_update(
        quantity in tons_strategy(),
        price in price_strategy(),
        new_quantity in tons_strategy(),
        new_price in price_strategy(),
    ) {
        let mut listing = listing(quantity, price, ListingStatus::Active);
        listing.quantity_in_tons = new_quantity;
        listing.expected_price_per_ton = new_price;
        listing.refresh_total_value().unwrap();
        prop_assert_eq!(listing.total_value, new_quantity * new_price);
    }

    /// Order total is linear in quantity
    #[test]
    fn prop_order_total(quantity in tons_strategy(), price in price_strategy()) {
        let total = order_total_amount(quantity, price).unwrap();
        prop_assert_eq!(total, quantity * price);
        prop_assert!(total > Decimal::ZERO);
        prop_assert_eq!(order_total_amount(quantity + quantity, price), Ok(total + total));
    }

    /// Any quantity and price that pass validation multiply without overflow
    #[test]
    fn prop_bounded_amounts_never_overflow(
        tons in 1i64..=999_999_999_999,
        paise in 1i64..=999_999_999_999,
    ) {
        let quantity = Decimal::new(tons, 3);
        let price = Decimal::new(paise, 2);
        prop_assert!(validate_quantity_tons(quantity).is_ok());
        prop_assert!(validate_price_per_ton(price).is_ok());
        prop_assert!(listing_total_value(quantity, price).is_ok());
        prop_assert!(order_total_amount(quantity, price).is_ok());
    }

    /// Prices above the column precision are rejected however large they get
    #[test]
    fn prop_oversized_price_rejected(extra in 1i64..i64::MAX) {
        let price = max_price_per_ton() + Decimal::new(extra, 2);
        prop_assert!(validate_price_per_ton(price).is_err());
    }

    /// Any positive quantity up to the listed one is accepted
    #[test]
    fn prop_order_quantity_within_listing(available in tons_strategy(), share in 1u32..=100) {
        let wanted = (available * Decimal::from(share) / Decimal::from(100)).round_dp(2);
        prop_assume!(wanted > Decimal::ZERO);
        prop_assert!(validate_order_quantity(wanted, available).is_ok());
    }

    /// Asking for more than the listing offers is rejected
    #[test]
    fn prop_order_quantity_over_listing(available in tons_strategy(), extra in tons_strategy()) {
        prop_assert!(validate_order_quantity(available + extra, available).is_err());
    }

    /// Zero and negative amounts are rejected
    #[test]
    fn prop_non_positive_amounts(amount in -1_000_000i64..=0) {
        prop_assert!(validate_positive_amount(Decimal::new(amount, 2)).is_err());
    }

    /// Only active listings are open for orders
    #[test]
    fn prop_only_active_listings_take_orders(status in listing_status_strategy()) {
        let listing = listing(Decimal::from(10), Decimal::from(3000), status);
        prop_assert_eq!(listing.is_open_for_orders(), status == ListingStatus::Active);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_listing_example_values() {
        let listing = listing(
            Decimal::from_str("12.5").unwrap(),
            Decimal::from(3000),
            ListingStatus::Active,
        );
        assert_eq!(listing.total_value, Decimal::from(37500));
    }

    #[test]
    fn test_order_for_whole_listing() {
        let available = Decimal::from(40);
        assert!(validate_order_quantity(available, available).is_ok());
        assert_eq!(
            order_total_amount(available, Decimal::from_str("2950.50").unwrap()),
            Ok(Decimal::from(118_020))
        );
    }

    #[test]
    fn test_decimal_max_does_not_panic() {
        assert!(listing_total_value(Decimal::MAX, Decimal::from(3000)).is_err());
        assert!(order_total_amount(Decimal::from(5), Decimal::MAX).is_err());
        assert!(validate_price_per_ton(Decimal::MAX).is_err());
        assert!(validate_quantity_tons(Decimal::MAX).is_err());

        let mut listing = listing(Decimal::from(10), Decimal::from(3000), ListingStatus::Active);
        listing.expected_price_per_ton = Decimal::MAX;
        assert!(listing.refresh_total_value().is_err());
    }

    #[test]
    fn test_order_total_checked_against_column() {
        let total = order_total_amount(max_quantity_tons(), max_price_per_ton()).unwrap();
        assert!(total > max_total_amount());
        assert!(validate_total_amount(total).is_err());
        assert!(validate_total_amount(Decimal::from(118_020)).is_ok());
    }

    #[test]
    fn test_listing_status_serialization() {
        assert_eq!(serde_json::to_string(&ListingStatus::Reserved).unwrap(), "\"reserved\"");
        assert_eq!(ListingStatus::from_str("inactive").unwrap(), ListingStatus::Inactive);
        assert!(ListingStatus::from_str("deleted").is_err());
    }
}
