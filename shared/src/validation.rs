//! Validation utilities for the Harvest Hub platform

use chrono::NaiveDate;
use rust_decimal::Decimal;

// ============================================================================
// Account Validations
// ============================================================================

/// Validate email format
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if validator::validate_email(email) {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    if password.len() > 128 {
        return Err("Password must be at most 128 characters");
    }
    Ok(())
}

/// Validate username (3-30 lowercase letters, digits or underscores)
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.len() < 3 {
        return Err("Username must be at least 3 characters");
    }
    if username.len() > 30 {
        return Err("Username must be at most 30 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err("Username may only contain lowercase letters, digits and underscores");
    }
    Ok(())
}

/// Validate phone number
/// Accepts: 9876543210, 98765-43210, +91 98765 43210
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
    {
        return Err("Phone number contains invalid characters");
    }
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !(10..=15).contains(&digits) {
        return Err("Phone number must have 10 to 15 digits");
    }
    Ok(())
}

// ============================================================================
// Marketplace Validations
// ============================================================================

/// Quantities, prices and wages must be strictly positive
pub fn validate_positive_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than 0");
    }
    Ok(())
}

/// Largest tonnage a listing or order can carry (NUMERIC(12, 3))
pub fn max_quantity_tons() -> Decimal {
    Decimal::new(999_999_999_999, 3)
}

/// Largest price per ton (NUMERIC(12, 2))
pub fn max_price_per_ton() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// Largest daily wage (NUMERIC(10, 2))
pub fn max_wage() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

/// Largest order total (NUMERIC(16, 2))
pub fn max_total_amount() -> Decimal {
    Decimal::new(9_999_999_999_999_999, 2)
}

/// Tonnage must be positive and fit the stored precision
pub fn validate_quantity_tons(quantity: Decimal) -> Result<(), &'static str> {
    validate_positive_amount(quantity)?;
    if quantity > max_quantity_tons() {
        return Err("Quantity must be at most 999999999.999 tons");
    }
    Ok(())
}

/// Price per ton must be positive and fit the stored precision
pub fn validate_price_per_ton(price: Decimal) -> Result<(), &'static str> {
    validate_positive_amount(price)?;
    if price > max_price_per_ton() {
        return Err("Price must be at most 9999999999.99 per ton");
    }
    Ok(())
}

/// Daily wage must be positive and fit the stored precision
pub fn validate_wage(wage: Decimal) -> Result<(), &'static str> {
    validate_positive_amount(wage)?;
    if wage > max_wage() {
        return Err("Wage must be at most 99999999.99 per day");
    }
    Ok(())
}

/// Order totals must fit the stored precision
pub fn validate_total_amount(total: Decimal) -> Result<(), &'static str> {
    if total > max_total_amount() {
        return Err("Order total is too large");
    }
    Ok(())
}

/// An order cannot ask for more than the listing offers
pub fn validate_order_quantity(wanted: Decimal, available: Decimal) -> Result<(), &'static str> {
    validate_quantity_tons(wanted)?;
    if wanted > available {
        return Err("Quantity wanted exceeds the listed quantity");
    }
    Ok(())
}

// ============================================================================
// Contract and Schedule Validations
// ============================================================================

/// End date must not precede start date
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), &'static str> {
    if end < start {
        return Err("End date must not be before start date");
    }
    Ok(())
}

/// Grace period for answering a contract, in days
pub fn validate_grace_period(days: i32) -> Result<(), &'static str> {
    if !(1..=30).contains(&days) {
        return Err("Grace period must be between 1 and 30 days");
    }
    Ok(())
}

/// Contract duration in days
pub fn validate_duration(days: i32) -> Result<(), &'static str> {
    if !(1..=366).contains(&days) {
        return Err("Duration must be between 1 and 366 days");
    }
    Ok(())
}

/// Reject blank required text
pub fn validate_required(value: &str) -> Result<(), &'static str> {
    if value.trim().is_empty() {
        return Err("Value is required");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("farmer@example.com").is_ok());
        assert!(validate_email("hhm.manager@mill.co.in").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("sugarcane1").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("ravi_patil").is_ok());
        assert!(validate_username("hhm42").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("Ravi").is_err());
        assert!(validate_username("ravi-patil").is_err());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("+91 98765 43210").is_ok());
        assert!(validate_phone("98765-43210").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("98765abc10").is_err());
    }

    #[test]
    fn test_positive_amounts() {
        assert!(validate_positive_amount(Decimal::from_str("0.5").unwrap()).is_ok());
        assert!(validate_positive_amount(Decimal::ZERO).is_err());
        assert!(validate_positive_amount(Decimal::from(-3)).is_err());
    }

    #[test]
    fn test_order_quantity() {
        assert!(validate_order_quantity(Decimal::from(5), Decimal::from(10)).is_ok());
        assert!(validate_order_quantity(Decimal::from(10), Decimal::from(10)).is_ok());
        assert!(validate_order_quantity(Decimal::from(11), Decimal::from(10)).is_err());
        assert!(validate_order_quantity(Decimal::ZERO, Decimal::from(10)).is_err());
    }

    #[test]
    fn test_amount_upper_bounds() {
        assert!(validate_quantity_tons(max_quantity_tons()).is_ok());
        assert!(validate_quantity_tons(Decimal::new(1_000_000_000, 0)).is_err());
        assert!(validate_price_per_ton(Decimal::from(3100)).is_ok());
        assert!(validate_price_per_ton(Decimal::MAX).is_err());
        assert!(validate_wage(Decimal::from(650)).is_ok());
        assert!(validate_wage(Decimal::new(10_000_000_000, 2)).is_err());
        assert!(validate_total_amount(max_total_amount()).is_ok());
        assert!(validate_total_amount(max_total_amount() + Decimal::ONE).is_err());
        assert!(validate_order_quantity(Decimal::MAX, Decimal::MAX).is_err());
    }

    #[test]
    fn test_date_range() {
        let start = NaiveDate::from_ymd_opt(2026, 11, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 11, 30).unwrap();
        assert!(validate_date_range(start, end).is_ok());
        assert!(validate_date_range(start, start).is_ok());
        assert!(validate_date_range(end, start).is_err());
    }

    #[test]
    fn test_grace_period_and_duration() {
        assert!(validate_grace_period(3).is_ok());
        assert!(validate_grace_period(0).is_err());
        assert!(validate_grace_period(31).is_err());
        assert!(validate_duration(30).is_ok());
        assert!(validate_duration(0).is_err());
    }

    #[test]
    fn test_required() {
        assert!(validate_required("Co-86032").is_ok());
        assert!(validate_required("   ").is_err());
    }
}
