//! Marketplace listing service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{like_pattern, listing_total_value, Listing, ListingStatus, UserRole};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use super::parse_stored;

/// Listing service for farmer produce listings
#[derive(Clone)]
pub struct ListingService {
    db: PgPool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateListingInput {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    #[validate(length(min = 1, max = 100, message = "Crop variety is required"))]
    pub crop_variety: String,
    pub quantity_in_tons: Decimal,
    pub expected_price_per_ton: Decimal,
    pub harvest_availability_date: NaiveDate,
    #[validate(length(min = 1, max = 200, message = "Location is required"))]
    pub location: String,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateListingInput {
    #[validate(length(min = 1, max = 200, message = "Title must not be empty"))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Crop variety must not be empty"))]
    pub crop_variety: Option<String>,
    pub quantity_in_tons: Option<Decimal>,
    pub expected_price_per_ton: Option<Decimal>,
    pub harvest_availability_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 200, message = "Location must not be empty"))]
    pub location: Option<String>,
    pub description: Option<String>,
    pub status: Option<ListingStatus>,
}

/// Browse filters; status defaults to active
#[derive(Debug, Default, Deserialize)]
pub struct ListingFilter {
    pub status: Option<ListingStatus>,
    pub location: Option<String>,
    pub crop_variety: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

#[derive(Debug, FromRow)]
struct ListingRow {
    id: Uuid,
    farmer_id: Uuid,
    title: String,
    crop_variety: String,
    quantity_in_tons: Decimal,
    expected_price_per_ton: Decimal,
    harvest_availability_date: NaiveDate,
    location: String,
    status: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = AppError;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        Ok(Listing {
            id: row.id,
            farmer_id: row.farmer_id,
            title: row.title,
            crop_variety: row.crop_variety,
            total_value: listing_total_value(row.quantity_in_tons, row.expected_price_per_ton)
                .map_err(|msg| AppError::Internal(format!("listing {}: {}", row.id, msg)))?,
            quantity_in_tons: row.quantity_in_tons,
            expected_price_per_ton: row.expected_price_per_ton,
            harvest_availability_date: row.harvest_availability_date,
            location: row.location,
            status: parse_stored::<ListingStatus>(&row.status)?,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const LISTING_COLUMNS: &str = "id, farmer_id, title, crop_variety, quantity_in_tons, \
                               expected_price_per_ton, harvest_availability_date, location, \
                               status, description, created_at, updated_at";

fn check_amounts(quantity: Option<Decimal>, price: Option<Decimal>) -> AppResult<()> {
    if let Some(q) = quantity {
        shared::validate_quantity_tons(q)
            .map_err(|msg| AppError::validation("quantity_in_tons", msg))?;
    }
    if let Some(p) = price {
        shared::validate_price_per_ton(p)
            .map_err(|msg| AppError::validation("expected_price_per_ton", msg))?;
    }
    Ok(())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ListingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Public browse of listings
    pub async fn browse(&self, filter: &ListingFilter) -> AppResult<Vec<Listing>> {
        if let (Some(min), Some(max)) = (filter.min_price, filter.max_price) {
            if min > max {
                return Err(AppError::validation("min_price", "min_price must not exceed max_price"));
            }
        }

        let status = filter.status.unwrap_or_default();
        let location = filter.location.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(like_pattern);
        let crop_variety = filter
            .crop_variety
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(like_pattern);

        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            SELECT {}
            FROM listings
            WHERE status = $1
              AND ($2::text IS NULL OR location ILIKE $2 ESCAPE '\')
              AND ($3::text IS NULL OR crop_variety ILIKE $3 ESCAPE '\')
              AND ($4::numeric IS NULL OR expected_price_per_ton >= $4)
              AND ($5::numeric IS NULL OR expected_price_per_ton <= $5)
            ORDER BY created_at DESC
            "#,
            LISTING_COLUMNS
        ))
        .bind(status.as_str())
        .bind(&location)
        .bind(&crop_variety)
        .bind(filter.min_price)
        .bind(filter.max_price)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Listing::try_from).collect()
    }

    /// All of a farmer's listings, including inactive ones
    pub async fn mine(&self, farmer: &AuthUser) -> AppResult<Vec<Listing>> {
        farmer.require_role(&[UserRole::Farmer])?;

        let rows = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {} FROM listings WHERE farmer_id = $1 ORDER BY created_at DESC",
            LISTING_COLUMNS
        ))
        .bind(farmer.user_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Listing::try_from).collect()
    }

    pub async fn create(&self, farmer: &AuthUser, input: CreateListingInput) -> AppResult<Listing> {
        farmer.require_role(&[UserRole::Farmer])?;
        input.validate()?;
        check_amounts(Some(input.quantity_in_tons), Some(input.expected_price_per_ton))?;

        let row = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            INSERT INTO listings (id, farmer_id, title, crop_variety, quantity_in_tons,
                                  expected_price_per_ton, harvest_availability_date, location,
                                  status, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'active', $9)
            RETURNING {}
            "#,
            LISTING_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(farmer.user_id)
        .bind(input.title.trim())
        .bind(input.crop_variety.trim())
        .bind(input.quantity_in_tons)
        .bind(input.expected_price_per_ton)
        .bind(input.harvest_availability_date)
        .bind(input.location.trim())
        .bind(trimmed(input.description))
        .fetch_one(&self.db)
        .await?;

        let listing = Listing::try_from(row)?;
        tracing::info!(listing_id = %listing.id, farmer_id = %farmer.user_id, "Listing created");
        Ok(listing)
    }

    pub async fn get(&self, listing_id: Uuid) -> AppResult<Listing> {
        let row = sqlx::query_as::<_, ListingRow>(&format!(
            "SELECT {} FROM listings WHERE id = $1",
            LISTING_COLUMNS
        ))
        .bind(listing_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Listing".to_string()))?;

        Listing::try_from(row)
    }

    async fn get_owned(&self, farmer: &AuthUser, listing_id: Uuid) -> AppResult<Listing> {
        let listing = self.get(listing_id).await?;
        if listing.farmer_id != farmer.user_id {
            return Err(AppError::Forbidden("Not the owner of this listing".to_string()));
        }
        Ok(listing)
    }

    /// Owner updates a listing; omitted fields keep their values
    pub async fn update(
        &self,
        farmer: &AuthUser,
        listing_id: Uuid,
        input: UpdateListingInput,
    ) -> AppResult<Listing> {
        input.validate()?;
        check_amounts(input.quantity_in_tons, input.expected_price_per_ton)?;

        let existing = self.get_owned(farmer, listing_id).await?;

        let row = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            UPDATE listings
            SET title = $2, crop_variety = $3, quantity_in_tons = $4, expected_price_per_ton = $5,
                harvest_availability_date = $6, location = $7, description = $8, status = $9,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            LISTING_COLUMNS
        ))
        .bind(listing_id)
        .bind(input.title.map(|t| t.trim().to_string()).unwrap_or(existing.title))
        .bind(input.crop_variety.map(|c| c.trim().to_string()).unwrap_or(existing.crop_variety))
        .bind(input.quantity_in_tons.unwrap_or(existing.quantity_in_tons))
        .bind(input.expected_price_per_ton.unwrap_or(existing.expected_price_per_ton))
        .bind(input.harvest_availability_date.unwrap_or(existing.harvest_availability_date))
        .bind(input.location.map(|l| l.trim().to_string()).unwrap_or(existing.location))
        .bind(match input.description {
            Some(d) => trimmed(Some(d)),
            None => existing.description,
        })
        .bind(input.status.unwrap_or(existing.status).as_str())
        .fetch_one(&self.db)
        .await?;

        tracing::debug!(listing_id = %listing_id, "Listing updated");
        Listing::try_from(row)
    }

    /// Soft delete: the listing is kept as inactive
    pub async fn deactivate(&self, farmer: &AuthUser, listing_id: Uuid) -> AppResult<Listing> {
        self.get_owned(farmer, listing_id).await?;

        let row = sqlx::query_as::<_, ListingRow>(&format!(
            r#"
            UPDATE listings SET status = 'inactive', updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            LISTING_COLUMNS
        ))
        .bind(listing_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(listing_id = %listing_id, "Listing deactivated");
        Listing::try_from(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn row(quantity: &str, price: &str) -> ListingRow {
        ListingRow {
            id: Uuid::new_v4(),
            farmer_id: Uuid::new_v4(),
            title: "Co-86032 ratoon".to_string(),
            crop_variety: "Co-86032".to_string(),
            quantity_in_tons: Decimal::from_str(quantity).unwrap(),
            expected_price_per_ton: Decimal::from_str(price).unwrap(),
            harvest_availability_date: NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(),
            location: "Kolhapur".to_string(),
            status: "active".to_string(),
            description: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn amounts_past_column_precision_are_rejected() {
        assert!(check_amounts(Some(Decimal::from(40)), Some(Decimal::from(3100))).is_ok());
        assert!(matches!(
            check_amounts(Some(Decimal::MAX), None),
            Err(AppError::Validation { field, .. }) if field == "quantity_in_tons"
        ));
        assert!(matches!(
            check_amounts(None, Some(Decimal::from_str("10000000000").unwrap())),
            Err(AppError::Validation { field, .. }) if field == "expected_price_per_ton"
        ));
    }

    #[test]
    fn row_conversion_computes_total_value() {
        let listing = Listing::try_from(row("40.5", "3100")).unwrap();
        assert_eq!(listing.total_value, Decimal::from_str("125550").unwrap());
        assert_eq!(listing.status, ListingStatus::Active);
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        assert!(check_amounts(Some(Decimal::ZERO), None).is_err());
        assert!(check_amounts(None, Some(Decimal::from(-1))).is_err());
        assert!(check_amounts(Some(Decimal::ONE), Some(Decimal::ONE)).is_ok());
        assert!(check_amounts(None, None).is_ok());
    }

    #[test]
    fn filter_parses_prices_from_strings() {
        let filter: ListingFilter = serde_json::from_value(serde_json::json!({
            "min_price": "2500",
            "status": "reserved"
        }))
        .unwrap();
        assert_eq!(filter.min_price, Some(Decimal::from(2500)));
        assert_eq!(filter.status, Some(ListingStatus::Reserved));
    }

    #[test]
    fn blank_description_becomes_none() {
        assert_eq!(trimmed(Some("   ".to_string())), None);
        assert_eq!(trimmed(Some(" fresh ".to_string())), Some("fresh".to_string()));
    }
}
