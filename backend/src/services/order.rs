//! Order service for buy requests against listings
//!
//! Buyers (any role but farmer) place orders on active listings. The selling
//! farmer accepts or rejects each order once; an accepted order reserves the
//! listing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    answer, order_total_amount, Decision, NotificationKind, Order, OrderDetails, OrderStatus,
    Urgency, UserRole, WorkflowStatus,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use super::listing::ListingService;
use super::notification::{EntityRef, NewNotification, NotificationService};
use super::user::UserService;
use super::parse_stored;

/// Order service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
    listings: ListingService,
    users: UserService,
    notifications: NotificationService,
}

/// Order terms as submitted by the buyer
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailsInput {
    pub quantity_wanted: Decimal,
    /// Per ton; defaults to the listing's expected price
    pub proposed_price: Option<Decimal>,
    pub delivery_location: String,
    pub message: Option<String>,
    #[serde(default)]
    pub urgency: Urgency,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderInput {
    pub listing_id: Uuid,
    pub order_details: OrderDetailsInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondOrderInput {
    #[serde(alias = "status")]
    pub decision: Decision,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    listing_id: Uuid,
    farmer_id: Uuid,
    buyer_id: Uuid,
    quantity_wanted: Decimal,
    proposed_price: Decimal,
    delivery_location: String,
    message: Option<String>,
    urgency: String,
    total_amount: Decimal,
    status: String,
    responded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            order_id: row.id,
            listing_id: row.listing_id,
            farmer_id: row.farmer_id,
            buyer_id: row.buyer_id,
            order_details: OrderDetails {
                quantity_wanted: row.quantity_wanted,
                proposed_price: row.proposed_price,
                delivery_location: row.delivery_location,
                message: row.message,
                urgency: parse_stored::<Urgency>(&row.urgency)?,
                total_amount: row.total_amount,
            },
            status: parse_stored::<OrderStatus>(&row.status)?,
            responded_at: row.responded_at,
            created_at: row.created_at,
        })
    }
}

/// One line of the received-orders CSV export
#[derive(Debug, Serialize, FromRow)]
pub struct OrderExportRow {
    pub order_id: Uuid,
    pub listing_title: String,
    pub buyer_name: String,
    pub buyer_role: String,
    pub quantity_wanted: Decimal,
    pub proposed_price: Decimal,
    pub total_amount: Decimal,
    pub delivery_location: String,
    pub urgency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
}

const ORDER_COLUMNS: &str = "id, listing_id, farmer_id, buyer_id, quantity_wanted, proposed_price, \
                             delivery_location, message, urgency, total_amount, status, \
                             responded_at, created_at";

/// Serialize records as CSV with a header row
pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for record in data {
        wtr.serialize(record)
            .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
}

impl OrderService {
    pub fn new(db: PgPool) -> Self {
        Self {
            listings: ListingService::new(db.clone()),
            users: UserService::new(db.clone()),
            notifications: NotificationService::new(db.clone()),
            db,
        }
    }

    /// Buyer places an order on an active listing
    pub async fn create(&self, buyer: &AuthUser, input: CreateOrderInput) -> AppResult<Order> {
        if buyer.has_role(UserRole::Farmer) {
            return Err(AppError::Forbidden("Farmers cannot place orders".to_string()));
        }

        let listing = self.listings.get(input.listing_id).await?;
        if !listing.is_open_for_orders() {
            return Err(AppError::InvalidStateTransition(format!(
                "listing is {}",
                listing.status
            )));
        }

        let details = input.order_details;
        shared::validate_order_quantity(details.quantity_wanted, listing.quantity_in_tons)
            .map_err(|msg| AppError::validation("quantityWanted", msg))?;
        let proposed_price = details.proposed_price.unwrap_or(listing.expected_price_per_ton);
        shared::validate_price_per_ton(proposed_price)
            .map_err(|msg| AppError::validation("proposedPrice", msg))?;
        shared::validate_required(&details.delivery_location)
            .map_err(|msg| AppError::validation("deliveryLocation", msg))?;

        let pending = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM orders WHERE listing_id = $1 AND buyer_id = $2 AND status = 'pending')",
        )
        .bind(listing.id)
        .bind(buyer.user_id)
        .fetch_one(&self.db)
        .await?;
        if pending {
            return Err(AppError::Conflict {
                resource: "order".to_string(),
                message: "You already have a pending order on this listing".to_string(),
            });
        }

        let total_amount = order_total_amount(details.quantity_wanted, proposed_price)
            .and_then(|total| shared::validate_total_amount(total).map(|_| total))
            .map_err(|msg| AppError::validation("proposedPrice", msg))?;
        let message = details
            .message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty());

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders (id, listing_id, farmer_id, buyer_id, quantity_wanted, proposed_price,
                                delivery_location, message, urgency, total_amount, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'pending')
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(listing.id)
        .bind(listing.farmer_id)
        .bind(buyer.user_id)
        .bind(details.quantity_wanted)
        .bind(proposed_price)
        .bind(details.delivery_location.trim())
        .bind(&message)
        .bind(details.urgency.as_str())
        .bind(total_amount)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            AppError::from_unique_violation(
                e,
                "order",
                "You already have a pending order on this listing",
            )
        })?;

        let order = Order::try_from(row)?;
        tracing::info!(
            order_id = %order.order_id,
            listing_id = %order.listing_id,
            buyer_id = %order.buyer_id,
            total_amount = %order.order_details.total_amount,
            "Order placed"
        );

        let buyer_name = self.users.display_name(buyer.user_id).await;
        self.notifications
            .notify(NewNotification {
                user_id: order.farmer_id,
                kind: NotificationKind::OrderReceived,
                title: "New order".to_string(),
                message: format!(
                    "{} wants {} tons of \"{}\"",
                    buyer_name, order.order_details.quantity_wanted, listing.title
                ),
                entity: Some(EntityRef::new("order", order.order_id)),
            })
            .await;

        Ok(order)
    }

    /// Orders the user placed
    pub async fn sent(&self, buyer: &AuthUser, filter: &OrderFilter) -> AppResult<Vec<Order>> {
        self.list_by("buyer_id", buyer.user_id, filter).await
    }

    /// Orders received by a farmer
    pub async fn received(&self, farmer: &AuthUser, filter: &OrderFilter) -> AppResult<Vec<Order>> {
        farmer.require_role(&[UserRole::Farmer])?;
        self.list_by("farmer_id", farmer.user_id, filter).await
    }

    async fn list_by(&self, column: &str, user_id: Uuid, filter: &OrderFilter) -> AppResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            SELECT {}
            FROM orders
            WHERE {} = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
            ORDER_COLUMNS, column
        ))
        .bind(user_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// Get an order as its buyer or seller
    pub async fn get(&self, user: &AuthUser, order_id: Uuid) -> AppResult<Order> {
        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {} FROM orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let order = Order::try_from(row)?;
        if order.farmer_id != user.user_id && order.buyer_id != user.user_id {
            return Err(AppError::Forbidden("Not a party to this order".to_string()));
        }
        Ok(order)
    }

    /// Seller accepts or rejects an order; accepting reserves the listing
    pub async fn respond(&self, farmer: &AuthUser, order_id: Uuid, input: RespondOrderInput) -> AppResult<Order> {
        let order = self.get(farmer, order_id).await?;
        if order.farmer_id != farmer.user_id {
            return Err(AppError::Forbidden("Only the seller can respond to this order".to_string()));
        }

        let response = answer(order.status, input.decision, None, Utc::now())?;

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE orders
            SET status = $2, responded_at = $3
            WHERE id = $1 AND status = 'pending'
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(response.status.as_str())
        .bind(response.responded_at)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::InvalidStateTransition("order already responded".to_string()))?;

        if response.status == OrderStatus::accepted() {
            sqlx::query(
                "UPDATE listings SET status = 'reserved', updated_at = NOW() WHERE id = $1 AND status = 'active'",
            )
            .bind(order.listing_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let updated = Order::try_from(row)?;
        tracing::info!(order_id = %updated.order_id, status = %updated.status, "Order responded");

        let seller = self.users.display_name(farmer.user_id).await;
        self.notifications
            .notify(NewNotification {
                user_id: updated.buyer_id,
                kind: NotificationKind::OrderResponded,
                title: format!("Order {}", updated.status),
                message: format!("{} {} your order", seller, updated.status),
                entity: Some(EntityRef::new("order", updated.order_id)),
            })
            .await;

        Ok(updated)
    }

    /// Received orders with listing and buyer names, for CSV export
    pub async fn received_export(&self, farmer: &AuthUser) -> AppResult<Vec<OrderExportRow>> {
        farmer.require_role(&[UserRole::Farmer])?;

        let rows = sqlx::query_as::<_, OrderExportRow>(
            r#"
            SELECT o.id AS order_id, l.title AS listing_title, u.name AS buyer_name,
                   u.role AS buyer_role, o.quantity_wanted, o.proposed_price, o.total_amount,
                   o.delivery_location, o.urgency, o.status, o.created_at, o.responded_at
            FROM orders o
            JOIN listings l ON l.id = o.listing_id
            JOIN users u ON u.id = o.buyer_id
            WHERE o.farmer_id = $1
            ORDER BY o.created_at DESC
            "#,
        )
        .bind(farmer.user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }
}
