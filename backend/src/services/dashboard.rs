//! Role-specific dashboard counts

use rust_decimal::Decimal;
use serde::Serialize;
use shared::{ApplicationStatus, ContractStatus, UserRole};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use super::parse_stored;

/// Dashboard service
#[derive(Clone)]
pub struct DashboardService {
    db: PgPool,
}

/// Dashboard payload, tagged with the viewer's role
#[derive(Debug, Serialize)]
#[serde(tag = "role")]
pub enum Dashboard {
    Farmer(FarmerDashboard),
    #[serde(rename = "HHM")]
    Hhm(HhmDashboard),
    Factory(FactoryDashboard),
    Worker(WorkerDashboard),
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContractCounts {
    pub farmer_pending: i64,
    pub hhm_accepted: i64,
    pub hhm_rejected: i64,
    pub auto_cancelled: i64,
}

impl ContractCounts {
    pub fn add(&mut self, status: ContractStatus, count: i64) {
        match status {
            ContractStatus::FarmerPending => self.farmer_pending += count,
            ContractStatus::HhmAccepted => self.hhm_accepted += count,
            ContractStatus::HhmRejected => self.hhm_rejected += count,
            ContractStatus::AutoCancelled => self.auto_cancelled += count,
        }
    }
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct ApplicationCounts {
    pub pending: i64,
    pub accepted: i64,
    pub rejected: i64,
}

impl ApplicationCounts {
    pub fn add(&mut self, status: ApplicationStatus, count: i64) {
        match status {
            ApplicationStatus::Pending => self.pending += count,
            ApplicationStatus::Accepted => self.accepted += count,
            ApplicationStatus::Rejected => self.rejected += count,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmerDashboard {
    pub active_listings: i64,
    pub pending_received_orders: i64,
    pub contracts: ContractCounts,
    pub total_active_listing_value: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HhmDashboard {
    pub pending_invitations_received: i64,
    pub associated_factories: i64,
    pub pending_contracts_received: i64,
    pub accepted_contracts: i64,
    pub open_schedules: i64,
    pub pending_applications: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactoryDashboard {
    pub pending_invitations_sent: i64,
    pub associated_hhms: i64,
    pub accepted_invitations: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerDashboard {
    pub applications: ApplicationCounts,
    pub open_schedules: i64,
}

impl DashboardService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn for_user(&self, user: &AuthUser) -> AppResult<Dashboard> {
        let dashboard = match user.role {
            UserRole::Farmer => Dashboard::Farmer(self.farmer(user.user_id).await?),
            UserRole::Hhm => Dashboard::Hhm(self.hhm(user.user_id).await?),
            UserRole::Factory => Dashboard::Factory(self.factory(user.user_id).await?),
            UserRole::Worker => Dashboard::Worker(self.worker(user.user_id).await?),
        };
        Ok(dashboard)
    }

    async fn farmer(&self, user_id: Uuid) -> AppResult<FarmerDashboard> {
        let (active_listings, total_active_listing_value) = sqlx::query_as::<_, (i64, Decimal)>(
            r#"
            SELECT COUNT(*), COALESCE(SUM(quantity_in_tons * expected_price_per_ton), 0)
            FROM listings
            WHERE farmer_id = $1 AND status = 'active'
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let pending_received_orders = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM orders WHERE farmer_id = $1 AND status = 'pending'",
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM contracts WHERE farmer_id = $1 GROUP BY status",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let mut contracts = ContractCounts::default();
        for (status, count) in rows {
            contracts.add(parse_stored(&status)?, count);
        }

        Ok(FarmerDashboard {
            active_listings,
            pending_received_orders,
            contracts,
            total_active_listing_value,
        })
    }

    async fn hhm(&self, user_id: Uuid) -> AppResult<HhmDashboard> {
        let (pending_invitations_received, associated_factories) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM invitations
                 WHERE hhm_id = $1 AND initiated_by = 'factory' AND status = 'pending'),
                (SELECT COUNT(*) FROM associations WHERE hhm_id = $1)
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let (pending_contracts_received, accepted_contracts) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'farmer_pending'),
                COUNT(*) FILTER (WHERE status = 'hhm_accepted')
            FROM contracts
            WHERE hhm_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let (open_schedules, pending_applications) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM schedules WHERE hhm_id = $1 AND status = 'open'),
                (SELECT COUNT(*) FROM applications a
                 JOIN schedules s ON s.id = a.schedule_id
                 WHERE s.hhm_id = $1 AND a.status = 'pending')
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        Ok(HhmDashboard {
            pending_invitations_received,
            associated_factories,
            pending_contracts_received,
            accepted_contracts,
            open_schedules,
            pending_applications,
        })
    }

    async fn factory(&self, user_id: Uuid) -> AppResult<FactoryDashboard> {
        let (pending_invitations_sent, accepted_invitations, associated_hhms) =
            sqlx::query_as::<_, (i64, i64, i64)>(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM invitations
                     WHERE factory_id = $1 AND initiated_by = 'factory' AND status = 'pending'),
                    (SELECT COUNT(*) FROM invitations WHERE factory_id = $1 AND status = 'accepted'),
                    (SELECT COUNT(*) FROM associations WHERE factory_id = $1)
                "#,
            )
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;

        Ok(FactoryDashboard {
            pending_invitations_sent,
            associated_hhms,
            accepted_invitations,
        })
    }

    async fn worker(&self, user_id: Uuid) -> AppResult<WorkerDashboard> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM applications WHERE worker_id = $1 GROUP BY status",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        let mut applications = ApplicationCounts::default();
        for (status, count) in rows {
            applications.add(parse_stored(&status)?, count);
        }

        let open_schedules =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM schedules WHERE status = 'open'")
                .fetch_one(&self.db)
                .await?;

        Ok(WorkerDashboard {
            applications,
            open_schedules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_counts_accumulate() {
        let mut counts = ContractCounts::default();
        counts.add(ContractStatus::FarmerPending, 2);
        counts.add(ContractStatus::AutoCancelled, 1);
        counts.add(ContractStatus::FarmerPending, 1);
        assert_eq!(counts.farmer_pending, 3);
        assert_eq!(counts.auto_cancelled, 1);
        assert_eq!(counts.hhm_accepted, 0);
    }

    #[test]
    fn dashboard_is_tagged_with_role() {
        let dashboard = Dashboard::Hhm(HhmDashboard {
            pending_invitations_received: 1,
            associated_factories: 2,
            pending_contracts_received: 0,
            accepted_contracts: 3,
            open_schedules: 1,
            pending_applications: 4,
        });
        let value = serde_json::to_value(&dashboard).unwrap();
        assert_eq!(value["role"], "HHM");
        assert_eq!(value["associatedFactories"], 2);
    }

    #[test]
    fn worker_dashboard_nests_application_counts() {
        let mut applications = ApplicationCounts::default();
        applications.add(ApplicationStatus::Accepted, 2);
        let value = serde_json::to_value(Dashboard::Worker(WorkerDashboard {
            applications,
            open_schedules: 5,
        }))
        .unwrap();
        assert_eq!(value["role"], "Worker");
        assert_eq!(value["applications"]["accepted"], 2);
        assert_eq!(value["openSchedules"], 5);
    }
}
