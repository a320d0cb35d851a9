//! Farmer/HHM contract service
//!
//! Farmers send work contracts to HHMs. The HHM answers once; a contract left
//! unanswered past its grace period is auto-cancelled, either by the
//! background sweeper or lazily when it is next read.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{
    answer, ensure_no_active, Contract, ContractDetails, ContractStatus, Decision,
    NotificationKind, UserRole, WorkflowStatus,
};
use sqlx::{types::Json, FromRow, PgPool};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;
use super::notification::{EntityRef, NewNotification, NotificationService};
use super::user::UserService;
use super::parse_stored;

/// Contract service
#[derive(Clone)]
pub struct ContractService {
    db: PgPool,
    users: UserService,
    notifications: NotificationService,
    default_grace_period_days: i32,
}

/// Input for creating a contract request
#[derive(Debug, Deserialize)]
pub struct CreateContractInput {
    pub hhm_id: Uuid,
    pub contract_details: ContractDetails,
    /// Defaults to the inclusive span of the work dates
    pub duration_days: Option<i32>,
    pub grace_period_days: Option<i32>,
}

/// HHM answer to a contract
#[derive(Debug, Deserialize)]
pub struct RespondContractInput {
    #[serde(alias = "status")]
    pub decision: Decision,
    #[serde(alias = "responseMessage")]
    pub response_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ContractFilter {
    pub status: Option<ContractStatus>,
}

#[derive(Debug, FromRow)]
struct ContractRow {
    id: Uuid,
    farmer_id: Uuid,
    hhm_id: Uuid,
    status: String,
    contract_details: Json<ContractDetails>,
    duration_days: i32,
    grace_period_days: i32,
    response_message: Option<String>,
    responded_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ContractRow> for Contract {
    type Error = AppError;

    fn try_from(row: ContractRow) -> Result<Self, Self::Error> {
        Ok(Contract {
            id: row.id,
            farmer_id: row.farmer_id,
            hhm_id: row.hhm_id,
            status: parse_stored::<ContractStatus>(&row.status)?,
            contract_details: row.contract_details.0,
            duration_days: row.duration_days,
            grace_period_days: row.grace_period_days,
            response_message: row.response_message,
            responded_at: row.responded_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const CONTRACT_COLUMNS: &str = "id, farmer_id, hhm_id, status, contract_details, duration_days, \
                                grace_period_days, response_message, responded_at, created_at, updated_at";

/// Check contract input and fill in defaults
pub fn prepare_contract(
    input: &CreateContractInput,
    default_grace_period_days: i32,
) -> AppResult<(i32, i32)> {
    let details = &input.contract_details;
    shared::validate_required(&details.work_type)
        .map_err(|msg| AppError::validation("workType", msg))?;
    shared::validate_required(&details.farm_location)
        .map_err(|msg| AppError::validation("farmLocation", msg))?;
    shared::validate_date_range(details.start_date, details.end_date)
        .map_err(|msg| AppError::validation("endDate", msg))?;

    let duration_days = match input.duration_days {
        Some(days) => days,
        None => i32::try_from(details.span_days())
            .map_err(|_| AppError::validation("duration_days", "Duration is too long"))?,
    };
    shared::validate_duration(duration_days)
        .map_err(|msg| AppError::validation("duration_days", msg))?;

    let grace_period_days = input.grace_period_days.unwrap_or(default_grace_period_days);
    shared::validate_grace_period(grace_period_days)
        .map_err(|msg| AppError::validation("grace_period_days", msg))?;

    Ok((duration_days, grace_period_days))
}

impl ContractService {
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            users: UserService::new(db.clone()),
            notifications: NotificationService::new(db.clone()),
            db,
            default_grace_period_days: config.contracts.default_grace_period_days,
        }
    }

    /// Farmer sends a contract request to an HHM
    pub async fn create(&self, farmer: &AuthUser, input: CreateContractInput) -> AppResult<Contract> {
        farmer.require_role(&[UserRole::Farmer])?;
        let (duration_days, grace_period_days) =
            prepare_contract(&input, self.default_grace_period_days)?;

        let hhm = self
            .users
            .get_user_with_role(input.hhm_id, UserRole::Hhm, "hhm_id")
            .await?;

        // Settle any overdue request first so it no longer blocks the pair
        self.cancel_overdue().await?;

        let existing = sqlx::query_scalar::<_, String>(
            "SELECT status FROM contracts WHERE farmer_id = $1 AND hhm_id = $2",
        )
        .bind(farmer.user_id)
        .bind(hhm.id)
        .fetch_all(&self.db)
        .await?
        .iter()
        .map(|s| parse_stored::<ContractStatus>(s))
        .collect::<AppResult<Vec<_>>>()?;
        ensure_no_active(existing)?;

        let row = sqlx::query_as::<_, ContractRow>(&format!(
            r#"
            INSERT INTO contracts (id, farmer_id, hhm_id, status, contract_details,
                                   duration_days, grace_period_days)
            VALUES ($1, $2, $3, 'farmer_pending', $4, $5, $6)
            RETURNING {}
            "#,
            CONTRACT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(farmer.user_id)
        .bind(hhm.id)
        .bind(Json(&input.contract_details))
        .bind(duration_days)
        .bind(grace_period_days)
        .fetch_one(&self.db)
        .await
        .map_err(|e| {
            AppError::from_unique_violation(
                e,
                "contract",
                "An active contract already exists with this HHM",
            )
        })?;

        let contract = Contract::try_from(row)?;
        tracing::info!(
            contract_id = %contract.id,
            farmer_id = %contract.farmer_id,
            hhm_id = %contract.hhm_id,
            grace_period_days,
            "Contract created"
        );

        let farmer_name = self.users.display_name(farmer.user_id).await;
        self.notifications
            .notify(NewNotification {
                user_id: contract.hhm_id,
                kind: NotificationKind::ContractReceived,
                title: "New contract request".to_string(),
                message: format!(
                    "{} sent a {} contract for {}",
                    farmer_name, contract.contract_details.work_type, contract.contract_details.farm_location
                ),
                entity: Some(EntityRef::new("contract", contract.id)),
            })
            .await;

        Ok(contract)
    }

    /// Contracts sent by a farmer or received by an HHM
    pub async fn list(&self, user: &AuthUser, filter: &ContractFilter) -> AppResult<Vec<Contract>> {
        let party_column = match user.role {
            UserRole::Farmer => "farmer_id",
            UserRole::Hhm => "hhm_id",
            _ => return Err(AppError::InsufficientPermissions),
        };

        self.cancel_overdue().await?;

        let rows = sqlx::query_as::<_, ContractRow>(&format!(
            r#"
            SELECT {}
            FROM contracts
            WHERE {} = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
            CONTRACT_COLUMNS, party_column
        ))
        .bind(user.user_id)
        .bind(filter.status.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Contract::try_from).collect()
    }

    async fn find(&self, contract_id: Uuid) -> AppResult<Contract> {
        let row = sqlx::query_as::<_, ContractRow>(&format!(
            "SELECT {} FROM contracts WHERE id = $1",
            CONTRACT_COLUMNS
        ))
        .bind(contract_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Contract".to_string()))?;

        Contract::try_from(row)
    }

    /// Get a contract the user is a party to, cancelling it first if overdue
    pub async fn get(&self, user: &AuthUser, contract_id: Uuid) -> AppResult<Contract> {
        let contract = self.find(contract_id).await?;
        if contract.farmer_id != user.user_id && contract.hhm_id != user.user_id {
            return Err(AppError::Forbidden("Not a party to this contract".to_string()));
        }
        self.cancel_if_overdue(contract, Utc::now()).await
    }

    /// HHM accepts or rejects a pending contract
    pub async fn respond(
        &self,
        user: &AuthUser,
        contract_id: Uuid,
        input: RespondContractInput,
    ) -> AppResult<Contract> {
        let contract = self.get(user, contract_id).await?;
        if contract.hhm_id != user.user_id {
            return Err(AppError::Forbidden(
                "Only the HHM can respond to this contract".to_string(),
            ));
        }

        let response = answer(
            contract.status,
            input.decision,
            input.response_message,
            Utc::now(),
        )?;

        let row = sqlx::query_as::<_, ContractRow>(&format!(
            r#"
            UPDATE contracts
            SET status = $2, responded_at = $3, response_message = $4, updated_at = NOW()
            WHERE id = $1 AND status = 'farmer_pending'
            RETURNING {}
            "#,
            CONTRACT_COLUMNS
        ))
        .bind(contract_id)
        .bind(response.status.as_str())
        .bind(response.responded_at)
        .bind(&response.response_message)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::InvalidStateTransition("contract already responded".to_string()))?;

        let updated = Contract::try_from(row)?;
        tracing::info!(contract_id = %updated.id, status = %updated.status, "Contract responded");

        let verb = if updated.status == ContractStatus::accepted() {
            "accepted"
        } else {
            "rejected"
        };
        let hhm_name = self.users.display_name(user.user_id).await;
        self.notifications
            .notify(NewNotification {
                user_id: updated.farmer_id,
                kind: NotificationKind::ContractResponded,
                title: format!("Contract {}", verb),
                message: format!("{} {} your contract request", hhm_name, verb),
                entity: Some(EntityRef::new("contract", updated.id)),
            })
            .await;

        Ok(updated)
    }

    async fn cancel_if_overdue(&self, contract: Contract, now: DateTime<Utc>) -> AppResult<Contract> {
        if !contract.is_overdue(now) {
            return Ok(contract);
        }

        let row = sqlx::query_as::<_, ContractRow>(&format!(
            r#"
            UPDATE contracts
            SET status = 'auto_cancelled', updated_at = NOW()
            WHERE id = $1 AND status = 'farmer_pending'
            RETURNING {}
            "#,
            CONTRACT_COLUMNS
        ))
        .bind(contract.id)
        .fetch_optional(&self.db)
        .await?;

        match row {
            Some(row) => {
                let cancelled = Contract::try_from(row)?;
                tracing::info!(contract_id = %cancelled.id, "Overdue contract auto-cancelled");
                self.notify_cancelled(&cancelled).await;
                Ok(cancelled)
            }
            // Answered or swept concurrently
            None => self.find(contract.id).await,
        }
    }

    /// Auto-cancel every pending contract past its grace period
    pub async fn cancel_overdue(&self) -> AppResult<Vec<Contract>> {
        let rows = sqlx::query_as::<_, ContractRow>(&format!(
            r#"
            UPDATE contracts
            SET status = 'auto_cancelled', updated_at = NOW()
            WHERE status = 'farmer_pending'
              AND created_at + make_interval(days => GREATEST(grace_period_days, 0)) < NOW()
            RETURNING {}
            "#,
            CONTRACT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        let cancelled = rows
            .into_iter()
            .map(Contract::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        for contract in &cancelled {
            self.notify_cancelled(contract).await;
        }

        Ok(cancelled)
    }

    async fn notify_cancelled(&self, contract: &Contract) {
        for user_id in [contract.farmer_id, contract.hhm_id] {
            self.notifications
                .notify(NewNotification {
                    user_id,
                    kind: NotificationKind::ContractAutoCancelled,
                    title: "Contract auto-cancelled".to_string(),
                    message: format!(
                        "The {} contract was not answered within {} days and has been cancelled",
                        contract.contract_details.work_type, contract.grace_period_days
                    ),
                    entity: Some(EntityRef::new("contract", contract.id)),
                })
                .await;
        }
    }
}

/// Run the auto-cancel sweep on a fixed interval
pub fn spawn_contract_sweeper(service: ContractService, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match service.cancel_overdue().await {
                Ok(cancelled) if !cancelled.is_empty() => {
                    tracing::info!(count = cancelled.len(), "Auto-cancelled overdue contracts");
                }
                Ok(_) => {}
                Err(e) => tracing::error!("Contract sweep failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn input(start: (i32, u32, u32), end: (i32, u32, u32)) -> CreateContractInput {
        CreateContractInput {
            hhm_id: Uuid::new_v4(),
            contract_details: ContractDetails {
                work_type: "harvesting".to_string(),
                farm_location: "Baramati".to_string(),
                payment_terms: None,
                start_date: NaiveDate::from_ymd_opt(start.0, start.1, start.2).unwrap(),
                end_date: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
                requirements: None,
            },
            duration_days: None,
            grace_period_days: None,
        }
    }

    #[test]
    fn defaults_fill_duration_and_grace() {
        let input = input((2026, 11, 1), (2026, 11, 10));
        assert_eq!(prepare_contract(&input, 3).unwrap(), (10, 3));
    }

    #[test]
    fn end_before_start_is_rejected() {
        let input = input((2026, 11, 10), (2026, 11, 1));
        assert!(matches!(
            prepare_contract(&input, 3),
            Err(AppError::Validation { field, .. }) if field == "endDate"
        ));
    }

    #[test]
    fn explicit_grace_period_is_checked() {
        let mut input = input((2026, 11, 1), (2026, 11, 2));
        input.grace_period_days = Some(0);
        assert!(prepare_contract(&input, 3).is_err());
        input.grace_period_days = Some(7);
        assert_eq!(prepare_contract(&input, 3).unwrap(), (2, 7));
    }

    #[test]
    fn blank_work_type_is_rejected() {
        let mut input = input((2026, 11, 1), (2026, 11, 2));
        input.contract_details.work_type = "  ".to_string();
        assert!(prepare_contract(&input, 3).is_err());
    }

    #[test]
    fn create_input_uses_snake_case_envelope() {
        let hhm_id = Uuid::new_v4();
        let input: CreateContractInput = serde_json::from_value(serde_json::json!({
            "hhm_id": hhm_id,
            "contract_details": {
                "workType": "harvesting",
                "farmLocation": "Sangli",
                "startDate": "2026-11-01",
                "endDate": "2026-11-20"
            },
            "grace_period_days": 5
        }))
        .unwrap();
        assert_eq!(input.hhm_id, hhm_id);
        assert_eq!(input.grace_period_days, Some(5));
        assert_eq!(input.contract_details.payment_terms, None);
    }

    async fn backdate(db: &PgPool, contract_id: Uuid, days: i32) {
        sqlx::query(
            "UPDATE contracts SET created_at = NOW() - make_interval(days => $2) WHERE id = $1",
        )
        .bind(contract_id)
        .bind(days)
        .execute(db)
        .await
        .unwrap();
    }

    /// Farmer sends a 3-day request that nobody answers for 10 days
    #[tokio::test]
    #[ignore] // Requires database connection (DATABASE_URL)
    async fn overdue_contract_is_auto_cancelled() {
        use crate::services::auth::{AuthService, SignupInput};

        let config = Config::for_tests();
        let url = std::env::var("DATABASE_URL").unwrap_or_else(|_| config.database.url.clone());
        let db = PgPool::connect(&url).await.unwrap();
        sqlx::migrate!("./migrations").run(&db).await.unwrap();

        let auth = AuthService::new(db.clone(), &config);
        let suffix = &Uuid::new_v4().simple().to_string()[..8];
        let signup = |role: UserRole, prefix: &str| SignupInput {
            name: format!("{} {}", prefix, suffix),
            username: format!("{}_{}", prefix, suffix),
            email: format!("{}_{}@example.com", prefix, suffix),
            password: "sugarcane1".to_string(),
            phone: None,
            role,
            profile: None,
        };
        let farmer = auth.signup(signup(UserRole::Farmer, "farmer")).await.unwrap().user;
        let hhm = auth.signup(signup(UserRole::Hhm, "hhm")).await.unwrap().user;
        let as_auth = |u: &shared::User| AuthUser {
            user_id: u.id,
            username: u.username.clone(),
            role: u.role,
        };
        let request = || {
            let mut contract = input((2026, 11, 1), (2026, 11, 20));
            contract.hhm_id = hhm.id;
            contract.grace_period_days = Some(3);
            contract
        };

        let service = ContractService::new(db.clone(), &config);

        // Read path cancels lazily, and the HHM can no longer answer
        let first = service.create(&as_auth(&farmer), request()).await.unwrap();
        assert_eq!(first.status, ContractStatus::FarmerPending);
        backdate(&db, first.id, 10).await;

        let read = service.get(&as_auth(&hhm), first.id).await.unwrap();
        assert_eq!(read.status, ContractStatus::AutoCancelled);
        let late = service
            .respond(
                &as_auth(&hhm),
                first.id,
                RespondContractInput {
                    decision: Decision::Accept,
                    response_message: None,
                },
            )
            .await;
        assert!(matches!(late, Err(AppError::InvalidStateTransition(_))));

        let notifications = NotificationService::new(db.clone());
        for party in [farmer.id, hhm.id] {
            let cancelled = notifications
                .list(party, false, 50)
                .await
                .unwrap()
                .into_iter()
                .filter(|n| {
                    n.kind == NotificationKind::ContractAutoCancelled && n.entity_id == Some(first.id)
                })
                .count();
            assert_eq!(cancelled, 1);
        }

        // The cancelled request no longer blocks the pair; the sweep settles the next one
        let second = service.create(&as_auth(&farmer), request()).await.unwrap();
        backdate(&db, second.id, 4).await;
        let swept = service.cancel_overdue().await.unwrap();
        assert!(swept.iter().any(|c| c.id == second.id));
        assert!(swept.iter().all(|c| c.status == ContractStatus::AutoCancelled));

        // Inside the grace period nothing changes
        let third = service.create(&as_auth(&farmer), request()).await.unwrap();
        backdate(&db, third.id, 2).await;
        assert!(service.cancel_overdue().await.unwrap().iter().all(|c| c.id != third.id));
        let pending = service.get(&as_auth(&farmer), third.id).await.unwrap();
        assert_eq!(pending.status, ContractStatus::FarmerPending);
    }
}
