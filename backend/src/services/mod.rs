//! Business logic services for the Harvest Hub platform

use std::str::FromStr;

use crate::error::{AppError, AppResult};

pub mod auth;
pub mod contract;
pub mod dashboard;
pub mod invitation;
pub mod listing;
pub mod notification;
pub mod order;
pub mod schedule;
pub mod user;

pub use auth::AuthService;
pub use contract::{spawn_contract_sweeper, ContractService};
pub use dashboard::DashboardService;
pub use invitation::InvitationService;
pub use listing::ListingService;
pub use notification::NotificationService;
pub use order::OrderService;
pub use schedule::ScheduleService;
pub use user::UserService;

/// Parse an enum value stored as TEXT
pub(crate) fn parse_stored<T>(value: &str) -> AppResult<T>
where
    T: FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| AppError::Internal(format!("Corrupt stored value: {}", e)))
}
