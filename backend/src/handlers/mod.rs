//! HTTP handlers for the Harvest Hub API

pub mod auth;
pub mod contract;
pub mod dashboard;
pub mod health;
pub mod invitation;
pub mod listing;
pub mod notification;
pub mod order;
pub mod schedule;
pub mod user;

pub use auth::*;
pub use contract::*;
pub use dashboard::*;
pub use health::*;
pub use invitation::*;
pub use listing::*;
pub use notification::*;
pub use order::*;
pub use schedule::*;
pub use user::*;
