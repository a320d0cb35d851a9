//! Domain models for the Harvest Hub platform

mod contract;
mod invitation;
mod listing;
mod notification;
mod order;
mod schedule;
mod user;

pub use contract::*;
pub use invitation::*;
pub use listing::*;
pub use notification::*;
pub use order::*;
pub use schedule::*;
pub use user::*;
