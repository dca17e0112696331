//! # Candles Core
//! Shared foundation for the candles reminder service: identifier newtypes,
//! the stored record types, the error taxonomy, configuration, and the two
//! narrow traits the scheduler needs from a host platform (`Host`, `Clock`).

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::CandlesConfig;
pub use error::{CandlesError, Result};
pub use traits::{Clock, DestinationHandle, Host, SystemClock, UserHandle};
pub use types::{DestinationId, EventRecord, GroupDestination, GroupId, UserId};
