//! # Candles Scheduler
//! The recurrence engine: maps stored month/day events to their next
//! occurrence, answers "what's coming up" queries, dispatches the day's
//! notifications, and owns the once-a-day poll loop.
//!
//! ## Architecture
//! ```text
//! spawn_daily (tokio task)
//!   └── sleep until trigger time (fixed local wall-clock, e.g. 09:00)
//!         └── poll cycle: all_events → next_occurrence == today?
//!               └── Dispatcher::notify → host.send
//!                     outcomes: Sent / Skipped / Failed (logged, never fatal)
//! CandlesService (command-facing)
//!   ├── set_event / set_destination — idempotent upserts
//!   └── list_upcoming — sorted, limited, unresolvable users dropped
//! ```
//! One day's failure never kills the loop; the next target is always the
//! trigger time on the following calendar day, recomputed from the clock.

pub mod dispatch;
pub mod engine;
pub mod occurrence;
pub mod service;
pub mod upcoming;

pub use dispatch::{Dispatcher, Outcome, SkipReason};
pub use engine::{spawn_daily, SchedulerHandle};
pub use occurrence::{days_until, next_occurrence};
pub use service::CandlesService;
pub use upcoming::{upcoming, UpcomingEntry};
