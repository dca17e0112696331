//! Seams between the scheduler core and the host platform.
//!
//! The core never touches the host's object model beyond two resolver calls
//! and one send. Handles are opaque-ish: enough to address a send and to
//! render a mention, nothing more.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{DestinationId, GroupId, UserId};

/// A resolved destination, ready to receive a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationHandle {
    pub id: DestinationId,
    /// Human-readable name, for logs.
    pub name: String,
}

/// A resolved group member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserHandle {
    pub id: UserId,
    /// Platform mention string (e.g. `<@123>`), used in message templates.
    pub mention: String,
    /// Display name, for logs and listings.
    pub display_name: String,
}

/// The host platform, seen through the narrowest possible interface.
///
/// Resolvers return `None` for anything that cannot currently be resolved —
/// deleted channels, departed members, permission failures. Callers treat
/// `None` as a skip, never an error. Only `send` can fail with Transport.
#[async_trait]
pub trait Host: Send + Sync {
    /// Resolve a configured destination to a sendable handle.
    async fn resolve_destination(&self, id: DestinationId) -> Option<DestinationHandle>;

    /// Resolve a user within a group.
    async fn resolve_user(&self, group: GroupId, user: UserId) -> Option<UserHandle>;

    /// Deliver a text message to a destination.
    async fn send(&self, dest: &DestinationHandle, text: &str) -> Result<()>;
}

/// Wall clock source. Abstracted so the scheduler and service are testable
/// against a frozen time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
