// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Leader election for multi-instance deployments.
//!
//! The scheduler polls [`LeaderElection::is_leader`] on every tick; only
//! the leader executes reconcile logic, standby processes keep their timers
//! armed so they take over on the tick after promotion. The default
//! implementation holds a PostgreSQL advisory lock; deployments with an
//! external coordination service can plug in their own.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::pool::PoolConnection;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Capability interface the scheduler polls to gate reconciliation.
#[async_trait]
pub trait LeaderElection: Send + Sync {
    /// Whether this process currently holds leadership.
    async fn is_leader(&self) -> bool;
}

/// Fixed leadership answer, for single-instance deployments and tests.
pub struct StaticLeader(
    /// The answer returned from every poll.
    pub bool,
);

#[async_trait]
impl LeaderElection for StaticLeader {
    async fn is_leader(&self) -> bool {
        self.0
    }
}

/// Leader election via a PostgreSQL session advisory lock.
///
/// The lock is acquired with `pg_try_advisory_lock` on a dedicated pooled
/// connection and held for the connection's lifetime. If the connection
/// dies the backend releases the lock and a standby process acquires it on
/// its next poll. A failing lock backend degrades this process to idle
/// standby; it never panics.
pub struct PgAdvisoryLeader {
    pool: PgPool,
    key: i64,
    conn: Mutex<Option<PoolConnection<sqlx::Postgres>>>,
}

impl PgAdvisoryLeader {
    /// Create an election participant for the given lock key.
    pub fn new(pool: PgPool, key: i64) -> Self {
        Self {
            pool,
            key,
            conn: Mutex::new(None),
        }
    }
}

#[async_trait]
impl LeaderElection for PgAdvisoryLeader {
    async fn is_leader(&self) -> bool {
        let mut guard = self.conn.lock().await;

        // Holding the lock: verify the session is still alive. A dead
        // connection means the backend already released the lock.
        if let Some(conn) = guard.as_mut() {
            match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&mut **conn).await {
                Ok(_) => return true,
                Err(e) => {
                    warn!(error = %e, "leader lock connection lost, demoting");
                    *guard = None;
                }
            }
        }

        // Not holding the lock: try to acquire it on a fresh connection.
        let mut conn = match self.pool.acquire().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "cannot reach lock backend, staying standby");
                return false;
            }
        };

        match sqlx::query_scalar::<_, bool>("SELECT pg_try_advisory_lock($1)")
            .bind(self.key)
            .fetch_one(&mut *conn)
            .await
        {
            Ok(true) => {
                info!(key = self.key, "acquired leader lock");
                *guard = Some(conn);
                true
            }
            Ok(false) => {
                debug!(key = self.key, "leader lock held elsewhere");
                false
            }
            Err(e) => {
                warn!(error = %e, "leader lock query failed, staying standby");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_leader() {
        assert!(StaticLeader(true).is_leader().await);
        assert!(!StaticLeader(false).is_leader().await);
    }
}
