// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Request status enums and the legal transition rules.
//!
//! The reconcilers own the happy-path transitions (accepted → preparing →
//! provisioning → ready and the teardown chain); the validation functions
//! here guard the client-initiated branches: suspend, resume, and desired
//! version changes. Everything in this module is pure; callers inject `now`
//! so the grace-period window is testable.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;

use crate::error::ServiceError;

/// Lifecycle status of a managed Kafka request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KafkaStatus {
    /// Persisted and waiting for cluster placement.
    Accepted,
    /// Cluster assigned; endpoints and credentials being set up.
    Preparing,
    /// Handed to the data plane; waiting for remote readiness.
    Provisioning,
    /// Serving traffic.
    Ready,
    /// Provisioning failed permanently.
    Failed,
    /// Suspension requested; waiting for remote confirmation.
    Suspending,
    /// Stopped on the data plane; record retained.
    Suspended,
    /// Resume requested; waiting for remote readiness.
    Resuming,
    /// Deletion requested; data plane teardown pending.
    Deprovision,
    /// Data plane teardown confirmed; dependencies being released.
    Deleting,
    /// Terminal. Kept as a listing alias of `deleting` for rows written by
    /// older deployments; new code always writes `deleting` first.
    Deleted,
}

impl KafkaStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [KafkaStatus; 11] = [
        Self::Accepted,
        Self::Preparing,
        Self::Provisioning,
        Self::Ready,
        Self::Failed,
        Self::Suspending,
        Self::Suspended,
        Self::Resuming,
        Self::Deprovision,
        Self::Deleting,
        Self::Deleted,
    ];

    /// Status string as stored in the `status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Preparing => "preparing",
            Self::Provisioning => "provisioning",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Suspending => "suspending",
            Self::Suspended => "suspended",
            Self::Resuming => "resuming",
            Self::Deprovision => "deprovision",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
        }
    }

    /// True once deletion has been requested (deprovision or later).
    pub fn is_deletion_in_progress(self) -> bool {
        matches!(self, Self::Deprovision | Self::Deleting | Self::Deleted)
    }

    /// True for the terminal status.
    pub fn is_terminal(self) -> bool {
        self == Self::Deleted
    }

    /// Statuses in which desired version changes are accepted.
    pub fn is_upgradable(self) -> bool {
        matches!(
            self,
            Self::Preparing | Self::Provisioning | Self::Ready | Self::Failed
        )
    }
}

impl fmt::Display for KafkaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KafkaStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ServiceError::general(format!("unknown kafka status '{}'", s)))
    }
}

/// Validate a suspension request against the current status.
///
/// Suspension is only legal from `ready`. Returns the status to persist
/// (`suspending`).
pub fn validate_suspend(current: KafkaStatus) -> Result<KafkaStatus, ServiceError> {
    match current {
        KafkaStatus::Ready => Ok(KafkaStatus::Suspending),
        KafkaStatus::Suspending | KafkaStatus::Suspended => Err(ServiceError::validation(format!(
            "instance is already {}",
            current
        ))),
        other => Err(ServiceError::validation(format!(
            "instance in status '{}' cannot be suspended",
            other
        ))),
    }
}

/// Validate a resume request against the current status and expiry window.
///
/// Resume is only legal from `suspended`, and is refused while the instance
/// sits inside the grace-period window before its expiry: with an expiry set
/// and a grace period of `g` days, resume is rejected once
/// `now >= expires_at - g`. Without an expiry, resume is always allowed.
/// Returns the status to persist (`resuming`); the remote data plane
/// confirms the transition back to `ready`.
pub fn validate_resume(
    current: KafkaStatus,
    expires_at: Option<DateTime<Utc>>,
    grace_period_days: i64,
    now: DateTime<Utc>,
) -> Result<KafkaStatus, ServiceError> {
    if current != KafkaStatus::Suspended {
        return Err(ServiceError::validation(format!(
            "only suspended instances can be resumed, instance is {}",
            current
        )));
    }

    if let Some(expires_at) = expires_at {
        let grace_start = expires_at - Duration::days(grace_period_days);
        if now >= grace_start {
            return Err(ServiceError::validation(format!(
                "instance expires at {} and is within its {}-day grace period, resume is not allowed",
                expires_at.format("%Y-%m-%d %H:%M:%S UTC"),
                grace_period_days
            )));
        }
    }

    Ok(KafkaStatus::Resuming)
}

/// Validate a desired version change for one upgrade track.
///
/// A new desired value is only accepted while the track's upgrading flag is
/// clear and the request is in an upgradable status. Returns `true` when the
/// requested value actually differs (callers use this to flip the upgrading
/// flag), `false` for an effective no-op.
pub fn validate_version_change(
    track: &str,
    status: KafkaStatus,
    upgrading: bool,
    current_desired: &str,
    requested: &str,
) -> Result<bool, ServiceError> {
    if requested == current_desired {
        return Ok(false);
    }
    if upgrading {
        return Err(ServiceError::validation(format!(
            "{} version upgrade is already in progress",
            track
        )));
    }
    if !status.is_upgradable() {
        return Err(ServiceError::validation(format!(
            "{} version cannot be changed while instance is {}",
            track, status
        )));
    }
    Ok(true)
}

/// Client-requested desired state of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorDesiredState {
    /// Connector should be running.
    Ready,
    /// Connector should be stopped but retained.
    Stopped,
    /// Connector should be removed.
    Deleted,
}

impl ConnectorDesiredState {
    /// Desired-state string as stored in the `desired_state` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Stopped => "stopped",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ConnectorDesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectorDesiredState {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(Self::Ready),
            "stopped" => Ok(Self::Stopped),
            "deleted" => Ok(Self::Deleted),
            other => Err(ServiceError::validation(format!(
                "desired_state must be one of ready, stopped, deleted; got '{}'",
                other
            ))),
        }
    }
}

/// Observed phase of a connector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorStatus {
    /// Waiting for placement on a cluster.
    Assigning,
    /// Running.
    Ready,
    /// Stopped but retained.
    Stopped,
    /// Removal in progress.
    Deleting,
    /// Terminal.
    Deleted,
    /// Failed permanently.
    Failed,
}

impl ConnectorStatus {
    /// Phase string as stored in the `status` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Assigning => "assigning",
            Self::Ready => "ready",
            Self::Stopped => "stopped",
            Self::Deleting => "deleting",
            Self::Deleted => "deleted",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectorStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "assigning" => Ok(Self::Assigning),
            "ready" => Ok(Self::Ready),
            "stopped" => Ok(Self::Stopped),
            "deleting" => Ok(Self::Deleting),
            "deleted" => Ok(Self::Deleted),
            "failed" => Ok(Self::Failed),
            other => Err(ServiceError::general(format!(
                "unknown connector status '{}'",
                other
            ))),
        }
    }
}
