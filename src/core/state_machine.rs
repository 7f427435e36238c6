//! Stage tracking for the promotion workflow
//!
//! Every package role moves forward through
//! `absent → created → copied → hidden → published`. Stages may be skipped
//! but never revisited. Nothing is persisted: a rerun starts from `absent`
//! and relies on the idempotent package lookup.

use crate::core::error::PromoteError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Role a package plays in the promotion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PackageRole {
    Production,
    Development,
    Testing,
}

impl PackageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::Development => "development",
            Self::Testing => "testing",
        }
    }
}

impl fmt::Display for PackageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage of a package within the promotion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum PromotionStage {
    Absent,
    Created,
    Copied,
    Hidden,
    Published,
}

impl PromotionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Created => "created",
            Self::Copied => "copied",
            Self::Hidden => "hidden",
            Self::Published => "published",
        }
    }
}

impl fmt::Display for PromotionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State transition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageTransition {
    pub role: PackageRole,
    pub from: PromotionStage,
    pub to: PromotionStage,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Tracks the stage of every package role during one run
#[derive(Debug, Clone, Default)]
pub struct PromotionTracker {
    stages: BTreeMap<PackageRole, PromotionStage>,
    transitions: Vec<StageTransition>,
}

impl PromotionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `role` forward to `to`
    ///
    /// Fails with [`PromoteError::InvalidTransition`] unless `to` lies strictly
    /// after the current stage.
    pub fn transition(
        &mut self,
        role: PackageRole,
        to: PromotionStage,
        detail: Option<String>,
    ) -> Result<(), PromoteError> {
        let from = self.stage(role);

        if to <= from {
            return Err(PromoteError::InvalidTransition {
                role: role.to_string(),
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        self.transitions.push(StageTransition {
            role,
            from,
            to,
            timestamp: Utc::now(),
            detail,
        });
        self.stages.insert(role, to);

        Ok(())
    }

    /// Current stage of `role`
    pub fn stage(&self, role: PackageRole) -> PromotionStage {
        self.stages
            .get(&role)
            .copied()
            .unwrap_or(PromotionStage::Absent)
    }

    pub fn transitions(&self) -> &[StageTransition] {
        &self.transitions
    }

    /// Get transition history as human-readable string
    pub fn history(&self) -> String {
        self.transitions
            .iter()
            .map(|t| {
                let detail = t
                    .detail
                    .as_ref()
                    .map(|d| format!(" ({})", d))
                    .unwrap_or_default();
                format!(
                    "{}: {} {} → {}{}",
                    t.timestamp.to_rfc3339(),
                    t.role,
                    t.from,
                    t.to,
                    detail
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
