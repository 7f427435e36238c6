//! Core traits and types for package promotion
//!
//! This module defines the platform-facing data model (packages, content
//! nodes, copy payloads, visibility changes) and the [`StudioPlatform`] trait
//! through which every effectful call is made.

use crate::core::error::PromoteError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Packages
// ============================================================================

/// A package as listed by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: String,
    /// Stable identifier, also used as the package's root key
    pub key: String,
    pub name: String,
    pub space_id: String,
}

/// Request to create a package in a space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPackage {
    pub name: String,
    pub key: String,
    pub description: String,
    pub space_id: String,
}

/// Attribute a package lookup matches against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupField {
    Name,
    Key,
}

impl LookupField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Key => "key",
        }
    }
}

impl fmt::Display for LookupField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of looking a package up in a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(Package),
    NotFound,
}

impl Lookup {
    pub fn into_option(self) -> Option<Package> {
        match self {
            Self::Found(package) => Some(package),
            Self::NotFound => None,
        }
    }
}

// ============================================================================
// Content nodes
// ============================================================================

/// Node type of a package's own root node
pub const PACKAGE_NODE_TYPE: &str = "PACKAGE";

/// Asset type of a view
pub const VIEW_ASSET_TYPE: &str = "VIEW";

/// A content node (view, board, knowledge model, ...) inside a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentNode {
    pub id: String,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_node_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_id: Option<String>,
}

impl ContentNode {
    /// Whether this node is the package itself rather than an asset in it
    pub fn is_package_root(&self) -> bool {
        self.node_type == PACKAGE_NODE_TYPE
    }

    pub fn is_view(&self) -> bool {
        self.asset_type.as_deref() == Some(VIEW_ASSET_TYPE)
    }
}

// ============================================================================
// Copy and visibility requests
// ============================================================================

/// Request body of the node copy endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyPayload {
    pub node_id: String,
    pub node_id_to_replace: String,
    pub node_key: String,
    pub root_key: String,
    pub team_domain: String,
    pub destination_root_id: String,
    pub destination_root_key: String,
    pub destination_space_id: String,
    pub new_name: String,
}

/// One entry of the visibility endpoint's request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityChange {
    pub id: String,
    pub hide: bool,
}

impl VisibilityChange {
    pub fn hide(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            hide: true,
        }
    }
}

/// Platform mode tag sent with copy and visibility requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Flavor {
    #[default]
    Studio,
}

impl Flavor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Studio => "STUDIO",
        }
    }
}

// ============================================================================
// Hide options
// ============================================================================

/// Which content nodes of a package get hidden
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetScope {
    Views,
    #[default]
    All,
}

/// How visibility requests are issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HideStrategy {
    /// A single request listing every asset
    Batch,
    /// One request per asset
    #[default]
    PerAsset,
}

/// What a per-asset hide does when one asset fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetFailurePolicy {
    #[default]
    Skip,
    Abort,
}

macro_rules! impl_from_str {
    ($ty:ty, $($text:literal => $variant:expr),+ $(,)?) => {
        impl FromStr for $ty {
            type Err = PromoteError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($text => Ok($variant),)+
                    other => Err(PromoteError::Config(format!(
                        "unknown {} `{}` (expected one of: {})",
                        stringify!($ty),
                        other,
                        [$($text),+].join(", ")
                    ))),
                }
            }
        }
    };
}

impl_from_str!(AssetScope, "views" => AssetScope::Views, "all" => AssetScope::All);
impl_from_str!(
    HideStrategy,
    "batch" => HideStrategy::Batch,
    "per-asset" => HideStrategy::PerAsset,
);
impl_from_str!(
    AssetFailurePolicy,
    "skip" => AssetFailurePolicy::Skip,
    "abort" => AssetFailurePolicy::Abort,
);

// ============================================================================
// Platform Trait
// ============================================================================

/// Client for the platform's package-manager service
///
/// Listings returned by [`StudioPlatform::packages`] reflect the state as of
/// the last [`StudioPlatform::sync`]; they do not follow server-side changes
/// on their own. Callers resync after every mutating call before relying on
/// a listing again.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StudioPlatform: Send + Sync {
    /// Refresh the local listing of the space's packages
    async fn sync(&self, space_id: &str) -> Result<(), PromoteError>;

    /// Packages of the space as of the last sync
    async fn packages(&self, space_id: &str) -> Result<Vec<Package>, PromoteError>;

    /// Create a package; the new package shows up after the next sync
    async fn create_package(&self, package: &NewPackage) -> Result<(), PromoteError>;

    /// All content nodes of a package, including its root node
    async fn content_nodes(&self, package: &Package) -> Result<Vec<ContentNode>, PromoteError>;

    /// Copy the node `source_id` as described by `payload`
    async fn copy_node(
        &self,
        source_id: &str,
        payload: &CopyPayload,
        flavor: Flavor,
    ) -> Result<ContentNode, PromoteError>;

    /// Apply visibility changes to nodes of the package identified by `package_key`
    async fn set_visibility(
        &self,
        package_key: &str,
        changes: &[VisibilityChange],
        flavor: Flavor,
    ) -> Result<(), PromoteError>;

    /// Publish the package's current state
    async fn publish(&self, package: &Package) -> Result<(), PromoteError>;
}
