//! Promotion layer
//!
//! The find-or-create, copy, hide and publish steps, and the [`Promoter`]
//! that chains them into the production → development → testing pipeline.

pub mod assets;
pub mod copy;
pub mod naming;
pub mod promoter;
pub mod publish;
pub mod resolver;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use assets::{AssetFailure, HideReport, hide_assets, select_assets};
pub use copy::{build_copy_payload, copy_package};
pub use naming::{PackageNames, derive_package_names, package_description};
pub use promoter::{CopyReport, PromotionReport, Promoter};
pub use publish::publish;
pub use resolver::{Resolution, ResolvePolicy, find_package, resolve_or_create_package};
