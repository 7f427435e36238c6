//! Hiding a package's assets
//!
//! A development package is hidden from end users before it is published.
//! Which nodes are hidden and how the visibility requests are issued is set
//! by [`HideOptions`].

use crate::core::config::HideOptions;
use crate::core::error::PromoteError;
use crate::core::traits::{
    AssetFailurePolicy, AssetScope, ContentNode, Flavor, HideStrategy, Package, StudioPlatform,
    VisibilityChange,
};
use crate::promotion::publish::publish;
use tracing::{debug, info, warn};

/// An asset whose visibility request failed and was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFailure {
    pub id: String,
    pub name: String,
    pub error: String,
}

/// Outcome of hiding one package's assets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HideReport {
    /// Name of the package
    pub package: String,
    /// Ids of the hidden assets
    pub hidden: Vec<String>,
    pub failed: Vec<AssetFailure>,
}

impl HideReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Keep the nodes that `scope` selects, never the package root itself
pub fn select_assets(nodes: Vec<ContentNode>, scope: AssetScope) -> Vec<ContentNode> {
    nodes
        .into_iter()
        .filter(|node| !node.is_package_root())
        .filter(|node| match scope {
            AssetScope::Views => node.is_view(),
            AssetScope::All => true,
        })
        .collect()
}

/// Hide the package's assets, then publish the package
///
/// With [`HideStrategy::Batch`] every asset goes into a single request and a
/// failure is returned. With [`HideStrategy::PerAsset`] each asset gets its
/// own request and a failure is handled according to
/// [`AssetFailurePolicy`]. A package without assets is published unchanged.
pub async fn hide_assets(
    platform: &dyn StudioPlatform,
    package: &Package,
    options: HideOptions,
    flavor: Flavor,
) -> Result<HideReport, PromoteError> {
    let nodes = platform.content_nodes(package).await?;
    let assets = select_assets(nodes, options.scope);

    info!(
        package = %package.name,
        assets = assets.len(),
        scope = ?options.scope,
        strategy = ?options.strategy,
        "hiding assets"
    );

    let mut report = HideReport {
        package: package.name.clone(),
        ..HideReport::default()
    };

    if !assets.is_empty() {
        match options.strategy {
            HideStrategy::Batch => {
                let changes: Vec<VisibilityChange> = assets
                    .iter()
                    .map(|asset| VisibilityChange::hide(asset.id.clone()))
                    .collect();
                platform
                    .set_visibility(&package.key, &changes, flavor)
                    .await?;
                report.hidden = changes.into_iter().map(|c| c.id).collect();
            }
            HideStrategy::PerAsset => {
                for asset in assets {
                    let change = [VisibilityChange::hide(asset.id.clone())];
                    match platform.set_visibility(&package.key, &change, flavor).await {
                        Ok(()) => {
                            debug!(asset = %asset.name, id = %asset.id, "asset hidden");
                            report.hidden.push(asset.id);
                        }
                        Err(e) if options.on_failure == AssetFailurePolicy::Skip => {
                            warn!(
                                asset = %asset.name,
                                id = %asset.id,
                                error = %e,
                                "could not hide asset, skipping"
                            );
                            report.failed.push(AssetFailure {
                                id: asset.id,
                                name: asset.name,
                                error: e.to_string(),
                            });
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }

    publish(platform, package).await?;

    info!(
        package = %package.name,
        hidden = report.hidden.len(),
        failed = report.failed.len(),
        "assets hidden and package published"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promotion::testing::{Call, FakePlatform, asset, view};

    fn options(
        scope: AssetScope,
        strategy: HideStrategy,
        on_failure: AssetFailurePolicy,
    ) -> HideOptions {
        HideOptions {
            scope,
            strategy,
            on_failure,
        }
    }

    fn platform() -> FakePlatform {
        FakePlatform::new("space-A")
            .with_package("dev-id", "dev-key", "DEVELOPMENT_X")
            .with_assets(
                "dev-key",
                vec![
                    view("v1", "Overview"),
                    view("v2", "Details"),
                    asset("k1", "Model", "KNOWLEDGE_MODEL"),
                ],
            )
    }

    fn dev_package(platform: &FakePlatform) -> Package {
        platform.package_named("DEVELOPMENT_X").unwrap()
    }

    #[test]
    fn test_select_assets_skips_package_root() {
        let root = ContentNode {
            id: "dev-id".to_string(),
            key: "dev-key".to_string(),
            name: "DEVELOPMENT_X".to_string(),
            node_type: "PACKAGE".to_string(),
            asset_type: None,
            root_node_key: None,
            space_id: None,
        };
        let nodes = vec![root, view("v1", "Overview"), asset("k1", "Model", "KNOWLEDGE_MODEL")];

        let all = select_assets(nodes.clone(), AssetScope::All);
        let views = select_assets(nodes, AssetScope::Views);

        assert_eq!(all.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(), vec!["v1", "k1"]);
        assert_eq!(views.iter().map(|n| n.id.as_str()).collect::<Vec<_>>(), vec!["v1"]);
    }

    #[tokio::test]
    async fn test_batch_hides_every_asset_in_one_call() {
        let platform = platform();
        let package = dev_package(&platform);

        let report = hide_assets(
            &platform,
            &package,
            options(AssetScope::All, HideStrategy::Batch, AssetFailurePolicy::Skip),
            Flavor::Studio,
        )
        .await
        .unwrap();

        assert_eq!(report.hidden, vec!["v1", "v2", "k1"]);
        assert!(report.is_complete());
        assert_eq!(
            platform.visibility_calls(),
            vec![vec!["v1".to_string(), "v2".to_string(), "k1".to_string()]]
        );
        assert!(platform.is_hidden("v1") && platform.is_hidden("v2") && platform.is_hidden("k1"));
        assert_eq!(platform.published(), vec!["DEVELOPMENT_X".to_string()]);
    }

    #[tokio::test]
    async fn test_views_scope_leaves_other_assets_visible() {
        let platform = platform();
        let package = dev_package(&platform);

        let report = hide_assets(
            &platform,
            &package,
            options(AssetScope::Views, HideStrategy::Batch, AssetFailurePolicy::Skip),
            Flavor::Studio,
        )
        .await
        .unwrap();

        assert_eq!(report.hidden, vec!["v1", "v2"]);
        assert!(!platform.is_hidden("k1"));
    }

    #[tokio::test]
    async fn test_batch_failure_is_fatal_and_skips_publish() {
        let platform = platform().fail_visibility_of("v2");
        let package = dev_package(&platform);

        let result = hide_assets(
            &platform,
            &package,
            options(AssetScope::All, HideStrategy::Batch, AssetFailurePolicy::Skip),
            Flavor::Studio,
        )
        .await;

        assert!(result.is_err());
        assert!(platform.published().is_empty());
    }

    #[tokio::test]
    async fn test_per_asset_skips_failed_asset_and_continues() {
        let platform = platform().fail_visibility_of("v2");
        let package = dev_package(&platform);

        let report = hide_assets(
            &platform,
            &package,
            options(AssetScope::All, HideStrategy::PerAsset, AssetFailurePolicy::Skip),
            Flavor::Studio,
        )
        .await
        .unwrap();

        assert_eq!(report.hidden, vec!["v1", "k1"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, "v2");
        assert_eq!(report.failed[0].name, "Details");
        assert!(!report.is_complete());
        assert_eq!(platform.visibility_calls().len(), 3);
        assert!(platform.is_hidden("k1"));
        assert_eq!(platform.published(), vec!["DEVELOPMENT_X".to_string()]);
    }

    #[tokio::test]
    async fn test_per_asset_abort_stops_at_first_failure() {
        let platform = platform().fail_visibility_of("v2");
        let package = dev_package(&platform);

        let result = hide_assets(
            &platform,
            &package,
            options(AssetScope::All, HideStrategy::PerAsset, AssetFailurePolicy::Abort),
            Flavor::Studio,
        )
        .await;

        assert!(matches!(result, Err(PromoteError::Api { .. })));
        assert_eq!(platform.visibility_calls().len(), 2);
        assert!(!platform.is_hidden("k1"));
        assert!(platform.published().is_empty());
    }

    #[tokio::test]
    async fn test_empty_package_is_still_published() {
        let platform =
            FakePlatform::new("space-A").with_package("dev-id", "dev-key", "DEVELOPMENT_X");
        let package = dev_package(&platform);

        let report = hide_assets(&platform, &package, HideOptions::default(), Flavor::Studio)
            .await
            .unwrap();

        assert!(report.hidden.is_empty());
        assert!(platform.visibility_calls().is_empty());
        assert_eq!(
            platform.calls().last(),
            Some(&Call::Publish("DEVELOPMENT_X".to_string()))
        );
    }
}
