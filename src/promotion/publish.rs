use crate::core::error::PromoteError;
use crate::core::traits::{Package, StudioPlatform};
use tracing::info;

/// Commit the package's current state so it is visible downstream
pub async fn publish(platform: &dyn StudioPlatform, package: &Package) -> Result<(), PromoteError> {
    info!(name = %package.name, key = %package.key, "publishing package");
    platform.publish(package).await
}
