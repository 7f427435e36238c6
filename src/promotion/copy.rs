//! Copying one package's content into another

use crate::core::error::PromoteError;
use crate::core::traits::{ContentNode, CopyPayload, Flavor, Package, StudioPlatform};
use tracing::info;

/// Build the copy request for copying `source` into `destination`
///
/// The destination's content is replaced and renamed to `new_name`.
pub fn build_copy_payload(
    source: &Package,
    destination: &Package,
    new_name: &str,
    team_domain: &str,
) -> CopyPayload {
    CopyPayload {
        node_id: source.id.clone(),
        node_id_to_replace: String::new(),
        node_key: source.key.clone(),
        root_key: source.key.clone(),
        team_domain: team_domain.to_string(),
        destination_root_id: destination.id.clone(),
        destination_root_key: destination.key.clone(),
        destination_space_id: destination.space_id.clone(),
        new_name: new_name.to_string(),
    }
}

/// Issue the copy request
///
/// Called once; a failure aborts the caller's workflow.
pub async fn copy_package(
    platform: &dyn StudioPlatform,
    payload: &CopyPayload,
    source_id: &str,
    flavor: Flavor,
) -> Result<ContentNode, PromoteError> {
    info!(
        source_id,
        destination = %payload.new_name,
        destination_id = %payload.destination_root_id,
        "copying package"
    );

    let node = platform.copy_node(source_id, payload, flavor).await?;

    info!(destination = %payload.new_name, node_id = %node.id, "package copied");
    Ok(node)
}
