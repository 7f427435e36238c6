//! In-memory platform used by the promotion tests
//!
//! Behaves like the real package manager where it matters to the workflow:
//! listings stay stale until the next `sync`, copies carry the source's
//! assets over, and calls can be made to fail.

use crate::core::error::PromoteError;
use crate::core::traits::{
    ContentNode, CopyPayload, Flavor, NewPackage, PACKAGE_NODE_TYPE, Package, StudioPlatform,
    VIEW_ASSET_TYPE, VisibilityChange,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// A remote call as seen by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Sync(String),
    Create(String),
    ContentNodes(String),
    Copy {
        source_id: String,
        destination_id: String,
        new_name: String,
    },
    Visibility {
        package_key: String,
        ids: Vec<String>,
    },
    Publish(String),
}

pub fn view(id: &str, name: &str) -> ContentNode {
    asset(id, name, VIEW_ASSET_TYPE)
}

pub fn asset(id: &str, name: &str, asset_type: &str) -> ContentNode {
    ContentNode {
        id: id.to_string(),
        key: id.to_string(),
        name: name.to_string(),
        node_type: "ASSET".to_string(),
        asset_type: Some(asset_type.to_string()),
        root_node_key: None,
        space_id: None,
    }
}

#[derive(Default)]
struct State {
    packages: Vec<Package>,
    descriptions: HashMap<String, String>,
    listing: Option<Vec<Package>>,
    assets: HashMap<String, Vec<ContentNode>>,
    hidden: HashSet<String>,
    calls: Vec<Call>,
    failing_visibility: HashSet<String>,
    failing_publish: HashSet<String>,
    failing_copy: bool,
}

pub struct FakePlatform {
    space_id: String,
    state: Mutex<State>,
}

impl FakePlatform {
    pub fn new(space_id: &str) -> Self {
        Self {
            space_id: space_id.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_package(self, id: &str, key: &str, name: &str) -> Self {
        self.state.lock().unwrap().packages.push(Package {
            id: id.to_string(),
            key: key.to_string(),
            name: name.to_string(),
            space_id: self.space_id.clone(),
        });
        self
    }

    pub fn with_assets(self, package_key: &str, assets: Vec<ContentNode>) -> Self {
        self.state
            .lock()
            .unwrap()
            .assets
            .insert(package_key.to_string(), assets);
        self
    }

    pub fn fail_visibility_of(self, asset_id: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_visibility
            .insert(asset_id.to_string());
        self
    }

    pub fn fail_publish_of(self, name: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_publish
            .insert(name.to_string());
        self
    }

    pub fn fail_copy(self) -> Self {
        self.state.lock().unwrap().failing_copy = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Names passed to `create_package`, in order
    pub fn created(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Create(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Names of successfully published packages, in order
    pub fn published(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::Publish(name) if !state.failing_publish.contains(name) => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn visibility_calls(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Visibility { ids, .. } => Some(ids),
                _ => None,
            })
            .collect()
    }

    pub fn is_hidden(&self, asset_id: &str) -> bool {
        self.state.lock().unwrap().hidden.contains(asset_id)
    }

    /// Current server-side state of the package named `name`
    pub fn package_named(&self, name: &str) -> Option<Package> {
        self.state
            .lock()
            .unwrap()
            .packages
            .iter()
            .find(|p| p.name == name)
            .cloned()
    }

    pub fn assets_of(&self, package_key: &str) -> Vec<ContentNode> {
        self.state
            .lock()
            .unwrap()
            .assets
            .get(package_key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn description_of(&self, name: &str) -> Option<String> {
        self.state.lock().unwrap().descriptions.get(name).cloned()
    }

    fn api_error(operation: &str, message: &str) -> PromoteError {
        PromoteError::Api {
            operation: operation.to_string(),
            status: 500,
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl StudioPlatform for FakePlatform {
    async fn sync(&self, space_id: &str) -> Result<(), PromoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Sync(space_id.to_string()));
        state.listing = Some(state.packages.clone());
        Ok(())
    }

    async fn packages(&self, space_id: &str) -> Result<Vec<Package>, PromoteError> {
        let mut state = self.state.lock().unwrap();
        if state.listing.is_none() {
            state.listing = Some(state.packages.clone());
        }
        Ok(state
            .listing
            .iter()
            .flatten()
            .filter(|p| p.space_id == space_id)
            .cloned()
            .collect())
    }

    async fn create_package(&self, package: &NewPackage) -> Result<(), PromoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create(package.name.clone()));
        let id = format!("id-{}", state.packages.len() + 1);
        state.packages.push(Package {
            id,
            key: package.key.clone(),
            name: package.name.clone(),
            space_id: package.space_id.clone(),
        });
        state
            .descriptions
            .insert(package.name.clone(), package.description.clone());
        Ok(())
    }

    async fn content_nodes(&self, package: &Package) -> Result<Vec<ContentNode>, PromoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ContentNodes(package.name.clone()));

        let root = ContentNode {
            id: package.id.clone(),
            key: package.key.clone(),
            name: package.name.clone(),
            node_type: PACKAGE_NODE_TYPE.to_string(),
            asset_type: None,
            root_node_key: Some(package.key.clone()),
            space_id: Some(package.space_id.clone()),
        };
        let mut nodes = vec![root];
        nodes.extend(state.assets.get(&package.key).cloned().unwrap_or_default());
        Ok(nodes)
    }

    async fn copy_node(
        &self,
        source_id: &str,
        payload: &CopyPayload,
        _flavor: Flavor,
    ) -> Result<ContentNode, PromoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Copy {
            source_id: source_id.to_string(),
            destination_id: payload.destination_root_id.clone(),
            new_name: payload.new_name.clone(),
        });

        if state.failing_copy {
            return Err(Self::api_error("copy_node", "copy failed"));
        }

        let copied: Vec<ContentNode> = state
            .assets
            .get(&payload.node_key)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|mut node| {
                node.id = format!("{}-{}", payload.destination_root_key, node.id);
                node
            })
            .collect();
        state
            .assets
            .insert(payload.destination_root_key.clone(), copied);

        Ok(ContentNode {
            id: payload.destination_root_id.clone(),
            key: payload.destination_root_key.clone(),
            name: payload.new_name.clone(),
            node_type: PACKAGE_NODE_TYPE.to_string(),
            asset_type: None,
            root_node_key: Some(payload.destination_root_key.clone()),
            space_id: Some(payload.destination_space_id.clone()),
        })
    }

    async fn set_visibility(
        &self,
        package_key: &str,
        changes: &[VisibilityChange],
        _flavor: Flavor,
    ) -> Result<(), PromoteError> {
        let mut state = self.state.lock().unwrap();
        let ids: Vec<String> = changes.iter().map(|c| c.id.clone()).collect();
        state.calls.push(Call::Visibility {
            package_key: package_key.to_string(),
            ids: ids.clone(),
        });

        if ids.iter().any(|id| state.failing_visibility.contains(id)) {
            return Err(Self::api_error("set_visibility", "visibility update failed"));
        }

        state.hidden.extend(ids);
        Ok(())
    }

    async fn publish(&self, package: &Package) -> Result<(), PromoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Publish(package.name.clone()));

        if state.failing_publish.contains(&package.name) {
            return Err(Self::api_error("publish", "publish failed"));
        }
        Ok(())
    }
}
