//! Promotion orchestrator
//!
//! Runs the production → development → testing pipeline:
//! 1. Find the production package by key
//! 2. Derive the development and testing names
//! 3. Find or create both packages
//! 4. Copy production into development
//! 5. Hide development's assets and publish it
//! 6. Copy development into testing
//! 7. Publish testing
//!
//! Package handles go stale after every mutating call, so the space is
//! resynced and the handle looked up again before it is reused.

use crate::core::config::{HideOptions, Settings};
use crate::core::error::PromoteError;
use crate::core::state_machine::{PackageRole, PromotionStage, PromotionTracker};
use crate::core::traits::{Flavor, Lookup, LookupField, Package, StudioPlatform};
use crate::promotion::assets::{HideReport, hide_assets};
use crate::promotion::copy::{build_copy_payload, copy_package};
use crate::promotion::naming::{PackageNames, derive_package_names};
use crate::promotion::publish::publish;
use crate::promotion::resolver::{ResolvePolicy, find_package, resolve_or_create_package};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Result of a full promotion
#[derive(Debug, Clone)]
pub struct PromotionReport {
    pub production: Package,
    pub development: Package,
    pub testing: Package,
    pub names: PackageNames,
    pub development_created: bool,
    pub testing_created: bool,
    pub hide: HideReport,
    pub tracker: PromotionTracker,
    pub duration_ms: u64,
}

/// Result of copying one named package into another
#[derive(Debug, Clone)]
pub struct CopyReport {
    pub source: Package,
    pub destination: Package,
    pub hide: HideReport,
    pub duration_ms: u64,
}

/// Drives the promotion workflow against a platform
pub struct Promoter {
    platform: Arc<dyn StudioPlatform>,
    space_id: String,
    team_domain: String,
    flavor: Flavor,
    hide: HideOptions,
    policy: ResolvePolicy,
}

impl Promoter {
    pub fn new(
        platform: Arc<dyn StudioPlatform>,
        space_id: impl Into<String>,
        team_domain: impl Into<String>,
    ) -> Self {
        Self {
            platform,
            space_id: space_id.into(),
            team_domain: team_domain.into(),
            flavor: Flavor::default(),
            hide: HideOptions::default(),
            policy: ResolvePolicy::default(),
        }
    }

    pub fn from_settings(platform: Arc<dyn StudioPlatform>, settings: &Settings) -> Self {
        Self::new(platform, settings.space_id.clone(), settings.team_domain.clone())
            .with_flavor(settings.flavor)
            .with_hide_options(settings.hide)
            .with_policy(ResolvePolicy {
                republish_existing: settings.republish_existing,
            })
    }

    pub fn with_flavor(mut self, flavor: Flavor) -> Self {
        self.flavor = flavor;
        self
    }

    pub fn with_hide_options(mut self, hide: HideOptions) -> Self {
        self.hide = hide;
        self
    }

    pub fn with_policy(mut self, policy: ResolvePolicy) -> Self {
        self.policy = policy;
        self
    }

    fn platform(&self) -> &dyn StudioPlatform {
        self.platform.as_ref()
    }

    /// Resync the space and look `value` up in the fresh listing
    async fn refetch(&self, value: &str, field: LookupField) -> Result<Package, PromoteError> {
        self.platform().sync(&self.space_id).await?;
        self.lookup(value, field).await
    }

    /// Look `value` up in the current listing
    async fn lookup(&self, value: &str, field: LookupField) -> Result<Package, PromoteError> {
        let packages = self.platform().packages(&self.space_id).await?;
        match find_package(&packages, value, field) {
            Lookup::Found(package) => Ok(package),
            Lookup::NotFound => Err(PromoteError::PackageNotFound {
                field: field.to_string(),
                value: value.to_string(),
                space_id: self.space_id.clone(),
            }),
        }
    }

    /// Promote the production package `production_key`
    pub async fn promote(&self, production_key: &str) -> Result<PromotionReport, PromoteError> {
        let start = Instant::now();
        let mut tracker = PromotionTracker::new();
        let platform = self.platform();

        // 1. Production package
        info!(
            space_id = %self.space_id,
            key = production_key,
            "Step 1/7: locating production package"
        );
        let production = self.refetch(production_key, LookupField::Key).await?;
        tracker.transition(
            PackageRole::Production,
            PromotionStage::Published,
            Some(production.name.clone()),
        )?;

        // 2. Names
        let names = derive_package_names(&production.name);
        info!(
            production = %production.name,
            development = %names.development,
            testing = %names.testing,
            "Step 2/7: derived package names"
        );

        // 3. Development and testing packages
        info!("Step 3/7: resolving development and testing packages");
        let development =
            resolve_or_create_package(platform, &self.space_id, &names.development, self.policy)
                .await?;
        let development_created = development.created;
        tracker.transition(
            PackageRole::Development,
            PromotionStage::Created,
            Some(resolution_detail(development_created)),
        )?;
        let testing =
            resolve_or_create_package(platform, &self.space_id, &names.testing, self.policy).await?;
        let testing_created = testing.created;
        tracker.transition(
            PackageRole::Testing,
            PromotionStage::Created,
            Some(resolution_detail(testing_created)),
        )?;

        // 4. Production -> development
        info!("Step 4/7: copying production into development");
        let payload = build_copy_payload(
            &production,
            &development.package,
            &names.development,
            &self.team_domain,
        );
        copy_package(platform, &payload, &production.id, self.flavor).await?;
        tracker.transition(PackageRole::Development, PromotionStage::Copied, None)?;

        // 5. Hide and publish development
        info!("Step 5/7: hiding development assets");
        let development = self.refetch(&names.development, LookupField::Name).await?;
        let hide = hide_assets(platform, &development, self.hide, self.flavor).await?;
        tracker.transition(
            PackageRole::Development,
            PromotionStage::Hidden,
            Some(format!("{} hidden, {} skipped", hide.hidden.len(), hide.failed.len())),
        )?;
        tracker.transition(PackageRole::Development, PromotionStage::Published, None)?;

        // 6. Development -> testing
        info!("Step 6/7: copying development into testing");
        let development = self.refetch(&names.development, LookupField::Name).await?;
        let testing_target = self.lookup(&names.testing, LookupField::Name).await?;
        let payload = build_copy_payload(
            &development,
            &testing_target,
            &names.testing,
            &self.team_domain,
        );
        copy_package(platform, &payload, &development.id, self.flavor).await?;
        tracker.transition(PackageRole::Testing, PromotionStage::Copied, None)?;

        // 7. Publish testing
        info!("Step 7/7: publishing testing");
        let testing_package = self.refetch(&names.testing, LookupField::Name).await?;
        publish(platform, &testing_package).await?;
        tracker.transition(PackageRole::Testing, PromotionStage::Published, None)?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            production = %production.name,
            development = %development.name,
            testing = %testing_package.name,
            duration_ms,
            "promotion complete"
        );

        Ok(PromotionReport {
            production,
            development,
            testing: testing_package,
            names,
            development_created,
            testing_created,
            hide,
            tracker,
            duration_ms,
        })
    }

    /// Copy the package named `source_name` into `destination_name`
    ///
    /// Both packages must exist. The source's assets are hidden and the source
    /// published before the copy; the destination is published afterwards.
    pub async fn copy_between(
        &self,
        source_name: &str,
        destination_name: &str,
    ) -> Result<CopyReport, PromoteError> {
        let start = Instant::now();
        let platform = self.platform();

        info!(source = source_name, destination = destination_name, "copying package");
        let source = self.refetch(source_name, LookupField::Name).await?;
        self.lookup(destination_name, LookupField::Name).await?;

        let hide = hide_assets(platform, &source, self.hide, self.flavor).await?;

        let source = self.refetch(source_name, LookupField::Name).await?;
        let destination = self.lookup(destination_name, LookupField::Name).await?;
        let payload =
            build_copy_payload(&source, &destination, destination_name, &self.team_domain);
        copy_package(platform, &payload, &source.id, self.flavor).await?;

        let destination = self.refetch(destination_name, LookupField::Name).await?;
        publish(platform, &destination).await?;

        Ok(CopyReport {
            source,
            destination,
            hide,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Hide the assets of the package named `name` and publish it
    pub async fn hide_and_publish(&self, name: &str) -> Result<HideReport, PromoteError> {
        let package = self.refetch(name, LookupField::Name).await?;
        hide_assets(self.platform(), &package, self.hide, self.flavor).await
    }
}

fn resolution_detail(created: bool) -> String {
    let detail = if created { "created" } else { "existing" };
    detail.to_string()
}
