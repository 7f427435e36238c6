//! Package lookup and idempotent creation
//!
//! Packages are matched by name within a space. Running the promotion twice
//! reuses the packages created by the first run instead of creating new ones.

use crate::core::error::PromoteError;
use crate::core::traits::{Lookup, LookupField, NewPackage, Package, StudioPlatform};
use crate::promotion::naming::package_description;
use crate::promotion::publish::publish;
use tracing::{info, warn};
use uuid::Uuid;

/// How an existing package is treated by [`resolve_or_create_package`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolvePolicy {
    /// Publish a package that already exists; a failure is only logged
    pub republish_existing: bool,
}

/// A resolved package and whether this run created it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub package: Package,
    pub created: bool,
}

/// Find the first package whose `field` equals `value`
pub fn find_package(packages: &[Package], value: &str, field: LookupField) -> Lookup {
    packages
        .iter()
        .find(|package| match field {
            LookupField::Name => package.name == value,
            LookupField::Key => package.key == value,
        })
        .cloned()
        .map_or(Lookup::NotFound, Lookup::Found)
}

/// Return the package named `name` in `space_id`, creating it if needed
///
/// A new package gets a random key and a description derived from its name.
/// After creation the space is resynced, the package is looked up again and
/// published.
pub async fn resolve_or_create_package(
    platform: &dyn StudioPlatform,
    space_id: &str,
    name: &str,
    policy: ResolvePolicy,
) -> Result<Resolution, PromoteError> {
    let packages = platform.packages(space_id).await?;

    if let Lookup::Found(package) = find_package(&packages, name, LookupField::Name) {
        info!(name, id = %package.id, "package already exists");

        if policy.republish_existing {
            if let Err(e) = publish(platform, &package).await {
                warn!(name, error = %e, "failed to republish existing package, continuing");
            }
        }

        return Ok(Resolution {
            package,
            created: false,
        });
    }

    let new_package = NewPackage {
        name: name.to_string(),
        key: Uuid::new_v4().to_string(),
        description: package_description(name),
        space_id: space_id.to_string(),
    };
    info!(name, key = %new_package.key, "creating package");
    platform.create_package(&new_package).await?;

    platform.sync(space_id).await?;
    let packages = platform.packages(space_id).await?;
    let package = find_package(&packages, name, LookupField::Name)
        .into_option()
        .ok_or_else(|| PromoteError::PackageMissingAfterCreate {
            name: name.to_string(),
        })?;

    publish(platform, &package).await?;

    Ok(Resolution {
        package,
        created: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::MockStudioPlatform;
    use crate::promotion::testing::FakePlatform;

    fn package(id: &str, key: &str, name: &str) -> Package {
        Package {
            id: id.to_string(),
            key: key.to_string(),
            name: name.to_string(),
            space_id: "space-A".to_string(),
        }
    }

    #[test]
    fn test_find_package_by_name_and_key() {
        let packages = vec![
            package("1", "prod-1", "Sales Pipeline"),
            package("2", "dev-1", "DEVELOPMENT_Sales_Pipeline"),
        ];

        assert_eq!(
            find_package(&packages, "prod-1", LookupField::Key),
            Lookup::Found(packages[0].clone())
        );
        assert_eq!(
            find_package(&packages, "DEVELOPMENT_Sales_Pipeline", LookupField::Name),
            Lookup::Found(packages[1].clone())
        );
        assert_eq!(
            find_package(&packages, "prod-1", LookupField::Name),
            Lookup::NotFound
        );
    }

    #[test]
    fn test_find_package_first_match_wins() {
        let packages = vec![package("1", "a", "Dup"), package("2", "b", "Dup")];

        let found = find_package(&packages, "Dup", LookupField::Name).into_option();
        assert_eq!(found.map(|p| p.id), Some("1".to_string()));
    }

    #[test]
    fn test_find_package_in_empty_listing() {
        assert_eq!(find_package(&[], "x", LookupField::Key), Lookup::NotFound);
    }

    #[tokio::test]
    async fn test_resolve_creates_and_publishes_missing_package() {
        let platform = FakePlatform::new("space-A");

        let resolution = resolve_or_create_package(
            &platform,
            "space-A",
            "DEVELOPMENT_My_Report",
            ResolvePolicy::default(),
        )
        .await
        .unwrap();

        assert!(resolution.created);
        assert_eq!(resolution.package.name, "DEVELOPMENT_My_Report");
        assert_eq!(platform.created(), vec!["DEVELOPMENT_My_Report".to_string()]);
        assert_eq!(platform.published(), vec!["DEVELOPMENT_My_Report".to_string()]);
        assert!(Uuid::parse_str(&resolution.package.key).is_ok());
        assert_eq!(
            platform.description_of("DEVELOPMENT_My_Report").as_deref(),
            Some("DEVELOPMENT Package created via package-promoter.")
        );
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let platform = FakePlatform::new("space-A");

        let policy = ResolvePolicy::default();

        let first = resolve_or_create_package(&platform, "space-A", "TESTING_X", policy)
            .await
            .unwrap();
        let second = resolve_or_create_package(&platform, "space-A", "TESTING_X", policy)
            .await
            .unwrap();

        assert_eq!(first.package.id, second.package.id);
        assert!(first.created);
        assert!(!second.created);
        assert_eq!(platform.created().len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_existing_package_is_not_republished_by_default() {
        let platform =
            FakePlatform::new("space-A").with_package("dev-id", "dev-key", "DEVELOPMENT_X");

        let policy = ResolvePolicy::default();

        let resolution = resolve_or_create_package(&platform, "space-A", "DEVELOPMENT_X", policy)
            .await
            .unwrap();

        assert_eq!(resolution.package.id, "dev-id");
        assert!(platform.created().is_empty());
        assert!(platform.published().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_republishes_existing_when_requested() {
        let platform =
            FakePlatform::new("space-A").with_package("dev-id", "dev-key", "DEVELOPMENT_X");
        let policy = ResolvePolicy {
            republish_existing: true,
        };

        resolve_or_create_package(&platform, "space-A", "DEVELOPMENT_X", policy)
            .await
            .unwrap();

        assert_eq!(platform.published(), vec!["DEVELOPMENT_X".to_string()]);
    }

    #[tokio::test]
    async fn test_republish_failure_of_existing_package_is_tolerated() {
        let mut platform = MockStudioPlatform::new();
        platform
            .expect_packages()
            .returning(|_| Ok(vec![package("dev-id", "dev-key", "DEVELOPMENT_X")]));
        platform.expect_publish().times(1).returning(|_| {
            Err(PromoteError::Api {
                operation: "publish".to_string(),
                status: 409,
                message: "nothing to publish".to_string(),
            })
        });
        platform.expect_create_package().never();

        let policy = ResolvePolicy {
            republish_existing: true,
        };
        let resolution = resolve_or_create_package(&platform, "space-A", "DEVELOPMENT_X", policy)
            .await
            .unwrap();

        assert_eq!(resolution.package.id, "dev-id");
        assert!(!resolution.created);
    }

    #[tokio::test]
    async fn test_publish_failure_of_new_package_is_fatal() {
        let platform = FakePlatform::new("space-A").fail_publish_of("TESTING_X");

        let result =
            resolve_or_create_package(&platform, "space-A", "TESTING_X", ResolvePolicy::default())
                .await;

        assert!(matches!(result, Err(PromoteError::Api { .. })));
        assert_eq!(platform.created().len(), 1);
    }

    #[tokio::test]
    async fn test_package_missing_after_create() {
        let mut platform = MockStudioPlatform::new();
        platform.expect_packages().returning(|_| Ok(Vec::new()));
        platform.expect_create_package().times(1).returning(|_| Ok(()));
        platform.expect_sync().times(1).returning(|_| Ok(()));
        platform.expect_publish().never();

        let result =
            resolve_or_create_package(&platform, "space-A", "TESTING_X", ResolvePolicy::default())
                .await;

        assert!(matches!(
            result,
            Err(PromoteError::PackageMissingAfterCreate { ref name }) if name == "TESTING_X"
        ));
    }

    #[tokio::test]
    async fn test_listing_failure_propagates() {
        let mut platform = MockStudioPlatform::new();
        platform.expect_packages().returning(|_| {
            Err(PromoteError::AuthenticationFailed {
                operation: "list_packages".to_string(),
                message: "expired".to_string(),
            })
        });
        platform.expect_create_package().never();

        let result =
            resolve_or_create_package(&platform, "space-A", "TESTING_X", ResolvePolicy::default())
                .await;

        assert!(matches!(result, Err(PromoteError::AuthenticationFailed { .. })));
    }
}
