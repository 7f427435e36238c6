//! Naming rules for promoted packages

/// Prefix of the development copy
pub const DEVELOPMENT_PREFIX: &str = "DEVELOPMENT";

/// Prefix of the testing copy
pub const TESTING_PREFIX: &str = "TESTING";

/// Names of the packages derived from one production package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageNames {
    pub development: String,
    pub testing: String,
}

/// Derive the development and testing names from a production name
///
/// Spaces become underscores: `"My Report"` yields `DEVELOPMENT_My_Report`
/// and `TESTING_My_Report`.
pub fn derive_package_names(production_name: &str) -> PackageNames {
    let base = production_name.replace(' ', "_");

    PackageNames {
        development: format!("{}_{}", DEVELOPMENT_PREFIX, base),
        testing: format!("{}_{}", TESTING_PREFIX, base),
    }
}

/// Description given to packages created by the promoter
pub fn package_description(name: &str) -> String {
    let prefix = name.split('_').next().unwrap_or(name);
    format!("{} Package created via package-promoter.", prefix)
}
