pub mod core;
pub mod platform;
pub mod promotion;
pub mod security;

pub use core::*;
pub use platform::HttpStudioClient;
pub use promotion::{
    CopyReport, HideReport, PackageNames, PromotionReport, Promoter, ResolvePolicy,
    derive_package_names,
};
pub use security::SecureTokenManager;
