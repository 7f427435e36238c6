//! Secure token manager with memory-safe handling and masking capabilities
//!
//! The platform API token is held in a `secrecy::SecretString` so it never
//! shows up in `Debug` output, and any text about to be logged can be passed
//! through [`SecureTokenManager::mask_tokens_in_string`].

use crate::core::config::KeyType;
use secrecy::{ExposeSecret, SecretString};

/// Secure holder of the platform API token
///
/// # Examples
///
/// ```
/// use package_promoter::core::KeyType;
/// use package_promoter::security::SecureTokenManager;
/// use secrecy::SecretString;
///
/// let token = SecretString::new("abcdef123456".into());
/// let manager = SecureTokenManager::new(token, KeyType::UserKey);
/// assert_eq!(manager.masked(), "abc...456");
/// assert_eq!(
///     manager.mask_tokens_in_string("token abcdef123456 rejected"),
///     "token abc...456 rejected"
/// );
/// ```
pub struct SecureTokenManager {
    token: SecretString,
    key_type: KeyType,
}

impl SecureTokenManager {
    pub fn new(token: SecretString, key_type: KeyType) -> Self {
        Self { token, key_type }
    }

    /// Value of the `Authorization` header, e.g. `Bearer <token>`
    pub fn authorization(&self) -> SecretString {
        SecretString::new(
            format!("{} {}", self.key_type.auth_scheme(), self.token.expose_secret()).into(),
        )
    }

    /// The held token, masked
    pub fn masked(&self) -> String {
        Self::mask_token(self.token.expose_secret())
    }

    /// Masks a token for safe logging
    ///
    /// Shows only the first 3 and last 3 characters for identification purposes.
    /// Tokens shorter than 10 characters are fully masked as "****".
    pub fn mask_token(token: &str) -> String {
        if token.chars().count() < 10 {
            return "****".to_string();
        }

        let prefix: String = token.chars().take(3).collect();
        let suffix: String = token
            .chars()
            .rev()
            .take(3)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{}...{}", prefix, suffix)
    }

    /// Replaces every occurrence of the held token in `text` with its masked form
    pub fn mask_tokens_in_string(&self, text: &str) -> String {
        let token = self.token.expose_secret();
        if token.is_empty() {
            return text.to_string();
        }

        text.replace(token, &self.masked())
    }
}

impl std::fmt::Debug for SecureTokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureTokenManager")
            .field("token", &self.masked())
            .field("key_type", &self.key_type)
            .finish()
    }
}
