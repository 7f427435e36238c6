//! HTTP client for the platform's package-manager API
//!
//! Implements [`StudioPlatform`] on top of `reqwest`. Package listings are
//! cached per space and only refreshed by [`StudioPlatform::sync`], so a
//! listing obtained before a mutating call keeps showing the old state until
//! the caller resyncs.

use crate::core::config::Settings;
use crate::core::error::PromoteError;
use crate::core::retry::{RetryManager, RetryOptions};
use crate::core::traits::{
    ContentNode, CopyPayload, Flavor, NewPackage, PACKAGE_NODE_TYPE, Package, StudioPlatform,
    VisibilityChange,
};
use crate::security::SecureTokenManager;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, header};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

const API_ROOT: &str = "/package-manager/api";

/// Summary attached to every publish
const PUBLISH_SUMMARY: &str = "Published by package-promoter";

/// Package as returned by the listing endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageTransport {
    id: String,
    key: String,
    name: String,
    #[serde(default)]
    space_id: Option<String>,
}

/// Body of the package creation endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePackageTransport<'a> {
    name: &'a str,
    key: &'a str,
    root_node_key: &'a str,
    description: &'a str,
    space_id: &'a str,
    node_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct PackageVersionTransport {
    version: String,
}

/// Body of the package activation endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActivatePackageTransport<'a> {
    package_key: &'a str,
    version: &'a str,
    summary_of_changes: &'static str,
}

/// Package-manager client over HTTP
pub struct HttpStudioClient {
    client: Client,
    base_url: String,
    tokens: SecureTokenManager,
    retry: RetryManager,
    listings: RwLock<HashMap<String, Vec<Package>>>,
}

impl HttpStudioClient {
    /// Create a client for `base_url` (the team URL, without trailing slash)
    pub fn new(
        base_url: impl Into<String>,
        tokens: SecureTokenManager,
        timeout: Duration,
    ) -> Result<Self, PromoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PromoteError::Network {
                operation: "connect".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
            retry: RetryManager::new(RetryOptions::none()),
            listings: RwLock::new(HashMap::new()),
        })
    }

    /// Create a client from resolved settings
    pub fn from_settings(settings: &Settings) -> Result<Self, PromoteError> {
        let token = SecretString::new(settings.api_token.expose_secret().into());
        let client = Self::new(
            settings.base_url.clone(),
            SecureTokenManager::new(token, settings.key_type),
            settings.request_timeout,
        )?;
        Ok(client.with_retry(settings.retry.clone()))
    }

    /// Retry read-only calls with the given backoff
    pub fn with_retry(mut self, options: RetryOptions) -> Self {
        self.retry = RetryManager::new(options);
        self
    }

    /// Make a request and return the raw response, mapping failures
    async fn send<B>(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<Response, PromoteError>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(
            request_type = %method,
            path = %path,
            tracking_type = "API_REQUEST",
            "Request: '{}' -> '{}'",
            method,
            path
        );

        let mut request = self.client.request(method, &url).query(query);
        request = self.add_auth_header(request);

        if let Some(body) = body {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .json(body);
        }

        let response = request.send().await.map_err(|e| {
            error!(
                operation,
                "request failed: {}",
                self.tokens.mask_tokens_in_string(&e.to_string())
            );
            if e.is_timeout() {
                PromoteError::Timeout {
                    operation: operation.to_string(),
                }
            } else {
                PromoteError::Network {
                    operation: operation.to_string(),
                    message: self.tokens.mask_tokens_in_string(&e.to_string()),
                }
            }
        })?;

        self.check_status(operation, response).await
    }

    /// Add authentication header to request
    fn add_auth_header(&self, request: RequestBuilder) -> RequestBuilder {
        let authorization = self.tokens.authorization();
        match header::HeaderValue::from_str(authorization.expose_secret()) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.header(header::AUTHORIZATION, value)
            }
            // Not a valid header value; the platform will answer 401
            Err(_) => request,
        }
    }

    /// Turn non-2xx responses into errors
    async fn check_status(
        &self,
        operation: &str,
        response: Response,
    ) -> Result<Response, PromoteError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let status_code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = self.tokens.mask_tokens_in_string(&error_message(&body));
        error!(operation, status = status_code, "request failed: {}", message);

        let operation = operation.to_string();
        Err(match status_code {
            401 | 403 => PromoteError::AuthenticationFailed { operation, message },
            404 => PromoteError::NotFound { operation, message },
            _ => PromoteError::Api {
                operation,
                status: status_code,
                message,
            },
        })
    }

    async fn request_json<B, T>(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T, PromoteError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.send(operation, method, path, query, body).await?;
        response.json().await.map_err(|e| PromoteError::Decode {
            operation: operation.to_string(),
            message: e.to_string(),
        })
    }

    async fn request_empty<B>(
        &self,
        operation: &str,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<(), PromoteError>
    where
        B: Serialize + ?Sized,
    {
        let response = self.send(operation, method, path, query, body).await?;
        // Drain the body so the connection can be reused
        let _ = response.bytes().await;
        Ok(())
    }

    async fn fetch_packages(&self, space_id: &str) -> Result<Vec<Package>, PromoteError> {
        let path = format!("{}/packages", API_ROOT);
        let transports: Vec<PackageTransport> = self
            .request_json(
                "list_packages",
                Method::GET,
                &path,
                &[("spaceId", space_id)],
                None::<&()>,
            )
            .await?;

        Ok(transports
            .into_iter()
            .map(|p| Package {
                id: p.id,
                key: p.key,
                name: p.name,
                space_id: p.space_id.unwrap_or_else(|| space_id.to_string()),
            })
            .collect())
    }
}

/// The `message` field of a JSON error body, or the body itself
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[async_trait]
impl StudioPlatform for HttpStudioClient {
    async fn sync(&self, space_id: &str) -> Result<(), PromoteError> {
        let packages = self
            .retry
            .retry("sync", || self.fetch_packages(space_id))
            .await?;
        debug!(space_id, packages = packages.len(), "space synchronized");
        self.listings
            .write()
            .await
            .insert(space_id.to_string(), packages);
        Ok(())
    }

    async fn packages(&self, space_id: &str) -> Result<Vec<Package>, PromoteError> {
        if let Some(packages) = self.listings.read().await.get(space_id) {
            return Ok(packages.clone());
        }

        self.sync(space_id).await?;
        Ok(self
            .listings
            .read()
            .await
            .get(space_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_package(&self, package: &NewPackage) -> Result<(), PromoteError> {
        let path = format!("{}/packages", API_ROOT);
        let body = CreatePackageTransport {
            name: &package.name,
            key: &package.key,
            root_node_key: &package.key,
            description: &package.description,
            space_id: &package.space_id,
            node_type: PACKAGE_NODE_TYPE,
        };

        self.request_empty("create_package", Method::POST, &path, &[], Some(&body))
            .await?;
        info!(name = %package.name, key = %package.key, "package created");
        Ok(())
    }

    async fn content_nodes(&self, package: &Package) -> Result<Vec<ContentNode>, PromoteError> {
        let path = format!("{}/nodes/by-package-key/{}", API_ROOT, package.key);
        self.retry
            .retry("content_nodes", || {
                self.request_json("content_nodes", Method::GET, &path, &[], None::<&()>)
            })
            .await
    }

    async fn copy_node(
        &self,
        source_id: &str,
        payload: &CopyPayload,
        flavor: Flavor,
    ) -> Result<ContentNode, PromoteError> {
        let path = format!("{}/nodes/{}/copy", API_ROOT, source_id);
        self.request_json(
            "copy_node",
            Method::POST,
            &path,
            &[("flavor", flavor.as_str())],
            Some(payload),
        )
        .await
    }

    async fn set_visibility(
        &self,
        package_key: &str,
        changes: &[VisibilityChange],
        flavor: Flavor,
    ) -> Result<(), PromoteError> {
        let path = format!("{}/nodes/{}/visibility", API_ROOT, package_key);
        self.request_empty(
            "set_visibility",
            Method::PUT,
            &path,
            &[("flavor", flavor.as_str())],
            Some(changes),
        )
        .await
    }

    async fn publish(&self, package: &Package) -> Result<(), PromoteError> {
        let version_path = format!("{}/packages/{}/next-version", API_ROOT, package.id);
        let next: PackageVersionTransport = self
            .request_json("next_version", Method::GET, &version_path, &[], None::<&()>)
            .await?;

        let activate_path = format!("{}/packages/{}/activate", API_ROOT, package.id);
        let body = ActivatePackageTransport {
            package_key: &package.key,
            version: &next.version,
            summary_of_changes: PUBLISH_SUMMARY,
        };
        self.request_empty("publish", Method::POST, &activate_path, &[], Some(&body))
            .await?;

        info!(name = %package.name, version = %next.version, "package published");
        Ok(())
    }
}
