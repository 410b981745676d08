//! HTTP client with connection pooling, manual redirects and retry logic

use std::sync::Arc;
use std::time::Duration;

use husk_core::error::HuskError;
use husk_core::utils::verify_integrity;
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::{redirect, Client, ClientBuilder, Response, StatusCode};
use tracing::debug;
use url::Url;

use crate::api::PackageMetadata;
use crate::cache::MetadataCache;
use crate::RegistryResult;

/// Abbreviated metadata; carries everything resolution needs
const METADATA_ACCEPT: &str =
    "application/vnd.npm.install-v1+json; q=1.0, application/json; q=0.8, */*";
const TARBALL_ACCEPT: &str = "application/octet-stream, */*";

/// Redirect hops followed before a fetch fails
pub const MAX_REDIRECTS: usize = 5;

/// Configuration for exponential backoff retry logic
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

/// Client construction options
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    pub retry: RetryConfig,
    /// Idle keep-alive connections kept per host
    pub pool_max_idle_per_host: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: "https://registry.npmjs.org".to_string(),
            timeout: Duration::from_secs(60),
            retry: RetryConfig::default(),
            pool_max_idle_per_host: 32,
        }
    }
}

/// Registry client. Clones share the connection pool and the metadata cache.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    retry_config: RetryConfig,
    base_url: String,
    cache: Arc<MetadataCache>,
}

impl RegistryClient {
    /// Client for the public registry with default options
    pub fn new() -> RegistryResult<Self> {
        Self::with_options(ClientOptions::default())
    }

    pub fn with_options(options: ClientOptions) -> RegistryResult<Self> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(options.pool_max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(options.timeout)
            // Redirects are followed by hand so the hop limit is ours.
            .redirect(redirect::Policy::none())
            .gzip(true)
            .user_agent(concat!("husk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HuskError::network(format!("Failed to create HTTP client: {}", e), e))?;

        Ok(Self {
            client,
            retry_config: options.retry,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            cache: Arc::new(MetadataCache::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Execute an operation with exponential backoff; only transport errors retry
    async fn with_retry<F, Fut, T>(&self, operation: F) -> RegistryResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = RegistryResult<T>>,
    {
        let mut delay = self.retry_config.initial_delay;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    if !error.is_recoverable() || attempt >= self.retry_config.max_retries {
                        return Err(error);
                    }
                    attempt += 1;
                    debug!("retrying after error (attempt {}): {}", attempt, error);

                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(
                        Duration::from_millis(
                            (delay.as_millis() as f64 * self.retry_config.multiplier) as u64,
                        ),
                        self.retry_config.max_delay,
                    );
                },
            }
        }
    }

    /// GET `url`, following at most `MAX_REDIRECTS` 3xx hops
    async fn get_following_redirects(&self, url: &Url, accept: &str) -> RegistryResult<Response> {
        let mut current = url.clone();

        for hop in 0..=MAX_REDIRECTS {
            let response = self
                .client
                .get(current.clone())
                .header(ACCEPT, accept)
                .send()
                .await
                .map_err(|e| HuskError::network(format!("GET {} failed: {}", current, e), e))?;

            if !response.status().is_redirection() {
                return Ok(response);
            }

            let status = response.status().as_u16();
            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| HuskError::RegistryStatus {
                    name: current.to_string(),
                    status,
                })?;

            let next = current.join(location).map_err(|e| {
                HuskError::network(format!("Invalid redirect target '{}'", location), e)
            })?;
            debug!("redirect {} ({}): {} -> {}", hop + 1, status, current, next);
            current = next;
        }

        Err(HuskError::TooManyRedirects {
            url: url.to_string(),
            limit: MAX_REDIRECTS,
        })
    }

    /// Fetch package metadata, at most once per name for the client's lifetime
    pub async fn fetch_metadata(&self, package_name: &str) -> RegistryResult<Arc<PackageMetadata>> {
        if let Some(cached) = self.cache.get(package_name) {
            return Ok(cached);
        }

        let url = self.metadata_url(package_name)?;
        let metadata = self
            .with_retry(|| async {
                let response = self.get_following_redirects(&url, METADATA_ACCEPT).await?;

                match response.status() {
                    StatusCode::OK => {},
                    StatusCode::NOT_FOUND => {
                        return Err(HuskError::PackageNotFound {
                            name: package_name.to_string(),
                        })
                    },
                    status => {
                        return Err(HuskError::RegistryStatus {
                            name: package_name.to_string(),
                            status: status.as_u16(),
                        })
                    },
                }

                let body = response.bytes().await.map_err(|e| {
                    HuskError::network(format!("Failed to read metadata for {}: {}", package_name, e), e)
                })?;

                serde_json::from_slice::<PackageMetadata>(&body).map_err(|e| HuskError::JsonParse {
                    message: format!("metadata for {}: {}", package_name, e),
                })
            })
            .await?;

        debug!(
            "fetched metadata for {} ({} versions)",
            package_name,
            metadata.versions.len()
        );
        Ok(self.cache.insert(package_name, metadata))
    }

    /// Download a tarball and check it against `integrity` (empty skips the check)
    pub async fn download_tarball(
        &self,
        package: &str,
        tarball_url: &str,
        integrity: &str,
    ) -> RegistryResult<Vec<u8>> {
        let url = Url::parse(tarball_url)
            .map_err(|e| HuskError::network(format!("Invalid tarball URL '{}'", tarball_url), e))?;

        let bytes = self
            .with_retry(|| async {
                let response = self.get_following_redirects(&url, TARBALL_ACCEPT).await?;

                if response.status() != StatusCode::OK {
                    return Err(HuskError::RegistryStatus {
                        name: package.to_string(),
                        status: response.status().as_u16(),
                    });
                }

                response
                    .bytes()
                    .await
                    .map(|b| b.to_vec())
                    .map_err(|e| HuskError::network(format!("Failed to read tarball for {}: {}", package, e), e))
            })
            .await?;

        verify_integrity(package, &bytes, integrity)?;
        debug!("downloaded {} ({} bytes)", package, bytes.len());
        Ok(bytes)
    }

    fn metadata_url(&self, package_name: &str) -> RegistryResult<Url> {
        let raw = format!("{}/{}", self.base_url, encode_package_name(package_name));
        Url::parse(&raw).map_err(|e| HuskError::network(format!("Invalid registry URL '{}'", raw), e))
    }
}

/// Encode package name for a registry path: `@scope/pkg` becomes `@scope%2fpkg`
pub fn encode_package_name(name: &str) -> String {
    if name.starts_with('@') {
        name.replacen('/', "%2f", 1)
    } else {
        name.to_string()
    }
}
