//! Remote registry access.
//!
//! [`Registry`] is the seam between the engine and the network: the engine
//! only ever needs the full name listing, one package's latest manifest, and
//! an archive download. [`RegistryClient`] implements it over HTTP(S).

use std::fmt;
use std::future::Future;

use camino::Utf8Path;
use futures_util::StreamExt;
use serde::de::{Deserializer, IgnoredAny, MapAccess, Visitor};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::FetchError;

/// Reserved listing key that is not a package.
const LISTING_UPDATED_KEY: &str = "__updated";

/// Source of package names, manifests and archives.
pub trait Registry {
    /// Fetches every package name in the registry, in listing order.
    fn fetch_listing(&self) -> impl Future<Output = Result<Vec<String>, FetchError>>;

    /// Fetches the manifest of a package's `latest` version.
    fn fetch_manifest(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<serde_json::Value, FetchError>>;

    /// Downloads an archive to `dest`, replacing any file already there.
    fn download_archive(
        &self,
        url: &str,
        dest: &Utf8Path,
    ) -> impl Future<Output = Result<(), FetchError>>;
}

/// HTTP client for an npm-compatible registry.
///
/// # Examples
///
/// ```no_run
/// use ms_scanner::{Registry, RegistryClient};
///
/// # async fn run() -> Result<(), ms_scanner::FetchError> {
/// let client = RegistryClient::new("https://registry.npmjs.org")?;
/// let manifest = client.fetch_manifest("left-pad").await?;
/// println!("{}", manifest["dist"]["tarball"]);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: reqwest::Client,
    base_url: String,
}

impl RegistryClient {
    /// Creates a client for the registry at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("modspec/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Returns the URL of a package's `latest` manifest.
    #[must_use]
    pub fn manifest_url(&self, name: &str) -> String {
        format!("{}/{}/latest", self.base_url, encode_package_name(name))
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, FetchError> {
        let response = self.client.get(url).send().await?;
        check_status(url, response.status())?;
        Ok(response)
    }
}

impl Registry for RegistryClient {
    async fn fetch_listing(&self) -> Result<Vec<String>, FetchError> {
        let url = format!("{}/-/all", self.base_url);
        debug!(url = %url, "Fetching registry listing");

        let body = self.get(&url).await?.bytes().await?;
        parse_listing(&body).map_err(|source| FetchError::Decode { url, source })
    }

    async fn fetch_manifest(&self, name: &str) -> Result<serde_json::Value, FetchError> {
        let url = self.manifest_url(name);
        let body = self.get(&url).await?.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| FetchError::Decode { url, source })
    }

    async fn download_archive(
        &self,
        url: &str,
        dest: &Utf8Path,
    ) -> Result<(), FetchError> {
        let response = self.get(url).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;

        Ok(())
    }
}

fn check_status(url: &str, status: reqwest::StatusCode) -> Result<(), FetchError> {
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound {
            url: url.to_owned(),
        });
    }
    if status != reqwest::StatusCode::OK {
        return Err(FetchError::Status {
            code: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown").to_owned(),
            url: url.to_owned(),
        });
    }
    Ok(())
}

/// Encodes a package name for use as a URL path segment.
///
/// Scoped names keep their `@` but escape the separating slash.
///
/// # Examples
///
/// ```
/// use ms_scanner::registry::encode_package_name;
///
/// assert_eq!(encode_package_name("@babel/core"), "@babel%2fcore");
/// assert_eq!(encode_package_name("left-pad"), "left-pad");
/// ```
#[must_use]
pub fn encode_package_name(name: &str) -> String {
    name.replace('/', "%2f")
}

/// Reads the package names out of a registry listing.
///
/// Only the object keys are kept; per-package metadata is skipped without
/// being materialized, and the reserved `__updated` key is dropped.
///
/// # Errors
///
/// Returns an error if the body is not a JSON object.
pub fn parse_listing(body: &[u8]) -> Result<Vec<String>, serde_json::Error> {
    let mut deserializer = serde_json::Deserializer::from_slice(body);
    let names = deserializer.deserialize_map(ListingVisitor)?;
    deserializer.end()?;
    Ok(names)
}

struct ListingVisitor;

impl<'de> Visitor<'de> for ListingVisitor {
    type Value = Vec<String>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a registry listing object")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut names = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(key) = map.next_key::<String>()? {
            map.next_value::<IgnoredAny>()?;
            if key != LISTING_UPDATED_KEY {
                names.push(key);
            }
        }
        Ok(names)
    }
}
