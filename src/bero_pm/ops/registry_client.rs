//! The HTTP-backed registry client (C2): `GET {registry}/{name}`,
//! parsed straight into the wire manifest type. This is the only place
//! in the whole workspace that speaks HTTP.

use bero_pm_resolver::{RegistryClient, ResolverError};
use bero_pm_schemas::RegistryManifest;
use curl::easy::Easy;
use std::time::Duration;
use url::Url;

pub struct CurlRegistryClient {
    base_url: Url,
}

#[derive(Debug, thiserror::Error)]
#[error("registry base URL cannot be a base for path segments")]
struct InvalidRegistryUrl;

impl CurlRegistryClient {
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, ResolverError> {
        let base_url = Url::parse(base_url.as_ref()).map_err(|e| ResolverError::RegistryUnreachable {
            name: "registry".to_string(),
            source: Box::new(e),
        })?;
        Ok(Self { base_url })
    }

    fn unreachable(&self, name: &str, source: impl std::error::Error + Send + Sync + 'static) -> ResolverError {
        ResolverError::RegistryUnreachable {
            name: name.to_string(),
            source: Box::new(source),
        }
    }

    fn target_url(&self, name: &str) -> Result<Url, ResolverError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| self.unreachable(name, InvalidRegistryUrl))?
            .push(name);
        Ok(url)
    }
}

impl RegistryClient for CurlRegistryClient {
    fn fetch_manifest(&self, name: &str) -> Result<RegistryManifest, ResolverError> {
        let url = self.target_url(name)?;
        tracing::debug!(%url, "fetching registry manifest");

        let mut body = Vec::new();
        let mut handle = Easy::new();
        handle.url(url.as_str()).map_err(|e| self.unreachable(name, e))?;
        handle.fail_on_error(true).map_err(|e| self.unreachable(name, e))?;
        handle
            .timeout(Duration::from_secs(30))
            .map_err(|e| self.unreachable(name, e))?;
        {
            let mut transfer = handle.transfer();
            transfer
                .write_function(|chunk| {
                    body.extend_from_slice(chunk);
                    Ok(chunk.len())
                })
                .map_err(|e| self.unreachable(name, e))?;
            transfer.perform().map_err(|e| self.unreachable(name, e))?;
        }

        serde_json::from_slice(&body).map_err(|e| self.unreachable(name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_url_appends_the_package_name_as_a_path_segment() {
        let client = CurlRegistryClient::new("https://registry.example/api/v1").unwrap();
        let url = client.target_url("left-pad").unwrap();
        assert_eq!(url.as_str(), "https://registry.example/api/v1/left-pad");
    }

    #[test]
    fn target_url_works_with_a_bare_host() {
        let client = CurlRegistryClient::new("https://registry.example").unwrap();
        let url = client.target_url("left-pad").unwrap();
        assert_eq!(url.as_str(), "https://registry.example/left-pad");
    }

    #[test]
    fn new_rejects_a_malformed_registry_url() {
        assert!(CurlRegistryClient::new("not a url").is_err());
    }
}
