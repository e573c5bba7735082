// rubygems.rs — Gem ownership from the RubyGems API.
//
// `GET {registry_base}/api/v1/gems/{name}/owners.json` returns the owner
// handles of a gem. An unknown gem answers 404 with a plain-text body;
// both that and any other non-JSON body mean "no such package".

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;

use dm_policy::{OwnerRegistry, PolicyError};

use crate::error::{RemoteError, Result};

#[derive(Debug, Deserialize)]
struct RawOwner {
    handle: Option<String>,
}

/// Owner handles from an owners listing, or `None` if the body is not one.
pub fn decode_owners(body: &str) -> Option<Vec<String>> {
    let owners: Vec<RawOwner> = serde_json::from_str(body).ok()?;
    Some(owners.into_iter().filter_map(|o| o.handle).collect())
}

pub struct RubyGemsRegistry {
    http: Client,
    base: String,
}

impl RubyGemsRegistry {
    pub fn new(base: &str) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    fn owners_url(&self, gem: &str) -> String {
        format!("{}/api/v1/gems/{}/owners.json", self.base, gem)
    }

    fn fetch_owners(&self, gem: &str) -> Result<Option<Vec<String>>> {
        let url = self.owners_url(gem);
        tracing::debug!(url = %url, "GET gem owners");
        let response = self.http.get(&url).send()?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RemoteError::Api {
                status: status.as_u16(),
                message: response.text().unwrap_or_default(),
            });
        }
        Ok(decode_owners(&response.text()?))
    }
}

impl OwnerRegistry for RubyGemsRegistry {
    fn package_owners(&self, package: &str) -> std::result::Result<Option<Vec<String>>, PolicyError> {
        self.fetch_owners(package).map_err(|e| PolicyError::Registry {
            package: package.to_string(),
            detail: e.to_string(),
        })
    }
}
