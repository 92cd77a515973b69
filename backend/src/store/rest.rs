use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE, RANGE};
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{CatalogSource, StoreError};
use crate::catalog::Predicate;
use crate::models::Property;

/// `created_at` ties are broken by id so consecutive ranges never overlap.
const NEWEST_FIRST: &str = "created_at.desc,id.desc";

/// Read-only catalog served by a PostgREST endpoint (`{base}/rest/v1/properties`).
pub struct RestCatalog {
    client: Client,
    table_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl RestCatalog {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            table_url: format!("{}/rest/v1/properties", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        })
    }

    fn headers(&self) -> Result<HeaderMap, StoreError> {
        let invalid = |e: reqwest::header::InvalidHeaderValue| {
            StoreError::Unavailable(format!("invalid api key header: {}", e))
        };
        let mut headers = HeaderMap::new();
        headers.insert("apikey", HeaderValue::from_str(&self.api_key).map_err(invalid)?);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(invalid)?,
        );
        Ok(headers)
    }

    /// Turns a non-success response into a `StoreError`, keeping PostgREST's
    /// `code` and `message` when the body carries them.
    async fn failure(resp: Response) -> StoreError {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(ErrorBody { code, message }) => StoreError::Remote {
                code,
                message: message.unwrap_or_else(|| status.to_string()),
            },
            Err(_) => StoreError::Remote {
                code: None,
                message: format!("catalog request failed with {}", status),
            },
        }
    }
}

/// Total from a `Content-Range` value such as `0-11/15` or `*/0`.
pub fn parse_total(content_range: &str) -> Option<u64> {
    content_range
        .split('/')
        .nth(1)
        .and_then(|v| v.trim().parse::<u64>().ok())
}

#[async_trait]
impl CatalogSource for RestCatalog {
    async fn count(&self, predicate: &Predicate) -> Result<u64, StoreError> {
        let mut headers = self.headers()?;
        headers.insert("Prefer", HeaderValue::from_static("count=exact"));

        let resp = self
            .client
            .head(&self.table_url)
            .headers(headers)
            .query(&[("select", "id")])
            .query(&predicate.query_pairs())
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::failure(resp).await);
        }

        resp.headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_total)
            .ok_or_else(|| StoreError::Remote {
                code: None,
                message: "catalog count missing from Content-Range".to_string(),
            })
    }

    async fn select(
        &self,
        predicate: &Predicate,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Property>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut headers = self.headers()?;
        headers.insert("Range-Unit", HeaderValue::from_static("items"));
        let range = format!("{}-{}", offset, offset.saturating_add(limit - 1));
        headers.insert(
            RANGE,
            HeaderValue::from_str(&range)
                .map_err(|e| StoreError::Unavailable(format!("invalid range header: {}", e)))?,
        );

        let resp = self
            .client
            .get(&self.table_url)
            .headers(headers)
            .query(&[("select", "*"), ("order", NEWEST_FIRST)])
            .query(&predicate.query_pairs())
            .send()
            .await?;
        if !resp.status().is_success() {
            let err = Self::failure(resp).await;
            if !err.is_range_not_satisfiable() {
                warn!("catalog select {} failed: {}", range, err);
            }
            return Err(err);
        }

        let rows: Vec<Property> = resp.json().await?;
        debug!("catalog select {} returned {} rows", range, rows.len());
        Ok(rows)
    }

    async fn property(&self, id: Uuid) -> Result<Option<Property>, StoreError> {
        let resp = self
            .client
            .get(&self.table_url)
            .headers(self.headers()?)
            .query(&[("select", "*".to_string()), ("id", format!("eq.{}", id))])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::failure(resp).await);
        }
        let rows: Vec<Property> = resp.json().await?;
        Ok(rows.into_iter().next())
    }
}
