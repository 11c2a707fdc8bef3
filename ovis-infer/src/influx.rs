//! InfluxDB v2 HTTP client
//!
//! Points are sent through the `/api/v2/write` endpoint as newline-separated
//! line protocol with nanosecond precision. One `write_points` call is one
//! request; there is no retry.

use std::time::Duration;

use async_trait::async_trait;
use ovis_common::config::InfluxConfig;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::sink::{Point, PointSink};

const USER_AGENT: &str = concat!("ovis-infer/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 30;
const WRITE_PATH: &str = "/api/v2/write";

/// InfluxDB v2 write client
pub struct InfluxClient {
    http_client: reqwest::Client,
    write_url: String,
    org: String,
    bucket: String,
    token: String,
}

impl InfluxClient {
    pub fn new(
        url: impl AsRef<str>,
        org: impl Into<String>,
        bucket: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::sink(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            write_url: format!("{}{}", url.as_ref().trim_end_matches('/'), WRITE_PATH),
            org: org.into(),
            bucket: bucket.into(),
            token: token.into(),
        })
    }

    /// Build from the `[influx]` config table, rejecting incomplete settings
    pub fn from_config(config: &InfluxConfig) -> Result<Self> {
        config.validate()?;
        Self::new(
            &config.url,
            config.org.clone(),
            config.bucket.clone(),
            config.token.clone().unwrap_or_default(),
        )
    }

    pub fn write_url(&self) -> &str {
        &self.write_url
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl PointSink for InfluxClient {
    async fn write_points(&self, points: &[Point]) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }

        let body = points
            .iter()
            .map(Point::to_line_protocol)
            .collect::<Vec<_>>()
            .join("\n");

        debug!(
            points = points.len(),
            bytes = body.len(),
            bucket = %self.bucket,
            "Writing points to InfluxDB"
        );

        let response = self
            .http_client
            .post(&self.write_url)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "ns"),
            ])
            .header(reqwest::header::AUTHORIZATION, format!("Token {}", self.token))
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::sink(format!("request to {} failed: {}", self.write_url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::sink(format!(
                "InfluxDB returned {}: {}",
                status.as_u16(),
                error_text.trim()
            )));
        }

        info!(points = points.len(), bucket = %self.bucket, "InfluxDB write accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation_normalizes_url() {
        let client = InfluxClient::new("http://localhost:8086/", "farm", "sheep", "t").unwrap();
        assert_eq!(client.write_url(), "http://localhost:8086/api/v2/write");
        assert_eq!(client.bucket(), "sheep");
    }

    #[test]
    fn test_from_config_requires_token() {
        let config = InfluxConfig {
            url: "http://localhost:8086".to_string(),
            org: "farm".to_string(),
            bucket: "sheep".to_string(),
            token: None,
        };

        let err = InfluxClient::from_config(&config).err().unwrap();
        assert!(err.to_string().contains("token"));
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        // Nothing listens on port 9; a request would fail
        let client = InfluxClient::new("http://127.0.0.1:9", "farm", "sheep", "t").unwrap();
        assert!(client.write_points(&[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_server_is_sink_error() {
        let client = InfluxClient::new("http://127.0.0.1:9", "farm", "sheep", "t").unwrap();
        let point = Point::new("behavior_pred", "grazing", 0.5, 0);

        let err = client.write_points(&[point]).await.unwrap_err();
        assert!(matches!(err, Error::Sink(_)));
    }
}
