//! Prometheus Push Gateway client
//!
//! Pushes one batch with `PUT /metrics/job/<job>[/<label>/<value>...]`. A PUT
//! replaces every metric previously pushed under the same grouping key, so a
//! re-run never leaves values from an older run behind.
//!
//! Grouping-key values that are empty or contain `/` are sent base64-encoded
//! (`<label>@base64/<value>`), as the push gateway requires.

use crate::config::Config;
use crate::error::{ExporterError, Result};
use crate::metrics::{MetricSample, MetricsCollector};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use reqwest::header::CONTENT_TYPE;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::info;

const PUSH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PushGateway {
    client: reqwest::Client,
    base: Url,
    job: String,
    group_by_source: bool,
    username: Option<String>,
    password: Option<SecretString>,
}

impl PushGateway {
    pub fn new(base: Url, job: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(PUSH_TIMEOUT).build()?;
        Ok(Self {
            client,
            base,
            job: job.into(),
            group_by_source: false,
            username: None,
            password: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut gateway = Self::new(config.pushgateway_url()?, config.job.clone())?
            .with_source_grouping(config.group_by_source);
        if let Some(username) = &config.pushgateway_username {
            gateway = gateway.with_basic_auth(username.clone(), config.pushgateway_password.clone());
        }
        Ok(gateway)
    }

    pub fn with_source_grouping(mut self, enabled: bool) -> Self {
        self.group_by_source = enabled;
        self
    }

    pub fn with_basic_auth(mut self, username: String, password: Option<SecretString>) -> Self {
        self.username = Some(username);
        self.password = password;
        self
    }

    /// Target URL for a batch. With source grouping the labels of the first
    /// sample become the grouping key.
    pub fn push_url(&self, samples: &[MetricSample]) -> Result<Url> {
        let mut pairs = vec![grouping_segment("job", &self.job)];
        if self.group_by_source {
            let labels = &samples
                .first()
                .ok_or_else(|| ExporterError::Config("cannot group an empty push by source".into()))?
                .labels;
            pairs.push(grouping_segment("host", &labels.host));
            pairs.push(grouping_segment("path", &labels.path));
            pairs.push(grouping_segment("user", &labels.user));
        }

        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ExporterError::Config(format!("invalid pushgateway URL '{}'", self.base)))?
            .pop_if_empty()
            .push("metrics")
            .extend(pairs.iter().flat_map(|(name, value)| [name.as_str(), value.as_str()]));
        Ok(url)
    }

    /// Push every sample as one request.
    pub async fn push(&self, samples: &[MetricSample]) -> Result<()> {
        let body = MetricsCollector::from_samples(samples)?.render()?;
        let url = self.push_url(samples)?;

        let mut request = self
            .client
            .put(url.clone())
            .header(CONTENT_TYPE, prometheus::TEXT_FORMAT)
            .body(body);
        if let Some(username) = &self.username {
            request = request.basic_auth(
                username,
                self.password.as_ref().map(|p| p.expose_secret().to_string()),
            );
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExporterError::PushRejected {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        info!("Pushed {} samples to {}", samples.len(), url);
        Ok(())
    }
}

fn grouping_segment(name: &str, value: &str) -> (String, String) {
    if value.is_empty() {
        (format!("{name}@base64"), "=".to_string())
    } else if value.contains('/') {
        (format!("{name}@base64"), URL_SAFE.encode(value))
    } else {
        (name.to_string(), value.to_string())
    }
}
