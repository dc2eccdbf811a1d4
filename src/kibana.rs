use crate::{
    config::Kibana as KibanaConfig,
    metrics::external::{Target, external_request_timer, record_external_request_failure},
};
use reqwest::{RequestBuilder, StatusCode, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::time::{Duration, Instant};

pub mod cluster;
pub mod indices;
pub mod nodes;
pub mod stats;
pub mod timeseries;

/// URL-encoded `{"type":"application","name":"monitoring","url":"/app/monitoring"}`
const KBN_CONTEXT: &str = "%7B%22type%22%3A%22application%22%2C%22name%22%3A%22monitoring%22%2C%22url%22%3A%22%2Fapp%2Fmonitoring%22%7D";

const CONSOLE_PROXY_PATH: &str = "/api/console/proxy";

/// HTTP methods accepted by the console proxy and by atomic operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            other => Err(anyhow::anyhow!("Unsupported HTTP method '{}'", other)),
        }
    }
}

/// Response relayed from Elasticsearch through the Kibana console proxy
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status: u16,
    pub duration_ms: u64,
    pub body: Value,
}

impl ProxyResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub struct KibanaClient {
    config: KibanaConfig,
    client: reqwest::Client,
    stats: stats::ApiStatsTable,
}

impl KibanaClient {
    /// Create a new Kibana client with a pooled HTTP connection
    pub fn new(config: KibanaConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .connect_timeout(Duration::from_secs(config.connect_timeout))
            .timeout(Duration::from_secs(config.read_timeout))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(300))
            .build()?;

        tracing::info!(
            "Kibana client initialized for {} (cluster {})",
            config.base_url,
            config.cluster_id
        );

        let stats = stats::ApiStatsTable::new(config.slow_call_threshold_ms);

        Ok(Self {
            config,
            client,
            stats,
        })
    }

    pub fn cluster_id(&self) -> &str {
        &self.config.cluster_id
    }

    pub fn stats(&self) -> &stats::ApiStatsTable {
        &self.stats
    }

    /// POST a JSON body to the Kibana API and decode the JSON reply
    #[tracing::instrument(skip(self, body))]
    pub async fn post<T, B>(&self, path: &str, body: &B) -> anyhow::Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.config.base_url, path);
        let stats_path = stats::simplify_path(path);

        tracing::debug!("POST {}", url);

        let _timer = external_request_timer(Target::Kibana);
        let started = Instant::now();
        let result = self.send_json(&url, body).await;
        let elapsed = started.elapsed().as_millis() as u64;

        self.stats.record(&stats_path, elapsed);

        let (status, text) = match result {
            Ok(reply) => reply,
            Err(e) => {
                record_external_request_failure(Target::Kibana);
                return Err(e);
            }
        };

        if !status.is_success() {
            record_external_request_failure(Target::Kibana);

            let snippet: String = text.chars().take(200).collect();
            tracing::error!(
                "Request failed: {} {} - {} ({}ms)",
                status.as_u16(),
                path,
                snippet,
                elapsed
            );

            return Err(anyhow::anyhow!(
                "Request failed: {} - {}",
                status.as_u16(),
                snippet
            ));
        }

        tracing::debug!("Response ({}ms): {} bytes", elapsed, text.len());

        Ok(serde_json::from_str(&text)?)
    }

    /// Forward a raw request to Elasticsearch through the Kibana console proxy.
    ///
    /// Elasticsearch errors come back as a normal [`ProxyResponse`] carrying the
    /// upstream status; only transport failures are returned as `Err`.
    #[tracing::instrument(skip(self, body))]
    pub async fn console_proxy(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&str>,
    ) -> anyhow::Result<ProxyResponse> {
        let url = format!("{}{}", self.config.base_url, CONSOLE_PROXY_PATH);

        let mut request = self
            .authorized(self.client.post(&url))
            .query(&[("path", path), ("method", method.as_str())])
            .header("kbn-xsrf", "true")
            .header(CONTENT_TYPE, "application/json");

        if let Some(body) = body.filter(|b| !b.trim().is_empty()) {
            request = request.body(body.to_string());
        }

        let _timer = external_request_timer(Target::Kibana);
        let started = Instant::now();
        let result = async {
            let response = request.send().await?;
            let status = response.status();
            let text = response.text().await?;

            Ok::<_, reqwest::Error>((status, text))
        }
        .await;
        let elapsed = started.elapsed().as_millis() as u64;

        self.stats.record(CONSOLE_PROXY_PATH, elapsed);

        let (status, text) = result.inspect_err(|_| {
            record_external_request_failure(Target::Kibana);
        })?;

        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        Ok(ProxyResponse {
            status: status.as_u16(),
            duration_ms: elapsed,
            body,
        })
    }

    async fn send_json<B>(&self, url: &str, body: &B) -> anyhow::Result<(StatusCode, String)>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .authorized(self.client.post(url))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        Ok((status, text))
    }

    /// Attach Basic auth and the headers Kibana's internal APIs require
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header("kbn-version", &self.config.version)
            .header("kbn-build-number", &self.config.build_number)
            .header("x-elastic-internal-origin", "Kibana")
            .header("x-kbn-context", KBN_CONTEXT)
    }
}
