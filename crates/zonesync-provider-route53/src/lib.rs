// # Route 53 DNS Client
//
// This crate provides the AWS Route 53 implementation of `DnsClient`.
//
// ## Behavior
//
// - One HTTP request per trait call; no retry, no caching, no background tasks
// - Requests signed with AWS Signature Version 4
// - XML request and response bodies (API version 2013-04-01)
// - HTTP timeout configured (30 seconds)
// - Provider error documents map to `Error::Service`, transport failures to
//   `Error::Http`
//
// ## Security Requirements
//
// - Secret access key and session token NEVER appear in logs or Debug output
// - Credentials come from explicit configuration, the AWS_* environment, the
//   shared credentials file, the container endpoint or instance metadata
// - Remote credentials are fetched once per client, on first use
//
// ## API Reference
//
// - List record sets: GET `/2013-04-01/hostedzone/:id/rrset?name=...`
// - Change record sets: POST `/2013-04-01/hostedzone/:id/rrset/`

use async_trait::async_trait;
use chrono::Utc;
use std::time::Duration;
use tokio::sync::OnceCell;
use zonesync_core::config::ClientConfig;
use zonesync_core::traits::{
    ChangeInfo, ChangeResourceRecordSetsRequest, DnsClient, DnsClientFactory,
    ListResourceRecordSetsOutput,
};
use zonesync_core::{Error, Result};

pub mod credentials;
pub mod sigv4;
pub mod xml;

pub use credentials::{CredentialSource, Credentials};

/// API version path segment
const API_VERSION: &str = "2013-04-01";

/// Service name used in the signature scope
const SERVICE: &str = "route53";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Endpoint and signing region of a Route 53 partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Base URL of the API
    pub endpoint: &'static str,
    /// Region the signature is scoped to
    pub signing_region: &'static str,
}

/// Select the partition serving `region`
///
/// Route 53 is a global service; only the partition matters.
pub fn partition_for_region(region: Option<&str>) -> Partition {
    match region.unwrap_or_default() {
        r if r.starts_with("cn-") => Partition {
            endpoint: "https://route53.amazonaws.com.cn",
            signing_region: "cn-northwest-1",
        },
        r if r.starts_with("us-gov-") => Partition {
            endpoint: "https://route53.us-gov.amazonaws.com",
            signing_region: "us-gov-west-1",
        },
        _ => Partition {
            endpoint: "https://route53.amazonaws.com",
            signing_region: "us-east-1",
        },
    }
}

/// Route 53 DNS client
///
/// Stateless apart from its credentials and HTTP connection pool.
///
/// # Security
///
/// The Debug implementation does NOT expose the secret key.
pub struct Route53Client {
    credentials: CredentialSource,

    /// Credentials obtained from `credentials` on first use
    resolved: OnceCell<Credentials>,

    /// Base URL without trailing slash
    endpoint: String,

    /// Host header value as signed (includes a non-default port)
    host: String,

    signing_region: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

impl std::fmt::Debug for Route53Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53Client")
            .field("credentials", &self.credentials)
            .field("endpoint", &self.endpoint)
            .field("signing_region", &self.signing_region)
            .finish()
    }
}

impl Route53Client {
    /// Create a client for the partition serving `region`
    pub fn new(credentials: impl Into<CredentialSource>, region: Option<&str>) -> Result<Self> {
        let partition = partition_for_region(region);
        Self::with_endpoint(credentials, partition.endpoint, partition.signing_region)
    }

    /// Create a client against an explicit endpoint
    ///
    /// # Parameters
    ///
    /// - `credentials`: Credentials, or where to obtain them, for signing
    /// - `endpoint`: Base URL, e.g. `https://route53.amazonaws.com`
    /// - `signing_region`: Region the signature is scoped to
    pub fn with_endpoint(
        credentials: impl Into<CredentialSource>,
        endpoint: &str,
        signing_region: &str,
    ) -> Result<Self> {
        let url = reqwest::Url::parse(endpoint)
            .map_err(|e| Error::config(format!("Invalid Route 53 endpoint '{}': {}", endpoint, e)))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(Error::config(format!(
                    "Route 53 endpoint '{}' has no host",
                    endpoint
                )));
            }
        };

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials: credentials.into(),
            resolved: OnceCell::new(),
            endpoint: endpoint.trim_end_matches('/').to_string(),
            host,
            signing_region: signing_region.to_string(),
            client,
        })
    }

    /// Base URL requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Region the signature is scoped to
    pub fn signing_region(&self) -> &str {
        &self.signing_region
    }

    /// Credentials used for signing, fetched on the first call
    async fn credentials(&self) -> Result<&Credentials> {
        self.resolved
            .get_or_try_init(|| self.credentials.credentials(&self.client))
            .await
    }

    fn rrset_path(hosted_zone_id: &str) -> String {
        format!("/{}/hostedzone/{}/rrset", API_VERSION, hosted_zone_id)
    }

    /// Sign and send one request, returning the body of a 2xx response
    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        query: &str,
        body: Option<String>,
    ) -> Result<String> {
        let credentials = self.credentials().await?;
        let payload = body.unwrap_or_default();
        let signed = sigv4::sign(
            &sigv4::SignableRequest {
                method: method.as_str(),
                host: &self.host,
                path,
                query,
                payload: payload.as_bytes(),
                time: Utc::now(),
            },
            credentials,
            &self.signing_region,
            SERVICE,
        );

        let url = if query.is_empty() {
            format!("{}{}", self.endpoint, path)
        } else {
            format!("{}{}?{}", self.endpoint, path, query)
        };

        tracing::debug!("Route 53 request: {} {}", method, url);

        let mut request = self.client.request(method, &url);
        for (name, value) in signed.iter() {
            request = request.header(name, value);
        }
        if !payload.is_empty() {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "text/xml")
                .body(payload);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::http(format!("Route 53 request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read Route 53 response: {}", e)))?;

        if !status.is_success() {
            let error = xml::decode_error(status.as_u16(), &text);
            tracing::debug!("Route 53 responded {}: {}", status, error);
            return Err(error);
        }

        Ok(text)
    }
}

#[async_trait]
impl DnsClient for Route53Client {
    async fn list_resource_record_sets(
        &self,
        hosted_zone_id: &str,
        start_record_name: &str,
    ) -> Result<ListResourceRecordSetsOutput> {
        let query = sigv4::canonical_query_string(&[("name", start_record_name)]);
        let body = self
            .send(
                reqwest::Method::GET,
                &Self::rrset_path(hosted_zone_id),
                &query,
                None,
            )
            .await?;
        xml::decode_list_response(&body)
    }

    async fn change_resource_record_sets(
        &self,
        request: &ChangeResourceRecordSetsRequest,
    ) -> Result<ChangeInfo> {
        let document = xml::encode_change_request(request)?;
        let path = format!("{}/", Self::rrset_path(&request.hosted_zone_id));
        let body = self
            .send(reqwest::Method::POST, &path, "", Some(document))
            .await?;
        xml::decode_change_response(&body)
    }

    fn provider_name(&self) -> &'static str {
        "route53"
    }
}

/// Factory for creating Route 53 clients
pub struct Route53Factory;

impl DnsClientFactory for Route53Factory {
    fn create(&self, config: &ClientConfig) -> Result<Box<dyn DnsClient>> {
        match config {
            ClientConfig::Route53 {
                region,
                access_key_id,
                secret_access_key,
                session_token,
                endpoint,
            } => {
                let credentials = CredentialSource::resolve(
                    access_key_id.as_deref(),
                    secret_access_key.as_deref(),
                    session_token.as_deref(),
                )?;

                let client = match endpoint {
                    Some(endpoint) => {
                        let partition = partition_for_region(region.as_deref());
                        Route53Client::with_endpoint(
                            credentials,
                            endpoint,
                            partition.signing_region,
                        )?
                    }
                    None => Route53Client::new(credentials, region.as_deref())?,
                };

                tracing::debug!("Route 53 client targets {}", client.endpoint());
                Ok(Box::new(client))
            }
            _ => Err(Error::config("Invalid config for Route 53 client")),
        }
    }
}

/// Register the Route 53 client with a registry
///
/// # Example
///
/// ```rust
/// use zonesync_core::ClientRegistry;
///
/// let registry = ClientRegistry::new();
/// zonesync_provider_route53::register(&registry);
/// assert!(registry.has_client("route53"));
/// ```
pub fn register(registry: &zonesync_core::ClientRegistry) {
    registry.register_client("route53", Box::new(Route53Factory));
}
