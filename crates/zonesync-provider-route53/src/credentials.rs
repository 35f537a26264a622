//! AWS credential resolution
//!
//! Order:
//!
//! 1. explicit access-key pair
//! 2. environment (`AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN`)
//! 3. shared credentials file (`AWS_SHARED_CREDENTIALS_FILE` or
//!    `~/.aws/credentials`, profile `AWS_PROFILE` or `default`)
//! 4. container credentials endpoint (`AWS_CONTAINER_CREDENTIALS_RELATIVE_URI`
//!    or `AWS_CONTAINER_CREDENTIALS_FULL_URI`)
//! 5. EC2 instance metadata (IMDSv2), unless `AWS_EC2_METADATA_DISABLED=true`
//!
//! Steps 1-4 are decided without network access. The remote sources are only
//! contacted when credentials are first needed.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use zonesync_core::{Error, Result};

/// Environment variable holding the access key id
pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";

/// Environment variable holding the secret access key
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";

/// Environment variable holding the session token
pub const ENV_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

const ENV_SHARED_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";
const ENV_PROFILE: &str = "AWS_PROFILE";
const ENV_CONTAINER_RELATIVE_URI: &str = "AWS_CONTAINER_CREDENTIALS_RELATIVE_URI";
const ENV_CONTAINER_FULL_URI: &str = "AWS_CONTAINER_CREDENTIALS_FULL_URI";
const ENV_CONTAINER_AUTHORIZATION_TOKEN: &str = "AWS_CONTAINER_AUTHORIZATION_TOKEN";
const ENV_METADATA_DISABLED: &str = "AWS_EC2_METADATA_DISABLED";
const ENV_METADATA_ENDPOINT: &str = "AWS_EC2_METADATA_SERVICE_ENDPOINT";

/// Base URL of the ECS container credentials endpoint
const CONTAINER_ENDPOINT: &str = "http://169.254.170.2";

/// Default EC2 instance metadata endpoint
const METADATA_ENDPOINT: &str = "http://169.254.169.254";

/// IMDSv2 session token lifetime in seconds
const METADATA_TOKEN_TTL: &str = "21600";

/// Per-request timeout for the link-local credential endpoints
const METADATA_TIMEOUT: Duration = Duration::from_secs(2);

/// AWS credentials
///
/// # Security
///
/// The Debug implementation never exposes the secret key or session token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key_id: String,
    /// ⚠️ NEVER log this value
    secret_access_key: String,
    session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<REDACTED>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<REDACTED>"),
            )
            .finish()
    }
}

impl Credentials {
    /// Create credentials from a key pair
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }

    /// Access key id
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub(crate) fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Session token, for temporary credentials
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_deref()
    }
}

/// Where a client gets its credentials from
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// A fixed key pair (explicit, environment or shared file)
    Static(Credentials),

    /// Container credentials endpoint (ECS task role, EKS pod identity)
    Container {
        /// Full credentials URL
        uri: String,
        /// Value for the `Authorization` header
        /// ⚠️ NEVER log this value
        authorization: Option<String>,
    },

    /// EC2 instance metadata service (instance profile role)
    InstanceMetadata {
        /// Base URL of the metadata service
        endpoint: String,
    },
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(credentials) => f.debug_tuple("Static").field(credentials).finish(),
            Self::Container { uri, authorization } => f
                .debug_struct("Container")
                .field("uri", uri)
                .field("authorization", &authorization.as_ref().map(|_| "<REDACTED>"))
                .finish(),
            Self::InstanceMetadata { endpoint } => f
                .debug_struct("InstanceMetadata")
                .field("endpoint", endpoint)
                .finish(),
        }
    }
}

impl From<Credentials> for CredentialSource {
    fn from(credentials: Credentials) -> Self {
        Self::Static(credentials)
    }
}

/// Credentials document served by the container and metadata endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RemoteCredentials {
    access_key_id: String,
    secret_access_key: String,
    #[serde(default)]
    token: Option<String>,
}

impl From<RemoteCredentials> for Credentials {
    fn from(remote: RemoteCredentials) -> Self {
        Credentials::new(remote.access_key_id, remote.secret_access_key, remote.token)
    }
}

impl CredentialSource {
    /// Pick a credential source from the process environment and filesystem
    pub fn resolve(
        access_key_id: Option<&str>,
        secret_access_key: Option<&str>,
        session_token: Option<&str>,
    ) -> Result<Self> {
        Self::resolve_with(
            access_key_id,
            secret_access_key,
            session_token,
            |key| std::env::var(key).ok(),
            |path| std::fs::read_to_string(path).ok(),
        )
    }

    /// [`CredentialSource::resolve`] with an injectable environment and filesystem
    pub fn resolve_with<F, R>(
        access_key_id: Option<&str>,
        secret_access_key: Option<&str>,
        session_token: Option<&str>,
        lookup: F,
        read_file: R,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
        R: Fn(&Path) -> Option<String>,
    {
        if let (Some(id), Some(secret)) = (access_key_id, secret_access_key)
            && !id.is_empty()
            && !secret.is_empty()
        {
            return Ok(Self::Static(Credentials::new(
                id,
                secret,
                session_token.map(str::to_string),
            )));
        }

        tracing::info!(
            "No AWS credentials supplied, going to attempt to use automatic credentials from IAM or the environment"
        );

        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let (Some(id), Some(secret)) = (var(ENV_ACCESS_KEY_ID), var(ENV_SECRET_ACCESS_KEY)) {
            tracing::debug!("Using AWS credentials from the environment");
            return Ok(Self::Static(Credentials::new(
                id,
                secret,
                var(ENV_SESSION_TOKEN),
            )));
        }

        let profile = var(ENV_PROFILE).unwrap_or_else(|| "default".to_string());
        if let Some(path) = shared_credentials_path(&var)
            && let Some(contents) = read_file(&path)
            && let Some(credentials) = parse_shared_credentials(&contents, &profile)
        {
            tracing::debug!(
                "Using AWS credentials from profile '{}' in {}",
                profile,
                path.display()
            );
            return Ok(Self::Static(credentials));
        }

        if let Some(relative) = var(ENV_CONTAINER_RELATIVE_URI) {
            tracing::debug!("Using AWS container credentials endpoint");
            return Ok(Self::Container {
                uri: format!("{}{}", CONTAINER_ENDPOINT, relative),
                authorization: None,
            });
        }
        if let Some(uri) = var(ENV_CONTAINER_FULL_URI) {
            tracing::debug!("Using AWS container credentials endpoint {}", uri);
            return Ok(Self::Container {
                uri,
                authorization: var(ENV_CONTAINER_AUTHORIZATION_TOKEN),
            });
        }

        if var(ENV_METADATA_DISABLED).is_some_and(|v| v.eq_ignore_ascii_case("true")) {
            return Err(Error::credentials(format!(
                "No AWS credentials found: set {} and {}, configure a shared credentials \
                 profile, or enable instance metadata",
                ENV_ACCESS_KEY_ID, ENV_SECRET_ACCESS_KEY
            )));
        }

        let endpoint = var(ENV_METADATA_ENDPOINT).unwrap_or_else(|| METADATA_ENDPOINT.to_string());
        tracing::debug!("Falling back to EC2 instance metadata at {}", endpoint);
        Ok(Self::InstanceMetadata {
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Obtain credentials, contacting the remote source if there is one
    pub async fn credentials(&self, http: &reqwest::Client) -> Result<Credentials> {
        match self {
            Self::Static(credentials) => Ok(credentials.clone()),
            Self::Container { uri, authorization } => {
                let mut request = http.get(uri).timeout(METADATA_TIMEOUT);
                if let Some(token) = authorization {
                    request = request.header(reqwest::header::AUTHORIZATION, token);
                }
                let remote: RemoteCredentials = fetch(request, "container credentials")
                    .await?
                    .json()
                    .await
                    .map_err(|e| {
                        Error::credentials(format!("Invalid container credentials: {}", e))
                    })?;
                Ok(remote.into())
            }
            Self::InstanceMetadata { endpoint } => instance_metadata_credentials(http, endpoint).await,
        }
    }
}

/// IMDSv2: session token, role name, then the role's credentials
async fn instance_metadata_credentials(
    http: &reqwest::Client,
    endpoint: &str,
) -> Result<Credentials> {
    let token = fetch(
        http.put(format!("{}/latest/api/token", endpoint))
            .header("x-aws-ec2-metadata-token-ttl-seconds", METADATA_TOKEN_TTL)
            .timeout(METADATA_TIMEOUT),
        "instance metadata token",
    )
    .await?
    .text()
    .await
    .map_err(|e| Error::credentials(format!("Failed to read instance metadata token: {}", e)))?;

    let roles_url = format!("{}/latest/meta-data/iam/security-credentials/", endpoint);
    let roles = fetch(
        http.get(&roles_url)
            .header("x-aws-ec2-metadata-token", token.trim())
            .timeout(METADATA_TIMEOUT),
        "instance profile role",
    )
    .await?
    .text()
    .await
    .map_err(|e| Error::credentials(format!("Failed to read instance profile role: {}", e)))?;

    let role = roles
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| Error::credentials("Instance has no IAM role attached"))?;

    let remote: RemoteCredentials = fetch(
        http.get(format!("{}{}", roles_url, role))
            .header("x-aws-ec2-metadata-token", token.trim())
            .timeout(METADATA_TIMEOUT),
        "instance profile credentials",
    )
    .await?
    .json()
    .await
    .map_err(|e| Error::credentials(format!("Invalid instance profile credentials: {}", e)))?;

    tracing::debug!("Using credentials of instance profile role {}", role);
    Ok(remote.into())
}

async fn fetch(request: reqwest::RequestBuilder, what: &str) -> Result<reqwest::Response> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::credentials(format!("Failed to fetch {}: {}", what, e)))?;

    if !response.status().is_success() {
        return Err(Error::credentials(format!(
            "Failed to fetch {}: HTTP status {}",
            what,
            response.status()
        )));
    }

    Ok(response)
}

fn shared_credentials_path<F>(var: &F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = var(ENV_SHARED_CREDENTIALS_FILE) {
        return Some(PathBuf::from(path));
    }
    let home = var("HOME").map(PathBuf::from).or_else(dirs::home_dir)?;
    Some(home.join(".aws").join("credentials"))
}

/// Read one profile from a shared credentials file
///
/// INI syntax: `[profile]` headers, `key = value` lines, `#`/`;` comments.
fn parse_shared_credentials(contents: &str, profile: &str) -> Option<Credentials> {
    let mut in_profile = false;
    let mut access_key_id = None;
    let mut secret_access_key = None;
    let mut session_token = None;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(section) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_profile = section.trim() == profile;
            continue;
        }

        if !in_profile {
            continue;
        }

        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().to_string();
            match key.trim().to_ascii_lowercase().as_str() {
                "aws_access_key_id" => access_key_id = Some(value),
                "aws_secret_access_key" => secret_access_key = Some(value),
                "aws_session_token" => session_token = Some(value),
                _ => {}
            }
        }
    }

    match (access_key_id, secret_access_key) {
        (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
            Some(Credentials::new(id, secret, session_token))
        }
        _ => None,
    }
}
