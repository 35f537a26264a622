// # zonesync - reconcile one DNS record
//
// This binary is a THIN integration layer:
// - Reading configuration from environment variables
// - Initializing logging and the runtime
// - Registering DNS clients
// - Running one reconcile action and mapping the outcome to an exit code
//
// All reconciliation logic lives in zonesync-core.
//
// ## Configuration
//
// ### Action
// - `ZONESYNC_ACTION`: `create` (default) or `delete`
// - `ZONESYNC_ZONE_ID`: Hosted zone id (`Z123` or `/hostedzone/Z123`)
//
// ### Record
// - `ZONESYNC_RECORD_NAME`: Record name (trailing dot optional)
// - `ZONESYNC_RECORD_TYPE`: Record type (A, AAAA, CNAME, ...)
// - `ZONESYNC_RECORD_VALUES`: Comma-separated values (commas inside double
//   quotes stay part of the value)
// - `ZONESYNC_RECORD_TTL`: TTL in seconds
//
// ### Alias target
// - `ZONESYNC_ALIAS_HOSTED_ZONE_ID`, `ZONESYNC_ALIAS_DNS_NAME`
// - `ZONESYNC_ALIAS_EVALUATE_TARGET_HEALTH`: boolean
//
// ### Routing
// - `ZONESYNC_HEALTH_CHECK_ID`, `ZONESYNC_FAILOVER`, `ZONESYNC_SET_IDENTIFIER`
//
// ### Behavior
// - `ZONESYNC_OVERWRITE`: Replace a differing record (UPSERT)
// - `ZONESYNC_MOCK`: Run against the in-process stub client
//
// ### Credentials
// - `ZONESYNC_AWS_ACCESS_KEY_ID`, `ZONESYNC_AWS_SECRET_ACCESS_KEY`
//   (falls back to the `AWS_*` environment, the shared credentials file,
//   the container credentials endpoint, then EC2 instance metadata)
// - `ZONESYNC_AWS_REGION`: Selects the partition endpoint
//
// ### Logging
// - `ZONESYNC_LOG_LEVEL`: trace, debug, info (default), warn, error
//
// ## Example
//
// ```bash
// export ZONESYNC_ZONE_ID=Z0123456789EXAMPLE
// export ZONESYNC_RECORD_NAME=www.example.com
// export ZONESYNC_RECORD_TYPE=A
// export ZONESYNC_RECORD_VALUES=192.0.2.10
// export ZONESYNC_RECORD_TTL=300
// export ZONESYNC_OVERWRITE=true
//
// zonesync
// ```

use anyhow::Result;
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;
use zonesync_core::{
    AliasTarget, ClientConfig, ClientRegistry, Error, Failover, ReconcileOutcome, RecordAction,
    RecordConfig, ZonesyncConfig, ensure_absent, ensure_present,
};

/// Exit codes for different termination scenarios
///
/// - 0: Record matches the declaration (changed or already satisfied)
/// - 1: Configuration error
/// - 2: Runtime error (read failure, transport failure)
/// - 3: The provider rejected the change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZonesyncExitCode {
    Success = 0,
    ConfigError = 1,
    RuntimeError = 2,
    ChangeRejected = 3,
}

impl From<ZonesyncExitCode> for ExitCode {
    fn from(code: ZonesyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Largest TTL the provider accepts
const MAX_TTL: u32 = 2_147_483_647;

/// Application configuration
#[derive(Debug)]
struct Config {
    action: RecordAction,
    zone_id: String,
    record_name: String,
    record_type: String,
    values: Vec<String>,
    ttl: Option<u32>,
    alias_hosted_zone_id: Option<String>,
    alias_dns_name: Option<String>,
    alias_evaluate_target_health: bool,
    health_check_id: Option<String>,
    failover: Option<Failover>,
    set_identifier: Option<String>,
    overwrite: bool,
    mock: bool,
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    region: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let flag = |key: &str| -> Result<bool> {
            var(key).map_or(Ok(false), |v| parse_bool(key, &v))
        };

        let action = match var("ZONESYNC_ACTION").as_deref() {
            None | Some("create") => RecordAction::Create,
            Some("delete") => RecordAction::Delete,
            Some(other) => anyhow::bail!(
                "ZONESYNC_ACTION '{}' is not supported. Supported actions: create, delete",
                other
            ),
        };

        let ttl = match var("ZONESYNC_RECORD_TTL") {
            Some(raw) => Some(raw.parse::<u32>().map_err(|_| {
                anyhow::anyhow!("ZONESYNC_RECORD_TTL must be a number of seconds. Got: {}", raw)
            })?),
            None => None,
        };

        let failover = var("ZONESYNC_FAILOVER")
            .map(|raw| raw.parse::<Failover>())
            .transpose()
            .map_err(|e| anyhow::anyhow!("ZONESYNC_FAILOVER: {}", e))?;

        Ok(Self {
            action,
            zone_id: var("ZONESYNC_ZONE_ID").unwrap_or_default(),
            record_name: var("ZONESYNC_RECORD_NAME").unwrap_or_default(),
            record_type: var("ZONESYNC_RECORD_TYPE")
                .unwrap_or_default()
                .to_uppercase(),
            values: split_values(&var("ZONESYNC_RECORD_VALUES").unwrap_or_default()),
            ttl,
            alias_hosted_zone_id: var("ZONESYNC_ALIAS_HOSTED_ZONE_ID"),
            alias_dns_name: var("ZONESYNC_ALIAS_DNS_NAME"),
            alias_evaluate_target_health: flag("ZONESYNC_ALIAS_EVALUATE_TARGET_HEALTH")?,
            health_check_id: var("ZONESYNC_HEALTH_CHECK_ID"),
            failover,
            set_identifier: var("ZONESYNC_SET_IDENTIFIER"),
            overwrite: flag("ZONESYNC_OVERWRITE")?,
            mock: flag("ZONESYNC_MOCK")?,
            access_key_id: var("ZONESYNC_AWS_ACCESS_KEY_ID"),
            secret_access_key: var("ZONESYNC_AWS_SECRET_ACCESS_KEY"),
            region: var("ZONESYNC_AWS_REGION"),
            log_level: var("ZONESYNC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Checks required fields, record name syntax, alias consistency,
    /// numeric ranges and the log level.
    fn validate(&self) -> Result<()> {
        if self.zone_id.is_empty() {
            anyhow::bail!(
                "ZONESYNC_ZONE_ID is required. \
                Set it via: export ZONESYNC_ZONE_ID=Z0123456789EXAMPLE"
            );
        }

        if self.record_name.is_empty() {
            anyhow::bail!("ZONESYNC_RECORD_NAME is required");
        }
        validate_domain_name(&self.record_name)?;

        if self.record_type.is_empty() {
            anyhow::bail!("ZONESYNC_RECORD_TYPE is required");
        }
        if !self.record_type.chars().all(|c| c.is_ascii_alphanumeric()) {
            anyhow::bail!(
                "ZONESYNC_RECORD_TYPE '{}' is not a valid record type",
                self.record_type
            );
        }

        match (&self.alias_hosted_zone_id, &self.alias_dns_name) {
            (Some(_), None) | (None, Some(_)) => anyhow::bail!(
                "ZONESYNC_ALIAS_HOSTED_ZONE_ID and ZONESYNC_ALIAS_DNS_NAME must be set together"
            ),
            (Some(_), Some(_)) if !self.values.is_empty() => anyhow::bail!(
                "ZONESYNC_RECORD_VALUES cannot be combined with an alias target"
            ),
            (None, None) if self.action == RecordAction::Create && self.values.is_empty() => {
                anyhow::bail!(
                    "ZONESYNC_RECORD_VALUES is required for create unless an alias target is set"
                )
            }
            _ => {}
        }

        if let Some(ttl) = self.ttl
            && ttl > MAX_TTL
        {
            anyhow::bail!(
                "ZONESYNC_RECORD_TTL must be between 0 and {} seconds. Got: {}",
                MAX_TTL,
                ttl
            );
        }

        match (&self.access_key_id, &self.secret_access_key) {
            (Some(_), None) | (None, Some(_)) => anyhow::bail!(
                "ZONESYNC_AWS_ACCESS_KEY_ID and ZONESYNC_AWS_SECRET_ACCESS_KEY must be set together"
            ),
            _ => {}
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "ZONESYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Build the library configuration
    fn into_zonesync_config(self) -> ZonesyncConfig {
        let alias_target = match (self.alias_hosted_zone_id, self.alias_dns_name) {
            (Some(hosted_zone_id), Some(dns_name)) => Some(AliasTarget {
                hosted_zone_id,
                dns_name,
                evaluate_target_health: self.alias_evaluate_target_health,
            }),
            _ => None,
        };

        let client = if self.mock {
            ClientConfig::Stub {
                record_sets: Vec::new(),
            }
        } else {
            ClientConfig::Route53 {
                region: self.region,
                access_key_id: self.access_key_id,
                secret_access_key: self.secret_access_key,
                session_token: None,
                endpoint: None,
            }
        };

        ZonesyncConfig {
            zone_id: self.zone_id,
            action: self.action,
            record: RecordConfig {
                values: self.values,
                ttl: self.ttl,
                alias_target,
                health_check_id: self.health_check_id,
                failover: self.failover,
                set_identifier: self.set_identifier,
                overwrite: self.overwrite,
                mock: self.mock,
                ..RecordConfig::new(self.record_name, self.record_type)
            },
            client,
        }
    }
}

/// Split a comma-separated value list
///
/// Commas inside double quotes belong to the value, so quoted TXT data such
/// as `"v=spf1 a, mx ~all"` stays whole. Inside quotes a backslash escapes
/// the next character.
fn split_values(raw: &str) -> Vec<String> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' if in_quotes => {
                current.push(c);
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            ',' if !in_quotes => values.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    values.push(current);

    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{} must be a boolean (true/false). Got: {}", key, raw),
    }
}

/// Validate that a string is a valid record name
///
/// Basic RFC 1035 checks. A leading `*` label and underscores (service
/// labels such as `_dmarc`) are allowed; a trailing dot is optional.
fn validate_domain_name(domain: &str) -> Result<()> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);

    if domain.is_empty() {
        anyhow::bail!("Domain name cannot be empty");
    }

    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for (index, label) in domain.split('.').enumerate() {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if index == 0 && label == "*" {
            continue;
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric, hyphen and underscore only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ZonesyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ZonesyncExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ZonesyncExitCode::ConfigError.into();
    }

    let config = config.into_zonesync_config();
    if let Err(e) = config.validate() {
        error!("Configuration validation error: {}", e);
        return ZonesyncExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ZonesyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run(config)).into()
}

/// Run one reconcile action
async fn run(config: ZonesyncConfig) -> ZonesyncExitCode {
    let registry = ClientRegistry::new();
    zonesync_core::stub::register(&registry);

    #[cfg(feature = "route53")]
    zonesync_provider_route53::register(&registry);

    let client = match registry.create_client(&config.client) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create {} client: {}", config.client.type_name(), e);
            return exit_code_for_error(&e);
        }
    };

    let zone = config.zone();
    let action = config.action;
    let spec = config.record.into_spec();

    info!(
        "Running {:?} for {} {} in zone {} via {}",
        action,
        spec.normalized_name(),
        spec.record_type,
        zone,
        client.provider_name()
    );

    let result = match action {
        RecordAction::Create => ensure_present(&spec, &zone, client.as_ref()).await,
        RecordAction::Delete => ensure_absent(&spec, &zone, client.as_ref()).await,
    };

    match result {
        Ok(outcome) => exit_code_for_outcome(&outcome),
        Err(e) => {
            error!("Reconcile failed: {}", e);
            exit_code_for_error(&e)
        }
    }
}

fn exit_code_for_outcome(outcome: &ReconcileOutcome) -> ZonesyncExitCode {
    match outcome {
        ReconcileOutcome::Unchanged | ReconcileOutcome::Changed { .. } => {
            ZonesyncExitCode::Success
        }
        ReconcileOutcome::WriteFailed { .. } => ZonesyncExitCode::ChangeRejected,
    }
}

fn exit_code_for_error(error: &Error) -> ZonesyncExitCode {
    match error {
        Error::Config(_) | Error::Credentials(_) | Error::InvalidInput(_) => {
            ZonesyncExitCode::ConfigError
        }
        _ => ZonesyncExitCode::RuntimeError,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("ZONESYNC_ZONE_ID", "/hostedzone/Z0123456789EXAMPLE"),
        ("ZONESYNC_RECORD_NAME", "www.example.com"),
        ("ZONESYNC_RECORD_TYPE", "a"),
        ("ZONESYNC_RECORD_VALUES", "192.0.2.2, 192.0.2.1"),
        ("ZONESYNC_RECORD_TTL", "300"),
    ];

    fn with(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        let mut pairs = BASE.to_vec();
        pairs.extend_from_slice(extra);
        pairs
    }

    #[test]
    fn test_minimal_value_config() {
        let config = Config::from_lookup(lookup(BASE)).unwrap();
        config.validate().unwrap();

        assert_eq!(config.action, RecordAction::Create);
        assert_eq!(config.record_type, "A");
        assert_eq!(config.values, vec!["192.0.2.2", "192.0.2.1"]);
        assert_eq!(config.ttl, Some(300));
        assert!(!config.overwrite);

        let zonesync = config.into_zonesync_config();
        assert_eq!(zonesync.zone().id(), "Z0123456789EXAMPLE");
        assert_eq!(zonesync.client.type_name(), "route53");
        zonesync.validate().unwrap();
    }

    #[test]
    fn test_alias_config() {
        let pairs = [
            ("ZONESYNC_ZONE_ID", "Z1"),
            ("ZONESYNC_RECORD_NAME", "api.example.com."),
            ("ZONESYNC_RECORD_TYPE", "A"),
            ("ZONESYNC_ALIAS_HOSTED_ZONE_ID", "Z35SXDOTRQ7X7K"),
            ("ZONESYNC_ALIAS_DNS_NAME", "lb.us-east-1.elb.amazonaws.com."),
            ("ZONESYNC_ALIAS_EVALUATE_TARGET_HEALTH", "yes"),
            ("ZONESYNC_FAILOVER", "primary"),
            ("ZONESYNC_SET_IDENTIFIER", "primary"),
        ];
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        config.validate().unwrap();

        let spec = config.into_zonesync_config().record.into_spec();
        assert!(spec.is_alias());
        assert_eq!(spec.failover, Some(Failover::Primary));
        assert_eq!(
            spec.alias_target.map(|t| t.evaluate_target_health),
            Some(true)
        );
    }

    #[test]
    fn test_mock_selects_stub_client() {
        let pairs = [
            ("ZONESYNC_ACTION", "delete"),
            ("ZONESYNC_ZONE_ID", "Z1"),
            ("ZONESYNC_RECORD_NAME", "www.mock.com"),
            ("ZONESYNC_RECORD_TYPE", "A"),
            ("ZONESYNC_MOCK", "true"),
        ];
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        config.validate().unwrap();

        match config.into_zonesync_config().client {
            ClientConfig::Stub { record_sets } => assert!(record_sets.is_empty()),
            other => panic!("Expected stub client, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let unknown_action = with(&[("ZONESYNC_ACTION", "upsert")]);
        assert!(Config::from_lookup(lookup(&unknown_action)).is_err());

        let bad_ttl = with(&[("ZONESYNC_RECORD_TTL", "five")]);
        assert!(Config::from_lookup(lookup(&bad_ttl)).is_err());

        let bad_bool = with(&[("ZONESYNC_OVERWRITE", "maybe")]);
        assert!(Config::from_lookup(lookup(&bad_bool)).is_err());

        let bad_failover = with(&[("ZONESYNC_FAILOVER", "tertiary")]);
        assert!(Config::from_lookup(lookup(&bad_failover)).is_err());
    }

    #[test]
    fn test_validation_failures() {
        let cases: &[&[(&str, &str)]] = &[
            &[("ZONESYNC_ZONE_ID", "")],
            &[("ZONESYNC_RECORD_NAME", "bad_label-.example.com")],
            &[("ZONESYNC_RECORD_VALUES", "")],
            &[("ZONESYNC_ALIAS_DNS_NAME", "lb.example.net.")],
            &[("ZONESYNC_AWS_ACCESS_KEY_ID", "AKIDEXAMPLE")],
            &[("ZONESYNC_LOG_LEVEL", "loud")],
        ];

        for extra in cases {
            let mut pairs = BASE.to_vec();
            pairs.retain(|(k, _)| !extra.iter().any(|(ek, _)| ek == k));
            pairs.extend_from_slice(extra);
            let config = Config::from_lookup(lookup(&pairs)).unwrap();
            assert!(
                config.validate().is_err(),
                "Expected validation failure for {:?}",
                extra
            );
        }
    }

    #[test]
    fn test_record_values_keep_quoted_commas() {
        assert_eq!(
            split_values("192.0.2.2, 192.0.2.1,"),
            vec!["192.0.2.2", "192.0.2.1"]
        );
        assert_eq!(
            split_values(r#""v=spf1 include:_spf.example.com, ~all","second""#),
            vec![r#""v=spf1 include:_spf.example.com, ~all""#, r#""second""#]
        );
        assert_eq!(
            split_values(r#""say \"a, b\"""#),
            vec![r#""say \"a, b\"""#]
        );

        let pairs = with(&[("ZONESYNC_RECORD_VALUES", r#""k=rsa; t=s, p=MIGf","v=DKIM1""#)]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(
            config.values,
            vec![r#""k=rsa; t=s, p=MIGf""#, r#""v=DKIM1""#]
        );
    }

    #[test]
    fn test_domain_name_validation() {
        assert!(validate_domain_name("example.com").is_ok());
        assert!(validate_domain_name("www.example.com.").is_ok());
        assert!(validate_domain_name("*.example.com").is_ok());
        assert!(validate_domain_name("_dmarc.example.com").is_ok());
        assert!(validate_domain_name("").is_err());
        assert!(validate_domain_name("a..b").is_err());
        assert!(validate_domain_name("-a.example.com").is_err());
        assert!(validate_domain_name("www.*.example.com").is_err());
        assert!(validate_domain_name(&format!("{}.com", "a".repeat(64))).is_err());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            exit_code_for_outcome(&ReconcileOutcome::Unchanged),
            ZonesyncExitCode::Success
        );
        assert_eq!(
            exit_code_for_outcome(&ReconcileOutcome::WriteFailed {
                action: zonesync_core::traits::ChangeAction::Create,
                error: "rejected".to_string(),
            }),
            ZonesyncExitCode::ChangeRejected
        );
        assert_eq!(
            exit_code_for_error(&Error::credentials("missing")),
            ZonesyncExitCode::ConfigError
        );
        assert_eq!(
            exit_code_for_error(&Error::http("connection refused")),
            ZonesyncExitCode::RuntimeError
        );
    }

    #[tokio::test]
    async fn test_mock_run_succeeds() {
        let pairs = [
            ("ZONESYNC_ACTION", "delete"),
            ("ZONESYNC_ZONE_ID", "Z1"),
            ("ZONESYNC_RECORD_NAME", "www.mock.com"),
            ("ZONESYNC_RECORD_TYPE", "A"),
            ("ZONESYNC_MOCK", "1"),
        ];
        let config = Config::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(
            run(config.into_zonesync_config()).await,
            ZonesyncExitCode::Success
        );
    }
}
