//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use warden_infra::ResolverPolicy;
use warden_observability::LogFormat;

const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub resolver_policy: ResolverPolicy,
    /// Include the unmet requirement in 403 bodies.
    pub expose_unmet_requirement: bool,
    pub log_format: LogFormat,
    /// Shared permission cache; only honoured with the `redis` feature.
    pub redis_url: Option<String>,
    /// Slug of a tenant to create with its system roles at startup.
    pub bootstrap_tenant: Option<String>,
    pub bootstrap_admin_email: String,
    /// Problems met while reading the environment. Logged by
    /// [`AppConfig::log_warnings`] once logging is up.
    pub warnings: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            resolver_policy: ResolverPolicy::default(),
            expose_unmet_requirement: false,
            log_format: LogFormat::Json,
            redis_url: None,
            bootstrap_tenant: None,
            bootstrap_admin_email: "admin@localhost".to_string(),
            warnings: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys keep their defaults; values that
    /// do not parse are ignored and recorded in `warnings`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let mut warnings = Vec::new();

        if let Some(addr) = parsed(&lookup, &mut warnings, "WARDEN_BIND_ADDR") {
            config.bind_addr = addr;
        }

        match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => config.jwt_secret = secret,
            None => warnings.push("JWT_SECRET not set; using insecure dev default".to_string()),
        }

        let policy = &mut config.resolver_policy;
        if let Some(secs) = parsed::<u64>(&lookup, &mut warnings, "WARDEN_CACHE_FRESH_SECS") {
            policy.fresh_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = parsed::<u64>(&lookup, &mut warnings, "WARDEN_CACHE_STALE_SECS") {
            policy.stale_ttl = Duration::from_secs(secs);
        }
        if let Some(ms) = parsed::<u64>(&lookup, &mut warnings, "WARDEN_RESOLVER_TIMEOUT_MS") {
            policy.lookup_timeout = Duration::from_millis(ms);
        }
        if let Some(attempts) = parsed::<u32>(&lookup, &mut warnings, "WARDEN_RESOLVER_MAX_ATTEMPTS") {
            policy.max_attempts = attempts.max(1);
        }
        if policy.stale_ttl < policy.fresh_ttl {
            warnings.push(
                "WARDEN_CACHE_STALE_SECS below WARDEN_CACHE_FRESH_SECS; stale window disabled"
                    .to_string(),
            );
            policy.stale_ttl = policy.fresh_ttl;
        }

        if let Some(expose) = parsed_bool(&lookup, &mut warnings, "WARDEN_EXPOSE_UNMET") {
            config.expose_unmet_requirement = expose;
        }

        if let Some(raw) = lookup("WARDEN_LOG_FORMAT") {
            match LogFormat::parse(&raw) {
                Some(format) => config.log_format = format,
                None => warnings.push(format!("invalid WARDEN_LOG_FORMAT {raw:?}; using json")),
            }
        }

        config.redis_url = lookup("REDIS_URL").filter(|s| !s.is_empty());
        config.bootstrap_tenant = lookup("WARDEN_BOOTSTRAP_TENANT").filter(|s| !s.is_empty());
        if let Some(email) = lookup("WARDEN_BOOTSTRAP_ADMIN_EMAIL").filter(|s| !s.is_empty()) {
            config.bootstrap_admin_email = email;
        }

        config.warnings = warnings;
        config
    }

    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            warn!("{warning}");
        }
    }
}

fn parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    warnings: &mut Vec<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warnings.push(format!("ignoring unparsable {key}={raw:?}"));
            None
        }
    }
}

fn parsed_bool(
    lookup: &impl Fn(&str) -> Option<String>,
    warnings: &mut Vec<String>,
    key: &str,
) -> Option<bool> {
    let raw = lookup(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warnings.push(format!("ignoring unparsable {key}={raw:?}"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> AppConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]);
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.resolver_policy, ResolverPolicy::default());
        assert!(!config.expose_unmet_requirement);
        assert!(config.bootstrap_tenant.is_none());
    }

    #[test]
    fn values_are_read() {
        let config = config_from(&[
            ("WARDEN_BIND_ADDR", "127.0.0.1:9000"),
            ("JWT_SECRET", "s3cret"),
            ("WARDEN_CACHE_FRESH_SECS", "5"),
            ("WARDEN_CACHE_STALE_SECS", "60"),
            ("WARDEN_RESOLVER_TIMEOUT_MS", "100"),
            ("WARDEN_RESOLVER_MAX_ATTEMPTS", "4"),
            ("WARDEN_EXPOSE_UNMET", "true"),
            ("WARDEN_LOG_FORMAT", "pretty"),
            ("WARDEN_BOOTSTRAP_TENANT", "acme"),
        ]);
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.resolver_policy.fresh_ttl, Duration::from_secs(5));
        assert_eq!(config.resolver_policy.stale_ttl, Duration::from_secs(60));
        assert_eq!(config.resolver_policy.lookup_timeout, Duration::from_millis(100));
        assert_eq!(config.resolver_policy.max_attempts, 4);
        assert!(config.expose_unmet_requirement);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.bootstrap_tenant.as_deref(), Some("acme"));
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("WARDEN_BIND_ADDR", "nowhere"),
            ("WARDEN_CACHE_FRESH_SECS", "-1"),
            ("WARDEN_EXPOSE_UNMET", "maybe"),
            ("WARDEN_RESOLVER_MAX_ATTEMPTS", "0"),
        ]);
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.resolver_policy.fresh_ttl, Duration::from_secs(30));
        assert!(!config.expose_unmet_requirement);
        assert_eq!(config.resolver_policy.max_attempts, 1);
        assert_eq!(config.warnings.len(), 4);
        assert!(config.warnings.iter().any(|w| w.contains("WARDEN_BIND_ADDR")));
    }

    #[test]
    fn log_format_is_read_once_with_its_warning() {
        let config = config_from(&[("JWT_SECRET", "s3cret"), ("WARDEN_LOG_FORMAT", "xml")]);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.warnings.len(), 1);
        assert!(config.warnings[0].contains("WARDEN_LOG_FORMAT"));

        let config = config_from(&[("JWT_SECRET", "s3cret"), ("WARDEN_LOG_FORMAT", " Pretty ")]);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(config.warnings.is_empty());
    }
}
