//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, redirect cap)
//! - Validate trusted-domain entries are bare hostnames
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - A missing secret is not an error here: requests fail verification instead

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ServiceConfig;

/// Upper bound on `max_redirects`.
pub const MAX_REDIRECT_LIMIT: u32 = 20;

/// Upper bound on `fetch_timeout_secs`.
pub const MAX_FETCH_TIMEOUT_SECS: u64 = 300;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("listener.max_connections must be greater than zero")]
    MaxConnections,

    #[error("proxy.max_body_bytes must be greater than zero")]
    MaxBodyBytes,

    #[error("proxy.fetch_timeout_secs must be between 1 and {MAX_FETCH_TIMEOUT_SECS}, got {0}")]
    FetchTimeout(u64),

    #[error("proxy.max_redirects must be at most {MAX_REDIRECT_LIMIT}, got {0}")]
    MaxRedirects(u32),

    #[error("proxy.endpoint_path '{0}' must start with '/'")]
    EndpointPath(String),

    #[error("proxy.trusted_domains entry '{0}' is not a bare hostname")]
    TrustedDomain(String),

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::MaxConnections);
    }

    let proxy = &config.proxy;
    if proxy.max_body_bytes == 0 {
        errors.push(ValidationError::MaxBodyBytes);
    }
    if !(1..=MAX_FETCH_TIMEOUT_SECS).contains(&proxy.fetch_timeout_secs) {
        errors.push(ValidationError::FetchTimeout(proxy.fetch_timeout_secs));
    }
    if proxy.max_redirects > MAX_REDIRECT_LIMIT {
        errors.push(ValidationError::MaxRedirects(proxy.max_redirects));
    }
    if !proxy.endpoint_path.starts_with('/') {
        errors.push(ValidationError::EndpointPath(proxy.endpoint_path.clone()));
    }
    for domain in &proxy.trusted_domains {
        if !is_bare_hostname(domain) {
            errors.push(ValidationError::TrustedDomain(domain.clone()));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_bare_hostname(domain: &str) -> bool {
    let domain = domain.trim_end_matches('.');
    !domain.is_empty()
        && domain.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ServiceConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ServiceConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.proxy.max_body_bytes = 0;
        config.proxy.fetch_timeout_secs = 0;
        config.proxy.max_redirects = 50;
        config.proxy.endpoint_path = "image-proxy".into();
        config.proxy.trusted_domains = vec![
            "https://cdn.example.com".into(),
            "*.example.com".into(),
            "cdn.example.com:443".into(),
            "ok.example.com".into(),
        ];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 8);
        assert!(errors.contains(&ValidationError::MaxRedirects(50)));
        assert!(errors.contains(&ValidationError::TrustedDomain("*.example.com".into())));
        assert!(!errors.contains(&ValidationError::TrustedDomain("ok.example.com".into())));
    }

    #[test]
    fn test_fetch_timeout_is_bounded() {
        let mut config = ServiceConfig::default();
        config.proxy.fetch_timeout_secs = MAX_FETCH_TIMEOUT_SECS;
        assert!(validate_config(&config).is_ok());

        config.proxy.fetch_timeout_secs = u64::MAX;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::FetchTimeout(u64::MAX)]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = ServiceConfig::default();
        config.observability.metrics_address = "bogus".into();
        assert!(validate_config(&config).is_ok());
        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::MetricsAddress("bogus".into())]
        );
    }
}
