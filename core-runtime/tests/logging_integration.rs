//! Integration tests for logging system

use bridge_traits::time::LogLevel;
use core_runtime::logging::{
    default_filter_directives, redact_if_sensitive, redact_url, strip_path, LogFormat,
    LoggingConfig,
};

#[test]
fn test_logging_config_defaults() {
    let config = LoggingConfig::default();

    assert_eq!(config.level, LogLevel::Info);
    assert!(config.redact_sensitive);
    assert!(config.logger_sink.is_none());
    assert!(config.filter.is_none());

    #[cfg(debug_assertions)]
    assert_eq!(config.format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(config.format, LogFormat::Json);
}

#[test]
fn test_oauth_fields_are_redacted() {
    assert_eq!(redact_if_sensitive("access_token", "sl.ABC"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("refresh_token", "r-1"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("Authorization", "Bearer x"), "[REDACTED]");
}

#[test]
fn test_streaming_urls_lose_their_query() {
    let url = "https://content.dropboxapi.com/apitl/1/AbC?token=secret&x=1";
    let redacted = redact_url(url);

    assert!(redacted.starts_with("https://content.dropboxapi.com/apitl/1/AbC"));
    assert!(!redacted.contains("secret"));
}

#[test]
fn test_cloud_paths_stripped_to_file_name() {
    assert_eq!(strip_path("/Apps/Beatshelf/Trap/808 Night.mp3"), "808 Night.mp3");
    assert_eq!(strip_path(""), "");
}

#[test]
fn test_default_filter_respects_level() {
    let directives = default_filter_directives(LogLevel::Warn);
    assert!(directives.contains("core_service=warn"));
    assert!(!directives.contains("=debug"));
}
