//! Config tests.

use crate::config::pipeline::MAX_RATE_LIMIT_WINDOW_HOURS;
use crate::config::RelayConfig;
use serial_test::serial;
use std::env;

const VARS: &[&str] = &[
    "LINE_CHANNEL_ACCESS_TOKEN",
    "LINE_CHANNEL_SECRET",
    "LINE_API_URL",
    "SKIP_SIGNATURE_VALIDATION",
    "BIND_ADDR",
    "LOG_FILE",
    "STORE_TYPE",
    "DATABASE_URL",
    "OPENAI_API_KEY",
    "OPENAI_BASE_URL",
    "AI_MODEL",
    "AZURE_OPENAI_ENDPOINT",
    "HISTORY_LIMIT",
    "RATE_LIMIT_CEILING",
    "RATE_LIMIT_WINDOW_HOURS",
    "SEARCH_ENABLED",
    "SEARCH_RESULT_COUNT",
    "DUCKDUCKGO_API_URL",
    "SERPAPI_API_KEY",
    "SERPAPI_API_URL",
    "STORE_TIMEOUT_SECS",
    "SEARCH_TIMEOUT_SECS",
    "REPLY_TIMEOUT_SECS",
    "PROCESSING_DEADLINE_SECS",
];

fn reset_env() {
    for var in VARS {
        env::remove_var(var);
    }
    env::set_var("LINE_CHANNEL_ACCESS_TOKEN", "test_token");
    env::set_var("LINE_CHANNEL_SECRET", "test_secret");
    env::set_var("OPENAI_API_KEY", "test_key");
}

#[test]
#[serial]
fn test_load_config_with_defaults() {
    reset_env();

    let config = RelayConfig::load(None).unwrap();
    config.validate().unwrap();

    let base = config.base();
    assert_eq!(base.channel_access_token, "test_token");
    assert_eq!(base.channel_secret.as_deref(), Some("test_secret"));
    assert_eq!(base.line_api_url, "https://api.line.me");
    assert!(!base.skip_signature_validation);
    assert_eq!(base.bind_addr, "0.0.0.0:3000");
    assert_eq!(base.log_file, "logs/line-relay.log");
    assert_eq!(base.store_type, "sqlite");
    assert_eq!(base.database_url, "sqlite://./data/line-relay.db");

    let pipeline = config.pipeline();
    assert_eq!(pipeline.history_limit, 10);
    assert_eq!(pipeline.rate_limit_ceiling, 100);
    assert_eq!(pipeline.rate_limit_window_hours, 72);
    assert!(pipeline.search_enabled);
    assert_eq!(pipeline.search_result_count, 5);
    assert_eq!(pipeline.duckduckgo_api_url, "https://api.duckduckgo.com/");
    assert!(pipeline.serpapi_api_key.is_none());
    assert_eq!(pipeline.store_timeout_secs, 5);
    assert_eq!(pipeline.search_timeout_secs, 5);
    assert_eq!(pipeline.reply_timeout_secs, 5);
    assert_eq!(pipeline.processing_deadline_secs, 25);

    assert_eq!(config.llm().model, "gpt-4o-mini");
}

#[test]
#[serial]
fn test_load_config_with_custom_values() {
    reset_env();
    env::set_var("BIND_ADDR", "127.0.0.1:8080");
    env::set_var("STORE_TYPE", "Memory");
    env::set_var("HISTORY_LIMIT", "20");
    env::set_var("RATE_LIMIT_CEILING", "30");
    env::set_var("RATE_LIMIT_WINDOW_HOURS", "24");
    env::set_var("SEARCH_ENABLED", "false");
    env::set_var("SERPAPI_API_KEY", "serp");

    let config = RelayConfig::load(None).unwrap();
    config.validate().unwrap();

    assert_eq!(config.base().bind_addr, "127.0.0.1:8080");
    assert_eq!(config.base().store_type, "memory");
    assert_eq!(config.pipeline().history_limit, 20);
    assert_eq!(config.pipeline().rate_limit_ceiling, 30);
    assert_eq!(config.pipeline().rate_limit_window_hours, 24);
    assert!(!config.pipeline().search_enabled);
    assert_eq!(config.pipeline().serpapi_api_key.as_deref(), Some("serp"));
    reset_env();
}

#[test]
#[serial]
fn test_bind_argument_overrides_env() {
    reset_env();
    env::set_var("BIND_ADDR", "127.0.0.1:8080");

    let config = RelayConfig::load(Some("127.0.0.1:9999".to_string())).unwrap();

    assert_eq!(config.base().bind_addr, "127.0.0.1:9999");
    reset_env();
}

#[test]
#[serial]
fn test_missing_access_token_is_error() {
    reset_env();
    env::remove_var("LINE_CHANNEL_ACCESS_TOKEN");

    let err = RelayConfig::load(None).err().unwrap();

    assert!(err.to_string().contains("LINE_CHANNEL_ACCESS_TOKEN"));
    reset_env();
}

#[test]
#[serial]
fn test_missing_secret_requires_skip_flag() {
    reset_env();
    env::remove_var("LINE_CHANNEL_SECRET");

    let config = RelayConfig::load(None).unwrap();
    assert!(config.validate().is_err());

    env::set_var("SKIP_SIGNATURE_VALIDATION", "true");
    let config = RelayConfig::load(None).unwrap();
    assert!(config.validate().is_ok());
    reset_env();
}

#[test]
#[serial]
fn test_validate_rejects_bad_values() {
    reset_env();
    env::set_var("STORE_TYPE", "postgres");
    let config = RelayConfig::load(None).unwrap();
    assert!(config.validate().is_err());

    reset_env();
    env::set_var("LINE_API_URL", "not a url");
    let config = RelayConfig::load(None).unwrap();
    assert!(config.validate().is_err());

    reset_env();
    env::set_var("RATE_LIMIT_CEILING", "0");
    let config = RelayConfig::load(None).unwrap();
    assert!(config.validate().is_err());

    reset_env();
    env::set_var("PROCESSING_DEADLINE_SECS", "0");
    let config = RelayConfig::load(None).unwrap();
    assert!(config.validate().is_err());

    reset_env();
    env::set_var("HISTORY_LIMIT", "ten");
    assert!(RelayConfig::load(None).is_err());
    reset_env();
}

/// **Test: Out-of-range rate windows are rejected by validate, not by a panic later.**
#[test]
#[serial]
fn test_rate_window_hours_upper_bound() {
    reset_env();
    env::set_var("RATE_LIMIT_WINDOW_HOURS", "9223372036854775807");
    let config = RelayConfig::load(None).unwrap();
    assert!(config.pipeline().rate_limit_window().is_none());
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("RATE_LIMIT_WINDOW_HOURS"));

    reset_env();
    env::set_var(
        "RATE_LIMIT_WINDOW_HOURS",
        MAX_RATE_LIMIT_WINDOW_HOURS.to_string(),
    );
    let config = RelayConfig::load(None).unwrap();
    config.validate().unwrap();
    assert!(config.pipeline().rate_limit_window().is_some());
    reset_env();
}
