#![allow(missing_docs)]

use std::collections::HashMap;

use anyhow::Result;
use omni_telegram_bus::{
    GatewayConfig, GatewayError, GatewayOverrides, GatewaySettings, IngestionMode,
    load_runtime_settings_from_paths,
};
use secrecy::ExposeSecret;

fn config_from(
    vars: &[(&str, &str)],
    overrides: &GatewayOverrides,
    settings: Option<&GatewaySettings>,
) -> Result<GatewayConfig, GatewayError> {
    let env: HashMap<String, String> = vars
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect();
    GatewayConfig::from_lookup(|name| env.get(name).cloned(), overrides, settings)
}

#[test]
fn defaults_select_polling_without_base_url() {
    let config = config_from(&[], &GatewayOverrides::default(), None).expect("config");
    assert_eq!(config.mode, IngestionMode::Polling);
    assert_eq!(config.nats_url, "nats://localhost:4222");
    assert_eq!(config.bind_addr, "0.0.0.0:8080");
    assert_eq!(config.subject_prefix, "telegram");
    assert_eq!(config.api_base_url, "https://api.telegram.org");
    assert_eq!(config.poll_timeout_secs, 30);
    assert_eq!(config.poll_retry_secs, 5);
    assert_eq!(config.shutdown_timeout_secs, 5);
    assert!(config.webhook_secret.is_none());
    assert!(config.webhook_url("bot1").is_none());
}

#[test]
fn base_url_implies_webhook_mode_and_is_trimmed() {
    let config = config_from(
        &[("WEBHOOK_BASE_URL", "https://hooks.example.com/")],
        &GatewayOverrides::default(),
        None,
    )
    .expect("config");
    assert_eq!(config.mode, IngestionMode::Webhook);
    assert_eq!(
        config.webhook_url("bot1").as_deref(),
        Some("https://hooks.example.com/webhook/bot1")
    );
}

#[test]
fn webhook_mode_requires_base_url() {
    let error = config_from(
        &[("GATEWAY_MODE", "webhook")],
        &GatewayOverrides::default(),
        None,
    )
    .expect_err("webhook without base url");
    assert!(matches!(error, GatewayError::Configuration(_)));
    assert!(error.to_string().contains("WEBHOOK_BASE_URL"));
}

#[test]
fn explicit_polling_mode_ignores_base_url() {
    let config = config_from(
        &[
            ("GATEWAY_MODE", "Polling"),
            ("WEBHOOK_BASE_URL", "https://hooks.example.com"),
        ],
        &GatewayOverrides::default(),
        None,
    )
    .expect("config");
    assert_eq!(config.mode, IngestionMode::Polling);
}

#[test]
fn unknown_mode_is_rejected() {
    assert!(matches!(
        config_from(&[("GATEWAY_MODE", "carrier-pigeon")], &GatewayOverrides::default(), None),
        Err(GatewayError::Configuration(_))
    ));
}

#[test]
fn port_env_builds_bind_address_and_bad_values_fall_back() {
    let config =
        config_from(&[("PORT", "9090")], &GatewayOverrides::default(), None).expect("config");
    assert_eq!(config.bind_addr, "0.0.0.0:9090");

    let config =
        config_from(&[("PORT", "not-a-port")], &GatewayOverrides::default(), None).expect("config");
    assert_eq!(config.bind_addr, "0.0.0.0:8080");
}

#[test]
fn cli_overrides_win_over_env_and_settings() {
    let overrides = GatewayOverrides {
        nats_url: Some("nats://cli:4222".to_string()),
        mode: Some(IngestionMode::Polling),
        bind: Some("127.0.0.1:7000".to_string()),
        subject_prefix: Some("acme.tg".to_string()),
        ..GatewayOverrides::default()
    };
    let settings = GatewaySettings {
        nats_url: Some("nats://settings:4222".to_string()),
        bind: Some("0.0.0.0:1".to_string()),
        ..GatewaySettings::default()
    };
    let config = config_from(
        &[
            ("NATS_URL", "nats://env:4222"),
            ("GATEWAY_MODE", "webhook"),
            ("PORT", "9999"),
        ],
        &overrides,
        Some(&settings),
    )
    .expect("config");
    assert_eq!(config.nats_url, "nats://cli:4222");
    assert_eq!(config.mode, IngestionMode::Polling);
    assert_eq!(config.bind_addr, "127.0.0.1:7000");
    assert_eq!(config.subject_prefix, "acme.tg");
}

#[test]
fn env_wins_over_settings_and_settings_over_defaults() {
    let settings = GatewaySettings {
        nats_url: Some("nats://settings:4222".to_string()),
        port: Some(7100),
        subject_prefix: Some("bots".to_string()),
        poll_timeout_secs: Some(50),
        ..GatewaySettings::default()
    };
    let config = config_from(
        &[("NATS_URL", "nats://env:4222")],
        &GatewayOverrides::default(),
        Some(&settings),
    )
    .expect("config");
    assert_eq!(config.nats_url, "nats://env:4222");
    assert_eq!(config.bind_addr, "0.0.0.0:7100");
    assert_eq!(config.subject_prefix, "bots");
    assert_eq!(config.poll_timeout_secs, 50);
}

#[test]
fn port_env_wins_over_settings_bind() {
    let settings = GatewaySettings {
        bind: Some("0.0.0.0:1111".to_string()),
        port: Some(7100),
        ..GatewaySettings::default()
    };
    let config = config_from(
        &[("PORT", "9090")],
        &GatewayOverrides::default(),
        Some(&settings),
    )
    .expect("config");
    assert_eq!(config.bind_addr, "0.0.0.0:9090");

    let config = config_from(
        &[("PORT", "0")],
        &GatewayOverrides::default(),
        Some(&settings),
    )
    .expect("config");
    assert_eq!(config.bind_addr, "0.0.0.0:1111");
}

#[test]
fn invalid_numeric_values_fall_back_to_defaults() {
    let settings = GatewaySettings {
        poll_retry_secs: Some(0),
        ..GatewaySettings::default()
    };
    let config = config_from(
        &[("POLL_TIMEOUT_SECS", "0"), ("SHUTDOWN_TIMEOUT_SECS", "soon")],
        &GatewayOverrides::default(),
        Some(&settings),
    )
    .expect("config");
    assert_eq!(config.poll_timeout_secs, 30);
    assert_eq!(config.poll_retry_secs, 5);
    assert_eq!(config.shutdown_timeout_secs, 5);
}

#[test]
fn webhook_secret_is_trimmed_and_empty_means_unset() {
    let config = config_from(
        &[("WEBHOOK_SECRET", "   ")],
        &GatewayOverrides::default(),
        None,
    )
    .expect("config");
    assert!(config.webhook_secret.is_none());

    let config = config_from(
        &[("WEBHOOK_SECRET", "  s3cret ")],
        &GatewayOverrides::default(),
        None,
    )
    .expect("config");
    assert_eq!(
        config.webhook_secret.as_ref().map(ExposeSecret::expose_secret),
        Some("s3cret")
    );
    assert!(!format!("{config:?}").contains("s3cret"));
}

#[test]
fn subject_prefix_must_be_a_literal_subject() {
    for prefix in ["tele.*", "tg.>", ".tg", "tg.", "a..b", "with space"] {
        let result = config_from(
            &[("SUBJECT_PREFIX", prefix)],
            &GatewayOverrides::default(),
            None,
        );
        assert!(
            matches!(result, Err(GatewayError::Configuration(_))),
            "{prefix} should be rejected"
        );
    }
}

#[test]
fn api_base_url_trailing_slash_is_trimmed() {
    let config = config_from(
        &[("TELEGRAM_API_BASE_URL", "http://127.0.0.1:8081/")],
        &GatewayOverrides::default(),
        None,
    )
    .expect("config");
    assert_eq!(config.api_base_url, "http://127.0.0.1:8081");
}

#[test]
fn settings_files_merge_user_over_system() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let system = dir.path().join("system.yaml");
    let user = dir.path().join("user.yaml");
    std::fs::write(
        &system,
        "gateway:\n  nats_url: nats://system:4222\n  port: 8100\n  subject_prefix: sys\n",
    )?;
    std::fs::write(&user, "gateway:\n  port: 8200\n  mode: polling\n")?;

    let settings = load_runtime_settings_from_paths(&system, &user);
    assert_eq!(
        settings.gateway.nats_url.as_deref(),
        Some("nats://system:4222")
    );
    assert_eq!(settings.gateway.port, Some(8200));
    assert_eq!(settings.gateway.subject_prefix.as_deref(), Some("sys"));
    assert_eq!(settings.gateway.mode.as_deref(), Some("polling"));
    Ok(())
}

#[test]
fn missing_or_broken_settings_files_are_ignored() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let broken = dir.path().join("broken.yaml");
    std::fs::write(&broken, "gateway: [not, a, map")?;

    let settings = load_runtime_settings_from_paths(&dir.path().join("absent.yaml"), &broken);
    assert!(settings.gateway.nats_url.is_none());
    assert!(settings.gateway.port.is_none());
    Ok(())
}
