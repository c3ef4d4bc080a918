#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use omni_telegram_bus::test_support::{RecordingBus, RecordingTelegramApi};
use omni_telegram_bus::{
    BotRegistry, Gateway, GatewayConfig, GatewayOverrides, build_health_app, start_http_server,
};
use tokio::sync::oneshot;

fn config(vars: &[(&str, &str)], bind: &str) -> GatewayConfig {
    let env: HashMap<String, String> = vars
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect();
    let overrides = GatewayOverrides {
        bind: Some(bind.to_string()),
        ..GatewayOverrides::default()
    };
    GatewayConfig::from_lookup(|name| env.get(name).cloned(), &overrides, None).expect("config")
}

fn registry() -> BotRegistry {
    BotRegistry::discover_from([("BOT_ALPHA", "1:a"), ("BOT_BETA", "2:b")]).expect("registry")
}

async fn loopback_bind_permitted() -> Result<bool> {
    match tokio::net::TcpListener::bind("127.0.0.1:0").await {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
            eprintln!("skipping gateway tests: local socket bind is not permitted");
            Ok(false)
        }
        Err(err) => Err(err.into()),
    }
}

async fn wait_for(condition: impl Fn() -> bool) -> bool {
    for _ in 0..300 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn polling_gateway_routes_both_directions_and_shuts_down() -> Result<()> {
    if !loopback_bind_permitted().await? {
        return Ok(());
    }
    let bus = Arc::new(RecordingBus::new());
    let api = Arc::new(RecordingTelegramApi::new());
    api.push_response(
        "getUpdates",
        r#"{"ok":true,"result":[{"update_id":40,"message":{"text":"hello"}}]}"#,
    );
    let gateway = Gateway::new(
        config(
            &[
                ("GATEWAY_MODE", "polling"),
                ("POLL_TIMEOUT_SECS", "1"),
                ("POLL_RETRY_SECS", "1"),
                ("SHUTDOWN_TIMEOUT_SECS", "2"),
            ],
            "127.0.0.1:0",
        ),
        registry(),
        bus.clone(),
        api.clone(),
    );

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let run = tokio::spawn(gateway.run(async move {
        let _ = stop_rx.await;
    }));

    assert!(wait_for(|| bus.subscriptions().len() == 2).await);
    let mut patterns = bus.subscriptions();
    patterns.sort();
    assert_eq!(patterns, vec!["telegram.alpha.out.>", "telegram.beta.out.>"]);

    assert!(
        wait_for(|| {
            bus.published_on("telegram.alpha.in.message").len()
                + bus.published_on("telegram.beta.in.message").len()
                == 1
        })
        .await
    );

    assert_eq!(
        bus.inject(
            "telegram.beta.out.sendMessage",
            r#"{"chat_id":1,"text":"pong"}"#,
            Some("_INBOX.gw.1"),
        ),
        1
    );
    assert!(wait_for(|| bus.published_on("_INBOX.gw.1").len() == 1).await);
    let sends = api.calls_to("sendMessage");
    assert_eq!(sends.len(), 1);
    assert_eq!(sends[0].bot, "beta");

    let _ = stop_tx.send(());
    tokio::time::timeout(Duration::from_secs(10), run).await???;

    assert_eq!(bus.flush_count(), 1);
    assert_eq!(api.calls_to("deleteWebhook").len(), 2);
    assert!(api.calls_to("setWebhook").is_empty());
    Ok(())
}

#[tokio::test]
async fn webhook_gateway_registers_and_deregisters_every_bot() -> Result<()> {
    if !loopback_bind_permitted().await? {
        return Ok(());
    }
    let bus = Arc::new(RecordingBus::new());
    let api = Arc::new(RecordingTelegramApi::new());
    let gateway = Gateway::new(
        config(
            &[
                ("WEBHOOK_BASE_URL", "https://hooks.example.com/"),
                ("WEBHOOK_SECRET", "s3cret"),
                ("SHUTDOWN_TIMEOUT_SECS", "2"),
            ],
            "127.0.0.1:0",
        ),
        registry(),
        bus.clone(),
        api.clone(),
    );

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let run = tokio::spawn(gateway.run(async move {
        let _ = stop_rx.await;
    }));

    assert!(wait_for(|| api.calls_to("setWebhook").len() == 2).await);
    let mut urls: Vec<String> = api
        .calls_to("setWebhook")
        .iter()
        .map(|call| {
            let payload: serde_json::Value =
                serde_json::from_slice(&call.payload).expect("payload");
            assert_eq!(payload["secret_token"], "s3cret");
            payload["url"].as_str().expect("url").to_string()
        })
        .collect();
    urls.sort();
    assert_eq!(
        urls,
        vec![
            "https://hooks.example.com/webhook/alpha",
            "https://hooks.example.com/webhook/beta"
        ]
    );
    assert!(api.calls_to("deleteWebhook").is_empty());
    assert!(api.calls_to("getUpdates").is_empty());

    let _ = stop_tx.send(());
    tokio::time::timeout(Duration::from_secs(10), run).await???;

    assert_eq!(api.calls_to("deleteWebhook").len(), 2);
    assert_eq!(bus.flush_count(), 1);
    Ok(())
}

#[tokio::test]
async fn subscribe_failure_is_fatal() {
    let bus = Arc::new(RecordingBus::new());
    bus.set_fail_subscribe(true);
    let api = Arc::new(RecordingTelegramApi::new());
    let gateway = Gateway::new(
        config(&[("GATEWAY_MODE", "polling")], "127.0.0.1:0"),
        registry(),
        bus,
        api.clone(),
    );

    let error = gateway
        .run(std::future::pending())
        .await
        .expect_err("subscribe failure must abort startup");
    assert!(format!("{error:#}").contains("subscribe"), "{error:#}");
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn bind_failure_is_fatal() -> Result<()> {
    let occupied = match tokio::net::TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => return Ok(()),
        Err(err) => return Err(err.into()),
    };
    let addr = occupied.local_addr()?.to_string();
    let api = Arc::new(RecordingTelegramApi::new());
    let gateway = Gateway::new(
        config(&[("GATEWAY_MODE", "polling")], &addr),
        registry(),
        Arc::new(RecordingBus::new()),
        api.clone(),
    );

    let error = gateway
        .run(std::future::pending())
        .await
        .expect_err("bind failure must abort startup");
    assert!(format!("{error:#}").contains("bind"), "{error:#}");
    assert!(api.calls_to("getUpdates").is_empty());
    Ok(())
}

#[tokio::test]
async fn http_server_reports_its_bound_address_and_stops() -> Result<()> {
    if !loopback_bind_permitted().await? {
        return Ok(());
    }
    let server = start_http_server("127.0.0.1:0", build_health_app()).await?;
    let addr = server.local_addr();
    assert_ne!(addr.port(), 0);

    let body = reqwest::get(format!("http://{addr}/health")).await?.text().await?;
    assert_eq!(body, "ok");

    server.stop(Duration::from_secs(2)).await;
    assert!(reqwest::get(format!("http://{addr}/health")).await.is_err());
    Ok(())
}
