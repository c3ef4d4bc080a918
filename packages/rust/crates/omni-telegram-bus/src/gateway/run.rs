use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use tokio::task::{Id, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

use super::server::start_http_server;
use crate::bus::MessageBus;
use crate::channels::telegram::{
    OutgoingDispatcher, PollIngestor, PollPolicy, TelegramApi, UpdateRouter, WebhookRegistration,
    WebhookState, build_health_app, build_webhook_app, deregister_all, register_until_done,
};
use crate::config::{BotRegistry, GatewayConfig, IngestionMode};

struct TaskLabel {
    bot: String,
    role: &'static str,
}

/// Wires every bot's ingestion and dispatcher onto one bus and one HTTP server.
pub struct Gateway {
    config: GatewayConfig,
    registry: BotRegistry,
    bus: Arc<dyn MessageBus>,
    api: Arc<dyn TelegramApi>,
    secret_token: Option<Arc<SecretString>>,
}

impl Gateway {
    pub fn new(
        mut config: GatewayConfig,
        registry: BotRegistry,
        bus: Arc<dyn MessageBus>,
        api: Arc<dyn TelegramApi>,
    ) -> Self {
        let secret_token = config.webhook_secret.take().map(Arc::new);
        Self {
            config,
            registry,
            bus,
            api,
            secret_token,
        }
    }

    /// Run until `shutdown` resolves, then tear down in order: cancel loops,
    /// remove webhooks, stop the HTTP server, drain tasks, flush the bus.
    ///
    /// Fails only on startup (subscribe, bind) or when the HTTP server dies.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Self {
            config,
            registry,
            bus,
            api,
            secret_token,
        } = self;
        let grace = Duration::from_secs(config.shutdown_timeout_secs);
        let router = UpdateRouter::new(Arc::clone(&bus), config.subject_prefix.clone());

        tracing::info!(
            mode = %config.mode,
            bots = ?registry.names(),
            subject_prefix = %config.subject_prefix,
            "starting telegram bus gateway"
        );

        let mut dispatchers = Vec::with_capacity(registry.len());
        for bot in registry.iter() {
            let dispatcher = OutgoingDispatcher::new(
                Arc::clone(bot),
                Arc::clone(&bus),
                Arc::clone(&api),
                config.subject_prefix.clone(),
            );
            let subscription = dispatcher.subscribe().await.with_context(|| {
                format!("failed to subscribe outgoing subjects for bot `{}`", bot.name())
            })?;
            dispatchers.push((dispatcher, subscription));
        }

        let app = match config.mode {
            IngestionMode::Webhook => build_webhook_app(WebhookState::new(
                registry.clone(),
                router.clone(),
                secret_token.clone(),
            )),
            IngestionMode::Polling => build_health_app(),
        };
        let mut server = start_http_server(&config.bind_addr, app).await?;

        let cancel = CancellationToken::new();
        let mut tasks: JoinSet<()> = JoinSet::new();
        let mut labels: HashMap<Id, TaskLabel> = HashMap::new();

        for (dispatcher, subscription) in dispatchers {
            let label = TaskLabel {
                bot: dispatcher.bot_name().to_string(),
                role: "dispatcher",
            };
            let handle = tasks.spawn(dispatcher.run(subscription, cancel.child_token()));
            labels.insert(handle.id(), label);
        }

        match config.mode {
            IngestionMode::Polling => {
                let policy = PollPolicy::from_config(&config);
                for bot in registry.iter() {
                    let ingestor =
                        PollIngestor::new(Arc::clone(bot), Arc::clone(&api), router.clone(), policy);
                    let token = cancel.child_token();
                    let handle = tasks.spawn(async move {
                        ingestor.run(token).await;
                    });
                    labels.insert(
                        handle.id(),
                        TaskLabel {
                            bot: bot.name().to_string(),
                            role: "poller",
                        },
                    );
                }
            }
            IngestionMode::Webhook => {
                for bot in registry.iter() {
                    let Some(url) = config.webhook_url(bot.name()) else {
                        continue;
                    };
                    let registration = WebhookRegistration {
                        url,
                        secret_token: secret_token.clone(),
                        retry_delay: Duration::from_secs(config.poll_retry_secs),
                    };
                    let api = Arc::clone(&api);
                    let identity = Arc::clone(bot);
                    let token = cancel.child_token();
                    let handle = tasks.spawn(async move {
                        register_until_done(api, identity, registration, token).await;
                    });
                    labels.insert(
                        handle.id(),
                        TaskLabel {
                            bot: bot.name().to_string(),
                            role: "webhook registration",
                        },
                    );
                }
            }
        }

        tokio::pin!(shutdown);
        let mut server_failed = false;
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                () = server.exited() => {
                    server_failed = true;
                    break;
                }
                Some(joined) = tasks.join_next_with_id() => log_task_exit(&mut labels, joined),
            }
        }

        tracing::info!("shutting down telegram bus gateway");
        cancel.cancel();

        if config.mode == IngestionMode::Webhook {
            match tokio::time::timeout(grace, deregister_all(api.as_ref(), &registry)).await {
                Ok(0) => {}
                Ok(failed) => tracing::warn!(failed, "some webhooks were not removed"),
                Err(_) => tracing::warn!("webhook removal did not finish within grace period"),
            }
        }

        server.stop(grace).await;

        let drained = tokio::time::timeout(grace, async {
            while let Some(joined) = tasks.join_next_with_id().await {
                log_task_exit(&mut labels, joined);
            }
        })
        .await;
        if drained.is_err() {
            tracing::warn!(
                remaining = tasks.len(),
                "per-bot tasks did not stop within grace period; aborting"
            );
            tasks.abort_all();
            while let Some(joined) = tasks.join_next_with_id().await {
                log_task_exit(&mut labels, joined);
            }
        }

        if let Err(error) = bus.flush().await {
            tracing::warn!(error = %error, "failed to flush bus on shutdown");
        }
        tracing::info!("telegram bus gateway stopped");

        if server_failed {
            bail!("HTTP server stopped unexpectedly");
        }
        Ok(())
    }
}

fn log_task_exit(labels: &mut HashMap<Id, TaskLabel>, joined: Result<(Id, ()), JoinError>) {
    match joined {
        Ok((id, ())) => {
            if let Some(label) = labels.remove(&id) {
                tracing::debug!(bot = %label.bot, role = label.role, "task finished");
            }
        }
        Err(error) => {
            let label = labels.remove(&error.id());
            let (bot, role) = label
                .as_ref()
                .map_or(("?", "?"), |label| (label.bot.as_str(), label.role));
            if error.is_panic() {
                tracing::error!(bot, role, error = %error, "task panicked");
            } else {
                tracing::debug!(bot, role, "task cancelled");
            }
        }
    }
}
