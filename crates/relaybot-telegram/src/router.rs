use std::sync::Arc;

use teloxide::prelude::*;
use tokio_util::sync::CancellationToken;

use relaybot_core::{
    audit::AuditLogger,
    commands::CommandTable,
    config::Config,
    device::DeviceTransport,
    dispatch::Dispatcher,
    messaging::port::MessagingPort,
    observer::{Observers, RelayObserver, TracingObserver},
    poll::PollLoop,
};

use crate::TelegramMessenger;

/// Tracing always; the audit file only when a path is configured.
pub fn build_observer(cfg: &Config) -> Observers {
    let observers = Observers::new().with(Arc::new(TracingObserver));
    match &cfg.audit_log_path {
        Some(path) => {
            observers.with(Arc::new(AuditLogger::new(path.clone(), cfg.audit_log_json)))
        }
        None => observers,
    }
}

/// Long-poll Telegram and drive `device` until `cancel` fires or fetching
/// fails for good.
pub async fn run_polling(
    cfg: Arc<Config>,
    device: DeviceTransport,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let bot = Bot::new(cfg.telegram_bot_token.clone());

    // Basic startup info.
    if let Ok(me) = bot.get_me().await {
        tracing::info!("relaybot started: @{}", me.username());
    }
    tracing::info!(
        "Allowed users: {}, device: {}",
        cfg.telegram_allowed_users.len(),
        if device.is_connected() {
            "connected"
        } else {
            "debug mode"
        }
    );
    if cfg.telegram_allowed_users.is_empty() {
        tracing::warn!("allow-list is empty, every message will be rejected");
    }

    let messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot));
    let observer: Arc<dyn RelayObserver> = Arc::new(build_observer(&cfg));
    let retry = cfg.retry_policy();

    let dispatcher = Dispatcher::new(
        CommandTable::default(),
        cfg.telegram_allowed_users.clone(),
        device,
        messenger.clone(),
        retry,
        observer.clone(),
    );

    let mut poll = PollLoop::new(
        messenger,
        dispatcher,
        observer,
        cfg.poll_settings(),
        cancel,
    );
    poll.run().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaybot_core::config::ConfigOverrides;

    fn cfg(extra: &[(&str, &str)]) -> Config {
        let mut pairs = vec![("TELEGRAM_BOT_TOKEN".to_string(), "t".to_string())];
        pairs.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        Config::from_lookup(ConfigOverrides::default(), |key| {
            pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        })
        .unwrap()
    }

    #[test]
    fn audit_observer_is_opt_in() {
        let path = std::env::temp_dir().join(format!("relaybot-router-{}.log", std::process::id()));
        let with_audit = cfg(&[("AUDIT_LOG_PATH", path.to_str().unwrap())]);
        let without = cfg(&[]);

        assert_eq!(build_observer(&with_audit).len(), 2);
        assert_eq!(build_observer(&without).len(), 1);
        // Nothing is written until a message is handled.
        assert!(!path.exists());
    }
}
