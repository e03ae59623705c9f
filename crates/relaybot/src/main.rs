use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use relaybot_core::config::{Config, ConfigOverrides};

/// Telegram-controlled relay board.
#[derive(Debug, Parser)]
#[command(name = "relaybot", version, about)]
struct Cli {
    /// Path of the serial port device (empty string: debug mode, nothing is sent)
    #[arg(long)]
    port: Option<String>,

    /// Telegram bot token
    #[arg(long)]
    token: Option<String>,

    /// Allowed users' ids: id0[,id1[...]]
    #[arg(long)]
    users: Option<String>,
}

impl From<Cli> for ConfigOverrides {
    fn from(cli: Cli) -> Self {
        Self {
            serial_port: cli.port,
            telegram_bot_token: cli.token,
            telegram_allowed_users: cli.users,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), relaybot_core::Error> {
    let cli = Cli::parse();
    relaybot_core::logging::init("relaybot")?;

    let cfg = Arc::new(Config::load_with(cli.into())?);
    let device = relaybot_serial::open_device(cfg.serial_port.as_deref(), cfg.serial_baud_rate)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("ctrl-c received, shutting down");
                cancel.cancel();
            }
        });
    }

    relaybot_telegram::router::run_polling(cfg, device, cancel)
        .await
        .map_err(|e| relaybot_core::Error::Transport(format!("telegram bot failed: {e}")))?;

    Ok(())
}
