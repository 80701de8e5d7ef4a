//! Notepad bot entry point.
//!
//! Logs in to Stack Exchange chat, re-arms reminders persisted by a previous
//! run, then processes room events serially until told to reboot or update.
//! Exits with a non-zero status for `reboot`/`update` so a supervisor loop
//! (or systemd) restarts the process.

use notepad_bot::engine::{CommandEngine, EngineSignal};
use notepad_bot::scheduler::ReminderScheduler;
use notepad_bot::store::{NotepadStore, TimerRegistry};
use notepad_bot::transport::StackChat;
use notepad_bot::{BotConfig, ChatClient, config};
use std::io::Write;
use std::sync::Arc;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let bot_config = BotConfig::load();
    let email = credential("ChatExchangeU", "Email: ")?;
    let password = credential("ChatExchangeP", "Password: ")?;

    let chat = Arc::new(
        StackChat::login(&bot_config.host, &bot_config.room_id, &email, &password).await?,
    );
    tracing::info!("logged in, joining room {}", bot_config.room_id);

    let data_dir = config::data_dir();
    let store = NotepadStore::new(&data_dir);
    let registry = Arc::new(TimerRegistry::new(&data_dir));
    let scheduler = ReminderScheduler::new(
        Arc::clone(&registry),
        Arc::clone(&chat) as Arc<dyn ChatClient>,
    );

    // Best-effort recovery of reminders from the previous run.
    let now = chrono::Utc::now();
    let pending = registry.reload_at_startup(now);
    tracing::info!("{} reminder(s) pending after reload", pending.len());
    scheduler.rearm_pending(&pending, now).await;

    chat.send(&bot_config.room_id, "[notepad] Hi o/").await?;

    let engine = CommandEngine::new(
        bot_config.clone(),
        chat.bot_user_id(),
        store,
        scheduler,
        Arc::clone(&chat) as Arc<dyn ChatClient>,
    );

    let (inbound_tx, inbound_rx) = mpsc::channel(64);
    let watcher = {
        let chat = Arc::clone(&chat);
        tokio::spawn(async move {
            if let Err(e) = chat.watch(inbound_tx).await {
                tracing::error!("room watcher failed: {e}");
            }
        })
    };

    let signal = engine.run(inbound_rx).await;
    watcher.abort();

    match signal {
        Some(EngineSignal::Reboot) => {
            tracing::info!("reboot requested, exiting");
            std::process::exit(1);
        }
        Some(EngineSignal::Update) => {
            tracing::info!("update requested, pulling latest revision");
            let status = std::process::Command::new("git").arg("pull").status();
            if let Err(e) = status {
                tracing::error!("git pull failed: {e}");
            }
            std::process::exit(1);
        }
        None => {
            tracing::warn!("event stream ended, shutting down");
            Ok(())
        }
    }
}

/// Read a credential from the environment, falling back to a prompt.
fn credential(env_var: &str, prompt: &str) -> anyhow::Result<String> {
    if let Ok(value) = std::env::var(env_var)
        && !value.is_empty()
    {
        return Ok(value);
    }
    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    let value = line.trim().to_owned();
    if value.is_empty() {
        anyhow::bail!("{env_var} not set and nothing entered at the prompt");
    }
    Ok(value)
}
