use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::{
    io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    task::JoinHandle,
    time::timeout,
};

use crate::{
    config::{AppConfig, ConfigError},
    infrastructure::shutdown::{Shutdown, StopReason},
    page::{observe, ObserveOptions, PageController, SimulatedPage},
    policy::NavigationGuard,
    rules::{load_rules_file, CompiledRules},
    session::{Command, GuardSession, SessionEvent},
    tasks::watcher::{SelfNavigationWatcher, WatchStats},
};

pub struct GuardApp {
    session: GuardSession,
    watcher: JoinHandle<WatchStats>,
    shutdown: Shutdown,
}

impl GuardApp {
    pub fn initialize(config: AppConfig, shutdown: Shutdown) -> Result<Self> {
        let rules = load_rules(&config)?;
        let guard = Arc::new(NavigationGuard::new(rules));

        let page = Arc::new(SimulatedPage::new(&config.page_url));
        let (observer, feed) = observe(ObserveOptions::document(), config.watch.mutation_buffer);
        page.attach_observer(observer.clone());

        let controller = Arc::new(PageController::new(guard.clone(), page.clone()));
        let watcher = SelfNavigationWatcher::new(controller.clone(), config.watch.poll_interval)
            .spawn(feed, shutdown.subscribe());

        let session = GuardSession::new(guard, page, controller, observer);
        tracing::info!(
            target: "session",
            page = %config.page_url,
            poll_ms = config.watch.poll_interval.as_millis() as u64,
            "popup guard session ready"
        );

        Ok(Self {
            session,
            watcher,
            shutdown,
        })
    }

    pub async fn run(self) -> Result<()> {
        let GuardApp {
            mut session,
            watcher,
            shutdown,
        } = self;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();
        let mut shutdown_listener = shutdown.subscribe();

        loop {
            let line = tokio::select! {
                _ = shutdown_listener.notified() => break,
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                shutdown.trigger(StopReason::InputClosed);
                break;
            };

            let event = match Command::parse(&line) {
                Ok(Some(command)) => session.execute(command),
                Ok(None) => continue,
                Err(err) => {
                    tracing::warn!(target: "session", error = %err, "rejected command");
                    GuardSession::error_event(err.to_string())
                }
            };
            write_event(&mut stdout, &event).await?;
        }

        shutdown.trigger(StopReason::InputClosed);
        let reason = shutdown
            .reason()
            .map(|r| r.to_string())
            .unwrap_or_default();
        tracing::info!(target: "session", reason = %reason, "stopping session");

        let shutdown_timeout = Duration::from_secs(5);
        match timeout(shutdown_timeout, watcher).await {
            Ok(Ok(stats)) => {
                tracing::info!(
                    target: "session",
                    polls = stats.polls,
                    mutations = stats.mutations,
                    halts = stats.halts,
                    "watcher finished"
                );
            }
            Ok(Err(err)) => {
                if err.is_panic() {
                    tracing::error!(target: "watcher", "self-navigation watcher panicked");
                }
            }
            Err(_) => {
                tracing::warn!(
                    target: "watcher",
                    "watcher did not stop within {:?}",
                    shutdown_timeout
                );
            }
        }
        Ok(())
    }
}

fn load_rules(config: &AppConfig) -> Result<Arc<CompiledRules>, ConfigError> {
    match &config.rules_path {
        Some(path) => {
            let rules = load_rules_file(path)?.compile()?;
            tracing::info!(
                target: "session",
                path = %path.display(),
                blocked = rules.blocked.len(),
                whitelisted = rules.whitelisted.len(),
                "loaded rule file"
            );
            Ok(Arc::new(rules))
        }
        None => Ok(CompiledRules::builtin()),
    }
}

async fn write_event<W>(out: &mut W, event: &SessionEvent) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    out.write_all(&line).await?;
    out.flush().await?;
    Ok(())
}
