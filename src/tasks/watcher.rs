use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::{
    infrastructure::shutdown::ShutdownListener,
    page::{CheckReason, Enforcement, MutationFeed, PageController},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchStats {
    pub polls: u64,
    pub mutations: u64,
    pub halts: u64,
}

pub struct SelfNavigationWatcher {
    controller: Arc<PageController>,
    poll_interval: Duration,
}

impl SelfNavigationWatcher {
    pub fn new(controller: Arc<PageController>, poll_interval: Duration) -> Self {
        Self {
            controller,
            poll_interval,
        }
    }

    pub fn spawn(
        self,
        feed: MutationFeed,
        mut shutdown: ShutdownListener,
    ) -> JoinHandle<WatchStats> {
        tokio::spawn(async move { self.run_loop(feed, &mut shutdown).await })
    }

    async fn run_loop(
        &self,
        mut feed: MutationFeed,
        shutdown: &mut ShutdownListener,
    ) -> WatchStats {
        let mut stats = WatchStats::default();
        self.check(CheckReason::Load, &mut stats);

        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately and the load check covered it
        ticker.tick().await;

        let mut feed_open = true;
        loop {
            if shutdown.is_triggered() {
                break;
            }
            tokio::select! {
                _ = shutdown.notified() => break,
                _ = ticker.tick() => {
                    stats.polls += 1;
                    self.check(CheckReason::Poll, &mut stats);
                }
                batch = feed.next(), if feed_open => match batch {
                    Some(_) => {
                        stats.mutations += 1;
                        self.check(CheckReason::Mutation, &mut stats);
                    }
                    None => {
                        tracing::debug!(target: "watcher", "mutation feed closed; polling only");
                        feed_open = false;
                    }
                },
            }
        }

        tracing::info!(
            target: "watcher",
            polls = stats.polls,
            mutations = stats.mutations,
            halts = stats.halts,
            "self-navigation watcher stopped"
        );
        stats
    }

    fn check(&self, reason: CheckReason, stats: &mut WatchStats) {
        if self.controller.enforce(reason) == Enforcement::Halted {
            stats.halts += 1;
        }
    }
}
