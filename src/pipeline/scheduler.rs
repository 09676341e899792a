// src/pipeline/scheduler.rs

//! Cancellable periodic runner.
//!
//! One background task per running scheduler. Each iteration awaits the tick,
//! then sleeps for the interval while watching a [`CancellationToken`], so a
//! stop request lands as soon as the in-flight tick finishes.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

struct RunningTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct PollScheduler {
    interval: Duration,
    task: Option<RunningTask>,
}

impl PollScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the sleep between ticks. Applies from the next `start`.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn state(&self) -> SchedulerState {
        if self.task.is_some() {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == SchedulerState::Running
    }

    /// Whether the background task ended without being stopped.
    pub fn has_terminated(&self) -> bool {
        self.task.as_ref().is_some_and(|t| t.handle.is_finished())
    }

    /// Spawn the loop. Returns `false` (and does nothing) if already running.
    ///
    /// The first tick runs immediately.
    pub fn start<F, Fut>(&mut self, mut tick: F) -> bool
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        if self.task.is_some() {
            log::debug!("Scheduler already running, start ignored");
            return false;
        }

        let token = CancellationToken::new();
        let child = token.clone();
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            loop {
                if child.is_cancelled() {
                    break;
                }
                tick().await;
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
            log::debug!("Scheduler loop exited");
        });

        self.task = Some(RunningTask { token, handle });
        true
    }

    /// Cancel the loop and wait until it has fully exited. No-op when idle.
    pub async fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        task.token.cancel();
        if let Err(e) = task.handle.await {
            if e.is_panic() {
                log::warn!("Scheduler task panicked: {}", e);
            }
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use tokio::sync::mpsc;
    use tokio::time::timeout;

    use super::*;

    fn counting(counter: Arc<AtomicUsize>) -> impl FnMut() -> std::future::Ready<()> + Send {
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test]
    async fn test_ticks_repeatedly_until_stopped() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = PollScheduler::new(Duration::from_millis(10));
        assert!(scheduler.start(counting(counter.clone())));

        timeout(Duration::from_secs(5), async {
            while counter.load(Ordering::SeqCst) < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        scheduler.stop().await;
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        let after_stop = counter.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn test_start_while_running_is_noop() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = PollScheduler::new(Duration::from_secs(3600));
        assert!(scheduler.start(counting(counter.clone())));
        assert!(!scheduler.start(counting(counter.clone())));
        assert!(scheduler.is_running());
        scheduler.stop().await;
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_noop() {
        let mut scheduler = PollScheduler::new(Duration::from_secs(1));
        scheduler.stop().await;
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert!(!scheduler.has_terminated());
    }

    #[tokio::test]
    async fn test_stop_does_not_wait_out_interval() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = PollScheduler::new(Duration::from_secs(3600));
        scheduler.start(move || {
            let tx = tx.clone();
            async move {
                let _ = tx.send(());
            }
        });
        rx.recv().await.unwrap();

        let started = Instant::now();
        timeout(Duration::from_secs(1), scheduler.stop())
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stop_waits_for_in_flight_tick() {
        let done = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut scheduler = PollScheduler::new(Duration::from_secs(3600));
        let flag = done.clone();
        scheduler.start(move || {
            let tx = tx.clone();
            let flag = flag.clone();
            async move {
                let _ = tx.send(());
                tokio::time::sleep(Duration::from_millis(100)).await;
                flag.fetch_add(1, Ordering::SeqCst);
            }
        });
        rx.recv().await.unwrap();

        scheduler.stop().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    async fn explode() {
        panic!("tick failed");
    }

    #[tokio::test]
    async fn test_panicking_tick_terminates_task() {
        let mut scheduler = PollScheduler::new(Duration::from_millis(10));
        scheduler.start(explode);

        timeout(Duration::from_secs(5), async {
            while !scheduler.has_terminated() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert!(scheduler.is_running());
        scheduler.stop().await;
        assert!(!scheduler.is_running());
    }
}
