//! Periodic and delayed tasks on the tokio runtime
//!
//! Each engine loop is a [`BackgroundTask`]: a tokio interval driving a
//! synchronous body. Ticks that fall behind are skipped rather than bunched,
//! and stopping lets an in-flight tick finish before the task exits.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::objects::panic_message;

type TickBody = Box<dyn FnMut() + Send + 'static>;

/// Cancellable periodic task
pub struct BackgroundTask {
    name: String,
    interval: Duration,
    body: Option<TickBody>,
    shutdown: Option<watch::Sender<bool>>,
    join: Option<JoinHandle<TickBody>>,
}

impl BackgroundTask {
    /// Create a stopped task that runs `body` every `interval`
    pub fn new(name: impl Into<String>, interval: Duration, body: impl FnMut() + Send + 'static) -> Self {
        Self {
            name: name.into(),
            interval: interval.max(Duration::from_millis(1)),
            body: Some(Box::new(body)),
            shutdown: None,
            join: None,
        }
    }

    /// Task name, used in logs
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tick interval
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether the task has been started and not stopped
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|join| !join.is_finished())
    }

    /// Spawn the tick loop on `runtime`. Returns `false` if already running.
    pub fn start(&mut self, runtime: &Handle) -> bool {
        let Some(mut body) = self.body.take() else {
            return false;
        };
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let interval = self.interval;
        let name = self.name.clone();

        let join = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            log::debug!("task '{name}' started ({interval:?})");

            loop {
                tokio::select! {
                    biased;
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        if let Err(payload) = catch_unwind(AssertUnwindSafe(&mut body)) {
                            log::error!("task '{name}' tick panicked: {}", panic_message(&*payload));
                        }
                    }
                }
            }

            log::debug!("task '{name}' stopped");
            body
        });

        self.shutdown = Some(shutdown_tx);
        self.join = Some(join);
        true
    }

    /// Signal shutdown and wait for the loop to exit.
    ///
    /// The task can be started again afterwards.
    pub async fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(true);
        }
        if let Some(join) = self.join.take() {
            match join.await {
                Ok(body) => self.body = Some(body),
                Err(error) => log::error!("task '{}' did not stop cleanly: {error}", self.name),
            }
        }
    }
}

impl std::fmt::Debug for BackgroundTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundTask")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Single delayed invocation on the runtime
#[derive(Debug)]
pub struct FireOnce {
    join: JoinHandle<()>,
}

impl FireOnce {
    /// Run `action` once after `delay`
    pub fn schedule(runtime: &Handle, delay: Duration, action: impl FnOnce() + Send + 'static) -> Self {
        let join = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(payload) = catch_unwind(AssertUnwindSafe(action)) {
                log::error!("delayed task panicked: {}", panic_message(&*payload));
            }
        });
        Self { join }
    }

    /// Cancel if it has not fired yet
    pub fn cancel(&self) {
        self.join.abort();
    }

    /// Whether the action ran or was cancelled
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_time()
            .build()
            .unwrap()
    }

    #[test]
    fn test_task_ticks_until_stopped() {
        let rt = runtime();
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let mut task = BackgroundTask::new("counter", Duration::from_millis(2), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(task.start(rt.handle()));
        assert!(!task.start(rt.handle()));
        std::thread::sleep(Duration::from_millis(50));
        rt.block_on(task.stop());

        let after_stop = ticks.load(Ordering::SeqCst);
        assert!(after_stop > 0);
        assert!(!task.is_running());

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_task_can_restart() {
        let rt = runtime();
        let mut task = BackgroundTask::new("restart", Duration::from_millis(5), || {});
        assert!(task.start(rt.handle()));
        rt.block_on(task.stop());
        assert!(task.start(rt.handle()));
        rt.block_on(task.stop());
    }

    #[test]
    fn test_panicking_tick_keeps_running() {
        let rt = runtime();
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let mut task = BackgroundTask::new("flaky", Duration::from_millis(2), move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first tick fails");
            }
        });

        task.start(rt.handle());
        std::thread::sleep(Duration::from_millis(40));
        rt.block_on(task.stop());
        assert!(ticks.load(Ordering::SeqCst) > 1);
    }

    #[test]
    fn test_fire_once() {
        let rt = runtime();
        let fired = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&fired);
        let once = FireOnce::schedule(rt.handle(), Duration::from_millis(5), move || {
            flag.fetch_add(1, Ordering::SeqCst);
        });
        std::thread::sleep(Duration::from_millis(50));
        assert!(once.is_finished());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fire_once_cancel() {
        let rt = runtime();
        let fired = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&fired);
        let once = FireOnce::schedule(rt.handle(), Duration::from_millis(200), move || {
            flag.fetch_add(1, Ordering::SeqCst);
        });
        once.cancel();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
