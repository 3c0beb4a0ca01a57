//! Background polling tasks

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Shortest period a polling task runs at
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Handle to a spawned polling task; the task stops when the handle is dropped
#[derive(Debug)]
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Run `tick` every `period`, starting immediately.
    ///
    /// Periods shorter than [`MIN_PERIOD`] are raised to it. Must be called
    /// from within a tokio runtime.
    pub fn spawn<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticker = interval(period.max(MIN_PERIOD));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tick().await;
            }
        });
        Self { task }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
