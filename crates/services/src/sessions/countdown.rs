use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

/// Repeating one-second ticker for an active session.
///
/// Each countdown carries a generation so ticks already queued by a cancelled
/// countdown can be told apart from the live one. Dropping the value aborts
/// the task.
#[derive(Debug)]
pub(crate) struct Countdown {
    generation: u64,
    handle: JoinHandle<()>,
}

impl Countdown {
    pub(crate) fn spawn<E>(
        generation: u64,
        period: Duration,
        events: UnboundedSender<E>,
        tick: fn(u64) -> E,
    ) -> Self
    where
        E: Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if events.send(tick(generation)).is_err() {
                    break;
                }
            }
        });
        Self { generation, handle }
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
