//! Fixed-interval refresh of a screen's backing data.
//!
//! Every mount gets a new [`Generation`]. A fetch that resolves after its
//! generation was superseded (remount or unmount) is dropped, so a slow
//! response can never overwrite the snapshot of a screen that is gone.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::ClientError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Token identifying one mount of a poller.
#[derive(Debug, Clone)]
pub struct Generation {
    id: u64,
    current: Arc<AtomicU64>,
}

impl Generation {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.id
    }
}

/// Polls `fetch` every `period` while mounted and publishes the latest
/// successful result. Failed polls leave the previous snapshot in place.
pub struct Poller<T> {
    period: Duration,
    current: Arc<AtomicU64>,
    tx: Arc<watch::Sender<Option<T>>>,
    task: Option<JoinHandle<()>>,
}

impl<T> Poller<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(period: Duration) -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            period,
            current: Arc::new(AtomicU64::new(0)),
            tx: Arc::new(tx),
            task: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.tx.subscribe()
    }

    pub fn latest(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.task.is_some()
    }

    /// Start polling. Any previous mount is stopped and its results discarded.
    pub fn mount<F, Fut>(&mut self, fetch: F) -> Generation
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        self.unmount();

        let id = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Generation {
            id,
            current: self.current.clone(),
        };

        let token = generation.clone();
        let tx = self.tx.clone();
        let period = self.period;

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                // First tick fires immediately
                ticker.tick().await;
                let result = fetch().await;

                if !publish(&tx, &token, result) {
                    tracing::debug!(generation = token.id(), "Dropping stale poll result");
                    break;
                }
            }
        }));

        generation
    }

    /// Stop polling and clear the snapshot.
    pub fn unmount(&mut self) {
        self.stop();
        self.tx.send_replace(None);
    }

    fn stop(&mut self) {
        self.current.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Store a poll result unless `token` was superseded. The generation check
/// runs under the channel lock, so it cannot interleave with `unmount`.
/// Returns false for a stale token.
fn publish<T>(
    tx: &watch::Sender<Option<T>>,
    token: &Generation,
    result: Result<T, ClientError>,
) -> bool {
    let mut current = true;
    tx.send_if_modified(|slot| {
        if !token.is_current() {
            current = false;
            return false;
        }
        match result {
            Ok(snapshot) => {
                *slot = Some(snapshot);
                true
            }
            Err(ref e) => {
                tracing::warn!("Poll failed, keeping previous snapshot: {}", e);
                false
            }
        }
    });
    current
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        self.current.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PERIOD: Duration = Duration::from_millis(20);

    fn counting_fetch() -> impl Fn() -> std::pin::Pin<
        Box<dyn Future<Output = Result<u64, ClientError>> + Send>,
    > + Send
           + 'static {
        let calls = Arc::new(AtomicU64::new(0));
        move || {
            let calls = calls.clone();
            Box::pin(async move { Ok(calls.fetch_add(1, Ordering::SeqCst) + 1) })
        }
    }

    #[tokio::test]
    async fn test_publishes_snapshots_while_mounted() {
        let mut poller: Poller<u64> = Poller::new(PERIOD);
        let mut rx = poller.subscribe();

        let generation = poller.mount(counting_fetch());
        assert!(generation.is_current());

        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*rx.borrow(), Some(1));

        tokio::time::sleep(PERIOD * 4).await;
        assert!(poller.latest().unwrap() > 1);
    }

    #[tokio::test]
    async fn test_unmount_stops_and_clears() {
        let mut poller: Poller<u64> = Poller::new(PERIOD);
        let generation = poller.mount(counting_fetch());
        tokio::time::sleep(PERIOD * 2).await;

        poller.unmount();
        assert!(!generation.is_current());
        assert!(!poller.is_mounted());
        assert_eq!(poller.latest(), None);

        tokio::time::sleep(PERIOD * 4).await;
        assert_eq!(poller.latest(), None);
    }

    #[tokio::test]
    async fn test_remount_supersedes_previous_generation() {
        let mut poller: Poller<u64> = Poller::new(PERIOD);
        let first = poller.mount(counting_fetch());
        let second = poller.mount(counting_fetch());

        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(second.id() > first.id());
    }

    #[tokio::test]
    async fn test_slow_response_after_unmount_is_discarded() {
        let mut poller: Poller<u64> = Poller::new(PERIOD);
        poller.mount(|| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(42)
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        poller.unmount();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(poller.latest(), None);
    }

    #[test]
    fn test_result_for_superseded_generation_is_not_published() {
        let (tx, rx) = watch::channel(Some(1u64));
        let current = Arc::new(AtomicU64::new(1));
        let token = Generation {
            id: 1,
            current: current.clone(),
        };

        assert!(publish(&tx, &token, Ok(2)));
        assert_eq!(*rx.borrow(), Some(2));

        // Unmount: bump the generation, then clear
        current.fetch_add(1, Ordering::SeqCst);
        tx.send_replace(None);

        assert!(!publish(&tx, &token, Ok(3)));
        assert_eq!(*rx.borrow(), None);
    }

    #[test]
    fn test_publish_error_keeps_snapshot() {
        let (tx, rx) = watch::channel(Some(5u64));
        let token = Generation {
            id: 0,
            current: Arc::new(AtomicU64::new(0)),
        };

        assert!(publish(
            &tx,
            &token,
            Err(ClientError::Tally("offline".to_string()))
        ));
        assert_eq!(*rx.borrow(), Some(5));
    }

    #[tokio::test]
    async fn test_failed_poll_keeps_previous_snapshot() {
        let mut poller: Poller<u64> = Poller::new(PERIOD);
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();

        poller.mount(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Ok(7)
                } else {
                    Err(ClientError::Tally("server unavailable".to_string()))
                }
            }
        });

        tokio::time::sleep(PERIOD * 5).await;
        assert!(calls.load(Ordering::SeqCst) > 1);
        assert_eq!(poller.latest(), Some(7));
    }
}
