//! Job queue between the distributor and the worker pool
//!
//! A single sender feeds any number of competing receivers. With a capacity
//! of zero the queue is a rendezvous: [`JobSender::send`] only returns after
//! a worker has taken the item, so the distributor can never run ahead of
//! the workers. A positive capacity buffers that many items instead.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex, Semaphore};

/// Every receiver is gone, so nothing can take further items
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("job queue closed: no worker is left to receive")]
pub struct QueueClosed;

struct Envelope<T> {
    item: T,
    handoff: Option<oneshot::Sender<()>>,
}

/// Largest buffer tokio's bounded channel accepts.
pub const MAX_QUEUE_CAPACITY: usize = Semaphore::MAX_PERMITS;

/// Create a queue holding at most `capacity` unreceived items (0 = rendezvous).
///
/// Capacities above [`MAX_QUEUE_CAPACITY`] are clamped to it.
pub fn job_queue<T>(capacity: usize) -> (JobSender<T>, JobReceiver<T>) {
    // A rendezvous still needs one slot to park the item until a worker
    // picks it up; the handoff acknowledgement provides the blocking.
    let (tx, rx) = mpsc::channel(capacity.clamp(1, MAX_QUEUE_CAPACITY));

    (
        JobSender {
            tx,
            rendezvous: capacity == 0,
        },
        JobReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer half. There is exactly one per queue; dropping it (or calling
/// [`close`](Self::close)) tells workers no more items will arrive.
pub struct JobSender<T> {
    tx: mpsc::Sender<Envelope<T>>,
    rendezvous: bool,
}

impl<T> JobSender<T> {
    /// Submit one item, waiting for a free slot (or, for a rendezvous queue,
    /// for a worker to receive it).
    pub async fn send(&self, item: T) -> Result<(), QueueClosed> {
        if !self.rendezvous {
            return self
                .tx
                .send(Envelope {
                    item,
                    handoff: None,
                })
                .await
                .map_err(|_| QueueClosed);
        }

        let (handoff, received) = oneshot::channel();
        self.tx
            .send(Envelope {
                item,
                handoff: Some(handoff),
            })
            .await
            .map_err(|_| QueueClosed)?;

        // Dropped unacknowledged only if every receiver went away first.
        received.await.map_err(|_| QueueClosed)
    }

    /// Close the queue. Items already handed over are still delivered.
    pub fn close(self) {
        drop(self);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, cloned once per worker.
pub struct JobReceiver<T> {
    rx: Arc<Mutex<mpsc::Receiver<Envelope<T>>>>,
}

impl<T> Clone for JobReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
        }
    }
}

impl<T> JobReceiver<T> {
    /// Take the next item, or `None` once the queue is closed and drained.
    pub async fn recv(&self) -> Option<T> {
        let envelope = self.rx.lock().await.recv().await?;

        if let Some(handoff) = envelope.handoff {
            // The sender may have been cancelled; the item is ours regardless.
            let _ = handoff.send(());
        }

        Some(envelope.item)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_rendezvous_send_waits_for_receiver() {
        let (tx, rx) = job_queue::<u32>(0);

        let send = tokio::spawn(async move { tx.send(7).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!send.is_finished(), "send returned before any worker received");

        assert_eq!(rx.recv().await, Some(7));
        send.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_buffered_queue_accepts_up_to_capacity() {
        let (tx, rx) = job_queue::<u32>(2);

        tx.send(1).await.unwrap();
        tx.send(2).await.unwrap();
        assert!(timeout(Duration::from_millis(50), tx.send(3)).await.is_err());

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
    }

    #[tokio::test]
    async fn test_close_drains_then_ends() {
        let (tx, rx) = job_queue::<&str>(4);
        tx.send("a").await.unwrap();
        tx.send("b").await.unwrap();
        tx.close();

        assert_eq!(rx.recv().await, Some("a"));
        assert_eq!(rx.recv().await, Some("b"));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_every_receiver_sees_close() {
        let (tx, rx) = job_queue::<u32>(0);
        let workers: Vec<_> = (0..3)
            .map(|_| {
                let rx = rx.clone();
                tokio::spawn(async move {
                    let mut seen = 0;
                    while rx.recv().await.is_some() {
                        seen += 1;
                    }
                    seen
                })
            })
            .collect();
        drop(rx);

        for i in 0..9 {
            tx.send(i).await.unwrap();
        }
        tx.close();

        let mut total = 0;
        for worker in workers {
            total += worker.await.unwrap();
        }
        assert_eq!(total, 9);
    }

    #[tokio::test]
    async fn test_send_without_receivers_fails() {
        let (tx, rx) = job_queue::<u32>(0);
        drop(rx);
        assert_eq!(tx.send(1).await, Err(QueueClosed));
        assert!(tx.is_closed());
    }

    #[tokio::test]
    async fn test_oversized_capacity_is_clamped() {
        let (tx, rx) = job_queue::<u32>(usize::MAX);
        tx.send(1).await.unwrap();
        tx.send(2).await.unwrap();
        tx.close();
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(2));
        assert_eq!(rx.recv().await, None);
    }
}
