// src/pipeline/queue.rs

//! Unbounded FIFO work queues shared by a pool of workers.
//!
//! Termination is an explicit [`Envelope::Close`] signal rather than a magic
//! payload value. A pool of `W` workers is stopped by sending exactly `W`
//! close signals: each worker takes one and exits, and every job queued ahead
//! of the signals is still handed out.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, mpsc};

use crate::error::{AppError, Result};

/// Message carried by a work queue.
#[derive(Debug)]
pub enum Envelope<T> {
    Job(T),
    Close,
}

/// Create a named queue, returning its producer and consumer halves.
pub fn work_queue<T>(name: &'static str) -> (QueueSender<T>, QueueReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        QueueSender {
            name,
            tx,
            counters: Arc::new(Counters::default()),
        },
        QueueReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

#[derive(Debug, Default)]
struct Counters {
    jobs: AtomicUsize,
    closes: AtomicUsize,
}

/// Producer half. Cheap to clone.
#[derive(Debug)]
pub struct QueueSender<T> {
    name: &'static str,
    tx: mpsc::UnboundedSender<Envelope<T>>,
    counters: Arc<Counters>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<T> QueueSender<T> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Enqueue a job behind everything already queued.
    pub fn push(&self, job: T) -> Result<()> {
        self.tx
            .send(Envelope::Job(job))
            .map_err(|_| AppError::QueueClosed { queue: self.name })?;
        self.counters.jobs.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Send one close signal per worker.
    pub fn close(&self, workers: usize) -> Result<()> {
        for _ in 0..workers {
            self.tx
                .send(Envelope::Close)
                .map_err(|_| AppError::QueueClosed { queue: self.name })?;
            self.counters.closes.fetch_add(1, Ordering::Relaxed);
        }
        log::debug!("Queue '{}': sent {} close signal(s)", self.name, workers);
        Ok(())
    }

    /// Jobs enqueued so far.
    pub fn jobs_pushed(&self) -> usize {
        self.counters.jobs.load(Ordering::Relaxed)
    }

    /// Close signals sent so far.
    pub fn closes_sent(&self) -> usize {
        self.counters.closes.load(Ordering::Relaxed)
    }
}

/// Consumer half, shared by every worker of one pool.
#[derive(Debug)]
pub struct QueueReceiver<T> {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Envelope<T>>>>,
}

impl<T> Clone for QueueReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
        }
    }
}

impl<T> QueueReceiver<T> {
    /// Next job, or `None` once this worker has taken a close signal.
    ///
    /// Also returns `None` if every sender is gone and the queue is drained.
    pub async fn next(&self) -> Option<T> {
        match self.rx.lock().await.recv().await {
            Some(Envelope::Job(job)) => Some(job),
            Some(Envelope::Close) | None => None,
        }
    }

    /// Non-blocking peek at the next message, consuming it.
    pub fn try_next(&self) -> Option<Envelope<T>> {
        self.rx.try_lock().ok()?.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn jobs_come_out_in_order() {
        let (tx, rx) = work_queue("test");
        assert_eq!(tx.name(), "test");
        for i in 0..5 {
            tx.push(i).unwrap();
        }
        tx.close(1).unwrap();

        let mut seen = Vec::new();
        while let Some(job) = rx.next().await {
            seen.push(job);
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn each_worker_takes_one_close() {
        let (tx, rx) = work_queue::<u32>("test");
        for i in 0..20 {
            tx.push(i).unwrap();
        }
        tx.close(3).unwrap();
        assert_eq!(tx.closes_sent(), 3);

        let workers: Vec<_> = (0..3)
            .map(|_| {
                let rx = rx.clone();
                tokio::spawn(async move {
                    let mut n = 0;
                    while rx.next().await.is_some() {
                        n += 1;
                    }
                    n
                })
            })
            .collect();

        let mut total = 0;
        for worker in workers {
            total += worker.await.unwrap();
        }
        assert_eq!(total, 20);
        assert!(rx.try_next().is_none());
    }

    #[tokio::test]
    async fn jobs_before_close_are_still_processed() {
        let (tx, rx) = work_queue("test");
        tx.push("a").unwrap();
        tx.close(1).unwrap();
        tx.push("late").unwrap();

        assert_eq!(rx.next().await, Some("a"));
        assert_eq!(rx.next().await, None);
        assert!(matches!(rx.try_next(), Some(Envelope::Job("late"))));
    }

    #[tokio::test]
    async fn dropped_senders_end_the_queue() {
        let (tx, rx) = work_queue::<u8>("test");
        drop(tx);
        assert_eq!(rx.next().await, None);
    }

    #[test]
    fn push_fails_without_consumers() {
        let (tx, rx) = work_queue("test");
        drop(rx);
        assert!(matches!(
            tx.push(1),
            Err(AppError::QueueClosed { queue: "test" })
        ));
    }
}
