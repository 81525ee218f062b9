//! Bounded concurrent task scheduling.
//!
//! A fixed pool of workers drains the discovered task list. Claiming is a
//! single atomic counter over an immutable slice, so a task can never be
//! claimed twice or skipped. Per-file failures are logged at the worker
//! boundary and never stop the other workers or the remaining tasks.

use crate::pipeline::Task;
use anyhow::Result;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Process every task with `workers` concurrent workers (minimum 1).
///
/// Returns once every worker has exhausted the task list.
pub async fn run_pool<F, Fut>(tasks: Vec<Task>, workers: usize, handler: F)
where
    F: Fn(Task) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send,
{
    let tasks: Arc<[Task]> = tasks.into();
    let next = Arc::new(AtomicUsize::new(0));
    let workers = workers.max(1);

    let mut handles = Vec::with_capacity(workers);
    for worker in 0..workers {
        let tasks = Arc::clone(&tasks);
        let next = Arc::clone(&next);
        let handler = handler.clone();

        handles.push(tokio::spawn(async move {
            loop {
                let index = next.fetch_add(1, Ordering::SeqCst);
                let Some(task) = tasks.get(index) else {
                    break;
                };

                tracing::debug!("Worker {} processing {:?}", worker, task.path);
                if let Err(e) = handler(task.clone()).await {
                    tracing::error!("Failed to process {:?}: {:#}", task.path, e);
                }
            }
        }));
    }

    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!("Worker terminated abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::path::PathBuf;
    use std::sync::Mutex;

    fn tasks(n: usize) -> Vec<Task> {
        (0..n)
            .map(|i| Task::new(PathBuf::from(format!("/in/{i}.png"))))
            .collect()
    }

    #[tokio::test]
    async fn every_task_is_processed_exactly_once() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_ref = seen.clone();

        run_pool(tasks(100), 8, move |task| {
            let seen = seen_ref.clone();
            async move {
                tokio::task::yield_now().await;
                seen.lock().unwrap().push(task.path);
                Ok(())
            }
        })
        .await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 100, "no task dropped or duplicated");
        let unique: HashSet<_> = seen.iter().collect();
        assert_eq!(unique.len(), 100);
    }

    #[tokio::test]
    async fn one_failing_task_does_not_stop_the_rest() {
        let processed = Arc::new(AtomicUsize::new(0));
        let processed_ref = processed.clone();

        run_pool(tasks(10), 3, move |task| {
            let processed = processed_ref.clone();
            async move {
                processed.fetch_add(1, Ordering::SeqCst);
                if task.path.ends_with("3.png") {
                    anyhow::bail!("simulated failure");
                }
                Ok(())
            }
        })
        .await;

        assert_eq!(processed.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn zero_workers_is_clamped_to_one() {
        let processed = Arc::new(AtomicUsize::new(0));
        let processed_ref = processed.clone();

        run_pool(tasks(4), 0, move |_| {
            let processed = processed_ref.clone();
            async move {
                processed.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

        assert_eq!(processed.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn empty_task_list_returns_immediately() {
        run_pool(Vec::new(), 4, |_| async { Ok(()) }).await;
    }
}
