use std::sync::Arc;

use crate::error::PoolResult;
use crate::pool::ThreadPool;
use crate::task::{ClientId, Task, TaskStatus};

/// Per-client view of a [`ThreadPool`]: owns the client's registration and
/// completed-ring receiver, and tracks outstanding task counts so callers
/// can wait for a batch to drain without polling status flags by hand.
///
/// A `ThPI` built with [`ThPI::inactive`] runs every submitted callable
/// synchronously on the caller's thread, with thread index `-1`. This lets
/// a caller run single-threaded (for debugging, or when `num_workers == 0`)
/// without branching its own call sites on whether a pool exists.
pub struct ThPI {
    pool: Option<Arc<ThreadPool>>,
    client_id: Option<ClientId>,
    completed_rx: Option<crossbeam_channel::Receiver<Task>>,
    outstanding: usize,
    stored: Vec<Task>,
}

impl ThPI {
    /// Registers a new client on `pool`, with a completed ring bounded at
    /// `completed_capacity`.
    pub fn new(pool: Arc<ThreadPool>, completed_capacity: usize) -> Self {
        let (client_id, completed_rx) = pool.register(completed_capacity);
        Self {
            pool: Some(pool),
            client_id: Some(client_id),
            completed_rx: Some(completed_rx),
            outstanding: 0,
            stored: Vec::new(),
        }
    }

    /// A `ThPI` with no backing pool: every task runs synchronously, inline,
    /// on the calling thread.
    pub fn inactive() -> Self {
        Self {
            pool: None,
            client_id: None,
            completed_rx: None,
            outstanding: 0,
            stored: Vec::new(),
        }
    }

    /// Whether this interface is backed by a real pool.
    pub fn is_active(&self) -> bool {
        self.pool.is_some()
    }

    /// Submits a single callable at `priority`, returning once it has been
    /// enqueued (not once it has run).
    ///
    /// Against an inactive interface, runs `f` immediately with thread
    /// index `-1` and returns.
    pub fn add_waiting_task(
        &mut self,
        priority: i32,
        f: impl FnOnce(i64) + Send + 'static,
    ) -> PoolResult<()> {
        match (&self.pool, self.client_id) {
            (Some(pool), Some(id)) => {
                pool.submit(Task::function(id, priority, f))?;
                self.outstanding += 1;
                Ok(())
            }
            _ => {
                f(-1);
                Ok(())
            }
        }
    }

    /// Blocks until at least `k` previously-submitted tasks have completed
    /// (or until every outstanding task has, if fewer than `k` remain).
    ///
    /// Against an inactive interface, this is a no-op: every task already
    /// ran to completion inside `add_waiting_task`.
    pub fn wait_until_finished(&mut self, k: usize) {
        let Some(rx) = &self.completed_rx else {
            return;
        };
        let target = k.min(self.outstanding);
        for _ in 0..target {
            match rx.recv() {
                Ok(task) => {
                    debug_assert_eq!(task.status(), TaskStatus::Completed);
                    self.outstanding -= 1;
                }
                Err(_) => break,
            }
        }
    }

    /// Blocks until every outstanding task submitted by this client has
    /// completed.
    pub fn wait_until_finished_all(&mut self) {
        self.wait_until_finished(self.outstanding);
    }

    /// Queues a callable for later bulk submission via
    /// [`ThPI::submit_stored`], without touching the pool yet.
    pub fn store_task(&mut self, priority: i32, f: impl FnOnce(i64) + Send + 'static) {
        self.stored.push(Task::function(
            self.client_id.unwrap_or(ClientId(usize::MAX)),
            priority,
            f,
        ));
    }

    /// Submits every task queued by [`ThPI::store_task`] since the last
    /// call, draining the backlog.
    ///
    /// Against an inactive interface, stored callables already ran inline
    /// when they were stored, so this only clears the backlog.
    pub fn submit_stored(&mut self) -> PoolResult<()> {
        let tasks = std::mem::take(&mut self.stored);
        match &self.pool {
            Some(pool) => {
                for task in tasks {
                    pool.submit(task)?;
                    self.outstanding += 1;
                }
                Ok(())
            }
            None => {
                for task in tasks {
                    let _ = task.run(-1);
                }
                Ok(())
            }
        }
    }

    /// Combines [`ThPI::submit_stored`] with a wait for `k` of the newly
    /// submitted tasks to finish.
    pub fn wait_until_finished2(&mut self, k: usize) -> PoolResult<()> {
        self.submit_stored()?;
        self.wait_until_finished(k);
        Ok(())
    }

    /// Number of tasks submitted by this client that have not yet reported
    /// back as completed.
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }
}

impl Drop for ThPI {
    fn drop(&mut self) {
        if let (Some(pool), Some(id)) = (&self.pool, self.client_id) {
            pool.unregister(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::pool::ThreadPool;

    #[test]
    fn inactive_interface_runs_tasks_synchronously() {
        let mut ti = ThPI::inactive();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = Arc::clone(&seen);
        ti.add_waiting_task(0, move |thread_idx| {
            assert_eq!(thread_idx, -1);
            seen2.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn active_interface_routes_completions_back_to_client() {
        let pool = ThreadPool::new(2, 8);
        let mut ti = ThPI::new(Arc::clone(&pool), 8);
        let seen = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let seen2 = Arc::clone(&seen);
            ti.add_waiting_task(0, move |_| {
                seen2.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        ti.wait_until_finished_all();
        assert_eq!(seen.load(Ordering::SeqCst), 5);
        assert_eq!(ti.outstanding(), 0);
        drop(ti);
        pool.destroy();
    }

    #[test]
    fn store_then_submit_stored_runs_every_queued_task() {
        let pool = ThreadPool::new(1, 8);
        let mut ti = ThPI::new(Arc::clone(&pool), 8);
        let seen = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let seen2 = Arc::clone(&seen);
            ti.store_task(0, move |_| {
                seen2.fetch_add(1, Ordering::SeqCst);
            });
        }
        ti.wait_until_finished2(3).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        drop(ti);
        pool.destroy();
    }
}
