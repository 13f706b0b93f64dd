use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::{PoolError, PoolResult};
use crate::task::{ClientId, Task};

/// Fast-path shutdown timeout before a pool starts polling more patiently
/// for stragglers.
const SHUTDOWN_FAST_TIMEOUT: Duration = Duration::from_millis(500);
/// Slow-path shutdown timeout; stragglers beyond this are force-detached.
const SHUTDOWN_SLOW_TIMEOUT: Duration = Duration::from_secs(5);
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(5);

struct ClientIdGenerator {
    free: Vec<usize>,
    next: usize,
}

impl ClientIdGenerator {
    fn new() -> Self {
        Self {
            free: Vec::new(),
            next: 0,
        }
    }

    fn acquire(&mut self) -> ClientId {
        if let Some(id) = self.free.pop() {
            ClientId(id)
        } else {
            let id = self.next;
            self.next += 1;
            ClientId(id)
        }
    }

    fn release(&mut self, id: ClientId) {
        self.free.push(id.0);
    }
}

struct Registry {
    ids: ClientIdGenerator,
    completed_tx: HashMap<ClientId, crossbeam_channel::Sender<Task>>,
}

/// A pre-forked pool of worker threads draining a single shared waiting
/// ring, routing completed tasks to per-client completed rings.
///
/// Tasks are small stateless closures; a typical task is one row-strip of
/// one component of one metric. No ordering is guaranteed between tasks on
/// the waiting ring beyond "every submitted task is completed exactly
/// once".
pub struct ThreadPool {
    waiting_tx: crossbeam_channel::Sender<Task>,
    waiting_rx: crossbeam_channel::Receiver<Task>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    registry: Mutex<Registry>,
    shutting_down: AtomicBool,
    num_workers: usize,
}

impl ThreadPool {
    /// Spawns `num_workers` threads draining a waiting ring bounded at
    /// `waiting_capacity` task pointers.
    pub fn new(num_workers: usize, waiting_capacity: usize) -> Arc<Self> {
        let num_workers = num_workers.max(1);
        let (waiting_tx, waiting_rx) = crossbeam_channel::bounded(waiting_capacity.max(1));

        let pool = Arc::new(Self {
            waiting_tx,
            waiting_rx,
            workers: Mutex::new(Vec::with_capacity(num_workers)),
            registry: Mutex::new(Registry {
                ids: ClientIdGenerator::new(),
                completed_tx: HashMap::new(),
            }),
            shutting_down: AtomicBool::new(false),
            num_workers,
        });

        let mut workers = Vec::with_capacity(num_workers);
        for idx in 0..num_workers {
            let pool_ref = Arc::clone(&pool);
            let handle = std::thread::Builder::new()
                .name(format!("qmiv-worker-{idx}"))
                .spawn(move || worker_loop(idx as i64, pool_ref))
                .expect("failed to spawn worker thread");
            workers.push(handle);
        }
        *pool.workers.lock() = workers;
        log::debug!("thread pool started with {num_workers} workers");
        pool
    }

    /// Number of worker threads backing this pool.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Registers a new client with a completed ring bounded at
    /// `completed_capacity`, returning its id and receiver.
    pub fn register(
        &self,
        completed_capacity: usize,
    ) -> (ClientId, crossbeam_channel::Receiver<Task>) {
        let (tx, rx) = crossbeam_channel::bounded(completed_capacity.max(1));
        let mut registry = self.registry.lock();
        let id = registry.ids.acquire();
        registry.completed_tx.insert(id, tx);
        (id, rx)
    }

    /// Unregisters a client, draining any residue left on its completed
    /// ring so it doesn't leak.
    pub fn unregister(&self, id: ClientId) {
        let mut registry = self.registry.lock();
        if let Some(tx) = registry.completed_tx.remove(&id) {
            drop(tx);
        }
        registry.ids.release(id);
    }

    /// Blocks while the waiting ring is full, then enqueues `task`.
    pub fn submit(&self, task: Task) -> PoolResult<()> {
        if self.shutting_down.load(Ordering::Acquire) {
            return Err(PoolError::ShuttingDown);
        }
        self.waiting_tx
            .send(task)
            .map_err(|_| PoolError::ShuttingDown)
    }

    pub(crate) fn completed_sender(&self, id: ClientId) -> Option<crossbeam_channel::Sender<Task>> {
        self.registry.lock().completed_tx.get(&id).cloned()
    }

    /// Submits one `Terminator` per worker, then waits up to 500ms and, for
    /// any stragglers, up to a further 5s before force-detaching remaining
    /// worker handles. Force-detach should never trigger on the success
    /// path; it exists for workers wedged inside a misbehaving callable.
    pub fn destroy(&self) {
        self.shutting_down.store(true, Ordering::Release);
        for _ in 0..self.num_workers {
            let _ = self.waiting_tx.send(Task::terminator());
        }

        let mut workers = self.workers.lock();
        let deadline_fast = Instant::now() + SHUTDOWN_FAST_TIMEOUT;
        while Instant::now() < deadline_fast && workers.iter().any(|h| !h.is_finished()) {
            std::thread::sleep(SHUTDOWN_POLL_INTERVAL);
        }

        let deadline_slow = Instant::now() + SHUTDOWN_SLOW_TIMEOUT;
        while Instant::now() < deadline_slow && workers.iter().any(|h| !h.is_finished()) {
            std::thread::sleep(SHUTDOWN_POLL_INTERVAL);
        }

        for handle in workers.drain(..) {
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                log::warn!("worker thread did not terminate within the shutdown timeout; force-detaching");
                drop(handle);
            }
        }
    }
}

fn worker_loop(thread_idx: i64, pool: Arc<ThreadPool>) {
    loop {
        let task = match pool.waiting_rx.recv() {
            Ok(task) => task,
            Err(_) => break,
        };
        if task.is_terminator() {
            break;
        }
        let client_id = task.client_id;
        let completed = task.run(thread_idx);
        if let Some(id) = client_id {
            if let Some(tx) = pool.completed_sender(id) {
                // Bounded: a full completed ring back-pressures this worker
                // until its client drains more completed tasks.
                let _ = tx.send(completed);
            }
        }
    }
}
