use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Opaque client identifier, drawn from a small reusable id generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClientId(pub(crate) usize);

/// What kind of payload a [`Task`] carries.
#[derive(Debug)]
pub enum TaskKind {
    /// A callable invoked with the worker's thread index.
    Function(Box<dyn FnOnce(i64) + Send>),
    /// Causes the receiving worker to exit its loop.
    Terminator,
    /// Reserved for payloads outside the function-interface idiom.
    Custom(Box<dyn std::any::Any + Send>),
}

/// Lifecycle stage of a [`Task`], monotone: `Waiting -> Processed -> Completed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskStatus {
    /// Sitting in the waiting ring, not yet picked up by a worker.
    Waiting = 0,
    /// A worker has dequeued the task and is running its callable.
    Processed = 1,
    /// The callable has returned and the task has been routed to its
    /// client's completed ring.
    Completed = 2,
}

impl TaskStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => TaskStatus::Waiting,
            1 => TaskStatus::Processed,
            _ => TaskStatus::Completed,
        }
    }
}

/// A tagged unit of work: a client id, a tie-breaking priority, a payload,
/// and an atomically-tracked status.
pub struct Task {
    /// The client that submitted this task; `None` for pool-internal tasks
    /// such as [`TaskKind::Terminator`].
    pub client_id: Option<ClientId>,
    /// Used only for tie-breaking; the pool is otherwise FIFO.
    pub priority: i32,
    kind: TaskKind,
    status: Arc<AtomicU8>,
}

impl Task {
    /// Builds a function task for `client_id` at the given `priority`.
    pub fn function(
        client_id: ClientId,
        priority: i32,
        f: impl FnOnce(i64) + Send + 'static,
    ) -> Self {
        Self {
            client_id: Some(client_id),
            priority,
            kind: TaskKind::Function(Box::new(f)),
            status: Arc::new(AtomicU8::new(TaskStatus::Waiting as u8)),
        }
    }

    /// Builds the terminator sentinel a worker exits its loop on.
    pub fn terminator() -> Self {
        Self {
            client_id: None,
            priority: i32::MIN,
            kind: TaskKind::Terminator,
            status: Arc::new(AtomicU8::new(TaskStatus::Waiting as u8)),
        }
    }

    /// Current lifecycle stage of this task.
    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub(crate) fn is_terminator(&self) -> bool {
        matches!(self.kind, TaskKind::Terminator)
    }

    pub(crate) fn set_status(&self, status: TaskStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    /// Runs the task's callable (a no-op for terminators), transitioning
    /// `Waiting -> Processed -> Completed`.
    pub(crate) fn run(mut self, thread_idx: i64) -> Self {
        self.set_status(TaskStatus::Processed);
        if let TaskKind::Function(f) = std::mem::replace(&mut self.kind, TaskKind::Terminator) {
            f(thread_idx);
        }
        self.set_status(TaskStatus::Completed);
        self
    }
}
