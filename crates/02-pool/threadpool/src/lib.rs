//! Fixed-size worker pool used by every metric kernel to parallelize
//! row-strip and per-component work across a picture.
//!
//! A single [`ThreadPool`] is shared by every client (typically one client
//! per metric being computed); each client gets its own [`ThPI`] handle,
//! which owns a completed-task ring and hides the difference between
//! running on real worker threads and running synchronously inline.

mod error;
mod interface;
mod pool;
mod task;

pub use error::{PoolError, PoolResult};
pub use interface::ThPI;
pub use pool::ThreadPool;
pub use task::{ClientId, Task, TaskKind, TaskStatus};
