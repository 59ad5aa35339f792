//! Fetch worker pool.
//!
//! ## Structure
//!
//! - [`manager`] - [`WorkerPool`]: queue ownership, submission, shutdown.
//! - [`worker`] - the per-worker receive loop.
//! - [`processor`] - resolution of a single fetch against the store.
//! - [`request`] - messages travelling through the queue.

pub mod manager;
pub mod processor;
pub mod request;
pub mod worker;

pub use manager::WorkerPool;
pub use request::WorkRequest;
