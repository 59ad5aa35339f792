#![doc = include_str!("../README.md")]

mod allocator;
mod cache;
mod config;
mod error;
pub mod pool;
mod record;
mod service;
pub mod store;

pub use crate::allocator::*;
pub use crate::cache::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::pool::{WorkRequest, WorkerPool};
pub use crate::record::*;
pub use crate::service::*;
pub use crate::store::{AttributeValue, FileStore, Item, MemoryStore, Store, StoreError};
