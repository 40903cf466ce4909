//! Readiness multiplexing over `select(2)` with a descriptor set that matches
//! the native `fd_set` layout, and reads that another thread can cancel.
#![cfg(unix)]

pub mod config;
pub mod error;
pub mod logger;
pub mod os;
pub mod reader;

pub use error::{Error, Result};
pub use os::{retry_select, select, FdSet, RetryPolicy, Timeout};
pub use reader::{DescriptorSource, InterruptibleReader, Interrupter};
