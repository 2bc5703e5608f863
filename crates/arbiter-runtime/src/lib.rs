//! # arbiter-runtime
//!
//! One [`ArbiterRuntime`] per process, built with explicit dependency
//! injection. Engines are synchronous; the runtime moves their calls onto
//! tokio's blocking pool so async callers never hold the storage mutex on a
//! worker thread.

mod runtime;

pub use runtime::{ArbiterRuntime, RuntimeOptions};
