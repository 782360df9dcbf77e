//! Page processing pipeline
//!
//! The per-page state machine is enrich → flatten → index, with a
//! success/error counter pair as the only cross-page state. The driver
//! fans pages out to worker threads; each worker owns one
//! [`PageProcessor`] and one sink handle.

pub mod driver;
pub mod processor;

pub use driver::run;
pub use processor::{PageError, PageProcessor};
