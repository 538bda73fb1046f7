//! # securerand-core
//!
//! Process-wide secure randomness with one OS-backed entropy source per
//! thread.
//!
//! Higher-level cryptographic and protocol code uses this crate for nonce
//! bytes, bounded random integers, and randomized retry/expiration timers.
//! Every thread lazily opens its own handle over the OS CSPRNG on the first
//! sampling call and keeps it until the thread exits, where thread-local
//! destruction releases it. There is no explicit init or shutdown call, and
//! since entropy state never crosses threads there is nothing to lock.
//!
//! ## Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! let mut nonce = [0u8; 24];
//! securerand_core::fill_random_bytes(&mut nonce)?;
//!
//! // Inclusive bounds, any unsigned width up to u64.
//! let slot = securerand_core::random_in_range(0u32, 31)?;
//! assert!(slot <= 31);
//!
//! // Desynchronize a 10 s expiration timer into [7.5 s, 10 s].
//! let timer = securerand_core::randomized_duration(Duration::from_secs(10), 4)?;
//! assert!(timer <= Duration::from_secs(10));
//! # Ok::<(), securerand_core::Error>(())
//! ```
//!
//! ## Architecture
//!
//! Caller → free functions → calling thread's [`EntropySource`] → OS CSPRNG
//!
//! - [`source`]: one entropy handle per thread, opened on first use,
//!   dropped at thread exit. Handles are `!Send`/`!Sync`.
//! - [`sampler`]: unbiased bytes and inclusive integer ranges. Every
//!   64-bit draw widens into a 128-bit accumulator before narrowing, so
//!   the boundary values of a range carry no modulo bias.
//! - [`jitter`]: randomized expiration durations in
//!   `[expiration - expiration/ratio, expiration]`.
//!
//! Failures surface as [`Error`]: the OS source refusing to open or read is
//! [`Error::ResourceExhausted`] (never retried, never substituted with a
//! weaker generator); a backwards range is [`Error::InvalidRange`].
//!
//! There is deliberately no seed-injection surface: output is never
//! reproducible, which bounds how far statistical behavior can be
//! unit-tested. See the `securerand-tests` battery for the acceptance
//! checks used instead.

pub mod error;
pub mod jitter;
pub mod sampler;
pub mod source;

pub use error::Error;
pub use jitter::randomized_duration;
pub use sampler::{SampleUint, fill_random_bytes, random_byte, random_in_range};
pub use source::{EntropySource, thread_source_id};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
