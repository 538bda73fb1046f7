//! Per-thread entropy source handles and their registry.
//!
//! Each thread that samples randomness owns exactly one [`EntropySource`],
//! opened on first use and dropped by thread-local-storage destruction when
//! the thread terminates. No explicit initialization or shutdown call exists;
//! the owning thread's termination is the sole cleanup trigger.
//!
//! The handle buffers one block of OS entropy at a time and serves bytes out
//! of it, refilling on demand through the `getrandom` crate.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, trace, warn};
use zeroize::Zeroize;

use crate::error::Error;

/// Bytes drawn from the OS per refill.
const BLOCK_LEN: usize = 64;

/// Process-unique handle ids for diagnostics and identity checks.
/// Carries no entropy state; entropy state is strictly thread-local.
static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// An owned handle over the OS CSPRNG.
///
/// Serves single bytes out of a buffered block and refills from the OS when
/// the block runs dry. Consumed bytes are wiped as they are handed out, and
/// the remainder of the block is wiped on drop, so the handle never retains
/// output it has already produced.
///
/// A handle is bound to the thread that opened it; the type is neither
/// `Send` nor `Sync`:
///
/// ```compile_fail
/// let source = securerand_core::EntropySource::open().unwrap();
/// std::thread::spawn(move || drop(source));
/// ```
pub struct EntropySource {
    block: [u8; BLOCK_LEN],
    /// Index of the next unserved byte; `BLOCK_LEN` means the block is spent.
    cursor: usize,
    id: u64,
    _thread_bound: PhantomData<*mut ()>,
}

impl EntropySource {
    /// Open a new handle, drawing its first block from the OS.
    ///
    /// Fails with [`Error::ResourceExhausted`] if the OS source cannot be
    /// read. The failure is propagated as-is; there is no retry and no
    /// fallback generator.
    pub fn open() -> Result<Self, Error> {
        let mut source = Self {
            block: [0u8; BLOCK_LEN],
            cursor: BLOCK_LEN,
            id: NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed),
            _thread_bound: PhantomData,
        };
        source.refill()?;
        debug!(
            "opened entropy source #{} on thread {:?}",
            source.id,
            std::thread::current().id()
        );
        Ok(source)
    }

    /// Process-unique id of this handle.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Uniform random byte over the full `[0, 255]` range.
    pub fn next_byte(&mut self) -> Result<u8, Error> {
        if self.cursor == BLOCK_LEN {
            self.refill()?;
        }
        let byte = self.block[self.cursor];
        // Handed-out bytes may become key material; don't keep them around.
        self.block[self.cursor] = 0;
        self.cursor += 1;
        Ok(byte)
    }

    /// Overwrite every element of `out`, in order, with an independently
    /// drawn [`next_byte`](Self::next_byte) value.
    pub fn fill(&mut self, out: &mut [u8]) -> Result<(), Error> {
        for slot in out.iter_mut() {
            *slot = self.next_byte()?;
        }
        Ok(())
    }

    /// Uniform `u64` assembled from eight buffered bytes.
    pub(crate) fn next_u64(&mut self) -> Result<u64, Error> {
        let mut word = [0u8; 8];
        self.fill(&mut word)?;
        Ok(u64::from_le_bytes(word))
    }

    fn refill(&mut self) -> Result<(), Error> {
        match getrandom::fill(&mut self.block) {
            Ok(()) => {
                self.cursor = 0;
                Ok(())
            }
            Err(err) => {
                warn!("entropy source #{} read failed: {err}", self.id);
                Err(Error::ResourceExhausted(err))
            }
        }
    }
}

impl Drop for EntropySource {
    fn drop(&mut self) {
        self.block.zeroize();
        trace!("released entropy source #{}", self.id);
    }
}

impl rand_core::TryRngCore for EntropySource {
    type Error = Error;

    fn try_next_u32(&mut self) -> Result<u32, Self::Error> {
        let mut word = [0u8; 4];
        self.fill(&mut word)?;
        Ok(u32::from_le_bytes(word))
    }

    fn try_next_u64(&mut self) -> Result<u64, Self::Error> {
        self.next_u64()
    }

    fn try_fill_bytes(&mut self, dst: &mut [u8]) -> Result<(), Self::Error> {
        self.fill(dst)
    }
}

impl rand_core::TryCryptoRng for EntropySource {}

thread_local! {
    /// At most one live source per thread. The TLS destructor drops the
    /// entry exactly once when the owning thread terminates.
    static THREAD_SOURCE: RefCell<Option<EntropySource>> = const { RefCell::new(None) };
}

/// Run `f` against the calling thread's entropy source, opening one first if
/// this thread has never sampled before.
///
/// The handle never escapes the closure, so no reference outlives the call
/// and no other thread can ever observe it. `f` must not re-enter the
/// registry.
pub(crate) fn with_thread_source<R>(
    f: impl FnOnce(&mut EntropySource) -> Result<R, Error>,
) -> Result<R, Error> {
    THREAD_SOURCE.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(EntropySource::open()?);
        }
        let source = slot.as_mut().expect("slot populated above");
        f(source)
    })
}

/// Id of the calling thread's entropy source, opening one if absent.
///
/// Intended for diagnostics and for verifying that two threads never share
/// a handle. The id says nothing about the entropy itself.
pub fn thread_source_id() -> Result<u64, Error> {
    with_thread_source(|source| Ok(source.id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standalone_handles_get_distinct_increasing_ids() {
        let first = EntropySource::open().unwrap();
        let second = EntropySource::open().unwrap();
        assert_ne!(first.id(), second.id());
        assert!(second.id() > first.id());
    }

    #[test]
    fn fill_crosses_block_refills() {
        let mut source = EntropySource::open().unwrap();
        let mut buf = [0u8; 3 * BLOCK_LEN + 7];
        source.fill(&mut buf).unwrap();
        // An all-zero fill of this length from a healthy source is impossible.
        assert!(buf.iter().any(|&b| b != 0));
    }

    #[test]
    fn thread_source_is_reused_within_a_thread() {
        let a = thread_source_id().unwrap();
        let b = thread_source_id().unwrap();
        let c = with_thread_source(|source| Ok(source.id())).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn spawned_thread_opens_its_own_source() {
        let here = thread_source_id().unwrap();
        let there = std::thread::spawn(thread_source_id)
            .join()
            .unwrap()
            .unwrap();
        assert_ne!(here, there);
    }

    #[test]
    fn next_u64_varies_across_draws() {
        let mut source = EntropySource::open().unwrap();
        let a = source.next_u64().unwrap();
        let b = source.next_u64().unwrap();
        // A 64-bit collision across two draws is effectively impossible.
        assert_ne!(a, b);
    }
}
