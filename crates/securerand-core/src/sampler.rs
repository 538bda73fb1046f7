//! Unbiased byte and integer sampling over the thread's entropy source.
//!
//! Range sampling widens every 64-bit draw into a 128-bit accumulator and
//! rejects draws that land in the partial bucket at the top of the space
//! (multiply-shift rejection). The sample is therefore always one width
//! class wider than the requested span before narrowing, and the boundary
//! values of the range carry no modulo bias.

use crate::error::Error;
use crate::source::{EntropySource, with_thread_source};

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for u16 {}
    impl Sealed for u32 {}
    impl Sealed for u64 {}
    impl Sealed for usize {}
}

/// Unsigned integer widths accepted by [`random_in_range`].
///
/// Sealed: the sampler widens through a 64-bit draw, so only widths up to
/// 64 bits are supported.
pub trait SampleUint: sealed::Sealed + Copy + PartialOrd {
    #[doc(hidden)]
    fn into_u64(self) -> u64;
    #[doc(hidden)]
    fn from_u64(value: u64) -> Self;
}

macro_rules! impl_sample_uint {
    ($($ty:ty),*) => {$(
        impl SampleUint for $ty {
            fn into_u64(self) -> u64 {
                self as u64
            }

            fn from_u64(value: u64) -> Self {
                // Only called with values already inside the requested span.
                value as $ty
            }
        }
    )*};
}

impl_sample_uint!(u8, u16, u32, u64, usize);

impl EntropySource {
    /// Uniform sample from the inclusive range `[low, high]`.
    ///
    /// `low > high` is rejected with [`Error::InvalidRange`]; operands are
    /// never swapped. The degenerate range `low == high` returns that exact
    /// value without consuming entropy.
    pub fn next_in_range<T: SampleUint>(&mut self, low: T, high: T) -> Result<T, Error> {
        let (low, high) = (low.into_u64(), high.into_u64());
        if low > high {
            return Err(Error::InvalidRange { low, high });
        }
        if low == high {
            return Ok(T::from_u64(low));
        }
        // Spans covering all of u64 can't be counted in 64 bits, and every
        // draw is already uniform over them.
        let Some(span) = (high - low).checked_add(1) else {
            return Ok(T::from_u64(self.next_u64()?));
        };
        Ok(T::from_u64(low + self.sample_below(span)?))
    }

    /// Uniform value in `[0, span)` for `span >= 2`.
    fn sample_below(&mut self, span: u64) -> Result<u64, Error> {
        let threshold = reject_threshold(span);
        loop {
            // 64-bit draw widened into a 128-bit accumulator: the high half
            // is the candidate, the low half tells partial buckets apart.
            let widened = u128::from(self.next_u64()?) * u128::from(span);
            if (widened as u64) >= threshold {
                return Ok((widened >> 64) as u64);
            }
        }
    }
}

/// `2^64 mod span`: draws whose low accumulator half falls below this value
/// sit in a bucket that cannot be filled evenly and must be redrawn.
fn reject_threshold(span: u64) -> u64 {
    span.wrapping_neg() % span
}

/// Uniform random byte from the calling thread's entropy source.
pub fn random_byte() -> Result<u8, Error> {
    with_thread_source(|source| source.next_byte())
}

/// Uniform random integer in the inclusive range `[low, high]`.
///
/// Generic over unsigned widths up to `u64` (see [`SampleUint`]).
/// `low > high` is rejected with [`Error::InvalidRange`] rather than
/// silently corrected.
pub fn random_in_range<T: SampleUint>(low: T, high: T) -> Result<T, Error> {
    with_thread_source(|source| source.next_in_range(low, high))
}

/// Overwrite every byte of `out` with fresh entropy, in order.
///
/// Atomic: either the whole buffer is overwritten or the acquisition
/// failure propagates with the buffer contents undefined. A zero-length
/// buffer never touches the source and cannot fail.
pub fn fill_random_bytes(out: &mut [u8]) -> Result<(), Error> {
    if out.is_empty() {
        return Ok(());
    }
    with_thread_source(|source| source.fill(out))
}
