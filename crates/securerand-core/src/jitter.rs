//! Randomized timer durations.
//!
//! Desynchronizes expiration timers across many independent callers (retry
//! storms, cache stampedes) by pulling a random offset out of the top
//! `1/ratio` slice of the nominal duration. The result always lands in
//! `[expiration - expiration/ratio, expiration]`.

use std::time::Duration;

use crate::error::Error;
use crate::source::with_thread_source;

/// Sampling seam for the jitter computation. Production code draws from the
/// calling thread's entropy source; module tests inject scripted offsets to
/// cover the randomized branch deterministically.
trait OffsetSampler {
    fn offset_in(&mut self, low: u64, high: u64) -> Result<u64, Error>;
}

struct ThreadSource;

impl OffsetSampler for ThreadSource {
    fn offset_in(&mut self, low: u64, high: u64) -> Result<u64, Error> {
        with_thread_source(|source| source.next_in_range(low, high))
    }
}

/// Randomize `expiration` down into `[expiration - expiration/ratio, expiration]`.
///
/// Works at whole-millisecond resolution. `ratio == 0` requests no jitter
/// and returns `expiration` unchanged. When `expiration` is too small
/// relative to `ratio` to yield any whole-millisecond offset, the input is
/// likewise returned unchanged; neither degenerate branch consumes entropy,
/// so neither can fail.
///
/// ```
/// use std::time::Duration;
///
/// let timer = securerand_core::randomized_duration(Duration::from_secs(10), 4)?;
/// assert!(timer >= Duration::from_millis(7500));
/// assert!(timer <= Duration::from_secs(10));
/// # Ok::<(), securerand_core::Error>(())
/// ```
pub fn randomized_duration(expiration: Duration, ratio: u8) -> Result<Duration, Error> {
    randomized_with(expiration, ratio, &mut ThreadSource)
}

fn randomized_with(
    expiration: Duration,
    ratio: u8,
    sampler: &mut impl OffsetSampler,
) -> Result<Duration, Error> {
    if ratio == 0 {
        return Ok(expiration);
    }

    // Whole milliseconds; durations beyond u64 milliseconds saturate.
    let max_ms = u64::try_from(expiration.as_millis()).unwrap_or(u64::MAX);

    // [10 secs, ratio 4] => 10000 / 4 => 2500
    let limit = max_ms / u64::from(ratio);
    if limit == 0 {
        return Ok(expiration);
    }

    // (10000 - [0..2500]) => [7500..10000]
    let offset = sampler.offset_in(0, limit)?;
    Ok(Duration::from_millis(max_ms - offset))
}
