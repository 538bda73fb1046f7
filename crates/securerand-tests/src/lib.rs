//! Statistical acceptance battery for secure randomness output.
//!
//! A compact set of checks used by the core crate's integration tests to
//! accept or reject a sampled stream. Each check returns a [`TestResult`]
//! with a p-value (where applicable), a pass/fail determination at the
//! [`ALPHA`] level, and enough detail to diagnose a failure.
//!
//! These are acceptance checks, not certification: a healthy OS CSPRNG
//! passes them with overwhelming probability, while a grossly biased or
//! truncated stream fails them reliably. None of them asserts specific
//! values, because the source is not seedable.

use statrs::distribution::{ChiSquared, ContinuousCDF};
use statrs::function::erf::erfc;

/// Pass threshold applied to p-values.
pub const ALPHA: f64 = 0.01;

/// Result of a single statistical check.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub name: &'static str,
    pub passed: bool,
    pub p_value: Option<f64>,
    pub statistic: f64,
    pub details: String,
}

impl TestResult {
    fn from_p(name: &'static str, p: f64, statistic: f64, details: String) -> Self {
        Self {
            name,
            passed: p >= ALPHA,
            p_value: Some(p),
            statistic,
            details,
        }
    }

    fn failed(name: &'static str, details: String) -> Self {
        Self {
            name,
            passed: false,
            p_value: None,
            statistic: 0.0,
            details,
        }
    }
}

/// Unpack bytes into bits, MSB first.
fn to_bits(data: &[u8]) -> impl Iterator<Item = u8> + '_ {
    data.iter()
        .flat_map(|&byte| (0..8).rev().map(move |shift| (byte >> shift) & 1))
}

/// Monobit frequency: the proportion of 1-bits should sit near 50%.
pub fn monobit_frequency(data: &[u8]) -> TestResult {
    let name = "monobit frequency";
    let n = data.len() * 8;
    if n < 100 {
        return TestResult::failed(name, format!("insufficient data: need 100 bits, got {n}"));
    }
    let s: i64 = to_bits(data).map(|b| if b == 1 { 1 } else { -1 }).sum();
    let s_obs = (s as f64).abs() / (n as f64).sqrt();
    let p = erfc(s_obs / std::f64::consts::SQRT_2);
    TestResult::from_p(name, p, s_obs, format!("S={s}, n={n}"))
}

/// Byte frequency: chi-squared over the 256 byte values.
pub fn byte_frequency(data: &[u8]) -> TestResult {
    let name = "byte frequency";
    let n = data.len();
    // Chi-squared needs ~5 expected observations per bin.
    if n < 1280 {
        return TestResult::failed(name, format!("insufficient data: need 1280 bytes, got {n}"));
    }
    let mut hist = [0u64; 256];
    for &b in data {
        hist[b as usize] += 1;
    }
    let expected = n as f64 / 256.0;
    let chi2: f64 = hist
        .iter()
        .map(|&c| {
            let diff = c as f64 - expected;
            diff * diff / expected
        })
        .sum();
    let dist = ChiSquared::new(255.0).expect("255 degrees of freedom is valid");
    let p = dist.sf(chi2);
    TestResult::from_p(name, p, chi2, format!("n={n}, expected_per_bin={expected:.1}"))
}

/// Serial correlation: lag-1 autocorrelation of byte values, normal
/// approximation. Catches streams whose neighbors predict each other even
/// when the marginal distribution looks uniform.
pub fn serial_correlation(data: &[u8]) -> TestResult {
    let name = "serial correlation";
    let n = data.len();
    if n < 1024 {
        return TestResult::failed(name, format!("insufficient data: need 1024 bytes, got {n}"));
    }
    let xs: Vec<f64> = data.iter().map(|&b| b as f64).collect();
    let mean = xs.iter().sum::<f64>() / n as f64;
    let denom: f64 = xs.iter().map(|x| (x - mean) * (x - mean)).sum();
    if denom == 0.0 {
        return TestResult::failed(name, "constant input".to_string());
    }
    let num: f64 = xs.windows(2).map(|w| (w[0] - mean) * (w[1] - mean)).sum();
    let r = num / denom;
    // Under the null, r is approximately N(-1/n, 1/n).
    let z = (r + 1.0 / n as f64) * (n as f64).sqrt();
    let p = erfc(z.abs() / std::f64::consts::SQRT_2);
    TestResult::from_p(name, p, r, format!("r={r:.5}, n={n}"))
}

/// Range coverage: every value of the inclusive range `[low, high]` must be
/// observed at least once, and no sample may fall outside it.
///
/// Only meaningful when the sample count comfortably exceeds the
/// coupon-collector bound for the span; reports insufficient data below
/// three times that bound.
pub fn range_coverage(samples: &[u64], low: u64, high: u64) -> TestResult {
    let name = "range coverage";
    if low > high {
        return TestResult::failed(name, format!("backwards range: {low} > {high}"));
    }
    let width = high - low;
    if width >= 65536 {
        return TestResult::failed(name, format!("span {width} too wide for coverage counting"));
    }
    let span = width as usize + 1;

    let needed = (span as f64 * (span as f64).ln().max(1.0) * 3.0).ceil() as usize;
    if samples.len() < needed {
        return TestResult::failed(
            name,
            format!(
                "insufficient data: need {needed} samples for span {span}, got {}",
                samples.len()
            ),
        );
    }

    let mut counts = vec![0u64; span];
    for &s in samples {
        if s < low || s > high {
            return TestResult::failed(name, format!("sample {s} outside [{low}, {high}]"));
        }
        counts[(s - low) as usize] += 1;
    }
    let missing = counts.iter().filter(|&&c| c == 0).count();
    let min_bucket = counts.iter().copied().min().unwrap_or(0);
    TestResult {
        name,
        passed: missing == 0,
        p_value: None,
        statistic: missing as f64,
        details: format!(
            "span={span}, samples={}, missing={missing}, min_bucket={min_bucket}",
            samples.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 0, 1, ..., 255 repeating: exactly uniform bytes, heavily correlated
    /// neighbors.
    fn counter_bytes(n: usize) -> Vec<u8> {
        (0..n).map(|i| (i % 256) as u8).collect()
    }

    // -----------------------------------------------------------------------
    // monobit
    // -----------------------------------------------------------------------

    #[test]
    fn monobit_rejects_all_ones() {
        let result = monobit_frequency(&[0xFF; 1024]);
        assert!(!result.passed);
    }

    #[test]
    fn monobit_accepts_perfectly_balanced_input() {
        // Each 256-byte period holds exactly 1024 one-bits of 2048.
        let result = monobit_frequency(&counter_bytes(4096));
        assert!(result.passed, "{}", result.details);
        assert_eq!(result.statistic, 0.0);
    }

    #[test]
    fn monobit_reports_insufficient_data() {
        let result = monobit_frequency(&[0xAA; 4]);
        assert!(!result.passed);
        assert!(result.details.contains("insufficient"));
    }

    // -----------------------------------------------------------------------
    // byte frequency
    // -----------------------------------------------------------------------

    #[test]
    fn byte_frequency_rejects_constant_stream() {
        let result = byte_frequency(&[7u8; 4096]);
        assert!(!result.passed);
    }

    #[test]
    fn byte_frequency_accepts_exactly_uniform_stream() {
        let result = byte_frequency(&counter_bytes(25600));
        assert!(result.passed, "{}", result.details);
        assert_eq!(result.statistic, 0.0);
    }

    // -----------------------------------------------------------------------
    // serial correlation
    // -----------------------------------------------------------------------

    #[test]
    fn serial_correlation_rejects_sawtooth() {
        // Uniform marginals, but each byte predicts the next.
        let result = serial_correlation(&counter_bytes(4096));
        assert!(!result.passed);
        assert!(result.statistic > 0.9, "r={}", result.statistic);
    }

    #[test]
    fn serial_correlation_rejects_constant_input() {
        let result = serial_correlation(&[42u8; 2048]);
        assert!(!result.passed);
        assert!(result.details.contains("constant"));
    }

    // -----------------------------------------------------------------------
    // range coverage
    // -----------------------------------------------------------------------

    #[test]
    fn range_coverage_passes_when_all_values_observed() {
        let samples: Vec<u64> = (0..100).map(|i| i % 8).collect();
        let result = range_coverage(&samples, 0, 7);
        assert!(result.passed, "{}", result.details);
    }

    #[test]
    fn range_coverage_fails_on_missing_bucket() {
        let samples: Vec<u64> = (0..100).map(|i| i % 7).collect();
        let result = range_coverage(&samples, 0, 7);
        assert!(!result.passed);
        assert_eq!(result.statistic, 1.0);
    }

    #[test]
    fn range_coverage_fails_on_out_of_range_sample() {
        let mut samples: Vec<u64> = (0..100).map(|i| i % 8).collect();
        samples.push(9);
        let result = range_coverage(&samples, 0, 7);
        assert!(!result.passed);
        assert!(result.details.contains("outside"));
    }

    #[test]
    fn range_coverage_requires_enough_samples() {
        let samples: Vec<u64> = (0..10).map(|i| i % 8).collect();
        let result = range_coverage(&samples, 0, 7);
        assert!(!result.passed);
        assert!(result.details.contains("insufficient"));
    }

    #[test]
    fn range_coverage_handles_offset_ranges() {
        let samples: Vec<u64> = (0..100).map(|i| 1000 + i % 4).collect();
        let result = range_coverage(&samples, 1000, 1003);
        assert!(result.passed, "{}", result.details);
    }
}
