use super::error::InvariantViolation;

/// Number of intensity buckets in one channel histogram.
pub const CHANNEL_BUCKETS: usize = 256;

/// Number of buckets in a combined red, green and blue histogram.
pub const HISTOGRAM_LEN: usize = 3 * CHANNEL_BUCKETS;

/// ITU-R BT.601 luma weights for red, green and blue.
pub const LUMA_WEIGHTS: [f64; 3] = [0.2989, 0.5870, 0.1140];

/// Three concatenated channel histograms: red, then green, then blue.
pub type Histogram = [u32; HISTOGRAM_LEN];

/// Weighted mean and standard deviation of one channel histogram.
///
/// The mean is rounded toward zero with integer division, and the deviation
/// is then taken around that rounded value instead of the exact mean. Both
/// approximations are part of the error model; changing either changes which
/// regions get split.
pub fn weighted_mean(hist: &[u32]) -> Result<(u8, f64), InvariantViolation> {
	if hist.len() != CHANNEL_BUCKETS {
		return Err(InvariantViolation::HistogramLength {
			expected: CHANNEL_BUCKETS,
			actual: hist.len(),
		});
	}
	let total = hist.iter().map(|&n| n as u64).sum::<u64>();
	if total == 0 {
		return Err(InvariantViolation::EmptyHistogram);
	}
	let value = hist.iter()
		.enumerate()
		.map(|(i, &n)| i as u64 * n as u64)
		.sum::<u64>() / total;
	let squares = hist.iter()
		.enumerate()
		.map(|(i, &n)| {
			let d = value as f64 - i as f64;
			n as f64 * d * d
		})
		.sum::<f64>();
	// value is a mean of bucket indices, so it is always below 256
	Ok((value as u8, (squares / total as f64).sqrt()))
}

/// Representative color and approximation error of one region.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegionSummary {
	pub color: [u8; 3],
	pub channel_error: [f64; 3],
	pub error: f64,
}

impl RegionSummary {
	/// Summarizes a combined 768-bucket histogram.
	pub fn from_histogram(hist: &[u32]) -> Result<Self, InvariantViolation> {
		if hist.len() != HISTOGRAM_LEN {
			return Err(InvariantViolation::HistogramLength {
				expected: HISTOGRAM_LEN,
				actual: hist.len(),
			});
		}
		let mut color = [0; 3];
		let mut channel_error = [0.; 3];
		for (c, channel) in hist.chunks_exact(CHANNEL_BUCKETS).enumerate() {
			let (value, stddev) = weighted_mean(channel)?;
			color[c] = value;
			channel_error[c] = stddev;
		}
		let error = channel_error.iter()
			.zip(LUMA_WEIGHTS.iter())
			.map(|(e, w)| e * w)
			.sum();
		Ok(Self { color, channel_error, error })
	}
}
