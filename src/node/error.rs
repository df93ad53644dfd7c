use thiserror::Error;

/// Reason why a configuration was rejected before an engine could be built.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
	/// The minimum splittable dimension must be at least one pixel.
	#[error("leaf size must be a positive integer")]
	InvalidLeafSize,
	/// The split budget must be at least one.
	#[error("iteration count must be a positive integer")]
	InvalidIterations,
	/// The output scale must be at least one.
	#[error("output scale must be a positive integer")]
	InvalidScale,
	/// A floating-point option was NaN.
	#[error("{0} is not a number")]
	NotANumber(&'static str),
	/// The shape mode name was not recognized.
	#[error("unknown mode `{0}`")]
	UnknownMode(String),
	/// A color was not given as six hex digits.
	#[error("invalid color `{0}`; expected RRGGBB")]
	InvalidColor(String),
}

/// Conditions that can't happen when the engine is used correctly.
///
/// These are surfaced rather than panicked on, and the operation that
/// detects one leaves the engine exactly as it was.
#[derive(Debug, Error, PartialEq)]
pub enum InvariantViolation {
	/// A channel histogram summed to zero pixels.
	#[error("histogram has a total count of zero")]
	EmptyHistogram,
	/// A histogram didn't have the expected number of buckets.
	#[error("histogram has {actual} buckets, expected {expected}")]
	HistogramLength { expected: usize, actual: usize },
	/// A channel histogram didn't count every pixel of its region once,
	/// e.g. because the region reaches past the image.
	#[error("histogram counts {actual} pixels for a region of {expected}")]
	HistogramTotal { expected: u64, actual: u64 },
	/// A region with zero width or height was requested.
	#[error("region {0:?} is empty")]
	EmptyRegion((u32, u32, u32, u32)),
	/// A node at or below the leaf size was asked to split.
	#[error("node is already minimal and can't be split")]
	SplitMinimalNode,
	/// The frontier had nothing left that may be split.
	#[error("frontier has no eligible candidate")]
	NoEligibleCandidate,
}

/// Reason why a serialized tree couldn't be decoded.
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
	/// A tag or color byte was expected but not found.
	#[error("serialized tree ended early")]
	InsufficientData,
	/// A node tag was neither 0 (internal) nor 1 (leaf).
	#[error("invalid node tag {0}")]
	InvalidTag(u8),
	/// Bytes were left over after the root node was complete.
	#[error("{0} bytes of trailing data after tree")]
	TrailingData(usize),
	/// An internal node would have split a region with a side of one pixel.
	#[error("tree splits a region that is too small to split")]
	DegenerateRegion,
	/// There was no valid container header.
	#[error("missing container header")]
	MissingHeader,
	/// The container was written by a format version this build can't read.
	#[error("unsupported container version {0}")]
	UnsupportedVersion(u8),
	/// The compressed payload couldn't be inflated.
	#[error("could not decompress payload")]
	Decompress,
}

/// Crate-level error for operations that cross more than one concern.
#[derive(Debug, Error)]
pub enum Error {
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error(transparent)]
	Invariant(#[from] InvariantViolation),
	#[error(transparent)]
	Decode(#[from] DecodeError),
	/// The image source couldn't be read or decoded; passed through unchanged.
	#[error(transparent)]
	Image(#[from] image::ImageError),
	#[error(transparent)]
	Io(#[from] std::io::Error),
}
