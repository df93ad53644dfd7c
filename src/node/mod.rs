pub mod error;
pub mod image;
pub mod qti;
pub mod source;
pub mod stats;
pub mod tree;

use error::InvariantViolation;
use source::ImageSource;
use stats::RegionSummary;

/// Axis-aligned rectangle of pixels, left and top inclusive,
/// right and bottom exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Region {
	pub left: u32,
	pub top: u32,
	pub right: u32,
	pub bottom: u32,
}

impl Region {
	/// Makes a region, refusing ones with no width or no height.
	pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Result<Self, InvariantViolation> {
		if left >= right || top >= bottom {
			return Err(InvariantViolation::EmptyRegion((left, top, right, bottom)));
		}
		Ok(Self { left, top, right, bottom })
	}

	pub fn width(&self) -> u32 {
		self.right - self.left
	}

	pub fn height(&self) -> u32 {
		self.bottom - self.top
	}

	pub fn area(&self) -> u64 {
		self.width() as u64 * self.height() as u64
	}

	/// Splits at the floored midpoint of each axis.
	///
	/// Order is top-left, top-right, bottom-left, bottom-right. On an odd
	/// side length the right (or bottom) half is one pixel wider. Quadrants
	/// of a region with a side of one pixel are empty on that axis.
	pub fn quadrants(&self) -> [Region; 4] {
		let (l, t, r, b) = (self.left, self.top, self.right, self.bottom);
		let mx = l + (r - l) / 2;
		let my = t + (b - t) / 2;
		[
			Region { left: l, top: t, right: mx, bottom: my },
			Region { left: mx, top: t, right: r, bottom: my },
			Region { left: l, top: my, right: mx, bottom: b },
			Region { left: mx, top: my, right: r, bottom: b },
		]
	}

	pub fn as_tuple(&self) -> (u32, u32, u32, u32) {
		(self.left, self.top, self.right, self.bottom)
	}
}

/// Handle of a node inside an engine's node arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
	pub fn index(self) -> usize {
		self.0
	}
}

/// Node in the decomposition quadtree.
///
/// Its summary is computed once, from a single histogram query, when the
/// node is made. The only later change is attaching children, which the
/// engine does once when the node is split.
#[derive(Clone, Debug)]
pub struct QuadNode {
	pub region: Region,
	pub depth: u32,
	pub summary: RegionSummary,
	pub is_leaf: bool,
	pub(crate) children: Option<[NodeId; 4]>,
}

impl QuadNode {
	pub fn new<S: ImageSource + ?Sized>(
		source: &S,
		region: Region,
		depth: u32,
		leaf_size: u32
	) -> Result<Self, InvariantViolation> {
		if region.width() == 0 || region.height() == 0 {
			return Err(InvariantViolation::EmptyRegion(region.as_tuple()));
		}
		let hist = source.histogram(&region);
		let summary = RegionSummary::from_histogram(&hist)?;
		for channel in hist.chunks_exact(stats::CHANNEL_BUCKETS) {
			let total = channel.iter().map(|&n| n as u64).sum::<u64>();
			if total != region.area() {
				return Err(InvariantViolation::HistogramTotal { expected: region.area(), actual: total });
			}
		}
		Ok(Self {
			region,
			depth,
			summary,
			is_leaf: region.width() <= leaf_size || region.height() <= leaf_size,
			children: None,
		})
	}

	pub fn area(&self) -> u64 {
		self.region.area()
	}

	pub fn color(&self) -> [u8; 3] {
		self.summary.color
	}

	pub fn error(&self) -> f64 {
		self.summary.error
	}

	/// This node's share of the total weighted error.
	pub fn weighted_error(&self) -> f64 {
		self.summary.error * self.area() as f64
	}

	pub fn children(&self) -> Option<[NodeId; 4]> {
		self.children
	}

	pub fn is_split(&self) -> bool {
		self.children.is_some()
	}

	/// Builds the four quadrant nodes one level deeper.
	///
	/// Nothing is attached here; the engine links the results in once all
	/// four have been built.
	pub fn split<S: ImageSource + ?Sized>(
		&self,
		source: &S,
		leaf_size: u32
	) -> Result<[QuadNode; 4], InvariantViolation> {
		if self.is_leaf {
			return Err(InvariantViolation::SplitMinimalNode);
		}
		let [tl, tr, bl, br] = self.region.quadrants();
		let depth = self.depth + 1;
		Ok([
			QuadNode::new(source, tl, depth, leaf_size)?,
			QuadNode::new(source, tr, depth, leaf_size)?,
			QuadNode::new(source, bl, depth, leaf_size)?,
			QuadNode::new(source, br, depth, leaf_size)?,
		])
	}
}
