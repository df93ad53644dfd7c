//! Greedy split loop over the quadtree.

use crate::config::Config;
use crate::frontier::Frontier;
use crate::node::error::InvariantViolation;
use crate::node::source::ImageSource;
use crate::node::tree::TreeNode;
use crate::node::{NodeId, QuadNode, Region};

use log::{debug, warn};

/// Running sum with Neumaier compensation, so that adding and later
/// subtracting the same terms many times over does not drift.
#[derive(Clone, Copy, Debug, Default)]
struct CompensatedSum {
	sum: f64,
	compensation: f64,
}

impl CompensatedSum {
	fn new(value: f64) -> Self {
		Self { sum: value, compensation: 0. }
	}

	fn add(&mut self, x: f64) {
		let t = self.sum + x;
		if self.sum.abs() >= x.abs() {
			self.compensation += (self.sum - t) + x;
		} else {
			self.compensation += (x - t) + self.sum;
		}
		self.sum = t;
	}

	fn sub(&mut self, x: f64) {
		self.add(-x)
	}

	fn value(&self) -> f64 {
		self.sum + self.compensation
	}
}

/// Decomposes an image into a quadtree by repeatedly splitting the leaf with
/// the largest area-weighted error.
///
/// Nodes live in an arena indexed by `NodeId`; the root is always the first.
/// The frontier refers to the unsplit ones.
#[derive(Debug)]
pub struct Engine<S: ImageSource> {
	source: S,
	leaf_size: u32,
	nodes: Vec<QuadNode>,
	frontier: Frontier,
	error_sum: CompensatedSum,
	splits: usize,
}

impl<S: ImageSource> Engine<S> {
	/// Summarizes the whole image as a single root leaf.
	pub fn new(source: S, config: &Config) -> Result<Self, InvariantViolation> {
		let bounds = Region::new(0, 0, source.width(), source.height())?;
		let root = QuadNode::new(&source, bounds, 0, config.leaf_size)?;
		let mut engine = Self {
			source,
			leaf_size: config.leaf_size,
			nodes: Vec::new(),
			frontier: Frontier::new(config.area_power),
			error_sum: CompensatedSum::default(),
			splits: 0,
		};
		engine.plant(root);
		Ok(engine)
	}

	fn plant(&mut self, root: QuadNode) {
		self.error_sum = CompensatedSum::new(root.weighted_error());
		self.nodes.push(root);
		self.frontier.push(NodeId(0), &self.nodes[0]);
		debug!(
			"root {}x{}: color {:?}, error {:.4}",
			self.width(),
			self.height(),
			self.nodes[0].color(),
			self.nodes[0].error()
		);
	}

	/// Discards every split and starts over from the root.
	pub fn reset(&mut self) {
		self.nodes.truncate(1);
		self.frontier.clear();
		self.splits = 0;
		if let Some(mut root) = self.nodes.pop() {
			root.children = None;
			self.plant(root);
		}
	}

	/// Splits the most urgent eligible leaf.
	///
	/// Returns the split node, or `None` without changing anything when only
	/// minimal leaves remain. The children are built before the frontier or
	/// the error sum are touched, so a failure leaves the engine as it was.
	pub fn step(&mut self) -> Result<Option<NodeId>, InvariantViolation> {
		let id = match self.frontier.peek() {
			Some((id, key)) if key.splittable => id,
			_ => return Ok(None),
		};
		let children = self.nodes[id.0].split(&self.source, self.leaf_size)?;
		let (popped, key) = self.frontier.pop_eligible()?;
		debug_assert_eq!(popped, id);

		let before = self.average_error();
		self.error_sum.sub(self.nodes[id.0].weighted_error());
		let first = self.nodes.len();
		let ids = [NodeId(first), NodeId(first + 1), NodeId(first + 2), NodeId(first + 3)];
		// top-left, top-right, bottom-left, bottom-right
		for (child_id, child) in ids.iter().zip(Vec::from(children)) {
			self.error_sum.add(child.weighted_error());
			self.nodes.push(child);
			self.frontier.push(*child_id, &self.nodes[child_id.0]);
		}
		self.nodes[id.0].children = Some(ids);
		self.splits += 1;

		let after = self.average_error();
		debug!(
			"split #{} {:?} depth {} score {:.4}: average error {:.4}",
			self.splits,
			self.nodes[id.0].region.as_tuple(),
			self.nodes[id.0].depth,
			key.score,
			after
		);
		if after > before {
			warn!(
				"average error rose from {} to {} splitting {:?}",
				before,
				after,
				self.nodes[id.0].region.as_tuple()
			);
		}
		Ok(Some(id))
	}

	/// Steps until `iterations` splits have been made or nothing is left to
	/// split. Returns the number of splits made.
	pub fn run(&mut self, iterations: usize) -> Result<usize, InvariantViolation> {
		for done in 0..iterations {
			if self.step()?.is_none() {
				return Ok(done);
			}
		}
		Ok(iterations)
	}

	pub fn has_eligible_candidate(&self) -> bool {
		self.frontier.has_eligible_candidate()
	}

	/// Sum of `error * area` over the current leaves, kept up to date
	/// incrementally.
	pub fn error_sum(&self) -> f64 {
		self.error_sum.value()
	}

	/// `error_sum` computed from scratch over the current leaves.
	pub fn recomputed_error_sum(&self) -> f64 {
		self.current_frontier().map(QuadNode::weighted_error).sum()
	}

	/// Weighted error per pixel.
	pub fn average_error(&self) -> f64 {
		self.error_sum() / (self.width() as f64 * self.height() as f64)
	}

	/// The unsplit leaves, in no particular order.
	pub fn current_frontier(&self) -> impl Iterator<Item = &QuadNode> + '_ {
		self.frontier.iter().map(move |id| &self.nodes[id.0])
	}

	/// Leaves of the tree in pre-order (top-left first), treating nodes at
	/// `max_depth` as leaves when given.
	pub fn leaf_nodes(&self, max_depth: Option<u32>) -> Vec<&QuadNode> {
		let mut leaves = Vec::new();
		let mut stack = vec![NodeId(0)];
		while let Some(id) = stack.pop() {
			let node = &self.nodes[id.0];
			match node.children {
				Some(children) if max_depth.map_or(true, |d| node.depth < d) => {
					stack.extend(children.iter().rev());
				}
				_ => leaves.push(node),
			}
		}
		leaves
	}

	/// Owned copy of the tree, cut at `max_depth` when given.
	pub fn to_tree(&self, max_depth: Option<u32>) -> TreeNode {
		self.subtree(NodeId(0), max_depth)
	}

	fn subtree(&self, id: NodeId, max_depth: Option<u32>) -> TreeNode {
		let node = &self.nodes[id.0];
		let sections = match node.children {
			Some([tl, tr, bl, br]) if max_depth.map_or(true, |d| node.depth < d) => Some(Box::new([
				self.subtree(tl, max_depth),
				self.subtree(tr, max_depth),
				self.subtree(bl, max_depth),
				self.subtree(br, max_depth),
			])),
			_ => None,
		};
		TreeNode { region: node.region, depth: node.depth, color: node.color(), sections }
	}

	/// Draws the leaves, cut at `max_depth` when given.
	pub fn render(&self, config: &Config, max_depth: Option<u32>) -> ::image::RgbImage {
		crate::node::image::render(
			self.leaf_nodes(max_depth).iter().map(|n| (n.region, n.color())),
			self.width(),
			self.height(),
			config
		)
	}

	pub fn root(&self) -> &QuadNode {
		&self.nodes[0]
	}

	pub fn root_id(&self) -> NodeId {
		NodeId(0)
	}

	pub fn node(&self, id: NodeId) -> Option<&QuadNode> {
		self.nodes.get(id.0)
	}

	/// Number of nodes ever created, split or not.
	pub fn node_count(&self) -> usize {
		self.nodes.len()
	}

	/// Number of pending leaves.
	pub fn frontier_len(&self) -> usize {
		self.frontier.len()
	}

	pub fn splits(&self) -> usize {
		self.splits
	}

	pub fn leaf_size(&self) -> u32 {
		self.leaf_size
	}

	pub fn width(&self) -> u32 {
		self.source.width()
	}

	pub fn height(&self) -> u32 {
		self.source.height()
	}

	pub fn source(&self) -> &S {
		&self.source
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use ::image::{Rgb, RgbImage};

	fn config(leaf_size: u32, area_power: f64) -> Config {
		Config::builder().leaf_size(leaf_size).area_power(area_power).build().unwrap()
	}

	/// Deterministic noisy image.
	fn noise(width: u32, height: u32, seed: u32) -> RgbImage {
		let mut state = seed.wrapping_mul(2654435761).wrapping_add(1);
		RgbImage::from_fn(width, height, |x, y| {
			state ^= state << 13;
			state ^= state >> 17;
			state ^= state << 5;
			let base = ((x * 7 + y * 3) % 256) as u8;
			Rgb([base.wrapping_add(state as u8 % 32), (state >> 8) as u8, (y * 9 % 256) as u8])
		})
	}

	#[test]
	fn compensated_sum_does_not_drift() {
		let mut sum = CompensatedSum::new(0.);
		for i in 0..10_000 {
			let x = 0.1 * (i % 7) as f64 + 1e-7;
			sum.add(1e12);
			sum.add(x);
			sum.sub(1e12);
		}
		let expected = (0..10_000).map(|i| 0.1 * (i % 7) as f64 + 1e-7).sum::<f64>();
		assert!((sum.value() - expected).abs() < 1e-6);
	}

	#[test]
	fn root_covers_image() {
		let img = noise(20, 12, 1);
		let engine = Engine::new(&img, &config(4, 0.25)).unwrap();
		assert_eq!(engine.root().region.as_tuple(), (0, 0, 20, 12));
		assert_eq!(engine.frontier_len(), 1);
		assert!((engine.error_sum() - engine.root().weighted_error()).abs() < 1e-9);
	}

	#[test]
	fn empty_image_is_rejected() {
		let img = RgbImage::new(0, 5);
		assert!(matches!(
			Engine::new(&img, &Config::default()),
			Err(InvariantViolation::EmptyRegion(_))
		));
	}

	#[test]
	fn step_replaces_leaf_with_four_children() {
		let img = noise(32, 32, 2);
		let mut engine = Engine::new(&img, &config(4, 0.25)).unwrap();
		let split = engine.step().unwrap();
		assert_eq!(split, Some(engine.root_id()));
		assert_eq!(engine.frontier_len(), 4);
		assert_eq!(engine.node_count(), 5);
		let children = engine.root().children().unwrap();
		let boxes = children.iter()
			.map(|&c| engine.node(c).unwrap().region.as_tuple())
			.collect::<Vec<_>>();
		assert_eq!(boxes, vec![(0, 0, 16, 16), (16, 0, 32, 16), (0, 16, 16, 32), (16, 16, 32, 32)]);
	}

	#[test]
	fn stops_when_only_minimal_leaves_remain() {
		let img = noise(8, 8, 3);
		let mut engine = Engine::new(&img, &config(4, 0.25)).unwrap();
		// 8x8 splits once into four 4x4 leaves and no further
		assert_eq!(engine.run(100).unwrap(), 1);
		assert!(!engine.has_eligible_candidate());
		let sum = engine.error_sum();
		assert_eq!(engine.step(), Ok(None));
		assert_eq!(engine.error_sum(), sum);
		assert_eq!(engine.frontier_len(), 4);
	}

	#[test]
	fn minimal_leaf_is_not_chosen_while_eligible_ones_remain() {
		let img = noise(64, 24, 4);
		let mut engine = Engine::new(&img, &config(4, 1.)).unwrap();
		while let Some(id) = engine.step().unwrap() {
			assert!(!engine.node(id).unwrap().is_leaf);
		}
		assert!(engine.current_frontier().all(|n| n.is_leaf));
	}

	#[test]
	fn leaf_nodes_match_frontier() {
		let img = noise(40, 40, 5);
		let mut engine = Engine::new(&img, &config(4, 0.25)).unwrap();
		engine.run(20).unwrap();
		let mut from_tree = engine.leaf_nodes(None).iter().map(|n| n.region).collect::<Vec<_>>();
		let mut from_frontier = engine.current_frontier().map(|n| n.region).collect::<Vec<_>>();
		from_tree.sort_by_key(Region::as_tuple);
		from_frontier.sort_by_key(Region::as_tuple);
		assert_eq!(from_tree, from_frontier);

		let shallow = engine.leaf_nodes(Some(1));
		assert!(shallow.iter().all(|n| n.depth <= 1));
		assert_eq!(shallow.iter().map(|n| n.area()).sum::<u64>(), 1600);
		assert_eq!(engine.leaf_nodes(Some(0)).len(), 1);
	}

	#[test]
	fn tree_copy_keeps_structure() {
		let img = noise(24, 24, 7);
		let mut engine = Engine::new(&img, &config(4, 0.25)).unwrap();
		engine.run(6).unwrap();
		let tree = engine.to_tree(None);
		assert_eq!(tree.node_count(), engine.node_count());
		let leaves = tree.leaves();
		let expected = engine.leaf_nodes(None);
		assert_eq!(leaves.len(), expected.len());
		for (a, b) in leaves.iter().zip(expected.iter()) {
			assert_eq!((a.region, a.depth, a.color), (b.region, b.depth, b.color()));
		}
		assert_eq!(engine.to_tree(Some(0)).node_count(), 1);
	}

	#[test]
	fn reset_starts_over() {
		let img = noise(32, 32, 6);
		let mut engine = Engine::new(&img, &config(4, 0.25)).unwrap();
		let first = (0..10).map(|_| engine.step().unwrap()).collect::<Vec<_>>();
		let sum = engine.error_sum();
		engine.reset();
		assert_eq!(engine.splits(), 0);
		assert_eq!(engine.frontier_len(), 1);
		assert!(engine.root().children().is_none());
		let second = (0..10).map(|_| engine.step().unwrap()).collect::<Vec<_>>();
		assert_eq!(first, second);
		assert!((engine.error_sum() - sum).abs() < 1e-6);
	}

	/// Reports no pixels at all for regions narrower than 16.
	struct BlindBelow16(RgbImage);

	impl ImageSource for BlindBelow16 {
		fn width(&self) -> u32 {
			self.0.width()
		}

		fn height(&self) -> u32 {
			self.0.height()
		}

		fn histogram(&self, region: &Region) -> crate::node::stats::Histogram {
			if region.width() < 16 {
				[0; crate::node::stats::HISTOGRAM_LEN]
			} else {
				self.0.histogram(region)
			}
		}
	}

	#[test]
	fn failed_split_leaves_engine_unchanged() {
		let mut engine = Engine::new(BlindBelow16(noise(32, 32, 8)), &config(4, 0.25)).unwrap();
		assert_eq!(engine.step(), Ok(Some(engine.root_id())));
		let (sum, len, nodes) = (engine.error_sum(), engine.frontier_len(), engine.node_count());
		let next = engine.frontier.peek().map(|(id, _)| id);

		assert_eq!(engine.step(), Err(InvariantViolation::EmptyHistogram));
		assert_eq!(engine.error_sum().to_bits(), sum.to_bits());
		assert_eq!(engine.frontier_len(), len);
		assert_eq!(engine.node_count(), nodes);
		assert_eq!(engine.splits(), 1);
		assert_eq!(engine.frontier.peek().map(|(id, _)| id), next);
		assert!(engine.current_frontier().all(|n| !n.is_split()));
	}
}
