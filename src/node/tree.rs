use super::Region;

/// Owned, self-contained copy of a decomposition.
///
/// Every node carries its region, depth and color, whether it is a leaf or
/// not, so the tree can be cut at any depth and still be drawn.
#[derive(Clone, Debug, PartialEq)]
pub struct TreeNode {
	pub region: Region,
	pub depth: u32,
	pub color: [u8; 3],
	pub sections: Option<Box<[TreeNode; 4]>>,
}

impl TreeNode {
	pub fn leaf(region: Region, depth: u32, color: [u8; 3]) -> Self {
		Self { region, depth, color, sections: None }
	}

	/// Internal node colored with the area-weighted mean of its sections,
	/// rounded toward zero.
	pub fn internal(region: Region, depth: u32, sections: [TreeNode; 4]) -> Self {
		let mut sums = [0u64; 3];
		let mut area = 0u64;
		for section in sections.iter() {
			let a = section.region.area();
			for c in 0..3 {
				sums[c] += section.color[c] as u64 * a;
			}
			area += a;
		}
		let mut color = [0; 3];
		if area > 0 {
			for c in 0..3 {
				color[c] = (sums[c] / area) as u8;
			}
		}
		Self { region, depth, color, sections: Some(Box::new(sections)) }
	}

	pub fn is_leaf(&self) -> bool {
		self.sections.is_none()
	}

	/// Leaves in pre-order, top-left first.
	pub fn leaves(&self) -> Vec<&TreeNode> {
		let mut out = Vec::new();
		self.collect_leaves(&mut out);
		out
	}

	fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a TreeNode>) {
		match &self.sections {
			Some(sections) => sections.iter().for_each(|s| s.collect_leaves(out)),
			None => out.push(self),
		}
	}

	/// Number of nodes, internal ones included.
	pub fn node_count(&self) -> usize {
		1 + self.sections.as_ref()
			.map_or(0, |s| s.iter().map(TreeNode::node_count).sum())
	}

	/// Removes every node deeper than `max_depth`.
	pub fn truncate(&mut self, max_depth: u32) {
		if self.depth >= max_depth {
			self.sections = None;
		} else if let Some(sections) = &mut self.sections {
			sections.iter_mut().for_each(|s| s.truncate(max_depth));
		}
	}

	/// Region and color of every leaf, ready for `render`.
	pub fn shapes(&self) -> Vec<(Region, [u8; 3])> {
		self.leaves().iter().map(|n| (n.region, n.color)).collect()
	}
}
