//! Priority queue over the unsplit leaves of the tree.

use crate::node::error::InvariantViolation;
use crate::node::{NodeId, QuadNode};

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Split priority of one pending leaf.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PriorityKey {
	/// Whether the node may be split at all.
	pub splittable: bool,
	/// `-(error * area^area_power)`; more negative means more urgent.
	pub score: f64,
	/// Push order, used only to break exact ties.
	pub sequence: u64,
}

impl PriorityKey {
	pub fn for_node(node: &QuadNode, area_power: f64, sequence: u64) -> Self {
		Self {
			splittable: !node.is_leaf,
			score: -(node.error() * (node.area() as f64).powf(area_power)),
			sequence,
		}
	}

	/// Orders keys so that the most urgent one is the least.
	///
	/// 1. Every splittable key sorts before every minimal one, whatever the
	///    scores. Minimal nodes can only come out once nothing else is left.
	/// 2. Lower score first, i.e. larger weighted error first. Scores are
	///    compared with `f64::total_cmp`; they are never NaN since errors
	///    and areas are finite and non-negative.
	/// 3. Lower sequence first, i.e. the earlier push wins a tie.
	pub fn compare(&self, other: &Self) -> Ordering {
		let eligibility = match (self.splittable, other.splittable) {
			(true, false) => Ordering::Less,
			(false, true) => Ordering::Greater,
			_ => Ordering::Equal,
		};
		eligibility
			.then_with(|| self.score.total_cmp(&other.score))
			.then_with(|| self.sequence.cmp(&other.sequence))
	}
}

/// Heap slot. `BinaryHeap` pops its greatest element, so the ordering here
/// is `PriorityKey::compare` reversed.
#[derive(Clone, Copy, Debug)]
struct Entry {
	key: PriorityKey,
	node: NodeId,
}

impl PartialEq for Entry {
	fn eq(&self, other: &Self) -> bool {
		self.cmp(other) == Ordering::Equal
	}
}

impl Eq for Entry {}

impl PartialOrd for Entry {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for Entry {
	fn cmp(&self, other: &Self) -> Ordering {
		other.key.compare(&self.key)
	}
}

/// Unsplit leaves waiting to be considered, most urgent first.
///
/// Holds node handles only; the nodes themselves live in the engine's arena.
#[derive(Clone, Debug)]
pub struct Frontier {
	heap: BinaryHeap<Entry>,
	area_power: f64,
	next_sequence: u64,
}

impl Frontier {
	pub fn new(area_power: f64) -> Self {
		Self {
			heap: BinaryHeap::new(),
			area_power,
			next_sequence: 0,
		}
	}

	pub fn area_power(&self) -> f64 {
		self.area_power
	}

	/// Queues a node under the next sequence number and returns its key.
	pub fn push(&mut self, id: NodeId, node: &QuadNode) -> PriorityKey {
		let key = PriorityKey::for_node(node, self.area_power, self.next_sequence);
		self.next_sequence += 1;
		self.heap.push(Entry { key, node: id });
		key
	}

	/// The most urgent entry, without removing it.
	pub fn peek(&self) -> Option<(NodeId, PriorityKey)> {
		self.heap.peek().map(|e| (e.node, e.key))
	}

	/// Removes the most urgent entry.
	///
	/// Minimal entries are never handed out: once only those remain, or the
	/// frontier is empty, this fails and leaves the frontier untouched.
	pub fn pop(&mut self) -> Result<(NodeId, PriorityKey), InvariantViolation> {
		if !self.has_eligible_candidate() {
			return Err(InvariantViolation::NoEligibleCandidate);
		}
		self.heap.pop()
			.map(|e| (e.node, e.key))
			.ok_or(InvariantViolation::NoEligibleCandidate)
	}

	/// Removes the next node to split. Same as `pop`.
	pub fn pop_eligible(&mut self) -> Result<(NodeId, PriorityKey), InvariantViolation> {
		self.pop()
	}

	/// Whether any queued node may be split. Minimal nodes sort last, so
	/// only the top needs checking.
	pub fn has_eligible_candidate(&self) -> bool {
		self.heap.peek().map_or(false, |e| e.key.splittable)
	}

	/// Number of pending leaves.
	pub fn len(&self) -> usize {
		self.heap.len()
	}

	pub fn is_empty(&self) -> bool {
		self.heap.is_empty()
	}

	/// Pending leaves in no particular order.
	pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
		self.heap.iter().map(|e| e.node)
	}

	pub fn clear(&mut self) {
		self.heap.clear();
		self.next_sequence = 0;
	}
}
