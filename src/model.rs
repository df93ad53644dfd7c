//! Driving loop: runs an engine for the configured budget, snapshots
//! progress, and summarizes the result.

use crate::config::Config;
use crate::engine::Engine;
use crate::node::error::Error;
use crate::node::source::{load_image, ImageSource};
use crate::node::tree::TreeNode;

use log::info;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Leaf count at one depth of the finished tree.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthRow {
	pub depth: u32,
	/// Leaves a complete tree would have at this depth.
	pub capacity: u128,
	pub leaves: usize,
}

impl DepthRow {
	pub fn percent(&self) -> f64 {
		100. * self.leaves as f64 / self.capacity as f64
	}
}

/// Outcome of `Model::execute`.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
	/// Splits actually made; less than the budget if the tree ran out of
	/// splittable leaves.
	pub splits: usize,
	/// `(iteration, average error)` at every progress snapshot.
	pub snapshots: Vec<(usize, f64)>,
	pub final_error: f64,
	pub depths: Vec<DepthRow>,
	pub leaves: usize,
}

impl fmt::Display for Report {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		writeln!(f, "{}", "-".repeat(32))?;
		for row in &self.depths {
			writeln!(f, "{:3} {:8} {:8} {:8.2}%", row.depth, row.capacity, row.leaves, row.percent())?;
		}
		writeln!(f, "{}", "-".repeat(32))?;
		write!(f, "             {:8} {:8.2}%", self.leaves, 100.)
	}
}

/// An engine together with the configuration it runs and renders with.
pub struct Model<S: ImageSource> {
	engine: Engine<S>,
	config: Config,
}

impl Model<image::RgbImage> {
	/// Loads an image file and summarizes it as a single leaf.
	pub fn open<P: AsRef<Path>>(path: P, config: Config) -> Result<Self, Error> {
		let source = load_image(path)?;
		Model::new(source, config)
	}
}

impl<S: ImageSource> Model<S> {
	pub fn new(source: S, config: Config) -> Result<Self, Error> {
		let engine = Engine::new(source, &config)?;
		Ok(Self { engine, config })
	}

	pub fn engine(&self) -> &Engine<S> {
		&self.engine
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Makes up to `config.iterations` splits.
	///
	/// Before each split the average error is compared with the one at the
	/// previous snapshot; when it has dropped by more than `error_rate`
	/// (or on the first iteration), it is logged and, if `frames` is given
	/// and frames are enabled, the current state is written there as
	/// `{iteration:06}.png`.
	pub fn execute(&mut self, frames: Option<&Path>) -> Result<Report, Error> {
		let frames = frames.filter(|_| self.config.save_frames);
		if let Some(dir) = frames {
			std::fs::create_dir_all(dir)?;
		}
		let mut previous: Option<f64> = None;
		let mut snapshots = Vec::new();
		let mut splits = 0;
		for i in 0..self.config.iterations {
			let error = self.engine.average_error();
			if previous.map_or(true, |p| p - error > self.config.error_rate) {
				info!("{} {}", i, error);
				if let Some(dir) = frames {
					self.render(None).save(dir.join(format!("{:06}.png", i)))?;
				}
				snapshots.push((i, error));
				previous = Some(error);
			}
			if self.engine.step()?.is_none() {
				info!("no splittable regions left after {} splits", splits);
				break;
			}
			splits += 1;
		}
		Ok(Report {
			splits,
			snapshots,
			final_error: self.engine.average_error(),
			depths: self.depth_rows(),
			leaves: self.engine.frontier_len(),
		})
	}

	/// Leaf counts per depth over the current frontier.
	pub fn depth_rows(&self) -> Vec<DepthRow> {
		let mut counts = BTreeMap::new();
		for node in self.engine.current_frontier() {
			*counts.entry(node.depth).or_insert(0) += 1;
		}
		counts.into_iter()
			.map(|(depth, leaves)| DepthRow { depth, capacity: 1u128 << (2 * depth), leaves })
			.collect()
	}

	pub fn render(&self, max_depth: Option<u32>) -> image::RgbImage {
		self.engine.render(&self.config, max_depth)
	}

	/// Renders the current state and writes it as an image file; the
	/// format follows the extension.
	pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
		self.render(None).save(path)?;
		Ok(())
	}

	pub fn to_tree(&self) -> TreeNode {
		self.engine.to_tree(None)
	}

	pub fn reset(&mut self) {
		self.engine.reset();
	}
}
