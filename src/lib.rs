//! Approximates an image with a quadtree of flat-colored regions, always
//! splitting the region whose area-weighted color error is largest.

pub mod config;
pub mod engine;
pub mod frontier;
pub mod model;
pub mod node;

pub use config::{Config, ConfigBuilder, Mode};
pub use engine::Engine;
pub use frontier::{Frontier, PriorityKey};
pub use model::{Model, Report};
pub use node::error::{ConfigError, DecodeError, Error, InvariantViolation};
pub use node::source::{load_image, ImageSource};
pub use node::stats::{weighted_mean, RegionSummary};
pub use node::tree::TreeNode;
pub use node::{NodeId, QuadNode, Region};
