use crate::node::error::ConfigError;

use std::str::FromStr;

/// Shape drawn for each leaf. Only the renderer looks at this.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
	Rectangle,
	Ellipse,
	RoundedRectangle,
}

impl Default for Mode {
	fn default() -> Self {
		Mode::Rectangle
	}
}

impl FromStr for Mode {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"1" | "rect" | "rectangle" => Ok(Mode::Rectangle),
			"2" | "ellipse" => Ok(Mode::Ellipse),
			"3" | "rounded" | "rounded-rectangle" => Ok(Mode::RoundedRectangle),
			_ => Err(ConfigError::UnknownMode(s.to_string())),
		}
	}
}

/// Parses an `RRGGBB` hex color, with or without a leading `#`.
pub fn parse_color(s: &str) -> Result<[u8; 3], ConfigError> {
	let hex = s.strip_prefix('#').unwrap_or(s);
	if hex.len() != 6 || !hex.is_ascii() {
		return Err(ConfigError::InvalidColor(s.to_string()));
	}
	let mut color = [0; 3];
	for (c, out) in color.iter_mut().enumerate() {
		*out = u8::from_str_radix(&hex[2 * c..2 * c + 2], 16)
			.map_err(|_| ConfigError::InvalidColor(s.to_string()))?;
	}
	Ok(color)
}

/// Immutable settings for one decomposition and its rendering.
///
/// Built and validated through `ConfigBuilder`.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
	pub mode: Mode,
	/// Maximum number of splits.
	pub iterations: usize,
	/// Regions with a side at most this long are never split.
	pub leaf_size: u32,
	/// Exponent on region area in the split priority, in `[0, 1]`.
	pub area_power: f64,
	/// Drop in average error needed before another progress snapshot,
	/// in `[0, 1]`.
	pub error_rate: f64,
	pub padding: u32,
	pub fill_color: [u8; 3],
	pub output_scale: u32,
	pub save_frames: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			mode: Mode::Rectangle,
			iterations: 1024,
			leaf_size: 4,
			area_power: 0.25,
			error_rate: 0.5,
			padding: 1,
			fill_color: [0, 0, 0],
			output_scale: 1,
			save_frames: false,
		}
	}
}

impl Config {
	pub fn builder() -> ConfigBuilder {
		ConfigBuilder::default()
	}
}

/// Collects configuration values and checks them in `build`.
#[derive(Clone, Debug, Default)]
pub struct ConfigBuilder {
	inner: Config,
}

impl ConfigBuilder {
	pub fn mode(mut self, mode: Mode) -> Self {
		self.inner.mode = mode;
		self
	}

	pub fn iterations(mut self, iterations: usize) -> Self {
		self.inner.iterations = iterations;
		self
	}

	pub fn leaf_size(mut self, leaf_size: u32) -> Self {
		self.inner.leaf_size = leaf_size;
		self
	}

	pub fn area_power(mut self, power: f64) -> Self {
		self.inner.area_power = power;
		self
	}

	pub fn error_rate(mut self, rate: f64) -> Self {
		self.inner.error_rate = rate;
		self
	}

	pub fn padding(mut self, padding: u32) -> Self {
		self.inner.padding = padding;
		self
	}

	pub fn fill_color(mut self, color: [u8; 3]) -> Self {
		self.inner.fill_color = color;
		self
	}

	pub fn output_scale(mut self, scale: u32) -> Self {
		self.inner.output_scale = scale;
		self
	}

	pub fn save_frames(mut self, save: bool) -> Self {
		self.inner.save_frames = save;
		self
	}

	/// Validates the collected values.
	///
	/// Zero for the leaf size, iteration count or scale is an error.
	/// `area_power` and `error_rate` are clamped to `[0, 1]`.
	pub fn build(self) -> Result<Config, ConfigError> {
		let mut config = self.inner;
		if config.leaf_size == 0 {
			return Err(ConfigError::InvalidLeafSize);
		}
		if config.iterations == 0 {
			return Err(ConfigError::InvalidIterations);
		}
		if config.output_scale == 0 {
			return Err(ConfigError::InvalidScale);
		}
		if config.area_power.is_nan() {
			return Err(ConfigError::NotANumber("area power"));
		}
		if config.error_rate.is_nan() {
			return Err(ConfigError::NotANumber("error rate"));
		}
		config.area_power = config.area_power.max(0.).min(1.);
		config.error_rate = config.error_rate.max(0.).min(1.);
		Ok(config)
	}
}
