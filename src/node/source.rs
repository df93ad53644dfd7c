use super::stats::{Histogram, CHANNEL_BUCKETS, HISTOGRAM_LEN};
use super::Region;

use std::path::Path;

/// Read-only access to the image being approximated.
///
/// Implementors are never mutated by the engine.
pub trait ImageSource {
	fn width(&self) -> u32;
	fn height(&self) -> u32;
	/// Red, green and blue histograms of the pixels with
	/// `left <= x < right` and `top <= y < bottom`, concatenated.
	///
	/// The counts of each channel add up to `region.area()`.
	fn histogram(&self, region: &Region) -> Histogram;
}

impl ImageSource for image::RgbImage {
	fn width(&self) -> u32 {
		image::RgbImage::width(self)
	}

	fn height(&self) -> u32 {
		image::RgbImage::height(self)
	}

	fn histogram(&self, region: &Region) -> Histogram {
		let mut hist = [0; HISTOGRAM_LEN];
		let right = region.right.min(image::RgbImage::width(self));
		let bottom = region.bottom.min(image::RgbImage::height(self));
		for y in region.top..bottom {
			for x in region.left..right {
				let px = self.get_pixel(x, y);
				for c in 0..3 {
					hist[c * CHANNEL_BUCKETS + px.0[c] as usize] += 1;
				}
			}
		}
		hist
	}
}

impl<S: ImageSource + ?Sized> ImageSource for &S {
	fn width(&self) -> u32 {
		(**self).width()
	}

	fn height(&self) -> u32 {
		(**self).height()
	}

	fn histogram(&self, region: &Region) -> Histogram {
		(**self).histogram(region)
	}
}

/// Opens and decodes an image file, converting it to 8-bit RGB.
///
/// Decoding failures are returned as they come from the `image` crate.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<image::RgbImage, image::ImageError> {
	Ok(image::open(path)?.into_rgb8())
}
