use crate::config::{Config, Mode};

use super::Region;

type Color = image::Rgb<u8>;

/// Fills the inclusive pixel rectangle `(x0, y0)..=(x1, y1)`, clipped to
/// the image. Draws nothing if the corners are inverted.
fn fill_rect(img: &mut image::RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Color) {
	let xs = x0.max(0)..=x1.min(img.width() as i64 - 1);
	let ys = y0.max(0)..=y1.min(img.height() as i64 - 1);
	for y in ys {
		for x in xs.clone() {
			img.put_pixel(x as u32, y as u32, color);
		}
	}
}

/// Fills the ellipse inscribed in the inclusive pixel rectangle
/// `(x0, y0)..=(x1, y1)`. A pixel is inside if its center is.
fn fill_ellipse(img: &mut image::RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Color) {
	if x1 < x0 || y1 < y0 {
		return;
	}
	let rx = (x1 - x0 + 1) as f64 / 2.;
	let ry = (y1 - y0 + 1) as f64 / 2.;
	let cx = x0 as f64 + rx;
	let cy = y0 as f64 + ry;
	for y in y0.max(0)..=y1.min(img.height() as i64 - 1) {
		let dy = (y as f64 + 0.5 - cy) / ry;
		for x in x0.max(0)..=x1.min(img.width() as i64 - 1) {
			let dx = (x as f64 + 0.5 - cx) / rx;
			if dx * dx + dy * dy <= 1. {
				img.put_pixel(x as u32, y as u32, color);
			}
		}
	}
}

/// Rectangle with quarter-circle corners of `radius` pixels, built from four
/// corner ellipses and two overlapping bars.
fn fill_rounded_rect(
	img: &mut image::RgbImage,
	x0: i64,
	y0: i64,
	x1: i64,
	y1: i64,
	radius: i64,
	color: Color
) {
	if x1 < x0 || y1 < y0 {
		return;
	}
	let d = radius * 2;
	fill_ellipse(img, x0, y0, x0 + d, y0 + d, color);
	fill_ellipse(img, x1 - d, y0, x1, y0 + d, color);
	fill_ellipse(img, x0, y1 - d, x0 + d, y1, color);
	fill_ellipse(img, x1 - d, y1 - d, x1, y1, color);
	fill_rect(img, x0, y0 + radius, x1, y1 - radius, color);
	fill_rect(img, x0 + radius, y0, x1 - radius, y1, color);
}

/// Draws a set of flat-colored leaves as the stylized reconstruction.
///
/// The canvas is `width * scale + padding` by `height * scale + padding`.
/// The image area is first filled with `fill_color`, then each leaf is drawn
/// in its scaled box, inset by `padding` on the top and left and by one pixel
/// on the bottom and right, with the shape given by `mode`. Leaves too small
/// to survive the inset are skipped.
pub fn render<I>(leaves: I, width: u32, height: u32, config: &Config) -> image::RgbImage
where
	I: IntoIterator<Item = (Region, [u8; 3])>
{
	let m = config.output_scale as i64;
	let pad = config.padding as i64;
	let (w, h) = (width as i64 * m, height as i64 * m);
	let mut img = image::RgbImage::new((w + pad) as u32, (h + pad) as u32);
	fill_rect(&mut img, 0, 0, w, h, image::Rgb(config.fill_color));

	for (region, color) in leaves {
		let (l, t, r, b) = (
			region.left as i64,
			region.top as i64,
			region.right as i64,
			region.bottom as i64,
		);
		let (x0, y0, x1, y1) = (l * m + pad, t * m + pad, r * m - 1, b * m - 1);
		let color = image::Rgb(color);
		match config.mode {
			Mode::Rectangle => fill_rect(&mut img, x0, y0, x1, y1, color),
			Mode::Ellipse => fill_ellipse(&mut img, x0, y0, x1, y1, color),
			Mode::RoundedRectangle => {
				let radius = m * (r - l).min(b - t) / 4;
				fill_rounded_rect(&mut img, x0, y0, x1, y1, radius, color)
			}
		}
	}
	img
}
