use image::error::ImageError;

use quadtree_art::config::{parse_color, Config, Mode};
use quadtree_art::{Error, Model, TreeNode};

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Helper function for `main`.
fn error_exit(msg: &str, code: i32) -> ! {
	eprintln!("{}", msg);
	std::process::exit(code)
}

/// Maps a library error to a message and exit code.
fn report_exit(e: Error) -> ! {
	let code = match &e {
		Error::Config(_) => 2,
		Error::Io(_) => 3,
		Error::Image(ImageError::IoError(_)) => 3,
		Error::Image(ImageError::Decoding(_)) | Error::Decode(_) => 4,
		Error::Image(ImageError::Limits(_)) => 5,
		_ => 10,
	};
	error_exit(&e.to_string(), code)
}

fn parse_arg<T: std::str::FromStr>(matches: &clap::ArgMatches, name: &str, default: &str) -> T {
	match matches.value_of(name).unwrap_or(default).parse() {
		Ok(n) => n,
		Err(_) => error_exit(&format!("Invalid value for {}", name), 2),
	}
}

/// `clap`-based CLI for approximating images with quadtrees.
///
/// May exit process with status code if there are errors:
///
/// 1: `clap` error
///
/// 2: invalid arguments
///
/// 3: file I/O issues
///
/// 4: invalid image data
///
/// 5: computation limits exceeded
///
/// 10: other, potentially unknown error
fn main() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let clap_matches = clap::App::new("quadtree_art")
		.version(env!("CARGO_PKG_VERSION"))
		.author("vkcz")
		.about("Approximates an image with a quadtree of flat-colored shapes.")
		.arg_from_usage("-m, --mode=[MODE] 'Shape to draw: rectangle, ellipse or rounded-rectangle; defaults to rectangle'")
		.arg_from_usage("-n, --iterations=[N] 'Number of splits to make; defaults to 1024'")
		.arg_from_usage("-l, --leaf-size=[N] 'Regions with a side this short are not split; defaults to 4'")
		.arg_from_usage("-a, --area-power=[X] 'Preference for large regions, from 0 to 1; defaults to 0.25'")
		.arg_from_usage("-e, --error-rate=[X] 'Error drop between progress reports, from 0 to 1; defaults to 0.5'")
		.arg_from_usage("-p, --padding=[N] 'Gap between shapes in output pixels; defaults to 1'")
		.arg_from_usage("-c, --fill-color=[RRGGBB] 'Background color; defaults to 000000'")
		.arg_from_usage("-s, --scale=[N] 'Output scale factor; defaults to 1'")
		.arg_from_usage("-f, --frames=[DIR] 'Write a numbered frame at every progress report into DIR'")
		.arg_from_usage("-q, --qta=[PATH] 'Also write the tree as a QTA file'")
		.arg_from_usage("-z, --compress 'Deflate the QTA payload'")
		.arg_from_usage("-r, --from-qta 'Treat INPUT as a QTA file and only render it'")
		.arg_from_usage("<INPUT> 'Path to input file'")
		.arg_from_usage("[OUTPUT] 'Path to output image; defaults to output.png'")
		.get_matches();

	let mode = match clap_matches.value_of("mode").unwrap_or("rectangle").parse::<Mode>() {
		Ok(m) => m,
		Err(e) => error_exit(&e.to_string(), 2),
	};
	let fill_color = match parse_color(clap_matches.value_of("fill-color").unwrap_or("000000")) {
		Ok(c) => c,
		Err(e) => error_exit(&e.to_string(), 2),
	};
	let frames = clap_matches.value_of("frames").map(Path::new);
	let config = match Config::builder()
		.mode(mode)
		.iterations(parse_arg(&clap_matches, "iterations", "1024"))
		.leaf_size(parse_arg(&clap_matches, "leaf-size", "4"))
		.area_power(parse_arg(&clap_matches, "area-power", "0.25"))
		.error_rate(parse_arg(&clap_matches, "error-rate", "0.5"))
		.padding(parse_arg(&clap_matches, "padding", "1"))
		.fill_color(fill_color)
		.output_scale(parse_arg(&clap_matches, "scale", "1"))
		.save_frames(frames.is_some())
		.build() {
		Ok(c) => c,
		Err(e) => report_exit(e.into()),
	};

	// `INPUT` is required, so clap has already rejected a missing one.
	let input_path = clap_matches.value_of("INPUT").unwrap_or_default();
	let output_path = clap_matches.value_of("OUTPUT").unwrap_or("output.png");

	if clap_matches.is_present("from-qta") {
		let mut source_data = Vec::new();
		let mut source_fh = match File::open(input_path) {
			Ok(f) => f,
			Err(_) => error_exit("File not found or could not be read", 3)
		};
		if source_fh.read_to_end(&mut source_data).is_err() {
			error_exit("Could not read from input file", 3)
		}
		let tree = match TreeNode::from_qta(&source_data) {
			Ok(t) => t,
			Err(e) => report_exit(e.into()),
		};
		let output = quadtree_art::node::image::render(
			tree.shapes(),
			tree.region.width(),
			tree.region.height(),
			&config
		);
		if output.save(output_path).is_err() {
			error_exit("Could not save output", 3)
		}
		return;
	}

	let mut model = match Model::open(input_path, config) {
		Ok(m) => m,
		Err(e) => report_exit(e),
	};
	let report = match model.execute(frames) {
		Ok(r) => r,
		Err(e) => report_exit(e),
	};
	if let Err(e) = model.save(output_path) {
		report_exit(e)
	}
	println!("{}", report);

	if let Some(qta_path) = clap_matches.value_of("qta") {
		let qta_data = model.to_tree().to_qta(clap_matches.is_present("compress"));
		let mut out_fh = match File::create(qta_path) {
			Ok(f) => f,
			Err(_) => error_exit("Could not open QTA output file", 3)
		};
		if out_fh.write_all(&qta_data).is_err() {
			error_exit("Could not write to QTA output file", 3)
		}
	}
}
