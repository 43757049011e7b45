#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	anyhow::{bail, Context},
	clap::Parser,
	infantry_assets::{cfs::SpriteSheet, initTracing},
	png::{BitDepth, ColorType},
	std::{
		fs::{self, File},
		io::BufWriter,
		path::PathBuf,
	},
	tracing::info,
};

fn main() -> anyhow::Result<()> {
	/// Lays the frames of a `.cfs` sprite out on one indexed PNG with transparency.
	#[derive(Parser)]
	struct Args {
		input: PathBuf,
		/// Defaults to the input with a `.png` extension.
		output: Option<PathBuf>,
		/// Keep the stored colours of the transparent, shadow and light entries.
		#[clap(long)]
		noColorFix: bool,
	}
	let Args { input, output, noColorFix } = Args::parse();
	initTracing();

	let bytes = fs::read(&input).with_context(|| format!("reading {}", input.display()))?;
	let sheet = SpriteSheet::decode(&bytes, !noColorFix).with_context(|| format!("decoding {}", input.display()))?;
	let image = sheet.compose()?;
	if image.width == 0 || image.height == 0 {
		bail!("{} has no pixels to draw", input.display());
	}

	let output = output.unwrap_or_else(|| input.with_extension("png"));
	let file = File::create(&output).with_context(|| format!("creating {}", output.display()))?;
	let (rgb, alpha) = image.pngPalette();
	let mut png = png::Encoder::new(BufWriter::new(file), u32::try_from(image.width)?, u32::try_from(image.height)?);
	png.set_color(ColorType::Indexed);
	png.set_depth(BitDepth::Eight);
	png.set_palette(rgb);
	png.set_trns(alpha);
	let mut writer = png.write_header()?;
	writer.write_image_data(&image.pixels)?;
	writer.finish()?;
	info!(frames = sheet.frames.len(), "{}x{} -> {}", image.width, image.height, output.display());
	Ok(())
}
