#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	anyhow::Context,
	clap::Parser,
	infantry_assets::{
		blo::{ContainerBuilder, LONG_NAMES_VERSION},
		initTracing, CONTAINER_EXTENSION,
	},
	std::{
		fs::{self, File},
		io::{BufWriter, Write},
		path::PathBuf,
	},
	tracing::info,
};

fn main() -> anyhow::Result<()> {
	/// Packs the files of a directory, in name order, into a `.blo` container.
	#[derive(Parser)]
	struct Args {
		input: PathBuf,
		/// Defaults to the directory's name with a `.blo` extension.
		output: Option<PathBuf>,
		/// 1 for 16-byte entry names, 2 for 32-byte ones.
		#[clap(long, default_value_t = LONG_NAMES_VERSION)]
		version: u32,
	}
	let Args { input, output, version } = Args::parse();
	initTracing();

	let mut fileNames = Vec::new();
	for dirEntry in fs::read_dir(&input).with_context(|| format!("listing {}", input.display()))? {
		let dirEntry = dirEntry?;
		if dirEntry.file_type()?.is_file() {
			let fileName = dirEntry.file_name();
			fileNames.push(
				fileName.into_string().map_err(|fileName| anyhow::anyhow!("{fileName:?} is not valid UTF-8"))?,
			);
		}
	}
	fileNames.sort_unstable();

	let mut builder = ContainerBuilder::new(version)?;
	for fileName in &fileNames {
		let path = input.join(fileName);
		builder.push(fileName, fs::read(&path).with_context(|| format!("reading {}", path.display()))?)?;
	}
	let output = output.unwrap_or_else(|| input.with_extension(CONTAINER_EXTENSION));
	let writer = &mut BufWriter::new(File::create(&output).with_context(|| format!("creating {}", output.display()))?);
	builder.writeTo(writer)?;
	writer.flush()?;
	info!(version, entries = builder.len(), "packed {}", output.display());
	Ok(())
}
