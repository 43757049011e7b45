#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	anyhow::{bail, Context},
	clap::Parser,
	infantry_assets::{blo::Container, initTracing},
	std::{fs, path::PathBuf},
	tracing::info,
};

fn main() -> anyhow::Result<()> {
	/// Unpacks every entry of a `.blo` container into a directory.
	#[derive(Parser)]
	struct Args {
		input: PathBuf,
		/// Defaults to the container's name without its extension.
		output: Option<PathBuf>,
	}
	let Args { input, output } = Args::parse();
	initTracing();

	let bytes = fs::read(&input).with_context(|| format!("reading {}", input.display()))?;
	let container = Container::parse(&bytes).with_context(|| format!("parsing {}", input.display()))?;
	let output = output.unwrap_or_else(|| input.with_extension(""));
	fs::create_dir_all(&output).with_context(|| format!("creating {}", output.display()))?;

	for payload in container.payloads(&bytes) {
		let (entry, payload) = payload?;
		let path = output.join(&entry.name);
		if path.file_name().map_or(true, |fileName| *fileName != *entry.name) {
			bail!("entry {:?} is not a plain file name", entry.name);
		}
		fs::write(&path, payload).with_context(|| format!("writing {}", path.display()))?;
	}
	info!(version = container.version, entries = container.entries.len(), "unpacked into {}", output.display());
	Ok(())
}
