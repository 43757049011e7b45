#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	anyhow::Context,
	clap::Parser,
	infantry_assets::{besideExecutable, blo_table, blo_table::ResourceTable, initTracing},
	std::{env, path::PathBuf},
	tracing::info,
};

fn main() -> anyhow::Result<()> {
	/// Hashes every entry of the `f_*.blo` and `o_*.blo` containers in a directory into the
	/// resource table. The custom section of an existing table is kept.
	#[derive(Parser)]
	struct Args {
		/// Defaults to the working directory.
		input: Option<PathBuf>,
		/// Defaults to `blotable.toml` beside the executable.
		#[clap(long)]
		output: Option<PathBuf>,
	}
	let Args { input, output } = Args::parse();
	initTracing();

	let input = match input {
		Some(input) => input,
		None => env::current_dir()?,
	};
	let output = output.unwrap_or_else(|| besideExecutable(blo_table::DEFAULT_FILE_NAME));

	let mut table = ResourceTable::scanDirectory(&input).with_context(|| format!("scanning {}", input.display()))?;
	if output.exists() {
		let previous =
			ResourceTable::load(&output).with_context(|| format!("loading previous {}", output.display()))?;
		table = table.withCustomFrom(&previous);
	}
	table.save(&output).with_context(|| format!("writing {}", output.display()))?;
	info!(hashes = table.auto.len(), custom = table.custom.len(), "wrote {}", output.display());
	Ok(())
}
