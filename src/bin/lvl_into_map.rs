#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	anyhow::Context,
	clap::Parser,
	infantry_assets::{
		besideExecutable, blo_table, initTracing,
		blo_table::ResourceTable,
		lvl::LevelFile,
		map::MapFile,
		remap::{remapLevel, sideCarPath},
	},
	std::{fs, path::PathBuf},
	tracing::{info, warn},
};

fn main() -> anyhow::Result<()> {
	/// Converts a `.lvl` level into the `.map` layout, pointing side-car resources at the
	/// containers they came from.
	#[derive(Parser)]
	struct Args {
		input: PathBuf,
		/// Defaults to the input with a `.map` extension.
		output: Option<PathBuf>,
		/// Leave inline references pointing at the side-car.
		#[clap(long)]
		noResourceMapping: bool,
		/// Pack resources the table doesn't know into `f_<level>.lvb.blo` and `o_<level>.lvb.blo`
		/// beside the output.
		#[clap(long)]
		generateFallbackContainers: bool,
		/// Blank the references that still point at the side-car.
		#[clap(long)]
		stripSideCarReferences: bool,
		/// Defaults to `blotable.toml` beside the executable.
		#[clap(long)]
		table: Option<PathBuf>,
	}
	let Args { input, output, noResourceMapping, generateFallbackContainers, stripSideCarReferences, table } =
		Args::parse();
	initTracing();

	let bytes = fs::read(&input).with_context(|| format!("reading {}", input.display()))?;
	let mut level = LevelFile::parse(&bytes).with_context(|| format!("parsing {}", input.display()))?;
	let output = output.unwrap_or_else(|| input.with_extension("map"));
	let sideCar = sideCarPath(&input);

	if level.hasInlineReferences() && !noResourceMapping {
		let tablePath = table.unwrap_or_else(|| besideExecutable(blo_table::DEFAULT_FILE_NAME));
		let table = if tablePath.exists() {
			ResourceTable::load(&tablePath).with_context(|| format!("loading {}", tablePath.display()))?
		} else {
			warn!("{} not found, no resource will be remapped", tablePath.display());
			ResourceTable::default()
		};
		let outputDirectory = output.parent().map(PathBuf::from).unwrap_or_default();
		let report = remapLevel(
			&level,
			&sideCar,
			&table,
			generateFallbackContainers.then_some(outputDirectory.as_path()),
		)?;
		let applied = report.apply(&mut level);
		info!(applied, unresolved = report.unresolved.len(), "resources remapped");
	}

	let sideCarName = sideCar.file_name().map(|fileName| fileName.to_string_lossy().into_owned()).unwrap_or_default();
	let map = MapFile::fromLevel(&level, (!stripSideCarReferences).then_some(sideCarName.as_str()))?;
	fs::write(&output, map.toBytes()?).with_context(|| format!("writing {}", output.display()))?;
	info!(entities = map.entities.len(), "{} -> {}", input.display(), output.display());
	Ok(())
}
