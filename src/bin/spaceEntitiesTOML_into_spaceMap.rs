#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	anyhow::Context,
	clap::Parser,
	infantry_assets::{besideExecutable, initTracing, space, template, template::TemplateEntity},
	rand::{rngs::StdRng, SeedableRng},
	std::{fs, path::PathBuf},
	tracing::{info, warn},
};

fn main() -> anyhow::Result<()> {
	/// Scatters asteroid and nebula templates over a 1024x1024 space map.
	#[derive(Parser)]
	struct Args {
		#[clap(default_value = "space.map")]
		output: PathBuf,
		/// Defaults to `space_entities.toml` beside the executable.
		#[clap(long)]
		entities: Option<PathBuf>,
		/// Reproducible maps.
		#[clap(long)]
		seed: Option<u64>,
	}
	let Args { output, entities, seed } = Args::parse();
	initTracing();

	let entities = entities.unwrap_or_else(|| besideExecutable(template::DEFAULT_FILE_NAME));
	let templates = TemplateEntity::load(&entities).with_context(|| format!("loading {}", entities.display()))?;
	if templates.is_empty() {
		warn!("no templates in {}, the map will be empty", entities.display());
	}
	info!(templates = templates.len(), "loaded {}", entities.display());

	let rng = &mut seed.map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
	let map = space::generate(&templates, space::WIDTH, space::HEIGHT, rng)?;
	fs::write(&output, map.toBytes()?).with_context(|| format!("writing {}", output.display()))?;
	info!("wrote {}", output.display());
	Ok(())
}
