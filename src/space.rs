//! Procedural space maps: asteroid fields where the noise runs high, nebulae where it runs low.

use {
	crate::{
		lvl::{EntityPlacement, Header, BLUE, GREEN, PHYSICS_LEVELS, RED, WHITE},
		map::{MapEntity, MapFile},
		noise::valueNoise,
		template::{Occupancy, TemplateEntity},
		tile::Tile,
		Error, Result,
	},
	glam::IVec2,
	rand::{seq::IteratorRandom, Rng},
	tracing::info,
};

pub const WIDTH: usize = 1024;
pub const HEIGHT: usize = 1024;
/// Cells along every edge that never receive an entity.
pub const MARGIN: usize = 8;

pub const ASTEROID: &str = "asteroid";
pub const NEBULA: &str = "nebula";

const TERRAIN_COUNT: u8 = 16;
const FLOOR: &str = "f_default.blo,default.cfs";
/// 1/16-tile units per cell.
const SUBCELLS: i32 = 16;

#[rustfmt::skip]
const PHYSICS_HIGH: [i16; PHYSICS_LEVELS] = [
	0,
	1024, 1024, 1024, 1024, 1024,
	16, 16, 16, 16, 16,
	32, 32, 32, 32, 32,
	64, 64, 64, 64, 64,
	128, 128, 128, 128, 128,
	1024, 1024, 1024, 1024, 1024, 1024,
];

fn header(width: usize, height: usize) -> Result<Header> {
	let dimension = |n: usize| i32::try_from(n).map_err(|_| Error::encode(format_args!("map dimension {n}")));
	let mut header = Header {
		width: dimension(width)?,
		height: dimension(height)?,
		physicsHigh: PHYSICS_HIGH,
		..Header::default()
	};
	header.lightColors[WHITE] = 0xFFFF_FF00;
	header.lightColors[RED] = 0x0000_FF00;
	header.lightColors[GREEN] = 0x00FF_0000;
	header.lightColors[BLUE] = 0xFF00_0000;
	Ok(header)
}

fn pick<'a>(templates: &'a [TemplateEntity], category: &str, rng: &mut impl Rng) -> Option<&'a TemplateEntity> {
	templates.iter().filter(|template| template.category == category).choose(rng)
}

/// Scatters `templates` over a `width x height` map. Noise in 180..200 tries an asteroid on
/// even cells 40% of the time, noise below 15 tries a nebula 20% of the time; a template
/// only lands where its physics (asteroids) or vision (nebulae) footprint is free.
pub fn generate(templates: &[TemplateEntity], width: usize, height: usize, rng: &mut impl Rng) -> Result<MapFile> {
	let noise = valueNoise(width, height, 0.0325, 1.0, 0.5, 16, rng);
	let (mut physics, mut vision) = (Occupancy::new(width, height), Occupancy::new(width, height));
	let mut placed = Vec::new();

	for x in MARGIN..width.saturating_sub(MARGIN) {
		for y in MARGIN..height.saturating_sub(MARGIN) {
			let at = IVec2::new(x as _, y as _);
			match noise[y * width + x] {
				180..=199 => {
					if rng.gen_range(0..100) >= 60 && x % 2 == 0 && y % 2 == 0 {
						if let Some(template) = pick(templates, ASTEROID, rng) {
							if template.canPlaceWithPhysics(at, &physics) {
								template.blockPhysics(at, &mut physics);
								placed.push((at, template));
							}
						}
					}
				}
				0..=14 => {
					if rng.gen_range(0..100) >= 80 {
						if let Some(template) = pick(templates, NEBULA, rng) {
							if template.canPlaceWithVision(at, &vision) {
								template.blockVision(at, &mut vision);
								placed.push((at, template));
							}
						}
					}
				}
				_ => {}
			}
		}
	}

	let mut tiles = vec![Tile::default(); width * height];
	let mut entities = Vec::with_capacity(placed.len());
	for &(at, template) in &placed {
		template.applyFootprint(at, &mut tiles, width);
		let position = (at - template.anchor) * SUBCELLS;
		let coordinate =
			|n: i32| i16::try_from(n).map_err(|_| Error::encode(format_args!("entity coordinate {n} overflows")));
		entities.push(MapEntity {
			placement: EntityPlacement { x: coordinate(position.x)?, y: coordinate(position.y)?, objectId: 0 },
			reference: format!("{},{}", template.containerName, template.spriteName),
		});
	}
	info!(entities = entities.len(), "generated {width}x{height} space map");

	Ok(MapFile {
		header: header(width, height)?,
		terrainIds: (0..TERRAIN_COUNT).collect(),
		floors: vec![FLOOR.to_owned()],
		tiles,
		entities,
	})
}
