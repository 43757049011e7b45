//! Placement templates for generated maps: a sprite plus the physics and vision footprint it
//! stamps onto the tiles it covers.

use {
	crate::{tile::Tile, Error, Result},
	glam::IVec2,
	serde::Deserialize,
	std::{fs, path::Path},
};

pub const DEFAULT_FILE_NAME: &str = "space_entities.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateEntity {
	pub category: String,
	/// Cell of the footprint the sprite's top-left corner sits on.
	pub anchor: IVec2,
	pub width: usize,
	pub height: usize,
	pub containerName: String,
	pub spriteName: String,
	/// Row-major digits, `width * height` each.
	pub physics: Vec<u8>,
	pub vision: Vec<u8>,
}

#[derive(Deserialize)]
struct TemplateFile {
	#[serde(rename = "entity", default)]
	entities: Vec<TemplateSource>,
}

#[derive(Deserialize)]
struct TemplateSource {
	category: String,
	#[serde(default)]
	x: i32,
	#[serde(default)]
	y: i32,
	width: usize,
	height: usize,
	blo: String,
	cfs: String,
	#[serde(default)]
	physics: String,
	#[serde(default)]
	vision: String,
}

/// Parses a footprint of decimal digits, whitespace ignored. An empty string is all zeros.
pub fn parseFootprint(text: &str, width: usize, height: usize) -> Result<Vec<u8>> {
	let cellCount = width * height;
	let mut footprint = Vec::with_capacity(cellCount);
	for character in text.chars().filter(|character| !character.is_whitespace()) {
		if footprint.len() == cellCount {
			return Err(Error::format(format_args!("too much data for a {width}x{height} footprint")));
		}
		let digit = character
			.to_digit(10)
			.ok_or_else(|| Error::format(format_args!("bad footprint value {character:?}")))?;
		footprint.push(digit as u8);
	}
	match footprint.len() {
		0 => Ok(vec![0; cellCount]),
		len if len == cellCount => Ok(footprint),
		len => Err(Error::format(format_args!("not enough data: {len} of {cellCount} footprint cells"))),
	}
}

/// Which cells of a map are already taken.
#[derive(Debug, Clone)]
pub struct Occupancy {
	pub width: usize,
	pub height: usize,
	cells: Vec<bool>,
}

impl Occupancy {
	#[must_use]
	pub fn new(width: usize, height: usize) -> Self {
		Self { width, height, cells: vec![false; width * height] }
	}

	#[must_use]
	pub fn isBlocked(&self, x: usize, y: usize) -> bool {
		self.cells[y * self.width + x]
	}
}

impl TemplateEntity {
	pub fn parseAll(text: &str) -> Result<Vec<Self>> {
		let TemplateFile { entities } = toml::from_str(text)?;
		entities
			.into_iter()
			.enumerate()
			.map(|(i, source)| {
				let footprint = |text: &str, what| {
					parseFootprint(text, source.width, source.height)
						.map_err(|err| err.within(format_args!("entity #{i} {what}")))
				};
				Ok(Self {
					physics: footprint(&source.physics, "physics")?,
					vision: footprint(&source.vision, "vision")?,
					category: source.category,
					anchor: IVec2::new(source.x, source.y),
					width: source.width,
					height: source.height,
					containerName: source.blo,
					spriteName: source.cfs,
				})
			})
			.collect()
	}

	/// No file means no templates.
	pub fn load(path: &Path) -> Result<Vec<Self>> {
		if !path.exists() {
			return Ok(Vec::new());
		}
		Self::parseAll(&fs::read_to_string(path)?)
	}

	/// `x, y` inside the footprint, row-major.
	fn cells(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
		(0..self.height).flat_map(move |y| (0..self.width).map(move |x| (x, y, y * self.width + x)))
	}

	fn canPlace(&self, at: IVec2, footprint: &[u8], occupancy: &Occupancy) -> bool {
		let (Ok(left), Ok(top)) = (usize::try_from(at.x), usize::try_from(at.y)) else {
			return false;
		};
		if left + self.width > occupancy.width || top + self.height > occupancy.height {
			return false;
		}
		self.cells().all(|(x, y, i)| footprint[i] == 0 || !occupancy.isBlocked(left + x, top + y))
	}

	fn block(&self, at: IVec2, footprint: &[u8], occupancy: &mut Occupancy) {
		let (left, top) = (at.x as usize, at.y as usize);
		for (x, y, i) in self.cells() {
			if footprint[i] > 0 {
				occupancy.cells[(top + y) * occupancy.width + left + x] = true;
			}
		}
	}

	#[must_use]
	pub fn canPlaceWithPhysics(&self, at: IVec2, occupancy: &Occupancy) -> bool {
		self.canPlace(at, &self.physics, occupancy)
	}

	#[must_use]
	pub fn canPlaceWithVision(&self, at: IVec2, occupancy: &Occupancy) -> bool {
		self.canPlace(at, &self.vision, occupancy)
	}

	/// Expects a position `canPlaceWithPhysics` accepted.
	pub fn blockPhysics(&self, at: IVec2, occupancy: &mut Occupancy) {
		self.block(at, &self.physics, occupancy);
	}

	/// Expects a position `canPlaceWithVision` accepted.
	pub fn blockVision(&self, at: IVec2, occupancy: &mut Occupancy) {
		self.block(at, &self.vision, occupancy);
	}

	/// Writes the nonzero footprint cells into a row-major `mapWidth`-wide tile array.
	pub fn applyFootprint(&self, at: IVec2, tiles: &mut [Tile], mapWidth: usize) {
		let (left, top) = (at.x as usize, at.y as usize);
		for (x, y, i) in self.cells() {
			let tile = &mut tiles[(top + y) * mapWidth + left + x];
			if self.physics[i] > 0 {
				tile.setPhysics(self.physics[i]);
			}
			if self.vision[i] > 0 {
				tile.setVision(self.vision[i]);
			}
		}
	}
}
