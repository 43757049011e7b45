//! Version-9 maps, the format the renderer loads.
//!
//! ```text
//!     header           version, dimensions, offsets, entity count, lights, physics ranges
//!     terrain[8192]    zero-filled tail
//!     floors[2048]     "container,id" in 64-byte NUL-padded slots, blank slots all zeros
//!     tile blob        i32 length, then RLE over 4 planes: A & 0x7F, 0, C, B
//!     entities         placement followed by its 64-byte reference, in placement order
//! ```

use {
	crate::{
		lvl::{BlobRef, EntityPlacement, Header, LevelFile},
		rle,
		tile::{Tile, TERRAIN_LOOKUP_MASK},
		Error, ReadExt, Result, VersionMismatchError, WriteExt,
	},
	byteorder::{ReadBytesExt, WriteBytesExt, LE},
	std::io::{self, Write},
	tracing::debug,
};

pub const VERSION: i32 = 9;
pub const TERRAIN_SLOTS: usize = 8192;
pub const FLOOR_SLOTS: usize = 2048;
pub const REFERENCE_WIDTH: usize = 64;
pub const TILE_PLANES: usize = 4;

impl BlobRef {
	/// `container,id`, with `default` standing in for the side-car of inline references.
	#[must_use]
	pub fn toMapReference(&self, default: &str) -> String {
		format!("{},{}", self.fileName.as_deref().unwrap_or(default), self.id)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntity {
	pub placement: EntityPlacement,
	pub reference: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MapFile {
	pub header: Header,
	pub terrainIds: Vec<u8>,
	/// Occupied floor slots; the rest of the table is blank.
	pub floors: Vec<String>,
	pub tiles: Vec<Tile>,
	pub entities: Vec<MapEntity>,
}

fn writeReference(writer: &mut impl Write, reference: &str) -> Result<()> {
	// one byte stays NUL for readers that expect a terminated string
	if reference.len() >= REFERENCE_WIDTH {
		return Err(Error::encode(format_args!(
			"reference {reference:?} needs more than {} bytes",
			REFERENCE_WIDTH - 1
		)));
	}
	writer.writeFixedString(reference, REFERENCE_WIDTH)
}

pub fn serialize(
	header: &Header,
	terrainIds: &[u8],
	floors: &[String],
	tiles: &[Tile],
	entities: &[MapEntity],
) -> Result<Vec<u8>> {
	let cellCount = header.cellCount()?;
	if terrainIds.len() > TERRAIN_SLOTS {
		return Err(Error::encode(format_args!("{} terrain ids, only {TERRAIN_SLOTS} slots", terrainIds.len())));
	}
	if floors.len() > FLOOR_SLOTS {
		return Err(Error::encode(format_args!("{} floors, only {FLOOR_SLOTS} slots", floors.len())));
	}
	if tiles.len() != cellCount {
		return Err(Error::encode(format_args!("{} tiles for a {}x{} map", tiles.len(), header.width, header.height)));
	}
	let entityCount = i32::try_from(entities.len())
		.map_err(|_| Error::encode(format_args!("too many entities: {}", entities.len())))?;

	let mut writer = Vec::new();
	for field in [VERSION, header.width, header.height, header.offsetX, header.offsetY, entityCount] {
		writer.write_i32::<LE>(field)?;
	}
	header.writeTables(&mut writer)?;

	writer.extend_from_slice(terrainIds);
	writer.writeZeros(TERRAIN_SLOTS - terrainIds.len())?;

	for (i, floor) in floors.iter().enumerate() {
		writeReference(&mut writer, floor).map_err(|err| err.within(format_args!("floor #{i}")))?;
	}
	writer.writeZeros((FLOOR_SLOTS - floors.len()) * REFERENCE_WIDTH)?;

	let planes: Vec<u8> = tiles
		.iter()
		.flat_map(|&Tile { a, b, c }| [a & TERRAIN_LOOKUP_MASK, 0, c, b])
		.collect();
	let tileBlob = rle::encode(&planes, TILE_PLANES, cellCount, false)?;
	writer.write_i32::<LE>(
		i32::try_from(tileBlob.len()).map_err(|_| Error::encode("tile blob exceeds 2 GiB"))?,
	)?;
	writer.extend_from_slice(&tileBlob);

	for (i, entity) in entities.iter().enumerate() {
		entity.placement.write(&mut writer)?;
		writeReference(&mut writer, &entity.reference).map_err(|err| err.within(format_args!("entity #{i}")))?;
	}
	debug!(
		width = header.width,
		height = header.height,
		floors = floors.len(),
		entities = entities.len(),
		tileBlob = tileBlob.len(),
		"serialized map"
	);
	Ok(writer)
}

impl MapFile {
	/// References inline floors and objects to `sideCar`, or leaves them blank when it is `None`.
	pub fn fromLevel(level: &LevelFile, sideCar: Option<&str>) -> Result<Self> {
		let reference = |blobRef: &BlobRef| match sideCar {
			None if blobRef.isInline() => String::new(),
			_ => blobRef.toMapReference(sideCar.unwrap_or_default()),
		};
		let entities = level
			.entities
			.iter()
			.enumerate()
			.map(|(i, &placement)| {
				let object = level.objects.get(usize::from(placement.objectId)).ok_or_else(|| {
					Error::encode(format_args!("entity #{i} uses missing object {}", placement.objectId))
				})?;
				Ok(MapEntity { placement, reference: reference(object) })
			})
			.collect::<Result<_>>()?;
		Ok(Self {
			header: level.header.clone(),
			terrainIds: level.terrainIds.clone(),
			floors: level.floors.iter().map(reference).collect(),
			tiles: level.tiles.clone(),
			entities,
		})
	}

	pub fn toBytes(&self) -> Result<Vec<u8>> {
		serialize(&self.header, &self.terrainIds, &self.floors, &self.tiles, &self.entities)
	}

	/// Reads a map back. Terrain ids come back as the full table; trailing blank floor slots
	/// are dropped; the reserved terrain bit is gone.
	pub fn parse(bytes: &[u8]) -> Result<Self> {
		let cursor = &mut io::Cursor::new(bytes);
		let version = cursor.read_i32::<LE>()?;
		if version != VERSION {
			return Err(VersionMismatchError { format: "map", found: version as u32 }.into());
		}
		let mut header = Header::default();
		header.readDimensions(cursor)?;
		let cellCount = header.cellCount()?;
		let entityCount = usize::try_from(cursor.read_i32::<LE>()?)
			.map_err(|_| Error::format("negative entity count"))?;
		header.readTables(cursor)?;

		let terrainIds = cursor.readSlice(TERRAIN_SLOTS)?.to_vec();
		let mut floors = Vec::with_capacity(FLOOR_SLOTS);
		for _ in 0..FLOOR_SLOTS {
			floors.push(cursor.readFixedString(REFERENCE_WIDTH)?);
		}
		while floors.last().map_or(false, String::is_empty) {
			floors.pop();
		}

		let tiles = {
			let tileBlobLength = usize::try_from(cursor.read_i32::<LE>()?)
				.map_err(|_| Error::format("negative tile blob length"))?;
			let planes = rle::decode(cursor.readSlice(tileBlobLength)?, TILE_PLANES, cellCount)
				.map_err(|err| err.within("tile blob"))?;
			planes.chunks_exact(TILE_PLANES).map(|cell| Tile::new(cell[0], cell[3], cell[2])).collect()
		};

		let mut entities = Vec::with_capacity(entityCount.min(cursor.remaining() / EntityPlacement::SIZE));
		for _ in 0..entityCount {
			let placement = EntityPlacement::read(cursor)?;
			entities.push(MapEntity { placement, reference: cursor.readFixedString(REFERENCE_WIDTH)? });
		}
		Ok(Self { header, terrainIds, floors, tiles, entities })
	}
}
