//! Editor level files. Floors and objects either name an external container or, with an
//! empty file name, live in the level's side-car container (`<level>.lvb`).

use {
	crate::{
		tile::{self, Tile},
		Error, ReadExt, Result, WriteExt,
	},
	byteorder::{ReadBytesExt, WriteBytesExt, LE},
	core::fmt,
	std::io,
	tracing::debug,
};

pub const PHYSICS_LEVELS: usize = 32;
pub const FLOOR_SLOTS: usize = 32;
pub const BLOB_NAME_WIDTH: usize = 32;
pub const LIGHT_COLORS: usize = 4;

/// Indices into `Header::lightColors`.
pub const WHITE: usize = 0;
pub const RED: usize = 1;
pub const GREEN: usize = 2;
pub const BLUE: usize = 3;

/// Fields a level shares with the map it decompiles into.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
	pub width: i32,
	pub height: i32,
	pub offsetX: i32,
	pub offsetY: i32,
	pub lightColors: [u32; LIGHT_COLORS],
	pub physicsLow: [i16; PHYSICS_LEVELS],
	pub physicsHigh: [i16; PHYSICS_LEVELS],
}

impl Header {
	/// `width * height`, or a format error for negative or absurd dimensions.
	pub fn cellCount(&self) -> Result<usize> {
		usize::try_from(self.width)
			.ok()
			.zip(usize::try_from(self.height).ok())
			.and_then(|(width, height)| width.checked_mul(height))
			.ok_or_else(|| Error::format(format_args!("bad dimensions {}x{}", self.width, self.height)))
	}

	pub(crate) fn readDimensions(&mut self, cursor: &mut io::Cursor<&[u8]>) -> Result<()> {
		self.width = cursor.read_i32::<LE>()?;
		self.height = cursor.read_i32::<LE>()?;
		self.offsetX = cursor.read_i32::<LE>()?;
		self.offsetY = cursor.read_i32::<LE>()?;
		Ok(())
	}

	pub(crate) fn readTables(&mut self, cursor: &mut io::Cursor<&[u8]>) -> Result<()> {
		cursor.read_u32_into::<LE>(&mut self.lightColors)?;
		cursor.read_i16_into::<LE>(&mut self.physicsLow)?;
		cursor.read_i16_into::<LE>(&mut self.physicsHigh)?;
		Ok(())
	}

	pub(crate) fn writeTables(&self, writer: &mut impl io::Write) -> Result<()> {
		for &color in &self.lightColors {
			writer.write_u32::<LE>(color)?;
		}
		for &physics in self.physicsLow.iter().chain(&self.physicsHigh) {
			writer.write_i16::<LE>(physics)?;
		}
		Ok(())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct BlobRef {
	/// `None` means the level's own side-car container.
	pub fileName: Option<String>,
	pub id: String,
}

impl BlobRef {
	pub fn external(fileName: impl Into<String>, id: impl Into<String>) -> Self {
		Self { fileName: Some(fileName.into()), id: id.into() }
	}

	pub fn inline(id: impl Into<String>) -> Self {
		Self { fileName: None, id: id.into() }
	}

	#[must_use]
	pub fn isInline(&self) -> bool {
		self.fileName.is_none()
	}

	fn read(cursor: &mut io::Cursor<&[u8]>) -> Result<Self> {
		let fileName = cursor.readFixedString(BLOB_NAME_WIDTH)?;
		let id = cursor.readFixedString(BLOB_NAME_WIDTH)?;
		Ok(Self { fileName: Some(fileName).filter(|fileName| !fileName.is_empty()), id })
	}

	fn write(&self, writer: &mut impl io::Write) -> Result<()> {
		writer.writeFixedString(self.fileName.as_deref().unwrap_or_default(), BLOB_NAME_WIDTH)?;
		writer.writeFixedString(&self.id, BLOB_NAME_WIDTH)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntityPlacement {
	/// In 1/16 tile.
	pub x: i16,
	pub y: i16,
	/// Index into `LevelFile::objects`.
	pub objectId: u16,
}

impl EntityPlacement {
	pub const SIZE: usize = 6;

	pub(crate) fn read(cursor: &mut io::Cursor<&[u8]>) -> Result<Self> {
		Ok(Self { x: cursor.read_i16::<LE>()?, y: cursor.read_i16::<LE>()?, objectId: cursor.read_u16::<LE>()? })
	}

	pub(crate) fn write(self, writer: &mut impl io::Write) -> Result<()> {
		writer.write_i16::<LE>(self.x)?;
		writer.write_i16::<LE>(self.y)?;
		writer.write_u16::<LE>(self.objectId)?;
		Ok(())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RefTable {
	Floors,
	Objects,
}

impl fmt::Display for RefTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Floors => "floor",
			Self::Objects => "object",
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LevelFile {
	pub header: Header,
	pub terrainIds: Vec<u8>,
	pub floors: Vec<BlobRef>,
	pub objects: Vec<BlobRef>,
	pub entities: Vec<EntityPlacement>,
	/// Row-major, `width * height`.
	pub tiles: Vec<Tile>,
}

fn readCount(cursor: &mut io::Cursor<&[u8]>, what: &str, elementSize: usize) -> Result<usize> {
	let count = cursor.read_u32::<LE>()? as usize;
	if count.saturating_mul(elementSize) > cursor.remaining() {
		return Err(Error::format(format_args!("{count} {what} overrun the file")));
	}
	Ok(count)
}

fn writeCount(writer: &mut impl io::Write, what: &str, count: usize) -> Result<()> {
	let count = u32::try_from(count).map_err(|_| Error::encode(format_args!("too many {what}: {count}")))?;
	writer.write_u32::<LE>(count)?;
	Ok(())
}

impl LevelFile {
	pub fn parse(bytes: &[u8]) -> Result<Self> {
		let cursor = &mut io::Cursor::new(bytes);
		let mut header = Header::default();
		header.readDimensions(cursor)?;
		let cellCount = header.cellCount()?;
		header.readTables(cursor)?;

		let terrainIds = {
			let terrainCount = readCount(cursor, "terrain ids", 1)?;
			cursor.readSlice(terrainCount)?.to_vec()
		};

		let floors = {
			let floorCount = cursor.read_u32::<LE>()? as usize;
			if floorCount > FLOOR_SLOTS {
				return Err(Error::format(format_args!("{floorCount} floors, only {FLOOR_SLOTS} slots")));
			}
			let mut slots = Vec::with_capacity(FLOOR_SLOTS);
			for _ in 0..FLOOR_SLOTS {
				slots.push(BlobRef::read(cursor)?);
			}
			slots.truncate(floorCount);
			slots
		};

		let tiles = cursor
			.readSlice(cellCount.checked_mul(tile::SIZE).unwrap_or(usize::MAX))
			.map_err(|err| err.within("tiles"))?
			.chunks_exact(tile::SIZE)
			.map(|bytes| Tile::fromBytes([bytes[0], bytes[1], bytes[2]]))
			.collect();

		let objectCount = readCount(cursor, "objects", 2 * BLOB_NAME_WIDTH)?;
		let mut objects = Vec::with_capacity(objectCount);
		for _ in 0..objectCount {
			objects.push(BlobRef::read(cursor)?);
		}

		let entityCount = readCount(cursor, "entities", EntityPlacement::SIZE)?;
		let mut entities = Vec::with_capacity(entityCount);
		for i in 0..entityCount {
			let entity = EntityPlacement::read(cursor)?;
			if usize::from(entity.objectId) >= objects.len() {
				return Err(Error::format(format_args!(
					"entity #{i} uses object {} of {}",
					entity.objectId,
					objects.len()
				)));
			}
			entities.push(entity);
		}

		debug!(
			width = header.width,
			height = header.height,
			floors = floors.len(),
			objects = objects.len(),
			entities = entities.len(),
			trailing = cursor.remaining(),
			"parsed level"
		);
		Ok(Self { header, terrainIds, floors, objects, entities, tiles })
	}

	pub fn serialize(&self) -> Result<Vec<u8>> {
		let header = &self.header;
		if self.tiles.len() != header.cellCount()? {
			return Err(Error::encode(format_args!(
				"{} tiles for a {}x{} level",
				self.tiles.len(),
				header.width,
				header.height
			)));
		}
		if self.floors.len() > FLOOR_SLOTS {
			return Err(Error::encode(format_args!("{} floors, only {FLOOR_SLOTS} slots", self.floors.len())));
		}
		let mut writer = Vec::new();
		for field in [header.width, header.height, header.offsetX, header.offsetY] {
			writer.write_i32::<LE>(field)?;
		}
		header.writeTables(&mut writer)?;

		writeCount(&mut writer, "terrain ids", self.terrainIds.len())?;
		writer.extend_from_slice(&self.terrainIds);

		writeCount(&mut writer, "floors", self.floors.len())?;
		for floor in &self.floors {
			floor.write(&mut writer)?;
		}
		writer.writeZeros((FLOOR_SLOTS - self.floors.len()) * 2 * BLOB_NAME_WIDTH)?;

		for tile in &self.tiles {
			writer.extend_from_slice(&tile.toBytes());
		}

		writeCount(&mut writer, "objects", self.objects.len())?;
		for object in &self.objects {
			object.write(&mut writer)?;
		}

		writeCount(&mut writer, "entities", self.entities.len())?;
		for entity in &self.entities {
			entity.write(&mut writer)?;
		}
		Ok(writer)
	}

	/// Floors, then objects, whose resources live in the side-car container.
	pub fn inlineReferences(&self) -> impl Iterator<Item = (RefTable, usize, &BlobRef)> {
		[RefTable::Floors, RefTable::Objects]
			.into_iter()
			.flat_map(move |table| self.table(table).iter().enumerate().map(move |(i, blobRef)| (table, i, blobRef)))
			.filter(|(_, _, blobRef)| blobRef.isInline())
	}

	#[must_use]
	pub fn hasInlineReferences(&self) -> bool {
		self.inlineReferences().next().is_some()
	}

	#[must_use]
	pub fn table(&self, table: RefTable) -> &[BlobRef] {
		match table {
			RefTable::Floors => &self.floors,
			RefTable::Objects => &self.objects,
		}
	}

	pub fn tableMut(&mut self, table: RefTable) -> &mut [BlobRef] {
		match table {
			RefTable::Floors => &mut self.floors,
			RefTable::Objects => &mut self.objects,
		}
	}
}
