//! Resource containers: a directory of named `(offset, size)` ranges followed by the payloads.

use {
	crate::{Error, ReadExt, Result, VersionMismatchError, WriteExt},
	byteorder::{ReadBytesExt, WriteBytesExt, LE},
	std::io::{self, Seek, SeekFrom, Write},
	tracing::debug,
};

pub const SHORT_NAMES_VERSION: u32 = 1;
pub const LONG_NAMES_VERSION: u32 = 2;

const HEADER_SIZE: usize = 8;
const OFFSET_AND_SIZE: usize = 8;

#[must_use]
pub fn nameWidth(version: u32) -> Option<usize> {
	match version {
		SHORT_NAMES_VERSION => Some(16),
		LONG_NAMES_VERSION => Some(32),
		_ => None,
	}
}

fn checkedNameWidth(version: u32) -> Result<usize, VersionMismatchError> {
	nameWidth(version).ok_or(VersionMismatchError { format: "container", found: version })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
	pub name: String,
	/// Absolute, counted from the first byte of the container.
	pub offset: u64,
	pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Container {
	pub version: u32,
	pub entries: Vec<ContainerEntry>,
}

impl Container {
	pub fn parse(bytes: &[u8]) -> Result<Self> {
		let cursor = &mut io::Cursor::new(bytes);
		let version = cursor.read_u32::<LE>()?;
		let nameWidth = checkedNameWidth(version)?;
		let entryCount = cursor.read_u32::<LE>()? as usize;
		let directorySize = entryCount.saturating_mul(nameWidth + OFFSET_AND_SIZE);
		if directorySize > cursor.remaining() {
			return Err(Error::format(format_args!(
				"directory of {entryCount} entries overruns a {} byte container",
				bytes.len()
			)));
		}
		let mut entries = Vec::with_capacity(entryCount);
		for i in 0..entryCount {
			let name = cursor.readFixedString(nameWidth)?;
			let (offset, size) = (u64::from(cursor.read_u32::<LE>()?), u64::from(cursor.read_u32::<LE>()?));
			if offset + size > bytes.len() as u64 {
				return Err(Error::format(format_args!(
					"entry #{i} {name:?} spans {offset}..{} past the end of a {} byte container",
					offset + size,
					bytes.len()
				)));
			}
			entries.push(ContainerEntry { name, offset, size });
		}
		debug!(version, entries = entries.len(), "parsed container");
		Ok(Self { version, entries })
	}

	#[must_use]
	pub fn entry(&self, name: &str) -> Option<&ContainerEntry> {
		self.entries.iter().find(|entry| entry.name == name)
	}

	/// The bytes `entry` addresses inside the container `bytes` it was parsed from.
	pub fn payload<'a>(bytes: &'a [u8], entry: &ContainerEntry) -> Result<&'a [u8]> {
		usize::try_from(entry.offset + entry.size)
			.ok()
			.and_then(|end| bytes.get(entry.offset as usize..end))
			.ok_or_else(|| Error::format(format_args!("entry {:?} lies outside the container", entry.name)))
	}

	pub fn payloads<'a>(
		&'a self,
		bytes: &'a [u8],
	) -> impl Iterator<Item = Result<(&'a ContainerEntry, &'a [u8])>> + 'a {
		self.entries.iter().map(move |entry| Ok((entry, Self::payload(bytes, entry)?)))
	}

	/// Re-packs `payloads` (one per entry, in directory order) under this container's names.
	/// Stored offsets and sizes are recomputed.
	pub fn serialize(&self, payloads: &[&[u8]]) -> Result<Vec<u8>> {
		if payloads.len() != self.entries.len() {
			return Err(Error::encode(format_args!(
				"{} payloads for {} container entries",
				payloads.len(),
				self.entries.len()
			)));
		}
		let mut builder = ContainerBuilder::new(self.version)?;
		for (entry, &payload) in self.entries.iter().zip(payloads) {
			builder.push(&entry.name, payload)?;
		}
		builder.toBytes()
	}
}

/// Accumulates entries whose offsets are only known once every payload has been laid out.
#[derive(Debug, Clone)]
pub struct ContainerBuilder {
	version: u32,
	nameWidth: usize,
	entries: Vec<(String, Vec<u8>)>,
}

impl ContainerBuilder {
	pub fn new(version: u32) -> Result<Self> {
		Ok(Self { version, nameWidth: checkedNameWidth(version)?, entries: Vec::new() })
	}

	pub fn push(&mut self, name: &str, payload: impl Into<Vec<u8>>) -> Result<&mut Self> {
		if name.len() > self.nameWidth {
			return Err(Error::encode(format_args!(
				"entry name {name:?} is longer than {} bytes",
				self.nameWidth
			)));
		}
		if self.entries.iter().any(|(existing, _)| existing == name) {
			return Err(Error::encode(format_args!("duplicate entry name {name:?}")));
		}
		self.entries.push((name.to_owned(), payload.into()));
		Ok(self)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Writes the container at the writer's current position: a placeholder directory with
	/// zeroed offsets, then the payloads, then the real directory over the placeholder.
	/// Offsets are counted from that starting position. Leaves the writer at the end.
	pub fn writeTo<W: Write + Seek>(&self, writer: &mut W) -> Result<Container> {
		let start = writer.stream_position()?;
		let entryCount = u32::try_from(self.entries.len())
			.map_err(|_| Error::encode(format_args!("{} entries don't fit a container", self.entries.len())))?;
		writer.write_u32::<LE>(self.version)?;
		writer.write_u32::<LE>(entryCount)?;
		for (name, _) in &self.entries {
			writer.writeFixedString(name, self.nameWidth)?;
			writer.writeZeros(OFFSET_AND_SIZE)?;
		}

		let mut entries = Vec::with_capacity(self.entries.len());
		for (name, payload) in &self.entries {
			let offset = writer.stream_position()? - start;
			writer.write_all(payload)?;
			entries.push(ContainerEntry { name: name.clone(), offset, size: payload.len() as _ });
		}
		let end = writer.stream_position()?;

		writer.seek(SeekFrom::Start(start + HEADER_SIZE as u64))?;
		for entry in &entries {
			let outOfRange = || Error::encode(format_args!("entry {:?} ends past 4 GiB", entry.name));
			writer.writeFixedString(&entry.name, self.nameWidth)?;
			writer.write_u32::<LE>(u32::try_from(entry.offset).map_err(|_| outOfRange())?)?;
			writer.write_u32::<LE>(u32::try_from(entry.size).map_err(|_| outOfRange())?)?;
		}
		writer.seek(SeekFrom::Start(end))?;
		debug!(version = self.version, entries = entries.len(), bytes = end - start, "wrote container");
		Ok(Container { version: self.version, entries })
	}

	pub fn toBytes(&self) -> Result<Vec<u8>> {
		let mut cursor = io::Cursor::new(Vec::new());
		self.writeTo(&mut cursor)?;
		Ok(cursor.into_inner())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn single_entry_reads_back_literal_bytes() {
		let mut builder = ContainerBuilder::new(LONG_NAMES_VERSION).unwrap();
		builder.push("a", vec![1, 2, 3, 4]).unwrap();
		let bytes = builder.toBytes().unwrap();
		assert_eq!(bytes.len(), HEADER_SIZE + 32 + OFFSET_AND_SIZE + 4);

		let container = Container::parse(&bytes).unwrap();
		let entry = container.entry("a").unwrap();
		assert_eq!(entry.offset, (HEADER_SIZE + 32 + OFFSET_AND_SIZE) as u64);
		assert_eq!(entry.size, 4);
		assert_eq!(Container::payload(&bytes, entry).unwrap(), [1, 2, 3, 4]);
	}

	#[test]
	fn directory_order_survives_serialize() {
		let mut builder = ContainerBuilder::new(SHORT_NAMES_VERSION).unwrap();
		builder.push("zeta.cfs", b"zz".to_vec()).unwrap().push("alpha.cfs", Vec::new()).unwrap();
		builder.push("mid.cfs", b"mmm".to_vec()).unwrap();
		let bytes = builder.toBytes().unwrap();
		let container = Container::parse(&bytes).unwrap();
		let names: Vec<_> = container.entries.iter().map(|entry| entry.name.as_str()).collect();
		assert_eq!(names, ["zeta.cfs", "alpha.cfs", "mid.cfs"]);

		let payloads: Vec<_> = container.payloads(&bytes).map(|result| result.unwrap().1).collect();
		assert_eq!(container.serialize(&payloads).unwrap(), bytes);
	}

	#[test]
	fn hand_built_container_parses() {
		let mut bytes = vec![1, 0, 0, 0, 1, 0, 0, 0];
		bytes.extend_from_slice(b"x.cfs\0\0\0\0\0\0\0\0\0\0\0");
		bytes.extend_from_slice(&[32, 0, 0, 0, 2, 0, 0, 0]);
		bytes.extend_from_slice(&[0xAB, 0xCD]);
		let container = Container::parse(&bytes).unwrap();
		assert_eq!(container.entries, [ContainerEntry { name: "x.cfs".into(), offset: 32, size: 2 }]);
	}

	#[test]
	fn overrunning_entry_is_a_format_error() {
		let mut bytes = vec![1, 0, 0, 0, 1, 0, 0, 0];
		bytes.extend_from_slice(&[b'x'; 16]);
		bytes.extend_from_slice(&[30, 0, 0, 0, 9, 0, 0, 0]);
		assert!(matches!(Container::parse(&bytes), Err(Error::Format(_))));
	}

	#[test]
	fn overrunning_directory_is_a_format_error() {
		let bytes = [2, 0, 0, 0, 0xFF, 0xFF, 0, 0, 0];
		assert!(matches!(Container::parse(&bytes), Err(Error::Format(_))));
	}

	#[test]
	fn unknown_version_is_reported() {
		let bytes = [3, 0, 0, 0, 0, 0, 0, 0];
		assert!(matches!(
			Container::parse(&bytes),
			Err(Error::VersionMismatch(VersionMismatchError { found: 3, .. }))
		));
	}

	#[test]
	fn builder_rejects_long_and_duplicate_names() {
		let mut builder = ContainerBuilder::new(SHORT_NAMES_VERSION).unwrap();
		assert!(matches!(builder.push("seventeen_chars_x", Vec::new()), Err(Error::Encode(_))));
		builder.push("same", Vec::new()).unwrap();
		assert!(matches!(builder.push("same", vec![1]), Err(Error::Encode(_))));
		assert_eq!(builder.len(), 1);
	}

	#[test]
	fn offsets_count_from_the_writer_start() {
		let mut cursor = io::Cursor::new(vec![0xEE; 5]);
		cursor.set_position(5);
		let mut builder = ContainerBuilder::new(LONG_NAMES_VERSION).unwrap();
		builder.push("b", vec![9]).unwrap();
		let container = builder.writeTo(&mut cursor).unwrap();
		let bytes = cursor.into_inner();
		assert_eq!(Container::parse(&bytes[5..]).unwrap(), container);
	}
}
