#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

pub mod blo;
pub mod blo_table;
pub mod cfs;
pub mod error;
pub mod lvl;
pub mod map;
pub mod noise;
pub mod remap;
pub mod rle;
pub mod space;
pub mod template;
pub mod tile;

pub use error::{Error, Result, VersionMismatchError};

use {
	memchr::memchr,
	serde::ser,
	std::{
		env,
		io::{self, Write},
		path::{Path, PathBuf},
	},
};

pub const PALETTE_ENTRIES: usize = 256;
pub const RGB_SIZE: usize = 3;
pub const RGBA_SIZE: usize = 4;
pub const FULLY_TRANSPARENT: u8 = 0;

/// Extension of the side-car container that holds a level's inline resources.
pub const SIDE_CAR_EXTENSION: &str = "lvb";
pub const CONTAINER_EXTENSION: &str = "blo";

pub trait ReadExt<'a> {
	fn remaining(&self) -> usize;
	fn readSlice(&mut self, len: usize) -> Result<&'a [u8]>;
	fn consumeZeros(&mut self, zerosCount: usize) -> Result<()>;
	fn readFixedString(&mut self, width: usize) -> Result<String>;

	fn readArray<const N: usize>(&mut self) -> Result<[u8; N]> {
		let mut array = [0; N];
		array.copy_from_slice(self.readSlice(N)?);
		Ok(array)
	}
}

impl<'a> ReadExt<'a> for io::Cursor<&'a [u8]> {
	fn remaining(&self) -> usize {
		self.get_ref().len().saturating_sub(self.position() as usize)
	}

	fn readSlice(&mut self, len: usize) -> Result<&'a [u8]> {
		if len > self.remaining() {
			return Err(Error::format(format_args!(
				"wanted {len} bytes at offset {}, only {} left",
				self.position(),
				self.remaining()
			)));
		}
		let position = self.position() as usize;
		self.set_position((position + len) as _);
		let underlyingSlice: &'a [u8] = *(self.get_ref());
		Ok(&underlyingSlice[position..position + len])
	}

	fn consumeZeros(&mut self, zerosCount: usize) -> Result<()> {
		let position = self.position();
		if self.readSlice(zerosCount)?.iter().any(|&byte| byte != 0) {
			return Err(Error::format(format_args!("expected {zerosCount} zero bytes at offset {position}")));
		}
		Ok(())
	}

	/// Reads a NUL-padded field of `width` bytes; the string ends at the first NUL.
	fn readFixedString(&mut self, width: usize) -> Result<String> {
		let field = self.readSlice(width)?;
		let len = memchr(0, field).unwrap_or(field.len());
		Ok(String::from_utf8_lossy(&field[..len]).into_owned())
	}
}

pub trait WriteExt: Write {
	fn writeFixedString(&mut self, string: &str, width: usize) -> Result<()> {
		let bytes = string.as_bytes();
		if bytes.len() > width {
			return Err(Error::encode(format_args!("{string:?} is longer than {width} bytes")));
		}
		self.write_all(bytes)?;
		self.writeZeros(width - bytes.len())
	}

	fn writeZeros(&mut self, zerosCount: usize) -> Result<()> {
		const ZEROS: [u8; 256] = [0; 256];
		let mut left = zerosCount;
		while left > 0 {
			let n = left.min(ZEROS.len());
			self.write_all(&ZEROS[..n])?;
			left -= n;
		}
		Ok(())
	}
}

impl<W: Write + ?Sized> WriteExt for W {}

pub fn toml_toStringPretty<T: ?Sized + ser::Serialize>(value: &T) -> Result<String, toml::ser::Error> {
	let mut string = String::with_capacity(128);
	value.serialize((&mut toml::ser::Serializer::pretty(&mut string)).pretty_array(false))?;
	Ok(string)
}

/// Default location of a data file the tools ship alongside their executables.
#[must_use]
pub fn besideExecutable(fileName: &str) -> PathBuf {
	env::current_exe()
		.ok()
		.and_then(|exe| exe.parent().map(Path::to_path_buf))
		.unwrap_or_default()
		.join(fileName)
}

/// Installs the `tracing` subscriber every tool logs through; `RUST_LOG` overrides `info`.
pub fn initTracing() {
	use tracing_subscriber::EnvFilter;
	tracing_subscriber::fmt()
		.with_target(false)
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.try_init()
		.ok();
}

#[cfg(test)]
mod tests {
	use {super::*, std::io::Cursor};

	#[test]
	fn fixed_string_stops_at_first_nul() {
		let cursor = &mut Cursor::new(&b"abc\0zz\0\0next"[..]);
		assert_eq!(cursor.readFixedString(8).unwrap(), "abc");
		assert_eq!(cursor.remaining(), 4);
	}

	#[test]
	fn fixed_string_round_trips_through_writer() {
		let mut buffer = Vec::new();
		buffer.writeFixedString("f_default.blo", 32).unwrap();
		assert_eq!(buffer.len(), 32);
		assert_eq!(Cursor::new(buffer.as_slice()).readFixedString(32).unwrap(), "f_default.blo");
	}

	#[test]
	fn overlong_string_is_an_encode_error() {
		let err = Vec::new().writeFixedString("0123456789abcdefX", 16).unwrap_err();
		assert!(matches!(err, Error::Encode(_)));
	}

	#[test]
	fn short_read_is_a_format_error() {
		let cursor = &mut Cursor::new(&[1_u8, 2][..]);
		assert!(matches!(cursor.readArray::<4>(), Err(Error::Format(_))));
	}

	#[test]
	fn nonzero_padding_is_rejected() {
		let cursor = &mut Cursor::new(&[0_u8, 0, 7][..]);
		assert!(cursor.consumeZeros(3).is_err());
	}
}
