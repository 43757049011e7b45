//! Sprite sheets: a palette header followed by `columnCount * rowCount` frames, each stored
//! with at most one geometric shortcut and row-wise run-length coding.

use {
	crate::{Error, ReadExt, Result, FULLY_TRANSPARENT, PALETTE_ENTRIES, RGBA_SIZE, RGB_SIZE},
	array_macro::array,
	byteorder::{ReadBytesExt, LE},
	core::fmt,
	std::io,
	tracing::debug,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressionFlags(u32);

impl CompressionFlags {
	pub const DUPE_ROWS_VERTICALLY: Self = Self(1);
	pub const DUPE_ROWS_HORIZONTALLY: Self = Self(2);
	pub const COLUMNS_ARE_HALF_ROTATION: Self = Self(4);
	pub const COLUMNS_ARE_QUARTER_ROTATION: Self = Self(8);
	pub const NO_PIXELS: Self = Self(16);
	pub const ROWS_ARE_HALF_ROTATION: Self = Self(32);
	pub const ROWS_ARE_QUARTER_ROTATION: Self = Self(64);
	pub const NO_COMPRESSION: Self = Self(128);

	const KNOWN: u32 = 0xFF;
	const GEOMETRY: [(Self, Geometry); 6] = [
		(Self::DUPE_ROWS_VERTICALLY, Geometry::DupeRowsVertically),
		(Self::DUPE_ROWS_HORIZONTALLY, Geometry::DupeRowsHorizontally),
		(Self::COLUMNS_ARE_HALF_ROTATION, Geometry::ColumnsAreHalfRotation),
		(Self::COLUMNS_ARE_QUARTER_ROTATION, Geometry::QuarterRotation),
		(Self::ROWS_ARE_HALF_ROTATION, Geometry::RowsAreHalfRotation),
		(Self::ROWS_ARE_QUARTER_ROTATION, Geometry::QuarterRotation),
	];

	/// Rejects unknown bits and combinations of more than one geometric shortcut.
	pub fn new(bits: u32) -> Result<Self> {
		if bits & !Self::KNOWN != 0 {
			return Err(Error::format(format_args!("unknown compression flags {bits:#x}")));
		}
		let flags = Self(bits);
		let geometryCount = Self::GEOMETRY.iter().filter(|&&(flag, _)| flags.contains(flag)).count();
		if geometryCount > 1 {
			return Err(Error::format(format_args!("{flags} combines {geometryCount} geometric shortcuts")));
		}
		Ok(flags)
	}

	#[must_use]
	pub const fn bits(self) -> u32 {
		self.0
	}

	#[must_use]
	pub const fn contains(self, other: Self) -> bool {
		self.0 & other.0 == other.0
	}

	#[must_use]
	pub fn geometry(self) -> Geometry {
		Self::GEOMETRY
			.iter()
			.find(|&&(flag, _)| self.contains(flag))
			.map_or(Geometry::Full, |&(_, geometry)| geometry)
	}
}

impl fmt::Display for CompressionFlags {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:#010b}", self.0)
	}
}

/// Which part of a frame is actually stored, and how the rest is rebuilt from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Geometry {
	Full,
	/// Bottom half mirrors the top half.
	DupeRowsVertically,
	/// Right half mirrors the left half.
	DupeRowsHorizontally,
	/// Left half stored, right half is it turned by 180°.
	ColumnsAreHalfRotation,
	/// Top half stored, bottom half is it turned by 180°.
	RowsAreHalfRotation,
	/// Top-left quadrant stored, the others are its 90° turns about the centre.
	QuarterRotation,
}

const fn half(n: usize) -> usize {
	(n + 1) / 2
}

impl Geometry {
	/// Dimensions of the stored region of a `width x height` frame.
	pub fn storedSize(self, width: usize, height: usize) -> Result<(usize, usize)> {
		Ok(match self {
			Self::Full => (width, height),
			Self::DupeRowsVertically | Self::RowsAreHalfRotation => (width, half(height)),
			Self::DupeRowsHorizontally | Self::ColumnsAreHalfRotation => (half(width), height),
			Self::QuarterRotation => {
				if width != height {
					return Err(Error::format(format_args!(
						"quarter rotation needs a square frame, got {width}x{height}"
					)));
				}
				(half(width), half(height))
			}
		})
	}

	/// Rebuilds the full frame from its stored `storedWidth`-wide region.
	#[must_use]
	pub fn expand(self, stored: &[u8], storedWidth: usize, width: usize, height: usize) -> Vec<u8> {
		let storedAt = |x: usize, y: usize| stored[y * storedWidth + x];
		let mut pixels = vec![FULLY_TRANSPARENT; width * height];
		match self {
			Self::Full => pixels.copy_from_slice(stored),
			Self::QuarterRotation => {
				let (n, m) = (width, half(width));
				for pass in [true, false] {
					for y in 0..m {
						for x in 0..m {
							let value = storedAt(x, y);
							if pass {
								for (rx, ry) in [(n - 1 - y, x), (n - 1 - x, n - 1 - y), (y, n - 1 - x)] {
									pixels[ry * n + rx] = value;
								}
							} else {
								pixels[y * n + x] = value;
							}
						}
					}
				}
			}
			_ => {
				let storedHeight = stored.len().checked_div(storedWidth).unwrap_or(0);
				for y in 0..height {
					for x in 0..width {
						let (sx, sy) = if x < storedWidth && y < storedHeight {
							(x, y)
						} else {
							match self {
								Self::DupeRowsVertically => (x, height - 1 - y),
								Self::DupeRowsHorizontally => (width - 1 - x, y),
								_ => (width - 1 - x, height - 1 - y),
							}
						};
						pixels[y * width + x] = storedAt(sx, sy);
					}
				}
			}
		}
		pixels
	}
}

/*
	Row RLE:

	1st byte is pixels to skip, 2nd is the number of "solid" pixels, followed by the palette indices.
	(0, 0) ends the current row. Only the last row may go unterminated.
*/
fn decodeRows(data: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
	if height > data.len() / 2 + 1 {
		return Err(Error::format(format_args!("{} bytes of row data can't end {height} rows", data.len())));
	}
	let mut pixels = vec![FULLY_TRANSPARENT; width * height];
	let (mut i, mut x, mut y) = (0, 0, 0);
	while i < data.len() {
		let [skip, solid] = match data.get(i..i + 2) {
			Some(&[skip, solid]) => [usize::from(skip), usize::from(solid)],
			_ => return Err(Error::format(format_args!("row {y}: dangling run byte"))),
		};
		i += 2;
		if skip == 0 && solid == 0 {
			y += 1;
			x = 0;
			if y > height {
				return Err(Error::format(format_args!("row data past the last of {height} rows")));
			}
			continue;
		}
		if y >= height || x + skip + solid > width {
			return Err(Error::format(format_args!(
				"row {y}: run of {skip}+{solid} at column {x} overflows a {width}x{height} region"
			)));
		}
		x += skip;
		let run = data
			.get(i..i + solid)
			.ok_or_else(|| Error::format(format_args!("row {y}: {solid} solid pixels cut short")))?;
		pixels[y * width + x..][..solid].copy_from_slice(run);
		(i, x) = (i + solid, x + solid);
	}
	Ok(pixels)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteFrame {
	pub x: i16,
	pub y: i16,
	pub width: u16,
	pub height: u16,
	/// `width * height` palette indices, or empty when the frame has nothing to draw.
	pub pixels: Vec<u8>,
}

impl SpriteFrame {
	#[must_use]
	pub fn isEmpty(&self) -> bool {
		self.pixels.is_empty()
	}

	fn decode(cursor: &mut io::Cursor<&[u8]>, flags: CompressionFlags) -> Result<Self> {
		let (x, y) = (cursor.read_i16::<LE>()?, cursor.read_i16::<LE>()?);
		let (width, height) = (cursor.read_u16::<LE>()?, cursor.read_u16::<LE>()?);
		let data = {
			let dataSize = cursor.read_u32::<LE>()?;
			cursor.readSlice(dataSize as _)?
		};
		let pixels = if width == 0 || height == 0 || flags.contains(CompressionFlags::NO_PIXELS) {
			Vec::new()
		} else {
			let (width, height) = (usize::from(width), usize::from(height));
			let geometry = flags.geometry();
			let (storedWidth, storedHeight) = geometry.storedSize(width, height)?;
			let stored = if flags.contains(CompressionFlags::NO_COMPRESSION) {
				if data.len() != storedWidth * storedHeight {
					return Err(Error::format(format_args!(
						"{} raw bytes for a {storedWidth}x{storedHeight} stored region",
						data.len()
					)));
				}
				data.to_vec()
			} else {
				decodeRows(data, storedWidth, storedHeight)?
			};
			geometry.expand(&stored, storedWidth, width, height)
		};
		Ok(Self { x, y, width, height, pixels })
	}
}

/// Palette index `i` as RGBA. Index 0 is transparent; the top `shadowCount` indices and the
/// `lightCount` below them become translucent black and white ramps when `fixSpecialColors`.
#[must_use]
pub fn rgbaPalette(
	colors: &[[u8; RGB_SIZE]; PALETTE_ENTRIES],
	shadowCount: usize,
	lightCount: usize,
	fixSpecialColors: bool,
) -> [[u8; RGBA_SIZE]; PALETTE_ENTRIES] {
	const OPAQUE: u8 = u8::MAX;
	let ramp = |rank: usize, step: usize| u8::try_from(64 + step * (rank + 1)).unwrap_or(OPAQUE);
	let shadowStart = PALETTE_ENTRIES.saturating_sub(shadowCount);
	let lightStart = shadowStart.saturating_sub(lightCount);
	array![i => {
		let [r, g, b] = colors[i];
		if i == 0 {
			[r, g, b, FULLY_TRANSPARENT]
		} else if !fixSpecialColors {
			[r, g, b, OPAQUE]
		} else if i >= shadowStart {
			[0, 0, 0, ramp(i - shadowStart, 16)]
		} else if i >= lightStart {
			[0xFF, 0xFF, 0xFF, ramp(i - lightStart, 4)]
		} else {
			[r, g, b, OPAQUE]
		}
	}; PALETTE_ENTRIES]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteSheet {
	pub width: u16,
	pub height: u16,
	pub columnCount: u16,
	pub rowCount: u16,
	pub shadowCount: u16,
	pub lightCount: u16,
	pub compressionFlags: CompressionFlags,
	pub paletteColors: [[u8; RGB_SIZE]; PALETTE_ENTRIES],
	/// `paletteColors` with the alpha rule applied.
	pub palette: [[u8; RGBA_SIZE]; PALETTE_ENTRIES],
	pub frames: Vec<SpriteFrame>,
}

impl SpriteSheet {
	pub fn decode(bytes: &[u8], fixSpecialColors: bool) -> Result<Self> {
		let cursor = &mut io::Cursor::new(bytes);
		let [width, height, columnCount, rowCount, shadowCount, lightCount] = {
			let mut fields = [0; 6];
			cursor.read_u16_into::<LE>(&mut fields)?;
			fields
		};
		if usize::from(shadowCount) + usize::from(lightCount) > PALETTE_ENTRIES {
			return Err(Error::format(format_args!(
				"{shadowCount} shadow and {lightCount} light colours don't fit the palette"
			)));
		}
		let compressionFlags = CompressionFlags::new(cursor.read_u32::<LE>()?)?;
		let mut paletteColors = [[0; RGB_SIZE]; PALETTE_ENTRIES];
		for color in &mut paletteColors {
			*color = cursor.readArray()?;
		}
		let frameCount = usize::from(columnCount) * usize::from(rowCount);
		let mut frames = Vec::with_capacity(frameCount);
		for i in 0..frameCount {
			frames.push(SpriteFrame::decode(cursor, compressionFlags).map_err(|err| err.within(format_args!("frame #{i}")))?);
		}
		debug!(width, height, columnCount, rowCount, flags = %compressionFlags, "decoded sprite sheet");
		Ok(Self {
			width,
			height,
			columnCount,
			rowCount,
			shadowCount,
			lightCount,
			compressionFlags,
			palette: rgbaPalette(&paletteColors, shadowCount.into(), lightCount.into(), fixSpecialColors),
			paletteColors,
			frames,
		})
	}

	/// Lays every non-empty frame out in its grid cell, row-major, offset by the frame's `(x, y)`.
	pub fn compose(&self) -> Result<IndexedImage> {
		let (cellWidth, cellHeight) = (usize::from(self.width), usize::from(self.height));
		let columnCount = usize::from(self.columnCount);
		let (width, height) = (cellWidth * columnCount, cellHeight * usize::from(self.rowCount));
		let pixelCount = width
			.checked_mul(height)
			.ok_or_else(|| Error::format(format_args!("a {width}x{height} sheet is too large")))?;
		let mut pixels = vec![FULLY_TRANSPARENT; pixelCount];
		for (i, frame) in self.frames.iter().enumerate() {
			if frame.isEmpty() {
				continue;
			}
			let left = (i % columnCount * cellWidth) as isize + isize::from(frame.x);
			let top = (i / columnCount * cellHeight) as isize + isize::from(frame.y);
			let (frameWidth, frameHeight) = (usize::from(frame.width), usize::from(frame.height));
			if left < 0 || top < 0 || left as usize + frameWidth > width || top as usize + frameHeight > height {
				return Err(Error::format(format_args!(
					"frame #{i} ({frameWidth}x{frameHeight} at {left},{top}) falls outside the {width}x{height} sheet"
				)));
			}
			let (left, top) = (left as usize, top as usize);
			for (row, line) in frame.pixels.chunks_exact(frameWidth).enumerate() {
				pixels[(top + row) * width + left..][..frameWidth].copy_from_slice(line);
			}
		}
		Ok(IndexedImage { width, height, pixels, palette: self.palette })
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedImage {
	pub width: usize,
	pub height: usize,
	pub pixels: Vec<u8>,
	pub palette: [[u8; RGBA_SIZE]; PALETTE_ENTRIES],
}

impl IndexedImage {
	/// Palette split the way PNG wants it: `PLTE` triples and `tRNS` alphas.
	#[must_use]
	pub fn pngPalette(&self) -> (Vec<u8>, Vec<u8>) {
		let mut rgb = Vec::with_capacity(PALETTE_ENTRIES * RGB_SIZE);
		let mut alpha = Vec::with_capacity(PALETTE_ENTRIES);
		for &[r, g, b, a] in &self.palette {
			rgb.extend_from_slice(&[r, g, b]);
			alpha.push(a);
		}
		(rgb, alpha)
	}
}
