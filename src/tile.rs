//! Packed 3-byte map cell.
//!
//! ```text
//!     A: r ttttttt    r = reserved, t = terrain lookup
//!     B: ........     opaque to the tools, passed through untouched
//!     C: vvv ppppp    v = vision, p = physics
//! ```

pub const TERRAIN_LOOKUP_MASK: u8 = 0x7F;
pub const PHYSICS_MASK: u8 = 0x1F;
pub const VISION_OFFSET: u32 = 5;
pub const VISION_MAX: u8 = 0x07;

pub const SIZE: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Tile {
	pub a: u8,
	pub b: u8,
	pub c: u8,
}

impl Tile {
	#[must_use]
	pub const fn new(a: u8, b: u8, c: u8) -> Self {
		Self { a, b, c }
	}

	#[must_use]
	pub const fn fromBytes([a, b, c]: [u8; SIZE]) -> Self {
		Self { a, b, c }
	}

	#[must_use]
	pub const fn toBytes(self) -> [u8; SIZE] {
		[self.a, self.b, self.c]
	}

	#[must_use]
	pub const fn physics(self) -> u8 {
		self.c & PHYSICS_MASK
	}

	pub fn setPhysics(&mut self, physics: u8) {
		self.c = self.c & !PHYSICS_MASK | physics & PHYSICS_MASK;
	}

	#[must_use]
	pub const fn vision(self) -> u8 {
		self.c >> VISION_OFFSET
	}

	pub fn setVision(&mut self, vision: u8) {
		self.c = self.c & PHYSICS_MASK | (vision & VISION_MAX) << VISION_OFFSET;
	}

	#[must_use]
	pub const fn terrainLookup(self) -> u8 {
		self.a & TERRAIN_LOOKUP_MASK
	}

	pub fn setTerrainLookup(&mut self, terrainLookup: u8) {
		self.a = self.a & !TERRAIN_LOOKUP_MASK | terrainLookup & TERRAIN_LOOKUP_MASK;
	}

	#[must_use]
	pub const fn isBlocked(self) -> bool {
		self.physics() != 0
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fields_are_read_from_their_masks() {
		let tile = Tile::new(0b1000_0101, 0x42, 0b0110_0011);
		assert_eq!(tile.terrainLookup(), 5);
		assert_eq!(tile.physics(), 3);
		assert_eq!(tile.vision(), 3);
		assert!(tile.isBlocked());
		assert!(!Tile::default().isBlocked());
	}

	#[test]
	fn setters_keep_neighbouring_bits() {
		let mut tile = Tile::new(0x80, 0xAA, 0xFF);
		tile.setPhysics(0);
		assert_eq!(tile.c, 0xE0);
		tile.setVision(1);
		assert_eq!(tile.c, 0x20);
		tile.setPhysics(0xFF);
		assert_eq!(tile.c, 0x3F);
		tile.setTerrainLookup(0xFF);
		assert_eq!(tile.a, 0xFF);
		tile.setTerrainLookup(0);
		assert_eq!(tile.a, 0x80);
		assert_eq!(tile.b, 0xAA);
	}

	#[test]
	fn oversized_vision_is_truncated_to_three_bits() {
		let mut tile = Tile::new(0, 0, 0x11);
		tile.setVision(0b1111);
		assert_eq!(tile.vision(), 0b111);
		assert_eq!(tile.physics(), 0x11);
	}

	#[test]
	fn byte_triple_round_trip() {
		let bytes = [1, 2, 3];
		assert_eq!(Tile::fromBytes(bytes).toBytes(), bytes);
	}
}
