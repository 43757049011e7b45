#![allow(non_snake_case)]

use {
	infantry_assets::{
		blo::{Container, ContainerBuilder, LONG_NAMES_VERSION},
		blo_table::{hashPayload, Location, ResourceTable},
		lvl::{BlobRef, EntityPlacement, Header, LevelFile},
		map::MapFile,
		remap::{remapLevel, sideCarPath},
		tile::Tile,
	},
	std::fs,
	tempfile::TempDir,
};

fn level() -> LevelFile {
	LevelFile {
		header: Header { width: 2, height: 2, ..Header::default() },
		terrainIds: vec![0, 1],
		floors: vec![BlobRef::external("f_default.blo", "default.cfs"), BlobRef::inline("f_mud.cfs")],
		objects: vec![BlobRef::inline("o_crate.cfs"), BlobRef::inline("o_barrel.cfs")],
		entities: vec![EntityPlacement { x: 0, y: 16, objectId: 0 }, EntityPlacement { x: 16, y: 0, objectId: 1 }],
		tiles: vec![Tile::new(1, 0, 0), Tile::new(2, 1, 0x21), Tile::new(0, 0, 0), Tile::new(3, 0, 0)],
	}
}

fn container(entries: &[(&str, &str)]) -> Vec<u8> {
	let mut builder = ContainerBuilder::new(LONG_NAMES_VERSION).unwrap();
	for &(name, payload) in entries {
		builder.push(name, payload.as_bytes()).unwrap();
	}
	builder.toBytes().unwrap()
}

#[test]
fn single_entry_container_layout() {
	let bytes = container(&[("a", "\x01\x02\x03\x04")]);
	let parsed = Container::parse(&bytes).unwrap();
	assert_eq!(parsed.entries.len(), 1);
	assert_eq!(&bytes[bytes.len() - 4..], [1, 2, 3, 4]);
	assert_eq!(Container::payload(&bytes, &parsed.entries[0]).unwrap(), [1, 2, 3, 4]);
}

#[test]
fn level_converts_with_known_and_synthesized_resources() {
	let workspace = TempDir::new().unwrap();
	let levelPath = workspace.path().join("outpost.lvl");
	fs::write(&levelPath, level().serialize().unwrap()).unwrap();
	fs::write(
		sideCarPath(&levelPath),
		container(&[("f_mud.cfs", "mud"), ("o_crate.cfs", "crate"), ("o_barrel.cfs", "barrel")]),
	)
	.unwrap();

	let tablePath = workspace.path().join("blotable.toml");
	let mut table = ResourceTable::default();
	table.addContainer("o_props.blo", &container(&[("crate.cfs", "crate")])).unwrap();
	table.save(&tablePath).unwrap();
	let table = ResourceTable::load(&tablePath).unwrap();

	let mut level = LevelFile::parse(&fs::read(&levelPath).unwrap()).unwrap();
	let report = remapLevel(&level, &sideCarPath(&levelPath), &table, Some(workspace.path())).unwrap();
	assert_eq!(report.remaps["o_crate.cfs"], Location::new("o_props.blo", "crate.cfs"));
	assert_eq!(report.apply(&mut level), 3);
	assert!(!level.hasInlineReferences());

	let map = MapFile::fromLevel(&level, Some("outpost.lvb")).unwrap();
	let map = MapFile::parse(&map.toBytes().unwrap()).unwrap();
	assert_eq!(map.floors, ["f_default.blo,default.cfs", "f_outpost.lvb.blo,f_mud.cfs"]);
	let references: Vec<_> = map.entities.iter().map(|entity| entity.reference.as_str()).collect();
	assert_eq!(references, ["o_props.blo,crate.cfs", "o_outpost.lvb.blo,o_barrel.cfs"]);
	assert_eq!(map.tiles[1].terrainLookup(), 2);
	assert_eq!(map.tiles[1].physics(), 1);

	let synthesized = fs::read(workspace.path().join("o_outpost.lvb.blo")).unwrap();
	let mut table = ResourceTable::default();
	assert_eq!(table.addContainer("o_outpost.lvb.blo", &synthesized).unwrap(), 1);
	assert_eq!(table.lookup(&hashPayload(b"barrel")).unwrap().id, "o_barrel.cfs");
}

#[test]
fn unmapped_side_car_references_can_be_stripped() {
	let kept = MapFile::fromLevel(&level(), Some("outpost.lvb")).unwrap();
	assert_eq!(kept.entities[0].reference, "outpost.lvb,o_crate.cfs");
	let stripped = MapFile::fromLevel(&level(), None).unwrap();
	assert_eq!(stripped.floors, ["f_default.blo,default.cfs", ""]);
	assert!(stripped.entities.iter().all(|entity| entity.reference.is_empty()));
}

#[test]
fn curated_location_survives_a_rescan() {
	let workspace = TempDir::new().unwrap();
	fs::write(workspace.path().join("o_rocks.blo"), container(&[("rock.cfs", "rock")])).unwrap();
	let hash = hashPayload(b"rock");

	let mut curated = ResourceTable::scanDirectory(workspace.path()).unwrap();
	curated.custom.insert(hash.to_uppercase(), vec![Location::new("o_boulders.blo", "big.cfs")]);
	let tablePath = workspace.path().join("blotable.toml");
	curated.save(&tablePath).unwrap();

	let rescanned =
		ResourceTable::scanDirectory(workspace.path()).unwrap().withCustomFrom(&ResourceTable::load(&tablePath).unwrap());
	assert_eq!(rescanned.lookup(&hash), Some(&Location::new("o_boulders.blo", "big.cfs")));
	assert_eq!(rescanned.auto[&hash], [Location::new("o_rocks.blo", "rock.cfs")]);
}
