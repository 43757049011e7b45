//! Attributes a level's side-car resources to the containers they were copied from.
//!
//! Each inline floor or object is hashed and looked up in the resource table. Hits become
//! remaps to the canonical location. Misses are either synthesized into two new containers
//! next to the output (`f_<level>.lvb.blo` for floors, `o_<level>.lvb.blo` for objects) or
//! left pointing at the side-car.

use {
	crate::{
		blo::{Container, ContainerBuilder},
		blo_table::{hashPayload, Location, ResourceTable, FLOOR_PREFIX, OBJECT_PREFIX, SIDE_CAR_CONTAINER_SUFFIX},
		lvl::{LevelFile, RefTable},
		Result,
	},
	core::fmt,
	std::{
		collections::{BTreeMap, HashSet},
		fs::{self, File},
		io::{self, BufWriter, Write},
		path::{Path, PathBuf},
	},
	tracing::{debug, info, warn},
};

/// Non-fatal findings; conversion carries on after each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
	/// No table entry for the resource's hash, or no such entry in the side-car.
	UnresolvedResource { table: RefTable, id: String, hash: Option<String> },
	/// The side-car container isn't there; nothing is remapped.
	MissingSideCar { path: PathBuf },
	/// Neither floor- nor object-prefixed; filed by the table that referenced it.
	UnexpectedIdPrefix { table: RefTable, id: String },
}

impl fmt::Display for Warning {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::UnresolvedResource { table, id, hash: Some(hash) } => {
				write!(f, "no known container holds {table} {id:?} (md5 {hash})")
			}
			Self::UnresolvedResource { table, id, hash: None } => {
				write!(f, "{table} {id:?} is missing from the side-car")
			}
			Self::MissingSideCar { path } => write!(f, "side-car {} not found, resources not remapped", path.display()),
			Self::UnexpectedIdPrefix { table, id } => {
				write!(f, "{table} {id:?} has neither an f nor an o prefix, filed with {table}s")
			}
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapReport {
	/// Side-car id to the location that now provides it.
	pub remaps: BTreeMap<String, Location>,
	/// Ids still only found in the side-car.
	pub unresolved: Vec<String>,
	pub synthesized: Vec<PathBuf>,
	pub warnings: Vec<Warning>,
}

impl RemapReport {
	fn warn(&mut self, warning: Warning) {
		warn!("{warning}");
		self.warnings.push(warning);
	}

	/// Points every remapped inline reference of `level` at its new location. Returns how many
	/// references changed.
	pub fn apply(&self, level: &mut LevelFile) -> usize {
		let mut applied = 0;
		for table in [RefTable::Floors, RefTable::Objects] {
			for blobRef in level.tableMut(table) {
				if let (true, Some(location)) = (blobRef.isInline(), self.remaps.get(&blobRef.id)) {
					blobRef.fileName = Some(location.fileName.clone());
					blobRef.id = location.id.clone();
					applied += 1;
				}
			}
		}
		applied
	}
}

/// `level.lvl` -> `level.lvb` beside it.
#[must_use]
pub fn sideCarPath(levelPath: &Path) -> PathBuf {
	levelPath.with_extension(crate::SIDE_CAR_EXTENSION)
}

/// Resolves every inline reference of `level` against `table`, reading payloads from the
/// side-car at `sideCar`. With `synthesizeInto`, unresolved payloads are packed into new
/// containers in that directory.
pub fn remapLevel(
	level: &LevelFile,
	sideCar: &Path,
	table: &ResourceTable,
	synthesizeInto: Option<&Path>,
) -> Result<RemapReport> {
	let mut report = RemapReport::default();
	if !level.hasInlineReferences() {
		return Ok(report);
	}
	let bytes = match fs::read(sideCar) {
		Ok(bytes) => bytes,
		Err(err) if err.kind() == io::ErrorKind::NotFound => {
			report.warn(Warning::MissingSideCar { path: sideCar.to_owned() });
			return Ok(report);
		}
		Err(err) => return Err(err.into()),
	};
	let container = Container::parse(&bytes).map_err(|err| err.within(sideCar.display()))?;

	let (mut seen, mut pending) = (HashSet::new(), Vec::new());
	for (refTable, _, blobRef) in level.inlineReferences() {
		if !seen.insert(blobRef.id.as_str()) {
			continue;
		}
		let Some(entry) = container.entry(&blobRef.id) else {
			report.warn(Warning::UnresolvedResource { table: refTable, id: blobRef.id.clone(), hash: None });
			report.unresolved.push(blobRef.id.clone());
			continue;
		};
		let payload = Container::payload(&bytes, entry)?;
		let hash = hashPayload(payload);
		if let Some(location) = table.lookup(&hash) {
			debug!("{refTable} {:?} is {},{}", blobRef.id, location.fileName, location.id);
			report.remaps.insert(blobRef.id.clone(), location.clone());
		} else {
			report.warn(Warning::UnresolvedResource { table: refTable, id: blobRef.id.clone(), hash: Some(hash) });
			match synthesizeInto {
				Some(_) => pending.push((refTable, blobRef.id.as_str(), payload)),
				None => report.unresolved.push(blobRef.id.clone()),
			}
		}
	}

	if let (Some(directory), false) = (synthesizeInto, pending.is_empty()) {
		synthesize(&mut report, &pending, sideCar, container.version, directory)?;
	}
	info!(
		remapped = report.remaps.len(),
		unresolved = report.unresolved.len(),
		synthesized = report.synthesized.len(),
		"remapped {}",
		sideCar.display()
	);
	Ok(report)
}

fn synthesize(
	report: &mut RemapReport,
	pending: &[(RefTable, &str, &[u8])],
	sideCar: &Path,
	version: u32,
	directory: &Path,
) -> Result<()> {
	let stem = sideCar.file_stem().map(|stem| stem.to_string_lossy()).unwrap_or_default();
	for (target, prefix) in [(RefTable::Floors, FLOOR_PREFIX), (RefTable::Objects, OBJECT_PREFIX)] {
		let fileName = format!("{prefix}{stem}{SIDE_CAR_CONTAINER_SUFFIX}");
		let mut builder = ContainerBuilder::new(version)?;
		for &(refTable, id, payload) in pending {
			let partitioned = idPartition(id).unwrap_or_else(|| {
				if target == refTable {
					report.warn(Warning::UnexpectedIdPrefix { table: refTable, id: id.to_owned() });
				}
				refTable
			});
			if partitioned == target {
				builder.push(id, payload)?;
				report.remaps.insert(id.to_owned(), Location { fileName: fileName.clone(), id: id.to_owned() });
			}
		}
		if builder.is_empty() {
			continue;
		}
		let path = directory.join(&fileName);
		let writer = &mut BufWriter::new(File::create(&path)?);
		builder.writeTo(writer)?;
		writer.flush()?;
		info!(entries = builder.len(), "synthesized {}", path.display());
		report.synthesized.push(path);
	}
	Ok(())
}

fn idPartition(id: &str) -> Option<RefTable> {
	match id.as_bytes().first().map(u8::to_ascii_lowercase) {
		Some(b'f') => Some(RefTable::Floors),
		Some(b'o') => Some(RefTable::Objects),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use {
		super::*,
		crate::lvl::{tests::sampleLevel, BlobRef},
		tempfile::TempDir,
	};

	fn sideCarWith(directory: &Path, entries: &[(&str, &str)]) -> PathBuf {
		let mut builder = ContainerBuilder::new(crate::blo::LONG_NAMES_VERSION).unwrap();
		for &(id, payload) in entries {
			builder.push(id, payload.as_bytes()).unwrap();
		}
		let path = directory.join("level.lvb");
		fs::write(&path, builder.toBytes().unwrap()).unwrap();
		path
	}

	#[test]
	fn known_hash_is_remapped() {
		let directory = TempDir::new().unwrap();
		let sideCar = sideCarWith(directory.path(), &[("f_sand.cfs", "sand"), ("o_rock.cfs", "rock")]);
		let mut table = ResourceTable::default();
		table.auto.insert(hashPayload(b"sand"), vec![Location::new("f_Desert.blo", "Sand.cfs")]);

		let report = remapLevel(&sampleLevel(), &sideCar, &table, None).unwrap();
		assert_eq!(report.remaps["f_sand.cfs"], Location::new("f_desert.blo", "sand.cfs"));
		assert_eq!(report.unresolved, ["o_rock.cfs"]);
		assert!(report.synthesized.is_empty());

		let mut level = sampleLevel();
		assert_eq!(report.apply(&mut level), 1);
		assert_eq!(level.floors[1], BlobRef::external("f_desert.blo", "sand.cfs"));
		assert!(level.objects[0].isInline());
	}

	#[test]
	fn misses_are_synthesized_by_prefix() {
		let directory = TempDir::new().unwrap();
		let sideCar = sideCarWith(directory.path(), &[("f_sand.cfs", "sand"), ("o_rock.cfs", "rock")]);
		let output = TempDir::new().unwrap();

		let report = remapLevel(&sampleLevel(), &sideCar, &ResourceTable::default(), Some(output.path())).unwrap();
		assert!(report.unresolved.is_empty());
		assert_eq!(report.remaps["o_rock.cfs"], Location { fileName: "o_level.lvb.blo".into(), id: "o_rock.cfs".into() });

		let objects = fs::read(output.path().join("o_level.lvb.blo")).unwrap();
		let container = Container::parse(&objects).unwrap();
		assert_eq!(Container::payload(&objects, container.entry("o_rock.cfs").unwrap()).unwrap(), b"rock");
		assert!(output.path().join("f_level.lvb.blo").exists());
		assert_eq!(report.synthesized.len(), 2);
	}

	#[test]
	fn unprefixed_id_follows_its_table() {
		let directory = TempDir::new().unwrap();
		let sideCar = sideCarWith(directory.path(), &[("rock.cfs", "rock")]);
		let output = TempDir::new().unwrap();
		let mut level = sampleLevel();
		level.floors.truncate(1);
		level.objects[0] = BlobRef::inline("rock.cfs");

		let report = remapLevel(&level, &sideCar, &ResourceTable::default(), Some(output.path())).unwrap();
		assert_eq!(report.remaps["rock.cfs"].fileName, "o_level.lvb.blo");
		assert_eq!(
			report.warnings.last(),
			Some(&Warning::UnexpectedIdPrefix { table: RefTable::Objects, id: "rock.cfs".into() })
		);
		assert!(!output.path().join("f_level.lvb.blo").exists());
	}

	#[test]
	fn missing_side_car_only_warns() {
		let directory = TempDir::new().unwrap();
		let report =
			remapLevel(&sampleLevel(), &directory.path().join("gone.lvb"), &ResourceTable::default(), None).unwrap();
		assert!(report.remaps.is_empty());
		assert!(matches!(report.warnings[..], [Warning::MissingSideCar { .. }]));
	}

	#[test]
	fn entry_missing_from_side_car_stays_unresolved() {
		let directory = TempDir::new().unwrap();
		let sideCar = sideCarWith(directory.path(), &[("f_sand.cfs", "sand")]);
		let report = remapLevel(&sampleLevel(), &sideCar, &ResourceTable::default(), None).unwrap();
		assert_eq!(report.unresolved, ["f_sand.cfs", "o_rock.cfs"]);
	}

	#[test]
	fn side_car_path_swaps_the_extension() {
		assert_eq!(sideCarPath(Path::new("maps/arena.lvl")), Path::new("maps/arena.lvb"));
	}
}
