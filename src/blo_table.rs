//! Content-addressed index of every resource in a directory of containers.
//!
//! Two layers keyed by lowercase MD5 hex: `auto`, regenerated by each scan, and `custom`,
//! curated by hand, carried over between scans and always consulted first. A custom hash
//! hides the auto entry for the same hash entirely.

use {
	crate::{
		blo::Container, toml_toStringPretty, Result, CONTAINER_EXTENSION, SIDE_CAR_EXTENSION,
	},
	const_format::concatcp,
	serde::{Deserialize, Serialize},
	std::{collections::BTreeMap, fs, path::Path},
	tracing::{debug, info, warn},
};

pub const FLOOR_PREFIX: &str = "f_";
pub const OBJECT_PREFIX: &str = "o_";
/// Containers synthesized from side-cars; never scanned.
pub const SIDE_CAR_CONTAINER_SUFFIX: &str = concatcp!(".", SIDE_CAR_EXTENSION, ".", CONTAINER_EXTENSION);
pub const DEFAULT_FILE_NAME: &str = "blotable.toml";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Location {
	pub fileName: String,
	pub id: String,
}

impl Location {
	#[must_use]
	pub fn new(fileName: &str, id: &str) -> Self {
		Self { fileName: fileName.to_lowercase(), id: id.to_lowercase() }
	}
}

type Layer = BTreeMap<String, Vec<Location>>;

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceTable {
	#[serde(default)]
	pub auto: Layer,

	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub custom: Layer,
}

#[must_use]
pub fn hashPayload(payload: &[u8]) -> String {
	format!("{:x}", md5::compute(payload))
}

/// `f_*.blo` and `o_*.blo`, minus the ones synthesized from side-cars.
#[must_use]
pub fn isIndexedContainer(fileName: &str) -> bool {
	let fileName = fileName.to_lowercase();
	(fileName.starts_with(FLOOR_PREFIX) || fileName.starts_with(OBJECT_PREFIX))
		&& fileName.ends_with(concatcp!(".", CONTAINER_EXTENSION))
		&& !fileName.ends_with(SIDE_CAR_CONTAINER_SUFFIX)
}

impl ResourceTable {
	/// Hashes every entry of every indexed container directly inside `directory`, in file name
	/// order. All locations sharing a hash are kept, in scan order.
	pub fn scanDirectory(directory: &Path) -> Result<Self> {
		let mut fileNames = Vec::new();
		for dirEntry in fs::read_dir(directory)? {
			let dirEntry = dirEntry?;
			if !dirEntry.file_type()?.is_file() {
				continue;
			}
			match dirEntry.file_name().into_string() {
				Ok(fileName) if isIndexedContainer(&fileName) => fileNames.push(fileName),
				_ => {}
			}
		}
		fileNames.sort_unstable();

		let mut table = Self::default();
		for fileName in &fileNames {
			info!("processing {fileName:?}");
			let bytes = fs::read(directory.join(fileName))?;
			let entryCount = match table.addContainer(fileName, &bytes) {
				Ok(entryCount) => entryCount,
				Err(err) => {
					warn!("skipping {fileName:?}: {err}");
					continue;
				}
			};
			debug!(entries = entryCount, "hashed {fileName:?}");
		}
		Ok(table)
	}

	/// Adds every entry of the container `bytes` to the auto layer.
	pub fn addContainer(&mut self, fileName: &str, bytes: &[u8]) -> Result<usize> {
		let container = Container::parse(bytes)?;
		let mut hashed = Vec::with_capacity(container.entries.len());
		for payload in container.payloads(bytes) {
			let (entry, payload) = payload?;
			hashed.push((hashPayload(payload), Location::new(fileName, &entry.name)));
		}
		let entryCount = hashed.len();
		for (hash, location) in hashed {
			self.auto.entry(hash).or_default().push(location);
		}
		Ok(entryCount)
	}

	pub fn load(path: &Path) -> Result<Self> {
		let parsed: Self = toml::from_str(&fs::read_to_string(path)?)?;
		// hashes are compared lowercase; of several spellings of one hash, the one that
		// sorts first (uppercase before lowercase) wins
		let normalize = |layer: Layer| {
			let mut normalized = Layer::new();
			for (hash, locations) in layer {
				normalized.entry(hash.to_lowercase()).or_insert(locations);
			}
			normalized
		};
		let table = Self { auto: normalize(parsed.auto), custom: normalize(parsed.custom) };
		debug!(auto = table.auto.len(), custom = table.custom.len(), "loaded {}", path.display());
		Ok(table)
	}

	pub fn save(&self, path: &Path) -> Result<()> {
		fs::write(path, toml_toStringPretty(self)?)?;
		Ok(())
	}

	/// Keeps this scan's auto layer and takes the custom layer of `previous`.
	#[must_use]
	pub fn withCustomFrom(self, previous: &Self) -> Self {
		Self { auto: self.auto, custom: previous.custom.clone() }
	}

	/// Canonical location of `hash`: the first custom location if there is one, else the
	/// first auto location.
	#[must_use]
	pub fn lookup(&self, hash: &str) -> Option<&Location> {
		let hash = hash.to_lowercase();
		match self.custom.get(&hash) {
			Some(locations) => locations.first(),
			None => self.auto.get(&hash).and_then(|locations| locations.first()),
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.auto.len() + self.custom.keys().filter(|&hash| !self.auto.contains_key(hash)).count()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.auto.is_empty() && self.custom.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use {super::*, crate::blo::ContainerBuilder};

	fn container(entries: &[(&str, &str)]) -> Vec<u8> {
		let mut builder = ContainerBuilder::new(crate::blo::LONG_NAMES_VERSION).unwrap();
		for &(name, payload) in entries {
			builder.push(name, payload.as_bytes()).unwrap();
		}
		builder.toBytes().unwrap()
	}

	#[test]
	fn hash_is_lowercase_md5_hex() {
		assert_eq!(hashPayload(b""), "d41d8cd98f00b204e9800998ecf8427e");
		assert_eq!(hashPayload(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
	}

	#[test]
	fn only_prefixed_containers_are_indexed() {
		assert!(isIndexedContainer("f_default.blo"));
		assert!(isIndexedContainer("O_Rocks.BLO"));
		assert!(!isIndexedContainer("f_level.lvb.blo"));
		assert!(!isIndexedContainer("sounds.blo"));
		assert!(!isIndexedContainer("f_default.cfs"));
	}

	#[test]
	fn duplicates_are_all_kept_in_scan_order() {
		let mut table = ResourceTable::default();
		table.addContainer("f_A.blo", &container(&[("Grass.cfs", "g"), ("copy.cfs", "g")])).unwrap();
		table.addContainer("f_b.blo", &container(&[("grass2.cfs", "g")])).unwrap();
		let locations = &table.auto[&hashPayload(b"g")];
		assert_eq!(
			locations,
			&[Location::new("f_a.blo", "grass.cfs"), Location::new("f_a.blo", "copy.cfs"), Location::new("f_b.blo", "grass2.cfs")]
		);
		assert_eq!(table.lookup(&hashPayload(b"g")), Some(&locations[0]));
	}

	#[test]
	fn custom_layer_wins() {
		let hash = hashPayload(b"rock");
		let mut table = ResourceTable::default();
		table.addContainer("o_auto.blo", &container(&[("rock.cfs", "rock")])).unwrap();
		table.custom.insert(hash.clone(), vec![Location::new("o_custom.blo", "boulder.cfs")]);
		assert_eq!(table.lookup(&hash.to_uppercase()).unwrap().fileName, "o_custom.blo");
		assert_eq!(table.len(), 1);
	}

	#[test]
	fn spellings_of_one_hash_collapse_onto_the_lowercase_key() {
		let directory = tempfile::TempDir::new().unwrap();
		let path = directory.path().join(DEFAULT_FILE_NAME);
		fs::write(
			&path,
			r#"
				[[auto.abc123]]
				fileName = "o_lower.blo"
				id = "lower.cfs"

				[[auto.ABC123]]
				fileName = "o_upper.blo"
				id = "upper.cfs"
			"#,
		)
		.unwrap();
		let table = ResourceTable::load(&path).unwrap();
		assert_eq!(table.auto.len(), 1);
		assert_eq!(table.lookup("abc123").unwrap().fileName, "o_upper.blo");
	}

	#[test]
	fn scan_skips_unindexed_and_corrupt_containers() {
		let directory = tempfile::TempDir::new().unwrap();
		for (fileName, bytes) in [
			("o_a.blo", container(&[("rock.cfs", "rock")])),
			("f_bad.blo", vec![9, 0, 0, 0]),
			("f_x.lvb.blo", container(&[("f_mud.cfs", "mud")])),
			("sounds.blo", container(&[("boom.wav", "boom")])),
		] {
			fs::write(directory.path().join(fileName), bytes).unwrap();
		}
		fs::create_dir(directory.path().join("o_dir.blo")).unwrap();

		let table = ResourceTable::scanDirectory(directory.path()).unwrap();
		assert_eq!(table.auto.len(), 1);
		assert_eq!(table.auto[&hashPayload(b"rock")], [Location::new("o_a.blo", "rock.cfs")]);
		assert!(table.custom.is_empty());
	}

	#[test]
	fn missing_hash_has_no_location() {
		assert_eq!(ResourceTable::default().lookup(&hashPayload(b"nothing")), None);
	}

	#[test]
	fn suffix_is_spelled_out() {
		assert_eq!(SIDE_CAR_CONTAINER_SUFFIX, ".lvb.blo");
	}
}
