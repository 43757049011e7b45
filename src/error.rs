use {
	core::fmt,
	std::{error, io},
};

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug)]
pub enum Error {
	Io(io::Error),

	/// Malformed or truncated binary input. Fatal for the file being converted.
	Format(String),

	VersionMismatch(VersionMismatchError),

	/// A value that can't be represented in the output format.
	Encode(String),

	TomlDe(toml::de::Error),
	TomlSer(toml::ser::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionMismatchError {
	pub format: &'static str,
	pub found: u32,
}

impl Error {
	pub fn format(what: impl fmt::Display) -> Self {
		Self::Format(what.to_string())
	}

	pub fn encode(what: impl fmt::Display) -> Self {
		Self::Encode(what.to_string())
	}

	/// Prefixes a `Format` or `Encode` message with the entry/frame it happened in.
	#[must_use]
	pub fn within(self, location: impl fmt::Display) -> Self {
		match self {
			Self::Format(what) => Self::Format(format!("{location}: {what}")),
			Self::Encode(what) => Self::Encode(format!("{location}: {what}")),
			other => other,
		}
	}
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Io(err) => write!(f, "IO error: {err}"),
			Self::Format(what) => write!(f, "format error: {what}"),
			Self::VersionMismatch(err) => write!(f, "{err}"),
			Self::Encode(what) => write!(f, "can't encode: {what}"),
			Self::TomlDe(err) => write!(f, "TOML error: {err}"),
			Self::TomlSer(err) => write!(f, "TOML error: {err}"),
		}
	}
}

impl fmt::Display for VersionMismatchError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "unsupported {} version {}", self.format, self.found)
	}
}

impl error::Error for Error {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			Self::Io(err) => Some(err),
			Self::TomlDe(err) => Some(err),
			Self::TomlSer(err) => Some(err),
			_ => None,
		}
	}
}

impl error::Error for VersionMismatchError {}

impl From<io::Error> for Error {
	fn from(err: io::Error) -> Self {
		// every decoder reads from an in-memory cursor, so EOF there means a short file
		if err.kind() == io::ErrorKind::UnexpectedEof {
			Self::Format("unexpected end of data".into())
		} else {
			Self::Io(err)
		}
	}
}

impl From<VersionMismatchError> for Error {
	fn from(err: VersionMismatchError) -> Self {
		Self::VersionMismatch(err)
	}
}

impl From<toml::de::Error> for Error {
	fn from(err: toml::de::Error) -> Self {
		Self::TomlDe(err)
	}
}

impl From<toml::ser::Error> for Error {
	fn from(err: toml::ser::Error) -> Self {
		Self::TomlSer(err)
	}
}
