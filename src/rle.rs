//! Run-length codec over interleaved byte planes.
//!
//! Each of `planeCount` planes is coded on its own as `(runLength, value)` pairs that
//! cover exactly `countPerPlane` cells. A run length of 1..=255 takes one byte; a zero
//! byte escapes to a big-endian `u16` length, which is how long and empty runs are told
//! apart from short ones.

use {
	crate::{Error, Result},
	byteorder::{ReadBytesExt, WriteBytesExt, BE},
	std::io,
};

const WIDE_RUN: u8 = 0;
const MAX_RUN: usize = u16::MAX as _;

/// `alwaysWide` writes every run in the escaped 3-byte form.
pub fn encode(planes: &[u8], planeCount: usize, countPerPlane: usize, alwaysWide: bool) -> Result<Vec<u8>> {
	if planes.len() != planeCount * countPerPlane {
		return Err(Error::encode(format_args!(
			"{} plane bytes can't be split into {planeCount} planes of {countPerPlane}",
			planes.len()
		)));
	}
	let mut output = Vec::with_capacity(planes.len() / 4 + planeCount * 2);
	for plane in 0..planeCount {
		let at = |position: usize| planes[position * planeCount + plane];
		let mut position = 0;
		while position < countPerPlane {
			let value = at(position);
			let mut run = 1;
			while run < MAX_RUN && position + run < countPerPlane && at(position + run) == value {
				run += 1;
			}
			match u8::try_from(run) {
				Ok(short) if !alwaysWide => output.push(short),
				_ => {
					output.push(WIDE_RUN);
					output.write_u16::<BE>(run as _)?;
				}
			}
			output.push(value);
			position += run;
		}
	}
	Ok(output)
}

/// Returns the planes interleaved again, `planeCount * countPerPlane` bytes long.
pub fn decode(bytes: &[u8], planeCount: usize, countPerPlane: usize) -> Result<Vec<u8>> {
	// every run takes at least two bytes and covers at most MAX_RUN cells
	let cellCount = planeCount
		.checked_mul(countPerPlane)
		.filter(|&cellCount| cellCount <= (bytes.len() / 2).saturating_mul(MAX_RUN))
		.ok_or_else(|| {
			Error::format(format_args!(
				"{} bytes can't cover {planeCount} planes of {countPerPlane} cells",
				bytes.len()
			))
		})?;
	let (cursor, mut planes) = (&mut io::Cursor::new(bytes), vec![0; cellCount]);
	for plane in 0..planeCount {
		let mut position = 0;
		while position < countPerPlane {
			let run = (|| -> io::Result<_> {
				let run = match cursor.read_u8()? {
					WIDE_RUN => usize::from(cursor.read_u16::<BE>()?),
					short => usize::from(short),
				};
				Ok((run, cursor.read_u8()?))
			})()
			.map_err(|err| Error::from(err).within(format_args!("plane {plane}, cell {position}")));
			let (run, value) = run?;
			if position + run > countPerPlane {
				return Err(Error::format(format_args!(
					"plane {plane}: run of {run} at cell {position} overshoots {countPerPlane} cells"
				)));
			}
			for cell in position..position + run {
				planes[cell * planeCount + plane] = value;
			}
			position += run;
		}
	}
	Ok(planes)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn short_run_is_one_length_byte() {
		let encoded = encode(&[5, 5, 5, 5, 5], 1, 5, false).unwrap();
		assert_eq!(encoded, [5, 5]);
		assert_eq!(decode(&encoded, 1, 5).unwrap(), [5, 5, 5, 5, 5]);
	}

	#[test]
	fn long_run_is_escaped() {
		let planes = vec![9; 300];
		let encoded = encode(&planes, 1, 300, false).unwrap();
		assert_eq!(encoded, [0, 0x01, 0x2C, 9]);
		assert_eq!(decode(&encoded, 1, 300).unwrap(), planes);
	}

	#[test]
	fn runs_longer_than_u16_are_split() {
		let planes = vec![1; MAX_RUN + 10];
		let encoded = encode(&planes, 1, planes.len(), false).unwrap();
		assert_eq!(encoded, [0, 0xFF, 0xFF, 1, 10, 1]);
		assert_eq!(decode(&encoded, 1, planes.len()).unwrap(), planes);
	}

	#[test]
	fn always_wide_escapes_every_run() {
		let encoded = encode(&[3, 3, 4], 1, 3, true).unwrap();
		assert_eq!(encoded, [0, 0, 2, 3, 0, 0, 1, 4]);
		assert_eq!(decode(&encoded, 1, 3).unwrap(), [3, 3, 4]);
	}

	#[test]
	fn planes_are_coded_independently() {
		// two cells, four planes: [A, 0, C, B] per cell
		let planes = [7, 0, 1, 2, 7, 0, 3, 2];
		let encoded = encode(&planes, 4, 2, false).unwrap();
		assert_eq!(encoded, [2, 7, 2, 0, 1, 1, 1, 3, 2, 2]);
		assert_eq!(decode(&encoded, 4, 2).unwrap(), planes);
	}

	#[test]
	fn zero_length_run_contributes_nothing() {
		let encoded = [0, 0, 0, 42, 2, 8];
		assert_eq!(decode(&encoded, 1, 2).unwrap(), [8, 8]);
	}

	#[test]
	fn overshooting_run_is_a_format_error() {
		assert!(matches!(decode(&[4, 1], 1, 3), Err(Error::Format(_))));
	}

	#[test]
	fn premature_end_is_a_format_error() {
		assert!(matches!(decode(&[2, 1], 1, 3), Err(Error::Format(_))));
		assert!(matches!(decode(&[0, 1], 1, 3), Err(Error::Format(_))));
	}

	#[test]
	fn cell_count_beyond_the_input_is_rejected_up_front() {
		assert!(matches!(decode(&[1, 1], 4, 1 << 61), Err(Error::Format(_))));
		assert!(matches!(decode(&[1, 1], usize::MAX, 2), Err(Error::Format(_))));
		assert!(matches!(decode(&[0, 0xFF, 0xFF, 1], 1, MAX_RUN + 1), Err(Error::Format(_))));
		assert_eq!(decode(&[0, 0xFF, 0xFF, 1], 1, MAX_RUN).unwrap().len(), MAX_RUN);
	}

	#[test]
	fn mismatched_input_length_is_rejected() {
		assert!(matches!(encode(&[1, 2, 3], 2, 2, false), Err(Error::Encode(_))));
	}

	#[test]
	fn empty_planes_encode_to_nothing() {
		assert!(encode(&[], 4, 0, false).unwrap().is_empty());
		assert!(decode(&[], 4, 0).unwrap().is_empty());
	}
}
