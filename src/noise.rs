use rand::Rng;

/// Fractal value noise over a `width x height` lattice that wraps at the edges, summed over
/// `octaves` (each doubling the frequency and scaling the amplitude by `persistence`), clamped
/// to [-1, 1] and mapped onto 0..=255. Row-major.
pub fn valueNoise(
	width: usize,
	height: usize,
	frequency: f32,
	amplitude: f32,
	persistence: f32,
	octaves: u32,
	rng: &mut impl Rng,
) -> Vec<u8> {
	let lattice: Vec<f32> = (0..width * height).map(|_| rng.gen_range(-1.0..1.0)).collect();
	let at = |x: usize, y: usize| lattice[y * width + x];
	// blends the lattice cell a point falls in with the ones left of and above it
	let smooth = |x: f32, y: f32| {
		let (fractionX, fractionY) = (x.fract(), y.fract());
		let (x, y) = (x as usize, y as usize);
		let (x1, y1) = (x % width, y % height);
		let (x2, y2) = ((x + width - 1) % width, (y + height - 1) % height);
		fractionX * fractionY * at(x1, y1)
			+ fractionX * (1.0 - fractionY) * at(x1, y2)
			+ (1.0 - fractionX) * fractionY * at(x2, y1)
			+ (1.0 - fractionX) * (1.0 - fractionY) * at(x2, y2)
	};

	let mut field = Vec::with_capacity(width * height);
	for y in 0..height {
		for x in 0..width {
			let (mut value, mut frequency, mut amplitude) = (0.0, frequency, amplitude);
			for _ in 0..octaves {
				value += smooth(x as f32 * frequency, y as f32 * frequency) * amplitude;
				frequency *= 2.0;
				amplitude *= persistence;
			}
			field.push(((value.clamp(-1.0, 1.0) * 0.5 + 0.5) * 255.0) as u8);
		}
	}
	field
}
