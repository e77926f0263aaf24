//! Synthetic RGB8 buffers shared by unit tests.

/// Smooth horizontal/vertical gradient.
pub(crate) fn gradient(width: u32, height: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            pixels.push((x * 255 / width.max(1)) as u8);
            pixels.push((y * 255 / height.max(1)) as u8);
            pixels.push(((x + y) * 127 / (width + height).max(1)) as u8);
        }
    }
    pixels
}

/// Gradient with deterministic pseudo-random noise, hard to compress.
pub(crate) fn noisy(width: u32, height: u32, seed: u32) -> Vec<u8> {
    let mut state = seed.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    gradient(width, height)
        .into_iter()
        .map(|v| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let noise = ((state >> 24) as u8) / 2;
            v.wrapping_add(noise)
        })
        .collect()
}

/// Count distinct RGB triples.
pub(crate) fn distinct_colors(pixels: &[u8]) -> usize {
    let mut seen = std::collections::HashSet::new();
    for px in pixels.chunks_exact(3) {
        seen.insert([px[0], px[1], px[2]]);
    }
    seen.len()
}
