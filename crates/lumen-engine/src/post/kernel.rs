use crate::config::MAX_BLUR_RADIUS;

/// One side of a normalized Gaussian kernel: `weights[0]` is the center tap,
/// `weights[i]` applies at offsets `+i` and `-i`.
///
/// `weights[0] + 2 * sum(weights[1..])` equals one. The radius is clamped to
/// [`MAX_BLUR_RADIUS`]; a radius of zero yields the identity kernel `[1.0]`.
pub fn gaussian_weights(radius: u32) -> Vec<f32> {
    let radius = radius.min(MAX_BLUR_RADIUS);
    if radius == 0 {
        return vec![1.0];
    }
    // Three sigma fit inside the radius.
    let sigma = (radius as f32 / 3.0).max(0.5);
    let two_sigma_sq = 2.0 * sigma * sigma;

    let mut weights: Vec<f32> = (0..=radius)
        .map(|i| (-((i * i) as f32) / two_sigma_sq).exp())
        .collect();
    let total = weights[0] + 2.0 * weights[1..].iter().sum::<f32>();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

/// Full symmetric kernel of `2 * radius + 1` taps.
pub fn gaussian_kernel(radius: u32) -> Vec<f32> {
    let half = gaussian_weights(radius);
    half.iter()
        .rev()
        .chain(half.iter().skip(1))
        .copied()
        .collect()
}

/// Packs one-sided weights into the four `vec4` uniforms the blur pass reads.
/// Unused lanes are zero.
pub fn pack_weights(weights: &[f32]) -> [[f32; 4]; 4] {
    let mut packed = [[0.0; 4]; 4];
    for (i, w) in weights.iter().take(16).enumerate() {
        packed[i / 4][i % 4] = *w;
    }
    packed
}
