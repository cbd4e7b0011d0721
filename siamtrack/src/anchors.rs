//! Anchor grid and cosine window generation for the region proposal head

use ndarray::{Array1, Array2};

/// Generate the anchor grid as a `(K * S * S, 4)` array of `(cx, cy, w, h)`
///
/// `K = ratios.len() * scales.len()`. Rows are ordered `k * S^2 + i * S + j`
/// where `i` is the grid row and `j` the grid column.
pub fn generate_anchors(stride: u32, scales: &[f32], ratios: &[f32], score_size: usize) -> Array2<f32> {
    let anchor_num = scales.len() * ratios.len();
    let size = (stride * stride) as f32;

    let mut base = Vec::with_capacity(anchor_num);
    for &ratio in ratios {
        let ws = (size / ratio).sqrt().floor();
        let hs = (ws * ratio).floor();
        for &scale in scales {
            base.push((ws * scale, hs * scale));
        }
    }

    let cells = score_size * score_size;
    let origin = -((score_size / 2) as f32) * stride as f32;
    let mut anchors = Array2::<f32>::zeros((anchor_num * cells, 4));

    for (k, &(w, h)) in base.iter().enumerate() {
        for i in 0..score_size {
            for j in 0..score_size {
                let row = k * cells + i * score_size + j;
                anchors[[row, 0]] = origin + stride as f32 * j as f32;
                anchors[[row, 1]] = origin + stride as f32 * i as f32;
                anchors[[row, 2]] = w;
                anchors[[row, 3]] = h;
            }
        }
    }

    anchors
}

/// Symmetric Hanning window of length `n`
pub fn hanning(n: usize) -> Array1<f32> {
    if n == 1 {
        return Array1::ones(1);
    }
    let denom = (n - 1) as f32;
    Array1::from_iter(
        (0..n).map(|i| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * i as f32 / denom).cos()),
    )
}

/// Outer product of two Hanning windows, flattened and repeated once per anchor shape
pub fn cosine_window(score_size: usize, anchor_num: usize) -> Array1<f32> {
    let hann = hanning(score_size);
    let cells = score_size * score_size;
    let mut window = Array1::<f32>::zeros(cells * anchor_num);
    for k in 0..anchor_num {
        for i in 0..score_size {
            for j in 0..score_size {
                window[k * cells + i * score_size + j] = hann[i] * hann[j];
            }
        }
    }
    window
}
