//! Exemplar and search region cropping

use image::{imageops, Rgb, RgbImage};
use ndarray::Array4;

/// Per-channel mean of a frame in RGB order, truncated to `u8`
pub fn channel_mean(frame: &RgbImage) -> [u8; 3] {
    let count = (frame.width() as u64 * frame.height() as u64).max(1);
    let mut sums = [0u64; 3];
    for pixel in frame.pixels() {
        for (sum, &value) in sums.iter_mut().zip(pixel.0.iter()) {
            *sum += value as u64;
        }
    }
    [
        (sums[0] / count) as u8,
        (sums[1] / count) as u8,
        (sums[2] / count) as u8,
    ]
}

/// Crop a square of side `original_sz` centred on `center` and resize it to `model_sz`
///
/// Pixels falling outside the frame take the `avg` colour. The result is a
/// `[1, 3, model_sz, model_sz]` tensor in BGR channel order with raw 0-255 values.
pub fn subwindow(
    frame: &RgbImage,
    center: (f32, f32),
    model_sz: u32,
    original_sz: f32,
    avg: [u8; 3],
) -> Array4<f32> {
    let patch = crop_patch(frame, center, original_sz, avg);
    let patch = if patch.width() != model_sz {
        imageops::resize(&patch, model_sz, model_sz, imageops::FilterType::Triangle)
    } else {
        patch
    };
    to_bgr_tensor(&patch)
}

/// Square crop before resizing
pub(crate) fn crop_patch(
    frame: &RgbImage,
    center: (f32, f32),
    original_sz: f32,
    avg: [u8; 3],
) -> RgbImage {
    let sz = original_sz.round().max(1.0) as u32;
    let c = (sz as f32 + 1.0) / 2.0;
    let xmin = (center.0 - c).round() as i64;
    let ymin = (center.1 - c).round() as i64;
    let (frame_w, frame_h) = (frame.width() as i64, frame.height() as i64);
    let fill = Rgb(avg);

    RgbImage::from_fn(sz, sz, |x, y| {
        let sx = xmin + x as i64;
        let sy = ymin + y as i64;
        if sx >= 0 && sy >= 0 && sx < frame_w && sy < frame_h {
            *frame.get_pixel(sx as u32, sy as u32)
        } else {
            fill
        }
    })
}

fn to_bgr_tensor(patch: &RgbImage) -> Array4<f32> {
    let (w, h) = (patch.width() as usize, patch.height() as usize);
    let mut tensor = Array4::<f32>::zeros((1, 3, h, w));
    for (x, y, pixel) in patch.enumerate_pixels() {
        let [r, g, b] = pixel.0;
        let (x, y) = (x as usize, y as usize);
        tensor[[0, 0, y, x]] = b as f32;
        tensor[[0, 1, y, x]] = g as f32;
        tensor[[0, 2, y, x]] = r as f32;
    }
    tensor
}
