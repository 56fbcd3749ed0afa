use mosaic_stitch::image::{Image, ImageF32};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generates a simple high-contrast checkerboard image.
pub fn checkerboard_u8(width: usize, height: usize, cell: usize) -> Vec<u8> {
    assert!(width > 0 && height > 0, "image dimensions must be positive");
    assert!(cell > 0, "cell size must be positive");

    let mut img = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            let cx = (x / cell) as i32;
            let cy = (y / cell) as i32;
            let sum = cx + cy;
            let val = if sum & 1 == 0 { 32u8 } else { 220u8 };
            img[y * width + x] = val;
        }
    }
    img
}

/// Checkerboard as a single-channel [`Image`].
pub fn checkerboard_image(width: usize, height: usize, cell: usize) -> Image {
    let raw = checkerboard_u8(width, height, cell);
    Image::from_interleaved_u8(width, height, 1, &raw).expect("buffer matches dimensions")
}

/// Non-repeating scene of overlapping axis-aligned rectangles with random
/// intensities on a mid-grey background. Every rectangle corner is a strong
/// Harris corner.
pub fn rectangle_scene(width: usize, height: usize, count: usize, seed: u64) -> ImageF32 {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = ImageF32::filled(width, height, 0.5);
    for _ in 0..count {
        let rw = rng.random_range(6..28usize);
        let rh = rng.random_range(6..28usize);
        let x0 = rng.random_range(0..width.saturating_sub(rw).max(1));
        let y0 = rng.random_range(0..height.saturating_sub(rh).max(1));
        let value: f32 = rng.random_range(0.05..0.95);
        for y in y0..(y0 + rh).min(height) {
            for x in x0..(x0 + rw).min(width) {
                img.set(x, y, value);
            }
        }
    }
    img
}

/// `w × h` window of `plane` starting at `(x0, y0)`.
pub fn crop(plane: &ImageF32, x0: usize, y0: usize, w: usize, h: usize) -> ImageF32 {
    assert!(x0 + w <= plane.w && y0 + h <= plane.h, "crop outside the plane");
    ImageF32::from_fn(w, h, |x, y| plane.get(x0 + x, y0 + y))
}

/// Horizontal strips of `scene`, each `width` wide, starting every `step`
/// pixels.
pub fn strips(scene: &ImageF32, count: usize, width: usize, step: usize) -> Vec<Image> {
    (0..count)
        .map(|i| Image::from_plane(crop(scene, i * step, 0, width, scene.h)))
        .collect()
}
