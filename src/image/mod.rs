pub mod color;
pub mod f32;
pub mod io;
pub(crate) mod rows;
pub mod sample;
pub mod traits;
pub mod u8;

pub use self::color::Image;
pub use self::f32::ImageF32;
pub use self::sample::{bilinear, bilinear_clamped};
pub use self::traits::{ImageView, ImageViewMut, Rows};
pub use self::u8::ImageU8;
