//! Projecting images onto the composition surface.
//!
//! - `bounds`: integer canvas rectangles and the footprint of a warp.
//! - `layer`: an image plus coverage mask placed on the surface.
//! - `planar`: inverse-mapped homography warps with bilinear sampling.
//! - `cylindrical`: reprojection onto a cylinder for rotating-camera panoramas.

pub mod bounds;
pub mod cylindrical;
pub mod layer;
pub mod planar;

pub use bounds::CanvasBounds;
pub use cylindrical::{focal_length_px, warp_cylindrical, CylindricalProjection};
pub use layer::Layer;
pub use planar::{warp_into, warp_layer_into, warp_planar};
