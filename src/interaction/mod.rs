//! Pointer picking, the device registry and the highlight cycle.

pub mod devices;
pub mod highlight;
pub mod picking;

pub use devices::{Device, DeviceRegistry};
pub use highlight::{HighlightCycle, HighlightSettings};
pub use picking::{intersect, pick, pointer_ray, PickHit};
