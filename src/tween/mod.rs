//! Time-driven interpolation: easing curves, interpolatable values and the
//! engine that advances tweens once per tick.

pub mod easing;
pub mod engine;
pub mod interpolate;

pub use easing::Easing;
pub use engine::{StartAt, Tween, TweenEngine, TweenFrom, TweenId};
pub use interpolate::{FieldBag, Interpolate};
