//! Everything that runs between the tween update and presentation: per-tick
//! mixins, the default renderer, composers and the label overlay.

pub mod composer;
pub mod labels;
pub mod mixins;
pub mod renderer;

pub use composer::{ComposeTarget, Composer, PassComposer, PostPass, SrgbEncodePass};
pub use labels::{Label, LabelAnchor, LabelOverlay, LabelPlacement};
pub use mixins::{AnimationMixer, MixinContext, RenderMixin, TextureScroll, SCROLL_STEP, SCROLL_WRAP};
pub use renderer::{linear_to_srgb, OutputEncoding, RaycastRenderer, SceneRenderer};
