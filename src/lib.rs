//! Procedural spoiler mask: an animated particle field that hides content until it is revealed.
//!
//! - Describe a mask with a [`Descriptor`] and [`generate`] its frame atlas.
//! - Persist atlases with the [`codec`] and the best-effort [`DiskCache`].
//! - Share one process-wide mask through [`default_mask`], computed once in the background.
//! - Sample frames by time or index through [`SpoilerMask::frame_at`] and [`SpoilerMask::frame`].
#![forbid(unsafe_code)]

pub mod cache;
pub mod codec;
pub mod default_mask;
pub mod descriptor;
mod foundation;
pub mod generate;
pub mod mask;
pub mod render;

pub use crate::cache::{DiskCache, MAX_CACHE_SIZE};
pub use crate::codec::{FORMAT_VERSION, HEADER_SIZE, Header, Rejection, deserialize, serialize};
pub use crate::default_mask::{
    DefaultMaskOpts, LazyMask, MaskSource, default_image_spoiler, default_mask,
    finish_default_mask, prepare_default_mask, try_default_mask,
};
pub use crate::descriptor::{Descriptor, ValidDescriptor, Validator};
pub use crate::foundation::broadcast::OnceBroadcast;
pub use crate::foundation::core::{
    FRAMES_PER_ROW, FrameRect, Millis, Rgba8, atlas_dimensions, grid_columns, grid_rows, now_ms,
};
pub use crate::foundation::error::{SpoilerError, SpoilerResult};
pub use crate::generate::generate;
pub use crate::mask::{MaskFrame, SpoilerMask};
