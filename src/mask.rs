use image::RgbaImage;

use crate::descriptor::Validator;
use crate::foundation::core::{FrameRect, Millis, Rgba8, atlas_dimensions, now_ms};
use crate::foundation::error::{SpoilerError, SpoilerResult};
use crate::render::composite::{over, premul, tint};

/// A computed spoiler mask: every animation frame tiled into one premultiplied RGBA8 atlas.
///
/// Immutable once built. Derived variants ([`SpoilerMask::recolored`],
/// [`SpoilerMask::over_backdrop`]) copy the atlas.
#[derive(Clone, Debug, PartialEq)]
pub struct SpoilerMask {
    image: RgbaImage,
    frame_duration: Millis,
    frames_count: u32,
    canvas_size: u32,
}

/// One frame of a mask: the shared atlas and the tile to sample from it.
#[derive(Clone, Copy, Debug)]
pub struct MaskFrame<'a> {
    pub image: &'a RgbaImage,
    pub source: FrameRect,
}

impl SpoilerMask {
    /// Wrap an atlas, checking that its dimensions match the frame grid.
    pub fn new(
        image: RgbaImage,
        frames_count: u32,
        frame_duration: Millis,
        canvas_size: u32,
    ) -> SpoilerResult<Self> {
        if frames_count == 0 || frame_duration <= 0 || canvas_size == 0 {
            return Err(SpoilerError::validation(
                "mask frames_count, frame_duration and canvas_size must be > 0",
            ));
        }
        let expected = atlas_dimensions(frames_count, canvas_size);
        if image.dimensions() != expected {
            return Err(SpoilerError::validation(format!(
                "mask atlas is {:?}, expected {:?} for {frames_count} frames of {canvas_size}px",
                image.dimensions(),
                expected
            )));
        }
        Ok(Self {
            image,
            frame_duration,
            frames_count,
            canvas_size,
        })
    }

    pub(crate) fn from_generated(
        image: RgbaImage,
        frames_count: u32,
        frame_duration: Millis,
        canvas_size: u32,
    ) -> Self {
        debug_assert_eq!(
            image.dimensions(),
            atlas_dimensions(frames_count, canvas_size)
        );
        Self {
            image,
            frame_duration,
            frames_count,
            canvas_size,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn frame_duration(&self) -> Millis {
        self.frame_duration
    }

    pub fn frames_count(&self) -> u32 {
        self.frames_count
    }

    pub fn canvas_size(&self) -> u32 {
        self.canvas_size
    }

    pub fn validator(&self) -> Validator {
        Validator {
            frame_duration: self.frame_duration,
            frames_count: self.frames_count,
            canvas_size: self.canvas_size,
        }
    }

    /// Frame shown at `now` milliseconds: `floor(now / frame_duration) mod frames_count`.
    pub fn frame_index_at(&self, now: Millis) -> u32 {
        let index = now
            .div_euclid(self.frame_duration)
            .rem_euclid(Millis::from(self.frames_count));
        // In 0..frames_count.
        index as u32
    }

    /// Tile of frame `index`. Indices past the last frame wrap around.
    pub fn frame(&self, index: u32) -> MaskFrame<'_> {
        MaskFrame {
            image: &self.image,
            source: FrameRect::tile(index % self.frames_count, self.canvas_size),
        }
    }

    pub fn frame_at(&self, now: Millis) -> MaskFrame<'_> {
        self.frame(self.frame_index_at(now))
    }

    /// Frame for the process monotonic clock.
    pub fn current_frame(&self) -> MaskFrame<'_> {
        self.frame_at(now_ms())
    }

    /// Copy with every pixel painted `color`, keeping this mask's coverage.
    pub fn recolored(&self, color: Rgba8) -> SpoilerMask {
        let color = premul(color);
        let mut image = self.image.clone();
        for px in image.pixels_mut() {
            px.0 = tint(color, px.0[3]);
        }
        Self::from_generated(
            image,
            self.frames_count,
            self.frame_duration,
            self.canvas_size,
        )
    }

    /// Copy with this mask drawn over a solid `backdrop`.
    pub fn over_backdrop(&self, backdrop: Rgba8) -> SpoilerMask {
        let backdrop = premul(backdrop);
        let mut image = self.image.clone();
        for px in image.pixels_mut() {
            px.0 = over(backdrop, px.0, 1.0);
        }
        Self::from_generated(
            image,
            self.frames_count,
            self.frame_duration,
            self.canvas_size,
        )
    }
}
