use crate::foundation::core::{Millis, grid_rows};
use crate::foundation::error::{SpoilerError, SpoilerResult};

pub const DEFAULT_FRAME_DURATION: Millis = 33;
pub const DEFAULT_FRAMES_COUNT: u32 = 60;
pub const DEFAULT_CANVAS_SIZE: u32 = 100;
pub const DEFAULT_SEED: u64 = 0x5f0e_11e2_a7c3_9b41;

/// Largest accepted tile side in pixels.
pub const MAX_CANVAS_SIZE: u32 = 4096;
/// Largest accepted particle extent in pixels.
pub const MAX_PARTICLE_SIZE: f64 = 256.0;

/// Generation parameters for a spoiler mask atlas.
///
/// Durations are milliseconds. Sizes are pixels in atlas space.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Descriptor {
    pub particle_fade_in_duration: Millis,
    #[serde(default)]
    pub particle_shown_duration: Millis,
    pub particle_fade_out_duration: Millis,
    pub particle_size_min: f64,
    pub particle_size_max: f64,
    pub particle_sprites_count: u32,
    pub particles_count: u32,
    pub canvas_size: u32,
    pub frames_count: u32,
    pub frame_duration: Millis,
    /// Seed of the random source that places particles.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl Default for Descriptor {
    fn default() -> Self {
        Self::for_scale(1.0)
    }
}

impl Descriptor {
    /// The default mask parameters at a given device scale (UI scale times pixel ratio).
    pub fn for_scale(scale: f64) -> Self {
        Self {
            particle_fade_in_duration: 200,
            particle_shown_duration: 0,
            particle_fade_out_duration: 200,
            particle_size_min: 1.5 * scale,
            particle_size_max: 2.0 * scale,
            particle_sprites_count: 5,
            particles_count: 2000,
            canvas_size: scaled_canvas_size(scale),
            frames_count: DEFAULT_FRAMES_COUNT,
            frame_duration: DEFAULT_FRAME_DURATION,
            seed: DEFAULT_SEED,
        }
    }

    /// Time one particle stays visible: fade-in + shown + fade-out.
    pub fn single_duration(&self) -> Millis {
        self.particle_fade_in_duration
            .saturating_add(self.particle_shown_duration)
            .saturating_add(self.particle_fade_out_duration)
    }

    /// Length of the whole animation loop.
    pub fn full_duration(&self) -> Millis {
        Millis::from(self.frames_count).saturating_mul(self.frame_duration)
    }

    /// Parameters a cached atlas must carry to be usable for this descriptor.
    pub fn validator(&self) -> Validator {
        Validator {
            frame_duration: self.frame_duration,
            frames_count: self.frames_count,
            canvas_size: self.canvas_size,
        }
    }

    pub fn validate(&self) -> SpoilerResult<()> {
        if self.frames_count == 0 {
            return Err(SpoilerError::validation("frames_count must be > 0"));
        }
        if self.frame_duration <= 0 {
            return Err(SpoilerError::validation("frame_duration must be > 0"));
        }
        if self.frame_duration > Millis::from(i32::MAX) {
            return Err(SpoilerError::validation(
                "frame_duration must fit a 32-bit header field",
            ));
        }
        if self.particles_count == 0 {
            return Err(SpoilerError::validation("particles_count must be > 0"));
        }
        if self.particle_sprites_count == 0 {
            return Err(SpoilerError::validation(
                "particle_sprites_count must be > 0",
            ));
        }
        if self.canvas_size == 0 || self.canvas_size > MAX_CANVAS_SIZE {
            return Err(SpoilerError::validation(format!(
                "canvas_size must be in 1..={MAX_CANVAS_SIZE}"
            )));
        }
        if grid_rows(self.frames_count)
            .checked_mul(self.canvas_size)
            .is_none()
        {
            return Err(SpoilerError::validation("atlas height overflows u32"));
        }
        if !(self.particle_size_min.is_finite() && self.particle_size_min > 0.0) {
            return Err(SpoilerError::validation(
                "particle_size_min must be finite and > 0",
            ));
        }
        if !(self.particle_size_max.is_finite() && self.particle_size_max >= self.particle_size_min)
        {
            return Err(SpoilerError::validation(
                "particle_size_max must be finite and >= particle_size_min",
            ));
        }
        if self.particle_size_max > MAX_PARTICLE_SIZE {
            return Err(SpoilerError::validation(format!(
                "particle_size_max must be <= {MAX_PARTICLE_SIZE}"
            )));
        }
        if self.particle_fade_in_duration <= 0 || self.particle_fade_out_duration <= 0 {
            return Err(SpoilerError::validation(
                "particle fade durations must be > 0",
            ));
        }
        if self.particle_shown_duration < 0 {
            return Err(SpoilerError::validation(
                "particle_shown_duration must be >= 0",
            ));
        }
        if self.full_duration() <= self.single_duration() {
            return Err(SpoilerError::validation(
                "frames_count * frame_duration must exceed one particle lifetime",
            ));
        }
        Ok(())
    }

    /// Validate and wrap, so downstream generation cannot fail.
    pub fn validated(&self) -> SpoilerResult<ValidDescriptor> {
        self.validate()?;
        Ok(ValidDescriptor(self.clone()))
    }
}

/// A descriptor that passed [`Descriptor::validate`].
#[derive(Clone, Debug, PartialEq)]
pub struct ValidDescriptor(Descriptor);

impl ValidDescriptor {
    pub fn get(&self) -> &Descriptor {
        &self.0
    }

    /// Side of the square sprite bitmap; the shape is drawn at (1, 1) inside it.
    pub fn sprite_size(&self) -> u32 {
        2 + self.0.particle_size_max.ceil() as u32
    }
}

impl Default for ValidDescriptor {
    /// The default mask parameters at scale 1, which always validate.
    fn default() -> Self {
        Self(Descriptor::default())
    }
}

impl std::ops::Deref for ValidDescriptor {
    type Target = Descriptor;

    fn deref(&self) -> &Descriptor {
        &self.0
    }
}

/// The scalar parameters a decoded or cached atlas must match exactly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Validator {
    pub frame_duration: Millis,
    pub frames_count: u32,
    pub canvas_size: u32,
}

/// Default tile side at `scale`, never below one pixel.
pub fn scaled_canvas_size(scale: f64) -> u32 {
    let size = (f64::from(DEFAULT_CANVAS_SIZE) * scale).round();
    if size.is_finite() && size >= 1.0 {
        size.min(f64::from(MAX_CANVAS_SIZE)) as u32
    } else {
        1
    }
}
