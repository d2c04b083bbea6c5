pub mod particles;
pub mod sprites;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::descriptor::{Descriptor, ValidDescriptor};
use crate::foundation::error::SpoilerResult;
use crate::mask::SpoilerMask;
use crate::render::atlas::compose_atlas;

pub use particles::{Particle, generate_particles};
pub use sprites::{Sprite, generate_sprites};

/// Generate a mask atlas from `descriptor`.
///
/// Fails only when the descriptor is malformed; no partial asset is ever produced.
pub fn generate(descriptor: &Descriptor) -> SpoilerResult<SpoilerMask> {
    let descriptor = descriptor.validated()?;
    Ok(generate_valid(&descriptor))
}

#[tracing::instrument(skip_all, fields(
    frames = descriptor.frames_count,
    canvas = descriptor.canvas_size,
    particles = descriptor.particles_count,
))]
pub fn generate_valid(descriptor: &ValidDescriptor) -> SpoilerMask {
    let mut rng = ChaCha8Rng::seed_from_u64(descriptor.seed);
    let particles = generate_particles(descriptor, &mut rng);
    let sprites = generate_sprites(descriptor);
    let image = compose_atlas(descriptor, &particles, &sprites);
    tracing::debug!(
        width = image.width(),
        height = image.height(),
        "generated spoiler atlas"
    );
    SpoilerMask::from_generated(
        image,
        descriptor.frames_count,
        descriptor.frame_duration,
        descriptor.canvas_size,
    )
}
