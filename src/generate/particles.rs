use rand::Rng;

use crate::descriptor::ValidDescriptor;
use crate::foundation::core::Millis;

/// One animated mote: when its lifetime starts inside the loop, which sprite it uses and where
/// inside a tile it sits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Particle {
    pub start: Millis,
    pub sprite_index: u32,
    pub x: u32,
    pub y: u32,
}

/// Start of particle `index`: starts are spread evenly over the loop, `index * full / count`.
pub fn particle_start(descriptor: &ValidDescriptor, index: u32) -> Millis {
    let full = i128::from(descriptor.full_duration());
    let count = i128::from(descriptor.particles_count);
    // Bounded by the full duration, which fits Millis.
    (i128::from(index) * full / count) as Millis
}

pub fn generate_particle<R: Rng + ?Sized>(
    descriptor: &ValidDescriptor,
    index: u32,
    rng: &mut R,
) -> Particle {
    Particle {
        start: particle_start(descriptor, index),
        sprite_index: rng.gen_range(0..descriptor.particle_sprites_count),
        x: rng.gen_range(0..descriptor.canvas_size),
        y: rng.gen_range(0..descriptor.canvas_size),
    }
}

pub fn generate_particles<R: Rng + ?Sized>(
    descriptor: &ValidDescriptor,
    rng: &mut R,
) -> Vec<Particle> {
    (0..descriptor.particles_count)
        .map(|index| generate_particle(descriptor, index, rng))
        .collect()
}
