//! Paints every animation frame of a mask into one row-major tile grid.
//!
//! Each tile is a torus for the particles it holds: a sprite that overflows the right or bottom
//! edge is repeated on the opposite side. Particle origins always lie inside the tile and sprites
//! extend only right and down from them, so the left and top edges never need a copy.

use image::RgbaImage;

use crate::descriptor::{Descriptor, ValidDescriptor};
use crate::foundation::core::{FrameRect, Millis, atlas_dimensions};
use crate::generate::{Particle, Sprite};
use crate::render::composite::over;

/// Local phase of a particle at loop time `time`, if it is alive then.
///
/// The particle may have started in the previous iteration of the loop, so the wrapped phase
/// `time + full - start` is tried as well.
pub fn local_phase(time: Millis, full: Millis, start: Millis, single: Millis) -> Option<Millis> {
    [time - start, time + full - start]
        .into_iter()
        .find(|phase| (0..single).contains(phase))
}

/// Fade envelope at local phase `phase`: linear fade in, plateau, linear fade out.
pub fn envelope(descriptor: &Descriptor, phase: Millis) -> f32 {
    let single = descriptor.single_duration();
    if !(0..single).contains(&phase) {
        return 0.0;
    }
    let fade_in = descriptor.particle_fade_in_duration;
    let fade_out = descriptor.particle_fade_out_duration;
    if phase < fade_in {
        phase as f32 / fade_in as f32
    } else if phase > single - fade_out {
        (single - phase) as f32 / fade_out as f32
    } else {
        1.0
    }
}

/// Tile-local positions a sprite is drawn at, including wrap copies.
pub fn wrap_positions(x: u32, y: u32, sprite_size: u32, canvas_size: u32) -> Vec<(i64, i64)> {
    let (x, y) = (i64::from(x), i64::from(y));
    let size = i64::from(canvas_size);
    let span = i64::from(sprite_size);
    let overflow_x = x + span > size;
    let overflow_y = y + span > size;

    let mut out = vec![(x, y)];
    if overflow_x {
        out.push((x - size, y));
    }
    if overflow_y {
        out.push((x, y - size));
    }
    if overflow_x && overflow_y {
        out.push((x - size, y - size));
    }
    out
}

pub fn compose_atlas(
    descriptor: &ValidDescriptor,
    particles: &[Particle],
    sprites: &[Sprite],
) -> RgbaImage {
    let frames = descriptor.frames_count;
    let size = descriptor.canvas_size;
    let (width, height) = atlas_dimensions(frames, size);
    let single = descriptor.single_duration();
    let full = descriptor.full_duration();

    let mut image = RgbaImage::new(width, height);
    for frame in 0..frames {
        let tile = FrameRect::tile(frame, size);
        let time = Millis::from(frame) * descriptor.frame_duration;
        for particle in particles {
            let Some(phase) = local_phase(time, full, particle.start, single) else {
                continue;
            };
            let opacity = envelope(descriptor, phase);
            if opacity <= 0.0 {
                continue;
            }
            let sprite = &sprites[particle.sprite_index as usize];
            for (x, y) in wrap_positions(particle.x, particle.y, sprite.size, size) {
                blit_clipped(&mut image, tile, sprite, x, y, opacity);
            }
        }
    }
    image
}

/// Draw white `sprite` at tile-local `(x, y)`, clipped to `tile`.
fn blit_clipped(
    image: &mut RgbaImage,
    tile: FrameRect,
    sprite: &Sprite,
    x: i64,
    y: i64,
    opacity: f32,
) {
    let size = i64::from(tile.width);
    for sy in 0..sprite.size {
        let ty = y + i64::from(sy);
        if !(0..size).contains(&ty) {
            continue;
        }
        for sx in 0..sprite.size {
            let tx = x + i64::from(sx);
            if !(0..size).contains(&tx) {
                continue;
            }
            let c = sprite.coverage_at(sx, sy);
            if c == 0 {
                continue;
            }
            // Inside the tile, so inside the atlas.
            let px = image.get_pixel_mut(tile.x + tx as u32, tile.y + ty as u32);
            px.0 = over(px.0, [c, c, c, c], opacity);
        }
    }
}
