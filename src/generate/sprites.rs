use vello_cpu::kurbo::{RoundedRect, Shape};

use crate::descriptor::ValidDescriptor;

const PATH_TOLERANCE: f64 = 0.01;

/// Square coverage bitmap of one particle shape. Row-major, one byte per pixel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sprite {
    pub size: u32,
    pub coverage: Vec<u8>,
}

impl Sprite {
    pub fn coverage_at(&self, x: u32, y: u32) -> u8 {
        self.coverage[(y * self.size + x) as usize]
    }
}

/// Width and height of sprite variant `index`.
///
/// Variants below the middle index are stretched horizontally (widest at 0), variants above it
/// are stretched vertically (tallest at the last index), the middle one is `min x min`.
pub fn sprite_extent(descriptor: &ValidDescriptor, index: u32) -> (f64, f64) {
    let count = descriptor.particle_sprites_count;
    let middle = count / 2;
    let min = descriptor.particle_size_min;
    let delta = descriptor.particle_size_max - min;
    let width = if index < middle {
        min + delta * f64::from(middle - index) / f64::from(middle)
    } else {
        min
    };
    let height = if index > middle {
        min + delta * f64::from(index - middle) / f64::from(count - 1 - middle)
    } else {
        min
    };
    (width, height)
}

/// Rasterize variant `index` as an anti-aliased rounded rectangle at (1, 1).
pub fn generate_sprite(descriptor: &ValidDescriptor, index: u32) -> Sprite {
    let size = descriptor.sprite_size();
    // Particle size is capped well below u16::MAX by validation.
    let side = u16::try_from(size).unwrap_or(u16::MAX);
    let (width, height) = sprite_extent(descriptor, index);
    let radius = descriptor.particle_size_min / 2.0;

    let mut ctx = vello_cpu::RenderContext::new(side, side);
    ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
    let shape = RoundedRect::new(1.0, 1.0, 1.0 + width, 1.0 + height, radius);
    ctx.fill_path(&shape.to_path(PATH_TOLERANCE));
    ctx.flush();

    let mut pixmap = vello_cpu::Pixmap::new(side, side);
    ctx.render_to_pixmap(&mut pixmap);

    let coverage = pixmap
        .data_as_u8_slice()
        .chunks_exact(4)
        .map(|px| px[3])
        .collect();
    Sprite {
        size: u32::from(side),
        coverage,
    }
}

pub fn generate_sprites(descriptor: &ValidDescriptor) -> Vec<Sprite> {
    (0..descriptor.particle_sprites_count)
        .map(|index| generate_sprite(descriptor, index))
        .collect()
}
