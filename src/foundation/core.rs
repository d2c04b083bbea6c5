use std::sync::LazyLock;
use std::time::Instant;

/// Frames per atlas row. Part of the cache format: atlas dimensions derive from it.
pub const FRAMES_PER_ROW: u32 = 10;

/// Milliseconds, signed so that phase arithmetic can go below zero.
pub type Millis = i64;

/// Number of tile columns in an atlas holding `frames` frames.
pub fn grid_columns(frames: u32) -> u32 {
    frames.min(FRAMES_PER_ROW)
}

/// Number of tile rows in an atlas holding `frames` frames.
pub fn grid_rows(frames: u32) -> u32 {
    frames.div_ceil(FRAMES_PER_ROW)
}

/// Pixel dimensions `(width, height)` of an atlas with the given frame count and tile size.
pub fn atlas_dimensions(frames: u32, canvas_size: u32) -> (u32, u32) {
    (
        grid_columns(frames) * canvas_size,
        grid_rows(frames) * canvas_size,
    )
}

/// Integer pixel rectangle inside an atlas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct FrameRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FrameRect {
    /// Tile `index` of a grid with square tiles of `size`, laid out row-major.
    pub fn tile(index: u32, size: u32) -> Self {
        let row = index / FRAMES_PER_ROW;
        let column = index - row * FRAMES_PER_ROW;
        Self {
            x: column * size,
            y: row * size,
            width: size,
            height: size,
        }
    }
}

/// Straight (non-premultiplied) RGBA8 color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

static PROCESS_EPOCH: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Milliseconds elapsed on a monotonic clock since the first call in this process.
pub fn now_ms() -> Millis {
    let elapsed = PROCESS_EPOCH.elapsed().as_millis();
    Millis::try_from(elapsed).unwrap_or(Millis::MAX)
}
