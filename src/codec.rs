//! Binary cache format.
//!
//! ```text
//! [header: 24 bytes][payload: PNG, 8-bit grayscale]
//! ```
//!
//! Header fields, little-endian, in order: version (u32), payload length (u32), payload XXH32
//! with seed 0 (u32), frame count (i32), canvas size (i32), frame duration in ms (i32).
//!
//! The payload stores one byte per atlas pixel: the alpha byte (index 3) of the premultiplied
//! RGBA8 atlas. Decoding expands every byte `v` back to `[v, v, v, v]`. The PNG codec is part of
//! the versioned format; changing it means bumping [`FORMAT_VERSION`].

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, ImageReader, Luma, RgbaImage};
use xxhash_rust::xxh32::xxh32;

use crate::descriptor::Validator;
use crate::foundation::core::{Millis, atlas_dimensions, grid_columns, grid_rows};
use crate::foundation::error::{SpoilerError, SpoilerResult};
use crate::mask::SpoilerMask;

pub const FORMAT_VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 24;
const CHECKSUM_SEED: u32 = 0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Header {
    pub version: u32,
    pub data_length: u32,
    pub data_hash: u32,
    pub frames_count: i32,
    pub canvas_size: i32,
    pub frame_duration: i32,
}

impl Header {
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        let fields = [
            self.version.to_le_bytes(),
            self.data_length.to_le_bytes(),
            self.data_hash.to_le_bytes(),
            self.frames_count.to_le_bytes(),
            self.canvas_size.to_le_bytes(),
            self.frame_duration.to_le_bytes(),
        ];
        for (chunk, field) in out.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&field);
        }
        out
    }

    /// Parse the first [`HEADER_SIZE`] bytes. `None` if `bytes` is shorter.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let bytes = bytes.get(..HEADER_SIZE)?;
        let word = |i: usize| -> [u8; 4] {
            let mut w = [0u8; 4];
            w.copy_from_slice(&bytes[i * 4..i * 4 + 4]);
            w
        };
        Some(Self {
            version: u32::from_le_bytes(word(0)),
            data_length: u32::from_le_bytes(word(1)),
            data_hash: u32::from_le_bytes(word(2)),
            frames_count: i32::from_le_bytes(word(3)),
            canvas_size: i32::from_le_bytes(word(4)),
            frame_duration: i32::from_le_bytes(word(5)),
        })
    }
}

/// Why a blob was not accepted. Every variant means the same thing to callers: no usable data.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    #[error("blob is not longer than its header")]
    Truncated,
    #[error("unsupported format version {0}")]
    Version(u32),
    #[error("non-positive frame count, canvas size or frame duration")]
    BadParameters,
    #[error("parameters do not match the validator")]
    ValidatorMismatch,
    #[error("payload length does not match the header")]
    Length,
    #[error("payload checksum mismatch")]
    Checksum,
    #[error("payload is not an 8-bit grayscale png")]
    Payload,
    #[error("image dimensions do not match the frame grid")]
    Dimensions,
}

/// Take the alpha byte of every pixel.
pub fn pack_intensity(image: &RgbaImage) -> GrayImage {
    let (width, height) = image.dimensions();
    GrayImage::from_fn(width, height, |x, y| Luma([image.get_pixel(x, y)[3]]))
}

/// Replicate each intensity byte into all four channels.
pub fn unpack_intensity(gray: &GrayImage) -> RgbaImage {
    let (width, height) = gray.dimensions();
    let mut image = RgbaImage::new(width, height);
    for (dst, src) in image.pixels_mut().zip(gray.pixels()) {
        let v = src.0[0];
        dst.0 = [v, v, v, v];
    }
    image
}

pub fn serialize(mask: &SpoilerMask) -> SpoilerResult<Vec<u8>> {
    let field = |value: i64, name: &str| {
        i32::try_from(value)
            .map_err(|_| SpoilerError::codec(format!("{name} does not fit the header")))
    };
    let frames_count = field(i64::from(mask.frames_count()), "frames_count")?;
    let canvas_size = field(i64::from(mask.canvas_size()), "canvas_size")?;
    let frame_duration = field(mask.frame_duration(), "frame_duration")?;

    let gray = pack_intensity(mask.image());
    let mut payload = Vec::new();
    DynamicImage::ImageLuma8(gray)
        .write_to(&mut Cursor::new(&mut payload), ImageFormat::Png)
        .map_err(|e| SpoilerError::codec(format!("encode png payload: {e}")))?;

    let data_length = u32::try_from(payload.len())
        .map_err(|_| SpoilerError::codec("payload exceeds 4 GiB"))?;
    let header = Header {
        version: FORMAT_VERSION,
        data_length,
        data_hash: xxh32(&payload, CHECKSUM_SEED),
        frames_count,
        canvas_size,
        frame_duration,
    };

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode a blob, optionally requiring it to match `validator`. `None` on any defect.
pub fn deserialize(data: &[u8], validator: Option<&Validator>) -> Option<SpoilerMask> {
    match decode(data, validator) {
        Ok(mask) => Some(mask),
        Err(reason) => {
            tracing::debug!(%reason, len = data.len(), "rejected spoiler mask blob");
            None
        }
    }
}

/// Like [`deserialize`], reporting why a blob was rejected.
pub fn decode(data: &[u8], validator: Option<&Validator>) -> Result<SpoilerMask, Rejection> {
    if data.len() <= HEADER_SIZE {
        return Err(Rejection::Truncated);
    }
    let header = Header::from_bytes(data).ok_or(Rejection::Truncated)?;
    if header.version != FORMAT_VERSION {
        return Err(Rejection::Version(header.version));
    }
    let (Ok(frames_count), Ok(canvas_size)) = (
        u32::try_from(header.frames_count),
        u32::try_from(header.canvas_size),
    ) else {
        return Err(Rejection::BadParameters);
    };
    if frames_count == 0 || canvas_size == 0 || header.frame_duration <= 0 {
        return Err(Rejection::BadParameters);
    }
    let frame_duration = Millis::from(header.frame_duration);
    if let Some(v) = validator
        && (v.frame_duration != frame_duration
            || v.frames_count != frames_count
            || v.canvas_size != canvas_size)
    {
        return Err(Rejection::ValidatorMismatch);
    }

    let payload = &data[HEADER_SIZE..];
    if payload.len() as u64 != u64::from(header.data_length) {
        return Err(Rejection::Length);
    }
    if xxh32(payload, CHECKSUM_SEED) != header.data_hash {
        return Err(Rejection::Checksum);
    }

    let expected = (
        u64::from(grid_columns(frames_count)) * u64::from(canvas_size),
        u64::from(grid_rows(frames_count)) * u64::from(canvas_size),
    );
    // Dimensions come from the png header, before any pixel buffer is allocated.
    let declared = ImageReader::with_format(Cursor::new(payload), ImageFormat::Png)
        .into_dimensions()
        .map_err(|_| Rejection::Payload)?;
    if (u64::from(declared.0), u64::from(declared.1)) != expected {
        return Err(Rejection::Dimensions);
    }
    let decoded = ImageReader::with_format(Cursor::new(payload), ImageFormat::Png)
        .decode()
        .map_err(|_| Rejection::Payload)?;
    let DynamicImage::ImageLuma8(gray) = decoded else {
        return Err(Rejection::Payload);
    };
    let (width, height) = gray.dimensions();
    if (u64::from(width), u64::from(height)) != expected {
        return Err(Rejection::Dimensions);
    }
    debug_assert_eq!(
        (width, height),
        atlas_dimensions(frames_count, canvas_size)
    );

    SpoilerMask::new(
        unpack_intensity(&gray),
        frames_count,
        frame_duration,
        canvas_size,
    )
    .map_err(|_| Rejection::Dimensions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_mask() -> SpoilerMask {
        let (w, h) = atlas_dimensions(3, 4);
        let mut image = RgbaImage::new(w, h);
        for (i, px) in image.pixels_mut().enumerate() {
            let v = (i * 7 % 256) as u8;
            px.0 = [v; 4];
        }
        SpoilerMask::new(image, 3, 40, 4).unwrap()
    }

    #[test]
    fn header_layout_is_fixed() {
        let header = Header {
            version: 1,
            data_length: 0x0102_0304,
            data_hash: 0xdead_beef,
            frames_count: 60,
            canvas_size: 100,
            frame_duration: 33,
        };
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], &[1, 0, 0, 0]);
        assert_eq!(&bytes[4..8], &[4, 3, 2, 1]);
        assert_eq!(&bytes[8..12], &[0xef, 0xbe, 0xad, 0xde]);
        assert_eq!(&bytes[12..16], &[60, 0, 0, 0]);
        assert_eq!(&bytes[16..20], &[100, 0, 0, 0]);
        assert_eq!(&bytes[20..24], &[33, 0, 0, 0]);
        assert_eq!(Header::from_bytes(&bytes), Some(header));
        assert_eq!(Header::from_bytes(&bytes[..23]), None);
    }

    #[test]
    fn intensity_packing_round_trips_boundaries() {
        let mut image = RgbaImage::new(3, 1);
        image.put_pixel(0, 0, image::Rgba([0, 0, 0, 0]));
        image.put_pixel(1, 0, image::Rgba([255, 255, 255, 255]));
        image.put_pixel(2, 0, image::Rgba([9, 9, 9, 128]));
        let gray = pack_intensity(&image);
        assert_eq!(gray.as_raw(), &vec![0, 255, 128]);

        let back = unpack_intensity(&gray);
        assert_eq!(back.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(back.get_pixel(1, 0).0, [255, 255, 255, 255]);
        assert_eq!(back.get_pixel(2, 0).0, [128, 128, 128, 128]);
    }

    #[test]
    fn round_trip_is_lossless() {
        let mask = small_mask();
        let bytes = serialize(&mask).unwrap();
        let header = Header::from_bytes(&bytes).unwrap();
        assert_eq!(header.version, FORMAT_VERSION);
        assert_eq!(header.data_length as usize, bytes.len() - HEADER_SIZE);
        assert_eq!(
            (header.frames_count, header.canvas_size, header.frame_duration),
            (3, 4, 40)
        );

        let back = deserialize(&bytes, Some(&mask.validator())).unwrap();
        assert_eq!(back, mask);
        assert_eq!(deserialize(&bytes, None).unwrap(), mask);
    }

    #[test]
    fn rejects_each_defect() {
        let mask = small_mask();
        let bytes = serialize(&mask).unwrap();

        assert_eq!(decode(&bytes[..HEADER_SIZE], None), Err(Rejection::Truncated));
        assert_eq!(decode(&[], None), Err(Rejection::Truncated));

        let mut wrong_version = bytes.clone();
        wrong_version[0] = 2;
        assert_eq!(decode(&wrong_version, None), Err(Rejection::Version(2)));

        let mut negative = bytes.clone();
        negative[16..20].copy_from_slice(&(-4i32).to_le_bytes());
        assert_eq!(decode(&negative, None), Err(Rejection::BadParameters));

        let mut zero_duration = bytes.clone();
        zero_duration[20..24].copy_from_slice(&0i32.to_le_bytes());
        assert_eq!(decode(&zero_duration, None), Err(Rejection::BadParameters));

        let mut extra = bytes.clone();
        extra.push(0);
        assert_eq!(decode(&extra, None), Err(Rejection::Length));

        let mut flipped = bytes.clone();
        let last = flipped.len() - 1;
        flipped[last] ^= 0x40;
        assert_eq!(decode(&flipped, None), Err(Rejection::Checksum));
    }

    #[test]
    fn rejects_validator_mismatch_per_field() {
        let mask = small_mask();
        let bytes = serialize(&mask).unwrap();
        let ok = mask.validator();
        for v in [
            Validator {
                frame_duration: 41,
                ..ok
            },
            Validator {
                frames_count: 4,
                ..ok
            },
            Validator {
                canvas_size: 5,
                ..ok
            },
        ] {
            assert_eq!(decode(&bytes, Some(&v)), Err(Rejection::ValidatorMismatch));
        }
    }

    #[test]
    fn rejects_wrong_grid_and_wrong_depth() {
        // Well-formed header and checksum around a payload of the wrong size.
        let mask = small_mask();
        let bytes = serialize(&mask).unwrap();
        let mut header = Header::from_bytes(&bytes).unwrap();
        header.frames_count = 2;
        let mut relabeled = header.to_bytes().to_vec();
        relabeled.extend_from_slice(&bytes[HEADER_SIZE..]);
        assert_eq!(decode(&relabeled, None), Err(Rejection::Dimensions));

        // An RGBA png is not an intensity payload.
        let mut payload = Vec::new();
        DynamicImage::ImageRgba8(mask.image().clone())
            .write_to(&mut Cursor::new(&mut payload), ImageFormat::Png)
            .unwrap();
        let header = Header {
            data_length: payload.len() as u32,
            data_hash: xxh32(&payload, CHECKSUM_SEED),
            ..Header::from_bytes(&bytes).unwrap()
        };
        let mut rgba_blob = header.to_bytes().to_vec();
        rgba_blob.extend_from_slice(&payload);
        assert_eq!(decode(&rgba_blob, None), Err(Rejection::Payload));

        // Garbage payload with a valid checksum.
        let junk = vec![0x89, b'P', b'N', b'G', 1, 2, 3];
        let header = Header {
            data_length: junk.len() as u32,
            data_hash: xxh32(&junk, CHECKSUM_SEED),
            ..Header::from_bytes(&bytes).unwrap()
        };
        let mut junk_blob = header.to_bytes().to_vec();
        junk_blob.extend_from_slice(&junk);
        assert_eq!(decode(&junk_blob, None), Err(Rejection::Payload));
    }

    fn crc32(bytes: &[u8]) -> u32 {
        let mut crc = !0u32;
        for &b in bytes {
            crc ^= u32::from(b);
            for _ in 0..8 {
                crc = if crc & 1 == 1 {
                    (crc >> 1) ^ 0xedb8_8320
                } else {
                    crc >> 1
                };
            }
        }
        !crc
    }

    #[test]
    fn oversized_png_is_rejected_from_its_header() {
        let mask = small_mask();
        let bytes = serialize(&mask).unwrap();
        let mut png = bytes[HEADER_SIZE..].to_vec();
        // IHDR data sits at 16..29, its crc at 29..33.
        assert_eq!(&png[12..16], b"IHDR");
        png[16..20].copy_from_slice(&16_000u32.to_be_bytes());
        png[20..24].copy_from_slice(&16_000u32.to_be_bytes());
        let crc = crc32(&png[12..29]);
        png[29..33].copy_from_slice(&crc.to_be_bytes());

        let header = Header {
            data_length: png.len() as u32,
            data_hash: xxh32(&png, CHECKSUM_SEED),
            ..Header::from_bytes(&bytes).unwrap()
        };
        let mut blob = header.to_bytes().to_vec();
        blob.extend_from_slice(&png);
        // The pixel data is far too short for 16000x16000, so only a header check can say this.
        assert_eq!(decode(&blob, None), Err(Rejection::Dimensions));
    }

    #[test]
    fn serialize_rejects_unrepresentable_duration() {
        let (w, h) = atlas_dimensions(1, 1);
        let mask = SpoilerMask::new(RgbaImage::new(w, h), 1, i64::from(i32::MAX) + 1, 1).unwrap();
        assert!(matches!(serialize(&mask), Err(SpoilerError::Codec(_))));
    }
}
