use crate::foundation::core::Rgba8;

pub type PremulRgba8 = [u8; 4];

/// Source-over blend of premultiplied `src`, scaled by `opacity`, onto `dst`.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255(u16::from(dst[3]), inv));

    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

/// Premultiply a straight color.
pub fn premul(color: Rgba8) -> PremulRgba8 {
    let a = u16::from(color.a);
    [
        mul_div255(u16::from(color.r), a),
        mul_div255(u16::from(color.g), a),
        mul_div255(u16::from(color.b), a),
        color.a,
    ]
}

/// Paint `color` through a coverage value: the coverage scales the premultiplied color.
pub fn tint(color: PremulRgba8, coverage: u8) -> PremulRgba8 {
    let c = u16::from(coverage);
    [
        mul_div255(u16::from(color[0]), c),
        mul_div255(u16::from(color[1]), c),
        mul_div255(u16::from(color[2]), c),
        mul_div255(u16::from(color[3]), c),
    ]
}

pub fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_opacity_0_is_noop() {
        let dst = [1, 2, 3, 4];
        let src = [200, 200, 200, 200];
        assert_eq!(over(dst, src, 0.0), dst);
    }

    #[test]
    fn over_src_alpha_0_is_noop() {
        let dst = [10, 20, 30, 40];
        let src = [255, 255, 255, 0];
        assert_eq!(over(dst, src, 1.0), dst);
    }

    #[test]
    fn over_src_opaque_replaces_dst() {
        let dst = [0, 0, 0, 255];
        let src = [255, 0, 0, 255];
        assert_eq!(over(dst, src, 1.0), src);
    }

    #[test]
    fn over_gray_keeps_channels_equal() {
        let mut dst = [0u8; 4];
        for (v, opacity) in [(200u8, 0.3f32), (90, 1.0), (255, 0.55), (17, 0.8)] {
            dst = over(dst, [v, v, v, v], opacity);
            assert!(dst.iter().all(|&c| c == dst[3]), "{dst:?}");
        }
    }

    #[test]
    fn premul_and_tint() {
        assert_eq!(premul(Rgba8::new(255, 128, 0, 255)), [255, 128, 0, 255]);
        assert_eq!(premul(Rgba8::new(255, 255, 255, 0)), [0, 0, 0, 0]);
        assert_eq!(tint([255, 128, 0, 255], 255), [255, 128, 0, 255]);
        assert_eq!(tint([255, 128, 0, 255], 0), [0, 0, 0, 0]);
        assert_eq!(tint([255, 255, 255, 255], 51), [51, 51, 51, 51]);
    }
}
