//! Full-range BT.601 (JFIF) conversion between interleaved RGB and planar YCbCr.

use rayon::prelude::*;

#[inline]
fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Splits interleaved RGB8 into Y, Cb and Cr planes.
pub(crate) fn rgb_to_ycbcr(rgb: &[u8]) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let pixel_count = rgb.len() / 3;
    let mut y = vec![0u8; pixel_count];
    let mut cb = vec![0u8; pixel_count];
    let mut cr = vec![0u8; pixel_count];

    y.par_iter_mut()
        .zip(cb.par_iter_mut())
        .zip(cr.par_iter_mut())
        .zip(rgb.par_chunks_exact(3))
        .for_each(|(((y, cb), cr), px)| {
            let (r, g, b) = (px[0] as f32, px[1] as f32, px[2] as f32);
            *y = to_u8(0.299 * r + 0.587 * g + 0.114 * b);
            *cb = to_u8(128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b);
            *cr = to_u8(128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b);
        });

    (y, cb, cr)
}

/// Interleaves Y, Cb and Cr planes back into RGB8.
pub(crate) fn ycbcr_to_rgb(y: &[u8], cb: &[u8], cr: &[u8]) -> Vec<u8> {
    debug_assert_eq!(y.len(), cb.len());
    debug_assert_eq!(y.len(), cr.len());

    let mut rgb = vec![0u8; y.len() * 3];
    rgb.par_chunks_exact_mut(3)
        .zip(y.par_iter())
        .zip(cb.par_iter().zip(cr.par_iter()))
        .for_each(|((px, &y), (&cb, &cr))| {
            let y = y as f32;
            let cb = cb as f32 - 128.0;
            let cr = cr as f32 - 128.0;
            px[0] = to_u8(y + 1.402 * cr);
            px[1] = to_u8(y - 0.344_136 * cb - 0.714_136 * cr);
            px[2] = to_u8(y + 1.772 * cb);
        });

    rgb
}
