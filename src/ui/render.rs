use crate::viewer::Frame;

pub const BG_COLOR: [u8; 3] = [0, 0, 0];

/// Pack RGB into softbuffer u32 format: 0x00RRGGBB.
pub fn rgb(r: u8, g: u8, b: u8) -> u32 {
    (r as u32) << 16 | (g as u32) << 8 | b as u32
}

pub fn fit_scale(img_w: f32, img_h: f32, win_w: f32, win_h: f32) -> f32 {
    (win_w / img_w).min(win_h / img_h)
}

/// Window size with the image's aspect ratio and (roughly) the same area as
/// the current window. `None` if either size is degenerate.
pub fn aspect_fit_area(img_w: u32, img_h: u32, win_w: u32, win_h: u32) -> Option<(u32, u32)> {
    if img_w == 0 || img_h == 0 || win_w == 0 || win_h == 0 {
        return None;
    }
    let area = win_w as f64 * win_h as f64;
    let scale = (area / (img_w as f64 * img_h as f64)).sqrt();
    let w = (img_w as f64 * scale).round().max(1.0) as u32;
    let h = (img_h as f64 * scale).round().max(1.0) as u32;
    Some((w, h))
}

/// Nearest-neighbour blit of an RGB24 source, top-left at (x0, y0).
pub fn blit_scaled(
    dst: &mut [u32], dst_w: u32, dst_h: u32,
    src: &[u8], src_w: u32, src_h: u32,
    x0: f32, y0: f32, scale: f32,
) {
    let draw_w = src_w as f32 * scale;
    let draw_h = src_h as f32 * scale;

    let dx_start = (x0.max(0.0)) as u32;
    let dy_start = (y0.max(0.0)) as u32;
    let dx_end = ((x0 + draw_w).ceil() as u32).min(dst_w);
    let dy_end = ((y0 + draw_h).ceil() as u32).min(dst_h);

    let inv_scale = 1.0 / scale;

    for dy in dy_start..dy_end {
        let sy = ((dy as f32 - y0) * inv_scale) as u32;
        if sy >= src_h {
            continue;
        }
        for dx in dx_start..dx_end {
            let sx = ((dx as f32 - x0) * inv_scale) as u32;
            if sx >= src_w {
                continue;
            }
            let si = (sy as usize * src_w as usize + sx as usize) * 3;
            let di = dy as usize * dst_w as usize + dx as usize;
            dst[di] = rgb(src[si], src[si + 1], src[si + 2]);
        }
    }
}

/// Clear the framebuffer and draw `frame` scaled to fit, centred.
pub fn draw_fitted(dst: &mut [u32], dst_w: u32, dst_h: u32, frame: Frame<'_>) {
    dst.fill(rgb(BG_COLOR[0], BG_COLOR[1], BG_COLOR[2]));

    if frame.width == 0 || frame.height == 0 || dst_w == 0 || dst_h == 0 {
        return;
    }
    // A buffer that failed to allocate is presented as background.
    let expected = frame.width as usize * frame.height as usize * 3;
    if frame.pixels.len() < expected || dst.len() < dst_w as usize * dst_h as usize {
        return;
    }

    let sw = dst_w as f32;
    let sh = dst_h as f32;
    let img_w = frame.width as f32;
    let img_h = frame.height as f32;
    let scale = fit_scale(img_w, img_h, sw, sh);
    let x0 = (sw - img_w * scale) / 2.0;
    let y0 = (sh - img_h * scale) / 2.0;

    blit_scaled(
        dst, dst_w, dst_h,
        frame.pixels, frame.width, frame.height,
        x0, y0, scale,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [u8; 3] = [255, 0, 0];

    #[test]
    fn rgb_packs_channels() {
        assert_eq!(rgb(0x12, 0x34, 0x56), 0x0012_3456);
    }

    #[test]
    fn fit_scale_uses_tighter_axis() {
        assert_eq!(fit_scale(100.0, 50.0, 200.0, 200.0), 2.0);
        assert_eq!(fit_scale(100.0, 50.0, 50.0, 200.0), 0.5);
    }

    #[test]
    fn aspect_fit_keeps_area_and_ratio() {
        let (w, h) = aspect_fit_area(400, 200, 800, 800).unwrap();
        assert_eq!((w, h), (1131, 566));
        // Applying the hint again to the result is a fixed point.
        assert_eq!(aspect_fit_area(400, 200, w, h), Some((w, h)));
    }

    #[test]
    fn aspect_fit_rejects_degenerate_sizes() {
        assert_eq!(aspect_fit_area(0, 10, 100, 100), None);
        assert_eq!(aspect_fit_area(10, 10, 100, 0), None);
    }

    #[test]
    fn wide_image_is_letterboxed() {
        let pixels: Vec<u8> = RED.repeat(2);
        let frame = Frame { pixels: &pixels, width: 2, height: 1 };
        let mut dst = vec![0xFFFF_FFFF; 4 * 4];
        draw_fitted(&mut dst, 4, 4, frame);

        let red = rgb(255, 0, 0);
        let bg = rgb(BG_COLOR[0], BG_COLOR[1], BG_COLOR[2]);
        for y in 0..4 {
            let row = &dst[y * 4..y * 4 + 4];
            let want = if (1..3).contains(&y) { red } else { bg };
            assert!(row.iter().all(|&p| p == want), "row {y}: {row:x?}");
        }
    }

    #[test]
    fn short_buffer_draws_background_only() {
        let pixels = RED.to_vec();
        let frame = Frame { pixels: &pixels, width: 2, height: 2 };
        let mut dst = vec![0xFFFF_FFFF; 9];
        draw_fitted(&mut dst, 3, 3, frame);
        assert!(dst.iter().all(|&p| p == 0));
    }
}
