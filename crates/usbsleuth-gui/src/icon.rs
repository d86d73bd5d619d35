//! UsbSleuth application icon generator.
//!
//! Produces a procedural icon: a USB flash drive (rounded body plus metal
//! connector) seen through a magnifying-glass ring. Rendered at any
//! resolution as RGBA pixel data for the window icon.

/// Generate a UsbSleuth icon as egui `IconData`.
pub fn generate_icon(size: u32) -> egui::IconData {
    let rgba = render_icon(size);
    egui::IconData {
        rgba,
        width: size,
        height: size,
    }
}

/// Render the icon into an RGBA pixel buffer (top-to-bottom row order).
pub fn render_icon(size: u32) -> Vec<u8> {
    let s = size as f32;
    let mut pixels = vec![0u8; (size * size * 4) as usize];

    // ── Layout ──────────────────────────────────────────────────
    // Stick body: vertical rounded rectangle, connector on top.
    let body = RoundRect {
        x0: s * 0.30,
        y0: s * 0.36,
        x1: s * 0.62,
        y1: s * 0.88,
        r: s * 0.06,
    };
    let plug = RoundRect {
        x0: s * 0.35,
        y0: s * 0.14,
        x1: s * 0.57,
        y1: s * 0.37,
        r: s * 0.015,
    };
    // Two contact windows in the connector.
    let pins = [
        RoundRect {
            x0: s * 0.39,
            y0: s * 0.20,
            x1: s * 0.44,
            y1: s * 0.26,
            r: 0.0,
        },
        RoundRect {
            x0: s * 0.48,
            y0: s * 0.20,
            x1: s * 0.53,
            y1: s * 0.26,
            r: 0.0,
        },
    ];

    // Lens ring in the lower-right corner.
    let lens_cx = s * 0.70;
    let lens_cy = s * 0.68;
    let lens_r = s * 0.17;
    let ring_w = s * 0.04;

    for y in 0..size {
        for x in 0..size {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;

            let mut col = [0u8; 3];
            let mut alpha = 0.0f32;

            // 1. Connector. ──────────────────────────────────────
            let a = plug.coverage(px, py);
            if a > 0.0 {
                col = blend(col, [0xb8, 0xbe, 0xc8], a);
                alpha = alpha + (1.0 - alpha) * a;
            }
            for pin in &pins {
                let a = pin.coverage(px, py);
                if a > 0.0 {
                    col = blend(col, [0x45, 0x4a, 0x55], a);
                }
            }

            // 2. Body with a vertical gradient. ──────────────────
            let a = body.coverage(px, py);
            if a > 0.0 {
                let t = ((py - body.y0) / (body.y1 - body.y0)).clamp(0.0, 1.0);
                let shade = [
                    lerp_c(0x89, 0x5a, t),
                    lerp_c(0xb4, 0x7d, t),
                    lerp_c(0xfa, 0xc8, t),
                ];
                col = blend(col, shade, a);
                alpha = alpha + (1.0 - alpha) * a;
            }

            // 3. Lens: tinted glass, then the ring. ──────────────
            let dx = px - lens_cx;
            let dy = py - lens_cy;
            let dist = (dx * dx + dy * dy).sqrt();
            let glass = smooth_edge(dist, lens_r) * 0.35;
            if glass > 0.0 {
                col = blend(col, [0xa6, 0xe3, 0xa1], glass);
                alpha = alpha + (1.0 - alpha) * glass;
            }
            let ring = smooth_edge(dist, lens_r + ring_w) * (1.0 - smooth_edge(dist, lens_r));
            if ring > 0.0 {
                col = blend(col, [0x70, 0x78, 0x85], ring);
                alpha = alpha + (1.0 - alpha) * ring;
            }

            let idx = ((y * size + x) * 4) as usize;
            pixels[idx] = col[0];
            pixels[idx + 1] = col[1];
            pixels[idx + 2] = col[2];
            pixels[idx + 3] = (alpha * 255.0).clamp(0.0, 255.0) as u8;
        }
    }

    pixels
}

// ── Helpers ─────────────────────────────────────────────────────

struct RoundRect {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    r: f32,
}

impl RoundRect {
    /// Anti-aliased coverage of the pixel centred at (`px`, `py`), 0..=1.
    fn coverage(&self, px: f32, py: f32) -> f32 {
        let cx = (self.x0 + self.x1) * 0.5;
        let cy = (self.y0 + self.y1) * 0.5;
        let hw = (self.x1 - self.x0) * 0.5 - self.r;
        let hh = (self.y1 - self.y0) * 0.5 - self.r;
        let qx = ((px - cx).abs() - hw).max(0.0);
        let qy = ((py - cy).abs() - hh).max(0.0);
        let outside = (qx * qx + qy * qy).sqrt();
        smooth_edge(outside, self.r)
    }
}

/// Smooth anti-aliased edge (1 → 0 as `dist` crosses `edge`).
fn smooth_edge(dist: f32, edge: f32) -> f32 {
    let d = dist - edge;
    if d < -1.0 {
        1.0
    } else if d > 1.0 {
        0.0
    } else {
        0.5 - d * 0.5
    }
}

fn blend(under: [u8; 3], over: [u8; 3], t: f32) -> [u8; 3] {
    [
        lerp_c(under[0], over[0], t),
        lerp_c(under[1], over[1], t),
        lerp_c(under[2], over[2], t),
    ]
}

/// Linear interpolation for a single colour channel.
fn lerp_c(a: u8, b: u8, t: f32) -> u8 {
    (a as f32 * (1.0 - t) + b as f32 * t).clamp(0.0, 255.0) as u8
}
