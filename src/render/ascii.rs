use crate::render::{Frame, Renderer, luma_u8, text_frame_begin, text_frame_end, write_fg_rgb};
use std::io::Write;

/// Plain-text fallback: one character cell per pixel, glyph picked from a
/// brightness ramp, foreground colored when the cell is bright enough to
/// matter.
pub struct AsciiRenderer {
    last_fg: Option<(u8, u8, u8)>,
}

// Dark -> bright ramp. ASCII-safe so it survives any locale.
const RAMP: &[u8] = b" .':;+=xoXO8%#@";

// Below this luma the cell renders as a bare space with no color escape;
// near-black runs dominate the scene and skipping them keeps frames small.
const DARK_FLOOR: u8 = 6;

impl AsciiRenderer {
    pub fn new() -> Self {
        Self { last_fg: None }
    }
}

impl Renderer for AsciiRenderer {
    fn name(&self) -> &'static str {
        "ascii"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some((cols, visual_rows, w, _h)) = text_frame_begin(frame, 1, 1, out)? else {
            return Ok(());
        };

        self.last_fg = None;

        let stride = w * 4;
        for row in 0..visual_rows {
            let cells = &frame.pixels_rgba[row * stride..][..stride];
            for px in cells.chunks_exact(4) {
                let (r, g, b) = (px[0], px[1], px[2]);
                let l = luma_u8(r, g, b);
                if l < DARK_FLOOR {
                    out.write_all(b" ")?;
                    continue;
                }

                if self.last_fg != Some((r, g, b)) {
                    write_fg_rgb(out, r, g, b)?;
                    self.last_fg = Some((r, g, b));
                }
                let glyph = RAMP[l as usize * (RAMP.len() - 1) / 255];
                out.write_all(&[glyph])?;
            }
            out.write_all(b"\r\n")?;
        }

        text_frame_end(frame, cols, visual_rows, out)
    }
}
