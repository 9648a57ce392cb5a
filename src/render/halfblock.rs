use crate::render::{
    Frame, Renderer, text_frame_begin, text_frame_end, write_bg_rgb, write_fg_rgb,
};
use std::io::Write;

/// Upper-half-block renderer: two pixel rows per terminal cell, foreground
/// color carries the top pixel and background the bottom one.
pub struct HalfBlockRenderer {
    last_fg: Option<(u8, u8, u8)>,
    last_bg: Option<(u8, u8, u8)>,
}

const HALF_BLOCK: &str = "\u{2580}";

impl HalfBlockRenderer {
    pub fn new() -> Self {
        Self {
            last_fg: None,
            last_bg: None,
        }
    }
}

impl Renderer for HalfBlockRenderer {
    fn name(&self) -> &'static str {
        "halfblock"
    }

    fn render(&mut self, frame: &Frame<'_>, out: &mut dyn Write) -> anyhow::Result<()> {
        let Some((cols, visual_rows, w, _h)) = text_frame_begin(frame, 1, 2, out)? else {
            return Ok(());
        };

        self.last_fg = None;
        self.last_bg = None;

        let stride = w * 4;
        for row in 0..visual_rows {
            let top_row = &frame.pixels_rgba[row * 2 * stride..][..stride];
            let bot_row = &frame.pixels_rgba[(row * 2 + 1) * stride..][..stride];
            for (top, bot) in top_row.chunks_exact(4).zip(bot_row.chunks_exact(4)) {
                let fg = (top[0], top[1], top[2]);
                if self.last_fg != Some(fg) {
                    write_fg_rgb(out, fg.0, fg.1, fg.2)?;
                    self.last_fg = Some(fg);
                }
                let bg = (bot[0], bot[1], bot[2]);
                if self.last_bg != Some(bg) {
                    write_bg_rgb(out, bg.0, bg.1, bg.2)?;
                    self.last_bg = Some(bg);
                }
                out.write_all(HALF_BLOCK.as_bytes())?;
            }
            out.write_all(b"\r\n")?;
        }

        text_frame_end(frame, cols, visual_rows, out)
    }
}
