//! Text renderer.
use std::fmt::{self, Write};

use chip8::prelude::Display;

/// Draws the display buffer as text, scaling each logical pixel
/// into a `scale` by `scale` block of characters.
pub struct Render {
    scale: usize,
}

impl Render {
    pub fn new(scale: usize) -> Self {
        Self {
            scale: scale.max(1),
        }
    }

    pub fn draw<W: Write>(&self, display: &Display, w: &mut W) -> fmt::Result {
        let border = "-".repeat(display.width() * self.scale);

        writeln!(w, "+{border}+")?;
        for y in 0..display.height() {
            let mut line = String::with_capacity(display.width() * self.scale);
            for x in 0..display.width() {
                let cell = if display.get(x, y) { '█' } else { ' ' };
                for _ in 0..self.scale {
                    line.push(cell);
                }
            }
            for _ in 0..self.scale {
                writeln!(w, "|{line}|")?;
            }
        }
        writeln!(w, "+{border}+")
    }
}
