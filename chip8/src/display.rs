//! Monochrome display buffer.
use std::fmt;

use crate::constants::*;

/// Grid of on/off pixels in logical coordinates.
///
/// Scaling to physical output is left to the renderer.
pub struct Display {
    /// Row-major pixel cells.
    pixels: Box<[bool; DISPLAY_BUFFER_SIZE]>,
    /// Set when the buffer was changed, cleared by the renderer.
    redraw: bool,
}

impl Default for Display {
    fn default() -> Self {
        Self {
            pixels: Box::new([false; DISPLAY_BUFFER_SIZE]),
            redraw: false,
        }
    }
}

impl Display {
    pub fn new() -> Self {
        Default::default()
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        DISPLAY_WIDTH
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        DISPLAY_HEIGHT
    }

    /// Pixel state. Out of bounds coordinates are always off.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT {
            self.pixels[x + y * DISPLAY_WIDTH]
        } else {
            false
        }
    }

    /// Set a single pixel. Out of bounds coordinates are ignored.
    ///
    /// This does not flag the buffer for redraw, since instructions
    /// only change the display via [`Display::clear`] and [`Display::draw_sprite`].
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x < DISPLAY_WIDTH && y < DISPLAY_HEIGHT {
            self.pixels[x + y * DISPLAY_WIDTH] = value;
        }
    }

    /// Raw row-major pixel buffer.
    pub fn pixels(&self) -> &[bool; DISPLAY_BUFFER_SIZE] {
        &self.pixels
    }

    pub fn clear(&mut self) {
        self.pixels.fill(false);
        self.redraw = true;
    }

    /// XOR a sprite onto the buffer at the given coordinate.
    ///
    /// Each row is 8 pixels, most significant bit on the left. Pixels that fall
    /// outside the display wrap around to the opposite side. Only the first
    /// 15 rows are drawn.
    ///
    /// Returns `true` when any pixel was switched off by the draw.
    pub fn draw_sprite(&mut self, x: usize, y: usize, rows: &[u8]) -> bool {
        let mut is_erased = false;

        for (r, &row) in rows.iter().take(SPRITE_MAX_HEIGHT).enumerate() {
            let py = (y + r) % DISPLAY_HEIGHT;

            for c in 0..SPRITE_WIDTH {
                if (row >> (7 - c)) & 1 == 0 {
                    continue;
                }

                let px = (x + c) % DISPLAY_WIDTH;
                let cell = &mut self.pixels[px + py * DISPLAY_WIDTH];

                // XOR erases a pixel when both the old and new values are 1.
                is_erased |= *cell;
                *cell = !*cell;
            }
        }

        self.redraw = true;
        is_erased
    }

    /// Whether the buffer changed since the renderer last acknowledged it.
    #[inline(always)]
    pub fn needs_redraw(&self) -> bool {
        self.redraw
    }

    /// Called by the renderer once it has presented the buffer.
    #[inline(always)]
    pub fn acknowledge_redraw(&mut self) {
        self.redraw = false;
    }
}

/// Text rendering, one character per pixel.
impl fmt::Display for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.pixels.chunks(DISPLAY_WIDTH) {
            for px in row {
                f.write_str(if *px { "#" } else { "." })?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_get_set_bounds() {
        let mut display = Display::new();

        display.set(3, 4, true);
        assert!(display.get(3, 4));
        assert!(!display.get(4, 3));

        display.set(DISPLAY_WIDTH, 0, true);
        display.set(0, DISPLAY_HEIGHT, true);
        assert!(!display.get(DISPLAY_WIDTH, 0));
        assert!(!display.get(0, DISPLAY_HEIGHT));
        assert_eq!(display.pixels().iter().filter(|px| **px).count(), 1);
        assert!(!display.needs_redraw());
    }

    #[test]
    fn test_draw_collision() {
        let mut display = Display::new();

        // Draw two sprites next to each other. The zero bits
        // of the second draw must not erase the first.
        //
        // ____####, vf == 0
        // ########, vf == 0
        assert!(!display.draw_sprite(4, 0, &[0b11110000]));
        assert!(!display.draw_sprite(0, 0, &[0b11110000]));
        assert!((0..8).all(|x| display.get(x, 0)));

        // Overlap erases.
        assert!(display.draw_sprite(0, 0, &[0b10000000]));
        assert!(!display.get(0, 0));
        assert!(display.get(1, 0));
    }

    #[test]
    fn test_collision_sticks_across_rows() {
        let mut display = Display::new();
        display.set(0, 0, true);

        // Collision happens on the first row, the last row draws clean.
        assert!(display.draw_sprite(0, 0, &[0x80, 0x00, 0x80]));
        assert!(!display.get(0, 0));
        assert!(display.get(0, 2));
    }

    #[test]
    fn test_draw_wraps() {
        let mut display = Display::new();

        display.draw_sprite(60, 30, &[0xFF, 0xFF, 0xFF]);

        // Right half wraps to the left edge.
        for x in [60, 61, 62, 63, 0, 1, 2, 3] {
            assert!(display.get(x, 30), "column {x}");
            assert!(display.get(x, 31), "column {x}");
            assert!(display.get(x, 0), "column {x}");
        }
        assert!(!display.get(4, 30));
        assert!(!display.get(59, 30));
        assert!(!display.get(0, 1));
    }

    #[test]
    fn test_draw_limits_rows() {
        let mut display = Display::new();

        display.draw_sprite(0, 0, &[0x80; 20]);

        assert!(display.get(0, 14));
        assert!(!display.get(0, 15));
    }

    #[test]
    fn test_redraw_flag() {
        let mut display = Display::new();
        assert!(!display.needs_redraw());

        display.draw_sprite(0, 0, &[0x80]);
        assert!(display.needs_redraw());

        display.acknowledge_redraw();
        assert!(!display.needs_redraw());

        display.clear();
        assert!(display.needs_redraw());
        assert!(!display.get(0, 0));
    }

    #[test]
    fn test_text_dump() {
        let mut display = Display::new();
        display.draw_sprite(0, 0, &[0b10100000]);

        let text = display.to_string();
        let first = text.lines().next().unwrap();
        assert!(first.starts_with("#.#."));
        assert_eq!(first.len(), DISPLAY_WIDTH);
        assert_eq!(text.lines().count(), DISPLAY_HEIGHT);
    }
}
