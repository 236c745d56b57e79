pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

/// Monochrome 64x32 display, indexed `[x][y]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    buffer: [[bool; DISPLAY_HEIGHT]; DISPLAY_WIDTH],
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self {
            buffer: [[false; DISPLAY_HEIGHT]; DISPLAY_WIDTH],
        }
    }
}

impl Framebuffer {
    pub fn clear(&mut self) {
        self.buffer = [[false; DISPLAY_HEIGHT]; DISPLAY_WIDTH];
    }

    /// Whether the pixel at (`x`, `y`) is lit. Coordinates outside the screen are never lit.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.buffer
            .get(x)
            .and_then(|column| column.get(y))
            .copied()
            .unwrap_or(false)
    }

    /// Row `y` as a bit mask, the most significant bit being column 0
    pub fn row(&self, y: usize) -> u64 {
        (0..DISPLAY_WIDTH).fold(0, |bits, x| (bits << 1) | self.pixel(x, y) as u64)
    }

    pub fn rows(&self) -> impl Iterator<Item = u64> + '_ {
        (0..DISPLAY_HEIGHT).map(|y| self.row(y))
    }

    pub fn lit_count(&self) -> usize {
        self.buffer.iter().flatten().filter(|&&lit| lit).count()
    }

    /// XOR an 8 pixel wide sprite onto the screen with its top-left corner at
    /// (`x`, `y`), both reduced modulo the screen size first. Pixels past the
    /// right or bottom edge are clipped, or wrapped around if `wrap` is set.
    ///
    /// Returns whether any lit pixel was turned off.
    pub fn draw_sprite(&mut self, x: u8, y: u8, sprite: &[u8], wrap: bool) -> bool {
        let x = x as usize % DISPLAY_WIDTH;
        let y = y as usize % DISPLAY_HEIGHT;

        let mut collision = false;

        for (i, sprite_row) in sprite.iter().enumerate() {
            let mut py = y + i;
            if py >= DISPLAY_HEIGHT {
                if !wrap {
                    break;
                }
                py %= DISPLAY_HEIGHT;
            }

            for j in 0..8 {
                let mut px = x + j;
                if px >= DISPLAY_WIDTH {
                    if !wrap {
                        break;
                    }
                    px %= DISPLAY_WIDTH;
                }

                if (sprite_row >> (7 - j)) & 0b1 == 1 {
                    let pixel = &mut self.buffer[px][py];
                    collision |= *pixel;
                    *pixel = !*pixel;
                }
            }
        }

        collision
    }
}
