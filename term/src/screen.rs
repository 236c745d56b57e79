//! Terminal output. Two framebuffer rows share one text row, drawn with
//! half-block glyphs so the 64x32 display fits in 64x16 cells.

use chip8vm_core::{DISPLAY_HEIGHT, DISPLAY_WIDTH, Framebuffer};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::Print,
    terminal::{
        self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen,
        supports_keyboard_enhancement,
    },
};
use std::io::{self, Stdout, Write};

const STATUS_ROW: u16 = (DISPLAY_HEIGHT / 2) as u16 + 1;

/// The display as `#` and `.`, one line per framebuffer row
pub fn render_text(framebuffer: &Framebuffer) -> String {
    let mut text = String::with_capacity((DISPLAY_WIDTH + 1) * DISPLAY_HEIGHT);
    for y in 0..DISPLAY_HEIGHT {
        for x in 0..DISPLAY_WIDTH {
            text.push(if framebuffer.pixel(x, y) { '#' } else { '.' });
        }
        text.push('\n');
    }
    text
}

/// The display as half-block glyphs, one line per pair of framebuffer rows
pub fn half_blocks(framebuffer: &Framebuffer) -> Vec<String> {
    (0..DISPLAY_HEIGHT)
        .step_by(2)
        .map(|y| {
            (0..DISPLAY_WIDTH)
                .map(|x| match (framebuffer.pixel(x, y), framebuffer.pixel(x, y + 1)) {
                    (false, false) => ' ',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (true, true) => '█',
                })
                .collect()
        })
        .collect()
}

/// Owns the terminal while the interpreter runs.
/// Raw mode and the alternate screen are undone on drop.
pub struct Screen {
    stdout: Stdout,
    key_release_events: bool,
}

impl Screen {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, Hide, Clear(ClearType::All))?;

        let key_release_events = matches!(supports_keyboard_enhancement(), Ok(true));
        if key_release_events {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        } else {
            log::info!("Terminal does not report key releases, keys expire after a short hold");
        }

        Ok(Self {
            stdout,
            key_release_events,
        })
    }

    /// Whether the terminal sends an event when a key is let go
    pub fn reports_key_release(&self) -> bool {
        self.key_release_events
    }

    pub fn draw(&mut self, framebuffer: &Framebuffer, tone: bool) -> io::Result<()> {
        for (row, line) in half_blocks(framebuffer).into_iter().enumerate() {
            queue!(self.stdout, MoveTo(0, row as u16), Print(line))?;
        }
        queue!(
            self.stdout,
            MoveTo(0, STATUS_ROW),
            Print(if tone { "[BEEP]" } else { "[    ]" }),
            Print("  Esc to quit"),
        )?;
        self.stdout.flush()
    }

    /// Terminal bell
    pub fn bell(&mut self) -> io::Result<()> {
        queue!(self.stdout, Print('\x07'))?;
        self.stdout.flush()
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        if self.key_release_events {
            let _ = execute!(self.stdout, PopKeyboardEnhancementFlags);
        }
        let _ = execute!(self.stdout, Show, LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_square() -> Framebuffer {
        let mut framebuffer = Framebuffer::default();
        // 3x3 square at (1, 1)
        framebuffer.draw_sprite(1, 1, &[0xE0, 0xE0, 0xE0], false);
        framebuffer
    }

    #[test]
    fn text_has_one_line_per_row() {
        let text = render_text(&Framebuffer::default());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), DISPLAY_HEIGHT);
        assert!(lines.iter().all(|line| *line == ".".repeat(DISPLAY_WIDTH)));
    }

    #[test]
    fn text_marks_lit_pixels() {
        let text = render_text(&with_square());
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines[0].chars().all(|c| c == '.'));
        for line in &lines[1..4] {
            assert!(line.starts_with(".###."));
        }
        assert!(lines[4].chars().all(|c| c == '.'));
        assert_eq!(text.matches('#').count(), 9);
    }

    #[test]
    fn half_blocks_pair_rows() {
        let lines = half_blocks(&with_square());

        assert_eq!(lines.len(), DISPLAY_HEIGHT / 2);
        assert!(lines.iter().all(|line| line.chars().count() == DISPLAY_WIDTH));
        // rows 0/1, then 2/3
        assert!(lines[0].starts_with(" ▄▄▄ "));
        assert!(lines[1].starts_with(" ███ "));
        assert!(lines[2].trim().is_empty());
    }

    #[test]
    fn half_blocks_upper_pixel() {
        let mut framebuffer = Framebuffer::default();
        framebuffer.draw_sprite(0, 30, &[0x80], false);

        let lines = half_blocks(&framebuffer);
        assert!(lines[15].starts_with('▀'));
    }
}
