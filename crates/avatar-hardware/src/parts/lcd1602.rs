use crate::error::Result;
use crate::pins::{I2cDevice, PinDriver};
use crate::traits::{RenderedText, TextOutput};
use avatar_core::constants::{LCD1602_DEFAULT_COLUMNS, LCD1602_DEFAULT_ROWS};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::trace;

// HD44780 commands
const CLEAR_DISPLAY: u8 = 0x01;
const RETURN_HOME: u8 = 0x02;
const ENTRY_MODE_SET: u8 = 0x04;
const DISPLAY_CONTROL: u8 = 0x08;
const FUNCTION_SET: u8 = 0x20;
const SET_DDRAM_ADDR: u8 = 0x80;

// Command flags
const ENTRY_LEFT: u8 = 0x02;
const DISPLAY_ON: u8 = 0x04;
const TWO_LINE: u8 = 0x08;

// PCF8574 backpack bits
const BACKLIGHT: u8 = 0x08;
const ENABLE: u8 = 0x04;
const REGISTER_SELECT: u8 = 0x01;

const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

/// Execution time of a clear or return-home command.
const CLEAR_SETTLE: Duration = Duration::from_micros(1600);

/// Pause after each drawn row, long enough for the last character write.
const ROW_SETTLE: Duration = Duration::from_micros(50);

/// Character grid of an LCD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcdGeometry {
    pub columns: usize,
    pub rows: usize,
}

impl Default for LcdGeometry {
    fn default() -> Self {
        Self {
            columns: LCD1602_DEFAULT_COLUMNS,
            rows: LCD1602_DEFAULT_ROWS,
        }
    }
}

impl LcdGeometry {
    /// Geometry from optional configured values, falling back to 16x2.
    ///
    /// Rows are capped at four, the most an HD44780 can address.
    #[must_use]
    pub fn from_config(columns: Option<usize>, rows: Option<usize>) -> Self {
        let default = Self::default();
        Self {
            columns: columns.filter(|&c| c > 0).unwrap_or(default.columns),
            rows: rows
                .filter(|&r| r > 0)
                .unwrap_or(default.rows)
                .min(ROW_OFFSETS.len()),
        }
    }
}

/// HD44780 character LCD driven in 4-bit mode through a PCF8574 backpack.
#[derive(Debug)]
pub struct Lcd1602 {
    device: Box<dyn I2cDevice>,
    geometry: LcdGeometry,
    backlight: AtomicBool,
    clear_pending: AtomicBool,
}

impl Lcd1602 {
    /// Open the backpack at `address` on `bus`, initialise the controller
    /// and switch the backlight on.
    ///
    /// # Errors
    /// Returns an error if the device cannot be opened or does not accept
    /// the initialisation sequence.
    pub fn new(
        driver: &dyn PinDriver,
        bus: u8,
        address: u16,
        geometry: LcdGeometry,
        name: &str,
    ) -> Result<Self> {
        let lcd = Self {
            device: driver.i2c_device(bus, address, name)?,
            geometry,
            backlight: AtomicBool::new(false),
            clear_pending: AtomicBool::new(false),
        };
        lcd.initialize()?;
        Ok(lcd)
    }

    #[must_use]
    pub fn geometry(&self) -> LcdGeometry {
        self.geometry
    }

    // Runs once at construction, before the display is handed to any task,
    // so the controller's settle times are waited out in place.
    fn initialize(&self) -> Result<()> {
        for nibble in [0x03, 0x03, 0x03, 0x02] {
            self.command(nibble)?;
            std::thread::sleep(CLEAR_SETTLE);
        }
        self.command(FUNCTION_SET | TWO_LINE)?;
        self.command(DISPLAY_CONTROL | DISPLAY_ON)?;
        self.command(ENTRY_MODE_SET | ENTRY_LEFT)?;
        self.command(RETURN_HOME)?;
        self.command(CLEAR_DISPLAY)?;
        std::thread::sleep(CLEAR_SETTLE);
        self.set_backlight(true)
    }

    /// Switch the backlight.
    ///
    /// # Errors
    /// Returns an error if the bus write fails.
    pub fn set_backlight(&self, on: bool) -> Result<()> {
        self.backlight.store(on, Ordering::Release);
        self.device.write_byte(if on { BACKLIGHT } else { 0 })
    }

    fn backlight_bits(&self) -> u8 {
        if self.backlight.load(Ordering::Acquire) {
            BACKLIGHT
        } else {
            0
        }
    }

    fn command(&self, byte: u8) -> Result<()> {
        self.send(byte, 0)
    }

    fn write_char(&self, c: char) -> Result<()> {
        let code = if c.is_ascii() { c as u8 } else { b'?' };
        self.send(code, REGISTER_SELECT)
    }

    fn send(&self, byte: u8, mode: u8) -> Result<()> {
        self.write_nibble(mode | (byte & 0xF0))?;
        self.write_nibble(mode | ((byte << 4) & 0xF0))
    }

    fn write_nibble(&self, data: u8) -> Result<()> {
        let light = self.backlight_bits();
        self.device.write_byte(data | ENABLE | light)?;
        self.device.write_byte((data & !ENABLE) | light)
    }

    fn set_cursor(&self, row: usize, column: usize) -> Result<()> {
        let offset = ROW_OFFSETS[row.min(ROW_OFFSETS.len() - 1)];
        self.command(SET_DDRAM_ADDR | (offset + column as u8))
    }

    /// Split text into display lines.
    ///
    /// Lines break on `'\n'` and wrap at the column count; a space that
    /// would start a wrapped line is dropped. Text past the last row is
    /// discarded.
    #[must_use]
    pub fn layout(&self, text: &str) -> Vec<String> {
        let LcdGeometry { columns, rows } = self.geometry;
        let mut lines = vec![String::new(); rows];
        let mut row = 0;
        let mut chars = text.chars().peekable();

        while let Some(&c) = chars.peek() {
            if row >= rows {
                break;
            }
            if c == '\n' {
                row += 1;
                chars.next();
                continue;
            }
            if lines[row].chars().count() >= columns {
                row += 1;
                if c == ' ' {
                    chars.next();
                }
                continue;
            }
            lines[row].push(c);
            chars.next();
        }

        lines
    }

    /// Draw row by row, yielding to the runtime between rows instead of
    /// sleeping the worker thread.
    async fn draw(&self, text: &str) -> Result<()> {
        if self.clear_pending.swap(false, Ordering::AcqRel) {
            tokio::time::sleep(CLEAR_SETTLE).await;
        }
        for (row, line) in self.layout(text).iter().enumerate() {
            self.set_cursor(row, 0)?;
            let padded = format!("{line:<width$}", width = self.geometry.columns);
            for c in padded.chars() {
                self.write_char(c)?;
            }
            tokio::time::sleep(ROW_SETTLE).await;
        }
        Ok(())
    }
}

impl TextOutput for Lcd1602 {
    fn width(&self) -> usize {
        self.geometry.columns * self.geometry.rows
    }

    fn render(&self, number: Option<f64>, text: Option<&str>) -> Option<RenderedText> {
        let raw = match (number, text) {
            (Some(n), _) => n.to_string(),
            (None, Some(t)) if !t.is_empty() => t.to_string(),
            _ => return None,
        };

        // Newlines take no cell.
        let mut cells = 0;
        let text: String = raw
            .chars()
            .take_while(|&c| {
                if c != '\n' {
                    cells += 1;
                }
                cells <= self.width()
            })
            .collect();

        Some(RenderedText {
            text,
            dot_after: None,
        })
    }

    async fn show(&self, content: &RenderedText, hold: Option<Duration>) -> Result<()> {
        trace!(text = %content.text, "Drawing LCD text");
        self.draw(&content.text).await?;

        if let Some(hold) = hold.filter(|h| !h.is_zero()) {
            tokio::time::sleep(hold).await;
            self.clear()?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.command(RETURN_HOME)?;
        self.command(CLEAR_DISPLAY)?;
        self.clear_pending.store(true, Ordering::Release);
        Ok(())
    }
}
