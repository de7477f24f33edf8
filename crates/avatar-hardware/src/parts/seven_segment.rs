use crate::error::Result;
use crate::pins::{DigitalOutput, PinDriver};
use crate::traits::{RenderedText, TextOutput};
use avatar_core::PinLevel;
use avatar_core::constants::{SEVEN_SEGMENT_DIGITS, SEVEN_SEGMENT_FRAME_MILLIS, SEVEN_SEGMENT_PIN_COUNT};
use std::time::Duration;

// Offsets into the twelve configured pins (`pin01` is offset 0).
const DIGIT_SELECT: [usize; SEVEN_SEGMENT_DIGITS] = [11, 8, 7, 5];
const SEGMENTS: [usize; 7] = [0, 9, 10, 6, 3, 1, 4];
const DOT: usize = 2;

/// Segment levels for one character, active low.
///
/// Segments are ordered from the bottom-left one clockwise, with the
/// middle bar last. Characters without a glyph are blank.
///
/// # Examples
///
/// ```
/// use avatar_core::PinLevel::{High, Low};
/// use avatar_hardware::parts::segment_levels;
///
/// assert_eq!(segment_levels('8'), [Low; 7]);
/// assert_eq!(segment_levels('-'), [High, High, High, High, High, High, Low]);
/// ```
#[must_use]
pub fn segment_levels(symbol: char) -> [PinLevel; 7] {
    let bits: [u8; 7] = match symbol {
        '0' | 'o' | 'O' => [0, 0, 0, 0, 0, 0, 1],
        '1' | 'i' | 'I' => [1, 1, 1, 0, 0, 1, 1],
        '2' => [0, 1, 0, 0, 1, 0, 0],
        '3' => [1, 1, 0, 0, 0, 0, 0],
        '4' => [1, 0, 1, 0, 0, 1, 0],
        '5' => [1, 0, 0, 1, 0, 0, 0],
        '6' => [0, 0, 0, 1, 0, 0, 0],
        '7' => [1, 1, 0, 0, 0, 1, 1],
        '8' => [0, 0, 0, 0, 0, 0, 0],
        '9' => [1, 0, 0, 0, 0, 1, 0],
        'l' | 'L' => [0, 0, 1, 1, 1, 0, 1],
        '_' => [1, 1, 1, 1, 1, 0, 1],
        '-' => [1, 1, 1, 1, 1, 1, 0],
        _ => [1; 7],
    };
    bits.map(|bit| PinLevel::from(bit == 1))
}

/// 3461BS-1 four-digit seven-segment display, wired pin for pin.
///
/// Only one digit is lit at a time; showing text means cycling through the
/// digits fast enough that the eye sees all of them.
#[derive(Debug)]
pub struct SevenSegment3461Bs1 {
    outputs: Vec<Box<dyn DigitalOutput>>,
}

impl SevenSegment3461Bs1 {
    /// Claim the twelve display pins, `pins[0]` being the display's pin 1.
    ///
    /// # Errors
    /// Returns an error if any pin cannot be claimed.
    pub fn new(
        driver: &dyn PinDriver,
        pins: [u8; SEVEN_SEGMENT_PIN_COUNT],
        name: &str,
    ) -> Result<Self> {
        let outputs = pins
            .iter()
            .map(|&pin| driver.digital_output(pin, name))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { outputs })
    }

    fn select_digit(&self, digit: usize) -> Result<()> {
        for (i, &offset) in DIGIT_SELECT.iter().enumerate() {
            self.outputs[offset].set_state(PinLevel::from(i == digit))?;
        }
        Ok(())
    }

    fn draw_symbol(&self, symbol: char, dot: bool) -> Result<()> {
        for (&offset, level) in SEGMENTS.iter().zip(segment_levels(symbol)) {
            self.outputs[offset].set_state(level)?;
        }
        self.outputs[DOT].set_state(PinLevel::from(!dot))
    }
}

impl TextOutput for SevenSegment3461Bs1 {
    fn width(&self) -> usize {
        SEVEN_SEGMENT_DIGITS
    }

    fn render(&self, number: Option<f64>, text: Option<&str>) -> Option<RenderedText> {
        let raw = match (number, text) {
            // Adding zero turns -0.0 into 0.0.
            (Some(n), _) if n.is_finite() && n.fract() == 0.0 => format!("{:.0}", n + 0.0),
            (Some(n), _) => n.to_string(),
            (None, Some(t)) if !t.is_empty() => t.to_string(),
            _ => return None,
        };

        let dot_after = raw
            .chars()
            .position(|c| c == '.')
            .filter(|&index| index > 0)
            .map(|index| index - 1);

        let text: String = raw
            .chars()
            .filter(|&c| c != '.')
            .take(self.width())
            .collect();

        if text.is_empty() {
            return None;
        }

        Some(RenderedText { text, dot_after })
    }

    async fn show(&self, content: &RenderedText, hold: Option<Duration>) -> Result<()> {
        let symbols: Vec<char> = content.text.chars().take(self.width()).collect();
        if symbols.is_empty() {
            return Ok(());
        }

        let per_digit = Duration::from_millis(SEVEN_SEGMENT_FRAME_MILLIS / symbols.len() as u64);
        let hold = hold.filter(|h| !h.is_zero());
        let mut shown = Duration::ZERO;

        while hold.is_none_or(|h| shown <= h) {
            for (digit, &symbol) in symbols.iter().enumerate() {
                tokio::time::sleep(per_digit).await;
                shown += per_digit;
                self.select_digit(digit)?;
                self.draw_symbol(symbol, content.dot_after == Some(digit))?;
            }
        }

        self.clear()
    }

    fn clear(&self) -> Result<()> {
        for digit in 0..SEVEN_SEGMENT_DIGITS {
            self.select_digit(digit)?;
            self.draw_symbol(' ', false)?;
        }
        Ok(())
    }
}
