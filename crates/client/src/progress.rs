//! Terminal progress indicator
//!
//! The bar is drawn after a package line. Every redraw returns to the start
//! of the line and writes the label again, so the bar is updated in place
//! without cursor escapes and the output stays plain text for any sink. A determinate item fills the bar; an item with unknown
//! completion gets a two-cell pulse that sweeps back and forth, advanced by
//! the driver's timer through [`ProgressRenderer::tick`].

use pkc_types::{Percentage, ProgressSnapshot};
use std::io::{self, Write};

const PULSE: &str = "==";

/// Way the pulse is currently moving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Position of the pulse inside a bar of `width` cells
///
/// The pulse is two cells wide and its position is the 1-based cell of its
/// left half, so it always stays in `1..=width - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseState {
    position: usize,
    direction: Direction,
    width: usize,
}

impl PulseState {
    /// Narrowest bar the pulse fits in with room to move
    pub const MIN_WIDTH: usize = 3;

    #[must_use]
    pub fn new(width: usize) -> Self {
        Self {
            position: 1,
            direction: Direction::Forward,
            width: width.max(Self::MIN_WIDTH),
        }
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn reset(&mut self) {
        self.position = 1;
        self.direction = Direction::Forward;
    }

    /// Move one cell, or turn around when already at an end
    pub fn advance(&mut self) {
        match self.direction {
            Direction::Forward if self.position >= self.width - 1 => {
                self.direction = Direction::Backward;
            }
            Direction::Forward => self.position += 1,
            Direction::Backward if self.position <= 1 => {
                self.direction = Direction::Forward;
            }
            Direction::Backward => self.position -= 1,
        }
    }

    fn cells(&self) -> String {
        format!(
            "{}{PULSE}{}",
            " ".repeat(self.position - 1),
            " ".repeat(self.width - self.position - 1)
        )
    }
}

/// Stateful progress output for one transaction
///
/// Knows nothing about transactions: the driver feeds it package starts,
/// snapshots and timer ticks, and tells it when a line is over.
#[derive(Debug)]
pub struct ProgressRenderer {
    width: usize,
    interactive: bool,
    bar_live: bool,
    awaiting_newline: bool,
    label: String,
    percentage: Percentage,
    last_snapshot: Option<ProgressSnapshot>,
    last_reported: Option<Percentage>,
    pulse: PulseState,
    pulsing: bool,
}

impl ProgressRenderer {
    #[must_use]
    pub fn new(width: usize, interactive: bool) -> Self {
        let pulse = PulseState::new(width);
        Self {
            width: pulse.width,
            interactive,
            bar_live: false,
            awaiting_newline: false,
            label: String::new(),
            percentage: Percentage::Unknown,
            last_snapshot: None,
            last_reported: None,
            pulse,
            pulsing: false,
        }
    }

    #[must_use]
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Whether the pulse timer should be running
    #[must_use]
    pub fn is_pulsing(&self) -> bool {
        self.pulsing
    }

    #[must_use]
    pub fn pulse(&self) -> PulseState {
        self.pulse
    }

    /// Last overall percentage reported by the service
    #[must_use]
    pub fn percentage(&self) -> Percentage {
        self.percentage
    }

    #[must_use]
    pub fn last_snapshot(&self) -> Option<ProgressSnapshot> {
        self.last_snapshot
    }

    /// Start a bar after `label` on the current line
    ///
    /// A bar still drawn on the previous line is completed first.
    ///
    /// # Errors
    ///
    /// Returns any error from writing to `out`.
    pub fn begin_item(&mut self, out: &mut dyn Write, label: &str) -> io::Result<()> {
        self.complete(out)?;
        self.break_line(out)?;
        self.label.clear();
        self.label.push_str(label);
        self.bar_live = true;
        self.draw_fill(out, 0)
    }

    /// Apply a progress update
    ///
    /// # Errors
    ///
    /// Returns any error from writing to `out`.
    pub fn update(&mut self, out: &mut dyn Write, snapshot: ProgressSnapshot) -> io::Result<()> {
        self.last_snapshot = Some(snapshot);
        if !self.interactive {
            if self.last_reported == Some(snapshot.percentage) {
                return Ok(());
            }
            self.last_reported = Some(snapshot.percentage);
            writeln!(out, "percentage: {}", snapshot.percentage)?;
            return out.flush();
        }

        self.percentage = snapshot.percentage;
        match snapshot.subpercentage.known() {
            Some(sub) => {
                self.stop_pulse();
                self.draw_fill(out, sub)
            }
            None => {
                if !self.pulsing {
                    self.pulse.reset();
                    self.pulsing = true;
                }
                self.draw_fill(out, 0)
            }
        }
    }

    /// Advance and redraw the pulse
    ///
    /// # Errors
    ///
    /// Returns any error from writing to `out`.
    pub fn tick(&mut self, out: &mut dyn Write) -> io::Result<()> {
        if !self.pulsing || !self.bar_live {
            return Ok(());
        }
        self.pulse.advance();
        let cells = self.pulse.cells();
        self.draw(out, &cells)
    }

    pub fn stop_pulse(&mut self) {
        self.pulsing = false;
    }

    /// Draw a live bar as full
    ///
    /// # Errors
    ///
    /// Returns any error from writing to `out`.
    pub fn complete(&mut self, out: &mut dyn Write) -> io::Result<()> {
        self.draw_fill(out, 100)
    }

    /// End the line a bar was drawn on, if any
    ///
    /// Anything printed afterwards starts on a fresh line and the old bar is
    /// no longer redrawn.
    ///
    /// # Errors
    ///
    /// Returns any error from writing to `out`.
    pub fn break_line(&mut self, out: &mut dyn Write) -> io::Result<()> {
        self.bar_live = false;
        self.pulsing = false;
        if self.awaiting_newline {
            self.awaiting_newline = false;
            writeln!(out)?;
        }
        Ok(())
    }

    fn draw_fill(&mut self, out: &mut dyn Write, subpercentage: u8) -> io::Result<()> {
        if !self.bar_live {
            return Ok(());
        }
        let filled = filled_cells(self.width, subpercentage);
        let cells = format!("{}{}", "=".repeat(filled), " ".repeat(self.width - filled));
        self.draw(out, &cells)
    }

    fn draw(&mut self, out: &mut dyn Write, cells: &str) -> io::Result<()> {
        write!(out, "\r{} [{cells}] ", self.label)?;
        match self.percentage.known() {
            Some(value) => write!(out, "({value}%)")?,
            None => write!(out, "       ")?,
        }
        self.awaiting_newline = true;
        out.flush()
    }
}

/// Cells filled for a subpercentage, rounded to the nearest cell
#[must_use]
pub fn filled_cells(width: usize, subpercentage: u8) -> usize {
    let sub = usize::from(subpercentage.min(100));
    (width * sub + 50) / 100
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snapshot(percentage: u32, subpercentage: u32) -> ProgressSnapshot {
        ProgressSnapshot::new(
            Percentage::from_raw(percentage),
            Percentage::from_raw(subpercentage),
        )
    }

    fn text(out: &[u8]) -> String {
        String::from_utf8_lossy(out).into_owned()
    }

    #[test]
    fn test_filled_cells_rounds() {
        assert_eq!(filled_cells(15, 0), 0);
        assert_eq!(filled_cells(15, 30), 5);
        assert_eq!(filled_cells(15, 50), 8);
        assert_eq!(filled_cells(15, 100), 15);
        assert_eq!(filled_cells(10, 4), 0);
        assert_eq!(filled_cells(10, 5), 1);
    }

    #[test]
    fn test_pulse_turns_at_both_ends() {
        let mut pulse = PulseState::new(4);
        let mut seen = Vec::new();
        for _ in 0..8 {
            pulse.advance();
            seen.push((pulse.position(), pulse.direction()));
        }
        assert_eq!(
            seen,
            vec![
                (2, Direction::Forward),
                (3, Direction::Forward),
                (3, Direction::Backward),
                (2, Direction::Backward),
                (1, Direction::Backward),
                (1, Direction::Forward),
                (2, Direction::Forward),
                (3, Direction::Forward),
            ]
        );
    }

    #[test]
    fn test_pulse_cells_span_the_bar() {
        let mut pulse = PulseState::new(5);
        assert_eq!(pulse.cells(), "==   ");
        pulse.advance();
        pulse.advance();
        pulse.advance();
        assert_eq!(pulse.cells(), "   ==");
    }

    #[test]
    fn test_determinate_bar() {
        let mut out = Vec::new();
        let mut renderer = ProgressRenderer::new(15, true);
        renderer.begin_item(&mut out, "installing   vim-9.0").unwrap();
        renderer.update(&mut out, snapshot(40, 30)).unwrap();

        let drawn = text(&out);
        assert!(drawn.starts_with("\rinstalling   vim-9.0 ["));
        assert!(drawn.ends_with("\rinstalling   vim-9.0 [=====          ] (40%)"));
        assert!(!drawn.contains('\x1b'));
        assert!(!renderer.is_pulsing());
    }

    #[test]
    fn test_unknown_then_known_subpercentage() {
        let mut out = Vec::new();
        let mut renderer = ProgressRenderer::new(15, true);
        renderer.begin_item(&mut out, "downloading  vim-9.0").unwrap();

        renderer.update(&mut out, snapshot(50, 101)).unwrap();
        assert!(renderer.is_pulsing());
        renderer.tick(&mut out).unwrap();
        renderer.tick(&mut out).unwrap();
        assert_eq!(renderer.pulse().position(), 3);
        assert!(text(&out).ends_with("\rdownloading  vim-9.0 [  ==           ] (50%)"));

        renderer.update(&mut out, snapshot(50, 30)).unwrap();
        assert!(!renderer.is_pulsing());
        assert!(text(&out).ends_with("\rdownloading  vim-9.0 [=====          ] (50%)"));

        let before = out.len();
        renderer.tick(&mut out).unwrap();
        assert_eq!(out.len(), before);
    }

    #[test]
    fn test_unknown_overall_percentage_is_blank() {
        let mut out = Vec::new();
        let mut renderer = ProgressRenderer::new(15, true);
        renderer.begin_item(&mut out, "x").unwrap();
        renderer.update(&mut out, snapshot(101, 100)).unwrap();
        assert!(text(&out).ends_with("[===============]        "));
    }

    #[test]
    fn test_next_item_completes_previous_bar() {
        let mut out = Vec::new();
        let mut renderer = ProgressRenderer::new(15, true);
        renderer.begin_item(&mut out, "first").unwrap();
        renderer.update(&mut out, snapshot(10, 20)).unwrap();
        renderer.begin_item(&mut out, "second").unwrap();

        let drawn = text(&out);
        let first_line = drawn.split('\n').next().unwrap();
        assert!(first_line.ends_with("[===============] (10%)"));
        assert!(drawn.contains("\n\rsecond ["));
        assert!(drawn.ends_with("\rsecond [               ] (10%)"));
    }

    #[test]
    fn test_break_line_only_once() {
        let mut out = Vec::new();
        let mut renderer = ProgressRenderer::new(15, true);
        renderer.break_line(&mut out).unwrap();
        assert!(out.is_empty());

        renderer.begin_item(&mut out, "x").unwrap();
        renderer.break_line(&mut out).unwrap();
        renderer.break_line(&mut out).unwrap();
        assert_eq!(text(&out).matches('\n').count(), 1);

        // the bar is gone, updates no longer redraw it
        let before = out.len();
        renderer.update(&mut out, snapshot(90, 90)).unwrap();
        assert_eq!(out.len(), before);
    }

    #[test]
    fn test_plain_output_prints_each_change_once() {
        let mut out = Vec::new();
        let mut renderer = ProgressRenderer::new(15, false);
        renderer.update(&mut out, snapshot(10, 101)).unwrap();
        renderer.update(&mut out, snapshot(10, 50)).unwrap();
        renderer.update(&mut out, snapshot(101, 50)).unwrap();
        renderer.update(&mut out, snapshot(20, 50)).unwrap();
        assert_eq!(
            text(&out),
            "percentage: 10%\npercentage: unknown\npercentage: 20%\n"
        );
        assert!(!renderer.is_pulsing());
    }

    proptest! {
        #[test]
        fn prop_pulse_stays_inside_bar(width in 3usize..40, steps in 0usize..200) {
            let mut pulse = PulseState::new(width);
            for _ in 0..steps {
                let before = pulse;
                pulse.advance();
                prop_assert!(pulse.position() >= 1 && pulse.position() <= width - 1);
                if pulse.direction() == before.direction() {
                    prop_assert_eq!(pulse.position().abs_diff(before.position()), 1);
                } else {
                    // a turn happens only at an end and does not move
                    prop_assert_eq!(pulse.position(), before.position());
                    prop_assert!(before.position() == 1 || before.position() == width - 1);
                }
            }
        }
    }
}
