#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Text rendition of the tank status readout: a zero-padded percentage and a bar.
use std::io::Write;

use tank_traits::StatusPresenter;

/// Width of the bar in cells, excluding the brackets.
pub const DEFAULT_BAR_WIDTH: usize = 20;

/// `"042%"`; values above 100 are shown as 100.
pub fn format_percent(percent: u8) -> String {
    format!("{:03}%", percent.min(100))
}

/// `[#####.....]` with `width` cells, filled proportionally (truncating).
pub fn render_bar(percent: u8, width: usize) -> String {
    let filled = width * usize::from(percent.min(100)) / 100;
    let mut s = String::with_capacity(width + 2);
    s.push('[');
    s.extend(std::iter::repeat_n('#', filled));
    s.extend(std::iter::repeat_n('.', width - filled));
    s.push(']');
    s
}

/// Full status line: `"042% [########............]"`.
pub fn status_line(percent: u8, width: usize) -> String {
    format!("{} {}", format_percent(percent), render_bar(percent, width))
}

/// Writes a status line whenever the percentage changes.
pub struct ConsolePresenter<W: Write> {
    out: W,
    width: usize,
    last: Option<u8>,
}

impl ConsolePresenter<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(std::io::stderr(), DEFAULT_BAR_WIDTH)
    }
}

impl<W: Write> ConsolePresenter<W> {
    pub fn new(out: W, width: usize) -> Self {
        Self {
            out,
            width,
            last: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> StatusPresenter for ConsolePresenter<W> {
    fn render(&mut self, percent: u8) {
        if self.last == Some(percent) {
            return;
        }
        self.last = Some(percent);
        let line = status_line(percent, self.width);
        if let Err(e) = writeln!(self.out, "{line}").and_then(|()| self.out.flush()) {
            tracing::debug!(error = %e, "status line not written");
        }
    }
}
