/*
 *  display/window.rs
 *
 *  oledstream - pixels straight down the wire
 *  (c) 2020-26 Stuart Hunter
 *
 *  Address window arithmetic shared by the chip drivers
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

//! Every value here ends up verbatim in a column/row address register, so
//! all bounds are inclusive and clipped to the last valid pixel.

/// Rows per page on page-addressed controllers
pub const PAGE_HEIGHT: u32 = 8;

/// Inclusive pixel rectangle armed on the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub x_start: u32,
    pub x_end: u32,
    pub y_start: u32,
    pub y_end: u32,
}

impl Window {
    pub fn width(&self) -> u32 {
        self.x_end - self.x_start + 1
    }

    pub fn height(&self) -> u32 {
        self.y_end - self.y_start + 1
    }

    pub fn area(&self) -> u32 {
        self.width() * self.height()
    }

    /// First page index covered (page-addressed chips)
    pub fn page_start(&self) -> u32 {
        self.y_start / PAGE_HEIGHT
    }

    /// Last page index covered (page-addressed chips)
    pub fn page_end(&self) -> u32 {
        self.y_end / PAGE_HEIGHT
    }
}

fn column_end(x: u32, width: u32, surface_width: u32) -> u32 {
    let last = surface_width - 1;
    if width == 0 {
        last
    } else {
        x.saturating_add(width - 1).min(last)
    }
}

/// Window for page addressing: `page` selects an 8-row band
pub fn page_window(x: u32, page: u32, width: u32, surface: (u32, u32)) -> Window {
    let (w, h) = surface;
    let x_start = x.min(w - 1);
    let top = page.saturating_mul(PAGE_HEIGHT);
    let y_start = top.min(h - 1);
    Window {
        x_start,
        x_end: column_end(x_start, width, w).max(x_start),
        y_start,
        y_end: top.saturating_add(PAGE_HEIGHT - 1).min(h - 1),
    }
}

/// Window for row addressing: from pixel row `y` down to `y_end`, or to the
/// bottom edge when no end is given
pub fn row_window(x: u32, y: u32, width: u32, y_end: Option<u32>, surface: (u32, u32)) -> Window {
    let (w, h) = surface;
    let x_start = x.min(w - 1);
    let y_start = y.min(h - 1);
    let bottom = y_end.unwrap_or(h - 1).min(h - 1).max(y_start);
    Window {
        x_start,
        x_end: column_end(x_start, width, w).max(x_start),
        y_start,
        y_end: bottom,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_window_second_page() {
        let win = page_window(10, 1, 20, (128, 128));
        assert_eq!((win.x_start, win.x_end), (10, 29));
        assert_eq!((win.y_start, win.y_end), (8, 15));
    }

    #[test]
    fn test_zero_width_runs_to_right_edge() {
        let win = page_window(100, 0, 0, (128, 64));
        assert_eq!((win.x_start, win.x_end), (100, 127));
        assert_eq!(win.width(), 28);
    }

    #[test]
    fn test_page_window_clipped_at_bottom() {
        // 128x32 panel has pages 0..=3
        let win = page_window(0, 3, 8, (128, 32));
        assert_eq!((win.y_start, win.y_end), (24, 31));
        let win = page_window(0, 7, 8, (128, 60));
        assert_eq!(win.y_end, 59);
    }

    #[test]
    fn test_page_window_clipped_at_right() {
        let win = page_window(120, 0, 20, (128, 64));
        assert_eq!((win.x_start, win.x_end), (120, 127));
        assert_eq!(win.page_start(), 0);
        assert_eq!(win.page_end(), 0);
    }

    #[test]
    fn test_row_window_to_bottom() {
        let win = row_window(5, 10, 3, None, (128, 128));
        assert_eq!((win.x_start, win.x_end), (5, 7));
        assert_eq!((win.y_start, win.y_end), (10, 127));
    }

    #[test]
    fn test_row_window_explicit_end() {
        let win = row_window(0, 10, 0, Some(12), (96, 64));
        assert_eq!((win.x_end, win.y_end), (95, 12));
        assert_eq!(win.area(), 96 * 3);
    }

    #[test]
    fn test_huge_width_and_page_saturate() {
        let win = page_window(10, 0, u32::MAX, (128, 128));
        assert_eq!((win.x_start, win.x_end), (10, 127));
        let win = page_window(0, u32::MAX, 8, (128, 64));
        assert_eq!((win.y_start, win.y_end), (63, 63));
        let win = row_window(u32::MAX, 3, u32::MAX, None, (128, 128));
        assert_eq!((win.x_start, win.x_end), (127, 127));
    }

    #[test]
    fn test_single_pixel_window() {
        let win = row_window(127, 127, 1, Some(127), (128, 128));
        assert_eq!(win.area(), 1);
    }
}
