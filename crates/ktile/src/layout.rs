use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MAX_MASTER_COUNT: i64 = 100;
pub const MIN_MASTER_FACTOR: f64 = 0.05;
pub const MAX_MASTER_FACTOR: f64 = 0.95;
pub const MAX_GAPS: i64 = 200;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rectangle {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x as f64
            && x < (self.x + self.width) as f64
            && y >= self.y as f64
            && y < (self.y + self.height) as f64
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// A `width`x`height` box centered in `self`.
    pub fn centered(&self, width: i32, height: i32) -> Rectangle {
        Rectangle {
            x: self.x + (self.width - width) / 2,
            y: self.y + (self.height - height) / 2,
            width,
            height,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TilingMode {
    #[default]
    Traditional,
    None,
}

impl FromStr for TilingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "traditional" => Ok(TilingMode::Traditional),
            "none" => Ok(TilingMode::None),
            other => Err(format!("unknown tiling mode '{}'", other)),
        }
    }
}

impl fmt::Display for TilingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TilingMode::Traditional => "traditional",
            TilingMode::None => "none",
        })
    }
}

/// Per-workspace master/stack parameters. Setters clamp instead of
/// rejecting out-of-range input.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TilingParams {
    pub master_count: u32,
    pub master_factor: f64,
    pub right_master: bool,
}

impl Default for TilingParams {
    fn default() -> Self {
        Self {
            master_count: 1,
            master_factor: 0.55,
            right_master: false,
        }
    }
}

impl TilingParams {
    pub fn new(master_count: i64, master_factor: f64, right_master: bool) -> Self {
        Self {
            master_count: clamp_master_count(master_count),
            master_factor: clamp_master_factor(master_factor),
            right_master,
        }
    }

    pub fn set_master_count(&mut self, count: i64) {
        self.master_count = clamp_master_count(count);
    }

    pub fn set_master_factor(&mut self, factor: f64) {
        self.master_factor = clamp_master_factor(factor);
    }
}

pub fn clamp_master_count(count: i64) -> u32 {
    count.clamp(0, MAX_MASTER_COUNT) as u32
}

pub fn clamp_master_factor(factor: f64) -> f64 {
    if factor.is_nan() {
        return TilingParams::default().master_factor;
    }
    factor.clamp(MIN_MASTER_FACTOR, MAX_MASTER_FACTOR)
}

pub fn clamp_gaps(gaps: i64) -> i32 {
    gaps.clamp(0, MAX_GAPS) as i32
}

/// Master/stack layout. The first `master_count` entries of `views` fill the
/// master column, the rest fill the stack column. Each column is split into
/// equal rows separated by `gaps`, with the rounding remainder going to the
/// lower rows so every column spans exactly `area.height`.
pub fn tile<T: Copy>(
    views: &[T],
    params: &TilingParams,
    area: Rectangle,
    gaps: i32,
) -> Vec<(T, Rectangle)> {
    let n = views.len();
    let mut out = Vec::with_capacity(n);
    if n == 0 {
        return out;
    }

    let master_rows = n.min(params.master_count as usize);
    let (masters, stack) = views.split_at(master_rows);

    // A column that holds every view spans the full usable width. With no
    // masters there is no empty master strip; the stack starts at one gap.
    let master_width = if masters.is_empty() {
        0
    } else if stack.is_empty() {
        area.width - gaps
    } else {
        ((area.width + gaps) as f64 * params.master_factor).floor() as i32
    };

    let (master_x, stack_x) = if params.right_master {
        (area.x + area.width - master_width, area.x + gaps)
    } else {
        (area.x + gaps, area.x + master_width + gaps)
    };

    stack_column(masters, master_x, master_width - gaps, area, gaps, &mut out);
    stack_column(
        stack,
        stack_x,
        area.width - master_width - 2 * gaps,
        area,
        gaps,
        &mut out,
    );

    out
}

fn stack_column<T: Copy>(
    views: &[T],
    x: i32,
    width: i32,
    area: Rectangle,
    gaps: i32,
    out: &mut Vec<(T, Rectangle)>,
) {
    let rows = views.len() as i32;
    let mut y = area.y + gaps;

    for (i, view) in views.iter().enumerate() {
        let remaining = rows - i as i32;
        let used = y - area.y;
        let height = (area.height - used - gaps * remaining) / remaining;
        out.push((
            *view,
            Rectangle {
                x,
                y,
                width: width.max(0),
                height: height.max(0),
            },
        ));
        y += height + gaps;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AREA: Rectangle = Rectangle {
        x: 0,
        y: 30,
        width: 1920,
        height: 1050,
    };

    fn params(master_count: i64, right_master: bool) -> TilingParams {
        TilingParams::new(master_count, 0.5, right_master)
    }

    fn column_span(rects: &[Rectangle], gaps: i32) -> i32 {
        rects.iter().map(|r| r.height).sum::<i32>() + gaps * (rects.len() as i32 + 1)
    }

    #[test]
    fn empty_input_yields_nothing() {
        let views: [u32; 0] = [];
        assert!(tile(&views, &params(1, false), AREA, 10).is_empty());
    }

    #[test]
    fn single_view_fills_area_minus_gaps() {
        let out = tile(&[7u32], &params(1, false), AREA, 10);
        assert_eq!(out, vec![(7, Rectangle::new(10, 40, 1900, 1030))]);
    }

    #[test]
    fn master_and_stack_split() {
        let out = tile(&[1u32, 2, 3], &params(1, false), AREA, 0);
        assert_eq!(out[0], (1, Rectangle::new(0, 30, 960, 1050)));
        assert_eq!(out[1], (2, Rectangle::new(960, 30, 960, 525)));
        assert_eq!(out[2], (3, Rectangle::new(960, 555, 960, 525)));
    }

    #[test]
    fn right_master_mirrors_columns() {
        let out = tile(&[1u32, 2], &params(1, true), AREA, 10);
        let master = out[0].1;
        let stack = out[1].1;
        assert_eq!(master.x + master.width, AREA.x + AREA.width - 10);
        assert_eq!(stack.x, AREA.x + 10);
        assert_eq!(stack.x + stack.width + 10, master.x);
    }

    #[test]
    fn zero_masters_puts_everything_in_stack() {
        let out = tile(&[1u32, 2], &params(0, false), AREA, 10);
        for (_, r) in &out {
            assert_eq!(r.x, 10);
            assert_eq!(r.width, 1900);
        }
    }

    #[test]
    fn columns_span_the_area_height() {
        for gaps in [0, 7, 10] {
            for n in 0..9usize {
                let views: Vec<usize> = (0..n).collect();
                for m in 0..=n as i64 {
                    let out = tile(&views, &params(m, false), AREA, gaps);
                    assert_eq!(out.len(), n);
                    let masters: Vec<Rectangle> =
                        out.iter().take(m as usize).map(|(_, r)| *r).collect();
                    let stack: Vec<Rectangle> =
                        out.iter().skip(m as usize).map(|(_, r)| *r).collect();
                    for column in [&masters, &stack] {
                        if !column.is_empty() {
                            assert_eq!(column_span(column, gaps), AREA.height);
                        }
                    }
                    for (_, r) in &out {
                        assert!(r.width >= 0 && r.height >= 0, "{:?}", r);
                    }
                }
            }
        }
    }

    #[test]
    fn rows_are_contiguous() {
        let out = tile(&[1u32, 2, 3, 4], &params(1, false), AREA, 5);
        let stack: Vec<Rectangle> = out.iter().skip(1).map(|(_, r)| *r).collect();
        for pair in stack.windows(2) {
            assert_eq!(pair[0].y + pair[0].height + 5, pair[1].y);
        }
    }

    #[test]
    fn tiny_area_never_goes_negative() {
        let area = Rectangle::new(0, 0, 30, 30);
        let out = tile(&[1u32, 2, 3, 4, 5], &params(2, false), area, 20);
        assert!(out.iter().all(|(_, r)| r.width >= 0 && r.height >= 0));
    }

    #[test]
    fn params_are_clamped() {
        let p = TilingParams::new(500, 2.0, false);
        assert_eq!(p.master_count, 100);
        assert_eq!(p.master_factor, MAX_MASTER_FACTOR);
        let p = TilingParams::new(-3, 0.0, false);
        assert_eq!(p.master_count, 0);
        assert_eq!(p.master_factor, MIN_MASTER_FACTOR);
        assert_eq!(clamp_gaps(-1), 0);
        assert_eq!(clamp_gaps(999), 200);
    }

    #[test]
    fn tiling_mode_round_trips_through_text() {
        for mode in [TilingMode::Traditional, TilingMode::None] {
            assert_eq!(mode.to_string().parse::<TilingMode>(), Ok(mode));
        }
        assert!("spiral".parse::<TilingMode>().is_err());
    }
}
