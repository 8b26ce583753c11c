//! Active monitor topology as reported by `xrandr --listactivemonitors`.
//!
//! A typical report looks like this:
//!
//! ```text
//! Monitors: 2
//!  0: +*DP-2 3440/820x1440/346+2560+0  DP-2
//!  1: +DP-4 2560/345x1600/215+0+0  DP-4
//! ```

use tracing::{debug, trace};

use super::command::{CommandError, CommandRunner};
use crate::args;

/// Flag character xrandr puts in front of the primary monitor's name.
const CURRENT_MARKER: char = '*';

/// One active physical display, in the combined virtual-desktop coordinate
/// space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub name: String,
    pub index: Option<u32>,
    pub is_current: Option<bool>,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub width_mm: Option<u32>,
    pub height_mm: Option<u32>,
}

/// Whatever could be extracted from a monitor line that was missing some of
/// its geometry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialScreen {
    pub name: String,
    pub index: Option<u32>,
    pub is_current: Option<bool>,
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub width_mm: Option<u32>,
    pub height_mm: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenLine {
    Complete(Screen),
    Incomplete(PartialScreen),
    NotAMonitor,
}

impl PartialScreen {
    fn finish(self) -> ScreenLine {
        match self {
            PartialScreen {
                name,
                index,
                is_current,
                x: Some(x),
                y: Some(y),
                width: Some(width),
                height: Some(height),
                width_mm,
                height_mm,
            } if width > 0 && height > 0 => ScreenLine::Complete(Screen {
                name,
                index,
                is_current,
                x,
                y,
                width,
                height,
                width_mm,
                height_mm,
            }),
            partial => ScreenLine::Incomplete(partial),
        }
    }
}

/// Parses one line of `xrandr --listactivemonitors` output.
///
/// Each stage only fills in the fields it understood, so a line whose
/// geometry block is malformed comes back as [`ScreenLine::Incomplete`]
/// rather than failing outright. Lines that do not carry the trailing
/// double-space separated name (such as the `Monitors: N` header) are
/// [`ScreenLine::NotAMonitor`].
pub fn parse_screen_line(line: &str) -> ScreenLine {
    let parts: Vec<&str> = line.trim().split("  ").collect();
    let [descriptor, name] = parts[..] else {
        return ScreenLine::NotAMonitor;
    };

    let mut screen = PartialScreen {
        name: name.trim().to_string(),
        ..Default::default()
    };

    let descriptor = descriptor.trim();
    let tokens: Vec<&str> = descriptor.split(' ').collect();
    let geometry = match tokens[..] {
        [index, flags, geometry] => {
            screen.index = index.trim_end_matches(':').parse().ok();
            screen.is_current = Some(flags.contains(CURRENT_MARKER));
            geometry
        }
        _ => descriptor,
    };

    let origin: Vec<&str> = geometry.split('+').collect();
    let size = match origin[..] {
        [size, x, y] => {
            screen.x = x.parse().ok();
            screen.y = y.parse().ok();
            size
        }
        _ => geometry,
    };

    let extents: Vec<&str> = size.split('x').collect();
    if let [width, height] = extents[..] {
        (screen.width, screen.width_mm) = pixels_and_millimeters(width);
        (screen.height, screen.height_mm) = pixels_and_millimeters(height);
    }

    screen.finish()
}

fn pixels_and_millimeters(extent: &str) -> (Option<u32>, Option<u32>) {
    let parts: Vec<&str> = extent.split('/').collect();
    match parts[..] {
        [px] => (px.parse().ok(), None),
        [px, mm] => (px.parse().ok(), mm.parse().ok()),
        _ => (None, None),
    }
}

/// Parses a whole topology report, keeping only complete monitor lines,
/// ordered left to right. Monitors sharing an `x` keep their reported order.
pub fn parse_screens(report: &str) -> Vec<Screen> {
    let mut screens = Vec::new();
    for line in report.lines() {
        match parse_screen_line(line) {
            ScreenLine::Complete(screen) => screens.push(screen),
            ScreenLine::Incomplete(partial) => {
                debug!(?partial, "ignoring monitor line with incomplete geometry")
            }
            ScreenLine::NotAMonitor => trace!(line, "skipping non-monitor line"),
        }
    }
    screens.sort_by_key(|s| s.x);
    screens
}

/// Queries the live topology and returns the active screens, left to right.
pub fn collect_active_screens(runner: &impl CommandRunner) -> Result<Vec<Screen>, CommandError> {
    let report = runner.run("xrandr", &args!["--listactivemonitors"])?;
    let screens = parse_screens(&report);
    debug!(count = screens.len(), ?screens, "collected active screens");
    Ok(screens)
}
