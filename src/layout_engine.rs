//! Turns declarative window sizes and alignments into absolute pixel
//! geometry on a particular screen.

pub mod align;
pub mod size;

pub use align::{Align, AlignError, Anchor, Axis, resolve_position};
pub use size::{SizeError, SizeValue, resolve_size};

use crate::sys::screen::Screen;

/// Final placement of one window in the combined virtual-desktop space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedGeometry {
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
}

impl ResolvedGeometry {
    pub fn resolve(width: SizeValue, height: SizeValue, align: &Align, screen: &Screen) -> Self {
        let width = resolve_size(width, screen.width);
        let height = resolve_size(height, screen.height);
        let (x, y) = resolve_position(align, width, height, screen.width, screen.height);
        ResolvedGeometry {
            width,
            height,
            x: screen.x.saturating_add_unsigned(x),
            y: screen.y.saturating_add_unsigned(y),
        }
    }
}
