use std::str::FromStr;

use strum::{Display, EnumString};
use thiserror::Error;
use tracing::error;

use super::size::SizeValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Axis {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignError {
    #[error("invalid value for 'align' {0:?}: expected \"<vertical> <horizontal>\"")]
    TokenCount(String),
    #[error("invalid value {token:?} for {axis} position")]
    Keyword { axis: Axis, token: String },
}

/// Where a window sits along one axis of its screen's free space (the screen
/// extent minus the window extent).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Center,
    End,
    Offset(SizeValue),
}

impl Anchor {
    pub fn resolve(self, size: u32, extent: u32) -> u32 {
        let free = extent.saturating_sub(size);
        match self {
            Anchor::Start => 0,
            Anchor::Center => free / 2,
            Anchor::End => free,
            Anchor::Offset(offset) => offset.resolve(free),
        }
    }
}

#[derive(EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
enum Vertical {
    Top,
    Center,
    Bottom,
}

#[derive(EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
enum Horizontal {
    Left,
    Center,
    Right,
}

impl From<Vertical> for Anchor {
    fn from(v: Vertical) -> Self {
        match v {
            Vertical::Top => Anchor::Start,
            Vertical::Center => Anchor::Center,
            Vertical::Bottom => Anchor::End,
        }
    }
}

impl From<Horizontal> for Anchor {
    fn from(h: Horizontal) -> Self {
        match h {
            Horizontal::Left => Anchor::Start,
            Horizontal::Center => Anchor::Center,
            Horizontal::Right => Anchor::End,
        }
    }
}

/// A `"<vertical> <horizontal>"` alignment such as `"top left"` or
/// `"center 25%"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Align {
    pub vertical: Anchor,
    pub horizontal: Anchor,
}

impl Default for Align {
    fn default() -> Self {
        Align {
            vertical: Anchor::Start,
            horizontal: Anchor::Start,
        }
    }
}

fn parse_anchor<K>(token: &str, axis: Axis) -> Result<Anchor, AlignError>
where
    K: FromStr + Into<Anchor>,
{
    if let Ok(keyword) = token.parse::<K>() {
        return Ok(keyword.into());
    }
    if token.ends_with('%') {
        let offset = token.parse::<SizeValue>().unwrap_or_else(|e| {
            error!(%axis, "{e}; using offset 0");
            SizeValue::Auto
        });
        return Ok(Anchor::Offset(offset));
    }
    Err(AlignError::Keyword {
        axis,
        token: token.to_string(),
    })
}

impl FromStr for Align {
    type Err = AlignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = s.split(' ').collect();
        let [vertical, horizontal] = tokens[..] else {
            return Err(AlignError::TokenCount(s.to_string()));
        };
        Ok(Align {
            vertical: parse_anchor::<Vertical>(vertical, Axis::Vertical)?,
            horizontal: parse_anchor::<Horizontal>(horizontal, Axis::Horizontal)?,
        })
    }
}

/// Position of a `width` x `height` window inside a screen, relative to the
/// screen's own origin.
pub fn resolve_position(
    align: &Align,
    width: u32,
    height: u32,
    screen_width: u32,
    screen_height: u32,
) -> (u32, u32) {
    (
        align.horizontal.resolve(width, screen_width),
        align.vertical.resolve(height, screen_height),
    )
}
