use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

static PIXELS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{1,4}$").unwrap());
static PERCENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]{1,3})%$").unwrap());

/// A window dimension as written in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizeValue {
    /// No size requested; resolves to zero.
    #[default]
    Auto,
    Pixels(u32),
    /// Always within `1..=100`.
    Percent(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid size {0:?}: expected up to 4 digits, or up to 3 digits followed by '%'")]
pub struct SizeError(pub String);

impl SizeValue {
    /// Integers from the configuration: anything non-positive means "no size".
    pub fn from_int(value: i64) -> Self {
        if value <= 0 {
            SizeValue::Auto
        } else {
            SizeValue::Pixels(u32::try_from(value).unwrap_or(u32::MAX))
        }
    }

    /// Percentages outside `(0, 100]` are treated as 100%.
    pub fn from_percent(percent: u32) -> Self {
        match u8::try_from(percent) {
            Ok(p @ 1..=100) => SizeValue::Percent(p),
            _ => SizeValue::Percent(100),
        }
    }

    /// Absolute size in pixels, never larger than `extent`.
    pub fn resolve(self, extent: u32) -> u32 {
        match self {
            SizeValue::Auto => 0,
            SizeValue::Pixels(px) => px.min(extent),
            SizeValue::Percent(p) => (u64::from(extent) * u64::from(p) / 100) as u32,
        }
    }
}

impl FromStr for SizeValue {
    type Err = SizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if PIXELS.is_match(s) {
            let px: u32 = s.parse().map_err(|_| SizeError(s.to_string()))?;
            return Ok(if px == 0 { SizeValue::Auto } else { SizeValue::Pixels(px) });
        }
        if let Some(caps) = PERCENT.captures(s) {
            let percent: u32 = caps[1].parse().map_err(|_| SizeError(s.to_string()))?;
            return Ok(SizeValue::from_percent(percent));
        }
        Err(SizeError(s.to_string()))
    }
}

impl fmt::Display for SizeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeValue::Auto => f.write_str("0"),
            SizeValue::Pixels(px) => write!(f, "{px}"),
            SizeValue::Percent(p) => write!(f, "{p}%"),
        }
    }
}

pub fn resolve_size(source: SizeValue, target_extent: u32) -> u32 { source.resolve(target_extent) }
