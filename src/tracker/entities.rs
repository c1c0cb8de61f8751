use std::{fmt::Display, str::FromStr, sync::Arc};

use anyhow::{anyhow, bail};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::totals::Totals;

/// Identifier of a category. Sessions keep it as a weak reference: the category may be deleted
/// later while the session stays in the log.
#[derive(PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(Arc<str>);

impl CategoryId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ticks without an id can't be attributed to anything.
    pub fn is_missing(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Default for CategoryId {
    fn default() -> Self {
        Self("".into())
    }
}

impl Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CategoryId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// An sRGB color. Always stored as `#rrggbb`.
#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Converts `hsl(hue, saturation%, lightness%)` into rgb. Hue is in degrees, the rest are in
    /// 0..=100.
    pub fn from_hsl(hue: f64, saturation: f64, lightness: f64) -> Self {
        let h = hue.rem_euclid(360.) / 360.;
        let s = (saturation / 100.).clamp(0., 1.);
        let l = (lightness / 100.).clamp(0., 1.);

        if s == 0. {
            let v = (l * 255.).round() as u8;
            return Self::rgb(v, v, v);
        }

        let q = if l < 0.5 { l * (1. + s) } else { l + s - l * s };
        let p = 2. * l - q;

        let channel = |t: f64| {
            let t = t.rem_euclid(1.);
            let v = if t < 1. / 6. {
                p + (q - p) * 6. * t
            } else if t < 1. / 2. {
                q
            } else if t < 2. / 3. {
                p + (q - p) * (2. / 3. - t) * 6.
            } else {
                p
            };
            (v * 255.).round() as u8
        };

        Self::rgb(channel(h + 1. / 3.), channel(h), channel(h - 1. / 3.))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for Color {
    /// Neutral gray for sessions saved without a color snapshot.
    fn default() -> Self {
        Self::rgb(0x8e, 0x8e, 0x93)
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(|| anyhow!("Can't parse {s} as a hex color"));
        }

        let lowered = s.to_ascii_lowercase();
        if let Some(inner) = lowered
            .strip_prefix("hsl(")
            .and_then(|v| v.strip_suffix(')'))
        {
            let parts = inner
                .split(',')
                .map(|v| v.trim().trim_end_matches("deg").trim_end_matches('%').trim())
                .map(|v| v.parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| anyhow!("Can't parse {s} as a hsl color: {e}"))?;
            let [hue, saturation, lightness] = parts[..] else {
                bail!("hsl color {s} should have exactly 3 components");
            };
            return Ok(Self::from_hsl(hue, saturation, lightness));
        }

        bail!("Unsupported color {s}. Use #rrggbb, #rgb or hsl(h, s%, l%)")
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some(Color::rgb(
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        )),
        3 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
            Some(Color::rgb(digit(0)?, digit(1)?, digit(2)?))
        }
        _ => None,
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Category a user focuses on. Owned by the category registry.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: Arc<str>,
    pub color: Color,
}

/// A contiguous span of focus on one category. Name and color are snapshots taken when the
/// session was recorded so that history survives renaming and deletion of the category.
#[derive(PartialEq, Eq, Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub category_id: CategoryId,
    #[serde(default = "unnamed")]
    pub category_name: Arc<str>,
    #[serde(default)]
    pub category_color: Color,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end: DateTime<Utc>,
}

fn unnamed() -> Arc<str> {
    "".into()
}

impl Session {
    /// Zero length session that starts at `moment`.
    pub fn starting_at(category: &Category, moment: DateTime<Utc>) -> Self {
        Self {
            category_id: category.id.clone(),
            category_name: category.name.clone(),
            category_color: category.color,
            start: moment,
            end: moment,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Length of the part of the session that falls inside `[from, to)`.
    pub fn overlap(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Duration {
        let start = self.start.max(from);
        let end = self.end.min(to);
        if end > start {
            end - start
        } else {
            Duration::zero()
        }
    }

    pub fn with_end(self, end: DateTime<Utc>) -> Self {
        Self { end, ..self }
    }
}

/// Everything recorded for one calendar day.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct DayLog {
    #[serde(default, deserialize_with = "null_as_default")]
    pub sessions: Vec<Session>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub totals: Totals,
    /// Free-form note. Stored verbatim, nothing here interprets it.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub note: serde_json::Value,
}

impl DayLog {
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty() && self.totals.is_empty() && self.note.is_null()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One second of focus on the active category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickEvent {
    pub category: Category,
    pub timestamp: DateTime<Utc>,
}
