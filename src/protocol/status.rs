//! Read-only view of the well-known fields in a backend status string

use regex::Regex;
use std::sync::OnceLock;

/// Fields that may appear in a status string such as
/// `"tempo=125, mode=1, volume=8"`.
///
/// Every field is optional and independent. Parsing never fails and never
/// changes the payload that gets broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusFields {
    pub tempo: Option<i64>,
    pub mode: Option<i64>,
    pub volume: Option<i64>,
}

fn field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(tempo|mode|volume)=(-?\d+)").expect("status field pattern is valid")
    })
}

impl StatusFields {
    /// Extract whichever fields are present. The first occurrence of a field wins.
    pub fn parse(text: &str) -> Self {
        let mut fields = Self::default();
        for caps in field_pattern().captures_iter(text) {
            let Ok(value) = caps[2].parse::<i64>() else {
                continue;
            };
            let slot = match &caps[1] {
                "tempo" => &mut fields.tempo,
                "mode" => &mut fields.mode,
                _ => &mut fields.volume,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.tempo.is_none() && self.mode.is_none() && self.volume.is_none()
    }
}
