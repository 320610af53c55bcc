//! Editor preferences as edited in the settings panel.

use crate::layout::LayoutMode;
use serde::{Deserialize, Deserializer, Serialize};
use std::ops::RangeInclusive;

pub const FONT_SIZE_RANGE: RangeInclusive<u8> = 10..=24;
pub const TAB_SIZE_RANGE: RangeInclusive<u8> = 2..=8;
pub const SCROLL_SPEED_RANGE: RangeInclusive<u8> = 1..=10;

/// Always fully populated; absent fields take their defaults on load
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorSettings {
    #[serde(deserialize_with = "saturating_u8")]
    pub font_size: u8,
    #[serde(deserialize_with = "saturating_u8")]
    pub tab_size: u8,
    pub auto_save: bool,
    pub line_numbers: bool,
    pub indent_with_tabs: bool,
    pub highlight_active_line: bool,
    pub bracket_matching: bool,
    pub layout: LayoutMode,
    pub minimap: bool,
    #[serde(deserialize_with = "saturating_u8")]
    pub scroll_speed: u8,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            font_size: 14,
            tab_size: 2,
            auto_save: true,
            line_numbers: true,
            indent_with_tabs: false,
            highlight_active_line: true,
            bracket_matching: true,
            layout: LayoutMode::Horizontal,
            minimap: false,
            scroll_speed: 5,
        }
    }
}

impl EditorSettings {
    /// Clamp numeric fields into their allowed ranges
    pub fn sanitized(mut self) -> Self {
        self.font_size = clamp(self.font_size, &FONT_SIZE_RANGE);
        self.tab_size = clamp(self.tab_size, &TAB_SIZE_RANGE);
        self.scroll_speed = clamp(self.scroll_speed, &SCROLL_SPEED_RANGE);
        self
    }
}

fn clamp(value: u8, range: &RangeInclusive<u8>) -> u8 {
    value.clamp(*range.start(), *range.end())
}

/// Any JSON number, pinned to `0..=255`; `sanitized` narrows it further
fn saturating_u8<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Ok(value.clamp(0.0, u8::MAX as f64).round() as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let settings: EditorSettings =
            serde_json::from_str(r#"{ "fontSize": 18, "layout": "vertical" }"#).unwrap();

        assert_eq!(settings.font_size, 18);
        assert_eq!(settings.layout, LayoutMode::Vertical);
        assert_eq!(settings.tab_size, 2);
        assert!(settings.auto_save);
    }

    #[test]
    fn test_sanitized_clamps_bounds() {
        let settings = EditorSettings {
            font_size: 40,
            tab_size: 0,
            scroll_speed: 0,
            ..Default::default()
        }
        .sanitized();

        assert_eq!(settings.font_size, 24);
        assert_eq!(settings.tab_size, 2);
        assert_eq!(settings.scroll_speed, 1);
    }

    #[test]
    fn test_out_of_range_numbers_still_load() {
        let settings: EditorSettings = serde_json::from_str(
            r#"{ "fontSize": 300, "tabSize": -4, "scrollSpeed": 7.6, "minimap": true }"#,
        )
        .unwrap();

        assert_eq!(settings.font_size, 255);
        assert_eq!(settings.tab_size, 0);
        assert_eq!(settings.scroll_speed, 8);
        assert!(settings.minimap);

        let settings = settings.sanitized();
        assert_eq!(settings.font_size, 24);
        assert_eq!(settings.tab_size, 2);
    }

    #[test]
    fn test_default_is_within_bounds() {
        let settings = EditorSettings::default();
        assert_eq!(settings.clone().sanitized(), settings);
    }
}
