//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Board and UI colours, loaded from a theme file or One Dark defaults.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Screen background.
    pub bg: Color,
    /// Borders and separators.
    pub div_line: Color,
    /// Regular text (poem characters still in place).
    pub main_fg: Color,
    /// Titles and the solved banner.
    pub title: Color,
    /// Empty blank (the ＿ placeholder glyph).
    pub blank: Color,
    /// Character placed into a blank.
    pub filled: Color,
    /// Mismatched character while the retry flash is showing.
    pub wrong: Color,
    /// Candidate tray characters.
    pub candidate: Color,
    /// Cursor / selection highlight.
    pub cursor: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

impl Theme {
    /// Hardcoded One Dark defaults.
    pub fn onedark_default() -> Self {
        Self {
            bg: parse_hex("#282C34").unwrap(),
            div_line: parse_hex("#3F444F").unwrap(),
            main_fg: parse_hex("#ABB2BF").unwrap(),
            title: parse_hex("#E5C07B").unwrap(),
            blank: parse_hex("#5C6370").unwrap(),
            filled: parse_hex("#98C379").unwrap(),
            wrong: parse_hex("#E06C75").unwrap(),
            candidate: parse_hex("#61AFEF").unwrap(),
            cursor: parse_hex("#C678DD").unwrap(),
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Falls back to One Dark defaults if path is None or file is missing.
    pub fn load(path: Option<&Path>) -> Result<Self, ThemeError> {
        let path = match path {
            Some(p) if p.exists() => p,
            _ => return Ok(Self::default()),
        };
        let s = std::fs::read_to_string(path)?;
        let map = parse_theme_file(&s);
        Ok(Self::from_map(&map))
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| {
            map.get(key)
                .and_then(|v| parse_hex(v.trim_matches('"').trim_matches('\'').trim()).ok())
        };
        // Keys follow btop theme names so existing btop themes map sensibly.
        let defaults = Self::onedark_default();
        Self {
            bg: get("main_bg").or_else(|| get("meter_bg")).unwrap_or(defaults.bg),
            div_line: get("div_line").unwrap_or(defaults.div_line),
            main_fg: get("main_fg").unwrap_or(defaults.main_fg),
            title: get("title").unwrap_or(defaults.title),
            blank: get("inactive_fg").unwrap_or(defaults.blank),
            filled: get("mem_box").or_else(|| get("cpu_start")).unwrap_or(defaults.filled),
            wrong: get("cpu_end").or_else(|| get("temp_end")).unwrap_or(defaults.wrong),
            candidate: get("cpu_box").unwrap_or(defaults.candidate),
            cursor: get("net_box").or_else(|| get("hi_fg")).unwrap_or(defaults.cursor),
        }
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("theme[") {
            if let Some(end) = stripped.find(']') {
                let key = stripped[..end].trim();
                let rest = stripped[end + 1..].trim();
                if let Some(eq) = rest.find('=') {
                    let value = rest[eq + 1..]
                        .trim()
                        .trim_matches('"')
                        .trim_matches('\'')
                        .to_string();
                    if !value.is_empty() {
                        map.insert(key.to_string(), value);
                    }
                }
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    let err = || ThemeError::InvalidHex(s.to_string());
    let (r, g, b) = if s.len() == 6 {
        (
            u8::from_str_radix(&s[0..2], 16).map_err(|_| err())?,
            u8::from_str_radix(&s[2..4], 16).map_err(|_| err())?,
            u8::from_str_radix(&s[4..6], 16).map_err(|_| err())?,
        )
    } else if s.len() == 3 {
        (
            u8::from_str_radix(&s[0..1], 16).map_err(|_| err())? * 17,
            u8::from_str_radix(&s[1..2], 16).map_err(|_| err())? * 17,
            u8::from_str_radix(&s[2..3], 16).map_err(|_| err())? * 17,
        )
    } else {
        return Err(err());
    };
    Ok(Color::Rgb(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_invalid() {
        assert!(parse_hex("#98C3").is_err());
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(r##"theme[main_bg]="#282C34""##);
        assert_eq!(map.get("main_bg"), Some(&"#282C34".to_string()));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let theme = Theme::load(Some(Path::new("/nonexistent.theme"))).unwrap();
        assert!(matches!(theme.wrong, Color::Rgb(..)));
    }
}
