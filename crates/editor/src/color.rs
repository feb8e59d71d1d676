use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 8-bit sRGB color stored as `#rrggbb` in project files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid color '{0}'; expected a #rrggbb hex token")]
pub struct ColorParseError(pub String);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels divided by 255, the form bound to `vec3` color uniforms.
    pub fn normalized(self) -> [f32; 3] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let digits = trimmed
            .strip_prefix('#')
            .filter(|digits| is_hex6(digits))
            .ok_or_else(|| ColorParseError(value.to_string()))?;
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|_| ColorParseError(value.to_string()))
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Rgb {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

fn is_hex6(digits: &str) -> bool {
    digits.len() == 6 && digits.chars().all(|ch| ch.is_ascii_hexdigit())
}

/// Accepts the color notations allowed on overlay layers: a `#rrggbb` token or
/// an `rgb()`, `rgba()`, `hsl()` or `hsla()` call with 3 or 4 numeric
/// components (comma or space separated, optional `/ alpha`).
pub fn is_css_color(value: &str) -> bool {
    let trimmed = value.trim();
    if let Some(digits) = trimmed.strip_prefix('#') {
        return is_hex6(digits);
    }

    let Some((name, rest)) = trimmed.split_once('(') else {
        return false;
    };
    let Some(arguments) = rest.strip_suffix(')') else {
        return false;
    };
    let name = name.trim().to_ascii_lowercase();
    if !matches!(name.as_str(), "rgb" | "rgba" | "hsl" | "hsla") {
        return false;
    }

    let components: Vec<&str> = arguments
        .split(|ch: char| ch == ',' || ch == '/' || ch.is_whitespace())
        .filter(|token| !token.is_empty())
        .collect();
    if !(3..=4).contains(&components.len()) {
        return false;
    }
    components.iter().all(|token| is_css_number(token))
}

fn is_css_number(token: &str) -> bool {
    let number = token
        .strip_suffix('%')
        .or_else(|| token.strip_suffix("deg"))
        .unwrap_or(token);
    number.parse::<f32>().map(f32::is_finite).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_lime_to_unit_rgb() {
        let color: Rgb = "#ccff00".parse().unwrap();
        let [r, g, b] = color.normalized();
        assert!((r - 0.8).abs() < 1e-6);
        assert!((g - 1.0).abs() < 1e-6);
        assert!(b.abs() < 1e-6);
    }

    #[test]
    fn displays_as_lowercase_hex() {
        let color: Rgb = "#FF2E97".parse().unwrap();
        assert_eq!(color, Rgb::new(0xff, 0x2e, 0x97));
        assert_eq!(color.to_string(), "#ff2e97");
    }

    #[test]
    fn rejects_short_and_unprefixed_tokens() {
        assert!("#fff".parse::<Rgb>().is_err());
        assert!("ccff00".parse::<Rgb>().is_err());
        assert!("#ccff0g".parse::<Rgb>().is_err());
    }

    #[test]
    fn recognises_css_color_functions() {
        assert!(is_css_color("#0b1026"));
        assert!(is_css_color("rgb(255, 0, 128)"));
        assert!(is_css_color("rgba(255 0 128 / 50%)"));
        assert!(is_css_color("hsl(210deg, 40%, 20%)"));
        assert!(!is_css_color("rgb(1, 2)"));
        assert!(!is_css_color("cmyk(1, 2, 3, 4)"));
        assert!(!is_css_color("red"));
        assert!(!is_css_color("rgb(1, 2, 3"));
    }
}
