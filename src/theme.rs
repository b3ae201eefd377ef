use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub title_font_size: f32,
    pub text_color: String,
    pub label_background: String,
    pub legend_background: String,
    pub legend_border: String,
    pub background: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "'DejaVu Sans', verdana, arial, sans-serif".to_string(),
            title_font_size: 16.0,
            text_color: "#222222".to_string(),
            label_background: "#FFFFFF".to_string(),
            legend_background: "#FFFFFF".to_string(),
            legend_border: "#999999".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            title_font_size: 15.0,
            text_color: "#1C2430".to_string(),
            label_background: "#F8FAFF".to_string(),
            legend_background: "#F7FAFF".to_string(),
            legend_border: "#D7E0F0".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "modern" => Some(Self::modern()),
            "classic" | "default" => Some(Self::classic()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Linear blend in sRGB space, `t` clamped to [0, 1].
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
        }
    }
}

/// Parses `#RRGGBB` or `#RGB`.
pub fn parse_hex_color(value: &str) -> Option<Rgb> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.is_ascii() {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some(Rgb {
            r: channel(&hex[0..2])?,
            g: channel(&hex[2..4])?,
            b: channel(&hex[4..6])?,
        }),
        3 => {
            let expand = |s: &str| channel(s).map(|v| v * 17);
            Some(Rgb {
                r: expand(&hex[0..1])?,
                g: expand(&hex[1..2])?,
                b: expand(&hex[2..3])?,
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_hex() {
        assert_eq!(
            parse_hex_color("#1A9850"),
            Some(Rgb { r: 0x1A, g: 0x98, b: 0x50 })
        );
        assert_eq!(parse_hex_color("#fff"), Some(Rgb { r: 255, g: 255, b: 255 }));
        assert_eq!(parse_hex_color("red"), None);
        assert_eq!(parse_hex_color("#12345"), None);
    }

    #[test]
    fn lerp_hits_endpoints_and_midpoint() {
        let black = Rgb { r: 0, g: 0, b: 0 };
        let white = Rgb { r: 255, g: 255, b: 255 };
        assert_eq!(black.lerp(white, 0.0), black);
        assert_eq!(black.lerp(white, 1.0), white);
        assert_eq!(black.lerp(white, 0.5).to_hex(), "#808080");
        assert_eq!(black.lerp(white, 7.0), white);
    }
}
