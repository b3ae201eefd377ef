use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

static TEXT_MEASURER: Lazy<Mutex<TextMeasurer>> = Lazy::new(|| Mutex::new(TextMeasurer::new()));

const FALLBACK_CHAR_WIDTH: f32 = 0.56;

/// Width of `text` in pixels. With `fast` set, or when no usable font is
/// installed, falls back to a per-character estimate.
pub fn text_width(text: &str, font_size: f32, font_family: &str, fast: bool) -> f32 {
    if text.is_empty() || font_size <= 0.0 {
        return 0.0;
    }
    if !fast {
        if let Some(width) = measure_text_width(text, font_size, font_family) {
            return width;
        }
    }
    estimate_text_width(text, font_size)
}

pub fn estimate_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().filter(|ch| *ch != '\n').count() as f32 * font_size * FALLBACK_CHAR_WIDTH
}

pub fn measure_text_width(text: &str, font_size: f32, font_family: &str) -> Option<f32> {
    let mut guard = TEXT_MEASURER.lock().ok()?;
    guard.measure(text, font_size, font_family)
}

struct TextMeasurer {
    db: Database,
    loaded_system_fonts: bool,
    cache: HashMap<String, Option<FontMetrics>>,
}

impl TextMeasurer {
    fn new() -> Self {
        Self {
            db: Database::new(),
            loaded_system_fonts: false,
            cache: HashMap::new(),
        }
    }

    fn measure(&mut self, text: &str, font_size: f32, font_family: &str) -> Option<f32> {
        let key = normalize_family_key(font_family);
        if !self.cache.contains_key(&key) {
            let metrics = self.load_metrics(font_family);
            if metrics.is_none() {
                tracing::debug!(family = %key, "no font found, estimating text widths");
            }
            self.cache.insert(key.clone(), metrics);
        }
        let metrics = self.cache.get(&key)?.as_ref()?;
        Some(metrics.width(text, font_size))
    }

    fn load_metrics(&mut self, font_family: &str) -> Option<FontMetrics> {
        let mut names: Vec<String> = Vec::new();
        let mut generics: Vec<Option<Family<'static>>> = Vec::new();
        for part in font_family.split(',') {
            let raw = part.trim().trim_matches('"').trim_matches('\'');
            if raw.is_empty() {
                continue;
            }
            match raw.to_ascii_lowercase().as_str() {
                "serif" => generics.push(Some(Family::Serif)),
                "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    generics.push(Some(Family::SansSerif))
                }
                "monospace" | "ui-monospace" => generics.push(Some(Family::Monospace)),
                _ => {
                    names.push(raw.to_string());
                    generics.push(None);
                }
            }
        }

        let mut families: Vec<Family<'_>> = Vec::with_capacity(generics.len().max(1));
        let mut named = names.iter();
        for generic in generics {
            match generic {
                Some(family) => families.push(family),
                None => {
                    if let Some(name) = named.next() {
                        families.push(Family::Name(name.as_str()));
                    }
                }
            }
        }
        if families.is_empty() {
            families.push(Family::SansSerif);
        }

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        let mut loaded = None;
        self.db.with_face_data(id, |data, index| {
            if let Ok(face) = Face::parse(data, index) {
                loaded = Some(FontMetrics::from_face(&face));
            }
        });
        loaded
    }
}

/// Horizontal advances copied out of a parsed face, so the font bytes need
/// not outlive the lookup.
struct FontMetrics {
    units_per_em: f32,
    ascii_advances: [u16; 128],
    other_advance: u16,
}

impl FontMetrics {
    fn from_face(face: &Face<'_>) -> Self {
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph).unwrap_or(0);
            }
        }
        let other_advance = face
            .glyph_index('M')
            .and_then(|glyph| face.glyph_hor_advance(glyph))
            .unwrap_or(0);
        Self {
            units_per_em: face.units_per_em().max(1) as f32,
            ascii_advances,
            other_advance,
        }
    }

    fn width(&self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em;
        let fallback = font_size * FALLBACK_CHAR_WIDTH;
        let mut width = 0.0f32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let advance = if ch.is_ascii() {
                self.ascii_advances[ch as usize]
            } else {
                self.other_advance
            };
            width += if advance == 0 {
                fallback
            } else {
                advance as f32 * scale
            };
        }
        width
    }
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}
