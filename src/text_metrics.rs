use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Mutex;
use ttf_parser::Face;

/// Font used to measure a label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontDescriptor<'a> {
    pub family: &'a str,
    pub size: f32,
}

/// Text measurement capability consumed when sizing nodes.
///
/// `None` means the capability cannot answer (no font available); callers
/// then fall back to a fixed width per character.
pub trait TextMetrics {
    fn text_width(&self, text: &str, font: &FontDescriptor<'_>) -> Option<f32>;
}

impl<T: TextMetrics + ?Sized> TextMetrics for &T {
    fn text_width(&self, text: &str, font: &FontDescriptor<'_>) -> Option<f32> {
        (**self).text_width(text, font)
    }
}

/// Heuristic metrics: every character is `factor * font size` wide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedWidthMetrics {
    pub factor: f32,
}

impl Default for FixedWidthMetrics {
    fn default() -> Self {
        Self { factor: 0.56 }
    }
}

impl TextMetrics for FixedWidthMetrics {
    fn text_width(&self, text: &str, font: &FontDescriptor<'_>) -> Option<f32> {
        Some(fixed_width(text, font.size, self.factor))
    }
}

fn fixed_width(text: &str, font_size: f32, factor: f32) -> f32 {
    let count = text.chars().filter(|ch| *ch != '\n').count();
    count as f32 * font_size.max(0.0) * factor
}

/// Widest line of `text`, measured with `metrics` and falling back to the
/// per-character heuristic line by line.
pub fn label_width<M: TextMetrics + ?Sized>(
    metrics: &M,
    text: &str,
    font: &FontDescriptor<'_>,
    fallback_factor: f32,
) -> f32 {
    if text.is_empty() || font.size <= 0.0 {
        return 0.0;
    }
    text.lines()
        .map(|line| {
            let line = line.replace('\t', "    ");
            metrics
                .text_width(&line, font)
                .filter(|w| w.is_finite())
                .unwrap_or_else(|| fixed_width(&line, font.size, fallback_factor))
        })
        .fold(0.0, f32::max)
}

/// Metrics backed by the fonts installed on the system.
///
/// The font database is loaded lazily on the first measurement.
#[derive(Default)]
pub struct SystemFontMetrics {
    db: OnceCell<Database>,
    faces: Mutex<HashMap<String, Option<FontFace>>>,
}

impl SystemFontMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn database(&self) -> &Database {
        self.db.get_or_init(|| {
            let mut db = Database::new();
            db.load_system_fonts();
            db
        })
    }

    fn load_face(&self, font_family: &str) -> Option<FontFace> {
        let names = family_names(font_family);
        let families: Vec<Family<'_>> = names.iter().map(FamilyName::as_family).collect();
        let query = Query {
            families: &families,
            weight: Weight::NORMAL,
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let db = self.database();
        let id = db.query(&query)?;
        db.with_face_data(id, |data, index| FontFace::new(data.to_vec(), index))
            .flatten()
    }
}

impl TextMetrics for SystemFontMetrics {
    fn text_width(&self, text: &str, font: &FontDescriptor<'_>) -> Option<f32> {
        if text.is_empty() || font.size <= 0.0 {
            return Some(0.0);
        }
        let key = normalize_family_key(font.family);
        let mut faces = self.faces.lock().ok()?;
        if !faces.contains_key(&key) {
            let face = self.load_face(&key);
            faces.insert(key.clone(), face);
        }
        faces.get(&key)?.as_ref()?.measure_width(text, font.size)
    }
}

enum FamilyName {
    Generic(Family<'static>),
    Named(String),
}

impl FamilyName {
    fn as_family(&self) -> Family<'_> {
        match self {
            FamilyName::Generic(family) => *family,
            FamilyName::Named(name) => Family::Name(name.as_str()),
        }
    }
}

fn family_names(font_family: &str) -> Vec<FamilyName> {
    let mut names = Vec::new();
    for part in font_family.split(',') {
        let raw = part.trim().trim_matches('"').trim_matches('\'');
        if raw.is_empty() {
            continue;
        }
        let name = match raw.to_ascii_lowercase().as_str() {
            "serif" => FamilyName::Generic(Family::Serif),
            "sans-serif" | "system-ui" | "-apple-system" | "ui-sans-serif" => {
                FamilyName::Generic(Family::SansSerif)
            }
            "monospace" | "ui-monospace" => FamilyName::Generic(Family::Monospace),
            "cursive" => FamilyName::Generic(Family::Cursive),
            "fantasy" => FamilyName::Generic(Family::Fantasy),
            _ => FamilyName::Named(raw.to_string()),
        };
        names.push(name);
    }
    if names.is_empty() {
        names.push(FamilyName::Generic(Family::SansSerif));
    }
    names
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}

struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
}

impl FontFace {
    fn new(data: Vec<u8>, index: u32) -> Option<Self> {
        let units_per_em = Face::parse(&data, index).ok()?.units_per_em().max(1);
        Some(Self {
            data,
            index,
            units_per_em,
        })
    }

    fn measure_width(&self, text: &str, font_size: f32) -> Option<f32> {
        let face = Face::parse(&self.data, self.index).ok()?;
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * 0.56;
        let mut width = 0.0f32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            match face
                .glyph_index(ch)
                .and_then(|glyph| face.glyph_hor_advance(glyph))
            {
                Some(advance) if advance > 0 => width += advance as f32 * scale,
                _ => width += fallback,
            }
        }
        Some(width.max(0.0))
    }
}
