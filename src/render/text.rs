use fontdue::{Font, FontSettings, Metrics};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Families tried, in order, when the requested one is not installed.
const FALLBACK_FAMILIES: &[&str] = &[
    "Inter",
    "DejaVuSans",
    "LiberationSans",
    "NotoSans",
    "Roboto",
    "Arial",
    "Helvetica",
];

const MAX_SCAN_DEPTH: usize = 4;

/// Lazily resolves font families to parsed fonts from the font directories.
pub struct FontBook {
    search_dirs: Vec<PathBuf>,
    cache: HashMap<(String, bool), Option<Arc<Font>>>,
    files: Option<Vec<PathBuf>>,
    warned: HashSet<String>,
}

impl FontBook {
    /// `extra_dirs` are searched before the user and system font directories.
    pub fn new(extra_dirs: Vec<PathBuf>) -> Self {
        let mut search_dirs = extra_dirs;
        if let Some(dir) = dirs::font_dir() {
            search_dirs.push(dir);
        }
        if let Some(home) = dirs::home_dir() {
            search_dirs.push(home.join(".fonts"));
        }
        search_dirs.extend(
            [
                "/usr/share/fonts",
                "/usr/local/share/fonts",
                "/Library/Fonts",
                "/System/Library/Fonts",
                "C:\\Windows\\Fonts",
            ]
            .iter()
            .map(PathBuf::from),
        );
        Self {
            search_dirs,
            cache: HashMap::new(),
            files: None,
            warned: HashSet::new(),
        }
    }

    /// A book that only knows fonts registered through [`FontBook::insert`].
    pub fn empty() -> Self {
        Self {
            search_dirs: Vec::new(),
            cache: HashMap::new(),
            files: Some(Vec::new()),
            warned: HashSet::new(),
        }
    }

    /// Register a font from raw TTF/OTF bytes under `family`.
    pub fn insert(&mut self, family: &str, bytes: &[u8], bold: bool) -> Result<(), String> {
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|e| e.to_string())?;
        self.cache
            .insert((normalize(family), bold), Some(Arc::new(font)));
        Ok(())
    }

    /// Font for `family`, falling back to common sans-serif families. Missing
    /// fonts are reported once per family.
    pub fn resolve(&mut self, family: &str, bold: bool) -> Option<Arc<Font>> {
        if let Some(font) = self.lookup(family, bold) {
            return Some(font);
        }
        for fallback in FALLBACK_FAMILIES {
            if let Some(font) = self.lookup(fallback, bold) {
                return Some(font);
            }
        }
        if bold {
            return self.resolve(family, false);
        }
        if self.warned.insert(family.to_string()) {
            log::warn!("No usable font found for '{}'; text layers are skipped", family);
        }
        None
    }

    fn lookup(&mut self, family: &str, bold: bool) -> Option<Arc<Font>> {
        let key = (normalize(family), bold);
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }
        let font = self
            .find_file(&key.0, bold)
            .and_then(|path| load_font(&path));
        self.cache.insert(key, font.clone());
        font
    }

    fn find_file(&mut self, family: &str, bold: bool) -> Option<PathBuf> {
        let dirs = &self.search_dirs;
        let files = self.files.get_or_insert_with(|| {
            let mut found = Vec::new();
            for dir in dirs {
                collect_font_files(dir, 0, &mut found);
            }
            found
        });

        let mut best: Option<(u8, &PathBuf)> = None;
        for path in files.iter() {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let stem = normalize(stem);
            let Some(style) = stem.strip_prefix(family) else {
                continue;
            };
            let rank = match (style, bold) {
                ("", false) | ("regular", false) | ("bold", true) => 0,
                (s, true) if s.contains("bold") && !s.contains("italic") => 1,
                (s, false) if !s.contains("bold") && !s.contains("italic") && !s.contains("oblique") => 1,
                _ => continue,
            };
            if best.is_none_or(|(r, _)| rank < r) {
                best = Some((rank, path));
            }
        }
        best.map(|(_, path)| path.clone())
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn collect_font_files(dir: &Path, depth: usize, out: &mut Vec<PathBuf>) {
    if depth > MAX_SCAN_DEPTH {
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_font_files(&path, depth + 1, out);
        } else if path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("ttf") || e.eq_ignore_ascii_case("otf"))
        {
            out.push(path);
        }
    }
}

fn load_font(path: &Path) -> Option<Arc<Font>> {
    let bytes = std::fs::read(path).ok()?;
    match Font::from_bytes(bytes, FontSettings::default()) {
        Ok(font) => {
            log::debug!("Loaded font {}", path.display());
            Some(Arc::new(font))
        }
        Err(err) => {
            log::warn!("Failed to parse font {}: {}", path.display(), err);
            None
        }
    }
}

pub struct Glyph {
    pub x: f32,
    pub metrics: Metrics,
    pub bitmap: Vec<u8>,
}

/// One line of text rasterised at a pixel size.
pub struct RasterLine {
    pub glyphs: Vec<Glyph>,
    pub width: f32,
    pub ascent: f32,
    pub descent: f32,
}

pub fn rasterize_line(font: &Font, text: &str, px: f32) -> RasterLine {
    let (ascent, descent) = font
        .horizontal_line_metrics(px)
        .map_or((px * 0.8, -px * 0.2), |m| (m.ascent, m.descent));

    let mut cursor_x = 0.0f32;
    let mut glyphs = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let (metrics, bitmap) = font.rasterize(ch, px);
        glyphs.push(Glyph {
            x: cursor_x,
            metrics,
            bitmap,
        });
        cursor_x += metrics.advance_width;
    }

    RasterLine {
        glyphs,
        width: cursor_x,
        ascent,
        descent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_separators_and_case() {
        assert_eq!(normalize("DejaVu Sans-Bold"), "dejavusansbold");
        assert_eq!(normalize("Inter"), "inter");
    }

    #[test]
    fn empty_book_resolves_nothing() {
        let mut book = FontBook::empty();
        assert!(book.resolve("Inter", false).is_none());
        assert!(book.resolve("Inter", true).is_none());
    }

    #[test]
    fn invalid_font_bytes_are_rejected() {
        let mut book = FontBook::empty();
        assert!(book.insert("Broken", b"not a font", false).is_err());
    }

    #[test]
    fn finds_regular_before_italic() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["Acme-Italic.ttf", "Acme-Regular.ttf", "Acme-Bold.ttf"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let mut book = FontBook::empty();
        book.search_dirs = vec![dir.path().to_path_buf()];
        book.files = None;
        let regular = book.find_file("acme", false).unwrap();
        assert!(regular.ends_with("Acme-Regular.ttf"));
        let bold = book.find_file("acme", true).unwrap();
        assert!(bold.ends_with("Acme-Bold.ttf"));
    }
}
