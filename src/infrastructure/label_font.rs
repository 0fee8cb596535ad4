// Label font resolution - explicit file first, then the system font database
use crate::infrastructure::config::LabelSettings;
use anyhow::{Context, Result, anyhow};
use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use rusttype::Font;
use std::fs;
use std::path::Path;

/// Returns `None` when no usable system font exists; labelled models then fail
/// at the label stage while unlabelled ones still render.
pub fn load_label_font(settings: &LabelSettings) -> Result<Option<Font<'static>>> {
    if let Some(path) = &settings.font_path {
        let font = load_font_file(path)?;
        tracing::info!(path = %path.display(), "Loaded label font");
        return Ok(Some(font));
    }

    let mut db = Database::new();
    db.load_system_fonts();

    match find_system_font(&db, &settings.font_family) {
        Some(font) => {
            tracing::info!(family = %settings.font_family, "Loaded label font");
            Ok(Some(font))
        }
        None => {
            tracing::warn!(
                family = %settings.font_family,
                faces = db.len(),
                "No system font found, labelled models are unavailable"
            );
            Ok(None)
        }
    }
}

pub fn load_font_file(path: &Path) -> Result<Font<'static>> {
    let bytes = fs::read(path)
        .with_context(|| format!("Failed to read font file {}", path.display()))?;
    Font::try_from_vec(bytes).ok_or_else(|| anyhow!("{} is not a usable font", path.display()))
}

fn families(family: &str) -> Vec<Family<'_>> {
    match family.trim() {
        "" | "Sans" => vec![Family::SansSerif],
        "Serif" => vec![Family::Serif],
        "Monospace" => vec![Family::Monospace],
        other => vec![Family::Name(other), Family::SansSerif],
    }
}

fn find_system_font(db: &Database, family: &str) -> Option<Font<'static>> {
    let families = families(family);
    let query = Query {
        families: &families,
        weight: Weight::BOLD,
        stretch: Stretch::Normal,
        style: Style::Normal,
    };

    let id = db.query(&query)?;
    db.with_face_data(id, |data, index| {
        Font::try_from_vec_and_index(data.to_vec(), index)
    })
    .flatten()
}
