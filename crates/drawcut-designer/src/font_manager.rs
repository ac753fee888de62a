//! System font lookup for initials.

use fontdb::{Database, Family, Query, Source, Stretch, Style, Weight};
use rusttype::Font;
use std::{collections::BTreeSet, fs, sync::OnceLock};

fn db() -> &'static Database {
    static DB: OnceLock<Database> = OnceLock::new();
    DB.get_or_init(|| {
        let mut db = Database::new();
        db.load_system_fonts();
        tracing::debug!("Loaded {} system font faces", db.len());
        db
    })
}

/// Family names of the installed fonts, sorted, each once.
pub fn list_font_families() -> Vec<String> {
    let families: BTreeSet<String> = db()
        .faces()
        .flat_map(|face| face.families.iter().map(|(name, _)| name.clone()))
        .collect();
    families.into_iter().collect()
}

/// Load the best system match for `family`. Generic names `Sans`, `Serif`
/// and `Monospace` (or an empty string for sans) select the platform default.
pub fn load_font(family: &str, bold: bool) -> Option<Font<'static>> {
    let families: Vec<Family<'_>> = match family.trim() {
        "" | "Sans" => vec![Family::SansSerif],
        "Serif" => vec![Family::Serif],
        "Monospace" => vec![Family::Monospace],
        other => vec![Family::Name(other), Family::SansSerif],
    };

    let query = Query {
        families: &families,
        weight: if bold { Weight::BOLD } else { Weight::NORMAL },
        stretch: Stretch::Normal,
        style: Style::Normal,
    };

    let id = db().query(&query)?;
    let face = db().face(id)?;
    let index = face.index;

    let bytes = match &face.source {
        Source::File(path) | Source::SharedFile(path, _) => fs::read(path).ok()?,
        Source::Binary(bytes) => bytes.as_ref().as_ref().to_vec(),
    };
    Font::try_from_vec_and_index(bytes, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_families_sorted_and_unique() {
        let families = list_font_families();
        assert!(families.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
