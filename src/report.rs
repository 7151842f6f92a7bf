use std::collections::{HashMap, hash_map::Entry};

use palette::Srgb;
use serde::Serialize;
use tracing::warn;

use crate::error::PaletteError;

/// One representative color of an image.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PaletteEntry {
    pub hex: String,
    pub rgb: [u8; 3],
    /// Number of sampled pixels assigned to this color
    pub count: u64,
    /// Fraction of all sampled pixels, in `0.0..=1.0`
    pub weight: f64,
    /// `weight` as a percentage rounded to two decimals
    pub percent: f64,
}

impl PaletteEntry {
    pub fn new(color: Srgb<u8>, count: u64, total: u64) -> Self {
        let weight = if total == 0 { 0.0 } else { count as f64 / total as f64 };
        Self {
            hex: hex_code(color),
            rgb: [color.red, color.green, color.blue],
            count,
            weight,
            percent: (weight * 10_000.0).round() / 100.0,
        }
    }
}

/// Representative colors ordered by descending weight.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Palette {
    entries: Vec<PaletteEntry>,
}

impl Palette {
    /// Build a palette from `(color, count)` pairs.
    ///
    /// Pairs sharing the same color are merged. The sort is stable, so equal
    /// counts keep their input order.
    pub fn from_counts(counts: impl IntoIterator<Item = (Srgb<u8>, u64)>, total: u64) -> Self {
        let mut index: HashMap<(u8, u8, u8), usize> = HashMap::new();
        let mut merged: Vec<(Srgb<u8>, u64)> = Vec::new();
        for (color, count) in counts {
            match index.entry(color.into_components()) {
                Entry::Occupied(slot) => {
                    warn!(hex = %hex_code(color), "clusters collapsed to the same color, merging");
                    merged[*slot.get()].1 += count;
                }
                Entry::Vacant(slot) => {
                    slot.insert(merged.len());
                    merged.push((color, count));
                }
            }
        }
        merged.sort_by(|a, b| b.1.cmp(&a.1));

        Self {
            entries: merged
                .into_iter()
                .map(|(color, count)| PaletteEntry::new(color, count, total))
                .collect(),
        }
    }

    pub fn entries(&self) -> &[PaletteEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PaletteEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a Palette {
    type Item = &'a PaletteEntry;
    type IntoIter = std::slice::Iter<'a, PaletteEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Uppercase `#RRGGBB`.
pub fn hex_code(color: Srgb<u8>) -> String {
    format!("#{:02X}{:02X}{:02X}", color.red, color.green, color.blue)
}

/// `N. #RRGGBB  →  RGB(r, g, b)`, 1-indexed.
pub fn format_line(index: usize, entry: &PaletteEntry) -> String {
    let [r, g, b] = entry.rgb;
    format!("{}. {}  →  RGB({}, {}, {})", index + 1, entry.hex, r, g, b)
}

/// Render every entry as a line of text, each terminated by a newline.
pub fn render_text(palette: &Palette) -> String {
    palette
        .iter()
        .enumerate()
        .map(|(i, entry)| format_line(i, entry) + "\n")
        .collect()
}

pub fn render_json(palette: &Palette) -> Result<String, PaletteError> {
    let mut json = serde_json::to_string_pretty(palette)?;
    json.push('\n');
    Ok(json)
}

/// Write `contents` to `path`, replacing any existing file.
///
/// The data goes to a temporary file in the same directory first and is
/// renamed over `path` only once fully written, so a failed write leaves
/// no partial output behind. The result keeps the permissions of the file
/// it replaces; a new file gets the same mode `File::create` would give it.
/// A symlink at `path` is written through, not replaced.
#[cfg(not(target_arch = "wasm32"))]
pub fn write_report(path: &std::path::Path, contents: &str) -> Result<(), PaletteError> {
    use std::io::Write;

    let to_error = |source: std::io::Error| PaletteError::FileWrite {
        path: path.to_path_buf(),
        source,
    };

    let existing = std::fs::metadata(path).ok();
    let target = match existing {
        Some(_) => std::fs::canonicalize(path).map_err(to_error)?,
        None => path.to_path_buf(),
    };
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };

    #[cfg_attr(not(unix), allow(unused_mut))]
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Passed to open(2), so the process umask applies as for File::create.
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    let mut tmp = builder.tempfile_in(&dir).map_err(to_error)?;
    if let Some(meta) = &existing {
        tmp.as_file().set_permissions(meta.permissions()).map_err(to_error)?;
    }
    tmp.write_all(contents.as_bytes()).map_err(to_error)?;
    tmp.flush().map_err(to_error)?;
    tmp.persist(&target).map_err(|e| to_error(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Palette {
        Palette::from_counts(
            [
                (Srgb::new(0, 255, 0), 1),
                (Srgb::new(255, 0, 0), 2),
                (Srgb::new(0, 0, 255), 1),
            ],
            4,
        )
    }

    #[test]
    fn hex_is_uppercase_and_zero_padded() {
        assert_eq!(hex_code(Srgb::new(30, 58, 95)), "#1E3A5F");
        assert_eq!(hex_code(Srgb::new(0, 1, 10)), "#00010A");
    }

    #[test]
    fn entries_sorted_by_descending_count_stably() {
        let palette = sample();
        let hexes: Vec<_> = palette.iter().map(|e| e.hex.as_str()).collect();
        assert_eq!(hexes, ["#FF0000", "#00FF00", "#0000FF"]);
        assert_eq!(palette.entries()[0].weight, 0.5);
        assert_eq!(palette.entries()[1].percent, 25.0);
    }

    #[test]
    fn duplicate_colors_are_merged() {
        let palette = Palette::from_counts(
            [(Srgb::new(1, 1, 1), 2), (Srgb::new(9, 9, 9), 3), (Srgb::new(1, 1, 1), 2)],
            7,
        );
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.entries()[0].count, 4);
        assert_eq!(palette.entries()[0].rgb, [1, 1, 1]);
    }

    #[test]
    fn merging_many_distinct_colors_keeps_every_one() {
        let counts: Vec<_> = (0..200_000u32)
            .map(|i| {
                let [_, r, g, b] = i.to_be_bytes();
                (Srgb::new(r, g, b), 1 + u64::from(i % 3 == 0))
            })
            .collect();
        let total = counts.iter().map(|(_, n)| n).sum();

        let palette = Palette::from_counts(counts, total);

        assert_eq!(palette.len(), 200_000);
        assert_eq!(palette.entries()[0].rgb, [0, 0, 0]);
        assert_eq!(palette.entries()[0].count, 2);
        assert!(palette.entries().windows(2).all(|w| w[0].count >= w[1].count));
    }

    #[test]
    fn text_lines_match_expected_layout() {
        let text = render_text(&sample());
        assert_eq!(
            text,
            "1. #FF0000  →  RGB(255, 0, 0)\n\
             2. #00FF00  →  RGB(0, 255, 0)\n\
             3. #0000FF  →  RGB(0, 0, 255)\n"
        );
    }

    #[test]
    fn json_lists_entries_in_order() {
        let json = render_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let entries = value.as_array().unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["hex"], "#FF0000");
        assert_eq!(entries[0]["rgb"], serde_json::json!([255, 0, 0]));
        assert_eq!(entries[0]["count"], 2);
        assert_eq!(entries[2]["percent"], 25.0);
    }

    #[test]
    fn write_report_replaces_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("palette.txt");
        std::fs::write(&path, "stale contents that are longer than the new ones\n").unwrap();

        write_report(&path, "fresh\n").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh\n");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn write_report_keeps_existing_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("palette.txt");
        std::fs::write(&path, "old\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        write_report(&path, "new\n").unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn new_report_gets_default_create_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let reference = dir.path().join("reference.txt");
        std::fs::File::create(&reference).unwrap();
        let path = dir.path().join("palette.txt");

        write_report(&path, "new\n").unwrap();

        let mode = |p: &std::path::Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&path), mode(&reference));
    }

    #[cfg(unix)]
    #[test]
    fn write_report_follows_symlinks() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real.txt");
        let link = dir.path().join("link.txt");
        std::fs::write(&real, "old\n").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        write_report(&link, "new\n").unwrap();

        assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_to_string(&real).unwrap(), "new\n");
    }

    #[test]
    fn write_report_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("no/such/dir/palette.txt");

        let err = write_report(&path, "data").unwrap_err();

        assert!(matches!(err, PaletteError::FileWrite { .. }));
        assert!(!path.exists());
    }
}
