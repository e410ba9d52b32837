use std::path::Path;

use tracing::info;

use crate::error::CatalogError;

use super::parse::parse_release_dump;
use super::release::Catalog;

pub fn load_catalog(path: &Path) -> Result<Catalog, CatalogError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let releases = parse_release_dump(&raw)?;
    let catalog = Catalog::from_releases(releases);
    if catalog.is_empty() {
        return Err(CatalogError::Empty(path.to_path_buf()));
    }

    info!(
        path = %path.display(),
        releases = catalog.len(),
        artists = catalog.artist_count(),
        labels = catalog.label_count(),
        skipped_duplicates = catalog.skipped_duplicates(),
        "loaded release catalog"
    );

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn loads_catalog_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"[{{"id": "1", "title": "A", "artistNames": ["X"], "labelName": "L", "styles": ["Techno"]}},
                {{"id": "2", "title": "B", "artistNames": ["Y"], "labelName": "L", "styles": ["House"]}}]"#
        )
        .unwrap();

        let catalog = load_catalog(file.path()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.label_releases("L"), &[0, 1]);
    }

    #[test]
    fn empty_dump_is_an_error() {
        let file = NamedTempFile::new().unwrap();
        assert!(matches!(
            load_catalog(file.path()),
            Err(CatalogError::Empty(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let error = load_catalog(&path).unwrap_err();
        assert!(matches!(error, CatalogError::Io { .. }));
        assert!(error.to_string().contains("missing.json"));
    }
}
