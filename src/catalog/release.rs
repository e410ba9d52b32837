use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const UNKNOWN_GROUP: &str = "Unknown";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub artist_names: Vec<String>,
    #[serde(default)]
    pub label_name: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub styles: Vec<String>,
}

impl Release {
    pub fn primary_style(&self) -> &str {
        self.styles
            .first()
            .map(String::as_str)
            .unwrap_or(UNKNOWN_GROUP)
    }

    pub fn label_or_unknown(&self) -> &str {
        self.label_name.as_deref().unwrap_or(UNKNOWN_GROUP)
    }

    /// "Artist A, Artist B - Title", or just the title for anonymous releases.
    pub fn display_name(&self) -> String {
        if self.artist_names.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.artist_names.join(", "), self.title)
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Catalog {
    releases: Vec<Release>,
    index_by_id: HashMap<String, usize>,
    artists: BTreeMap<String, Vec<usize>>,
    labels: BTreeMap<String, Vec<usize>>,
    skipped_duplicates: usize,
}

impl Catalog {
    pub fn from_releases(input: Vec<Release>) -> Self {
        let mut catalog = Self::default();

        for release in input {
            if catalog.index_by_id.contains_key(&release.id) {
                warn!(id = %release.id, title = %release.title, "skipping duplicate release id");
                catalog.skipped_duplicates += 1;
                continue;
            }

            let index = catalog.releases.len();
            catalog.index_by_id.insert(release.id.clone(), index);
            for artist in &release.artist_names {
                catalog
                    .artists
                    .entry(artist.clone())
                    .or_default()
                    .push(index);
            }
            if let Some(label) = &release.label_name {
                catalog.labels.entry(label.clone()).or_default().push(index);
            }
            catalog.releases.push(release);
        }

        catalog
    }

    pub fn releases(&self) -> &[Release] {
        &self.releases
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    pub fn release(&self, index: usize) -> Option<&Release> {
        self.releases.get(index)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn release_by_id(&self, id: &str) -> Option<&Release> {
        self.index_of(id).and_then(|index| self.releases.get(index))
    }

    pub fn artist_releases(&self, name: &str) -> &[usize] {
        self.artists.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn label_releases(&self, name: &str) -> &[usize] {
        self.labels.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn artists(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.artists
            .iter()
            .map(|(name, releases)| (name.as_str(), releases.as_slice()))
    }

    pub fn labels(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.labels
            .iter()
            .map(|(name, releases)| (name.as_str(), releases.as_slice()))
    }

    pub fn artist_count(&self) -> usize {
        self.artists.len()
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn skipped_duplicates(&self) -> usize {
        self.skipped_duplicates
    }
}

#[cfg(test)]
pub(crate) fn test_release(id: &str, label: Option<&str>, artists: &[&str], styles: &[&str]) -> Release {
    Release {
        id: id.to_owned(),
        title: format!("Title {id}"),
        year: Some(2008),
        artist_names: artists.iter().map(|name| (*name).to_owned()).collect(),
        label_name: label.map(str::to_owned),
        genres: vec!["Electronic".to_owned()],
        styles: styles.iter().map(|style| (*style).to_owned()).collect(),
    }
}
