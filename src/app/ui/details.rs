use eframe::egui::{self, RichText, Ui};

use crate::explore::{NodeTarget, artist_node_id, label_node_id};
use crate::util::truncate_label;

use super::super::ViewModel;

/// A clickable entry in the details panel.
struct RelatedEntry {
    id: String,
    text: String,
}

impl ViewModel {
    pub(in crate::app) fn draw_details(&mut self, ui: &mut Ui) {
        ui.heading("Selection Details");
        ui.add_space(6.0);

        let Some(selected_id) = self.explorer.selected().map(str::to_owned) else {
            ui.label("Click a cluster to expand it, or any other node to inspect it.");
            return;
        };

        let Some(target) = self.explorer.resolve(&selected_id) else {
            ui.label("Selected node no longer exists.");
            return;
        };

        let clicked = match target {
            NodeTarget::Cluster(cluster) => self.draw_cluster_details(ui, cluster),
            NodeTarget::Release(release) => self.draw_release_details(ui, release),
            NodeTarget::Artist(name) => self.draw_artist_details(ui, &name),
            NodeTarget::Label(name) => self.draw_label_details(ui, &name),
        };

        if let Some(id) = clicked {
            self.reveal_and_focus(&id);
        }
    }

    fn release_entries(&self, releases: &[usize]) -> Vec<RelatedEntry> {
        let catalog = self.explorer.catalog();
        releases
            .iter()
            .filter_map(|&index| catalog.release(index))
            .map(|release| RelatedEntry {
                id: release.id.clone(),
                text: release.display_name(),
            })
            .collect()
    }

    fn draw_cluster_details(&mut self, ui: &mut Ui, cluster: usize) -> Option<String> {
        let index = self.explorer.index();
        let cluster_ref = &index.clusters[cluster];

        ui.label(RichText::new(cluster_ref.name.as_str()).strong());
        ui.small(cluster_ref.id.as_str());
        ui.add_space(6.0);
        ui.label(format!("Releases: {}", cluster_ref.count()));
        if let Some(style) = &cluster_ref.dominant_style {
            ui.label(format!("Dominant style: {style}"));
        }
        if let Some(label) = &cluster_ref.dominant_label {
            ui.label(format!("Dominant label: {label}"));
        }
        if !cluster_ref.styles.is_empty() {
            ui.label(format!("Styles: {}", cluster_ref.styles.join(", ")));
        }
        ui.label(if self.explorer.is_expanded(cluster) {
            "Expanded: click the cluster again to collapse it."
        } else {
            "Collapsed: click the cluster to show its releases."
        });

        let linked = index
            .linked_clusters(cluster)
            .into_iter()
            .map(|(other, similarity)| RelatedEntry {
                id: index.clusters[other].id.clone(),
                text: format!("{}  ({similarity:.2})", index.clusters[other].name),
            })
            .collect::<Vec<_>>();
        let members = self.release_entries(&cluster_ref.members);

        ui.separator();
        let mut clicked = Self::draw_related_list(ui, "Similar clusters", "linked_clusters", &linked, None);

        ui.separator();
        let row_limit = self.member_rows_visible;
        let (member_click, rows_wanted) =
            Self::draw_paged_list(ui, "Releases", "cluster_members", &members, row_limit);
        clicked = clicked.or(member_click);
        if let Some(rows) = rows_wanted {
            self.member_rows_visible = rows;
        }
        clicked
    }

    fn draw_release_details(&mut self, ui: &mut Ui, release: usize) -> Option<String> {
        let catalog = self.explorer.catalog();
        let index = self.explorer.index();
        let Some(release_ref) = catalog.release(release) else {
            ui.label("Selected release no longer exists.");
            return None;
        };

        ui.label(RichText::new(release_ref.title.as_str()).strong());
        ui.small(release_ref.id.as_str());
        ui.add_space(6.0);
        match release_ref.year {
            Some(year) => ui.label(format!("Year: {year}")),
            None => ui.label("Year: unknown"),
        };
        if !release_ref.genres.is_empty() {
            ui.label(format!("Genres: {}", release_ref.genres.join(", ")));
        }
        if !release_ref.styles.is_empty() {
            ui.label(format!("Styles: {}", release_ref.styles.join(", ")));
        }

        let mut credits = release_ref
            .artist_names
            .iter()
            .map(|name| RelatedEntry {
                id: artist_node_id(name),
                text: format!("Artist: {name}"),
            })
            .collect::<Vec<_>>();
        if let Some(label) = &release_ref.label_name {
            credits.push(RelatedEntry {
                id: label_node_id(label),
                text: format!("Label: {label}"),
            });
        }
        if let Some(cluster) = index.cluster_of_release(release) {
            credits.push(RelatedEntry {
                id: index.clusters[cluster].id.clone(),
                text: format!("Cluster: {}", index.clusters[cluster].name),
            });
        } else {
            ui.label("Not part of any cluster.");
        }

        let similar = index
            .similar_releases(release)
            .into_iter()
            .filter_map(|(other, similarity)| {
                catalog.release(other).map(|other| RelatedEntry {
                    id: other.id.clone(),
                    text: format!("{}  ({similarity:.2})", other.display_name()),
                })
            })
            .collect::<Vec<_>>();

        ui.separator();
        let clicked = Self::draw_related_list(ui, "Credits", "release_credits", &credits, None);
        ui.separator();
        clicked.or(Self::draw_related_list(
            ui,
            "Similar releases",
            "similar_releases",
            &similar,
            None,
        ))
    }

    fn draw_artist_details(&mut self, ui: &mut Ui, name: &str) -> Option<String> {
        let catalog = self.explorer.catalog();
        let releases = catalog.artist_releases(name);

        ui.label(RichText::new(name).strong());
        ui.small(artist_node_id(name));
        ui.add_space(6.0);
        ui.label(format!("Releases: {}", releases.len()));

        let mut labels = Vec::<&str>::new();
        for release in releases.iter().filter_map(|&index| catalog.release(index)) {
            if let Some(label) = release.label_name.as_deref()
                && !labels.contains(&label)
            {
                labels.push(label);
            }
        }
        let label_entries = labels
            .into_iter()
            .map(|label| RelatedEntry {
                id: label_node_id(label),
                text: label.to_owned(),
            })
            .collect::<Vec<_>>();
        let release_entries = self.release_entries(releases);

        ui.separator();
        let clicked = Self::draw_related_list(ui, "Labels", "artist_labels", &label_entries, None);
        ui.separator();
        clicked.or(Self::draw_related_list(
            ui,
            "Discography",
            "artist_releases",
            &release_entries,
            Some(320.0),
        ))
    }

    fn draw_label_details(&mut self, ui: &mut Ui, name: &str) -> Option<String> {
        let catalog = self.explorer.catalog();
        let releases = catalog.label_releases(name);

        ui.label(RichText::new(name).strong());
        ui.small(label_node_id(name));
        ui.add_space(6.0);
        ui.label(format!("Releases: {}", releases.len()));

        let mut artists = Vec::<&str>::new();
        for release in releases.iter().filter_map(|&index| catalog.release(index)) {
            for artist in &release.artist_names {
                if !artists.contains(&artist.as_str()) {
                    artists.push(artist);
                }
            }
        }
        ui.label(format!("Artists: {}", artists.len()));
        let artist_entries = artists
            .into_iter()
            .map(|artist| RelatedEntry {
                id: artist_node_id(artist),
                text: artist.to_owned(),
            })
            .collect::<Vec<_>>();
        let release_entries = self.release_entries(releases);

        ui.separator();
        let clicked = Self::draw_related_list(ui, "Artists", "label_artists", &artist_entries, Some(160.0));
        ui.separator();
        clicked.or(Self::draw_related_list(
            ui,
            "Catalogue",
            "label_releases",
            &release_entries,
            Some(320.0),
        ))
    }

    fn draw_related_list(
        ui: &mut Ui,
        title: &str,
        salt: &str,
        entries: &[RelatedEntry],
        max_height: Option<f32>,
    ) -> Option<String> {
        ui.label(RichText::new(title).strong());
        if entries.is_empty() {
            ui.label("None.");
            return None;
        }

        let mut clicked = None;
        egui::ScrollArea::vertical()
            .id_salt(salt)
            .max_height(max_height.unwrap_or(180.0))
            .auto_shrink([false, true])
            .show_rows(ui, 20.0, entries.len(), |ui, row_range| {
                for entry in &entries[row_range] {
                    if ui
                        .link(truncate_label(&entry.text, 48))
                        .on_hover_text(entry.id.as_str())
                        .clicked()
                    {
                        clicked = Some(entry.id.clone());
                    }
                }
            });
        clicked
    }

    /// Like `draw_related_list` but grows the row budget while scrolling.
    /// Returns the click and the new row budget when more rows are wanted.
    fn draw_paged_list(
        ui: &mut Ui,
        title: &str,
        salt: &str,
        entries: &[RelatedEntry],
        rows_visible: usize,
    ) -> (Option<String>, Option<usize>) {
        ui.label(RichText::new(format!("{title} ({})", entries.len())).strong());
        let row_count = entries.len().min(rows_visible);
        let mut should_load_more = false;
        let mut clicked = None;

        egui::ScrollArea::vertical()
            .id_salt(salt)
            .max_height(320.0)
            .auto_shrink([false, false])
            .show_rows(ui, 20.0, row_count, |ui, row_range| {
                if row_range.end + Self::LIST_PREFETCH_MARGIN >= row_count {
                    should_load_more = true;
                }
                for entry in &entries[row_range] {
                    if ui
                        .link(truncate_label(&entry.text, 48))
                        .on_hover_text(entry.id.as_str())
                        .clicked()
                    {
                        clicked = Some(entry.id.clone());
                    }
                }
            });

        let rows_wanted = (should_load_more && row_count < entries.len())
            .then(|| (row_count + Self::LIST_PAGE_ROWS).min(entries.len()));
        (clicked, rows_wanted)
    }
}
