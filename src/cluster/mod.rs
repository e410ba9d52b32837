mod group;
mod links;
mod similarity;

use std::collections::HashMap;

use tracing::info;

use crate::catalog::{Catalog, Release};

pub use group::GroupBy;
pub use similarity::SimilarityWeights;

use group::{Group, group_by_affinity, group_by_key, most_common, ranked_by_frequency};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterConfig {
    pub group_by: GroupBy,
    pub min_cluster_size: usize,
    pub size_scale: f32,
    pub link_threshold: f32,
    pub label_bonus: f32,
    pub artist_weight: f32,
    pub affinity_threshold: f32,
    pub max_links_per_release: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            group_by: GroupBy::Style,
            min_cluster_size: 3,
            size_scale: 5.0,
            link_threshold: 0.3,
            label_bonus: 0.1,
            artist_weight: 0.0,
            affinity_threshold: 0.3,
            max_links_per_release: 4,
        }
    }
}

impl ClusterConfig {
    pub fn weights(&self) -> SimilarityWeights {
        SimilarityWeights {
            styles: 1.0,
            label_bonus: self.label_bonus,
            artists: self.artist_weight,
        }
    }

    pub fn cluster_size(&self, count: usize) -> f32 {
        (count as f32).sqrt() * self.size_scale
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Cluster {
    pub id: String,
    pub name: String,
    pub members: Vec<usize>,
    pub size: f32,
    /// Union of member styles, most frequent first.
    pub styles: Vec<String>,
    pub dominant_style: Option<String>,
    pub dominant_label: Option<String>,
}

impl Cluster {
    pub fn count(&self) -> usize {
        self.members.len()
    }
}

/// Similarity link between two clusters, by position in `ClusterIndex::clusters`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClusterLink {
    pub source: usize,
    pub target: usize,
    pub similarity: f32,
}

/// Similarity link between two releases of the same cluster, by catalog index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MemberLink {
    pub source: usize,
    pub target: usize,
    pub similarity: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusterIndex {
    pub config: ClusterConfig,
    pub clusters: Vec<Cluster>,
    pub cluster_links: Vec<ClusterLink>,
    /// Parallel to `clusters`.
    pub member_links: Vec<Vec<MemberLink>>,
    pub unclustered: usize,
    index_by_id: HashMap<String, usize>,
    cluster_of_release: HashMap<usize, usize>,
}

impl ClusterIndex {
    pub fn cluster_index(&self, id: &str) -> Option<usize> {
        self.index_by_id.get(id).copied()
    }

    pub fn cluster_by_id(&self, id: &str) -> Option<&Cluster> {
        self.cluster_index(id).and_then(|index| self.clusters.get(index))
    }

    pub fn cluster_of_release(&self, release_index: usize) -> Option<usize> {
        self.cluster_of_release.get(&release_index).copied()
    }

    pub fn linked_clusters(&self, cluster: usize) -> Vec<(usize, f32)> {
        let mut linked = self
            .cluster_links
            .iter()
            .filter_map(|link| {
                if link.source == cluster {
                    Some((link.target, link.similarity))
                } else if link.target == cluster {
                    Some((link.source, link.similarity))
                } else {
                    None
                }
            })
            .collect::<Vec<_>>();
        linked.sort_by(|a, b| b.1.total_cmp(&a.1));
        linked
    }

    pub fn similar_releases(&self, release_index: usize) -> Vec<(usize, f32)> {
        let Some(cluster) = self.cluster_of_release(release_index) else {
            return Vec::new();
        };
        let mut similar = self.member_links[cluster]
            .iter()
            .filter_map(|link| {
                if link.source == release_index {
                    Some((link.target, link.similarity))
                } else if link.target == release_index {
                    Some((link.source, link.similarity))
                } else {
                    None
                }
            })
            .collect::<Vec<_>>();
        similar.sort_by(|a, b| b.1.total_cmp(&a.1));
        similar
    }
}

fn cluster_id(group_by: GroupBy, key: &str) -> String {
    match group_by {
        GroupBy::Similarity => format!("cluster-group-{key}"),
        _ => format!("cluster-{key}"),
    }
}

fn make_cluster(catalog: &Catalog, config: &ClusterConfig, group: Group) -> Cluster {
    let releases = catalog.releases();
    let members = group.members;
    let member_releases = || members.iter().map(|&index| &releases[index]);

    let styles = ranked_by_frequency(
        member_releases().flat_map(|release: &Release| release.styles.iter().map(String::as_str)),
    )
    .into_iter()
    .map(str::to_owned)
    .collect::<Vec<_>>();
    let dominant_style = most_common(
        member_releases()
            .filter_map(|release: &Release| release.styles.first().map(String::as_str)),
    )
    .map(str::to_owned);
    let dominant_label = most_common(
        member_releases().filter_map(|release: &Release| release.label_name.as_deref()),
    )
    .map(str::to_owned);

    Cluster {
        id: cluster_id(config.group_by, &group.key),
        name: group.name,
        size: config.cluster_size(members.len()),
        members,
        styles,
        dominant_style,
        dominant_label,
    }
}

pub fn build_cluster_index(catalog: &Catalog, config: &ClusterConfig) -> ClusterIndex {
    let min_size = config.min_cluster_size.max(1);
    let groups = match config.group_by {
        GroupBy::Style => group_by_key(catalog, Release::primary_style),
        GroupBy::Label => group_by_key(catalog, Release::label_or_unknown),
        GroupBy::Similarity => group_by_affinity(catalog, config.affinity_threshold, min_size),
    };

    let mut clusters = groups
        .into_iter()
        .filter(|group| group.members.len() >= min_size)
        .map(|group| make_cluster(catalog, config, group))
        .collect::<Vec<_>>();
    clusters.sort_by(|a, b| {
        b.count()
            .cmp(&a.count())
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });

    let weights = config.weights();
    let cluster_links = links::cluster_links(&clusters, weights, config.link_threshold);
    let member_links = clusters
        .iter()
        .map(|cluster| {
            links::member_links(
                catalog,
                &cluster.members,
                weights,
                config.link_threshold,
                config.max_links_per_release,
            )
        })
        .collect::<Vec<_>>();

    let mut index_by_id = HashMap::with_capacity(clusters.len());
    let mut cluster_of_release = HashMap::new();
    for (position, cluster) in clusters.iter().enumerate() {
        index_by_id.insert(cluster.id.clone(), position);
        for &member in &cluster.members {
            cluster_of_release.insert(member, position);
        }
    }
    let unclustered = catalog.len() - cluster_of_release.len();

    info!(
        group_by = config.group_by.label(),
        clusters = clusters.len(),
        cluster_links = cluster_links.len(),
        member_links = member_links.iter().map(Vec::len).sum::<usize>(),
        unclustered,
        "built cluster index"
    );

    ClusterIndex {
        config: *config,
        clusters,
        cluster_links,
        member_links,
        unclustered,
        index_by_id,
        cluster_of_release,
    }
}

#[cfg(test)]
pub(crate) fn sample_catalog() -> Catalog {
    use crate::catalog::test_release;

    Catalog::from_releases(vec![
        test_release("t1", Some("Kompakt"), &["Gui Boratto"], &["Techno", "Minimal"]),
        test_release("t2", Some("Kompakt"), &["Gui Boratto"], &["Techno"]),
        test_release("t3", Some("M-Plant"), &["Robert Hood"], &["Techno", "Minimal"]),
        test_release("t4", Some("Tresor"), &["Jeff Mills"], &["Techno"]),
        test_release("m1", Some("Kompakt"), &["Superpitcher"], &["Minimal", "Techno"]),
        test_release("m2", Some("Perlon"), &["Ricardo Villalobos"], &["Minimal"]),
        test_release("m3", Some("Perlon"), &["Zip"], &["Minimal", "Tech House"]),
        test_release("h1", Some("Warp"), &["Aphex Twin"], &["House"]),
        test_release("a1", None, &["Burial"], &[]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_clusters_drop_small_groups() {
        let catalog = sample_catalog();
        let index = build_cluster_index(&catalog, &ClusterConfig::default());

        let ids = index
            .clusters
            .iter()
            .map(|cluster| cluster.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["cluster-Techno", "cluster-Minimal"]);
        assert_eq!(index.clusters[0].count(), 4);
        assert_eq!(index.clusters[1].count(), 3);
        assert_eq!(index.unclustered, 2);
        assert_eq!(index.cluster_of_release(8), None);
        assert_eq!(index.cluster_of_release(4), Some(1));
    }

    #[test]
    fn cluster_size_scales_with_square_root() {
        let catalog = sample_catalog();
        let config = ClusterConfig {
            size_scale: 2.0,
            ..ClusterConfig::default()
        };
        let index = build_cluster_index(&catalog, &config);
        assert!((index.clusters[0].size - 4.0).abs() < 1e-5);
    }

    #[test]
    fn aggregated_styles_and_dominant_label() {
        let catalog = sample_catalog();
        let index = build_cluster_index(&catalog, &ClusterConfig::default());
        let techno = index.cluster_by_id("cluster-Techno").unwrap();

        assert_eq!(techno.styles, vec!["Techno", "Minimal"]);
        assert_eq!(techno.dominant_label.as_deref(), Some("Kompakt"));
        assert_eq!(techno.dominant_style.as_deref(), Some("Techno"));
    }

    #[test]
    fn clusters_link_when_styles_overlap() {
        let catalog = sample_catalog();
        let index = build_cluster_index(&catalog, &ClusterConfig::default());

        // Techno {Techno, Minimal} vs Minimal {Minimal, Techno, Tech House}: 2/3
        assert_eq!(index.cluster_links.len(), 1);
        let link = index.cluster_links[0];
        assert_eq!((link.source, link.target), (0, 1));
        assert!((link.similarity - 2.0 / 3.0).abs() < 1e-5);
        assert_eq!(index.linked_clusters(1), vec![(0, link.similarity)]);
    }

    #[test]
    fn label_grouping_uses_label_names() {
        let catalog = sample_catalog();
        let config = ClusterConfig {
            group_by: GroupBy::Label,
            min_cluster_size: 2,
            ..ClusterConfig::default()
        };
        let index = build_cluster_index(&catalog, &config);
        let ids = index
            .clusters
            .iter()
            .map(|cluster| cluster.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["cluster-Kompakt", "cluster-Perlon"]);
    }

    #[test]
    fn similarity_grouping_names_by_label() {
        let catalog = sample_catalog();
        let config = ClusterConfig {
            group_by: GroupBy::Similarity,
            ..ClusterConfig::default()
        };
        let index = build_cluster_index(&catalog, &config);
        assert_eq!(index.clusters.len(), 1);
        assert_eq!(index.clusters[0].name, "Kompakt Group");
        assert_eq!(index.clusters[0].id, "cluster-group-0");
        assert_eq!(index.clusters[0].members, vec![0, 1, 4]);
    }

    #[test]
    fn member_links_are_looked_up_per_release() {
        let catalog = sample_catalog();
        let index = build_cluster_index(&catalog, &ClusterConfig::default());
        let similar = index.similar_releases(0);
        assert!(!similar.is_empty());
        assert!(similar.iter().all(|(other, _)| index.cluster_of_release(*other) == Some(0)));
        assert!(index.similar_releases(8).is_empty());
    }

    #[test]
    fn building_twice_gives_identical_results() {
        let catalog = sample_catalog();
        let config = ClusterConfig::default();
        assert_eq!(
            build_cluster_index(&catalog, &config),
            build_cluster_index(&catalog, &config)
        );
    }
}
