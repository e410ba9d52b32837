use crate::catalog::Catalog;

use super::similarity::SimilarityWeights;
use super::{Cluster, ClusterLink, MemberLink};

pub(super) fn cluster_links(
    clusters: &[Cluster],
    weights: SimilarityWeights,
    threshold: f32,
) -> Vec<ClusterLink> {
    let mut links = Vec::new();
    for (source, left) in clusters.iter().enumerate() {
        for (offset, right) in clusters[source + 1..].iter().enumerate() {
            let no_artists: &[String] = &[];
            let similarity = weights.score(
                (&left.styles, &right.styles),
                (left.dominant_label.as_deref(), right.dominant_label.as_deref()),
                (no_artists, no_artists),
            );
            if similarity > threshold {
                links.push(ClusterLink {
                    source,
                    target: source + 1 + offset,
                    similarity,
                });
            }
        }
    }
    links
}

/// Pairwise similarity inside one cluster. Pairs are taken strongest first
/// and a pair is kept only while both releases have fewer than
/// `max_per_release` links.
pub(super) fn member_links(
    catalog: &Catalog,
    members: &[usize],
    weights: SimilarityWeights,
    threshold: f32,
    max_per_release: usize,
) -> Vec<MemberLink> {
    if max_per_release == 0 || members.len() < 2 {
        return Vec::new();
    }

    let releases = catalog.releases();
    let mut candidates = Vec::new();
    for i in 0..members.len() {
        for j in (i + 1)..members.len() {
            let similarity = weights.releases(&releases[members[i]], &releases[members[j]]);
            if similarity > threshold {
                candidates.push((i, j, similarity));
            }
        }
    }
    candidates.sort_by(|a, b| {
        b.2.total_cmp(&a.2)
            .then_with(|| a.0.cmp(&b.0))
            .then_with(|| a.1.cmp(&b.1))
    });

    let mut degree = vec![0usize; members.len()];
    let mut kept = Vec::new();
    for (low, high, similarity) in candidates {
        if degree[low] < max_per_release && degree[high] < max_per_release {
            degree[low] += 1;
            degree[high] += 1;
            kept.push((low, high, similarity));
        }
    }
    kept.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    kept.into_iter()
        .map(|(low, high, similarity)| MemberLink {
            source: members[low],
            target: members[high],
            similarity,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_release;

    fn degrees(links: &[MemberLink], releases: usize) -> Vec<usize> {
        let mut degree = vec![0; releases];
        for link in links {
            degree[link.source] += 1;
            degree[link.target] += 1;
        }
        degree
    }

    #[test]
    fn member_links_respect_threshold_and_cap() {
        let catalog = Catalog::from_releases(vec![
            test_release("hub", None, &[], &["Techno"]),
            test_release("a", None, &[], &["Techno"]),
            test_release("b", None, &[], &["Techno"]),
            test_release("c", None, &[], &["Techno"]),
            test_release("odd", None, &[], &["Ambient"]),
        ]);
        let members = vec![0, 1, 2, 3, 4];

        let all = member_links(&catalog, &members, SimilarityWeights::style_only(), 0.3, 8);
        assert_eq!(all.len(), 6);
        assert!(all.iter().all(|link| link.source != 4 && link.target != 4));

        let capped = member_links(&catalog, &members, SimilarityWeights::style_only(), 0.3, 1);
        assert_eq!(capped.len(), 2);
        let degree = degrees(&capped, 5);
        assert_eq!(degree, vec![1, 1, 1, 1, 0]);
    }

    #[test]
    fn shared_release_cannot_exceed_link_cap() {
        let catalog = Catalog::from_releases(vec![
            test_release("hub", None, &[], &["Acid", "Dub", "Electro", "House", "Techno"]),
            test_release("acid", None, &[], &["Acid"]),
            test_release("dub", None, &[], &["Dub"]),
            test_release("electro", None, &[], &["Electro"]),
            test_release("house", None, &[], &["House"]),
            test_release("techno", None, &[], &["Techno"]),
        ]);
        let members = (0..6).collect::<Vec<_>>();

        let links = member_links(&catalog, &members, SimilarityWeights::style_only(), 0.1, 1);
        assert_eq!(links.len(), 1);
        assert_eq!((links[0].source, links[0].target), (0, 1));
        assert!(degrees(&links, 6).iter().all(|&degree| degree <= 1));

        let links = member_links(&catalog, &members, SimilarityWeights::style_only(), 0.1, 3);
        assert_eq!(links.len(), 3);
        assert!(degrees(&links, 6).iter().all(|&degree| degree <= 3));
    }

    #[test]
    fn threshold_is_exclusive() {
        let catalog = Catalog::from_releases(vec![
            test_release("a", None, &[], &["Techno", "House"]),
            test_release("b", None, &[], &["Techno", "Minimal"]),
        ]);
        let members = vec![0, 1];
        let weights = SimilarityWeights::style_only();

        assert!(member_links(&catalog, &members, weights, 1.0 / 3.0, 4).is_empty());
        assert_eq!(member_links(&catalog, &members, weights, 0.3, 4).len(), 1);
    }
}
