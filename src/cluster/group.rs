use std::collections::HashMap;

use clap::ValueEnum;
use serde::Deserialize;

use crate::catalog::{Catalog, Release};

use super::similarity::release_affinity;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    /// First style tag of each release.
    #[default]
    Style,
    /// Label name of each release.
    Label,
    /// Greedy seed scan over label, artist and style affinity.
    Similarity,
}

impl GroupBy {
    pub fn label(self) -> &'static str {
        match self {
            Self::Style => "style",
            Self::Label => "label",
            Self::Similarity => "similarity",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(super) struct Group {
    pub(super) key: String,
    pub(super) name: String,
    pub(super) members: Vec<usize>,
}

/// Groups every release under `key_of`, keeping first-seen group order.
pub(super) fn group_by_key<'a>(
    catalog: &'a Catalog,
    key_of: impl Fn(&'a Release) -> &'a str,
) -> Vec<Group> {
    let mut position_by_key: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for (index, release) in catalog.releases().iter().enumerate() {
        let key = key_of(release);
        let position = *position_by_key.entry(key).or_insert_with(|| {
            groups.push(Group {
                key: key.to_owned(),
                name: key.to_owned(),
                members: Vec::new(),
            });
            groups.len() - 1
        });
        groups[position].members.push(index);
    }

    groups
}

/// Seeds a group with the first unassigned release and pulls in every
/// unassigned release whose affinity exceeds `threshold`. Seeds that gather
/// fewer than `min_size` members are dropped on their own.
pub(super) fn group_by_affinity(catalog: &Catalog, threshold: f32, min_size: usize) -> Vec<Group> {
    let releases = catalog.releases();
    let mut assigned = vec![false; releases.len()];
    let mut groups = Vec::new();

    for seed in 0..releases.len() {
        if assigned[seed] {
            continue;
        }

        let members = (0..releases.len())
            .filter(|&candidate| {
                !assigned[candidate]
                    && (candidate == seed
                        || release_affinity(&releases[seed], &releases[candidate]) > threshold)
            })
            .collect::<Vec<_>>();

        if members.len() >= min_size.max(1) {
            for &member in &members {
                assigned[member] = true;
            }
            let name = match most_common(members.iter().filter_map(|&index| {
                releases[index].label_name.as_deref()
            })) {
                Some(label) => format!("{label} Group"),
                None => "Cluster Group".to_owned(),
            };
            groups.push(Group {
                key: groups.len().to_string(),
                name,
                members,
            });
        } else {
            assigned[seed] = true;
        }
    }

    groups
}

/// Most frequent value; ties go to the value seen first.
pub(super) fn most_common<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    ranked_by_frequency(values).into_iter().next()
}

/// Distinct values, most frequent first, ties in first-seen order.
pub(super) fn ranked_by_frequency<'a>(values: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut position_by_value: HashMap<&str, usize> = HashMap::new();
    for value in values {
        match position_by_value.get(value) {
            Some(&position) => counts[position].1 += 1,
            None => {
                position_by_value.insert(value, counts.len());
                counts.push((value, 1));
            }
        }
    }

    // stable sort keeps first-seen order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().map(|(value, _)| value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_release;

    fn catalog() -> Catalog {
        Catalog::from_releases(vec![
            test_release("1", Some("Kompakt"), &["Gui Boratto"], &["Techno", "Minimal"]),
            test_release("2", Some("Warp"), &["Aphex Twin"], &["IDM"]),
            test_release("3", Some("Kompakt"), &["Gui Boratto"], &["Techno"]),
            test_release("4", None, &["Burial"], &[]),
            test_release("5", Some("Kompakt"), &["Superpitcher"], &["Techno", "House"]),
        ])
    }

    #[test]
    fn groups_by_primary_style_in_first_seen_order() {
        let catalog = catalog();
        let groups = group_by_key(&catalog, Release::primary_style);

        let summary = groups
            .iter()
            .map(|group| (group.key.as_str(), group.members.clone()))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                ("Techno", vec![0, 2, 4]),
                ("IDM", vec![1]),
                ("Unknown", vec![3]),
            ]
        );
    }

    #[test]
    fn groups_by_label_with_unknown_bucket() {
        let catalog = catalog();
        let groups = group_by_key(&catalog, Release::label_or_unknown);
        assert_eq!(groups[0].key, "Kompakt");
        assert_eq!(groups[0].members, vec![0, 2, 4]);
        assert!(groups.iter().any(|group| group.key == "Unknown"));
    }

    #[test]
    fn affinity_groups_collect_label_mates() {
        let catalog = catalog();
        let groups = group_by_affinity(&catalog, 0.3, 3);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members, vec![0, 2, 4]);
        assert_eq!(groups[0].name, "Kompakt Group");
    }

    #[test]
    fn affinity_groups_respect_min_size() {
        let catalog = catalog();
        assert!(group_by_affinity(&catalog, 0.3, 4).is_empty());
    }

    #[test]
    fn frequency_ranking_breaks_ties_by_first_seen() {
        let ranked = ranked_by_frequency(["b", "a", "a", "b", "c"]);
        assert_eq!(ranked, vec!["b", "a", "c"]);
        assert_eq!(most_common(std::iter::empty::<&str>()), None);
    }
}
