use std::collections::HashSet;

use crate::catalog::Release;

const AFFINITY_LABEL_WEIGHT: f32 = 0.4;
const AFFINITY_ARTIST_WEIGHT: f32 = 0.4;
const AFFINITY_STYLE_WEIGHT: f32 = 0.2;

fn intersection_and_sizes<S: AsRef<str>>(left: &[S], right: &[S]) -> (usize, usize, usize) {
    let left = left.iter().map(AsRef::as_ref).collect::<HashSet<&str>>();
    let right = right.iter().map(AsRef::as_ref).collect::<HashSet<&str>>();
    let common = left.intersection(&right).count();
    (common, left.len(), right.len())
}

/// `|A ∩ B| / |A ∪ B|`; two empty sets score 0.
pub fn jaccard<S: AsRef<str>>(left: &[S], right: &[S]) -> f32 {
    let (common, left_len, right_len) = intersection_and_sizes(left, right);
    let union = left_len + right_len - common;
    if union == 0 {
        0.0
    } else {
        common as f32 / union as f32
    }
}

/// `|A ∩ B| / max(|A|, |B|)`; 0 when either side is empty.
pub fn overlap_ratio<S: AsRef<str>>(left: &[S], right: &[S]) -> f32 {
    let (common, left_len, right_len) = intersection_and_sizes(left, right);
    let largest = left_len.max(right_len);
    if left_len == 0 || right_len == 0 {
        0.0
    } else {
        common as f32 / largest as f32
    }
}

fn same_label(left: Option<&str>, right: Option<&str>) -> bool {
    matches!((left, right), (Some(left), Some(right)) if left == right)
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimilarityWeights {
    pub styles: f32,
    pub label_bonus: f32,
    pub artists: f32,
}

impl SimilarityWeights {
    pub fn style_only() -> Self {
        Self {
            styles: 1.0,
            label_bonus: 0.0,
            artists: 0.0,
        }
    }

    pub fn score<S: AsRef<str>>(
        &self,
        styles: (&[S], &[S]),
        labels: (Option<&str>, Option<&str>),
        artists: (&[S], &[S]),
    ) -> f32 {
        let mut score = self.styles * jaccard(styles.0, styles.1);
        if self.label_bonus > 0.0 && same_label(labels.0, labels.1) {
            score += self.label_bonus;
        }
        if self.artists > 0.0 {
            score += self.artists * overlap_ratio(artists.0, artists.1);
        }
        score.clamp(0.0, 1.0)
    }

    pub fn releases(&self, left: &Release, right: &Release) -> f32 {
        self.score(
            (&left.styles, &right.styles),
            (left.label_name.as_deref(), right.label_name.as_deref()),
            (&left.artist_names, &right.artist_names),
        )
    }
}

/// Label, shared artists and shared styles, weighted 0.4 / 0.4 / 0.2.
pub fn release_affinity(left: &Release, right: &Release) -> f32 {
    let mut affinity = 0.0;
    if same_label(left.label_name.as_deref(), right.label_name.as_deref()) {
        affinity += AFFINITY_LABEL_WEIGHT;
    }
    affinity += overlap_ratio(&left.artist_names, &right.artist_names) * AFFINITY_ARTIST_WEIGHT;
    affinity += overlap_ratio(&left.styles, &right.styles) * AFFINITY_STYLE_WEIGHT;
    affinity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_release;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn jaccard_counts_shared_styles() {
        assert!(close(jaccard(&["Techno", "Minimal"], &["Minimal", "House"]), 1.0 / 3.0));
        assert!(close(jaccard(&["Techno"], &["Techno"]), 1.0));
        assert!(close(jaccard(&["Techno"], &["House"]), 0.0));
    }

    #[test]
    fn empty_sets_have_zero_similarity() {
        let empty: [&str; 0] = [];
        assert_eq!(jaccard(&empty, &empty), 0.0);
        assert_eq!(overlap_ratio(&empty, &["Techno"]), 0.0);
    }

    #[test]
    fn overlap_uses_larger_side() {
        assert!(close(overlap_ratio(&["A"], &["A", "B", "C", "D"]), 0.25));
    }

    #[test]
    fn label_bonus_requires_matching_present_labels() {
        let weights = SimilarityWeights {
            styles: 1.0,
            label_bonus: 0.2,
            artists: 0.0,
        };
        let a = test_release("a", Some("Kompakt"), &[], &["Techno", "Minimal"]);
        let b = test_release("b", Some("Kompakt"), &[], &["Minimal", "House"]);
        let c = test_release("c", None, &[], &["Minimal", "House"]);
        let d = test_release("d", None, &[], &["Minimal", "House"]);

        assert!(close(weights.releases(&a, &b), 1.0 / 3.0 + 0.2));
        assert!(close(weights.releases(&a, &c), 1.0 / 3.0));
        assert!(close(weights.releases(&c, &d), 1.0));
    }

    #[test]
    fn blended_score_is_clamped() {
        let weights = SimilarityWeights {
            styles: 1.0,
            label_bonus: 0.5,
            artists: 0.5,
        };
        let a = test_release("a", Some("L"), &["X"], &["Techno"]);
        let b = test_release("b", Some("L"), &["X"], &["Techno"]);
        assert_eq!(weights.releases(&a, &b), 1.0);
    }

    #[test]
    fn style_only_weights_are_plain_jaccard() {
        let a = test_release("a", Some("L"), &["X"], &["Techno", "Minimal"]);
        let b = test_release("b", Some("L"), &["X"], &["Techno"]);
        assert!(close(SimilarityWeights::style_only().releases(&a, &b), 0.5));
    }

    #[test]
    fn affinity_weights_label_artists_and_styles() {
        let a = test_release("a", Some("Warp"), &["Aphex Twin"], &["IDM", "Ambient"]);
        let b = test_release("b", Some("Warp"), &["Aphex Twin", "Other"], &["IDM"]);
        // 0.4 label + 0.4 * 1/2 artists + 0.2 * 1/2 styles
        assert!(close(release_affinity(&a, &b), 0.7));
        assert!(close(release_affinity(&a, &a), 1.0));
    }
}
