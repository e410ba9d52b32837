use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::cluster::{ClusterConfig, GroupBy};
use crate::explore::ExpandMode;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    /// Release dump; relative paths are resolved against the config file.
    pub releases: Option<PathBuf>,
    pub clustering: Option<ClusteringFileConfig>,
    pub view: Option<ViewFileConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ClusteringFileConfig {
    pub group_by: Option<GroupBy>,
    pub min_cluster_size: Option<usize>,
    pub size_scale: Option<f32>,
    pub link_threshold: Option<f32>,
    pub label_bonus: Option<f32>,
    pub artist_weight: Option<f32>,
    pub affinity_threshold: Option<f32>,
    pub max_links_per_release: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ViewFileConfig {
    pub expand_mode: Option<ExpandMode>,
    pub live_physics: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        if let Some(releases) = config.releases.take() {
            let base = path.parent().unwrap_or_else(|| Path::new(""));
            config.releases = Some(base.join(releases));
        }
        Ok(config)
    }
}

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub releases: Option<PathBuf>,
    pub group_by: Option<GroupBy>,
    pub min_cluster_size: Option<usize>,
    pub link_threshold: Option<f32>,
    pub expand_mode: Option<ExpandMode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub releases: PathBuf,
    pub cluster: ClusterConfig,
    pub expand_mode: ExpandMode,
    pub live_physics: bool,
}

impl Settings {
    /// Command line over config file over defaults.
    pub fn resolve(cli: CliOverrides, file: FileConfig) -> Result<Self> {
        let clustering = file.clustering.unwrap_or_default();
        let view = file.view.unwrap_or_default();
        let defaults = ClusterConfig::default();

        let releases = cli
            .releases
            .or(file.releases)
            .context("no release dump given; pass --releases or set `releases` in the config file")?;

        let cluster = ClusterConfig {
            group_by: cli
                .group_by
                .or(clustering.group_by)
                .unwrap_or(defaults.group_by),
            min_cluster_size: cli
                .min_cluster_size
                .or(clustering.min_cluster_size)
                .unwrap_or(defaults.min_cluster_size),
            size_scale: clustering.size_scale.unwrap_or(defaults.size_scale),
            link_threshold: cli
                .link_threshold
                .or(clustering.link_threshold)
                .unwrap_or(defaults.link_threshold),
            label_bonus: clustering.label_bonus.unwrap_or(defaults.label_bonus),
            artist_weight: clustering.artist_weight.unwrap_or(defaults.artist_weight),
            affinity_threshold: clustering
                .affinity_threshold
                .unwrap_or(defaults.affinity_threshold),
            max_links_per_release: clustering
                .max_links_per_release
                .unwrap_or(defaults.max_links_per_release),
        };
        validate_cluster_config(&cluster)?;

        Ok(Self {
            releases,
            cluster,
            expand_mode: cli
                .expand_mode
                .or(view.expand_mode)
                .unwrap_or_default(),
            live_physics: view.live_physics.unwrap_or(true),
        })
    }
}

pub fn validate_cluster_config(config: &ClusterConfig) -> Result<()> {
    let unit_ranged = [
        ("link_threshold", config.link_threshold),
        ("label_bonus", config.label_bonus),
        ("artist_weight", config.artist_weight),
        ("affinity_threshold", config.affinity_threshold),
    ];
    for (name, value) in unit_ranged {
        if !(0.0..=1.0).contains(&value) {
            bail!("{name} must be within [0, 1], got {value}");
        }
    }
    if config.min_cluster_size == 0 {
        bail!("min_cluster_size must be at least 1");
    }
    if config.size_scale.is_nan() || config.size_scale <= 0.0 {
        bail!("size_scale must be positive, got {}", config.size_scale);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_apply_when_nothing_is_configured() {
        let cli = CliOverrides {
            releases: Some(PathBuf::from("releases.json")),
            ..CliOverrides::default()
        };
        let settings = Settings::resolve(cli, FileConfig::default()).unwrap();

        assert_eq!(settings.cluster, ClusterConfig::default());
        assert_eq!(settings.expand_mode, ExpandMode::Augment);
        assert!(settings.live_physics);
    }

    #[test]
    fn file_values_and_relative_release_path() {
        let file = write_config(
            r#"
releases = "dump.json"

[clustering]
group_by = "label"
min_cluster_size = 2
label_bonus = 0.25

[view]
expand_mode = "replace"
live_physics = false
"#,
        );
        let config = FileConfig::load(file.path()).unwrap();
        let settings = Settings::resolve(CliOverrides::default(), config).unwrap();

        let dir = file.path().parent().unwrap();
        assert_eq!(settings.releases, dir.join("dump.json"));
        assert_eq!(settings.cluster.group_by, GroupBy::Label);
        assert_eq!(settings.cluster.min_cluster_size, 2);
        assert_eq!(settings.cluster.label_bonus, 0.25);
        assert_eq!(settings.expand_mode, ExpandMode::Replace);
        assert!(!settings.live_physics);
    }

    #[test]
    fn command_line_overrides_file() {
        let file = write_config(
            r#"
releases = "/data/file.json"
[clustering]
group_by = "label"
link_threshold = 0.5
"#,
        );
        let config = FileConfig::load(file.path()).unwrap();
        let cli = CliOverrides {
            releases: Some(PathBuf::from("/data/cli.json")),
            group_by: Some(GroupBy::Similarity),
            ..CliOverrides::default()
        };
        let settings = Settings::resolve(cli, config).unwrap();

        assert_eq!(settings.releases, PathBuf::from("/data/cli.json"));
        assert_eq!(settings.cluster.group_by, GroupBy::Similarity);
        assert_eq!(settings.cluster.link_threshold, 0.5);
    }

    #[test]
    fn rejects_missing_release_path_and_bad_ranges() {
        assert!(Settings::resolve(CliOverrides::default(), FileConfig::default()).is_err());

        let cli = CliOverrides {
            releases: Some(PathBuf::from("releases.json")),
            link_threshold: Some(1.5),
            ..CliOverrides::default()
        };
        let error = Settings::resolve(cli, FileConfig::default()).unwrap_err();
        assert!(error.to_string().contains("link_threshold"));

        let cli = CliOverrides {
            releases: Some(PathBuf::from("releases.json")),
            min_cluster_size: Some(0),
            ..CliOverrides::default()
        };
        assert!(Settings::resolve(cli, FileConfig::default()).is_err());
    }

    #[test]
    fn malformed_file_reports_path() {
        let file = write_config("releases = [");
        let error = FileConfig::load(file.path()).unwrap_err();
        assert!(error.to_string().contains("Failed to parse config file"));
    }
}
