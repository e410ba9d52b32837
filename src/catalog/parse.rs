use serde::Deserialize;
use serde_json::Value;

use crate::error::CatalogError;

use super::release::Release;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRelease {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    year: Option<Value>,
    #[serde(default)]
    artist_names: Option<Vec<String>>,
    #[serde(default)]
    artists: Option<Vec<NamedRef>>,
    #[serde(default)]
    label_name: Option<String>,
    #[serde(default)]
    labels: Option<Vec<NamedRef>>,
    #[serde(default)]
    genres: Option<Vec<String>>,
    #[serde(default)]
    styles: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    #[serde(default)]
    name: Option<String>,
}

impl RawRelease {
    fn into_release(self, position: usize) -> Release {
        let id = match self.id {
            Some(Value::String(id)) if !id.trim().is_empty() => id.trim().to_owned(),
            Some(Value::Number(id)) => id.to_string(),
            _ => format!("release-{position}"),
        };

        let title = self
            .title
            .map(|title| title.trim().to_owned())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| "Untitled".to_owned());

        let year = match self.year {
            Some(Value::Number(year)) => year.as_i64().and_then(|year| i32::try_from(year).ok()),
            Some(Value::String(year)) => year.trim().parse::<i32>().ok(),
            _ => None,
        }
        .filter(|year| *year > 0);

        let artist_names = match self.artist_names {
            Some(names) => clean_list(names),
            None => clean_list(
                self.artists
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|artist| artist.name)
                    .map(|name| strip_discogs_suffix(&name).to_owned())
                    .collect(),
            ),
        };

        let label_name = self
            .label_name
            .or_else(|| {
                self.labels
                    .unwrap_or_default()
                    .into_iter()
                    .find_map(|label| label.name)
            })
            .map(|label| label.trim().to_owned())
            .filter(|label| !label.is_empty());

        Release {
            id,
            title,
            year,
            artist_names,
            label_name,
            genres: clean_list(self.genres.unwrap_or_default()),
            styles: clean_list(self.styles.unwrap_or_default()),
        }
    }
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if value.is_empty() || cleaned.iter().any(|existing| existing == value) {
            continue;
        }
        cleaned.push(value.to_owned());
    }
    cleaned
}

/// Discogs appends " (N)" to disambiguate artists that share a name.
fn strip_discogs_suffix(name: &str) -> &str {
    let trimmed = name.trim();
    if let Some(open) = trimmed.rfind(" (")
        && let Some(inner) = trimmed[open + 2..].strip_suffix(')')
        && !inner.is_empty()
        && inner.chars().all(|c| c.is_ascii_digit())
    {
        return &trimmed[..open];
    }
    trimmed
}

fn releases_from_values(values: Vec<Value>) -> Result<Vec<Release>, CatalogError> {
    values
        .into_iter()
        .enumerate()
        .map(|(position, value)| {
            let raw = RawRelease::deserialize(value)?;
            Ok(raw.into_release(position))
        })
        .collect()
}

fn parse_ndjson(raw: &str) -> Result<Vec<Release>, CatalogError> {
    let mut releases = Vec::new();
    for (line_index, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parsed = serde_json::from_str::<RawRelease>(line).map_err(|source| CatalogError::Line {
            line: line_index + 1,
            source,
        })?;
        releases.push(parsed.into_release(releases.len()));
    }
    Ok(releases)
}

pub fn parse_release_dump(raw: &str) -> Result<Vec<Release>, CatalogError> {
    let raw = raw.trim_start_matches('\u{feff}');
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        let values: Vec<Value> = serde_json::from_str(trimmed)?;
        return releases_from_values(values);
    }

    if !trimmed.starts_with('{') {
        return Err(CatalogError::Layout(
            "expected a JSON array, a JSON object or newline-delimited JSON objects".to_owned(),
        ));
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(mut object)) => match object.remove("releases") {
            Some(Value::Array(values)) => releases_from_values(values),
            Some(_) => Err(CatalogError::Layout(
                "`releases` must be an array".to_owned(),
            )),
            None => releases_from_values(vec![Value::Object(object)]),
        },
        Ok(_) => Err(CatalogError::Layout(
            "top-level JSON value is not an object".to_owned(),
        )),
        Err(_) => parse_ndjson(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_normalized_array() {
        let raw = r#"[
            {"id": "a1", "title": "Minimal Nation", "year": 2008,
             "artistNames": ["Robert Hood"], "labelName": "M-Plant",
             "genres": ["Electronic"], "styles": ["Minimal", "Techno"]}
        ]"#;

        let releases = parse_release_dump(raw).unwrap();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].id, "a1");
        assert_eq!(releases[0].artist_names, vec!["Robert Hood"]);
        assert_eq!(releases[0].label_name.as_deref(), Some("M-Plant"));
        assert_eq!(releases[0].styles, vec!["Minimal", "Techno"]);
        assert_eq!(releases[0].year, Some(2008));
    }

    #[test]
    fn parses_discogs_ndjson_lines() {
        let raw = concat!(
            r#"{"id": 1234, "title": "Untrue", "year": 2007, "artists": [{"name": "Burial"}], "labels": [{"name": "Hyperdub", "catno": "HDBCD002"}], "genres": ["Electronic"], "styles": ["Dubstep", "Dubstep"]}"#,
            "\n\n",
            r#"{"title": "Ghost", "year": 0, "artists": [{"name": "Ghost (3)"}], "styles": null}"#,
            "\n"
        );

        let releases = parse_release_dump(raw).unwrap();
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].id, "1234");
        assert_eq!(releases[0].label_name.as_deref(), Some("Hyperdub"));
        assert_eq!(releases[0].styles, vec!["Dubstep"]);
        assert_eq!(releases[1].id, "release-1");
        assert_eq!(releases[1].year, None);
        assert_eq!(releases[1].artist_names, vec!["Ghost"]);
        assert!(releases[1].styles.is_empty());
    }

    #[test]
    fn parses_wrapped_releases_object() {
        let raw = r#"{"releases": [{"id": "x", "title": " Spaced ", "labelName": "  "}]}"#;
        let releases = parse_release_dump(raw).unwrap();
        assert_eq!(releases[0].title, "Spaced");
        assert_eq!(releases[0].label_name, None);
    }

    #[test]
    fn single_object_is_one_release() {
        let raw = r#"{"id": "solo", "title": "One"}"#;
        let releases = parse_release_dump(raw).unwrap();
        assert_eq!(releases.len(), 1);
        assert_eq!(releases[0].id, "solo");
    }

    #[test]
    fn ndjson_errors_report_line_number() {
        let raw = "{\"id\": \"1\", \"title\": \"ok\"}\n{\"id\": \"2\", \"title\": [}\n";
        match parse_release_dump(raw) {
            Err(CatalogError::Line { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected line error, got {other:?}"),
        }
    }

    #[test]
    fn ndjson_line_numbers_count_leading_blank_lines() {
        let raw = "\u{feff}\n\n{\"id\": \"1\", \"title\": \"ok\"}\n{\"id\": \"2\", \"title\": [}\n";
        match parse_release_dump(raw) {
            Err(CatalogError::Line { line, .. }) => assert_eq!(line, 4),
            other => panic!("expected line error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_scalar_documents() {
        assert!(matches!(
            parse_release_dump("42"),
            Err(CatalogError::Layout(_))
        ));
        assert!(parse_release_dump("   ").unwrap().is_empty());
    }

    #[test]
    fn normalized_keys_win_over_discogs_keys() {
        let raw = r#"[{"id": "1", "title": "t", "labelName": "Primary", "labels": [{"name": "Secondary"}]}]"#;
        let releases = parse_release_dump(raw).unwrap();
        assert_eq!(releases[0].label_name.as_deref(), Some("Primary"));
    }

    #[test]
    fn discogs_suffix_only_strips_numbers() {
        assert_eq!(strip_discogs_suffix("Ghost (3)"), "Ghost");
        assert_eq!(strip_discogs_suffix("Ghost (UK)"), "Ghost (UK)");
        assert_eq!(strip_discogs_suffix("Plain"), "Plain");
    }
}
