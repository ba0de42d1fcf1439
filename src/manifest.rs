//! Playlist manifest loading.
//!
//! The ingester writes `{ "episodes": [ ... ] }`; a bare array of episode
//! records is accepted as well. Records without a duration are skipped.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::{RetryPolicy, get_text_with_retries, is_remote};
use crate::schedule::{Episode, Playlist};

/// Loop order applied to manifest records before building the playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaylistOrder {
    /// Keep the order the records appear in.
    #[default]
    Manifest,
    /// Stable sort by season, then episode number.
    SeasonEpisode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestEpisode {
    production_id: i64,
    #[serde(default)]
    season: u32,
    #[serde(default)]
    episode: u32,
    #[serde(default)]
    title: String,
    #[serde(default)]
    filename: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    duration_seconds: Option<f64>,
}

impl ManifestEpisode {
    fn into_episode(self) -> Option<Episode> {
        Some(Episode {
            production_id: self.production_id,
            season: self.season,
            episode: self.episode,
            title: self.title,
            filename: self.filename,
            url: self.url,
            duration_seconds: self.duration_seconds?,
        })
    }
}

/// Reads a manifest from a local path or an `http(s)://` URL.
pub fn load_manifest(source: &str, order: PlaylistOrder, policy: &RetryPolicy) -> Result<Playlist> {
    let raw = if is_remote(source) {
        tracing::info!(url = source, "fetching manifest");
        get_text_with_retries(source, policy)?
    } else {
        read_manifest_file(Path::new(source))?
    };
    parse_manifest(&raw, order).with_context(|| format!("invalid manifest at {source}"))
}

fn read_manifest_file(path: &Path) -> Result<String> {
    tracing::debug!(path = %path.display(), "reading manifest");
    fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest at {}", path.display()))
}

pub fn parse_manifest(raw: &str, order: PlaylistOrder) -> Result<Playlist> {
    let document: Value = serde_json::from_str(raw).context("manifest is not valid JSON")?;
    let records = match document {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("episodes") {
            Some(Value::Array(items)) => items,
            Some(_) => bail!("manifest field `episodes` must be an array"),
            None => bail!("manifest object has no `episodes` field"),
        },
        _ => bail!("manifest must be an object or an array"),
    };

    let mut episodes = Vec::with_capacity(records.len());
    let mut skipped = 0;
    for (idx, record) in records.into_iter().enumerate() {
        let parsed: ManifestEpisode = serde_json::from_value(record)
            .with_context(|| format!("malformed episode record at position {idx}"))?;
        match parsed.into_episode() {
            Some(episode) => episodes.push(episode),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        tracing::warn!(skipped, "ignored manifest record(s) without durationSeconds");
    }

    if order == PlaylistOrder::SeasonEpisode {
        episodes.sort_by_key(|episode| (episode.season, episode.episode));
    }

    let count = episodes.len();
    let playlist = Playlist::new(episodes).context("manifest does not form a playable loop")?;
    tracing::debug!(
        episodes = count,
        total_seconds = playlist.total_duration_seconds(),
        "manifest loaded"
    );
    Ok(playlist)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use crate::http::test_server::{Behavior, TestServer};
    use crate::schedule::ScheduleError;

    use super::*;

    const INGESTED: &str = r#"{
      "episodes": [
        {"productionId": 3, "season": 1, "episode": 3, "title": "Three", "filename": "3.mp4",
         "url": "/3.mp4", "durationSeconds": 600, "poster": "/posters/three.jpg", "captions": []},
        {"productionId": 1, "season": 1, "episode": 1, "title": "One", "filename": "1.mp4",
         "url": "/1.mp4", "durationSeconds": 300},
        {"productionId": 2, "season": 1, "episode": 2, "title": "Two", "filename": "2.mp4",
         "url": "/2.mp4", "durationSeconds": 300.5}
      ]
    }"#;

    fn ids(playlist: &Playlist) -> Vec<i64> {
        playlist.episodes().iter().map(|ep| ep.production_id).collect()
    }

    #[test]
    fn parses_ingester_output_in_manifest_order() {
        let playlist = parse_manifest(INGESTED, PlaylistOrder::Manifest).expect("parse");
        assert_eq!(ids(&playlist), vec![3, 1, 2]);
        assert_eq!(playlist.total_duration_seconds(), 1200.5);
        assert_eq!(playlist.episodes()[0].title, "Three");
        assert_eq!(playlist.episodes()[0].url, "/3.mp4");
    }

    #[test]
    fn season_episode_order_sorts_stably() {
        let raw = r#"[
          {"productionId": 10, "season": 2, "episode": 1, "durationSeconds": 60},
          {"productionId": 11, "season": 1, "episode": 2, "durationSeconds": 60},
          {"productionId": 12, "season": 1, "episode": 1, "durationSeconds": 60},
          {"productionId": 13, "season": 1, "episode": 1, "durationSeconds": 60}
        ]"#;
        let playlist = parse_manifest(raw, PlaylistOrder::SeasonEpisode).expect("parse");
        assert_eq!(ids(&playlist), vec![12, 13, 11, 10]);
    }

    #[test]
    fn skips_records_without_duration() {
        let raw = r#"[
          {"productionId": 1, "durationSeconds": 60},
          {"productionId": 2},
          {"productionId": 3, "durationSeconds": null}
        ]"#;
        let playlist = parse_manifest(raw, PlaylistOrder::Manifest).expect("parse");
        assert_eq!(ids(&playlist), vec![1]);
    }

    #[test]
    fn rejects_manifests_that_cannot_loop() {
        let err = parse_manifest(r#"{"episodes": []}"#, PlaylistOrder::Manifest)
            .expect_err("empty manifest");
        assert!(matches!(
            err.downcast_ref::<ScheduleError>(),
            Some(ScheduleError::InvalidPlaylist(_))
        ));

        let err = parse_manifest(
            r#"[{"productionId": 1, "durationSeconds": 0}]"#,
            PlaylistOrder::Manifest,
        )
        .expect_err("zero total");
        assert!(matches!(
            err.downcast_ref::<ScheduleError>(),
            Some(ScheduleError::InvalidPlaylist(_))
        ));
    }

    #[test]
    fn rejects_malformed_documents() {
        for raw in ["not json", "42", r#"{"items": []}"#, r#"{"episodes": {}}"#] {
            assert!(parse_manifest(raw, PlaylistOrder::Manifest).is_err(), "{raw}");
        }
        let err = parse_manifest(r#"[{"title": "no id", "durationSeconds": 5}]"#, PlaylistOrder::Manifest)
            .expect_err("missing productionId");
        assert!(format!("{err:#}").contains("position 0"));
    }

    #[test]
    fn loads_manifest_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(INGESTED.as_bytes()).expect("write manifest");
        let source = file.path().to_string_lossy().to_string();

        let playlist = load_manifest(&source, PlaylistOrder::SeasonEpisode, &RetryPolicy::default())
            .expect("load");
        assert_eq!(ids(&playlist), vec![1, 2, 3]);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempfile::tempdir().expect("temp dir");
        let source = dir.path().join("episodes.json").to_string_lossy().to_string();
        let err = load_manifest(&source, PlaylistOrder::Manifest, &RetryPolicy::default())
            .expect_err("missing file");
        assert!(err.to_string().contains("failed to read manifest"));
    }

    #[test]
    fn loads_manifest_over_http() {
        let server = TestServer::spawn(vec![
            Behavior::Respond(503, "warming up".to_string()),
            Behavior::Respond(200, INGESTED.to_string()),
        ]);
        let policy = RetryPolicy {
            connect_timeout: Duration::from_millis(200),
            read_timeout: Duration::from_millis(500),
            attempts: 2,
            retry_delay: Duration::from_millis(1),
        };
        let url = format!("{}/episodes.json", server.base_url);

        let playlist = load_manifest(&url, PlaylistOrder::Manifest, &policy).expect("load");
        assert_eq!(playlist.len(), 3);
        assert_eq!(server.request_count(), 2);
    }
}
