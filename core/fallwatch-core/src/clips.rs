//! Recorded clip catalog.
//!
//! The clip server lists recordings newest first with paths relative to its
//! own base address. Listing is user-initiated, so failures are returned to
//! the caller instead of being retried.

use fallwatch_protocol::{ClipEntry, ClipHealth, CLIPS_PATH, CLIP_HEALTH_PATH};
use reqwest::Url;
use std::time::Duration;

use crate::error::{MonitorError, Result};
use crate::transport::JsonHttp;

/// A clip resolved against the clip server, ready to hand to a player.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub name: String,
    pub video_url: Url,
    pub recorded: String,
    pub duration: String,
    pub size: Option<String>,
}

impl Clip {
    /// Resolves the entry's address against the clip server the way a link
    /// would be: relative paths land on the server, queries and fragments are
    /// kept, absolute addresses pass through. Returns `None` if the address
    /// cannot be resolved.
    pub fn from_entry(base: &Url, entry: ClipEntry) -> Option<Self> {
        let video_url = match base.join(&entry.url) {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(
                    clip = %entry.name,
                    url = %entry.url,
                    error = %err,
                    "Skipping clip with unusable address"
                );
                return None;
            }
        };
        let recorded = format!("{} {}", entry.date, entry.time).trim().to_string();
        Some(Self {
            video_url,
            name: entry.name,
            recorded,
            duration: entry.duration,
            size: entry.size_mb.map(|size| format!("{} MB", size)),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ClipCatalog {
    http: JsonHttp,
}

impl ClipCatalog {
    pub fn new(base: Url, timeout: Duration) -> Result<Self> {
        Ok(Self {
            http: JsonHttp::new(base, timeout)?,
        })
    }

    pub async fn list(&self) -> Result<Vec<Clip>> {
        let entries: Vec<ClipEntry> = self
            .http
            .get_json(CLIPS_PATH)
            .await
            .map_err(MonitorError::ClipListing)?;
        tracing::debug!(clips = entries.len(), "Clip catalog fetched");
        let base = self.http.base();
        Ok(entries
            .into_iter()
            .filter_map(|entry| Clip::from_entry(base, entry))
            .collect())
    }

    pub async fn is_online(&self) -> bool {
        match self.http.get_json::<ClipHealth>(CLIP_HEALTH_PATH).await {
            Ok(health) => health.is_online(),
            Err(err) => {
                tracing::debug!(error = %err, "Clip server health check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_resolves_against_server_base() {
        let base = Url::parse("http://localhost:5000").expect("url");
        let clip = Clip::from_entry(
            &base,
            ClipEntry {
                name: "fall 0001.mp4".to_string(),
                url: "/videos/fall 0001.mp4".to_string(),
                date: "2025-03-01".to_string(),
                time: "10:00 AM".to_string(),
                duration: "00:42".to_string(),
                size_mb: Some(3.25),
            },
        )
        .expect("clip");

        assert_eq!(
            clip.video_url.as_str(),
            "http://localhost:5000/videos/fall%200001.mp4"
        );
        assert_eq!(clip.recorded, "2025-03-01 10:00 AM");
        assert_eq!(clip.size.as_deref(), Some("3.25 MB"));
    }

    #[test]
    fn clip_without_size_has_no_size_label() {
        let base = Url::parse("http://localhost:5000").expect("url");
        let clip = Clip::from_entry(
            &base,
            ClipEntry {
                name: "a.mp4".to_string(),
                url: "/videos/a.mp4".to_string(),
                date: String::new(),
                time: String::new(),
                duration: String::new(),
                size_mb: None,
            },
        )
        .expect("clip");
        assert_eq!(clip.size, None);
        assert_eq!(clip.recorded, "");
    }

    fn entry(url: &str) -> ClipEntry {
        ClipEntry {
            name: "fall_0003.mp4".to_string(),
            url: url.to_string(),
            date: String::new(),
            time: String::new(),
            duration: String::new(),
            size_mb: None,
        }
    }

    #[test]
    fn clip_address_keeps_query_and_fragment() {
        let base = Url::parse("http://localhost:5000").expect("url");
        let clip = Clip::from_entry(&base, entry("/videos/fall_0003.mp4?token=abc#t=5"))
            .expect("clip");
        assert_eq!(
            clip.video_url.as_str(),
            "http://localhost:5000/videos/fall_0003.mp4?token=abc#t=5"
        );
    }

    #[test]
    fn absolute_clip_address_passes_through() {
        let base = Url::parse("http://localhost:5000").expect("url");
        let clip = Clip::from_entry(&base, entry("https://cdn.example/clips/fall_0003.mp4"))
            .expect("clip");
        assert_eq!(
            clip.video_url.as_str(),
            "https://cdn.example/clips/fall_0003.mp4"
        );
    }

    #[test]
    fn unresolvable_clip_address_is_skipped() {
        let base = Url::parse("http://localhost:5000").expect("url");
        assert_eq!(Clip::from_entry(&base, entry("http://[::1")), None);
    }
}
