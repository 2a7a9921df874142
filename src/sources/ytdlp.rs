use async_trait::async_trait;
use serde::Deserialize;
use serenity::model::id::UserId;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::{error::PlayerError, player::track::Track, sources::SourceResolver};

/// Resolución de metadatos y stream con yt-dlp.
pub struct YtDlpResolver {
    binary: String,
}

/// Campos de interés del JSON de `yt-dlp -j`.
#[derive(Debug, Deserialize)]
struct YtDlpMetadata {
    title: String,
    webpage_url: Option<String>,
    url: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
}

impl YtDlpResolver {
    pub fn new(binary: String) -> Self {
        Self { binary }
    }

    /// Verifica que yt-dlp esté disponible al arrancar.
    pub async fn verify_dependencies(&self) -> anyhow::Result<()> {
        let output = tokio::process::Command::new(&self.binary)
            .arg("--version")
            .output()
            .await;

        match output {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                info!("✅ yt-dlp versión: {}", version.trim());
                Ok(())
            }
            _ => anyhow::bail!("yt-dlp no disponible; instala con: pip install yt-dlp"),
        }
    }

    fn is_url(query: &str) -> bool {
        Url::parse(query)
            .map(|url| url.scheme() == "http" || url.scheme() == "https")
            .unwrap_or(false)
    }

    fn parse_metadata(raw: &str, requested_by: UserId) -> Result<Track, PlayerError> {
        let meta: YtDlpMetadata = serde_json::from_str(raw)
            .map_err(|e| PlayerError::EnqueueFailed(format!("metadatos inválidos: {e}")))?;

        let page_url = meta
            .webpage_url
            .clone()
            .or_else(|| meta.url.clone())
            .ok_or_else(|| PlayerError::EnqueueFailed("la fuente no entregó URL".to_string()))?;

        let mut track = Track::new(meta.title, page_url, requested_by);
        if let Some(stream_url) = meta.url {
            track = track.with_stream_url(stream_url);
        }
        if let Some(secs) = meta.duration {
            track = track.with_duration(Duration::from_secs_f64(secs));
        }
        if let Some(thumbnail) = meta.thumbnail {
            track = track.with_thumbnail(thumbnail);
        }

        Ok(track)
    }
}

#[async_trait]
impl SourceResolver for YtDlpResolver {
    async fn resolve(&self, query: &str, requested_by: UserId) -> Result<Track, PlayerError> {
        let target = if Self::is_url(query) {
            query.to_string()
        } else {
            format!("ytsearch1:{query}")
        };

        info!("🔍 Resolviendo fuente: {}", target);

        let output = tokio::process::Command::new(&self.binary)
            .args([
                "-j",
                "--no-playlist",
                "--format",
                "bestaudio/best",
                "--default-search",
                "ytsearch",
                "--socket-timeout",
                "15",
                "--retries",
                "2",
            ])
            .arg(&target)
            .output()
            .await
            .map_err(|e| PlayerError::EnqueueFailed(format!("no se pudo ejecutar yt-dlp: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("yt-dlp falló para '{}': {}", query, stderr.trim());
            let reason = stderr
                .trim()
                .lines()
                .last()
                .unwrap_or("yt-dlp falló")
                .to_string();
            return Err(PlayerError::EnqueueFailed(reason));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let raw = stdout
            .lines()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| PlayerError::EnqueueFailed("sin resultados".to_string()))?;

        Self::parse_metadata(raw, requested_by)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_detection() {
        assert!(YtDlpResolver::is_url(
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        ));
        assert!(YtDlpResolver::is_url("http://example.com/audio.mp3"));
        assert!(!YtDlpResolver::is_url("lofi hip hop radio"));
        assert!(!YtDlpResolver::is_url("ftp://example.com/file"));
    }

    #[test]
    fn test_metadata_parsing() {
        let raw = r#"{"title":"Never Gonna Give You Up","webpage_url":"https://www.youtube.com/watch?v=dQw4w9WgXcQ","url":"https://cdn.example.com/stream","duration":212.0,"thumbnail":"https://i.ytimg.com/vi/dQw4w9WgXcQ/hq720.jpg"}"#;

        let track = YtDlpResolver::parse_metadata(raw, UserId::new(42)).unwrap();
        assert_eq!(track.title, "Never Gonna Give You Up");
        assert_eq!(track.url, "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(
            track.stream_url.as_deref(),
            Some("https://cdn.example.com/stream")
        );
        assert_eq!(track.duration, Some(Duration::from_secs(212)));
        assert_eq!(track.requested_by, UserId::new(42));
    }

    #[test]
    fn test_metadata_parsing_rejects_garbage() {
        let err = YtDlpResolver::parse_metadata("esto no es json", UserId::new(1)).unwrap_err();
        assert!(matches!(err, PlayerError::EnqueueFailed(_)));
    }
}
