use chrono::{DateTime, Utc};
use serenity::model::id::UserId;
use std::time::Duration;

/// Una canción ya resuelta, lista para encolar y transmitir.
///
/// Inmutable una vez creada. `url` es la página de origen que ve el usuario;
/// `stream_url` es la URL directa de audio que entregó el resolver, si la
/// hubo. El transporte de voz convierte uno u otro en el stream real.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub title: String,
    pub url: String,
    pub stream_url: Option<String>,
    pub duration: Option<Duration>,
    pub thumbnail: Option<String>,
    pub requested_by: UserId,
    #[allow(dead_code)]
    pub added_at: DateTime<Utc>,
}

impl Track {
    pub fn new(title: String, url: String, requested_by: UserId) -> Self {
        Self {
            title,
            url,
            stream_url: None,
            duration: None,
            thumbnail: None,
            requested_by,
            added_at: Utc::now(),
        }
    }

    pub fn with_stream_url(mut self, stream_url: String) -> Self {
        self.stream_url = Some(stream_url);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: String) -> Self {
        self.thumbnail = Some(thumbnail);
        self
    }
}
