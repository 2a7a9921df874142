pub mod ytdlp;

use async_trait::async_trait;
use serenity::model::id::UserId;

use crate::{error::PlayerError, player::track::Track};

pub use ytdlp::YtDlpResolver;

/// Resuelve texto libre o una URL en una canción lista para encolar.
///
/// El reproductor no sabe de dónde salen las canciones: cualquier fallo del
/// resolver llega al usuario como [`PlayerError::EnqueueFailed`] y la cola
/// queda intacta.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceResolver: Send + Sync {
    async fn resolve(&self, query: &str, requested_by: UserId) -> Result<Track, PlayerError>;
}
