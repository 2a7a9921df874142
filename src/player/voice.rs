use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    input::{HttpRequest, Input, YoutubeDl},
    tracks::TrackHandle,
    Event, EventContext, EventHandler as VoiceEventHandler, Songbird, TrackEvent,
};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{error::PlayerError, player::track::Track};

/// Resultado con el que terminó una transmisión.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// Final natural o detención explícita.
    Finished,
    /// El transporte falló a mitad de la transmisión.
    Lost,
}

/// Canal por el que el transporte notifica el final de una transmisión al
/// lazo de reproducción de la sesión.
pub type StreamEndTx = tokio::sync::mpsc::UnboundedSender<StreamEnd>;

/// Transporte de voz de una sesión.
///
/// El lazo de reproducción y los comandos hablan con la conexión solo a
/// través de este trait, siempre fuera del lock de la sesión.
#[async_trait]
pub trait VoiceConductor: Send + Sync {
    /// Une la sesión al canal de voz; si ya estaba conectada, la mueve.
    async fn connect(&self, channel_id: ChannelId) -> Result<(), PlayerError>;

    /// Mueve una conexión existente a otro canal.
    async fn move_to(&self, channel_id: ChannelId) -> Result<(), PlayerError>;

    /// Comienza a transmitir `track`. El final (natural, detenido o por
    /// fallo del transporte) se notifica una sola vez por `on_end`.
    async fn start(
        &self,
        track: &Track,
        volume: f32,
        on_end: StreamEndTx,
    ) -> Result<(), PlayerError>;

    async fn pause(&self);

    async fn resume(&self);

    /// Detiene la transmisión actual de inmediato, sin esperar el final.
    async fn stop(&self);

    /// Escala el volumen de la transmisión activa, si la hay.
    async fn set_volume(&self, volume: f32);

    /// Libera la conexión de voz.
    async fn disconnect(&self);
}

/// Implementación sobre songbird: una `Call` por guild más el handle del
/// track vivo.
pub struct SongbirdConductor {
    manager: Arc<Songbird>,
    guild_id: GuildId,
    client: reqwest::Client,
    current: Mutex<Option<TrackHandle>>,
}

impl SongbirdConductor {
    pub fn new(manager: Arc<Songbird>, guild_id: GuildId) -> Self {
        Self {
            manager,
            guild_id,
            client: reqwest::Client::new(),
            current: Mutex::new(None),
        }
    }
}

#[async_trait]
impl VoiceConductor for SongbirdConductor {
    async fn connect(&self, channel_id: ChannelId) -> Result<(), PlayerError> {
        match self.manager.join(self.guild_id, channel_id).await {
            Ok(_call) => {
                info!(
                    "🔊 Conectado al canal de voz {} en guild {}",
                    channel_id, self.guild_id
                );
                Ok(())
            }
            Err(e) => {
                error!("Error al conectar al canal de voz: {:?}", e);
                Err(PlayerError::ConnectionLost)
            }
        }
    }

    async fn move_to(&self, channel_id: ChannelId) -> Result<(), PlayerError> {
        // songbird reutiliza la conexión existente al unirse de nuevo
        match self.manager.join(self.guild_id, channel_id).await {
            Ok(_call) => {
                info!(
                    "📍 Movido al canal de voz {} en guild {}",
                    channel_id, self.guild_id
                );
                Ok(())
            }
            Err(e) => {
                error!("Error al mover la conexión de voz: {:?}", e);
                Err(PlayerError::ConnectionLost)
            }
        }
    }

    async fn start(
        &self,
        track: &Track,
        volume: f32,
        on_end: StreamEndTx,
    ) -> Result<(), PlayerError> {
        let call = self
            .manager
            .get(self.guild_id)
            .ok_or(PlayerError::ConnectionLost)?;

        // URL directa si el resolver la entregó; si no, yt-dlp en diferido
        let input: Input = match &track.stream_url {
            Some(stream_url) => HttpRequest::new(self.client.clone(), stream_url.clone()).into(),
            None => YoutubeDl::new(self.client.clone(), track.url.clone()).into(),
        };

        let handle = {
            let mut call = call.lock().await;
            call.play_input(input)
        };

        let _ = handle.set_volume(volume);

        handle
            .add_event(
                Event::Track(TrackEvent::End),
                EndNotifier {
                    tx: on_end.clone(),
                    outcome: StreamEnd::Finished,
                },
            )
            .map_err(|e| {
                error!("Error al registrar la notificación de fin: {:?}", e);
                PlayerError::ConnectionLost
            })?;
        let _ = handle.add_event(
            Event::Track(TrackEvent::Error),
            EndNotifier {
                tx: on_end,
                outcome: StreamEnd::Lost,
            },
        );

        debug!("▶️ Transmitiendo: {}", track.title);
        *self.current.lock() = Some(handle);
        Ok(())
    }

    async fn pause(&self) {
        if let Some(handle) = self.current.lock().as_ref() {
            let _ = handle.pause();
        }
    }

    async fn resume(&self) {
        if let Some(handle) = self.current.lock().as_ref() {
            let _ = handle.play();
        }
    }

    async fn stop(&self) {
        if let Some(handle) = self.current.lock().take() {
            let _ = handle.stop();
        }
    }

    async fn set_volume(&self, volume: f32) {
        if let Some(handle) = self.current.lock().as_ref() {
            let _ = handle.set_volume(volume);
        }
    }

    async fn disconnect(&self) {
        *self.current.lock() = None;
        if let Err(e) = self.manager.remove(self.guild_id).await {
            debug!("La guild {} ya estaba desconectada: {:?}", self.guild_id, e);
        }
    }
}

/// Reenvía el evento de fin de track de songbird al lazo de reproducción.
///
/// El callback corre en el contexto del driver de la conexión: aquí solo se
/// envía por el canal; el estado compartido lo muta únicamente el lazo.
struct EndNotifier {
    tx: StreamEndTx,
    outcome: StreamEnd,
}

#[async_trait]
impl VoiceEventHandler for EndNotifier {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        let _ = self.tx.send(self.outcome);
        None
    }
}
