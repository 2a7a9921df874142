//! Dobles de prueba del núcleo de reproducción: un transporte de voz que
//! registra lo transmitido y deja simular el fin de cada transmisión, y una
//! superficie que entrega referencias de mensaje crecientes.

use async_trait::async_trait;
use parking_lot::Mutex;
use serenity::model::id::{ChannelId, MessageId, UserId};
use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::{
    error::PlayerError,
    player::{
        session::SessionSnapshot,
        surface::{NowPlayingRef, NowPlayingSurface},
        track::Track,
        voice::{StreamEnd, StreamEndTx, VoiceConductor},
    },
};

pub fn track(title: &str, user: u64) -> Track {
    Track::new(
        title.to_string(),
        format!("https://example.com/{title}"),
        UserId::new(user),
    )
}

/// Transporte falso. Cada `start` notifica la canción por el canal de
/// inicios y guarda el emisor de fin para que la prueba decida cómo termina.
pub struct FakeConductor {
    started_tx: UnboundedSender<Track>,
    current_end: Mutex<Option<StreamEndTx>>,
    pub stops: AtomicUsize,
    pub disconnects: AtomicUsize,
}

impl FakeConductor {
    pub fn new() -> (Arc<Self>, UnboundedReceiver<Track>) {
        let (started_tx, started_rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                started_tx,
                current_end: Mutex::new(None),
                stops: AtomicUsize::new(0),
                disconnects: AtomicUsize::new(0),
            }),
            started_rx,
        )
    }

    /// Simula el final natural de la transmisión vigente.
    pub fn finish_current(&self) {
        if let Some(tx) = self.current_end.lock().take() {
            let _ = tx.send(StreamEnd::Finished);
        }
    }

    /// Simula una caída del transporte a mitad de la transmisión.
    pub fn lose_current(&self) {
        if let Some(tx) = self.current_end.lock().take() {
            let _ = tx.send(StreamEnd::Lost);
        }
    }
}

#[async_trait]
impl VoiceConductor for FakeConductor {
    async fn connect(&self, _channel_id: ChannelId) -> Result<(), PlayerError> {
        Ok(())
    }

    async fn move_to(&self, _channel_id: ChannelId) -> Result<(), PlayerError> {
        Ok(())
    }

    async fn start(
        &self,
        track: &Track,
        _volume: f32,
        on_end: StreamEndTx,
    ) -> Result<(), PlayerError> {
        *self.current_end.lock() = Some(on_end);
        let _ = self.started_tx.send(track.clone());
        Ok(())
    }

    async fn pause(&self) {}

    async fn resume(&self) {}

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        // igual que el transporte real: detener una transmisión activa
        // también entrega su notificación de fin
        if let Some(tx) = self.current_end.lock().take() {
            let _ = tx.send(StreamEnd::Finished);
        }
    }

    async fn set_volume(&self, _volume: f32) {}

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

/// Superficie falsa que cuenta publicaciones y descartes.
pub struct FakeSurface {
    pub published: AtomicUsize,
    pub discarded: AtomicUsize,
    next_id: AtomicU64,
}

impl FakeSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            published: AtomicUsize::new(0),
            discarded: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl NowPlayingSurface for FakeSurface {
    async fn publish(&self, _track: &Track, _snapshot: &SessionSnapshot) -> Option<NowPlayingRef> {
        self.published.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        Some(NowPlayingRef {
            channel_id: ChannelId::new(99),
            message_id: MessageId::new(id),
        })
    }

    async fn refresh(&self, _reference: &NowPlayingRef, _snapshot: &SessionSnapshot) {}

    async fn discard(&self, _reference: NowPlayingRef) {
        self.discarded.fetch_add(1, Ordering::SeqCst);
    }
}
