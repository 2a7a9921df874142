use parking_lot::Mutex;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::{collections::HashSet, sync::Arc};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::PlayerError,
    player::{
        queue::{QueuePage, TrackQueue, PAGE_SIZE},
        surface::{NowPlayingRef, NowPlayingSurface},
        track::Track,
        voice::{StreamEnd, VoiceConductor},
    },
    sources::SourceResolver,
};

/// Votos necesarios para que un salto colectivo proceda.
pub const SKIP_VOTE_THRESHOLD: usize = 3;

/// Estado de reproducción de una sesión.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Paused,
    Stopping,
}

/// Resultado de una solicitud de salto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipOutcome {
    /// La canción se detuvo de inmediato.
    Skipped,
    /// Se registró el voto; todavía faltan para el umbral.
    VoteAdded { votes: usize },
}

/// Vista de solo lectura del estado de una sesión, para renderizar.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub state: PlaybackState,
    pub current: Option<Track>,
    pub queue_len: usize,
    pub volume: f32,
    pub loop_single: bool,
    pub skip_votes: usize,
}

/// Estado mutable compartido entre el lazo de reproducción y los comandos.
///
/// Invariante: este lock nunca se mantiene a través de un await; todo efecto
/// con I/O (transporte, superficie) ocurre después de soltarlo.
#[derive(Debug)]
struct SessionState {
    phase: PlaybackState,
    current: Option<Track>,
    volume: f32,
    loop_single: bool,
    /// Votos de salto de la canción actual; se limpia con cada cambio de
    /// canción.
    skip_votes: HashSet<UserId>,
    /// `stop_all` lo activa para que el lazo no repita la canción detenida.
    stopped: bool,
    now_playing: Option<NowPlayingRef>,
}

/// Sesión de reproducción de una guild.
///
/// Dueña exclusiva de su cola y de la canción actual; el registro la
/// comparte entre todos los comandos concurrentes de la guild. Su lazo de
/// reproducción corre como tarea propia desde [`PlaybackSession::spawn`]
/// hasta [`PlaybackSession::teardown`].
pub struct PlaybackSession {
    guild_id: GuildId,
    state: Mutex<SessionState>,
    queue: TrackQueue,
    resolver: Arc<dyn SourceResolver>,
    conductor: Arc<dyn VoiceConductor>,
    surface: Arc<dyn NowPlayingSurface>,
    cancel: CancellationToken,
}

impl PlaybackSession {
    /// Crea la sesión y arranca su lazo de reproducción.
    pub fn spawn(
        guild_id: GuildId,
        default_volume: f32,
        resolver: Arc<dyn SourceResolver>,
        conductor: Arc<dyn VoiceConductor>,
        surface: Arc<dyn NowPlayingSurface>,
    ) -> Arc<Self> {
        let session = Arc::new(Self {
            guild_id,
            state: Mutex::new(SessionState {
                phase: PlaybackState::Idle,
                current: None,
                volume: default_volume,
                loop_single: false,
                skip_votes: HashSet::new(),
                stopped: false,
                now_playing: None,
            }),
            queue: TrackQueue::new(),
            resolver,
            conductor,
            surface,
            cancel: CancellationToken::new(),
        });

        let runner = session.clone();
        tokio::spawn(async move { runner.run().await });

        session
    }

    /// Resuelve `query` y encola el resultado. Un fallo del resolver se
    /// reporta como [`PlayerError::EnqueueFailed`] sin tocar la cola.
    pub async fn enqueue_query(
        &self,
        query: &str,
        requested_by: UserId,
    ) -> Result<Track, PlayerError> {
        let track = self.resolver.resolve(query, requested_by).await?;
        self.enqueue(track.clone());
        Ok(track)
    }

    /// Encola una canción ya resuelta; siempre tiene éxito.
    pub fn enqueue(&self, track: Track) {
        self.queue.push(track);
    }

    pub async fn connect(&self, channel_id: ChannelId) -> Result<(), PlayerError> {
        self.conductor.connect(channel_id).await
    }

    pub async fn move_to(&self, channel_id: ChannelId) -> Result<(), PlayerError> {
        self.conductor.move_to(channel_id).await
    }

    /// Pausa si hay algo sonando. Devuelve `false`, sin error, si no había
    /// nada que pausar.
    pub async fn pause(&self) -> bool {
        let changed = {
            let mut state = self.state.lock();
            if state.phase == PlaybackState::Playing {
                state.phase = PlaybackState::Paused;
                true
            } else {
                false
            }
        };

        if changed {
            self.conductor.pause().await;
            info!("⏸️ Reproducción pausada en guild {}", self.guild_id);
            self.refresh_view().await;
        }
        changed
    }

    /// Reanuda una reproducción pausada; `false` si no había pausa.
    pub async fn resume(&self) -> bool {
        let changed = {
            let mut state = self.state.lock();
            if state.phase == PlaybackState::Paused {
                state.phase = PlaybackState::Playing;
                true
            } else {
                false
            }
        };

        if changed {
            self.conductor.resume().await;
            info!("▶️ Reproducción reanudada en guild {}", self.guild_id);
            self.refresh_view().await;
        }
        changed
    }

    /// Ajusta el volumen en porcentaje, 0 a 100 inclusive. Escala la
    /// transmisión activa de inmediato; si no hay, solo afecta a las
    /// siguientes canciones.
    pub async fn set_volume(&self, percent: i64) -> Result<f32, PlayerError> {
        if !(0..=100).contains(&percent) {
            return Err(PlayerError::InvalidRange);
        }

        let volume = percent as f32 / 100.0;
        let active = {
            let mut state = self.state.lock();
            state.volume = volume;
            state.current.is_some()
        };

        if active {
            self.conductor.set_volume(volume).await;
        }
        info!("🔊 Volumen ajustado a {}% en guild {}", percent, self.guild_id);
        Ok(volume)
    }

    /// Salto por votación: quien pidió la canción la salta de inmediato, sin
    /// pasar por el conteo; el resto vota hasta el umbral de
    /// [`SKIP_VOTE_THRESHOLD`]. Votar dos veces no cuenta doble.
    pub async fn request_skip(&self, user: UserId) -> Result<SkipOutcome, PlayerError> {
        let outcome = {
            let mut state = self.state.lock();
            let current = state.current.as_ref().ok_or(PlayerError::NotPlaying)?;

            if current.requested_by == user {
                state.skip_votes.clear();
                SkipOutcome::Skipped
            } else if state.skip_votes.contains(&user) {
                return Err(PlayerError::AlreadyVoted);
            } else {
                state.skip_votes.insert(user);
                let votes = state.skip_votes.len();
                if votes >= SKIP_VOTE_THRESHOLD {
                    state.skip_votes.clear();
                    SkipOutcome::Skipped
                } else {
                    SkipOutcome::VoteAdded { votes }
                }
            }
        };

        if outcome == SkipOutcome::Skipped {
            info!("⏭️ Canción saltada en guild {}", self.guild_id);
            // el lazo avanza por el camino normal de fin de transmisión
            self.conductor.stop().await;
        }
        Ok(outcome)
    }

    /// Activa o desactiva la repetición de la canción actual.
    pub async fn toggle_loop(&self) -> Result<bool, PlayerError> {
        let looping = {
            let mut state = self.state.lock();
            if state.current.is_none() {
                return Err(PlayerError::NotPlaying);
            }
            state.loop_single = !state.loop_single;
            state.loop_single
        };

        if looping {
            info!("🔂 Repetición activada en guild {}", self.guild_id);
        } else {
            info!("➡️ Repetición desactivada en guild {}", self.guild_id);
        }
        self.refresh_view().await;
        Ok(looping)
    }

    /// Detiene todo: cola, canción actual y vista publicada. Legal en
    /// cualquier estado; con la sesión inactiva solo limpia la vista.
    pub async fn stop_all(&self) {
        self.queue.clear();

        let reference = {
            let mut state = self.state.lock();
            state.stopped = true;
            state.skip_votes.clear();
            state.now_playing.take()
        };

        self.conductor.stop().await;
        if let Some(reference) = reference {
            self.surface.discard(reference).await;
        }
        info!("⏹️ Reproducción detenida en guild {}", self.guild_id);
    }

    /// Cancela el lazo, libera la conexión y limpia todo el estado. Es
    /// seguro llamarlo con la sesión ya inactiva, y más de una vez.
    pub async fn teardown(&self) {
        let reference = {
            let mut state = self.state.lock();
            state.phase = PlaybackState::Stopping;
            state.stopped = true;
            state.current = None;
            state.skip_votes.clear();
            state.now_playing.take()
        };

        self.cancel.cancel();
        self.queue.clear();
        self.conductor.stop().await;
        self.conductor.disconnect().await;
        if let Some(reference) = reference {
            self.surface.discard(reference).await;
        }
        info!("👋 Sesión de guild {} finalizada", self.guild_id);
    }

    // Operaciones de cola expuestas al nivel de comandos

    pub fn shuffle(&self) {
        self.queue.shuffle();
    }

    pub fn remove_at(&self, position: usize) -> Result<Track, PlayerError> {
        self.queue.remove(position)
    }

    pub fn list_page(&self, page: usize) -> QueuePage {
        self.queue.page(page, PAGE_SIZE)
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Vista de solo lectura para renderizar texto y embeds.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            state: state.phase,
            current: state.current.clone(),
            queue_len: self.queue.len(),
            volume: state.volume,
            loop_single: state.loop_single,
            skip_votes: state.skip_votes.len(),
        }
    }

    pub fn now_playing_ref(&self) -> Option<NowPlayingRef> {
        self.state.lock().now_playing
    }

    // Lazo de reproducción

    /// Corre durante toda la vida de la sesión: saca la siguiente canción,
    /// la transmite y espera su fin. Con la cola vacía queda suspendido; lo
    /// despiertan un enqueue o la señal de desmontaje.
    async fn run(self: Arc<Self>) {
        debug!("🎛️ Lazo de reproducción iniciado para guild {}", self.guild_id);

        loop {
            let track = tokio::select! {
                _ = self.cancel.cancelled() => break,
                track = self.next_track() => track,
            };

            self.play_current(track).await;

            if self.cancel.is_cancelled() {
                break;
            }
        }

        debug!("🛑 Lazo de reproducción de guild {} detenido", self.guild_id);
    }

    /// Espera hasta poder sacar la siguiente canción; mientras no haya nada
    /// la sesión queda inactiva.
    async fn next_track(&self) -> Track {
        loop {
            if let Some(track) = self.queue.pop() {
                return track;
            }

            {
                let mut state = self.state.lock();
                state.phase = PlaybackState::Idle;
                state.current = None;
                state.skip_votes.clear();
            }

            self.queue.wait().await;
        }
    }

    /// Transmite `track`, repitiéndola mientras la repetición simple siga
    /// activa y la transmisión termine de forma natural.
    async fn play_current(&self, track: Track) {
        loop {
            let (on_end, mut end_rx) = mpsc::unbounded_channel();

            let volume = {
                let mut state = self.state.lock();
                state.phase = PlaybackState::Playing;
                state.current = Some(track.clone());
                state.skip_votes.clear();
                state.stopped = false;
                state.volume
            };

            self.publish_view(&track).await;
            info!("🎵 Reproduciendo: {} en guild {}", track.title, self.guild_id);

            if let Err(e) = self.conductor.start(&track, volume, on_end).await {
                warn!("⚠️ No se pudo reproducir '{}': {}", track.title, e);
                return;
            }

            let end = tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.conductor.stop().await;
                    return;
                }
                end = end_rx.recv() => end.unwrap_or(StreamEnd::Lost),
            };

            let replay = {
                let state = self.state.lock();
                end == StreamEnd::Finished && state.loop_single && !state.stopped
            };

            match end {
                StreamEnd::Lost => {
                    warn!(
                        "🔌 Se perdió la conexión durante '{}'; se descarta la canción",
                        track.title
                    );
                    return;
                }
                StreamEnd::Finished if !replay => return,
                StreamEnd::Finished => debug!("🔂 Repitiendo canción: {}", track.title),
            }
        }
    }

    /// Reemplaza la vista publicada por la de la canción que comienza.
    async fn publish_view(&self, track: &Track) {
        let previous = self.state.lock().now_playing.take();
        if let Some(reference) = previous {
            self.surface.discard(reference).await;
        }

        let reference = self.surface.publish(track, &self.snapshot()).await;
        self.state.lock().now_playing = reference;
    }

    /// Refresca la vista vigente tras un cambio de estado.
    async fn refresh_view(&self) {
        let reference = self.state.lock().now_playing;
        if let Some(reference) = reference {
            self.surface.refresh(&reference, &self.snapshot()).await;
        }
    }
}
