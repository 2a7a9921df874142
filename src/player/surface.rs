use async_trait::async_trait;
use serenity::model::id::{ChannelId, MessageId, UserId};
use std::sync::Arc;

use crate::player::{
    session::{PlaybackSession, SessionSnapshot, SkipOutcome, SKIP_VOTE_THRESHOLD},
    track::Track,
};

/// Identidad del mensaje "reproduciendo ahora" vigente.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NowPlayingRef {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
}

/// Superficie externa que refleja el estado de reproducción de una sesión.
///
/// La sesión la invoca fuera de su lock; una implementación puede publicar
/// mensajes de Discord, y las pruebas usan una superficie falsa.
#[async_trait]
pub trait NowPlayingSurface: Send + Sync {
    /// Publica la vista para una canción nueva y devuelve la referencia del
    /// mensaje publicado, si lo hubo.
    async fn publish(&self, track: &Track, snapshot: &SessionSnapshot) -> Option<NowPlayingRef>;

    /// Actualiza la vista vigente tras un cambio de estado (pausa,
    /// reanudación, repetición).
    async fn refresh(&self, reference: &NowPlayingRef, snapshot: &SessionSnapshot);

    /// Elimina la vista publicada.
    async fn discard(&self, reference: NowPlayingRef);
}

/// Identificadores estables de los controles del reproductor.
pub mod control_ids {
    pub const PLAY_PAUSE: &str = "player_play_pause";
    pub const SKIP: &str = "player_skip";
    pub const STOP: &str = "player_stop";
    pub const SHUFFLE: &str = "player_shuffle";
    pub const LOOP_TOGGLE: &str = "player_loop";
}

/// Comando del reproductor al que se traduce un control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    PlayPause,
    Skip,
    Stop,
    Shuffle,
    LoopToggle,
}

impl ControlAction {
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            control_ids::PLAY_PAUSE => Some(Self::PlayPause),
            control_ids::SKIP => Some(Self::Skip),
            control_ids::STOP => Some(Self::Stop),
            control_ids::SHUFFLE => Some(Self::Shuffle),
            control_ids::LOOP_TOGGLE => Some(Self::LoopToggle),
            _ => None,
        }
    }
}

/// Un control presionado, todavía sin filtrar.
#[derive(Debug, Clone)]
pub struct ControlEvent {
    pub message_id: MessageId,
    pub user_id: UserId,
    pub control_id: String,
}

/// Traduce un evento externo en una acción del reproductor.
///
/// Se ignoran los eventos del propio bot y los que no refieren al mensaje
/// "reproduciendo ahora" vigente de la sesión.
pub fn action_for_event(
    event: &ControlEvent,
    bot_user: UserId,
    now_playing: Option<NowPlayingRef>,
) -> Option<ControlAction> {
    if event.user_id == bot_user {
        return None;
    }

    let reference = now_playing?;
    if event.message_id != reference.message_id {
        return None;
    }

    ControlAction::from_id(&event.control_id)
}

/// Ejecuta la acción sobre la sesión como si la invocara `user` y devuelve
/// el aviso para mostrarle.
///
/// El salto desde un botón participa de la votación igual que el comando: no
/// es un salto forzado.
pub async fn apply_control(
    session: &Arc<PlaybackSession>,
    action: ControlAction,
    user: UserId,
) -> String {
    match action {
        ControlAction::PlayPause => {
            if session.pause().await {
                "⏸️ Reproducción pausada".to_string()
            } else if session.resume().await {
                "▶️ Reproducción reanudada".to_string()
            } else {
                "❌ No hay nada reproduciéndose actualmente".to_string()
            }
        }
        ControlAction::Skip => match session.request_skip(user).await {
            Ok(SkipOutcome::Skipped) => "⏭️ Canción saltada".to_string(),
            Ok(SkipOutcome::VoteAdded { votes }) => {
                format!("🗳️ Voto para saltar agregado: **{}/{}**", votes, SKIP_VOTE_THRESHOLD)
            }
            Err(e) => format!("❌ {}", e),
        },
        ControlAction::Stop => {
            session.stop_all().await;
            "⏹️ Reproducción detenida y cola limpiada".to_string()
        }
        ControlAction::Shuffle => {
            session.shuffle();
            "🔀 Cola mezclada".to_string()
        }
        ControlAction::LoopToggle => match session.toggle_loop().await {
            Ok(true) => "🔂 La canción actual se repetirá".to_string(),
            Ok(false) => "➡️ La canción actual ya no se repetirá".to_string(),
            Err(e) => format!("❌ {}", e),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn event(message: u64, user: u64, control_id: &str) -> ControlEvent {
        ControlEvent {
            message_id: MessageId::new(message),
            user_id: UserId::new(user),
            control_id: control_id.to_string(),
        }
    }

    fn reference(message: u64) -> NowPlayingRef {
        NowPlayingRef {
            channel_id: ChannelId::new(500),
            message_id: MessageId::new(message),
        }
    }

    #[test]
    fn maps_every_control_id() {
        assert_eq!(
            ControlAction::from_id(control_ids::PLAY_PAUSE),
            Some(ControlAction::PlayPause)
        );
        assert_eq!(ControlAction::from_id(control_ids::SKIP), Some(ControlAction::Skip));
        assert_eq!(ControlAction::from_id(control_ids::STOP), Some(ControlAction::Stop));
        assert_eq!(
            ControlAction::from_id(control_ids::SHUFFLE),
            Some(ControlAction::Shuffle)
        );
        assert_eq!(
            ControlAction::from_id(control_ids::LOOP_TOGGLE),
            Some(ControlAction::LoopToggle)
        );
        assert_eq!(ControlAction::from_id("otra_cosa"), None);
    }

    #[test]
    fn ignores_events_from_the_bot_itself() {
        let bot = UserId::new(1);
        let action = action_for_event(
            &event(10, 1, control_ids::SKIP),
            bot,
            Some(reference(10)),
        );
        assert_eq!(action, None);
    }

    #[test]
    fn ignores_events_for_other_messages() {
        let bot = UserId::new(1);
        let action = action_for_event(
            &event(11, 2, control_ids::SKIP),
            bot,
            Some(reference(10)),
        );
        assert_eq!(action, None);
    }

    #[test]
    fn ignores_events_without_a_published_view() {
        let bot = UserId::new(1);
        let action = action_for_event(&event(10, 2, control_ids::SKIP), bot, None);
        assert_eq!(action, None);
    }

    #[test]
    fn accepts_a_control_on_the_tracked_message() {
        let bot = UserId::new(1);
        let action = action_for_event(
            &event(10, 2, control_ids::PLAY_PAUSE),
            bot,
            Some(reference(10)),
        );
        assert_eq!(action, Some(ControlAction::PlayPause));
    }
}
