use async_trait::async_trait;
use serenity::{
    all::ButtonStyle,
    builder::{CreateActionRow, CreateButton, CreateMessage, EditMessage},
    http::Http,
    model::id::ChannelId,
};
use std::sync::Arc;
use tracing::{debug, error};

use crate::{
    player::{
        session::{PlaybackState, SessionSnapshot},
        surface::{control_ids, NowPlayingRef, NowPlayingSurface},
        track::Track,
    },
    ui::embeds,
};

/// Fila de controles del reproductor según el estado actual.
pub fn create_player_buttons(snapshot: &SessionSnapshot) -> Vec<CreateActionRow> {
    let play_pause_emoji = if snapshot.state == PlaybackState::Playing {
        '⏸'
    } else {
        '▶'
    };
    let loop_style = if snapshot.loop_single {
        ButtonStyle::Success
    } else {
        ButtonStyle::Secondary
    };

    let play_pause_btn = CreateButton::new(control_ids::PLAY_PAUSE)
        .emoji(play_pause_emoji)
        .style(ButtonStyle::Primary);

    let skip_btn = CreateButton::new(control_ids::SKIP)
        .emoji('⏭')
        .style(ButtonStyle::Secondary);

    let stop_btn = CreateButton::new(control_ids::STOP)
        .emoji('⏹')
        .style(ButtonStyle::Danger);

    let shuffle_btn = CreateButton::new(control_ids::SHUFFLE)
        .emoji('🔀')
        .style(ButtonStyle::Secondary);

    let loop_btn = CreateButton::new(control_ids::LOOP_TOGGLE)
        .emoji('🔂')
        .style(loop_style);

    vec![CreateActionRow::Buttons(vec![
        play_pause_btn,
        skip_btn,
        stop_btn,
        shuffle_btn,
        loop_btn,
    ])]
}

/// Vista "reproduciendo ahora" publicada como mensaje de Discord con sus
/// botones de control.
pub struct DiscordSurface {
    http: Arc<Http>,
    channel_id: ChannelId,
}

impl DiscordSurface {
    pub fn new(http: Arc<Http>, channel_id: ChannelId) -> Self {
        Self { http, channel_id }
    }
}

#[async_trait]
impl NowPlayingSurface for DiscordSurface {
    async fn publish(&self, track: &Track, snapshot: &SessionSnapshot) -> Option<NowPlayingRef> {
        let message = CreateMessage::new()
            .embed(embeds::create_now_playing_embed(track, snapshot))
            .components(create_player_buttons(snapshot));

        match self.channel_id.send_message(&self.http, message).await {
            Ok(message) => Some(NowPlayingRef {
                channel_id: self.channel_id,
                message_id: message.id,
            }),
            Err(e) => {
                error!("Error al publicar la vista del reproductor: {:?}", e);
                None
            }
        }
    }

    async fn refresh(&self, reference: &NowPlayingRef, snapshot: &SessionSnapshot) {
        let Some(track) = snapshot.current.clone() else {
            return;
        };

        let edit = EditMessage::new()
            .embed(embeds::create_now_playing_embed(&track, snapshot))
            .components(create_player_buttons(snapshot));

        if let Err(e) = reference
            .channel_id
            .edit_message(&self.http, reference.message_id, edit)
            .await
        {
            debug!("No se pudo refrescar la vista del reproductor: {:?}", e);
        }
    }

    async fn discard(&self, reference: NowPlayingRef) {
        if let Err(e) = reference
            .channel_id
            .delete_message(&self.http, reference.message_id)
            .await
        {
            debug!("No se pudo eliminar la vista anterior: {:?}", e);
        }
    }
}
