//! Capa de comandos del bot.
//!
//! Pegamento fino entre Discord y el núcleo de reproducción: registra los
//! comandos slash, los despacha a la sesión de la guild y enruta los botones
//! del mensaje "reproduciendo ahora" como si fueran comandos del usuario que
//! los presionó. Toda la lógica vive en [`crate::player`]; aquí solo se
//! traducen interacciones y se arman las respuestas.

use anyhow::Result;
use serenity::{
    all::{Context, EventHandler, Interaction, Ready},
    async_trait,
    builder::{CreateInteractionResponse, CreateInteractionResponseMessage},
    model::application::ComponentInteraction,
};
use std::sync::Arc;
use tracing::{error, info};

pub mod commands;

use crate::{
    config::Config,
    player::{
        registry::SessionRegistry,
        surface::{action_for_event, apply_control, ControlEvent},
    },
    sources::SourceResolver,
};

/// Handler principal del bot.
pub struct MothMusicBot {
    pub config: Arc<Config>,
    pub registry: Arc<SessionRegistry>,
    pub resolver: Arc<dyn SourceResolver>,
}

impl MothMusicBot {
    pub fn new(
        config: Arc<Config>,
        registry: Arc<SessionRegistry>,
        resolver: Arc<dyn SourceResolver>,
    ) -> Self {
        Self {
            config,
            registry,
            resolver,
        }
    }

    /// Un botón del reproductor se traduce en el comando equivalente, como
    /// si lo hubiera invocado quien lo presionó. Los botones de mensajes
    /// viejos se reconocen y se ignoran.
    async fn handle_component(&self, ctx: &Context, component: ComponentInteraction) -> Result<()> {
        let Some(guild_id) = component.guild_id else {
            return Ok(());
        };
        let Some(session) = self.registry.get(guild_id) else {
            return Ok(());
        };

        let event = ControlEvent {
            message_id: component.message.id,
            user_id: component.user.id,
            control_id: component.data.custom_id.clone(),
        };
        let bot_user = ctx.cache.current_user().id;

        let Some(action) = action_for_event(&event, bot_user, session.now_playing_ref()) else {
            component
                .create_response(&ctx.http, CreateInteractionResponse::Acknowledge)
                .await
                .ok();
            return Ok(());
        };

        info!(
            "🔘 Control {} presionado por {} en guild {}",
            component.data.custom_id, component.user.name, guild_id
        );

        let notice = apply_control(&session, action, component.user.id).await;
        component
            .create_response(
                &ctx.http,
                CreateInteractionResponse::Message(
                    CreateInteractionResponseMessage::new()
                        .content(notice)
                        .ephemeral(true),
                ),
            )
            .await?;

        Ok(())
    }
}

#[async_trait]
impl EventHandler for MothMusicBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = commands::register(&ctx, self.config.guild_id).await {
            error!("Error al registrar comandos: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => {
                if let Err(e) = commands::handle_command(&ctx, command, self).await {
                    error!("Error manejando comando: {:?}", e);
                }
            }
            Interaction::Component(component) => {
                if let Err(e) = self.handle_component(&ctx, component).await {
                    error!("Error manejando componente: {:?}", e);
                }
            }
            _ => {}
        }
    }
}
