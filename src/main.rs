use anyhow::Result;
use serenity::{
    model::{gateway::GatewayIntents, id::ApplicationId},
    Client,
};
use songbird::SerenityInit;
use std::sync::Arc;
use tracing::{error, info, warn};

mod bot;
mod config;
mod error;
mod player;
mod sources;
mod ui;

use crate::bot::MothMusicBot;
use crate::config::Config;
use crate::player::registry::SessionRegistry;
use crate::sources::YtDlpResolver;

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializar logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("moth_music=debug".parse()?)
                .add_directive("serenity=info".parse()?)
                .add_directive("songbird=info".parse()?),
        )
        .init();

    info!("🎵 Iniciando Moth Music v{}", env!("CARGO_PKG_VERSION"));

    // Cargar configuración
    let config = Arc::new(Config::load()?);

    // Resolver de fuentes
    let resolver = Arc::new(YtDlpResolver::new(config.ytdlp_binary.clone()));
    if let Err(e) = resolver.verify_dependencies().await {
        warn!("⚠️ {}", e);
    }

    // Registro global de sesiones
    let registry = Arc::new(SessionRegistry::new());

    // Intents mínimos: comandos slash y estados de voz
    let intents = GatewayIntents::GUILDS | GatewayIntents::GUILD_VOICE_STATES;

    let handler = MothMusicBot::new(config.clone(), registry.clone(), resolver);

    let mut client = Client::builder(&config.discord_token, intents)
        .application_id(ApplicationId::new(config.application_id))
        .event_handler(handler)
        .register_songbird()
        .await?;

    // Apagado ordenado: desmontar todas las sesiones antes de salir
    let shutdown_registry = registry.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Error al registrar Ctrl+C: {:?}", e);
            return;
        }
        info!("⚠️ Señal de apagado recibida, cerrando...");
        shutdown_registry.shutdown().await;
        std::process::exit(0);
    });

    info!("🚀 Bot iniciado exitosamente");
    if let Err(why) = client.start().await {
        error!("Error al ejecutar cliente: {:?}", why);
    }

    Ok(())
}
