use anyhow::Result;
use serenity::{
    builder::{
        CreateCommand, CreateCommandOption, CreateInteractionResponse,
        CreateInteractionResponseMessage, EditInteractionResponse,
    },
    model::{
        application::{CommandInteraction, CommandOptionType},
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use std::sync::Arc;
use tracing::info;

use crate::{
    bot::MothMusicBot,
    error::PlayerError,
    player::{
        session::{PlaybackSession, SkipOutcome, SKIP_VOTE_THRESHOLD},
        voice::SongbirdConductor,
    },
    ui::{controls::DiscordSurface, embeds},
};

/// Registra los comandos slash, globales o en la guild de desarrollo.
pub async fn register(ctx: &Context, dev_guild: Option<u64>) -> Result<()> {
    let commands = vec![
        play_command(),
        join_command(),
        leave_command(),
        pause_command(),
        resume_command(),
        skip_command(),
        stop_command(),
        queue_command(),
        nowplaying_command(),
        shuffle_command(),
        remove_command(),
        loop_command(),
        volume_command(),
    ];

    match dev_guild {
        Some(guild_id) => {
            info!("🏠 Registrando comandos para guild de desarrollo: {}", guild_id);
            GuildId::new(guild_id).set_commands(&ctx.http, commands).await?;
        }
        None => {
            info!("🌐 Registrando comandos globalmente");
            for command in commands {
                ctx.http.create_global_command(&command).await?;
            }
        }
    }

    Ok(())
}

/// Despacha un comando slash a su handler.
pub async fn handle_command(
    ctx: &Context,
    command: CommandInteraction,
    bot: &MothMusicBot,
) -> Result<()> {
    let Some(guild_id) = command.guild_id else {
        return respond_error(ctx, &command, "Este comando solo funciona dentro de un servidor")
            .await;
    };

    info!(
        "📝 Comando /{} usado por {} en guild {}",
        command.data.name, command.user.name, guild_id
    );

    match command.data.name.as_str() {
        "play" => handle_play(ctx, &command, bot, guild_id).await,
        "join" => handle_join(ctx, &command, bot, guild_id).await,
        "leave" => handle_leave(ctx, &command, bot, guild_id).await,
        "pause" => handle_pause(ctx, &command, bot, guild_id).await,
        "resume" => handle_resume(ctx, &command, bot, guild_id).await,
        "skip" => handle_skip(ctx, &command, bot, guild_id).await,
        "stop" => handle_stop(ctx, &command, bot, guild_id).await,
        "queue" => handle_queue(ctx, &command, bot, guild_id).await,
        "nowplaying" => handle_nowplaying(ctx, &command, bot, guild_id).await,
        "shuffle" => handle_shuffle(ctx, &command, bot, guild_id).await,
        "remove" => handle_remove(ctx, &command, bot, guild_id).await,
        "loop" => handle_loop(ctx, &command, bot, guild_id).await,
        "volume" => handle_volume(ctx, &command, bot, guild_id).await,
        _ => respond_error(ctx, &command, "❌ Comando no reconocido").await,
    }
}

// Definición de comandos

fn play_command() -> CreateCommand {
    CreateCommand::new("play")
        .description("Reproduce una canción o la agrega a la cola")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::String,
                "query",
                "URL o término de búsqueda",
            )
            .required(true),
        )
}

fn join_command() -> CreateCommand {
    CreateCommand::new("join").description("Conecta el bot a tu canal de voz")
}

fn leave_command() -> CreateCommand {
    CreateCommand::new("leave").description("Desconecta el bot y descarta la cola")
}

fn pause_command() -> CreateCommand {
    CreateCommand::new("pause").description("Pausa la reproducción actual")
}

fn resume_command() -> CreateCommand {
    CreateCommand::new("resume").description("Reanuda la reproducción pausada")
}

fn skip_command() -> CreateCommand {
    CreateCommand::new("skip").description("Salta la canción actual o vota para saltarla")
}

fn stop_command() -> CreateCommand {
    CreateCommand::new("stop").description("Detiene la reproducción y limpia la cola")
}

fn queue_command() -> CreateCommand {
    CreateCommand::new("queue")
        .description("Muestra la cola de reproducción")
        .add_option(
            CreateCommandOption::new(CommandOptionType::Integer, "page", "Número de página")
                .min_int_value(1),
        )
}

fn nowplaying_command() -> CreateCommand {
    CreateCommand::new("nowplaying").description("Muestra información de la canción actual")
}

fn shuffle_command() -> CreateCommand {
    CreateCommand::new("shuffle").description("Mezcla la cola de reproducción")
}

fn remove_command() -> CreateCommand {
    CreateCommand::new("remove")
        .description("Elimina una canción de la cola por posición")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Integer,
                "position",
                "Posición en la cola (1 es la siguiente)",
            )
            .min_int_value(1)
            .required(true),
        )
}

fn loop_command() -> CreateCommand {
    CreateCommand::new("loop").description("Activa/desactiva la repetición de la canción actual")
}

fn volume_command() -> CreateCommand {
    CreateCommand::new("volume")
        .description("Ajusta el volumen de reproducción")
        .add_option(
            CreateCommandOption::new(
                CommandOptionType::Integer,
                "level",
                "Nivel de volumen (0-100)",
            )
            .min_int_value(0)
            .max_int_value(100),
        )
}

// Handlers específicos para cada comando

async fn handle_play(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &MothMusicBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(query) = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "query")
        .and_then(|opt| opt.value.as_str())
        .map(str::to_string)
    else {
        return respond_error(ctx, command, "Falta el término de búsqueda").await;
    };

    // el resolver puede tardar: diferir la respuesta
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Defer(CreateInteractionResponseMessage::new()),
        )
        .await?;

    let Some(voice_channel) = user_voice_channel(ctx, guild_id, command.user.id) else {
        edit_response_text(ctx, command, "❌ Debes estar en un canal de voz").await?;
        return Ok(());
    };

    let session = get_or_create_session(ctx, bot, guild_id, command.channel_id).await?;
    if let Err(e) = session.connect(voice_channel).await {
        edit_response_text(ctx, command, &format!("❌ {}", e)).await?;
        return Ok(());
    }

    match session.enqueue_query(&query, command.user.id).await {
        Ok(track) => {
            let embed = embeds::create_track_added_embed(&track);
            command
                .edit_response(&ctx.http, EditInteractionResponse::new().embed(embed))
                .await?;
        }
        Err(e) => edit_response_text(ctx, command, &format!("❌ {}", e)).await?,
    }

    Ok(())
}

async fn handle_join(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &MothMusicBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(voice_channel) = user_voice_channel(ctx, guild_id, command.user.id) else {
        return respond_error(ctx, command, "❌ Debes estar en un canal de voz").await;
    };

    // con sesión existente el join se vuelve un move al canal del usuario
    let result = match bot.registry.get(guild_id) {
        Some(session) => session.move_to(voice_channel).await,
        None => {
            let session = get_or_create_session(ctx, bot, guild_id, command.channel_id).await?;
            session.connect(voice_channel).await
        }
    };

    match result {
        Ok(()) => respond_text(ctx, command, "🔊 Conectado al canal de voz").await,
        Err(e) => respond_error(ctx, command, &format!("❌ {}", e)).await,
    }
}

async fn handle_leave(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &MothMusicBot,
    guild_id: GuildId,
) -> Result<()> {
    if bot.registry.get(guild_id).is_none() {
        return respond_error(ctx, command, "❌ No estoy conectado a ningún canal de voz").await;
    }

    bot.registry.destroy(guild_id).await;
    respond_text(ctx, command, "👋 Desconectado del canal de voz").await
}

async fn handle_pause(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &MothMusicBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(session) = bot.registry.get(guild_id) else {
        return respond_player_error(ctx, command, PlayerError::NotPlaying).await;
    };

    if session.pause().await {
        respond_text(ctx, command, "⏸️ Reproducción pausada").await
    } else {
        respond_error(ctx, command, "ℹ️ No hay nada que pausar").await
    }
}

async fn handle_resume(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &MothMusicBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(session) = bot.registry.get(guild_id) else {
        return respond_player_error(ctx, command, PlayerError::NotPlaying).await;
    };

    if session.resume().await {
        respond_text(ctx, command, "▶️ Reproducción reanudada").await
    } else {
        respond_error(ctx, command, "ℹ️ No hay nada en pausa").await
    }
}

async fn handle_skip(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &MothMusicBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(session) = bot.registry.get(guild_id) else {
        return respond_player_error(ctx, command, PlayerError::NotPlaying).await;
    };

    match session.request_skip(command.user.id).await {
        Ok(SkipOutcome::Skipped) => respond_text(ctx, command, "⏭️ Canción saltada").await,
        Ok(SkipOutcome::VoteAdded { votes }) => {
            respond_text(
                ctx,
                command,
                &format!(
                    "🗳️ Voto para saltar agregado: **{}/{}**",
                    votes, SKIP_VOTE_THRESHOLD
                ),
            )
            .await
        }
        Err(e) => respond_player_error(ctx, command, e).await,
    }
}

async fn handle_stop(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &MothMusicBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(session) = bot.registry.get(guild_id) else {
        return respond_player_error(ctx, command, PlayerError::NotPlaying).await;
    };

    session.stop_all().await;
    respond_text(ctx, command, "⏹️ Reproducción detenida y cola limpiada").await
}

async fn handle_queue(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &MothMusicBot,
    guild_id: GuildId,
) -> Result<()> {
    let page = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "page")
        .and_then(|opt| opt.value.as_i64())
        .unwrap_or(1)
        .max(1) as usize;

    let Some(session) = bot.registry.get(guild_id) else {
        return respond_player_error(ctx, command, PlayerError::NothingQueued).await;
    };

    let embed = embeds::create_queue_embed(&session.list_page(page));
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(CreateInteractionResponseMessage::new().embed(embed)),
        )
        .await?;

    Ok(())
}

async fn handle_nowplaying(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &MothMusicBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(session) = bot.registry.get(guild_id) else {
        return respond_player_error(ctx, command, PlayerError::NotPlaying).await;
    };

    let snapshot = session.snapshot();
    let Some(track) = snapshot.current.clone() else {
        return respond_player_error(ctx, command, PlayerError::NotPlaying).await;
    };

    let embed = embeds::create_now_playing_embed(&track, &snapshot);
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(CreateInteractionResponseMessage::new().embed(embed)),
        )
        .await?;

    Ok(())
}

async fn handle_shuffle(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &MothMusicBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(session) = bot.registry.get(guild_id) else {
        return respond_player_error(ctx, command, PlayerError::NothingQueued).await;
    };

    if session.queue_len() == 0 {
        return respond_player_error(ctx, command, PlayerError::NothingQueued).await;
    }

    session.shuffle();
    respond_text(ctx, command, "🔀 Cola mezclada").await
}

async fn handle_remove(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &MothMusicBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(position) = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "position")
        .and_then(|opt| opt.value.as_i64())
        .filter(|p| *p >= 1)
        .map(|p| p as usize)
    else {
        return respond_error(ctx, command, "Falta la posición a eliminar").await;
    };

    let Some(session) = bot.registry.get(guild_id) else {
        return respond_player_error(ctx, command, PlayerError::NothingQueued).await;
    };

    match session.remove_at(position) {
        Ok(track) => {
            respond_text(ctx, command, &format!("🗑️ **{}** eliminada de la cola", track.title))
                .await
        }
        Err(e) => respond_player_error(ctx, command, e).await,
    }
}

async fn handle_loop(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &MothMusicBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(session) = bot.registry.get(guild_id) else {
        return respond_player_error(ctx, command, PlayerError::NotPlaying).await;
    };

    match session.toggle_loop().await {
        Ok(true) => respond_text(ctx, command, "🔂 La canción actual se repetirá").await,
        Ok(false) => respond_text(ctx, command, "➡️ La canción actual ya no se repetirá").await,
        Err(e) => respond_player_error(ctx, command, e).await,
    }
}

async fn handle_volume(
    ctx: &Context,
    command: &CommandInteraction,
    bot: &MothMusicBot,
    guild_id: GuildId,
) -> Result<()> {
    let Some(session) = bot.registry.get(guild_id) else {
        return respond_player_error(ctx, command, PlayerError::NotPlaying).await;
    };

    let level = command
        .data
        .options
        .iter()
        .find(|opt| opt.name == "level")
        .and_then(|opt| opt.value.as_i64());

    match level {
        Some(level) => match session.set_volume(level).await {
            Ok(_) => respond_text(ctx, command, &format!("🔊 Volumen ajustado a {}%", level)).await,
            Err(e) => respond_player_error(ctx, command, e).await,
        },
        None => {
            let current = (session.snapshot().volume * 100.0) as i32;
            respond_text(ctx, command, &format!("🔊 Volumen actual: {}%", current)).await
        }
    }
}

// Funciones auxiliares

/// Devuelve la sesión de la guild, creándola con su transporte songbird y su
/// vista anclada al canal de texto del comando.
async fn get_or_create_session(
    ctx: &Context,
    bot: &MothMusicBot,
    guild_id: GuildId,
    text_channel: ChannelId,
) -> Result<Arc<PlaybackSession>> {
    let manager = songbird::get(ctx)
        .await
        .ok_or_else(|| anyhow::anyhow!("Songbird no inicializado"))?;

    let session = bot.registry.get_or_create(guild_id, || {
        PlaybackSession::spawn(
            guild_id,
            bot.config.default_volume,
            bot.resolver.clone(),
            Arc::new(SongbirdConductor::new(manager.clone(), guild_id)),
            Arc::new(DiscordSurface::new(ctx.http.clone(), text_channel)),
        )
    });

    Ok(session)
}

/// Canal de voz en el que está el usuario, según el caché de la guild.
fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|state| state.channel_id)
}

async fn respond_text(ctx: &Context, command: &CommandInteraction, text: &str) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new().content(text),
            ),
        )
        .await?;
    Ok(())
}

async fn respond_error(ctx: &Context, command: &CommandInteraction, text: &str) -> Result<()> {
    command
        .create_response(
            &ctx.http,
            CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(text)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}

async fn respond_player_error(
    ctx: &Context,
    command: &CommandInteraction,
    err: PlayerError,
) -> Result<()> {
    respond_error(ctx, command, &format!("❌ {}", err)).await
}

async fn edit_response_text(
    ctx: &Context,
    command: &CommandInteraction,
    text: &str,
) -> Result<()> {
    command
        .edit_response(&ctx.http, EditInteractionResponse::new().content(text))
        .await?;
    Ok(())
}
