use serenity::{
    all::Timestamp,
    builder::{CreateEmbed, CreateEmbedFooter},
};
use std::time::Duration;

use crate::player::{
    queue::{QueuePage, PAGE_SIZE},
    session::{PlaybackState, SessionSnapshot},
    track::Track,
};

/// Paleta de colores estandarizada para el bot
pub mod colors {
    use serenity::all::Colour;

    pub const INFO_BLUE: Colour = Colour::from_rgb(52, 144, 220);
    pub const SUCCESS_GREEN: Colour = Colour::from_rgb(67, 181, 129);
    pub const MUSIC_PURPLE: Colour = Colour::from_rgb(138, 43, 226);
}

/// Footer estandarizado para todos los embeds
const STANDARD_FOOTER: &str = "🎵 Moth Music";

/// Crea el embed de "reproduciendo ahora" a partir del estado de la sesión.
pub fn create_now_playing_embed(track: &Track, snapshot: &SessionSnapshot) -> CreateEmbed {
    let state_line = match snapshot.state {
        PlaybackState::Paused => "⏸️ En pausa",
        _ => "▶️ Reproduciendo",
    };

    let mut embed = CreateEmbed::default()
        .title("🎵 Reproduciendo Ahora")
        .description(format!("**{}**", track.title))
        .color(colors::MUSIC_PURPLE)
        .field("📡 Estado", state_line, true);

    if let Some(duration) = track.duration {
        embed = embed.field("⏱️ Duración", format_duration(duration), true);
    } else {
        embed = embed.field("⏱️ Duración", "🔴 En vivo", true);
    }

    embed = embed
        .field("👤 Solicitado por", format!("<@{}>", track.requested_by), true)
        .field(
            "🔊 Volumen",
            format!("{}%", (snapshot.volume * 100.0) as u8),
            true,
        )
        .field(
            "🔂 Repetición",
            if snapshot.loop_single {
                "Activada"
            } else {
                "Desactivada"
            },
            true,
        )
        .field("📋 En cola", snapshot.queue_len.to_string(), true);

    if snapshot.skip_votes > 0 {
        embed = embed.field(
            "🗳️ Votos para saltar",
            format!("{}/{}", snapshot.skip_votes, crate::player::session::SKIP_VOTE_THRESHOLD),
            true,
        );
    }

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    embed
        .url(&track.url)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(STANDARD_FOOTER))
}

/// Crea un embed para mostrar que se agregó una canción
pub fn create_track_added_embed(track: &Track) -> CreateEmbed {
    let mut embed = CreateEmbed::default()
        .title("✅ Canción Agregada")
        .description(format!(
            "**{}** se ha agregado a la cola de reproducción",
            track.title
        ))
        .color(colors::SUCCESS_GREEN);

    if let Some(duration) = track.duration {
        embed = embed.field("⏱️ Duración", format_duration(duration), true);
    } else {
        embed = embed.field("⏱️ Duración", "🔴 En vivo", true);
    }

    embed = embed.field("👤 Solicitado por", format!("<@{}>", track.requested_by), true);

    if let Some(thumbnail) = &track.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }

    embed
        .url(&track.url)
        .timestamp(Timestamp::now())
        .footer(CreateEmbedFooter::new(
            "🎵 Se reproducirá automáticamente si no hay música sonando",
        ))
}

/// Embed con una página de la cola; las posiciones son 1-based, tal como las
/// usa `/remove`.
pub fn create_queue_embed(page: &QueuePage) -> CreateEmbed {
    if page.total == 0 {
        return CreateEmbed::default()
            .title("📋 Cola de Reproducción")
            .description("La cola está vacía")
            .color(colors::INFO_BLUE)
            .footer(CreateEmbedFooter::new(STANDARD_FOOTER));
    }

    let offset = (page.page - 1) * PAGE_SIZE;
    let mut description = format!("**{} canciones en cola:**\n\n", page.total);
    for (i, track) in page.items.iter().enumerate() {
        description.push_str(&format!(
            "`{}.` [**{}**]({})\n",
            offset + i + 1,
            track.title,
            track.url
        ));
    }

    CreateEmbed::default()
        .title("📋 Cola de Reproducción")
        .description(description)
        .color(colors::INFO_BLUE)
        .footer(CreateEmbedFooter::new(format!(
            "Página {}/{}",
            page.page, page.total_pages
        )))
}

/// Formatea una duración como m:ss o h:mm:ss.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(45)), "0:45");
        assert_eq!(format_duration(Duration::from_secs(212)), "3:32");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1:00:00");
        assert_eq!(format_duration(Duration::from_secs(7325)), "2:02:05");
    }
}
