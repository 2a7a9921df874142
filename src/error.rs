use thiserror::Error;

/// Errores de los comandos del reproductor.
///
/// Ningún error de un comando deja la sesión en un estado intermedio: las
/// mutaciones se aplican completas bajo el lock de la sesión o no se aplican.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// El resolver de fuentes falló; la cola no se tocó.
    #[error("no se pudo encolar la canción: {0}")]
    EnqueueFailed(String),

    /// Índice de cola inválido (las posiciones son 1-based).
    #[error("la posición {position} está fuera de rango (la cola tiene {len} canciones)")]
    OutOfRange { position: usize, len: usize },

    /// Volumen fuera del rango permitido.
    #[error("el volumen debe estar entre 0 y 100")]
    InvalidRange,

    /// Voto de salto duplicado; es informativo, no cuenta doble.
    #[error("ya votaste para saltar esta canción")]
    AlreadyVoted,

    #[error("no hay nada reproduciéndose en este momento")]
    NotPlaying,

    #[error("la cola está vacía")]
    NothingQueued,

    /// El transporte de voz se cayó; la sesión sigue viva y continúa con la
    /// siguiente canción.
    #[error("se perdió la conexión con el canal de voz")]
    ConnectionLost,
}
