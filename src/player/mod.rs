//! Núcleo de reproducción por guild.
//!
//! Cada guild con actividad de música tiene una [`session::PlaybackSession`]
//! propia: una máquina de estados (inactiva, reproduciendo, en pausa,
//! desmontándose) con su cola FIFO, su conteo de votos de salto y su lazo de
//! reproducción, que corre como tarea independiente de cualquier comando.
//!
//! Las sesiones viven en el [`registry::SessionRegistry`] global, se crean
//! bajo demanda y solo mueren por un desmontaje explícito (`/leave` o el
//! apagado del proceso). Hablan con el exterior a través de dos costuras:
//! [`voice::VoiceConductor`] hacia la conexión de voz y
//! [`surface::NowPlayingSurface`] hacia la vista "reproduciendo ahora", lo
//! que permite probar todo el núcleo sin Discord.

pub mod queue;
pub mod registry;
pub mod session;
pub mod surface;
pub mod track;
pub mod voice;

#[cfg(test)]
pub mod testkit;
