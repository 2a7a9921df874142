pub mod controls;
pub mod embeds;
