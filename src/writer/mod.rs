pub mod music_writer;
pub mod primitive_writer;
pub mod song_writer;
