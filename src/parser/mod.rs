pub mod music_parser;
pub mod primitive_parser;
pub mod song_parser;
