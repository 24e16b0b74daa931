//! Ruxtab - Guitar Pro 5 tablature codec
//!
//! This library provides:
//! - Parsing of Guitar Pro 5.00 and 5.10 (.gp5) files into a `Song`
//! - Writing a `Song` back to either sub-version
//!
//! # Example
//!
//! ```no_run
//! use ruxtab::{parse_gp_data, write_gp_data, GpVersion};
//!
//! let file_data = std::fs::read("song.gp5").unwrap();
//! let mut song = parse_gp_data(&file_data).unwrap();
//! song.version = GpVersion::GP5_10;
//! let converted = write_gp_data(&song).unwrap();
//! std::fs::write("song-5.10.gp5", converted).unwrap();
//! ```

pub mod error;
pub mod parser;
pub mod song;
pub mod writer;

// Re-export main types for convenience
pub use error::RuxError;
pub use parser::song_parser::parse_gp_data;
pub use song::{
    Beat, BeatEffects, BeatStatus, Chord, Duration, GpVersion, KeySignature, Measure,
    MeasureHeader, MidiChannel, MixTableChange, Note, NoteEffect, NoteType, PageSetup, QUARTER_TIME,
    Song, SongInfo, Tempo, TimeSignature, Track, Voice,
};
pub use writer::song_writer::{write_gp_data, write_song};
