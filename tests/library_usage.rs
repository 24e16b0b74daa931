//! Integration tests for ruxtab library usage.
//!
//! These tests verify that the library can be used as a dependency
//! from external projects.

use ruxtab::song::MIDI_CHANNEL_COUNT;
use ruxtab::{
    Beat, BeatStatus, Duration, GpVersion, Measure, MeasureHeader, MidiChannel, Note, QUARTER_TIME,
    RuxError, Song, Track, Voice, parse_gp_data, write_gp_data, write_song,
};

/// Test that all major types are accessible from the library.
#[test]
fn test_types_accessible() {
    // This test verifies that the public API types compile and are usable.
    // If any re-export is missing, this test will fail to compile.

    fn _assert_types() {
        let _: fn(&[u8]) -> Result<Song, RuxError> = parse_gp_data;
        let _: fn(&Song) -> Result<Vec<u8>, RuxError> = write_gp_data;
        let _: fn(&mut Vec<u8>, &Song) -> Result<(), RuxError> = write_song::<Vec<u8>>;
        let _: i64 = QUARTER_TIME;
    }
}

/// Two measures of quarter notes on the first string.
fn build_song(version: GpVersion) -> Song {
    let headers: Vec<MeasureHeader> = (0..2)
        .map(|index| MeasureHeader {
            number: index + 1,
            start: QUARTER_TIME + index as i64 * 4 * QUARTER_TIME,
            ..Default::default()
        })
        .collect();
    let measures = headers
        .iter()
        .enumerate()
        .map(|(header_index, header)| {
            let beats = (0..4)
                .map(|fret| Beat {
                    start: header.start + fret * QUARTER_TIME,
                    duration: Duration::default(),
                    notes: vec![Note {
                        string: 1,
                        value: fret as i16,
                        ..Default::default()
                    }],
                    ..Default::default()
                })
                .collect();
            // a voice without beats is read back with one empty beat
            let empty = Beat {
                start: header.start,
                status: BeatStatus::Empty,
                ..Default::default()
            };
            Measure {
                track_index: 0,
                header_index,
                start: header.start,
                voices: vec![Voice { beats }, Voice { beats: vec![empty] }],
            }
        })
        .collect();
    // the table entry of the track channel, as read back
    let mut midi_channels: Vec<MidiChannel> = (0..MIDI_CHANNEL_COUNT as u8)
        .map(MidiChannel::synthetic)
        .collect();
    midi_channels[0] = MidiChannel {
        effect_channel_id: 0,
        ..MidiChannel::default()
    };
    Song {
        version,
        midi_channels,
        measure_headers: headers,
        tracks: vec![Track {
            name: "Guitar".to_string(),
            measures,
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// Test writing then reading a song built in memory.
#[test]
fn test_write_and_parse() {
    for version in [GpVersion::GP5, GpVersion::GP5_10] {
        let song = build_song(version);
        let data = write_gp_data(&song).expect("Failed to write song");
        let parsed = parse_gp_data(&data).expect("Failed to parse written song");
        assert_eq!(parsed, song, "{version:?}");

        let mut streamed = Vec::new();
        write_song(&mut streamed, &parsed).expect("Failed to stream song");
        assert_eq!(streamed, data, "{version:?}");
    }
}

/// Test converting a song between the two sub-versions.
#[test]
fn test_convert_version() {
    let mut song = parse_gp_data(&write_gp_data(&build_song(GpVersion::GP5)).unwrap()).unwrap();
    song.version = GpVersion::GP5_10;
    let converted = parse_gp_data(&write_gp_data(&song).unwrap()).unwrap();
    assert_eq!(converted.version, GpVersion::GP5_10);
    assert_eq!(converted.tracks, song.tracks);
    assert_eq!(converted.measure_headers, song.measure_headers);
}

/// Test the serde model round trip.
#[test]
fn test_json_model() {
    let song = build_song(GpVersion::GP5);
    let json = serde_json::to_string(&song).expect("Failed to serialize song");
    let back: Song = serde_json::from_str(&json).expect("Failed to deserialize song");
    assert_eq!(back, song);
    assert_eq!(back.tracks[0].measures[0].voices[0].beats[0].status, BeatStatus::Normal);
}

/// Test error handling for invalid data.
#[test]
fn test_parse_error() {
    let invalid_data = vec![0u8; 10]; // Not a valid GP file
    let result = parse_gp_data(&invalid_data);

    assert!(result.is_err(), "Should return error for invalid data");
    let err = result.unwrap_err();
    assert!(
        matches!(err, RuxError::UnexpectedEndOfInput { offset: 1 }),
        "Should be an end of input error, got {err}"
    );

    let mut old_version = vec![24];
    old_version.extend_from_slice(b"FICHIER GUITAR PRO v4.06");
    old_version.extend_from_slice(&[0; 6]);
    assert!(matches!(
        parse_gp_data(&old_version),
        Err(RuxError::UnsupportedVersion(_))
    ));
}

/// Test error handling for a truncated file.
#[test]
fn test_truncated_file() {
    let data = write_gp_data(&build_song(GpVersion::GP5)).unwrap();
    let truncated = &data[..data.len() / 2];
    assert!(matches!(
        parse_gp_data(truncated),
        Err(RuxError::UnexpectedEndOfInput { .. })
    ));
}
