use crate::song::{
    Beat, BeatStatus, DEFAULT_VELOCITY, MAX_STRINGS, MAX_VOICES, Measure, Note, NoteType, Song,
    Track, Voice, pack_velocity,
};
use crate::writer::primitive_writer::{
    write_byte_size_string, write_f64, write_i8, write_int, write_int_byte_sized_string,
    write_placeholder, write_u8,
};
use crate::writer::song_writer::{
    write_beat_effects, write_chord, write_color, write_duration, write_measure_headers,
    write_mix_table_change, write_note_effects,
};
use std::io::{self, Write};

/// Encodes everything following the MIDI channel table.
pub struct MusicWriter<'a> {
    song: &'a Song,
}

impl<'a> MusicWriter<'a> {
    pub const fn new(song: &'a Song) -> Self {
        Self { song }
    }

    pub fn write_music_data<W: Write>(&self, w: &mut W) -> io::Result<()> {
        // directions & master reverb
        write_placeholder(w, 42, 0xFF)?;

        let measure_count = self.song.measure_headers.len();
        let track_count = self.song.tracks.len();
        log::debug!(
            "Writing music data -> track_count: {track_count} measure_count {measure_count}"
        );
        write_int(w, measure_count as i32)?;
        write_int(w, track_count as i32)?;

        write_measure_headers(w, &self.song.measure_headers)?;
        self.write_tracks(w)?;
        self.write_measures(w)
    }

    pub fn write_tracks<W: Write>(&self, w: &mut W) -> io::Result<()> {
        log::debug!("Writing {} tracks", self.song.tracks.len());
        for (index, track) in self.song.tracks.iter().enumerate() {
            self.write_track(w, index, track)?;
        }
        // tracks done
        write_placeholder(w, self.song.version.tracks_padding_len(), 0x00)
    }

    pub fn write_track<W: Write>(&self, w: &mut W, index: usize, track: &Track) -> io::Result<()> {
        log::debug!("--------");
        log::debug!("Writing track {} {}", index + 1, track.name);
        let version = self.song.version;
        let mut flags = 0x00;
        if track.percussion {
            flags |= 0x01;
        }
        if track.twelve_stringed_guitar {
            flags |= 0x02;
        }
        if track.banjo {
            flags |= 0x04;
        }
        if track.visible {
            flags |= 0x08;
        }
        write_u8(w, flags)?;
        if index == 0 || version.is_base() {
            write_u8(w, flags | 0x08)?;
        }

        write_byte_size_string(w, &track.name, 40)?;

        let string_count = track.string_count();
        if string_count > MAX_STRINGS {
            log::warn!("Track {} has {string_count} strings, keeping {MAX_STRINGS}", track.name);
        }
        write_int(w, string_count.min(MAX_STRINGS) as i32)?;
        for index in 0..MAX_STRINGS {
            let tuning = track.strings.get(index).map_or(0, |string| string.value);
            write_int(w, tuning)?;
        }

        write_int(w, track.port)?;
        write_int(w, i32::from(track.channel.channel_id) + 1)?;
        write_int(w, i32::from(track.channel.effect_channel_id) + 1)?;
        write_int(w, track.fret_count)?;
        write_int(w, track.offset)?;
        write_color(w, track.color)?;

        w.write_all(version.track_compatibility_block())?;

        if !version.is_base() {
            write_int_byte_sized_string(w, &track.trailing_strings[0])?;
            write_int_byte_sized_string(w, &track.trailing_strings[1])?;
        }
        Ok(())
    }

    /// Measures are written measure by measure, each one for all tracks.
    pub fn write_measures<W: Write>(&self, w: &mut W) -> io::Result<()> {
        log::debug!("--------");
        log::debug!("Writing measures");
        let empty_measure = Measure::default();
        for measure_index in 0..self.song.measure_headers.len() {
            for track in &self.song.tracks {
                let measure = track.measures.get(measure_index).unwrap_or_else(|| {
                    log::warn!(
                        "Track {} has no measure {measure_index}, writing it empty",
                        track.name
                    );
                    &empty_measure
                });
                self.write_measure(w, measure, track)?;
            }
        }
        Ok(())
    }

    pub fn write_measure<W: Write>(
        &self,
        w: &mut W,
        measure: &Measure,
        track: &Track,
    ) -> io::Result<()> {
        log::debug!("Writing measure {} for track {}", measure.header_index, track.number);
        if measure.voices.len() > MAX_VOICES {
            log::warn!("Measure has {} voices, keeping {MAX_VOICES}", measure.voices.len());
        }
        let empty_voice = Voice::default();
        for voice_index in 0..MAX_VOICES {
            let voice = measure.voices.get(voice_index).unwrap_or(&empty_voice);
            self.write_voice(w, voice, track)?;
        }
        write_placeholder(w, 1, 0x00)
    }

    pub fn write_voice<W: Write>(&self, w: &mut W, voice: &Voice, track: &Track) -> io::Result<()> {
        log::debug!("...with {} beats", voice.beats.len());
        if voice.beats.is_empty() {
            // a voice holds at least one beat
            write_int(w, 1)?;
            let empty = Beat {
                status: BeatStatus::Empty,
                ..Default::default()
            };
            return self.write_beat(w, &empty, track);
        }
        write_int(w, voice.beats.len() as i32)?;
        for beat in &voice.beats {
            self.write_beat(w, beat, track)?;
        }
        Ok(())
    }

    pub fn write_beat<W: Write>(&self, w: &mut W, beat: &Beat, track: &Track) -> io::Result<()> {
        let mut flags = 0x00;
        if beat.duration.dotted {
            flags |= 0x01;
        }
        if beat.chord.is_some() {
            flags |= 0x02;
        }
        if beat.text.is_some() {
            flags |= 0x04;
        }
        if !beat.effect.is_default() {
            flags |= 0x08;
        }
        if beat.mix_table_change.is_some() {
            flags |= 0x10;
        }
        if beat.duration.has_tuplet() {
            flags |= 0x20;
        }
        if beat.is_empty_or_rest() {
            flags |= 0x40;
        }
        log::debug!("Beat flags: {flags:08b}");
        write_u8(w, flags)?;

        if flags & 0x40 != 0 {
            let beat_type = if beat.status == BeatStatus::Empty {
                0x00
            } else {
                0x02
            };
            write_u8(w, beat_type)?;
        }

        write_duration(w, &beat.duration, flags)?;

        if let Some(chord) = &beat.chord {
            write_chord(w, chord)?;
        }
        if let Some(text) = &beat.text {
            write_int_byte_sized_string(w, text)?;
        }
        if flags & 0x08 != 0 {
            write_beat_effects(w, &beat.effect)?;
        }
        if let Some(mix_table_change) = &beat.mix_table_change {
            write_mix_table_change(w, mix_table_change, self.song.version)?;
        }

        let notes = Self::playable_notes(beat, track.string_count().min(MAX_STRINGS));
        let mut string_flags = 0x00_u8;
        for note in &notes {
            string_flags |= 1 << (MAX_STRINGS - note.string as usize);
        }
        log::debug!("Writing notes for beat flags:{string_flags:08b}");
        write_u8(w, string_flags)?;
        for note in notes {
            Self::write_note(w, note)?;
        }

        write_placeholder(w, 2, 0x00)
    }

    /// Notes ordered by string, one per string, on the strings of the track.
    fn playable_notes(beat: &Beat, string_count: usize) -> Vec<&Note> {
        let mut notes: Vec<&Note> = beat
            .notes
            .iter()
            .filter(|note| {
                let on_track = note.string >= 1 && note.string as usize <= string_count;
                if !on_track {
                    log::warn!("Dropping note on string {} out of the track", note.string);
                }
                on_track
            })
            .collect();
        notes.sort_by_key(|note| note.string);
        notes.dedup_by(|note, previous| {
            let duplicate = note.string == previous.string;
            if duplicate {
                log::warn!("Dropping duplicated note on string {}", note.string);
            }
            duplicate
        });
        notes
    }

    pub fn write_note<W: Write>(w: &mut W, note: &Note) -> io::Result<()> {
        log::debug!("Writing note on string {}", note.string);
        let effect = &note.effect;
        let mut flags = 0x20;
        if (note.duration_percent - 1.0).abs() > f64::EPSILON {
            flags |= 0x01;
        }
        if effect.heavy_accentuated_note {
            flags |= 0x02;
        }
        if effect.ghost_note {
            flags |= 0x04;
        }
        if effect.has_effect_record() || effect.presence {
            flags |= 0x08;
        }
        if note.velocity != DEFAULT_VELOCITY {
            flags |= 0x10;
        }
        if effect.accentuated_note {
            flags |= 0x40;
        }
        if effect.fingering.is_some() {
            flags |= 0x80;
        }
        write_u8(w, flags)?;

        write_u8(w, note.kind.to_byte())?;
        if flags & 0x10 != 0 {
            write_i8(w, pack_velocity(note.velocity))?;
        }
        // tied notes take their fret from the previous note on the string
        let fret = if note.kind == NoteType::Tie {
            0
        } else {
            note.value.clamp(0, 99) as i8
        };
        write_i8(w, fret)?;

        if let Some(fingering) = &effect.fingering {
            write_i8(w, fingering.left)?;
            write_i8(w, fingering.right)?;
        }
        if flags & 0x01 != 0 {
            write_f64(w, note.duration_percent)?;
        }

        let flags2 = if note.swap_accidentals { 0x02 } else { 0x00 };
        write_u8(w, flags2)?;

        if flags & 0x08 != 0 {
            write_note_effects(w, effect)?;
        }
        Ok(())
    }
}
