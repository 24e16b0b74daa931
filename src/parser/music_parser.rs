use crate::parser::primitive_parser::{
    parse_byte_size_string, parse_f64, parse_i8, parse_int, parse_int_byte_sized_string,
    parse_u8, skip,
};
use crate::parser::song_parser::{
    parse_beat_effects, parse_chord, parse_color, parse_duration, parse_measure_headers,
    parse_mix_table_change, parse_note_effects,
};
use crate::song::{
    Beat, BeatStatus, Fingering, GuitarString, MAX_STRINGS, MAX_VOICES, MIDI_CHANNEL_COUNT,
    Measure, MidiChannel, Note, NoteEffect, NoteType, PERCUSSION_CHANNEL, Song, Track, Voice,
    unpack_velocity,
};
use nom::multi::count;
use nom::{IResult, Parser};

/// Decodes everything following the MIDI channel table.
pub struct MusicParser {
    song: Song,
    /// Last fret played per track and string, to resolve tied notes
    last_frets: Vec<[Option<i16>; MAX_STRINGS]>,
}

impl MusicParser {
    pub const fn new(song: Song) -> Self {
        Self {
            song,
            last_frets: Vec::new(),
        }
    }

    pub fn take_song(&mut self) -> Song {
        std::mem::take(&mut self.song)
    }

    pub fn parse_music_data<'a>(&'a mut self, i: &'a [u8]) -> IResult<&'a [u8], ()> {
        // skip directions & master reverb
        let (i, ()) = skip(i, 42)?;

        let (i, (measure_count, track_count)) = (
            parse_int, // Measure count
            parse_int, // Track count
        )
            .parse(i)?;

        log::debug!(
            "Parsing music data -> track_count: {track_count} measure_count {measure_count}"
        );

        let song_tempo = self.song.tempo.value;
        let (i, measure_headers) = parse_measure_headers(measure_count, song_tempo)(i)?;
        self.song.measure_headers = measure_headers;

        let track_count = track_count.max(0) as usize;
        let (i, tracks) = self.parse_tracks(track_count)(i)?;
        self.song.tracks = tracks;
        self.last_frets = vec![[None; MAX_STRINGS]; track_count];

        let (i, ()) = self.parse_measures()(i)?;

        Ok((i, ()))
    }

    pub fn parse_tracks(
        &self,
        tracks_count: usize,
    ) -> impl FnMut(&[u8]) -> IResult<&[u8], Vec<Track>> + '_ {
        move |i| {
            log::debug!("Parsing {tracks_count} tracks");
            let mut i = i;
            let mut tracks = Vec::new();
            for number in 1..=tracks_count {
                let (inner, track) = self.parse_track(number)(i)?;
                i = inner;
                tracks.push(track);
            }
            // tracks done
            let (i, ()) = skip(i, self.song.version.tracks_padding_len())?;
            Ok((i, tracks))
        }
    }

    pub fn parse_track(&self, number: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], Track> + '_ {
        move |i| {
            log::debug!("--------");
            log::debug!("Parsing track {number}");
            let version = self.song.version;
            let (mut i, flags) = parse_u8(i)?;
            let mut track = Track {
                number: number as i32,
                percussion: (flags & 0x01) == 0x01,
                twelve_stringed_guitar: (flags & 0x02) == 0x02,
                banjo: (flags & 0x04) == 0x04,
                visible: (flags & 0x08) == 0x08,
                ..Default::default()
            };

            if number == 1 || version.is_base() {
                let (inner, ()) = skip(i, 1)?;
                i = inner;
            }

            // track name
            let (inner, name) = parse_byte_size_string(40)(i)?;
            i = inner;
            log::debug!("Track name:{name}");
            track.name = name;

            // string count
            let (inner, string_count) = parse_int(i)?;
            i = inner;
            log::debug!("String count: {string_count}");

            // tunings
            let (inner, tunings) = count(parse_int, MAX_STRINGS).parse(i)?;
            i = inner;
            log::debug!("Tunings: {tunings:?}");
            track.strings = tunings
                .iter()
                .zip(1..)
                .filter(|&(_, number)| number <= string_count)
                .map(|(&value, number)| GuitarString { number, value })
                .collect();

            // midi port
            let (inner, port) = parse_int(i)?;
            log::debug!("Midi port: {port:?}");
            i = inner;
            track.port = port;

            // parse track channel info
            let (inner, channel) = self.parse_track_channel()(i)?;
            log::debug!("Midi channel: {channel:?}");
            i = inner;
            if channel.channel_id == PERCUSSION_CHANNEL {
                track.percussion = true;
            }
            track.channel = channel;

            // fret
            let (inner, fret_count) = parse_int(i)?;
            log::debug!("Fret count: {fret_count:?}");
            i = inner;
            track.fret_count = fret_count;

            // offset
            let (inner, offset) = parse_int(i)?;
            log::debug!("Offset: {offset:?}");
            i = inner;
            track.offset = offset;

            // color
            let (inner, color) = parse_color(i)?;
            log::debug!("Color: {color:?}");
            i = inner;
            track.color = color;

            let (inner, ()) = skip(i, version.track_compatibility_block().len())?;
            i = inner;

            if !version.is_base() {
                let (inner, (first, second)) =
                    (parse_int_byte_sized_string, parse_int_byte_sized_string).parse(i)?;
                i = inner;
                track.trailing_strings = [first, second];
            }
            Ok((i, track))
        }
    }

    /// Read MIDI channel. MIDI channel in Guitar Pro is represented by two integers.
    /// First is one-based number of channel, second is one-based number of channel used for effects.
    pub fn parse_track_channel(&self) -> impl FnMut(&[u8]) -> IResult<&[u8], MidiChannel> + '_ {
        log::debug!("Parsing track channel");
        move |i| {
            let (i, (gm_channel_1, gm_channel_2)) = (parse_int, parse_int).parse(i)?;
            let channel_index = gm_channel_1.saturating_sub(1);
            let effect_index = gm_channel_2.saturating_sub(1);

            log::debug!("Track channel gm1: {channel_index} gm2: {effect_index}");

            let mut channel = match usize::try_from(channel_index)
                .ok()
                .and_then(|index| self.song.midi_channels.get(index))
            {
                Some(channel) => channel.clone(),
                None => {
                    log::warn!("channel {channel_index} not found, using default channel");
                    MidiChannel::default()
                }
            };
            // percussion channel has no effect channel
            if channel.channel_id != PERCUSSION_CHANNEL
                && (0..MIDI_CHANNEL_COUNT as i32).contains(&effect_index)
            {
                channel.effect_channel_id = effect_index as u8;
            }
            Ok((i, channel))
        }
    }

    /// Read measures. Measures are written in the following order:
    /// - measure 1/track 1
    /// - measure 1/track 2
    /// - ...
    /// - measure 1/track m
    /// - measure 2/track 1
    /// - ...
    /// - measure n/track m
    pub fn parse_measures(&mut self) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> + '_ {
        move |i: &[u8]| {
            log::debug!("--------");
            log::debug!("Parsing measures");
            let mut i = i;
            for measure_index in 0..self.song.measure_headers.len() {
                for track_index in 0..self.song.tracks.len() {
                    let (inner, measure) = self.parse_measure(measure_index, track_index)(i)?;
                    i = inner;
                    // push measure on track
                    self.song.tracks[track_index].measures.push(measure);
                }
            }
            Ok((i, ()))
        }
    }

    pub fn parse_measure(
        &mut self,
        measure_index: usize,
        track_index: usize,
    ) -> impl FnMut(&[u8]) -> IResult<&[u8], Measure> + '_ {
        move |i: &[u8]| {
            log::debug!("--------");
            log::debug!("Parsing measure {measure_index} for track {track_index}");
            let mut i = i;
            let start = self.song.measure_headers[measure_index].start;
            let mut measure = Measure {
                header_index: measure_index,
                track_index,
                start,
                voices: Vec::with_capacity(MAX_VOICES),
            };
            for voice_index in 0..MAX_VOICES {
                // voices have the same start value
                log::debug!("--------");
                log::debug!("Parsing voice {voice_index}");
                let (inner, voice) = self.parse_voice(start, track_index, measure_index)(i)?;
                i = inner;
                measure.voices.push(voice);
            }
            let (i, ()) = skip(i, 1)?;
            Ok((i, measure))
        }
    }

    pub fn parse_voice(
        &mut self,
        mut beat_start: i64,
        track_index: usize,
        measure_index: usize,
    ) -> impl FnMut(&[u8]) -> IResult<&[u8], Voice> + '_ {
        move |i: &[u8]| {
            let (mut i, beats) = parse_int(i)?;
            let mut voice = Voice::default();
            log::debug!("--------");
            log::debug!("...with {beats} beats");
            for b in 1..=beats {
                log::debug!("--------");
                log::debug!("Parsing beat {b}");
                let (inner, beat) = self.parse_beat(beat_start, track_index, measure_index)(i)?;
                if !beat.is_empty() {
                    beat_start += beat.duration.time();
                }
                i = inner;
                voice.beats.push(beat);
            }
            Ok((i, voice))
        }
    }

    pub fn parse_beat(
        &mut self,
        start: i64,
        track_index: usize,
        measure_index: usize,
    ) -> impl FnMut(&[u8]) -> IResult<&[u8], Beat> + '_ {
        move |i: &[u8]| {
            let (mut i, flags) = parse_u8(i)?;
            log::debug!("Beat flags: {flags:08b}");

            // make new beat at starting time
            let mut beat = Beat {
                start,
                ..Default::default()
            };

            // beat type
            if (flags & 0x40) != 0 {
                let (inner, beat_type) = parse_u8(i)?;
                i = inner;
                beat.status = if beat_type & 0x02 == 0 {
                    BeatStatus::Empty
                } else {
                    BeatStatus::Rest
                };
            }

            let (inner, duration) = parse_duration(flags)(i)?;
            beat.duration = duration;
            i = inner;

            let string_count = self.song.tracks[track_index].string_count();

            // beat chords
            if (flags & 0x02) != 0 {
                let (inner, chord) = parse_chord(string_count)(i)?;
                i = inner;
                // chords without any played string are dropped
                if chord.note_count() > 0 {
                    beat.chord = Some(chord);
                }
            }

            // beat text
            if (flags & 0x04) != 0 {
                let (inner, text) = parse_int_byte_sized_string(i)?;
                i = inner;
                log::debug!("Beat text: {text}");
                beat.text = Some(text);
            }

            // beat effect
            if (flags & 0x08) != 0 {
                let (inner, effect) = parse_beat_effects(i)?;
                i = inner;
                beat.effect = effect;
            }

            // parse mix change
            if (flags & 0x10) != 0 {
                let (inner, mix_table_change) = parse_mix_table_change(self.song.version)(i)?;
                i = inner;
                if let Some(tempo) = &mix_table_change.tempo {
                    // only the current measure follows the tempo change
                    self.song.measure_headers[measure_index].tempo = tempo.value;
                }
                beat.mix_table_change = Some(mix_table_change);
            }

            // parse notes
            let (inner, string_flags) = parse_u8(i)?;
            i = inner;
            log::debug!("Parsing notes for beat strings:{string_count}, flags:{string_flags:08b}");
            for bit in (0..MAX_STRINGS).rev() {
                let string = MAX_STRINGS - bit;
                if string_flags & (1 << bit) != 0 && string <= string_count {
                    log::debug!("Parsing note for string {string}");
                    let mut note = Note::new(NoteEffect::default());
                    let (inner, ()) = self.parse_note(&mut note, string as i8, track_index)(i)?;
                    i = inner;
                    beat.notes.push(note);
                }
            }

            let (inner, ()) = skip(i, 1)?;
            i = inner;
            let (inner, read) = parse_u8(i)?;
            i = inner;
            if read == 8 || read == 10 {
                let (inner, ()) = skip(i, 1)?;
                i = inner;
            }
            Ok((i, beat))
        }
    }

    /// Get note value of tied note, the last fret played on the string or zero
    fn get_tied_note_value(&self, string: i8, track_index: usize) -> i16 {
        usize::try_from(string - 1)
            .ok()
            .and_then(|string_index| self.last_frets[track_index].get(string_index))
            .copied()
            .flatten()
            .unwrap_or(0)
    }

    fn record_fret(&mut self, string: i8, track_index: usize, value: i16) {
        if let Some(last_fret) = usize::try_from(string - 1)
            .ok()
            .and_then(|string_index| self.last_frets[track_index].get_mut(string_index))
        {
            *last_fret = Some(value);
        }
    }

    pub fn parse_note<'a>(
        &'a mut self,
        note: &'a mut Note,
        string: i8,
        track_index: usize,
    ) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> + 'a {
        move |i| {
            log::debug!("Parsing note on string {string}");
            let (mut i, flags) = parse_u8(i)?;
            note.string = string;
            note.effect.heavy_accentuated_note = (flags & 0x02) == 0x02;
            note.effect.ghost_note = (flags & 0x04) == 0x04;
            note.effect.accentuated_note = (flags & 0x40) == 0x40;

            // note type
            if (flags & 0x20) != 0 {
                let (inner, note_type) = parse_u8(i)?;
                i = inner;
                note.kind = NoteType::get_note_type(note_type);
            }

            // note velocity
            if (flags & 0x10) != 0 {
                let (inner, velocity) = parse_i8(i)?;
                i = inner;
                note.velocity = unpack_velocity(i16::from(velocity));
            }

            // note value
            if (flags & 0x20) != 0 {
                let (inner, fret) = parse_i8(i)?;
                i = inner;

                let value = if note.kind == NoteType::Tie {
                    self.get_tied_note_value(string, track_index)
                } else {
                    i16::from(fret)
                };
                // value is between 0 and 99
                if (0..100).contains(&value) {
                    note.value = value;
                } else {
                    log::warn!("Fret {value} out of range on string {string}, using 0");
                    note.value = 0;
                }
            }
            self.record_fret(string, track_index, note.value);

            // fingering
            if (flags & 0x80) != 0 {
                let (inner, (left, right)) = (parse_i8, parse_i8).parse(i)?;
                i = inner;
                note.effect.fingering = Some(Fingering { left, right });
            }

            // duration percent
            if (flags & 0x01) != 0 {
                let (inner, duration_percent) = parse_f64(i)?;
                i = inner;
                note.duration_percent = duration_percent;
            }

            // swap accidentals
            let (inner, flags2) = parse_u8(i)?;
            i = inner;
            note.swap_accidentals = flags2 & 0x02 == 0x02;

            if (flags & 0x08) != 0 {
                let (inner, ()) = parse_note_effects(&mut note.effect)(i)?;
                i = inner;
                note.effect.presence = !note.effect.has_effect_record();
            }

            Ok((i, ()))
        }
    }
}
