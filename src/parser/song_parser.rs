use crate::RuxError;
use crate::parser::music_parser::MusicParser;
use crate::parser::primitive_parser::{
    parse_bool, parse_byte_size_string, parse_i8, parse_int, parse_int_byte_sized_string,
    parse_int_sized_string, parse_u8, skip,
};
use crate::song::{
    BeatEffects, BeatStroke, BeatStrokeDirection, BendEffect, BendPoint, Chord, Duration,
    GP_BEND_POSITION, GP_BEND_SEMITONE, GpVersion, GraceEffect, GraceEffectTransition,
    HEADER_FOOTER_PAGE_NUMBER, HarmonicType, KeySignature, LyricLine, Lyrics, MIDI_CHANNEL_COUNT,
    MAX_STRINGS, Marker, MeasureHeader, MidiChannel, MixTableChange, MixTableItem, NoteEffect,
    PageSetup, Padding, Point, QUARTER_TIME, SEMITONE_LENGTH, SlapEffect, SlideType, Song,
    SongInfo, Tempo, TremoloPickingEffect, TrillEffect, TripletFeel,
    BEND_EFFECT_MAX_POSITION_LENGTH, unpack_velocity,
};
use nom::combinator::{cond, flat_map, map};
use nom::error::ErrorKind;
use nom::multi::count;
use nom::sequence::preceded;
use nom::{IResult, Parser};

// GP5 docs thanks to Tuxguitar, alphaTab and <https://github.com/slundi/guitarpro> for the help

pub fn parse_chord(string_count: usize) -> impl FnMut(&[u8]) -> IResult<&[u8], Chord> {
    move |i| {
        log::debug!("Parsing chord for {string_count} strings");
        let mut chord = Chord::new(string_count);
        let (mut i, ()) = skip(i, 17)?;
        let (inner, chord_name) = parse_byte_size_string(21)(i)?;
        i = inner;
        chord.name = chord_name;
        let (inner, ()) = skip(i, 4)?;
        i = inner;
        let (inner, first_fret) = parse_int(i)?;
        i = inner;
        chord.first_fret = first_fret;
        for c in 0..MAX_STRINGS {
            let (inner, fret) = parse_int(i)?;
            i = inner;
            if c < string_count {
                chord.strings[c] = fret;
            }
        }
        let (i, ()) = skip(i, 32)?;
        Ok((i, chord))
    }
}

pub fn parse_note_effects(
    note_effect: &mut NoteEffect,
) -> impl FnMut(&[u8]) -> IResult<&[u8], ()> + '_ {
    move |i| {
        log::debug!("Parsing note effects");
        let (mut i, (flags1, flags2)) = (parse_u8, parse_u8).parse(i)?;

        if (flags1 & 0x01) == 0x01 {
            let (inner, bend_effect) = parse_bend_effect(i)?;
            i = inner;
            note_effect.bend = Some(bend_effect);
        }

        if (flags1 & 0x10) == 0x10 {
            let (inner, grace_effect) = parse_grace_effect(i)?;
            i = inner;
            note_effect.grace = Some(grace_effect);
        }

        if (flags2 & 0x04) == 0x04 {
            let (inner, tremolo_picking) = parse_tremolo_picking(i)?;
            i = inner;
            note_effect.tremolo_picking = Some(tremolo_picking);
        }

        if (flags2 & 0x08) == 0x08 {
            let (inner, slide_type) = parse_slide_type(i)?;
            i = inner;
            note_effect.slide = slide_type;
        }

        if (flags2 & 0x10) == 0x10 {
            let (inner, harmonic) = parse_harmonic_effect(i)?;
            i = inner;
            note_effect.harmonic = harmonic;
        }

        if (flags2 & 0x20) == 0x20 {
            let (inner, trill_effect) = parse_trill_effect(i)?;
            i = inner;
            note_effect.trill = Some(trill_effect);
        }

        note_effect.let_ring = (flags1 & 0x08) == 0x08;
        note_effect.hammer = (flags1 & 0x02) == 0x02;
        // never cleared once set
        note_effect.vibrato = (flags2 & 0x40) == 0x40 || note_effect.vibrato;
        note_effect.palm_mute = (flags2 & 0x02) == 0x02;
        note_effect.staccato = (flags2 & 0x01) == 0x01;

        Ok((i, ()))
    }
}

pub fn parse_trill_effect(i: &[u8]) -> IResult<&[u8], TrillEffect> {
    log::debug!("Parsing trill effect");
    map((parse_i8, parse_i8), |(fret, period)| {
        let mut trill_effect = TrillEffect {
            fret,
            ..Default::default()
        };
        trill_effect.duration.value = TrillEffect::from_trill_period(period);
        trill_effect
    })
    .parse(i)
}

/// The artificial and tapped harmonics carry extra bytes of unknown meaning.
pub fn parse_harmonic_effect(i: &[u8]) -> IResult<&[u8], Option<HarmonicType>> {
    let (i, harmonic_type) = parse_i8(i)?;
    log::debug!("Parsing harmonic effect {harmonic_type}");
    match HarmonicType::from_byte(harmonic_type) {
        Some(harmonic) => {
            let (i, ()) = skip(i, harmonic.extra_len())?;
            Ok((i, Some(harmonic)))
        }
        None => {
            log::warn!("Unknown harmonic type {harmonic_type}, ignoring harmonic");
            Ok((i, None))
        }
    }
}

pub fn parse_slide_type(i: &[u8]) -> IResult<&[u8], Option<SlideType>> {
    log::debug!("Parsing slide type");
    map(parse_u8, SlideType::from_byte).parse(i)
}

pub fn parse_tremolo_picking(i: &[u8]) -> IResult<&[u8], TremoloPickingEffect> {
    log::debug!("Parsing tremolo picking");
    map(parse_i8, |tp| {
        let value = TremoloPickingEffect::from_tremolo_value(tp);
        let mut tremolo_picking_effect = TremoloPickingEffect::default();
        tremolo_picking_effect.duration.value = value;
        tremolo_picking_effect
    })
    .parse(i)
}

pub fn parse_grace_effect(i: &[u8]) -> IResult<&[u8], GraceEffect> {
    log::debug!("Parsing grace effect");
    map(
        (parse_u8, parse_u8, parse_u8, parse_u8, parse_u8),
        |(fret, velocity, transition, duration, flags)| GraceEffect {
            duration,
            fret: fret as i8,
            is_dead: (flags & 0x01) == 0x01,
            is_on_beat: (flags & 0x02) == 0x02,
            transition: GraceEffectTransition::get_grace_effect_transition(transition),
            velocity: unpack_velocity(i16::from(velocity)),
        },
    )
    .parse(i)
}

pub fn parse_beat_effects(i: &[u8]) -> IResult<&[u8], BeatEffects> {
    log::debug!("Parsing beat effects");
    let (mut i, (flags1, flags2)) = (parse_u8, parse_u8).parse(i)?;
    let mut beat_effects = BeatEffects {
        fade_in: flags1 & 0x10 != 0,
        vibrato: flags1 & 0x02 != 0,
        has_rasgueado: flags2 & 0x01 != 0,
        ..Default::default()
    };

    if flags1 & 0x20 != 0 {
        let (inner, effect) = parse_u8(i)?;
        i = inner;
        beat_effects.slap = match effect {
            0 => SlapEffect::None,
            1 => SlapEffect::Tapping,
            2 => SlapEffect::Slapping,
            3 => SlapEffect::Popping,
            x => {
                log::warn!("Unknown slap effect {x}, ignoring");
                SlapEffect::None
            }
        };
    }

    if flags2 & 0x04 != 0 {
        let (inner, effect) = parse_tremolo_bar(i)?;
        i = inner;
        beat_effects.tremolo_bar = Some(effect);
    }

    if flags1 & 0x40 != 0 {
        let (inner, (stroke_up, stroke_down)) = (parse_i8, parse_i8).parse(i)?;
        i = inner;
        if stroke_up > 0 {
            beat_effects.stroke = BeatStroke {
                direction: BeatStrokeDirection::Up,
                value: BeatStroke::from_stroke_value(stroke_up),
            };
        }
        if stroke_down > 0 {
            beat_effects.stroke = BeatStroke {
                direction: BeatStrokeDirection::Down,
                value: BeatStroke::from_stroke_value(stroke_down),
            };
        }
    }

    if flags2 & 0x02 != 0 {
        let (inner, pick_stroke) = parse_i8(i)?;
        i = inner;
        beat_effects.pick_stroke = Some(pick_stroke);
    }

    Ok((i, beat_effects))
}

/// Bend points with their value divided by `value_unit`.
fn parse_bend_points(value_unit: f32) -> impl FnMut(&[u8]) -> IResult<&[u8], BendEffect> {
    move |i| {
        let (mut i, (kind, value, num_points)) = (parse_i8, parse_int, parse_int).parse(i)?;
        let mut bend_effect = BendEffect {
            kind,
            value,
            points: Vec::with_capacity(num_points.clamp(0, 16) as usize),
        };
        for _ in 0..num_points {
            let (inner, (position, value, vibrato)) =
                (parse_int, parse_int, parse_bool).parse(i)?;
            i = inner;

            let point_position =
                position as f32 * BEND_EFFECT_MAX_POSITION_LENGTH / GP_BEND_POSITION;
            let point_value = value as f32 * SEMITONE_LENGTH / value_unit;
            bend_effect.points.push(BendPoint {
                position: point_position.round() as u8,
                value: point_value.round() as i8,
                vibrato,
            });
        }
        Ok((i, bend_effect))
    }
}

pub fn parse_bend_effect(i: &[u8]) -> IResult<&[u8], BendEffect> {
    log::debug!("Parsing bend effect");
    parse_bend_points(GP_BEND_SEMITONE)(i)
}

pub fn parse_tremolo_bar(i: &[u8]) -> IResult<&[u8], BendEffect> {
    log::debug!("Parsing tremolo bar");
    parse_bend_points(GP_BEND_SEMITONE * 2.0)(i)
}

/// Read beat duration.
/// Duration is composed of byte signifying duration and an integer that maps to `Tuplet`. The byte maps to following values:
///
/// * *-2*: whole note
/// * *-1*: half note
/// * *0*: quarter note
/// * *1*: eighth note
/// * *2*: sixteenth note
/// * *3*: thirty-second note
///
/// If flag at *0x20* is true, the tuplet is read
pub fn parse_duration(flags: u8) -> impl FnMut(&[u8]) -> IResult<&[u8], Duration> {
    move |i: &[u8]| {
        log::debug!("Parsing duration");
        let (mut i, value) = parse_i8(i)?;
        let exponent = value.clamp(-2, 5);
        if exponent != value {
            log::warn!("Duration value {value} out of range, clamped to {exponent}");
        }
        let mut d = Duration {
            value: 1 << (exponent + 2),
            dotted: flags & 0x01 != 0,
            ..Default::default()
        };
        log::debug!("Duration value: {}", d.value);

        if (flags & 0x20) == 0x20 {
            let (inner, i_tuplet) = parse_int(i)?;
            i = inner;
            match Duration::tuplet_times_for(i_tuplet) {
                Some(times) => {
                    d.tuplet_enters = i_tuplet as u8;
                    d.tuplet_times = times;
                }
                None => log::warn!("Unknown tuplet {i_tuplet}, ignoring"),
            }
        }

        Ok((i, d))
    }
}

pub fn parse_color(i: &[u8]) -> IResult<&[u8], i32> {
    log::debug!("Parsing RGB color");
    map(
        (parse_u8, parse_u8, parse_u8, parse_u8),
        |(r, g, b, _ignore)| (i32::from(r) << 16) | (i32::from(g) << 8) | i32::from(b),
    )
    .parse(i)
}

pub fn parse_marker(i: &[u8]) -> IResult<&[u8], Marker> {
    log::debug!("Parsing marker");
    map((parse_int_byte_sized_string, parse_color), |(title, color)| {
        Marker { title, color }
    })
    .parse(i)
}

pub fn parse_triplet_feel(i: &[u8]) -> IResult<&[u8], TripletFeel> {
    log::debug!("Parsing triplet feel");
    map(parse_i8, TripletFeel::from_byte).parse(i)
}

/// Parse measure header.
/// The time signature is propagated from the previous header, the key signature too when absent.
pub fn parse_measure_header<'a>(
    number: usize,
    previous: Option<&'a MeasureHeader>,
    song_tempo: i32,
) -> impl FnMut(&[u8]) -> IResult<&[u8], MeasureHeader> + 'a {
    move |i: &[u8]| {
        log::debug!("Parsing measure header {number}");
        let (mut i, flags) = parse_u8(i)?;
        log::debug!("Flags: {flags:08b}");
        let mut mh = MeasureHeader {
            number,
            tempo: song_tempo, // value updated later when parsing beats
            repeat_open: (flags & 0x04) == 0x04,
            double_bar: (flags & 0x80) == 0x80,
            ..Default::default()
        };
        if let Some(previous) = previous {
            mh.time_signature = previous.time_signature.clone();
            mh.key_signature = previous.key_signature;
        }

        // Numerator of the time signature
        if (flags & 0x01) != 0 {
            let (inner, numerator) = parse_u8(i)?;
            i = inner;
            mh.time_signature.numerator = numerator;
        }

        // Denominator of the time signature
        if (flags & 0x02) != 0 {
            let (inner, denominator_value) = parse_u8(i)?;
            i = inner;
            mh.time_signature.denominator = Duration {
                value: u16::from(denominator_value),
                ..Default::default()
            };
        }

        // End of repeat, stored as count + 1
        if (flags & 0x08) != 0 {
            let (inner, repeat_close) = parse_i8(i)?;
            i = inner;
            mh.repeat_close = repeat_close.wrapping_sub(1);
        }

        // Presence of a marker
        if (flags & 0x20) != 0 {
            let (inner, marker) = parse_marker(i)?;
            i = inner;
            mh.marker = Some(marker);
        }

        // Number of alternate ending
        if (flags & 0x10) != 0 {
            let (inner, alternative) = parse_u8(i)?;
            i = inner;
            mh.repeat_alternative = alternative;
        }

        // Tonality of the measure
        if (flags & 0x40) != 0 {
            let (inner, (key, is_minor)) = (parse_i8, parse_u8).parse(i)?;
            i = inner;
            mh.key_signature = KeySignature::new(key, is_minor != 0);
        }

        if (flags & 0x01) != 0 {
            let (inner, ()) = skip(i, 4)?;
            i = inner;
        }

        if (flags & 0x10) == 0 {
            let (inner, ()) = skip(i, 1)?;
            i = inner;
        }

        let (i, triplet_feel) = parse_triplet_feel(i)?;
        mh.triplet_feel = triplet_feel;
        log::debug!("{mh:?}");

        Ok((i, mh))
    }
}

pub fn parse_measure_headers(
    measure_count: i32,
    song_tempo: i32,
) -> impl FnMut(&[u8]) -> IResult<&[u8], Vec<MeasureHeader>> {
    move |i: &[u8]| {
        log::debug!("Parsing {measure_count} measure headers");
        let mut i = i;
        let mut headers: Vec<MeasureHeader> = Vec::new();
        for index in 0..measure_count.max(0) as usize {
            let previous = headers.last();
            let (rest, header) = if previous.is_none() {
                parse_measure_header(index + 1, None, song_tempo)(i)?
            } else {
                // one byte in between each header
                preceded(parse_u8, parse_measure_header(index + 1, previous, song_tempo))
                    .parse(i)?
            };
            i = rest;
            headers.push(header);
        }
        // compute header starts
        let mut start = QUARTER_TIME;
        for header in &mut headers {
            header.start = start;
            start += header.length();
        }
        Ok((i, headers))
    }
}

pub fn parse_midi_channels(i: &[u8]) -> IResult<&[u8], Vec<MidiChannel>> {
    log::debug!("Parsing midi channels");
    let mut channels = Vec::with_capacity(MIDI_CHANNEL_COUNT);
    let mut i = i;
    for channel_index in 0..MIDI_CHANNEL_COUNT as u8 {
        let (inner, channel) = parse_midi_channel(channel_index)(i)?;
        i = inner;
        channels.push(channel);
    }
    Ok((i, channels))
}

pub fn parse_midi_channel(channel_id: u8) -> impl FnMut(&[u8]) -> IResult<&[u8], MidiChannel> {
    move |i: &[u8]| {
        map(
            (
                parse_int,
                parse_i8,
                parse_i8,
                parse_i8,
                parse_i8,
                parse_i8,
                parse_i8,
                parse_u8,
                parse_u8,
            ),
            |(instrument, volume, balance, chorus, reverb, phaser, tremolo, _blank, _blank2)| {
                if instrument < 0 {
                    log::debug!("Clamping instrument {instrument} of channel {channel_id}");
                }
                MidiChannel {
                    channel_id,
                    effect_channel_id: channel_id, // set at the track level
                    instrument: instrument.max(0),
                    volume,
                    balance,
                    chorus,
                    reverb,
                    phaser,
                    tremolo,
                    bank: MidiChannel::bank_for(channel_id),
                }
            },
        )
        .parse(i)
    }
}

pub fn parse_page_setup(version: GpVersion) -> impl FnMut(&[u8]) -> IResult<&[u8], PageSetup> {
    move |i: &[u8]| {
        log::debug!("Parsing page setup");
        // RSE master effect
        let (i, ()) = if version.is_base() { (i, ()) } else { skip(i, 19)? };
        let (i, (page_size, page_margin, score_size_proportion, flags1, flags2)) =
            (parse_point, parse_padding, parse_int, parse_u8, parse_u8).parse(i)?;
        let mut header_and_footer = u16::from(flags1);
        if flags2 & 0x01 != 0 {
            header_and_footer |= HEADER_FOOTER_PAGE_NUMBER;
        }
        map(
            (
                parse_int_byte_sized_string,
                parse_int_byte_sized_string,
                parse_int_byte_sized_string,
                parse_int_byte_sized_string,
                parse_int_byte_sized_string,
                parse_int_byte_sized_string,
                parse_int_byte_sized_string,
                parse_int_byte_sized_string,
                parse_int_byte_sized_string,
                parse_int_byte_sized_string,
            ),
            move |(
                title,
                subtitle,
                artist,
                album,
                words,
                music,
                words_and_music,
                copyright_1,
                copyright_2,
                page_number,
            )| PageSetup {
                page_size: page_size.clone(),
                page_margin: page_margin.clone(),
                score_size_proportion: score_size_proportion as f32 / 100.0,
                header_and_footer,
                title,
                subtitle,
                artist,
                album,
                words,
                music,
                words_and_music,
                copyright: format!("{copyright_1}\n{copyright_2}"),
                page_number,
            },
        )
        .parse(i)
    }
}

pub fn parse_point(i: &[u8]) -> IResult<&[u8], Point> {
    log::debug!("Parsing point");
    map((parse_int, parse_int), |(x, y)| Point { x, y }).parse(i)
}

/// Margins stored left, right, top, bottom
pub fn parse_padding(i: &[u8]) -> IResult<&[u8], Padding> {
    log::debug!("Parsing padding");
    map(
        (parse_int, parse_int, parse_int, parse_int),
        |(left, right, top, bottom)| Padding {
            right,
            top,
            left,
            bottom,
        },
    )
    .parse(i)
}

pub fn parse_lyrics(i: &[u8]) -> IResult<&[u8], Lyrics> {
    log::debug!("Parsing lyrics");
    let (mut i, track_choice) = parse_int(i)?;
    let mut lyrics = Lyrics {
        track_choice,
        ..Default::default()
    };
    for line in &mut lyrics.lines {
        let (inner, (starting_measure, text)) = (parse_int, parse_int_sized_string).parse(i)?;
        i = inner;
        *line = LyricLine {
            starting_measure,
            text,
        };
    }
    Ok((i, lyrics))
}

/// Parse the version string from the file header.
///
/// 30 character string (not counting the byte announcing the real length of the string)
///
/// <https://dguitar.sourceforge.net/GP4format.html#VERSIONS>
pub fn parse_gp_version(i: &[u8]) -> IResult<&[u8], String> {
    log::debug!("Parsing GP version");
    parse_byte_size_string(30)(i)
}

fn parse_notices(i: &[u8]) -> IResult<&[u8], Vec<String>> {
    flat_map(parse_int, |notice_count| {
        log::debug!("Notice count: {notice_count}");
        count(parse_int_byte_sized_string, notice_count.max(0) as usize)
    })
    .parse(i)
}

/// Parse information about the piece of music.
/// <https://dguitar.sourceforge.net/GP4format.html#Information_About_the_Piece>
fn parse_info(i: &[u8]) -> IResult<&[u8], SongInfo> {
    log::debug!("Parsing song info");
    map(
        (
            parse_int_byte_sized_string,
            parse_int_byte_sized_string,
            parse_int_byte_sized_string,
            parse_int_byte_sized_string,
            parse_int_byte_sized_string,
            parse_int_byte_sized_string,
            parse_int_byte_sized_string,
            parse_int_byte_sized_string,
            parse_int_byte_sized_string,
            parse_notices,
        ),
        |(title, subtitle, artist, album, words, music, copyright, tab, instructions, notices)| {
            SongInfo {
                title,
                subtitle,
                artist,
                album,
                words,
                music,
                copyright,
                tab,
                instructions,
                notices,
            }
        },
    )
    .parse(i)
}

/// Parse a mix table change, absent values are stored as negative numbers.
pub fn parse_mix_table_change(
    version: GpVersion,
) -> impl FnMut(&[u8]) -> IResult<&[u8], MixTableChange> {
    move |i: &[u8]| {
        log::debug!("Parsing mix table change");
        let (i, instrument) = parse_i8(i)?;
        let (mut i, ()) = skip(i, 16)?;
        let mut mix = MixTableChange {
            instrument: (instrument >= 0).then_some(instrument),
            ..Default::default()
        };
        for item in mix.value_items_mut() {
            let (inner, value) = parse_i8(i)?;
            i = inner;
            *item = (value >= 0).then(|| MixTableItem::new(value));
        }
        let (inner, (tempo_name, tempo)) = (parse_int_byte_sized_string, parse_int).parse(i)?;
        i = inner;
        mix.tempo_name = tempo_name;
        mix.tempo = (tempo >= 0).then(|| MixTableItem::new(tempo));

        for item in mix.value_items_mut().into_iter().flatten() {
            let (inner, duration) = parse_i8(i)?;
            i = inner;
            item.duration = duration;
        }

        if let Some(tempo) = &mut mix.tempo {
            let (inner, duration) = parse_i8(i)?;
            i = inner;
            tempo.duration = duration;
            tempo.all_tracks = true;
            if !version.is_base() {
                let (inner, hide_tempo) = parse_bool(i)?;
                i = inner;
                mix.hide_tempo = hide_tempo;
            }
        }

        let (inner, all_tracks_flags) = parse_u8(i)?;
        i = inner;
        for (bit, item) in mix.value_items_mut().into_iter().enumerate() {
            if let Some(item) = item {
                item.all_tracks = all_tracks_flags & (1 << bit) != 0;
            }
        }

        let (mut i, ()) = skip(i, 1)?;
        if !version.is_base() {
            let (inner, (first, second)) =
                (parse_int_byte_sized_string, parse_int_byte_sized_string).parse(i)?;
            i = inner;
            mix.trailing_strings = [first, second];
        }
        log::debug!("{mix:?}");
        Ok((i, mix))
    }
}

/// Map a nom failure to the library error, end of input reported with its offset.
fn to_rux_error(file_data: &[u8], err: nom::Err<nom::error::Error<&[u8]>>) -> RuxError {
    match err {
        nom::Err::Incomplete(_) => RuxError::UnexpectedEndOfInput {
            offset: file_data.len(),
        },
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let offset = file_data.len().saturating_sub(e.input.len());
            if e.code == ErrorKind::Eof {
                log::error!("Unexpected end of input at offset {offset}");
                RuxError::UnexpectedEndOfInput { offset }
            } else {
                log::error!("Failed to parse GP data at offset {offset}: {:?}", e.code);
                RuxError::ParsingError(format!("{:?} at offset {offset}", e.code))
            }
        }
    }
}

pub fn parse_gp_data(file_data: &[u8]) -> Result<Song, RuxError> {
    let (rest, version_string) =
        parse_gp_version(file_data).map_err(|e| to_rux_error(file_data, e))?;
    let version = GpVersion::from_version_string(&version_string).ok_or_else(|| {
        log::error!("Unsupported GP version: {version_string}");
        RuxError::UnsupportedVersion(version_string.clone())
    })?;
    log::debug!("GP version: {version:?}");

    let (rest, base_song) = map(
        (
            parse_info,                           // Song info
            parse_lyrics,                         // Lyrics
            parse_page_setup(version),            // Page setup
            parse_int_byte_sized_string,          // Tempo name
            parse_int,                            // Tempo
            cond(!version.is_base(), parse_bool), // Tempo hide
            parse_i8,                             // Key signature
            parse_int,                            // Octave
            parse_midi_channels,                  // Midi channels
        ),
        move |(
            song_info,
            lyrics,
            page_setup,
            tempo_name,
            tempo,
            hide_tempo,
            key_signature,
            octave,
            midi_channels,
        )| {
            // init base song
            Song {
                version,
                song_info,
                lyrics,
                page_setup,
                tempo: Tempo::new(tempo, tempo_name),
                hide_tempo: hide_tempo.unwrap_or(false),
                key_signature,
                octave,
                midi_channels,
                measure_headers: vec![],
                tracks: vec![],
            }
        },
    )
    .parse(rest)
    .map_err(|e| to_rux_error(file_data, e))?;

    // make parser and parse music data
    let mut parser = MusicParser::new(base_song);
    let (_rest, ()) = parser
        .parse_music_data(rest)
        .map_err(|e| to_rux_error(file_data, e))?;
    Ok(parser.take_song())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_with_tuplet() {
        let data = [0x01, 0x03, 0x00, 0x00, 0x00];
        let (rest, duration) = parse_duration(0x20)(&data).unwrap();
        assert!(rest.is_empty());
        assert_eq!(duration.value, 8);
        assert_eq!(duration.tuplet_enters, 3);
        assert_eq!(duration.tuplet_times, 2);
    }

    #[test]
    fn test_parse_duration_clamps_exponent() {
        let (_rest, duration) = parse_duration(0x00)(&[0x7F]).unwrap();
        assert_eq!(duration.value, 128);
        let (_rest, duration) = parse_duration(0x01)(&[0xFE]).unwrap();
        assert_eq!(duration.value, 1);
        assert!(duration.dotted);
    }

    #[test]
    fn test_parse_harmonic_skips() {
        let data = [0x02, 0xAA, 0xBB, 0xCC, 0x01];
        let (rest, harmonic) = parse_harmonic_effect(&data).unwrap();
        assert_eq!(harmonic, Some(HarmonicType::Artificial));
        assert_eq!(rest, &[0x01]);

        let data = [0x03, 0xAA, 0x01];
        let (rest, harmonic) = parse_harmonic_effect(&data).unwrap();
        assert_eq!(harmonic, Some(HarmonicType::Tapped));
        assert_eq!(rest, &[0x01]);

        let (rest, harmonic) = parse_harmonic_effect(&[0x04]).unwrap();
        assert_eq!(harmonic, Some(HarmonicType::Pinch));
        assert!(rest.is_empty());
    }

    #[test]
    fn test_parse_color() {
        let (_rest, color) = parse_color(&[0xFF, 0x80, 0x01, 0x00]).unwrap();
        assert_eq!(color, 0x00FF_8001);
    }

    #[test]
    fn test_parse_bend_effect() {
        let mut data = vec![0x01];
        data.extend_from_slice(&50_i32.to_le_bytes());
        data.extend_from_slice(&2_i32.to_le_bytes());
        // point at 0, 0 semitone
        data.extend_from_slice(&0_i32.to_le_bytes());
        data.extend_from_slice(&0_i32.to_le_bytes());
        data.push(0x00);
        // point at 60, 2 semitones with vibrato
        data.extend_from_slice(&60_i32.to_le_bytes());
        data.extend_from_slice(&50_i32.to_le_bytes());
        data.push(0x01);
        let (rest, bend) = parse_bend_effect(&data).unwrap();
        assert!(rest.is_empty());
        assert_eq!(bend.kind, 1);
        assert_eq!(bend.value, 50);
        assert_eq!(bend.points.len(), 2);
        assert_eq!(bend.points[1].position, 12);
        assert_eq!(bend.points[1].value, 2);
        assert!(bend.points[1].vibrato);
    }

    #[test]
    fn test_parse_unsupported_version() {
        let mut data = vec![24];
        data.extend_from_slice(b"FICHIER GUITAR PRO v4.06");
        data.extend_from_slice(&[0; 6]);
        match parse_gp_data(&data) {
            Err(RuxError::UnsupportedVersion(version)) => {
                assert_eq!(version, "FICHIER GUITAR PRO v4.06");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_parse_truncated_file() {
        let mut data = vec![24];
        data.extend_from_slice(b"FICHIER GUITAR PRO v5.00");
        data.extend_from_slice(&[0; 6]);
        // title block announces 10 bytes but only 2 follow
        data.extend_from_slice(&10_i32.to_le_bytes());
        data.extend_from_slice(&[0x01, 0x41]);
        match parse_gp_data(&data) {
            Err(RuxError::UnexpectedEndOfInput { offset }) => assert_eq!(offset, 36),
            other => panic!("unexpected result {other:?}"),
        }
    }
}
