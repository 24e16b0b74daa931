use crate::RuxError;
use crate::song::{
    BeatEffects, BeatStroke, BeatStrokeDirection, BendEffect, Chord, Duration, GP_BEND_POSITION,
    GP_BEND_SEMITONE, GpVersion, GraceEffect, HEADER_FOOTER_PAGE_NUMBER, HarmonicType, Lyrics,
    MAX_STRINGS, MIDI_CHANNEL_COUNT, Marker, MeasureHeader, MidiChannel, MixTableChange,
    NoteEffect, PageSetup, Padding, Point, SEMITONE_LENGTH, SlapEffect, SlideType, Song, SongInfo,
    TremoloPickingEffect, TrillEffect, TripletFeel, BEND_EFFECT_MAX_POSITION_LENGTH,
    pack_velocity,
};
use crate::writer::music_writer::MusicWriter;
use crate::writer::primitive_writer::{
    write_bool, write_byte_size_string, write_i8, write_int, write_int_byte_sized_string,
    write_int_sized_string, write_placeholder, write_u8,
};
use std::io::{self, Write};

pub fn write_chord<W: Write>(w: &mut W, chord: &Chord) -> io::Result<()> {
    log::debug!("Writing chord {}", chord.name);
    write_placeholder(w, 17, 0x00)?;
    write_byte_size_string(w, &chord.name, 21)?;
    write_placeholder(w, 4, 0x00)?;
    write_int(w, chord.first_fret)?;
    for c in 0..MAX_STRINGS {
        write_int(w, chord.strings.get(c).copied().unwrap_or(-1))?;
    }
    write_placeholder(w, 32, 0x00)
}

pub fn write_note_effects<W: Write>(w: &mut W, note_effect: &NoteEffect) -> io::Result<()> {
    log::debug!("Writing note effects");
    let mut flags1 = 0x00;
    if note_effect.bend.is_some() {
        flags1 |= 0x01;
    }
    if note_effect.hammer {
        flags1 |= 0x02;
    }
    if note_effect.let_ring {
        flags1 |= 0x08;
    }
    if note_effect.grace.is_some() {
        flags1 |= 0x10;
    }

    let mut flags2 = 0x00;
    if note_effect.staccato {
        flags2 |= 0x01;
    }
    if note_effect.palm_mute {
        flags2 |= 0x02;
    }
    if note_effect.tremolo_picking.is_some() {
        flags2 |= 0x04;
    }
    if note_effect.slide.is_some() {
        flags2 |= 0x08;
    }
    if note_effect.harmonic.is_some() {
        flags2 |= 0x10;
    }
    if note_effect.trill.is_some() {
        flags2 |= 0x20;
    }
    if note_effect.vibrato {
        flags2 |= 0x40;
    }
    write_u8(w, flags1)?;
    write_u8(w, flags2)?;

    if let Some(bend) = &note_effect.bend {
        write_bend_effect(w, bend)?;
    }
    if let Some(grace) = &note_effect.grace {
        write_grace_effect(w, grace)?;
    }
    if let Some(tremolo_picking) = &note_effect.tremolo_picking {
        write_tremolo_picking(w, tremolo_picking)?;
    }
    if let Some(slide) = note_effect.slide {
        write_slide_type(w, slide)?;
    }
    if let Some(harmonic) = note_effect.harmonic {
        write_harmonic_effect(w, harmonic)?;
    }
    if let Some(trill) = &note_effect.trill {
        write_trill_effect(w, trill)?;
    }
    Ok(())
}

pub fn write_trill_effect<W: Write>(w: &mut W, trill: &TrillEffect) -> io::Result<()> {
    write_i8(w, trill.fret)?;
    write_i8(w, TrillEffect::to_trill_period(trill.duration.value))
}

pub fn write_harmonic_effect<W: Write>(w: &mut W, harmonic: HarmonicType) -> io::Result<()> {
    write_i8(w, harmonic.to_byte())?;
    write_placeholder(w, harmonic.extra_len(), 0x00)
}

pub fn write_slide_type<W: Write>(w: &mut W, slide: SlideType) -> io::Result<()> {
    write_u8(w, slide.to_byte())
}

pub fn write_tremolo_picking<W: Write>(
    w: &mut W,
    tremolo_picking: &TremoloPickingEffect,
) -> io::Result<()> {
    write_i8(
        w,
        TremoloPickingEffect::to_tremolo_value(tremolo_picking.duration.value),
    )
}

pub fn write_grace_effect<W: Write>(w: &mut W, grace: &GraceEffect) -> io::Result<()> {
    let mut flags = 0x00;
    if grace.is_dead {
        flags |= 0x01;
    }
    if grace.is_on_beat {
        flags |= 0x02;
    }
    write_u8(w, grace.fret as u8)?;
    write_u8(w, pack_velocity(grace.velocity) as u8)?;
    write_u8(w, grace.transition as u8)?;
    write_u8(w, grace.duration)?;
    write_u8(w, flags)
}

pub fn write_beat_effects<W: Write>(w: &mut W, beat_effects: &BeatEffects) -> io::Result<()> {
    log::debug!("Writing beat effects");
    let mut flags1 = 0x00;
    if beat_effects.vibrato {
        flags1 |= 0x02;
    }
    if beat_effects.fade_in {
        flags1 |= 0x10;
    }
    if beat_effects.slap != SlapEffect::None {
        flags1 |= 0x20;
    }
    if beat_effects.stroke.direction != BeatStrokeDirection::None {
        flags1 |= 0x40;
    }

    let mut flags2 = 0x00;
    if beat_effects.has_rasgueado {
        flags2 |= 0x01;
    }
    if beat_effects.pick_stroke.is_some() {
        flags2 |= 0x02;
    }
    if beat_effects.tremolo_bar.is_some() {
        flags2 |= 0x04;
    }
    write_u8(w, flags1)?;
    write_u8(w, flags2)?;

    if flags1 & 0x20 != 0 {
        let slap = match beat_effects.slap {
            SlapEffect::None => 0,
            SlapEffect::Tapping => 1,
            SlapEffect::Slapping => 2,
            SlapEffect::Popping => 3,
        };
        write_u8(w, slap)?;
    }

    if let Some(tremolo_bar) = &beat_effects.tremolo_bar {
        write_tremolo_bar(w, tremolo_bar)?;
    }

    let stroke_value = BeatStroke::to_stroke_value(beat_effects.stroke.value);
    match beat_effects.stroke.direction {
        BeatStrokeDirection::Up => {
            write_i8(w, stroke_value)?;
            write_i8(w, 0)?;
        }
        BeatStrokeDirection::Down => {
            write_i8(w, 0)?;
            write_i8(w, stroke_value)?;
        }
        BeatStrokeDirection::None => {}
    }

    if let Some(pick_stroke) = beat_effects.pick_stroke {
        write_i8(w, pick_stroke)?;
    }
    Ok(())
}

/// Bend points with their value multiplied by `value_unit`.
fn write_bend_points<W: Write>(w: &mut W, bend: &BendEffect, value_unit: f32) -> io::Result<()> {
    write_i8(w, bend.kind)?;
    write_int(w, bend.value)?;
    write_int(w, bend.points.len() as i32)?;
    for point in &bend.points {
        let position =
            f32::from(point.position) * GP_BEND_POSITION / BEND_EFFECT_MAX_POSITION_LENGTH;
        let value = f32::from(point.value) * value_unit / SEMITONE_LENGTH;
        write_int(w, position.round() as i32)?;
        write_int(w, value.round() as i32)?;
        write_bool(w, point.vibrato)?;
    }
    Ok(())
}

pub fn write_bend_effect<W: Write>(w: &mut W, bend: &BendEffect) -> io::Result<()> {
    log::debug!("Writing bend effect");
    write_bend_points(w, bend, GP_BEND_SEMITONE)
}

pub fn write_tremolo_bar<W: Write>(w: &mut W, tremolo_bar: &BendEffect) -> io::Result<()> {
    log::debug!("Writing tremolo bar");
    write_bend_points(w, tremolo_bar, GP_BEND_SEMITONE * 2.0)
}

/// Write beat duration as a power of two exponent, then the tuplet if flag *0x20* is set.
pub fn write_duration<W: Write>(w: &mut W, duration: &Duration, flags: u8) -> io::Result<()> {
    let value = duration.value.max(1);
    if !value.is_power_of_two() {
        log::warn!("Duration value {value} is not a power of two");
    }
    let exponent = (value.ilog2() as i8 - 2).clamp(-2, 5);
    write_i8(w, exponent)?;
    if flags & 0x20 != 0 {
        write_int(w, i32::from(duration.tuplet_enters))?;
    }
    Ok(())
}

pub fn write_color<W: Write>(w: &mut W, color: i32) -> io::Result<()> {
    write_u8(w, (color >> 16) as u8)?;
    write_u8(w, (color >> 8) as u8)?;
    write_u8(w, color as u8)?;
    write_u8(w, 0)
}

pub fn write_marker<W: Write>(w: &mut W, marker: &Marker) -> io::Result<()> {
    log::debug!("Writing marker {}", marker.title);
    write_int_byte_sized_string(w, &marker.title)?;
    write_color(w, marker.color)
}

pub fn write_triplet_feel<W: Write>(w: &mut W, triplet_feel: TripletFeel) -> io::Result<()> {
    write_i8(w, triplet_feel.to_byte())
}

/// Write measure header, the flags are computed against the previous header.
pub fn write_measure_header<W: Write>(
    w: &mut W,
    header: &MeasureHeader,
    previous: Option<&MeasureHeader>,
) -> io::Result<()> {
    let mut flags = 0x00;
    match previous {
        Some(previous) => {
            if header.time_signature.numerator != previous.time_signature.numerator {
                flags |= 0x01;
            }
            if header.time_signature.denominator.value != previous.time_signature.denominator.value
            {
                flags |= 0x02;
            }
            if header.key_signature != previous.key_signature {
                flags |= 0x40;
            }
        }
        None => flags |= 0x01 | 0x02 | 0x40,
    }
    if header.repeat_open {
        flags |= 0x04;
    }
    if header.repeat_close > -1 {
        flags |= 0x08;
    }
    if header.repeat_alternative != 0 {
        flags |= 0x10;
    }
    if header.marker.is_some() {
        flags |= 0x20;
    }
    if header.double_bar {
        flags |= 0x80;
    }
    log::debug!("Writing measure header {} flags: {flags:08b}", header.number);

    if previous.is_some() {
        write_placeholder(w, 1, 0x00)?;
    }
    write_u8(w, flags)?;

    if flags & 0x01 != 0 {
        write_u8(w, header.time_signature.numerator)?;
    }
    if flags & 0x02 != 0 {
        let denominator = header.time_signature.denominator.value;
        let denominator = u8::try_from(denominator).unwrap_or_else(|_| {
            log::warn!("Time signature denominator {denominator} too large, clamping");
            u8::MAX
        });
        write_u8(w, denominator)?;
    }
    if flags & 0x08 != 0 {
        write_i8(w, header.repeat_close.wrapping_add(1))?;
    }
    if let Some(marker) = &header.marker {
        write_marker(w, marker)?;
    }
    if flags & 0x10 != 0 {
        write_u8(w, header.repeat_alternative)?;
    }
    if flags & 0x40 != 0 {
        write_i8(w, header.key_signature.key)?;
        write_u8(w, u8::from(header.key_signature.is_minor))?;
    }
    if flags & 0x01 != 0 {
        write_placeholder(w, 4, 0x00)?;
    }
    if flags & 0x10 == 0 {
        write_placeholder(w, 1, 0x00)?;
    }
    write_triplet_feel(w, header.triplet_feel)
}

pub fn write_measure_headers<W: Write>(w: &mut W, headers: &[MeasureHeader]) -> io::Result<()> {
    log::debug!("Writing {} measure headers", headers.len());
    let mut previous = None;
    for header in headers {
        write_measure_header(w, header, previous)?;
        previous = Some(header);
    }
    Ok(())
}

/// The 64 MIDI channels as written for `song`.
///
/// A channel takes the values of the track using it as primary channel,
/// then the song's own entry, then a track using it as effect channel.
/// Unclaimed channels are zeroed.
pub fn midi_channel_table(song: &Song) -> Vec<MidiChannel> {
    (0..MIDI_CHANNEL_COUNT as u8)
        .map(|channel_id| {
            song.tracks
                .iter()
                .find(|track| track.channel.channel_id == channel_id)
                .map(|track| track.channel.clone())
                .or_else(|| song.midi_channels.get(usize::from(channel_id)).cloned())
                .or_else(|| {
                    song.tracks
                        .iter()
                        .find(|track| track.channel.effect_channel_id == channel_id)
                        .map(|track| track.channel.clone())
                })
                .unwrap_or_else(|| MidiChannel::synthetic(channel_id))
        })
        .collect()
}

pub fn write_midi_channels<W: Write>(w: &mut W, song: &Song) -> io::Result<()> {
    log::debug!("Writing midi channels");
    for channel in midi_channel_table(song) {
        write_midi_channel(w, &channel)?;
    }
    Ok(())
}

pub fn write_midi_channel<W: Write>(w: &mut W, channel: &MidiChannel) -> io::Result<()> {
    write_int(w, channel.instrument)?;
    write_i8(w, channel.volume)?;
    write_i8(w, channel.balance)?;
    write_i8(w, channel.chorus)?;
    write_i8(w, channel.reverb)?;
    write_i8(w, channel.phaser)?;
    write_i8(w, channel.tremolo)?;
    write_placeholder(w, 2, 0x00)
}

pub fn write_page_setup<W: Write>(
    w: &mut W,
    page_setup: &PageSetup,
    version: GpVersion,
) -> io::Result<()> {
    log::debug!("Writing page setup");
    if !version.is_base() {
        // RSE master effect
        write_placeholder(w, 19, 0x00)?;
    }
    write_point(w, &page_setup.page_size)?;
    write_padding(w, &page_setup.page_margin)?;
    write_int(w, (page_setup.score_size_proportion * 100.0).round() as i32)?;
    write_u8(w, (page_setup.header_and_footer & 0xFF) as u8)?;
    let flags2 = u8::from(page_setup.header_and_footer & HEADER_FOOTER_PAGE_NUMBER != 0);
    write_u8(w, flags2)?;

    let (copyright_1, copyright_2) = page_setup
        .copyright
        .split_once('\n')
        .unwrap_or((page_setup.copyright.as_str(), ""));
    for text in [
        &page_setup.title,
        &page_setup.subtitle,
        &page_setup.artist,
        &page_setup.album,
        &page_setup.words,
        &page_setup.music,
        &page_setup.words_and_music,
    ] {
        write_int_byte_sized_string(w, text)?;
    }
    write_int_byte_sized_string(w, copyright_1)?;
    write_int_byte_sized_string(w, copyright_2)?;
    write_int_byte_sized_string(w, &page_setup.page_number)
}

pub fn write_point<W: Write>(w: &mut W, point: &Point) -> io::Result<()> {
    write_int(w, point.x)?;
    write_int(w, point.y)
}

/// Margins stored left, right, top, bottom
pub fn write_padding<W: Write>(w: &mut W, padding: &Padding) -> io::Result<()> {
    write_int(w, padding.left)?;
    write_int(w, padding.right)?;
    write_int(w, padding.top)?;
    write_int(w, padding.bottom)
}

pub fn write_lyrics<W: Write>(w: &mut W, lyrics: &Lyrics) -> io::Result<()> {
    log::debug!("Writing lyrics");
    write_int(w, lyrics.track_choice)?;
    for line in &lyrics.lines {
        write_int(w, line.starting_measure)?;
        write_int_sized_string(w, &line.text)?;
    }
    Ok(())
}

/// Version string in a 30 bytes field
pub fn write_gp_version<W: Write>(w: &mut W, version: GpVersion) -> io::Result<()> {
    log::debug!("Writing GP version {version:?}");
    write_byte_size_string(w, version.version_string(), 30)
}

fn write_info<W: Write>(w: &mut W, song_info: &SongInfo) -> io::Result<()> {
    log::debug!("Writing song info");
    for text in [
        &song_info.title,
        &song_info.subtitle,
        &song_info.artist,
        &song_info.album,
        &song_info.words,
        &song_info.music,
        &song_info.copyright,
        &song_info.tab,
        &song_info.instructions,
    ] {
        write_int_byte_sized_string(w, text)?;
    }
    write_int(w, song_info.notices.len() as i32)?;
    for notice in &song_info.notices {
        write_int_byte_sized_string(w, notice)?;
    }
    Ok(())
}

/// Write a mix table change, absent values are written as -1.
pub fn write_mix_table_change<W: Write>(
    w: &mut W,
    mix: &MixTableChange,
    version: GpVersion,
) -> io::Result<()> {
    log::debug!("Writing mix table change");
    write_i8(w, mix.instrument.unwrap_or(-1))?;
    write_placeholder(w, 16, 0xFF)?;
    for item in mix.value_items() {
        write_i8(w, item.as_ref().map_or(-1, |item| item.value))?;
    }
    write_int_byte_sized_string(w, &mix.tempo_name)?;
    write_int(w, mix.tempo.as_ref().map_or(-1, |tempo| tempo.value))?;

    for item in mix.value_items().into_iter().flatten() {
        write_i8(w, item.duration)?;
    }

    if let Some(tempo) = &mix.tempo {
        write_i8(w, tempo.duration)?;
        if !version.is_base() {
            write_bool(w, mix.hide_tempo)?;
        }
    }

    let mut all_tracks_flags = 0x00;
    for (bit, item) in mix.value_items().into_iter().enumerate() {
        if item.as_ref().is_some_and(|item| item.all_tracks) {
            all_tracks_flags |= 1 << bit;
        }
    }
    if mix.tempo.as_ref().is_some_and(|tempo| tempo.all_tracks) {
        all_tracks_flags |= 0x40;
    }
    write_u8(w, all_tracks_flags)?;

    write_placeholder(w, 1, 0x00)?;
    if !version.is_base() {
        write_int_byte_sized_string(w, &mix.trailing_strings[0])?;
        write_int_byte_sized_string(w, &mix.trailing_strings[1])?;
    }
    Ok(())
}

/// Write `song` in its own version.
pub fn write_song<W: Write>(w: &mut W, song: &Song) -> Result<(), RuxError> {
    let version = song.version;
    write_gp_version(w, version)?;
    write_info(w, &song.song_info)?;
    write_lyrics(w, &song.lyrics)?;
    write_page_setup(w, &song.page_setup, version)?;
    write_int_byte_sized_string(w, &song.tempo.name)?;
    write_int(w, song.tempo.value)?;
    if !version.is_base() {
        write_bool(w, song.hide_tempo)?;
    }
    write_i8(w, song.key_signature)?;
    write_int(w, song.octave)?;
    write_midi_channels(w, song)?;

    let writer = MusicWriter::new(song);
    writer.write_music_data(w)?;
    Ok(())
}

pub fn write_gp_data(song: &Song) -> Result<Vec<u8>, RuxError> {
    let mut buffer = Vec::new();
    write_song(&mut buffer, song)?;
    log::debug!("Wrote {} bytes", buffer.len());
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::song_parser::{parse_duration, parse_measure_headers, parse_mix_table_change};
    use crate::song::{KeySignature, MixTableItem, TimeSignature, Track};

    #[test]
    fn test_write_duration() {
        let duration = Duration {
            value: 16,
            dotted: true,
            tuplet_enters: 5,
            tuplet_times: 4,
        };
        let mut buf = Vec::new();
        write_duration(&mut buf, &duration, 0x21).unwrap();
        assert_eq!(buf, vec![0x02, 0x05, 0x00, 0x00, 0x00]);
        let (_rest, parsed) = parse_duration(0x21)(&buf).unwrap();
        assert_eq!(parsed, duration);
    }

    #[test]
    fn test_first_header_sets_signature_flags() {
        let header = MeasureHeader::default();
        let mut buf = Vec::new();
        write_measure_header(&mut buf, &header, None).unwrap();
        // flags, numerator, denominator, key, minor, 4 placeholders, 1 placeholder, triplet feel
        assert_eq!(buf[0], 0x43);
        assert_eq!(&buf[1..3], &[4, 4]);
        assert_eq!(buf.len(), 1 + 2 + 2 + 4 + 1 + 1);
    }

    #[test]
    fn test_denominator_clamped() {
        let header = MeasureHeader {
            time_signature: TimeSignature {
                numerator: 4,
                denominator: Duration {
                    value: 256,
                    ..Default::default()
                },
            },
            ..Default::default()
        };
        let mut buf = Vec::new();
        write_measure_header(&mut buf, &header, None).unwrap();
        assert_eq!(&buf[1..3], &[4, u8::MAX]);
    }

    #[test]
    fn test_header_diff_against_previous() {
        let first = MeasureHeader::default();
        let second = MeasureHeader {
            number: 2,
            key_signature: KeySignature::new(2, false),
            ..Default::default()
        };
        let mut buf = Vec::new();
        write_measure_header(&mut buf, &second, Some(&first)).unwrap();
        // placeholder, flags with key signature only
        assert_eq!(&buf[..2], &[0x00, 0x40]);
        assert_eq!(&buf[2..4], &[2, 0]);
    }

    #[test]
    fn test_key_signature_inherited() {
        let headers: Vec<MeasureHeader> = (1..=4)
            .map(|number| MeasureHeader {
                number,
                key_signature: KeySignature::new(-3, true),
                ..Default::default()
            })
            .collect();
        let mut buf = Vec::new();
        write_measure_headers(&mut buf, &headers).unwrap();
        let (rest, parsed) = parse_measure_headers(4, 120)(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.len(), 4);
        for header in &parsed {
            assert_eq!(header.key_signature, KeySignature::new(-3, true));
        }
        assert_eq!(parsed[0].start, 960);
        assert_eq!(parsed[3].start, 960 + 3 * 3840);
    }

    #[test]
    fn test_mix_table_absent_volume() {
        let mix = MixTableChange {
            instrument: Some(30),
            volume: None,
            balance: Some(MixTableItem {
                value: 64,
                duration: 2,
                all_tracks: true,
            }),
            ..Default::default()
        };
        let mut buf = Vec::new();
        write_mix_table_change(&mut buf, &mix, GpVersion::GP5).unwrap();
        // instrument, 16 reserved bytes, then volume
        assert_eq!(buf[0], 30);
        assert_eq!(&buf[1..17], &[0xFF; 16]);
        assert_eq!(buf[17] as i8, -1);
        assert_eq!(buf[18], 64);
        // volume..tremolo, tempo name (5 bytes), tempo, balance duration, all tracks flags
        let durations_offset = 17 + 6 + 5 + 4;
        assert_eq!(buf[durations_offset], 2);
        assert_eq!(buf[durations_offset + 1], 0x02);
        let (rest, parsed) = parse_mix_table_change(GpVersion::GP5)(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, mix);
    }

    #[test]
    fn test_mix_table_tempo_hidden() {
        let mix = MixTableChange {
            tempo_name: "Fast".to_string(),
            tempo: Some(MixTableItem {
                value: 180,
                duration: 0,
                all_tracks: true,
            }),
            hide_tempo: true,
            trailing_strings: ["a".to_string(), String::new()],
            ..Default::default()
        };
        let mut buf = Vec::new();
        write_mix_table_change(&mut buf, &mix, GpVersion::GP5_10).unwrap();
        let (rest, parsed) = parse_mix_table_change(GpVersion::GP5_10)(&buf).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, mix);
    }

    #[test]
    fn test_midi_channel_table_priority() {
        let track = Track {
            channel: MidiChannel {
                channel_id: 2,
                effect_channel_id: 3,
                instrument: 30,
                volume: 100,
                ..Default::default()
            },
            ..Default::default()
        };
        let song = Song {
            tracks: vec![track],
            ..Default::default()
        };
        let table = midi_channel_table(&song);
        assert_eq!(table.len(), 64);
        // primary channel
        assert_eq!(table[2].instrument, 30);
        // effect channel
        assert_eq!(table[3].instrument, 30);
        assert_eq!(table[3].volume, 100);
        // unclaimed
        assert_eq!(table[0], MidiChannel::synthetic(0));
        assert_eq!(table[9].bank, 128);
    }
}
