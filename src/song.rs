use serde::{Deserialize, Serialize};

// GP5 docs thanks to Tuxguitar, alphaTab and <https://github.com/slundi/guitarpro> for the help

pub const MAX_VOICES: usize = 2;
pub const MAX_STRINGS: usize = 7;
pub const MIDI_CHANNEL_COUNT: usize = 64;
pub const PERCUSSION_CHANNEL: u8 = 9;
pub const LYRICS_LINE_COUNT: usize = 5;

pub const QUARTER_TIME: i64 = 960;
pub const QUARTER: u16 = 4;

pub const DURATION_WHOLE: u16 = 1;
pub const DURATION_HALF: u16 = 2;
pub const DURATION_EIGHTH: u16 = 8;
pub const DURATION_SIXTEENTH: u16 = 16;
pub const DURATION_THIRTY_SECOND: u16 = 32;
pub const DURATION_SIXTY_FOURTH: u16 = 64;
pub const DURATION_HUNDRED_TWENTY_EIGHTH: u16 = 128;

pub const BEND_EFFECT_MAX_POSITION_LENGTH: f32 = 12.0;

pub const SEMITONE_LENGTH: f32 = 1.0;
pub const GP_BEND_SEMITONE: f32 = 25.0;
pub const GP_BEND_POSITION: f32 = 60.0;

pub const DEFAULT_PERCUSSION_BANK: u8 = 128;

pub const DEFAULT_BANK: u8 = 0;

pub const MIN_VELOCITY: i16 = 15;
pub const VELOCITY_INCREMENT: i16 = 16;
pub const DEFAULT_VELOCITY: i16 = MIN_VELOCITY + VELOCITY_INCREMENT * 5; // FORTE

pub const HEADER_FOOTER_TITLE: u16 = 0x01;
pub const HEADER_FOOTER_SUBTITLE: u16 = 0x02;
pub const HEADER_FOOTER_ARTIST: u16 = 0x04;
pub const HEADER_FOOTER_ALBUM: u16 = 0x08;
pub const HEADER_FOOTER_WORDS: u16 = 0x10;
pub const HEADER_FOOTER_MUSIC: u16 = 0x20;
pub const HEADER_FOOTER_WORDS_AND_MUSIC: u16 = 0x40;
pub const HEADER_FOOTER_COPYRIGHT: u16 = 0x80;
pub const HEADER_FOOTER_PAGE_NUMBER: u16 = 0x100;
pub const HEADER_FOOTER_ALL: u16 = 0x1FF;

/// Convert Guitar Pro dynamic value to raw MIDI velocity
pub const fn unpack_velocity(v: i16) -> i16 {
    MIN_VELOCITY + (VELOCITY_INCREMENT * v) - VELOCITY_INCREMENT
}

/// Convert raw MIDI velocity to Guitar Pro dynamic value, clamped to a signed byte
pub fn pack_velocity(velocity: i16) -> i8 {
    let packed = (i32::from(velocity) + i32::from(VELOCITY_INCREMENT) - i32::from(MIN_VELOCITY))
        / i32::from(VELOCITY_INCREMENT);
    i8::try_from(packed).unwrap_or_else(|_| {
        log::warn!("Velocity {velocity} out of range, clamping");
        if packed < 0 { i8::MIN } else { i8::MAX }
    })
}

/// The two GP5 sub-versions share one grammar.
///
/// Every layout difference between them is expressed through [`GpVersion::is_base`]
/// or a helper derived from it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GpVersion {
    #[default]
    GP5,
    GP5_10,
}

/// Track padding written by Guitar Pro 5.00, not derived from the track.
const TRACK_BLOCK_GP5: [u8; 44] = [
    0x43, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x64, 0x00,
    0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0xff, 0x03, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
];

/// Track padding written by Guitar Pro 5.10, not derived from the track.
const TRACK_BLOCK_GP5_10: [u8; 49] = [
    0xc3, 0x00, 0x00, 0x00, 0x00, 0x0c, 0x00, 0x00, 0x00, 0x0c, 0x00, 0x00, 0x00, 0x64, 0x00,
    0x00, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x0a, 0x07, 0x08, 0x09, 0xdf, 0x03, 0x1e,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00,
];

impl GpVersion {
    pub fn from_version_string(version: &str) -> Option<Self> {
        match version {
            "FICHIER GUITAR PRO v5.00" => Some(GpVersion::GP5),
            "FICHIER GUITAR PRO v5.10" => Some(GpVersion::GP5_10),
            _ => None,
        }
    }

    pub const fn version_string(self) -> &'static str {
        match self {
            GpVersion::GP5 => "FICHIER GUITAR PRO v5.00",
            GpVersion::GP5_10 => "FICHIER GUITAR PRO v5.10",
        }
    }

    /// `true` for the 5.00 layout.
    pub const fn is_base(self) -> bool {
        matches!(self, GpVersion::GP5)
    }

    /// Bytes between the last track and the first measure.
    pub const fn tracks_padding_len(self) -> usize {
        if self.is_base() {
            2
        } else {
            1
        }
    }

    pub const fn track_compatibility_block(self) -> &'static [u8] {
        if self.is_base() {
            &TRACK_BLOCK_GP5
        } else {
            &TRACK_BLOCK_GP5_10
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Song {
    pub version: GpVersion,
    pub song_info: SongInfo,
    pub lyrics: Lyrics,
    pub page_setup: PageSetup,
    pub tempo: Tempo,
    pub hide_tempo: bool,
    pub key_signature: i8,
    pub octave: i32,
    pub midi_channels: Vec<MidiChannel>,
    pub measure_headers: Vec<MeasureHeader>,
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiChannel {
    pub channel_id: u8,
    pub effect_channel_id: u8,
    pub instrument: i32,
    pub volume: i8,
    pub balance: i8,
    pub chorus: i8,
    pub reverb: i8,
    pub phaser: i8,
    pub tremolo: i8,
    pub bank: u8,
}

impl MidiChannel {
    pub const fn is_percussion(&self) -> bool {
        self.bank == DEFAULT_PERCUSSION_BANK
    }

    /// Zeroed channel used when neither a track nor the song describes `channel_id`.
    pub const fn synthetic(channel_id: u8) -> Self {
        MidiChannel {
            channel_id,
            effect_channel_id: channel_id,
            instrument: 0,
            volume: 0,
            balance: 0,
            chorus: 0,
            reverb: 0,
            phaser: 0,
            tremolo: 0,
            bank: Self::bank_for(channel_id),
        }
    }

    pub const fn bank_for(channel_id: u8) -> u8 {
        if channel_id == PERCUSSION_CHANNEL {
            DEFAULT_PERCUSSION_BANK
        } else {
            DEFAULT_BANK
        }
    }
}

impl Default for MidiChannel {
    fn default() -> Self {
        MidiChannel {
            channel_id: 0,
            effect_channel_id: 1,
            instrument: 25,
            volume: 104,
            balance: 64,
            chorus: 0,
            reverb: 0,
            phaser: 0,
            tremolo: 0,
            bank: DEFAULT_BANK,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Padding {
    pub right: i32,
    pub top: i32,
    pub left: i32,
    pub bottom: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSetup {
    pub page_size: Point,
    pub page_margin: Padding,
    pub score_size_proportion: f32,
    /// `HEADER_FOOTER_*` bit set
    pub header_and_footer: u16,
    pub title: String,
    pub subtitle: String,
    pub artist: String,
    pub album: String,
    pub words: String,
    pub music: String,
    pub words_and_music: String,
    /// Two lines separated by `\n`
    pub copyright: String,
    pub page_number: String,
}

impl Default for PageSetup {
    fn default() -> Self {
        PageSetup {
            page_size: Point { x: 210, y: 297 },
            page_margin: Padding {
                right: 10,
                top: 15,
                left: 10,
                bottom: 10,
            },
            score_size_proportion: 1.0,
            header_and_footer: HEADER_FOOTER_ALL,
            title: "%TITLE%".to_string(),
            subtitle: "%SUBTITLE%".to_string(),
            artist: "%ARTIST%".to_string(),
            album: "%ALBUM%".to_string(),
            words: "Words by %WORDS%".to_string(),
            music: "Music by %MUSIC%".to_string(),
            words_and_music: "Words & Music by %WORDSMUSIC%".to_string(),
            copyright: "Copyright %COPYRIGHT%\nAll Rights Reserved - International Copyright Secured"
                .to_string(),
            page_number: "Page %N%/%P%".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LyricLine {
    pub starting_measure: i32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Lyrics {
    pub track_choice: i32,
    pub lines: [LyricLine; LYRICS_LINE_COUNT],
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SongInfo {
    pub title: String,
    pub subtitle: String,
    pub artist: String,
    pub album: String,
    pub words: String,
    pub music: String,
    pub copyright: String,
    pub tab: String,
    pub instructions: String,
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub title: String,
    pub color: i32,
}

pub const KEY_SIGNATURES: [&str; 34] = [
    "F♭ major",
    "C♭ major",
    "G♭ major",
    "D♭ major",
    "A♭ major",
    "E♭ major",
    "B♭ major",
    "F major",
    "C major",
    "G major",
    "D major",
    "A major",
    "E major",
    "B major",
    "F# major",
    "C# major",
    "G# major",
    "D♭ minor",
    "A♭ minor",
    "E♭ minor",
    "B♭ minor",
    "F minor",
    "C minor",
    "G minor",
    "D minor",
    "A minor",
    "E minor",
    "B minor",
    "F# minor",
    "C# minor",
    "G# minor",
    "D# minor",
    "A# minor",
    "E# minor",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeySignature {
    pub key: i8,
    pub is_minor: bool,
}

impl KeySignature {
    pub const fn new(key: i8, is_minor: bool) -> Self {
        KeySignature { key, is_minor }
    }
}

impl std::fmt::Display for KeySignature {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let offset: i16 = if self.is_minor { 25 } else { 8 };
        let name = usize::try_from(offset + i16::from(self.key))
            .ok()
            .and_then(|index| KEY_SIGNATURES.get(index));
        match name {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "unknown key ({})", self.key),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TripletFeel {
    #[default]
    None,
    Eighth,
    Sixteenth,
}

impl TripletFeel {
    pub fn from_byte(value: i8) -> TripletFeel {
        match value {
            0 => TripletFeel::None,
            1 => TripletFeel::Eighth,
            2 => TripletFeel::Sixteenth,
            x => {
                log::warn!("Unknown triplet feel {x}, using none");
                TripletFeel::None
            }
        }
    }

    pub const fn to_byte(self) -> i8 {
        match self {
            TripletFeel::None => 0,
            TripletFeel::Eighth => 1,
            TripletFeel::Sixteenth => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tempo {
    pub value: i32,
    pub name: String,
}

impl Tempo {
    pub const fn new(value: i32, name: String) -> Self {
        Tempo { value, name }
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Tempo {
            value: 120,
            name: "Moderate".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasureHeader {
    pub number: usize,
    pub start: i64,
    pub time_signature: TimeSignature,
    /// Song tempo, or the tempo set by a mix table change in this measure
    pub tempo: i32,
    pub marker: Option<Marker>,
    pub repeat_open: bool,
    pub repeat_alternative: u8,
    /// -1 when the measure does not close a repeat
    pub repeat_close: i8,
    pub triplet_feel: TripletFeel,
    pub key_signature: KeySignature,
    pub double_bar: bool,
}

impl Default for MeasureHeader {
    fn default() -> Self {
        MeasureHeader {
            number: 1,
            start: QUARTER_TIME,
            time_signature: TimeSignature::default(),
            tempo: Tempo::default().value,
            marker: None,
            repeat_open: false,
            repeat_alternative: 0,
            repeat_close: -1,
            triplet_feel: TripletFeel::None,
            key_signature: KeySignature::new(0, false),
            double_bar: false,
        }
    }
}

impl MeasureHeader {
    pub fn length(&self) -> i64 {
        let numerator = i64::from(self.time_signature.numerator);
        let denominator = self.time_signature.denominator.time();
        numerator * denominator
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: Duration,
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature {
            numerator: 4,
            denominator: Duration::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duration {
    pub value: u16,
    pub dotted: bool,
    pub tuplet_enters: u8,
    pub tuplet_times: u8,
}

impl Default for Duration {
    fn default() -> Self {
        Duration {
            value: QUARTER,
            dotted: false,
            tuplet_enters: 1,
            tuplet_times: 1,
        }
    }
}

impl Duration {
    pub fn convert_time(&self, time: i64) -> i64 {
        time * i64::from(self.tuplet_times) / i64::from(self.tuplet_enters.max(1))
    }

    pub fn time(&self) -> i64 {
        let mut time = QUARTER_TIME as f64 * (4.0 / f64::from(self.value.max(1)));
        if self.dotted {
            time += time / 2.0;
        }
        self.convert_time(time as i64)
    }

    pub const fn has_tuplet(&self) -> bool {
        self.tuplet_enters != 1 || self.tuplet_times != 1
    }

    /// Tuplet times matching the number of notes entering the tuplet
    pub fn tuplet_times_for(enters: i32) -> Option<u8> {
        match enters {
            1 => Some(1),
            3 => Some(2),
            5..=7 => Some(4),
            9..=13 => Some(8),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BendPoint {
    pub position: u8,
    pub value: i8,
    pub vibrato: bool,
}

/// Bend on a note, also used for the tremolo bar of a beat.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BendEffect {
    pub kind: i8,
    pub value: i32,
    pub points: Vec<BendPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraceEffect {
    pub duration: u8,
    pub fret: i8,
    pub is_dead: bool,
    pub is_on_beat: bool,
    pub transition: GraceEffectTransition,
    pub velocity: i16,
}

impl Default for GraceEffect {
    fn default() -> Self {
        GraceEffect {
            duration: 1,
            fret: 0,
            is_dead: false,
            is_on_beat: false,
            transition: GraceEffectTransition::None,
            velocity: DEFAULT_VELOCITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraceEffectTransition {
    /// No transition
    None = 0,
    /// Slide from the grace note to the real one.
    Slide,
    /// Perform a bend from the grace note to the real one.
    Bend,
    /// Perform a hammer on.
    Hammer,
}

impl GraceEffectTransition {
    pub fn get_grace_effect_transition(value: u8) -> GraceEffectTransition {
        match value {
            0 => GraceEffectTransition::None,
            1 => GraceEffectTransition::Slide,
            2 => GraceEffectTransition::Bend,
            3 => GraceEffectTransition::Hammer,
            x => {
                log::warn!("Unknown grace transition {x}, using none");
                GraceEffectTransition::None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarmonicType {
    Natural,
    Artificial,
    Tapped,
    Pinch,
    Semi,
}

impl HarmonicType {
    pub const fn from_byte(value: i8) -> Option<HarmonicType> {
        match value {
            1 => Some(HarmonicType::Natural),
            2 => Some(HarmonicType::Artificial),
            3 => Some(HarmonicType::Tapped),
            4 => Some(HarmonicType::Pinch),
            5 => Some(HarmonicType::Semi),
            _ => None,
        }
    }

    pub const fn to_byte(self) -> i8 {
        match self {
            HarmonicType::Natural => 1,
            HarmonicType::Artificial => 2,
            HarmonicType::Tapped => 3,
            HarmonicType::Pinch => 4,
            HarmonicType::Semi => 5,
        }
    }

    /// Opaque bytes following the harmonic type on disk.
    pub const fn extra_len(self) -> usize {
        match self {
            HarmonicType::Artificial => 3,
            HarmonicType::Tapped => 1,
            HarmonicType::Natural | HarmonicType::Pinch | HarmonicType::Semi => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlideType {
    IntoFromAbove,
    IntoFromBelow,
    ShiftSlideTo,
    LegatoSlideTo,
    OutDownwards,
    OutUpWards,
}

impl SlideType {
    pub const fn from_byte(t: u8) -> Option<SlideType> {
        if (t & 0x01) == 0x01 {
            Some(SlideType::ShiftSlideTo)
        } else if (t & 0x02) == 0x02 {
            Some(SlideType::LegatoSlideTo)
        } else if (t & 0x04) == 0x04 {
            Some(SlideType::OutDownwards)
        } else if (t & 0x08) == 0x08 {
            Some(SlideType::OutUpWards)
        } else if (t & 0x10) == 0x10 {
            Some(SlideType::IntoFromBelow)
        } else if (t & 0x20) == 0x20 {
            Some(SlideType::IntoFromAbove)
        } else {
            None
        }
    }

    pub const fn to_byte(self) -> u8 {
        match self {
            SlideType::ShiftSlideTo => 0x01,
            SlideType::LegatoSlideTo => 0x02,
            SlideType::OutDownwards => 0x04,
            SlideType::OutUpWards => 0x08,
            SlideType::IntoFromBelow => 0x10,
            SlideType::IntoFromAbove => 0x20,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrillEffect {
    pub fret: i8,
    pub duration: Duration,
}

impl TrillEffect {
    pub fn from_trill_period(period: i8) -> u16 {
        match period {
            1 => DURATION_SIXTEENTH,
            2 => DURATION_THIRTY_SECOND,
            3 => DURATION_SIXTY_FOURTH,
            x => {
                log::warn!("Unknown trill period {x}, using sixteenth");
                DURATION_SIXTEENTH
            }
        }
    }

    pub const fn to_trill_period(value: u16) -> i8 {
        match value {
            DURATION_THIRTY_SECOND => 2,
            DURATION_SIXTY_FOURTH => 3,
            _ => 1,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TremoloPickingEffect {
    pub duration: Duration,
}

impl TremoloPickingEffect {
    pub fn from_tremolo_value(value: i8) -> u16 {
        match value {
            1 => DURATION_EIGHTH,
            3 => DURATION_SIXTEENTH,
            2 => DURATION_THIRTY_SECOND,
            x => {
                log::warn!("Unknown tremolo picking value {x}, using eighth");
                DURATION_EIGHTH
            }
        }
    }

    pub const fn to_tremolo_value(value: u16) -> i8 {
        match value {
            DURATION_SIXTEENTH => 3,
            DURATION_THIRTY_SECOND => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoteType {
    #[default]
    Normal,
    Tie,
    Dead,
}

impl NoteType {
    pub const fn get_note_type(value: u8) -> NoteType {
        match value {
            2 => NoteType::Tie,
            3 => NoteType::Dead,
            _ => NoteType::Normal,
        }
    }

    pub const fn to_byte(self) -> u8 {
        match self {
            NoteType::Normal => 1,
            NoteType::Tie => 2,
            NoteType::Dead => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingering {
    pub left: i8,
    pub right: i8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEffect {
    pub accentuated_note: bool,
    pub heavy_accentuated_note: bool,
    pub ghost_note: bool,
    pub fingering: Option<Fingering>,
    pub bend: Option<BendEffect>,
    pub grace: Option<GraceEffect>,
    pub hammer: bool,
    pub harmonic: Option<HarmonicType>,
    pub let_ring: bool,
    pub palm_mute: bool,
    pub slide: Option<SlideType>,
    pub staccato: bool,
    pub tremolo_picking: Option<TremoloPickingEffect>,
    pub trill: Option<TrillEffect>,
    pub vibrato: bool,
    /// Effect record present on disk even though every effect is off
    pub presence: bool,
}

impl NoteEffect {
    /// Whether the two-byte effect record carries anything.
    pub const fn has_effect_record(&self) -> bool {
        self.bend.is_some()
            || self.grace.is_some()
            || self.tremolo_picking.is_some()
            || self.slide.is_some()
            || self.harmonic.is_some()
            || self.trill.is_some()
            || self.hammer
            || self.let_ring
            || self.palm_mute
            || self.staccato
            || self.vibrato
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chord {
    pub name: String,
    pub first_fret: i32,
    /// Fret per string, -1 when the string is not played
    pub strings: Vec<i32>,
}

impl Chord {
    pub fn new(string_count: usize) -> Self {
        Chord {
            name: String::new(),
            first_fret: 0,
            strings: vec![-1; string_count],
        }
    }

    pub fn note_count(&self) -> usize {
        self.strings.iter().filter(|&&fret| fret >= 0).count()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeatStrokeDirection {
    #[default]
    None,
    Up,
    Down,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatStroke {
    pub direction: BeatStrokeDirection,
    pub value: u16,
}

impl BeatStroke {
    pub fn from_stroke_value(value: i8) -> u16 {
        match value {
            1 => DURATION_HUNDRED_TWENTY_EIGHTH,
            2 => DURATION_SIXTY_FOURTH,
            3 => DURATION_THIRTY_SECOND,
            4 => DURATION_SIXTEENTH,
            5 => DURATION_EIGHTH,
            6 => QUARTER,
            x => {
                log::warn!("Unknown stroke value {x}, using sixty-fourth");
                DURATION_SIXTY_FOURTH
            }
        }
    }

    pub const fn to_stroke_value(value: u16) -> i8 {
        match value {
            DURATION_HUNDRED_TWENTY_EIGHTH => 1,
            DURATION_SIXTY_FOURTH => 2,
            DURATION_THIRTY_SECOND => 3,
            DURATION_SIXTEENTH => 4,
            DURATION_EIGHTH => 5,
            QUARTER => 6,
            _ => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlapEffect {
    #[default]
    None,
    Tapping,
    Slapping,
    Popping,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatEffects {
    pub fade_in: bool,
    pub vibrato: bool,
    pub slap: SlapEffect,
    pub tremolo_bar: Option<BendEffect>,
    pub stroke: BeatStroke,
    pub has_rasgueado: bool,
    pub pick_stroke: Option<i8>,
}

impl BeatEffects {
    pub fn is_default(&self) -> bool {
        *self == BeatEffects::default()
    }
}

/// Value of one mix table slot, with the number of beats to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixTableItem<V = i8> {
    pub value: V,
    pub duration: i8,
    pub all_tracks: bool,
}

impl<V> MixTableItem<V> {
    pub const fn new(value: V) -> Self {
        MixTableItem {
            value,
            duration: 0,
            all_tracks: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixTableChange {
    pub instrument: Option<i8>,
    pub volume: Option<MixTableItem>,
    pub balance: Option<MixTableItem>,
    pub chorus: Option<MixTableItem>,
    pub reverb: Option<MixTableItem>,
    pub phaser: Option<MixTableItem>,
    pub tremolo: Option<MixTableItem>,
    pub tempo_name: String,
    pub tempo: Option<MixTableItem<i32>>,
    pub hide_tempo: bool,
    /// GP5.10 only
    pub trailing_strings: [String; 2],
}

impl MixTableChange {
    /// Volume to tremolo, in disk order.
    pub const fn value_items(&self) -> [&Option<MixTableItem>; 6] {
        [
            &self.volume,
            &self.balance,
            &self.chorus,
            &self.reverb,
            &self.phaser,
            &self.tremolo,
        ]
    }

    pub fn value_items_mut(&mut self) -> [&mut Option<MixTableItem>; 6] {
        [
            &mut self.volume,
            &mut self.balance,
            &mut self.chorus,
            &mut self.reverb,
            &mut self.phaser,
            &mut self.tremolo,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub value: i16,
    pub velocity: i16,
    pub string: i8,
    pub effect: NoteEffect,
    pub duration_percent: f64,
    pub swap_accidentals: bool,
    pub kind: NoteType,
}

impl Note {
    pub fn new(note_effect: NoteEffect) -> Self {
        Note {
            value: 0,
            velocity: DEFAULT_VELOCITY,
            string: 1,
            effect: note_effect,
            duration_percent: 1.0,
            swap_accidentals: false,
            kind: NoteType::Normal,
        }
    }
}

impl Default for Note {
    fn default() -> Self {
        Note::new(NoteEffect::default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeatStatus {
    #[default]
    Normal,
    Empty,
    Rest,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Beat {
    pub notes: Vec<Note>,
    pub duration: Duration,
    pub status: BeatStatus,
    pub text: Option<String>,
    pub start: i64,
    pub chord: Option<Chord>,
    pub effect: BeatEffects,
    pub mix_table_change: Option<MixTableChange>,
}

impl Beat {
    pub fn is_empty(&self) -> bool {
        self.status == BeatStatus::Empty
    }

    /// Empty and rest beats carry the status byte.
    pub fn is_empty_or_rest(&self) -> bool {
        self.status != BeatStatus::Normal || self.notes.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    pub beats: Vec<Beat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub track_index: usize,
    pub header_index: usize,
    pub start: i64,
    pub voices: Vec<Voice>,
}

impl Default for Measure {
    fn default() -> Self {
        Measure {
            track_index: 0,
            header_index: 0,
            start: QUARTER_TIME,
            voices: vec![Voice::default(); MAX_VOICES],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuitarString {
    pub number: i32,
    /// MIDI note of the open string
    pub value: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub number: i32,
    pub percussion: bool,
    pub twelve_stringed_guitar: bool,
    pub banjo: bool,
    pub visible: bool,
    pub name: String,
    pub strings: Vec<GuitarString>,
    pub port: i32,
    pub channel: MidiChannel,
    pub fret_count: i32,
    pub offset: i32,
    pub color: i32,
    /// GP5.10 only
    pub trailing_strings: [String; 2],
    pub measures: Vec<Measure>,
}

impl Track {
    pub fn string_count(&self) -> usize {
        self.strings.len()
    }
}

impl Default for Track {
    fn default() -> Self {
        Track {
            number: 1,
            percussion: false,
            twelve_stringed_guitar: false,
            banjo: false,
            visible: true,
            name: String::new(),
            strings: [64, 59, 55, 50, 45, 40]
                .iter()
                .zip(1..)
                .map(|(&value, number)| GuitarString { number, value })
                .collect(),
            port: 1,
            channel: MidiChannel::default(),
            fret_count: 24,
            offset: 0,
            color: 0x00FF_0000,
            trailing_strings: Default::default(),
            measures: vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_velocity_packing() {
        assert_eq!(unpack_velocity(6), DEFAULT_VELOCITY);
        assert_eq!(pack_velocity(DEFAULT_VELOCITY), 6);
        for dynamic in 1..=8 {
            assert_eq!(pack_velocity(unpack_velocity(dynamic)), dynamic as i8);
        }
        assert_eq!(pack_velocity(i16::MAX), i8::MAX);
        assert_eq!(pack_velocity(i16::MIN), i8::MIN);
        assert_eq!(pack_velocity(unpack_velocity(127)), 127);
    }

    #[test]
    fn test_version_strings() {
        for version in [GpVersion::GP5, GpVersion::GP5_10] {
            assert_eq!(
                GpVersion::from_version_string(version.version_string()),
                Some(version)
            );
        }
        assert_eq!(
            GpVersion::from_version_string("FICHIER GUITAR PRO v4.06"),
            None
        );
        assert!(GpVersion::GP5.is_base());
        assert!(!GpVersion::GP5_10.is_base());
    }

    #[test]
    fn test_track_compatibility_blocks() {
        assert_eq!(GpVersion::GP5.track_compatibility_block().len(), 44);
        assert_eq!(GpVersion::GP5_10.track_compatibility_block().len(), 49);
        assert_eq!(GpVersion::GP5.tracks_padding_len(), 2);
        assert_eq!(GpVersion::GP5_10.tracks_padding_len(), 1);
    }

    #[test]
    fn test_measure_length() {
        let mut header = MeasureHeader::default();
        // 4 quarter notes of 960 ticks
        assert_eq!(header.length(), 3840);
        header.time_signature.numerator = 6;
        header.time_signature.denominator.value = DURATION_EIGHTH;
        assert_eq!(header.length(), 2880);
    }

    #[test]
    fn test_duration_time_with_tuplet() {
        let duration = Duration {
            value: DURATION_EIGHTH,
            dotted: false,
            tuplet_enters: 3,
            tuplet_times: 2,
        };
        assert_eq!(duration.time(), 320);
        assert!(duration.has_tuplet());
        assert!(!Duration::default().has_tuplet());
    }

    #[test]
    fn test_key_signature_display() {
        assert_eq!(KeySignature::new(0, false).to_string(), "C major");
        assert_eq!(KeySignature::new(1, true).to_string(), "E minor");
        assert_eq!(KeySignature::new(-1, false).to_string(), "F major");
        assert_eq!(KeySignature::new(0, true).to_string(), "A minor");
        assert_eq!(KeySignature::new(40, false).to_string(), "unknown key (40)");
    }

    #[test]
    fn test_chord_note_count() {
        let mut chord = Chord::new(6);
        assert_eq!(chord.note_count(), 0);
        chord.strings[0] = 0;
        chord.strings[2] = 3;
        assert_eq!(chord.note_count(), 2);
    }
}
