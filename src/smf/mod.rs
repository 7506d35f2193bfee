//! Standard MIDI File decoding.
//!
//! Turns the raw bytes of a format 0 or format 1 file into the flat list of
//! channel events it contains, stamped with absolute times in nanoseconds.
//! Meta and system exclusive events are consumed here and never surface; the
//! only ones interpreted are end-of-track and tempo.

mod reader;

pub use reader::{ByteReader, variable_length_value};

use std::path::Path;

use tracing::{debug, info};

use crate::error::{PlayerError, Result};
use crate::events::ChannelEvent;

const META: u8 = 0xFF;
const SYSEX: u8 = 0xF0;
const SYSEX_ESCAPE: u8 = 0xF7;
const META_END_OF_TRACK: u8 = 0x2F;
const META_TEMPO: u8 = 0x51;
const TEMPO_EVENT_SIZE: usize = 6;

/// Microseconds per quarter note when a file never sets its tempo (120 BPM).
pub const DEFAULT_TEMPO: u32 = 500_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    SingleTrack,
    MultiTrack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Division {
    /// Pulses per quarter note.
    Metrical(u16),
    Timecode { frames_per_second: u8, subframes: u8 },
}

impl Division {
    /// Ticks per time unit used by the nanosecond conversion.
    pub fn resolution(&self) -> u32 {
        match *self {
            Division::Metrical(ppqn) => u32::from(ppqn),
            Division::Timecode {
                frames_per_second,
                subframes,
            } => u32::from(frames_per_second) * u32::from(subframes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmfHeader {
    pub format: Format,
    pub track_count: u16,
    pub division: Division,
}

#[derive(Debug, Clone)]
pub struct DecodedSong {
    pub header: SmfHeader,
    /// Microseconds per quarter note.
    pub tempo: u32,
    /// Sorted by time.
    pub events: Vec<ChannelEvent>,
}

/// One decoded track event, before timing is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TrackEvent {
    Meta { kind: u8, raw_len: usize, payload: Vec<u8> },
    SysEx,
    Channel(Vec<u8>),
}

/// Per-track decoding state.
struct TrackDecoder<'r, 'a> {
    reader: &'r mut ByteReader<'a>,
    last_status: Option<u8>,
}

impl<'r, 'a> TrackDecoder<'r, 'a> {
    fn new(reader: &'r mut ByteReader<'a>) -> Self {
        Self {
            reader,
            last_status: None,
        }
    }

    fn read_status(&mut self) -> Result<u8> {
        let offset = self.reader.position();
        match self.reader.peek_u8() {
            Some(byte) if byte & 0x80 == 0 => {
                self.last_status.ok_or(PlayerError::MissingRunningStatus(offset))
            }
            _ => self.reader.read_u8(),
        }
    }

    fn next_event(&mut self) -> Result<(u32, TrackEvent)> {
        let delta = self.reader.read_relative_time()?;
        let offset = self.reader.position();
        let status = self.read_status()?;

        // every event, meta and sysex included, becomes the running status
        let event = match status {
            META => {
                let kind = self.reader.read_u8()?;
                let length_start = self.reader.position();
                let length = self.reader.read_variable_length()?;
                let length_len = self.reader.position() - length_start;
                let length = usize::try_from(length)
                    .map_err(|_| PlayerError::UnexpectedEof(self.reader.position()))?;
                let payload = self.reader.read_bytes(length)?.to_vec();
                self.last_status = Some(status);
                TrackEvent::Meta {
                    kind,
                    raw_len: 2 + length_len + payload.len(),
                    payload,
                }
            }
            SYSEX | SYSEX_ESCAPE => {
                let length = self.reader.read_variable_length()?;
                let length = usize::try_from(length)
                    .map_err(|_| PlayerError::UnexpectedEof(self.reader.position()))?;
                self.reader.read_bytes(length)?;
                self.last_status = Some(status);
                TrackEvent::SysEx
            }
            0x80..=0xEF => {
                let data_len = match status & 0xF0 {
                    // program change, channel aftertouch
                    0xC0 | 0xD0 => 1,
                    _ => 2,
                };
                let mut bytes = Vec::with_capacity(1 + data_len);
                bytes.push(status);
                bytes.extend_from_slice(self.reader.read_bytes(data_len)?);
                self.last_status = Some(status);
                TrackEvent::Channel(bytes)
            }
            _ => return Err(PlayerError::InvalidStatus { status, offset }),
        };

        Ok((delta, event))
    }
}

/// Tempo shared by every track of the file.
#[derive(Default)]
struct TempoTracker {
    tempo: Option<u32>,
}

impl TempoTracker {
    fn observe(&mut self, raw_len: usize, payload: &[u8]) -> Result<()> {
        if raw_len != TEMPO_EVENT_SIZE || payload.len() < 3 {
            return Err(PlayerError::InvalidTempoSize(raw_len));
        }
        let n = payload.len();
        let found = u32::from_be_bytes([0, payload[n - 3], payload[n - 2], payload[n - 1]]);
        match self.tempo {
            Some(previous) if previous != found => {
                Err(PlayerError::TempoChange { previous, found })
            }
            _ => {
                self.tempo = Some(found);
                Ok(())
            }
        }
    }

    fn tempo(&self) -> u32 {
        self.tempo.unwrap_or(DEFAULT_TEMPO)
    }
}

fn read_header(reader: &mut ByteReader<'_>) -> Result<SmfHeader> {
    reader.expect_magic(b"MThd", "file")?;

    let header_len = reader.read_u32_be()?;
    if header_len != 6 {
        return Err(PlayerError::BadHeaderLength(header_len));
    }

    let format = match reader.read_u16_be()? {
        0 => Format::SingleTrack,
        1 => Format::MultiTrack,
        other => return Err(PlayerError::UnsupportedFormat(other)),
    };

    let track_count = reader.read_u16_be()?;
    if format == Format::SingleTrack && track_count != 1 {
        return Err(PlayerError::SingleTrackCount(track_count));
    }

    let division = read_division(reader)?;
    if division.resolution() == 0 {
        return Err(PlayerError::ZeroDivision);
    }

    Ok(SmfHeader {
        format,
        track_count,
        division,
    })
}

fn read_division(reader: &mut ByteReader<'_>) -> Result<Division> {
    let bytes = reader.read_bytes(2)?;
    if bytes[0] & 0x80 == 0 {
        return Ok(Division::Metrical(u16::from_be_bytes([bytes[0], bytes[1]])));
    }

    let frames_per_second = (bytes[0] as i8).unsigned_abs();
    if !matches!(frames_per_second, 24 | 25 | 29 | 30) {
        return Err(PlayerError::InvalidFrameRate(frames_per_second));
    }
    Ok(Division::Timecode {
        frames_per_second,
        subframes: bytes[1],
    })
}

/// Decodes one `MTrk` chunk, appending its channel events with tick times.
fn read_track(
    reader: &mut ByteReader<'_>,
    tempo: &mut TempoTracker,
    events: &mut Vec<(u64, Vec<u8>)>,
) -> Result<()> {
    reader.expect_magic(b"MTrk", "track")?;
    // the declared length is not trusted, end-of-track terminates the chunk
    reader.read_u32_be()?;

    let mut decoder = TrackDecoder::new(reader);
    let mut ticks: u64 = 0;

    loop {
        let (delta, event) = decoder.next_event()?;
        ticks += u64::from(delta);

        match event {
            TrackEvent::Meta {
                kind: META_END_OF_TRACK,
                ..
            } => break,
            TrackEvent::Meta {
                kind: META_TEMPO,
                raw_len,
                payload,
            } => tempo.observe(raw_len, &payload)?,
            TrackEvent::Meta { .. } | TrackEvent::SysEx => {}
            TrackEvent::Channel(bytes) => events.push((ticks, bytes)),
        }
    }

    Ok(())
}

/// `ticks * tempo * 1000 / resolution`, truncating.
pub fn ticks_to_nanos(ticks: u64, tempo: u32, resolution: u32) -> Result<u64> {
    let nanos = u128::from(ticks) * u128::from(tempo) * 1000 / u128::from(resolution);
    u64::try_from(nanos).map_err(|_| PlayerError::TimeOverflow(ticks))
}

pub fn decode(bytes: &[u8]) -> Result<DecodedSong> {
    let mut reader = ByteReader::new(bytes);
    let header = read_header(&mut reader)?;

    let mut tempo = TempoTracker::default();
    let mut ticked: Vec<(u64, Vec<u8>)> = Vec::new();
    for track in 0..header.track_count {
        read_track(&mut reader, &mut tempo, &mut ticked)?;
        debug!(track, events = ticked.len(), "decoded track");
    }

    if reader.remaining() != 0 {
        return Err(PlayerError::TrailingBytes(reader.remaining()));
    }

    let tempo = tempo.tempo();
    let resolution = header.division.resolution();

    ticked.sort_by_key(|(ticks, _)| *ticks);
    let mut events = Vec::with_capacity(ticked.len());
    for (ticks, bytes) in ticked {
        events.push(ChannelEvent::new(
            ticks_to_nanos(ticks, tempo, resolution)?,
            bytes,
        ));
    }

    info!(
        format = ?header.format,
        tracks = header.track_count,
        division = ?header.division,
        tempo,
        events = events.len(),
        "decoded midi file"
    );

    Ok(DecodedSong {
        header,
        tempo,
        events,
    })
}

pub fn decode_file(path: &Path) -> Result<DecodedSong> {
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}
