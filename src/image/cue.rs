// Copyright (C) 2019 Philipp Wolfer <ph.wolfer@gmail.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! CUE sheet images.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::{tag_no_case, take_till1, take_until},
    character::complete::{char, digit1, space0, space1},
    combinator::{all_consuming, map, map_res, rest},
    sequence::{delimited, preceded, separated_pair, terminated, tuple},
    IResult,
};
use tracing::{debug, trace, warn};

use crate::error::ImageError;

use super::{has_extension, DiscBuilder, ImageDisc, ImageParser, TrackMode, TrackSpec};

const FRAMES_PER_SECOND: i32 = 75;

/// One line of a CUE sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    File { name: String, kind: String },
    Track { number: i32, mode: String },
    Index { number: i32, frames: i32 },
    Pregap(i32),
    Postgap(i32),
    Isrc(String),
    Catalog(String),
    Session(i32),
    Other(String),
}

fn number<T: FromStr>(input: &str) -> IResult<&str, T> {
    map_res(digit1, |s: &str| s.parse::<T>())(input)
}

fn word(input: &str) -> IResult<&str, &str> {
    take_till1(|c: char| c.is_whitespace())(input)
}

fn string(input: &str) -> IResult<&str, &str> {
    alt((delimited(char('"'), take_until("\""), char('"')), word))(input)
}

/// Parses an `mm:ss:ff` position into frames.
fn msf(input: &str) -> IResult<&str, i32> {
    map_res(
        tuple((number::<i32>, char(':'), number::<i32>, char(':'), number::<i32>)),
        |(m, _, s, _, f): (i32, char, i32, char, i32)| {
            if s >= 60 || f >= FRAMES_PER_SECOND {
                return Err("position out of range");
            }
            m.checked_mul(60)
                .and_then(|v| v.checked_add(s))
                .and_then(|v| v.checked_mul(FRAMES_PER_SECOND))
                .and_then(|v| v.checked_add(f))
                .ok_or("position out of range")
        },
    )(input)
}

fn command(input: &str) -> IResult<&str, Command> {
    let (args, keyword) = terminated(word, space0)(input)?;
    match keyword.to_ascii_uppercase().as_str() {
        "FILE" => map(separated_pair(string, space1, word), |(name, kind)| Command::File {
            name: name.to_string(),
            kind: kind.to_ascii_uppercase(),
        })(args),
        "TRACK" => map(separated_pair(number::<i32>, space1, word), |(number, mode)| {
            Command::Track {
                number,
                mode: mode.to_ascii_uppercase(),
            }
        })(args),
        "INDEX" => map(separated_pair(number::<i32>, space1, msf), |(number, frames)| {
            Command::Index { number, frames }
        })(args),
        "PREGAP" => map(msf, Command::Pregap)(args),
        "POSTGAP" => map(msf, Command::Postgap)(args),
        "ISRC" => map(word, |isrc: &str| Command::Isrc(isrc.to_string()))(args),
        "CATALOG" => map(word, |mcn: &str| Command::Catalog(mcn.to_string()))(args),
        "REM" => alt((
            map(preceded(terminated(tag_no_case("SESSION"), space1), number::<i32>), Command::Session),
            map(rest, |_| Command::Other("REM".to_string())),
        ))(args),
        _ => map(rest, |_| Command::Other(keyword.to_string()))(args),
    }
}

fn parse_line(line: &str) -> Option<Command> {
    all_consuming(terminated(command, space0))(line).ok().map(|(_, c)| c)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CueTrack {
    number: i32,
    mode: TrackMode,
    sector_size: u64,
    session: i32,
    index0: Option<i32>,
    index1: Option<i32>,
    indices: usize,
    pregap: i32,
    postgap: i32,
    isrc: Option<String>,
    /// Started in the previous file, which holds its INDEX 00 area.
    carried: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CueFile {
    name: String,
    tracks: Vec<CueTrack>,
    /// Frame and sector size at which the data of a track continued in the
    /// next file begins.
    split_at: Option<(i32, u64)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CueSheet {
    catalog: Option<String>,
    files: Vec<CueFile>,
}

fn track_mode(mode: &str) -> Option<(TrackMode, u64)> {
    let mode = match mode {
        "AUDIO" => (TrackMode::Audio, 2352),
        "CDG" => (TrackMode::Audio, 2448),
        "MODE1/2048" => (TrackMode::Mode1, 2048),
        "MODE1/2352" => (TrackMode::Mode1, 2352),
        "MODE2/2048" => (TrackMode::Mode2, 2048),
        "MODE2/2324" => (TrackMode::Mode2, 2324),
        "MODE2/2336" => (TrackMode::Mode2, 2336),
        "MODE2/2352" => (TrackMode::Mode2, 2352),
        "CDI/2336" => (TrackMode::Cdi, 2336),
        "CDI/2352" => (TrackMode::Cdi, 2352),
        _ => return None,
    };
    Some(mode)
}

impl CueSheet {
    fn parse(path: &Path, content: &str) -> Result<CueSheet, ImageError> {
        let mut sheet = CueSheet::default();
        let mut session = 1;
        let mut last_number = 0;

        for (i, line) in content.lines().enumerate() {
            let error = |message: String| ImageError::Parse {
                path: path.to_path_buf(),
                line: i + 1,
                message,
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let command = parse_line(line).ok_or_else(|| error(format!("cannot parse '{}'", line)))?;
            trace!("line {}: {:?}", i + 1, command);

            if let Command::Catalog(mcn) = &command {
                if mcn.len() != 13 || !mcn.bytes().all(|b| b.is_ascii_digit()) {
                    warn!("unusual media catalog number '{}'", mcn);
                }
                sheet.catalog = Some(mcn.clone());
                continue;
            }
            if let Command::Session(number) = command {
                session = number;
                continue;
            }
            if let Command::File { name, kind } = &command {
                match kind.as_str() {
                    "BINARY" | "MOTOROLA" => {}
                    _ => return Err(error(format!("unsupported file type {}", kind))),
                }
                sheet.files.push(CueFile {
                    name: name.clone(),
                    tracks: Vec::new(),
                    split_at: None,
                });
                continue;
            }
            if let Command::Track { number, mode } = &command {
                let file = sheet
                    .files
                    .last_mut()
                    .ok_or_else(|| error("TRACK before FILE".to_string()))?;
                let (mode, sector_size) =
                    track_mode(mode).ok_or_else(|| error(format!("unknown track mode {}", mode)))?;
                if *number <= last_number || *number > 99 {
                    return Err(error(format!("track number {} out of sequence", number)));
                }
                last_number = *number;
                file.tracks.push(CueTrack {
                    number: *number,
                    mode,
                    sector_size,
                    session,
                    index0: None,
                    index1: None,
                    indices: 0,
                    pregap: 0,
                    postgap: 0,
                    isrc: None,
                    carried: false,
                });
                continue;
            }
            if let Command::Other(keyword) = &command {
                trace!("ignoring {}", keyword);
                continue;
            }

            sheet.continue_track();
            let track = sheet
                .files
                .last_mut()
                .and_then(|f| f.tracks.last_mut())
                .ok_or_else(|| error(format!("'{}' outside of a track", line)))?;
            match command {
                Command::Index { number: 0, frames } => {
                    if track.index1.is_some() {
                        return Err(error("INDEX 00 after INDEX 01".to_string()));
                    }
                    track.index0 = Some(frames);
                }
                Command::Index { number: 1, frames } => {
                    if track.index0.map_or(false, |i0| i0 > frames) {
                        return Err(error("INDEX 01 before INDEX 00".to_string()));
                    }
                    track.index1 = Some(frames);
                }
                Command::Index { .. } => track.indices += 1,
                Command::Pregap(frames) => track.pregap = frames,
                Command::Postgap(frames) => track.postgap = frames,
                Command::Isrc(isrc) => track.isrc = Some(isrc),
                _ => {}
            }
        }

        for track in sheet.files.iter().flat_map(|f| f.tracks.iter()) {
            if track.index1.is_none() {
                return Err(ImageError::Parse {
                    path: path.to_path_buf(),
                    line: 0,
                    message: format!("track {} has no INDEX 01", track.number),
                });
            }
        }
        Ok(sheet)
    }

    /// Split images may list a track's INDEX 00 under one FILE and its
    /// INDEX 01 under the next. Once a track command shows up under a FILE
    /// without tracks, the last track of the previous file moves there and
    /// its INDEX 00 marks where the previous file's last track ends.
    fn continue_track(&mut self) {
        let n = self.files.len();
        if n < 2 || !self.files[n - 1].tracks.is_empty() {
            return;
        }
        let (done, rest) = self.files.split_at_mut(n - 1);
        let previous = &mut done[n - 2];
        if previous.tracks.last().map_or(true, |t| t.index1.is_some()) {
            return;
        }
        if let Some(mut track) = previous.tracks.pop() {
            if let Some(index0) = track.index0.take() {
                previous.split_at = Some((index0, track.sector_size));
                track.carried = true;
            }
            rest[0].tracks.push(track);
        }
    }
}

impl CueTrack {
    /// File position, in frames, where the track's data begins.
    fn region_start(&self) -> i32 {
        self.index0.or(self.index1).unwrap_or(0)
    }
}

/// Finds the data file a `FILE` entry names: an explicitly given file with the
/// same name first, then the CUE sheet's directory.
fn resolve_data_file(cue_path: &Path, name: &str, extra: &[PathBuf]) -> PathBuf {
    let wanted = Path::new(name);
    if let Some(file_name) = wanted.file_name() {
        if let Some(found) = extra.iter().find(|p| p.file_name() == Some(file_name)) {
            return found.clone();
        }
    }
    match cue_path.parent() {
        Some(dir) => dir.join(wanted),
        None => wanted.to_path_buf(),
    }
}

/// Turns the tracks of one data file into track specs. Each track runs up to
/// the start of the next one; the last ends with the file, or where a track
/// continued in the next file begins. `carried` is the pregap such a track
/// left behind in the previous file. Returns the specs and the frames this
/// file leaves behind for the next one.
fn file_tracks(
    path: &Path,
    file_size: u64,
    file: &CueFile,
    carried: i32,
) -> Result<(Vec<TrackSpec>, i32), ImageError> {
    let corrupt = |message: String| ImageError::Corrupt(format!("{}: {}", path.display(), message));
    let tracks = &file.tracks;
    let mut specs = Vec::with_capacity(tracks.len());
    let mut position = match (tracks.first(), file.split_at) {
        (Some(t), _) => t.region_start() as u64 * t.sector_size,
        (None, Some((frame, sector_size))) => frame as u64 * sector_size,
        (None, None) => 0,
    };

    for (i, track) in tracks.iter().enumerate() {
        let too_long = || corrupt(format!("track {} is too long", track.number));
        let start = track.region_start();
        let frames = match (tracks.get(i + 1), file.split_at) {
            (Some(next), _) => next.region_start() - start,
            (None, Some((frame, _))) => frame - start,
            (None, None) => i32::try_from(file_size.saturating_sub(position) / track.sector_size)
                .map_err(|_| too_long())?,
        };
        if frames < 0 {
            return Err(corrupt(format!("track {} ends before it starts", track.number)));
        }
        if frames == 0 {
            warn!("track {} has no data in {}", track.number, path.display());
        }
        position += frames as u64 * track.sector_size;

        let lead = if track.carried { carried } else { 0 };
        let index1 = track.index1.unwrap_or(start);
        let pregap = lead
            .checked_add(track.pregap)
            .and_then(|p| p.checked_add(index1 - start))
            .ok_or_else(&too_long)?;
        let length = lead
            .checked_add(track.pregap)
            .and_then(|l| l.checked_add(frames))
            .and_then(|l| l.checked_add(track.postgap))
            .ok_or_else(&too_long)?;
        specs.push(TrackSpec {
            number: track.number,
            mode: track.mode,
            pregap,
            length,
            indices: track.indices,
            isrc: track.isrc.clone(),
        });
    }

    let left = match file.split_at {
        Some((_, sector_size)) => i32::try_from(file_size.saturating_sub(position) / sector_size)
            .map_err(|_| corrupt("pregap of the next track is too long".to_string()))?,
        None => 0,
    };
    Ok((specs, left))
}

/// Parser for CUE sheets referencing raw (`BINARY`/`MOTOROLA`) data files.
pub struct CueParser;

impl ImageParser for CueParser {
    fn name(&self) -> &'static str {
        "CUE"
    }

    fn can_load(&self, files: &[PathBuf]) -> bool {
        files.first().map_or(false, |f| has_extension(f, "cue"))
    }

    fn load(&self, files: &[PathBuf]) -> Result<ImageDisc, ImageError> {
        let cue_path = files.first().ok_or(ImageError::NoFiles)?;
        let bytes = fs::read(cue_path).map_err(|e| ImageError::io(cue_path, e))?;
        let content = String::from_utf8_lossy(&bytes);
        let content = content.trim_start_matches('\u{feff}');
        let sheet = CueSheet::parse(cue_path, content)?;

        let mut builder = DiscBuilder::new();
        builder.set_mcn(sheet.catalog);
        let mut session = None;
        let mut carried = 0;

        for file in &sheet.files {
            if file.tracks.is_empty() && file.split_at.is_none() {
                continue;
            }
            let data_path = resolve_data_file(cue_path, &file.name, &files[1..]);
            let file_size = fs::metadata(&data_path)
                .map_err(|e| ImageError::io(&data_path, e))?
                .len();
            debug!("{}: {} bytes, {} tracks", data_path.display(), file_size, file.tracks.len());

            let (specs, left) = file_tracks(&data_path, file_size, file, carried)?;
            carried = left;
            for (track, spec) in file.tracks.iter().zip(specs) {
                if session != Some(track.session) {
                    builder.start_session();
                    session = Some(track.session);
                }
                builder.add_track(spec);
            }
        }
        builder.build()
    }
}
