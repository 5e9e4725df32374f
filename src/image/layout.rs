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

//! Disc geometry.
//!
//! Parsers describe each track by its length and pregap only; the builder
//! places the tracks on the disc, starting the first session at sector -150
//! and leaving room for lead-out and lead-in areas between sessions.

use tracing::trace;

use crate::error::ImageError;
use crate::toc::MAX_TRACKS;

use super::{Disc, Session, SessionLayout, SessionType, Track, TrackMode};

/// Pregap in front of the first track of every session.
pub const PREGAP_LENGTH: i32 = 150;
/// Lead-in in front of every session after the first.
pub const LEADIN_LENGTH: i32 = 4500;
pub const FIRST_LEADOUT_LENGTH: i32 = 6750;
pub const LEADOUT_LENGTH: i32 = 2250;

/// A track as described by an image format, before placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSpec {
    pub number: i32,
    pub mode: TrackMode,
    /// Sectors before INDEX 01, not counting the session pregap.
    pub pregap: i32,
    /// Total sectors, `pregap` included.
    pub length: i32,
    pub indices: usize,
    pub isrc: Option<String>,
}

impl TrackSpec {
    pub fn new(number: i32, mode: TrackMode, length: i32) -> Self {
        TrackSpec {
            number,
            mode,
            pregap: 0,
            length,
            indices: 0,
            isrc: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct DiscBuilder {
    mcn: Option<String>,
    sessions: Vec<Vec<TrackSpec>>,
}

impl DiscBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_mcn(&mut self, mcn: Option<String>) {
        self.mcn = mcn.filter(|m| !m.is_empty());
    }

    /// Starts a new session; following tracks are added to it.
    pub fn start_session(&mut self) {
        self.sessions.push(Vec::new());
    }

    pub fn add_track(&mut self, track: TrackSpec) {
        if self.sessions.is_empty() {
            self.start_session();
        }
        if let Some(session) = self.sessions.last_mut() {
            session.push(track);
        }
    }

    pub fn build(self) -> Result<ImageDisc, ImageError> {
        let specs: Vec<Vec<TrackSpec>> = self.sessions.into_iter().filter(|s| !s.is_empty()).collect();
        if specs.is_empty() {
            return Err(ImageError::Corrupt("image contains no tracks".to_string()));
        }

        let mut sessions = Vec::with_capacity(specs.len());
        let mut next_start = Some(-PREGAP_LENGTH);
        let mut previous_number = 0;

        for (i, tracks) in specs.into_iter().enumerate() {
            let start_sector = next_start.ok_or_else(|| beyond_disc(format!("session {}", i + 1)))?;
            let leadout_length = if i == 0 { FIRST_LEADOUT_LENGTH } else { LEADOUT_LENGTH };
            let session_type = SessionType::from_modes(tracks.iter().map(|t| t.mode));
            let first_track = tracks[0].number;

            let mut sector = start_sector;
            let mut placed = Vec::with_capacity(tracks.len());
            for (j, spec) in tracks.into_iter().enumerate() {
                if spec.number <= previous_number || spec.number >= MAX_TRACKS as i32 {
                    return Err(ImageError::Corrupt(format!(
                        "track number {} out of sequence",
                        spec.number
                    )));
                }
                if spec.length < 0 || spec.pregap < 0 || spec.pregap > spec.length {
                    return Err(ImageError::Corrupt(format!(
                        "track {} has invalid length {} (pregap {})",
                        spec.number, spec.length, spec.pregap
                    )));
                }
                previous_number = spec.number;

                let extra = if j == 0 { PREGAP_LENGTH } else { 0 };
                let length = spec.length
                    .checked_add(extra)
                    .ok_or_else(|| beyond_disc(format!("track {}", spec.number)))?;
                let track = Track {
                    number: spec.number,
                    mode: spec.mode,
                    start_sector: sector,
                    length,
                    // pregap <= length
                    track_start: spec.pregap + extra,
                    indices: spec.indices,
                    isrc: spec.isrc.filter(|s| !s.is_empty()),
                };
                trace!(
                    "track {}: start sector {}, length {}, track start {}",
                    track.number,
                    track.start_sector,
                    track.length,
                    track.track_start
                );
                sector = sector
                    .checked_add(track.length)
                    .ok_or_else(|| beyond_disc(format!("track {}", track.number)))?;
                placed.push(track);
            }

            let length = sector
                .checked_sub(start_sector)
                .ok_or_else(|| beyond_disc(format!("session {}", i + 1)))?;
            sessions.push(ImageSession {
                layout: SessionLayout {
                    number: i as i32 + 1,
                    first_track,
                    start_sector,
                    length,
                },
                session_type,
                leadout_length,
                tracks: placed,
            });
            next_start = sector
                .checked_add(leadout_length)
                .and_then(|s| s.checked_add(LEADIN_LENGTH));
        }

        Ok(ImageDisc {
            mcn: self.mcn,
            sessions,
        })
    }
}

fn beyond_disc(what: String) -> ImageError {
    ImageError::Corrupt(format!("{} ends beyond the largest sector number", what))
}

/// Fully resolved disc held in memory.
#[derive(Debug, Clone)]
pub struct ImageDisc {
    mcn: Option<String>,
    sessions: Vec<ImageSession>,
}

#[derive(Debug, Clone)]
pub struct ImageSession {
    layout: SessionLayout,
    session_type: SessionType,
    leadout_length: i32,
    tracks: Vec<Track>,
}

impl Disc for ImageDisc {
    fn mcn(&self) -> Option<&str> {
        self.mcn.as_deref()
    }

    fn number_of_sessions(&self) -> usize {
        self.sessions.len()
    }

    fn session_by_index(&self, index: usize) -> Result<Box<dyn Session + '_>, ImageError> {
        match self.sessions.get(index) {
            Some(session) => Ok(Box::new(session)),
            None => Err(ImageError::SessionIndex(index)),
        }
    }
}

impl Session for ImageSession {
    fn layout(&self) -> SessionLayout {
        self.layout
    }

    fn session_type(&self) -> SessionType {
        self.session_type
    }

    fn leadout_length(&self) -> i32 {
        self.leadout_length
    }

    fn number_of_tracks(&self) -> usize {
        self.tracks.len()
    }

    fn track_by_index(&self, index: usize) -> Result<Track, ImageError> {
        self.tracks.get(index).cloned().ok_or(ImageError::TrackIndex(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn audio(number: i32, length: i32) -> TrackSpec {
        TrackSpec::new(number, TrackMode::Audio, length)
    }

    #[test]
    fn test_single_session() {
        let mut builder = DiscBuilder::new();
        builder.add_track(audio(1, 1000));
        let mut second = audio(2, 2000);
        second.pregap = 75;
        builder.add_track(second);
        let disc = builder.build().unwrap();

        assert_eq!(1, disc.number_of_sessions());
        let session = disc.session_by_index(0).unwrap();
        assert_eq!(
            SessionLayout { number: 1, first_track: 1, start_sector: -150, length: 3150 },
            session.layout()
        );
        assert_eq!(SessionType::CdDa, session.session_type());
        assert_eq!(FIRST_LEADOUT_LENGTH, session.leadout_length());

        let first = session.track_by_index(0).unwrap();
        assert_eq!((-150, 1150, 150), (first.start_sector, first.length, first.track_start));
        let second = session.track_by_index(1).unwrap();
        assert_eq!((1000, 2000, 75), (second.start_sector, second.length, second.track_start));
        assert!(matches!(session.track_by_index(2), Err(ImageError::TrackIndex(2))));
    }

    #[test]
    fn test_multi_session() {
        let mut builder = DiscBuilder::new();
        builder.start_session();
        builder.add_track(audio(1, 1000));
        builder.start_session();
        builder.add_track(TrackSpec::new(2, TrackMode::Mode2, 500));
        let disc = builder.build().unwrap();

        assert_eq!(2, disc.number_of_sessions());
        let second = disc.session_by_index(1).unwrap();
        let layout = second.layout();
        assert_eq!(2, layout.number);
        assert_eq!(2, layout.first_track);
        // -150 + 1150 (session 1) + 6750 (lead-out) + 4500 (lead-in)
        assert_eq!(12250, layout.start_sector);
        assert_eq!(650, layout.length);
        assert_eq!(LEADOUT_LENGTH, second.leadout_length());
        assert_eq!(SessionType::CdRomXa, second.session_type());
        assert_eq!(150, second.track_by_index(0).unwrap().track_start);
        assert!(matches!(disc.session_by_index(2), Err(ImageError::SessionIndex(2))));
    }

    #[test]
    fn test_empty_sessions_are_dropped() {
        let mut builder = DiscBuilder::new();
        builder.start_session();
        builder.start_session();
        builder.add_track(audio(1, 100));
        builder.start_session();
        assert_eq!(1, builder.build().unwrap().number_of_sessions());
    }

    #[test]
    fn test_no_tracks() {
        assert!(matches!(DiscBuilder::new().build(), Err(ImageError::Corrupt(_))));
    }

    #[test]
    fn test_track_numbers_must_increase() {
        let mut builder = DiscBuilder::new();
        builder.add_track(audio(2, 100));
        builder.add_track(audio(2, 100));
        assert!(matches!(builder.build(), Err(ImageError::Corrupt(_))));
    }

    #[test]
    fn test_sector_overflow() {
        let mut builder = DiscBuilder::new();
        builder.add_track(audio(1, i32::MAX));
        assert!(matches!(builder.build(), Err(ImageError::Corrupt(_))));

        let mut builder = DiscBuilder::new();
        builder.add_track(audio(1, i32::MAX - 1000));
        builder.add_track(audio(2, 2000));
        assert!(matches!(builder.build(), Err(ImageError::Corrupt(_))));

        // The last session may end close to the limit, a following one may not.
        let mut builder = DiscBuilder::new();
        builder.add_track(audio(1, i32::MAX - 1000));
        let disc = builder.build().unwrap();
        assert_eq!(i32::MAX - 850, disc.session_by_index(0).unwrap().layout().length);

        let mut builder = DiscBuilder::new();
        builder.start_session();
        builder.add_track(audio(1, i32::MAX - 1000));
        builder.start_session();
        builder.add_track(audio(2, 100));
        assert!(matches!(builder.build(), Err(ImageError::Corrupt(_))));
    }

    #[test]
    fn test_mcn_and_isrc() {
        let mut builder = DiscBuilder::new();
        builder.set_mcn(Some("0724384260958".to_string()));
        let mut track = audio(1, 100);
        track.isrc = Some(String::new());
        builder.add_track(track);
        let disc = builder.build().unwrap();
        assert_eq!(Some("0724384260958"), disc.mcn());
        assert_eq!(None, disc.session_by_index(0).unwrap().track_by_index(0).unwrap().isrc);

        let mut builder = DiscBuilder::new();
        builder.set_mcn(Some(String::new()));
        builder.add_track(audio(1, 100));
        assert_eq!(None, builder.build().unwrap().mcn());
    }
}
