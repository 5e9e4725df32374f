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

//! Table of contents extraction.
//!
//! Walks the sessions and tracks of a [`Disc`] in order and collects the
//! offsets table libdiscid expects, along with ISRCs and the media catalog
//! number.
//!
//! Every session overwrites `first`, `last` and the lead-out, so for a
//! multi-session disc the table describes the last session that could be
//! read, with offsets relative to that session's start.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, warn};

use crate::discid::Features;
use crate::image::Disc;

/// Size of the offsets table: the lead-out plus tracks 1 to 99.
pub const MAX_TRACKS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toc {
    pub first: i32,
    pub last: i32,
    /// `offsets[0]` is the lead-out, `offsets[n]` the start of track `n`.
    pub offsets: [i32; MAX_TRACKS],
    pub isrcs: BTreeMap<i32, String>,
    pub mcn: Option<String>,
}

impl Default for Toc {
    fn default() -> Self {
        Toc {
            first: 0,
            last: 0,
            offsets: [0; MAX_TRACKS],
            isrcs: BTreeMap::new(),
            mcn: None,
        }
    }
}

impl Toc {
    pub fn leadout(&self) -> i32 {
        self.offsets[0]
    }

    /// Offsets of the tracks from `first` to `last`.
    pub fn track_offsets(&self) -> &[i32] {
        if self.first < 1 || self.last < self.first {
            return &[];
        }
        &self.offsets[self.first as usize..=self.last as usize]
    }

    pub fn features(&self) -> Features {
        let mut features = Features::READ;
        if self.mcn.is_some() {
            features |= Features::MCN;
        }
        if !self.isrcs.is_empty() {
            features |= Features::ISRC;
        }
        features
    }
}

/// Formats like a libdiscid TOC string: first, last, lead-out, offsets.
impl fmt::Display for Toc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.first, self.last, self.leadout())?;
        for offset in self.track_offsets() {
            write!(f, " {}", offset)?;
        }
        Ok(())
    }
}

pub fn extract(disc: &dyn Disc) -> Toc {
    let mut toc = Toc {
        mcn: disc.mcn().filter(|m| !m.is_empty()).map(str::to_string),
        ..Toc::default()
    };

    let sessions = disc.number_of_sessions();
    info!("Disc contains {} sessions", sessions);

    for i in 0..sessions {
        let session = match disc.session_by_index(i) {
            Ok(session) => session,
            Err(e) => {
                warn!("Cannot get session {}: {}", i, e);
                continue;
            }
        };

        let layout = session.layout();
        debug!(
            "session {}: layout: number {}, first track {}, start sector {}, length {}",
            i, layout.number, layout.first_track, layout.start_sector, layout.length
        );
        let tracks = session.number_of_tracks();
        debug!(
            "session {}: {} tracks, type {}, leadout length {}",
            i,
            tracks,
            session.session_type(),
            session.leadout_length()
        );

        let offset = match layout.start_sector.checked_neg() {
            Some(offset) => offset,
            None => {
                warn!("Cannot get session {}: start sector {} out of range", i, layout.start_sector);
                continue;
            }
        };
        debug!("session {}: calculated offset {}", i, offset);

        toc.offsets[0] = layout.length;
        toc.first = layout.first_track;
        toc.last = layout.first_track;

        for j in 0..tracks {
            let track = match session.track_by_index(j) {
                Ok(track) => track,
                Err(e) => {
                    warn!("Cannot get track {}: {}", j, e);
                    continue;
                }
            };

            let relative = track.start_sector.checked_add(offset);
            let start = match relative.and_then(|s| s.checked_add(track.track_start)) {
                Some(start) => start,
                None => {
                    warn!("Cannot get track {}: start sector {} out of range", j, track.start_sector);
                    continue;
                }
            };
            debug!(
                "session {}: track {}: layout: number {}, start sector {}, length {}",
                i,
                j,
                track.number,
                start - track.track_start,
                track.length
            );
            debug!(
                "session {}: track {}: track start {}, {} indices",
                i, j, start, track.indices
            );

            if track.number < 1 || track.number >= MAX_TRACKS as i32 {
                warn!("Skipping track {} with invalid number {}", j, track.number);
                continue;
            }
            toc.offsets[track.number as usize] = start;
            if let Some(isrc) = track.isrc.filter(|s| !s.is_empty()) {
                toc.isrcs.insert(track.number, isrc);
            }
            if track.number > toc.last {
                toc.last = track.number;
            }
        }
    }

    info!("Full TOC: {}", toc);
    debug!("Disc features: {:?}", toc.features());
    toc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImageError;
    use crate::image::{Session, SessionLayout, SessionType, Track, TrackMode};

    struct FakeSession {
        layout: SessionLayout,
        tracks: Vec<Option<Track>>,
    }

    impl Session for FakeSession {
        fn layout(&self) -> SessionLayout {
            self.layout
        }

        fn session_type(&self) -> SessionType {
            SessionType::CdDa
        }

        fn leadout_length(&self) -> i32 {
            6750
        }

        fn number_of_tracks(&self) -> usize {
            self.tracks.len()
        }

        fn track_by_index(&self, index: usize) -> Result<Track, ImageError> {
            match self.tracks.get(index) {
                Some(Some(track)) => Ok(track.clone()),
                Some(None) => Err(ImageError::Corrupt("unreadable track".to_string())),
                None => Err(ImageError::TrackIndex(index)),
            }
        }
    }

    #[derive(Default)]
    struct FakeDisc {
        mcn: Option<String>,
        sessions: Vec<Option<FakeSession>>,
    }

    impl Disc for FakeDisc {
        fn mcn(&self) -> Option<&str> {
            self.mcn.as_deref()
        }

        fn number_of_sessions(&self) -> usize {
            self.sessions.len()
        }

        fn session_by_index(&self, index: usize) -> Result<Box<dyn Session + '_>, ImageError> {
            match self.sessions.get(index) {
                Some(Some(session)) => Ok(Box::new(session)),
                _ => Err(ImageError::SessionIndex(index)),
            }
        }
    }

    fn track(number: i32, start_sector: i32, length: i32, track_start: i32) -> Track {
        Track {
            number,
            mode: TrackMode::Audio,
            start_sector,
            length,
            track_start,
            indices: 0,
            isrc: None,
        }
    }

    /// A session laid out the way the image parsers do: starting at
    /// `start_sector`, the first track carrying a 150 sector pregap.
    fn session(start_sector: i32, first_track: i32, offsets: &[i32], leadout: i32) -> FakeSession {
        let mut tracks = Vec::new();
        for (i, offset) in offsets.iter().enumerate() {
            let (start, pregap) = if i == 0 { (start_sector, 150) } else { (start_sector + offset, 0) };
            let end = offsets.get(i + 1).copied().unwrap_or(leadout) + start_sector;
            tracks.push(Some(track(first_track + i as i32, start, end - start, pregap)));
        }
        FakeSession {
            layout: SessionLayout {
                number: 1,
                first_track,
                start_sector,
                length: leadout,
            },
            tracks,
        }
    }

    const OFFSETS: [i32; 10] = [150, 18901, 39738, 59557, 79152, 100126, 124833, 147278, 166336, 182560];

    #[test]
    fn test_single_session() {
        let disc = FakeDisc {
            sessions: vec![Some(session(-150, 1, &OFFSETS, 206535))],
            ..FakeDisc::default()
        };
        let toc = extract(&disc);
        assert_eq!((1, 10), (toc.first, toc.last));
        assert_eq!(206535, toc.leadout());
        assert_eq!(&OFFSETS[..], toc.track_offsets());
        assert_eq!(0, toc.offsets[11]);
        assert_eq!(
            "1 10 206535 150 18901 39738 59557 79152 100126 124833 147278 166336 182560",
            toc.to_string()
        );
        assert_eq!(Features::READ, toc.features());
    }

    #[test]
    fn test_offsets_are_session_relative() {
        let disc = FakeDisc {
            sessions: vec![Some(session(1000, 1, &[150, 500], 900))],
            ..FakeDisc::default()
        };
        let toc = extract(&disc);
        assert_eq!(&[150, 500][..], toc.track_offsets());
        assert_eq!(900, toc.leadout());
    }

    #[test]
    fn test_isrc_and_mcn() {
        let mut session = session(-150, 1, &[150, 1000, 2000], 3000);
        if let Some(Some(track)) = session.tracks.get_mut(1) {
            track.isrc = Some("GBAYE0000351".to_string());
        }
        if let Some(Some(track)) = session.tracks.get_mut(2) {
            track.isrc = Some(String::new());
        }
        let disc = FakeDisc {
            mcn: Some("0724384260958".to_string()),
            sessions: vec![Some(session)],
        };
        let toc = extract(&disc);
        assert_eq!(1, toc.isrcs.len());
        assert_eq!(Some(&"GBAYE0000351".to_string()), toc.isrcs.get(&2));
        assert_eq!(Some("0724384260958".to_string()), toc.mcn);
        assert_eq!(Features::ALL, toc.features());
    }

    #[test]
    fn test_empty_mcn() {
        let disc = FakeDisc {
            mcn: Some(String::new()),
            sessions: vec![Some(session(-150, 1, &[150], 1000))],
        };
        assert_eq!(None, extract(&disc).mcn);
    }

    #[test]
    fn test_last_session_wins() {
        let disc = FakeDisc {
            sessions: vec![
                Some(session(-150, 1, &[150, 5000], 10000)),
                Some(session(21100, 3, &[150, 400, 800], 1200)),
            ],
            ..FakeDisc::default()
        };
        let toc = extract(&disc);
        assert_eq!((3, 5), (toc.first, toc.last));
        assert_eq!(1200, toc.leadout());
        assert_eq!(&[150, 400, 800][..], toc.track_offsets());
        // Entries of the first session are left in place.
        assert_eq!(&[150, 5000][..], &toc.offsets[1..3]);
    }

    #[test]
    fn test_unreadable_session_is_skipped() {
        let disc = FakeDisc {
            sessions: vec![Some(session(-150, 1, &[150, 5000], 10000)), None],
            ..FakeDisc::default()
        };
        let toc = extract(&disc);
        assert_eq!((1, 2), (toc.first, toc.last));
        assert_eq!(10000, toc.leadout());
    }

    #[test]
    fn test_unreadable_track_is_skipped() {
        let mut session = session(-150, 1, &[150, 1000, 2000], 3000);
        session.tracks[2] = None;
        let disc = FakeDisc {
            sessions: vec![Some(session)],
            ..FakeDisc::default()
        };
        let toc = extract(&disc);
        assert_eq!((1, 2), (toc.first, toc.last));
        assert_eq!(toc.last - toc.first + 1, 2);
        assert_eq!(0, toc.offsets[3]);
    }

    #[test]
    fn test_invalid_track_number_is_skipped() {
        let mut session = session(-150, 1, &[150, 1000], 3000);
        session.tracks.push(Some(track(100, 2000, 500, 0)));
        session.tracks.push(Some(track(0, 2500, 500, 0)));
        let disc = FakeDisc {
            sessions: vec![Some(session)],
            ..FakeDisc::default()
        };
        let toc = extract(&disc);
        assert_eq!((1, 2), (toc.first, toc.last));
        assert_eq!(3000, toc.leadout());
        assert_eq!(&[150, 1000][..], toc.track_offsets());
    }

    #[test]
    fn test_out_of_range_sectors_are_skipped() {
        let mut first = session(-150, 1, &[150, 1000], 3000);
        first.tracks.push(Some(track(3, i32::MAX - 10, 500, 150)));
        let second = session(i32::MIN, 4, &[150], 1000);
        let disc = FakeDisc {
            sessions: vec![Some(first), Some(second)],
            ..FakeDisc::default()
        };
        let toc = extract(&disc);
        assert_eq!((1, 2), (toc.first, toc.last));
        assert_eq!(3000, toc.leadout());
        assert_eq!(0, toc.offsets[3]);
        assert_eq!(0, toc.offsets[4]);
    }

    #[test]
    fn test_no_sessions() {
        let toc = extract(&FakeDisc::default());
        assert_eq!((0, 0, 0), (toc.first, toc.last, toc.leadout()));
        assert!(toc.track_offsets().is_empty());
        assert_eq!("0 0 0", toc.to_string());
    }
}
