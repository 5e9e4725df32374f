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

//! Disc image model and loading.
//!
//! A loaded image is exposed as a [`Disc`] handle. Sessions are fetched by
//! index and released when the returned box is dropped; tracks are plain
//! values read out of their session.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ImageError;

pub mod cue;
pub mod iso;
pub mod layout;

pub use layout::{DiscBuilder, ImageDisc, ImageSession, TrackSpec};

/// Data layout of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackMode {
    Audio,
    Mode1,
    Mode2,
    Cdi,
}

impl TrackMode {
    pub fn is_audio(self) -> bool {
        self == TrackMode::Audio
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionType {
    CdDa,
    CdRom,
    CdI,
    CdRomXa,
}

impl SessionType {
    /// Derives the session type from the modes of its tracks.
    pub fn from_modes<I: IntoIterator<Item = TrackMode>>(modes: I) -> SessionType {
        let mut session_type = SessionType::CdDa;
        for mode in modes {
            session_type = match (session_type, mode) {
                (_, TrackMode::Cdi) | (SessionType::CdI, _) => SessionType::CdI,
                (_, TrackMode::Mode2) | (SessionType::CdRomXa, _) => SessionType::CdRomXa,
                (_, TrackMode::Mode1) | (SessionType::CdRom, _) => SessionType::CdRom,
                (SessionType::CdDa, TrackMode::Audio) => SessionType::CdDa,
            };
        }
        session_type
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionType::CdDa => "CD-DA",
            SessionType::CdRom => "CD-ROM",
            SessionType::CdI => "CD-I",
            SessionType::CdRomXa => "CD-ROM XA",
        };
        f.write_str(name)
    }
}

/// Position of a session on the disc, in sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLayout {
    pub number: i32,
    pub first_track: i32,
    pub start_sector: i32,
    pub length: i32,
}

/// A track as read from its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub number: i32,
    pub mode: TrackMode,
    /// Absolute sector where the track, pregap included, begins.
    pub start_sector: i32,
    pub length: i32,
    /// Offset of INDEX 01 within the track.
    pub track_start: i32,
    /// Number of indices after INDEX 01.
    pub indices: usize,
    pub isrc: Option<String>,
}

/// Handle to an opened disc image.
pub trait Disc {
    /// Media catalog number, if the image recorded one.
    fn mcn(&self) -> Option<&str>;

    fn number_of_sessions(&self) -> usize;

    fn session_by_index(&self, index: usize) -> Result<Box<dyn Session + '_>, ImageError>;
}

pub trait Session {
    fn layout(&self) -> SessionLayout;

    fn session_type(&self) -> SessionType;

    fn leadout_length(&self) -> i32;

    fn number_of_tracks(&self) -> usize;

    fn track_by_index(&self, index: usize) -> Result<Track, ImageError>;
}

impl<S: Session + ?Sized> Session for &S {
    fn layout(&self) -> SessionLayout {
        (**self).layout()
    }

    fn session_type(&self) -> SessionType {
        (**self).session_type()
    }

    fn leadout_length(&self) -> i32 {
        (**self).leadout_length()
    }

    fn number_of_tracks(&self) -> usize {
        (**self).number_of_tracks()
    }

    fn track_by_index(&self, index: usize) -> Result<Track, ImageError> {
        (**self).track_by_index(index)
    }
}

/// One image format.
pub trait ImageParser {
    fn name(&self) -> &'static str;

    /// Whether this parser recognizes the given files. The first file is the
    /// image itself; the rest are parts it may reference.
    fn can_load(&self, files: &[PathBuf]) -> bool;

    fn load(&self, files: &[PathBuf]) -> Result<ImageDisc, ImageError>;
}

/// Picks a parser for a list of image files and loads them.
pub struct ImageLoader {
    parsers: Vec<Box<dyn ImageParser>>,
}

impl Default for ImageLoader {
    fn default() -> Self {
        ImageLoader {
            parsers: vec![Box::new(cue::CueParser), Box::new(iso::IsoParser)],
        }
    }
}

impl ImageLoader {
    pub fn with_parsers(parsers: Vec<Box<dyn ImageParser>>) -> Self {
        ImageLoader { parsers }
    }

    pub fn load(&self, files: &[PathBuf]) -> Result<ImageDisc, ImageError> {
        let first = files.first().ok_or(ImageError::NoFiles)?;
        std::fs::metadata(first).map_err(|e| ImageError::io(first, e))?;

        let parser = self
            .parsers
            .iter()
            .find(|p| p.can_load(files))
            .ok_or_else(|| ImageError::Unsupported(first.clone()))?;
        debug!("loading {} with the {} parser", first.display(), parser.name());
        parser.load(files)
    }
}

/// Case-insensitive extension check.
pub(crate) fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| e.eq_ignore_ascii_case(extension))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_session_type_from_modes() {
        use TrackMode::*;
        assert_eq!(SessionType::CdDa, SessionType::from_modes(vec![Audio, Audio]));
        assert_eq!(SessionType::CdRom, SessionType::from_modes(vec![Mode1, Audio]));
        assert_eq!(SessionType::CdRomXa, SessionType::from_modes(vec![Audio, Mode2, Mode1]));
        assert_eq!(SessionType::CdI, SessionType::from_modes(vec![Cdi, Audio]));
        assert_eq!(SessionType::CdDa, SessionType::from_modes(Vec::new()));
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension(Path::new("disc.CUE"), "cue"));
        assert!(has_extension(Path::new("/a/b/disc.iso"), "iso"));
        assert!(!has_extension(Path::new("disc.bin"), "cue"));
        assert!(!has_extension(Path::new("cue"), "cue"));
    }

    #[test]
    fn test_load_without_files() {
        let err = ImageLoader::default().load(&[]).unwrap_err();
        assert!(matches!(err, ImageError::NoFiles));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.cue");
        let err = ImageLoader::default().load(&[path.clone()]).unwrap_err();
        match err {
            ImageError::Io { path: p, source } => {
                assert_eq!(path, p);
                assert_eq!(std::io::ErrorKind::NotFound, source.kind());
            }
            e => panic!("unexpected error {:?}", e),
        }
    }

    #[test]
    fn test_load_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disc.nrg");
        fs::write(&path, b"NERO").unwrap();
        let err = ImageLoader::default().load(&[path.clone()]).unwrap_err();
        assert!(matches!(err, ImageError::Unsupported(p) if p == path));
    }

    #[test]
    fn test_load_dispatches_to_parser() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disc.iso");
        let file = fs::File::create(&path).unwrap();
        file.set_len(2048 * 20).unwrap();
        drop(file);

        // No ISO parser registered: the file is left unrecognized.
        let loader = ImageLoader::with_parsers(vec![Box::new(cue::CueParser)]);
        assert!(matches!(loader.load(&[path.clone()]), Err(ImageError::Unsupported(_))));

        // Registered, but the volume descriptor is missing.
        let err = ImageLoader::default().load(&[path]).unwrap_err();
        assert!(matches!(err, ImageError::Corrupt(_)));
    }
}
