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

//! Error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of the image side: opening/parsing an image, and fetching
/// sessions or tracks from an opened disc.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("no image files given")]
    NoFiles,

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no parser can handle {}", .0.display())]
    Unsupported(PathBuf),

    #[error("{}:{line}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Structurally invalid image or disc.
    #[error("{0}")]
    Corrupt(String),

    #[error("session index {0} out of range")]
    SessionIndex(usize),

    #[error("track index {0} out of range")]
    TrackIndex(usize),
}

impl ImageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ImageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failures reported by the disc ID library.
#[derive(Debug, Error)]
pub enum IdentifierError {
    #[error("{0}")]
    Rejected(String),
}

/// Errors that end the program.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Cannot open image: {0}")]
    ImageOpen(#[from] ImageError),

    #[error("Cannot calculate disc ID: {0}")]
    Identifier(#[from] IdentifierError),
}
