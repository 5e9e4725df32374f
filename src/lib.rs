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

//! Calculate MusicBrainz disc IDs from CD images.
//!
//! An image is opened with an [`ImageLoader`], its table of contents is read
//! by [`toc::extract`], and the resulting offsets are handed to a
//! [`DiscIdentifier`] (libdiscid by default):
//!
//! ```no_run
//! use std::path::PathBuf;
//! use image_id::{identify, ImageLoader, LibDiscId};
//!
//! let disc = ImageLoader::default().load(&[PathBuf::from("album.cue")])?;
//! let report = identify(&disc, &LibDiscId)?;
//! println!("{}", report.ids.id);
//! # Ok::<(), image_id::Error>(())
//! ```

#[macro_use]
extern crate bitflags;
// Locates and links the native libdiscid.
extern crate discid_sys;

pub mod discid;
pub mod error;
pub mod identifier;
pub mod image;
pub mod report;
pub mod toc;

pub use crate::discid::{DiscId, Features};
pub use crate::error::{Error, IdentifierError, ImageError};
pub use crate::identifier::{DiscIdentifier, DiscIds, LibDiscId};
pub use crate::image::{Disc, ImageLoader};
pub use crate::report::Report;
pub use crate::toc::Toc;

/// Reads the TOC of `disc` and computes its identifiers.
pub fn identify(disc: &dyn Disc, identifier: &dyn DiscIdentifier) -> Result<Report, Error> {
    let toc = toc::extract(disc);
    let ids = identifier.identify(toc.first, toc.last, &toc.offsets)?;
    Ok(Report { ids, toc })
}
