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

//! Disc ID computation behind a replaceable interface.

use crate::discid::DiscId;
use crate::error::IdentifierError;
use crate::toc::MAX_TRACKS;

/// Identifiers computed for one TOC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscIds {
    /// MusicBrainz disc ID.
    pub id: String,
    pub freedb_id: String,
    pub submission_url: String,
    pub toc_string: String,
}

pub trait DiscIdentifier {
    fn identify(&self, first: i32, last: i32, offsets: &[i32; MAX_TRACKS]) -> Result<DiscIds, IdentifierError>;
}

/// Computes IDs with the native libdiscid library.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibDiscId;

impl DiscIdentifier for LibDiscId {
    fn identify(&self, first: i32, last: i32, offsets: &[i32; MAX_TRACKS]) -> Result<DiscIds, IdentifierError> {
        let disc = DiscId::put(first, last, offsets)?;
        Ok(DiscIds {
            id: disc.get_id(),
            freedb_id: disc.get_freedb_id(),
            submission_url: disc.get_submission_url(),
            toc_string: disc.get_toc_string(),
        })
    }
}
