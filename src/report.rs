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

//! Result output.

use std::fmt;

use crate::identifier::DiscIds;
use crate::toc::Toc;

/// The IDs of a disc together with the TOC they were computed from.
/// `Display` renders the text printed on stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub ids: DiscIds,
    pub toc: Toc,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.ids.id)?;
        writeln!(f, "FreeDB: {}", self.ids.freedb_id)?;
        writeln!(f, "{}", self.ids.submission_url)?;

        for (track, isrc) in &self.toc.isrcs {
            writeln!(f, "Track #{} ISRC: {}", track, isrc)?;
        }
        if let Some(mcn) = &self.toc.mcn {
            writeln!(f, "MCN: {}", mcn)?;
        }
        Ok(())
    }
}
