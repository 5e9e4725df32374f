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

//! ISO9660 images: a single data track of 2048-byte sectors.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::ImageError;

use super::{has_extension, DiscBuilder, ImageDisc, ImageParser, TrackMode, TrackSpec};

const SECTOR_SIZE: u64 = 2048;
const DESCRIPTOR_SECTOR: u64 = 16;
const SIGNATURE: &[u8; 5] = b"CD001";

pub struct IsoParser;

impl ImageParser for IsoParser {
    fn name(&self) -> &'static str {
        "ISO"
    }

    fn can_load(&self, files: &[PathBuf]) -> bool {
        files.first().map_or(false, |f| has_extension(f, "iso"))
    }

    fn load(&self, files: &[PathBuf]) -> Result<ImageDisc, ImageError> {
        let path = files.first().ok_or(ImageError::NoFiles)?;
        let mut file = File::open(path).map_err(|e| ImageError::io(path, e))?;
        let size = file.metadata().map_err(|e| ImageError::io(path, e))?.len();
        let sectors = sector_count(path, size)?;

        let mut descriptor = [0u8; 6];
        let found = size >= (DESCRIPTOR_SECTOR + 1) * SECTOR_SIZE
            && file
                .seek(SeekFrom::Start(DESCRIPTOR_SECTOR * SECTOR_SIZE))
                .and_then(|_| file.read_exact(&mut descriptor))
                .is_ok()
            && &descriptor[1..] == SIGNATURE;
        if !found {
            return Err(ImageError::Corrupt(format!(
                "{}: no ISO9660 volume descriptor",
                path.display()
            )));
        }

        let mut builder = DiscBuilder::new();
        builder.add_track(TrackSpec::new(1, TrackMode::Mode1, sectors));
        builder.build()
    }
}

fn sector_count(path: &Path, size: u64) -> Result<i32, ImageError> {
    if size % SECTOR_SIZE != 0 {
        return Err(ImageError::Corrupt(format!(
            "{}: size {} is not a multiple of {} bytes",
            path.display(),
            size,
            SECTOR_SIZE
        )));
    }
    i32::try_from(size / SECTOR_SIZE).map_err(|_| {
        ImageError::Corrupt(format!("{}: {} sectors do not fit on a disc", path.display(), size / SECTOR_SIZE))
    })
}
