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

//! Binding to the native libdiscid library.
//!
//! Only the "put" side of libdiscid is bound here: a TOC read from an image is
//! handed to the library, which computes the MusicBrainz and FreeDB IDs.

use std::ffi::CStr;
use std::os::raw::c_char;
use libc::{c_int, c_uint, size_t};

use crate::error::IdentifierError;
use crate::toc::MAX_TRACKS;

#[link(name = "discid")]
extern "C" {
    fn discid_new() -> *const size_t;
    fn discid_free(disc: *const size_t);
    fn discid_put(disc: *const size_t, first: c_int, last: c_int, offsets: *const c_int) -> c_int;
    fn discid_get_error_msg(disc: *const size_t) -> *const c_char;
    fn discid_get_id (disc: *const size_t) -> *const c_char;
    fn discid_get_freedb_id (disc: *const size_t) -> *const c_char;
    fn discid_get_toc_string (disc: *const size_t) -> *const c_char;
    fn discid_get_submission_url (disc: *const size_t) -> *const c_char;
    fn discid_get_first_track_num (disc: *const size_t) -> c_int;
    fn discid_get_last_track_num (disc: *const size_t) -> c_int;
    fn discid_get_sectors (disc: *const size_t) -> c_int;
    fn discid_get_track_offset (disc: *const size_t, track_num: c_int) -> c_int;
    fn discid_get_track_length (disc: *const size_t, track_num: c_int) -> c_int;
    fn discid_has_feature(feature: c_uint) -> c_int;
    fn discid_get_version_string() -> *const c_char;
}

bitflags! {
    /// Kinds of disc data. An image always provides `READ` (the TOC);
    /// `MCN` and `ISRC` depend on what the image format recorded.
    pub struct Features: u32 {
        const READ = 1 << 0;
        const MCN  = 1 << 1;
        const ISRC = 1 << 2;
        const ALL  = Self::READ.bits | Self::MCN.bits | Self::ISRC.bits;
    }
}

/// A libdiscid handle holding one TOC.
pub struct DiscId {
    disc: *const size_t,
}

impl DiscId {
    fn new() -> DiscId {
        let disc = unsafe { discid_new() };
        DiscId { disc }
    }

    /// Submits a TOC. `offsets[0]` is the lead-out, `offsets[first..=last]`
    /// the track offsets; the remaining entries are not read.
    pub fn put(first: i32, last: i32, offsets: &[i32; MAX_TRACKS]) -> Result<DiscId, IdentifierError> {
        let disc = DiscId::new();
        let status = unsafe { discid_put(disc.disc, first, last, offsets.as_ptr()) };
        if status == 0 {
            Err(IdentifierError::Rejected(disc.get_error_msg()))
        } else {
            Ok(disc)
        }
    }

    pub fn has_feature(feature: Features) -> bool {
        let result = unsafe { discid_has_feature(feature.bits()) };
        result == 1
    }

    pub fn get_version_string() -> String {
        let str_ptr = unsafe { discid_get_version_string() };
        to_str(str_ptr)
    }

    pub fn get_error_msg(&self) -> String {
        let str_ptr = unsafe { discid_get_error_msg(self.disc) };
        to_str(str_ptr)
    }

    /// The MusicBrainz disc ID.
    pub fn get_id(&self) -> String {
        let str_ptr = unsafe { discid_get_id(self.disc) };
        to_str(str_ptr)
    }

    pub fn get_freedb_id(&self) -> String {
        let str_ptr = unsafe { discid_get_freedb_id(self.disc) };
        to_str(str_ptr)
    }

    pub fn get_toc_string(&self) -> String {
        let str_ptr = unsafe { discid_get_toc_string(self.disc) };
        to_str(str_ptr)
    }

    pub fn get_submission_url(&self) -> String {
        let str_ptr = unsafe { discid_get_submission_url(self.disc) };
        to_str(str_ptr)
    }

    pub fn get_first_track_num(&self) -> i32 {
        unsafe { discid_get_first_track_num(self.disc) }
    }

    pub fn get_last_track_num(&self) -> i32 {
        unsafe { discid_get_last_track_num(self.disc) }
    }

    pub fn get_sectors(&self) -> i32 {
        unsafe { discid_get_sectors(self.disc) }
    }

    pub fn get_track_offset(&self, track_num: i32) -> i32 {
        unsafe { discid_get_track_offset(self.disc, track_num) }
    }

    pub fn get_track_length(&self, track_num: i32) -> i32 {
        unsafe { discid_get_track_length(self.disc, track_num) }
    }
}

impl Drop for DiscId {
    fn drop(&mut self) {
        unsafe { discid_free(self.disc) }
    }
}

fn to_str(c_buf: *const c_char) -> String {
    if c_buf.is_null() {
        return String::new();
    }
    let c_str: &CStr = unsafe { CStr::from_ptr(c_buf) };
    c_str.to_string_lossy().into_owned()
}
