// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Lines of the static filesystem table (`/etc/fstab`).

use std::fmt;

/// A single fstab entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FstabEntry {
    pub source: String,
    pub target: String,
    pub fs_type: String,
    pub options: String,
    pub dump: u8,
    pub pass: u8,
}

impl FstabEntry {
    /// An entry for a secondary data filesystem identified by UUID.
    ///
    /// `nofail` keeps the host booting if the volume goes missing, and pass
    /// 2 schedules the check after the root filesystem.
    pub fn data_volume(uuid: &str, target: &str, fs_type: &str) -> Self {
        Self {
            source: format!("UUID={uuid}"),
            target: target.to_string(),
            fs_type: fs_type.to_string(),
            options: "defaults,nofail".to_string(),
            dump: 0,
            pass: 2,
        }
    }

    pub fn to_fstab(&self) -> String {
        format!(
            "{} {} {} {} {} {}",
            self.source,
            self.target,
            self.fs_type,
            self.options,
            self.dump,
            self.pass
        )
    }
}

impl fmt::Display for FstabEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_fstab())
    }
}

/// Returns true if any active (uncommented) line of `contents` mentions
/// `uuid`.
pub fn mentions_uuid(contents: &str, uuid: &str) -> bool {
    contents
        .lines()
        .map(str::trim_start)
        .filter(|line| !line.starts_with('#'))
        .any(|line| line.contains(uuid))
}
