// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interfaces used to run commands on a Linux runner host.
//!
//! Everything that touches the host goes through an [Executor], so that the
//! same code can drive a real machine ([HostExecutor]) or a simulated one
//! under test.

mod error;
mod executor;
mod input;
mod output;

pub use error::*;
pub use executor::*;
pub use input::*;
pub use output::*;

pub const SYSTEMCTL: &str = "/usr/bin/systemctl";
pub const BLKID: &str = "/usr/sbin/blkid";
pub const MKFS: &str = "/usr/sbin/mkfs";
pub const MOUNT: &str = "/usr/bin/mount";
pub const MOUNTPOINT: &str = "/usr/bin/mountpoint";
pub const FINDMNT: &str = "/usr/bin/findmnt";
pub const DOCKER: &str = "/usr/bin/docker";
