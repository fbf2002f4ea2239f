// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fake implementations of the host, for use in tests.
//!
//! [FakeExecutor] runs no processes. Callers either script the exact
//! commands they expect with a [CommandSequence], or attach a [FakeHost],
//! which parses each command and updates a simulated view of the machine
//! (services, block devices, mounts, and the container runtime).

mod executor;
mod host;

pub use executor::*;
pub use host::*;
