// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Boot-time preparation of a CI runner host.
//!
//! The [`Bootstrap`] sequence writes the orchestrator agent's cluster-join
//! configuration, moves the container runtime's data root onto a dedicated
//! block device, starts the runtime once it can use that device, hands off
//! to the orchestrator agent, and optionally installs a recurring disk
//! cleanup job.

pub mod agent;
pub mod cleanup;
pub mod cmd;
pub mod config;
pub mod host;
pub mod logging;
pub mod poll;
pub mod runtime;
pub mod sequence;
pub mod storage;

pub use config::Config;
pub use host::HostPaths;
pub use sequence::{
    Bootstrap, BootstrapError, BootstrapReport, BootstrapStep, CleanupOutcome,
};
