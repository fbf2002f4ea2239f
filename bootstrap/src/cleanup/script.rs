// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The disk cleanup script run by the scheduled job.

use camino::Utf8Path;
use host_exec::DOCKER;

/// Renders the cleanup script.
///
/// Each run appends timestamped start and finish lines, plus the output of
/// every prune, to `log_path`. Stopped containers, images and networks are
/// only pruned once they are older than `prune_age_hours`. Volumes have no
/// creation-time filter, so every unused volume goes.
pub fn render(log_path: &Utf8Path, prune_age_hours: u32) -> String {
    format!(
        r#"#!/bin/sh
# Prunes container runtime data that no job is using.
set -u

LOG="{log_path}"
AGE="{prune_age_hours}h"

log() {{
    echo "$(date -u '+%Y-%m-%dT%H:%M:%SZ') $*" >> "$LOG"
}}

log "cleanup started (age threshold $AGE)"
{DOCKER} container prune --force --filter "until=$AGE" >> "$LOG" 2>&1
{DOCKER} image prune --all --force --filter "until=$AGE" >> "$LOG" 2>&1
{DOCKER} network prune --force --filter "until=$AGE" >> "$LOG" 2>&1
{DOCKER} volume prune --force >> "$LOG" 2>&1
log "cleanup finished"
"#
    )
}
