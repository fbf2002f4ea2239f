// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::host::parse::InputParser;

use host_exec::Input;
use host_exec::MKFS;

/// `mkfs -t <fstype> <device>`
pub(crate) struct Command {
    pub fs_type: String,
    pub device: String,
}

impl TryFrom<Input> for Command {
    type Error = String;

    fn try_from(input: Input) -> Result<Self, Self::Error> {
        if input.program != MKFS {
            return Err(format!("Not mkfs command: {}", input.program));
        }

        let mut input = InputParser::new(input);
        input.shift_arg_expect("-t")?;
        let fs_type = input.shift_arg()?;
        let device = input.shift_arg()?;
        input.no_args_remaining()?;
        Ok(Command { fs_type, device })
    }
}
