// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::host::parse::InputParser;

use host_exec::Input;
use host_exec::{FINDMNT, MOUNT, MOUNTPOINT};

pub(crate) enum Command {
    /// `mount -t <fstype> <device> <target>`
    Mount { fs_type: String, device: String, target: String },
    /// `mountpoint -q <target>`
    IsMountpoint { target: String },
    /// `findmnt -n -o SOURCE <target>`
    Source { target: String },
}

impl TryFrom<Input> for Command {
    type Error = String;

    fn try_from(input: Input) -> Result<Self, Self::Error> {
        let program = input.program.clone();
        let mut input = InputParser::new(input);
        match program.as_str() {
            MOUNT => {
                input.shift_arg_expect("-t")?;
                let fs_type = input.shift_arg()?;
                let device = input.shift_arg()?;
                let target = input.shift_arg()?;
                input.no_args_remaining()?;
                Ok(Command::Mount { fs_type, device, target })
            }
            MOUNTPOINT => {
                input.shift_arg_expect("-q")?;
                let target = input.shift_arg()?;
                input.no_args_remaining()?;
                Ok(Command::IsMountpoint { target })
            }
            FINDMNT => {
                input.shift_arg_expect("-n")?;
                input.shift_arg_expect("-o")?;
                input.shift_arg_expect("SOURCE")?;
                let target = input.shift_arg()?;
                input.no_args_remaining()?;
                Ok(Command::Source { target })
            }
            _ => Err(format!("Not mount command: {program}")),
        }
    }
}
