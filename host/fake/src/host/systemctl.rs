// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::host::parse::InputParser;

use host_exec::Input;
use host_exec::SYSTEMCTL;

pub(crate) enum Command {
    DaemonReload,
    /// `disable --now`: stop and disable.
    Disable { unit: String },
    /// `enable --now`, optionally without waiting for the start job.
    Enable { unit: String, no_block: bool },
}

impl TryFrom<Input> for Command {
    type Error = String;

    fn try_from(input: Input) -> Result<Self, Self::Error> {
        if input.program != SYSTEMCTL {
            return Err(format!("Not systemctl command: {}", input.program));
        }

        let mut input = InputParser::new(input);

        match input.shift_arg()?.as_str() {
            "daemon-reload" => {
                input.no_args_remaining()?;
                Ok(Command::DaemonReload)
            }
            "disable" => {
                input.shift_arg_expect("--now")?;
                let unit = input.shift_arg()?;
                input.no_args_remaining()?;
                Ok(Command::Disable { unit })
            }
            "enable" => {
                input.shift_arg_expect("--now")?;
                let no_block = input.shift_arg_if("--no-block")?;
                let unit = input.shift_arg()?;
                input.no_args_remaining()?;
                Ok(Command::Enable { unit, no_block })
            }
            command => Err(format!("Unexpected command: {command}")),
        }
    }
}
