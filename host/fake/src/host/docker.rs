// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::host::parse::InputParser;

use host_exec::Input;
use host_exec::DOCKER;

pub(crate) enum Command {
    /// `docker info --format '{{json .}}'`
    Info,
}

impl TryFrom<Input> for Command {
    type Error = String;

    fn try_from(input: Input) -> Result<Self, Self::Error> {
        if input.program != DOCKER {
            return Err(format!("Not docker command: {}", input.program));
        }

        let mut input = InputParser::new(input);
        match input.shift_arg()?.as_str() {
            "info" => {
                input.shift_arg_expect("--format")?;
                input.shift_arg_expect("{{json .}}")?;
                input.no_args_remaining()?;
                Ok(Command::Info)
            }
            command => Err(format!("Unexpected command: {command}")),
        }
    }
}
