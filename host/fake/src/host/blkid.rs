// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::host::parse::InputParser;

use host_exec::Input;
use host_exec::BLKID;

pub(crate) enum Tag {
    Type,
    Uuid,
}

/// `blkid -o value -s <TAG> <device>`
pub(crate) struct Command {
    pub tag: Tag,
    pub device: String,
}

impl TryFrom<Input> for Command {
    type Error = String;

    fn try_from(input: Input) -> Result<Self, Self::Error> {
        if input.program != BLKID {
            return Err(format!("Not blkid command: {}", input.program));
        }

        let mut input = InputParser::new(input);
        input.shift_arg_expect("-o")?;
        input.shift_arg_expect("value")?;
        input.shift_arg_expect("-s")?;
        let tag = match input.shift_arg()?.as_str() {
            "TYPE" => Tag::Type,
            "UUID" => Tag::Uuid,
            tag => return Err(format!("Unsupported tag: {tag}")),
        };
        let device = input.shift_arg()?;
        input.no_args_remaining()?;
        Ok(Command { tag, device })
    }
}
