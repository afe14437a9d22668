use crate::error::ErrorCode;
use crate::util::parse_int;

pub const COMMAND_SEPARATOR: char = '>';
pub const ACTION_SEPARATOR: char = ';';
pub const VALUE_SEPARATOR: char = '_';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandCode {
    Move,
    Check,
    SetVel,
    SetAcc,
    Toggle,
    Calibrate,
    State,
    Steps,
    Params,
    CalState,
    Unknown,
}

impl CommandCode {
    /// Case-sensitive match against the protocol's command names.
    pub fn parse(code: &str) -> Self {
        match code {
            "MOVE" => CommandCode::Move,
            "CHECK" => CommandCode::Check,
            "SETVEL" => CommandCode::SetVel,
            "SETACC" => CommandCode::SetAcc,
            "TOGGLE" => CommandCode::Toggle,
            "CALIBRATE" => CommandCode::Calibrate,
            "STATE" => CommandCode::State,
            "STEPS" => CommandCode::Steps,
            "PARAMS" => CommandCode::Params,
            "CALSTATE" => CommandCode::CalState,
            _ => CommandCode::Unknown,
        }
    }
}

/// One protocol line split at the first `>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Command<'a> {
    pub code: CommandCode,
    pub arguments: &'a str,
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Result<Self, ErrorCode> {
        let (code, arguments) = line
            .trim()
            .split_once(COMMAND_SEPARATOR)
            .ok_or(ErrorCode::CommandFormat)?;

        Ok(Command {
            code: CommandCode::parse(code),
            arguments,
        })
    }

    /// Argument of `SETVEL` / `SETACC`.
    pub fn integer_argument(&self) -> i32 {
        parse_int(self.arguments)
    }

    /// Argument of `MOVE` / `TOGGLE`.
    pub fn actions(&self) -> Result<Actions<'a>, ErrorCode> {
        Actions::parse(self.arguments)
    }

    /// Argument of `CALIBRATE`.
    pub fn joints(&self) -> Result<JointList<'a>, ErrorCode> {
        JointList::parse(self.arguments)
    }
}

/// `J<index>_<value>` with the value left raw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Action<'a> {
    pub joint: i32,
    pub value: &'a str,
}

impl<'a> Action<'a> {
    fn parse(segment: &'a str) -> Option<Self> {
        let (joint, value) = segment.split_once(VALUE_SEPARATOR)?;

        Some(Action {
            joint: parse_joint(joint),
            value,
        })
    }
}

/// `J<digits>`; anything else becomes index 0, which no joint owns.
fn parse_joint(token: &str) -> i32 {
    match token.trim().strip_prefix('J') {
        Some(digits) => parse_int(digits),
        None => 0,
    }
}

/// Non-empty segments of a `;`-delimited list, trailing segment excluded.
#[derive(Clone, Debug)]
struct Segments<'a> {
    rest: &'a str,
}

impl<'a> Segments<'a> {
    fn parse(arguments: &'a str) -> Result<Self, ErrorCode> {
        if !arguments.contains(ACTION_SEPARATOR) {
            return Err(ErrorCode::CommandFormat);
        }

        Ok(Segments { rest: arguments })
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        loop {
            let (segment, rest) = self.rest.split_once(ACTION_SEPARATOR)?;
            self.rest = rest;
            if !segment.trim().is_empty() {
                return Some(segment);
            }
        }
    }
}

/// Actions of a `MOVE` or `TOGGLE` list; segments without `_` are skipped.
#[derive(Clone, Debug)]
pub struct Actions<'a> {
    segments: Segments<'a>,
}

impl<'a> Actions<'a> {
    pub fn parse(arguments: &'a str) -> Result<Self, ErrorCode> {
        Ok(Actions {
            segments: Segments::parse(arguments)?,
        })
    }
}

impl<'a> Iterator for Actions<'a> {
    type Item = Action<'a>;

    fn next(&mut self) -> Option<Action<'a>> {
        self.segments.by_ref().find_map(Action::parse)
    }
}

/// Joint indices of a `CALIBRATE` list: `J3;` or `J3_<anything>;`.
#[derive(Clone, Debug)]
pub struct JointList<'a> {
    segments: Segments<'a>,
}

impl<'a> JointList<'a> {
    pub fn parse(arguments: &'a str) -> Result<Self, ErrorCode> {
        Ok(JointList {
            segments: Segments::parse(arguments)?,
        })
    }
}

impl Iterator for JointList<'_> {
    type Item = i32;

    fn next(&mut self) -> Option<i32> {
        let segment = self.segments.next()?;
        let joint = match segment.split_once(VALUE_SEPARATOR) {
            Some((joint, _)) => joint,
            None => segment,
        };

        Some(parse_joint(joint))
    }
}
