//! Remote-control command parsing.
//!
//! One line, one command: `<command> <key>=<value>[,<key>=<value>...]`.
//!
//! Commands: `enable`, `enable_random`, `enable_stack_by_name`, `disable`.
//! Options:
//!
//! | option         | type             | default             |
//! |----------------|------------------|---------------------|
//! | `name`         | string           | required            |
//! | `failnum`      | integer          | 1                   |
//! | `failinfo`     | unsigned decimal | 0                   |
//! | `probability`  | float in [0, 1]  | -1 (always)         |
//! | `func_name`    | string           | required for stacks |
//! | `pos_in_stack` | integer          | -1 (any frame)      |
//! | `onetime`      | bare flag        | off                 |
//!
//! Parsing is a pure function of the line; [`rc_string`] parses and then
//! dispatches, which is all the FIFO transport does per request.

use crate::errors::{ControlError, Error};
use crate::guard::RecGuard;
use crate::point::{FailInfo, PointFlags};
use crate::registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Enable,
    EnableRandom,
    EnableStackByName,
    Disable,
}

#[derive(Debug)]
struct Command {
    op: Op,
    name: String,
    failnum: i32,
    failinfo: FailInfo,
    probability: f64,
    func_name: Option<String>,
    pos_in_stack: i32,
    flags: PointFlags,
}

fn parse(line: &str) -> Result<Command, ControlError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (op_word, params) = match line.split_once(' ') {
        Some((word, rest)) => (word, rest),
        None => (line, ""),
    };
    let op = match op_word {
        "" => return Err(ControlError::Empty),
        "enable" => Op::Enable,
        "enable_random" => Op::EnableRandom,
        "enable_stack_by_name" => Op::EnableStackByName,
        "disable" => Op::Disable,
        other => return Err(ControlError::UnknownCommand(other.to_owned())),
    };

    let mut name = None;
    let mut failnum = 1i32;
    let mut failinfo: FailInfo = 0;
    let mut probability = -1.0f64;
    let mut func_name = None;
    let mut pos_in_stack = -1i32;
    let mut flags = PointFlags::empty();

    for part in params.split(',').filter(|part| !part.is_empty()) {
        let Some((key, value)) = part.split_once('=') else {
            if part == "onetime" {
                flags |= PointFlags::ONETIME;
                continue;
            }
            return Err(ControlError::UnknownOption(part.to_owned()));
        };
        match key {
            "name" => name = Some(value.to_owned()),
            "failnum" => failnum = parse_value("failnum", value)?,
            "failinfo" => failinfo = parse_value("failinfo", value)?,
            "probability" => {
                probability = parse_value("probability", value)?;
                if !(0.0..=1.0).contains(&probability) {
                    return Err(ControlError::BadValue {
                        option: "probability",
                        value: value.to_owned(),
                    });
                }
            }
            "func_name" => func_name = Some(value.to_owned()),
            "pos_in_stack" => pos_in_stack = parse_value("pos_in_stack", value)?,
            _ => return Err(ControlError::UnknownOption(key.to_owned())),
        }
    }

    let name = name.ok_or(ControlError::MissingName)?;
    if op == Op::EnableStackByName && func_name.is_none() {
        return Err(ControlError::MissingOption("func_name"));
    }

    Ok(Command {
        op,
        name,
        failnum,
        failinfo,
        probability,
        func_name,
        pos_in_stack,
        flags,
    })
}

fn parse_value<T: std::str::FromStr>(
    option: &'static str,
    value: &str,
) -> Result<T, ControlError> {
    value.parse().map_err(|_| ControlError::BadValue {
        option,
        value: value.to_owned(),
    })
}

fn dispatch(cmd: &Command) -> Result<(), Error> {
    match cmd.op {
        Op::Disable => registry::disable(&cmd.name),
        Op::Enable => registry::enable(&cmd.name, cmd.failnum, cmd.failinfo, cmd.flags),
        Op::EnableRandom => registry::enable_random(
            &cmd.name,
            cmd.failnum,
            cmd.failinfo,
            cmd.flags,
            cmd.probability,
        ),
        Op::EnableStackByName => registry::enable_stack_by_name(
            &cmd.name,
            cmd.failnum,
            cmd.failinfo,
            cmd.flags,
            cmd.func_name
                .as_deref()
                .expect("func_name presence is checked at parse time"),
            cmd.pos_in_stack,
        ),
    }
}

/// Parses and runs one control line, exactly as the FIFO worker does for
/// each request. Exposed so tooling can drive the control interface without
/// any I/O involved.
pub fn rc_string(line: &str) -> Result<(), ControlError> {
    let _rec = RecGuard::pin();
    let cmd = parse(line)?;
    dispatch(&cmd).map_err(ControlError::from)
}
