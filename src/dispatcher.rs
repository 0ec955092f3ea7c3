//! Top-level command dispatch: one response line per command line.

use crate::antgroup::{
    is_valid_ant_list, AntGroup, GroupTarget, ANTGROUP_TOKEN, AUTOSELECT_ANTS_TEST_LIST,
};
use crate::beamformer;
use crate::pointing::CoordSystem;
use crate::protocol::{
    check_range, parse_value, render_result, CommandError, CommandKind, CommandLine,
    CommandResult, ErrorKind, Reply,
};
use crate::state::ArrayState;
use crate::subarray::{DriveModel, SubarrayModel};
use crate::tuning::TuningId;
use std::sync::Arc;
use tracing::{debug, info};

pub const MAX_MONITOR_PERIOD_SECS: i32 = 99_999;

type Handler = fn(&ArrayState, &CommandLine) -> CommandResult;

fn handler_for(kind: CommandKind) -> Handler {
    match kind {
        CommandKind::Allocate
        | CommandKind::Deallocate
        | CommandKind::LnaOn
        | CommandKind::PamSet => accept,
        CommandKind::Stop | CommandKind::Stow => stop,
        CommandKind::Point => point,
        CommandKind::Tune => tune,
        CommandKind::Attn => attn,
        CommandKind::Zfocus => zfocus,
        CommandKind::Wrap => wrap,
        CommandKind::Monitor => monitor,
        CommandKind::AntGroup => antgroup,
        CommandKind::Beamformer => beamformer::dispatch,
    }
}

/// Parses command lines and applies them to the shared array state.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    state: Arc<ArrayState>,
}

impl Dispatcher {
    pub fn new(state: Arc<ArrayState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<ArrayState> {
        &self.state
    }

    /// Execute one command line and return the response line, without a
    /// terminator.
    pub fn dispatch(&self, line: &str) -> String {
        render_result(&self.execute(line))
    }

    pub fn execute(&self, line: &str) -> CommandResult {
        let command = CommandLine::parse(line);
        match command.primary() {
            Some(kind) => {
                debug!("dispatching {:?} ({} words)", kind, command.len());
                handler_for(kind)(&self.state, &command)
            }
            None => Err(CommandError::with_context(
                ErrorKind::UnrecognizedCommand,
                format!(": {}", command.original()),
            )),
        }
    }
}

/// Antenna list named by `token`: the given `group` when the token is
/// `ANTGROUP`, otherwise the token itself after validation.
pub(crate) fn resolve_ant_list(
    state: &ArrayState,
    token: &str,
    group: AntGroup,
    context: &str,
) -> Result<String, CommandError> {
    if token == ANTGROUP_TOKEN {
        let list = state.antgroups.raw_list(group);
        if list.is_empty() {
            return Err(CommandError::with_context(ErrorKind::AntGroupUnassigned, context));
        }
        Ok(list)
    } else if is_valid_ant_list(token) {
        Ok(token.to_owned())
    } else {
        Err(CommandError::with_context(ErrorKind::InvalidAntList, context))
    }
}

/// Run `f` on every subarray addressed by `ant_token`, in beam order,
/// stopping at the first failure. Models already changed stay changed.
fn for_each_subarray<F>(state: &ArrayState, ant_token: &str, context: &str, mut f: F) -> CommandResult
where
    F: FnMut(&mut SubarrayModel) -> Result<(), CommandError>,
{
    let ant_list = resolve_ant_list(state, ant_token, AntGroup::Primary, context)?;

    let beams = state.subarrays.matching_beams(&ant_list);
    if beams.is_empty() {
        return Err(CommandError::with_context(
            ErrorKind::SubarrayNotAssignedToAnyBeams,
            context,
        ));
    }

    for beam in beams {
        state.subarrays.with_model(beam, &mut f)?;
    }
    Ok(Reply::Ok)
}

fn accept(_state: &ArrayState, _command: &CommandLine) -> CommandResult {
    Ok(Reply::Ok)
}

fn stop(state: &ArrayState, command: &CommandLine) -> CommandResult {
    command.expect_len(2, "")?;
    for_each_subarray(state, command.word(1), ": stop", |model| {
        model.stop();
        Ok(())
    })
}

fn point(state: &ArrayState, command: &CommandLine) -> CommandResult {
    let context = ": point";
    command.expect_len(5, context)?;

    let system = CoordSystem::parse_commanded(command.word(2));
    let (c1, c2) = (command.word(3), command.word(4));
    for_each_subarray(state, command.word(1), context, |model| match system {
        Some(system) => model.point(system, c1, c2),
        None => Err(CommandError::with_context(ErrorKind::InvalidCoordSys, context)),
    })
}

fn tune(state: &ArrayState, command: &CommandLine) -> CommandResult {
    let context = ": tune";
    command.expect_len(3, context)?;

    let id = TuningId::parse(command.word(1))
        .ok_or_else(|| CommandError::with_context(ErrorKind::InvalidTuningName, context))?;
    state
        .tunings
        .modify(id, |t| t.tune(command.word(2)))
        .map_err(|e| e.context(context))?;
    info!("tuning {} set to {} MHz", id.letter(), state.tunings.get(id).sky_freq_mhz);
    Ok(Reply::Ok)
}

fn attn(state: &ArrayState, command: &CommandLine) -> CommandResult {
    let context = ": attn";
    command.expect_len(4, context)?;

    let id = TuningId::parse(command.word(1))
        .ok_or_else(|| CommandError::with_context(ErrorKind::InvalidTuningName, context))?;
    state
        .tunings
        .modify(id, |t| t.set_attn(command.word(2), command.word(3)))
        .map_err(|e| e.context(context))?;
    Ok(Reply::Ok)
}

fn zfocus(state: &ArrayState, command: &CommandLine) -> CommandResult {
    let context = ": zfocus";
    command.expect_len(3, context)?;

    let freq = command.word(2);
    for_each_subarray(state, command.word(1), context, |model| model.set_zfocus(freq))
}

fn wrap(state: &ArrayState, command: &CommandLine) -> CommandResult {
    let context = ": wrap";
    command.expect_len(3, context)?;

    let wrap = command.word(2);
    for_each_subarray(state, command.word(1), context, |model| model.set_wrap(wrap))
}

fn monitor(state: &ArrayState, command: &CommandLine) -> CommandResult {
    let context = ": monitor";
    command.expect_len(2, context)?;

    let secs = parse_value::<i32>(command.word(1))
        .and_then(|secs| check_range(secs, 1..=MAX_MONITOR_PERIOD_SECS))
        .map_err(|e| e.context(context))?;

    state.set_status_interval_secs(u64::from(secs.unsigned_abs()));
    info!("status interval set to {} s", secs);
    Ok(Reply::Ok)
}

fn antgroup(state: &ArrayState, command: &CommandLine) -> CommandResult {
    let context = ": ANTGROUP";
    command.expect_min_len(2, context)?;

    let subcommand = command.word(1);
    match subcommand {
        // ANTGROUP AUTOSELECT SEFD <maxJy> FREQ <maxFreqMhz>; the arguments
        // are not checked and a fixed list is assigned.
        "AUTOSELECT" => {
            command.expect_len(6, context)?;
            state.antgroups.set(GroupTarget::All, AUTOSELECT_ANTS_TEST_LIST);
            Ok(Reply::Ready("AUTOSELECT"))
        }
        "SET" => {
            command.expect_min_len(4, context)?;
            let target = parse_group_target(command.word(2))?;
            let list = command.word(3);
            if !is_valid_ant_list(list) {
                return Err(CommandError::with_context(ErrorKind::InvalidAntList, context));
            }
            state.antgroups.set(target, list);
            Ok(Reply::Ok)
        }
        "CLEAR" => {
            command.expect_min_len(3, context)?;
            let target = parse_group_target(command.word(2))?;
            state.antgroups.clear(target);
            Ok(Reply::Ok)
        }
        "LIST" => {
            command.expect_min_len(3, context)?;
            let target = parse_group_target(command.word(2))?;
            Ok(Reply::Data(state.antgroups.formatted(target)))
        }
        other => Err(CommandError::with_context(
            ErrorKind::UnknownSubcommand,
            format!(" ANTGROUP {other}"),
        )),
    }
}

fn parse_group_target(word: &str) -> Result<GroupTarget, CommandError> {
    GroupTarget::parse(word)
        .ok_or_else(|| CommandError::with_context(ErrorKind::InvalidAntGroup, format!(": {word}")))
}
