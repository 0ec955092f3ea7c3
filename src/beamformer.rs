//! The `BF ...` beamformer sub-protocol.

use crate::antgroup::{AntGroup, ALL_TOKEN};
use crate::beam::{pol_from_beam_name, Beam, Polarization};
use crate::dispatcher::resolve_ant_list;
use crate::pointing::{CoordSystem, Pointing};
use crate::protocol::{
    parse_value, BeamformerKind, CommandError, CommandLine, CommandResult, ErrorKind, Reply,
};
use crate::state::ArrayState;
use crate::telemetry::{format_attn, pointing_string};
use tracing::info;

/// Reply to `BF LIST CONFIG`.
pub const BF_CONFIG: &str = "BEAMXC1 bf#1 x1";

const NULL_TYPES: [&str; 3] = ["AXIAL", "PROJECTION", "NONE"];
const CAL_TYPES: [&str; 3] = ["DELAY", "PHASE", "FREQ"];

pub fn dispatch(state: &ArrayState, command: &CommandLine) -> CommandResult {
    command.expect_min_len(2, ": bf")?;

    let subcommand = command.word(1);
    let Some(kind) = BeamformerKind::from_keyword(subcommand) else {
        return Err(CommandError::with_context(
            ErrorKind::UnknownBeamformerCommand,
            format!(": {subcommand}"),
        ));
    };

    match kind {
        BeamformerKind::Set => set(state, command),
        BeamformerKind::List => list(state, command),
        BeamformerKind::Clear => clear(state, command),
        BeamformerKind::Add => add_null(command),
        BeamformerKind::Cal => cal(state, command),
        BeamformerKind::Point => {
            copy_commands_to_status(state)?;
            Ok(Reply::Ready("POINT"))
        }
        BeamformerKind::Reset => Ok(Reply::Ready("RESET")),
        BeamformerKind::Stop => Ok(Reply::Ok),
        BeamformerKind::ObsLen => Err(ErrorKind::UnimplementedCommand.into()),
        BeamformerKind::Init => Ok(Reply::Ready("INIT")),
        BeamformerKind::AutoAtten => Ok(Reply::Ready("AUTOATTEN")),
    }
}

fn unknown_subcommand(verb: &str, what: &str) -> CommandError {
    CommandError::with_context(ErrorKind::UnknownSubcommand, format!(" {verb} {what}"))
}

fn set(state: &ArrayState, command: &CommandLine) -> CommandResult {
    command.expect_min_len(3, ": bf")?;

    match command.word(2) {
        "COORDS" => set_coords(state, command),
        "ANTS" => set_ants(state, command),
        "OBSLEN" => set_obs_len(state, command),
        "NULLTYPE" => set_null_type(command),
        "ATTN" => set_attn(state, command),
        other => Err(unknown_subcommand("SET", other)),
    }
}

/// `BF SET COORDS <beam> <AZEL|J2000|GAL> <c1> <c2>`
fn set_coords(state: &ArrayState, command: &CommandLine) -> CommandResult {
    command.expect_len(7, ": bf")?;
    let context = ": bf set coords";

    let beam = Beam::parse(command.word(3))
        .ok_or_else(|| CommandError::with_context(ErrorKind::InvalidBeam, context))?;
    let system = CoordSystem::parse_commanded(command.word(4))
        .ok_or_else(|| CommandError::with_context(ErrorKind::InvalidCoordSys, context))?;

    let mut pointing = Pointing::default();
    pointing.set(system, command.word(5), command.word(6))?;
    state.beam_commands.update(beam, pointing);
    Ok(Reply::Ok)
}

/// `BF SET ANTS <beam> <antlist|ANTGROUP>`
fn set_ants(state: &ArrayState, command: &CommandLine) -> CommandResult {
    let context = ": bf set ants";
    command.expect_len(5, context)?;

    let beam_name = command.word(3);
    let beam = Beam::parse(beam_name)
        .ok_or_else(|| CommandError::with_context(ErrorKind::InvalidBeam, context))?;
    let group = match pol_from_beam_name(beam_name) {
        Some(Polarization::Y) => AntGroup::Ypol,
        _ => AntGroup::Xpol,
    };

    let ant_list = resolve_ant_list(state, command.word(4), group, context)?;
    state
        .subarrays
        .with_model(beam, |model| model.set_ant_names_list(&ant_list));
    Ok(Reply::Ok)
}

fn set_obs_len(state: &ArrayState, command: &CommandLine) -> CommandResult {
    let context = ": bf set obslen";
    command.expect_len(4, context)?;

    let word = command.word(3);
    let secs: i32 = parse_value(word).map_err(|e| e.context(&format!("{context} {word}")))?;
    if secs < 1 {
        return Err(CommandError::with_context(
            ErrorKind::InvalidArgument,
            format!("{context} {word}, must be >= 1 "),
        ));
    }

    state.set_obs_len_secs(secs);
    info!("observation length set to {} s", secs);
    Ok(Reply::Ok)
}

/// Checked, but nothing is stored.
fn set_null_type(command: &CommandLine) -> CommandResult {
    let context = ": bf set NULLTYPE <AXIAL | PROJECTION | NONE> ";
    command.expect_len(4, context)?;

    let null_type = command.word(3);
    if NULL_TYPES.contains(&null_type) {
        Ok(Reply::Ok)
    } else {
        Err(CommandError::with_context(
            ErrorKind::InvalidArgument,
            format!("{context} {null_type}"),
        ))
    }
}

/// `BF SET ATTN <beam> <db>`. A single attenuation is shared by every
/// beam, so the beam name is not checked.
fn set_attn(state: &ArrayState, command: &CommandLine) -> CommandResult {
    let context = ": bf set attn";
    command.expect_len(5, context)?;

    let word = command.word(4);
    let db: f64 = parse_value(word).map_err(|e| e.context(&format!("{context} {word}")))?;
    state.set_bf_attn_db(db);
    Ok(Reply::Ok)
}

fn list(state: &ArrayState, command: &CommandLine) -> CommandResult {
    command.expect_min_len(3, ": bf list")?;

    match command.word(2) {
        "ANTS" => {
            command.expect_len(4, ": bf list ants")?;
            for_beam_or_all(command.word(3), |beam| list_ants(state, beam)).map(Reply::Data)
        }
        "COORDS" => {
            command.expect_len(4, ": bf list coords")?;
            for_beam_or_all(command.word(3), |beam| list_coords(state, beam)).map(Reply::Data)
        }
        "OBSLEN" => Ok(Reply::Data(state.obs_len_secs().to_string())),
        "ATTN" => Ok(Reply::Data(format_attn(state.bf_attn_db()))),
        "CONFIG" => Ok(Reply::Data(BF_CONFIG.to_owned())),
        "NULLS" => Err(ErrorKind::UnimplementedCommand.into()),
        other => Err(unknown_subcommand("LIST", other)),
    }
}

/// Run `f` on one named beam, or on every beam for `ALL`, in which case
/// each result is followed by a newline.
fn for_beam_or_all<F>(name: &str, mut f: F) -> Result<String, CommandError>
where
    F: FnMut(&str) -> Result<String, CommandError>,
{
    if name != ALL_TOKEN {
        return f(name);
    }

    let mut out = String::new();
    for beam in Beam::all() {
        // Every canonical name resolves, so each line is a result.
        let line = f(&beam.name()).unwrap_or_else(|e| e.to_string());
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}

fn list_ants(state: &ArrayState, beam_name: &str) -> Result<String, CommandError> {
    let beam = Beam::parse(beam_name).ok_or(ErrorKind::InvalidBeam)?;
    let ants = state
        .subarrays
        .with_model(beam, |model| model.ant_names_list().to_owned());
    Ok(format!("{beam}: {ants}"))
}

fn list_coords(state: &ArrayState, beam_name: &str) -> Result<String, CommandError> {
    let beam = Beam::parse(beam_name)
        .ok_or_else(|| CommandError::with_context(ErrorKind::InvalidBeam, format!(": {beam_name}")))?;
    Ok(format!("{beam} {}", pointing_string(&state.beam_commands.get(beam))))
}

fn clear(state: &ArrayState, command: &CommandLine) -> CommandResult {
    command.expect_min_len(3, ": bf clear")?;

    match command.word(2) {
        "ANTS" => {
            command.expect_len(4, "")?;
            clear_beam_or_all(command.word(3), |beam| {
                state.subarrays.with_model(beam, |model| model.set_ant_names_list(""));
            })
        }
        "COORDS" => {
            command.expect_len(4, "")?;
            clear_beam_or_all(command.word(3), |beam| {
                state.beam_commands.update(beam, Pointing::uninit());
            })
        }
        "NULLS" => Ok(Reply::Ok),
        other => Err(unknown_subcommand("CLEAR", other)),
    }
}

fn clear_beam_or_all<F>(name: &str, mut f: F) -> CommandResult
where
    F: FnMut(Beam),
{
    if name == ALL_TOKEN {
        Beam::all().for_each(f);
        return Ok(Reply::Ok);
    }

    let beam = Beam::parse(name)
        .ok_or_else(|| CommandError::with_context(ErrorKind::InvalidBeam, format!(": {name}")))?;
    f(beam);
    Ok(Reply::Ok)
}

/// `BF ADD NULL <beam> <sys> <c1> <c2>`: only the coordinate system is
/// checked.
fn add_null(command: &CommandLine) -> CommandResult {
    let context = ": bf add null";
    command.expect_len(7, context)?;

    if CoordSystem::parse_commanded(command.word(4)).is_none() {
        return Err(CommandError::with_context(ErrorKind::InvalidCoordSys, context));
    }
    Ok(Reply::Ok)
}

/// `BF CAL <DELAY|PHASE|FREQ> INTEGRATE <secs> CYCLES <count>`
fn cal(state: &ArrayState, command: &CommandLine) -> CommandResult {
    command.expect_len(7, ": bf cal")?;

    let cal_type = command.word(2);
    if !CAL_TYPES.contains(&cal_type) {
        return Err(CommandError::with_context(
            ErrorKind::InvalidArgument,
            format!(" {cal_type}"),
        ));
    }

    copy_commands_to_status(state)?;
    Ok(Reply::Ready("CAL"))
}

/// Make every commanded (non-`UNINIT`) pointing the active one. Fails when
/// no beam has coordinates.
fn copy_commands_to_status(state: &ArrayState) -> Result<(), CommandError> {
    let mut copied = 0;
    for (beam, pointing) in state.beam_commands.snapshot() {
        if !pointing.is_uninit() {
            state.beam_status.update(beam, pointing);
            copied += 1;
        }
    }

    if copied == 0 {
        return Err(ErrorKind::NoCoordsAssignedToBeams.into());
    }
    info!("{} beam pointings made active", copied);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(state: &ArrayState, line: &str) -> String {
        crate::protocol::render_result(&dispatch(state, &CommandLine::parse(line)))
    }

    #[test]
    fn test_bf_arg_counts() {
        let state = ArrayState::default();
        assert_eq!(run(&state, "bf"), "ERROR: invalid number of arguments: bf");
        assert_eq!(run(&state, "bf set"), "ERROR: invalid number of arguments: bf");
        assert_eq!(run(&state, "bf set coords beamxa1"), "ERROR: invalid number of arguments: bf");
        assert_eq!(run(&state, "bf list"), "ERROR: invalid number of arguments: bf list");
        assert_eq!(run(&state, "bf clear ants"), "ERROR: invalid number of arguments");
        assert_eq!(run(&state, "bf cal delay"), "ERROR: invalid number of arguments: bf cal");
    }

    #[test]
    fn test_set_coords_only_stores_valid_pointings() {
        let state = ArrayState::default();
        let beam = Beam::parse("BEAMXA1").unwrap();

        assert_eq!(
            run(&state, "bf set coords beamza1 azel 1 2"),
            "ERROR: invalid beam name: bf set coords"
        );
        assert_eq!(
            run(&state, "bf set coords beamxa1 foo 1 2"),
            "ERROR: invalid coord system: bf set coords"
        );
        assert_eq!(
            run(&state, "bf set coords beamxa1 azel 1 91"),
            "ERROR: arg out of range: set azel"
        );
        assert!(state.beam_commands.get(beam).is_uninit());

        assert_eq!(run(&state, "bf set coords beamxa1 gal 10 -5"), "OK");
        assert_eq!(state.beam_commands.get(beam).coord_system, CoordSystem::Gal);
    }

    #[test]
    fn test_obslen_and_nulltype() {
        let state = ArrayState::default();
        assert_eq!(run(&state, "bf list obslen"), "600");
        assert_eq!(
            run(&state, "bf set obslen 0"),
            "ERROR: invalid argument: bf set obslen 0, must be >= 1 "
        );
        assert_eq!(run(&state, "bf set obslen x"), "ERROR: invalid argument: bf set obslen X");
        assert_eq!(run(&state, "bf set obslen 220"), "OK");
        assert_eq!(run(&state, "bf list obslen"), "220");

        assert_eq!(run(&state, "bf set nulltype axial"), "OK");
        assert_eq!(
            run(&state, "bf set nulltype foo"),
            "ERROR: invalid argument: bf set NULLTYPE <AXIAL | PROJECTION | NONE>  FOO"
        );
    }

    #[test]
    fn test_attn_is_shared() {
        let state = ArrayState::default();
        assert_eq!(run(&state, "bf list attn"), "0.0");
        assert_eq!(run(&state, "bf set attn beamxa1 5"), "OK");
        assert_eq!(run(&state, "bf list attn"), "5.0");
        assert_eq!(run(&state, "bf set attn beamxa1 loud"), "ERROR: invalid argument: bf set attn LOUD");
    }

    #[test]
    fn test_point_without_coords_warns() {
        let state = ArrayState::default();
        assert_eq!(run(&state, "bf point"), "WARNING: can't point beams, no coordinates assigned");
        assert_eq!(run(&state, "bf cal delay integrate 10 cycles 2"), "WARNING: can't point beams, no coordinates assigned");
        assert_eq!(run(&state, "bf cal bogus integrate 10 cycles 2"), "ERROR: invalid argument BOGUS");
    }

    #[test]
    fn test_misc_subcommands() {
        let state = ArrayState::default();
        assert_eq!(run(&state, "bf reset"), "READY: RESET");
        assert_eq!(run(&state, "bf stop"), "OK");
        assert_eq!(run(&state, "bf obslen"), "ERROR: unimplemented command");
        assert_eq!(run(&state, "bf init"), "READY: INIT");
        assert_eq!(run(&state, "bf autoatten"), "READY: AUTOATTEN");
        assert_eq!(run(&state, "bf list config"), BF_CONFIG);
        assert_eq!(run(&state, "bf list nulls"), "ERROR: unimplemented command");
        assert_eq!(run(&state, "bf clear nulls"), "OK");
        assert_eq!(run(&state, "bf frob"), "ERROR: unknown beamformer command: FROB");
        assert_eq!(run(&state, "bf set frob"), "ERROR: don't know how to SET FROB");
        assert_eq!(run(&state, "bf list frob"), "ERROR: don't know how to LIST FROB");
        assert_eq!(run(&state, "bf clear frob"), "ERROR: don't know how to CLEAR FROB");
        assert_eq!(run(&state, "bf add null beamxa1 foo 1 2"), "ERROR: invalid coord system: bf add null");
        assert_eq!(run(&state, "bf add null beamxa1 j2000 1 2"), "OK");
    }

    #[test]
    fn test_list_all_has_one_line_per_beam() {
        let state = ArrayState::default();
        let listing = run(&state, "bf list ants all");
        assert_eq!(listing.lines().count(), 32);
        assert!(listing.starts_with("BEAMXA1: \nBEAMYA1: \n"));
        assert!(listing.ends_with('\n'));

        let coords = run(&state, "bf list coords all");
        assert_eq!(coords.lines().count(), 32);
        assert!(coords.starts_with("BEAMXA1 UNINIT AZ .000000 deg"));

        assert_eq!(run(&state, "bf list ants beamza1"), "ERROR: invalid beam name");
        assert_eq!(run(&state, "bf list coords beamza1"), "ERROR: invalid beam name: BEAMZA1");
    }
}
