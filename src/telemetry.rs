//! Status snapshot rendering for the status stream, plus the fixed-decimal
//! formatting shared with `BF LIST COORDS`.

use crate::beam::Beam;
use crate::pointing::Pointing;
use crate::state::ArrayState;
use crate::subarray::SubarrayStatus;
use crate::tuning::TuningId;
use core::fmt::Write;
use std::time::{SystemTime, UNIX_EPOCH};

pub const STATUS_LINE_END: &str = "\r\n";
pub const STATUS_END_MARKER: &str = "END";

/// Placeholder IF sky frequency reported for every beam.
const BEAM_IF_SKYFREQ: &str = "99999.999";

const SECS_PER_DAY: u64 = 86_400;

/// Six fixed decimals with no leading zero for magnitudes below one:
/// `.000000`, `-.500000`, `100.000000`.
pub fn format_fixed(value: f64) -> String {
    let formatted = format!("{value:.6}");
    if let Some(rest) = formatted.strip_prefix("-0.") {
        format!("-.{rest}")
    } else if let Some(rest) = formatted.strip_prefix("0.") {
        format!(".{rest}")
    } else {
        formatted
    }
}

/// Shortest round-trip decimal with at least one fractional digit.
pub fn format_attn(db: f64) -> String {
    format!("{db:?}")
}

/// `<SYS> AZ a deg EL e deg RA r hr DEC d deg GLONG l deg GLAT b deg `
pub fn pointing_string(p: &Pointing) -> String {
    format!(
        "{} AZ {} deg EL {} deg RA {} hr DEC {} deg GLONG {} deg GLAT {} deg ",
        p.coord_system,
        format_fixed(p.az_deg),
        format_fixed(p.el_deg),
        format_fixed(p.ra_hours),
        format_fixed(p.dec_deg),
        format_fixed(p.glong_deg),
        format_fixed(p.glat_deg),
    )
}

/// Live primary-beam position of a subarray, in every coordinate system.
pub fn primary_string(status: &SubarrayStatus) -> String {
    let pos = &status.position;
    format!(
        "{} AZ {} deg EL {} deg RA {} hr DEC {} deg GLONG {} deg GLAT {} deg ",
        status.coord_system,
        format_fixed(pos.az_deg),
        format_fixed(pos.el_deg()),
        format_fixed(pos.ra_hours()),
        format_fixed(pos.dec_deg),
        format_fixed(pos.glong_deg),
        format_fixed(pos.glat_deg),
    )
}

pub fn subarray_string(status: &SubarrayStatus) -> String {
    let counts = &status.dish_counts;
    format!(
        "NANTS {} NSHAREDPOINTING {} NTRACK {} NSLEW {} NSTOP {} NOFFLINE {} NERROR {} \
         WRAP {} ZFOCUS {} MHz GCERROR {} deg",
        counts.total,
        counts.shared_pointing,
        counts.track,
        counts.slew,
        counts.stop,
        counts.offline,
        counts.drive_error,
        status.wrap,
        format_fixed(status.zfocus_freq_mhz),
        format_fixed(status.error_deg),
    )
}

/// `HH:MM:SS` of the UTC day containing `now`.
pub fn utc_time_of_day(now: SystemTime) -> String {
    let secs = now
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs() % SECS_PER_DAY);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

/// Render one complete status snapshot. Each registry is read under its own
/// lock, so the report is consistent per beam, not across beams.
pub fn render_status(state: &ArrayState, now: SystemTime) -> String {
    let mut out = String::with_capacity(16 * 1024);
    let attn = format_attn(state.bf_attn_db());

    // Writing into a String cannot fail.
    let _ = write!(out, "ARRAY: {} UTC {STATUS_LINE_END}", utc_time_of_day(now));

    for (beam, synth) in state.beam_status.snapshot() {
        let subarray = state.subarrays.status(beam);
        render_beam(&mut out, beam, &subarray, &synth, &attn);
    }

    for id in TuningId::ALL {
        let tuning = state.tunings.get(id);
        let _ = write!(
            out,
            "TUNING{}: SKYFREQ {} MHz {STATUS_LINE_END}",
            id.letter(),
            format_fixed(tuning.sky_freq_mhz)
        );
    }

    out.push_str(STATUS_END_MARKER);
    out.push_str(STATUS_LINE_END);
    out.push_str(STATUS_LINE_END);
    out
}

fn render_beam(out: &mut String, beam: Beam, subarray: &SubarrayStatus, synth: &Pointing, attn: &str) {
    let _ = write!(out, "{beam}: SUBARRAY: {}{STATUS_LINE_END}", subarray_string(subarray));
    let _ = write!(out, "{beam}: PRIMARY: {}{STATUS_LINE_END}", primary_string(subarray));
    let _ = write!(out, "{beam}: SYNTH: {}{STATUS_LINE_END}", pointing_string(synth));
    let _ = write!(
        out,
        "{beam}: IF: SKYFREQ {BEAM_IF_SKYFREQ} MHz ATTN {attn} DB{STATUS_LINE_END}"
    );
}
