#![forbid(unsafe_code)]

//! Timecode rendering for transport positions and durations.

/// Render milliseconds as `HH:MM:SS.cc`.
///
/// Hours wrap at 24; the last field is hundredths of a second. Negative and
/// non-finite inputs render as zero.
///
/// ```
/// use showmirror_core::format_timecode;
///
/// assert_eq!(format_timecode(0.0), "00:00:00.00");
/// assert_eq!(format_timecode(3_723_450.0), "01:02:03.45");
/// ```
#[must_use]
pub fn format_timecode(ms: f64) -> String {
    let ms = if ms.is_finite() && ms > 0.0 {
        ms.floor() as u64
    } else {
        0
    };
    let centis = (ms % 1000) / 10;
    let seconds = (ms / 1000) % 60;
    let minutes = (ms / 60_000) % 60;
    let hours = (ms / 3_600_000) % 24;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{centis:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_second_values() {
        assert_eq!(format_timecode(999.0), "00:00:00.99");
        assert_eq!(format_timecode(1500.0), "00:00:01.50");
    }

    #[test]
    fn hours_wrap_at_a_day() {
        assert_eq!(format_timecode(25.0 * 3_600_000.0), "01:00:00.00");
    }

    #[test]
    fn invalid_inputs_render_zero() {
        assert_eq!(format_timecode(-5.0), "00:00:00.00");
        assert_eq!(format_timecode(f64::NAN), "00:00:00.00");
    }
}
