//! Timecode parsing for manifest cue columns.

/// Parse `SS`, `SS.sss`, `MM:SS` or `HH:MM:SS` into seconds.
///
/// Returns `None` for empty, negative or malformed values.
pub fn parse_timecode(value: &str) -> Option<f64> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(secs) = s.parse::<f64>() {
        return (secs.is_finite() && secs >= 0.0).then_some(secs);
    }

    let parts: Vec<u64> = s
        .split(':')
        .map(|part| part.trim().parse::<u64>())
        .collect::<Result<_, _>>()
        .ok()?;
    let total = match parts.as_slice() {
        [m, sec] => m.checked_mul(60)?.checked_add(*sec)?,
        [h, m, sec] => h
            .checked_mul(3600)?
            .checked_add(m.checked_mul(60)?)?
            .checked_add(*sec)?,
        _ => return None,
    };
    Some(total as f64)
}
