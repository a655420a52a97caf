pub mod build;
pub mod check;
pub mod config;
pub mod embed;
pub mod plan;

use powerhour_playlist_model::Warning;
use powerhour_render_engine::RenderPlan;

/// Print warnings to stderr, one per line.
pub(crate) fn print_warnings(warnings: &[Warning]) {
    for warning in warnings {
        eprintln!("  warning: {warning}");
    }
}

/// Human-readable segment table.
pub(crate) fn print_plan(plan: &RenderPlan) {
    println!(
        "{:>3}  {:<40} {:>9} {:>9} {:>8} {:>6} {:>6}",
        "#", "source", "start", "end", "length", "in", "out"
    );
    for (idx, segment) in plan.segments.iter().enumerate() {
        let mut label = segment.item.display_label();
        if label.chars().count() > 40 {
            label = label.chars().take(39).collect::<String>() + "…";
        }
        println!(
            "{:>3}  {:<40} {:>9.3} {:>9.3} {:>8.3} {:>6.3} {:>6.3}{}",
            idx + 1,
            label,
            segment.trim_start,
            segment.trim_end,
            segment.duration(),
            segment.overlap_in,
            segment.overlap_out,
            if segment.short_source { "  short" } else { "" }
        );
    }
    println!();
    println!(
        "  {} segment(s), total {}",
        plan.len(),
        format_duration(plan.total_duration())
    );
}

pub(crate) fn format_duration(secs: f64) -> String {
    let millis = (secs.max(0.0) * 1000.0).round() as u64;
    let (h, rem) = (millis / 3_600_000, millis % 3_600_000);
    let (m, rem) = (rem / 60_000, rem % 60_000);
    format!("{h:02}:{m:02}:{:02}.{:03}", rem / 1000, rem % 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "00:00:00.000");
        assert_eq!(format_duration(3600.0), "01:00:00.000");
        assert_eq!(format_duration(178.5), "00:02:58.500");
    }
}
