//! Summary report for decoded logs
//!
//! Prints decode statistics and one line per channel that received data,
//! grouped by category.

use chrono::Duration;
use racecar_log_decoder::{Category, ChannelId, DecodeStats, GroupId, MaterializedDataset, Series};
use std::io::{self, Write};
use std::path::Path;

/// Which channels to include in the report
#[derive(Debug, Clone, Default)]
pub struct ChannelSelection {
    channels: Vec<ChannelId>,
    groups: Vec<GroupId>,
}

impl ChannelSelection {
    /// Build a selection from channel/group names; unknown names are reported
    /// and ignored. An empty list selects everything.
    pub fn from_names(names: &[String]) -> Self {
        let mut selection = Self::default();
        for name in names {
            if let Some(id) = ChannelId::from_name(name) {
                selection.channels.push(id);
            } else if let Some(id) = GroupId::from_name(name) {
                selection.groups.push(id);
            } else {
                log::warn!("Unknown channel name: {:?}", name);
            }
        }
        selection
    }

    fn is_all(&self) -> bool {
        self.channels.is_empty() && self.groups.is_empty()
    }

    fn includes_channel(&self, id: ChannelId) -> bool {
        self.is_all() || self.channels.contains(&id)
    }

    fn includes_group(&self, id: GroupId) -> bool {
        self.is_all() || self.groups.contains(&id)
    }
}

/// Format a millisecond span as `HH:MM:SS.mmm`
pub fn format_span(ms: i64) -> String {
    let span = Duration::milliseconds(ms.max(0));
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        span.num_hours(),
        span.num_minutes() % 60,
        span.num_seconds() % 60,
        span.num_milliseconds() % 1000
    )
}

/// Write the summary for one decoded log
pub fn write_summary<W: Write>(
    out: &mut W,
    path: &Path,
    stats: &DecodeStats,
    data: &MaterializedDataset,
    selection: &ChannelSelection,
) -> io::Result<()> {
    writeln!(out, "═══════════════════════════════════════════════")?;
    writeln!(out, "  {}", path.display())?;
    writeln!(out, "═══════════════════════════════════════════════")?;
    writeln!(
        out,
        "  Records: {}  Decoded: {}  Unknown: {}  Filtered: {}  Malformed: {}  Debounced: {}",
        stats.records, stats.decoded, stats.unknown, stats.filtered, stats.malformed, stats.debounced
    )?;
    if let Some(span) = stats.span_ms() {
        writeln!(out, "  Span: {}", format_span(span))?;
    }

    if data.is_empty() {
        writeln!(out, "\n  (no channel data)")?;
        return Ok(());
    }

    let mut current: Option<Category> = None;
    for (id, series) in data.iter() {
        if series.is_empty() || !selection.includes_channel(id) {
            continue;
        }
        if current != Some(id.category()) {
            current = Some(id.category());
            writeln!(out, "\n[{}]", id.category())?;
        }
        write_series_line(out, id.name(), id.unit(), series)?;
    }

    for id in GroupId::ALL.iter().copied() {
        if !selection.includes_group(id) {
            continue;
        }
        let members = data.group(id);
        let reporting = members.iter().filter(|s| !s.is_empty()).count();
        if reporting == 0 {
            continue;
        }
        let samples: usize = members.iter().map(Series::len).sum();
        writeln!(out, "\n[{}] {}/{} members reporting, {} samples", id, reporting, members.len(), samples)?;
        for (index, series) in members.iter().enumerate().filter(|(_, s)| !s.is_empty()) {
            write_series_line(out, &format!("{} {}", id, index + 1), id.unit(), series)?;
        }
    }

    Ok(())
}

fn write_series_line<W: Write>(out: &mut W, name: &str, unit: &str, series: &Series) -> io::Result<()> {
    let (min, max) = series.min_max().unwrap_or((f64::NAN, f64::NAN));
    let last = series.last().map_or(f64::NAN, |(_, value)| value);
    writeln!(
        out,
        "  {:<36} n={:<8} min={:<12.3} max={:<12.3} last={:<12.3} {}",
        name,
        series.len(),
        min,
        max,
        last,
        unit
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use racecar_log_decoder::{Dataset, Sample};

    fn dataset() -> MaterializedDataset {
        let mut dataset = Dataset::new();
        dataset.append(0, Sample::channel(ChannelId::DcVoltage, 400.0));
        dataset.append(10, Sample::channel(ChannelId::DcVoltage, 390.0));
        dataset.append(10, Sample::channel(ChannelId::Speed, 42.0));
        dataset.append(20, Sample::group(GroupId::BmsCell, 3, 3700.0));
        dataset.materialize()
    }

    fn render(selection: &ChannelSelection) -> String {
        let stats = DecodeStats {
            records: 4,
            decoded: 4,
            first_timestamp: Some(0),
            last_timestamp: Some(3_723_004),
            ..DecodeStats::default()
        };
        let mut out = Vec::new();
        write_summary(&mut out, Path::new("run.csv"), &stats, &dataset(), selection).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_format_span() {
        assert_eq!(format_span(3_723_004), "01:02:03.004");
        assert_eq!(format_span(-5), "00:00:00.000");
    }

    #[test]
    fn test_summary_lists_populated_channels() {
        let text = render(&ChannelSelection::default());
        assert!(text.contains("Span: 01:02:03.004"));
        assert!(text.contains("[Voltage]"));
        assert!(text.contains("DC Voltage"));
        assert!(text.contains("min=390.000"));
        assert!(text.contains("[Motion]"));
        assert!(text.contains("[BMS Cell] 1/120 members reporting, 1 samples"));
        assert!(text.contains("BMS Cell 4"));
        assert!(!text.contains("Output Voltage"));
    }

    #[test]
    fn test_summary_respects_selection() {
        let selection = ChannelSelection::from_names(&["Speed".to_string(), "nonsense".to_string()]);
        let text = render(&selection);
        assert!(text.contains("Speed"));
        assert!(!text.contains("DC Voltage"));
        assert!(!text.contains("BMS Cell"));
    }

    #[test]
    fn test_summary_for_empty_dataset() {
        let mut out = Vec::new();
        write_summary(
            &mut out,
            Path::new("absent.csv"),
            &DecodeStats::default(),
            &Dataset::new().materialize(),
            &ChannelSelection::default(),
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("(no channel data)"));
        assert!(!text.contains("Span:"));
    }
}
