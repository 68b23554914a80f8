//! Timestamp codec, identifier scanning, and canonical ordering of scenario
//! files.

use crate::prelude::ScenarioResult;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Formats seconds as the `H:MM:SS.ss>` stamp prefix (hours unpadded).
pub fn format_stamp(seconds: f64) -> String {
    let total = seconds.max(0.0);
    let h = (total / 3600.0) as u64;
    let m = ((total % 3600.0) / 60.0) as u64;
    let s = total - (h * 3600 + m * 60) as f64;
    format!("{h}:{m:02}:{s:05.2}>")
}

/// Seconds encoded by a leading `H:MM:SS(.ss)>` stamp, if the line has one.
pub fn parse_stamp(line: &str) -> Option<f64> {
    let s = line.trim_start();
    let head = &s[..s.find('>')?];
    let mut parts = head.splitn(3, ':');
    let hours = parts.next()?;
    let minutes = parts.next()?;
    let seconds = parts.next()?;
    if !all_digits(hours) || minutes.len() != 2 || !all_digits(minutes) {
        return None;
    }
    let (whole, frac) = match seconds.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (seconds, None),
    };
    if whole.len() != 2 || !all_digits(whole) {
        return None;
    }
    if let Some(f) = frac {
        if !all_digits(f) {
            return None;
        }
    }
    let h: f64 = hours.parse().ok()?;
    let m: f64 = minutes.parse().ok()?;
    let sec: f64 = seconds.parse().ok()?;
    Some(h * 3600.0 + m * 60.0 + sec)
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Header lines carry the time-zero stamp and the hold/alerting directives.
pub fn is_header_line(line: &str) -> bool {
    let t = line.trim();
    t.starts_with("0:") && (t.contains(">HOLD") || t.contains(">ASAS ON"))
}

/// Identifier created by a `CRE` command line, if this is one.
fn creation_id(line: &str) -> Option<&str> {
    let (_, rest) = line.split_once('>')?;
    let rest = rest.trim_start();
    let rest = rest.strip_prefix("CRE")?;
    if !rest.starts_with(|c: char| c.is_whitespace()) {
        return None;
    }
    let body = rest.trim_start();
    let id = body[..body.find(',')?].trim_end();
    let valid = !id.is_empty()
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    valid.then_some(id)
}

/// Aircraft identifiers already created in an existing scenario file.
/// An unreadable file reads as empty.
pub fn scan_existing_ids(path: &Path) -> BTreeSet<String> {
    let Ok(text) = fs::read_to_string(path) else {
        return BTreeSet::new();
    };
    text.lines()
        .filter_map(creation_id)
        .map(str::to_string)
        .collect()
}

/// Highest `<family><n>` index among created identifiers (0 when none).
pub fn scan_max_family_index(path: &Path, family: &str) -> u64 {
    let Ok(text) = fs::read_to_string(path) else {
        return 0;
    };
    text.lines()
        .filter_map(creation_id)
        .filter_map(|id| {
            let suffix = id.strip_prefix(family)?;
            all_digits(suffix).then(|| suffix.parse::<u64>().ok())?
        })
        .max()
        .unwrap_or(0)
}

/// Rewrites `path` in canonical order: header first, stamped lines stably
/// sorted by time, non-stamped lines last in original relative order.
///
/// A file that cannot be read is left untouched; rewrite failures propagate.
pub fn sort_scenario_file(path: &Path) -> ScenarioResult<()> {
    let Ok(text) = fs::read_to_string(path) else {
        return Ok(());
    };

    let mut header: Vec<&str> = Vec::new();
    let mut stamped: Vec<(f64, usize, &str)> = Vec::new();
    let mut rest: Vec<&str> = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if is_header_line(line) {
            header.push(line);
        } else if let Some(t) = parse_stamp(line) {
            stamped.push((t, idx, line));
        } else {
            rest.push(line);
        }
    }
    stamped.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut out = String::with_capacity(text.len() + 1);
    for line in &header {
        out.push_str(line);
        out.push('\n');
    }
    for (_, _, line) in &stamped {
        out.push_str(line);
        out.push('\n');
    }
    for line in &rest {
        out.push_str(line);
        out.push('\n');
    }
    fs::write(path, out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn stamp_formats_with_fixed_widths() {
        assert_eq!(format_stamp(0.0), "0:00:00.00>");
        assert_eq!(format_stamp(3723.5), "1:02:03.50>");
        assert_eq!(format_stamp(36_000.0), "10:00:00.00>");
    }

    #[test]
    fn stamp_round_trips_through_parser() {
        for t in [0.0, 59.99, 540.0, 3600.0, 86_399.25] {
            let line = format!("{}CRE X,A320,1,1,090,33000,250.0", format_stamp(t));
            let parsed = parse_stamp(&line).unwrap();
            assert!((parsed - t).abs() < 0.005, "t={t} parsed={parsed}");
        }
    }

    #[test]
    fn parse_rejects_lines_without_a_stamp() {
        assert_eq!(parse_stamp("# comment"), None);
        assert_eq!(parse_stamp("CRE AB3,A320,1,1,090,33000,250.0"), None);
        assert_eq!(parse_stamp("1:2:03.00>HOLD"), None);
        assert_eq!(parse_stamp(""), None);
    }

    #[test]
    fn creation_ids_are_scanned_from_cre_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.scn");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "0:00:00.00>HOLD").unwrap();
        writeln!(f, "0:00:00.00>CRE AB3,A320,52.0,4.0,090,33000,250.0").unwrap();
        writeln!(f, "0:00:10.00>ADDWPT AB3 52.1,4.1,FL330,250.0").unwrap();
        writeln!(f, "0:00:00.00>CRE SC4,B738,52.0,4.0,270,33000,250.0").unwrap();
        drop(f);

        let ids = scan_existing_ids(&path);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("AB3") && ids.contains("SC4"));
        assert_eq!(scan_max_family_index(&path, "SC"), 4);
    }

    #[test]
    fn scans_on_missing_file_read_as_empty() {
        let path = Path::new("/nonexistent/never.scn");
        assert!(scan_existing_ids(path).is_empty());
        assert_eq!(scan_max_family_index(path, "SC"), 0);
    }

    #[test]
    fn sort_keeps_header_first_and_orders_by_time() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.scn");
        std::fs::write(
            &path,
            "0:00:00.00>HOLD\n\
             0:00:00.00>ASAS ON\n\
             0:05:00.00>CRE B,A320,1,1,090,33000,250.0\n\
             # stray comment\n\
             0:01:00.00>CRE A,A320,1,1,090,33000,250.0\n\
             0:01:00.00>LNAV A ON\n",
        )
        .unwrap();

        sort_scenario_file(&path).unwrap();
        let lines: Vec<String> = std::fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        assert!(lines[0].ends_with(">HOLD"));
        assert!(lines[1].ends_with(">ASAS ON"));
        assert!(lines[2].contains("CRE A"));
        assert!(lines[3].contains("LNAV A ON"));
        assert!(lines[4].contains("CRE B"));
        assert!(lines[5].starts_with("# stray"));
    }

    #[test]
    fn sort_of_missing_file_is_a_no_op() {
        assert!(sort_scenario_file(Path::new("/nonexistent/never.scn")).is_ok());
    }
}
