//! Parsers for the window and display enumeration helpers.
//!
//! Both helpers print one record per line, fields separated by tabs:
//!
//! ```text
//! windows:   <id>\t<appName>\t<title…>
//! displays:  <id>\t<isMain 0|1>\t<x>\t<y>\t<width>\t<height>
//! ```
//!
//! Window titles may themselves contain tabs; everything after the second
//! field is rejoined into the title.  Lines that cannot be parsed are skipped
//! rather than failing the whole listing.

use std::collections::HashSet;

use super::target::{DisplayInfo, WindowInfo};

/// Placeholder for windows whose owning application has no name.
pub const UNKNOWN_APP_NAME: &str = "Unknown";

/// Parses window enumeration output.
///
/// Records with a non-positive or non-numeric id are skipped; a missing
/// application name becomes [`UNKNOWN_APP_NAME`].  Duplicate ids keep their
/// first occurrence.  The result is sorted by `(app_name, title)`.
pub fn parse_window_list(raw: &str) -> Vec<WindowInfo> {
    let mut seen = HashSet::new();
    let mut windows = Vec::new();

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let mut fields = line.split('\t');
        let Some(id) = fields.next().and_then(parse_positive_id) else {
            continue;
        };
        if !seen.insert(id) {
            continue;
        }
        let app_name = match fields.next().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => UNKNOWN_APP_NAME.to_string(),
        };
        let title = fields.collect::<Vec<_>>().join("\t").trim().to_string();

        windows.push(WindowInfo {
            id,
            app_name,
            title,
        });
    }

    windows.sort_by(|a, b| {
        a.app_name
            .cmp(&b.app_name)
            .then_with(|| a.title.cmp(&b.title))
    });
    windows
}

/// Parses display enumeration output.
///
/// Records with a bad id or unparsable geometry are skipped.  Duplicate ids
/// keep their first occurrence.  The main display sorts first, then ascending
/// id.
pub fn parse_display_list(raw: &str) -> Vec<DisplayInfo> {
    let mut seen = HashSet::new();
    let mut displays = Vec::new();

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(display) = parse_display_line(line).filter(|d| seen.insert(d.id)) {
            displays.push(display);
        }
    }

    displays.sort_by(|a, b| b.is_main.cmp(&a.is_main).then_with(|| a.id.cmp(&b.id)));
    displays
}

fn parse_display_line(line: &str) -> Option<DisplayInfo> {
    let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
    let [id, is_main, x, y, width, height] = fields.as_slice() else {
        return None;
    };

    Some(DisplayInfo {
        id: parse_positive_id(id)?,
        is_main: *is_main == "1",
        x: x.parse().ok()?,
        y: y.parse().ok()?,
        width: width.parse().ok()?,
        height: height.parse().ok()?,
    })
}

fn parse_positive_id(field: &str) -> Option<i64> {
    field.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_are_sorted_by_app_then_title() {
        let raw = "30\tSafari\tNews\n10\tClaude\tChat B\n20\tClaude\tChat A\n";

        let windows = parse_window_list(raw);

        let ids: Vec<_> = windows.iter().map(|w| w.id).collect();
        assert_eq!(ids, vec![20, 10, 30]);
    }

    #[test]
    fn test_duplicate_window_ids_keep_first_occurrence() {
        let raw = "5\tClaude\tFirst\n5\tClaude\tSecond\n";
        let windows = parse_window_list(raw);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].title, "First");
    }

    #[test]
    fn test_window_title_with_tabs_is_rejoined() {
        let windows = parse_window_list("8\tTerminal\tzsh\t~/src\n");
        assert_eq!(windows[0].title, "zsh\t~/src");
    }

    #[test]
    fn test_invalid_window_lines_are_skipped() {
        let raw = "abc\tApp\tx\n-1\tApp\ty\n0\tApp\tz\n\n   \n9\tOk\t\n";
        let windows = parse_window_list(raw);
        assert_eq!(
            windows,
            vec![WindowInfo {
                id: 9,
                app_name: "Ok".to_string(),
                title: String::new()
            }]
        );
    }

    #[test]
    fn test_window_without_app_name_is_kept_as_unknown() {
        let raw = "4\t\tno app\n6\n2\tSafari\tNews\n";

        let windows = parse_window_list(raw);

        let names: Vec<_> = windows.iter().map(|w| (w.id, w.app_name.as_str())).collect();
        assert_eq!(names, vec![(2, "Safari"), (6, "Unknown"), (4, "Unknown")]);
        assert_eq!(windows[2].title, "no app");
    }

    #[test]
    fn test_displays_sort_main_first_then_by_id() {
        let raw = "3\t0\t1920\t0\t1280\t800\n2\t0\t-1280\t0\t1280\t800\n7\t1\t0\t0\t1920\t1080\n";

        let displays = parse_display_list(raw);

        let ids: Vec<_> = displays.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![7, 2, 3]);
        assert!(displays[0].is_main);
        assert_eq!(displays[1].x, -1280);
    }

    #[test]
    fn test_malformed_display_lines_are_skipped() {
        let raw = "1\t1\t0\t0\t1920\n2\t0\t0\t0\twide\t800\n0\t0\t0\t0\t1\t1\n4\t0\t0\t0\t10\t10\n4\t1\t0\t0\t20\t20\n";
        let displays = parse_display_list(raw);
        assert_eq!(displays.len(), 1);
        assert_eq!(displays[0].id, 4);
        assert_eq!(displays[0].width, 10);
    }

    #[test]
    fn test_empty_output_is_empty_list() {
        assert!(parse_window_list("").is_empty());
        assert!(parse_display_list("\n").is_empty());
    }
}
