//! Selection of local log files for a target date, and exclusion of files
//! the bucket already holds.

use std::collections::HashSet;
use std::fmt::Write;
use std::path::Path;

use anyhow::{anyhow, Context};
use chrono::{Days, NaiveDate};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Returns true if `dir` exists, is a directory, and can be listed.
pub fn preflight(dir: &Path) -> bool {
    dir.is_dir() && std::fs::read_dir(dir).is_ok()
}

/// `today` shifted by `offset_days` (negative values go back in time).
pub fn target_date(today: NaiveDate, offset_days: i64) -> anyhow::Result<NaiveDate> {
    let days = Days::new(offset_days.unsigned_abs());
    let shifted = if offset_days >= 0 {
        today.checked_add_days(days)
    } else {
        today.checked_sub_days(days)
    };
    shifted.with_context(|| format!("date offset {} from {} is out of range", offset_days, today))
}

/// Render `date` with a strftime `format`, failing instead of panicking on
/// tokens a plain date cannot satisfy.
pub fn date_pattern(date: NaiveDate, format: &str) -> anyhow::Result<String> {
    let mut out = String::new();
    write!(out, "{}", date.format(format))
        .map_err(|_| anyhow!("invalid date format {:?}", format))?;
    Ok(out)
}

/// Names of regular files directly inside `dir` whose name contains
/// `pattern`, sorted by name. Subdirectories are not descended into.
pub fn select_candidates(dir: &Path, pattern: &str) -> anyhow::Result<Vec<String>> {
    std::fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))?;

    let mut names = Vec::new();
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Failed to stat directory entry, skipping");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            debug!(path = %entry.path().display(), "Skipping file with non-UTF-8 name");
            continue;
        };
        if name.contains(pattern) {
            names.push(name.to_string());
        }
    }

    Ok(names)
}

/// Drop every candidate whose name appears anywhere inside an existing remote
/// key. Matching is substring containment, so `logs/app.log.gz.backup`
/// excludes `app.log`.
pub fn exclude_already_uploaded(candidates: &[String], remote_keys: &[String]) -> Vec<String> {
    let excluded: HashSet<&str> = candidates
        .iter()
        .filter(|name| remote_keys.iter().any(|key| key.contains(name.as_str())))
        .map(String::as_str)
        .collect();

    candidates
        .iter()
        .filter(|name| !excluded.contains(name.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_preflight() {
        let dir = tempfile::tempdir().unwrap();
        assert!(preflight(dir.path()));
        assert!(!preflight(&dir.path().join("missing")));

        let file = dir.path().join("plain.log");
        fs::write(&file, "x").unwrap();
        assert!(!preflight(&file));
    }

    #[test]
    fn test_target_date_offsets() {
        let today = date(2024, 5, 2);
        assert_eq!(target_date(today, -1).unwrap(), date(2024, 5, 1));
        assert_eq!(target_date(today, 0).unwrap(), today);
        assert_eq!(target_date(today, 30).unwrap(), date(2024, 6, 1));
        assert_eq!(target_date(date(2024, 3, 1), -1).unwrap(), date(2024, 2, 29));
        assert!(target_date(today, i64::MIN).is_err());
    }

    #[test]
    fn test_date_pattern() {
        assert_eq!(date_pattern(date(2024, 5, 1), "%Y.%m.%d").unwrap(), "2024.05.01");
        assert_eq!(date_pattern(date(2024, 5, 1), "%y%m%d").unwrap(), "240501");
        assert!(date_pattern(date(2024, 5, 1), "%H").is_err());
    }

    #[test]
    fn test_select_candidates_scenario() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("app.2024.05.01.log"), "yesterday").unwrap();
        fs::write(dir.path().join("app.2024.05.02.log.gz"), "today").unwrap();

        let pattern = date_pattern(target_date(date(2024, 5, 2), -1).unwrap(), "%Y.%m.%d").unwrap();
        let names = select_candidates(dir.path(), &pattern).unwrap();
        assert_eq!(names, strings(&["app.2024.05.01.log"]));
    }

    #[test]
    fn test_select_candidates_files_only_one_level() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.2024.05.01.log"), "b").unwrap();
        fs::write(dir.path().join("a.2024.05.01.log.gz"), "a").unwrap();
        fs::write(dir.path().join("other.log"), "o").unwrap();
        fs::create_dir(dir.path().join("archive.2024.05.01")).unwrap();
        fs::write(dir.path().join("archive.2024.05.01/nested.2024.05.01.log"), "n").unwrap();

        let names = select_candidates(dir.path(), "2024.05.01").unwrap();
        assert_eq!(names, strings(&["a.2024.05.01.log.gz", "b.2024.05.01.log"]));
    }

    #[test]
    fn test_select_candidates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(select_candidates(&dir.path().join("gone"), "2024").is_err());
    }

    #[test]
    fn test_exclude_substring_match() {
        let candidates = strings(&["app.2024.05.01.log"]);
        let remote = strings(&["logs/app.2024.05.01.log.gz.backup"]);
        assert!(exclude_already_uploaded(&candidates, &remote).is_empty());
    }

    #[test]
    fn test_exclude_keeps_order_and_never_grows() {
        let candidates = strings(&["c.log", "a.log", "b.log"]);
        let remote = strings(&["a.log.gz", "unrelated", "x/c.log.gz"]);
        let kept = exclude_already_uploaded(&candidates, &remote);
        assert_eq!(kept, strings(&["b.log"]));

        let nothing_remote: Vec<String> = Vec::new();
        assert_eq!(exclude_already_uploaded(&candidates, &nothing_remote), candidates);
    }

    #[test]
    fn test_exclude_requires_candidate_inside_key() {
        // The key being a substring of the name is not enough
        let candidates = strings(&["app.2024.05.01.log"]);
        let remote = strings(&["app.2024"]);
        assert_eq!(exclude_already_uploaded(&candidates, &remote), candidates);
    }
}
