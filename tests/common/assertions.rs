//! Assertion helpers for search results and written NZB files

use nzb_search::{GroupResult, SearchReport};
use std::path::Path;

/// Assert that specific files exist in a directory
pub fn assert_files_exist(dir: &Path, expected_files: &[&str]) {
    for file in expected_files {
        let path = dir.join(file);
        assert!(path.exists(), "Expected file not found: {}", path.display());
    }
}

/// Number of `.nzb` files in a directory
pub fn count_nzb_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .expect("output directory should be readable")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "nzb"))
        .count()
}

/// Read and parse an NZB file
pub fn read_nzb(path: &Path) -> nntp_rs::Nzb {
    let xml = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    nntp_rs::parse_nzb(&xml).unwrap_or_else(|e| panic!("Invalid NZB {}: {}", path.display(), e))
}

/// Successful result of `group` in a report
pub fn group_result<'a>(report: &'a SearchReport, group: &str) -> &'a GroupResult {
    let outcome = report
        .outcomes
        .iter()
        .find(|o| o.group == group)
        .unwrap_or_else(|| panic!("No outcome for group {}", group));
    match &outcome.result {
        Ok(result) => result,
        Err(e) => panic!("Search in {} failed: {}", group, e),
    }
}
