//! Validate a file list without probing.
//!
//! Bounds that depend on a source's frame count are checked by `inspect`.

use std::path::PathBuf;

use vidlane_catalog::{parse_file_list, RangeUnits};

pub fn run(file_list: PathBuf, data_root: Option<PathBuf>, seconds: bool) -> anyhow::Result<()> {
    let resolve = |path: &PathBuf| match &data_root {
        Some(root) if path.is_relative() => root.join(path),
        _ => path.clone(),
    };
    let list_path = resolve(&file_list);
    println!("Validating file list: {}", list_path.display());

    let content = std::fs::read_to_string(&list_path)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", list_path.display()))?;
    let units = if seconds {
        RangeUnits::Seconds
    } else {
        RangeUnits::Frames
    };
    let entries = parse_file_list(&content, units)?;
    println!("  Entries: {}", entries.len());

    let mut issues = Vec::new();
    for entry in &entries {
        let path = resolve(&entry.path);
        if !path.exists() {
            issues.push(format!("line {}: {} does not exist", entry.line, path.display()));
        }
        if entry.range_is_always_empty() {
            issues.push(format!(
                "line {}: start {:?} and end {:?} select no frames",
                entry.line, entry.start, entry.end
            ));
        }
    }
    let mut labels: Vec<i64> = entries.iter().map(|e| e.label).collect();
    labels.sort_unstable();
    labels.dedup();
    println!("  Distinct labels: {}", labels.len());

    if issues.is_empty() {
        println!("  Sources: All present, ranges non-empty");
        println!("\nFile list is valid. Ranges are checked against frame counts by `vidlane inspect`.");
    } else {
        println!("\nValidation issues:");
        for issue in &issues {
            println!("  - {issue}");
        }
        anyhow::bail!("{} issue(s) found", issues.len());
    }
    Ok(())
}
