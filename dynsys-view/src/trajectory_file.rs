//! Reading trajectory samples from disk.
//!
//! `.json` files hold an array of rows (`[[x, y, z], ...]`). Anything else is
//! treated as delimited text: one sample per line, components separated by
//! commas, semicolons or whitespace. `#` and `%` start comment lines, and a
//! non-numeric first data line is taken as a header.

use anyhow::{anyhow, Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

pub fn load_rows(path: &Path) -> Result<Vec<Vec<f64>>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read trajectory file: {}", path.display()))?;

    let rows = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str::<Vec<Vec<f64>>>(&content)
            .with_context(|| format!("Failed to parse JSON trajectory: {}", path.display()))?,
        _ => parse_delimited(&content)
            .with_context(|| format!("Failed to parse trajectory: {}", path.display()))?,
    };
    debug!("Loaded {} samples from {}", rows.len(), path.display());
    Ok(rows)
}

pub fn parse_delimited(content: &str) -> Result<Vec<Vec<f64>>> {
    let mut rows = Vec::new();
    let mut seen_data = false;

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('%') {
            continue;
        }

        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();

        let parsed: Result<Vec<f64>, _> = fields.iter().map(|f| f.parse::<f64>()).collect();
        match parsed {
            Ok(row) => {
                rows.push(row);
                seen_data = true;
            }
            Err(_) if !seen_data => {
                debug!("Skipping header line {}: {line}", idx + 1);
                seen_data = true;
            }
            Err(e) => return Err(anyhow!("line {}: {e} in '{line}'", idx + 1)),
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_mixed_separators_and_comments() {
        let text = "# lorenz run\n\n0, 0, 0\n1;1;1\n% midpoint\n2 2\t2\n";
        let rows = parse_delimited(text).unwrap();
        assert_eq!(
            rows,
            vec![vec![0.0, 0.0, 0.0], vec![1.0, 1.0, 1.0], vec![2.0, 2.0, 2.0]]
        );
    }

    #[test]
    fn test_header_line_is_skipped() {
        let rows = parse_delimited("x,y,z\n1,2,3\n").unwrap();
        assert_eq!(rows, vec![vec![1.0, 2.0, 3.0]]);
    }

    #[test]
    fn test_bad_field_reports_line_number() {
        let err = parse_delimited("1,2,3\n4,oops,6\n").unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }

    #[test]
    fn test_scientific_notation_and_short_rows() {
        let rows = parse_delimited("1e-3 2.5E2\n-4\n").unwrap();
        assert_eq!(rows, vec![vec![0.001, 250.0], vec![-4.0]]);
    }

    #[test]
    fn test_load_json_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("points.json");
        fs::write(&path, "[[0, 1, 2], [3.5, 4, 5]]").unwrap();
        let rows = load_rows(&path).unwrap();
        assert_eq!(rows, vec![vec![0.0, 1.0, 2.0], vec![3.5, 4.0, 5.0]]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_rows(&dir.path().join("absent.csv")).is_err());
    }
}
