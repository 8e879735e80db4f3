use std::path::Path;
use tracing::error;

use crate::table::Table;

/// Required columns absent from `table`, in the order they were requested
pub fn missing_columns(table: &Table, required_columns: &[&str]) -> Vec<String> {
    required_columns
        .iter()
        .filter(|c| !table.has_column(c))
        .map(|c| c.to_string())
        .collect()
}

/// Whether `table` carries every required column. Missing columns are
/// logged; callers decide whether that aborts anything.
pub fn validate_schema(table: &Table, required_columns: &[&str]) -> bool {
    let missing = missing_columns(table, required_columns);
    if missing.is_empty() {
        return true;
    }
    error!(missing = ?missing, "Missing required columns");
    false
}

/// Whether `path` exists; logs when it does not
pub fn validate_file_exists(path: &Path) -> bool {
    if path.exists() {
        return true;
    }
    error!(path = %path.display(), "File not found");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use tempfile::tempdir;

    fn table(columns: &[&str]) -> Table {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        Table::from_rows(columns, Vec::<Vec<Value>>::new()).unwrap()
    }

    #[test]
    fn test_validate_schema_accepts_superset() {
        let t = table(&["col1", "col2", "extra"]);
        assert!(validate_schema(&t, &["col1", "col2"]));
        assert!(validate_schema(&t, &[]));
    }

    #[test]
    fn test_validate_schema_rejects_missing_column() {
        let t = table(&["col1", "col2"]);
        assert!(!validate_schema(&t, &["col1", "col3"]));
        assert_eq!(missing_columns(&t, &["col3", "col1", "col4"]), vec!["col3", "col4"]);
    }

    #[test]
    fn test_validate_file_exists() {
        let dir = tempdir().unwrap();
        let present = dir.path().join("present.csv");
        std::fs::write(&present, "a\n").unwrap();

        assert!(validate_file_exists(&present));
        assert!(!validate_file_exists(&dir.path().join("absent.csv")));
    }
}
