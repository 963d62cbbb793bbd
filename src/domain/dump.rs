//! Dump-file analysis
//!
//! A dump's file name and contents tell us where it came from and whether it
//! is a whole-installation or single-tenant export. Import refuses to run
//! when the evidence contradicts the requested tenant scope.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use regex::Regex;

use crate::domain::Environment;
use crate::error::ValidationError;

/// Table names that only appear in a whole-installation export
const MULTISITE_MARKERS: [&str; 2] = ["wp_blogs", "wp_site"];

/// Extract the source environment from a dump file name.
///
/// Matches `{prefix}-(dev|prod|staging|demo|local)`; returns at most one
/// environment (the first match wins).
pub fn extract_environment_from_file_name(prefix: &str, file_name: &str) -> Option<Environment> {
    let pattern = format!("{}-(dev|prod|staging|demo|local)", regex::escape(prefix));
    let re = Regex::new(&pattern).expect("static pattern");

    re.captures(file_name)
        .and_then(|c| c.get(1))
        .and_then(|m| Environment::from_str(m.as_str()))
}

/// Whether the file name indicates a whole-installation export.
///
/// Single-tenant exports carry a `site` marker (`...-site-5-...`); a name
/// without the word is taken to be a full multisite dump.
pub fn is_multisite_export_name(file_name: &str) -> bool {
    let re = Regex::new(r"\bsite\b").expect("static pattern");
    !re.is_match(file_name)
}

/// Check that the path points at a readable `.sql` file
pub fn validate_sql_file(path: &Path) -> Result<(), ValidationError> {
    let is_sql = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("sql"))
        .unwrap_or(false);

    if !is_sql {
        return Err(ValidationError::NotSqlFile {
            path: path.display().to_string(),
        });
    }

    if !path.is_file() {
        return Err(ValidationError::FileMissing {
            path: path.display().to_string(),
        });
    }

    Ok(())
}

/// Scan the dump for multisite table markers.
///
/// Streams the file line by line; at least two marker hits count as a
/// multisite dump (each marker appears in both DROP and CREATE statements,
/// so a genuine multisite export clears this easily).
pub fn contains_multisite_tables(path: &Path) -> Result<bool, ValidationError> {
    let file = File::open(path).map_err(|_| ValidationError::FileMissing {
        path: path.display().to_string(),
    })?;

    let mut found = 0;
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|_| ValidationError::FileMissing {
            path: path.display().to_string(),
        })?;

        for marker in MULTISITE_MARKERS {
            if line.contains(marker) {
                found += 1;
                if found >= 2 {
                    return Ok(true);
                }
            }
        }
    }

    Ok(false)
}

/// Cross-check the requested tenant scope against what the dump contains.
///
/// A dump with multisite tables cannot be imported into a single tenant, and
/// a single-site dump cannot be imported without naming the tenant.
pub fn validate_tenant_scope(path: &Path, blog_id: Option<u64>) -> Result<(), ValidationError> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    let multisite_name = is_multisite_export_name(file_name);
    let multisite_tables = contains_multisite_tables(path)?;

    if multisite_name && multisite_tables && blog_id.is_some() {
        return Err(ValidationError::MultisiteDumpWithTenantScope);
    }

    if !multisite_name && !multisite_tables && blog_id.is_none() {
        return Err(ValidationError::SingleSiteDumpWithoutTenantScope);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PREFIX: &str = "mosaic-platform";

    fn dump_with(content: &str, name: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let mut file = File::create(dir.path().join(name)).unwrap();
        write!(file, "{content}").unwrap();
        dir
    }

    #[test]
    fn test_extract_environment_matches_each_environment() {
        for (name, expected) in [
            ("mosaic-platform-dev-2024-01-01-00-00-00.sql", Environment::Dev),
            ("mosaic-platform-prod-2024-01-01-00-00-00.sql", Environment::Prod),
            ("mosaic-platform-staging-site-3-x.sql", Environment::Staging),
            ("mosaic-platform-demo.sql", Environment::Demo),
            ("mosaic-platform-local.sql", Environment::Local),
        ] {
            assert_eq!(
                extract_environment_from_file_name(PREFIX, name),
                Some(expected),
                "{name}"
            );
        }
    }

    #[test]
    fn test_extract_environment_no_match() {
        assert_eq!(
            extract_environment_from_file_name(PREFIX, "customer-backup.sql"),
            None
        );
        assert_eq!(
            extract_environment_from_file_name(PREFIX, "other-platform-dev.sql"),
            None
        );
    }

    #[test]
    fn test_extract_environment_first_match_wins() {
        // A name containing two environment words yields exactly one result
        assert_eq!(
            extract_environment_from_file_name(
                PREFIX,
                "mosaic-platform-dev-copy-of-mosaic-platform-prod.sql"
            ),
            Some(Environment::Dev)
        );
    }

    #[test]
    fn test_multisite_export_name() {
        assert!(is_multisite_export_name(
            "mosaic-platform-dev-2024-01-01-00-00-00.sql"
        ));
        assert!(!is_multisite_export_name(
            "mosaic-platform-dev-site-5-2024-01-01-00-00-00.sql"
        ));
    }

    #[test]
    fn test_validate_sql_file() {
        let dir = dump_with("SELECT 1;", "dump.sql");
        assert!(validate_sql_file(&dir.path().join("dump.sql")).is_ok());

        let err = validate_sql_file(Path::new("dump.tar.gz")).unwrap_err();
        assert!(matches!(err, ValidationError::NotSqlFile { .. }));

        let err = validate_sql_file(Path::new("missing.sql")).unwrap_err();
        assert!(matches!(err, ValidationError::FileMissing { .. }));
    }

    #[test]
    fn test_multisite_markers_detected() {
        let dir = dump_with(
            "DROP TABLE IF EXISTS `wp_blogs`;\nCREATE TABLE `wp_site` (id int);\n",
            "dump.sql",
        );
        assert!(contains_multisite_tables(&dir.path().join("dump.sql")).unwrap());

        let single = dump_with(
            "DROP TABLE IF EXISTS `wp_5_posts`;\nCREATE TABLE `wp_5_posts` (id int);\n",
            "single.sql",
        );
        assert!(!contains_multisite_tables(&single.path().join("single.sql")).unwrap());
    }

    #[test]
    fn test_tenant_scope_rejects_multisite_dump_with_blog_id() {
        let dir = dump_with(
            "CREATE TABLE `wp_blogs` (id int);\nCREATE TABLE `wp_site` (id int);\n",
            "mosaic-platform-dev-2024-01-01-00-00-00.sql",
        );
        let path = dir.path().join("mosaic-platform-dev-2024-01-01-00-00-00.sql");

        let err = validate_tenant_scope(&path, Some(5)).unwrap_err();
        assert!(matches!(err, ValidationError::MultisiteDumpWithTenantScope));

        // Same dump without tenant scope is fine
        assert!(validate_tenant_scope(&path, None).is_ok());
    }

    #[test]
    fn test_tenant_scope_requires_blog_id_for_single_site_dump() {
        let dir = dump_with(
            "CREATE TABLE `wp_5_posts` (id int);\n",
            "mosaic-platform-dev-site-5-2024-01-01-00-00-00.sql",
        );
        let path = dir
            .path()
            .join("mosaic-platform-dev-site-5-2024-01-01-00-00-00.sql");

        let err = validate_tenant_scope(&path, None).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::SingleSiteDumpWithoutTenantScope
        ));

        assert!(validate_tenant_scope(&path, Some(5)).is_ok());
    }
}
