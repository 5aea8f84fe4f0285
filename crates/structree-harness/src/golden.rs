//! Golden checksums for regression scenarios.
//!
//! A checksum is `blake3:` followed by the hex digest of the canonical JSON
//! form of a snapshot. Node order is normalized first, so the value depends
//! only on tree content.

use std::fs;
use std::path::{Path, PathBuf};

use structree_tree::GrowthTreeSnapshot;

use crate::error::{HarnessError, Result};

pub const CHECKSUM_PREFIX: &str = "blake3:";

/// Checksum the canonical JSON of `snapshot`.
pub fn snapshot_checksum(snapshot: &GrowthTreeSnapshot) -> Result<String> {
    let mut canonical = snapshot.clone();
    canonical.canonicalize();
    let bytes = serde_json::to_vec(&canonical)?;
    Ok(format!("{CHECKSUM_PREFIX}{}", blake3::hash(&bytes).to_hex()))
}

/// Path to the golden checksum file for a named scenario.
#[must_use]
pub fn golden_checksum_path(base_dir: &Path, scenario_name: &str) -> PathBuf {
    base_dir
        .join("golden")
        .join(format!("{scenario_name}.checksum"))
}

/// Load the expected checksum, or `None` when no golden file exists yet.
pub fn load_golden_checksum(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error.into()),
    }
}

pub fn save_golden_checksum(path: &Path, checksum: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(
        path,
        format!("# Golden checksum - do not edit manually\n{checksum}\n"),
    )?;
    Ok(())
}

/// Check if golden files should be rewritten instead of compared (BLESS mode).
#[must_use]
pub fn is_bless_mode() -> bool {
    std::env::var("BLESS").is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

pub fn verify_checksum(actual: &str, expected: &str) -> Result<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(HarnessError::ChecksumMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use structree_core::Rational;
    use structree_tree::GrowthTree;

    use super::*;

    fn snapshot(magnitude: i32) -> GrowthTreeSnapshot {
        let mut tree = GrowthTree::new(Rational::ONE).expect("tree");
        tree.evolve_by(Rational::from(magnitude)).expect("evolve");
        tree.to_snapshot()
    }

    #[test]
    fn checksum_is_prefixed_hex() {
        let checksum = snapshot_checksum(&snapshot(3)).expect("checksum");
        let digest = checksum.strip_prefix(CHECKSUM_PREFIX).expect("prefix");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn checksum_ignores_node_order() {
        let ordered = snapshot(3);
        let mut shuffled = ordered.clone();
        shuffled.nodes.reverse();
        assert_eq!(
            snapshot_checksum(&ordered).expect("checksum"),
            snapshot_checksum(&shuffled).expect("checksum")
        );
    }

    #[test]
    fn checksum_tracks_content() {
        assert_ne!(
            snapshot_checksum(&snapshot(3)).expect("checksum"),
            snapshot_checksum(&snapshot(4)).expect("checksum")
        );
    }

    #[test]
    fn golden_file_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = golden_checksum_path(dir.path(), "demo");
        assert_eq!(load_golden_checksum(&path).expect("load"), None);

        let checksum = snapshot_checksum(&snapshot(2)).expect("checksum");
        save_golden_checksum(&path, &checksum).expect("save");
        assert_eq!(load_golden_checksum(&path).expect("load"), Some(checksum));
    }

    #[test]
    fn verify_reports_both_values() {
        assert!(verify_checksum("blake3:aa", "blake3:aa").is_ok());
        let error = verify_checksum("blake3:bb", "blake3:aa").expect_err("mismatch");
        assert_eq!(
            error.to_string(),
            "golden checksum mismatch: expected blake3:aa, got blake3:bb"
        );
    }
}
