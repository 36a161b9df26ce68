//! Snapshot save and restore.

use ember_core::{Error, Result, RunId};
use ember_world::{PanelState, SimulationResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

const SNAPSHOT_VERSION: u32 = 2;
const PREFIX: &str = "snapshot_";
const SUFFIX: &str = ".bin";

/// Final panel grids of a run and where each panel stream stopped
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub run_id: RunId,
    /// Frame the panels were captured at
    pub frame: u64,
    pub panels: Vec<PanelState>,
}

impl Snapshot {
    pub fn from_result(result: &SimulationResult) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            timestamp: chrono::Utc::now().timestamp_millis(),
            run_id: result.run_id,
            frame: result.total_frames,
            panels: result.panel_states(),
        }
    }
}

pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write `snapshot` as `snapshot_<timestamp>.bin`
    pub async fn save(&self, snapshot: &Snapshot) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).await?;

        let bytes = bincode::serialize(snapshot)?;
        let path = self
            .dir
            .join(format!("{}{}{}", PREFIX, snapshot.timestamp, SUFFIX));
        fs::write(&path, &bytes).await?;

        info!(
            run_id = %snapshot.run_id,
            frame = snapshot.frame,
            panels = snapshot.panels.len(),
            "Snapshot written to {:?}",
            path
        );
        Ok(path)
    }

    /// Load the snapshot with the newest timestamp
    pub async fn load_latest(&self) -> Result<Snapshot> {
        if !self.dir.exists() {
            return Err(Error::NotFound(format!(
                "snapshot directory {:?} does not exist",
                self.dir
            )));
        }

        let mut entries = fs::read_dir(&self.dir).await?;
        let mut latest: Option<(PathBuf, i64)> = None;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(timestamp) = snapshot_timestamp(&path) else {
                continue;
            };
            if latest.as_ref().map_or(true, |(_, newest)| timestamp > *newest) {
                latest = Some((path, timestamp));
            }
        }

        let (path, _) = latest
            .ok_or_else(|| Error::NotFound(format!("no snapshots in {:?}", self.dir)))?;
        let bytes = fs::read(&path).await?;
        let snapshot: Snapshot = bincode::deserialize(&bytes)?;

        if snapshot.version != SNAPSHOT_VERSION {
            warn!(
                "Snapshot {:?} has version {}, expected {}",
                path, snapshot.version, SNAPSHOT_VERSION
            );
            return Err(Error::Validation(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        info!("Restored snapshot {:?} at frame {}", path, snapshot.frame);
        Ok(snapshot)
    }
}

/// Timestamp encoded in a `snapshot_<timestamp>.bin` file name
fn snapshot_timestamp(path: &Path) -> Option<i64> {
    path.file_name()?
        .to_str()?
        .strip_prefix(PREFIX)?
        .strip_suffix(SUFFIX)?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_world::EnergyGrid;

    fn snapshot(timestamp: i64, frame: u64, fill: u8) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            timestamp,
            run_id: RunId::new(),
            frame,
            panels: vec![PanelState {
                grid: EnergyGrid::from_cells(3, 2, vec![fill; 6]).unwrap(),
                rng_word_pos: u128::from(frame) * 16,
            }],
        }
    }

    #[test]
    fn test_snapshot_timestamp() {
        assert_eq!(snapshot_timestamp(Path::new("/x/snapshot_123.bin")), Some(123));
        assert_eq!(snapshot_timestamp(Path::new("/x/snapshot_abc.bin")), None);
        assert_eq!(snapshot_timestamp(Path::new("/x/other_123.bin")), None);
        assert_eq!(snapshot_timestamp(Path::new("/x/snapshot_123.json")), None);
    }

    #[tokio::test]
    async fn test_load_latest_picks_newest() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        store.save(&snapshot(100, 10, 1)).await.unwrap();
        store.save(&snapshot(300, 30, 3)).await.unwrap();
        store.save(&snapshot(200, 20, 2)).await.unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").await.unwrap();

        let latest = store.load_latest().await.unwrap();
        assert_eq!(latest.frame, 30);
        assert_eq!(latest.panels[0].grid.cells(), &[3; 6]);
        assert_eq!(latest.panels[0].rng_word_pos, 480);
    }

    #[tokio::test]
    async fn test_missing_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("absent"));
        assert!(matches!(store.load_latest().await, Err(Error::NotFound(_))));

        let store = SnapshotStore::new(dir.path());
        assert!(matches!(store.load_latest().await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_old_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        let mut old = snapshot(100, 10, 1);
        old.version = 1;
        store.save(&old).await.unwrap();

        assert!(matches!(
            store.load_latest().await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("snapshot_5.bin"), b"nope").await.unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(matches!(
            store.load_latest().await,
            Err(Error::Serialization(_))
        ));
    }
}
