//! Model archive: persists improving networks while a search runs.

use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::compute::BooleanNetwork;
use crate::compute::persistence::{NetworkIoError, write_json};
use crate::schema::{ArchiveConfig, ArchivedModel, ModelStats};

/// File holding the most recent improving model.
pub const LAST_MODEL_NAME: &str = "bn_last.json";

/// Writes improving models to an output directory.
///
/// Every improvement overwrites [`LAST_MODEL_NAME`]; improvements at or below the
/// save threshold also get a numbered copy `bn_subopt_it{iteration}.json`.
#[derive(Debug)]
pub struct ModelArchive {
    output_dir: PathBuf,
    save_threshold: Option<f64>,
    best_distance: f64,
    saved: Vec<PathBuf>,
}

impl ModelArchive {
    /// Create an archive, creating its output directory.
    pub fn new(config: &ArchiveConfig) -> Result<Self, NetworkIoError> {
        fs::create_dir_all(&config.output_dir)?;
        Ok(Self {
            output_dir: config.output_dir.clone(),
            save_threshold: config.save_threshold,
            best_distance: f64::INFINITY,
            saved: Vec::new(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Best distance recorded so far.
    pub fn best_distance(&self) -> f64 {
        self.best_distance
    }

    /// Numbered models written so far.
    pub fn saved(&self) -> &[PathBuf] {
        &self.saved
    }

    pub fn last_model_path(&self) -> PathBuf {
        self.output_dir.join(LAST_MODEL_NAME)
    }

    /// Record a network reached at `iteration` with `distance`.
    ///
    /// Returns whether the network improved on every earlier record (and was saved).
    pub fn record(
        &mut self,
        iteration: usize,
        distance: f64,
        network: &BooleanNetwork,
    ) -> Result<bool, NetworkIoError> {
        if distance >= self.best_distance {
            return Ok(false);
        }
        self.best_distance = distance;

        let archived = ArchivedModel {
            model: network.to_model(),
            stats: ModelStats {
                distance,
                iteration,
            },
        };

        if self.save_threshold.is_some_and(|t| distance <= t) {
            let path = self
                .output_dir
                .join(format!("bn_subopt_it{}.json", iteration));
            write_json(&path, &archived)?;
            info!("Saved suboptimal model {} (distance {})", path.display(), distance);
            self.saved.push(path);
        }

        write_json(self.last_model_path(), &archived)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::load_network;
    use crate::compute::network::tests::two_cycle_network;

    fn archive(dir: &Path, save_threshold: Option<f64>) -> ModelArchive {
        ModelArchive::new(&ArchiveConfig {
            output_dir: dir.join("models"),
            save_threshold,
        })
        .unwrap()
    }

    #[test]
    fn test_saves_only_improvements() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = archive(dir.path(), None);
        let bn = two_cycle_network();

        assert!(archive.record(0, 3.0, &bn).unwrap());
        assert!(!archive.record(1, 3.0, &bn).unwrap());
        assert!(archive.record(2, 1.0, &bn).unwrap());
        assert_eq!(archive.best_distance(), 1.0);
        assert!(archive.saved().is_empty());

        let json = fs::read_to_string(archive.last_model_path()).unwrap();
        let saved: ArchivedModel = serde_json::from_str(&json).unwrap();
        assert_eq!(saved.stats.iteration, 2);
        assert_eq!(saved.stats.distance, 1.0);

        // The archived file is still a loadable network.
        assert_eq!(load_network(archive.last_model_path()).unwrap(), bn);
    }

    #[test]
    fn test_threshold_keeps_numbered_copies() {
        let dir = tempfile::tempdir().unwrap();
        let mut archive = archive(dir.path(), Some(2.0));
        let bn = two_cycle_network();

        archive.record(0, 5.0, &bn).unwrap();
        archive.record(4, 2.0, &bn).unwrap();
        archive.record(9, 0.5, &bn).unwrap();

        let names: Vec<String> = archive
            .saved()
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["bn_subopt_it4.json", "bn_subopt_it9.json"]);
        assert!(archive.saved().iter().all(|p| p.exists()));
    }
}
