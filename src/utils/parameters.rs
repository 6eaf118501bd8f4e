//! structures related to processing parameters
//!
//! Each component owns its parameters, they are gathered here in [ClassificationParams]
//! which is validated once before a run and can be dumped along results.

use std::fs::OpenOptions;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::to_writer;

use crate::errors::ConfigError;

pub use crate::bootstrap::{BootstrapMethod, BootstrapParams};
pub use crate::dendrogram::{ClusteringParams, Linkage};
pub use crate::similarity::{SimilarityParams, SimilarityScheme};
pub use crate::threshold::{PairSampling, ThresholdParams};

/// Gathers parameters of similarity, thresholds, clustering, bootstrap and database resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationParams {
    similarity: SimilarityParams,
    clustering: ClusteringParams,
    threshold: ThresholdParams,
    bootstrap: BootstrapParams,
    /// a best score above this cutoff gives a provisional label when no database accepts the query
    database_cutoff: f64,
    /// keep references whose genome is incomplete
    include_incomplete_references: bool,
    /// classify queries whose genome is incomplete, otherwise only complete queries are classified
    #[serde(default = "default_include_incomplete_queries")]
    include_incomplete_queries: bool,
    /// estimate the dendrogram cutoff best separating reference groups
    virus_grouping: bool,
    nb_threads: usize,
} // end of ClassificationParams

fn default_include_incomplete_queries() -> bool {
    true
}

impl Default for ClassificationParams {
    fn default() -> Self {
        ClassificationParams {
            similarity: SimilarityParams::default(),
            clustering: ClusteringParams::default(),
            threshold: ThresholdParams::default(),
            bootstrap: BootstrapParams::default(),
            database_cutoff: 0.01,
            include_incomplete_references: false,
            include_incomplete_queries: true,
            virus_grouping: true,
            nb_threads: num_cpus::get(),
        }
    }
}

impl ClassificationParams {
    pub fn new(
        similarity: SimilarityParams,
        clustering: ClusteringParams,
        threshold: ThresholdParams,
        bootstrap: BootstrapParams,
    ) -> Self {
        ClassificationParams {
            similarity,
            clustering,
            threshold,
            bootstrap,
            ..Default::default()
        }
    }

    pub fn get_similarity_params(&self) -> &SimilarityParams {
        &self.similarity
    }

    pub fn get_clustering_params(&self) -> &ClusteringParams {
        &self.clustering
    }

    pub fn get_threshold_params(&self) -> &ThresholdParams {
        &self.threshold
    }

    pub fn get_bootstrap_params(&self) -> &BootstrapParams {
        &self.bootstrap
    }

    pub fn get_database_cutoff(&self) -> f64 {
        self.database_cutoff
    }

    pub fn set_database_cutoff(&mut self, cutoff: f64) {
        self.database_cutoff = cutoff;
    }

    pub fn include_incomplete_references(&self) -> bool {
        self.include_incomplete_references
    }

    pub fn set_include_incomplete_references(&mut self, include: bool) {
        self.include_incomplete_references = include;
    }

    pub fn include_incomplete_queries(&self) -> bool {
        self.include_incomplete_queries
    }

    pub fn set_include_incomplete_queries(&mut self, include: bool) {
        self.include_incomplete_queries = include;
    }

    pub fn virus_grouping(&self) -> bool {
        self.virus_grouping
    }

    pub fn set_virus_grouping(&mut self, grouping: bool) {
        self.virus_grouping = grouping;
    }

    pub fn get_nb_threads(&self) -> usize {
        self.nb_threads
    }

    pub fn set_nb_threads(&mut self, nb_threads: usize) {
        self.nb_threads = nb_threads;
    }

    /// checks all parameters, a run does not start on invalid parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.similarity.validate()?;
        self.threshold.validate()?;
        self.bootstrap.validate()?;
        if !(0. ..=1.).contains(&self.database_cutoff) {
            return Err(ConfigError::NotAFraction {
                name: "database_cutoff",
                value: self.database_cutoff,
            });
        }
        if self.nb_threads == 0 {
            return Err(ConfigError::NonPositive("nb_threads"));
        }
        Ok(())
    } // end of validate

    pub fn dump_json(&self, dirpath: &Path) -> Result<(), String> {
        //
        let filepath = dirpath.join("parameters.json");
        //
        log::info!("dumping ClassificationParams in json file : {:?}", filepath);
        //
        let fileres = OpenOptions::new().write(true).create(true).truncate(true).open(&filepath);
        let file = match fileres {
            Ok(file) => file,
            Err(_) => {
                log::error!("ClassificationParams dump : could not open file {:?}", filepath.as_os_str());
                println!("ClassificationParams dump: could not open file {:?}", filepath.as_os_str());
                return Err("ClassificationParams dump failed".to_string());
            }
        };
        //
        let mut writer = BufWriter::new(file);
        to_writer(&mut writer, &self).map_err(|e| format!("ClassificationParams dump failed : {}", e))?;
        //
        Ok(())
    } // end of dump_json

    /// reload from a json dump.
    pub fn reload_json(dirpath: &Path) -> Result<Self, String> {
        log::info!("in reload_json");
        //
        let filepath = dirpath.join("parameters.json");
        let fileres = OpenOptions::new().read(true).open(&filepath);
        let loadfile = match fileres {
            Ok(file) => file,
            Err(_) => {
                log::error!("ClassificationParams reload_json : could not open file {:?}", filepath.as_os_str());
                println!("ClassificationParams reload_json: could not open file {:?}", filepath.as_os_str());
                return Err("ClassificationParams reload_json could not open file".to_string());
            }
        };
        //
        let reader = BufReader::new(loadfile);
        let params: Self = serde_json::from_reader(reader)
            .map_err(|e| format!("ClassificationParams reload_json could not decode : {}", e))?;
        //
        log::info!(
            "ClassificationParams reload, scheme : {}, linkage : {}",
            params.similarity.get_scheme(),
            params.clustering.get_linkage()
        );
        //
        Ok(params)
    } // end of reload_json
} // end of impl ClassificationParams

//=====================================================================================

// end of mod tests
