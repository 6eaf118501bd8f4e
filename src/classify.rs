//! Classification of query viruses against one or more reference databases.
//!
//! For each database a [RunContext] holds everything computed for that database : references kept after
//! completeness filtering, queries kept after completeness filtering, similarities (references first, then queries), group thresholds,
//! the dendrogram of references and queries, bootstrap supports and the optional grouping report.
//! Nothing is shared between databases or between runs.
//!
//! Each query gets a candidate group (group of its best scoring reference) and a verdict per database.
//! The final label is then resolved across databases.

use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::time::SystemTime;

use cpu_time::ProcessTime;
use serde::{Deserialize, Serialize};

use crate::bootstrap::bootstrap_supports;
use crate::dendrogram::{build_dendrogram, Dendrogram};
use crate::errors::{ClassifyError, ConfigError, Warning};
use crate::grouping::{estimate_grouping, GroupingReport};
use crate::neighborhood::{evaluate, ThresholdTest, TopologyTest, Verdict};
use crate::signature::{Entity, Signature};
use crate::similarity::{similarity_matrix, DistanceMatrix, SimilarityMatrix};
use crate::threshold::{estimate_thresholds, ThresholdTable};
use crate::utils::parameters::ClassificationParams;

/// A reference database : named references and the signatures of queries computed against its profiles.
#[derive(Debug, Clone)]
pub struct Database {
    name: String,
    references: Vec<Entity>,
    queries: Vec<Entity>,
}

impl Database {
    /// references must carry a group, all signatures must share one layout and identities must be unique
    pub fn new(name: &str, references: Vec<Entity>, queries: Vec<Entity>) -> Result<Self, ConfigError> {
        let mut ids = HashSet::<&str>::new();
        for e in references.iter().chain(queries.iter()) {
            if !ids.insert(e.get_id()) {
                return Err(ConfigError::DuplicatedEntity(e.get_id().to_string()));
            }
        }
        if let Some(e) = references.iter().find(|e| !e.is_reference()) {
            return Err(ConfigError::UnlabelledReference(e.get_id().to_string()));
        }
        let mut all = references.iter().chain(queries.iter());
        if let Some(first) = all.next() {
            for e in all {
                if !first.get_signature().shares_layout(e.get_signature()) {
                    return Err(ConfigError::LayoutMismatch(
                        first.get_id().to_string(),
                        e.get_id().to_string(),
                    ));
                }
            }
        }
        Ok(Database {
            name: name.to_string(),
            references,
            queries,
        })
    } // end of new

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_references(&self) -> &[Entity] {
        &self.references
    }

    pub fn get_queries(&self) -> &[Entity] {
        &self.queries
    }
} // end of impl Database

//=====================================================================================

/// outcome of one query against one database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub query: String,
    pub database: String,
    pub candidate: Option<String>,
    pub best_reference: Option<String>,
    pub score: f64,
    pub threshold: Option<f64>,
    pub threshold_test: ThresholdTest,
    pub topology_test: TopologyTest,
    pub verdict: Verdict,
    /// bootstrap support of the clade formed by the query and its sister clade
    pub support: Option<f64>,
    pub warnings: Vec<Warning>,
}

/// label of a query resolved across databases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FinalLabel {
    /// accepted by at least one database, highest score wins
    Assigned { group: String, database: String, score: f64 },
    /// no database accepted, but the best score is above the database cutoff
    Provisional { group: String, database: String, score: f64 },
    Unclassified,
}

/// Resolution of the results of one query, given in database order.
/// Accepted result with maximal score (first database on ties), else the best scoring candidate
/// as provisional label if its score exceeds database_cutoff, else unclassified.
pub fn resolve_final_label(results: &[ClassificationResult], database_cutoff: f64) -> FinalLabel {
    let mut accepted: Option<&ClassificationResult> = None;
    let mut best: Option<&ClassificationResult> = None;
    for r in results.iter().filter(|r| r.candidate.is_some()) {
        if r.verdict == Verdict::Accepted && accepted.map_or(true, |a| r.score > a.score) {
            accepted = Some(r);
        }
        if best.map_or(true, |b| r.score > b.score) {
            best = Some(r);
        }
    }
    if let Some(a) = accepted {
        return FinalLabel::Assigned {
            group: a.candidate.clone().unwrap_or_default(),
            database: a.database.clone(),
            score: a.score,
        };
    }
    match best {
        Some(b) if b.score > database_cutoff => FinalLabel::Provisional {
            group: b.candidate.clone().unwrap_or_default(),
            database: b.database.clone(),
            score: b.score,
        },
        _ => FinalLabel::Unclassified,
    }
} // end of resolve_final_label

//=====================================================================================

/// everything computed for one database in one run
pub struct RunContext<'a> {
    database: &'a Database,
    references: Vec<&'a Entity>,
    queries: Vec<&'a Entity>,
    similarity: SimilarityMatrix,
    thresholds: ThresholdTable,
    dendrogram: Option<Dendrogram>,
    grouping: Option<GroupingReport>,
    warnings: Vec<Warning>,
}

impl<'a> RunContext<'a> {
    /// computes similarities, thresholds, dendrogram, bootstrap supports and grouping of a database.
    /// Must be called inside the rayon pool of the run.
    pub fn new(
        database: &'a Database,
        params: &ClassificationParams,
        cancel: &AtomicBool,
    ) -> Result<Self, ClassifyError> {
        let references: Vec<&Entity> = database
            .references
            .iter()
            .filter(|e| e.is_complete() || params.include_incomplete_references())
            .collect();
        let queries: Vec<&Entity> = database
            .queries
            .iter()
            .filter(|e| e.is_complete() || params.include_incomplete_queries())
            .collect();
        log::info!(
            "database {} : {} references kept out of {}, {} queries kept out of {}",
            database.name,
            references.len(),
            database.references.len(),
            queries.len(),
            database.queries.len()
        );
        let mut warnings = Vec::<Warning>::new();
        if references.is_empty() {
            log::warn!("database {} has no reference", database.name);
            warnings.push(Warning::NoReference);
        }
        let signatures: Vec<&Signature> = references
            .iter()
            .copied()
            .chain(queries.iter().copied())
            .map(|e| e.get_signature())
            .collect();
        let sim_params = params.get_similarity_params();
        let similarity = similarity_matrix(&signatures, sim_params, None)?;
        //
        let labels: Vec<&str> = references.iter().filter_map(|e| e.get_group()).collect();
        let thresholds = estimate_thresholds(&labels, &similarity, params.get_threshold_params());
        warnings.extend(thresholds.warnings());
        //
        let linkage = params.get_clustering_params().get_linkage();
        let distances = DistanceMatrix::from_similarity(&similarity, sim_params.get_p());
        let mut dendrogram = match build_dendrogram(&distances, linkage) {
            Ok(tree) => Some(tree),
            Err(ClassifyError::DegenerateInput(msg)) => {
                log::warn!("database {} : {}", database.name, msg);
                warnings.push(Warning::TopologySkipped(msg));
                None
            }
            Err(e) => return Err(e),
        };
        //
        let bootstrap = params.get_bootstrap_params();
        if let Some(tree) = dendrogram.as_mut() {
            if bootstrap.is_enabled() {
                let supports = bootstrap_supports(&signatures, sim_params, linkage, tree, bootstrap, cancel)?;
                tree.set_supports(&supports);
            }
        }
        //
        let mut context = RunContext {
            database,
            references,
            queries,
            similarity,
            thresholds,
            dendrogram,
            grouping: None,
            warnings,
        };
        let grouping = match (params.virus_grouping(), context.dendrogram.as_ref()) {
            (true, Some(tree)) => estimate_grouping(tree, &context.leaf_labels()),
            _ => None,
        };
        context.grouping = grouping;
        Ok(context)
    } // end of new

    /// group of each leaf, None for queries
    pub fn leaf_labels(&self) -> Vec<Option<&str>> {
        self.references
            .iter()
            .map(|e| e.get_group())
            .chain(self.queries.iter().map(|_| None))
            .collect()
    }

    /// names of dendrogram leaves, references first
    pub fn leaf_names(&self) -> Vec<String> {
        self.references
            .iter()
            .copied()
            .chain(self.queries.iter().copied())
            .map(|e| e.get_id().to_string())
            .collect()
    }

    pub fn get_thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    pub fn get_dendrogram(&self) -> Option<&Dendrogram> {
        self.dendrogram.as_ref()
    }

    /// best scoring reference of a leaf, lowest rank on ties
    fn best_reference(&self, leaf: usize) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;
        for r in 0..self.references.len() {
            let s = self.similarity.get(leaf, r);
            if best.map_or(true, |(_, bs)| s > bs) {
                best = Some((r, s));
            }
        }
        best
    }

    /// evaluates the query of rank k among the queries kept in the database
    pub fn classify_query(&self, k: usize) -> ClassificationResult {
        let query = self.queries[k];
        let leaf = self.references.len() + k;
        let labels = self.leaf_labels();
        let support = self.dendrogram.as_ref().and_then(|t| {
            t.get_node(leaf)
                .get_parent()
                .and_then(|p| t.get_node(p).get_support())
        });
        let best = self
            .best_reference(leaf)
            .and_then(|(r, s)| self.references[r].get_group().map(|g| (r, g, s)));
        let Some((r, candidate, score)) = best else {
            return ClassificationResult {
                query: query.get_id().to_string(),
                database: self.database.name.clone(),
                candidate: None,
                best_reference: None,
                score: 0.,
                threshold: None,
                threshold_test: ThresholdTest::Untestable,
                topology_test: TopologyTest::NotPerformed,
                verdict: Verdict::Rejected,
                support,
                warnings: vec![Warning::NoReference],
            };
        };
        let evaluation = evaluate(
            score,
            candidate,
            &self.thresholds,
            self.dendrogram.as_ref(),
            leaf,
            &labels,
        );
        log::debug!(
            "query {} database {} : candidate {} score {:.4e} verdict {:?}",
            query.get_id(),
            self.database.name,
            candidate,
            score,
            evaluation.verdict
        );
        ClassificationResult {
            query: query.get_id().to_string(),
            database: self.database.name.clone(),
            candidate: Some(candidate.to_string()),
            best_reference: Some(self.references[r].get_id().to_string()),
            score,
            threshold: self.thresholds.get(candidate).and_then(|t| t.get_threshold()),
            threshold_test: evaluation.threshold_test,
            topology_test: evaluation.topology_test,
            verdict: evaluation.verdict,
            support,
            warnings: evaluation.warnings,
        }
    } // end of classify_query

    /// classifies all queries and keeps what is needed for audit
    pub fn into_report(self) -> DatabaseReport {
        let results = (0..self.queries.len())
            .map(|k| self.classify_query(k))
            .collect();
        let leaf_names = self.leaf_names();
        DatabaseReport {
            name: self.database.name.clone(),
            leaf_names,
            thresholds: self.thresholds,
            dendrogram: self.dendrogram,
            grouping: self.grouping,
            warnings: self.warnings,
            results,
        }
    }
} // end of impl RunContext

/// audit of a database run
#[derive(Debug, Clone)]
pub struct DatabaseReport {
    pub name: String,
    /// references kept then queries, indexed as dendrogram leaves
    pub leaf_names: Vec<String>,
    pub thresholds: ThresholdTable,
    pub dendrogram: Option<Dendrogram>,
    pub grouping: Option<GroupingReport>,
    pub warnings: Vec<Warning>,
    /// one result per query, in query order
    pub results: Vec<ClassificationResult>,
}

/// reports of all databases and the resolved label of each query
#[derive(Debug, Clone)]
pub struct ClassificationOutput {
    pub reports: Vec<DatabaseReport>,
    /// queries in order of first appearance across databases
    pub final_labels: Vec<(String, FinalLabel)>,
}

/// Classifies queries against each database in turn, then resolves final labels.
/// Parameters are validated first, the run uses a rayon pool of nb_threads threads.
pub fn classify_databases(
    databases: &[Database],
    params: &ClassificationParams,
    cancel: &AtomicBool,
) -> Result<ClassificationOutput, ClassifyError> {
    params.validate()?;
    let cpu_start = ProcessTime::now();
    let sys_now = SystemTime::now();
    //
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(params.get_nb_threads())
        .build()
        .map_err(|e| ClassifyError::ThreadPool(e.to_string()))?;
    let reports = pool.install(|| -> Result<Vec<DatabaseReport>, ClassifyError> {
        let mut reports = Vec::<DatabaseReport>::with_capacity(databases.len());
        for db in databases {
            let context = RunContext::new(db, params, cancel)?;
            reports.push(context.into_report());
        }
        Ok(reports)
    })?;
    //
    let mut query_ids = Vec::<String>::new();
    let mut seen = HashSet::<String>::new();
    for report in &reports {
        for r in &report.results {
            if seen.insert(r.query.clone()) {
                query_ids.push(r.query.clone());
            }
        }
    }
    let final_labels: Vec<(String, FinalLabel)> = query_ids
        .into_iter()
        .map(|q| {
            let results: Vec<ClassificationResult> = reports
                .iter()
                .filter_map(|rep| rep.results.iter().find(|r| r.query == q).cloned())
                .collect();
            let label = resolve_final_label(&results, params.get_database_cutoff());
            (q, label)
        })
        .collect();
    //
    log::info!(
        "classification of {} queries against {} databases, sys time(ms) {:?} cpu time(ms) {:?}",
        final_labels.len(),
        databases.len(),
        sys_now.elapsed().map(|d| d.as_millis()).unwrap_or(0),
        cpu_start.elapsed().as_millis()
    );
    Ok(ClassificationOutput {
        reports,
        final_labels,
    })
} // end of classify_databases

//=====================================================================================

// end of mod tests
