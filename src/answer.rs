//! contains answers to classification requests
//!
//! - results are dumped as text, one block per query with its final label and one line per database,
//! - thresholds of a database are dumped in csv,
//! - dendrograms are dumped in newick format with supports.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::classify::{ClassificationOutput, ClassificationResult, DatabaseReport, FinalLabel};
use crate::threshold::GroupThreshold;

/// An answer has a rank (in which the query was first met), the query id, its final label
/// and its results in each database.
pub struct QueryAnswer<'a> {
    rank: usize,
    query: &'a str,
    label: &'a FinalLabel,
    results: Vec<&'a ClassificationResult>,
}

impl<'a> QueryAnswer<'a> {
    pub fn new(rank: usize, query: &'a str, label: &'a FinalLabel, results: Vec<&'a ClassificationResult>) -> Self {
        QueryAnswer {
            rank,
            query,
            label,
            results,
        }
    }

    /// gathers answers of all queries of a run
    pub fn from_output(output: &'a ClassificationOutput) -> Vec<QueryAnswer<'a>> {
        output
            .final_labels
            .iter()
            .enumerate()
            .map(|(rank, (query, label))| {
                let results = output
                    .reports
                    .iter()
                    .filter_map(|rep| rep.results.iter().find(|r| &r.query == query))
                    .collect();
                QueryAnswer::new(rank, query, label, results)
            })
            .collect()
    }

    pub fn get_query(&self) -> &str {
        self.query
    }

    /// dumps the answer, returns the number of database lines written
    pub fn dump<W: Write>(&self, out: &mut W) -> std::io::Result<usize> {
        match self.label {
            FinalLabel::Assigned { group, database, score } => writeln!(
                out,
                "\n{}\t{}\tassigned\t{}\t{}\t{:.4}",
                self.rank, self.query, group, database, score
            )?,
            FinalLabel::Provisional { group, database, score } => writeln!(
                out,
                "\n{}\t{}\tprovisional\t{}\t{}\t{:.4}",
                self.rank, self.query, group, database, score
            )?,
            FinalLabel::Unclassified => writeln!(out, "\n{}\t{}\tunclassified", self.rank, self.query)?,
        }
        for r in &self.results {
            let threshold = r.threshold.map(|t| format!("{:.4}", t)).unwrap_or_else(|| "NA".to_string());
            let support = r.support.map(|s| format!("{:.3}", s)).unwrap_or_else(|| "NA".to_string());
            write!(
                out,
                "\t{}\t{}\t{}\t{:.4}\t{}\t{:?}\t{:?}\t{:?}\t{}",
                r.database,
                r.candidate.as_deref().unwrap_or("NA"),
                r.best_reference.as_deref().unwrap_or("NA"),
                r.score,
                threshold,
                r.threshold_test,
                r.topology_test,
                r.verdict,
                support
            )?;
            for w in &r.warnings {
                write!(out, "\t{}", w)?;
            }
            writeln!(out)?;
        }
        Ok(self.results.len())
    } // end of dump
} // end of impl QueryAnswer

/// dumps all answers in a file, returns the number of queries
pub fn dump_answers(output: &ClassificationOutput, outpath: &Path) -> anyhow::Result<usize> {
    log::info!("dumping results in {:?}", outpath);
    let outfile = OpenOptions::new().write(true).create(true).truncate(true).open(outpath)?;
    let mut out = BufWriter::new(outfile);
    writeln!(out, "rank\tquery\tlabel\tgroup\tdatabase\tscore")?;
    writeln!(
        out,
        "\tdatabase\tcandidate\tbest_reference\tscore\tthreshold\tthreshold_test\ttopology_test\tverdict\tsupport\twarnings"
    )?;
    let answers = QueryAnswer::from_output(output);
    for a in &answers {
        a.dump(&mut out)?;
    }
    out.flush()?;
    Ok(answers.len())
} // end of dump_answers

/// dumps the threshold table of a database in csv
pub fn dump_thresholds_csv<W: Write>(report: &DatabaseReport, out: W) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(["database", "group", "threshold", "n_intra", "n_inter", "mean_intra", "mean_inter", "status"])?;
    for (group, t) in report.thresholds.iter() {
        match t {
            GroupThreshold::Fitted {
                threshold,
                n_intra,
                n_inter,
                mean_intra,
                mean_inter,
                fallback,
            } => {
                let status = if *fallback { "fallback" } else { "fitted" };
                wtr.write_record([
                    report.name.clone(),
                    group.clone(),
                    format!("{:.6}", threshold),
                    n_intra.to_string(),
                    n_inter.to_string(),
                    format!("{:.6}", mean_intra),
                    format!("{:.6}", mean_inter),
                    status.to_string(),
                ])?;
            }
            GroupThreshold::Untestable { reason } => {
                wtr.write_record([
                    report.name.as_str(),
                    group.as_str(),
                    "",
                    "",
                    "",
                    "",
                    "",
                    reason.as_str(),
                ])?;
            }
        }
    }
    wtr.flush()?;
    Ok(())
} // end of dump_thresholds_csv

/// dumps the dendrogram of a database in newick, nothing is written if there is no dendrogram
pub fn dump_newick(report: &DatabaseReport, outpath: &Path) -> anyhow::Result<bool> {
    let Some(tree) = report.dendrogram.as_ref() else {
        log::warn!("database {} has no dendrogram to dump", report.name);
        return Ok(false);
    };
    let outfile = OpenOptions::new().write(true).create(true).truncate(true).open(outpath)?;
    let mut out = BufWriter::new(outfile);
    writeln!(out, "{}", tree.to_newick(&report.leaf_names))?;
    out.flush()?;
    Ok(true)
}

//=====================================================================================

// end of mod tests
