// GRAVCLASS v0.1.0
// Copyright 2021-2022, Jean Pierre Both and Jianshu Zhao.
// Licensed under the MIT license (http://opensource.org/licenses/MIT).
// This file may not be copied, modified, or distributed except according to those terms.

//! gravclass --input [-i] run.json --outdir [-o] dir \[options\]
//!
//! --input : json file describing databases, references and query signatures (see module utils::files)
//!
//! --outdir : directory where results are written. Default is current directory.
//!     - classification.txt : final label of each query and its evaluation in each database
//!     - thresholds_<db>.csv : group thresholds of each database
//!     - dendrogram_<db>.nwk : dendrogram of references and queries with bootstrap supports
//!     - parameters.json : parameters used
//!
//! --params : directory containing a parameters.json dump. If given, all options below are ignored.
//!
//! --scheme : similarity scheme among P, G, L, PG, PL. Default PG.
//!
//! --p : distance transformation exponent in D = 1 - S^p. Default 1. (inf accepted)
//!
//! --linkage : single, complete, average, weighted, centroid, median, ward. Default average.
//!
//! --nbboot : number of bootstrap replicates, 0 disables bootstrap. Default 10.
//!
//! --bootmethod : booster or sumtrees. Default booster.
//!
//! --pairs : number of pairs sampled per population for threshold estimation. Default 10000.
//!
//! --sampling : random or exhaustive. Default random.
//!
//! --overlap : fraction of the shorter hit location that must be overlapped for a profile to be credited in GJ_L. Default 0.5.
//!
//! --svmc : regularisation constant of the threshold svm. Default 1.
//!
//! --cutoff : score above which a query rejected everywhere gets a provisional label. Default 0.01.
//!
//! --seed : seed of random generators. Default 0.
//!
//! --threads : number of threads. Default is number of cpus.
//!
//! --incomplete : keep references with incomplete genomes.
//!
//! --completequeries : classify only queries with complete genomes.
//!
//! --nogrouping : skip the estimation of the dendrogram cutoff separating reference groups.

use std::fs::OpenOptions;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::anyhow;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
// for logging (debug mostly, switched at compile time in cargo.toml)
use env_logger::Builder;

use gravclass::answer::{dump_answers, dump_newick, dump_thresholds_csv};
use gravclass::classify::{classify_databases, FinalLabel};
use gravclass::utils::*;

// install a logger facility
pub fn init_log() -> u64 {
    Builder::from_default_env().init();
    println!("\n ************** initializing logger *****************\n");
    1
}

fn params_from_args(matches: &ArgMatches) -> anyhow::Result<ClassificationParams> {
    if let Some(dir) = matches.get_one::<String>("params") {
        println!("reloading parameters from {}", dir);
        return ClassificationParams::reload_json(Path::new(dir)).map_err(|e| anyhow!(e));
    }
    let scheme = SimilarityScheme::parse(matches.get_one::<String>("scheme").map_or("PG", |s| s.as_str()))?;
    let p = *matches.get_one::<f64>("p").unwrap_or(&1.);
    let linkage = Linkage::parse(matches.get_one::<String>("linkage").map_or("average", |s| s.as_str()))?;
    let nb_boot = *matches.get_one::<usize>("nbboot").unwrap_or(&10);
    let boot_method =
        BootstrapMethod::parse(matches.get_one::<String>("bootmethod").map_or("booster", |s| s.as_str()))?;
    let n_pairs = *matches.get_one::<usize>("pairs").unwrap_or(&10000);
    let sampling = PairSampling::parse(matches.get_one::<String>("sampling").map_or("random", |s| s.as_str()))?;
    let seed = *matches.get_one::<u64>("seed").unwrap_or(&0);
    let overlap = *matches.get_one::<f64>("overlap").unwrap_or(&0.5);
    let svm_c = *matches.get_one::<f64>("svmc").unwrap_or(&1.);
    //
    let mut params = ClassificationParams::new(
        SimilarityParams::new(scheme, p, overlap),
        ClusteringParams::new(linkage),
        ThresholdParams::new(n_pairs, sampling, svm_c, seed),
        BootstrapParams::new(nb_boot > 0, nb_boot, boot_method, seed),
    );
    if let Some(cutoff) = matches.get_one::<f64>("cutoff") {
        params.set_database_cutoff(*cutoff);
    }
    if let Some(nb_threads) = matches.get_one::<usize>("threads") {
        params.set_nb_threads(*nb_threads);
    }
    params.set_include_incomplete_references(matches.get_flag("incomplete"));
    params.set_include_incomplete_queries(!matches.get_flag("completequeries"));
    params.set_virus_grouping(!matches.get_flag("nogrouping"));
    Ok(params)
} // end of params_from_args

fn build_cli() -> Command {
    Command::new("gravclass")
        .arg_required_else_help(true)
        .version("0.1.0")
        .about("Virus classification by generalised jaccard similarities, group thresholds and dendrogram topology")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .help("json file describing databases, references and queries")
                .required(true)
                .value_parser(value_parser!(String)),
        )
        .arg(
            Arg::new("outdir")
                .short('o')
                .long("outdir")
                .help("output directory")
                .required(false)
                .value_parser(value_parser!(String)),
        )
        .arg(
            Arg::new("params")
                .long("params")
                .help("directory containing a parameters.json dump")
                .required(false)
                .value_parser(value_parser!(String)),
        )
        .arg(
            Arg::new("scheme")
                .long("scheme")
                .help("similarity scheme : P, G, L, PG or PL")
                .required(false)
                .value_parser(value_parser!(String)),
        )
        .arg(
            Arg::new("p")
                .long("p")
                .help("distance transformation exponent")
                .required(false)
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("linkage")
                .long("linkage")
                .help("single, complete, average, weighted, centroid, median or ward")
                .required(false)
                .value_parser(value_parser!(String)),
        )
        .arg(
            Arg::new("nbboot")
                .long("nbboot")
                .help("number of bootstrap replicates, 0 to disable")
                .required(false)
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("bootmethod")
                .long("bootmethod")
                .help("booster or sumtrees")
                .required(false)
                .value_parser(value_parser!(String)),
        )
        .arg(
            Arg::new("pairs")
                .long("pairs")
                .help("number of pairs sampled per population for thresholds")
                .required(false)
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("sampling")
                .long("sampling")
                .help("random or exhaustive")
                .required(false)
                .value_parser(value_parser!(String)),
        )
        .arg(
            Arg::new("overlap")
                .long("overlap")
                .help("overlap fraction of hit locations credited in GJ_L")
                .required(false)
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("svmc")
                .long("svmc")
                .help("regularisation constant of the threshold svm")
                .required(false)
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("cutoff")
                .long("cutoff")
                .help("score cutoff for provisional labels")
                .required(false)
                .value_parser(value_parser!(f64)),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .help("seed of random generators")
                .required(false)
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .help("number of threads")
                .required(false)
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("incomplete")
                .long("incomplete")
                .help("keep references with incomplete genomes")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("completequeries")
                .long("completequeries")
                .help("classify only queries with complete genomes")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("nogrouping")
                .long("nogrouping")
                .help("skip virus grouping")
                .action(ArgAction::SetTrue),
        )
} // end of build_cli

fn main() -> anyhow::Result<()> {
    let _ = init_log();
    let start_t = chrono::Local::now();
    log::info!("\n gravclass begins at time:{:#?} \n ", start_t);
    //
    let matches = build_cli().get_matches();
    //
    let input_path = matches
        .get_one::<String>("input")
        .ok_or_else(|| anyhow!("--input is mandatory"))?;
    let outdir = PathBuf::from(matches.get_one::<String>("outdir").map_or(".", |s| s.as_str()));
    if !outdir.is_dir() {
        std::fs::create_dir_all(&outdir)?;
    }
    let params = params_from_args(&matches)?;
    params.validate()?;
    log::info!("parameters : {:?}", params);
    params.dump_json(&outdir).map_err(|e| anyhow!(e))?;
    //
    let input = RunInput::reload_json(Path::new(input_path))?;
    let databases = input.to_databases()?;
    let cancel = Arc::new(AtomicBool::new(false));
    let output = classify_databases(&databases, &params, &cancel)?;
    //
    let nb_queries = dump_answers(&output, &outdir.join("classification.txt"))?;
    for report in &output.reports {
        let csvpath = outdir.join(format!("thresholds_{}.csv", report.name));
        let csvfile = OpenOptions::new().write(true).create(true).truncate(true).open(&csvpath)?;
        dump_thresholds_csv(report, BufWriter::new(csvfile))?;
        dump_newick(report, &outdir.join(format!("dendrogram_{}.nwk", report.name)))?;
        if let Some(grouping) = report.grouping.as_ref() {
            let best = grouping.get_best();
            println!(
                "database {} : grouping cutoff {:.4}, {} clusters, theil U {:.4}",
                report.name, best.height, best.nb_clusters, best.u_symmetric
            );
        }
    }
    let nb_assigned = output
        .final_labels
        .iter()
        .filter(|(_, l)| matches!(l, FinalLabel::Assigned { .. }))
        .count();
    println!("nb queries : {}, nb assigned : {}", nb_queries, nb_assigned);
    //
    let end_t = chrono::Local::now();
    log::info!("\n gravclass ends at time:{:#?} \n ", end_t);
    Ok(())
} // end of main

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_cli_defaults() {
        let matches = build_cli().get_matches_from(["gravclass", "--input", "run.json"]);
        let params = params_from_args(&matches).unwrap();
        assert_eq!(params.get_similarity_params().get_location_overlap(), 0.5);
        assert_eq!(params.get_threshold_params().get_svm_c(), 1.);
        assert!(params.include_incomplete_queries());
        assert!(!params.include_incomplete_references());
    }

    #[test]
    fn test_cli_options() {
        let matches = build_cli().get_matches_from([
            "gravclass",
            "-i",
            "run.json",
            "--overlap",
            "0.25",
            "--svmc",
            "4",
            "--scheme",
            "PL",
            "--completequeries",
            "--incomplete",
        ]);
        let params = params_from_args(&matches).unwrap();
        assert!(params.validate().is_ok());
        assert_eq!(params.get_similarity_params().get_location_overlap(), 0.25);
        assert_eq!(params.get_similarity_params().get_scheme(), SimilarityScheme::PL);
        assert_eq!(params.get_threshold_params().get_svm_c(), 4.);
        assert!(!params.include_incomplete_queries());
        assert!(params.include_incomplete_references());
        // out of range values are caught by validation
        let matches = build_cli().get_matches_from(["gravclass", "-i", "run.json", "--overlap", "1.5"]);
        assert!(params_from_args(&matches).unwrap().validate().is_err());
    }
} // end of mod tests
