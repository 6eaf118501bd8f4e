//! Loading of a run description.
//!
//! Signatures are produced upstream (protein extraction, alignment, profile search), they are read here
//! from a json file describing, for each reference database, its ordered profiles and group models,
//! its references and the signatures of queries against it :
//!
//! ```text
//! { "databases" : [ { "name" : "db1", "profiles" : ["pphmm_1", ...], "group_models" : ["gom_A", ...],
//!                     "references" : [ {"id" : "v1", "group" : "A", "complete" : true,
//!                                       "p" : [..], "l" : [[[start, end], ...], ...], "g" : [..]}, ... ],
//!                     "queries" : [ {"id" : "q1", "complete" : false, "p" : [..], "l" : [..], "g" : [..]} ] } ] }
//! ```
//! A missing "l" means no location at all, a missing "complete" means complete.
//! Incomplete queries are classified unless disabled in the parameters.

use std::fs::OpenOptions;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::classify::Database;
use crate::errors::ConfigError;
use crate::signature::{Entity, HitInterval, Signature, SignatureLayout};

fn default_complete() -> bool {
    true
}

/// one virus as found in the input file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default = "default_complete")]
    pub complete: bool,
    pub p: Vec<f64>,
    #[serde(default)]
    pub l: Vec<Vec<(f64, f64)>>,
    pub g: Vec<f64>,
}

impl EntityRecord {
    fn to_signature(&self, layout: &Arc<SignatureLayout>) -> Result<Signature, ConfigError> {
        let locations: Vec<Vec<HitInterval>> = if self.l.is_empty() {
            vec![Vec::new(); layout.get_nb_profiles()]
        } else {
            self.l
                .iter()
                .map(|itvs| {
                    itvs.iter()
                        .map(|&(s, e)| HitInterval::new(s, e))
                        .collect::<Result<Vec<HitInterval>, ConfigError>>()
                })
                .collect::<Result<Vec<Vec<HitInterval>>, ConfigError>>()?
        };
        Signature::new(layout, &self.id, self.p.clone(), locations, self.g.clone())
    }
} // end of impl EntityRecord

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseRecord {
    pub name: String,
    pub profiles: Vec<String>,
    #[serde(default)]
    pub group_models: Vec<String>,
    pub references: Vec<EntityRecord>,
    #[serde(default)]
    pub queries: Vec<EntityRecord>,
}

impl DatabaseRecord {
    /// checks signatures against the layout of the database
    pub fn to_database(&self) -> Result<Database, ConfigError> {
        let layout = Arc::new(SignatureLayout::new(self.profiles.clone(), self.group_models.clone()));
        let mut references = Vec::<Entity>::with_capacity(self.references.len());
        for r in &self.references {
            let signature = r.to_signature(&layout)?;
            references.push(Entity::new(r.id.clone(), signature, r.group.clone(), r.complete));
        }
        let mut queries = Vec::<Entity>::with_capacity(self.queries.len());
        for q in &self.queries {
            let signature = q.to_signature(&layout)?;
            queries.push(Entity::new(q.id.clone(), signature, None, q.complete));
        }
        Database::new(&self.name, references, queries)
    } // end of to_database
} // end of impl DatabaseRecord

/// the whole input of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInput {
    pub databases: Vec<DatabaseRecord>,
}

impl RunInput {
    /// reload from a json file
    pub fn reload_json(filepath: &Path) -> anyhow::Result<Self> {
        log::info!("loading run input from {:?}", filepath);
        let fileres = OpenOptions::new().read(true).open(filepath);
        let file = match fileres {
            Ok(file) => file,
            Err(e) => {
                log::error!("RunInput reload_json : could not open file {:?}", filepath.as_os_str());
                return Err(anyhow!("could not open {:?} : {}", filepath, e));
            }
        };
        let reader = BufReader::new(file);
        let input: RunInput = serde_json::from_reader(reader)?;
        log::info!("run input : {} databases", input.databases.len());
        Ok(input)
    }

    /// builds checked databases
    pub fn to_databases(&self) -> Result<Vec<Database>, ConfigError> {
        self.databases.iter().map(|d| d.to_database()).collect()
    }
} // end of impl RunInput

//=====================================================================================

#[cfg(test)]
mod tests {

    use super::*;

    const INPUT: &str = r#"
    { "databases" : [ { "name" : "db1", "profiles" : ["p1", "p2"], "group_models" : ["gA"],
        "references" : [ {"id" : "v1", "group" : "A", "p" : [1.0, 0.0], "l" : [[[0.0, 10.0], [5.0, 20.0]], []], "g" : [2.0]},
                         {"id" : "v2", "group" : "B", "complete" : false, "p" : [0.0, 3.0], "g" : [0.5]} ],
        "queries" : [ {"id" : "q1", "p" : [1.0, 1.0], "g" : [1.0]} ] } ] }
    "#;

    #[test]
    fn test_parse_input() {
        let input: RunInput = serde_json::from_str(INPUT).unwrap();
        let databases = input.to_databases().unwrap();
        assert_eq!(databases.len(), 1);
        let db = &databases[0];
        assert_eq!(db.get_name(), "db1");
        assert_eq!(db.get_references().len(), 2);
        assert!(!db.get_references()[1].is_complete());
        let v1 = db.get_references()[0].get_signature();
        // overlapping hits merged
        assert_eq!(v1.get_locations()[0].len(), 1);
        assert_eq!(v1.get_locations()[0][0].get_end(), 20.);
        let q = &db.get_queries()[0];
        assert!(!q.is_reference());
        assert_eq!(q.get_signature().get_locations().len(), 2);
    }

    #[test]
    fn test_bad_lengths() {
        let bad = INPUT.replace("\"p\" : [1.0, 1.0]", "\"p\" : [1.0]");
        let input: RunInput = serde_json::from_str(&bad).unwrap();
        assert!(matches!(
            input.to_databases(),
            Err(ConfigError::LengthMismatch { axis: "P", .. })
        ));
        let bad_interval = INPUT.replace("[0.0, 10.0]", "[10.0, 0.0]");
        let input: RunInput = serde_json::from_str(&bad_interval).unwrap();
        assert!(matches!(input.to_databases(), Err(ConfigError::BadInterval(_, _))));
    }
} // end of mod tests
