//! Fuzzy medication lookup for the pharmacy and prescription forms.

use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, normalized_levenshtein};

use crate::db::{Database, DbResult};
use crate::models::Medication;

/// Candidates scoring below this are dropped.
const MIN_SCORE: f64 = 0.55;

/// A medication and how well it matched the query (0.0 - 1.0).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationMatch {
    pub medication: Medication,
    pub score: f64,
}

impl Database {
    /// Medications whose name or generic name resembles `query`, best first.
    pub fn search_medications(&self, query: &str, limit: usize) -> DbResult<Vec<MedicationMatch>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let mut matches: Vec<MedicationMatch> = self
            .list_medications()?
            .into_iter()
            .map(|medication| {
                let score = score_medication(&medication, &query);
                MedicationMatch { medication, score }
            })
            .filter(|m| m.score >= MIN_SCORE)
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.medication.name.cmp(&b.medication.name))
        });
        matches.truncate(limit);
        Ok(matches)
    }
}

/// Best score over the name and generic name.
fn score_medication(medication: &Medication, query: &str) -> f64 {
    std::iter::once(medication.name.as_str())
        .chain(medication.generic_name.as_deref())
        .map(|candidate| score_name(&candidate.to_lowercase(), query))
        .fold(0.0, f64::max)
}

fn score_name(candidate: &str, query: &str) -> f64 {
    if candidate == query {
        return 1.0;
    }
    if candidate.starts_with(query) {
        return 0.95;
    }
    if candidate.contains(query) {
        return 0.9;
    }
    fuzzy_match(query, candidate)
}

fn fuzzy_match(a: &str, b: &str) -> f64 {
    jaro_winkler(a, b) * 0.6 + normalized_levenshtein(a, b) * 0.4
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MedicationInput;

    fn add(db: &Database, name: &str, generic: Option<&str>) {
        let medication = Medication::new(MedicationInput {
            name: name.into(),
            generic_name: generic.map(String::from),
            category: None,
            form: None,
            strength: None,
            unit: "tablet".into(),
            stock_quantity: 10,
            reorder_level: 2,
            unit_price_cents: 150,
            expiry_date: None,
            supplier: None,
        });
        db.insert_medication(&medication).unwrap();
    }

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        add(&db, "Amoxil", Some("Amoxicillin"));
        add(&db, "Panadol", Some("Paracetamol"));
        add(&db, "Flagyl", Some("Metronidazole"));
        db
    }

    #[test]
    fn test_prefix_match_ranks_first() {
        let db = setup();
        let results = db.search_medications("amox", 5).unwrap();
        assert_eq!(results[0].medication.name, "Amoxil");
        assert!(results[0].score >= 0.95);
    }

    #[test]
    fn test_generic_name_match() {
        let db = setup();
        let results = db.search_medications("paracetamol", 5).unwrap();
        assert_eq!(results[0].medication.name, "Panadol");
        assert_eq!(results[0].score, 1.0);
    }

    #[test]
    fn test_typo_still_matches() {
        let db = setup();
        let results = db.search_medications("metronidazol", 5).unwrap();
        assert_eq!(results[0].medication.name, "Flagyl");
    }

    #[test]
    fn test_unrelated_query_is_empty() {
        let db = setup();
        assert!(db.search_medications("zzzzqqq", 5).unwrap().is_empty());
        assert!(db.search_medications("   ", 5).unwrap().is_empty());
    }

    #[test]
    fn test_limit() {
        let db = setup();
        add(&db, "Amoxil Forte", Some("Amoxicillin"));
        assert_eq!(db.search_medications("amox", 1).unwrap().len(), 1);
    }
}
