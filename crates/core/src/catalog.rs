//! The case → question → answer-region graph.
//!
//! Questions carry two identities: the 1-based ordinal used by progress
//! tracking and the storage row id used by the coin ledger. [`QuestionIndex`]
//! resolves one from the other; nothing else should assume which of the two
//! a number is.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::geometry::AnswerRegion;
use crate::types::{CaseId, QuestionDbId, QuestionNumber};

/// A single question in a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Ordinal within the case, starting at 1.
    pub id: QuestionNumber,
    /// Storage row id.
    pub db_id: QuestionDbId,
    pub text: String,
    pub explanation: String,
    pub answer_regions: Vec<AnswerRegion>,
}

/// A fully materialized case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: CaseId,
    pub title: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub questions: Vec<Question>,
}

impl Case {
    /// Look up a question by ordinal.
    pub fn question(&self, ordinal: QuestionNumber) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == ordinal)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn index(&self) -> QuestionIndex {
        QuestionIndex::build(self)
    }

    pub fn summary(&self) -> CaseSummary {
        CaseSummary {
            id: self.id,
            title: self.title.clone(),
            thumbnail: self.thumbnail.clone(),
        }
    }
}

/// List-only view of a case used for the initial case board paint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseSummary {
    pub id: CaseId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

// ---------------------------------------------------------------------------
// QuestionIndex
// ---------------------------------------------------------------------------

/// Bidirectional ordinal ↔ storage-id map for one case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionIndex {
    by_ordinal: HashMap<QuestionNumber, QuestionDbId>,
    by_db_id: HashMap<QuestionDbId, QuestionNumber>,
}

impl QuestionIndex {
    pub fn build(case: &Case) -> Self {
        let mut index = Self::default();
        for q in &case.questions {
            index.by_ordinal.insert(q.id, q.db_id);
            index.by_db_id.insert(q.db_id, q.id);
        }
        index
    }

    pub fn db_id(&self, ordinal: QuestionNumber) -> Option<QuestionDbId> {
        self.by_ordinal.get(&ordinal).copied()
    }

    pub fn ordinal(&self, db_id: QuestionDbId) -> Option<QuestionNumber> {
        self.by_db_id.get(&db_id).copied()
    }

    pub fn contains_db_id(&self, db_id: QuestionDbId) -> bool {
        self.by_db_id.contains_key(&db_id)
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Where a question storage id lives in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionLocation<'a> {
    pub case: &'a Case,
    pub question_number: QuestionNumber,
}

/// Every case, ordered by id (which is also the unlock order).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    cases: Vec<Case>,
}

impl Catalog {
    /// Build a catalog; cases are sorted by id and questions by ordinal.
    pub fn new(mut cases: Vec<Case>) -> Self {
        cases.sort_by_key(|c| c.id);
        for case in &mut cases {
            case.questions.sort_by_key(|q| q.id);
        }
        Self { cases }
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn case(&self, id: CaseId) -> Option<&Case> {
        self.cases
            .binary_search_by_key(&id, |c| c.id)
            .ok()
            .map(|i| &self.cases[i])
    }

    /// Pure lookup, never a fetch.
    pub fn question(&self, case_id: CaseId, ordinal: QuestionNumber) -> Option<&Question> {
        self.case(case_id)?.question(ordinal)
    }

    pub fn question_db_id(&self, case_id: CaseId, ordinal: QuestionNumber) -> Option<QuestionDbId> {
        self.question(case_id, ordinal).map(|q| q.db_id)
    }

    /// The next case in unlock order, or `None` after the last one.
    pub fn next_case_id(&self, case_id: CaseId) -> Option<CaseId> {
        self.cases.iter().map(|c| c.id).find(|&id| id > case_id)
    }

    pub fn total_questions(&self) -> usize {
        self.cases.iter().map(Case::question_count).sum()
    }

    pub fn summaries(&self) -> Vec<CaseSummary> {
        self.cases.iter().map(Case::summary).collect()
    }

    /// Find the case and ordinal that own a question storage id.
    pub fn locate_question(&self, db_id: QuestionDbId) -> Option<QuestionLocation<'_>> {
        self.cases.iter().find_map(|case| {
            case.questions
                .iter()
                .find(|q| q.db_id == db_id)
                .map(|q| QuestionLocation {
                    case,
                    question_number: q.id,
                })
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------


#[cfg(test)]
mod tests {
    use super::fixtures::case;
    use super::*;

    #[test]
    fn catalog_sorts_cases_by_id() {
        let catalog = Catalog::new(vec![case(3, 1), case(1, 2), case(2, 3)]);
        let ids: Vec<_> = catalog.cases().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(catalog.total_questions(), 6);
    }

    #[test]
    fn index_resolves_both_directions() {
        let c = case(4, 3);
        let index = c.index();
        assert_eq!(index.db_id(2), Some(402));
        assert_eq!(index.ordinal(403), Some(3));
        assert_eq!(index.db_id(9), None);
        assert_eq!(index.ordinal(2), None);
        assert!(index.contains_db_id(401));
    }

    #[test]
    fn next_case_skips_gaps_and_ends() {
        let catalog = Catalog::new(vec![case(1, 1), case(2, 1), case(5, 1)]);
        assert_eq!(catalog.next_case_id(1), Some(2));
        assert_eq!(catalog.next_case_id(2), Some(5));
        assert_eq!(catalog.next_case_id(5), None);
    }

    #[test]
    fn question_lookup_is_by_ordinal() {
        let catalog = Catalog::new(vec![case(1, 3)]);
        assert_eq!(catalog.question(1, 2).map(|q| q.db_id), Some(102));
        assert!(catalog.question(1, 4).is_none());
        assert!(catalog.question(2, 1).is_none());
        assert_eq!(catalog.question_db_id(1, 3), Some(103));
    }

    #[test]
    fn locate_question_by_storage_id() {
        let catalog = Catalog::new(vec![case(1, 2), case(2, 2)]);
        let loc = catalog.locate_question(202).unwrap();
        assert_eq!(loc.case.id, 2);
        assert_eq!(loc.question_number, 2);
        assert!(catalog.locate_question(999).is_none());
    }

    #[test]
    fn case_serializes_camel_case() {
        let json = serde_json::to_value(case(1, 1)).unwrap();
        assert_eq!(json["questions"][0]["dbId"], 101);
        assert!(json["questions"][0]["answerRegions"].is_array());
    }
}
