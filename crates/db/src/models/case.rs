//! Case content rows and DTOs.

use sleuth_core::catalog::{Case, CaseSummary, Question};
use sleuth_core::geometry::AnswerRegion;
use sleuth_core::types::{CaseId, DbId, QuestionDbId, QuestionNumber, Timestamp};
use sqlx::FromRow;

/// A row from the `cases` table.
#[derive(Debug, Clone, FromRow)]
pub struct CaseRow {
    pub id: CaseId,
    pub title: String,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CaseRow {
    pub fn into_case(self, questions: Vec<Question>) -> Case {
        Case {
            id: self.id,
            title: self.title,
            image: self.image_url,
            thumbnail: self.thumbnail_url,
            questions,
        }
    }
}

/// The list-only projection of `cases`.
#[derive(Debug, Clone, FromRow)]
pub struct CaseSummaryRow {
    pub id: CaseId,
    pub title: String,
    pub thumbnail_url: Option<String>,
}

impl From<CaseSummaryRow> for CaseSummary {
    fn from(row: CaseSummaryRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            thumbnail: row.thumbnail_url,
        }
    }
}

/// A row from the `questions` table.
#[derive(Debug, Clone, FromRow)]
pub struct QuestionRow {
    pub id: QuestionDbId,
    pub case_id: CaseId,
    pub question_number: QuestionNumber,
    pub text: String,
    pub explanation: String,
}

impl QuestionRow {
    pub fn into_question(self, answer_regions: Vec<AnswerRegion>) -> Question {
        Question {
            id: self.question_number,
            db_id: self.id,
            text: self.text,
            explanation: self.explanation,
            answer_regions,
        }
    }
}

/// A row from the `answer_regions` table.
#[derive(Debug, Clone, FromRow)]
pub struct AnswerRegionRow {
    pub id: DbId,
    pub question_id: QuestionDbId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub description: Option<String>,
    pub sort_order: i32,
}

impl From<AnswerRegionRow> for AnswerRegion {
    fn from(row: AnswerRegionRow) -> Self {
        Self {
            x: row.x,
            y: row.y,
            width: row.width,
            height: row.height,
            description: row.description,
        }
    }
}

/// DTO for inserting a case.
pub struct CreateCase {
    pub title: String,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
}

/// DTO for inserting a question.
pub struct CreateQuestion {
    pub case_id: CaseId,
    pub question_number: QuestionNumber,
    pub text: String,
    pub explanation: String,
}

/// DTO for inserting an answer region.
pub struct CreateAnswerRegion {
    pub question_id: QuestionDbId,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub description: Option<String>,
    pub sort_order: i32,
}
