//! Repository for `cases`, `questions` and `answer_regions`.

use sleuth_core::types::{CaseId, QuestionDbId};
use sqlx::PgPool;

use crate::models::case::{
    AnswerRegionRow, CaseRow, CaseSummaryRow, CreateAnswerRegion, CreateCase, CreateQuestion,
    QuestionRow,
};

const CASE_COLUMNS: &str = "id, title, image_url, thumbnail_url, created_at, updated_at";

const QUESTION_COLUMNS: &str = "id, case_id, question_number, text, explanation";

const REGION_COLUMNS: &str =
    "id, question_id, x, y, width, height, description, sort_order";

/// Read access to case content, plus inserts used for seeding.
pub struct CaseRepo;

impl CaseRepo {
    /// All cases ordered by id.
    pub async fn list(pool: &PgPool) -> Result<Vec<CaseRow>, sqlx::Error> {
        let query = format!("SELECT {CASE_COLUMNS} FROM cases ORDER BY id ASC");
        sqlx::query_as::<_, CaseRow>(&query).fetch_all(pool).await
    }

    /// Id, title and thumbnail of every case, ordered by id.
    pub async fn list_summaries(pool: &PgPool) -> Result<Vec<CaseSummaryRow>, sqlx::Error> {
        sqlx::query_as::<_, CaseSummaryRow>(
            "SELECT id, title, thumbnail_url FROM cases ORDER BY id ASC",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: CaseId) -> Result<Option<CaseRow>, sqlx::Error> {
        let query = format!("SELECT {CASE_COLUMNS} FROM cases WHERE id = $1");
        sqlx::query_as::<_, CaseRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Every question, ordered by case and ordinal.
    pub async fn list_questions(pool: &PgPool) -> Result<Vec<QuestionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {QUESTION_COLUMNS} FROM questions ORDER BY case_id ASC, question_number ASC"
        );
        sqlx::query_as::<_, QuestionRow>(&query).fetch_all(pool).await
    }

    pub async fn list_questions_for_case(
        pool: &PgPool,
        case_id: CaseId,
    ) -> Result<Vec<QuestionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {QUESTION_COLUMNS} FROM questions
             WHERE case_id = $1
             ORDER BY question_number ASC"
        );
        sqlx::query_as::<_, QuestionRow>(&query)
            .bind(case_id)
            .fetch_all(pool)
            .await
    }

    /// Every answer region, ordered for stable display.
    pub async fn list_regions(pool: &PgPool) -> Result<Vec<AnswerRegionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {REGION_COLUMNS} FROM answer_regions ORDER BY question_id ASC, sort_order ASC, id ASC"
        );
        sqlx::query_as::<_, AnswerRegionRow>(&query).fetch_all(pool).await
    }

    pub async fn list_regions_for_questions(
        pool: &PgPool,
        question_ids: &[QuestionDbId],
    ) -> Result<Vec<AnswerRegionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {REGION_COLUMNS} FROM answer_regions
             WHERE question_id = ANY($1)
             ORDER BY question_id ASC, sort_order ASC, id ASC"
        );
        sqlx::query_as::<_, AnswerRegionRow>(&query)
            .bind(question_ids)
            .fetch_all(pool)
            .await
    }

    pub async fn create(pool: &PgPool, input: &CreateCase) -> Result<CaseRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO cases (title, image_url, thumbnail_url)
             VALUES ($1, $2, $3)
             RETURNING {CASE_COLUMNS}"
        );
        sqlx::query_as::<_, CaseRow>(&query)
            .bind(&input.title)
            .bind(&input.image_url)
            .bind(&input.thumbnail_url)
            .fetch_one(pool)
            .await
    }

    pub async fn create_question(
        pool: &PgPool,
        input: &CreateQuestion,
    ) -> Result<QuestionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO questions (case_id, question_number, text, explanation)
             VALUES ($1, $2, $3, $4)
             RETURNING {QUESTION_COLUMNS}"
        );
        sqlx::query_as::<_, QuestionRow>(&query)
            .bind(input.case_id)
            .bind(input.question_number)
            .bind(&input.text)
            .bind(&input.explanation)
            .fetch_one(pool)
            .await
    }

    pub async fn create_region(
        pool: &PgPool,
        input: &CreateAnswerRegion,
    ) -> Result<AnswerRegionRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO answer_regions (question_id, x, y, width, height, description, sort_order)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {REGION_COLUMNS}"
        );
        sqlx::query_as::<_, AnswerRegionRow>(&query)
            .bind(input.question_id)
            .bind(input.x)
            .bind(input.y)
            .bind(input.width)
            .bind(input.height)
            .bind(&input.description)
            .bind(input.sort_order)
            .fetch_one(pool)
            .await
    }
}
