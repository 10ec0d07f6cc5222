/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Case ids double as the unlock order.
pub type CaseId = DbId;

/// Storage row id of a question (purchase records reference this).
pub type QuestionDbId = DbId;

/// 1-based ordinal of a question within its case (progress records reference this).
pub type QuestionNumber = i32;

/// Principal id issued by the auth provider, anonymous or permanent.
pub type UserId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
