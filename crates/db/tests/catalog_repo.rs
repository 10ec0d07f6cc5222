//! Case content round-trips through the repositories and `PgStore`.

use sleuth_core::store::CatalogStore;
use sleuth_db::models::case::{CreateAnswerRegion, CreateCase, CreateQuestion};
use sleuth_db::repositories::CaseRepo;
use sleuth_db::PgStore;
use sqlx::PgPool;

async fn seed_case(pool: &PgPool, title: &str, questions: i32) -> i64 {
    let case = CaseRepo::create(
        pool,
        &CreateCase {
            title: title.to_string(),
            image_url: format!("https://cdn.example.com/{title}.jpg"),
            thumbnail_url: None,
        },
    )
    .await
    .unwrap();

    for n in 1..=questions {
        let q = CaseRepo::create_question(
            pool,
            &CreateQuestion {
                case_id: case.id,
                question_number: n,
                text: format!("Where is clue {n}?"),
                explanation: String::new(),
            },
        )
        .await
        .unwrap();
        CaseRepo::create_region(
            pool,
            &CreateAnswerRegion {
                question_id: q.id,
                x: 0.2,
                y: 0.3,
                width: 0.1,
                height: 0.1,
                description: Some("the clue".to_string()),
                sort_order: 0,
            },
        )
        .await
        .unwrap();
    }
    case.id
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_health_check(pool: PgPool) {
    sleuth_db::health_check(&pool).await.unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_load_catalog_assembles_graph(pool: PgPool) {
    let first = seed_case(&pool, "first", 2).await;
    let second = seed_case(&pool, "second", 3).await;

    let store = PgStore::new(pool);
    let catalog = store.load_catalog().await.unwrap();

    assert_eq!(catalog.cases().len(), 2);
    assert_eq!(catalog.total_questions(), 5);
    assert_eq!(catalog.next_case_id(first), Some(second));

    let q = catalog.question(second, 3).unwrap();
    assert_eq!(q.answer_regions.len(), 1);
    assert_eq!(q.answer_regions[0].description.as_deref(), Some("the clue"));
    assert_eq!(catalog.locate_question(q.db_id).unwrap().question_number, 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_load_single_case_and_summaries(pool: PgPool) {
    let id = seed_case(&pool, "solo", 2).await;
    let store = PgStore::new(pool);

    let case = store.load_case(id).await.unwrap().unwrap();
    assert_eq!(case.questions.iter().map(|q| q.id).collect::<Vec<_>>(), vec![1, 2]);
    assert!(store.load_case(id + 100).await.unwrap().is_none());

    let summaries = store.list_case_summaries().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].title, "solo");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_duplicate_question_number_rejected(pool: PgPool) {
    let id = seed_case(&pool, "dup", 1).await;
    let result = CaseRepo::create_question(
        &pool,
        &CreateQuestion {
            case_id: id,
            question_number: 1,
            text: "again".to_string(),
            explanation: String::new(),
        },
    )
    .await;
    let err = result.unwrap_err();
    let db_err = err.as_database_error().unwrap();
    assert_eq!(db_err.code().as_deref(), Some("23505"));
    assert_eq!(db_err.constraint(), Some("uq_questions_case_number"));
}
