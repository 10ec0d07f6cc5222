//! Shared fixtures for engine unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sleuth_core::catalog::{Case, Question};
use sleuth_core::geometry::AnswerRegion;
use sleuth_core::payment::{GatewayError, PaymentGateway, PaymentRecord};
use sleuth_core::products::{find_product, ProductReference, PRODUCT_CURRENCY};
use sleuth_core::types::CaseId;
use sleuth_db::MemoryStore;

use crate::catalog::CaseRepository;
use crate::ledger::CoinLedger;
use crate::progress::ProgressService;
use crate::session::SessionServices;

/// A case whose questions get storage ids `id * 100 + ordinal` and one
/// answer region at `(0.2, 0.3)` sized `0.1 x 0.1`.
pub fn case(id: CaseId, question_count: i32) -> Case {
    Case {
        id,
        title: format!("Case {id}"),
        image: format!("https://cdn.example.com/cases/{id}.jpg"),
        thumbnail: None,
        questions: (1..=question_count)
            .map(|n| Question {
                id: n,
                db_id: id * 100 + i64::from(n),
                text: format!("Question {n}"),
                explanation: format!("Explanation {n}"),
                answer_regions: vec![AnswerRegion::new(0.2, 0.3, 0.1, 0.1)],
            })
            .collect(),
    }
}

pub struct Services {
    pub store: MemoryStore,
    pub cases: Arc<CaseRepository>,
    pub progress: Arc<ProgressService>,
    pub ledger: Arc<CoinLedger>,
}

/// Cases 1..=3 with 2, 3 and 1 questions.
pub fn services() -> Services {
    services_with(vec![case(1, 2), case(2, 3), case(3, 1)])
}

impl Services {
    pub fn session(&self) -> SessionServices {
        SessionServices {
            cases: Arc::clone(&self.cases),
            progress: Arc::clone(&self.progress),
            ledger: Arc::clone(&self.ledger),
        }
    }
}

pub fn services_with(cases: Vec<Case>) -> Services {
    let store = MemoryStore::with_cases(cases);
    let shared: Arc<MemoryStore> = Arc::new(store.clone());
    let cases = Arc::new(CaseRepository::new(shared.clone()));
    Services {
        progress: Arc::new(ProgressService::new(shared.clone(), Arc::clone(&cases))),
        ledger: Arc::new(CoinLedger::new(shared, Arc::clone(&cases))),
        cases,
        store,
    }
}

// ---------------------------------------------------------------------------
// FakeGateway
// ---------------------------------------------------------------------------

/// Scripted [`PaymentGateway`] returning canned records by payment id.
#[derive(Default)]
pub struct FakeGateway {
    payments: Mutex<HashMap<String, Result<PaymentRecord, GatewayError>>>,
}

impl FakeGateway {
    pub fn with_payment(self, record: PaymentRecord) -> Self {
        self.payments
            .lock()
            .unwrap()
            .insert(record.id.clone(), Ok(record));
        self
    }

    pub fn with_error(self, payment_id: &str, error: GatewayError) -> Self {
        self.payments
            .lock()
            .unwrap()
            .insert(payment_id.to_string(), Err(error));
        self
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn fetch_payment(&self, payment_id: &str) -> Result<PaymentRecord, GatewayError> {
        self.payments
            .lock()
            .unwrap()
            .get(payment_id)
            .cloned()
            .unwrap_or_else(|| Err(GatewayError::Lookup(format!("no payment {payment_id}"))))
    }
}

/// A settled payment for `product_id` that passes verification.
pub fn paid_record(payment_id: &str, product_id: &str) -> PaymentRecord {
    let product = find_product(product_id).unwrap();
    PaymentRecord {
        id: payment_id.to_string(),
        status: "PAID".into(),
        channel_type: Some("TEST".into()),
        custom_data: Some(ProductReference::encode(product_id)),
        order_name: Some(product.name.to_string()),
        amount_total: Some(product.price),
        currency: Some(PRODUCT_CURRENCY.to_string()),
    }
}
