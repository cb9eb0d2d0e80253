use chrono::NaiveDate;
use futures::future::join_all;
use ledger_cache::backend::InMemoryBackend;
use ledger_cache::finance::{
    Bill, BillQuery, ListParams, Page, PaymentStatus, ReceivableQuery, Resource,
};
use ledger_cache::{CacheExpander, CacheService, CacheStrategy, DataRepository, Error, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("invalid date")
}

fn today() -> NaiveDate {
    day(2024, 5, 10)
}

fn bill(id: &str, user_id: &str, due_date: NaiveDate, paid_on: Option<NaiveDate>) -> Bill {
    Bill {
        id: id.to_string(),
        user_id: user_id.to_string(),
        description: format!("bill {}", id),
        amount_cents: 10_000,
        due_date,
        paid_on,
        category_id: None,
        payment_method_id: None,
    }
}

/// Stand-in for the bills table. Counts every read so tests can tell cache
/// hits from source reads.
#[derive(Default)]
struct BillTable {
    rows: Mutex<Vec<Bill>>,
    reads: AtomicUsize,
}

impl BillTable {
    fn insert(&self, bill: Bill) {
        self.rows.lock().expect("poisoned").push(bill);
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl DataRepository<BillQuery> for BillTable {
    async fn fetch(&self, query: &BillQuery) -> Result<Option<Page<Bill>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let rows = self.rows.lock().expect("poisoned");
        let matching: Vec<Bill> = rows
            .iter()
            .filter(|b| b.user_id == query.user_id)
            .filter(|b| {
                query
                    .params
                    .status
                    .map_or(true, |status| b.status(today()) == status)
            })
            .cloned()
            .collect();

        let size = query.params.size as usize;
        let items = matching
            .iter()
            .skip(query.params.page as usize * size)
            .take(size)
            .cloned()
            .collect();

        Ok(Some(Page {
            items,
            page: query.params.page,
            size: query.params.size,
            total: matching.len() as u64,
        }))
    }
}

struct FailingTable;

impl DataRepository<BillQuery> for FailingTable {
    async fn fetch(&self, _query: &BillQuery) -> Result<Option<Page<Bill>>> {
        Err(Error::RepositoryError("connection reset by database".to_string()))
    }
}

fn seeded_table() -> BillTable {
    let table = BillTable::default();
    table.insert(bill("b1", "u1", day(2024, 5, 1), Some(day(2024, 5, 1))));
    table.insert(bill("b2", "u1", day(2024, 5, 8), None));
    table.insert(bill("b3", "u1", day(2024, 5, 10), None));
    table.insert(bill("b4", "u1", day(2024, 6, 1), None));
    table.insert(bill("b5", "u2", day(2024, 5, 2), None));
    table
}

#[tokio::test]
async fn second_read_is_served_from_cache() {
    init_logger();
    let expander = CacheExpander::new(InMemoryBackend::new());
    let table = seeded_table();
    let query = BillQuery::bills("u1", ListParams::page(0, 10));

    let first = expander
        .with(&query, &table, CacheStrategy::Refresh)
        .await
        .expect("first read")
        .expect("page");
    let second = expander
        .with(&query, &table, CacheStrategy::Refresh)
        .await
        .expect("second read")
        .expect("page");

    assert_eq!(first, second);
    assert_eq!(first.total, 4);
    assert_eq!(table.reads(), 1);
}

#[tokio::test]
async fn equal_params_share_a_key_regardless_of_construction() {
    init_logger();
    let expander = CacheExpander::new(InMemoryBackend::new());
    let table = seeded_table();

    let built = BillQuery::bills("u1", ListParams::page(0, 10).with_status(PaymentStatus::Overdue));
    let mut literal = ListParams::page(0, 10);
    literal.status = Some(PaymentStatus::Overdue);
    let literal = BillQuery::bills("u1", literal);

    let a = expander
        .with(&built, &table, CacheStrategy::Refresh)
        .await
        .expect("read");
    let b = expander
        .with(&literal, &table, CacheStrategy::Refresh)
        .await
        .expect("read");

    assert_eq!(a, b);
    assert_eq!(a.expect("page").items[0].id, "b2");
    assert_eq!(table.reads(), 1);
}

#[tokio::test]
async fn mutation_invalidates_every_page_of_the_user() {
    init_logger();
    let backend = InMemoryBackend::new().with_scan_count(2);
    let expander = CacheExpander::new(backend.clone());
    let table = seeded_table();

    let queries = [
        BillQuery::bills("u1", ListParams::page(0, 2)),
        BillQuery::bills("u1", ListParams::page(1, 2)),
        BillQuery::bills("u1", ListParams::page(0, 10).with_status(PaymentStatus::Pending)),
        BillQuery::bills("u2", ListParams::page(0, 10)),
    ];
    for query in &queries {
        expander
            .with(query, &table, CacheStrategy::Refresh)
            .await
            .expect("warm cache");
    }
    assert_eq!(table.reads(), 4);
    assert_eq!(backend.len().await, 4);

    table.insert(bill("b6", "u1", day(2024, 7, 1), None));
    let removed = expander
        .invalidate(&Resource::Bills.namespace("u1"))
        .await
        .expect("invalidate");

    assert_eq!(removed, 3);
    assert_eq!(backend.len().await, 1);

    let page = expander
        .with(&queries[0], &table, CacheStrategy::Refresh)
        .await
        .expect("read")
        .expect("page");
    assert_eq!(page.total, 5);
    assert_eq!(table.reads(), 5);

    // The other user's page is still cached.
    expander
        .with(&queries[3], &table, CacheStrategy::Refresh)
        .await
        .expect("read");
    assert_eq!(table.reads(), 5);
}

#[tokio::test]
async fn user_ids_with_slashes_stay_in_their_own_namespace() {
    init_logger();
    let backend = InMemoryBackend::new();
    let expander = CacheExpander::new(backend.clone());
    let table = BillTable::default();

    for user in ["a", "a/b"] {
        expander
            .with(
                &BillQuery::bills(user, ListParams::page(0, 10)),
                &table,
                CacheStrategy::Refresh,
            )
            .await
            .expect("warm cache");
    }
    assert_eq!(backend.len().await, 2);

    let removed = expander
        .invalidate(&Resource::Bills.namespace("a"))
        .await
        .expect("invalidate");
    assert_eq!(removed, 1);
    assert_eq!(backend.len().await, 1);
}

#[tokio::test]
async fn invalidating_an_empty_namespace_is_a_no_op() {
    init_logger();
    let expander = CacheExpander::new(InMemoryBackend::new());
    let removed = expander
        .invalidate(&Resource::Categories.namespace("nobody"))
        .await
        .expect("invalidate");
    assert_eq!(removed, 0);
}

#[tokio::test]
async fn bills_and_receivables_are_invalidated_separately() {
    init_logger();
    let backend = InMemoryBackend::new();
    let expander = CacheExpander::new(backend.clone());
    let store = expander.store();
    let hashes = ledger_cache::HashKeyGenerator::global();

    let bills = BillQuery::bills("u1", ListParams::page(0, 10));
    let receivables = ReceivableQuery::receivables("u1", ListParams::page(0, 10));
    for key in [
        ledger_cache::query::cache_key(&bills, hashes).expect("key"),
        ledger_cache::query::cache_key(&receivables, hashes).expect("key"),
    ] {
        let key = key.expect("params present");
        store
            .save(&key, &serde_json::json!({"items": []}), std::time::Duration::from_secs(60))
            .await
            .expect("save");
    }

    let removed = expander
        .invalidate(&Resource::Receivables.namespace("u1"))
        .await
        .expect("invalidate");
    assert_eq!(removed, 1);
    assert_eq!(backend.len().await, 1);
}

#[tokio::test]
async fn concurrent_requests_share_one_service() {
    init_logger();
    let service = CacheService::new(InMemoryBackend::new());
    let table = seeded_table();
    let query = BillQuery::bills("u1", ListParams::page(0, 10));

    service
        .execute(&query, &table, CacheStrategy::Refresh)
        .await
        .expect("warm cache");

    let handles: Vec<_> = (0..16).map(|_| service.clone()).collect();
    let results = join_all(
        handles
            .iter()
            .map(|svc| svc.execute(&query, &table, CacheStrategy::Refresh)),
    )
    .await;

    assert!(results.iter().all(|r| r.as_ref().is_ok_and(|p| p.is_some())));
    assert_eq!(table.reads(), 1);
}

#[tokio::test]
async fn repository_errors_reach_the_caller() {
    init_logger();
    let expander = CacheExpander::new(InMemoryBackend::new());
    let query = BillQuery::bills("u1", ListParams::page(0, 10));

    let result = expander
        .with(&query, &FailingTable, CacheStrategy::Refresh)
        .await;
    assert!(matches!(result, Err(Error::RepositoryError(_))));
}

#[tokio::test]
async fn invalid_queries_never_touch_the_source() {
    init_logger();
    let expander = CacheExpander::new(InMemoryBackend::new());
    let table = seeded_table();
    let query = BillQuery::bills("u1", ListParams::page(0, 0));

    let result = expander.with(&query, &table, CacheStrategy::Refresh).await;
    assert!(matches!(result, Err(Error::ValidationError(_))));
    assert_eq!(table.reads(), 0);
}

#[tokio::test]
async fn refresh_falls_back_to_source_when_cache_is_down() {
    init_logger();
    let backend = InMemoryBackend::new();
    let expander = CacheExpander::new(backend.clone());
    let table = seeded_table();
    let query = BillQuery::bills("u1", ListParams::page(0, 10));

    expander.store().quit().await.expect("quit");

    let page = expander
        .with(&query, &table, CacheStrategy::Refresh)
        .await
        .expect("source read")
        .expect("page");
    assert_eq!(page.total, 4);

    let fresh = expander.with(&query, &table, CacheStrategy::Fresh).await;
    assert!(fresh.is_err());
}
