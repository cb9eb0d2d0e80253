//! Finance records and their cacheable list queries.
//!
//! Only what the cache layer needs: the record shapes stored in cached
//! pages, the payment-status classification used as a filter parameter, and
//! the per-user list queries whose namespaces mutations invalidate.

use crate::error::{Error, Result};
use crate::key::CacheKeyBuilder;
use crate::query::CacheQuery;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Largest page size a list query accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Payment state of a bill or receivable relative to a reference day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Overdue,
    DueToday,
    Pending,
}

impl PaymentStatus {
    /// Classify by due date: settled entries are `Paid`; otherwise the due
    /// date is compared with `today`.
    pub fn classify(due_date: NaiveDate, settled_on: Option<NaiveDate>, today: NaiveDate) -> Self {
        if settled_on.is_some() {
            return PaymentStatus::Paid;
        }
        match due_date.cmp(&today) {
            std::cmp::Ordering::Less => PaymentStatus::Overdue,
            std::cmp::Ordering::Equal => PaymentStatus::DueToday,
            std::cmp::Ordering::Greater => PaymentStatus::Pending,
        }
    }
}

/// Resource collections that are cached per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Bills,
    Receivables,
    Categories,
    PaymentMethods,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Bills => "bills",
            Resource::Receivables => "receivables",
            Resource::Categories => "categories",
            Resource::PaymentMethods => "payment-methods",
        }
    }

    /// Namespace holding every cached page of this resource for `user_id`.
    pub fn namespace(&self, user_id: &str) -> String {
        CacheKeyBuilder::namespace(&[self.as_str(), user_id])
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: String,
    pub user_id: String,
    pub description: String,
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    pub paid_on: Option<NaiveDate>,
    pub category_id: Option<String>,
    pub payment_method_id: Option<String>,
}

impl Bill {
    pub fn status(&self, today: NaiveDate) -> PaymentStatus {
        PaymentStatus::classify(self.due_date, self.paid_on, today)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receivable {
    pub id: String,
    pub user_id: String,
    pub description: String,
    pub amount_cents: i64,
    pub due_date: NaiveDate,
    pub received_on: Option<NaiveDate>,
    pub category_id: Option<String>,
}

impl Receivable {
    pub fn status(&self, today: NaiveDate) -> PaymentStatus {
        PaymentStatus::classify(self.due_date, self.received_on, today)
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total: u64,
}

/// Paging and filter parameters. These are what gets hashed into the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    pub page: u32,
    pub size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_from: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_to: Option<NaiveDate>,
}

impl ListParams {
    pub fn page(page: u32, size: u32) -> Self {
        ListParams {
            page,
            size,
            status: None,
            category_id: None,
            due_from: None,
            due_to: None,
        }
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn due_between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.due_from = Some(from);
        self.due_to = Some(to);
        self
    }
}

/// Paginated list of one user's records of type `T`.
pub struct ListQuery<T> {
    pub resource: Resource,
    pub user_id: String,
    pub params: ListParams,
    _item: PhantomData<fn() -> T>,
}

pub type BillQuery = ListQuery<Bill>;
pub type ReceivableQuery = ListQuery<Receivable>;

impl<T> ListQuery<T> {
    pub fn new(resource: Resource, user_id: impl Into<String>, params: ListParams) -> Self {
        ListQuery {
            resource,
            user_id: user_id.into(),
            params,
            _item: PhantomData,
        }
    }
}

impl ListQuery<Bill> {
    pub fn bills(user_id: impl Into<String>, params: ListParams) -> Self {
        Self::new(Resource::Bills, user_id, params)
    }
}

impl ListQuery<Receivable> {
    pub fn receivables(user_id: impl Into<String>, params: ListParams) -> Self {
        Self::new(Resource::Receivables, user_id, params)
    }
}

impl<T> CacheQuery for ListQuery<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    type Params = ListParams;
    type Output = Page<T>;

    fn namespace(&self) -> String {
        self.resource.namespace(&self.user_id)
    }

    fn params(&self) -> Option<&ListParams> {
        Some(&self.params)
    }

    fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(Error::ValidationError("user id is required".to_string()));
        }
        if self.params.size == 0 || self.params.size > MAX_PAGE_SIZE {
            return Err(Error::ValidationError(format!(
                "page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if let (Some(from), Some(to)) = (self.params.due_from, self.params.due_to) {
            if from > to {
                return Err(Error::ValidationError(format!(
                    "due date range is inverted: {} > {}",
                    from, to
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::HashKeyGenerator;
    use crate::query::cache_key;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("invalid date")
    }

    #[test]
    fn test_classify() {
        let today = day(2024, 5, 10);
        assert_eq!(
            PaymentStatus::classify(day(2024, 5, 1), Some(day(2024, 5, 2)), today),
            PaymentStatus::Paid
        );
        assert_eq!(
            PaymentStatus::classify(day(2024, 5, 9), None, today),
            PaymentStatus::Overdue
        );
        assert_eq!(
            PaymentStatus::classify(today, None, today),
            PaymentStatus::DueToday
        );
        assert_eq!(
            PaymentStatus::classify(day(2024, 6, 1), None, today),
            PaymentStatus::Pending
        );
    }

    #[test]
    fn test_bill_status() {
        let bill = Bill {
            id: "b1".into(),
            user_id: "u1".into(),
            description: "Rent".into(),
            amount_cents: 150_000,
            due_date: day(2024, 5, 5),
            paid_on: None,
            category_id: None,
            payment_method_id: Some("pix".into()),
        };
        assert_eq!(bill.status(day(2024, 5, 6)), PaymentStatus::Overdue);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&PaymentStatus::DueToday).expect("serialize"),
            "\"due_today\""
        );
    }

    #[test]
    fn test_namespaces() {
        assert_eq!(Resource::Bills.namespace("u1"), "bills/u1");
        assert_eq!(Resource::PaymentMethods.namespace("u1"), "payment-methods/u1");
        assert_eq!(Resource::Bills.namespace("a/b"), "bills/a%2Fb");
        assert_eq!(
            BillQuery::bills("u1", ListParams::page(0, 10)).namespace(),
            "bills/u1"
        );
    }

    #[test]
    fn test_status_filter_changes_key() {
        let generator = HashKeyGenerator::global();
        let all = BillQuery::bills("u1", ListParams::page(0, 10));
        let overdue =
            BillQuery::bills("u1", ListParams::page(0, 10).with_status(PaymentStatus::Overdue));
        let paid = BillQuery::bills("u1", ListParams::page(0, 10).with_status(PaymentStatus::Paid));

        let keys = [
            cache_key(&all, generator).expect("key"),
            cache_key(&overdue, generator).expect("key"),
            cache_key(&paid, generator).expect("key"),
        ];
        assert_ne!(keys[0], keys[1]);
        assert_ne!(keys[1], keys[2]);
        assert!(keys.iter().all(|k| k.as_deref().is_some_and(|k| k.starts_with("bills/u1/"))));
    }

    #[test]
    fn test_bills_and_receivables_do_not_collide() {
        let generator = HashKeyGenerator::global();
        let params = ListParams::page(0, 10);
        let bills = cache_key(&BillQuery::bills("u1", params.clone()), generator).expect("key");
        let receivables =
            cache_key(&ReceivableQuery::receivables("u1", params), generator).expect("key");
        assert_ne!(bills, receivables);
    }

    #[test]
    fn test_validation() {
        assert!(BillQuery::bills("u1", ListParams::page(0, 10)).validate().is_ok());
        assert!(BillQuery::bills(" ", ListParams::page(0, 10)).validate().is_err());
        assert!(BillQuery::bills("u1", ListParams::page(0, 0)).validate().is_err());
        assert!(BillQuery::bills("u1", ListParams::page(0, MAX_PAGE_SIZE + 1))
            .validate()
            .is_err());
        assert!(BillQuery::bills(
            "u1",
            ListParams::page(0, 10).due_between(day(2024, 6, 1), day(2024, 5, 1))
        )
        .validate()
        .is_err());
    }
}
