//! Reminder scheduler behavior against mock collaborators
//!
//! These tests drive the scheduler without a database, a ledger node, or
//! real time: the ledger, the participant directory, and the push sender
//! are all in-memory trait implementations.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use peerlend_server::identity::{Address, Participant};
use peerlend_server::ledger::{LedgerError, Loan, LoanLedger, LoanStatus};
use peerlend_server::notifications::{
    DispatchError, PushSender, ReminderDirectory, ReminderScheduler,
};

fn addr(last_byte: &str) -> Address {
    Address::parse(&format!("0x{}{}", "00".repeat(19), last_byte)).unwrap()
}

fn loan(id: u64, status: LoanStatus, due_in: ChronoDuration, borrower: &Address, lender: &Address) -> Loan {
    let now = Utc::now();
    Loan {
        loan_id: id,
        borrower: borrower.clone(),
        lender: lender.clone(),
        amount: 10_000_000_000_000_000_000,
        collateral: "collateral".to_string(),
        status,
        renegotiation_pending: false,
        due_date: now + due_in,
        last_modified_at: now,
        proposed_due_date: now,
        created_at: now - ChronoDuration::days(7),
    }
}

struct MockLedger {
    loans: Vec<Loan>,
    fail: AtomicBool,
    calls: AtomicUsize,
}

impl MockLedger {
    fn new(loans: Vec<Loan>) -> Self {
        Self {
            loans,
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LoanLedger for MockLedger {
    async fn get_loan(&self, loan_id: u64) -> Result<Option<Loan>, LedgerError> {
        Ok(self.loans.iter().find(|l| l.loan_id == loan_id).cloned())
    }

    async fn get_user_loans(
        &self,
        _address: &Address,
        _is_borrower: bool,
        _is_request_only: bool,
    ) -> Result<Vec<Loan>, LedgerError> {
        Ok(self.loans.clone())
    }

    async fn get_all_loans(&self) -> Result<Vec<Loan>, LedgerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(LedgerError::Unavailable("node down".to_string()));
        }
        Ok(self.loans.clone())
    }

    async fn transaction_count(&self, _address: &Address) -> Result<u64, LedgerError> {
        Ok(0)
    }

    async fn gas_price(&self) -> Result<u128, LedgerError> {
        Ok(1)
    }
}

#[derive(Default)]
struct MockDirectory {
    users: HashMap<Address, (Uuid, String)>,
    endpoints: HashMap<Uuid, Vec<String>>,
    fail_endpoints_for: Option<Uuid>,
    recorded: Mutex<Vec<(Uuid, String, String)>>,
}

#[async_trait]
impl ReminderDirectory for MockDirectory {
    async fn resolve_participants(
        &self,
        addresses: &HashSet<Address>,
    ) -> anyhow::Result<HashMap<Address, Participant>> {
        Ok(addresses
            .iter()
            .map(|a| {
                let participant = match self.users.get(a) {
                    Some((id, name)) => Participant {
                        user_id: Some(*id),
                        display_name: name.clone(),
                    },
                    None => Participant::unknown(),
                };
                (a.clone(), participant)
            })
            .collect())
    }

    async fn push_endpoints(&self, user_id: Uuid) -> anyhow::Result<Vec<String>> {
        if self.fail_endpoints_for == Some(user_id) {
            anyhow::bail!("endpoint lookup failed");
        }
        Ok(self.endpoints.get(&user_id).cloned().unwrap_or_default())
    }

    async fn record_delivery(&self, user_id: Uuid, title: &str, body: &str) -> anyhow::Result<()> {
        self.recorded
            .lock()
            .unwrap()
            .push((user_id, title.to_string(), body.to_string()));
        Ok(())
    }
}

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<(String, String, String)>>,
    failing_endpoints: HashSet<String>,
}

#[async_trait]
impl PushSender for RecordingSender {
    async fn send(&self, endpoint: &str, title: &str, body: &str) -> Result<(), DispatchError> {
        if self.failing_endpoints.contains(endpoint) {
            return Err(DispatchError("gateway rejected".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((endpoint.to_string(), title.to_string(), body.to_string()));
        Ok(())
    }
}

fn scheduler(
    ledger: Arc<MockLedger>,
    directory: Arc<MockDirectory>,
    sender: Arc<RecordingSender>,
) -> ReminderScheduler {
    ReminderScheduler::new(
        ledger,
        directory,
        sender,
        Duration::from_secs(3600),
        ChronoDuration::days(2),
    )
}

#[tokio::test]
async fn urgent_loan_dispatches_exactly_once_per_endpoint() {
    let borrower = addr("aa");
    let lender = addr("bb");
    let borrower_id = Uuid::new_v4();
    let lender_id = Uuid::new_v4();

    let ledger = Arc::new(MockLedger::new(vec![loan(
        1,
        LoanStatus::Approved,
        ChronoDuration::days(1),
        &borrower,
        &lender,
    )]));

    let mut directory = MockDirectory::default();
    directory
        .users
        .insert(borrower.clone(), (borrower_id, "Bea".to_string()));
    directory
        .users
        .insert(lender.clone(), (lender_id, "Lena".to_string()));
    directory
        .endpoints
        .insert(borrower_id, vec!["tok-1".to_string()]);
    let directory = Arc::new(directory);

    let sender = Arc::new(RecordingSender::default());

    let report = scheduler(ledger, directory.clone(), sender.clone())
        .run_once()
        .await
        .unwrap();

    assert_eq!(report.scanned, 1);
    assert_eq!(report.urgent, 1);
    assert_eq!(report.dispatched, 1);
    assert_eq!(report.failures, 0);

    let sent = sender.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    let (endpoint, title, body) = &sent[0];
    assert_eq!(endpoint, "tok-1");
    assert_eq!(title, "Loan Due");
    assert!(body.contains("Lena"), "reminder names the lender: {}", body);

    // One inbox copy for the borrower
    let recorded = directory.recorded.lock().unwrap();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].0, borrower_id);
}

#[tokio::test]
async fn repaid_and_pending_loans_never_remind() {
    let borrower = addr("aa");
    let lender = addr("bb");
    let borrower_id = Uuid::new_v4();

    let ledger = Arc::new(MockLedger::new(vec![
        loan(1, LoanStatus::Repaid, ChronoDuration::days(1), &borrower, &lender),
        loan(2, LoanStatus::Pending, ChronoDuration::days(1), &borrower, &lender),
        loan(3, LoanStatus::Rejected, ChronoDuration::days(1), &borrower, &lender),
    ]));

    let mut directory = MockDirectory::default();
    directory
        .users
        .insert(borrower.clone(), (borrower_id, "Bea".to_string()));
    directory
        .endpoints
        .insert(borrower_id, vec!["tok-1".to_string()]);
    let directory = Arc::new(directory);

    let sender = Arc::new(RecordingSender::default());

    let report = scheduler(ledger, directory, sender.clone())
        .run_once()
        .await
        .unwrap();

    assert_eq!(report.scanned, 3);
    assert_eq!(report.urgent, 0);
    assert_eq!(report.dispatched, 0);
    assert!(sender.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn loan_outside_urgency_window_is_not_urgent() {
    let borrower = addr("aa");
    let lender = addr("bb");

    let ledger = Arc::new(MockLedger::new(vec![
        loan(1, LoanStatus::Approved, ChronoDuration::days(10), &borrower, &lender),
        // Overdue loans stay urgent
        loan(2, LoanStatus::Approved, ChronoDuration::days(-3), &borrower, &lender),
    ]));

    let directory = Arc::new(MockDirectory::default());
    let sender = Arc::new(RecordingSender::default());

    let report = scheduler(ledger, directory, sender)
        .run_once()
        .await
        .unwrap();

    assert_eq!(report.urgent, 1);
}

#[tokio::test]
async fn borrower_without_endpoints_is_skipped_quietly() {
    let borrower = addr("aa");
    let lender = addr("bb");
    let borrower_id = Uuid::new_v4();

    let ledger = Arc::new(MockLedger::new(vec![loan(
        1,
        LoanStatus::Approved,
        ChronoDuration::days(1),
        &borrower,
        &lender,
    )]));

    let mut directory = MockDirectory::default();
    directory
        .users
        .insert(borrower.clone(), (borrower_id, "Bea".to_string()));
    let directory = Arc::new(directory);

    let sender = Arc::new(RecordingSender::default());

    let report = scheduler(ledger, directory, sender)
        .run_once()
        .await
        .unwrap();

    assert_eq!(report.urgent, 1);
    assert_eq!(report.dispatched, 0);
    assert_eq!(report.failures, 0);
}

#[tokio::test]
async fn per_loan_failure_does_not_abort_the_run() {
    let borrower_a = addr("aa");
    let borrower_b = addr("ab");
    let lender = addr("bb");
    let id_a = Uuid::new_v4();
    let id_b = Uuid::new_v4();

    let ledger = Arc::new(MockLedger::new(vec![
        loan(1, LoanStatus::Approved, ChronoDuration::days(1), &borrower_a, &lender),
        loan(2, LoanStatus::Approved, ChronoDuration::days(1), &borrower_b, &lender),
    ]));

    let mut directory = MockDirectory::default();
    directory
        .users
        .insert(borrower_a.clone(), (id_a, "Ana".to_string()));
    directory
        .users
        .insert(borrower_b.clone(), (id_b, "Ben".to_string()));
    directory
        .endpoints
        .insert(id_a, vec!["tok-a".to_string()]);
    directory
        .endpoints
        .insert(id_b, vec!["tok-b".to_string()]);
    // Endpoint lookup blows up for borrower A only
    directory.fail_endpoints_for = Some(id_a);
    let directory = Arc::new(directory);

    let sender = Arc::new(RecordingSender::default());

    let report = scheduler(ledger, directory, sender.clone())
        .run_once()
        .await
        .unwrap();

    assert_eq!(report.failures, 1);
    assert_eq!(report.dispatched, 1);
    let sent = sender.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "tok-b");
}

#[tokio::test]
async fn per_endpoint_failure_is_isolated_from_siblings() {
    let borrower = addr("aa");
    let lender = addr("bb");
    let borrower_id = Uuid::new_v4();

    let ledger = Arc::new(MockLedger::new(vec![loan(
        1,
        LoanStatus::Approved,
        ChronoDuration::days(1),
        &borrower,
        &lender,
    )]));

    let mut directory = MockDirectory::default();
    directory
        .users
        .insert(borrower.clone(), (borrower_id, "Bea".to_string()));
    directory.endpoints.insert(
        borrower_id,
        vec!["tok-bad".to_string(), "tok-good".to_string()],
    );
    let directory = Arc::new(directory);

    let mut sender = RecordingSender::default();
    sender.failing_endpoints.insert("tok-bad".to_string());
    let sender = Arc::new(sender);

    let report = scheduler(ledger, directory.clone(), sender.clone())
        .run_once()
        .await
        .unwrap();

    assert_eq!(report.dispatched, 1);
    assert_eq!(report.failures, 1);
    assert_eq!(sender.sent.lock().unwrap().len(), 1);
    // The inbox copy still lands because one delivery succeeded
    assert_eq!(directory.recorded.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_borrower_counts_as_failure() {
    let borrower = addr("aa");
    let lender = addr("bb");

    let ledger = Arc::new(MockLedger::new(vec![loan(
        1,
        LoanStatus::Approved,
        ChronoDuration::days(1),
        &borrower,
        &lender,
    )]));

    // No users registered at all
    let directory = Arc::new(MockDirectory::default());
    let sender = Arc::new(RecordingSender::default());

    let report = scheduler(ledger, directory, sender)
        .run_once()
        .await
        .unwrap();

    assert_eq!(report.urgent, 1);
    assert_eq!(report.failures, 1);
    assert_eq!(report.dispatched, 0);
}

#[tokio::test]
async fn bulk_read_failure_aborts_only_that_run() {
    let ledger = Arc::new(MockLedger::new(vec![]));
    ledger.fail.store(true, Ordering::SeqCst);

    let directory = Arc::new(MockDirectory::default());
    let sender = Arc::new(RecordingSender::default());

    let sched = scheduler(ledger.clone(), directory, sender);
    assert!(sched.run_once().await.is_err());

    // The next run succeeds once the node recovers
    ledger.fail.store(false, Ordering::SeqCst);
    assert!(sched.run_once().await.is_ok());
}

#[tokio::test]
async fn start_runs_immediately_and_stop_prevents_further_runs() {
    let ledger = Arc::new(MockLedger::new(vec![]));
    let directory = Arc::new(MockDirectory::default());
    let sender = Arc::new(RecordingSender::default());

    let sched = ReminderScheduler::new(
        ledger.clone(),
        directory,
        sender,
        Duration::from_millis(20),
        ChronoDuration::days(2),
    );

    let handle = sched.start();

    // First scan fires immediately; give a couple of intervals to tick
    tokio::time::sleep(Duration::from_millis(70)).await;
    let before_stop = ledger.calls.load(Ordering::SeqCst);
    assert!(before_stop >= 2, "expected repeated scans, got {}", before_stop);

    handle.stop().await;
    let after_stop = ledger.calls.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(
        ledger.calls.load(Ordering::SeqCst),
        after_stop,
        "no new scan may start after shutdown"
    );
}
