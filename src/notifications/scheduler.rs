//! Due-date reminder scheduler
//!
//! A recurring background task: scan every loan on the ledger, find
//! approved loans inside the urgency window, and push a reminder to each of
//! the borrower's endpoints. Runs once immediately at startup and then at a
//! fixed interval. Per-loan and per-endpoint failures are logged and
//! counted, never fatal; a failed bulk read aborts only that run.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::directory::ReminderDirectory;
use super::dispatch::PushSender;
use crate::identity::Address;
use crate::ledger::{LedgerError, Loan, LoanLedger, LoanStatus};

const REMINDER_TITLE: &str = "Loan Due";

/// Outcome of a single scheduler run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Loans returned by the bulk read.
    pub scanned: usize,
    /// Approved loans inside the urgency window.
    pub urgent: usize,
    /// Successful endpoint deliveries.
    pub dispatched: usize,
    /// Per-loan and per-endpoint failures, logged but not propagated.
    pub failures: usize,
}

/// The reminder scheduler. Create, then [`start`](Self::start) exactly once;
/// the returned handle stops it exactly once at shutdown.
pub struct ReminderScheduler {
    ledger: Arc<dyn LoanLedger>,
    directory: Arc<dyn ReminderDirectory>,
    sender: Arc<dyn PushSender>,
    interval: Duration,
    urgency_window: chrono::Duration,
}

/// Handle to a running scheduler.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Request shutdown and wait for the task to finish. An in-flight run
    /// completes; no new run starts afterwards.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!("Reminder scheduler task panicked: {}", e);
        }
    }
}

impl ReminderScheduler {
    pub fn new(
        ledger: Arc<dyn LoanLedger>,
        directory: Arc<dyn ReminderDirectory>,
        sender: Arc<dyn PushSender>,
        interval: Duration,
        urgency_window: chrono::Duration,
    ) -> Self {
        Self {
            ledger,
            directory,
            sender,
            interval,
            urgency_window,
        }
    }

    /// Spawn the background task. The first scan runs immediately.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            tracing::info!(
                interval_secs = self.interval.as_secs(),
                "Reminder scheduler started"
            );

            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                // The first tick fires immediately; shutdown wins between runs.
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {}
                }

                match self.run_once().await {
                    Ok(report) => {
                        tracing::info!(
                            scanned = report.scanned,
                            urgent = report.urgent,
                            dispatched = report.dispatched,
                            failures = report.failures,
                            "Reminder scan complete"
                        );
                    }
                    Err(e) => {
                        // A failed bulk read aborts this run only.
                        tracing::error!("Reminder scan aborted: {}", e);
                    }
                }
            }

            tracing::info!("Reminder scheduler stopped");
        });

        SchedulerHandle { shutdown, task }
    }

    /// Execute one scan. Public so tests can drive the scheduler without
    /// real time.
    pub async fn run_once(&self) -> Result<RunReport, LedgerError> {
        let loans = self.ledger.get_all_loans().await?;
        let now = Utc::now();

        let mut report = RunReport {
            scanned: loans.len(),
            ..RunReport::default()
        };

        let urgent: Vec<&Loan> = loans.iter().filter(|l| self.is_urgent(l, now)).collect();
        report.urgent = urgent.len();

        if urgent.is_empty() {
            return Ok(report);
        }

        // One batched identity lookup for the whole run.
        let mut addresses: HashSet<Address> = HashSet::new();
        for loan in &urgent {
            addresses.insert(loan.borrower.clone());
            addresses.insert(loan.lender.clone());
        }

        let participants = match self.directory.resolve_participants(&addresses).await {
            Ok(p) => p,
            Err(e) => {
                tracing::error!("Participant resolution failed, skipping run: {}", e);
                report.failures += urgent.len();
                return Ok(report);
            }
        };

        for loan in urgent {
            let borrower_id = participants
                .get(&loan.borrower)
                .and_then(|p| p.user_id);

            let Some(borrower_id) = borrower_id else {
                tracing::warn!(loan_id = loan.loan_id, "Borrower has no linked participant");
                report.failures += 1;
                continue;
            };

            let lender_name = participants
                .get(&loan.lender)
                .and_then(|p| p.user_id.map(|_| p.display_name.clone()))
                .unwrap_or_else(|| "Your lender".to_string());

            match self.remind_borrower(loan, borrower_id, &lender_name).await {
                Ok((sent, failed)) => {
                    report.dispatched += sent;
                    report.failures += failed;
                }
                Err(e) => {
                    tracing::warn!(loan_id = loan.loan_id, "Reminder failed: {}", e);
                    report.failures += 1;
                }
            }
        }

        Ok(report)
    }

    /// Approved loans whose due date is within the urgency window (overdue
    /// included). Pending, Rejected, and Repaid loans never remind.
    fn is_urgent(&self, loan: &Loan, now: chrono::DateTime<Utc>) -> bool {
        loan.status == LoanStatus::Approved && loan.due_date - now <= self.urgency_window
    }

    /// Deliver the reminder to every endpoint of the borrower, isolating
    /// per-endpoint failures. Returns (delivered, failed) counts.
    async fn remind_borrower(
        &self,
        loan: &Loan,
        borrower_id: Uuid,
        lender_name: &str,
    ) -> anyhow::Result<(usize, usize)> {
        let endpoints = self.directory.push_endpoints(borrower_id).await?;
        if endpoints.is_empty() {
            return Ok((0, 0));
        }

        let body = format!(
            "Don't forget to pay your loan due on {} from {}.",
            loan.due_date.format("%Y-%m-%d"),
            lender_name
        );

        let mut sent = 0;
        let mut failed = 0;
        for endpoint in &endpoints {
            match self.sender.send(endpoint, REMINDER_TITLE, &body).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    tracing::warn!(
                        loan_id = loan.loan_id,
                        endpoint = %truncate_endpoint(endpoint),
                        "Push delivery failed: {}",
                        e
                    );
                    failed += 1;
                }
            }
        }

        // One inbox copy per loan per run, once anything was delivered.
        if sent > 0 {
            if let Err(e) = self
                .directory
                .record_delivery(borrower_id, REMINDER_TITLE, &body)
                .await
            {
                tracing::warn!(loan_id = loan.loan_id, "Failed to store inbox copy: {}", e);
                failed += 1;
            }
        }

        Ok((sent, failed))
    }
}

/// Endpoints are credentials; keep logs to a recognizable prefix.
fn truncate_endpoint(endpoint: &str) -> String {
    endpoint.chars().take(8).collect()
}
