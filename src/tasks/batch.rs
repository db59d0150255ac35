//! Waiting on a batch apex job until it completes, then reporting how it went.

use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::options::{TaskOptions, non_blank};

const COMPLETED_STATUSES: &[&str] = &["Completed"];
const DEFAULT_POLL_INTERVAL: u64 = 10;

/// Tooling API query collaborator.
pub trait ToolingQuery {
    /// Run a SOQL query and return the raw records.
    fn query(&self, soql: &str) -> anyhow::Result<Vec<Value>>;
}

/// Reference to the apex class a job runs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApexClassRef {
    /// Class name.
    pub name: String,
}

/// A single `AsyncApexJob` record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BatchJob {
    /// Record id.
    pub id: String,
    /// Class the job belongs to.
    pub apex_class: Option<ApexClassRef>,
    /// Job status such as `Processing` or `Completed`.
    pub status: String,
    /// First error message reported by the job.
    pub extended_status: Option<String>,
    /// Number of batches the job was split into.
    pub total_job_items: Option<u64>,
    /// Number of batches processed so far.
    pub job_items_processed: Option<u64>,
    /// Number of batches that failed.
    pub number_of_errors: Option<u64>,
    /// API timestamp the job was created.
    pub created_date: Option<String>,
    /// API timestamp the job completed.
    pub completed_date: Option<String>,
}

impl BatchJob {
    fn errors(&self) -> u64 {
        self.number_of_errors.unwrap_or(0)
    }

    /// Whether the job reached a terminal successful status.
    pub fn is_complete(&self) -> bool {
        COMPLETED_STATUSES.contains(&self.status.as_str())
    }
}

/// Counts summed across jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Batches processed.
    pub job_items_processed: u64,
    /// Batches in total.
    pub total_job_items: u64,
    /// Batches that failed.
    pub number_of_errors: u64,
}

/// Sum processed, total and error counts across `jobs`.
pub fn summarize_batches(jobs: &[BatchJob]) -> BatchSummary {
    jobs.iter().fold(BatchSummary::default(), |mut summary, job| {
        summary.job_items_processed += job.job_items_processed.unwrap_or(0);
        summary.total_job_items += job.total_job_items.unwrap_or(0);
        summary.number_of_errors += job.errors();
        summary
    })
}

/// Jobs reporting at least one failed batch.
pub fn failed_batches(jobs: &[BatchJob]) -> Vec<&BatchJob> {
    jobs.iter().filter(|job| job.errors() > 0).collect()
}

/// True when every batch was counted and none failed.
pub fn done_for_sure(jobs: &[BatchJob]) -> bool {
    let summary = summarize_batches(jobs);
    summary.job_items_processed == summary.total_job_items && summary.number_of_errors == 0
}

/// Time between the oldest job's creation and the newest job's completion.
///
/// Jobs are expected newest first, as returned by the batch query.
pub fn elapsed(jobs: &[BatchJob]) -> Option<chrono::Duration> {
    let newest = jobs.first()?;
    let oldest = jobs.last()?;
    let completed = parse_api_datetime(newest.completed_date.as_deref()?)?;
    let created = parse_api_datetime(oldest.created_date.as_deref()?)?;
    Some(completed - created)
}

/// Parse an API timestamp such as `2019-07-22T19:33:17.000+0000`, ignoring fractions and offset.
pub fn parse_api_datetime(value: &str) -> Option<DateTime<Utc>> {
    let head = value.get(..19)?;
    let naive = NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S").ok()?;
    Some(Utc.from_utc_datetime(&naive))
}

fn class_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("invalid class name regex")
    })
}

/// Options accepted by [`BatchApexWait`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchApexWaitOptions {
    /// Apex class whose latest job is awaited.
    pub class_name: String,
    /// Delay between polls.
    pub poll_interval: Duration,
}

impl BatchApexWaitOptions {
    /// Parse options, falling back to `default_poll_interval` seconds.
    pub fn from_task_options(
        options: &TaskOptions,
        default_poll_interval: Option<u64>,
    ) -> Result<Self> {
        let class_name = non_blank(options, "class_name")
            .ok_or_else(|| Error::MissingOption("class_name".into()))?;
        if !class_name_pattern().is_match(class_name) {
            return Err(Error::invalid_option(
                "class_name",
                format!("`{class_name}` is not a valid apex class name"),
            ));
        }

        let poll_interval = match non_blank(options, "poll_interval") {
            Some(value) => value.parse::<u64>().map_err(|_| {
                Error::invalid_option(
                    "poll_interval",
                    format!("`{value}` is not a number of seconds"),
                )
            })?,
            None => default_poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
        };

        Ok(Self {
            class_name: class_name.to_string(),
            poll_interval: Duration::from_secs(poll_interval),
        })
    }
}

/// Polls the org until the latest batch job for a class completes.
pub struct BatchApexWait<Q> {
    options: BatchApexWaitOptions,
    tooling: Q,
}

impl<Q: ToolingQuery> BatchApexWait<Q> {
    /// Create the task with its tooling query collaborator.
    pub fn new(options: BatchApexWaitOptions, tooling: Q) -> Self {
        Self { options, tooling }
    }

    /// Query used to find the latest job for the configured class.
    pub fn batch_query(&self) -> String {
        format!(
            "SELECT Id, ApexClass.Name, Status, ExtendedStatus, TotalJobItems, \
             JobItemsProcessed, NumberOfErrors, CreatedDate, CompletedDate \
             FROM AsyncApexJob \
             WHERE JobType='BatchApex' \
             AND ApexClass.Name='{}' \
             ORDER BY CreatedDate DESC \
             LIMIT 1",
            self.options.class_name
        )
    }

    /// Block until the job completes and return its summary.
    pub fn run(&self) -> Result<BatchSummary> {
        let jobs = loop {
            let jobs = self.poll()?;
            if jobs[0].is_complete() {
                break jobs;
            }
            thread::sleep(self.options.poll_interval);
        };

        info!("Job is complete.");
        let summary = summarize_batches(&jobs);

        let failures = failed_batches(&jobs);
        if !failures.is_empty() {
            let rendered = failures
                .iter()
                .map(|job| {
                    format!(
                        "{} {} ({} errors): {}",
                        job.id,
                        job.status,
                        job.errors(),
                        job.extended_status.as_deref().unwrap_or("")
                    )
                })
                .collect::<Vec<_>>()
                .join("; ");
            info!("There have been some batch failures.");
            info!("Error values: {rendered}");
            return Err(Error::BatchFailed(rendered));
        }

        if !done_for_sure(&jobs) {
            warn!(?summary, "The final record counts do not add up.");
        }

        if let Some(duration) = elapsed(&jobs) {
            info!(
                "{} took {} seconds to process {} batches.",
                self.options.class_name,
                duration.num_seconds(),
                summary.total_job_items
            );
        }

        Ok(summary)
    }

    fn poll(&self) -> Result<Vec<BatchJob>> {
        let records = self
            .tooling
            .query(&self.batch_query())
            .map_err(|source| Error::Query {
                object: "AsyncApexJob".into(),
                source,
            })?;
        let jobs = records
            .into_iter()
            .map(serde_json::from_value::<BatchJob>)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|err| Error::Query {
                object: "AsyncApexJob".into(),
                source: err.into(),
            })?;

        if jobs.is_empty() {
            return Err(Error::NotFound {
                object: "AsyncApexJob".into(),
                criteria: format!("ApexClass.Name={}", self.options.class_name),
            });
        }

        let summary = summarize_batches(&jobs);
        info!(
            "{}: {} of {} ({} failures)",
            self.options.class_name,
            summary.job_items_processed,
            summary.total_job_items,
            summary.number_of_errors
        );
        Ok(jobs)
    }
}
