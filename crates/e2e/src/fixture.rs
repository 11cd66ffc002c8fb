//! Seeding and teardown of entities the journeys depend on

use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, TimeZone, Utc};
use parking_lot::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::{ApiClient, Connection, DagRun};
use crate::error::E2eResult;

/// Something created during a journey that teardown must remove
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Created {
    Connection(String),
    DagRun { dag_id: String, dag_run_id: String },
}

/// Owns out-of-band setup and records everything created, so cleanup can
/// remove it in reverse order even when the journey fails midway
pub struct Seeder {
    api: ApiClient,
    prefix: String,
    created: Mutex<Vec<Created>>,
}

impl Seeder {
    pub fn new(api: ApiClient) -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self {
            api,
            prefix: format!("e2e_{}", &id[..8]),
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Unique to this seeder; every seeded id starts with it
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// An id unique to this run, e.g. `e2e_1a2b3c4d_conn`
    pub fn unique_id(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }

    pub fn track_connection(&self, connection_id: impl Into<String>) {
        self.created.lock().push(Created::Connection(connection_id.into()));
    }

    pub fn track_dag_run(&self, dag_id: impl Into<String>, dag_run_id: impl Into<String>) {
        self.created.lock().push(Created::DagRun {
            dag_id: dag_id.into(),
            dag_run_id: dag_run_id.into(),
        });
    }

    pub fn tracked(&self) -> Vec<Created> {
        self.created.lock().clone()
    }

    pub async fn seed_connection(&self, name: &str, conn_type: &str) -> E2eResult<Connection> {
        let connection = Connection {
            connection_id: self.unique_id(name),
            conn_type: conn_type.to_string(),
            host: Some("e2e.invalid".to_string()),
            description: Some("seeded by airflow-ui-e2e".to_string()),
            ..Default::default()
        };
        let created = self.api.create_connection(&connection).await?;
        self.track_connection(&created.connection_id);
        Ok(created)
    }

    /// Create `count` runs of `dag_id`, one day apart, optionally forced into
    /// `state`. Returned oldest first.
    pub async fn seed_dag_runs(&self, dag_id: &str, count: usize, state: Option<&str>) -> E2eResult<Vec<DagRun>> {
        self.api.unpause_dag(dag_id).await?;

        let mut runs = Vec::with_capacity(count);
        for (i, logical_date) in logical_dates(count).into_iter().enumerate() {
            let run_id = self.unique_id(&format!("run_{:02}", i));
            let date = logical_date.to_rfc3339_opts(SecondsFormat::Secs, true);
            let mut run = self.api.trigger_dag_run(dag_id, &run_id, &date).await?;
            self.track_dag_run(dag_id, &run.dag_run_id);

            if let Some(state) = state {
                run = self.api.patch_dag_run_state(dag_id, &run.dag_run_id, state).await?;
            }
            runs.push(run);
        }
        info!("Seeded {} run(s) of {} with prefix {}", runs.len(), dag_id, self.prefix);
        Ok(runs)
    }

    /// Remove everything recorded, newest first. Failures are logged and do
    /// not stop the rest; returns how many removals failed.
    pub async fn cleanup(&self) -> usize {
        let created: Vec<Created> = std::mem::take(&mut *self.created.lock());
        let mut failures = 0;

        for item in created.into_iter().rev() {
            let result = match &item {
                Created::Connection(id) => self.api.delete_connection(id).await,
                Created::DagRun { dag_id, dag_run_id } => self.api.delete_dag_run(dag_id, dag_run_id).await,
            };
            match result {
                Ok(true) => {}
                Ok(false) => info!("{:?} was already gone", item),
                Err(e) => {
                    failures += 1;
                    warn!("Cleanup of {:?} failed: {}", item, e);
                }
            }
        }
        failures
    }
}

/// Distinct midnight dates ending yesterday, oldest first
fn logical_dates(count: usize) -> Vec<DateTime<Utc>> {
    let today = Utc::now().date_naive();
    (1..=count)
        .rev()
        .filter_map(|days_ago| {
            let day = today - ChronoDuration::days(days_ago as i64);
            day.and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn seeder() -> Seeder {
        Seeder::new(ApiClient::new("http://127.0.0.1:9/", Duration::from_millis(200)).unwrap())
    }

    #[test]
    fn test_unique_ids_share_prefix() {
        let a = seeder();
        let b = seeder();
        assert_ne!(a.prefix(), b.prefix());
        assert!(a.unique_id("conn").starts_with(a.prefix()));
        assert_eq!(a.prefix().len(), "e2e_".len() + 8);
    }

    #[test]
    fn test_logical_dates_are_distinct_and_ascending() {
        let dates = logical_dates(5);
        assert_eq!(dates.len(), 5);
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        assert!(dates[4] < Utc::now());
    }

    #[tokio::test]
    async fn test_cleanup_reports_failures_and_empties_ledger() {
        let seeder = seeder();
        seeder.track_connection("c1");
        seeder.track_dag_run("demo", "r1");
        assert_eq!(
            seeder.tracked(),
            vec![
                Created::Connection("c1".into()),
                Created::DagRun { dag_id: "demo".into(), dag_run_id: "r1".into() },
            ]
        );

        assert_eq!(seeder.cleanup().await, 2);
        assert!(seeder.tracked().is_empty());
    }
}
