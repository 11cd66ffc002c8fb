//! User journeys composed from the page-objects
//!
//! Each journey seeds what it needs through the API, drives the UI, and
//! asserts one observable property of the list or form it exercises.

mod connections;
mod dag_runs;
mod jobs;
mod providers;
mod task_instances;

use crate::error::{E2eError, E2eResult};
use crate::suite::Journey;

pub fn all() -> Vec<Journey> {
    let mut journeys = Vec::new();
    journeys.extend(dag_runs::journeys());
    journeys.extend(task_instances::journeys());
    journeys.extend(connections::journeys());
    journeys.extend(providers::journeys());
    journeys.extend(jobs::journeys());
    journeys
}

/// `Ok` when `condition` holds, else an assertion failure
pub(crate) fn ensure(condition: bool, expected: impl Into<String>, actual: impl Into<String>) -> E2eResult<()> {
    if condition {
        Ok(())
    } else {
        Err(E2eError::assertion(expected, actual))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_journey_names_are_unique_and_tagged() {
        let journeys = all();
        let names: HashSet<&str> = journeys.iter().map(|j| j.name).collect();
        assert_eq!(names.len(), journeys.len());
        assert!(journeys.iter().all(|j| !j.tags.is_empty()));
        for expected in [
            "dag_runs_pagination",
            "dag_runs_state_filter",
            "dag_runs_search",
            "trigger_dag_run",
            "task_instances_state_filter",
            "connections_crud",
            "connections_search",
            "providers_list",
            "jobs_list",
        ] {
            assert!(names.contains(expected), "missing journey {}", expected);
        }
    }

    #[test]
    fn test_ensure() {
        assert!(ensure(true, "a", "b").is_ok());
        let err = ensure(false, "two pages", "one page").unwrap_err();
        assert_eq!(err.to_string(), "Assertion failed: expected two pages, got one page");
    }
}
