//! Performance Wrapper (§4.12): wraps a named async operation, measures
//! elapsed wall-clock, logs one line, warns on budget overrun. Budgets are
//! operational thresholds, not business rules, and live in one table.

use std::time::{Duration, Instant};

/// Per-operation time budgets. Deliberately conservative — these exist to
/// catch a suspension point silently regressing, not to enforce an SLA.
fn budget_for(operation: &str) -> Option<Duration> {
    let ms = match operation {
        "auth.authenticate" => 50,
        "tools.call" => 2_000,
        "analysis.local" => 200,
        "analysis.upstream" => 10_000,
        "snapshot.create" => 1_000,
        "snapshot.restore" => 2_000,
        "docs.resolve_library_id" => 5_000,
        "docs.get_library_docs" => 5_000,
        "path.validate" => 20,
        _ => return None,
    };
    Some(Duration::from_millis(ms))
}

pub struct Measurement {
    pub operation: &'static str,
    pub elapsed: Duration,
    pub over_budget: bool,
}

/// Runs `op` to completion, logging its elapsed time and returning it
/// alongside the result. A budget entry missing from the table is treated
/// as "no budget" — the call is still timed and logged, just never warned.
pub async fn measured<T, F>(operation: &'static str, op: F) -> (T, Measurement)
where
    F: std::future::Future<Output = T>,
{
    let started = Instant::now();
    let result = op.await;
    let elapsed = started.elapsed();

    let over_budget = match budget_for(operation) {
        Some(budget) if elapsed > budget => {
            tracing::warn!(operation, elapsed_ms = elapsed.as_millis() as u64, budget_ms = budget.as_millis() as u64, "operation exceeded budget");
            true
        }
        _ => {
            tracing::debug!(operation, elapsed_ms = elapsed.as_millis() as u64, "operation completed");
            false
        }
    };

    (result, Measurement { operation, elapsed, over_budget })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fast_operation_is_not_flagged() {
        let (_, measurement) = measured("path.validate", async { 1 + 1 }).await;
        assert!(!measurement.over_budget);
    }

    #[tokio::test]
    async fn slow_operation_against_a_tight_budget_is_flagged() {
        let (_, measurement) = measured("path.validate", async {
            tokio::time::sleep(Duration::from_millis(25)).await;
        })
        .await;
        assert!(measurement.over_budget);
    }

    #[tokio::test]
    async fn unknown_operation_is_timed_but_never_flagged() {
        let (_, measurement) = measured("custom.unbudgeted", async {
            tokio::time::sleep(Duration::from_millis(5)).await;
        })
        .await;
        assert!(!measurement.over_budget);
    }
}
