//! Domain-specific assertion macros for gridiron harnesses.
//!
//! These wrap `pretty_assertions` and add context-rich failure messages that
//! make it clear *which* part of a sync run went wrong.

/// Assert the terminal state and ledger status of a `JobResult`.
///
/// ```rust
/// assert_job!(result, JobState::Completed, SyncStatus::Success);
/// ```
#[macro_export]
macro_rules! assert_job {
    ($result:expr, $state:expr, $status:expr) => {{
        let result: &gridiron::JobResult = &$result;
        if result.state != $state || result.status != $status {
            panic!(
                "assert_job! failed:\n  expected: {:?} / {:?}\n  actual:   {:?} / {:?}\n  result:   {:#?}",
                $state, $status, result.state, result.status, result
            );
        }
    }};
}

/// Assert the ledger holds `status` for `resource`.
#[macro_export]
macro_rules! assert_ledger_status {
    ($ledger:expr, $resource:expr, $status:expr) => {{
        let key = $resource.to_string();
        let entries = $ledger.read_all().await.expect("ledger readable");
        match entries.get(&key) {
            Some(entry) => pretty_assertions::assert_eq!(
                entry.status, $status,
                "ledger status for {:?}", key
            ),
            None => panic!(
                "assert_ledger_status! failed: no entry for {:?}.\n  Present: {:?}",
                key,
                entries.keys().collect::<Vec<_>>()
            ),
        }
    }};
}

/// Assert a store holds exactly these external ids for `kind`, in order.
#[macro_export]
macro_rules! assert_stored_ids {
    ($store:expr, $kind:expr, [$($id:expr),* $(,)?]) => {{
        use gridiron_core::EntityReader as _;
        let stored = $store
            .query($kind, &gridiron_core::EntityQuery::default())
            .await
            .expect("store readable");
        let actual: Vec<i64> = stored.iter().map(|s| s.entity.external_id.0).collect();
        let expected: Vec<i64> = vec![$($id),*];
        pretty_assertions::assert_eq!(actual, expected, "stored ids for {:?}", $kind);
    }};
}
