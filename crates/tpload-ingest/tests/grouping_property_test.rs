//! Property tests for tenant grouping
//!
//! For any input order, the groups handed out by a [`TenantBuffer`] are the
//! maximal runs of consecutive equal tenant ids, in input order, and together
//! contain every record exactly once.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::{single_file_schema, Fixture, RecordingSink};
use proptest::prelude::*;
use tpload_ingest::buffer::TenantBuffer;
use tpload_ingest::registry::TypeRegistration;
use tpload_ingest::{Group, Loader, Record, TenantKey};

fn record(tenant: &str, seq: usize) -> Record {
    [("ID", tenant.to_string()), ("Seq", seq.to_string())]
        .into_iter()
        .collect()
}

/// Maximal runs of equal neighbours as (tenant, length)
fn runs(tenants: &[String]) -> Vec<(String, usize)> {
    let mut out: Vec<(String, usize)> = Vec::new();
    for tenant in tenants {
        match out.last_mut() {
            Some((last, n)) if last == tenant => *n += 1,
            _ => out.push((tenant.clone(), 1)),
        }
    }
    out
}

fn tenants_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(prop::sample::select(vec!["A", "B", "C"]), 0..40)
        .prop_map(|v| v.into_iter().map(str::to_string).collect())
}

proptest! {
    #[test]
    fn groups_are_maximal_contiguous_runs(tenants in tenants_strategy()) {
        let mut buffer = TenantBuffer::new(TenantKey::new(["ID"]));
        let mut groups: Vec<Group> = Vec::new();

        for (seq, tenant) in tenants.iter().enumerate() {
            groups.extend(buffer.absorb(record(tenant, seq)));
        }
        groups.extend(buffer.drain());
        prop_assert_eq!(buffer.pending(), 0);

        let shape: Vec<(String, usize)> = groups
            .iter()
            .map(|g| (g.tenant_id.to_string(), g.len()))
            .collect();
        prop_assert_eq!(shape, runs(&tenants));

        let order: Vec<String> = groups
            .iter()
            .flat_map(|g| g.records.iter())
            .map(|r| r.get("Seq").unwrap().to_string())
            .collect();
        let expected: Vec<String> = (0..tenants.len()).map(|i| i.to_string()).collect();
        prop_assert_eq!(order, expected);
    }

    #[test]
    fn folder_run_commits_one_group_per_run(tenants in tenants_strategy()) {
        let fixture = Fixture::new();
        let content: String = tenants
            .iter()
            .enumerate()
            .map(|(i, t)| format!("{t},{i}\n"))
            .collect();
        fixture.file("rates.csv", &content);
        let sink = RecordingSink::new();

        let mut loader = Loader::builder("prop", fixture.path())
            .register(TypeRegistration::from_schema(
                "rates",
                single_file_schema("rates.csv"),
                TenantKey::new(["ID"]),
                sink.clone(),
            ))
            .build()
            .unwrap();
        let report = loader.process_folder().unwrap();

        let shape: Vec<(String, usize)> = sink
            .commits()
            .into_iter()
            .map(|c| (c.tenant_id, c.records.len()))
            .collect();
        let expected = runs(&tenants);
        prop_assert_eq!(report.groups_committed(), expected.len() as u64);
        prop_assert_eq!(shape, expected);
        prop_assert!(!fixture.marker_exists());
    }
}
