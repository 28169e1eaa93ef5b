use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use ulid::Ulid;

use fleetbook::config::Config;
use fleetbook::engine::{AllocationPolicy, Engine, EngineError};
use fleetbook::ledger;
use fleetbook::model::{Customer, Reservation};

// ── Test infrastructure ──────────────────────────────────────

fn test_config(policy: AllocationPolicy) -> Config {
    let dir = std::env::temp_dir().join(format!("fleetbook_int_test_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    Config {
        data_dir: dir,
        policy,
        lock_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

fn write_fleet(config: &mut Config, json: &str) {
    let path: PathBuf = config.data_dir.join("fleet.json");
    std::fs::write(&path, json).unwrap();
    config.fleet_path = Some(path);
}

fn customer(i: usize) -> Customer {
    Customer {
        name: format!("Customer{i}"),
        surname: "Load".into(),
        email: format!("c{i}@example.com"),
        phone: "000".into(),
        address: "Somewhere".into(),
        ..Default::default()
    }
}

/// Panics if any unit carries two overlapping reservations.
fn assert_no_double_booking(reservations: &[Reservation]) {
    let mut by_unit: HashMap<u32, Vec<&Reservation>> = HashMap::new();
    for r in reservations {
        by_unit.entry(r.unit_id).or_default().push(r);
    }
    for (unit, list) in by_unit {
        for (i, a) in list.iter().enumerate() {
            for b in &list[i + 1..] {
                assert!(
                    !a.span.overlaps(&b.span),
                    "unit {unit} double-booked: {:?} vs {:?}",
                    a.span,
                    b.span
                );
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn random_overlapping_load_never_double_books() {
    for policy in [AllocationPolicy::FirstFit, AllocationPolicy::RandomFit] {
        let config = test_config(policy);
        let engine = Arc::new(Engine::open(&config).unwrap());

        let tasks = (0..200).map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move {
                let category = if i % 4 == 0 { "Volvo" } else { "S-Presso" };
                let start = 1 + (i * 7) % 25;
                let len = (i * 3) % 5;
                let s = format!("2024-03-{start:02}");
                let e = format!("2024-03-{:02}", start + len);
                engine.submit_raw(category, &s, &e, customer(i)).await
            })
        });
        let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();

        let committed = results.iter().filter(|r| r.is_ok()).count();
        assert!(committed > 0);
        for r in &results {
            if let Err(e) = r {
                assert!(matches!(e, EngineError::NoAvailability { .. }), "{e}");
            }
        }

        let all = engine.ledger().await.unwrap();
        assert_eq!(all.len(), committed);
        assert_no_double_booking(&all);

        // Same state after a restart.
        drop(engine);
        let reopened = Engine::open(&config).unwrap();
        let replayed = reopened.ledger().await.unwrap();
        assert_eq!(replayed.len(), committed);
        assert_no_double_booking(&replayed);

        let _ = std::fs::remove_dir_all(&config.data_dir);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn exactly_one_winner_per_free_unit() {
    let mut config = test_config(AllocationPolicy::FirstFit);
    write_fleet(
        &mut config,
        r#"[{"category": "Hilux", "units": [{"id": 1, "plate": "H-1"}, {"id": 2, "plate": "H-2"}]}]"#,
    );
    let engine = Arc::new(Engine::open(&config).unwrap());

    let tasks = (0..16).map(|i| {
        let engine = engine.clone();
        tokio::spawn(async move {
            engine
                .submit_raw("Hilux", "2024-12-20", "2024-12-27", customer(i))
                .await
        })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();

    let mut plates: Vec<_> = results
        .iter()
        .filter_map(|r| r.as_ref().ok().map(|r| r.plate.clone()))
        .collect();
    plates.sort();
    assert_eq!(plates, vec!["H-1", "H-2"]);

    let _ = std::fs::remove_dir_all(&config.data_dir);
}

#[tokio::test]
async fn ledger_export_lists_bookings_by_start() {
    let config = test_config(AllocationPolicy::FirstFit);
    let engine = Engine::open(&config).unwrap();

    engine
        .submit_raw("Volvo", "2024-09-10", "2024-09-12", customer(1))
        .await
        .unwrap();
    engine
        .submit_raw("S-Presso", "2024-09-01", "2024-09-01", customer(2))
        .await
        .unwrap();

    let reservations = engine.ledger().await.unwrap();
    let mut out = Vec::new();
    ledger::write_tsv(&mut out, &reservations).unwrap();
    let text = String::from_utf8(out).unwrap();
    let rows: Vec<Vec<&str>> = text.lines().skip(1).map(|l| l.split('\t').collect()).collect();

    assert_eq!(rows.len(), 2);
    // start_date through plate
    assert_eq!(&rows[0][11..], ["2024-09-01", "2024-09-01", "1", "S-Presso", "101", "N140-374W"]);
    assert_eq!(&rows[1][11..], ["2024-09-10", "2024-09-12", "3", "Volvo", "201", "Ann 8"]);

    let _ = std::fs::remove_dir_all(&config.data_dir);
}

#[tokio::test]
async fn unknown_fleet_file_fails_open() {
    let mut config = test_config(AllocationPolicy::FirstFit);
    config.fleet_path = Some(config.data_dir.join("missing.json"));
    assert!(Engine::open(&config).is_err());
    let _ = std::fs::remove_dir_all(&config.data_dir);
}
