//! End to end scenarios through the public API: pipeline, refresh, window
//! and detail lookups working on the same collection.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{TimeZone, Utc};
use iv::dataset::{Dataset, Generator, Provider};
use iv::detail::{self, DetailOutcome};
use iv::model::{Body, Model};
use iv::pipeline;
use iv::record::{ItemType, Record, SortDirection, SortKey, Status, StatusFilter, ViewState};
use iv::scheduler::RefreshScheduler;
use iv::virtualizer::{Virtualizer, compute_window};
use iv::{IvConfig, Message};

fn record(id: u64, status: Status) -> Record {
    Record {
        id,
        name: format!("Item {id}"),
        item_type: ItemType::Asset,
        status,
        last_updated: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    }
}

#[test]
fn active_records_sorted_descending_by_id() {
    let raw = vec![
        record(1, Status::Active),
        record(2, Status::Inactive),
        record(3, Status::Active),
    ];
    let vs = ViewState {
        status_filter: StatusFilter::Active,
        sort_key: SortKey::Id,
        sort_direction: SortDirection::Desc,
        ..Default::default()
    };
    let ids: Vec<u64> = pipeline::compute(&raw, &vs)
        .into_iter()
        .map(|i| raw[i].id)
        .collect();
    assert_eq!(ids, vec![3, 1]);
}

#[test]
fn detail_lookups_degrade_to_messages() {
    let provider = Generator::new(50_000);
    assert_eq!(
        detail::resolve("50001", &provider),
        DetailOutcome::NotFound(50_001)
    );
    assert_eq!(
        detail::resolve("abc", &provider),
        DetailOutcome::InvalidId("abc".to_string())
    );
    assert!(matches!(
        detail::resolve("/details/50000", &provider),
        DetailOutcome::Found(_)
    ));
}

#[test]
fn zero_records_give_empty_window_and_empty_state() {
    let w = compute_window(0, 1, 5, 0, 40);
    assert_eq!(w.range(), 0..0);
    assert_eq!(w.total_height, 0);

    let model = Model::init(&IvConfig::default(), Dataset::generate(0), 80, 24).unwrap();
    assert_eq!(model.get_uidata().body, Body::Empty);
    assert!(!model.get_uidata().loading);
}

#[test]
fn rapid_changes_commit_only_the_last_view_state() {
    let raw = Arc::new(Generator::new(5_000).list(5_000));
    let mut vs = ViewState::default();
    let mut scheduler = RefreshScheduler::new(Duration::from_millis(400), &raw, &vs);
    let t0 = Instant::now();

    let changes: Vec<Box<dyn Fn(&mut ViewState)>> = vec![
        Box::new(|vs| vs.search_text = "4".into()),
        Box::new(|vs| vs.status_filter = StatusFilter::Inactive),
        Box::new(|vs| vs.toggle_sort(SortKey::Name)),
        Box::new(|vs| vs.search_text = "49".into()),
    ];
    let mut commits = Vec::new();
    for (i, change) in changes.iter().enumerate() {
        let now = t0 + Duration::from_millis(i as u64 * 150);
        change(&mut vs);
        scheduler.request(now);
        commits.extend(scheduler.poll(now, &raw, &vs));
    }
    for step in 1..=20 {
        let now = t0 + Duration::from_millis(450 + step * 50);
        commits.extend(scheduler.poll(now, &raw, &vs));
    }

    assert_eq!(commits.len(), 1);
    assert_eq!(commits[0].view_state, vs);
    let expected = pipeline::compute(&raw, &vs);
    assert_eq!(scheduler.displayed().as_slice(), expected.as_slice());
}

#[test]
fn virtualizer_total_height_ignores_rendered_rows() {
    let mut v = Virtualizer::new(2, 3);
    v.set_count(50_000);
    v.resize(30);
    v.scroll_to(40_000);
    let w = v.window();
    assert_eq!(v.total_height(), 100_000);
    assert_eq!(w.total_height, 100_000);
    assert!(w.len() < 30);
    assert!(w.start <= 20_000 && w.end >= 20_015);
}

#[test]
fn model_follows_typing_through_to_the_window() {
    let config = IvConfig::default().with_refresh_delay(Duration::from_millis(100));
    let mut model = Model::init(&config, Dataset::generate(2_000), 100, 30).unwrap();
    let t0 = Instant::now();

    model
        .update_at(Some(Message::SetSearch("item 1".into())), t0)
        .unwrap();
    model
        .update_at(Some(Message::SetSearch("item 12".into())), t0 + Duration::from_millis(60))
        .unwrap();
    model
        .update_at(None, t0 + Duration::from_millis(120))
        .unwrap();
    assert!(model.get_uidata().loading);

    model
        .update_at(None, t0 + Duration::from_millis(160))
        .unwrap();
    let ui = model.get_uidata();
    assert!(!ui.loading);
    // 12, 120..129, 1200..1299
    assert_eq!(ui.nrows, 111);
    match &ui.body {
        Body::Rows(rows) => {
            assert_eq!(rows[0].id, 12);
            assert!(rows.len() < ui.nrows);
            assert!(rows.iter().all(|r| r.cells[1].to_lowercase().contains("item 12")));
        }
        other => panic!("expected rows, got {other:?}"),
    }
}

#[test]
fn provider_lookup_matches_listing() {
    let g = Generator::new(1_000);
    let listed = g.list(1_000);
    for id in [1u64, 500, 1_000] {
        assert_eq!(g.get_by_id(id).as_ref(), listed.get(id as usize - 1));
    }
}
