use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tabedit::Session;
use tabedit::ValidationError;
use tabedit::pagination::PageSize;
use tabedit::view::Direction;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn loaded() -> Session {
    let mut session = Session::default();
    session.load(&fixture("challans.csv")).unwrap();
    session
}

fn column(session: &Session, name: &str) -> Vec<String> {
    let view = session.view();
    session
        .page_records(&view)
        .iter()
        .map(|r| r.get(name).unwrap_or_default().to_string())
        .collect()
}

#[test]
fn loaded_fixture_paginates_in_tens() {
    let mut session = loaded();
    let view = session.view();
    assert_eq!(view.projection.len(), 24);
    assert_eq!(view.window.total_pages, 3);
    assert_eq!(view.window.len(), 10);

    session.last_page();
    let view = session.view();
    assert_eq!(view.window.page, 3);
    assert_eq!(view.window.len(), 4);
    assert!(!view.window.has_next());

    session.next_page();
    assert_eq!(session.page(), 3);

    session.set_page_size(PageSize::TwentyFive);
    let view = session.view();
    assert_eq!(session.page(), 1);
    assert_eq!(view.window.total_pages, 1);
    assert_eq!(view.window.len(), 24);
}

#[test]
fn search_is_case_insensitive_over_all_columns() {
    let mut session = loaded();
    session.set_filter("bank01");
    let view = session.view();
    assert_eq!(view.projection.len(), 6);
    assert_eq!(view.window.total_pages, 1);

    session.set_filter("KORAMANGALA");
    assert_eq!(session.view().projection.len(), 5);

    session.set_filter("no such text");
    let view = session.view();
    assert!(view.projection.is_empty());
    assert_eq!(view.window.total_pages, 0);
    assert_eq!(view.window.page, 1);
    assert!(view.window.is_empty());
    assert!(session.stats().to_string().contains("Matching 0"));
}

#[test]
fn sorting_amounts_is_numeric() {
    let mut session = loaded();
    session.set_filter("bank01");
    session.toggle_sort("CHAN_AMT");
    assert_eq!(session.sort().direction, Direction::Ascending);
    // CH0011 has no amount and reads as 0
    assert_eq!(column(&session, "CHAN_AMT"), vec!["0", "99", "250", "1500", "5250", "16000"]);

    session.toggle_sort("CHAN_AMT");
    assert_eq!(session.sort().direction, Direction::Descending);
    assert_eq!(column(&session, "CHAN_AMT"), vec!["16000", "5250", "1500", "250", "99", "0"]);
}

#[test]
fn selection_spans_pages_and_drives_bulk_actions() {
    let mut session = loaded();
    session.select_all_on_page();
    assert!(session.all_selected());
    session.next_page();
    assert!(!session.all_selected());
    session.select_all_on_page();
    assert_eq!(session.selection().len(), 20);

    assert_eq!(session.duplicate_selected().unwrap(), 20);
    assert_eq!(session.records().len(), 44);
    assert!(session.selection().is_empty());

    assert_eq!(session.duplicate_selected(), Err(ValidationError::NothingSelected));
    assert_eq!(session.delete_selected(), Err(ValidationError::NothingSelected));

    // The copies were prepended, select and drop them again
    session.first_page();
    session.set_page_size(PageSize::Fifty);
    let copies = session.records()[..20].iter().map(|r| r.id()).collect::<Vec<_>>();
    for id in copies {
        session.toggle_selected(id);
    }
    assert_eq!(session.delete_selected().unwrap(), 20);
    assert_eq!(session.records().len(), 24);
    assert_eq!(session.records()[0].get("CHALLAN_NO"), Some("CH0001"));
}

#[test]
fn added_record_is_normalized_and_searchable() {
    let mut session = loaded();
    let mut fields = HashMap::new();
    fields.insert("CHALLAN_NO".to_string(), "NEW-0000000001".to_string());
    fields.insert("A_BANCD".to_string(), "BANK99".to_string());
    fields.insert("CHALLAN_DATE".to_string(), "2024-12-31".to_string());
    let id = session.add_record(&fields);

    let record = session.record(id).unwrap();
    assert_eq!(record.get("CHALLAN_NO"), Some("NEW-0000000"));
    assert_eq!(record.get("CHALLAN_DATE"), Some("31-12-2024"));
    assert_eq!(record.get("CHAN_AMT"), Some("0"));
    assert_eq!(session.records()[0].id(), id);

    session.set_filter("bank99");
    assert_eq!(session.page_ids(&session.view()), vec![id]);

    session.update_field(id, "DEPOSITOR", "Someone New");
    assert_eq!(session.record(id).unwrap().get("DEPOSITOR"), Some("Someone New"));

    session.delete_record(id);
    assert!(session.record(id).is_none());
    assert!(session.view().projection.is_empty());
}

#[test]
fn reload_starts_from_scratch() {
    let mut session = loaded();
    session.set_filter("bank02");
    session.toggle_sort("DEPOSITOR");
    session.select_all_on_page();

    let count = session.load(&fixture("challans.csv")).unwrap();
    assert_eq!(count, 24);
    assert_eq!(session.filter(), "");
    assert!(session.sort().column.is_none());
    assert!(session.selection().is_empty());
    assert_eq!(session.page(), 1);

    session.clear();
    assert!(session.is_empty());
    assert!(session.headers().is_empty());
    assert!(session.source().is_none());
}
