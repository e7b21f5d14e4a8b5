//! Record engine tests against a real PostgreSQL database.
//!
//! Set `TEST_DATABASE_URL` to run them; without it each test returns early.
//! The tables are dropped and recreated at the start of every test.

use meridian::models::{CityInput, CityModel, CountryInput, CountryModel, StateInput, StateModel};
use meridian::query::{
    create_record, delete_record, get_record, get_records, require_record, update_record, FilterSet,
    FilterValue, ListParams, LookupOptions, PageWindow, RecordError, SortOrder,
};
use meridian::test_helpers::TestDatabase;
use meridian::{DbError, MayPostgresExecutor, RecordExecutor};
use std::collections::HashSet;

fn setup() -> Option<(TestDatabase, MayPostgresExecutor)> {
    let db = TestDatabase::from_env()?;
    let executor = db.executor().expect("Failed to connect to test database");
    db.reset(&executor).expect("Failed to reset schema");
    Some((db, executor))
}

fn query_count(executor: &MayPostgresExecutor, query: &str, params: &[&dyn may_postgres::types::ToSql]) -> Result<i64, DbError> {
    let rows = executor.query_all(query, params)?;
    if rows.is_empty() {
        Ok(0)
    } else {
        Ok(rows[0].get::<_, i64>(0))
    }
}

fn country(executor: &MayPostgresExecutor, name: &str, code: &str) -> CountryModel {
    create_record::<CountryModel, _>(
        executor,
        &CountryInput {
            name: name.to_string(),
            code: code.to_string(),
        },
    )
    .expect("Failed to create country")
}

fn state(executor: &MayPostgresExecutor, name: &str, code: &str, country_id: &str) -> StateModel {
    create_record::<StateModel, _>(
        executor,
        &StateInput {
            name: name.to_string(),
            code: code.to_string(),
            country_id: country_id.to_string(),
        },
    )
    .expect("Failed to create state")
}

fn city(executor: &MayPostgresExecutor, name: &str, state_id: &str) -> CityModel {
    create_record::<CityModel, _>(
        executor,
        &CityInput {
            name: name.to_string(),
            state_id: state_id.to_string(),
        },
    )
    .expect("Failed to create city")
}

#[test]
fn test_create_fills_identity_and_timestamps() {
    let Some((_db, executor)) = setup() else { return };

    let created = country(&executor, "India", "IN");
    assert_eq!(created.id.len(), 36);
    assert_eq!(created.created_at, created.updated_at);
    assert!(!created.is_deleted);

    let stored = query_count(&executor, "SELECT COUNT(*) FROM countries WHERE id = $1", &[&created.id]).unwrap();
    assert_eq!(stored, 1);
}

#[test]
fn test_pagination_counts_all_matches() {
    let Some((_db, executor)) = setup() else { return };

    for i in 0..25 {
        country(&executor, &format!("Country {i:02}"), &format!("C{i:02}"));
    }

    let first = get_records::<CountryModel, _>(&executor, PageWindow::new(0, 10).unwrap(), &ListParams::new()).unwrap();
    assert_eq!(first.count, 25);
    assert_eq!(first.list.len(), 10);

    let last = get_records::<CountryModel, _>(&executor, PageWindow::new(20, 10).unwrap(), &ListParams::new()).unwrap();
    assert_eq!(last.count, 25);
    assert_eq!(last.list.len(), 5);

    // Default ordering is newest first.
    let all = get_records::<CountryModel, _>(&executor, PageWindow::new(0, 25).unwrap(), &ListParams::new()).unwrap();
    assert!(all.list.windows(2).all(|pair| pair[0].created_at >= pair[1].created_at));

    let beyond = get_records::<CountryModel, _>(&executor, PageWindow::new(100, 10).unwrap(), &ListParams::new()).unwrap();
    assert_eq!(beyond.count, 25);
    assert!(beyond.list.is_empty());
}

fn walk_pages(executor: &MayPostgresExecutor, page_size: u64) -> Vec<String> {
    let mut ids = Vec::new();
    let mut start = 0;
    loop {
        let window = PageWindow::new(start, page_size).unwrap();
        let page = get_records::<CountryModel, _>(executor, window, &ListParams::new()).unwrap();
        assert_eq!(page.count, 25);
        if page.list.is_empty() {
            return ids;
        }
        assert!(page.list.len() as u64 <= page_size);
        ids.extend(page.list.into_iter().map(|c| c.id));
        start += page_size;
    }
}

#[test]
fn test_pages_with_equal_timestamps_cover_every_row_once() {
    let Some((_db, executor)) = setup() else { return };

    for i in 0..25 {
        country(&executor, &format!("Country {i:02}"), &format!("C{i:02}"));
    }
    let stamp = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap();
    let touched = executor
        .execute("UPDATE countries SET created_at = $1", &[&stamp])
        .unwrap();
    assert_eq!(touched, 25);

    let full: Vec<String> = get_records::<CountryModel, _>(&executor, PageWindow::new(0, 100).unwrap(), &ListParams::new())
        .unwrap()
        .list
        .into_iter()
        .map(|c| c.id)
        .collect();
    assert_eq!(full.len(), 25);
    assert_eq!(full.iter().collect::<HashSet<_>>().len(), 25);

    // With created_at tied everywhere, only the id tie-break keeps pages stable.
    for page_size in [3, 7] {
        let walked = walk_pages(&executor, page_size);
        let unique: HashSet<&String> = walked.iter().collect();
        assert_eq!(unique.len(), walked.len(), "duplicate rows with pages of {page_size}");
        assert_eq!(walked, full, "pages of {page_size} disagree with the full listing");
    }
}

#[test]
fn test_relationship_filter_excludes_deleted_and_foreign_rows() {
    let Some((_db, executor)) = setup() else { return };

    let india = country(&executor, "India", "IN");
    let usa = country(&executor, "United States", "US");
    let kerala = state(&executor, "Kerala", "KL", &india.id);
    let texas = state(&executor, "Texas", "TX", &usa.id);

    city(&executor, "Kochi", &kerala.id);
    let gone = city(&executor, "Alappuzha", &kerala.id);
    city(&executor, "Austin", &texas.id);
    delete_record::<CityModel, _>(&executor, &gone.id).unwrap();

    let params = ListParams::new().filter("state.country_id", india.id.as_str());
    let page = get_records::<CityModel, _>(&executor, PageWindow::new(0, 10).unwrap(), &params).unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.list[0].name, "Kochi");
}

#[test]
fn test_filters_and_search_combine() {
    let Some((_db, executor)) = setup() else { return };

    let india = country(&executor, "India", "IN");
    let usa = country(&executor, "United States", "US");
    state(&executor, "Kerala", "KL", &india.id);
    state(&executor, "Karnataka", "KA", &india.id);
    state(&executor, "Kansas", "KS", &usa.id);

    // Search is OR across fields and case-insensitive.
    let params = ListParams::new().search("KA", ["name", "code"]);
    let page = get_records::<StateModel, _>(&executor, PageWindow::new(0, 10).unwrap(), &params).unwrap();
    assert_eq!(page.count, 2);

    // Filters narrow the searched set.
    let params = ListParams::new()
        .filter("country_id", india.id.as_str())
        .search("ka", ["name", "code"])
        .sort_by("name", SortOrder::Asc);
    let page = get_records::<StateModel, _>(&executor, PageWindow::new(0, 10).unwrap(), &params).unwrap();
    let names: Vec<&str> = page.list.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Karnataka"]);

    // A search through a relationship path.
    let params = ListParams::new().search("united", ["country.name"]);
    let page = get_records::<StateModel, _>(&executor, PageWindow::new(0, 10).unwrap(), &params).unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.list[0].name, "Kansas");
}

#[test]
fn test_search_skips_deleted_related_rows() {
    let Some((_db, executor)) = setup() else { return };

    let india = country(&executor, "India", "IN");
    let kerala = state(&executor, "Kerala", "KL", &india.id);
    let goa = state(&executor, "Goa", "GA", &india.id);
    city(&executor, "Kochi", &kerala.id);
    city(&executor, "Panaji", &goa.id);

    let params = ListParams::new().search("kerala", ["state.name"]);
    let before = get_records::<CityModel, _>(&executor, PageWindow::new(0, 10).unwrap(), &params).unwrap();
    assert_eq!(before.count, 1);
    assert_eq!(before.list[0].name, "Kochi");

    delete_record::<StateModel, _>(&executor, &kerala.id).unwrap();

    // Kochi itself is still live, but its state no longer matches.
    let after = get_records::<CityModel, _>(&executor, PageWindow::new(0, 10).unwrap(), &params).unwrap();
    assert_eq!(after.count, 0);
    assert!(after.list.is_empty());

    let all = get_records::<CityModel, _>(&executor, PageWindow::new(0, 10).unwrap(), &ListParams::new()).unwrap();
    assert_eq!(all.count, 2);
}

#[test]
fn test_list_filter_matches_any_value() {
    let Some((_db, executor)) = setup() else { return };

    country(&executor, "India", "IN");
    country(&executor, "Nepal", "NP");
    country(&executor, "Bhutan", "BT");

    let params = ListParams::new().filter("code", FilterValue::from(vec!["IN", "BT"]));
    let page = get_records::<CountryModel, _>(&executor, PageWindow::new(0, 10).unwrap(), &params).unwrap();
    assert_eq!(page.count, 2);
}

#[test]
fn test_sort_through_relationship() {
    let Some((_db, executor)) = setup() else { return };

    let zambia = country(&executor, "Zambia", "ZM");
    let angola = country(&executor, "Angola", "AO");
    state(&executor, "Lusaka", "LS", &zambia.id);
    state(&executor, "Luanda", "LU", &angola.id);

    let params = ListParams::new().sort_by("country.name", SortOrder::Asc);
    let page = get_records::<StateModel, _>(&executor, PageWindow::new(0, 10).unwrap(), &params).unwrap();
    let names: Vec<&str> = page.list.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Luanda", "Lusaka"]);
}

#[test]
fn test_invalid_paths_are_rejected() {
    let Some((_db, executor)) = setup() else { return };

    let params = ListParams::new().filter("state.bogus", "x");
    let err = get_records::<CityModel, _>(&executor, PageWindow::new(0, 10).unwrap(), &params).unwrap_err();
    assert!(matches!(err, RecordError::InvalidField { .. }));

    let params = ListParams::new().sort_by("planet.name", SortOrder::Desc);
    let err = get_records::<CityModel, _>(&executor, PageWindow::new(0, 10).unwrap(), &params).unwrap_err();
    assert!(matches!(err, RecordError::InvalidRelationship { .. }));
}

#[test]
fn test_lookup_is_case_insensitive() {
    let Some((_db, executor)) = setup() else { return };

    let usa = country(&executor, "United States", "US");

    let found = get_record::<CountryModel, _>(&executor, &FilterSet::new().with("code", "us"), LookupOptions::default())
        .unwrap()
        .expect("lookup should find the country");
    assert_eq!(found.id, usa.id);
}

#[test]
fn test_lookup_miss_with_and_without_exception() {
    let Some((_db, executor)) = setup() else { return };

    let filters = FilterSet::new().with("code", "ZZ");
    let err = get_record::<CountryModel, _>(&executor, &filters, LookupOptions::default()).unwrap_err();
    assert_eq!(err.to_string(), "Country not found");

    let none = get_record::<CountryModel, _>(&executor, &filters, LookupOptions::optional()).unwrap();
    assert!(none.is_none());
}

#[test]
fn test_soft_deleted_rows_disappear_from_reads() {
    let Some((_db, executor)) = setup() else { return };

    let nepal = country(&executor, "Nepal", "NP");
    let deleted = delete_record::<CountryModel, _>(&executor, &nepal.id).unwrap();
    assert!(deleted.is_deleted);

    let page = get_records::<CountryModel, _>(&executor, PageWindow::new(0, 10).unwrap(), &ListParams::new()).unwrap();
    assert_eq!(page.count, 0);

    let err = require_record::<CountryModel, _>(&executor, &FilterSet::new().with("id", nepal.id.as_str())).unwrap_err();
    assert!(matches!(err, RecordError::NotFound { .. }));

    let options = LookupOptions {
        include_deleted: true,
        ..LookupOptions::optional()
    };
    let still_there = get_record::<CountryModel, _>(&executor, &FilterSet::new().with("id", nepal.id.as_str()), options).unwrap();
    assert!(still_there.is_some());

    // The row is kept, only flagged.
    let rows = query_count(&executor, "SELECT COUNT(*) FROM countries", &[]).unwrap();
    assert_eq!(rows, 1);

    // Deleting twice is a miss.
    let err = delete_record::<CountryModel, _>(&executor, &nepal.id).unwrap_err();
    assert_eq!(err.to_string(), "Country not found");
}

#[test]
fn test_update_touches_only_given_columns() {
    let Some((_db, executor)) = setup() else { return };

    let bhutan = country(&executor, "Bhutan", "BT");
    let renamed = update_record::<CountryModel, _>(
        &executor,
        &bhutan.id,
        &CountryInput {
            name: "Kingdom of Bhutan".to_string(),
            code: "BT".to_string(),
        },
    )
    .unwrap();

    assert_eq!(renamed.id, bhutan.id);
    assert_eq!(renamed.name, "Kingdom of Bhutan");
    assert_eq!(renamed.created_at, bhutan.created_at);
    assert!(renamed.updated_at >= bhutan.updated_at);
}
