//! Behaviour-driven step definitions driving the command line scenarios.

use super::helpers::TestStore;
use super::*;
use crate::api::FeatureList;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::json;
use std::cell::RefCell;
use uuid::Uuid;

/// Aggregates command scenario state so each step only needs a single world
/// argument.
struct CommandWorld {
    store: TestStore,
    added: RefCell<Vec<Uuid>>,
    pages: RefCell<Vec<FeatureList>>,
    failure: RefCell<Option<CliError>>,
}

impl CommandWorld {
    fn new() -> Self {
        Self {
            store: TestStore::new(),
            added: RefCell::new(Vec::new()),
            pages: RefCell::new(Vec::new()),
            failure: RefCell::new(None),
        }
    }

    fn record_failure(&self, args: &[&str]) {
        let err = self.store.run_err(args);
        self.failure.replace(Some(err));
    }
}

#[fixture]
fn world() -> CommandWorld {
    CommandWorld::new()
}

#[given("a database with the parks collection")]
fn parks_collection(#[from(world)] world: &CommandWorld) {
    world.store.create_collection("parks");
}

#[given("{count} point features in parks")]
fn point_features(#[from(world)] world: &CommandWorld, count: usize) {
    let points: Vec<(f64, f64)> = (0..count)
        .map(|index| {
            let offset = index as f64;
            (offset, offset)
        })
        .collect();
    let added = world.store.add_points("parks", &points);
    world
        .added
        .borrow_mut()
        .extend(added.features.iter().map(|feature| feature.id));
}

#[when("I list parks features {size} at a time")]
fn list_in_pages(#[from(world)] world: &CommandWorld, size: usize) {
    let size = size.to_string();
    let mut cursor: Option<String> = None;
    let mut pages = world.pages.borrow_mut();
    loop {
        let mut args = vec!["features", "list", "parks", "--count", size.as_str()];
        if let Some(after) = cursor.as_deref() {
            args.extend(["--after", after]);
        }
        let page: FeatureList = world.store.run_json(&args);
        let more = page.more;
        cursor = page.features.last().map(|feature| feature.id.to_string());
        pages.push(page);
        if !more {
            break;
        }
        assert!(pages.len() <= 100, "paging did not terminate");
    }
}

#[when("I add features to the rivers collection")]
fn add_to_rivers(#[from(world)] world: &CommandWorld) {
    let input = world.store.write_input(
        "rivers.json",
        &json!({
            "type": "FeatureCollection",
            "features": [{
                "geometry": { "type": "Point", "coordinates": [0, 0] },
                "properties": {},
            }],
        }),
    );
    world.record_failure(&["features", "add", "rivers", &input]);
}

#[when("I list parks features after an unparsable cursor")]
fn list_after_garbage(#[from(world)] world: &CommandWorld) {
    world.record_failure(&["features", "list", "parks", "--after", "not-a-uuid"]);
}

#[then("every feature is listed exactly once")]
fn listed_once(#[from(world)] world: &CommandWorld) {
    let listed: Vec<Uuid> = world
        .pages
        .borrow()
        .iter()
        .flat_map(|page| page.features.iter().map(|feature| feature.id))
        .collect();
    let mut expected = world.added.borrow().clone();
    expected.sort_unstable();
    assert_eq!(listed, expected, "pages must ascend without gaps or overlap");
}

#[then("only the last page reports more as false")]
fn last_page_ends(#[from(world)] world: &CommandWorld) {
    let pages = world.pages.borrow();
    let flags: Vec<bool> = pages.iter().map(|page| page.more).collect();
    let Some((last, earlier)) = flags.split_last() else {
        panic!("expected at least one page");
    };
    assert!(!last);
    assert!(earlier.iter().all(|more| *more));
}

#[then("the command fails with status {status}")]
fn fails_with_status(#[from(world)] world: &CommandWorld, status: u16) {
    let failure = world.failure.borrow();
    let err = failure.as_ref().expect("a failure was recorded");
    assert_eq!(err.status(), status, "unexpected error {err:?}");
}

#[then("parks holds {count} features")]
fn parks_holds(#[from(world)] world: &CommandWorld, count: usize) {
    let page: FeatureList = world.store.run_json(&["features", "list", "parks"]);
    assert_eq!(page.features.len(), count);
}

#[scenario(path = "tests/features/cli_commands.feature", index = 0)]
fn paging_through_a_collection(world: CommandWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/cli_commands.feature", index = 1)]
fn adding_to_a_missing_collection(world: CommandWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/cli_commands.feature", index = 2)]
fn rejecting_a_malformed_cursor(world: CommandWorld) {
    let _ = world;
}
