//! Behavioural tests for keyset pagination of features using rstest-bdd.

use std::cell::RefCell;

use geo::{Coord, Rect};
use geofeatures_core::{
    Collection, Feature, FeatureQuery, Geometry, Position, Properties, insert, migrate,
    open_in_memory, query,
};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use rusqlite::Connection;
use uuid::Uuid;

const COLLECTION: &str = "parks";

/// Shared state for pagination scenarios.
struct PaginationWorld {
    connection: Connection,
    inserted: RefCell<Vec<Uuid>>,
    pages: RefCell<Vec<Vec<Feature>>>,
    more: RefCell<Option<bool>>,
}

impl PaginationWorld {
    fn new() -> Self {
        let mut connection = open_in_memory().expect("open in-memory database");
        migrate(&mut connection).expect("apply schema");
        Self {
            connection,
            inserted: RefCell::new(Vec::new()),
            pages: RefCell::new(Vec::new()),
            more: RefCell::new(None),
        }
    }

    /// Insert `count` points at (i, i) and return their ids.
    fn seed(&self, collection: &str, count: usize) -> Vec<Uuid> {
        let mut record = Collection::new(collection, "Title", "Description");
        insert(&self.connection, &mut record).expect("insert collection");
        (0..count)
            .map(|index| {
                let offset = index as f64;
                let mut feature = Feature::new(
                    collection,
                    Geometry::Point(Position::new(offset, offset)),
                    Properties::new(),
                );
                insert(&self.connection, &mut feature).expect("insert feature");
                feature.id
            })
            .collect()
    }

    fn fetch(&self, request: &FeatureQuery) -> (Vec<Feature>, bool) {
        let mut page = Vec::new();
        let more = query(&self.connection, &mut page, request).expect("query features");
        (page, more)
    }

    fn record_single_page(&self, request: &FeatureQuery) {
        let (page, more) = self.fetch(request);
        self.pages.replace(vec![page]);
        self.more.replace(Some(more));
    }

    fn last_page(&self) -> Vec<Feature> {
        self.pages.borrow().last().cloned().unwrap_or_default()
    }
}

#[fixture]
fn world() -> PaginationWorld {
    PaginationWorld::new()
}

#[given("a collection holding {count} features")]
fn given_collection(world: &PaginationWorld, count: usize) {
    let ids = world.seed(COLLECTION, count);
    world.inserted.replace(ids);
}

#[given("another collection holding {count} features")]
fn given_other_collection(world: &PaginationWorld, count: usize) {
    world.seed("rivers", count);
}

#[when("I page through the collection {limit} at a time")]
fn page_through(world: &PaginationWorld, limit: u64) {
    let mut request = FeatureQuery::new(COLLECTION).with_limit(limit);
    let mut pages = Vec::new();
    loop {
        let (page, more) = world.fetch(&request);
        let cursor = page.last().map(|feature| feature.id);
        pages.push(page);
        match (more, cursor) {
            (true, Some(last)) => request = request.after(last),
            _ => break,
        }
    }
    world.pages.replace(pages);
}

#[when("I request a page of {limit} features")]
fn request_page(world: &PaginationWorld, limit: u64) {
    world.record_single_page(&FeatureQuery::new(COLLECTION).with_limit(limit));
}

#[when("I request features inside the box from {low} to {high}")]
fn request_box(world: &PaginationWorld, low: f64, high: f64) {
    let bbox = Rect::new(Coord { x: low, y: low }, Coord { x: high, y: high });
    world.record_single_page(&FeatureQuery::new(COLLECTION).within(bbox));
}

#[then("every feature is returned exactly once in id order")]
fn then_every_feature_once(world: &PaginationWorld) {
    let returned: Vec<Uuid> = world
        .pages
        .borrow()
        .iter()
        .flatten()
        .map(|feature| feature.id)
        .collect();
    let mut expected = world.inserted.borrow().clone();
    expected.sort_unstable();
    assert_eq!(returned, expected);
}

#[then("{count} pages are fetched")]
fn then_page_count(world: &PaginationWorld, count: usize) {
    assert_eq!(world.pages.borrow().len(), count);
}

#[then("{count} features are returned")]
fn then_feature_count(world: &PaginationWorld, count: usize) {
    let page = world.last_page();
    assert_eq!(page.len(), count);
    assert!(page.iter().all(|feature| feature.collection_name == COLLECTION));
    assert!(page.windows(2).all(|pair| match pair {
        [first, second] => first.id < second.id,
        _ => true,
    }));
}

#[then("no further features are reported")]
fn then_no_more(world: &PaginationWorld) {
    assert_eq!(*world.more.borrow(), Some(false));
}

#[then("further features are reported")]
fn then_more(world: &PaginationWorld) {
    assert_eq!(*world.more.borrow(), Some(true));
}

#[scenario(path = "tests/features/feature_pagination.feature", index = 0)]
fn paging_visits_every_feature(world: PaginationWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/feature_pagination.feature", index = 1)]
fn page_equal_to_collection(world: PaginationWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/feature_pagination.feature", index = 2)]
fn page_larger_than_collection(world: PaginationWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/feature_pagination.feature", index = 3)]
fn page_smaller_than_collection(world: PaginationWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/feature_pagination.feature", index = 4)]
fn zero_limit_uses_default(world: PaginationWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/feature_pagination.feature", index = 5)]
fn bbox_edges_are_inclusive(world: PaginationWorld) {
    let _ = world;
}

#[scenario(path = "tests/features/feature_pagination.feature", index = 6)]
fn other_collections_excluded(world: PaginationWorld) {
    let _ = world;
}
