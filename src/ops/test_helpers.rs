use crate::model::catalog::Catalog;
use crate::model::collection::CollectionSettings;
use crate::parse::parse_collection;

pub const RUST_101: &str = "\
# Rust 101

> An introduction to Rust.

## 0

- [ ] `1` forum: Announcements

## 1 Week one

- [ ] `11` page: Syllabus
- [ ] `12` quiz: Warm-up
  - [~] `13` url: Rust book
- [-] `14` assign: Setup

## 2 Week two

- [ ] `21` page: Ownership

## 3 Week three

## 4 Week four

- [ ] `41` page: Traits
- [ ] `42` quiz: Generics
";

pub const ADVANCED: &str = "\
# Advanced Rust

## 0

- [ ] `201` page: Welcome
";

/// Collection 1 allows stealth and is unbounded; collection 2 allows no
/// stealth and at most three containers.
pub fn sample_catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog.insert(parse_collection(
        RUST_101,
        1,
        CollectionSettings {
            allow_stealth: true,
            max_containers: None,
        },
    ));
    catalog.insert(parse_collection(
        ADVANCED,
        2,
        CollectionSettings {
            allow_stealth: false,
            max_containers: Some(3),
        },
    ));
    catalog
}
