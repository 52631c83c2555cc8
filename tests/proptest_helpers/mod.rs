#![allow(dead_code)]

use aidmap_sync::record::{CountryRow, ResourceFormat};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

pub fn proptest_config() -> ProptestConfig {
    let cases = std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(64);

    let mut config = ProptestConfig::with_failure_persistence(FileFailurePersistence::WithSource(
        "proptest-regressions",
    ));
    config.cases = cases;
    config.max_shrink_iters = 1024;
    config
}

/// ASCII country codes like "KEN", "us", "4".
pub fn arb_m49_code() -> impl Strategy<Value = String> {
    "[A-Za-z0-9]{1,6}"
}

/// Interaction codes, including URL-reserved and non-ASCII characters.
pub fn arb_interaction_code() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Z]{2}[0-9]{0,3}",
        "[ &/#?=+%:;@a-z0-9]{0,12}",
        "\\PC{0,12}",
    ]
}

pub fn arb_country_row() -> impl Strategy<Value = CountryRow> {
    (
        "\\PC{0,20}",
        arb_m49_code(),
        arb_interaction_code(),
    )
        .prop_map(|(country_name, m49_code, interaction_code)| CountryRow {
            country_name: Some(country_name),
            m49_code: Some(m49_code),
            interaction_code: Some(interaction_code),
        })
}

pub fn arb_formats() -> impl Strategy<Value = Vec<ResourceFormat>> {
    proptest::collection::vec(
        prop_oneof![
            Just(ResourceFormat::Csv),
            Just(ResourceFormat::Xls),
            Just(ResourceFormat::Kml),
            Just(ResourceFormat::Json),
        ],
        1..5,
    )
}
