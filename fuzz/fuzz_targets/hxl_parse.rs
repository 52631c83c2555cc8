//! Fuzz target for HXL row parsing.
//!
//! This fuzzer feeds arbitrary byte sequences to the HXL reader, then pulls
//! the country fields out of every row, checking for panics or hangs.

#![no_main]

use aidmap_sync::hxl::from_hxl_slice;
use aidmap_sync::record::{CountryRow, RowTags};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    if let Ok(rows) = from_hxl_slice(data) {
        let tags = RowTags::default();
        for row in &rows {
            let _ = CountryRow::from_hxl(row, &tags);
        }
    }
});
