// Licensed under the Apache-2.0 license

#![no_main]

use libfuzzer_sys::fuzz_target;

mod fuzz_target_common;
use fuzz_target_common::harness;

// Input is the raw FRTS window: descriptor, VDPA array and image
fuzz_target!(|data: &[u8]| {
    harness(data, false);
    harness(data, true);
});
