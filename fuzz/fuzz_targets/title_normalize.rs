#![no_main]

use std::sync::OnceLock;

use herald_pipeline::TextNormalizer;
use libfuzzer_sys::fuzz_target;

static NORMALIZER: OnceLock<Option<TextNormalizer>> = OnceLock::new();

fuzz_target!(|data: &[u8]| {
    let Some(normalizer) = NORMALIZER.get_or_init(|| TextNormalizer::new().ok()) else {
        return;
    };
    let raw = String::from_utf8_lossy(data);
    let once = normalizer.normalize(&raw);
    assert_eq!(normalizer.normalize(&once), once);
});
