#![no_main]

use libfuzzer_sys::fuzz_target;
use srcx::plugins::Catalog;
use std::sync::{Arc, OnceLock};

static PLUGINS: OnceLock<Arc<srcx::plugins::PluginSet>> = OnceLock::new();

fuzz_target!(|data: &str| {
    // Parsing must never panic, and a parse error must point inside the input
    let plugins = PLUGINS.get_or_init(|| Catalog::builtin(1).plugin_set(&["core", "clang", "js"]));
    match plugins.grammar().parse(data) {
        Ok(terms) => {
            for term in terms {
                assert!(!term.name.is_empty());
            }
        }
        Err(e) => assert!(e.offset <= data.len()),
    }
});
