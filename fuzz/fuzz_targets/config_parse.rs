#![no_main]

use libfuzzer_sys::fuzz_target;
use robustsim_core::config::Config;
use robustsim_core::harness::noise_grid;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = Config::from_toml_str(text) else {
        return;
    };

    // A config that parsed and validated must survive a TOML round trip.
    let rendered = config.to_toml_string().expect("valid config serializes");
    let reparsed = Config::from_toml_str(&rendered).expect("rendered config parses");
    assert_eq!(config, reparsed);

    let grid = noise_grid(&config.harness.noise);
    assert!(grid.iter().all(|cell| cell.level.is_finite() && cell.level > 0.0));
});
