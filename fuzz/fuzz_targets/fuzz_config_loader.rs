#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are both fine; panics are not.
    if let Ok(cfg) = sorter_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // a valid config always carries a reachable refuse bin
            let refuse = cfg.bins[sorter_config::REFUSE];
            assert!((0..=cfg.sweeper.max_position).contains(&refuse));
        }
    }
});
