#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = toml::from_str::<pathmark_config::Config>(data) {
        if cfg.validate().is_ok() {
            // A config that validates must also map to settings the builder accepts.
            let bus = pathmark_sim::SimBus::new();
            let built = pathmark_core::TaskController::builder()
                .with_settings(pathmark_core::TaskSettings::from(&cfg))
                .with_transport(bus.clone())
                .with_resolver(bus.resolver())
                .build();
            assert!(built.is_ok(), "validated config rejected by builder: {built:?}");
        }
    }
});
