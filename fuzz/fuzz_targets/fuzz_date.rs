#![no_main]
use libfuzzer_sys::fuzz_target;
use rome_loader::common::Date;

fuzz_target!(|data: &[u8]| {
    if let Ok(d) = Date::parse(data) {
        assert_eq!(Date::parse(d.game_fmt().to_string()).ok(), Some(d));
        if let Some(next) = d.checked_add_days(1) {
            assert_eq!(d.days_until(&next), 1);
        }
    }

    let _ = Date::parse_auc(data);
});
