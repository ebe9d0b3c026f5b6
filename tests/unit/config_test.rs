//! Tests for configuration parsing and quota derivation

use std::io::Write;

use job_admission::config::{
    ConcurrencyConfig, ConfigProfile, DeviceSettings, PackageLimits, WorkTypeConfig,
    WorkTypeConfigSet, STANDARD_CONCURRENCY_LIMIT,
};
use job_admission::core::WorkType;

#[test]
fn test_concurrency_config_defaults() {
    let cfg = ConcurrencyConfig::default();
    assert!(cfg.restrict_background_users);
    assert_eq!(cfg.user_grace_period_ms, 60_000);
    assert_eq!(cfg.screen_off_adjustment_delay_ms, 30_000);
    assert!(cfg.validate().is_ok());
}

#[test]
fn test_concurrency_config_from_json() {
    let cfg = ConcurrencyConfig::from_json_str(r#"{"user_grace_period_ms": 5000}"#).unwrap();
    assert_eq!(cfg.user_grace_period_ms, 5_000);
    assert!(cfg.restrict_background_users);
}

#[test]
fn test_concurrency_config_invalid_delay() {
    let result = ConcurrencyConfig::from_json_str(r#"{"screen_off_adjustment_delay_ms": 999999999999}"#);
    assert!(result.is_err());
    assert!(ConcurrencyConfig::from_json_str("not json").is_err());
}

#[test]
fn test_key_grammar() {
    assert_eq!(
        WorkTypeConfig::key_max_total(ConfigProfile::ScreenOffLow),
        "max_total_screen_off_low"
    );
    assert_eq!(
        WorkTypeConfig::key_max(WorkType::BgUserImportant, ConfigProfile::ScreenOnNormal).unwrap(),
        "max_bguser_important_screen_on_normal"
    );
    assert_eq!(
        WorkTypeConfig::key_min(WorkType::Ej, ConfigProfile::ScreenOnCritical).unwrap(),
        "min_ej_screen_on_critical"
    );
    assert!(WorkTypeConfig::key_min(WorkType::None, ConfigProfile::ScreenOnNormal).is_err());
}

#[test]
fn test_every_profile_respects_invariants() {
    let mut set = WorkTypeConfigSet::new();
    let mut settings = DeviceSettings::new();
    settings
        .set_int("max_total_screen_on_normal", 40)
        .set_int("min_bg_screen_off_normal", 20)
        .set("max_fgs_screen_on_low", "lots");
    set.update(&settings);

    for cfg in set.iter() {
        let total = cfg.max_total();
        assert!((1..=STANDARD_CONCURRENCY_LIMIT).contains(&total));
        let min_sum: u32 = WorkType::ALL.iter().map(|wt| cfg.min_reserved(*wt)).sum();
        assert!(min_sum <= total, "{}", cfg.profile());
        for wt in WorkType::ALL {
            assert!(cfg.max_allowed(wt) <= total);
            assert!(cfg.min_reserved(wt) <= cfg.max_allowed(wt));
        }
        assert!(cfg.min_reserved(WorkType::Top) >= 1);
    }
    assert_eq!(set.get(ConfigProfile::ScreenOnNormal).max_total(), 16);
}

#[test]
fn test_package_limits_from_settings() {
    assert_eq!(PackageLimits::default(), PackageLimits { ej: 3, regular: 8 });

    let mut settings = DeviceSettings::new();
    settings
        .set_int("pkg_concurrency_limit_ej", 0)
        .set_int("pkg_concurrency_limit_regular", 100);
    let limits = PackageLimits::from_settings(&settings);
    assert_eq!(limits.ej, 1);
    assert_eq!(limits.regular, STANDARD_CONCURRENCY_LIMIT);
    assert_eq!(limits.for_class(true), 1);
}

#[test]
fn test_settings_from_env_file() {
    let path = std::env::temp_dir().join(format!("job_admission_{}.env", std::process::id()));
    let mut file = std::fs::File::create(&path).unwrap();
    writeln!(file, "MAX_TOTAL_SCREEN_ON_NORMAL=12").unwrap();
    writeln!(file, "pkg_concurrency_limit_ej=2").unwrap();
    drop(file);

    let settings = DeviceSettings::from_env_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(settings.get_int("max_total_screen_on_normal", 0), 12);
    assert_eq!(settings.get_int("pkg_concurrency_limit_ej", 0), 2);
}

#[test]
fn test_settings_from_missing_env_file() {
    let err = DeviceSettings::from_env_file("/nonexistent/job_admission.env").unwrap_err();
    assert!(err.to_string().contains("job_admission.env"));
}
