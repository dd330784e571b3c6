use companion::config::Configuration;
use companion::kernel::avatar::Expression;
use companion::kernel::idle::{AutoSpeakCheck, Dormancy, ExpressionCheck, QuietCheck};
use companion::kernel::quiet::QuietHours;
use companion::kernel::status::Status;
use companion::kernel::time::{ActivityClock, Stamp};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn test_quiet_check_follows_configured_window() {
    let mut config = Configuration::default();
    assert_eq!(QuietCheck::evaluate(&config, 2), Dormancy::Asleep);
    assert_eq!(QuietCheck::evaluate(&config, 12), Dormancy::Awake);

    config.quiet_hours = QuietHours::disabled();
    assert_eq!(QuietCheck::evaluate(&config, 2), Dormancy::Awake);
}

#[test]
fn test_auto_speak_threshold_is_strict() {
    let config = Configuration::default();
    let clock = ActivityClock::starting_at(1_000);
    let threshold = config.auto_speak_threshold_ms();

    assert!(!AutoSpeakCheck::due(&config, Status::Idle, &clock, 1_000 + threshold));
    assert!(AutoSpeakCheck::due(&config, Status::Idle, &clock, 1_000 + threshold + 1));
}

#[test]
fn test_auto_speak_requires_idle_enabled_and_not_waiting() {
    let mut config = Configuration::default();
    let clock = ActivityClock::starting_at(0);
    let late = 24 * 60 * 60_000;

    // 1. Only statuses that accept turns are eligible
    for status in [Status::Thinking, Status::Speaking, Status::Sleeping, Status::Error] {
        assert!(!AutoSpeakCheck::due(&config, status, &clock, late), "{:?}", status);
    }
    assert!(AutoSpeakCheck::due(&config, Status::Idle, &clock, late));
    // A lingering interim must not block the prompt
    assert!(AutoSpeakCheck::due(&config, Status::Recognizing, &clock, late));

    // 2. Waiting mode and the toggle both veto

    config.waiting_mode = true;
    assert!(!AutoSpeakCheck::due(&config, Status::Idle, &clock, late));

    config.waiting_mode = false;
    config.auto_speak_enabled = false;
    assert!(!AutoSpeakCheck::due(&config, Status::Idle, &clock, late));
}

#[test]
fn test_activity_clock_never_moves_backwards() {
    let mut clock = ActivityClock::starting_at(500);
    clock.touch(100);
    assert_eq!(clock.last(), 500);
    clock.touch(900);
    assert_eq!(clock.last(), 900);
    assert_eq!(clock.quiet_for(1_000), 100);
    assert_eq!(clock.quiet_for(10), 0);
}

#[test]
fn test_expression_check_distribution() {
    let mut rng = StdRng::seed_from_u64(42);
    let picks: Vec<Expression> = (0..1_000).map(|_| ExpressionCheck::pick(&mut rng)).collect();

    let expressive = picks.iter().filter(|e| **e != Expression::Neutral).count();
    // 30% nominal
    assert!(expressive > 200 && expressive < 400, "expressive = {}", expressive);
    for e in Expression::EXPRESSIVE {
        assert!(picks.contains(&e), "{} never picked", e);
    }
}

#[test]
fn test_stamp_later_keeps_hour() {
    let stamp = Stamp::new(1_000, 22);
    assert_eq!(stamp.later(500), Stamp::new(1_500, 22));
}
