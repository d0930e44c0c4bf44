use koth_server::domain::{
    MatchProjection, Role, Team, ZoneEvent, ZoneId, ZoneManager, ZoneTuning,
};

// Tunings with short windows keep the scenarios readable; every delta fed to
// the manager is an exact binary float so second boundaries land precisely.

fn short_windows() -> ZoneTuning {
    ZoneTuning {
        capture_duration: 2.0,
        active_duration: 1000.0,
        capture_threshold: 50,
        fill_per_second: 0.5,
    }
}

fn instant_captures() -> ZoneTuning {
    ZoneTuning {
        capture_duration: 1.0,
        active_duration: 1000.0,
        capture_threshold: 3,
        fill_per_second: 1.0,
    }
}

fn started_manager(tuning: ZoneTuning) -> ZoneManager {
    let mut manager = ZoneManager::new(Role::Authority, tuning);
    manager.add_player(1, Team::Red, "Ragnar");
    manager.add_player(2, Team::Blue, "Bjorn");
    manager.start();
    manager.take_events();
    manager
}

// Advance whole seconds one tick at a time, collecting everything emitted.
fn tick_seconds(manager: &mut ZoneManager, seconds: u32) -> Vec<ZoneEvent> {
    let mut events = Vec::new();
    for _ in 0..seconds {
        manager.tick(1.0);
        events.extend(manager.take_events());
    }
    events
}

fn count(events: &[ZoneEvent], pred: impl Fn(&ZoneEvent) -> bool) -> usize {
    events.iter().filter(|event| pred(event)).count()
}

#[test]
fn when_rotation_starts_then_zone_a_activates_alone() {
    let mut manager = ZoneManager::new(Role::Authority, ZoneTuning::default());
    manager.add_player(1, Team::Red, "Ragnar");

    manager.start();

    let events = manager.take_events();
    assert!(events.contains(&ZoneEvent::ZoneActivated { zone: ZoneId::A }));
    // Activation re-announces both scores so displays reset to the new zone.
    assert!(events.contains(&ZoneEvent::ScoreChanged {
        team: Team::Red,
        zone: ZoneId::A,
        score: 0,
    }));
    assert!(events.contains(&ZoneEvent::ScoreChanged {
        team: Team::Blue,
        zone: ZoneId::A,
        score: 0,
    }));
    assert_eq!(manager.active_zone(), Some(ZoneId::A));
    assert!(!manager.is_zone_active(ZoneId::B));
    assert!(!manager.is_zone_active(ZoneId::C));
    assert_eq!(manager.countdown_remaining(), 30.0);
}

#[test]
fn when_countdown_expires_then_rotation_moves_to_next_zone() {
    let tuning = ZoneTuning {
        active_duration: 10.0,
        ..ZoneTuning::default()
    };
    let mut manager = started_manager(tuning);

    tick_seconds(&mut manager, 9);
    assert_eq!(manager.active_zone(), Some(ZoneId::A));
    assert_eq!(manager.countdown_remaining(), 1.0);

    let events = tick_seconds(&mut manager, 1);

    assert!(events.contains(&ZoneEvent::ZoneActivated { zone: ZoneId::B }));
    assert_eq!(manager.active_zone(), Some(ZoneId::B));
    assert!(!manager.is_zone_active(ZoneId::A));
    // The countdown restarts in full for the new zone.
    assert_eq!(manager.countdown_remaining(), 10.0);
}

#[test]
fn when_sole_claimant_holds_through_the_window_then_contest_resolves() {
    let mut manager = started_manager(short_windows());

    manager.start_contest(1, ZoneId::A);
    let events = manager.take_events();
    assert!(events.contains(&ZoneEvent::ContestStarted {
        zone: ZoneId::A,
        player_id: 1,
        team: Team::Red,
    }));
    assert!(manager.is_contest_active());

    // Three half-second ticks leave half a second on the clock.
    let mut events = Vec::new();
    for _ in 0..3 {
        manager.tick(0.5);
        events.extend(manager.take_events());
    }
    assert!(manager.is_contest_active());
    assert!(!manager.zone(ZoneId::A).contested);

    manager.tick(0.5);
    events.extend(manager.take_events());

    assert!(events.contains(&ZoneEvent::ContestResolved {
        zone: ZoneId::A,
        player_id: 1,
        team: Team::Red,
    }));
    assert!(!manager.is_contest_active());
    let zone = manager.zone(ZoneId::A);
    assert!(zone.contested);
    assert_eq!(zone.owner_of_last_contest, Some(Team::Red));
    assert!(manager.player_claims(1, ZoneId::A));
}

#[test]
fn when_contest_is_running_then_second_start_anywhere_is_ignored() {
    let mut manager = started_manager(short_windows());
    manager.start_contest(1, ZoneId::A);
    manager.take_events();

    // One contest match-wide: rival players and other zones both bounce.
    manager.start_contest(2, ZoneId::A);
    manager.start_contest(2, ZoneId::B);

    assert_eq!(manager.contest_zone(), Some(ZoneId::A));
    assert_eq!(manager.contest_claimant(), Some(1));
    assert!(manager.take_events().is_empty());
}

#[test]
fn when_stop_names_the_wrong_zone_then_contest_continues() {
    let mut manager = started_manager(short_windows());
    manager.start_contest(1, ZoneId::A);
    manager.take_events();

    manager.stop_contest(ZoneId::B);
    assert!(manager.is_contest_active());
    assert!(manager.take_events().is_empty());

    manager.stop_contest(ZoneId::A);
    let events = manager.take_events();
    assert!(events.contains(&ZoneEvent::ContestStopped { zone: ZoneId::A }));
    assert!(!manager.is_contest_active());
    assert_eq!(manager.display_fill(), 0.0);
}

#[test]
fn when_claimant_leaves_the_match_then_their_contest_stops() {
    let mut manager = started_manager(short_windows());
    manager.start_contest(1, ZoneId::A);
    tick_seconds(&mut manager, 1);

    manager.remove_player(1);

    let events = manager.take_events();
    assert!(events.contains(&ZoneEvent::ContestStopped { zone: ZoneId::A }));
    assert!(!manager.is_contest_active());
    // No window completed, so the zone never became contested.
    assert!(!manager.zone(ZoneId::A).contested);
}

#[test]
fn when_contest_is_running_then_countdown_pauses() {
    let tuning = ZoneTuning {
        capture_duration: 2.0,
        active_duration: 10.0,
        ..ZoneTuning::default()
    };
    let mut manager = started_manager(tuning);
    tick_seconds(&mut manager, 1);
    assert_eq!(manager.countdown_remaining(), 9.0);

    manager.start_contest(1, ZoneId::A);
    let events = tick_seconds(&mut manager, 2);

    // The rotation clock froze while the contest ran to completion.
    assert_eq!(count(&events, |e| matches!(e, ZoneEvent::CountdownTick { .. })), 0);
    assert_eq!(count(&events, |e| matches!(e, ZoneEvent::ContestResolved { .. })), 1);
    assert_eq!(manager.countdown_remaining(), 9.0);

    tick_seconds(&mut manager, 1);
    assert_eq!(manager.countdown_remaining(), 8.0);
}

#[test]
fn when_score_reaches_threshold_then_zone_retires_and_rotation_advances() {
    let mut manager = started_manager(instant_captures());
    manager.start_contest(1, ZoneId::A);

    let events = tick_seconds(&mut manager, 3);

    let scores: Vec<u32> = events
        .iter()
        .filter_map(|event| match event {
            ZoneEvent::ScoreChanged {
                team: Team::Red,
                zone: ZoneId::A,
                score,
            } => Some(*score),
            _ => None,
        })
        .collect();
    assert_eq!(scores, vec![1, 2, 3]);
    assert!(events.contains(&ZoneEvent::ZoneFullyCaptured {
        zone: ZoneId::A,
        team: Team::Red,
    }));
    assert!(events.contains(&ZoneEvent::ZoneActivated { zone: ZoneId::B }));
    assert!(manager.zone(ZoneId::A).fully_captured);
    assert_eq!(manager.active_zone(), Some(ZoneId::B));
    assert_eq!(manager.winner(), None);
}

#[test]
fn when_two_zones_are_fully_captured_then_match_is_won_once() {
    let mut manager = started_manager(instant_captures());
    manager.start_contest(1, ZoneId::A);
    let mut events = tick_seconds(&mut manager, 3);

    manager.start_contest(1, ZoneId::B);
    events.extend(manager.take_events());
    events.extend(tick_seconds(&mut manager, 3));

    assert_eq!(
        count(&events, |e| matches!(e, ZoneEvent::MatchWon { team: Team::Red })),
        1
    );
    assert_eq!(manager.winner(), Some(Team::Red));
    // The third zone stays untouched once the match is decided.
    assert!(!manager.is_zone_active(ZoneId::C));
    assert_eq!(manager.zone(ZoneId::C).score_red, 0);

    // A decided match ignores everything that follows.
    manager.start_contest(2, ZoneId::C);
    let after = tick_seconds(&mut manager, 3);
    assert!(after.is_empty());
    assert!(manager.take_events().is_empty());
}

#[test]
fn when_rotation_returns_to_captured_zone_then_it_is_skipped() {
    let tuning = ZoneTuning {
        capture_duration: 1.0,
        active_duration: 5.0,
        capture_threshold: 3,
        fill_per_second: 1.0,
    };
    let mut manager = started_manager(tuning);
    manager.start_contest(1, ZoneId::A);

    // Capture A (3 s), let B and C time out (5 s each); the wrap lands on B.
    let events = tick_seconds(&mut manager, 13);

    assert!(events.contains(&ZoneEvent::ZoneFullyCaptured {
        zone: ZoneId::A,
        team: Team::Red,
    }));
    assert_eq!(
        count(&events, |e| matches!(e, ZoneEvent::ZoneActivated { zone: ZoneId::B })),
        2
    );
    assert_eq!(manager.active_zone(), Some(ZoneId::B));
    assert!(!manager.zone(ZoneId::A).active);
    assert_eq!(manager.countdown_remaining(), 5.0);
}

#[test]
fn when_rotation_revisits_contested_zone_then_ownership_resumes() {
    let tuning = ZoneTuning {
        capture_duration: 1.0,
        active_duration: 3.0,
        capture_threshold: 50,
        fill_per_second: 1.0,
    };
    let mut manager = started_manager(tuning);
    manager.start_contest(2, ZoneId::A);

    // Contest resolves blue, then three ownership ticks before A rotates out.
    tick_seconds(&mut manager, 4);
    assert_eq!(manager.active_zone(), Some(ZoneId::B));
    assert_eq!(manager.zone(ZoneId::A).score_blue, 3);

    // B and C time out uncontested; nothing accrues anywhere meanwhile.
    let idle = tick_seconds(&mut manager, 5);
    assert_eq!(count(&idle, |e| matches!(e, ZoneEvent::ScoreChanged { score, .. } if *score > 0)), 0);
    assert_eq!(manager.zone(ZoneId::A).score_blue, 3);

    // The wrap back to A resumes blue's ownership ticks from the register.
    let events = tick_seconds(&mut manager, 1);
    assert_eq!(manager.active_zone(), Some(ZoneId::A));
    assert!(events.contains(&ZoneEvent::ScoreChanged {
        team: Team::Blue,
        zone: ZoneId::A,
        score: 4,
    }));
}

#[test]
fn when_claim_register_moves_on_then_revisited_zone_does_not_resume() {
    let tuning = ZoneTuning {
        capture_duration: 1.0,
        active_duration: 3.0,
        capture_threshold: 50,
        fill_per_second: 1.0,
    };
    let mut manager = started_manager(tuning);

    // Red claims A, scores three, then claims B once the rotation moves.
    manager.start_contest(1, ZoneId::A);
    tick_seconds(&mut manager, 4);
    assert_eq!(manager.active_zone(), Some(ZoneId::B));
    manager.start_contest(1, ZoneId::B);
    tick_seconds(&mut manager, 4);
    assert_eq!(manager.active_zone(), Some(ZoneId::C));

    // One register per team: claiming B displaced the A claim, so the wrap
    // back to A finds nothing to resume.
    let events = tick_seconds(&mut manager, 5);
    assert_eq!(manager.active_zone(), Some(ZoneId::A));
    assert_eq!(manager.zone(ZoneId::A).score_red, 3);
    assert_eq!(
        count(&events, |e| matches!(
            e,
            ZoneEvent::ScoreChanged { zone: ZoneId::A, score, .. } if *score > 3
        )),
        0
    );
}

#[test]
fn when_rival_resolves_a_contest_then_ownership_flips_teams() {
    let mut manager = started_manager(short_windows());

    manager.start_contest(1, ZoneId::A);
    tick_seconds(&mut manager, 3);
    assert_eq!(manager.zone(ZoneId::A).score_red, 2);

    // Red keeps accruing while blue contests, then the resolve flips the tick.
    manager.start_contest(2, ZoneId::A);
    tick_seconds(&mut manager, 3);

    let zone = manager.zone(ZoneId::A);
    assert_eq!(zone.score_red, 3);
    assert_eq!(zone.score_blue, 2);
    assert_eq!(zone.owner_of_last_contest, Some(Team::Blue));
    // The personal claim moved to the winning claimant.
    assert!(!manager.player_claims(1, ZoneId::A));
    assert!(manager.player_claims(2, ZoneId::A));
}

#[test]
fn when_role_is_observer_then_mutations_are_ignored() {
    let mut manager = ZoneManager::new(Role::Observer, short_windows());

    manager.add_player(1, Team::Red, "Ragnar");
    manager.start();
    manager.start_contest(1, ZoneId::A);
    manager.tick(1.0);

    assert!(!manager.has_started());
    assert_eq!(manager.active_zone(), None);
    assert_eq!(manager.player_team(1), None);
    assert!(manager.take_events().is_empty());
}

#[test]
fn when_authority_renders_fill_then_only_red_claimants_advance() {
    let tuning = ZoneTuning {
        capture_duration: 5.0,
        active_duration: 1000.0,
        capture_threshold: 50,
        fill_per_second: 0.5,
    };
    let mut manager = started_manager(tuning);

    manager.start_contest(1, ZoneId::A);
    tick_seconds(&mut manager, 2);
    assert_eq!(manager.display_fill(), 1.0);
    manager.stop_contest(ZoneId::A);
    manager.take_events();

    manager.start_contest(2, ZoneId::A);
    let events = tick_seconds(&mut manager, 2);

    // Broadcast ticks carry the real fill; the local display stays flat for
    // a blue claimant on the authority peer.
    let last_fill = events
        .iter()
        .rev()
        .find_map(|event| match event {
            ZoneEvent::ContestTick { fill, .. } => Some(*fill),
            _ => None,
        })
        .expect("expected contest ticks for the blue claimant");
    assert_eq!(last_fill, 1.0);
    assert_eq!(manager.display_fill(), 0.0);
}

#[test]
fn when_projection_replays_the_event_stream_then_it_matches_authority() {
    let tuning = ZoneTuning {
        capture_duration: 1.0,
        active_duration: 5.0,
        capture_threshold: 3,
        fill_per_second: 1.0,
    };
    let mut manager = ZoneManager::new(Role::Authority, tuning);
    let mut projection = MatchProjection::new(tuning);
    let mut log = Vec::new();

    manager.add_player(1, Team::Red, "Ragnar");
    manager.add_player(2, Team::Blue, "Bjorn");
    manager.start();
    log.extend(manager.take_events());
    manager.start_contest(1, ZoneId::A);
    log.extend(manager.take_events());
    log.extend(tick_seconds(&mut manager, 6));

    for event in &log {
        projection.apply(event);
    }

    for zone in ZoneId::ALL {
        assert_eq!(projection.zone(zone).score_red, manager.zone(zone).score_red);
        assert_eq!(projection.zone(zone).score_blue, manager.zone(zone).score_blue);
        assert_eq!(projection.zone(zone).contested, manager.zone(zone).contested);
        assert_eq!(
            projection.zone(zone).fully_captured,
            manager.zone(zone).fully_captured
        );
    }
    assert_eq!(projection.active_zone(), manager.active_zone());
    assert_eq!(projection.winner(), manager.winner());
}

#[test]
fn when_observer_applies_contest_ticks_then_only_blue_fill_renders() {
    let mut projection = MatchProjection::new(ZoneTuning::default());

    projection.apply(&ZoneEvent::ContestStarted {
        zone: ZoneId::A,
        player_id: 2,
        team: Team::Blue,
    });
    projection.apply(&ZoneEvent::ContestTick {
        zone: ZoneId::A,
        team: Team::Blue,
        seconds_left: 3.0,
        fill: 0.4,
    });
    assert_eq!(projection.fill_display(), 0.4);
    let contest = projection.contest().expect("expected a tracked contest");
    assert_eq!(contest.seconds_left, 3.0);

    projection.apply(&ZoneEvent::ContestStopped { zone: ZoneId::A });
    assert_eq!(projection.fill_display(), 0.0);

    projection.apply(&ZoneEvent::ContestStarted {
        zone: ZoneId::A,
        player_id: 1,
        team: Team::Red,
    });
    projection.apply(&ZoneEvent::ContestTick {
        zone: ZoneId::A,
        team: Team::Red,
        seconds_left: 3.0,
        fill: 0.4,
    });
    // Red claimants render flat off-authority; the timer stays at the full window.
    assert_eq!(projection.fill_display(), 0.0);
    let contest = projection.contest().expect("expected a tracked contest");
    assert_eq!(contest.seconds_left, 5.0);
}

#[test]
fn when_snapshot_seeds_a_late_joiner_then_views_match() {
    let tuning = ZoneTuning {
        capture_duration: 5.0,
        active_duration: 1000.0,
        capture_threshold: 50,
        fill_per_second: 0.5,
    };
    let mut manager = started_manager(tuning);
    manager.start_contest(2, ZoneId::A);
    tick_seconds(&mut manager, 1);

    let snapshot = manager.snapshot();
    let mut projection = MatchProjection::new(tuning);
    projection.apply_snapshot(&snapshot);

    assert_eq!(projection.active_zone(), Some(ZoneId::A));
    let contest = projection.contest().expect("expected a seeded contest");
    assert_eq!(contest.player_id, 2);
    assert_eq!(contest.team, Team::Blue);
    assert_eq!(contest.seconds_left, 4.0);
    assert_eq!(projection.fill_display(), 0.5);
    assert_eq!(projection.countdown_remaining(), 1000.0);
}
