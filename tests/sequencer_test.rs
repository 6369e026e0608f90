// Test the ramp, hold and stop phases of the setpoint sequencer against the simulated vehicle

use std::time::Duration;

use crazyflie_waypoints::mission::sequencer::{run_sequence, SequenceReport};
use crazyflie_waypoints::sim::{Command, SimVehicle};
use crazyflie_waypoints::{Error, RampTarget, SequenceTiming, Setpoint, Target};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

// Collect every target published on the channel until the sender is dropped
fn collect_targets(mut rx: watch::Receiver<Target>) -> JoinHandle<Vec<Target>> {
    tokio::spawn(async move {
        let mut targets = Vec::new();
        while rx.changed().await.is_ok() {
            targets.push(*rx.borrow_and_update());
        }
        targets
    })
}

#[tokio::test(start_paused = true)]
async fn sends_ramp_then_holds_then_stop() -> Result<(), Box<dyn std::error::Error>> {
    let vehicle = SimVehicle::new();
    let sequence = [
        Setpoint::new(0.0, 0.0, 0.4, 0.0),
        Setpoint::new(0.5, 0.0, 0.4, 0.0),
        Setpoint::new(0.5, 0.5, 0.1, 0.0),
    ];
    let (target, _rx) = watch::channel(Target::default());

    let report = run_sequence(&vehicle, &sequence, &SequenceTiming::default(), &target).await?;

    assert_eq!(
        report,
        SequenceReport {
            ramp_setpoints: 10,
            hold_setpoints: 150,
            failed_setpoints: 0,
            stopped: true
        }
    );

    let commands = vehicle.commands();
    assert_eq!(commands.len(), 10 + 50 * 3 + 1);

    for (i, command) in commands[..10].iter().enumerate() {
        let z = i as f32 / 10.0 * 0.4;
        assert_eq!(*command, Command::Position(Setpoint::new(0.0, 0.0, z, 0.0)));
    }
    for (n, setpoint) in sequence.iter().enumerate() {
        let hold = &commands[10 + 50 * n..10 + 50 * (n + 1)];
        assert!(hold.iter().all(|c| *c == Command::Position(*setpoint)));
    }
    assert_eq!(commands.last(), Some(&Command::Stop));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn one_waypoint_publishes_legacy_ramp_targets() -> Result<(), Box<dyn std::error::Error>> {
    let vehicle = SimVehicle::new();
    let waypoint = Setpoint::new(0.5, 0.0, 0.4, 0.0);
    let (target, rx) = watch::channel(Target::default());
    let collector = collect_targets(rx);

    run_sequence(&vehicle, &[waypoint], &SequenceTiming::default(), &target).await?;
    drop(target);
    let targets = collector.await?;

    assert_eq!(targets.len(), 10 + 50);
    for (i, t) in targets[..10].iter().enumerate() {
        assert_eq!(*t, Target::new(0.0, 0.0, i as f32 / 25.0));
    }
    assert!(targets[10..].iter().all(|t| *t == Target::new(0.5, 0.0, 0.4)));

    let commands = vehicle.commands();
    assert_eq!(commands.len(), 10 + 50 + 1);
    assert_eq!(commands[60], Command::Stop);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn commanded_ramp_target_follows_the_setpoints() -> Result<(), Box<dyn std::error::Error>> {
    let vehicle = SimVehicle::new();
    let timing = SequenceTiming {
        ramp_target: RampTarget::Commanded,
        ..Default::default()
    };
    let (target, rx) = watch::channel(Target::default());
    let collector = collect_targets(rx);

    run_sequence(&vehicle, &[Setpoint::new(0.0, 0.0, 0.4, 0.0)], &timing, &target).await?;
    drop(target);
    let targets = collector.await?;

    for (t, command) in targets[..10].iter().zip(vehicle.commands()) {
        match command {
            Command::Position(setpoint) => assert_eq!(*t, setpoint.target()),
            Command::Stop => panic!("stop during ramp"),
        }
    }

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn every_setpoint_is_one_interval_apart() -> Result<(), Box<dyn std::error::Error>> {
    let vehicle = SimVehicle::new();
    let timing = SequenceTiming {
        interval_ms: 20,
        ramp_steps: 5,
        hold_repeats: 7,
        ..Default::default()
    };
    let (target, _rx) = watch::channel(Target::default());

    let start = Instant::now();
    let sequence = [Setpoint::new(0.0, 0.0, 0.3, 0.0), Setpoint::new(0.2, 0.0, 0.3, 0.0)];
    run_sequence(&vehicle, &sequence, &timing, &target).await?;

    // 5 ramp + 2 * 7 holds + the wait after stop
    let expected = Duration::from_millis(20 * (5 + 14 + 1));
    let elapsed = start.elapsed();
    assert!(elapsed >= expected && elapsed < expected + timing.interval(), "{:?}", elapsed);
    assert_eq!(vehicle.commands().len(), 5 + 14 + 1);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn link_loss_does_not_stop_the_schedule() -> Result<(), Box<dyn std::error::Error>> {
    let vehicle = SimVehicle::new().with_link_budget(25);
    let (target, rx) = watch::channel(Target::default());
    let collector = collect_targets(rx);

    let start = Instant::now();
    let report = run_sequence(
        &vehicle,
        &[Setpoint::new(0.5, 0.0, 0.4, 0.0)],
        &SequenceTiming::default(),
        &target,
    )
    .await?;
    drop(target);
    let targets = collector.await?;

    // Every setpoint is still issued, the ones after the 25th are lost
    assert_eq!(
        report,
        SequenceReport {
            ramp_setpoints: 10,
            hold_setpoints: 50,
            failed_setpoints: 10 + 50 + 1 - 25,
            stopped: false
        }
    );
    assert_eq!(vehicle.commands().len(), 25);
    assert!(!vehicle.commands().contains(&Command::Stop));
    assert_eq!(targets.len(), 10 + 50);
    assert_eq!(targets.last(), Some(&Target::new(0.5, 0.0, 0.4)));
    assert!(start.elapsed() >= Duration::from_millis(100 * (10 + 50 + 1)));

    Ok(())
}

#[tokio::test]
async fn empty_sequence_is_refused() {
    let vehicle = SimVehicle::new();
    let (target, _rx) = watch::channel(Target::default());

    let result = run_sequence(&vehicle, &[], &SequenceTiming::default(), &target).await;

    assert!(matches!(result, Err(Error::InvalidConfig(_))));
    assert!(vehicle.commands().is_empty());
}
