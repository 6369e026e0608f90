// Test estimator reset and convergence waiting against the simulated vehicle

use std::time::Duration;

use crazyflie_waypoints::mission::estimator::{
    reset_estimator, wait_for_position_estimator, VarianceSample, WINDOW_SIZE,
};
use crazyflie_waypoints::sim::SimVehicle;
use crazyflie_waypoints::{EstimatorConfig, Error};
use tokio::time::{sleep, timeout};

// Variance flapping between two values forever
fn stuck() -> SimVehicle {
    SimVehicle::new().with_variance_loop(vec![
        VarianceSample::new(0.5, 0.5, 0.5),
        VarianceSample::new(1.0, 1.0, 1.0),
    ])
}

#[tokio::test(start_paused = true)]
async fn returns_once_variance_settles() -> Result<(), Box<dyn std::error::Error>> {
    // Five noisy samples, then stable
    let vehicle = SimVehicle::new();

    let samples = wait_for_position_estimator(&vehicle, &EstimatorConfig::default()).await?;

    assert_eq!(samples, 5 + WINDOW_SIZE);
    assert_eq!(vehicle.active_subscriptions(), 0);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stable_from_the_start_still_needs_a_full_window() -> Result<(), Box<dyn std::error::Error>> {
    let vehicle = SimVehicle::new().with_variance(vec![VarianceSample::new(0.0001, 0.0001, 0.0001)]);

    let samples = wait_for_position_estimator(&vehicle, &EstimatorConfig::default()).await?;

    assert_eq!(samples, WINDOW_SIZE);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn stuck_estimator_times_out() {
    let vehicle = stuck();
    let config = EstimatorConfig {
        timeout_secs: Some(5.0),
        ..Default::default()
    };

    let result = wait_for_position_estimator(&vehicle, &config).await;

    assert!(matches!(result, Err(Error::EstimatorTimeout)));
    assert!(vehicle.delivered("kalman.varPX") >= 40);
    assert_eq!(vehicle.active_subscriptions(), 0);
}

#[tokio::test(start_paused = true)]
async fn without_deadline_waits_forever() {
    let vehicle = stuck();

    let waited = timeout(
        Duration::from_secs(60),
        wait_for_position_estimator(&vehicle, &EstimatorConfig::default()),
    )
    .await;

    assert!(waited.is_err(), "a stuck estimator must not converge");

    // The abandoned wait dropped its subscription
    sleep(Duration::from_millis(200)).await;
    assert_eq!(vehicle.active_subscriptions(), 0);
}

#[tokio::test(start_paused = true)]
async fn closed_telemetry_is_reported() {
    let vehicle = stuck();

    let link = vehicle.clone();
    tokio::spawn(async move {
        sleep(Duration::from_secs(1)).await;
        link.lose_link();
    });

    let result = wait_for_position_estimator(&vehicle, &EstimatorConfig::default()).await;

    assert!(matches!(result, Err(Error::TelemetryClosed)));
}

#[tokio::test(start_paused = true)]
async fn reset_pulses_the_reset_parameter() -> Result<(), Box<dyn std::error::Error>> {
    let vehicle = SimVehicle::new();

    reset_estimator(&vehicle, &EstimatorConfig::default()).await?;

    assert_eq!(
        vehicle.params(),
        vec![
            ("kalman.resetEstimation".to_string(), 1.0),
            ("kalman.resetEstimation".to_string(), 0.0),
        ]
    );

    Ok(())
}
