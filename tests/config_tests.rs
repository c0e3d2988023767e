use anyhow::Result;
use notification_pipeline::{
    config::{BrokerKind, Config},
    models::stage::{DelayRange, PipelineSettings, QueueNames},
};

fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
    let config = envy::from_iter::<_, Config>(
        vars.iter()
            .map(|(key, value)| (key.to_string(), value.to_string())),
    )?;
    Ok(config)
}

/// Test: An empty environment yields the reference pipeline
#[tokio::test]
async fn test_defaults_match_reference_pipeline() -> Result<()> {
    let config = config_from(&[])?;
    config.validate()?;

    assert_eq!(config.broker, BrokerKind::Rabbitmq);
    assert_eq!(config.queue_names(), QueueNames::default());
    assert_eq!(config.pipeline_settings(), PipelineSettings::default());
    assert_eq!(config.pipeline_settings().retry.delay, DelayRange::fixed(3000));
    assert_eq!(config.prefetch_count, 1);
    assert_eq!(config.server_port, 8000);
    assert!(config.failure_seed.is_none());

    Ok(())
}

/// Test: Environment overrides reach the derived settings
#[tokio::test]
async fn test_environment_overrides() -> Result<()> {
    let config = config_from(&[
        ("BROKER", "memory"),
        ("INTAKE_QUEUE_NAME", "custom.intake"),
        ("POISON_QUEUE_NAME", "custom.poison"),
        ("VALIDATION_FAILURE_PROBABILITY", "0.5"),
        ("RETRY_DELAY_MS", "0"),
        ("FAILURE_SEED", "99"),
        ("MAX_RETRY_ATTEMPTS", "7"),
    ])?;
    config.validate()?;

    let queues = config.queue_names();
    assert_eq!(config.broker, BrokerKind::Memory);
    assert_eq!(queues.intake, "custom.intake");
    assert_eq!(queues.poison.as_deref(), Some("custom.poison"));
    assert_eq!(queues.all().len(), 5);
    assert_eq!(config.pipeline_settings().validation.failure_probability, 0.5);
    assert!(config.pipeline_settings().retry.delay.is_zero());
    assert_eq!(config.failure_seed, Some(99));
    assert_eq!(config.retry_config().max_attempts, 7);

    Ok(())
}

/// Test: Out-of-range settings fail validation
#[tokio::test]
async fn test_invalid_settings_are_rejected() -> Result<()> {
    let probability = config_from(&[("INTAKE_FAILURE_PROBABILITY", "1.5")])?;
    assert!(probability.validate().is_err());

    let delays = config_from(&[
        ("VALIDATION_DELAY_MIN_MS", "900"),
        ("VALIDATION_DELAY_MAX_MS", "100"),
    ])?;
    assert!(delays.validate().is_err());

    assert!(config_from(&[("PREFETCH_COUNT", "many")]).is_err());

    Ok(())
}
