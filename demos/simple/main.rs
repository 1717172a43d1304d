use featuregate::{Event, User};

pub fn main() -> featuregate::Result<()> {
    // Configure env_logger to see SDK logs.
    env_logger::Builder::from_env(env_logger::Env::new().default_filter_or("featuregate")).init();

    let secret_key = std::env::var("FEATUREGATE_SECRET_KEY")
        .expect("FEATUREGATE_SECRET_KEY env variable should contain a server secret key");

    // Blocks for the initial spec download. If it fails, lookups are evaluated remotely until the
    // next background sync succeeds.
    let client = featuregate::ClientConfig::from_secret_key(secret_key).to_client()?;

    let user = User::new("test-user")
        .with_email("test-user@example.com")
        .with_country("NZ")
        .with_custom("plan", "pro");

    let decision = client.evaluate(&user, "a_feature_gate", featuregate::SpecKind::Gate)?;
    println!("{}", serde_json::to_string_pretty(&decision).unwrap());

    let config = client.get_config(&user, "a_dynamic_config")?;
    println!("{}", serde_json::to_string_pretty(&config).unwrap());

    client.log_event(Event::new("demo_finished", user));

    // Deliver buffered exposures before exiting.
    client.shutdown();

    Ok(())
}
