//! Send one command to a running host and print the result
//!
//! ```text
//! cargo run --example send_command -- get_scene_info
//! cargo run --example send_command -- create_object '{"name": "Cube", "location": [0, 0, 1]}'
//! ```
//!
//! The host address comes from `HOSTLINK_HOST` / `HOSTLINK_PORT`.

use hostlink::{BridgeConfig, ClientBuilder, Params};
use serde_json::Value;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_else(|| "get_scene_info".to_string());
    let params: Params = match args.next() {
        Some(raw) => match serde_json::from_str(&raw)? {
            Value::Object(map) => map,
            other => anyhow::bail!("Parameters must be a JSON object, got {}", other),
        },
        None => Params::new(),
    };

    let mut session = ClientBuilder::from_config(BridgeConfig::from_env()?)
        .service_name("send-command")
        .build_session()?;

    if session.start().await {
        println!("extended commands enabled: {}", session.extended_enabled());
    }

    let outcome = session.send_command(&command, params).await;
    session.shutdown();

    let result = outcome?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
