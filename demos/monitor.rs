use std::env;

use tado_bridge::{Event, FeatureConfig, FileStorage, Platform, ResponseLogMode};

#[tokio::main]
async fn main() -> tado_bridge::Result<()> {
    tracing_subscriber::fmt::init();

    let args: Vec<String> = env::args().collect();
    let Some(config_path) = args.get(1) else {
        eprintln!("usage: monitor <config.json> [--log <responses.ndjson>]");
        std::process::exit(2);
    };
    let config = FeatureConfig::from_file(config_path)?;

    let mut builder = Platform::builder(config)
        .storage(FileStorage::new(".tado-bridge"))
        .on_event(|event| match event {
            Event::SessionReady(session) => {
                println!("home {} ({:?})", session.home_id, session.temperature_unit)
            }
            Event::AccessoryAdded(accessory) => {
                println!("+ {} [{}]", accessory.display_name, accessory.context.kind)
            }
            Event::AccessoryUpdated { name, context } => println!(
                "~ {name} room={:?} battery={:?} atHome={:?}",
                context.room, context.battery_state, context.at_home
            ),
            Event::AccessoryRemoved(accessory) => println!("- {}", accessory.display_name),
        });

    if let Some(pos) = args.iter().position(|a| a == "--log")
        && let Some(path) = args.get(pos + 1)
    {
        builder = builder.response_log(ResponseLogMode::Diffed, path);
    }

    let mut platform = builder.build()?;
    platform.run().await
}
