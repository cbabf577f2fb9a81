//! Relay server demo backed by an in-process simulator
//!
//! Run with: cargo run --example relay_server [BIND_ADDR]
//!
//! The simulated aircraft circles over Zurich. Connect a websocket client to
//! `ws://localhost:9000/ws` and register some variables:
//!
//! ```text
//! {"type":"register","meta":"map","data":[
//!   {"name":"PLANE LATITUDE","unit":"degrees","type":"float64","moniker":"lat"},
//!   {"name":"PLANE LONGITUDE","unit":"degrees","type":"float64","moniker":"lon"},
//!   {"name":"TITLE","unit":"","type":"string256","moniker":"title"}]}
//! ```
//!
//! Then try `{"type":"airports","meta":"near","data":{"latitude":47.4,"longitude":8.5}}`,
//! or open `http://localhost:9000/debug` for a state dump.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use simvar_relay::airports::{Airport, AirportType, StaticAirportFinder};
use simvar_relay::sim::{ConnectInfo, MemorySimSource, SimValue};
use simvar_relay::{HubConfig, HubServer};
use tokio_util::sync::CancellationToken;

/// Rate at which the fake simulator reports fresh data
const FRAME_INTERVAL: Duration = Duration::from_millis(200);

fn demo_airports() -> StaticAirportFinder {
    let airport = |airport_type, icao: &str, name: &str, lat, lon, elevation_ft| Airport {
        airport_type,
        icao: icao.to_string(),
        name: name.to_string(),
        latitude_deg: lat,
        longitude_deg: lon,
        elevation_ft,
    };

    StaticAirportFinder::new(vec![
        airport(AirportType::LargeAirport, "LSZH", "Zurich Airport", 47.4647, 8.5492, 1417),
        airport(AirportType::MediumAirport, "LSZB", "Bern Airport", 46.9141, 7.4971, 1674),
        airport(AirportType::LargeAirport, "LSGG", "Geneva Airport", 46.2381, 6.1090, 1411),
        airport(AirportType::SmallAirport, "LSZR", "St. Gallen-Altenrhein", 47.4850, 9.5608, 1306),
        airport(AirportType::SmallAirport, "LSPV", "Wangen-Lachen", 47.2047, 8.8675, 1335),
        airport(AirportType::Heliport, "LSXB", "Balzers Heliport", 47.0681, 9.4803, 1585),
    ])
}

/// Move the aircraft around a circle until shutdown
async fn animate(sim: Arc<MemorySimSource>, shutdown: CancellationToken) {
    const CENTER: (f64, f64) = (47.45, 8.55);
    const RADIUS_DEG: f64 = 0.1;

    sim.set_value("TITLE", SimValue::Text("Cessna Skyhawk".into()));
    sim.set_value("PLANE ALTITUDE", SimValue::Float64(4500.0));
    sim.set_value("AIRSPEED TRUE", SimValue::Float64(110.0));

    let mut ticker = tokio::time::interval(FRAME_INTERVAL);
    let mut angle: f64 = 0.0;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                angle = (angle + 1.0) % 360.0;
                let rad = angle.to_radians();
                let lat = CENTER.0 + RADIUS_DEG * rad.sin();
                let lon = CENTER.1 + RADIUS_DEG * rad.cos();
                let heading = (angle + 90.0) % 360.0;
                sim.set_value("PLANE LATITUDE", SimValue::Float64(lat));
                sim.set_value("PLANE LONGITUDE", SimValue::Float64(lon));
                sim.set_value("PLANE HEADING DEGREES TRUE", SimValue::Float64(heading));
            }
        }
    }
}

fn print_usage() {
    eprintln!("Usage: relay_server [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:9000)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let mut config = HubConfig::default();
    if let Some(addr) = args.get(1) {
        match addr.replace("localhost", "127.0.0.1").parse::<SocketAddr>() {
            Ok(addr) => config = config.bind(addr),
            Err(e) => {
                eprintln!("Error: invalid bind address '{}': {}", addr, e);
                print_usage();
                std::process::exit(1);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("simvar_relay=debug".parse()?)
                .add_directive("relay_server=debug".parse()?),
        )
        .init();

    let info = ConnectInfo {
        app_name: "Demo Simulator".into(),
        app_version: "1.0".into(),
        app_build: "1".into(),
        sim_version: "1.0".into(),
        sim_build: "1".into(),
    };
    let (sim, sim_events) = MemorySimSource::new(info);
    let sim = Arc::new(sim);

    let demo_shutdown = CancellationToken::new();
    let ticker = sim.spawn_ticker(FRAME_INTERVAL, demo_shutdown.clone());
    let animator = tokio::spawn(animate(Arc::clone(&sim), demo_shutdown.clone()));

    println!("Relay listening on {}", config.bind_addr);
    println!("  websocket: ws://{}/ws", config.bind_addr);
    println!("  debug:     http://{}/debug", config.bind_addr);
    println!();

    let server = HubServer::with_airports(config, sim, sim_events, Arc::new(demo_airports()));
    let result = server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await;

    demo_shutdown.cancel();
    let _ = tokio::join!(ticker, animator);

    if let Err(e) = result {
        eprintln!("Server error: {}", e);
    }
    Ok(())
}
