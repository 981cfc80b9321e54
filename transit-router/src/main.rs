use std::error::Error;
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

use transit_router::network::load_network;
use transit_router::planner::QueryFile;

const USAGE: &str = "usage: transit-router <schedule.json> <query.json>";

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(schedule_path), Some(query_path), None) = (args.next(), args.next(), args.next())
    else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    let network = Arc::new(load_network(&schedule_path)?);
    tracing::info!(
        stops = network.stop_count(),
        routes = network.route_count(),
        transfers = network.transfer_count(),
        "loaded {schedule_path}"
    );

    let query = QueryFile::from_path(&query_path)?;
    let router = query.router(network)?;
    let mut rng = ChaCha8Rng::seed_from_u64(query.seed);

    match router.plan(&query.request(), &query.parameters, &mut rng)? {
        Some(itinerary) => println!("{itinerary}"),
        None => println!(
            "No itinerary from {} to {}",
            query.origin.id, query.destination.id
        ),
    }
    Ok(())
}
