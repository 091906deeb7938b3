//! voyage - plan routes and drive autopilot vehicles from the command line

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voyage_cli::{Config, Session, TerrainPreset};
use voyage_core::{format_distance, ControllerKind, GeoPoint, TerrainMask};

#[derive(Debug, Parser)]
#[command(name = "voyage", author, version, about, long_about = None)]
struct Cli {
    /// Save file, overrides VOYAGE_SAVE_PATH
    #[arg(long, global = true)]
    save: Option<PathBuf>,

    /// Terrain preset, overrides VOYAGE_TERRAIN
    #[arg(long, global = true, value_enum)]
    terrain: Option<TerrainPreset>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a vehicle at a position.
    Add {
        id: String,
        #[arg(long, value_enum)]
        kind: Kind,
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,
        /// Average speed in m/s, defaults to the profile's
        #[arg(long)]
        speed: Option<f64>,
    },
    /// Remove a vehicle from the fleet.
    Remove { id: String },
    /// Plan a route for a vehicle from its current position.
    Route {
        id: String,
        #[arg(allow_hyphen_values = true)]
        lat: f64,
        #[arg(allow_hyphen_values = true)]
        lon: f64,
    },
    /// Start following the planned route.
    Go { id: String },
    /// Stop and forget the current target.
    Stop { id: String },
    /// Switch automation off for a vehicle.
    Disable { id: String },
    /// Switch automation back on.
    Enable { id: String },
    /// Take control of a vehicle, or release control with no id.
    Control { id: Option<String> },
    /// Advance the simulation clock.
    Run {
        /// Simulated seconds to run
        #[arg(long, default_value_t = 3600.0)]
        duration: f64,
    },
    /// Show the fleet, or the summary panel of one vehicle.
    Status {
        id: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Plan between two points without touching the fleet.
    Plan {
        #[arg(long, allow_hyphen_values = true)]
        from_lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        from_lon: f64,
        #[arg(long, allow_hyphen_values = true)]
        to_lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        to_lon: f64,
        #[arg(long, value_enum, default_value = "any")]
        over: Surface,
    },
}

/// Command-line spelling of `ControllerKind`; voyage-core does not depend on clap.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Rover,
    Ship,
}

impl From<Kind> for ControllerKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Rover => ControllerKind::Rover,
            Kind::Ship => ControllerKind::Ship,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Surface {
    Land,
    Ocean,
    Any,
}

impl From<Surface> for TerrainMask {
    fn from(surface: Surface) -> Self {
        match surface {
            Surface::Land => TerrainMask::LAND,
            Surface::Ocean => TerrainMask::OCEAN,
            Surface::Any => TerrainMask::LAND_OR_OCEAN,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("voyage_cli=info".parse()?)
                .add_directive("voyage_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(save) = cli.save {
        config.save_path = save;
    }
    if let Some(terrain) = cli.terrain {
        config.terrain = terrain;
    }

    let mut session = Session::open(config)?;
    let changed = match cli.command {
        Command::Add {
            id,
            kind,
            lat,
            lon,
            speed,
        } => {
            session.add_vehicle(&id, kind.into(), GeoPoint::new(lat, lon), speed)?;
            println!("Registered {id}");
            true
        }
        Command::Remove { id } => {
            session.remove_vehicle(&id)?;
            println!("Removed {id}");
            true
        }
        Command::Route { id, lat, lon } => {
            let distance = session.plan_route(&id, GeoPoint::new(lat, lon))?;
            println!("Route planned for {id}: {}", format_distance(distance));
            true
        }
        Command::Go { id } => {
            session.activate(&id)?;
            println!("{id} is under way");
            true
        }
        Command::Stop { id } => {
            session.deactivate(&id)?;
            println!("{id} stopped");
            true
        }
        Command::Disable { id } => {
            session.set_enabled(&id, false)?;
            println!("Controller disabled for {id}");
            true
        }
        Command::Enable { id } => {
            session.set_enabled(&id, true)?;
            println!("Controller enabled for {id}");
            true
        }
        Command::Control { id } => {
            session.control(id.as_deref())?;
            match id {
                Some(id) => println!("Now controlling {id}"),
                None => println!("Released control"),
            }
            true
        }
        Command::Run { duration } => {
            let reports = session.run(duration);
            for report in &reports {
                for id in &report.arrived {
                    println!("t={:.0}s {id} arrived", report.time);
                }
            }
            println!(
                "Ran {} ticks, clock now {:.0}s",
                reports.len(),
                session.driver.now()
            );
            true
        }
        Command::Status { id, json } => {
            print_status(&session, id.as_deref(), json)?;
            false
        }
        Command::Plan {
            from_lat,
            from_lon,
            to_lat,
            to_lon,
            over,
        } => {
            let (result, encoded) = session.plan(
                GeoPoint::new(from_lat, from_lon),
                GeoPoint::new(to_lat, to_lon),
                over.into(),
            )?;
            println!(
                "{} over {} waypoints ({} tiles expanded)",
                format_distance(result.distance_m()),
                result.route.len(),
                result.nodes_visited
            );
            println!("{encoded}");
            false
        }
    };

    if changed {
        session.persist()?;
    }
    Ok(())
}

fn print_status(session: &Session, id: Option<&str>, json: bool) -> Result<()> {
    if let Some(id) = id {
        let rows = session.summary(id)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
        } else {
            for row in rows {
                println!("{:<20} {}", row.label, row.value);
            }
        }
        return Ok(());
    }

    let statuses = session.statuses();
    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }
    if statuses.is_empty() {
        println!("No vehicles registered");
        return Ok(());
    }
    println!(
        "{:<16} {:<6} {:<20} {:<24} {}",
        "ID", "KIND", "STATE", "POSITION", "REMAINING"
    );
    for status in statuses {
        println!(
            "{:<16} {:<6} {:<20} {:<24} {}",
            status.id,
            format!("{:?}", status.kind).to_lowercase(),
            status.state.label(),
            status.position.to_string(),
            format_distance(status.remaining_m)
        );
    }
    Ok(())
}
