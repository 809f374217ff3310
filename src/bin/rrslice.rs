use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use rrslice::compare::{compare, compare_sequence};
use rrslice::config::open_registry;
use rrslice::shape::{modifier_text, parse_descriptor, register_descriptor};
use rrslice::{
    ConsolidatedData, ConsolidationFunction, RegistryConfig, ShapeId, ShapeRegistry, Timeslice,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the shape catalog
    #[arg(long, env = "RRSLICE_CATALOG", default_value = "./rrslice-catalog")]
    catalog: PathBuf,

    /// JSON registry configuration (overrides --catalog)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a shape and print its id
    Register { slice_len: i32, bucket_count: i32 },
    /// Register a shape given as a descriptor literal, e.g. "[60, 5]"
    Describe { descriptor: String },
    /// Print the shape behind an id
    Lookup { id: i32 },
    /// Place a timestamp into its bucket
    Slice {
        timestamp: String,
        #[arg(long, conflicts_with = "shape")]
        shape_id: Option<i32>,
        /// Shape descriptor literal, registered on first use
        #[arg(long)]
        shape: Option<String>,
    },
    /// Compare two timestamps under a shape
    Compare {
        left: String,
        right: String,
        #[arg(long, default_value_t = 0)]
        shape_id: i32,
        /// Compare bucket slots only
        #[arg(long)]
        sequence: bool,
    },
    /// Parse and re-render a consolidated data value
    Cdata {
        value: String,
        /// AVG, MIN or MAX
        #[arg(long)]
        cf: Option<ConsolidationFunction>,
    },
    /// Print the library version
    Version,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let open = || -> Result<Box<dyn ShapeRegistry>> {
        let config = match &args.config {
            Some(path) => RegistryConfig::load(path)
                .with_context(|| format!("load config {}", path.display()))?,
            None => RegistryConfig::new(&args.catalog),
        };
        info!("Shape catalog: {}", config.catalog_dir.display());
        open_registry(&config).context("Failed to open shape catalog")
    };

    match &args.command {
        Command::Version => println!("{}", rrslice::version()),
        Command::Cdata { value, cf } => {
            let data = ConsolidatedData::parse(value, *cf)
                .with_context(|| format!("parse consolidated data {value:?}"))?;
            println!("{data}");
        }
        Command::Register {
            slice_len,
            bucket_count,
        } => {
            let registry = open()?;
            let id = registry.register_shape(*slice_len, *bucket_count)?;
            println!("{id}");
        }
        Command::Describe { descriptor } => {
            let registry = open()?;
            let id = register_descriptor(&registry, descriptor)?;
            println!("{id} {}", modifier_text(&registry, id));
        }
        Command::Lookup { id } => {
            let registry = open()?;
            let id = ShapeId::new(*id);
            match registry.lookup_shape(id)? {
                Some(shape) => println!("{shape} slice {}", shape.slice_interval()),
                None => bail!("shape id {id} is not registered"),
            }
        }
        Command::Slice {
            timestamp,
            shape_id,
            shape,
        } => {
            let registry = open()?;
            let id = match (shape_id, shape) {
                (Some(id), _) => ShapeId::new(*id),
                (None, Some(descriptor)) => registry.register(parse_descriptor(descriptor)?)?,
                (None, None) => ShapeId::UNSPECIFIED,
            };
            let value = Timeslice::parse(timestamp, id, &registry)
                .with_context(|| format!("slice {timestamp:?}"))?;
            println!("{}", value.format(&registry)?);
        }
        Command::Compare {
            left,
            right,
            shape_id,
            sequence,
        } => {
            let registry = open()?;
            let id = ShapeId::new(*shape_id);
            let left = Timeslice::parse(left, id, &registry)?;
            let right = Timeslice::parse(right, id, &registry)?;
            if *sequence {
                let ordering = compare_sequence(Some(&left), Some(&right), &registry)?;
                println!("{ordering:?}");
            } else {
                let ordering = compare(Some(&left), Some(&right), &registry)?;
                println!("{}", ordering.code());
            }
        }
    }

    Ok(())
}
