use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use osm_rtree::{
    Backend, NodeSource, Point, RTreeConfig, RTreeError, RTreeFile, RTreeResult, Rect,
};

#[derive(Parser, Debug)]
#[command(version, about = "Inspect on-disk bounding-box tree files", long_about = None)]
struct Args {
    /// Tree file to open
    file: PathBuf,

    /// Read the structured-text variant instead of the binary layout
    #[arg(long)]
    json: bool,

    #[arg(long, value_enum, default_value_t = BackendArg::Mmap)]
    backend: BackendArg,

    /// Decoded-node cache capacity, 0 disables caching
    #[arg(long, default_value_t = osm_rtree::DEFAULT_CACHE_NODES)]
    cache_nodes: usize,

    #[arg(long, default_value_t = osm_rtree::DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Interpret query coordinates as degrees
    #[arg(long)]
    degrees: bool,

    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Mmap,
    Positioned,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Mmap => Backend::Mmap,
            BackendArg::Positioned => Backend::Positioned,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print node, leaf and depth counts
    Stats,
    /// Check containment and structure of the whole tree
    Verify,
    /// List payloads whose box intersects a region
    Query {
        #[arg(allow_negative_numbers = true)]
        x0: f64,
        #[arg(allow_negative_numbers = true)]
        y0: f64,
        #[arg(allow_negative_numbers = true)]
        x1: f64,
        #[arg(allow_negative_numbers = true)]
        y1: f64,
    },
    /// List payloads whose box contains a point
    Point {
        #[arg(allow_negative_numbers = true)]
        x: f64,
        #[arg(allow_negative_numbers = true)]
        y: f64,
    },
    /// Print every node in traversal order
    Dump,
}

fn init_logging(verbose: bool) {
    let mut builder = colog::default_builder();
    builder.parse_default_env();
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    }
    builder.init();
}

fn as_coord(value: f64) -> RTreeResult<i32> {
    if value.fract() != 0.0 || value < i32::MIN as f64 || value > i32::MAX as f64 {
        return Err(RTreeError::InvalidOperation(format!(
            "{} is not a fixed-point coordinate, use --degrees for degree input",
            value
        )));
    }
    Ok(value as i32)
}

fn region(args: &Args, x0: f64, y0: f64, x1: f64, y1: f64) -> RTreeResult<Rect> {
    if args.degrees {
        Rect::from_degrees(x0, y0, x1, y1)
    } else {
        Rect::new(as_coord(x0)?, as_coord(y0)?, as_coord(x1)?, as_coord(y1)?)
    }
}

fn point(args: &Args, x: f64, y: f64) -> RTreeResult<Point> {
    if args.degrees {
        Point::from_degrees(x, y)
    } else {
        Ok(Point::new(as_coord(x)?, as_coord(y)?))
    }
}

fn run<S: NodeSource>(file: &RTreeFile<S>, args: &Args) -> RTreeResult<()> {
    match args.command {
        Command::Stats => {
            let root = file.root()?;
            println!("root:   {} {}", file.root_id()?, root.bounds());
            println!("nodes:  {}", file.node_count()?);
            println!("leaves: {}", file.leaf_count()?);
            println!("depth:  {}", file.depth()?);
            let stats = file.stats();
            println!("bytes:  {}", stats.store_len);
            log::debug!("{:?}", stats);
        }
        Command::Verify => {
            file.verify()?;
            println!("ok");
        }
        Command::Query { x0, y0, x1, y1 } => {
            for leaf in file.query_intersecting(region(args, x0, y0, x1, y1)?) {
                let leaf = leaf?;
                println!("{}\t{}", leaf.payload, leaf.bounds);
            }
        }
        Command::Point { x, y } => {
            for leaf in file.query_containing_point(point(args, x, y)?) {
                let leaf = leaf?;
                println!("{}\t{}", leaf.payload, leaf.bounds);
            }
        }
        Command::Dump => {
            for visited in file.traverse() {
                let visited = visited?;
                let indent = "  ".repeat(visited.depth);
                match visited.node.payload() {
                    Some(payload) => println!(
                        "{}@{} {} payload={}",
                        indent,
                        visited.id,
                        visited.node.bounds(),
                        payload
                    ),
                    None => println!(
                        "{}@{} {} children={}",
                        indent,
                        visited.id,
                        visited.node.bounds(),
                        visited.node.children().len()
                    ),
                }
            }
        }
    }
    Ok(())
}

fn open_and_run(args: &Args) -> RTreeResult<()> {
    let config = RTreeConfig::default()
        .backend(args.backend.into())
        .cache_nodes(args.cache_nodes)
        .max_depth(args.max_depth);

    if args.json {
        let store = osm_rtree::JsonStore::open(&args.file)?;
        run(&RTreeFile::with_source(store, config), args)
    } else {
        run(&RTreeFile::open_with_config(&args.file, config)?, args)
    }
}

/// One-line description printed on failure: error kind, offset when the
/// error has one, then the message.
fn report(e: &RTreeError) -> String {
    match e.offset() {
        Some(offset) => format!("{} at {}: {}", e.kind(), offset, e),
        None => format!("{}: {}", e.kind(), e),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match open_and_run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", report(&e));
            ExitCode::FAILURE
        }
    }
}
