use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use float_ord::FloatOrd;
use log::info;

use frantoio::export;
use frantoio::instance::Instance;
use frantoio::pareto;

/// Epsilon-constraint exploration of olive harvest and OMW plans
#[derive(Parser)]
#[clap(version)]
struct Args {
    /// Path to the JSON problem instance
    instance: PathBuf,
    /// Steps along the quality threshold axis
    #[clap(long, default_value_t = 5)]
    p2: usize,
    /// Steps along the profit threshold axis
    #[clap(long, default_value_t = 10)]
    p3: usize,
    /// Where to write the Z1,Z2,Z3 front
    #[clap(long, default_value = "pareto_front.csv")]
    output: PathBuf,
    /// Directory for the per-mill and per-day quantity series
    #[clap(long)]
    series: Option<PathBuf>,
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::open(&args.instance)?;
    let instance: Instance = serde_json::from_reader(file)?;

    let points = pareto::explore(&instance, args.p2, args.p3)?;

    if let Some(best) = points.iter().max_by_key(|p| FloatOrd(p.environment)) {
        info!("best environment value on the front: {}", best.environment);
    }

    let mut out = BufWriter::new(File::create(&args.output)?);
    export::write_front(&mut out, &points)?;
    info!(
        "front with {} points written to {}",
        points.len(),
        args.output.display()
    );

    if let Some(dir) = &args.series {
        std::fs::create_dir_all(dir)?;
        let mut mills = BufWriter::new(File::create(dir.join("mills.csv"))?);
        export::write_mill_series(&mut mills, &points)?;
        let mut days = BufWriter::new(File::create(dir.join("days.csv"))?);
        export::write_day_series(&mut days, &points)?;
        info!("quantity series written to {}", dir.display());
    }

    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("error: {}", e);
        exit(1);
    }
}
