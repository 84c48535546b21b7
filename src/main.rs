use bipartition_distances::distances::WeightOptions;
use bipartition_distances::io::{build_shared_namespace, read_trees, write_matrix_tsv};
use bipartition_distances::matching::EncodingPolicy;
use bipartition_distances::pairwise::{Metric, pairwise_matrix};
use clap::{Parser, ValueEnum};
use log::{error, info};
use std::path::PathBuf;
use std::process;
use std::time::Instant;

/// Compute pairwise split distances between the trees of a BEAST/NEXUS or
/// Newick file and write a labeled distance matrix (TSV) where row/column
/// names are tree names.
#[derive(Parser, Debug)]
#[command(
    name = "bipartition-distances",
    version,
    about = "Pairwise bipartition distance matrix for phylogenetic trees"
)]
struct Args {
    /// Path to a BEAST .trees (NEXUS) file or a file with one Newick tree per line
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Output path for TSV distance matrix (`.gz` compresses, `-` is stdout)
    #[arg(short = 'o', long = "output")]
    output: PathBuf,

    /// Distance metric to compute: rf | weighted | euclidean
    #[arg(long = "metric", value_enum, default_value_t = MetricArg::Rf)]
    metric: MetricArg,

    /// Edge attribute holding the weights of the weighted metrics
    #[arg(long = "weight-attr", default_value = "length")]
    weight_attr: String,

    /// Burn-in by number of trees (drop first N trees)
    #[arg(short = 't', long = "burnin-trees", default_value_t = 0)]
    burnin_trees: usize,

    /// Burn-in by state (keep trees with STATE_ > value)
    #[arg(short = 's', long = "burnin-states", default_value_t = 0)]
    burnin_states: usize,

    /// Use TRANSLATE block to map taxon IDs to labels when available
    #[arg(long = "use-real-taxa", default_value_t = false)]
    use_real_taxa: bool,

    /// Keep split encodings already computed instead of recomputing them
    #[arg(long = "reuse-encoding", default_value_t = false)]
    reuse_encoding: bool,

    /// Quiet mode: only warnings and errors are logged
    #[arg(short = 'q', long = "quiet", default_value_t = false)]
    quiet: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum MetricArg {
    Rf,
    Weighted,
    Euclidean,
}

fn main() {
    let args = Args::parse();

    let default_level = if args.quiet { "warn" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let t0 = Instant::now();
    let named_trees = match read_trees(
        &args.input,
        args.burnin_trees,
        args.burnin_states,
        args.use_real_taxa,
    ) {
        Ok(trees) => trees,
        Err(e) => {
            error!("{e}");
            process::exit(2);
        }
    };
    let (namespace, names, mut trees) = match build_shared_namespace(&named_trees) {
        Ok(converted) => converted,
        Err(e) => {
            error!("{e}");
            process::exit(2);
        }
    };
    info!("Reading in trees {:.3}s", t0.elapsed().as_secs_f64());
    info!(
        "Read in {} taxons for {} trees",
        namespace.len(),
        trees.len()
    );

    let weights = WeightOptions::new(args.weight_attr.as_str());
    let metric = match args.metric {
        MetricArg::Rf => Metric::RobinsonFoulds,
        MetricArg::Weighted => Metric::WeightedRobinsonFoulds { weights },
        MetricArg::Euclidean => Metric::Euclidean { weights },
    };
    let policy = if args.reuse_encoding {
        EncodingPolicy::ReuseIfPresent
    } else {
        EncodingPolicy::ForceRecompute
    };

    let t1 = Instant::now();
    info!(
        "Determining distances using {} for {} combinations",
        metric.name(),
        names.len() * names.len().saturating_sub(1) / 2
    );
    let matrix = match pairwise_matrix(&mut trees, &metric, policy) {
        Ok(m) => m,
        Err(e) => {
            error!("Failed to compute distances: {e}");
            process::exit(3);
        }
    };
    info!(
        "Determining distances using {} {:.3}s",
        metric.name(),
        t1.elapsed().as_secs_f64()
    );

    let t2 = Instant::now();
    if let Err(e) = write_matrix_tsv(&args.output, &names, &matrix) {
        error!("Failed to write output {:?}: {e}", args.output);
        process::exit(4);
    }
    let target = if args.output.as_os_str() == "-" {
        "stdout"
    } else {
        "output"
    };
    info!("Writing to {target} {:.3}s", t2.elapsed().as_secs_f64());
}
