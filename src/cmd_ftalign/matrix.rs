use clap::*;
use std::path::Path;

use ftalign::libs::fragtree::{reader, StandardScoring};
use ftalign::libs::similarity::{
    write_matrix, ErrorPolicy, MatrixFormat, Normalization, SimilarityOptions, TreeSimilarity,
};

use super::args;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("matrix")
        .about("All-against-all similarity matrices of fragmentation trees")
        .after_help(format!(
            r###"
Writes into --outdir:
* ftalign.tsv: alignment scores normalized by the self scores
* ftblast.tsv: with --library, Pearson correlation of the score profiles
  of the input trees against the library trees and the input trees

Matrices are labelled by tree names: the `id` NHX tag of a root, otherwise
the file name.

ftalign cells below --min-matches matched losses, the diagonal included,
score 0. ftblast uses the unfiltered scores.

--numpy writes .txt files with a `#names` header and bare rows instead.
--digits rounds the labelled values to a fixed number of decimals.
{}
Examples:
1. Similarities of all trees of a directory:
   ftalign matrix trees/*.nwk --outdir out

2. With a reference library, four threads:
   ftalign matrix trees/*.nwk --library lib/*.nwk --outdir out --parallel 4

"###,
            args::SCORING_HELP
        ))
        .arg(
            Arg::new("infiles")
                .required(true)
                .num_args(1..)
                .index(1)
                .help("Input Newick file(s)"),
        )
        .arg(
            Arg::new("outdir")
                .long("outdir")
                .short('o')
                .num_args(1)
                .default_value(".")
                .help("Output directory"),
        )
        .arg(
            Arg::new("library")
                .long("library")
                .num_args(1..)
                .help("Library Newick file(s), enables the ftblast matrix"),
        )
        .arg(
            Arg::new("numpy")
                .long("numpy")
                .action(ArgAction::SetTrue)
                .help("Write numpy-readable .txt files"),
        )
        .arg(
            Arg::new("digits")
                .long("digits")
                .num_args(1)
                .value_parser(value_parser!(i32))
                .allow_hyphen_values(true)
                .default_value("-1")
                .help("Decimals of the written values. Negative for full precision"),
        )
        .arg(
            Arg::new("min_matches")
                .long("min-matches")
                .num_args(1)
                .value_parser(value_parser!(usize))
                .default_value("6")
                .help("ftalign cells with fewer matched losses score 0. 0 keeps every cell"),
        )
        .arg(
            Arg::new("on_error")
                .long("on-error")
                .num_args(1)
                .value_parser(["fail", "nan"])
                .default_value("fail")
                .help("A failing alignment aborts, or becomes NaN"),
        )
        .arg(
            Arg::new("normalize")
                .long("normalize")
                .num_args(1)
                .value_parser(["geometric", "min"])
                .default_value("geometric")
                .help("Divide by the geometric mean or the minimum of the self scores"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .short('p')
                .num_args(1)
                .value_parser(value_parser!(usize))
                .default_value("0")
                .help("Number of threads. 0 uses all cores"),
        );
    let cmd = args::add_solver_args(cmd, "2");
    args::add_scoring_args(cmd)
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let infiles: Vec<String> = args.get_many::<String>("infiles").unwrap().cloned().collect();
    let libraries: Option<Vec<String>> = args
        .get_many::<String>("library")
        .map(|files| files.cloned().collect());
    let outdir = Path::new(args.get_one::<String>("outdir").unwrap());

    let digits = *args.get_one::<i32>("digits").unwrap();
    let format = MatrixFormat {
        numpy: args.get_flag("numpy"),
        digits: usize::try_from(digits).ok(),
    };

    let options = SimilarityOptions {
        joins: args::joins(args),
        solver: args::solver(args)?,
        min_matches: *args.get_one::<usize>("min_matches").unwrap(),
        policy: args
            .get_one::<String>("on_error")
            .unwrap()
            .parse::<ErrorPolicy>()
            .map_err(|e| anyhow::anyhow!(e))?,
        normalization: args
            .get_one::<String>("normalize")
            .unwrap()
            .parse::<Normalization>()
            .map_err(|e| anyhow::anyhow!(e))?,
    };
    let scoring = StandardScoring::new(args::scoring_params(args)?);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(*args.get_one::<usize>("parallel").unwrap())
        .build()?;

    //----------------------------
    // Ops
    //----------------------------
    let trees = reader::from_files(&infiles)?;
    if trees.is_empty() {
        log::warn!("no fragmentation trees in the input");
        return Ok(());
    }
    let names: Vec<String> = trees.iter().map(|t| t.name().to_string()).collect();
    log::info!("{} trees, {} threads", trees.len(), pool.current_num_threads());

    let similarity = TreeSimilarity::new(&scoring, options);

    let matrix = pool.install(|| similarity.ftalign(&trees))?;
    write_matrix(outdir, "ftalign", &names, &matrix, format);

    if let Some(libraries) = libraries {
        let library = reader::from_files(&libraries)?;
        let matrix = pool.install(|| similarity.ftblast(&trees, &library))?;
        write_matrix(outdir, "ftblast", &names, &matrix, format);
    }

    Ok(())
}
