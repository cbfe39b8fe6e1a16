use clap::*;
use itertools::Itertools;
use std::io::Write;

use ftalign::libs::fragtree::{reader, FragAdapter, FragRef, FragTree, StandardScoring};
use ftalign::libs::similarity::{csv_row, TreeSizeNormalizer, CSV_HEADER};
use ftalign::libs::treealign::{TraceLog, TreeAligner};

use super::args;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    let cmd = Command::new("align")
        .about("Aligns pairs of fragmentation trees")
        .after_help(format!(
            r###"
Without --with, every pair of the input trees is aligned once, in input order.
With --with, every input tree is aligned against every tree of the --with files.
One line per pair: left name, right name, score.

* --csv: comma-separated rows with a header instead
         left, right, depthLeft, depthRight, sizeLeft, sizeRight, score
* -z, --size-norm[=EXP]: divide each score by (sizeLeft * sizeRight)^(EXP / 2),
         EXP defaults to 0.5. Sizes count fragments.

Output of the extra views follows the score line:
* --tree:  the alignment tree, one node per line, indented by depth
           index, left fragments, right fragments, score
* --dot:   the alignment tree as a graphviz digraph
* --trace: the edit events, one per line
{}
Examples:
1. Score two trees:
   ftalign align a.nwk b.nwk

2. All pairs of a directory, with self alignments, as CSV:
   ftalign align trees/*.nwk --self --csv

3. Queries against references, tree-size corrected:
   ftalign align queries/*.nwk --with refs/*.nwk -z

4. Allow joins of up to two losses and show the alignment tree:
   ftalign align a.nwk b.nwk --joins 2 --tree

5. Score fragment formulas too:
   ftalign align a.nwk b.nwk --fragment

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
            Arg::new("with")
                .long("with")
                .num_args(1..)
                .help("Newick file(s) to align the input trees against"),
        )
        .arg(
            Arg::new("self")
                .long("self")
                .short('s')
                .action(ArgAction::SetTrue)
                .help("Also align each input tree with itself. Ignored with --with"),
        )
        .arg(
            Arg::new("csv")
                .long("csv")
                .action(ArgAction::SetTrue)
                .help("Write comma-separated rows with tree depths and sizes"),
        )
        .arg(
            Arg::new("size_norm")
                .long("size-norm")
                .short('z')
                .num_args(0..=1)
                .require_equals(true)
                .value_parser(value_parser!(f64))
                .default_missing_value("0.5")
                .help("Tree-size correction of the scores"),
        )
        .arg(
            Arg::new("tree")
                .long("tree")
                .action(ArgAction::SetTrue)
                .help("Print the alignment tree"),
        )
        .arg(
            Arg::new("dot")
                .long("dot")
                .action(ArgAction::SetTrue)
                .help("Print the alignment tree in graphviz format"),
        )
        .arg(
            Arg::new("trace")
                .long("trace")
                .action(ArgAction::SetTrue)
                .help("Print the edit events"),
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        );
    let cmd = args::add_solver_args(cmd, "0");
    args::add_scoring_args(cmd)
}

fn describe(node: FragRef) -> String {
    node.formula().to_string()
}

// the Debug form of a fragment is its formula
fn as_debug(node: FragRef<'_>) -> FragRef<'_> {
    node
}

// Index pairs into (lefts, rights). Without rights, pairs within lefts.
fn pairs(lefts: usize, rights: Option<usize>, with_self: bool) -> Vec<(usize, usize)> {
    match rights {
        Some(n) => (0..lefts).cartesian_product(0..n).collect(),
        None => (0..lefts)
            .flat_map(|i| {
                let start = if with_self { i } else { i + 1 };
                (start..lefts).map(move |j| (i, j))
            })
            .collect(),
    }
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let infiles: Vec<String> = args.get_many::<String>("infiles").unwrap().cloned().collect();
    let lefts = reader::from_files(&infiles)?;
    let rights: Option<Vec<FragTree>> = match args.get_many::<String>("with") {
        Some(files) => Some(reader::from_files(&files.cloned().collect::<Vec<_>>())?),
        None => None,
    };

    let is_csv = args.get_flag("csv");
    let is_tree = args.get_flag("tree");
    let is_dot = args.get_flag("dot");
    let is_trace = args.get_flag("trace");
    let normalizer = args
        .get_one::<f64>("size_norm")
        .map(|&exponent| TreeSizeNormalizer::new(exponent));

    let scoring = StandardScoring::new(args::scoring_params(args)?);
    let adapter = FragAdapter::new();
    let aligner = TreeAligner::new(&adapter, &scoring)
        .joins(args::joins(args))
        .solver(args::solver(args)?);

    let mut writer = ftalign::writer(args.get_one::<String>("outfile").unwrap())?;

    //----------------------------
    // Ops
    //----------------------------
    let pairs = pairs(
        lefts.len(),
        rights.as_ref().map(|r| r.len()),
        args.get_flag("self"),
    );
    if pairs.is_empty() {
        log::warn!("no pair of trees to align");
    }
    if is_csv {
        writer.write_fmt(format_args!("{}\n", CSV_HEADER))?;
    }

    for (i, j) in pairs {
        let left = &lefts[i];
        let right = match &rights {
            Some(rights) => &rights[j],
            None => &lefts[j],
        };
        let (l, r) = (left.root(), right.root());

        let tree = if is_tree || is_dot {
            Some(aligner.alignment_tree(l, r)?)
        } else {
            None
        };
        let mut score = match &tree {
            Some(tree) => tree.score(),
            None => aligner.score(Some(l), Some(r))?,
        };
        if let Some(normalizer) = &normalizer {
            score = normalizer.normalize(score, left, right);
        }

        if is_csv {
            writer.write_fmt(format_args!("{}\n", csv_row(left, right, score)))?;
        } else {
            writer.write_fmt(format_args!(
                "{}\t{}\t{}\n",
                left.name(),
                right.name(),
                score
            ))?;
        }
        if let Some(tree) = &tree {
            if is_tree {
                writer.write_all(tree.to_text(describe).as_bytes())?;
            }
            if is_dot {
                writer.write_all(tree.to_dot(describe).as_bytes())?;
            }
        }

        if is_trace {
            let mut trace = TraceLog::new(Vec::new(), as_debug);
            aligner.align(Some(l), Some(r), &mut trace)?;
            writer.write_all(&trace.finish()?)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs() {
        assert_eq!(pairs(3, None, false), vec![(0, 1), (0, 2), (1, 2)]);
        assert_eq!(pairs(2, None, true), vec![(0, 0), (0, 1), (1, 1)]);
        assert_eq!(pairs(2, Some(2), false), vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert!(pairs(1, None, false).is_empty());
        assert!(pairs(2, Some(0), true).is_empty());
    }
}
