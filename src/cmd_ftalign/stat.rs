use clap::*;
use std::io::Write;

use ftalign::libs::fragtree::{reader, FragAdapter};
use ftalign::libs::treealign::{PostOrderTraversal, TreeAdapter};

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("stat")
        .about("Statistics of fragmentation trees")
        .after_help(
            r###"
One line per tree, tab-separated:
name, vertices, leaves, maximal out-degree, depth (edges on the longest root-leaf path)

Trees with an out-degree above 16 cannot use the dense solver.

Examples:
1. Statistics of all trees in a file:
   ftalign stat trees.nwk

2. Several files, with a header line:
   ftalign stat a.nwk b.nwk --header

"###,
        )
        .arg(
            Arg::new("infiles")
                .required(true)
                .num_args(1..)
                .index(1)
                .help("Input Newick file(s)"),
        )
        .arg(
            Arg::new("header")
                .long("header")
                .short('H')
                .action(ArgAction::SetTrue)
                .help("Print a header line"),
        )
        .arg(
            Arg::new("outfile")
                .long("outfile")
                .short('o')
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    let mut writer = ftalign::writer(args.get_one::<String>("outfile").unwrap())?;

    if args.get_flag("header") {
        writer.write_all(b"name\tvertices\tleaves\tmax_degree\tdepth\n")?;
    }

    for infile in args.get_many::<String>("infiles").unwrap() {
        for tree in reader::from_file(infile)? {
            let adapter = FragAdapter::new();
            let max_degree = PostOrderTraversal::new(&adapter, tree.root())
                .iter()
                .map(|node| adapter.degree_of(node))
                .max()
                .unwrap_or(0);

            writer.write_fmt(format_args!(
                "{}\t{}\t{}\t{}\t{}\n",
                tree.name(),
                tree.len(),
                tree.leaves(),
                max_degree,
                tree.depth()
            ))?;
        }
    }

    Ok(())
}
