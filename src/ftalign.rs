extern crate clap;
use clap::*;

mod cmd_ftalign;

fn main() -> anyhow::Result<()> {
    let app = Command::new("ftalign")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`ftalign` - Fragmentation tree alignment")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::Count)
                .help("Log more, repeat for debug and trace output"),
        )
        .subcommand(cmd_ftalign::align::make_subcommand())
        .subcommand(cmd_ftalign::matrix::make_subcommand())
        .subcommand(cmd_ftalign::stat::make_subcommand())
        .after_help(
            r###"Subcommands:

* align  - Align two fragmentation trees: score, alignment tree, edit events
* matrix - All-against-all similarity matrices (ftalign, ftblast)
* stat   - Size and shape of fragmentation trees

Input trees are Newick files whose node labels are molecular formulas.

"###,
        );

    let matches = app.get_matches();

    let level = match matches.get_count("verbose") {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .format_target(false)
        .init();

    match matches.subcommand() {
        Some(("align", sub_matches)) => cmd_ftalign::align::execute(sub_matches),
        Some(("matrix", sub_matches)) => cmd_ftalign::matrix::execute(sub_matches),
        Some(("stat", sub_matches)) => cmd_ftalign::stat::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
