use clap::*;

use ftalign::libs::fragtree::{ScoreFormula, ScoringParams};
use ftalign::libs::treealign::Solver;

pub const SCORING_HELP: &str = r###"
Scoring:
* --loss +AxB-CxD: equal losses score A + B * (non-hydrogen atoms),
  different losses -(C + D * (differing non-hydrogen atoms))
* --fragment: the same rule on the fragment formulas, off unless given
* --join +AxB: A per join plus B per absorbed edge
* --gap: score of each deleted fragment
"###;

// Adds --loss, --fragment, --join and --gap
pub fn add_scoring_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("loss")
            .long("loss")
            .num_args(1)
            .allow_hyphen_values(true)
            .default_value("+5x1-2x0.5")
            .help("Score rule for neutral losses"),
    )
    .arg(
        Arg::new("fragment")
            .long("fragment")
            .num_args(0..=1)
            .allow_hyphen_values(true)
            .require_equals(true)
            .default_missing_value("+5x1-3")
            .help("Also score fragment formulas"),
    )
    .arg(
        Arg::new("join")
            .long("join")
            .num_args(1)
            .allow_hyphen_values(true)
            .default_value("+0x-0.25")
            .help("Score rule for joined losses"),
    )
    .arg(
        Arg::new("gap")
            .long("gap")
            .num_args(1)
            .allow_hyphen_values(true)
            .value_parser(value_parser!(f64))
            .default_value("0")
            .help("Score of a deleted fragment"),
    )
}

// Adds --joins and --solver
pub fn add_solver_args(cmd: Command, joins: &'static str) -> Command {
    cmd.arg(
        Arg::new("joins")
            .long("joins")
            .num_args(1)
            .value_parser(value_parser!(usize))
            .default_value(joins)
            .help("Maximal number of losses merged into one join. 0 disables joins"),
    )
    .arg(
        Arg::new("solver")
            .long("solver")
            .num_args(1)
            .value_parser(["auto", "dense", "sparse", "multijoin"])
            .default_value("auto")
            .help("DP solver"),
    )
}

pub fn scoring_params(args: &ArgMatches) -> anyhow::Result<ScoringParams> {
    let parse = |name: &str| -> anyhow::Result<Option<ScoreFormula>> {
        match args.get_one::<String>(name) {
            Some(value) => Ok(Some(
                value
                    .parse()
                    .map_err(|e| anyhow::anyhow!("--{}: {}", name, e))?,
            )),
            None => Ok(None),
        }
    };

    let mut params = ScoringParams::default();
    if let Some(loss) = parse("loss")? {
        params.loss = loss;
    }
    params.fragment = parse("fragment")?;
    if let Some(join) = parse("join")? {
        params.join = join;
    }
    params.gap = *args.get_one::<f64>("gap").unwrap();

    log::debug!("scoring: {:?}", params);
    Ok(params)
}

pub fn joins(args: &ArgMatches) -> usize {
    *args.get_one::<usize>("joins").unwrap()
}

pub fn solver(args: &ArgMatches) -> anyhow::Result<Solver> {
    args.get_one::<String>("solver")
        .unwrap()
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))
}
