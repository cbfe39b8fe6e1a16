use assert_cmd::Command;
use predicates::prelude::*;

// ================================================================================================
// ftalign align
// ================================================================================================

#[test]
fn command_align_score() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/anisole.nwk")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    // C7H7 and C5H5 match with 7 each, the other branches are deleted
    assert_eq!(stdout, "toluene\tanisole\t14\n");

    Ok(())
}

#[test]
fn command_align_unnamed() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/butanone.nwk")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    // no shared loss, deleting everything scores 0
    assert_eq!(stdout, "toluene\tbutanone\t0\n");

    Ok(())
}

#[test]
fn command_align_scoring_options() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/anisole.nwk")
        .arg("--gap")
        .arg("-1")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout, "toluene\tanisole\t12\n");

    // fragment formulas: root 14, C7H7 7 + 12, C5H5 7 + 10
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/anisole.nwk")
        .arg("--fragment")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout, "toluene\tanisole\t50\n");

    Ok(())
}

#[test]
fn command_align_joins() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg("tests/ftalign/chain.nwk")
        .arg("tests/ftalign/short.nwk")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(stdout, "chain\tshort\t0\n");

    // CO + CH4 against C2H4O: 5 + 3, one absorbed edge -0.25
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg("tests/ftalign/chain.nwk")
        .arg("tests/ftalign/short.nwk")
        .arg("--joins")
        .arg("1")
        .arg("--tree")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.starts_with("chain\tshort\t7.75\n"));
    assert!(stdout.contains("\tC3H8/C2H4\tC2H4\t7.75\n"));

    Ok(())
}

#[test]
fn command_align_tree() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/anisole.nwk")
        .arg("--tree")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    // score line, root, two matches, two deletions
    assert_eq!(stdout.lines().count(), 6);
    assert!(stdout.contains("\tC8H10O\tC8H10O\t0\n"));
    assert!(stdout.contains("\tC7H7\tC7H7\t7\n"));
    assert!(stdout.contains("\tC5H5\tC5H5\t7\n"));
    assert!(stdout.contains("\tC6H5\t-\t0\n"));
    assert!(stdout.contains("\t-\tC6H5O\t0\n"));

    Ok(())
}

#[test]
fn command_align_dot_trace() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/anisole.nwk")
        .arg("--dot")
        .arg("--trace")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(stdout.contains("digraph alignment {"));
    assert!(stdout.contains("root\tC8H10O\tC8H10O\t0\n"));
    assert!(stdout.contains("match\tC7H7\tC7H7\t7\n"));
    assert!(stdout.contains("delete_left\tC6H5\t-\t0\n"));
    assert!(stdout.contains("delete_right\t-\tC6H5O\t0\n"));

    Ok(())
}

#[test]
fn command_align_invalid() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    cmd.arg("align")
        .arg("tests/ftalign/broken.nwk")
        .arg("tests/ftalign/toluene.nwk")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a fragment"));

    let mut cmd = Command::cargo_bin("ftalign")?;
    cmd.arg("align")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/anisole.nwk")
        .arg("--loss")
        .arg("+5y1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--loss"));

    Ok(())
}

#[test]
fn command_align_sets() -> anyhow::Result<()> {
    // every pair of the inputs, self alignments included
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/anisole.nwk")
        .arg("--self")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(
        stdout,
        "toluene\ttoluene\t22\ntoluene\tanisole\t14\nanisole\tanisole\t21\n"
    );

    // inputs against a second set
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/anisole.nwk")
        .arg("--with")
        .arg("tests/ftalign/butanone.nwk")
        .arg("tests/ftalign/anisole.nwk")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    assert_eq!(
        stdout,
        "toluene\tbutanone\t0\ntoluene\tanisole\t14\nanisole\tbutanone\t0\nanisole\tanisole\t21\n"
    );

    // a single tree has no pair
    let mut cmd = Command::cargo_bin("ftalign")?;
    cmd.arg("align")
        .arg("tests/ftalign/toluene.nwk")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    Ok(())
}

#[test]
fn command_align_csv() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/anisole.nwk")
        .arg("tests/ftalign/butanone.nwk")
        .arg("--csv")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    let lines: Vec<&str> = stdout.lines().collect();

    assert_eq!(lines.len(), 4);
    assert_eq!(
        lines[0],
        "left,right,depthLeft,depthRight,sizeLeft,sizeRight,score"
    );
    assert_eq!(lines[1], "\"toluene\",\"anisole\",2,2,4,4,14");
    assert_eq!(lines[2], "\"toluene\",\"butanone\",2,1,4,2,0");
    assert_eq!(lines[3], "\"anisole\",\"butanone\",2,1,4,2,0");

    Ok(())
}

#[test]
fn command_align_size_norm() -> anyhow::Result<()> {
    // 14 / (4 * 4)^0.25
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/anisole.nwk")
        .arg("-z")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    let score: f64 = stdout.trim_end().rsplit('\t').next().unwrap().parse()?;
    assert!((score - 7.0).abs() < 1e-9);

    // 14 / (4 * 4)^0.5
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/anisole.nwk")
        .arg("--size-norm=1")
        .arg("--csv")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.ends_with("\"toluene\",\"anisole\",2,2,4,4,3.5\n"));

    Ok(())
}
