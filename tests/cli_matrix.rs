use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

// ================================================================================================
// ftalign matrix
// ================================================================================================

#[test]
fn command_matrix_ftalign() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("ftalign")?;
    cmd.arg("matrix")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/anisole.nwk")
        .arg("tests/ftalign/butanone.nwk")
        .arg("--outdir")
        .arg(tempdir.path())
        .arg("--digits")
        .arg("4")
        .arg("--min-matches")
        .arg("0")
        .assert()
        .success();

    let text = std::fs::read_to_string(tempdir.path().join("ftalign.tsv"))?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "FeatureName\ttoluene\tanisole\tbutanone");
    // 14 / sqrt(22 * 21)
    assert_eq!(lines[1], "toluene\t1.0000\t0.6513\t0.0000");
    assert_eq!(lines[2], "anisole\t0.6513\t1.0000\t0.0000");
    assert_eq!(lines[3], "butanone\t0.0000\t0.0000\t1.0000");

    assert!(!tempdir.path().join("ftblast.tsv").exists());

    Ok(())
}

#[test]
fn command_matrix_numpy() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("ftalign")?;
    cmd.arg("matrix")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/anisole.nwk")
        .arg("--outdir")
        .arg(tempdir.path())
        .arg("--numpy")
        .arg("--min-matches")
        .arg("0")
        .arg("--parallel")
        .arg("2")
        .assert()
        .success();

    let text = std::fs::read_to_string(tempdir.path().join("ftalign.txt"))?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "#toluene\tanisole");
    assert!(lines[1].starts_with("1.0\t0.6513"));
    assert!(lines[2].ends_with("\t1.0"));

    Ok(())
}

#[test]
fn command_matrix_ftblast() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("ftalign")?;
    cmd.arg("matrix")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/anisole.nwk")
        .arg("tests/ftalign/butanone.nwk")
        .arg("--library")
        .arg("tests/ftalign/library.nwk")
        .arg("--outdir")
        .arg(tempdir.path())
        .arg("--digits")
        .arg("4")
        .assert()
        .success();

    assert!(tempdir.path().join("ftalign.tsv").is_file());
    let text = std::fs::read_to_string(tempdir.path().join("ftblast.tsv"))?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "FeatureName\ttoluene\tanisole\tbutanone");
    for (i, line) in lines[1..].iter().enumerate() {
        let fields: Vec<&str> = line.split('\t').collect();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[i + 1], "1.0000");
    }

    Ok(())
}

#[test]
fn command_matrix_on_error() -> anyhow::Result<()> {
    // 17 children are too many for the dense solver
    let tempdir = TempDir::new()?;
    let mut cmd = Command::cargo_bin("ftalign")?;
    cmd.arg("matrix")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/wide.nwk")
        .arg("--outdir")
        .arg(tempdir.path())
        .arg("--solver")
        .arg("dense")
        .arg("--joins")
        .arg("0")
        .assert()
        .failure()
        .stderr(predicate::str::contains("degree 17"));
    assert!(!tempdir.path().join("ftalign.tsv").exists());

    let mut cmd = Command::cargo_bin("ftalign")?;
    cmd.arg("matrix")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/wide.nwk")
        .arg("--outdir")
        .arg(tempdir.path())
        .arg("--solver")
        .arg("dense")
        .arg("--joins")
        .arg("0")
        .arg("--on-error")
        .arg("nan")
        .arg("--min-matches")
        .arg("0")
        .arg("--digits")
        .arg("2")
        .assert()
        .success();

    let text = std::fs::read_to_string(tempdir.path().join("ftalign.tsv"))?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[1], "toluene\t1.00\tNaN");
    assert_eq!(lines[2], "wide\tNaN\tNaN");

    Ok(())
}

#[test]
fn command_matrix_min_matches() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("ftalign")?;
    cmd.arg("matrix")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/anisole.nwk")
        .arg("--outdir")
        .arg(tempdir.path())
        .arg("--min-matches")
        .arg("3")
        .assert()
        .success();

    // two matched losses between the trees, three within each
    let text = std::fs::read_to_string(tempdir.path().join("ftalign.tsv"))?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[1], "toluene\t1.0\t0.0");
    assert_eq!(lines[2], "anisole\t0.0\t1.0");

    Ok(())
}

#[test]
fn command_matrix_min_matches_default() -> anyhow::Result<()> {
    let tempdir = TempDir::new()?;

    let mut cmd = Command::cargo_bin("ftalign")?;
    cmd.arg("matrix")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/anisole.nwk")
        .arg("--library")
        .arg("tests/ftalign/library.nwk")
        .arg("--outdir")
        .arg(tempdir.path())
        .arg("--digits")
        .arg("2")
        .assert()
        .success();

    // fewer than six matched losses everywhere, the diagonal included
    let text = std::fs::read_to_string(tempdir.path().join("ftalign.tsv"))?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[1], "toluene\t0.00\t0.00");
    assert_eq!(lines[2], "anisole\t0.00\t0.00");

    // ftblast profiles are not filtered
    let text = std::fs::read_to_string(tempdir.path().join("ftblast.tsv"))?;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("toluene\t1.00\t"));
    assert!(lines[2].ends_with("\t1.00"));

    Ok(())
}
