use assert_cmd::Command;
use std::io::Write;
use tempfile::Builder;

// ================================================================================================
// ftalign stat
// ================================================================================================

#[test]
fn command_stat_basic() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("stat")
        .arg("tests/ftalign/toluene.nwk")
        .arg("tests/ftalign/butanone.nwk")
        .arg("--header")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(
        stdout,
        "name\tvertices\tleaves\tmax_degree\tdepth\ntoluene\t4\t2\t2\t2\nbutanone\t2\t1\t1\t1\n"
    );

    Ok(())
}

#[test]
fn command_stat_multiple_trees() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("stat")
        .arg("tests/ftalign/library.nwk")
        .arg("tests/ftalign/wide.nwk")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(stdout.lines().count(), 3);
    assert!(stdout.contains("lib1\t3\t1\t1\t2\n"));
    assert!(stdout.contains("lib2\t2\t1\t1\t1\n"));
    assert!(stdout.contains("wide\t18\t17\t17\t1\n"));

    Ok(())
}

#[test]
fn command_stat_gz() -> anyhow::Result<()> {
    let mut file = Builder::new().suffix(".nwk.gz").tempfile()?;
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(b"(CO,C2H4)C3H4O;\n(H2O)CH4O;\n")?;
    file.write_all(&encoder.finish()?)?;

    let stem = file
        .path()
        .file_name()
        .and_then(|s| s.to_str())
        .and_then(|s| s.strip_suffix(".nwk.gz"))
        .unwrap()
        .to_string();

    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd.arg("stat").arg(file.path()).output()?;
    let stdout = String::from_utf8(output.stdout)?;

    // unnamed trees are numbered after the file
    assert_eq!(
        stdout,
        format!("{}_1\t3\t2\t2\t1\n{}_2\t2\t1\t1\t1\n", stem, stem)
    );

    Ok(())
}
