use super::tree::FragTree;
use std::path::Path;

/// Reads every fragmentation tree of a Newick file (or "stdin").
///
/// Trees without an `id` tag are named after the file stem.
pub fn from_file(infile: &str) -> anyhow::Result<Vec<FragTree>> {
    let newick = crate::read_to_string(infile)?;
    let stem = if infile == "stdin" {
        "stdin".to_string()
    } else {
        let path = Path::new(infile);
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(infile);
        // tree.nwk.gz -> tree
        stem.strip_suffix(".nwk")
            .or_else(|| stem.strip_suffix(".newick"))
            .unwrap_or(stem)
            .to_string()
    };
    let trees = FragTree::from_newick(&newick, &stem)
        .map_err(|e| anyhow::anyhow!("{}: {}", infile, e))?;
    log::debug!("{}: {} tree(s)", infile, trees.len());
    Ok(trees)
}

/// Reads several files, keeping the file order.
pub fn from_files(infiles: &[String]) -> anyhow::Result<Vec<FragTree>> {
    let mut trees = vec![];
    for infile in infiles {
        trees.extend(from_file(infile)?);
    }
    Ok(trees)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_from_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("caffeine.nwk");
        let mut file = std::fs::File::create(&path)?;
        writeln!(file, "((C6H6N3O)C7H9N4O2,C6H7N3O)C8H11N4O2;")?;

        let trees = from_file(path.to_str().unwrap())?;
        assert_eq!(trees.len(), 1);
        assert_eq!(trees[0].name(), "caffeine");
        assert_eq!(trees[0].len(), 4);

        let missing = dir.path().join("missing.nwk");
        assert!(from_file(missing.to_str().unwrap()).is_err());
        Ok(())
    }
}
