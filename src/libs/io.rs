use std::io::{BufRead, BufReader, BufWriter, Read, Write};

/// Opens `input` for buffered reading. `stdin` reads standard input and
/// files ending in `.gz` are decompressed on the fly.
///
/// ```
/// use std::io::Write;
/// let mut file = tempfile::Builder::new().suffix(".nwk").tempfile().unwrap();
/// writeln!(file, "(H2O)CH4O;").unwrap();
///
/// let text = ftalign::read_to_string(file.path().to_str().unwrap()).unwrap();
/// assert_eq!(text.trim(), "(H2O)CH4O;");
/// ```
pub fn reader(input: &str) -> anyhow::Result<Box<dyn BufRead>> {
    let reader: Box<dyn BufRead> = if input == "stdin" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let path = std::path::Path::new(input);
        let file = std::fs::File::open(path)
            .map_err(|e| anyhow::anyhow!("could not open {}: {}", path.display(), e))?;

        if path.extension() == Some(std::ffi::OsStr::new("gz")) {
            Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        }
    };

    Ok(reader)
}

pub fn read_to_string(input: &str) -> anyhow::Result<String> {
    let mut text = String::new();
    reader(input)?.read_to_string(&mut text)?;
    Ok(text)
}

pub fn writer(output: &str) -> anyhow::Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = if output == "stdout" {
        Box::new(BufWriter::new(std::io::stdout()))
    } else {
        let file = std::fs::File::create(output)
            .map_err(|e| anyhow::anyhow!("could not create {}: {}", output, e))?;
        Box::new(BufWriter::new(file))
    };

    Ok(writer)
}
