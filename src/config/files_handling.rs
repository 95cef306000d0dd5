
// imports
use crate::error::{GloveError, Result};
use crate::matrix::{CooccurrenceMatrix, Triplet};
use crate::vocab::TokenId;

use std::fmt::{self, Display};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use clap::ValueEnum;
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use log::info;
use ndarray::Array2;
use ndarray_npy::{ReadNpyExt, WriteNpyExt};
use serde::{Deserialize, Serialize};


/// On-disk layouts of the cooccurrence triplets. Every layout lists the entries
/// sorted by main id then context id.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// "main context weight" lines
    Text,
    /// `Token,Context,Cooc` header then one record per entry
    Csv,
    /// bincode sequence of (u64, u64, f64)
    #[default]
    Bin,
    /// bare little-endian (i32, i32, f64) records, the record layout of the
    /// GloVe C tools (ids stay 0-based)
    Crec,
    /// N x 3 array of f64
    Npy,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Csv => "csv",
            OutputFormat::Bin => "bin",
            OutputFormat::Crec => "crec",
            OutputFormat::Npy => "npy",
        }
    }

    pub fn file_name(&self, stem: &str, compress: bool) -> String {
        if compress {
            format!("{}.{}.gz", stem, self.extension())
        } else {
            format!("{}.{}", stem, self.extension())
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Text => "text",
            OutputFormat::Csv => "csv",
            OutputFormat::Bin => "bin",
            OutputFormat::Crec => "crec",
            OutputFormat::Npy => "npy",
        };
        f.write_str(name)
    }
}


pub fn save_matrix(path: &Path, matrix: &CooccurrenceMatrix, format: OutputFormat, compress: bool) -> Result<()> {

    // create output folder
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let f = BufWriter::new(File::create(path)?);
    if compress {
        let mut writer = GzEncoder::new(f, Compression::default());
        write_matrix(&mut writer, matrix, format)?;
        writer.finish()?.flush()?;
    } else {
        let mut writer = f;
        write_matrix(&mut writer, matrix, format)?;
        writer.flush()?;
    }

    info!("saved {} cooccurrence entries to {} ({}{})",
        matrix.len(), path.display(), format, if compress { ", gzip" } else { "" });
    Ok(())
}

pub fn read_matrix(path: &Path, format: OutputFormat, compress: bool) -> Result<CooccurrenceMatrix> {
    let f = BufReader::new(File::open(path)?);
    if compress {
        read_matrix_from(BufReader::new(GzDecoder::new(f)), format)
    } else {
        read_matrix_from(f, format)
    }
}

pub fn write_matrix<W: Write>(mut writer: W, matrix: &CooccurrenceMatrix, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for (main, context, v) in matrix.triplets() {
                writeln!(writer, "{} {} {}", main, context, v)?;
            }
        }
        OutputFormat::Csv => {
            let mut wrt = csv::Writer::from_writer(&mut writer);
            wrt.write_record(["Token", "Context", "Cooc"])?;
            for triplet in matrix.triplets() {
                wrt.serialize(triplet)?;
            }
            wrt.flush()?;
        }
        OutputFormat::Bin => {
            bincode::serialize_into(&mut writer, matrix)?;
        }
        OutputFormat::Crec => {
            // fixed-int little-endian encoding, no length prefix: 16 bytes per record
            for (main, context, v) in matrix.triplets() {
                let record = (crec_id(main)?, crec_id(context)?, v);
                bincode::serialize_into(&mut writer, &record)?;
            }
        }
        OutputFormat::Npy => {
            matrix.to_ndarray().write_npy(&mut writer)?;
        }
    }
    Ok(())
}

pub fn read_matrix_from<R: BufRead>(mut reader: R, format: OutputFormat) -> Result<CooccurrenceMatrix> {
    match format {
        OutputFormat::Text => {
            let mut triplets = Vec::new();
            for (i, line) in reader.lines().enumerate() {
                triplets.push(parse_text_line(&line?, i + 1)?);
            }
            Ok(CooccurrenceMatrix::from_triplets(triplets))
        }
        OutputFormat::Csv => {
            let mut rdr = csv::Reader::from_reader(reader);
            let mut triplets = Vec::new();
            for record in rdr.deserialize() {
                let triplet: Triplet = record?;
                triplets.push(triplet);
            }
            Ok(CooccurrenceMatrix::from_triplets(triplets))
        }
        OutputFormat::Bin => {
            Ok(bincode::deserialize_from(reader)?)
        }
        OutputFormat::Crec => {
            let mut triplets = Vec::new();
            while !reader.fill_buf()?.is_empty() {
                let (main, context, v): (i32, i32, f64) = bincode::deserialize_from(&mut reader)?;
                triplets.push((token_id(main)?, token_id(context)?, v));
            }
            Ok(CooccurrenceMatrix::from_triplets(triplets))
        }
        OutputFormat::Npy => {
            let nd_array = Array2::<f64>::read_npy(reader)?;
            CooccurrenceMatrix::from_ndarray(&nd_array)
        }
    }
}

fn parse_text_line(line: &str, line_no: usize) -> Result<Triplet> {
    let bad = || GloveError::Serialization(format!("line {}: expected \"main context weight\", found {:?}", line_no, line));
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 3 {
        return Err(bad());
    }
    let main = fields[0].parse().map_err(|_| bad())?;
    let context = fields[1].parse().map_err(|_| bad())?;
    let v = fields[2].parse().map_err(|_| bad())?;
    Ok((main, context, v))
}

// the GloVe tools read ids as C ints
fn crec_id(id: TokenId) -> Result<i32> {
    i32::try_from(id).map_err(|_| GloveError::Serialization(format!("token id {} does not fit a crec record", id)))
}

fn token_id(id: i32) -> Result<TokenId> {
    TokenId::try_from(id).map_err(|_| GloveError::Serialization(format!("negative token id {} in crec record", id)))
}


#[cfg(test)]
mod tests {

    use super::{read_matrix, read_matrix_from, save_matrix, write_matrix, OutputFormat};
    use crate::matrix::CooccurrenceMatrix;
    use crate::GloveError;
    use std::io::Cursor;

    fn sample() -> CooccurrenceMatrix {
        CooccurrenceMatrix::from_triplets(vec![(1, 0, 0.5), (0, 1, 1.0 / 3.0), (2, 2, 2.0)])
    }

    fn encode(format: OutputFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        write_matrix(&mut buf, &sample(), format).unwrap();
        buf
    }

    #[test]
    fn text_lines_are_sorted() {
        let text = String::from_utf8(encode(OutputFormat::Text)).unwrap();
        assert_eq!(text, "0 1 0.3333333333333333\n1 0 0.5\n2 2 2\n");
        assert_eq!(read_matrix_from(Cursor::new(text), OutputFormat::Text).unwrap(), sample());
    }

    #[test]
    fn csv_has_the_header() {
        let text = String::from_utf8(encode(OutputFormat::Csv)).unwrap();
        assert!(text.starts_with("Token,Context,Cooc\n0,1,0.333"));
        assert_eq!(text.lines().count(), 4);
        assert_eq!(read_matrix_from(Cursor::new(text), OutputFormat::Csv).unwrap(), sample());
    }

    #[test]
    fn crec_records_are_sixteen_bytes() {
        let bytes = encode(OutputFormat::Crec);
        assert_eq!(bytes.len(), 3 * 16);
        assert_eq!(&bytes[0..8], &[0, 0, 0, 0, 1, 0, 0, 0]);
        assert_eq!(&bytes[8..16], &(1.0f64 / 3.0).to_le_bytes());
        assert_eq!(read_matrix_from(Cursor::new(bytes), OutputFormat::Crec).unwrap(), sample());
    }

    #[test]
    fn truncated_crec_is_rejected() {
        let mut bytes = encode(OutputFormat::Crec);
        bytes.truncate(20);
        assert!(read_matrix_from(Cursor::new(bytes), OutputFormat::Crec).is_err());
    }

    #[test]
    fn bin_and_npy_read_back() {
        for format in [OutputFormat::Bin, OutputFormat::Npy] {
            let bytes = encode(format);
            assert_eq!(read_matrix_from(Cursor::new(bytes), format).unwrap(), sample(), "{}", format);
        }
    }

    #[test]
    fn bad_text_line_is_a_serialization_error() {
        let res = read_matrix_from(Cursor::new("0 1 0.5\n0 x 1\n"), OutputFormat::Text);
        assert!(matches!(res, Err(GloveError::Serialization(_))));
    }

    #[test]
    fn gzip_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        for format in [OutputFormat::Text, OutputFormat::Crec, OutputFormat::Npy] {
            let path = dir.path().join("out").join(format.file_name("cooccurrence", true));
            save_matrix(&path, &sample(), format, true).unwrap();
            let raw = std::fs::read(&path).unwrap();
            assert_eq!(&raw[0..2], &[0x1f, 0x8b]);
            assert_eq!(read_matrix(&path, format, true).unwrap(), sample());
        }
        assert_eq!(OutputFormat::Csv.file_name("x", false), "x.csv");
        assert!(matches!(read_matrix(&dir.path().join("missing"), OutputFormat::Bin, false), Err(GloveError::Io(_))));
    }
}
