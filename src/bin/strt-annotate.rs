//! A binary to credit aligned STRT-seq reads to annotated features and count
//! reads and molecules per feature and barcode.
//!
//! ```shell
//! cargo run --release --bin=strt-annotate --features=binaries -- \
//!     refFlat.txt.gz mappings.tsv.gz --chromosome-sizes chrom.sizes
//! ```
//!
//! The mapping file is tab-delimited with one candidate alignment per line:
//!
//! ```text
//! read_id  chr  strand  position  length  barcode  umi  [n_mappings  [has_alt]]
//! ```
//!
//! Consecutive lines sharing a read id are the candidate alignments of a
//! single read. The counts are written to stdout as
//! `feature locus barcode reads molecules`.

use std::fs::File;
use std::io;
use std::io::BufRead;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;

use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap_verbosity_flag::Verbosity;
use flate2::read::MultiGzDecoder;
use strtquant::annotation;
use strtquant::core::Strand;
use strtquant::index;
use strtquant::index::AnnotationIndex;
use strtquant::mapping::AssignmentPolicy;
use strtquant::mapping::MappingAdder;
use strtquant::mapping::MultiReadMapping;
use strtquant::mapping::MultiReadMappings;
use strtquant::matching::Matcher;
use strtquant::quant::MoleculeCounter;
use tracing::debug;
use tracing::info;
use tracing_log::AsTrace as _;
use tracing_subscriber::EnvFilter;

////////////////////////////////////////////////////////////////////////////////////////
// Input
////////////////////////////////////////////////////////////////////////////////////////

/// Opens a file for buffered reading, decompressing it if it ends in `.gz`.
fn open(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).with_context(|| format!("opening `{}`", path.display()))?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("gz") => Ok(Box::new(BufReader::new(MultiGzDecoder::new(file)))),
        _ => Ok(Box::new(BufReader::new(file))),
    }
}

/// Reads a tab-delimited chromosome sizes file.
fn read_chromosome_sizes(path: &Path) -> Result<Vec<(String, u32)>> {
    let mut sizes = Vec::new();

    for (i, line) in open(path)?.lines().enumerate() {
        let line = line.context("reading chromosome sizes")?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split('\t');
        let (Some(name), Some(size)) = (parts.next(), parts.next()) else {
            bail!("line {}: expected a chromosome name and a size: `{line}`", i + 1);
        };

        let size = size
            .parse::<u32>()
            .with_context(|| format!("line {}: parsing the size of `{name}`", i + 1))?;
        sizes.push((name.to_string(), size));
    }

    Ok(sizes)
}

/// A single line of the mapping file.
#[derive(Debug)]
struct MappingLine {
    /// The read id.
    read_id: String,

    /// The candidate alignment.
    mapping: MultiReadMapping,

    /// The number of alignments the aligner reported, if given.
    n_mappings: Option<usize>,

    /// Whether the aligner reported more alignments than were listed.
    has_alt_mappings: bool,
}

/// Parses a boolean column.
fn parse_flag(value: &str) -> Result<bool> {
    match value {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => bail!("invalid flag: `{value}`"),
    }
}

impl MappingLine {
    /// Parses a line of the mapping file.
    fn parse(line: &str) -> Result<Self> {
        let fields = line.split('\t').collect::<Vec<_>>();

        if !(7..=9).contains(&fields.len()) {
            bail!("expected between 7 and 9 fields, found {}", fields.len());
        }

        let strand = fields[2].parse::<Strand>().context("parsing the strand")?;
        let position = fields[3].parse().context("parsing the position")?;
        let length = fields[4].parse().context("parsing the length")?;
        let barcode = fields[5].parse().context("parsing the barcode index")?;
        let umi = fields[6].parse().context("parsing the UMI")?;

        let n_mappings = fields
            .get(7)
            .map(|value| value.parse::<usize>())
            .transpose()
            .context("parsing the number of mappings")?;
        let has_alt_mappings = fields
            .get(8)
            .map(|value| parse_flag(value))
            .transpose()
            .context("parsing the alternative mappings flag")?
            .unwrap_or(false);

        Ok(Self {
            read_id: fields[0].to_string(),
            mapping: MultiReadMapping::new(fields[1], strand, position, length, barcode, umi),
            n_mappings,
            has_alt_mappings,
        })
    }
}

/// The candidate alignments of the read currently being collected.
#[derive(Debug, Default)]
struct Pending {
    /// The read id.
    read_id: String,

    /// The candidate alignments.
    mappings: Vec<MultiReadMapping>,

    /// The largest reported number of alignments.
    n_mappings: usize,

    /// Whether any line flagged alternative alignments.
    has_alt_mappings: bool,
}

impl Pending {
    /// Takes the collected alignments, leaving `self` empty.
    fn take(&mut self) -> Result<Option<MultiReadMappings>> {
        if self.mappings.is_empty() {
            return Ok(None);
        }

        let mappings = std::mem::take(&mut self.mappings);
        let n_mappings = self.n_mappings.max(mappings.len());
        let has_alt_mappings = self.has_alt_mappings;

        self.n_mappings = 0;
        self.has_alt_mappings = false;

        MultiReadMappings::try_new(mappings, n_mappings, has_alt_mappings)
            .with_context(|| format!("collecting the alignments of read `{}`", self.read_id))
            .map(Some)
    }

    /// Adds a line.
    fn push(&mut self, line: MappingLine) {
        self.read_id = line.read_id;
        self.n_mappings = self.n_mappings.max(line.n_mappings.unwrap_or_default());
        self.has_alt_mappings |= line.has_alt_mappings;
        self.mappings.push(line.mapping);
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Main
////////////////////////////////////////////////////////////////////////////////////////

#[derive(Parser)]
struct Args {
    /// The annotation file in refFlat layout (optionally gzipped).
    annotations: PathBuf,

    /// The tab-delimited mapping file (optionally gzipped).
    mappings: PathBuf,

    /// A tab-delimited file of chromosome names and sizes.
    ///
    /// When given, features on other chromosomes, or extending past the end
    /// of their chromosome, are skipped.
    #[arg(short, long)]
    chromosome_sizes: Option<PathBuf>,

    /// The size of an index bin.
    #[arg(long, default_value_t = index::builder::DEFAULT_BIN_SIZE)]
    bin_size: u32,

    /// The length of the flank beyond each transcript's 5' end.
    #[arg(long, default_value_t = index::builder::DEFAULT_FLANK)]
    upstream_flank: u32,

    /// The length of the flank beyond each transcript's 3' end.
    #[arg(long, default_value_t = index::builder::DEFAULT_FLANK)]
    downstream_flank: u32,

    /// The number of bases each transcript's 5'-most exon is extended by.
    #[arg(long, default_value_t = 0)]
    five_prime_extension: u32,

    /// The assignment policy (`all`, `all-shared`, `most5prime` or
    /// `most5prime-shared`).
    #[arg(short, long, default_value_t = AssignmentPolicy::default())]
    policy: AssignmentPolicy,

    /// Whether reads do not preserve the strand of the original molecule.
    #[arg(long, default_value_t = false)]
    non_directional: bool,

    #[command(flatten)]
    verbose: Verbosity,
}

/// Builds the annotation index.
fn build_index(args: &Args) -> Result<AnnotationIndex> {
    let mut reader = annotation::Reader::from_path(&args.annotations)
        .with_context(|| format!("opening `{}`", args.annotations.display()))?;
    let features = reader
        .features()
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("reading annotations")?;

    info!("read {} features", features.len());

    let mut builder = index::Builder::default()
        .bin_size(args.bin_size)
        .upstream_flank(args.upstream_flank)
        .downstream_flank(args.downstream_flank)
        .five_prime_extension(args.five_prime_extension);

    if let Some(path) = &args.chromosome_sizes {
        builder = builder.chromosome_sizes(read_chromosome_sizes(path)?);
    }

    builder
        .try_build_from(features)
        .context("building the annotation index")
}

fn run(args: &Args) -> Result<()> {
    let index = build_index(args)?;
    let matcher = Matcher::new(&index, !args.non_directional);
    let mut adder = MappingAdder::new(matcher, args.policy, MoleculeCounter::default());

    info!("crediting reads with policy `{}`", args.policy);

    let mut pending = Pending::default();
    let mut reads = 0usize;
    let mut annotated = 0usize;

    for (i, line) in open(&args.mappings)?.lines().enumerate() {
        let line = line.context("reading mappings")?;
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = MappingLine::parse(&line).with_context(|| format!("line {}", i + 1))?;

        if line.read_id != pending.read_id {
            if let Some(mappings) = pending.take()? {
                reads += 1;
                annotated += usize::from(adder.add(&mappings));
            }
        }

        pending.push(line);
    }

    if let Some(mappings) = pending.take()? {
        reads += 1;
        annotated += usize::from(adder.add(&mappings));
    }

    info!("credited {annotated} of {reads} reads to transcripts");

    let (counter, counters) = adder.into_parts();

    for barcode in 0..counters.num_barcodes() {
        info!(
            "barcode {barcode}: {} unique, {} duplicate, {} vetoed, {} non-annotated molecules",
            counters.unique(barcode),
            counters.duplicate(barcode),
            counters.vetoed(barcode),
            counter.random(barcode).molecules()
        );
    }

    for (loci, molecules) in counter.shared_loci() {
        let names = loci
            .iter()
            .map(|locus| index.locus_name(*locus))
            .collect::<Vec<_>>();
        debug!("{} molecules shared by {}", molecules, names.join(","));
    }

    let mut out = BufWriter::new(io::stdout().lock());
    writeln!(out, "feature\tlocus\tbarcode\treads\tmolecules").context("writing counts")?;

    for (id, barcode, counts) in counter.features() {
        let feature = index.feature(id);
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            feature.name(),
            feature.locus(),
            barcode,
            counts.reads(),
            counts.molecules()
        )
        .context("writing counts")?;
    }

    out.flush().context("writing counts")?;

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    match std::env::var("RUST_LOG") {
        Ok(_) => tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(io::stderr)
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_max_level(args.verbose.log_level_filter().as_trace())
            .with_writer(io::stderr)
            .init(),
    };

    run(&args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mapping_line() -> Result<()> {
        let line = MappingLine::parse("r1\tchr1\t-\t150\t50\t3\t17\t2\t1")?;

        assert_eq!(line.read_id, "r1");
        assert_eq!(line.mapping.strand(), Strand::Negative);
        assert_eq!(line.mapping.position(), 150);
        assert_eq!(line.mapping.barcode(), 3);
        assert_eq!(line.mapping.umi(), 17);
        assert_eq!(line.n_mappings, Some(2));
        assert!(line.has_alt_mappings);

        let line = MappingLine::parse("r2\tchr1\t+\t150\t50\t0\t1")?;
        assert_eq!(line.n_mappings, None);
        assert!(!line.has_alt_mappings);

        assert!(MappingLine::parse("r3\tchr1\t+\t150").is_err());
        assert!(MappingLine::parse("r3\tchr1\t*\t150\t50\t0\t1").is_err());
        Ok(())
    }

    #[test]
    fn test_pending_groups_lines() -> Result<()> {
        let mut pending = Pending::default();
        assert!(pending.take()?.is_none());

        pending.push(MappingLine::parse("r1\tchr1\t+\t150\t50\t0\t1\t3")?);
        pending.push(MappingLine::parse("r1\tchr2\t+\t900\t50\t0\t1\t3")?);

        let mappings = pending.take()?.unwrap();
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings.n_mappings(), 3);
        assert!(mappings.is_multi());
        assert!(pending.take()?.is_none());

        Ok(())
    }
}
