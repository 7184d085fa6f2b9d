#![allow(dead_code)]

use rust_htslib::bam;
use rust_htslib::bam::record::Record;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::{TempDir, tempdir};

pub const CHR1: &[u8] = b"ACGTACGTACGTACGTACGTACGTACGTACGTACGTACGT";
pub const CHR2: &[u8] = b"AAAACCCCGGGGTTTT";

/// A stack of identical reads: `depth` copies of an `len`-base match starting
/// at 1-based `pos`.
#[derive(Debug, Clone, Copy)]
pub struct ReadStack {
    pub contig: &'static str,
    pub pos: u64,
    pub len: usize,
    pub depth: usize,
    pub mapq: u8,
}

impl ReadStack {
    pub fn new(contig: &'static str, pos: u64, len: usize, depth: usize, mapq: u8) -> Self {
        Self {
            contig,
            pos,
            len,
            depth,
            mapq,
        }
    }
}

pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempdir().expect("expected temp dir");
        let fixture = Self { dir };
        fixture.write_reference();
        fixture
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn path_str(&self, name: &str) -> String {
        self.path(name).to_string_lossy().to_string()
    }

    /// Writes `ref.fa` and its `.fai` with one sequence line per contig.
    fn write_reference(&self) {
        let mut fasta = Vec::new();
        let mut fai = String::new();
        for (name, bases) in [("chr1", CHR1), ("chr2", CHR2)] {
            fasta.extend_from_slice(format!(">{name}\n").as_bytes());
            let offset = fasta.len();
            fasta.extend_from_slice(bases);
            fasta.push(b'\n');
            fai.push_str(&format!(
                "{name}\t{}\t{offset}\t{}\t{}\n",
                bases.len(),
                bases.len(),
                bases.len() + 1
            ));
        }
        fs::write(self.path("ref.fa"), fasta).expect("expected FASTA write");
        fs::write(self.path("ref.fa.fai"), fai).expect("expected FASTA index write");
    }

    /// Writes a coordinate-sorted, BAI-indexed BAM. Stacks must be given in
    /// sorted order.
    pub fn write_bam(&self, name: &str, stacks: &[ReadStack]) -> String {
        let path = self.path(name);
        let mut header = bam::header::Header::new();
        for (contig, bases) in [("chr1", CHR1), ("chr2", CHR2)] {
            let mut sq = bam::header::HeaderRecord::new(b"SQ");
            sq.push_tag(b"SN", &contig.to_string());
            sq.push_tag(b"LN", &bases.len().to_string());
            header.push_record(&sq);
        }
        let view = bam::HeaderView::from_header(&header);

        let mut writer = bam::Writer::from_path(&path, &header, bam::Format::Bam)
            .expect("expected BAM writer");
        for stack in stacks {
            let sequence = "A".repeat(stack.len);
            let quality = "I".repeat(stack.len);
            for copy in 0..stack.depth {
                let sam = format!(
                    "{}_{}_{copy}\t0\t{}\t{}\t{}\t{}M\t*\t0\t0\t{sequence}\t{quality}",
                    stack.contig, stack.pos, stack.contig, stack.pos, stack.mapq, stack.len
                );
                let record =
                    Record::from_sam(&view, sam.as_bytes()).expect("expected SAM record parse");
                writer.write(&record).expect("expected BAM record write");
            }
        }
        drop(writer);
        bam::index::build(&path, None, bam::index::Type::Bai, 1).expect("expected BAM index");
        path.to_string_lossy().to_string()
    }

    pub fn write_rois(&self, content: &str) -> String {
        let path = self.path("rois.tsv");
        fs::write(&path, content).expect("expected ROI write");
        path.to_string_lossy().to_string()
    }

    /// Sample 1 at depth 6 over chr1:5-34 and all of chr2; sample 2 at depth 8
    /// over both contigs.
    pub fn standard_bams(&self) -> (String, String) {
        let bam1 = self.write_bam(
            "sample1.bam",
            &[
                ReadStack::new("chr1", 5, 30, 6, 60),
                ReadStack::new("chr2", 1, CHR2.len(), 6, 60),
            ],
        );
        let bam2 = self.write_bam(
            "sample2.bam",
            &[
                ReadStack::new("chr1", 1, CHR1.len(), 8, 60),
                ReadStack::new("chr2", 1, CHR2.len(), 8, 60),
            ],
        );
        (bam1, bam2)
    }
}

pub fn run_binary(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_calc_roi_covg"))
        .args(args)
        .env("RUST_LOG", "info")
        .output()
        .expect("expected calc_roi_covg binary to execute")
}

pub fn read_report(path: &Path) -> String {
    fs::read_to_string(path).expect("expected report content")
}

pub fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
