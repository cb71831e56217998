use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use phylostream::model::DocumentStore;
use phylostream::newick::NewickEventReader;
use phylostream::nexus::{NexusReaderBuilder, NexusWriter};
use phylostream::reader::EventReader;
use phylostream::writer::DocumentWriter;
use phylostream::{ReadWriteParameters, read_nexus_str};
use std::fmt::Write;

/// (taxa, columns, trees) of the generated Nexus documents
const NEXUS_SIZES: &[(usize, usize, usize)] = &[(16, 1_000, 10), (64, 5_000, 50), (128, 2_000, 200)];

const NEWICK_TREE_COUNTS: &[usize] = &[100, 1_000];

/// Caterpillar-like tree over taxa `t1..=tn`, varied by `seed`.
fn newick_tree(taxa: usize, seed: usize) -> String {
    let mut newick = format!("t{}:0.1", 1 + seed % taxa);
    for i in 0..taxa {
        let taxon = 1 + (i + seed) % taxa;
        if taxon == 1 + seed % taxa {
            continue;
        }
        newick = format!("({newick},t{taxon}:{}.5):0.05", i % 7);
    }
    newick
}

fn nexus_document(taxa: usize, columns: usize, trees: usize) -> String {
    const BASES: [char; 4] = ['A', 'C', 'G', 'T'];
    let mut nexus = String::from("#NEXUS\n\nBEGIN TAXA;\n\tDIMENSIONS NTAX=");
    let _ = write!(nexus, "{taxa};\n\tTAXLABELS");
    for t in 1..=taxa {
        let _ = write!(nexus, " t{t}");
    }
    let _ = write!(
        nexus,
        ";\nEND;\n\nBEGIN CHARACTERS;\n\tDIMENSIONS NCHAR={columns};\n\tFORMAT DATATYPE=DNA GAP=- MISSING=?;\n\tMATRIX\n"
    );
    for t in 1..=taxa {
        let row: String = (0..columns).map(|c| BASES[(c * 7 + t * 13) % 4]).collect();
        let _ = writeln!(nexus, "\t\tt{t} {row}");
    }
    nexus.push_str("\t;\nEND;\n\nBEGIN TREES;\n");
    for i in 0..trees {
        let _ = writeln!(nexus, "\tTREE tree_{i} = [&R] {};", newick_tree(taxa, i));
    }
    nexus.push_str("END;\n");
    nexus
}

fn consume(reader: &mut impl EventReader) -> usize {
    let mut count = 0;
    while let Some(_event) = reader.next_event().unwrap() {
        count += 1;
    }
    count
}

fn nexus_reading(c: &mut Criterion) {
    let mut group = c.benchmark_group("nexus_reading");
    for &(taxa, columns, trees) in NEXUS_SIZES {
        let nexus = nexus_document(taxa, columns, trees);
        let name = format!("{taxa}x{columns}+{trees}");
        group.bench_with_input(BenchmarkId::new("events", &name), &nexus, |b, nexus| {
            b.iter(|| consume(&mut NexusReaderBuilder::for_str(nexus).build().unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("store", &name), &nexus, |b, nexus| {
            b.iter(|| read_nexus_str(nexus).unwrap());
        });
    }
    group.finish();
}

fn newick_reading(c: &mut Criterion) {
    let mut group = c.benchmark_group("newick_reading");
    for &count in NEWICK_TREE_COUNTS {
        let newick: String = (0..count).map(|i| format!("{};\n", newick_tree(50, i))).collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &newick, |b, newick| {
            b.iter(|| consume(&mut NewickEventReader::for_str(newick, ReadWriteParameters::default())));
        });
    }
    group.finish();
}

fn nexus_writing(c: &mut Criterion) {
    let mut group = c.benchmark_group("nexus_writing");
    for &(taxa, columns, trees) in NEXUS_SIZES {
        let store: DocumentStore = read_nexus_str(&nexus_document(taxa, columns, trees)).unwrap();
        let name = format!("{taxa}x{columns}+{trees}");
        for (variant, parameters) in [
            ("sequential", ReadWriteParameters::default()),
            ("interleaved", ReadWriteParameters::default().with_line_length(Some(80))),
        ] {
            group.bench_with_input(BenchmarkId::new(variant, &name), &store, |b, store| {
                b.iter(|| {
                    let mut writer = NexusWriter::new(Vec::new());
                    writer.write_document(store, &parameters).unwrap();
                    writer.into_inner().unwrap()
                });
            });
        }
    }
    group.finish();
}

criterion_group!(reading, nexus_reading, newick_reading);
criterion_group! {
    name = writing;
    config = Criterion::default().sample_size(20);
    targets = nexus_writing
}
criterion_main!(reading, writing);
