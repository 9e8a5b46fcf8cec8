use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use mimesplit::MimeMultipartParser;

const CONTENT_TYPE: &str =
    "multipart/related; boundary=\"uuid:3c1b5f2e-bench\"; start=\"<root@bench>\"";

/// One small root part followed by `count` binary attachments of `size` bytes.
fn build_input(count: usize, size: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(count * (size + 128));
    out.extend_from_slice(b"--uuid:3c1b5f2e-bench\r\nContent-Id: <root@bench>\r\n\r\n<root/>\r\n");
    for i in 0..count {
        out.extend_from_slice(b"--uuid:3c1b5f2e-bench\r\n");
        out.extend_from_slice(format!("Content-Id: <att{i}@bench>\r\n\r\n").as_bytes());
        out.extend((0..size).map(|j| (j % 251) as u8));
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"--uuid:3c1b5f2e-bench--\r\n");
    out
}

fn bench_all_attachments(c: &mut Criterion) {
    let input = build_input(16, 64 * 1024);
    let mut group = c.benchmark_group("multipart");
    group.throughput(Throughput::Bytes(input.len() as u64));
    group.bench_function("attachment_parts_1mb", |b| {
        b.iter(|| {
            let mut parser = MimeMultipartParser::new(&input[..], CONTENT_TYPE).unwrap();
            parser.attachment_parts().unwrap().len()
        })
    });
    group.finish();
}

fn bench_root_only(c: &mut Criterion) {
    let input = build_input(16, 64 * 1024);
    c.bench_function("root_part_lazy", |b| {
        b.iter(|| {
            let mut parser = MimeMultipartParser::new(&input[..], CONTENT_TYPE).unwrap();
            parser.root_part().unwrap().map(|p| p.len())
        })
    });
}

criterion_group!(benches, bench_all_attachments, bench_root_only);
criterion_main!(benches);
