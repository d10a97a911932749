//! Benchmarks for the upstream line handling on the relay hot path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use codegen_relay::server::streaming::classify_line;
use codegen_relay::upstream::lines::LineBuffer;

fn sample_body(frames: usize) -> Vec<u8> {
    let mut body = String::new();
    for i in 0..frames {
        body.push_str(&format!(
            "data: {{\"id\":\"chatcmpl-{i}\",\"choices\":[{{\"index\":0,\"delta\":{{\"content\":\"token {i} \"}}}}]}}\n\n"
        ));
    }
    body.push_str("data: [DONE]\n\n");
    body.into_bytes()
}

fn bench_line_reassembly(c: &mut Criterion) {
    let body = sample_body(2_000);

    c.bench_function("line_buffer_2k_frames_in_97b_chunks", |b| {
        b.iter(|| {
            let mut buf = LineBuffer::new();
            let mut count = 0usize;
            for chunk in body.chunks(97) {
                buf.push_chunk(black_box(chunk));
                while let Some(line) = buf.next_line() {
                    count += line.len();
                }
            }
            black_box(count);
        })
    });
}

fn bench_classify(c: &mut Criterion) {
    let body = String::from_utf8(sample_body(2_000)).unwrap();
    let lines: Vec<&str> = body.lines().collect();

    c.bench_function("classify_4k_lines", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(classify_line(black_box(line)));
            }
        })
    });
}

criterion_group!(benches, bench_line_reassembly, bench_classify);
criterion_main!(benches);
