// this_file: benches/stub_forwarding.rs

//! Stub forwarding overhead benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ttb_core::{Bridge, FormatCode, Host};
use ttb_memory::MemoryHost;

fn bench_diagnostics(c: &mut Criterion) {
    let mut host = MemoryHost::new();

    c.bench_function("issue_warning", |b| {
        b.iter(|| {
            let mut bridge = Bridge::new(&mut host);
            bridge.issue_warning(format_args!("overfull \\hbox ({}pt too wide)", black_box(3.5)));
        });
        host.close_all();
    });
}

fn bench_output_printf(c: &mut Criterion) {
    let mut group = c.benchmark_group("output_printf");

    for len in [16usize, 512, 4096] {
        let payload = "x".repeat(len);
        group.bench_with_input(BenchmarkId::from_parameter(len), &payload, |b, payload| {
            let mut host = MemoryHost::new();
            let out = host.output_open_stdout().expect("stdout handle");
            b.iter(|| {
                let mut bridge = Bridge::new(&mut host);
                bridge
                    .output_printf(&out, format_args!("{}", black_box(payload)))
                    .expect("write");
            });
        });
    }

    group.finish();
}

fn bench_input_getc(c: &mut Criterion) {
    let data = vec![b'a'; 64 * 1024];
    let mut host = MemoryHost::new().with_file("big.tex", data);

    c.bench_function("input_getc_64k", |b| {
        b.iter(|| {
            let mut bridge = Bridge::new(&mut host);
            let input = bridge
                .input_open("big.tex", FormatCode::Tex, false)
                .expect("input");
            let mut count = 0usize;
            while let Ok(Some(_)) = bridge.input_getc(&input) {
                count += 1;
            }
            bridge.input_close(input).expect("close");
            black_box(count)
        });
    });
}

criterion_group!(benches, bench_diagnostics, bench_output_printf, bench_input_getc);
criterion_main!(benches);
