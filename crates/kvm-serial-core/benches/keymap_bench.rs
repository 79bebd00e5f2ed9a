//! Criterion benchmarks for layout resolution and character translation.
//!
//! Run with:
//! ```bash
//! cargo bench --package kvm-serial-core --bench keymap_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kvm_serial_core::{char_to_scancode, string_to_scancodes, Layout};

const SAMPLE_TEXT: &str = "The quick brown fox jumps over the lazy dog 0123456789!";

fn bench_char_map_build(c: &mut Criterion) {
    c.bench_function("layout/char_map_en_gb", |b| {
        b.iter(|| black_box(Layout::EnGb).char_map())
    });
    c.bench_function("layout/char_map_en_us", |b| {
        b.iter(|| black_box(Layout::EnUs).char_map())
    });
}

fn bench_char_translation(c: &mut Criterion) {
    let map = Layout::EnGb.char_map();
    c.bench_function("translate/ascii_printables", |b| {
        b.iter(|| {
            for ch in SAMPLE_TEXT.chars() {
                black_box(char_to_scancode(black_box(ch), &map));
            }
        })
    });
}

fn bench_string_expansion(c: &mut Criterion) {
    let map = Layout::EnGb.char_map();
    c.bench_function("translate/string_to_scancodes_with_key_ups", |b| {
        b.iter(|| string_to_scancodes(black_box(SAMPLE_TEXT), &map, 1, 1))
    });
}

criterion_group!(
    benches,
    bench_char_map_build,
    bench_char_translation,
    bench_string_expansion
);
criterion_main!(benches);
