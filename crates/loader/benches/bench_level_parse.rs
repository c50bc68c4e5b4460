use std::hint::black_box;
use std::time::Instant;

use tilespace_loader::{LevelLoader, parse_level};
use tilespace_object::AcceptAll;

fn make_level(width: u32, height: u32, objects: usize) -> String {
    let mut src = String::from("<?xml version=\"1.0\"?>\n<map>\n");
    src.push_str(&format!(
        "<layer name=\"ground\" width=\"{width}\" height=\"{height}\"><data encoding=\"csv\">\n"
    ));
    for row in 0..height {
        for x in 0..width {
            let id = if row == height - 1 || (x * 7 + row * 3) % 11 == 0 { 1 } else { 0 };
            src.push_str(&format!("{id},"));
        }
        src.push('\n');
    }
    src.push_str("</data></layer>\n<objectgroup>\n");
    for i in 0..objects {
        src.push_str(&format!(
            "<object type=\"coin\" x=\"{}\" y=\"{}\" width=\"16\" height=\"16\">\
             <properties><property name=\"i0\" value=\"{i}\"/><property name=\"s1\" value=\"coin_{i}\"/></properties>\
             </object>\n",
            (i % width as usize) * 16,
            (i / width as usize) * 16,
        ));
    }
    src.push_str("</objectgroup>\n</map>\n");
    src
}

fn bench_parse(width: u32, height: u32, objects: usize, iterations: usize) {
    let src = make_level(width, height, objects);
    let start = Instant::now();
    for _ in 0..iterations {
        let level = parse_level(black_box(src.as_bytes()), &AcceptAll);
        let _ = black_box(level);
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    let mib_s = (src.len() * iterations) as f64 / elapsed.as_secs_f64() / (1024.0 * 1024.0);
    println!(
        "  parse ({width}x{height} tiles, {objects} objects, {} bytes, {iterations} iters): {per_iter:?}/iter, {mib_s:.1} MiB/s",
        src.len()
    );
}

fn bench_chunked(chunk: usize, iterations: usize) {
    let src = make_level(128, 64, 200);
    let start = Instant::now();
    for _ in 0..iterations {
        let mut loader = LevelLoader::new(&AcceptAll);
        for part in src.as_bytes().chunks(chunk) {
            if loader.feed(black_box(part)).is_err() {
                break;
            }
        }
        let _ = black_box(loader.finish());
    }
    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations as u32;
    println!("  chunked parse ({chunk}-byte chunks, {iterations} iters): {per_iter:?}/iter, total {elapsed:?}");
}

fn main() {
    println!("=== Level Parse Benchmarks ===\n");

    println!("Whole-buffer parse:");
    bench_parse(32, 16, 10, 1000);
    bench_parse(128, 64, 200, 100);
    bench_parse(512, 256, 2000, 10);

    println!("\nChunked parse:");
    bench_chunked(16, 50);
    bench_chunked(4096, 50);

    println!("\n=== Done ===");
}
