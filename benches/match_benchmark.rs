//! Benchmarks for building and matching control tables.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ctlmatch::{
    CollectingSink, ControlMatcher, HttpRequestData, LineRecord, MatchedLine, MatcherConfig,
};

/// Generate a rule file with the given number of lines per strategy.
fn generate_rules(host_count: usize, regex_count: usize, ip_count: usize) -> String {
    let mut text = String::new();

    for i in 0..host_count {
        if i % 2 == 0 {
            text.push_str(&format!("dest_host=host{}.example.com action=a{}\n", i, i));
        } else {
            text.push_str(&format!("dest_domain=domain{}.com action=a{}\n", i, i));
        }
    }

    for i in 0..regex_count {
        text.push_str(&format!("url_regex=^http://[^/]+/path{}/ action=r{}\n", i, i));
    }

    for i in 0..ip_count.min(250) {
        text.push_str(&format!("dest_ip={}.0.0.0/8 action=i{}\n", i, i));
    }

    text
}

/// Generate requests - mix of hits and misses.
fn generate_requests(count: usize, hit_ratio: f64) -> Vec<HttpRequestData> {
    let hits = (count as f64 * hit_ratio) as usize;
    (0..count)
        .map(|i| {
            let host = if i >= hits {
                format!("unknown{}.nonexistent.org", i)
            } else if i % 2 == 0 {
                format!("host{}.example.com", (i % 1000) & !1)
            } else {
                format!("www.domain{}.com", (i % 1000) | 1)
            };
            HttpRequestData {
                url: Some(format!("http://{}/path{}/index.html", host, i % 50)),
                hostname: Some(host),
                dest_ip: Some(format!("{}.1.1.1", i % 250).parse().unwrap()),
                src_ip: None,
            }
        })
        .collect()
}

fn build(text: &str) -> ControlMatcher<LineRecord> {
    ControlMatcher::build(MatcherConfig::new("bench"), text, &CollectingSink::new())
}

/// Benchmark table construction.
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for size in [100, 1_000, 10_000].iter() {
        let text = generate_rules(*size, size / 10, 100);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("lines", size), &text, |b, text| {
            b.iter(|| black_box(build(text)))
        });
    }

    group.finish();
}

/// Benchmark full request dispatch across every table.
fn bench_match_request(c: &mut Criterion) {
    let matcher = build(&generate_rules(10_000, 100, 100));
    let requests = generate_requests(1000, 0.8);

    let mut group = c.benchmark_group("match_request");
    group.throughput(Throughput::Elements(requests.len() as u64));

    group.bench_function("mixed_requests", |b| {
        b.iter(|| {
            for rdata in &requests {
                let mut hits: Vec<MatchedLine> = Vec::new();
                matcher.match_request(rdata, &mut hits);
                black_box(hits);
            }
        })
    });

    group.finish();
}

/// Benchmark host/domain lookup alone.
fn bench_host_lookup(c: &mut Criterion) {
    let matcher = build(&generate_rules(50_000, 0, 0));
    let hosts: Vec<String> = (0..100)
        .map(|i| format!("a.b.c.domain{}.com", i * 2 + 1))
        .collect();

    let mut group = c.benchmark_group("host_lookup");
    group.throughput(Throughput::Elements(hosts.len() as u64));

    group.bench_function("deep_subdomain", |b| {
        let Some(table) = matcher.host_table() else {
            return;
        };
        b.iter(|| {
            for host in &hosts {
                black_box(table.matches(host).count());
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_match_request, bench_host_lookup);
criterion_main!(benches);
