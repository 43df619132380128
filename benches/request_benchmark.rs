use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use fast_httpd::request::{count_header_lines, percent_decode, Request};

fn simple_request_parse_benchmark(c: &mut Criterion) {
    let request = b"GET / HTTP/1.1\r\nHost: localhost:8080\r\nUser-Agent: Test\r\n\r\n";

    c.bench_function("simple_request_parse", |b| {
        b.iter(|| {
            let _ = Request::parse(black_box(request), 0).unwrap();
        });
    });
}

fn complex_request_parse_benchmark(c: &mut Criterion) {
    let request = b"GET /path/to/resource?id=123&name=test HTTP/1.1\r\n\
                    Host: localhost:8080\r\n\
                    User-Agent: Mozilla/5.0 (Windows NT 10.0; Win64; x64)\r\n\
                    Accept: text/html,application/xhtml+xml\r\n\
                    Accept-Language: en-US,en;q=0.9\r\n\
                    Accept-Encoding: gzip, deflate, br\r\n\
                    Connection: keep-alive\r\n\
                    Upgrade-Insecure-Requests: 1\r\n\
                    \r\n";

    c.bench_function("complex_request_parse", |b| {
        b.iter(|| {
            let _ = Request::parse(black_box(request), 0).unwrap();
        });
    });
}

fn request_parse_different_methods_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_parse_methods");

    let requests = [
        ("GET", b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n".as_slice()),
        ("HEAD", b"HEAD / HTTP/1.1\r\nHost: localhost\r\n\r\n".as_slice()),
        // 被拒绝的方法走的是提前返回的路径
        ("POST", b"POST / HTTP/1.1\r\nHost: localhost\r\n\r\n".as_slice()),
    ];

    for (method, request) in requests.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(method), request, |b, request| {
            b.iter(|| {
                let _ = Request::parse(black_box(request), 0);
            });
        });
    }

    group.finish();
}

fn request_parse_different_path_lengths_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_parse_path_length");

    let paths = [
        ("short", "/"),
        ("medium", "/path/to/resource"),
        ("escaped", "/my%20documents/%E6%96%87%E4%BB%B6/report%2Ehtml"),
        ("long", "/very/long/path/to/some/resource/with/many/segments/and/a/query?param1=value1&param2=value2&param3=value3"),
    ];

    for (name, path) in paths.iter() {
        let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path);
        group.bench_with_input(BenchmarkId::from_parameter(name), &request, |b, request| {
            b.iter(|| {
                let _ = Request::parse(black_box(request.as_bytes()), 0).unwrap();
            });
        });
    }

    group.finish();
}

fn header_count_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("count_header_lines");

    for count in [1, 10, 50].iter() {
        let mut request = String::from("GET / HTTP/1.1\r\n");
        for i in 0..*count {
            request.push_str(&format!("X-Header-{}: value\r\n", i));
        }
        request.push_str("\r\n");
        group.bench_with_input(BenchmarkId::from_parameter(count), &request, |b, request| {
            b.iter(|| count_header_lines(black_box(request.as_bytes())));
        });
    }

    group.finish();
}

fn percent_decode_benchmark(c: &mut Criterion) {
    let uri = b"/%E4%B8%AD%E6%96%87/%20space%20/plain/path/100%/end";

    c.bench_function("percent_decode", |b| {
        b.iter(|| percent_decode(black_box(uri)));
    });
}

criterion_group!(
    benches,
    simple_request_parse_benchmark,
    complex_request_parse_benchmark,
    request_parse_different_methods_benchmark,
    request_parse_different_path_lengths_benchmark,
    header_count_benchmark,
    percent_decode_benchmark
);
criterion_main!(benches);
