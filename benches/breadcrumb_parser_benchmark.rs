//! Breadcrumb extraction throughput on a realistic product page

use asin_categorizer_lib::infrastructure::CategoryExtractor;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn product_page(filler_sections: usize) -> String {
    let filler: String = (0..filler_sections)
        .map(|i| format!(r#"<div class="a-section"><span>Feature bullet {i}</span><img src="/i/{i}.jpg"></div>"#))
        .collect();
    format!(
        r#"<html><head><title>Product</title></head><body>{filler}
        <div id="wayfinding-breadcrumbs_feature_div"><ul class="a-unordered-list">
          <li><span><a class="a-link-normal" href="/b?node=1"> Electronics </a></span></li>
          <li><span class="a-list-item">›</span></li>
          <li><span><a class="a-link-normal" href="/b?node=2">Headphones</a></span></li>
        </ul></div>{filler}</body></html>"#
    )
}

fn benchmark_extract_category(c: &mut Criterion) {
    let extractor = CategoryExtractor::new().expect("default selectors parse");
    let small = product_page(10);
    let large = product_page(1_000);
    let missing = "<html><body><p>Enter the characters you see below</p></body></html>";

    let mut group = c.benchmark_group("extract_category");
    group.bench_function("small_page", |b| {
        b.iter(|| extractor.extract_category(black_box(&small)))
    });
    group.bench_function("large_page", |b| {
        b.iter(|| extractor.extract_category(black_box(&large)))
    });
    group.bench_function("missing_breadcrumb", |b| {
        b.iter(|| extractor.extract_category(black_box(missing)))
    });
    group.finish();
}

criterion_group!(benches, benchmark_extract_category);
criterion_main!(benches);
