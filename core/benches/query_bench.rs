use criterion::{criterion_group, criterion_main, Criterion};
use mrkyoto_core::engine::execute;
use mrkyoto_core::{Activity, Catalog, Kind, PriceTiers, QuerySpec};

fn bench_pipeline(c: &mut Criterion) {
    let base = Catalog::<Activity>::bundled().expect("bundled dataset");
    let mut listings: Vec<Activity> = Vec::new();
    for i in 0..300 {
        for a in base.listings() {
            let mut a = a.clone();
            a.id = format!("{}-{i}", a.id);
            listings.push(a);
        }
    }
    let mut spec = QuerySpec { search: "photo".into(), sort: Some("rating".into()), page: Some(1), ..Default::default() };
    spec.filters.insert("price".into(), "low".into());
    let query = spec.compile(Kind::Activities, &PriceTiers::for_kind(Kind::Activities)).expect("valid query");

    c.bench_function("activities_pipeline_3000", |b| b.iter(|| execute(&listings, &query)));
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
