use criterion::{black_box, criterion_group, criterion_main, Criterion};
use livepad_composer::{DocumentComposer, LibraryRegistry, LibraryToggleSet};

fn compose_small_document(c: &mut Criterion) {
    let composer = DocumentComposer::default();
    let toggles = LibraryToggleSet::for_registry(&LibraryRegistry::builtin());

    c.bench_function("compose_small_document", |b| {
        b.iter(|| {
            composer.compose(
                black_box("<h1>Hello</h1>"),
                black_box("h1 { color: red }"),
                black_box("console.log('hi')"),
                &toggles,
            )
        })
    });
}

fn compose_with_libraries(c: &mut Criterion) {
    let registry = LibraryRegistry::builtin();
    let composer = DocumentComposer::default();
    let mut toggles = LibraryToggleSet::for_registry(&registry);
    for name in ["Tailwind CSS", "React", "D3.js", "GSAP"] {
        toggles.set(&registry, name, true).unwrap();
    }

    let markup = "<div class=\"card\"><p>item</p></div>\n".repeat(500);
    let styles = ".card { padding: 16px; border-radius: 8px; }\n".repeat(200);
    let script = "document.querySelectorAll('.card').forEach(c => c.remove());\n".repeat(100);

    c.bench_function("compose_with_libraries", |b| {
        b.iter(|| composer.compose(black_box(&markup), black_box(&styles), black_box(&script), &toggles))
    });
}

criterion_group!(benches, compose_small_document, compose_with_libraries);
criterion_main!(benches);
