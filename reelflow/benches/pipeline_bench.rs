//! Benchmarks for pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use reelflow::adapters::parse_caption_reply;
use reelflow::core::{StageName, TranscriptRef, VideoRef};
use reelflow::pipeline::correlate;
use reelflow::testing::{MockPipeline, ScriptedStage};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn full_run(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("full_run");

    for items in [1usize, 16, 128] {
        group.bench_with_input(BenchmarkId::from_parameter(items), &items, |b, &items| {
            b.iter_batched(
                || MockPipeline::new(items).orchestrator(),
                |orchestrator| rt.block_on(async { black_box(orchestrator.run().await.unwrap()) }),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn run_with_random_drops(c: &mut Criterion) {
    let rt = runtime();
    let items = 64;

    c.bench_function("run_with_random_drops", |b| {
        let mut rng = StdRng::seed_from_u64(7);
        b.iter_batched(
            || {
                let dropped = sample(&mut rng, items, items / 4).into_vec();
                MockPipeline::new(items)
                    .with_stage(StageName::Transcribe, ScriptedStage::new("transcribe").dropping(&dropped))
                    .orchestrator()
            },
            |orchestrator| rt.block_on(async { black_box(orchestrator.run().await.unwrap()) }),
            BatchSize::SmallInput,
        );
    });
}

fn correlate_survivors(c: &mut Criterion) {
    let videos: Vec<VideoRef> = (0..1000).map(|i| VideoRef::new(format!("processed_{i}.mp4"))).collect();
    let transcripts: Vec<TranscriptRef> = videos
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 3 != 0)
        .map(|(_, v)| TranscriptRef::new(v.clone(), format!("{}.txt", v.file_stem())))
        .collect();

    c.bench_function("correlate_1000", |b| {
        b.iter(|| black_box(correlate(&videos, &transcripts).unwrap()));
    });
}

fn caption_parsing(c: &mut Criterion) {
    let reply = "Here you go!\nCAPTION: Golden hour over the harbour\nHASHTAGS: #Sunset #harbour #golden_hour #travel #sunset #photo";
    c.bench_function("parse_caption_reply", |b| {
        b.iter(|| black_box(parse_caption_reply(black_box(reply), 5).unwrap()));
    });
}

criterion_group!(benches, full_run, run_with_random_drops, correlate_survivors, caption_parsing);
criterion_main!(benches);
