use criterion::{black_box, criterion_group, criterion_main, Criterion};

use maloney_tagger::edit::engine::build_batch_frames;
use maloney_tagger::episode::{EpisodeRecord, ProgramProfile};
use maloney_tagger::id3::{parse_tag, tags::Id3Tag, writer::render_tag};
use maloney_tagger::EditBatch;

fn episode_tag() -> Id3Tag {
    let record = EpisodeRecord {
        title: "Der Fall".into(),
        alternative_titles: Vec::new(),
        episode_number: "042".into(),
        date: "2020-05-01".into(),
        lead: Some("Maloney ermittelt in einem Fall, der keiner ist.".into()),
        remote_id: None,
    };
    let edits = ProgramProfile::default().render_edits(&record);
    let batch = EditBatch::from_edits(&edits, false).unwrap();
    let mut tag = Id3Tag::new();
    for frame in build_batch_frames(&batch, false).unwrap() {
        tag.apply(frame);
    }
    tag
}

fn bench_render(c: &mut Criterion) {
    let tag = episode_tag();
    c.bench_function("render_episode_tag", |b| b.iter(|| render_tag(black_box(&tag))));
}

fn bench_parse(c: &mut Criterion) {
    let mut data = render_tag(&episode_tag());
    data.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
    c.bench_function("parse_episode_tag", |b| {
        b.iter(|| parse_tag(black_box(&data)).unwrap())
    });
}

criterion_group!(benches, bench_render, bench_parse);
criterion_main!(benches);
