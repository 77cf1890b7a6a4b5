#![feature(test)]

extern crate test;

use bytetrack::examples::DetectionGen;
use bytetrack::prelude::{ByteTrack, ByteTrackOptions};
use test::Bencher;

#[bench]
fn bench_bytetrack_00010(b: &mut Bencher) {
    bench_bytetrack(10, b);
}

#[bench]
fn bench_bytetrack_00100(b: &mut Bencher) {
    bench_bytetrack(100, b);
}

#[bench]
fn bench_bytetrack_00500(b: &mut Bencher) {
    bench_bytetrack(500, b);
}

fn bench_bytetrack(objects: usize, b: &mut Bencher) {
    let side = 200.0 * (objects as f32).sqrt();
    let mut frames = DetectionGen::new(1, objects, side, side)
        .miss_probability(0.05)
        .low_confidence_probability(0.2);
    let mut tracker = ByteTrack::new(ByteTrackOptions::default()).unwrap();

    b.iter(|| {
        let frame = frames.next().unwrap();
        let detections = DetectionGen::detections(&frame);
        tracker.update(&detections).unwrap();
    });
}
