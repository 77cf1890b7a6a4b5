use anyhow::Result;
use bytetrack::examples::DetectionGen;
use bytetrack::prelude::{ByteTrack, ByteTrackOptions};
use log::info;
use std::collections::{HashMap, HashSet};
use std::time::Instant;

fn main() -> Result<()> {
    env_logger::init();

    let opts = ByteTrackOptions::default().lost_track_buffer(30, 25.0);
    let mut tracker = ByteTrack::new(opts)?;

    let objects = 40;
    let frames = DetectionGen::new(42, objects, 1920.0, 1080.0)
        .miss_probability(0.05)
        .low_confidence_probability(0.2)
        .take(500)
        .collect::<Vec<_>>();

    // object index -> track ids it was reported with
    let mut identities: HashMap<usize, HashSet<u64>> = HashMap::default();

    let started = Instant::now();
    for frame in &frames {
        let detections = DetectionGen::detections(frame);
        let tracks = tracker.update(&detections)?;

        for t in &tracks {
            if t.epoch != tracker.current_epoch() {
                continue;
            }
            let object = frame
                .iter()
                .find(|(_, d)| d.bbox() == &t.observed_bbox)
                .map(|(i, _)| *i);
            if let Some(object) = object {
                identities.entry(object).or_default().insert(t.id);
            }
        }
    }
    let elapsed = started.elapsed();

    let switches = identities
        .values()
        .map(|ids| ids.len().saturating_sub(1))
        .sum::<usize>();

    info!(
        "{} frames with {} objects processed in {:?}",
        frames.len(),
        objects,
        elapsed
    );
    eprintln!("Identity switches: {switches}");
    eprintln!("Tracks alive: {}", tracker.active_tracks().len());
    eprintln!("Tracks lost: {}", tracker.idle_tracks().len());
    Ok(())
}
