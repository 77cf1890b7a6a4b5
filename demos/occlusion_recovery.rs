use anyhow::Result;
use bytetrack::examples::BoxGen;
use bytetrack::prelude::{ByteTrack, ByteTrackOptions, Detection};

/// A pedestrian walks behind an obstacle: the detector first reports it with a falling
/// confidence, then loses it for a few frames. The track survives both phases.
///
fn main() -> Result<()> {
    env_logger::init();

    let mut tracker = ByteTrack::new(ByteTrackOptions::default().keep_wasted(true))?;
    let walker = BoxGen::new(7, 100.0, 200.0, 40.0, 100.0, 0.5, 0.1).with_velocity(4.0, 0.0);

    for (frame, bbox) in walker.enumerate().take(60) {
        let confidence = match frame {
            0..=19 => 0.9,
            20..=29 => 0.35,
            30..=34 => 0.0,
            _ => 0.85,
        };

        let detections = if confidence > 0.0 {
            vec![Detection::new(bbox, confidence)?.with_frame(frame)]
        } else {
            Vec::default()
        };

        let tracks = tracker.update(&detections)?;
        let reported = tracks
            .iter()
            .map(|t| format!("#{} {:.2}", t.id, t.confidence))
            .collect::<Vec<_>>();
        eprintln!(
            "Frame {frame:>2}, confidence {confidence:.2}: reported {reported:?}, lost {:?}",
            tracker
                .idle_tracks()
                .iter()
                .map(|t| t.id)
                .collect::<Vec<_>>()
        );
    }

    eprintln!("Removed tracks: {}", tracker.wasted().len());
    Ok(())
}
