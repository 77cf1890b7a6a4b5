#![feature(test)]

extern crate test;

use bytetrack::examples::BoxGen;
use bytetrack::utils::bbox::AspectBox;
use bytetrack::utils::kalman::kalman_bbox::BoundingBoxKalmanFilter;
use test::Bencher;

#[bench]
fn kalman_bbox_10k(b: &mut Bencher) {
    const N: usize = 10_000;
    let f = BoundingBoxKalmanFilter::default();
    let mut boxes = BoxGen::new(3, 0.0, 0.0, 20.0, 40.0, 2.0, 0.2).with_velocity(1.0, 0.5);

    b.iter(|| {
        let mut state = f.initiate(&AspectBox::from(boxes.next().unwrap()));
        for _ in 0..N {
            state = f.predict(&state);
            let bbox = AspectBox::from(boxes.next().unwrap());
            state = f.update(&state, &bbox).unwrap();
        }
    });
}
