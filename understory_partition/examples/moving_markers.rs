// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Moving markers: observe position changes, sync, then hit-test and cull.

use std::cell::Cell;

use understory_partition::{ChangeQueue, PartitionConfig, Point2D, Rect2D, SpacePartition};

struct Marker {
    center: Cell<Point2D<f32>>,
}

fn main() {
    let markers: Vec<Marker> = (0..8_u8)
        .map(|i| Marker {
            center: Cell::new(Point2D::new(f32::from(i) * 40.0, 20.0)),
        })
        .collect();

    let queue = ChangeQueue::new();
    let notifier = queue.notifier();
    let config = PartitionConfig::new(64.0).expect("cell size is positive");
    let mut part =
        SpacePartition::observing(config, |i: &usize| markers[*i].center.get(), queue);
    part.extend(0..markers.len());

    // Drag marker 3 far to the right and report it.
    markers[3].center.set(Point2D::new(600.0, 20.0));
    notifier.notify(3);
    println!("markers that changed cell: {}", part.sync());

    // Hit-test a pointer with a small radius.
    let pointer = Point2D::new(598.0, 22.0);
    println!(
        "under pointer: {:?}",
        part.first_within_radius(6.0, pointer)
    );

    // Cull to a viewport.
    let viewport = Rect2D::new(0.0, 0.0, 200.0, 100.0);
    let mut visible: Vec<_> = part.query_inside_rect(viewport).map(|(i, _)| i).collect();
    visible.sort_unstable();
    println!("visible: {visible:?}");
}
