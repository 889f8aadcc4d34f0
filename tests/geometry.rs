use mazeroute::geometry::{
    distance::{segment_crossing, segments_intersect},
    ConvexPolygon, IntBox, IntOctagon, IntPoint, ItemShape, Polyline, TileShape, TileShapeTrait,
};

#[test]
fn test_box_operations() {
    let bbox = IntBox::from_coords(100, 100, 0, 0);

    assert_eq!(bbox.ll, IntPoint::new(0, 0));
    assert_eq!(bbox.center(), IntPoint::new(50, 50));
    assert_eq!(bbox.offset(10), IntBox::from_coords(-10, -10, 110, 110));
    assert_eq!(
        bbox.intersection(&IntBox::from_coords(50, 50, 200, 200)),
        Some(IntBox::from_coords(50, 50, 100, 100))
    );
    assert_eq!(bbox.intersection(&IntBox::from_coords(150, 150, 200, 200)), None);
    assert!(bbox.contains(IntPoint::new(100, 0)));
}

#[test]
fn test_octagon_around() {
    let octagon = IntOctagon::around(IntPoint::new(1000, 1000), 100);

    assert!(octagon.contains(IntPoint::new(1100, 1000)));
    assert!(octagon.contains(IntPoint::new(1060, 1060)));
    assert!(!octagon.contains(IntPoint::new(1095, 1095)));
    assert_eq!(octagon.bounding_box(), IntBox::from_coords(900, 900, 1100, 1100));
    assert_eq!(octagon.corners().len(), 8);
}

#[test]
fn test_convex_hull() {
    let polygon = ConvexPolygon::new([
        IntPoint::new(0, 0),
        IntPoint::new(100, 0),
        IntPoint::new(50, 50),
        IntPoint::new(100, 100),
        IntPoint::new(0, 100),
    ]);

    assert_eq!(polygon.corners().len(), 4);
    assert!(polygon.contains(IntPoint::new(50, 50)));
    assert!(!polygon.contains(IntPoint::new(101, 50)));
}

#[test]
fn test_distances() {
    let bbox = ItemShape::Tile(TileShape::Box(IntBox::from_coords(0, 0, 100, 100)));
    let segment = ItemShape::Segment {
        from: IntPoint::new(200, 0),
        to: IntPoint::new(200, 100),
        half_width: 20,
    };

    assert_eq!(bbox.distance(&segment), 80.0);
    assert!(!bbox.intersects(&segment));
    assert!(bbox.intersects(&ItemShape::point(IntPoint::new(110, 50), 10)));

    let diagonal = ItemShape::Tile(TileShape::Box(IntBox::from_coords(130, 140, 200, 200)));
    assert_eq!(bbox.distance(&diagonal), 50.0);
}

#[test]
fn test_segment_crossing() {
    assert_eq!(
        segment_crossing(
            IntPoint::new(0, 0),
            IntPoint::new(100, 100),
            IntPoint::new(0, 100),
            IntPoint::new(100, 0),
        ),
        Some(IntPoint::new(50, 50))
    );
    assert_eq!(
        segment_crossing(
            IntPoint::new(0, 0),
            IntPoint::new(3, 1),
            IntPoint::new(0, 1),
            IntPoint::new(3, 0),
        ),
        None
    );
    assert!(segments_intersect(
        IntPoint::new(0, 0),
        IntPoint::new(100, 0),
        IntPoint::new(100, 0),
        IntPoint::new(100, 100),
    ));
}

#[test]
fn test_polyline_split_and_combine() {
    let polyline = Polyline::new([
        IntPoint::new(0, 0),
        IntPoint::new(1000, 0),
        IntPoint::new(1000, 1000),
    ]);

    assert!(polyline.split_at(IntPoint::new(0, 0)).is_none());
    assert!(polyline.split_at(IntPoint::new(500, 500)).is_none());

    let (first, second) = polyline.split_at(IntPoint::new(500, 0)).unwrap();
    assert_eq!(first.corners(), &[IntPoint::new(0, 0), IntPoint::new(500, 0)]);
    assert_eq!(
        second.corners(),
        &[
            IntPoint::new(500, 0),
            IntPoint::new(1000, 0),
            IntPoint::new(1000, 1000)
        ]
    );

    assert_eq!(second.reverse().combine(&first).unwrap().corners(), polyline.reverse().corners());
    assert_eq!(first.combine(&second), Some(polyline.clone()));
    assert!(first.is_covered_by(&polyline));
    assert!(!polyline.is_covered_by(&first));
    assert_eq!(polyline.length(), 2000.0);
    assert_eq!(polyline.bend_count(), 1);
}
