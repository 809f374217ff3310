use std::collections::HashMap;

use rrslice::compare::{compare, hash_sequence, sequence_eq, unify, SequenceKey, SliceOrdering};
use rrslice::registry::{CatalogRegistry, MemoryShapeStore};
use rrslice::{apply_shape, Error, Shape, ShapeId, ShapeRegistry, Timeslice, Timestamp};

fn registry() -> CatalogRegistry<MemoryShapeStore> {
    CatalogRegistry::new(MemoryShapeStore::new())
}

fn ts(seconds: i64) -> Timestamp {
    Timestamp::from_unix_seconds(seconds).expect("timestamp")
}

#[test]
fn registration_is_idempotent_across_many_shapes() {
    let registry = registry();
    for len in 1..20 {
        for count in 1..5 {
            let first = registry.register_shape(len, count).expect("register");
            let second = registry.register_shape(len, count).expect("register again");
            assert_eq!(first, second, "shape ({len}, {count})");
        }
    }
    assert_eq!(registry.store().len(), 19 * 4);
}

#[test]
fn boundary_timestamps_close_their_bucket() {
    let shape = Shape::new(60, 5).expect("shape");
    for minute in [0_i64, 1, 7, 1_440, 22_264_441] {
        let boundary = ts(minute * 60);
        let bucket = apply_shape(boundary, shape).expect("bucket");
        assert_eq!(bucket.upper, boundary);
        assert_eq!(i64::from(bucket.sequence), minute % 5);
    }
}

#[test]
fn buckets_wrap_after_one_cycle() {
    let shape = Shape::new(10, 3).expect("shape");
    let t = 1_335_866_403;
    let buckets: Vec<_> = [t, t + 30, t + 60]
        .iter()
        .map(|&s| apply_shape(ts(s), shape).expect("bucket"))
        .collect();
    assert!(buckets.iter().all(|b| b.sequence == buckets[0].sequence));
    assert_eq!(
        buckets[1].upper.as_micros() - buckets[0].upper.as_micros(),
        30_000_000
    );
    assert_eq!(
        buckets[2].upper.as_micros() - buckets[1].upper.as_micros(),
        30_000_000
    );
}

#[test]
fn unshaped_value_unifies_onto_shaped_one() {
    let registry = registry();
    let id = registry.register_shape(60, 5).expect("register");
    let mut a = Timeslice::from_timestamp(ts(120), id, &registry).expect("a");
    assert_eq!(a.sequence(), 2);

    let mut b = Timeslice::unsliced(a.timestamp());
    let original_a = a;
    unify(&mut a, &mut b, &registry).expect("unify");
    assert_eq!(a, original_a);
    assert_eq!(b.shape_id(), id);
    assert_eq!(b.sequence(), 2);

    let raw = Timeslice::unsliced(original_a.timestamp());
    assert_eq!(
        compare(Some(&original_a), Some(&raw), &registry).expect("compare"),
        SliceOrdering::Equal
    );
    assert_eq!(
        compare(Some(&raw), Some(&original_a), &registry)
            .expect("compare")
            .code(),
        0
    );
}

#[test]
fn conflicting_shapes_cannot_be_compared() {
    let registry = registry();
    let coarse = registry.register_shape(60, 5).expect("register");
    let fine = registry.register_shape(30, 10).expect("register");
    let a = Timeslice::from_timestamp(ts(600), coarse, &registry).expect("a");
    let b = Timeslice::from_timestamp(ts(600), fine, &registry).expect("b");
    let err = compare(Some(&a), Some(&b), &registry).expect_err("must fail");
    assert!(matches!(
        err,
        Error::IncomparableShapes { left, right } if left == coarse && right == fine
    ));
}

#[test]
fn unshaped_text_round_trips() {
    let registry = registry();
    for text in [
        "2012-05-01 10:00:00+00",
        "2012-05-01T12:30:15.5+02:00",
        "1969-07-20 20:17:40Z",
        "epoch",
    ] {
        let value = Timeslice::parse(text, ShapeId::UNSPECIFIED, &registry).expect("parse");
        let rendered = value.format(&registry).expect("format");
        let reparsed =
            Timeslice::parse(&rendered, ShapeId::UNSPECIFIED, &registry).expect("reparse");
        assert_eq!(reparsed.timestamp(), value.timestamp(), "{text} -> {rendered}");
    }
}

#[test]
fn trailing_whitespace_is_rejected_by_the_parser() {
    let registry = registry();
    let err = Timeslice::parse("2012-05-01 10:00:00 ", ShapeId::UNSPECIFIED, &registry)
        .expect_err("trailing space");
    assert!(matches!(err, Error::InvalidFormat(_)));
}

#[test]
fn rebind_guard() {
    let registry = registry();
    let id = registry.register_shape(60, 5).expect("register");
    let sliced = Timeslice::from_timestamp(ts(61), id, &registry).expect("sliced");
    assert_ne!(sliced.sequence(), 0);
    assert!(matches!(
        sliced.rebind(id, &registry),
        Err(Error::IncompatibleShape)
    ));

    let fresh = Timeslice::parse("2012-05-01 10:00:30", ShapeId::UNSPECIFIED, &registry)
        .expect("parse");
    let rebound = fresh.rebind(id, &registry).expect("rebind");
    let direct = Timeslice::from_timestamp(fresh.timestamp(), id, &registry).expect("direct");
    assert_eq!(rebound, direct);
}

#[test]
fn sequence_hash_groups_slots() {
    let registry = registry();
    let id = registry.register_shape(60, 5).expect("register");
    let values: Vec<Timeslice> = (0..50)
        .map(|minute| Timeslice::from_timestamp(ts(minute * 60), id, &registry).expect("value"))
        .collect();

    let mut groups: HashMap<SequenceKey, usize> = HashMap::new();
    for value in &values {
        *groups.entry(SequenceKey::from(value)).or_default() += 1;
    }
    assert_eq!(groups.len(), 5);
    assert!(groups.values().all(|&n| n == 10));

    for pair in values.windows(6) {
        let (first, sixth) = (&pair[0], &pair[5]);
        assert!(sequence_eq(Some(first), Some(sixth), &registry).expect("eq"));
        assert_eq!(hash_sequence(first), hash_sequence(sixth));
    }
    assert_ne!(hash_sequence(&values[0]), hash_sequence(&values[1]));
}

#[test]
fn out_of_range_inputs_are_rejected() {
    let registry = registry();
    let err = Timeslice::parse("9999-12-31 23:00:00-05", ShapeId::UNSPECIFIED, &registry)
        .expect_err("past the last representable day");
    assert!(matches!(err, Error::InvalidFormat(_)));

    let weekly = registry.register_shape(604_800, 2).expect("register");
    let err = Timeslice::parse("9999-12-31 12:00:00", weekly, &registry)
        .expect_err("bucket boundary past the range");
    assert!(matches!(err, Error::TimestampOutOfRange));

    let unsliced = Timeslice::parse("9999-12-31 12:00:00", ShapeId::UNSPECIFIED, &registry)
        .expect("raw value fits");
    assert!(matches!(
        unsliced.rebind(weekly, &registry),
        Err(Error::TimestampOutOfRange)
    ));
}

#[test]
fn weekly_ring_lines_up_with_saturdays() {
    let registry = registry();
    let weekly = registry.register_shape(604_800, 4).expect("register");
    let value = Timeslice::parse("2000-01-05 12:00:00", weekly, &registry).expect("parse");
    assert_eq!(
        value.format(&registry).expect("format"),
        "(2000-01-01 00:00:00+00, 2000-01-08 00:00:00+00] #1/4"
    );
}
