mod common;

use heatmap_flame::heatmap::{BucketRef, HeatmapIndex};
use heatmap_flame::report::StackEncoding;
use heatmap_flame::utils::{DecodeError, QueryError};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn sample_index() -> HeatmapIndex {
    let bundle = common::sample_bundle(StackEncoding::Tree, false);
    let forest = bundle.decode_forest().unwrap();
    HeatmapIndex::new(bundle.heatmap_stream(), Arc::new(forest)).unwrap()
}

/// Fine buckets covered by a bucket reference
fn fine_span(index: &HeatmapIndex, bucket: BucketRef) -> (usize, usize) {
    let mut width = 1;
    for zoom in 1..=bucket.zoom {
        width *= index.level(zoom).unwrap().group_size as usize;
    }
    (bucket.index * width, (bucket.index + 1) * width - 1)
}

#[test]
fn test_levels_and_totals() {
    let mut index = sample_index();
    assert_eq!(index.max_zoom(), 2);
    assert_eq!(index.zoom(), 2);

    assert_eq!(index.heatmap(0).unwrap().totals, vec![4, 2, 5, 0, 3, 3, 2, 2]);
    assert_eq!(index.heatmap(1).unwrap().totals, vec![6, 5, 6, 4]);
    assert_eq!(index.heatmap(2).unwrap().totals, vec![11, 10]);

    let fine = index.heatmap(0).unwrap();
    assert_eq!(fine.group_size, 1);
    assert_eq!(fine.max_total, 5);
    assert_eq!(index.heatmap(1).unwrap().group_size, 2);

    assert!(matches!(
        index.heatmap(3),
        Err(QueryError::IndexOutOfRange { what: "zoom", .. })
    ));
}

#[test]
fn test_coarse_totals_sum_fine_totals() {
    let mut index = sample_index();
    for zoom in 1..=index.max_zoom() {
        let group = index.heatmap(zoom).unwrap().group_size as usize;
        let coarse = index.heatmap(zoom).unwrap().totals.clone();
        let finer = index.heatmap(zoom - 1).unwrap().totals.clone();
        for (i, total) in coarse.iter().enumerate() {
            let sum: u64 = finer[i * group..(i + 1) * group].iter().sum();
            assert_eq!(*total, sum, "zoom {} bucket {}", zoom, i);
        }
    }
}

#[test]
fn test_collect_frames_uses_coarse_groups() {
    let mut index = sample_index();
    index.set_zoom(0).unwrap();

    assert_eq!(
        index.collect_frames(0, 7).unwrap(),
        vec![BucketRef::new(2, 0), BucketRef::new(2, 1)]
    );
    assert_eq!(
        index.collect_frames(1, 6).unwrap(),
        vec![
            BucketRef::new(0, 1),
            BucketRef::new(1, 1),
            BucketRef::new(1, 2),
            BucketRef::new(0, 6),
        ]
    );
    assert_eq!(index.collect_frames(5, 5).unwrap(), vec![BucketRef::new(0, 5)]);
    assert!(index.collect_frames(3, 2).unwrap().is_empty());
    assert!(matches!(
        index.collect_frames(0, 8),
        Err(QueryError::IndexOutOfRange { index: 8, len: 8, .. })
    ));
}

#[test]
fn test_collect_frames_covers_range_exactly_once() {
    let mut index = sample_index();
    index.set_zoom(0).unwrap();
    for from in 0..8 {
        for to in from..8 {
            let buckets = index.collect_frames(from, to).unwrap();
            let mut covered = Vec::new();
            for bucket in buckets {
                let (start, end) = fine_span(&index, bucket);
                covered.extend(start..=end);
            }
            assert_eq!(covered, (from..=to).collect::<Vec<_>>(), "{}..={}", from, to);
        }
    }
}

#[test]
fn test_collect_frames_at_coarser_zoom() {
    let mut index = sample_index();
    index.set_zoom(1).unwrap();
    assert_eq!(index.bucket_count(), 4);
    assert_eq!(
        index.collect_frames(1, 3).unwrap(),
        vec![BucketRef::new(1, 1), BucketRef::new(2, 1)]
    );
}

#[test]
fn test_context_totals_match_index() {
    let mut index = sample_index();
    for zoom in 0..=index.max_zoom() {
        let totals = index.heatmap(zoom).unwrap().totals.clone();
        for (i, &total) in totals.iter().enumerate() {
            let context = index.context(BucketRef::new(zoom, i)).unwrap();
            assert_eq!(context.total(), total);
            assert!(context.failure().is_none());

            // Fully decoded, the root's children account for every sample
            context.load(usize::MAX).unwrap();
            assert!(!context.has_live_stacks());
            let root = context.node(heatmap_flame::stacks::TRIE_ROOT);
            assert_eq!(root.children_weight, root.weight);
        }
    }
}

#[test]
fn test_heat_cells_without_search() {
    let mut index = sample_index();
    index.set_zoom(1).unwrap();
    let cells = index.heat_cells(None).unwrap();
    let values: Vec<u64> = cells.iter().map(|c| c.value).collect();
    assert_eq!(values, vec![6, 5, 6, 4]);
    assert_eq!(cells[0].ratio, 1.0);
    assert!(cells.iter().all(|c| !c.searched));
}

#[test]
fn test_bad_trailer_is_rejected() {
    let bundle = common::sample_bundle(StackEncoding::Tree, false);
    let forest = Arc::new(bundle.decode_forest().unwrap());

    // Claims more zoom levels than the buffer holds
    let mut heatmap = bundle.heatmap.clone();
    heatmap.truncate(heatmap.len() - 5);
    let mut trailer = Vec::new();
    common::push_int30(4000, &mut trailer);
    heatmap.push_str(std::str::from_utf8(&trailer).unwrap());
    let result = HeatmapIndex::new(heatmap.as_str().into(), forest.clone());
    assert!(matches!(
        result,
        Err(QueryError::Decode(DecodeError::BadZoomTrailer(_)))
    ));

    let result = HeatmapIndex::new("??".into(), forest);
    assert!(result.is_err());
}
