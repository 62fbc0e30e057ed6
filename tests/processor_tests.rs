use std::sync::Arc;
use std::time::Duration;
use tabulated::point::points_from_pairs;
use tabulated::{ChunkedPointProcessor, Point, ProcessorConfig, ProcessorError};

fn ramp(n: usize) -> Vec<Point> {
    (0..n).map(|i| Point::new(i as f64, i as f64 * 10.0)).collect()
}

fn config(max_points: usize, chunk_size: usize) -> ProcessorConfig {
    ProcessorConfig::new(max_points, chunk_size)
}

/// Filtering keeps the survivors in their original relative order
#[tokio::test]
async fn test_filter_preserves_order() {
    let processor = ChunkedPointProcessor::new(ramp(25), config(100, 4));
    processor.filter_points(|p| p.x as usize % 3 == 0).await.unwrap();

    let xs: Vec<f64> = processor.points().iter().map(|p| p.x).collect();
    assert_eq!(xs, vec![0.0, 3.0, 6.0, 9.0, 12.0, 15.0, 18.0, 21.0, 24.0]);
    assert!(processor.last_error().is_none());
    assert!(!processor.is_processing());
}

#[tokio::test]
async fn test_filter_on_empty_set() {
    let processor = ChunkedPointProcessor::new(Vec::new(), config(100, 4));
    processor.filter_points(|_| true).await.unwrap();
    assert!(processor.is_empty());
}

#[tokio::test]
async fn test_add_points_within_and_over_limit() {
    let processor = ChunkedPointProcessor::new(ramp(3), config(5, 2));
    let extra = points_from_pairs(&[(10.0, 1.0), (11.0, 2.0)]);
    processor.add_points(extra.clone()).unwrap();

    let mut expected = ramp(3);
    expected.extend(extra);
    assert_eq!(processor.points().as_slice(), expected.as_slice());

    let err = processor.add_points(ramp(1)).unwrap_err();
    assert_eq!(err, ProcessorError::LimitExceeded { max: 5, requested: 6 });
    assert_eq!(processor.points().as_slice(), expected.as_slice());
    assert_eq!(processor.last_error(), Some(err));
}

#[tokio::test]
async fn test_check_limit_does_not_mutate() {
    let processor = ChunkedPointProcessor::new(ramp(10), config(100, 4));
    assert!(!processor.check_limit(101));
    assert_eq!(processor.len(), 10);
    let message = processor.last_error().unwrap().to_string();
    assert!(message.contains("100"));
    assert!(message.contains("101"));
}

/// With two points per chunk only the repeat inside the first chunk goes
#[tokio::test]
async fn test_remove_duplicates_is_chunk_local() {
    let points = points_from_pairs(&[(1.0, 1.0), (1.0, 1.0), (2.0, 2.0), (1.0, 1.0)]);
    let processor = ChunkedPointProcessor::new(points, config(100, 2));
    processor.remove_duplicates().await.unwrap();

    assert_eq!(
        processor.points().as_slice(),
        points_from_pairs(&[(1.0, 1.0), (2.0, 2.0), (1.0, 1.0)]).as_slice()
    );
}

#[tokio::test]
async fn test_remove_duplicates_global_catches_cross_chunk_repeats() {
    let points = points_from_pairs(&[(1.0, 1.0), (1.0, 1.0), (2.0, 2.0), (1.0, 1.0), (2.0, 2.0)]);
    let processor = ChunkedPointProcessor::new(points, config(100, 2));
    processor.remove_duplicates_global().await.unwrap();

    assert_eq!(
        processor.points().as_slice(),
        points_from_pairs(&[(1.0, 1.0), (2.0, 2.0)]).as_slice()
    );
}

#[tokio::test]
async fn test_compress_ten_to_three() {
    let processor = ChunkedPointProcessor::new(ramp(10), config(100, 4));
    processor.compress_data(3).unwrap();

    let points = processor.points();
    assert_eq!(points.len(), 3);
    // segment sizes 3, 3, 4
    assert_eq!(points[0], Point::new(1.0, 10.0));
    assert_eq!(points[1], Point::new(4.0, 40.0));
    assert_eq!(points[2], Point::new(7.5, 75.0));
}

/// A heavy last point must reach the last segment for every split
#[tokio::test]
async fn test_compress_keeps_the_last_point() {
    let mut points: Vec<Point> = (0..15).map(|i| Point::new(i as f64, 0.0)).collect();
    points[14].y = 1500.0;
    let processor = ChunkedPointProcessor::new(points, config(100, 4));
    processor.compress_data(11).unwrap();

    let compressed = processor.points();
    assert_eq!(compressed.len(), 11);
    // last segment is [13, 15)
    assert_eq!(compressed[10], Point::new(13.5, 750.0));
}

#[tokio::test]
async fn test_compress_segments_cover_the_whole_set() {
    for n in 3..200usize {
        for k in 2..n {
            let mut cfg = config(1_000, 64);
            cfg.progress_reset_ms = 0;
            let processor = ChunkedPointProcessor::new(ramp(n), cfg);
            processor.compress_data(k).unwrap();
            let compressed = processor.points();
            assert_eq!(compressed.len(), k, "n={} k={}", n, k);

            let mut covered = 0.0;
            for (i, point) in compressed.iter().enumerate() {
                let start = i * n / k;
                let end = (i + 1) * n / k;
                let size = (end - start) as f64;
                let expected_x = (start + end - 1) as f64 / 2.0;
                assert!((point.x - expected_x).abs() < 1e-9, "n={} k={} i={}", n, k, i);
                assert!((point.y - expected_x * 10.0).abs() < 1e-6, "n={} k={} i={}", n, k, i);
                covered += point.x * size;
            }
            let sum_x = (n * (n - 1) / 2) as f64;
            assert!((covered - sum_x).abs() < 1e-6, "n={} k={}", n, k);
        }
    }
}

#[tokio::test]
async fn test_compress_invalid_target_is_reported() {
    let processor = ChunkedPointProcessor::new(ramp(10), config(100, 4));
    for target in [0, 1, 10, 11] {
        let err = processor.compress_data(target).unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidArgument(_)));
        assert_eq!(processor.len(), 10);
    }
}

#[tokio::test]
async fn test_statistics_of_a_line() {
    let processor = ChunkedPointProcessor::new(
        points_from_pairs(&[(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)]),
        config(100, 4),
    );
    let stats = processor.statistics().unwrap();
    assert_eq!((stats.x_range.min, stats.x_range.max, stats.x_range.span), (0.0, 2.0, 2.0));
    assert_eq!((stats.y_range.min, stats.y_range.max, stats.y_range.span), (1.0, 3.0, 2.0));
    assert_eq!(stats.y_statistics.average, 2.0);
    assert_eq!(stats.duplicates, 0);
    assert!(stats.is_sorted);
    // statistics never touch the set
    assert_eq!(processor.len(), 3);
}

#[tokio::test]
async fn test_points_for_rendering_decimates() {
    let processor = ChunkedPointProcessor::new(ramp(10), config(100, 4));
    let view = processor.points_for_rendering(2);
    assert_eq!(view, vec![Point::new(0.0, 0.0), Point::new(5.0, 50.0)]);
    assert_eq!(processor.len(), 10);
    assert_eq!(processor.points_for_rendering(10).len(), 10);
}

#[tokio::test]
async fn test_interpolation_uses_original_neighbours() {
    let points = points_from_pairs(&[
        (0.0, 0.0),
        (1.0, f64::NAN),
        (2.0, 4.0),
        (3.0, f64::NAN),
        (5.0, 10.0),
        (6.0, f64::NAN),
    ]);
    // chunk boundaries fall between each NaN point and one of its neighbours
    let processor = ChunkedPointProcessor::new(points, config(100, 2));
    processor.interpolate_missing().await.unwrap();

    let points = processor.points();
    assert_eq!(points[1], Point::new(1.0, 2.0));
    assert_eq!(points[3], Point::new(3.0, 6.0));
    // last point has no successor
    assert!(points[5].y.is_nan());
}

#[tokio::test]
async fn test_interpolation_of_a_single_point_is_a_no_op() {
    let processor =
        ChunkedPointProcessor::new(points_from_pairs(&[(0.0, f64::NAN)]), config(10, 2));
    processor.interpolate_missing().await.unwrap();
    assert!(processor.points()[0].y.is_nan());
}

#[tokio::test]
async fn test_small_sort_is_global() {
    let points = points_from_pairs(&[(3.0, 0.0), (1.0, 0.0), (2.0, 0.0), (0.0, 0.0)]);
    let processor = ChunkedPointProcessor::new(points, config(100, 2));
    processor.sort_points(|a, b| a.x.total_cmp(&b.x)).await.unwrap();
    let xs: Vec<f64> = processor.points().iter().map(|p| p.x).collect();
    assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0]);
}

/// Above the threshold chunks are sorted separately and merged back together
#[tokio::test]
async fn test_large_sort_merges_chunks() {
    let mut cfg = config(10_000, 7);
    cfg.sort_threshold = 10;
    let points: Vec<Point> = (0..100)
        .map(|i| Point::new(((i * 37) % 100) as f64, i as f64))
        .collect();
    let processor = ChunkedPointProcessor::new(points, cfg);

    processor
        .sort_points(|a, b| b.x.total_cmp(&a.x))
        .await
        .unwrap();

    let xs: Vec<f64> = processor.points().iter().map(|p| p.x).collect();
    let expected: Vec<f64> = (0..100).rev().map(|i| i as f64).collect();
    assert_eq!(xs, expected);
}

#[tokio::test]
async fn test_large_sort_is_stable() {
    let mut cfg = config(10_000, 3);
    cfg.sort_threshold = 4;
    // y records the original position
    let points: Vec<Point> = (0..20).map(|i| Point::new((i % 2) as f64, i as f64)).collect();
    let processor = ChunkedPointProcessor::new(points, cfg);
    processor.sort_points(|a, b| a.x.total_cmp(&b.x)).await.unwrap();

    let ys: Vec<f64> = processor.points().iter().map(|p| p.y).collect();
    let mut expected: Vec<f64> = (0..20).step_by(2).map(|i| i as f64).collect();
    expected.extend((1..20).step_by(2).map(|i| i as f64));
    assert_eq!(ys, expected);
}

#[tokio::test]
async fn test_failed_chunk_leaves_set_untouched() {
    let processor = ChunkedPointProcessor::new(ramp(10), config(100, 3));
    let before = processor.points();

    let err = processor
        .map_chunks("scaling", |chunk, index| {
            if index == 2 {
                return Err("chunk 2 is corrupt");
            }
            Ok(chunk.iter().map(|p| Point::new(p.x, p.y * 2.0)).collect())
        })
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "scaling failed: chunk 2 is corrupt");
    assert_eq!(processor.last_error(), Some(err));
    assert_eq!(processor.points(), before);
    assert!(!processor.is_processing());
    // progress stays where the failing chunk started: chunk 2 of 4
    assert_eq!(processor.progress(), 50.0);

    processor.clear_error();
    assert!(processor.last_error().is_none());
}

#[tokio::test]
async fn test_map_chunks_sees_every_chunk_in_order() {
    let processor = ChunkedPointProcessor::new(ramp(10), config(100, 4));
    let mut seen = Vec::new();
    processor
        .map_chunks("probe", |chunk, index| {
            seen.push((index, chunk.len()));
            Ok::<_, String>(chunk.to_vec())
        })
        .await
        .unwrap();
    assert_eq!(seen, vec![(0, 4), (1, 4), (2, 2)]);
}

#[tokio::test]
async fn test_map_chunks_respects_limit() {
    let processor = ChunkedPointProcessor::new(ramp(4), config(6, 2));
    let err = processor
        .map_chunks("doubling", |chunk, _| {
            Ok::<_, String>(chunk.iter().chain(chunk.iter()).copied().collect())
        })
        .await
        .unwrap_err();
    assert_eq!(err, ProcessorError::LimitExceeded { max: 6, requested: 8 });
    assert_eq!(processor.len(), 4);
}

/// Starting an operation while another is in flight is rejected
#[tokio::test]
async fn test_overlapping_operation_is_rejected() {
    let processor = ChunkedPointProcessor::new(ramp(6), config(100, 3));
    let mut inner = Vec::new();

    processor
        .map_chunks("outer", |chunk, _| {
            inner.push((processor.is_processing(), processor.add_points(ramp(1))));
            Ok::<_, String>(chunk.to_vec())
        })
        .await
        .unwrap();

    assert_eq!(inner.len(), 2);
    for (busy, result) in inner {
        assert!(busy);
        assert_eq!(result, Err(ProcessorError::Busy));
    }
    assert_eq!(processor.len(), 6);
    assert!(!processor.is_processing());
    processor.add_points(ramp(1)).unwrap();
}

#[tokio::test]
async fn test_concurrent_tasks_share_one_slot() {
    let processor = Arc::new(ChunkedPointProcessor::new(ramp(3000), config(10_000, 1000)));

    // chunks above the yield threshold give the second future a chance to run
    let (first, second) = tokio::join!(
        processor.filter_points(|_| true),
        processor.remove_duplicates()
    );

    assert!(first.is_ok());
    assert_eq!(second, Err(ProcessorError::Busy));
    assert_eq!(processor.len(), 3000);
}

#[tokio::test]
async fn test_progress_reaches_100_then_resets() {
    let mut cfg = config(10_000, 100);
    cfg.progress_reset_ms = 20;
    let processor = ChunkedPointProcessor::new(ramp(1000), cfg);
    let mut progress = processor.subscribe_progress();

    processor.filter_points(|_| true).await.unwrap();
    assert_eq!(processor.progress(), 100.0);
    assert_eq!(*progress.borrow_and_update(), 100.0);

    tokio::time::timeout(Duration::from_secs(2), progress.changed())
        .await
        .expect("progress was never reset")
        .unwrap();
    assert_eq!(processor.progress(), 0.0);
}

/// A reset scheduled by an earlier operation must not clear a later one
#[tokio::test]
async fn test_stale_reset_leaves_newer_progress_alone() {
    let mut cfg = config(10_000, 100);
    cfg.progress_reset_ms = 400;
    let processor = ChunkedPointProcessor::new(ramp(200), cfg);

    processor.filter_points(|_| true).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    processor.filter_points(|_| true).await.unwrap();

    // the first reset has fired by now, the second has not
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(processor.progress(), 100.0);

    let mut progress = processor.subscribe_progress();
    if *progress.borrow_and_update() != 0.0 {
        tokio::time::timeout(Duration::from_secs(2), progress.changed())
            .await
            .expect("progress was never reset")
            .unwrap();
    }
    assert_eq!(processor.progress(), 0.0);
}

#[tokio::test]
async fn test_progress_counts_chunks() {
    let processor = ChunkedPointProcessor::new(ramp(8), config(100, 2));
    let mut observed = Vec::new();
    processor
        .map_chunks("observe", |chunk, _| {
            observed.push(processor.progress());
            Ok::<_, String>(chunk.to_vec())
        })
        .await
        .unwrap();
    assert_eq!(observed, vec![0.0, 25.0, 50.0, 75.0]);
}

#[tokio::test]
async fn test_replace_points_checks_limit() {
    let processor = ChunkedPointProcessor::new(ramp(2), config(3, 2));
    assert!(processor.replace_points(ramp(4)).is_err());
    assert_eq!(processor.len(), 2);
    processor.replace_points(ramp(3)).unwrap();
    assert_eq!(processor.points().as_slice(), ramp(3).as_slice());
}
