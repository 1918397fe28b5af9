use std::collections::HashSet;
use std::path::PathBuf;

use vidlane_catalog::{CatalogInput, StaticProbe};
use vidlane_common::config::{ElementType, InterleaveMode, ReaderConfiguration};
use vidlane_common::error::{VidlaneError, VidlaneResult};
use vidlane_reader::{Batch, SyntheticExtractor, VideoReader};

fn build(lengths: &[u64], config: ReaderConfiguration) -> VideoReader<SyntheticExtractor> {
    build_with(lengths, config, SyntheticExtractor::default())
}

fn build_with(
    lengths: &[u64],
    config: ReaderConfiguration,
    extractor: SyntheticExtractor,
) -> VideoReader<SyntheticExtractor> {
    vidlane_common::logging::init_test_logging();
    let (probe, paths) = StaticProbe::from_lengths(lengths);
    VideoReader::<SyntheticExtractor>::builder(config)
        .input(CatalogInput::Paths(paths))
        .build(&probe, extractor)
        .expect("reader builds")
}

fn config(batch_size: usize, interleave_size: usize, mode: InterleaveMode) -> ReaderConfiguration {
    ReaderConfiguration {
        batch_size,
        interleave_size,
        interleave_mode: mode,
        element_type: ElementType::Uint8,
        ..Default::default()
    }
}

/// Frame index decoded from the first pixel of every sequence in `batch`.
fn first_frames(batch: &Batch) -> Vec<u64> {
    let data = batch.data.as_u8().expect("uint8 payload");
    let len = batch.sequence_len();
    (0..batch.len())
        .map(|i| SyntheticExtractor::decode_pixel(&data[i * len..i * len + 3]).0)
        .collect()
}

fn drain(reader: &mut VideoReader<SyntheticExtractor>) -> Vec<Batch> {
    reader
        .by_ref()
        .collect::<VidlaneResult<Vec<_>>>()
        .expect("every batch decodes")
}

#[test]
fn shorten_with_one_source_set_ends_after_shortest_source() {
    let mut reader = build(&[10, 10, 10, 10], config(4, 4, InterleaveMode::Shorten));
    assert_eq!(reader.meta().epoch_size, 10);

    let batches = drain(&mut reader);
    assert_eq!(batches.len(), 10);
    for (t, batch) in batches.iter().enumerate() {
        assert_eq!(batch.labels, vec![0, 1, 2, 3]);
        assert_eq!(batch.timestamps, vec![t as u64; 4]);
        assert_eq!(first_frames(batch), vec![t as u64; 4]);
    }
    assert!(reader.next_batch().unwrap().is_none());
}

#[test]
fn clamp_freezes_the_short_lane() {
    let mut reader = build(&[10, 10, 5, 10], config(4, 4, InterleaveMode::Clamp));
    let batches = drain(&mut reader);
    assert_eq!(batches.len(), 10);

    let lane2: Vec<u64> = batches.iter().map(|b| b.timestamps[2]).collect();
    assert_eq!(lane2, vec![0, 1, 2, 3, 4, 4, 4, 4, 4, 4]);
    let lane0: Vec<u64> = batches.iter().map(|b| b.timestamps[0]).collect();
    assert_eq!(lane0, (0..10).collect::<Vec<_>>());
    assert_eq!(first_frames(&batches[9])[2], 4);
}

#[test]
fn continuous_mode_wraps_and_counts_epochs() {
    let mut reader = build(
        &[10, 10, 10, 10],
        config(4, 4, InterleaveMode::ShortenContinuous),
    );
    let batches: Vec<Batch> = reader
        .by_ref()
        .take(25)
        .collect::<VidlaneResult<_>>()
        .unwrap();

    assert_eq!(batches.len(), 25);
    assert!(!batches[9].wrapped);
    assert!(batches[10].wrapped);
    assert_eq!(batches[10].epoch, 1);
    assert_eq!(batches[10].timestamps, vec![0; 4]);
    assert_eq!(batches[10].labels, vec![0, 1, 2, 3]);
    assert!(batches[20].wrapped);
    assert_eq!(batches[24].epoch, 2);
}

#[test]
fn reset_starts_a_new_epoch() {
    let mut reader = build(&[3, 3], config(2, 2, InterleaveMode::Shorten));
    assert_eq!(drain(&mut reader).len(), 3);
    assert!(reader.next_batch().unwrap().is_none());

    reader.reset();
    let again = drain(&mut reader);
    assert_eq!(again.len(), 3);
    assert_eq!(again[0].index, 0);
    assert_eq!(again[0].timestamps, vec![0, 0]);
}

#[test]
fn small_batches_page_through_one_group() {
    let mut reader = build(&[3, 3, 3, 3], config(2, 4, InterleaveMode::Shorten));
    assert_eq!(reader.meta().epoch_size, 6);

    let batches = drain(&mut reader);
    let summary: Vec<(Vec<i64>, Vec<u64>)> = batches
        .iter()
        .map(|b| (b.labels.clone(), b.timestamps.clone()))
        .collect();
    assert_eq!(
        summary[..4],
        [
            (vec![0, 1], vec![0, 0]),
            (vec![2, 3], vec![0, 0]),
            (vec![0, 1], vec![1, 1]),
            (vec![2, 3], vec![1, 1]),
        ]
    );
    assert_eq!(batches.len(), 6);
}

#[test]
fn labels_stay_distinct_across_parallel_groups() {
    let lengths = [4, 6, 5, 7, 3, 8, 6, 4];
    for mode in InterleaveMode::ALL {
        let mut reader = build(&lengths, config(4, 2, mode));
        let epoch = reader.meta().epoch_size as usize;
        for batch in reader.by_ref().take(epoch + 2) {
            let batch = batch.unwrap();
            let distinct: HashSet<_> = batch.labels.iter().collect();
            assert_eq!(distinct.len(), 4, "{mode}");
            for (i, &frame) in first_frames(&batch).iter().enumerate() {
                assert_eq!(frame, batch.timestamps[i], "{mode}");
            }
        }
    }
}

#[test]
fn float_payload_is_normalized() {
    let mut cfg = config(2, 2, InterleaveMode::Repeat);
    cfg.element_type = ElementType::Float;
    cfg.sequence_length = 2;
    let mut reader = build(&[6, 4], cfg);

    let batch = reader.next_batch().unwrap().unwrap();
    let data = batch.data.as_f32().unwrap();
    assert_eq!(batch.shape, [2, 2, 2, 2, 3]);
    assert_eq!(data.len(), 2 * 2 * 2 * 2 * 3);
    assert!(data.iter().all(|v| (0.0..=1.0).contains(v)));
    // Second frame of the first sequence carries frame index 1.
    let second_frame = batch.sequence_len() / 2;
    assert_eq!(data[second_frame], 1.0 / 255.0);
}

#[test]
fn trimmed_ranges_offset_decoded_frames() {
    let dir = std::env::temp_dir().join("vidlane_reader_trimmed");
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    let list = dir.join("list.txt");
    std::fs::write(&list, "a.mp4 7 10 20\nb.mp4 8 -10\n").unwrap();
    let probe = StaticProbe::new()
        .with_source(dir.join("a.mp4"), 100)
        .with_source(dir.join("b.mp4"), 50);

    let mut cfg = config(2, 2, InterleaveMode::Shorten);
    cfg.data_root = Some(dir.clone());
    let mut reader = VideoReader::<SyntheticExtractor>::builder(cfg)
        .input(CatalogInput::FileList(PathBuf::from("list.txt")))
        .build(&probe, SyntheticExtractor::default())
        .unwrap();

    let batches = drain(&mut reader);
    assert_eq!(batches.len(), 10);
    assert_eq!(batches[0].labels, vec![7, 8]);
    assert_eq!(first_frames(&batches[3]), vec![13, 43]);
    assert_eq!(batches[3].timestamps, vec![3, 3]);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn shards_partition_a_shuffled_catalog() {
    let lengths = [5u64; 8];
    let mut seen = Vec::new();
    for shard_id in 0..2 {
        let mut cfg = config(2, 2, InterleaveMode::Shorten);
        cfg.random_shuffle = true;
        cfg.seed = 42;
        cfg.shard_id = shard_id;
        cfg.num_shards = 2;
        let reader = build(&lengths, cfg);
        assert_eq!(reader.meta().sources, 4);
        seen.extend(reader.sources().iter().map(|s| s.label));
    }
    seen.sort_unstable();
    assert_eq!(seen, (0..8).collect::<Vec<i64>>());
}

#[test]
fn open_sources_stay_bounded() {
    let mut cfg = config(2, 2, InterleaveMode::Shorten);
    cfg.max_open_sources = Some(2);
    let mut reader = build(&[3; 8], cfg);

    let batches = drain(&mut reader);
    assert_eq!(batches.len(), 12);
    // Every source is opened once, when its lane reaches it.
    assert_eq!(reader.extractor().opened(), 8);
}

#[test]
fn extraction_failure_aborts_the_whole_batch() {
    let mut reader = build_with(
        &[4, 4, 4, 4],
        config(4, 4, InterleaveMode::Shorten),
        SyntheticExtractor::default().failing_on(2),
    );
    let err = reader.next_batch().unwrap_err();
    assert!(matches!(err, VidlaneError::Extraction { .. }));
}

#[test]
fn build_time_errors_are_configuration_errors() {
    let (probe, paths) = StaticProbe::from_lengths(&[5, 5, 5]);
    let cases = [
        config(2, 2, InterleaveMode::Shorten),
        ReaderConfiguration {
            sequence_length: 6,
            ..config(3, 3, InterleaveMode::Repeat)
        },
        ReaderConfiguration {
            element_type: ElementType::Int16,
            ..config(3, 3, InterleaveMode::Repeat)
        },
        ReaderConfiguration {
            shard_id: 3,
            num_shards: 3,
            ..config(1, 1, InterleaveMode::Repeat)
        },
    ];
    for cfg in cases {
        let result = VideoReader::<SyntheticExtractor>::builder(cfg.clone())
            .input(CatalogInput::Paths(paths.clone()))
            .build(&probe, SyntheticExtractor::default());
        match result {
            Ok(_) => panic!("{cfg:?} should fail"),
            Err(e) => assert!(e.is_configuration(), "{cfg:?}: {e}"),
        }
    }
}
