//! Cross-module scenarios for the per-map cache: invalidation on data
//! mutation, per-map isolation, and the matrix single-slot eviction, all
//! exercised through the shared file trait.

use std::sync::Arc;

use brainmap_files::{
    BrainordinateKey, BrainordinateMappingIndex, DenseBrainordinateFile, InMemoryMatrix,
    MapDataKind, MapInfo, MappableDataFile, MappableFile, Parcel, ParcelMatrixFile,
    PaletteColorMapping, PaletteColorMappingBuilder, ScaleMode, SliceKind, Structure,
};
use ndarray::Array2;
use rustc_hash::FxHashMap;

fn dense_index(count: usize) -> BrainordinateMappingIndex {
    let mut counts = FxHashMap::default();
    counts.insert(Structure::CortexLeft, count);
    let pairs = (0..count).map(|i| (BrainordinateKey::vertex(Structure::CortexLeft, i), i));
    BrainordinateMappingIndex::from_parts(counts, pairs).expect("index")
}

fn dense_file(maps: Vec<Vec<f32>>) -> DenseBrainordinateFile {
    let count = maps[0].len();
    let maps = maps
        .into_iter()
        .enumerate()
        .map(|(i, data)| (MapInfo::new(format!("map-{i}"), MapDataKind::Scalar), data))
        .collect();
    DenseBrainordinateFile::load_palette_mapped(
        dense_index(count),
        maps,
        Arc::new(PaletteColorMapping::default()),
    )
    .expect("file")
}

#[test]
fn statistics_recompute_after_data_mutation() {
    let mut file = dense_file(vec![vec![1.0, 2.0, 3.0, 4.0]]);

    // populate the cache: statistics, histogram, and coloring all valid
    assert_eq!(file.map_statistics(0).expect("stats").mean, 2.5);
    assert!(file.map_histogram(0).is_some());
    file.update_map_coloring(0);
    assert!(file.map_content(0).expect("content").coloring_valid());

    // mutate the raw data
    file.set_map_data(0, vec![10.0, 20.0, 30.0, 40.0])
        .expect("set data");

    // the next statistics query reflects the new data, not the cached old
    assert_eq!(file.map_statistics(0).expect("stats").mean, 25.0);
    let (histogram_min, histogram_max) = file.map_histogram(0).expect("histogram").range();
    assert_eq!((histogram_min, histogram_max), (10.0, 40.0));
    // coloring went stale too and recomputes on demand
    let rgba = file.map_rgba(0).expect("rgba");
    assert_eq!(rgba.len(), 16);
}

#[test]
fn invalidating_one_map_leaves_siblings_cached() {
    let mut file = dense_file(vec![
        vec![1.0, 2.0, 3.0, 4.0],
        vec![5.0, 6.0, 7.0, 8.0],
    ]);

    file.update_map_coloring(0);
    file.update_map_coloring(1);
    assert!(file.map_content(0).expect("content").coloring_valid());
    assert!(file.map_content(1).expect("content").coloring_valid());

    // changing map 0's palette must not invalidate map 1's coloring
    let user_scaled: Arc<PaletteColorMapping> = Arc::new(
        PaletteColorMappingBuilder::default()
            .scale_mode(ScaleMode::UserScale)
            .user_scale_most_positive(4.0f32)
            .build()
            .expect("mapping"),
    );
    file.set_map_palette_color_mapping(0, user_scaled);

    assert!(!file.map_content(0).expect("content").coloring_valid());
    assert!(file.map_content(1).expect("content").coloring_valid());

    // same isolation for data mutation
    file.update_map_coloring(0);
    file.set_map_data(1, vec![0.0; 4]).expect("set data");
    assert!(file.map_content(0).expect("content").coloring_valid());
    assert!(!file.map_content(1).expect("content").coloring_valid());
}

#[test]
fn restricted_statistics_leave_the_cache_untouched() {
    let mut file = dense_file(vec![vec![-100.0, 1.0, 2.0, 3.0]]);

    let unrestricted_mean = file.map_statistics(0).expect("stats").mean;
    let restricted = file
        .map_statistics_limited(0, 0.0, 10.0)
        .expect("restricted");
    assert_eq!(restricted.mean, 2.0);
    assert_eq!(file.map_statistics(0).expect("stats").mean, unrestricted_mean);
}

#[test]
fn matrix_slot_eviction_through_the_variant_enum() {
    let parcels = vec![
        Parcel::new("p0", vec![BrainordinateKey::vertex(Structure::CortexLeft, 0)]),
        Parcel::new("p1", vec![BrainordinateKey::vertex(Structure::CortexLeft, 1)]),
        Parcel::new("p2", vec![BrainordinateKey::vertex(Structure::CortexLeft, 2)]),
    ];
    let values =
        Array2::from_shape_vec((3, 3), (1..=9).map(|v| v as f32).collect()).expect("matrix");
    let matrix = ParcelMatrixFile::load(
        parcels,
        Box::new(InMemoryMatrix::new(values)),
        Arc::new(PaletteColorMapping::default()),
    )
    .expect("file");
    let mut file = MappableFile::ParcelMatrix(matrix);

    let key = BrainordinateKey::vertex(Structure::CortexLeft, 2);
    // nothing loaded yet: brainordinate queries answer no-data
    assert_eq!(file.value_at(&key, 0), None);

    let matrix = file.as_parcel_matrix_mut().expect("matrix variant");
    matrix.load_row(0).expect("row 0");
    assert_eq!(matrix.loaded_data(), Some(&[1.0, 2.0, 3.0][..]));

    matrix.load_row(2).expect("row 2");
    // single-slot cache: only row 2 is retrievable after the second load
    assert_eq!(matrix.loaded_slice(), Some((SliceKind::Row, 2)));
    assert_eq!(matrix.loaded_data(), Some(&[7.0, 8.0, 9.0][..]));
    assert_eq!(file.value_at(&key, 0), Some(9.0));
}

#[test]
fn structural_mismatch_means_no_file() {
    let maps = vec![
        (MapInfo::new("good", MapDataKind::Scalar), vec![0.0; 4]),
        (MapInfo::new("bad", MapDataKind::Scalar), vec![0.0; 3]),
    ];
    let result = DenseBrainordinateFile::load_palette_mapped(
        dense_index(4),
        maps,
        Arc::new(PaletteColorMapping::default()),
    );
    // the whole load aborts; no partially populated file escapes
    assert!(result.is_err());
}
