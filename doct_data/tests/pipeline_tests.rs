//! End-to-end tests: shape records on disk through loader, transform and dataset.

use std::path::Path;

use burn::backend::NdArray;
use burn::data::dataset::Dataset;
use doct_core::{Octree, Point3, PointFeatures, PointSet};
use doct_data::prelude::*;
use doct_io::{
    layout, save_octree_file, save_tensor_file, write_colors, write_occupancy, write_point_cloud,
    write_sdf_field, OccupancyField, SdfField, ShapeIoError, SplitTensor,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

const POINTS: usize = 200;

/// Sphere of radius 0.45 (record scale) with outward normals of length 2.
fn sphere(n: usize) -> (Vec<Point3>, Vec<Point3>) {
    let golden = std::f32::consts::PI * (3.0 - 5.0f32.sqrt());
    (0..n)
        .map(|i| {
            let y = 1.0 - 2.0 * (i as f32 + 0.5) / n as f32;
            let r = (1.0 - y * y).sqrt();
            let theta = golden * i as f32;
            let n = Point3::new(r * theta.cos(), y, r * theta.sin());
            (n * 0.45, n * 2.0)
        })
        .unzip()
}

/// SDF samples on a lattice reaching past the unit cube after scaling.
fn sdf_field() -> SdfField {
    let mut points = Vec::new();
    for i in 0..6 {
        for j in 0..6 {
            for k in 0..6 {
                points.push(Point3::new(
                    -0.6 + 0.24 * i as f32,
                    -0.6 + 0.24 * j as f32,
                    -0.6 + 0.24 * k as f32,
                ));
            }
        }
    }
    let sdf = points.iter().map(|p| p.length() - 0.45).collect();
    let grad = points.iter().map(|p| p.normalize_or_eps(1e-6)).collect();
    SdfField::new(points, grad, sdf).unwrap()
}

/// Write a complete shape record into `dir`.
fn write_record(dir: &Path) {
    std::fs::create_dir_all(dir).unwrap();
    let (points, normals) = sphere(POINTS);
    write_point_cloud(dir.join(layout::POINT_CLOUD), &points, &normals).unwrap();

    let colors = PointFeatures::new(3, (0..POINTS * 3).map(|i| (i % 7) as f32 / 7.0).collect())
        .unwrap();
    write_colors(dir.join(layout::COLOR), &colors).unwrap();

    write_sdf_field(dir.join(layout::SDF), &sdf_field()).unwrap();

    let field = sdf_field();
    let occupancy = OccupancyField {
        occupancies: field.sdf.iter().map(|s| *s < 0.0).collect(),
        points: field.points,
    };
    write_occupancy(dir.join(layout::OCCUPANCY), &occupancy, true).unwrap();

    let set = PointSet::new(
        points.iter().map(|p| *p / 0.5).collect(),
        normals.iter().map(|n| n.normalize_or_eps(1e-6)).collect(),
    )
    .unwrap();
    save_octree_file(&Octree::build(&set, 4, 2).unwrap(), dir.join(layout::OCTREE)).unwrap();

    let split = SplitTensor::new(vec![8, 2], (0..16).map(|i| (i % 2) as f32).collect()).unwrap();
    save_tensor_file(&split, dir.join(layout::SPLIT_SMALL)).unwrap();
    save_tensor_file(&split, dir.join(layout::SPLIT_LARGE)).unwrap();
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn small_config() -> ShapeConfig {
    ShapeConfig::new().with_point_sample_num(128).with_depth(4)
}

#[test]
fn test_loader_all_flags_off_is_empty() {
    let config = ShapeConfig::new()
        .with_load_pointcloud(false)
        .with_load_sdf(false);
    let raw = ShapeLoader::new(&config)
        .load("/definitely/not/a/shape")
        .unwrap();
    assert!(raw.is_empty());
    assert!(raw.keys().is_empty());
}

#[test]
fn test_loader_keys_follow_flags() {
    let dir = TempDir::new().unwrap();
    write_record(dir.path());

    let config = small_config()
        .with_load_octree(true)
        .with_load_split_small(true)
        .with_load_split_large(true)
        .with_load_occu(true);
    let raw = ShapeLoader::new(&config).load(dir.path()).unwrap();
    assert_eq!(
        raw.keys(),
        vec!["octree_in", "point_cloud", "split_small", "split_large", "occu", "sdf"]
    );

    let occu = raw.occu.as_ref().unwrap();
    assert_eq!(occu.occupancies.len(), 216);
    assert!(occu.occupancies.iter().any(|o| *o));
    assert!(occu.occupancies.iter().any(|o| !*o));
}

#[test]
fn test_colors_absent_unless_requested() {
    let dir = TempDir::new().unwrap();
    write_record(dir.path());

    let raw = ShapeLoader::new(&small_config()).load(dir.path()).unwrap();
    assert!(raw.point_cloud.as_ref().unwrap().colors.is_none());

    let config = small_config().with_load_color(true);
    let raw = ShapeLoader::new(&config).load(dir.path()).unwrap();
    let colors = raw.point_cloud.as_ref().unwrap().colors.as_ref().unwrap();
    assert_eq!(colors.rows(), POINTS);

    let transform = ShapeTransform::new(config).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    let sample = transform.apply(&raw, 0, &mut rng).unwrap();
    assert_eq!(sample.points.unwrap().features().unwrap().channels(), 3);
}

#[test]
fn test_missing_payload_is_missing_file() {
    let dir = TempDir::new().unwrap();
    write_record(dir.path());
    std::fs::remove_file(dir.path().join(layout::SDF)).unwrap();

    let err = ShapeLoader::new(&small_config())
        .load(dir.path())
        .unwrap_err();
    assert!(matches!(err, DataError::Io(ShapeIoError::MissingFile { .. })));
}

#[test]
fn test_sdf_subsampling_pipeline() {
    let dir = TempDir::new().unwrap();
    write_record(dir.path());
    let config = small_config();
    let raw = ShapeLoader::new(&config).load(dir.path()).unwrap();
    let transform = ShapeTransform::new(config).unwrap();

    let mut rng = StdRng::seed_from_u64(42);
    let sample = transform.apply(&raw, 5, &mut rng).unwrap();
    assert_eq!(sample.index, 5);
    assert_eq!(sample.keys(), vec!["points", "sdf"]);

    let points = sample.points.as_ref().unwrap();
    assert!(points.in_range(-1.0, 1.0));

    let sdf = sample.sdf.as_ref().unwrap();
    assert_eq!(sdf.len(), 128);

    // Every row is a gathered input row with its position scaled
    let field = raw.sdf.as_ref().unwrap();
    for k in 0..sdf.len() {
        let i = field
            .points
            .iter()
            .position(|p| (*p / 0.5 - sdf.pos()[k]).max_abs() < 1e-6)
            .expect("row not drawn from the field");
        assert_eq!(sdf.sdf()[k], field.sdf[i]);
        assert_eq!(sdf.grad()[k], field.grad[i]);
    }
    // Unclipped by default: the lattice corner maps to 1.2
    assert!(
        field.points.iter().any(|p| (*p / 0.5).max_abs() > 1.0),
        "fixture should reach past the cube"
    );
}

#[test]
fn test_surface_synthesis_supersedes_sdf() {
    let dir = TempDir::new().unwrap();
    write_record(dir.path());
    let config = small_config().with_sample_surf_points(true);
    let raw = ShapeLoader::new(&config).load(dir.path()).unwrap();
    let transform = ShapeTransform::new(config).unwrap();

    let mut rng = StdRng::seed_from_u64(9);
    let sample = transform.apply(&raw, 0, &mut rng).unwrap();
    let sdf = sample.sdf.as_ref().unwrap();
    assert_eq!(sdf.len(), 256);

    let points = sample.points.as_ref().unwrap();
    let (on, off) = sdf.sdf().split_at(128);
    assert!(on.iter().all(|s| *s == 0.0));
    assert!(off.iter().all(|s| *s == -1.0));

    for k in 0..128 {
        let i = points
            .points()
            .iter()
            .position(|p| *p == sdf.pos()[k])
            .expect("on-surface row not from the point set");
        assert_eq!(sdf.grad()[k], points.normals()[i]);
    }
    for k in 128..256 {
        let p = sdf.pos()[k];
        if p.length() > 1e-3 {
            assert!((sdf.grad()[k].length() - 1.0).abs() < 1e-5);
        }
    }

    // Same result as running the two kernels directly with the same stream
    let mut rng = StdRng::seed_from_u64(9);
    let on_surf = transform.sample_on_surface(&mut rng, points).unwrap();
    let off_surf = transform
        .sample_off_surface(&mut rng, &raw.sdf.as_ref().unwrap().points)
        .unwrap();
    let mut expected = on_surf;
    expected.extend(off_surf);
    assert_eq!(sdf, &expected);
}

#[test]
fn test_seeded_transform_is_deterministic() {
    let dir = TempDir::new().unwrap();
    write_record(dir.path());
    let config = small_config();
    let raw = ShapeLoader::new(&config).load(dir.path()).unwrap();
    let transform = ShapeTransform::new(config).unwrap();

    let a = transform
        .apply(&raw, 0, &mut StdRng::seed_from_u64(3))
        .unwrap();
    let b = transform
        .apply(&raw, 0, &mut StdRng::seed_from_u64(3))
        .unwrap();
    assert_eq!(a.sdf, b.sdf);
    assert_eq!(a.points, b.points);
}

#[test]
fn test_octree_and_split_pass_through() {
    let dir = TempDir::new().unwrap();
    write_record(dir.path());
    let config = small_config()
        .with_load_octree(true)
        .with_load_split_small(true)
        .with_load_split_large(true);
    let raw = ShapeLoader::new(&config).load(dir.path()).unwrap();
    let transform = ShapeTransform::new(config).unwrap();

    let sample = transform
        .apply(&raw, 0, &mut StdRng::seed_from_u64(0))
        .unwrap();

    let octree = sample.octree_in.as_ref().unwrap();
    assert!(std::sync::Arc::ptr_eq(octree, raw.octree_in.as_ref().unwrap()));
    assert_eq!(octree.node_count(2), 64);
    // Output points and the stored octree agree when built at the same depths
    let rebuilt = transform
        .points_to_octree(sample.points.as_ref().unwrap())
        .unwrap();
    assert_eq!(rebuilt.levels(), octree.levels());

    let split = sample.split_small.as_ref().unwrap();
    assert_eq!(split.shape(), &[8, 2]);
    let tensor = split
        .to_tensor::<NdArray, 2>(&Default::default())
        .unwrap();
    assert_eq!(tensor.dims(), [8, 2]);
    assert_eq!(sample.split_large.as_ref(), Some(split));
}

#[test]
fn test_split_large_failure_policy() {
    init_logging();
    let dir = TempDir::new().unwrap();
    write_record(dir.path());
    std::fs::write(dir.path().join(layout::SPLIT_LARGE), b"garbage").unwrap();

    let strict = small_config().with_load_split_large(true);
    let raw = ShapeLoader::new(&strict).load(dir.path()).unwrap();
    let failure = raw.split_large.as_ref().unwrap().as_ref().unwrap_err();
    assert_eq!(failure.path, dir.path().join(layout::SPLIT_LARGE));

    let err = ShapeTransform::new(strict)
        .unwrap()
        .apply(&raw, 0, &mut StdRng::seed_from_u64(0))
        .unwrap_err();
    assert!(matches!(err, DataError::SplitUnavailable { .. }));

    let lenient = small_config()
        .with_load_split_large(true)
        .with_lenient_split_large(true);
    let sample = ShapeTransform::new(lenient)
        .unwrap()
        .apply(&raw, 0, &mut StdRng::seed_from_u64(0))
        .unwrap();
    assert!(sample.split_large.is_none());
    assert!(sample.sdf.is_some());
}

#[test]
fn test_sample_tensors() {
    let dir = TempDir::new().unwrap();
    write_record(dir.path());
    let config = small_config();
    let raw = ShapeLoader::new(&config).load(dir.path()).unwrap();
    let sample = ShapeTransform::new(config)
        .unwrap()
        .apply(&raw, 0, &mut StdRng::seed_from_u64(1))
        .unwrap();

    let tensors = sample
        .sdf
        .unwrap()
        .to_tensors::<NdArray>(&Default::default());
    assert_eq!(tensors.pos.dims(), [128, 3]);
    assert_eq!(tensors.sdf.dims(), [128]);
    assert_eq!(tensors.grad.dims(), [128, 3]);
}

fn write_dataset(root: &Path, ids: &[&str]) -> std::path::PathBuf {
    for id in ids {
        write_record(&root.join(id));
    }
    let list = root.join("filelist.txt");
    let mut text = String::from("# shapes\n");
    for id in ids {
        text.push_str(id);
        text.push('\n');
    }
    std::fs::write(&list, text).unwrap();
    list
}

fn dataset_config(root: &Path, list: &Path) -> DatasetConfig {
    DatasetConfig::new(
        root.to_string_lossy().into_owned(),
        list.to_string_lossy().into_owned(),
    )
    .with_seed(11)
    .with_shape(small_config())
}

#[test]
fn test_dataset_get() {
    let dir = TempDir::new().unwrap();
    let list = write_dataset(dir.path(), &["cat/a", "cat/b", "cat/c"]);
    let dataset = build_shapenet_dataset(dataset_config(dir.path(), &list)).unwrap();

    assert_eq!(dataset.len(), 3);
    assert!(!dataset.is_cached());
    assert_eq!(dataset.shape_path(1), Some(dir.path().join("cat/b")));

    let sample = dataset.get(2).unwrap();
    assert_eq!(sample.index, 2);
    assert_eq!(sample.sdf.unwrap().len(), 128);
    assert!(dataset.get(3).is_none());
}

#[test]
fn test_dataset_in_memory_and_explicit_rng() {
    let dir = TempDir::new().unwrap();
    let list = write_dataset(dir.path(), &["a", "b"]);
    let cached = ShapeDataset::new(dataset_config(dir.path(), &list).with_in_memory(true)).unwrap();
    let lazy = ShapeDataset::new(dataset_config(dir.path(), &list)).unwrap();
    assert!(cached.is_cached());

    // Cached and on-disk records transform identically under the same RNG
    let a = cached.sample(1, &mut StdRng::seed_from_u64(5)).unwrap();
    let b = lazy.sample(1, &mut StdRng::seed_from_u64(5)).unwrap();
    assert_eq!(a.sdf, b.sdf);

    assert!(matches!(
        cached.sample(7, &mut StdRng::seed_from_u64(5)),
        Err(DataError::IndexOutOfRange { index: 7, len: 2 })
    ));
}

#[test]
fn test_dataset_broken_record() {
    init_logging();
    let dir = TempDir::new().unwrap();
    let list = write_dataset(dir.path(), &["good", "bad"]);
    std::fs::remove_file(dir.path().join("bad").join(layout::POINT_CLOUD)).unwrap();

    let dataset = ShapeDataset::new(dataset_config(dir.path(), &list)).unwrap();
    assert!(dataset.get(0).is_some());
    assert!(dataset.get(1).is_none());

    // Eager caching surfaces the failure at construction
    assert!(ShapeDataset::new(dataset_config(dir.path(), &list).with_in_memory(true)).is_err());
}

#[test]
fn test_config_json_roundtrip() {
    use burn::config::Config;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("shape.json");
    let config = small_config().with_sample_surf_points(true);
    config.save(&path).unwrap();

    let loaded = ShapeConfig::load(&path).unwrap();
    assert_eq!(loaded.point_sample_num, 128);
    assert!(loaded.sample_surf_points);
    assert_eq!(loaded.depth, 4);
}
