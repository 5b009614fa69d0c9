use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;
use crate::pipeline::EqualizePipeline;

fn bins(n: u16) -> BinCount {
    BinCount::new(n).unwrap()
}

#[test]
fn test_histogram_two_by_two_scenario() {
    let pixels = [10u8, 10, 200, 200];
    let hist = histogram(&pixels, BinCount::FULL);

    assert_eq!(hist.len(), 256);
    assert_eq!(hist[10], 2);
    assert_eq!(hist[200], 2);
    assert_eq!(hist.iter().sum::<u32>(), 4);

    let cumulative = cumulative_histogram(&hist);
    assert_eq!(cumulative[9], 0);
    assert_eq!(cumulative[10], 2);
    assert_eq!(cumulative[199], 2);
    assert_eq!(cumulative[200], 4);
    assert_eq!(cumulative[255], 4);

    let lut = lookup_table(&cumulative);
    assert_eq!(lut[10], 128);
    assert_eq!(lut[200], 255);

    assert_eq!(back_project(&pixels, &lut, BinCount::FULL), vec![128, 128, 255, 255]);
}

#[test]
fn test_histogram_empty_image_is_all_zero() {
    let hist = histogram(&[], bins(16));
    assert_eq!(hist, vec![0; 16]);

    let lut = lookup_table(&cumulative_histogram(&hist));
    assert_eq!(lut, vec![0; 16]);
}

#[test]
fn test_histogram_sum_equals_pixel_count_for_every_bin_count() {
    let mut rng = StdRng::seed_from_u64(3);
    let pixels: Vec<u8> = (0..5_000).map(|_| rng.random()).collect();

    for n in 1..=256u16 {
        let hist = histogram(&pixels, bins(n));
        assert_eq!(hist.len(), n as usize);
        assert_eq!(hist.iter().sum::<u32>(), pixels.len() as u32, "bins = {n}");

        let cumulative = cumulative_histogram(&hist);
        assert!(cumulative.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(*cumulative.last().unwrap(), pixels.len() as u32);
    }
}

#[test]
fn test_single_bin_maps_everything_to_white() {
    let mut rng = StdRng::seed_from_u64(5);
    let pixels: Vec<u8> = (0..1_000).map(|_| rng.random()).collect();
    let one = bins(1);

    let hist = histogram(&pixels, one);
    assert_eq!(hist, vec![1_000]);
    assert_eq!(cumulative_histogram(&hist), hist);

    let lut = lookup_table(&cumulative_histogram(&hist));
    assert_eq!(lut, vec![255]);
    assert!(back_project(&pixels, &lut, one).iter().all(|&v| v == 255));
}

#[test]
fn test_constant_image_maps_to_single_level() {
    // A flat image puts the whole cumulative count in its only occupied
    // bin, so every pixel lands on 255.
    let pixels = vec![0u8; 64];
    for n in [1u16, 2, 16, 256] {
        let b = bins(n);
        let hist = histogram(&pixels, b);
        assert_eq!(hist[0], 64);
        assert!(hist[1..].iter().all(|&c| c == 0));

        let lut = lookup_table(&cumulative_histogram(&hist));
        assert_eq!(lut[0], 255);
        assert!(back_project(&pixels, &lut, b).iter().all(|&v| v == 255));
    }
}

#[test]
fn test_flat_histogram_gives_linear_lut() {
    let pixels: Vec<u8> = (0..=255u8).cycle().take(256 * 4).collect();

    for n in [4u16, 16, 64, 256] {
        let hist = histogram(&pixels, bins(n));
        assert!(hist.iter().all(|&c| c == hist[0]), "histogram is not flat");

        let lut = lookup_table(&cumulative_histogram(&hist));
        for (i, &v) in lut.iter().enumerate() {
            let expected = (i + 1) as f64 * 255.0 / n as f64;
            assert!(
                (v as f64 - expected).abs() <= 1.0,
                "bins {n}, entry {i}: {v} vs {expected}"
            );
        }
    }
}

#[test]
fn test_lut_entry_rounding() {
    assert_eq!(lut_entry(0, 0), 0);
    assert_eq!(lut_entry(0, 10), 0);
    assert_eq!(lut_entry(10, 10), 255);
    assert_eq!(lut_entry(2, 4), 128);
    assert_eq!(lut_entry(1, 3), 85);
    assert_eq!(lut_entry(u32::MAX, u32::MAX), 255);
    assert_eq!(lut_entry(u32::MAX / 2, u32::MAX), 127);
}

#[test]
fn test_lut_values_in_range() {
    let mut rng = StdRng::seed_from_u64(9);
    for _ in 0..50 {
        let hist: Vec<u32> = (0..64).map(|_| rng.random_range(0..1_000)).collect();
        let lut = lookup_table(&cumulative_histogram(&hist));
        assert_eq!(lut.len(), 64);
        assert!(lut.windows(2).all(|w| w[0] <= w[1]));
    }
}

#[test]
fn test_back_project_with_scaled_bins() {
    let b = bins(2);
    let pixels = [0u8, 127, 128, 255];
    let lut = [40u8, 200];
    assert_eq!(back_project(&pixels, &lut, b), vec![40, 40, 200, 200]);
}

#[test]
fn test_backend_runs_pipeline_with_dedicated_pool() {
    let backend = CpuBackend::with_threads(2).unwrap();
    assert_eq!(backend.threads(), 2);

    let plane = IntensityPlane::new(2, 2, vec![10, 10, 200, 200]).unwrap();
    let result = EqualizePipeline::new(&backend, BinCount::FULL)
        .run(&plane)
        .unwrap();
    assert_eq!(result.output.pixels(), &[128, 128, 255, 255]);
}

#[test]
fn test_backend_rejects_out_of_order_stage() {
    let backend = CpuBackend::new();
    let mut arena = backend
        .allocate(PlaneDesc::new(1, 1), BinCount::FULL)
        .unwrap();
    backend
        .upload(&mut arena, &IntensityPlane::filled(1, 1, 3).unwrap())
        .unwrap();

    let err = backend
        .run_stage(&mut arena, Stage::LookupTable)
        .unwrap_err();
    assert!(matches!(err, Error::DeviceRuntime { code: "MISSING_INPUT", .. }));
    assert!(backend.read_output(&arena).is_err());
}

#[test]
fn test_backend_rejects_mismatched_upload() {
    let backend = CpuBackend::new();
    let mut arena = backend
        .allocate(PlaneDesc::new(2, 2), BinCount::FULL)
        .unwrap();
    let plane = IntensityPlane::filled(3, 1, 0).unwrap();
    assert!(backend.upload(&mut arena, &plane).is_err());
}

#[test]
fn test_repeated_runs_are_identical() {
    let mut rng = StdRng::seed_from_u64(11);
    let pixels: Vec<u8> = (0..200 * 150).map(|_| rng.random()).collect();
    let plane = IntensityPlane::new(200, 150, pixels).unwrap();
    let backend = CpuBackend::new();
    let pipeline = EqualizePipeline::new(&backend, bins(48));

    let first = pipeline.run(&plane).unwrap();
    for _ in 0..5 {
        let next = pipeline.run(&plane).unwrap();
        assert_eq!(next.output, first.output);
        assert_eq!(next.histogram, first.histogram);
        assert_eq!(next.cumulative, first.cumulative);
    }
}
