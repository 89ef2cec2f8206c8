use anyhow::Result;
use burn::tensor::Int;
use burn_ndarray::NdArray;
use voxform_core::ImageArray;
use voxform_transforms::{
    AffineRanges, ParamRange, Rand2DElastic, Rand3DElastic, RandAffine, RandAxisFlip, RandRotate, RandRotate90,
    RandZoom, Randomizable,
};

type Backend = NdArray<f32>;

fn ramp(shape: Vec<usize>) -> Result<ImageArray<Backend>> {
    let n: usize = shape.iter().product();
    Ok(ImageArray::from_floats(
        (0..n).map(|v| (v as f32).sin()).collect(),
        shape,
        &Default::default(),
    )?)
}

#[test]
fn test_rand_affine_passthrough_is_float_cast() -> Result<()> {
    let device = Default::default();
    let labels = ImageArray::<Backend, Int>::from_ints((0..24).collect(), vec![2, 3, 4], &device)?;
    let ranges = AffineRanges {
        rotate: vec![ParamRange::Symmetric(0.5)],
        translate: vec![ParamRange::Symmetric(2.0), ParamRange::Symmetric(2.0)],
        ..Default::default()
    };
    let mut op = RandAffine::<Backend>::new(0.0).with_ranges(ranges).seeded(0);
    for _ in 0..3 {
        let out = op.apply(&labels)?;
        assert!(out.draw.is_none());
        assert_eq!(out.array.to_vec_f32()?, labels.to_float().to_vec_f32()?);
    }
    Ok(())
}

#[test]
fn test_seeded_rand_rotate_replays() -> Result<()> {
    let image = ramp(vec![1, 6, 5])?;
    let build = || RandRotate::new(1.0).with_range_x(0.8).seeded(1234);
    let mut first = build();
    let mut second = build();

    let a = first.apply(&image)?;
    let b = second.apply(&image)?;
    assert_eq!(a.draw, b.draw);
    assert_eq!(a.array.to_vec_f32()?, b.array.to_vec_f32()?);

    // Reseeding restarts the stream.
    first.set_random_state(1234);
    let c = first.apply(&image)?;
    assert_eq!(a.draw, c.draw);
    Ok(())
}

#[test]
fn test_distinct_seeds_diverge() -> Result<()> {
    let image = ramp(vec![1, 6, 5])?;
    let mut a = RandRotate::new(1.0).with_range_x(0.8).seeded(1);
    let mut b = RandRotate::new(1.0).with_range_x(0.8).seeded(2);
    assert_ne!(a.apply(&image)?.draw, b.apply(&image)?.draw);
    Ok(())
}

#[test]
fn test_gate_frequency_follows_prob() -> Result<()> {
    let device = Default::default();
    let labels = ImageArray::<Backend, Int>::from_ints((0..4).collect(), vec![1, 2, 2], &device)?;
    let mut op = RandAxisFlip::new(0.5).seeded(77);
    let mut fired = 0;
    for _ in 0..400 {
        if op.apply(&labels)?.is_applied() {
            fired += 1;
        }
    }
    assert!((150..250).contains(&fired), "fired {fired} times");
    Ok(())
}

#[test]
fn test_label_maps_stay_integer() -> Result<()> {
    let device = Default::default();
    let labels = ImageArray::<Backend, Int>::from_ints(vec![0, 1, 2, 3, 4, 5], vec![1, 2, 3], &device)?;
    let mut op = RandRotate90::new(1.0).seeded(5);
    let out = op.apply(&labels)?;
    let mut values = out.array.to_vec_i64()?;
    values.sort_unstable();
    assert_eq!(values, vec![0, 1, 2, 3, 4, 5]);
    Ok(())
}

#[test]
fn test_rand_zoom_keeps_shape() -> Result<()> {
    let image = ramp(vec![1, 9, 8, 7])?;
    let mut op = RandZoom::new(1.0).with_range(vec![0.6, 1.4], vec![0.8, 1.6])?.seeded(3);
    let out = op.apply(&image)?;
    let zoom = out.draw.as_deref().unwrap_or_default();
    assert_eq!(zoom.len(), 3);
    assert_eq!(zoom[0], zoom[1]);
    assert_eq!(out.array.shape(), image.shape());
    Ok(())
}

#[test]
fn test_elastic_output_sizes() -> Result<()> {
    let image = ramp(vec![1, 10, 12])?;
    let mut elastic_2d = Rand2DElastic::new(vec![4.0, 4.0], (0.5, 1.5))
        .with_prob(1.0)
        .with_spatial_size(vec![8, -1])
        .seeded(10);
    let out = elastic_2d.apply(&image)?;
    assert_eq!(out.array.shape(), &[1, 8, 12]);

    let volume = ramp(vec![1, 5, 6, 4])?;
    let mut elastic_3d = Rand3DElastic::new((0.5, 1.0), (1.0, 2.0))
        .with_prob(1.0)
        .with_ranges(AffineRanges {
            rotate: vec![ParamRange::Symmetric(0.2); 3],
            ..Default::default()
        })
        .seeded(10);
    let out = elastic_3d.apply(&volume)?;
    assert_eq!(out.array.shape(), volume.shape());
    assert_eq!(out.draw.map(|d| d.affine.params.rotate.len()), Some(3));
    Ok(())
}

fn assert_covers(values: &[f64], lo: f64, hi: f64) {
    let mid = 0.5 * (lo + hi);
    let quarter = 0.25 * (hi - lo);
    let below = values.iter().filter(|&&v| v < mid).count();
    let above = values.len() - below;
    assert!(values.len() >= 30, "only {} draws", values.len());
    assert!(below >= values.len() / 5, "{below} of {} draws below {mid}", values.len());
    assert!(above >= values.len() / 5, "{above} of {} draws above {mid}", values.len());
    assert!(values.iter().all(|v| (lo..=hi).contains(v)));
    assert!(values.iter().cloned().fold(f64::INFINITY, f64::min) < lo + quarter);
    assert!(values.iter().cloned().fold(f64::NEG_INFINITY, f64::max) > hi - quarter);
}

fn rotate_range(count: usize) -> AffineRanges {
    AffineRanges {
        rotate: vec![ParamRange::Symmetric(1.0); count],
        ..Default::default()
    }
}

#[test]
fn test_seeded_rand_affine_rotations_span_range() -> Result<()> {
    let image = ramp(vec![1, 4, 4])?;
    let mut rotations = Vec::new();
    for seed in 0..120 {
        let mut op = RandAffine::<Backend>::new(0.5).with_ranges(rotate_range(1)).seeded(seed);
        if let Some(draw) = op.apply(&image)?.draw {
            rotations.push(draw.params.rotate[0]);
        }
    }
    assert!(rotations.iter().any(|&r| r > 0.0));
    assert!(rotations.iter().any(|&r| r < 0.0));
    assert_covers(&rotations, -1.0, 1.0);
    Ok(())
}

#[test]
fn test_seeded_rand_2d_elastic_draws_span_ranges() -> Result<()> {
    let image = ramp(vec![1, 6, 6])?;
    let mut rotations = Vec::new();
    let mut magnitudes = Vec::new();
    for seed in 0..120 {
        let mut op = Rand2DElastic::new(vec![3.0, 3.0], (1.0, 3.0))
            .with_prob(0.5)
            .with_ranges(rotate_range(1))
            .seeded(seed);
        if let Some(draw) = op.apply(&image)?.draw {
            rotations.push(draw.affine.params.rotate[0]);
            magnitudes.push(draw.magnitude);
        }
    }
    assert_covers(&rotations, -1.0, 1.0);
    assert_covers(&magnitudes, 1.0, 3.0);
    Ok(())
}

#[test]
fn test_seeded_rand_3d_elastic_draws_span_ranges() -> Result<()> {
    let volume = ramp(vec![1, 4, 4, 4])?;
    let mut rotations = Vec::new();
    let mut sigmas = Vec::new();
    for seed in 0..120 {
        let mut op = Rand3DElastic::new((0.5, 1.5), (1.0, 2.0))
            .with_prob(0.5)
            .with_ranges(rotate_range(3))
            .seeded(seed);
        if let Some(draw) = op.apply(&volume)?.draw {
            rotations.push(draw.affine.params.rotate[0]);
            sigmas.extend(draw.sigma);
        }
    }
    assert_covers(&rotations, -1.0, 1.0);
    assert_covers(&sigmas, 0.5, 1.5);
    Ok(())
}
