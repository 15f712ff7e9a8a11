use approx::assert_relative_eq;
use memview::{
    is_reference_free, reference_free, Argument, BackingKind, DenseArray, View0D, View1D, View2D, View3D,
    ViewError, ViewND,
};
use num_complex::Complex64;
use rand::{rngs::StdRng, Rng, SeedableRng};

fn make_series(len: usize, rng: &mut StdRng) -> Vec<f64> {
    (0..len).map(|_| rng.gen_range(-100.0..100.0)).collect()
}

#[test]
fn test_element_view_aliases_host() {
    let mut data = [17, 18, 19, 20];
    {
        let e = View0D::new(&mut data, 1).unwrap();
        assert_eq!(e.get(), 18);
        e.set(180);
    }
    assert_eq!(data[1], 180);

    let e = View0D::new(&data, 3).unwrap();
    assert_eq!(e.get(), data[3]);
    assert!(View0D::new(&data, 4).is_err());
}

#[test]
fn test_linear_window_scenario() {
    let data = [17, 18, 19, 20];
    let view = View1D::with_range(&data, 1, 2).unwrap();
    assert_eq!(view.len(), 2);
    assert_eq!(view.to_vec(), vec![18, 19]);
    assert_eq!(view.slice(0, 1).unwrap().to_vec(), vec![18]);

    assert!(View1D::with_start(&data, 4).unwrap().is_empty());
    assert!(matches!(
        View1D::new(&data).get(4),
        Err(ViewError::OutOfRange {
            argument: Argument::Index,
            ..
        })
    ));
}

#[test]
fn test_object_interior_spans_rows() {
    let mut grid = [[17, 18, 19, 20], [21, 22, 23, 24]];
    let view = View1D::from_object_mut(&mut grid, |g| &mut g[0][2], 4).unwrap();
    assert_eq!(view.to_vec(), vec![19, 20, 21, 22]);
    assert!(matches!(
        view.as_cells(),
        Err(ViewError::Unsupported {
            backing: BackingKind::Object,
            ..
        })
    ));
    assert!(View1D::from_object_mut(&mut grid, |g| &mut g[0][2], 7).is_err());
}

#[test]
fn test_slicing_law_random() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
        let len = rng.gen_range(0..40);
        let data = make_series(len, &mut rng);
        let view = View1D::new(&data);

        let start = rng.gen_range(0..=len + 2);
        let length = rng.gen_range(0..=len + 2);
        match view.slice(start, length) {
            Ok(window) => {
                assert!(start + length <= len);
                for k in 0..length {
                    assert_relative_eq!(window.get(k).unwrap(), view.get(start + k).unwrap());
                    assert_relative_eq!(window[k], data[start + k]);
                }
                assert!(window.get(length).is_err());
            }
            Err(err) => {
                assert!(start + length > len);
                assert!(matches!(err, ViewError::OutOfRange { .. }));
            }
        }
    }
}

#[test]
fn test_overlapping_copy_matches_buffered_copy() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let len = rng.gen_range(1..48);
        let mut data = make_series(len, &mut rng);
        let count = rng.gen_range(0..=len);
        let src = rng.gen_range(0..=len - count);
        let dst = rng.gen_range(0..=len - count);

        let mut expected = data.clone();
        let buffer = expected[src..src + count].to_vec();
        expected[dst..dst + count].copy_from_slice(&buffer);

        {
            let all = View1D::new(&mut data);
            let source = all.slice(src, count).unwrap();
            let destination = all.slice(dst, count).unwrap();
            source.copy_to(&destination).unwrap();
        }
        for (got, want) in data.iter().zip(&expected) {
            assert_relative_eq!(*got, *want);
        }
    }
}

#[test]
fn test_copy_to_longer_destination_leaves_tail() {
    let src = [1u16, 2, 3];
    let mut dst = [9u16; 5];
    View1D::new(&src).copy_to(&View1D::new(&mut dst)).unwrap();
    assert_eq!(dst, [1, 2, 3, 9, 9]);
}

#[test]
fn test_round_trip_through_vec() {
    let mut rng = StdRng::seed_from_u64(3);
    let data: Vec<Complex64> = (0..32)
        .map(|_| Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
        .collect();
    let view = View1D::with_range(&data, 4, 20).unwrap();
    let copy = view.to_vec();
    let again = View1D::new(&copy);
    assert_eq!(again.len(), view.len());
    for (a, b) in again.iter().zip(view.iter()) {
        assert_relative_eq!(a.re, b.re);
        assert_relative_eq!(a.im, b.im);
    }
    assert!(!again.ptr_eq(&view));
}

#[test]
fn test_rectangular_default_strides_and_origin() {
    let cube = [[[0.0f64; 4]; 3]; 2];
    let view = View3D::new(&cube);
    assert_eq!(view.strides(), &[96, 32]);
    assert_eq!(view.as_ptr(), &cube[0][0][0] as *const f64);

    let a = DenseArray::from_fn([3, 5], |[r, c]| (r * 5 + c) as f64);
    let view = a.view();
    assert_eq!(view.strides(), &[40]);
    for r in 0..3 {
        for c in 0..5 {
            assert_relative_eq!(view.get([r, c]).unwrap(), a[[r, c]]);
        }
    }
}

#[test]
fn test_rectangular_windows_random() {
    let mut rng = StdRng::seed_from_u64(11);
    let a = DenseArray::from_fn([6, 7, 5], |[i, j, k]| (i * 100 + j * 10 + k) as i64);
    let view = a.view();
    for _ in 0..100 {
        let starts = [rng.gen_range(0..=6), rng.gen_range(0..=7), rng.gen_range(0..=5)];
        let lengths = [
            rng.gen_range(0..=6 - starts[0]),
            rng.gen_range(0..=7 - starts[1]),
            rng.gen_range(0..=5 - starts[2]),
        ];
        let window = ViewND::with_range(&a, starts, lengths).unwrap();
        assert_eq!(window.strides(), view.strides());
        let values = window.to_vec();
        assert_eq!(values.len(), lengths.iter().product::<usize>());

        let mut expected = Vec::new();
        for i in 0..lengths[0] {
            for j in 0..lengths[1] {
                for k in 0..lengths[2] {
                    expected.push(a[[starts[0] + i, starts[1] + j, starts[2] + k]]);
                }
            }
        }
        assert_eq!(values, expected);
    }
}

#[test]
fn test_rectangular_write_through_dense_array() {
    let mut a = DenseArray::<f32, 2>::zeros([4, 4]);
    {
        let view = a.view_mut();
        let inner = view.subview([1, 1], [2, 2]).unwrap();
        inner.fill(1.5);
        view.row(0).unwrap().fill(-1.0);
        inner.set([1, 1], 2.5).unwrap();
    }
    assert_eq!(a[[0, 3]], -1.0);
    assert_eq!(a[[1, 1]], 1.5);
    assert_eq!(a[[2, 2]], 2.5);
    assert_eq!(a[[3, 3]], 0.0);
}

#[test]
fn test_pointer_views_require_reference_free_elements() {
    #[derive(Clone, Copy)]
    struct Sample {
        t: f64,
        v: f32,
    }
    reference_free!(Sample);
    assert!(is_reference_free::<Sample>());
    assert!(!is_reference_free::<&'static str>());

    let samples = [Sample { t: 0.0, v: 1.0 }, Sample { t: 0.5, v: 2.0 }];
    let view = unsafe { View1D::from_raw_parts(samples.as_ptr(), 2) }.unwrap();
    assert_relative_eq!(view.get(1).unwrap().t, 0.5);
    assert_relative_eq!(view[0].v, 1.0);

    let names = ["a", "b"];
    assert!(matches!(
        unsafe { View1D::from_raw_parts(names.as_ptr(), 2) },
        Err(ViewError::NotReferenceFree { .. })
    ));
    assert!(matches!(
        unsafe { View2D::from_raw_parts(names.as_ptr(), [1, 2]) },
        Err(ViewError::NotReferenceFree { .. })
    ));
}

#[test]
fn test_read_only_views_cross_threads() {
    let data: Vec<u64> = (0..1000).collect();
    let view = View1D::new(&data);
    let halves = [view.slice(0, 500).unwrap(), view.slice(500, 500).unwrap()];
    let sums: Vec<u64> = std::thread::scope(|s| {
        let handles: Vec<_> = halves
            .iter()
            .map(|half| s.spawn(move || half.iter().sum::<u64>()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(sums.iter().sum::<u64>(), data.iter().sum::<u64>());
}
