use apsort_camera::BgrFrame;
use apsort_preprocess::Preprocessor;

#[test]
fn cpu_smoke() {
    // Solid blue 640×480 BGR frame
    let (w, h) = (640u32, 480u32);
    let mut data = Vec::with_capacity((w * h * 3) as usize);
    for _ in 0..w * h {
        data.extend_from_slice(&[255, 0, 0]);
    }
    let frame = BgrFrame { data, width: w, height: h, pts: std::time::Duration::ZERO };

    let pp = Preprocessor::new(320, 320);
    let out = pp.run(&frame).unwrap();
    assert_eq!(out.shape(), &[320, 320, 3]);

    // RGB order after conversion: blue lands in channel 2
    let center: ndarray::ArrayView1<f32> = out.slice(ndarray::s![160, 160, ..]);
    assert!(center[0] < 0.01);
    assert!(center[1] < 0.01);
    assert!(center[2] > 0.99);
    assert!(out.iter().all(|&v| (0.0..=1.0).contains(&v)));
}

#[test]
fn non_square_output() {
    let rgb = vec![128u8; 100 * 50 * 3];
    let out = Preprocessor::new(64, 32).run_rgb(&rgb, 100, 50).unwrap();
    assert_eq!(out.shape(), &[32, 64, 3]);
    assert!(out.iter().all(|&v| (v - 128.0 / 255.0).abs() < 0.01));
}
