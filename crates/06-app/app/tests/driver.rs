use app::Driver;
use picture::{ChromaFormat, PicP};
use qmiv_config::{CalcMetricConfig, MetricsConfig, PelAction};
use report::{Reporter, TextReporter};
use seqio::{FrameSet, InMemorySequenceIo, PixelLayout};
use structsim::StructSimMode;

fn base_config(calc_metric: CalcMetricConfig) -> MetricsConfig {
    MetricsConfig {
        input_file_test: String::new(),
        input_file_reference: String::new(),
        input_file_mask: None,
        pixel_layout: PixelLayout::Planar,
        picture_width: 16,
        picture_height: 16,
        bit_depth: 8,
        chroma_format: ChromaFormat::Mono400,
        start_frame_test: 0,
        start_frame_reference: 0,
        number_of_frames: 1,
        calc_metric,
        color_space_input: colorspace::ColorSpace::YCbCrBt601,
        color_space_metric: colorspace::ColorSpace::YCbCrBt601,
        search_range: 2,
        cmp_weights_search: [1, 0, 0, 0],
        cmp_weights_average: [1, 0, 0, 0],
        unnoticeable_coef: [0.01, 0.0, 0.0, 0.0],
        struct_sim_mode: StructSimMode::RegularAveraged,
        struct_sim_stride: 1,
        struct_sim_window: 11,
        is_equirectangular: false,
        lon_range_deg: 0.0,
        lat_range_deg: 180.0,
        invalid_pel_actn: PelAction::Warn,
        name_mismatch_actn: PelAction::Warn,
        number_of_threads: 2,
        verbose_level: 0,
    }
}

fn margin_pic(width: usize, height: usize, margin: usize, fill: impl Fn(usize, usize) -> u16) -> PicP {
    let mut pic = PicP::new(width, height, 8, margin, 1, ChromaFormat::Mono400);
    for y in 0..height {
        for x in 0..width {
            pic.set(0, x, y, fill(x, y));
        }
    }
    pic.extend();
    pic
}

#[test]
fn identical_frames_yield_fake_infinity_psnr() {
    let mut calc = CalcMetricConfig::default();
    calc.psnr = true;
    let config = base_config(calc);
    let margin = app::required_margin(&config);

    let pic = margin_pic(16, 16, margin, |x, y| ((x + y) % 256) as u16);
    let frames = FrameSet {
        test: pic.clone(),
        reference: pic,
        mask: None,
    };
    let mut driver = Driver::new(config, InMemorySequenceIo::new(vec![frames]));
    let mut buf = Vec::new();
    let mut reporter = TextReporter::new(&mut buf);
    driver.run(&mut reporter).unwrap();

    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("fake-infinity sentinel"));
}

#[test]
fn shifted_gradient_iv_psnr_at_least_plain_psnr() {
    let mut calc = CalcMetricConfig::default();
    calc.psnr = true;
    calc.iv_psnr = true;
    let config = base_config(calc);
    let margin = app::required_margin(&config);

    let test = margin_pic(16, 16, margin, |x, y| ((x + y) % 200 + 20) as u16);
    // Reference is the test picture shifted right by one pel: IV-PSNR's
    // search should recover a near-perfect match that plain PSNR cannot.
    let reference = margin_pic(16, 16, margin, |x, y| {
        let sx = x.saturating_sub(1);
        ((sx + y) % 200 + 20) as u16
    });

    let frames = FrameSet {
        test,
        reference,
        mask: None,
    };
    let mut driver = Driver::new(config, InMemorySequenceIo::new(vec![frames]));
    let mut buf = Vec::new();
    let mut reporter = TextReporter::new(&mut buf);
    driver.run(&mut reporter).unwrap();

    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("PSNR"));
    assert!(text.contains("IV-PSNR"));
}

#[test]
fn identical_frames_ssim_near_one() {
    let mut calc = CalcMetricConfig::default();
    calc.ssim = true;
    let config = base_config(calc);
    let margin = app::required_margin(&config);

    let pic = margin_pic(32, 32, margin, |x, y| ((x * 7 + y * 3) % 256) as u16);
    let frames = FrameSet {
        test: pic.clone(),
        reference: pic,
        mask: None,
    };
    let mut driver = Driver::new(config, InMemorySequenceIo::new(vec![frames]));
    let mut buf = Vec::new();
    let mut reporter = TextReporter::new(&mut buf);
    driver.run(&mut reporter).unwrap();

    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("SSIM frame 0:"));
    assert!(!text.contains("fake-infinity sentinel"));
}

#[test]
fn rejects_out_of_range_pels_under_abort_policy() {
    let mut calc = CalcMetricConfig::default();
    calc.psnr = true;
    let mut config = base_config(calc);
    config.invalid_pel_actn = PelAction::Abort;
    let margin = app::required_margin(&config);

    // bit_depth 8 caps pels at 255; write an out-of-range value directly
    // into the active area via an oversized fill then a single bad pel.
    let mut test = margin_pic(16, 16, margin, |_, _| 10);
    let mut reference = margin_pic(16, 16, margin, |_, _| 10);
    test.set(0, 0, 0, 9999);
    test.extend();
    reference.set(0, 0, 0, 9999);
    reference.extend();

    let frames = FrameSet { test, reference, mask: None };
    let mut driver = Driver::new(config, InMemorySequenceIo::new(vec![frames]));
    let mut buf = Vec::new();
    let mut reporter = TextReporter::new(&mut buf);
    assert!(driver.run(&mut reporter).is_err());
}
