use super::*;

fn probe(width: u32, height: u32, duration: Option<f64>) -> ProbeResult {
    ProbeResult {
        width,
        height,
        duration,
    }
}

#[test]
fn classification_boundaries() {
    assert_eq!(DurationClass::classify(None), DurationClass::NoDuration);
    assert_eq!(DurationClass::classify(Some(2.0)), DurationClass::Short(2.0));
    assert_eq!(DurationClass::classify(Some(3.0)), DurationClass::Short(3.0));
    assert_eq!(
        DurationClass::classify(Some(3.0001)),
        DurationClass::Medium(3.0001)
    );
    assert_eq!(DurationClass::classify(Some(3.5)), DurationClass::Medium(3.5));
    assert_eq!(DurationClass::classify(Some(4.5)), DurationClass::Medium(4.5));
    assert_eq!(DurationClass::classify(Some(4.51)), DurationClass::Long(4.51));
    assert_eq!(DurationClass::classify(Some(10.0)), DurationClass::Long(10.0));
}

#[test]
fn each_class_maps_to_one_time_filter_branch() {
    assert_eq!(DurationClass::NoDuration.filters(), vec!["setpts=1*PTS"]);
    assert!(DurationClass::Short(2.0).filters().is_empty());
    assert_eq!(
        DurationClass::Medium(3.5).filters(),
        vec!["setpts=(2.9/3.5)*PTS"]
    );
    assert_eq!(
        DurationClass::Long(5.0).filters(),
        vec!["trim=start=0:end=3", "setpts=PTS-STARTPTS"]
    );
}

#[test]
fn only_long_clips_are_trimmed() {
    assert!(DurationClass::Long(5.0).is_trimmed());
    assert!(!DurationClass::Medium(4.0).is_trimmed());
    assert!(!DurationClass::Short(1.0).is_trimmed());
    assert!(!DurationClass::NoDuration.is_trimmed());
}

#[test]
fn effective_duration_never_exceeds_three_seconds_when_known() {
    for d in [0.5, 2.0, 3.0, 3.2, 4.5, 5.0, 10.0, 60.0] {
        let eff = DurationClass::classify(Some(d)).effective_secs().unwrap();
        assert!(eff <= 3.0, "duration {d} -> {eff}");
    }
    let sped = DurationClass::classify(Some(3.5)).effective_secs().unwrap();
    assert!((sped - 2.9).abs() < 1e-9);
}

#[test]
fn scale_fits_the_longer_side() {
    assert_eq!(
        geometry_filters(ResizePolicy::Scale, &probe(200, 100, None)),
        vec!["scale=512:-1:flags=lanczos"]
    );
    assert_eq!(
        geometry_filters(ResizePolicy::Scale, &probe(100, 100, None)),
        vec!["scale=512:-1:flags=lanczos"]
    );
    assert_eq!(
        geometry_filters(ResizePolicy::Scale, &probe(100, 200, None)),
        vec!["scale=-1:512:flags=lanczos"]
    );
}

#[test]
fn pad_uses_doubled_cap_on_the_short_axis() {
    assert_eq!(
        geometry_filters(ResizePolicy::Pad, &probe(128, 112, None)),
        vec!["pad=w=512:h='min(ih*2,512)':x='(ow-iw)/2':y='(oh-ih)/2':color=white@0"]
    );
    assert_eq!(
        geometry_filters(ResizePolicy::Pad, &probe(112, 128, None)),
        vec!["pad=w='min(iw*2,512)':h=512:x='(ow-iw)/2':y='(oh-ih)/2':color=white@0"]
    );
}

#[test]
fn pad_downscales_oversized_sources_first() {
    let filters = geometry_filters(ResizePolicy::Pad, &probe(1024, 256, None));
    assert_eq!(filters.len(), 2);
    assert!(filters[0].starts_with("scale=512:512:force_original_aspect_ratio=decrease"));
    assert!(filters[1].starts_with("pad=w=512:"));
}

#[test]
fn scale_output_maps_longer_side_to_canvas() {
    assert_eq!(output_size(ResizePolicy::Scale, 128, 64), (512, 256));
    assert_eq!(output_size(ResizePolicy::Scale, 64, 128), (256, 512));
    assert_eq!(output_size(ResizePolicy::Scale, 1000, 1000), (512, 512));
    let (w, h) = output_size(ResizePolicy::Scale, 300, 200);
    assert_eq!(w, 512);
    assert!((f64::from(w) / f64::from(h) - 1.5).abs() < 0.01);
}

#[test]
fn pad_output_is_canvas_sized_on_padded_axis() {
    assert_eq!(output_size(ResizePolicy::Pad, 128, 112), (512, 224));
    assert_eq!(output_size(ResizePolicy::Pad, 400, 300), (512, 512));
    assert_eq!(output_size(ResizePolicy::Pad, 112, 128), (224, 512));
    assert_eq!(output_size(ResizePolicy::Pad, 1024, 256), (512, 256));
    for (w, h) in [(1, 1), (512, 512), (2000, 30), (30, 2000)] {
        let (ow, oh) = output_size(ResizePolicy::Pad, w, h);
        assert!(ow <= 512 && oh <= 512);
        assert!(ow == 512 || oh == 512);
    }
}

#[test]
fn numbers_render_without_trailing_zeros() {
    assert_eq!(fmt_num(2.9), "2.9");
    assert_eq!(fmt_num(3.0), "3");
    assert_eq!(fmt_num(3.504), "3.504");
}
