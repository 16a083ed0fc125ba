use super::*;

fn transcoder() -> VideoTranscoder {
    VideoTranscoder::new(EncodeSpec::default(), "out/animated")
}

fn probe(width: u32, height: u32, duration: Option<f64>) -> ProbeResult {
    ProbeResult {
        width,
        height,
        duration,
    }
}

#[test]
fn single_variant_plan_orders_fps_geometry_time() {
    let plans = transcoder()
        .plan(
            Path::new("tmp/pepe.gif"),
            "pepe",
            &probe(128, 112, Some(3.5)),
            &[ResizePolicy::Scale],
        )
        .unwrap();
    assert_eq!(plans.len(), 1);
    let plan = &plans[0];
    assert_eq!(
        plan.filter_chain(),
        "fps=30,scale=512:-1:flags=lanczos,setpts=(2.9/3.5)*PTS"
    );
    assert_eq!(plan.variant_tag, VariantTag::Default);
    assert!(!plan.trimmed);
    assert_eq!(plan.output, PathBuf::from("out/animated/pepe_default.webm"));
}

#[test]
fn all_variants_yield_two_independent_plans() {
    let plans = transcoder()
        .plan(
            Path::new("tmp/pepe.gif"),
            "pepe",
            &probe(128, 112, Some(2.0)),
            &ResizePolicy::ALL,
        )
        .unwrap();
    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0].variant_tag, VariantTag::Default);
    assert_eq!(plans[1].variant_tag, VariantTag::Pad);
    assert_ne!(plans[0].output, plans[1].output);

    assert!(plans[0].filters.iter().all(|f| !f.starts_with("pad=")));
    assert!(plans[1].filters.iter().all(|f| !f.starts_with("scale=")));
    assert_eq!(
        plans[1].filter_chain(),
        "fps=30,pad=w=512:h='min(ih*2,512)':x='(ow-iw)/2':y='(oh-ih)/2':color=white@0"
    );
}

#[test]
fn duplicate_policies_are_planned_once() {
    let plans = transcoder()
        .plan(
            Path::new("a.gif"),
            "a",
            &probe(10, 10, None),
            &[ResizePolicy::Pad, ResizePolicy::Pad],
        )
        .unwrap();
    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].variant_tag, VariantTag::Pad);
}

#[test]
fn empty_variant_set_is_transcode_error() {
    let err = transcoder()
        .plan(Path::new("a.gif"), "a", &probe(10, 10, None), &[])
        .unwrap_err();
    assert!(matches!(err, StickerError::Transcode(_)));
}

#[test]
fn long_clip_is_trimmed_and_tagged() {
    let plans = transcoder()
        .plan(
            Path::new("tmp/long.gif"),
            "long",
            &probe(64, 64, Some(10.0)),
            &ResizePolicy::ALL,
        )
        .unwrap();
    for plan in &plans {
        assert!(plan.trimmed);
        assert!(plan.filter_chain().ends_with("trim=start=0:end=3,setpts=PTS-STARTPTS"));
        assert!(!plan.filter_chain().contains("2.9/"));
    }
    assert_eq!(
        plans[0].output,
        PathBuf::from("out/animated/long_default_trimmed.webm")
    );
    assert_eq!(
        plans[1].output,
        PathBuf::from("out/animated/long_pad_trimmed.webm")
    );
}

#[test]
fn missing_duration_uses_fallback_pts() {
    let plans = transcoder()
        .plan(
            Path::new("a.gif"),
            "a",
            &probe(100, 300, None),
            &[ResizePolicy::Scale],
        )
        .unwrap();
    assert_eq!(
        plans[0].filter_chain(),
        "fps=30,scale=-1:512:flags=lanczos,setpts=1*PTS"
    );
}

#[test]
fn ffmpeg_args_drop_audio_and_force_alpha_format() {
    let spec = EncodeSpec::default();
    let plan = transcoder()
        .plan(
            Path::new("tmp/pepe.gif"),
            "pepe",
            &probe(128, 128, Some(1.0)),
            &[ResizePolicy::Scale],
        )
        .unwrap()
        .remove(0);
    let args: Vec<String> = plan
        .ffmpeg_args(&spec)
        .into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();

    let pos = |flag: &str| args.iter().position(|a| a == flag).unwrap();
    assert!(args.contains(&"-an".to_string()));
    assert_eq!(args[pos("-i") + 1], "tmp/pepe.gif");
    assert_eq!(args[pos("-vf") + 1], "fps=30,scale=512:-1:flags=lanczos");
    assert_eq!(args[pos("-c:v") + 1], "libvpx-vp9");
    assert_eq!(args[pos("-pix_fmt") + 1], "yuva420p");
    assert_eq!(args.last().unwrap(), "out/animated/pepe_default.webm");
}

#[test]
fn failed_variant_removes_variants_already_written() {
    let tmp = tempfile::tempdir().unwrap();
    let t = VideoTranscoder::new(EncodeSpec::default(), tmp.path());
    let plans = t
        .plan(
            Path::new("tmp/pepe.gif"),
            "pepe",
            &probe(128, 112, Some(2.0)),
            &ResizePolicy::ALL,
        )
        .unwrap();

    let mut attempted = Vec::new();
    let err = execute_plans(plans, |plan| {
        attempted.push(plan.variant_tag);
        match plan.variant_tag {
            VariantTag::Default => {
                std::fs::write(&plan.output, b"webm").unwrap();
                Ok(())
            }
            VariantTag::Pad => Err(StickerError::transcode("encoder crashed")),
        }
    })
    .unwrap_err();

    assert!(matches!(err, StickerError::Transcode(_)));
    assert_eq!(attempted, vec![VariantTag::Default, VariantTag::Pad]);
    assert!(!tmp.path().join("pepe_default.webm").exists());
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[test]
fn successful_plans_are_all_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let t = VideoTranscoder::new(EncodeSpec::default(), tmp.path());
    let plans = t
        .plan(
            Path::new("tmp/pepe.gif"),
            "pepe",
            &probe(128, 112, Some(6.0)),
            &ResizePolicy::ALL,
        )
        .unwrap();

    let outputs = execute_plans(plans, |plan| {
        std::fs::write(&plan.output, b"webm").unwrap();
        Ok(())
    })
    .unwrap();

    assert_eq!(outputs.len(), 2);
    assert!(outputs.files.iter().all(|f| f.trimmed && f.path.is_file()));
}
