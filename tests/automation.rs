use mixel::{
    Automation, AutomationKind, Canvas, CapturePresent, Context, Fps, ParamValue, SharedLevel,
    Target, create_layer,
};
use mixel::Rgba8;

fn ctx_with_capture() -> (Context, CapturePresent) {
    let capture = CapturePresent::new();
    let ctx = Context::new(
        Canvas::new(8, 8).unwrap(),
        Fps::new(200, 1).unwrap(),
        Box::new(capture.clone()),
    )
    .unwrap();
    (ctx, capture)
}

#[test]
fn opacity_ramp_reaches_full_and_clamps() {
    let (mut ctx, capture) = ctx_with_capture();
    let name = ctx
        .add_layer(create_layer("color://ffffff").unwrap())
        .unwrap();
    {
        let layer = ctx.layer_mut(&name).unwrap();
        layer.set_blit("alpha").unwrap();
        layer
            .set_parameter("opacity", ParamValue::Number(0.0))
            .unwrap();
        layer.add_automation(Automation::new(
            Target::Param("opacity".into()),
            AutomationKind::Ramp {
                from: 0.0,
                to: 255.0,
                frames: 4,
            },
        ));
    }

    ctx.run(4).unwrap();
    assert_eq!(
        ctx.layer(&name).unwrap().get_parameter("opacity"),
        Some(ParamValue::Number(255.0))
    );
    // One-shot removed itself; later frames clamp, no overshoot or decay.
    ctx.run(4).unwrap();
    assert_eq!(
        ctx.layer(&name).unwrap().get_parameter("opacity"),
        Some(ParamValue::Number(255.0))
    );
    assert_eq!(ctx.layer(&name).unwrap().automation_count(), 0);
    assert_eq!(
        capture.last().unwrap().get_pixel(4, 4),
        Some(Rgba8::opaque(255, 255, 255))
    );
}

#[test]
fn fade_pulse_removes_the_layer_when_complete() {
    let (mut ctx, _capture) = ctx_with_capture();
    let name = ctx
        .add_layer(create_layer("color://ff00ff").unwrap())
        .unwrap();
    ctx.layer_mut(&name).unwrap().pulse_alpha(64, 255);

    ctx.run(12).unwrap();
    assert_eq!(ctx.layer_count(), 0);
    assert_eq!(ctx.stats().faded_out, 1);
}

#[test]
fn audio_follow_tracks_the_collector_level() {
    let (mut ctx, capture) = ctx_with_capture();
    let level = SharedLevel::new();
    ctx.set_audio(level.clone());

    let name = ctx
        .add_layer(create_layer("color://ffffff").unwrap())
        .unwrap();
    {
        let layer = ctx.layer_mut(&name).unwrap();
        layer.set_blit("alpha").unwrap();
        layer
            .set_parameter("opacity", ParamValue::Number(0.0))
            .unwrap();
        layer.add_automation(Automation::new(
            Target::Param("opacity".into()),
            AutomationKind::AudioFollow { gain: 255.0 },
        ));
    }

    // Silence: fully transparent over the black clear color.
    ctx.run(3).unwrap();
    assert_eq!(
        capture.last().unwrap().get_pixel(0, 0),
        Some(Rgba8::opaque(0, 0, 0))
    );

    // Full level: fully opaque.
    level.store(1.0);
    ctx.run(3).unwrap();
    assert_eq!(
        capture.last().unwrap().get_pixel(0, 0),
        Some(Rgba8::opaque(255, 255, 255))
    );
}

#[test]
fn spin_rotates_a_little_every_frame() {
    let (mut ctx, _capture) = ctx_with_capture();
    let name = ctx
        .add_layer(create_layer("color://808080").unwrap())
        .unwrap();
    ctx.layer_mut(&name).unwrap().set_spin(90.0, 0.0);

    ctx.run(4).unwrap();
    let rotation = ctx.layer(&name).unwrap().geometry().rotation;
    // 90 deg/s at 200 fps over 4 frames = 1.8 degrees.
    assert!((rotation - 1.8).abs() < 1e-6);
}
