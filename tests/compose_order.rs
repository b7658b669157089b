use mixel::{Canvas, CapturePresent, Context, Fps, Rgb, Rgba8, create_layer};

fn ctx_with_capture() -> (Context, CapturePresent) {
    let capture = CapturePresent::new();
    let ctx = Context::new(
        Canvas::new(8, 8).unwrap(),
        Fps::new(100, 1).unwrap(),
        Box::new(capture.clone()),
    )
    .unwrap();
    (ctx, capture)
}

fn solid(ctx: &mut Context, hex: &str) -> String {
    ctx.add_layer(create_layer(&format!("color://{hex}")).unwrap())
        .unwrap()
}

#[test]
fn top_layer_wins_with_opaque_blend() {
    let (mut ctx, capture) = ctx_with_capture();
    let a = solid(&mut ctx, "ff0000");
    let b = solid(&mut ctx, "0000ff");
    assert_eq!(ctx.index_of(&a), Some(0));
    assert_eq!(ctx.index_of(&b), Some(1));

    ctx.run(3).unwrap();
    let frame = capture.last().unwrap();
    assert_eq!(frame.get_pixel(4, 4), Some(Rgba8::opaque(0, 0, 255)));
}

#[test]
fn reordering_swaps_the_winner_on_the_next_frame() {
    let (mut ctx, capture) = ctx_with_capture();
    let a = solid(&mut ctx, "ff0000");
    let b = solid(&mut ctx, "0000ff");

    ctx.run(3).unwrap();
    assert_eq!(
        capture.last().unwrap().get_pixel(0, 0),
        Some(Rgba8::opaque(0, 0, 255))
    );

    // Swap A and B; A now composites on top.
    ctx.move_layer(&b, 0).unwrap();
    assert_eq!(ctx.index_of(&a), Some(1));
    ctx.run(2).unwrap();
    assert_eq!(
        capture.last().unwrap().get_pixel(0, 0),
        Some(Rgba8::opaque(255, 0, 0))
    );
}

#[test]
fn noop_moves_leave_order_and_output_stable() {
    let (mut ctx, capture) = ctx_with_capture();
    let a = solid(&mut ctx, "ff0000");
    let b = solid(&mut ctx, "0000ff");

    ctx.move_layer(&a, 0).unwrap();
    ctx.move_layer(&a, 0).unwrap();
    ctx.layer_down(&a).unwrap();
    ctx.layer_up(&b).unwrap();
    assert_eq!(ctx.index_of(&a), Some(0));
    assert_eq!(ctx.index_of(&b), Some(1));

    ctx.run(3).unwrap();
    assert_eq!(
        capture.last().unwrap().get_pixel(7, 7),
        Some(Rgba8::opaque(0, 0, 255))
    );
}

#[test]
fn colorkey_blend_punches_through_to_the_layer_below() {
    let (mut ctx, capture) = ctx_with_capture();
    let _below = solid(&mut ctx, "ff0000");
    let above = solid(&mut ctx, "00ff00");
    ctx.layer_mut(&above)
        .unwrap()
        .set_blit("colorkey:00ff00")
        .unwrap();
    assert_eq!(ctx.layer(&above).unwrap().get_blit(), "colorkey");

    ctx.run(3).unwrap();
    // The green layer is entirely key-colored, so the red below shows.
    assert_eq!(
        capture.last().unwrap().get_pixel(3, 3),
        Some(Rgba8::opaque(255, 0, 0))
    );
}

#[test]
fn unknown_blit_mode_is_rejected_and_previous_kept() {
    let (mut ctx, _capture) = ctx_with_capture();
    let name = solid(&mut ctx, "ffffff");
    let layer = ctx.layer_mut(&name).unwrap();
    layer.set_blit("alpha").unwrap();
    let err = layer.set_blit("multiply").unwrap_err();
    assert!(err.to_string().contains("unknown blit mode"));
    assert_eq!(layer.get_blit(), "alpha");

    // The parsed key color is carried by the mode.
    layer.set_blit("colorkey:112233").unwrap();
    assert_eq!(
        layer.get_blit(),
        mixel::BlendMode::ColorKey(Rgb {
            r: 0x11,
            g: 0x22,
            b: 0x33
        })
        .name()
    );
}
