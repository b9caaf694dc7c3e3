//! Unit tests for the cursor grab controller

use super::*;
use crate::backend::headless::{HeadlessSeat, HeadlessSurface, SeatEvent};
use crate::backend::{KeyState, Modifiers};
use crate::geometry::Rect;
use crate::output::Output;
use crate::renderer::damage;
use crate::window::ViewKind;
use mockall::mock;
use mockall::predicate::eq;

fn setup() -> (Registry, HeadlessSeat, CursorGrab) {
    let mut registry = Registry::new();
    registry.outputs.add(Output::new("HDMI-1", 1920, 1080));
    (registry, HeadlessSeat::new(), CursorGrab::new("left_ptr"))
}

fn add_view(registry: &mut Registry, surface: u64, x: f64, y: f64, w: i32, h: i32) -> ViewId {
    let id = registry.add_view(
        Box::new(HeadlessSurface::new(surface, w, h)),
        ViewKind::Native,
        "app".into(),
        String::new(),
        None,
        (64, 48),
    );
    let view = registry.view_mut(id).unwrap();
    view.map();
    view.move_to(x, y);
    registry.show(id);
    id
}

fn point_at(grab: &mut CursorGrab, registry: &mut Registry, seat: &mut HeadlessSeat, x: f64, y: f64) {
    grab.warp(Point::new(x, y));
    grab.on_pointer_motion(registry, seat, 0);
}

fn drain_damage(registry: &mut Registry) -> Vec<Rect> {
    let output = registry.outputs.get_mut("HDMI-1").unwrap();
    damage::consume(output).rects().to_vec()
}

#[test]
fn test_release_without_grab_is_safe() {
    let (mut registry, mut seat, mut grab) = setup();

    grab.on_pointer_button(&mut registry, &mut seat, 0, 272, ButtonState::Released);

    assert_eq!(grab.mode(), GrabMode::Passthrough);
    assert!(grab.target().is_none());
    // Nothing had pointer focus, so nothing is forwarded
    assert!(seat.events().borrow().is_empty());
}

#[test]
fn test_begin_rejected_without_pointer_focus() {
    let (mut registry, mut seat, mut grab) = setup();
    let a = add_view(&mut registry, 1, 0.0, 0.0, 400, 300);
    let b = add_view(&mut registry, 2, 800.0, 0.0, 400, 300);

    point_at(&mut grab, &mut registry, &mut seat, 100.0, 100.0);
    assert_eq!(grab.pointer_focus(), Some(a));

    assert!(!grab.begin_interactive(&mut registry, b, GrabMode::Move, Edges::empty()));
    assert_eq!(grab.mode(), GrabMode::Passthrough);
    assert!(grab.begin_interactive(&mut registry, a, GrabMode::Move, Edges::empty()));
    assert_eq!(grab.mode(), GrabMode::Move);
}

#[test]
fn test_passthrough_enter_motion_and_leave() {
    let (mut registry, mut seat, mut grab) = setup();
    add_view(&mut registry, 1, 100.0, 100.0, 400, 300);
    let events = seat.events();

    point_at(&mut grab, &mut registry, &mut seat, 150.0, 120.0);
    point_at(&mut grab, &mut registry, &mut seat, 160.0, 130.0);
    point_at(&mut grab, &mut registry, &mut seat, 1000.0, 900.0);
    point_at(&mut grab, &mut registry, &mut seat, 1001.0, 900.0);

    assert_eq!(
        *events.borrow(),
        vec![
            SeatEvent::PointerEnter(1, 50.0, 20.0),
            SeatEvent::PointerMotion(60.0, 30.0),
            SeatEvent::ClearPointerFocus,
            SeatEvent::DefaultCursor("left_ptr".into()),
        ]
    );
    assert!(grab.pointer_surface().is_none());
}

#[test]
fn test_move_follows_pointer_and_damages_everything() {
    let (mut registry, mut seat, mut grab) = setup();
    let id = add_view(&mut registry, 1, 100.0, 100.0, 400, 300);
    point_at(&mut grab, &mut registry, &mut seat, 150.0, 150.0);
    drain_damage(&mut registry);

    assert!(grab.begin_interactive(&mut registry, id, GrabMode::Move, Edges::empty()));
    grab.motion_relative(&mut registry, &mut seat, 10, 50.0, 20.0);

    let view = registry.view(id).unwrap();
    assert_eq!((view.x, view.y), (150.0, 120.0));
    assert_eq!(drain_damage(&mut registry), vec![Rect::new(0, 0, 1920, 1080)]);
}

#[test]
fn test_move_restores_maximized_view_under_pointer() {
    let (mut registry, mut seat, mut grab) = setup();
    let id = add_view(&mut registry, 1, 100.0, 100.0, 400, 300);
    registry
        .view_mut(id)
        .unwrap()
        .maximize(Rect::new(0, 0, 1920, 1080));

    point_at(&mut grab, &mut registry, &mut seat, 960.0, 10.0);
    assert!(grab.begin_interactive(&mut registry, id, GrabMode::Move, Edges::empty()));
    grab.motion_relative(&mut registry, &mut seat, 10, 10.0, 0.0);

    let view = registry.view(id).unwrap();
    assert_eq!(view.state(), ViewState::Windowed);
    assert_eq!((view.width(), view.height()), (400, 300));
    let ratio = (970.0 - view.x) / 400.0;
    assert!((ratio - 970.0 / 1920.0).abs() < 1e-9);
}

#[test]
fn test_resize_turns_maximized_view_into_window() {
    let (mut registry, mut seat, mut grab) = setup();
    let surface = HeadlessSurface::new(1, 400, 300);
    let client = surface.handle();
    let id = registry.add_view(
        Box::new(surface),
        ViewKind::Native,
        "app".into(),
        String::new(),
        None,
        (64, 48),
    );
    registry.view_mut(id).unwrap().map();
    registry.show(id);
    let area = Rect::new(0, 0, 1920, 1080);
    registry.view_mut(id).unwrap().maximize(area);

    point_at(&mut grab, &mut registry, &mut seat, 1919.0, 1079.0);
    assert!(grab.begin_interactive(&mut registry, id, GrabMode::Resize, Edges::BOTTOM | Edges::RIGHT));
    assert!(!client.borrow().maximized);
    assert_eq!(
        registry.take_events(),
        vec![CompositorEvent::ViewMaximized {
            view: id,
            maximized: false
        }]
    );

    grab.motion_relative(&mut registry, &mut seat, 1, -500.0, -400.0);
    let view = registry.view(id).unwrap();
    assert_eq!(view.state(), ViewState::Windowed);
    assert_eq!((view.width(), view.height()), (1420, 680));
    assert!(registry.view_mut(id).unwrap().maximize(area));
}

#[test]
fn test_resize_turns_tiled_view_into_window() {
    let (mut registry, mut seat, mut grab) = setup();
    let id = add_view(&mut registry, 1, 100.0, 100.0, 400, 300);
    registry
        .view_mut(id)
        .unwrap()
        .tile(Edges::LEFT, Rect::new(0, 0, 1920, 1080));

    point_at(&mut grab, &mut registry, &mut seat, 959.0, 500.0);
    assert!(grab.begin_interactive(&mut registry, id, GrabMode::Resize, Edges::RIGHT));
    grab.motion_relative(&mut registry, &mut seat, 1, -100.0, 0.0);

    let view = registry.view(id).unwrap();
    assert_eq!(view.state(), ViewState::Windowed);
    assert_eq!(view.bounds(), Rect::new(0, 0, 860, 1080));
    assert!(registry.take_events().is_empty());
}

#[test]
fn test_resize_top_moves_y_and_height_inversely() {
    let (mut registry, mut seat, mut grab) = setup();
    let id = add_view(&mut registry, 1, 100.0, 100.0, 400, 300);
    point_at(&mut grab, &mut registry, &mut seat, 300.0, 100.0);

    assert!(grab.begin_interactive(&mut registry, id, GrabMode::Resize, Edges::TOP));
    grab.motion_relative(&mut registry, &mut seat, 10, 0.0, -50.0);

    let view = registry.view(id).unwrap();
    assert_eq!(view.y, 50.0);
    assert_eq!(view.height(), 350);
    assert_eq!(view.x, 100.0);
    assert_eq!(view.width(), 400);
}

#[test]
fn test_resize_bottom_changes_height_only() {
    let (mut registry, mut seat, mut grab) = setup();
    let id = add_view(&mut registry, 1, 100.0, 100.0, 400, 300);
    point_at(&mut grab, &mut registry, &mut seat, 300.0, 399.0);

    assert!(grab.begin_interactive(&mut registry, id, GrabMode::Resize, Edges::BOTTOM));
    grab.motion_relative(&mut registry, &mut seat, 10, 0.0, -50.0);

    let view = registry.view(id).unwrap();
    assert_eq!(view.y, 100.0);
    assert_eq!(view.height(), 250);
}

#[test]
fn test_resize_corner_adjusts_both_axes() {
    let (mut registry, mut seat, mut grab) = setup();
    let id = add_view(&mut registry, 1, 100.0, 100.0, 400, 300);
    point_at(&mut grab, &mut registry, &mut seat, 100.0, 100.0);

    assert!(grab.begin_interactive(&mut registry, id, GrabMode::Resize, Edges::TOP | Edges::LEFT));
    grab.motion_relative(&mut registry, &mut seat, 10, -30.0, -40.0);

    let view = registry.view(id).unwrap();
    assert_eq!((view.x, view.y), (70.0, 60.0));
    assert_eq!((view.width(), view.height()), (430, 340));
}

#[test]
fn test_resize_clamps_to_minimum_and_keeps_origin() {
    let (mut registry, mut seat, mut grab) = setup();
    let id = add_view(&mut registry, 1, 100.0, 100.0, 400, 300);
    point_at(&mut grab, &mut registry, &mut seat, 100.0, 200.0);

    assert!(grab.begin_interactive(&mut registry, id, GrabMode::Resize, Edges::LEFT));
    grab.motion_relative(&mut registry, &mut seat, 10, 380.0, 0.0);

    let view = registry.view(id).unwrap();
    assert_eq!(view.width(), 64);
    assert_eq!(view.x, 100.0);
}

#[test]
fn test_resize_damages_old_and_new_bounds() {
    let (mut registry, mut seat, mut grab) = setup();
    let id = add_view(&mut registry, 1, 100.0, 100.0, 400, 300);
    point_at(&mut grab, &mut registry, &mut seat, 499.0, 200.0);
    drain_damage(&mut registry);

    assert!(grab.begin_interactive(&mut registry, id, GrabMode::Resize, Edges::RIGHT));
    grab.motion_relative(&mut registry, &mut seat, 10, 100.0, 0.0);

    assert_eq!(drain_damage(&mut registry), vec![Rect::new(100, 100, 500, 300)]);
}

#[test]
fn test_opposing_edges_first_checked_wins() {
    assert_eq!((Edges::TOP | Edges::BOTTOM).exclusive(), Edges::TOP);
    assert_eq!((Edges::LEFT | Edges::RIGHT).exclusive(), Edges::LEFT);
    assert_eq!(Edges::all().exclusive(), Edges::TOP | Edges::LEFT);
    assert_eq!(Edges::BOTTOM.exclusive(), Edges::BOTTOM);

    let (mut registry, mut seat, mut grab) = setup();
    let id = add_view(&mut registry, 1, 100.0, 100.0, 400, 300);
    point_at(&mut grab, &mut registry, &mut seat, 200.0, 200.0);
    assert!(grab.begin_interactive(&mut registry, id, GrabMode::Resize, Edges::TOP | Edges::BOTTOM));
    assert_eq!(grab.edges(), Edges::TOP);
}

#[test]
fn test_release_ends_grab_and_is_forwarded() {
    let (mut registry, mut seat, mut grab) = setup();
    let id = add_view(&mut registry, 1, 100.0, 100.0, 400, 300);
    point_at(&mut grab, &mut registry, &mut seat, 150.0, 150.0);
    assert!(grab.begin_interactive(&mut registry, id, GrabMode::Move, Edges::empty()));

    grab.on_pointer_button(&mut registry, &mut seat, 20, 272, ButtonState::Released);

    assert_eq!(grab.mode(), GrabMode::Passthrough);
    assert!(grab.target().is_none());
    assert_eq!(
        seat.events().borrow().last(),
        Some(&SeatEvent::PointerButton(272, ButtonState::Released))
    );
}

#[test]
fn test_press_focuses_view_under_pointer() {
    let (mut registry, mut seat, mut grab) = setup();
    let back = add_view(&mut registry, 1, 0.0, 0.0, 400, 300);
    let front = add_view(&mut registry, 2, 200.0, 0.0, 400, 300);
    registry.focus(front, &mut seat);

    point_at(&mut grab, &mut registry, &mut seat, 50.0, 50.0);
    grab.on_pointer_button(&mut registry, &mut seat, 0, 272, ButtonState::Pressed);

    assert_eq!(registry.focused(), Some(back));
    assert_eq!(registry.stack().front(), Some(back));
    assert!(registry.view(back).unwrap().is_activated());
    assert!(!registry.view(front).unwrap().is_activated());
}

#[test]
fn test_removed_target_cancels_grab() {
    let (mut registry, mut seat, mut grab) = setup();
    let id = add_view(&mut registry, 1, 100.0, 100.0, 400, 300);
    point_at(&mut grab, &mut registry, &mut seat, 150.0, 150.0);
    assert!(grab.begin_interactive(&mut registry, id, GrabMode::Move, Edges::empty()));

    grab.view_removed(id, &mut seat);
    registry.remove_view(id);

    assert_eq!(grab.mode(), GrabMode::Passthrough);
    assert!(grab.pointer_focus().is_none());
    grab.motion_relative(&mut registry, &mut seat, 0, 5.0, 5.0);
    assert_eq!(grab.mode(), GrabMode::Passthrough);
}

#[test]
fn test_axis_forwarded_only_with_pointer_focus() {
    let (mut registry, mut seat, mut grab) = setup();
    add_view(&mut registry, 1, 100.0, 100.0, 400, 300);
    let events = seat.events();

    grab.on_pointer_axis(&mut seat, 0, AxisOrientation::Vertical, 10.0);
    assert!(events.borrow().is_empty());

    point_at(&mut grab, &mut registry, &mut seat, 150.0, 150.0);
    grab.on_pointer_axis(&mut seat, 0, AxisOrientation::Vertical, 10.0);
    assert_eq!(
        events.borrow().last(),
        Some(&SeatEvent::PointerAxis(AxisOrientation::Vertical, 10.0))
    );
}

#[test]
fn test_motion_is_clamped_to_layout() {
    let (mut registry, mut seat, mut grab) = setup();

    grab.motion_relative(&mut registry, &mut seat, 0, -500.0, 5000.0);
    assert_eq!(grab.position(), Point::new(0.0, 1079.0));

    grab.motion_absolute(&mut registry, &mut seat, 0, 0.5, 0.5);
    assert_eq!(grab.position(), Point::new(960.0, 540.0));
}

mock! {
    pub TestSeat {}
    impl Seat for TestSeat {
        fn pointer_enter(&mut self, surface: SurfaceId, sx: f64, sy: f64);
        fn pointer_motion(&mut self, time: u32, sx: f64, sy: f64);
        fn pointer_button(&mut self, time: u32, button: u32, state: ButtonState);
        fn pointer_axis(&mut self, time: u32, orientation: AxisOrientation, delta: f64);
        fn clear_pointer_focus(&mut self);
        fn set_default_cursor(&mut self, image: &str);
        fn keyboard_enter(&mut self, surface: SurfaceId);
        fn clear_keyboard_focus(&mut self);
        fn keyboard_key(&mut self, time: u32, key: u32, state: KeyState);
        fn keyboard_modifiers(&mut self, modifiers: Modifiers);
    }
}

#[test]
fn test_grab_consumes_motion_instead_of_forwarding() {
    let (mut registry, _, mut grab) = setup();
    let id = add_view(&mut registry, 7, 100.0, 100.0, 400, 300);

    let mut seat = MockTestSeat::new();
    seat.expect_pointer_enter()
        .with(eq(7u64), eq(50.0), eq(50.0))
        .times(1)
        .return_const(());
    seat.expect_pointer_motion().times(0);

    grab.warp(Point::new(150.0, 150.0));
    grab.on_pointer_motion(&mut registry, &mut seat, 0);
    assert!(grab.begin_interactive(&mut registry, id, GrabMode::Move, Edges::empty()));
    grab.motion_relative(&mut registry, &mut seat, 1, 10.0, 10.0);
    grab.motion_relative(&mut registry, &mut seat, 2, 10.0, 10.0);

    assert_eq!(registry.view(id).unwrap().x, 120.0);
}
