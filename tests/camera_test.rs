use cgmath::{InnerSpace, Point3};
use model_viewer::camera::{Camera, OrbitController};

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

fn camera() -> Camera {
    Camera::new((0.0, 0.0, 5.0), (0.0, 0.0, 0.0))
}

#[test]
fn no_input_leaves_the_camera_alone() {
    let mut controller = OrbitController::default();
    let mut camera = camera();

    assert!(!controller.update(&mut camera));
    assert_eq!(camera, self::camera());
}

#[test]
fn pointer_motion_without_a_drag_is_ignored() {
    let mut controller = OrbitController::default();

    controller.handle_mouse(40.0, 10.0);

    assert!(!controller.has_pending_input());
}

#[test]
fn orbit_keeps_the_distance_to_the_target() {
    let mut controller = OrbitController::default();
    let mut camera = camera();
    controller.handle_window_events(&left_press());

    controller.handle_mouse(120.0, -30.0);
    assert!(controller.update(&mut camera));

    assert!(approx(camera.distance(), 5.0));
    assert_eq!(camera.target, Point3::new(0.0, 0.0, 0.0));
    assert_ne!(camera.position, Point3::new(0.0, 0.0, 5.0));
}

#[test]
fn input_is_consumed_by_update() {
    let mut controller = OrbitController::default();
    let mut camera = camera();
    controller.handle_scroll(1.0);

    assert!(controller.update(&mut camera));
    let after = camera.clone();
    assert!(!controller.update(&mut camera));

    assert_eq!(camera, after);
}

#[test]
fn zoom_respects_distance_limits() {
    let mut controller = OrbitController::default().with_limits(Some(2.0), Some(10.0));
    let mut camera = camera();

    controller.handle_scroll(1000.0);
    controller.update(&mut camera);
    assert!(approx(camera.distance(), 2.0));

    controller.handle_scroll(-1000.0);
    controller.update(&mut camera);
    assert!(approx(camera.distance(), 10.0));
}

#[test]
fn camera_zooms_back_out_after_zooming_all_the_way_in() {
    let mut controller = OrbitController::default();
    let mut camera = camera();

    controller.handle_scroll(400.0);
    assert!(controller.update(&mut camera));
    let closest = camera.distance();
    assert!(closest > 0.0);

    controller.handle_scroll(-50.0);
    assert!(controller.update(&mut camera));
    assert!(camera.distance() > closest);
}

#[test]
fn vertical_orbit_stops_short_of_the_pole() {
    let mut controller = OrbitController::default();
    let mut camera = camera();
    controller.handle_window_events(&left_press());

    controller.handle_mouse(0.0, 100_000.0);
    controller.update(&mut camera);

    let offset = (camera.position - camera.target).normalize();
    assert!(offset.y < 1.0);
    assert!(offset.x.is_finite() && offset.z.is_finite());
    assert!(camera.calc_matrix().x.x.is_finite());
}

#[test]
fn pan_moves_target_and_position_together() {
    let mut controller = OrbitController::default();
    let mut camera = camera();
    controller.handle_window_events(&right_press());

    controller.handle_mouse(50.0, 0.0);
    controller.update(&mut camera);

    assert_ne!(camera.target, Point3::new(0.0, 0.0, 0.0));
    assert!(approx(camera.target.y, 0.0));
    assert!(approx(camera.distance(), 5.0));
}

fn left_press() -> winit::event::WindowEvent {
    press(winit::event::MouseButton::Left)
}

fn right_press() -> winit::event::WindowEvent {
    press(winit::event::MouseButton::Right)
}

#[allow(unused_unsafe)]
fn press(button: winit::event::MouseButton) -> winit::event::WindowEvent {
    winit::event::WindowEvent::MouseInput {
        // SAFETY: the id is only compared, never handed to the platform.
        device_id: unsafe { winit::event::DeviceId::dummy() },
        state: winit::event::ElementState::Pressed,
        button,
    }
}
