use std::cell::Cell;
use std::fs;
use std::rc::Rc;
use std::time::Duration;

use glam::{Quat, Vec2, Vec3};
use lineframe::{
    generated_fragment_shader, setup_matrix, AttributeLocation, BackendCall, PointerButtons,
    RecordingBackend, ReloadOutcome, RenderSurface, ShaderPaths, SourceJoin, SurfaceError,
    SurfaceOptions, SurfaceState, UniformLocation, UniformValue, UNREADABLE_SOURCE,
};
use tempfile::TempDir;

const VERTEX: &str = "attribute highp vec4 posAttr;
attribute lowp vec4 colAttr;
varying lowp vec4 col;
uniform highp mat4 matrix;
uniform float time;
void main() {
    col = colAttr;
    gl_Position = matrix * (posAttr + vec4(0.0, 0.05 * sin(time), 0.0, 0.0));
}
";

struct Fixture {
    _dir: TempDir,
    paths: ShaderPaths,
    surface: RenderSurface<RecordingBackend>,
}

fn fixture_with(vertex: &str, fragment: &str, join: SourceJoin) -> Fixture {
    let dir = TempDir::new().unwrap();
    let paths = ShaderPaths::new(
        dir.path().join("vertexShader.glsl"),
        dir.path().join("fragmentShader.glsl"),
    );
    fs::write(&paths.vertex, vertex).unwrap();
    fs::write(&paths.fragment, fragment).unwrap();
    let options = SurfaceOptions {
        shaders: paths.clone(),
        line_join: join,
        ..SurfaceOptions::default()
    };
    let surface = RenderSurface::new(RecordingBackend::new(), options);
    Fixture {
        _dir: dir,
        paths,
        surface,
    }
}

fn ready_fixture() -> Fixture {
    let mut fixture = fixture_with(VERTEX, &generated_fragment_shader("col"), SourceJoin::Newline);
    fixture.surface.initialize().unwrap();
    fixture.surface.backend_mut().clear_calls();
    fixture
}

fn redraw_counter(surface: &mut RenderSurface<RecordingBackend>) -> Rc<Cell<u32>> {
    let count = Rc::new(Cell::new(0));
    let handle = Rc::clone(&count);
    surface.set_redraw_handle(move || handle.set(handle.get() + 1));
    count
}

#[test]
fn frame_follows_bind_upload_draw_release_order() {
    let mut fixture = ready_fixture();
    let surface = &mut fixture.surface;
    surface.update_shape(vec![0.0, 0.0, 1.0, 1.0], vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    surface.backend_mut().clear_calls();
    surface.render_frame().unwrap();

    let program = surface.programs().program().unwrap();
    let position = AttributeLocation(0);
    let color = AttributeLocation(1);
    let expected = vec![
        BackendCall::BeginFrame([0.0, 0.0, 0.0, 1.0]),
        BackendCall::BindProgram(program),
        BackendCall::SetUniform(
            UniformLocation(0),
            UniformValue::Mat4(setup_matrix(Quat::IDENTITY)),
        ),
        BackendCall::SetUniform(UniformLocation(64), UniformValue::Float(0.0)),
        BackendCall::SetAttributeArray {
            location: position,
            components: 2,
            len: 4,
        },
        BackendCall::SetAttributeArray {
            location: color,
            components: 3,
            len: 6,
        },
        BackendCall::EnableAttributeArray(position),
        BackendCall::EnableAttributeArray(color),
        BackendCall::DrawLines { first: 0, count: 2 },
        BackendCall::DisableAttributeArray(position),
        BackendCall::DisableAttributeArray(color),
        BackendCall::ReleaseProgram,
        BackendCall::EndFrame,
    ];
    assert_eq!(surface.backend().calls(), expected.as_slice());
    assert_eq!(surface.backend().enabled_attribute_arrays().count(), 0);
}

#[test]
fn draw_count_is_half_the_position_length() {
    let mut fixture = ready_fixture();
    let surface = &mut fixture.surface;
    let positions: Vec<f32> = (0..12).map(|value| value as f32).collect();
    surface.update_shape(positions, vec![0.5; 18]);
    surface.render_frame().unwrap();
    assert_eq!(surface.backend().draw_counts(), vec![6]);
}

#[test]
fn empty_geometry_still_issues_zero_count_draw() {
    let mut fixture = ready_fixture();
    let surface = &mut fixture.surface;
    surface.render_frame().unwrap();
    assert_eq!(surface.backend().draw_counts(), vec![0]);
    assert_eq!(
        surface
            .backend()
            .count(|call| matches!(call, BackendCall::EndFrame)),
        1
    );
}

#[test]
fn update_shape_notifies_each_listener_once() {
    let mut fixture = ready_fixture();
    let surface = &mut fixture.surface;
    let first = Rc::new(Cell::new(0));
    let second = Rc::new(Cell::new(0));
    {
        let first = Rc::clone(&first);
        surface.add_shape_listener(move || first.set(first.get() + 1));
        let second = Rc::clone(&second);
        surface.add_shape_listener(move || second.set(second.get() + 1));
    }

    surface.update_shape(vec![0.0; 4], vec![0.0; 6]);
    assert_eq!((first.get(), second.get()), (1, 1));
    surface.update_shape(vec![], vec![]);
    assert_eq!((first.get(), second.get()), (2, 2));
    assert!(surface.geometry().is_empty());
}

#[test]
fn ticks_accumulate_time_and_reach_the_shader() {
    let mut fixture = ready_fixture();
    let surface = &mut fixture.surface;
    for _ in 0..10 {
        surface.on_tick();
    }
    assert!((surface.time() - 0.5).abs() < 1e-5);

    surface.render_frame().unwrap();
    let uploaded = surface.backend().calls().iter().find_map(|call| match call {
        BackendCall::SetUniform(UniformLocation(64), UniformValue::Float(time)) => Some(*time),
        _ => None,
    });
    assert!((uploaded.unwrap() - 0.5).abs() < 1e-5);
}

#[test]
fn redraw_requests_coalesce_until_a_frame_renders() {
    let mut fixture = ready_fixture();
    let surface = &mut fixture.surface;
    surface.render_frame().unwrap();
    let requests = redraw_counter(surface);

    surface.on_tick();
    surface.on_tick();
    surface.on_pointer_move(Vec2::new(5.0, 5.0), PointerButtons::PRIMARY);
    assert_eq!(requests.get(), 1);
    assert!(surface.is_redraw_pending());

    surface.render_frame().unwrap();
    assert!(!surface.is_redraw_pending());
    surface.on_tick();
    assert_eq!(requests.get(), 2);
}

#[test]
fn poll_clock_ticks_once_per_deadline() {
    let mut fixture = ready_fixture();
    let surface = &mut fixture.surface;
    let deadline = surface.next_tick_deadline().expect("clock running");
    assert!(!surface.poll_clock(deadline - Duration::from_millis(1)));
    assert!(surface.poll_clock(deadline + Duration::from_millis(200)));
    assert!(!surface.poll_clock(deadline + Duration::from_millis(200)));
    assert!((surface.time() - 0.05).abs() < 1e-6);
}

#[test]
fn drag_rotation_composes_on_the_left() {
    let mut fixture = ready_fixture();
    let surface = &mut fixture.surface;
    surface.on_pointer_move(Vec2::new(100.0, 100.0), PointerButtons::NONE);
    assert_eq!(surface.orientation(), Quat::IDENTITY);

    surface.on_pointer_move(Vec2::new(110.0, 100.0), PointerButtons::PRIMARY);
    let after_first = surface.orientation();
    surface.on_pointer_move(Vec2::new(110.0, 120.0), PointerButtons::PRIMARY);

    let step = Quat::from_axis_angle(Vec3::Y, 0.0) * Quat::from_axis_angle(Vec3::X, 10f32.to_radians());
    assert!(surface.orientation().abs_diff_eq(step * after_first, 1e-5));
}

#[test]
fn opposite_drag_orders_give_different_orientations() {
    let mut horizontal_first = ready_fixture();
    horizontal_first
        .surface
        .on_pointer_move(Vec2::new(20.0, 0.0), PointerButtons::PRIMARY);
    horizontal_first
        .surface
        .on_pointer_move(Vec2::new(20.0, 20.0), PointerButtons::PRIMARY);

    let mut vertical_first = ready_fixture();
    vertical_first
        .surface
        .on_pointer_move(Vec2::new(0.0, 20.0), PointerButtons::PRIMARY);
    vertical_first
        .surface
        .on_pointer_move(Vec2::new(20.0, 20.0), PointerButtons::PRIMARY);

    assert!(!horizontal_first
        .surface
        .orientation()
        .abs_diff_eq(vertical_first.surface.orientation(), 1e-4));
}

#[test]
fn reload_releases_old_program_before_building_new_one() {
    let mut fixture = ready_fixture();
    let old = fixture.surface.programs().program().unwrap();
    fs::write(&fixture.paths.fragment, generated_fragment_shader("col * 0.5")).unwrap();

    let outcome = fixture.surface.on_file_changed(&fixture.paths.fragment);
    let new = match outcome {
        ReloadOutcome::Ready(program) => program,
        other => panic!("unexpected outcome: {other:?}"),
    };
    assert_ne!(old, new);

    let calls = fixture.surface.backend().calls();
    let destroyed = calls
        .iter()
        .position(|call| *call == BackendCall::DestroyProgram(old))
        .unwrap();
    let created = calls
        .iter()
        .position(|call| *call == BackendCall::CreateProgram(new))
        .unwrap();
    assert!(destroyed < created);
    assert_eq!(fixture.surface.backend().live_programs(), 1);
}

#[test]
fn failed_reload_renders_clear_only_frames() {
    let mut fixture = ready_fixture();
    fs::write(&fixture.paths.vertex, "void main() { gl_Position = ; }").unwrap();
    assert!(matches!(
        fixture.surface.on_file_changed(&fixture.paths.vertex),
        ReloadOutcome::Failed(_)
    ));

    let surface = &mut fixture.surface;
    surface.backend_mut().clear_calls();
    surface.render_frame().unwrap();
    assert_eq!(
        surface.backend().calls(),
        &[BackendCall::BeginFrame([0.0, 0.0, 0.0, 1.0]), BackendCall::EndFrame]
    );
}

#[test]
fn reload_from_unreadable_source_renders_clear_only_frames() {
    let mut fixture = ready_fixture();
    fs::remove_file(&fixture.paths.vertex).unwrap();
    assert!(matches!(
        fixture.surface.on_file_changed(&fixture.paths.vertex),
        ReloadOutcome::Failed(_)
    ));
    assert!(fixture.surface.programs().program().is_none());

    let surface = &mut fixture.surface;
    surface.backend_mut().clear_calls();
    surface.render_frame().unwrap();
    assert_eq!(
        surface.backend().calls(),
        &[BackendCall::BeginFrame([0.0, 0.0, 0.0, 1.0]), BackendCall::EndFrame]
    );
}

#[test]
fn fragment_change_rereads_vertex_source() {
    let mut fixture = ready_fixture();
    fs::write(&fixture.paths.vertex, VERTEX.replace("posAttr", "position")).unwrap();
    assert!(matches!(
        fixture.surface.on_file_changed(&fixture.paths.fragment),
        ReloadOutcome::Unusable { .. }
    ));
}

#[test]
fn unusable_reload_is_never_bound() {
    let mut fixture = ready_fixture();
    let without_matrix = VERTEX
        .replace("uniform highp mat4 matrix;\n", "")
        .replace("matrix * ", "");
    fs::write(&fixture.paths.vertex, without_matrix).unwrap();
    assert!(matches!(
        fixture.surface.on_file_changed(&fixture.paths.vertex),
        ReloadOutcome::Unusable { .. }
    ));

    let surface = &mut fixture.surface;
    surface.backend_mut().clear_calls();
    surface.render_frame().unwrap();
    assert_eq!(
        surface
            .backend()
            .count(|call| matches!(call, BackendCall::BindProgram(_))),
        0
    );
}

#[test]
fn unreadable_source_fails_initialisation() {
    let mut fixture = fixture_with(VERTEX, &generated_fragment_shader("col"), SourceJoin::Newline);
    fs::remove_file(&fixture.paths.vertex).unwrap();
    let err = fixture.surface.initialize().unwrap_err();
    assert!(matches!(err, SurfaceError::Shader(_)));
    assert_eq!(fixture.surface.state(), SurfaceState::Uninitialised);
    assert_eq!(lineframe::read_source(&fixture.paths.vertex, SourceJoin::Newline), UNREADABLE_SOURCE);
}

#[test]
fn concatenated_sources_still_build_without_line_comments() {
    let vertex = "attribute highp vec4 posAttr;\nattribute lowp vec4 colAttr;\nvarying lowp vec4 col;\nuniform highp mat4 matrix;\nvoid main() {\n    col = colAttr;\n    gl_Position = matrix * posAttr;\n}\n";
    let mut fixture = fixture_with(vertex, &generated_fragment_shader("col"), SourceJoin::Concatenate);
    fixture.surface.initialize().unwrap();
    assert!(fixture.surface.programs().usable().is_some());
}

#[test]
fn frames_require_initialisation() {
    let mut fixture = fixture_with(VERTEX, &generated_fragment_shader("col"), SourceJoin::Newline);
    assert!(matches!(
        fixture.surface.render_frame(),
        Err(SurfaceError::NotInitialised)
    ));
    assert!(matches!(
        fixture.surface.on_file_changed(&fixture.paths.vertex),
        ReloadOutcome::Skipped
    ));
}

#[test]
fn surface_errors_reach_the_host() {
    let mut fixture = ready_fixture();
    fixture
        .surface
        .backend_mut()
        .fail_next_frame(wgpu::SurfaceError::Outdated);
    let err = fixture.surface.render_frame().unwrap_err();
    assert!(matches!(
        err.as_surface_error(),
        Some(wgpu::SurfaceError::Outdated)
    ));
    fixture.surface.render_frame().unwrap();
}

#[test]
fn teardown_releases_everything_once() {
    let mut fixture = ready_fixture();
    let surface = &mut fixture.surface;
    let program = surface.programs().program().unwrap();
    surface.teardown();
    surface.teardown();

    assert_eq!(
        surface.backend().calls(),
        &[
            BackendCall::MakeCurrent,
            BackendCall::DestroyProgram(program),
            BackendCall::ReleaseBuffers,
            BackendCall::DoneCurrent,
        ]
    );
    assert_eq!(surface.state(), SurfaceState::TornDown);
    assert!(matches!(surface.render_frame(), Err(SurfaceError::TornDown)));
    assert!(surface.next_tick_deadline().is_none());
}

#[test]
fn generated_fragment_shader_lands_at_configured_path() {
    let fixture = ready_fixture();
    fixture
        .surface
        .write_generated_fragment_shader("0.2, 0.4, 0.6, 1.0")
        .unwrap();
    let written = fs::read_to_string(&fixture.paths.fragment).unwrap();
    assert_eq!(
        written.lines().nth(2),
        Some("    gl_FragColor = vec4(0.2, 0.4, 0.6, 1.0);")
    );
}

#[test]
fn resize_forwards_non_empty_sizes() {
    let mut fixture = ready_fixture();
    fixture.surface.resize(0, 200);
    fixture.surface.resize(640, 480);
    assert_eq!(fixture.surface.backend().size(), (640, 480));
    assert_eq!(
        fixture
            .surface
            .backend()
            .count(|call| matches!(call, BackendCall::Resize { .. })),
        1
    );
}
