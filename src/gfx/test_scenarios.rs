// src/gfx/test_scenarios.rs
//! End-to-end frames against the headless backend

use std::cell::RefCell;
use std::f32::consts::PI;
use std::rc::Rc;

use cgmath::{InnerSpace, Matrix, Matrix4, Point3, Rad, SquareMatrix, Vector3, Vector4, Zero};
use anyhow::Context;
use rand::Rng;

use crate::backend::{
    Capability, DepthFunc, GlEvent, GpuContext, HeadlessApi, StorageClass, TextureHandle,
    TextureTarget,
};
use crate::config::{EngineConfig, CAMERA_MATRICES, MAX_SCENE_LIGHTS};
use crate::gfx::camera::{Camera, Camera3D, CameraMatricesBlock, CameraPositionBlock, SharedCamera};
use crate::gfx::context::RenderContext;
use crate::gfx::lights::{Attenuation, Light, LightColors, LightType};
use crate::gfx::resources::{StructResource, UpdateMode};
use crate::gfx::scene::components::{
    ArrayMesh, ClipPlaneComponent, Drawable, LightComponent, MeshComponent, ShaderComponent,
    SkyboxComponent, TextureComponent, TransformComponent, VariableComponent,
};
use crate::gfx::scene::{Component, Node, NodeRef, Scene};
use crate::gfx::shader::{builtin, ShaderProgram, UniformWrite};
use crate::gfx::uniform::UniformValue;

const SHADED_VERTEX: &str = "#version 430
layout(location = 0) in vec3 a_position;
layout(std140, binding = 0) uniform CameraMatrices { mat4 view; mat4 projection; };
uniform mat4 u_model;
uniform vec4 u_clipPlanes[8];
void main() { gl_Position = projection * view * u_model * vec4(a_position, 1.0); }
";

const SHADED_FRAGMENT: &str = "#version 430
uniform sampler2D u_tex;
uniform vec4 u_tint;
out vec4 frag_color;
void main() { frag_color = texture(u_tex, vec2(0.5)) * u_tint; }
";

const K_VERTEX: &str = "#version 430\nvoid main(){gl_Position=vec4(0);}";
const K_FRAGMENT: &str = "#version 430\nuniform float k;\nout vec4 c;\nvoid main(){c=vec4(k);}";

fn setup() -> anyhow::Result<(HeadlessApi, RenderContext)> {
    let _ = env_logger::builder().is_test(true).try_init();
    let api = HeadlessApi::new();
    let gpu = GpuContext::new(api.clone());
    let ctx = RenderContext::new(&gpu, EngineConfig::default())?;
    Ok((api, ctx))
}

fn triangle(ctx: &RenderContext) -> anyhow::Result<Rc<dyn Drawable>> {
    let vertex_array = ctx
        .gpu
        .api()
        .create_vertex_array()
        .map_err(anyhow::Error::msg)?;
    Ok(Rc::new(ArrayMesh::triangles(vertex_array, 3)))
}

fn texture(ctx: &RenderContext) -> anyhow::Result<TextureHandle> {
    ctx.gpu.api().create_texture().map_err(anyhow::Error::msg)
}

fn k_writes(api: &HeadlessApi, program: &ShaderProgram) -> Vec<UniformValue> {
    api.events()
        .into_iter()
        .filter_map(|event| match event {
            GlEvent::Uniform {
                program: p,
                name,
                value,
            } if p == program.handle() && name == "k" => Some(value),
            _ => None,
        })
        .collect()
}

#[test]
fn test_configured_uniform_reaches_gpu_on_activation() -> anyhow::Result<()> {
    let (api, ctx) = setup()?;
    let program = ctx.create_program("k", K_VERTEX, K_FRAGMENT)?;
    program.configure_uniform("k", || 0.25f32);

    program.activate()?;

    assert_eq!(k_writes(&api, &program), vec![UniformValue::Float(0.25)]);
    assert_eq!(
        api.uniform_value(program.handle(), "k"),
        Some(UniformValue::Float(0.25))
    );
    assert_eq!(program.validation_warnings(), 0);
    assert_eq!(api.error_count(), 0);
    Ok(())
}

#[test]
fn test_write_to_inactive_program_waits_for_top() -> anyhow::Result<()> {
    let (api, mut ctx) = setup()?;
    let a = ctx.create_program("a", K_VERTEX, K_FRAGMENT)?;
    let b = ctx.create_program("b", K_VERTEX, K_FRAGMENT)?;

    ctx.shaders.push(Rc::clone(&a));
    ctx.shaders.top();
    assert_eq!(b.set_uniform("k", 1.0f32), UniformWrite::Deferred);
    assert_eq!(b.pending_len(), 1);
    assert!(k_writes(&api, &b).is_empty());

    ctx.shaders.push(Rc::clone(&b));
    ctx.shaders.top();

    assert_eq!(k_writes(&api, &b), vec![UniformValue::Float(1.0)]);
    assert_eq!(b.pending_len(), 0);
    assert!(k_writes(&api, &a).is_empty());
    assert_eq!(api.uniform_value(a.handle(), "k"), None);
    Ok(())
}

#[test]
fn test_deferred_writes_flush_in_order() -> anyhow::Result<()> {
    let (api, ctx) = setup()?;
    let program = ctx.create_program("k", K_VERTEX, K_FRAGMENT)?;
    ctx.shaders.top();

    for value in [1.0f32, 2.0, 3.0] {
        program.set_uniform("k", value);
    }
    program.activate()?;

    assert_eq!(
        k_writes(&api, &program),
        vec![
            UniformValue::Float(1.0),
            UniformValue::Float(2.0),
            UniformValue::Float(3.0)
        ]
    );
    assert_eq!(
        api.uniform_value(program.handle(), "k"),
        Some(UniformValue::Float(3.0))
    );
    Ok(())
}

/// Records the clip distances enabled when it is visited
struct ClipWatcher {
    api: HeadlessApi,
    seen: RefCell<Vec<u32>>,
}

impl Component for ClipWatcher {
    fn name(&self) -> &str {
        "clip watcher"
    }

    fn priority(&self) -> i32 {
        320
    }

    fn apply(&self, _ctx: &mut RenderContext) {
        *self.seen.borrow_mut() = self.api.enabled_clip_distances();
    }
}

#[test]
fn test_clip_planes_are_balanced() -> anyhow::Result<()> {
    let (api, mut ctx) = setup()?;
    let planes = vec![
        Vector4::new(1.0, 0.0, 0.0, 0.0),
        Vector4::new(0.0, 1.0, 0.0, -0.5),
        Vector4::new(0.0, 0.0, -1.0, 2.0),
    ];
    let clip = Rc::new(ClipPlaneComponent::new(&ctx.config, planes.clone())?);
    let watcher = Rc::new(ClipWatcher {
        api: api.clone(),
        seen: RefCell::new(Vec::new()),
    });

    let model = Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0));
    let node = Node::new("clipped");
    Node::add_component(&node, Rc::new(TransformComponent::new(model)));
    Node::add_component(&node, clip.clone());
    Node::add_component(&node, watcher.clone());

    let scene = Scene::new();
    scene.add_node(node);
    scene.render_frame(&mut ctx);

    assert_eq!(*watcher.seen.borrow(), vec![0, 1, 2]);
    assert!(api.enabled_clip_distances().is_empty());
    assert_eq!(clip.enabled(), 0);

    let mit = model.invert().unwrap().transpose();
    let expected: Vec<Vector4<f32>> = planes.iter().map(|&p| mit * p).collect();
    assert_eq!(clip.transformed_planes(), expected);
    // translate(1,0,0) moves x >= 0 to x >= 1
    assert_eq!(expected[0], Vector4::new(1.0, 0.0, 0.0, -1.0));

    let disabled = api
        .events()
        .iter()
        .filter(|e| matches!(e, GlEvent::Disable(Capability::ClipDistance(_))))
        .count();
    assert_eq!(disabled, 3);
    Ok(())
}

#[test]
fn test_clip_planes_reach_the_drawing_program() -> anyhow::Result<()> {
    let (api, mut ctx) = setup()?;
    let shaded = ctx.create_program("shaded", SHADED_VERTEX, SHADED_FRAGMENT)?;
    let planes = vec![Vector4::new(0.0, 1.0, 0.0, 0.0)];

    let node = Node::new("clipped");
    Node::add_component(
        &node,
        Rc::new(ClipPlaneComponent::new(&ctx.config, planes.clone())?),
    );
    Node::add_component(&node, Rc::new(ShaderComponent::new(Rc::clone(&shaded))));
    Node::add_component(&node, Rc::new(MeshComponent::new(triangle(&ctx)?)));

    let scene = Scene::new();
    scene.add_node(node);
    for _ in 0..5 {
        scene.render_frame(&mut ctx);
    }

    // No camera and no transform: the planes reach the shader unchanged
    assert_eq!(
        api.uniform_value(shaded.handle(), "u_clipPlanes"),
        Some(UniformValue::Vec4Array(planes))
    );
    assert_eq!(shaded.pending_len(), 0);
    assert_eq!(ctx.shaders.base().pending_len(), 0);
    assert!(api.enabled_clip_distances().is_empty());
    assert_eq!(api.error_count(), 0);
    Ok(())
}

#[test]
fn test_lights_are_packed_in_world_space() -> anyhow::Result<()> {
    let (api, mut ctx) = setup()?;

    let w0 = Matrix4::from_angle_z(Rad(PI / 6.0));
    let w1 = Matrix4::from_translation(Vector3::new(0.0, 1.0, -4.0)) * Matrix4::from_scale(2.0);
    let w2 = Matrix4::from_translation(Vector3::new(3.0, 0.0, 0.0));

    let lights = [
        (
            w0,
            Light::Directional {
                colors: LightColors::white(),
                direction: Vector3::new(0.0, -1.0, 0.0),
            },
        ),
        (
            w1,
            Light::Point {
                colors: LightColors::white(),
                position: Point3::new(2.0, 0.0, 0.0),
                attenuation: Attenuation::default(),
            },
        ),
        (
            w2,
            Light::Spot {
                colors: LightColors::white(),
                position: Point3::new(0.0, 3.0, 0.0),
                direction: Vector3::new(0.0, -1.0, 0.0),
                attenuation: Attenuation::default(),
                cutoff: Rad(PI / 8.0),
            },
        ),
    ];

    let mut nodes = Vec::new();
    for (i, (world, light)) in lights.into_iter().enumerate() {
        let node = Node::new(format!("light {}", i));
        Node::add_component(&node, Rc::new(TransformComponent::new(world)));
        Node::add_component(&node, LightComponent::new(&mut ctx, light));
        nodes.push(node);
    }

    assert_eq!(ctx.lights.apply(&ctx.resources), 3);
    let block = ctx.lights.block();

    assert_eq!(block.active_count, 3);

    let direction = (w0 * Vector4::new(0.0, -1.0, 0.0, 0.0)).normalize();
    let packed = Vector4::from(block.lights[0].direction);
    assert!((packed - direction).magnitude() < 1e-6);
    assert_eq!(block.lights[0].light_type, LightType::Directional as i32);

    let position = w1 * Vector4::new(2.0, 0.0, 0.0, 1.0);
    assert_eq!(block.lights[1].position[0], position.x);
    assert_eq!(block.lights[1].position[3], 1.0);

    assert_eq!(block.lights[2].attenuation[3], (PI / 8.0).cos());
    assert_eq!(block.lights[2].position, [3.0, 3.0, 0.0, 1.0]);

    for record in &block.lights[3..MAX_SCENE_LIGHTS] {
        assert_eq!(record.light_type, LightType::Inactive as i32);
    }

    let uploaded = api
        .buffer_contents(ctx.lights.resource().buffer())
        .context("lights buffer missing")?;
    assert_eq!(uploaded, bytemuck::bytes_of(&block));
    drop(nodes);
    Ok(())
}

#[test]
fn test_block_name_collision_keeps_latest() -> anyhow::Result<()> {
    let (api, ctx) = setup()?;
    let calls = Rc::new(RefCell::new((0usize, 0usize)));

    let first = StructResource::<CameraMatricesBlock>::uniform_block(
        &ctx.resources,
        CAMERA_MATRICES,
        0,
        UpdateMode::PerFrame,
    )?;
    let counter = Rc::clone(&calls);
    first.set_full_provider(move || {
        counter.borrow_mut().0 += 1;
        CameraMatricesBlock::default()
    });

    let second = StructResource::<CameraMatricesBlock>::uniform_block(
        &ctx.resources,
        CAMERA_MATRICES,
        0,
        UpdateMode::PerFrame,
    )?;
    let counter = Rc::clone(&calls);
    second.set_full_provider(move || {
        counter.borrow_mut().1 += 1;
        CameraMatricesBlock::default()
    });

    ctx.resources.apply_per_frame();

    assert_eq!(*calls.borrow(), (0, 1));
    assert!(api.is_buffer(first.buffer()));
    let registered = ctx
        .resources
        .get(CAMERA_MATRICES)
        .context("camera block unregistered")?;
    assert_eq!(registered.borrow().id(), second.block().borrow().id());

    drop(first);
    assert!(ctx.resources.contains(CAMERA_MATRICES));
    Ok(())
}

#[test]
fn test_late_block_is_bound_to_existing_programs() -> anyhow::Result<()> {
    let (api, mut ctx) = setup()?;
    let fragment = "#version 430
layout(std140) uniform Wind { vec4 gust; };
out vec4 c;
void main() { c = gust; }
";
    let windy = ctx.create_program("windy", K_VERTEX, fragment)?;

    let node = Node::new("grass");
    Node::add_component(&node, Rc::new(ShaderComponent::new(Rc::clone(&windy))));
    Node::add_component(&node, Rc::new(MeshComponent::new(triangle(&ctx)?)));
    let scene = Scene::new();
    scene.add_node(node);

    scene.render_frame(&mut ctx);
    assert_eq!(
        api.block_binding_of(windy.handle(), StorageClass::Uniform, "Wind"),
        None
    );

    let wind = StructResource::<[f32; 4]>::uniform_block(&ctx.resources, "Wind", 7, UpdateMode::PerFrame)?;
    wind.set_full_provider(|| [0.0, 1.0, 0.0, 0.5]);
    scene.render_frame(&mut ctx);

    assert_eq!(
        api.block_binding_of(windy.handle(), StorageClass::Uniform, "Wind"),
        Some(7)
    );
    Ok(())
}

#[test]
fn test_skybox_restores_depth_state() -> anyhow::Result<()> {
    let (api, mut ctx) = setup()?;
    let camera: SharedCamera = Rc::new(RefCell::new(Camera3D::new(
        5.0,
        0.3,
        0.1,
        Vector3::zero(),
        1.5,
    )));

    // Non-default state so a restore-to-default would be caught
    ctx.gpu.api().depth_func(DepthFunc::Greater);
    let depth_write = ctx.gpu.api().depth_write_mask();
    let depth_func = ctx.gpu.api().current_depth_func();

    let program = builtin::skybox_program(&ctx.gpu)?;
    let cubemap = texture(&ctx)?;
    let skybox = SkyboxComponent::new(Rc::clone(&program), cubemap, triangle(&ctx)?);

    let mut scene = Scene::new();
    let node = Node::new("sky");
    Node::add_component(&node, Rc::new(skybox));
    scene.add_node(node);
    scene.set_camera(&mut ctx, camera);
    scene.render_frame(&mut ctx);

    assert_eq!(ctx.gpu.api().depth_write_mask(), depth_write);
    assert_eq!(ctx.gpu.api().current_depth_func(), depth_func);

    let draws: Vec<_> = api
        .events()
        .into_iter()
        .filter_map(|e| match e {
            GlEvent::Draw { program, .. } => Some(program),
            _ => None,
        })
        .collect();
    assert_eq!(draws, vec![Some(program.handle())]);
    assert!(matches!(
        api.uniform_value(program.handle(), "u_skybox"),
        Some(UniformValue::Sampler(_)) | Some(UniformValue::Int(_))
    ));
    assert_eq!(ctx.shaders.depth(), 1);
    assert_eq!(ctx.textures.depth(), 0);
    assert_eq!(api.texture_bound(0, TextureTarget::CubeMap), None);
    Ok(())
}

#[test]
fn test_mesh_receives_accumulated_model_matrix() -> anyhow::Result<()> {
    let (api, mut ctx) = setup()?;
    let outer = Matrix4::from_translation(Vector3::new(1.0, 0.0, 0.0));
    let inner = Matrix4::from_translation(Vector3::new(0.0, 2.0, 0.0)) * Matrix4::from_scale(0.5);

    let parent = Node::new("parent");
    Node::add_component(&parent, Rc::new(TransformComponent::new(outer)));
    let child = Node::new("child");
    Node::add_component(&child, Rc::new(MeshComponent::new(triangle(&ctx)?)));
    Node::add_component(&child, Rc::new(TransformComponent::new(inner)));
    Node::add_child(&parent, child);

    let scene = Scene::new();
    scene.add_node(parent);
    scene.render_frame(&mut ctx);

    let base = ctx.shaders.base().handle();
    assert_eq!(
        api.uniform_value(base, "u_model"),
        Some(UniformValue::Mat4(outer * inner))
    );
    assert_eq!(api.draw_count(), 1);
    assert_eq!(ctx.transforms.top(), Matrix4::identity());
    Ok(())
}

#[test]
fn test_node_uniforms_target_the_top_program() -> anyhow::Result<()> {
    let (api, mut ctx) = setup()?;
    let shaded = ctx.create_program("shaded", SHADED_VERTEX, SHADED_FRAGMENT)?;
    let diffuse = texture(&ctx)?;
    let tint = Vector4::new(0.2, 0.4, 0.6, 1.0);

    let node = Node::new("shaded");
    Node::add_component(&node, Rc::new(MeshComponent::new(triangle(&ctx)?)));
    Node::add_component(
        &node,
        Rc::new(VariableComponent::new().with_uniform("u_tint", move || tint)),
    );
    Node::add_component(
        &node,
        Rc::new(TextureComponent::new(TextureTarget::Texture2D, diffuse, "u_tex")),
    );
    Node::add_component(&node, Rc::new(ShaderComponent::new(Rc::clone(&shaded))));

    let scene = Scene::new();
    scene.add_node(node);
    scene.render_frame(&mut ctx);

    assert_eq!(
        api.uniform_value(shaded.handle(), "u_tint"),
        Some(UniformValue::Vec4(tint))
    );
    assert!(matches!(
        api.uniform_value(shaded.handle(), "u_tex"),
        Some(UniformValue::Sampler(_)) | Some(UniformValue::Int(_))
    ));
    assert_eq!(api.uniform_value(ctx.shaders.base().handle(), "u_tint"), None);
    assert_eq!(api.draw_count(), 1);
    assert_eq!(api.error_count(), 0);
    assert_eq!(ctx.textures.depth(), 0);
    Ok(())
}

#[test]
fn test_per_frame_blocks_upload_before_draws() -> anyhow::Result<()> {
    let (api, mut ctx) = setup()?;
    let camera: SharedCamera = Rc::new(RefCell::new(Camera3D::new(
        3.0,
        0.0,
        0.0,
        Vector3::zero(),
        1.0,
    )));

    let mut scene = Scene::new();
    let node = Node::new("mesh");
    Node::add_component(&node, Rc::new(MeshComponent::new(triangle(&ctx)?)));
    scene.add_node(node);
    scene.set_camera(&mut ctx, Rc::clone(&camera));
    api.clear_events();

    scene.render_frame(&mut ctx);

    let matrices = ctx.camera.matrices().buffer();
    let events = api.events();
    let upload = events
        .iter()
        .position(|e| matches!(e, GlEvent::BufferSubData { buffer, .. } if *buffer == matrices))
        .context("camera matrices never uploaded")?;
    let draw = events
        .iter()
        .position(|e| matches!(e, GlEvent::Draw { .. }))
        .context("nothing drawn")?;
    assert!(upload < draw);

    let expected = CameraMatricesBlock::from_camera(&*camera.borrow());
    assert_eq!(
        api.buffer_contents(matrices).unwrap(),
        bytemuck::bytes_of(&expected)
    );
    Ok(())
}

#[test]
fn test_moved_camera_position_is_republished() -> anyhow::Result<()> {
    let (api, mut ctx) = setup()?;
    let camera = Rc::new(RefCell::new(Camera3D::new(
        5.0,
        0.0,
        0.0,
        Vector3::zero(),
        1.0,
    )));
    let shared: SharedCamera = camera.clone();

    let mut scene = Scene::new();
    scene.set_camera(&mut ctx, shared);
    scene.render_frame(&mut ctx);

    camera.borrow_mut().set_distance(2.0);
    scene.render_frame(&mut ctx);

    let eye = camera
        .borrow()
        .world_position()
        .context("orbit camera has an eye")?;
    let uploaded = api
        .buffer_contents(ctx.camera.position().buffer())
        .context("camera position never uploaded")?;
    let block: CameraPositionBlock = bytemuck::pod_read_unaligned(&uploaded);
    assert_eq!(block, CameraPositionBlock::new(eye));
    assert!((block.world_position[2] - 2.0).abs() < 1e-5);
    Ok(())
}

struct Fixture {
    shaded: Rc<ShaderProgram>,
    texture: TextureHandle,
    mesh: Rc<dyn Drawable>,
}

fn random_subtree(
    ctx: &RenderContext,
    fixture: &Fixture,
    rng: &mut impl Rng,
    depth: usize,
) -> NodeRef {
    let node = Node::new(format!("node@{}", depth));

    if rng.random_bool(0.6) {
        let offset = Vector3::new(
            rng.random_range(-2.0..2.0f32),
            rng.random_range(-2.0..2.0f32),
            rng.random_range(-2.0..2.0f32),
        );
        Node::add_component(&node, Rc::new(TransformComponent::from_translation(offset)));
    }
    if rng.random_bool(0.3) {
        let count = rng.random_range(1..=ctx.config.max_clip_distances as usize);
        let planes = (0..count)
            .map(|i| Vector4::new(1.0, i as f32, 0.0, -0.5))
            .collect();
        Node::add_component(
            &node,
            Rc::new(ClipPlaneComponent::new(&ctx.config, planes).unwrap()),
        );
    }
    if rng.random_bool(0.4) {
        Node::add_component(&node, Rc::new(ShaderComponent::new(Rc::clone(&fixture.shaded))));
    }
    if rng.random_bool(0.4) {
        Node::add_component(
            &node,
            Rc::new(TextureComponent::new(
                TextureTarget::Texture2D,
                fixture.texture,
                "u_tex",
            )),
        );
    }
    if rng.random_bool(0.3) {
        let tint: Vector4<f32> = Vector4::new(rng.random(), rng.random(), rng.random(), 1.0);
        Node::add_component(
            &node,
            Rc::new(VariableComponent::new().with_uniform("u_tint", move || tint)),
        );
    }
    if rng.random_bool(0.5) {
        Node::add_component(&node, Rc::new(MeshComponent::new(Rc::clone(&fixture.mesh))));
    }

    if depth < 4 {
        for _ in 0..rng.random_range(0..3) {
            let child = random_subtree(ctx, fixture, rng, depth + 1);
            Node::add_child(&node, child);
        }
    }
    node
}

#[test]
fn test_random_scenes_leave_stacks_balanced() -> anyhow::Result<()> {
    let (api, mut ctx) = setup()?;
    let fixture = Fixture {
        shaded: ctx.create_program("shaded", SHADED_VERTEX, SHADED_FRAGMENT)?,
        texture: texture(&ctx)?,
        mesh: triangle(&ctx)?,
    };
    let mut rng = rand::rng();

    for _ in 0..32 {
        let before = ctx.stack_depths();
        let scene = Scene::new();
        for _ in 0..rng.random_range(1..4) {
            scene.add_node(random_subtree(&ctx, &fixture, &mut rng, 0));
        }

        scene.render_frame(&mut ctx);

        assert_eq!(ctx.stack_depths(), before);
        assert_eq!(ctx.transforms.top(), Matrix4::identity());
        assert!(Rc::ptr_eq(ctx.shaders.peek(), ctx.shaders.base()));
        assert!(api.enabled_clip_distances().is_empty());
    }

    // Every uniform write lands on the program bound at that moment
    let mut bound = None;
    for event in api.events() {
        match event {
            GlEvent::UseProgram(program) => bound = program,
            GlEvent::Uniform { program, .. } => assert_eq!(Some(program), bound),
            _ => {}
        }
    }
    assert_eq!(api.error_count(), 0);
    Ok(())
}
