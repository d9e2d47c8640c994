//! Headless projectile demo
//!
//! Builds a small schoolyard (track, gym with doors, a row of trees, a bench
//! and a moving cart), then throws balls and eggs at it and logs every
//! collision. Run with `RUST_LOG=debug` to see collider construction.
//!
//! Usage: `projectile_demo [config_dir]` (defaults to `projectile_demo/config`)

use std::path::Path;
use std::sync::Arc;

use scene_collision::foundation::logging;
use scene_collision::physics::collision::Ray;
use scene_collision::prelude::*;
use scene_collision::scene::ModelTemplate;

// Simulation settings
const FRAME_DT: f32 = 1.0 / 60.0;
const FRAMES: u32 = 600;
const DOOR_TOGGLE_FRAME: u32 = 240;
const THROW_SPEED: f32 = 30.0;
const BALL_RADIUS: f32 = 1.0;
const EGG_RADIUS: f32 = 0.4;
const IMPACT_MARKER_SECONDS: f32 = 0.5;

/// Demo failures
#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("collision error: {0}")]
    Collision(#[from] CollisionError),

    #[error("{0} colliders failed to build")]
    Build(usize),
}

fn load_or_default<T: Config>(path: &Path) -> Result<T, DemoError> {
    if !path.exists() {
        log::warn!("{} not found, using defaults", path.display());
        return Ok(T::default());
    }
    let config = T::load_from_file(&path.to_string_lossy())?;
    log::info!("Loaded {}", path.display());
    Ok(config)
}

fn quad(half_x: f32, half_z: f32) -> Arc<MeshGeometry> {
    Arc::new(MeshGeometry::new(
        vec![
            -half_x, 0.0, -half_z, //
            -half_x, 0.0, half_z, //
            half_x, 0.0, half_z, //
            half_x, 0.0, -half_z,
        ],
        vec![0, 1, 2, 0, 2, 3],
    ))
}

fn slab(min: Vec3, max: Vec3) -> Arc<MeshGeometry> {
    let mesh = TriangleMesh::from_box(&AABB::new(min, max));
    let positions = mesh.vertices.iter().flat_map(|v| [v.x, v.y, v.z]).collect();
    Arc::new(MeshGeometry::new(positions, mesh.indices))
}

struct DemoScene {
    graph: SceneGraph,
    specs: Vec<ObjectSpec>,
    cart: NodeKey,
}

fn build_scene(cache: &mut ModelTemplateCache) -> Result<DemoScene, DemoError> {
    let mut graph = SceneGraph::new();
    let mut specs = Vec::new();
    let missing = || CollisionError::UnknownNode;

    let track = graph.add_root("track", &Transform::identity());
    graph.add_mesh(track, "track_surface", &Transform::identity(), quad(200.0, 200.0)).ok_or_else(missing)?;
    specs.push(ObjectSpec::new("track", track, ConstructionStrategy::Terrain));

    // Gym: back wall, two door leaves and an archway in the front wall
    let gym = graph.add_root("gym", &Transform::from_position(Vec3::new(0.0, 0.0, 60.0)));
    graph
        .add_mesh(gym, "gym_back_wall", &Transform::identity(), slab(Vec3::new(-30.0, 0.0, 20.0), Vec3::new(30.0, 15.0, 21.0)))
        .ok_or_else(missing)?;
    graph
        .add_mesh(gym, "gym_front_wall", &Transform::identity(), slab(Vec3::new(-30.0, 8.0, 0.0), Vec3::new(30.0, 15.0, 1.0)))
        .ok_or_else(missing)?;
    graph
        .add_mesh(gym, "gym_door_left", &Transform::identity(), slab(Vec3::new(-4.0, 0.0, 0.0), Vec3::new(0.0, 8.0, 1.0)))
        .ok_or_else(missing)?;
    graph
        .add_mesh(gym, "gym_door_right", &Transform::identity(), slab(Vec3::new(0.0, 0.0, 0.0), Vec3::new(4.0, 8.0, 1.0)))
        .ok_or_else(missing)?;
    graph
        .add_mesh(gym, "gym_arch", &Transform::identity(), slab(Vec3::new(10.0, 0.0, 0.0), Vec3::new(16.0, 8.0, 1.0)))
        .ok_or_else(missing)?;
    specs.push(ObjectSpec::new("gym", gym, ConstructionStrategy::Structure));

    let trees = graph.add_root("trees", &Transform::identity());
    specs.push(ObjectSpec::new(
        "trees",
        trees,
        ConstructionStrategy::TreeInstances {
            placements: (0..5).map(|i| Vec3::new(-40.0 + 20.0 * i as f32, 0.0, 30.0)).collect(),
        },
    ));

    let bench_template = cache.get_or_load("bench", || {
        Ok::<_, DemoError>(ModelTemplate::single("bench_seat", slab(Vec3::new(-2.0, 0.0, -0.5), Vec3::new(2.0, 1.0, 0.5))))
    })?;
    log::debug!("Bench template has {} parts", bench_template.parts.len());
    let bench = graph
        .instantiate(cache, "bench", None, "bench", &Transform::from_position(Vec3::new(-20.0, 0.0, 15.0)))
        .ok_or_else(missing)?;
    specs.push(ObjectSpec::new("bench", bench, ConstructionStrategy::Generic { movable: false }));

    let cart = graph.add_root("cart", &Transform::from_position(Vec3::new(20.0, 0.0, 10.0)));
    graph
        .add_mesh(cart, "cart_body", &Transform::identity(), slab(Vec3::new(-1.5, 0.0, -1.0), Vec3::new(1.5, 2.0, 1.0)))
        .ok_or_else(missing)?;
    specs.push(ObjectSpec::new("cart", cart, ConstructionStrategy::Generic { movable: true }));

    Ok(DemoScene { graph, specs, cart })
}

fn run() -> Result<(), DemoError> {
    let config_dir = std::env::args().nth(1).unwrap_or_else(|| "projectile_demo/config".to_string());
    let config_dir = Path::new(&config_dir);

    let config: CollisionConfig = load_or_default(&config_dir.join("collision.toml"))?;
    config.validate()?;
    let doors: DoorConfiguration = load_or_default(&config_dir.join("doors.toml"))?;

    let mut cache = ModelTemplateCache::new();
    let mut scene = build_scene(&mut cache)?;

    let factory = ColliderFactory::new(&config.bvh, &config.trees, &doors);
    let mut registry = ColliderRegistry::with_debug_config(&config.debug);
    let report = registry.build_scene(&factory, &scene.graph, &scene.specs);
    if !report.is_clean() {
        return Err(DemoError::Build(report.failed.len()));
    }
    log::info!(
        "{} colliders, {} debug shapes",
        registry.count(),
        registry.debug_shapes().len()
    );

    // Sample the track height under the throw origin
    let ground_y = registry
        .get("track")
        .and_then(|track| {
            track
                .bvh
                .raycast_first(&Ray::new(Vec3::new(0.0, 100.0, 0.0), Vec3::new(0.0, -1.0, 0.0)))
        })
        .map_or(0.0, |hit| hit.point.y);
    let origin = Vec3::new(0.0, ground_y + 2.0, 0.0);

    let mut sim = ProjectileSimulation::new(&config);
    let throws = [
        (Vec3::new(0.0, 0.15, 1.0), ProjectileKind::Ball, BALL_RADIUS),
        (Vec3::new(0.22, 0.15, 1.0), ProjectileKind::Ball, BALL_RADIUS),
        (Vec3::new(-0.5, 0.1, 1.0), ProjectileKind::Egg, EGG_RADIUS),
        (Vec3::new(1.0, 0.05, 0.5), ProjectileKind::Egg, EGG_RADIUS),
    ];
    for (direction, kind, radius) in throws {
        sim.launch(origin, direction, THROW_SPEED, radius, kind);
    }

    let mut hits = 0;
    for frame in 0..FRAMES {
        if frame == DOOR_TOGGLE_FRAME {
            for door in ["gym_door_left", "gym_door_right"] {
                registry.set_door_open(door, true);
            }
            log::info!("Gym doors opened");
        }

        // Roll the cart slowly toward the throw line
        let cart_x = 20.0 - 5.0 * frame as f32 * FRAME_DT;
        scene
            .graph
            .set_local_transform(scene.cart, &Transform::from_position(Vec3::new(cart_x, 0.0, 10.0)));

        for event in sim.step_in_scene(&registry, &scene.graph, FRAME_DT, None) {
            match event {
                ProjectileEvent::Hit { collision, .. } => {
                    hits += 1;
                    log::info!("Ball hit '{}' at {:.2?}", collision.collider_id, collision.position);
                    if let Some(normal) = collision.normal {
                        registry
                            .visualizer_mut()
                            .draw_impact(collision.position, normal, IMPACT_MARKER_SECONDS);
                    }
                }
                ProjectileEvent::Broken { position, collision, .. } => {
                    hits += 1;
                    log::info!("Egg broke on '{}' at {:.2?}", collision.collider_id, position);
                }
                ProjectileEvent::Expired { projectile } => {
                    log::info!("Projectile {:?} left the world", projectile);
                }
            }
        }
        registry.visualizer_mut().update(FRAME_DT);

        if sim.is_empty() {
            log::info!("All projectiles finished after {} frames", frame + 1);
            break;
        }
    }

    log::info!("{} collisions, {} projectiles still live", hits, sim.len());
    Ok(())
}

fn main() {
    logging::init();

    if let Err(err) = run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}
