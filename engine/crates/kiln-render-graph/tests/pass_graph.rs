use std::sync::Arc;
use std::time::{Duration, Instant};

use kiln_gfx::basic::format::GfxFormat;
use kiln_gfx::commands::barrier::GfxBarrier;
use kiln_gfx::commands::command_list::GfxCommand;
use kiln_gfx::commands::fence::WaitPoint;
use kiln_gfx::commands::queue::{GfxQueue, GfxQueueType};
use kiln_gfx::descriptors::descriptor_allocator::GfxDescriptorAllocator;
use kiln_gfx::device::GfxDevice;
use kiln_gfx::headless::{HeadlessDevice, HeadlessDeviceConfig};
use kiln_gfx::resources::resource::GfxResource;
use kiln_gfx::resources::resource_desc::{GfxClearValue, GfxResourceDesc, GfxResourceUsage};
use kiln_gfx::resources::resource_state::GfxResourceStates;
use kiln_gfx::resources::view::{GfxResourceViews, GfxViewFactory, GfxViewKind};
use kiln_render_graph::*;

struct TestEnv {
    device: Arc<HeadlessDevice>,
    factory: Arc<GfxViewFactory>,
    graphics: Arc<GfxQueue>,
    compute: Arc<GfxQueue>,
}

impl TestEnv {
    fn new() -> Self {
        Self::with_config(HeadlessDeviceConfig::default())
    }

    /// GPU 不自动执行，需要 `flush_gpu`
    fn manual() -> Self {
        Self::with_config(HeadlessDeviceConfig {
            auto_flush: false,
            ..Default::default()
        })
    }

    fn with_config(config: HeadlessDeviceConfig) -> Self {
        let device = HeadlessDevice::new(config);
        let allocator = GfxDescriptorAllocator::new(&*device, &device.config().heap_descs()).unwrap();
        let factory = Arc::new(GfxViewFactory::new(device.clone(), Arc::new(allocator)));
        let graphics = device.create_queue(GfxQueueType::Graphics, "graphics").unwrap();
        let compute = device.create_queue(GfxQueueType::Compute, "compute").unwrap();
        Self {
            device,
            factory,
            graphics,
            compute,
        }
    }

    fn graph(&self, config: PassGraphConfig) -> PassGraph {
        let desc = PassGraphDesc::new(config, self.graphics.clone()).with_compute_queue(self.compute.clone());
        create_pass_graph(self.device.clone(), self.factory.clone(), desc).unwrap()
    }

    fn back_buffer(&self) -> (GfxResource, GfxResourceViews) {
        let desc = GfxResourceDesc::texture_2d(64, 64, GfxFormat::B8G8R8A8Unorm, GfxResourceUsage::RENDER_TARGET);
        let resource = self.device.create_resource(&desc, GfxResourceStates::PRESENT, "back-buffer").unwrap();
        let views = self.factory.create_views_for_usage(&resource).unwrap();
        (resource, views)
    }

    fn commands(&self, queue: &str) -> Vec<GfxCommand> {
        self.device.headless_queue(queue).unwrap().executed_commands()
    }
}

fn color() -> PassResourceDesc {
    PassResourceDesc::texture_2d(
        64,
        64,
        GfxFormat::R16G16B16A16Float,
        GfxResourceUsage::RENDER_TARGET | GfxResourceUsage::SHADER_RESOURCE,
    )
}

fn storage() -> PassResourceDesc {
    PassResourceDesc::texture_2d(
        64,
        64,
        GfxFormat::R16G16B16A16Float,
        GfxResourceUsage::UNORDERED_ACCESS | GfxResourceUsage::SHADER_RESOURCE,
    )
}

fn write_pass(graph: &mut PassGraph, tag: &str, name: &str) -> PassResource {
    let name = name.to_string();
    graph
        .add_pass(
            tag,
            |builder| {
                let res = builder.create(name, color());
                builder.write(res)
            },
            |&res, ctx| {
                let rtv = ctx.rtv(res);
                ctx.cmd().set_render_targets(&[rtv], None);
                ctx.cmd().draw_instanced(3, 1, 0, 0);
            },
        )
        .unwrap()
}

fn barriers_of(commands: &[GfxCommand]) -> Vec<GfxBarrier> {
    commands
        .iter()
        .filter_map(|c| match c {
            GfxCommand::ResourceBarrier(barriers) => Some(barriers.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

fn event_position(commands: &[GfxCommand], tag: &str) -> usize {
    commands.iter().position(|c| matches!(c, GfxCommand::BeginEvent(name) if name == tag)).unwrap()
}

#[test]
fn test_reader_follows_writer() {
    let env = TestEnv::new();
    let mut graph = env.graph(PassGraphConfig::default());

    let a = write_pass(&mut graph, "a", "a-out");
    let b = write_pass(&mut graph, "b", "b-out");
    graph
        .add_pass(
            "c",
            |builder| {
                builder.read(a);
                builder.read(b);
                let out = builder.create("c-out", color());
                builder.write(out);
            },
            |_, _| {},
        )
        .unwrap();

    let compiled = graph.compile().unwrap();
    let position = |tag: &str| {
        let idx = compiled.pass_index(tag).unwrap();
        compiled.execution_order().iter().position(|&p| p == idx).unwrap()
    };
    assert!(position("a") < position("c"));
    assert!(position("b") < position("c"));
    // 没有依赖的 Pass 保持注册顺序
    assert_eq!(compiled.execution_order(), &[0, 1, 2]);
}

#[test]
fn test_writers_keep_registration_order() {
    let env = TestEnv::new();
    let mut graph = env.graph(PassGraphConfig::default());

    let target = write_pass(&mut graph, "first", "target");
    for tag in ["second", "third"] {
        graph
            .add_pass(
                tag,
                |builder| {
                    builder.write(target);
                },
                |_, _| {},
            )
            .unwrap();
    }

    let compiled = graph.compile().unwrap();
    let tags = compiled.execution_order().iter().map(|&p| compiled.pass_tag(p).to_string()).collect::<Vec<_>>();
    assert_eq!(tags, vec!["first", "second", "third"]);
}

#[test]
fn test_unused_resource_has_no_backing() {
    let env = TestEnv::new();
    let mut graph = env.graph(PassGraphConfig::default());

    let (unused, used) = graph
        .add_pass(
            "a",
            |builder| {
                let unused = builder.create("unused", color());
                let used = builder.create("used", color());
                builder.write(used);
                (unused, used)
            },
            |_, _| {},
        )
        .unwrap();

    let compiled = graph.compile().unwrap();
    assert!(compiled.physical_of(unused).is_none());
    assert!(compiled.lifetime_of(unused).is_none());
    assert!(compiled.physical_of(used).is_some());
    assert_eq!(compiled.physical_resource_count(), 1);

    graph.execute(&WaitPoint::invalid()).unwrap();
    assert_eq!(env.device.live_resource_count(), 1);
}

#[test]
fn test_barrier_between_writer_and_reader() {
    let env = TestEnv::new();
    let mut graph = env.graph(PassGraphConfig::default());

    let (back_buffer, views) = env.back_buffer();
    let y = graph.import("back-buffer", back_buffer, GfxResourceStates::PRESENT, views).unwrap();
    graph.set_final_state(y, GfxResourceStates::PRESENT).unwrap();

    let x = write_pass(&mut graph, "p1", "x");
    graph
        .add_pass(
            "p2",
            |builder| {
                builder.read(x);
                builder.write(y);
            },
            move |_, ctx| {
                let _srv = ctx.srv(x);
                let rtv = ctx.rtv(y);
                ctx.cmd().set_render_targets(&[rtv], None);
                ctx.cmd().draw_instanced(3, 1, 0, 0);
            },
        )
        .unwrap();

    let compiled = graph.compile().unwrap();
    let p2 = compiled.pass_index("p2").unwrap();
    let x_barriers = compiled.barriers_before(p2).prologue().filter(|b| b.resource() == x).copied().collect::<Vec<_>>();
    assert_eq!(
        x_barriers,
        vec![RgBarrier::Transition {
            resource: x,
            before: GfxResourceStates::RENDER_TARGET,
            after: GfxResourceStates::ALL_SHADER_RESOURCE,
        }]
    );
    assert!(compiled.final_barriers().contains(&RgBarrier::Transition {
        resource: y,
        before: GfxResourceStates::RENDER_TARGET,
        after: GfxResourceStates::PRESENT,
    }));
    let x_physical = compiled.physical_of(x).unwrap();

    let wait_point = graph.execute(&WaitPoint::invalid()).unwrap();
    assert!(wait_point.is_valid());
    assert!(wait_point.is_completed());

    let commands = env.commands("graphics");
    let p1_begin = event_position(&commands, "p1");
    let p2_begin = event_position(&commands, "p2");
    let between = barriers_of(&commands[p1_begin..p2_begin]);
    let x_between = between
        .iter()
        .filter(|b| matches!(b, GfxBarrier::Transition { resource, .. } if *resource == x_physical));
    assert_eq!(
        x_between.collect::<Vec<_>>(),
        vec![&GfxBarrier::Transition {
            resource: x_physical,
            before: GfxResourceStates::RENDER_TARGET,
            after: GfxResourceStates::ALL_SHADER_RESOURCE,
        }]
    );
}

#[test]
fn test_independent_async_passes() {
    let env = TestEnv::new();
    let mut graph = env.graph(PassGraphConfig::default());

    for tag in ["cull", "histogram"] {
        graph
            .add_pass(
                tag,
                |builder| {
                    builder.async_compute_enable(true);
                    let buffer = builder.create(
                        format!("{}-buffer", tag),
                        PassResourceDesc::buffer(
                            4096,
                            4,
                            GfxResourceUsage::UNORDERED_ACCESS | GfxResourceUsage::SHADER_RESOURCE,
                        ),
                    );
                    builder.write(buffer)
                },
                |&buffer, ctx| {
                    assert_eq!(ctx.queue_type(), GfxQueueType::Compute);
                    let _uav = ctx.uav(buffer);
                    ctx.cmd().dispatch(16, 1, 1);
                },
            )
            .unwrap();
    }

    let compiled = graph.compile().unwrap();
    assert_eq!(compiled.queue_of(0), GfxQueueType::Compute);
    assert_eq!(compiled.queue_of(1), GfxQueueType::Compute);
    assert!(compiled.sync_points().is_empty());

    let wait_point = graph.execute(&WaitPoint::invalid()).unwrap();
    assert!(wait_point.is_valid());

    let dispatches = env.commands("compute").iter().filter(|c| matches!(c, GfxCommand::Dispatch { .. })).count();
    assert_eq!(dispatches, 2);
}

#[test]
fn test_async_compute_disabled() {
    let env = TestEnv::new();
    let config = PassGraphConfig {
        enable_async_compute: false,
        ..Default::default()
    };
    let mut graph = env.graph(config);

    graph
        .add_pass(
            "cull",
            |builder| {
                builder.async_compute_enable(true);
                let buffer = builder.create("buffer", storage());
                builder.write(buffer);
            },
            |_, ctx| ctx.cmd().dispatch(1, 1, 1),
        )
        .unwrap();

    let compiled = graph.compile().unwrap();
    assert_eq!(compiled.queue_of(0), GfxQueueType::Graphics);
    assert!(!compiled.uses_compute_queue());
}

#[test]
fn test_cross_queue_sync() {
    let env = TestEnv::new();
    let mut graph = env.graph(PassGraphConfig::default());

    let gbuffer = write_pass(&mut graph, "gbuffer", "normal");
    let ao = graph
        .add_pass(
            "ssao",
            |builder| {
                builder.async_compute_enable(true);
                builder.read(gbuffer);
                let ao = builder.create("ao", storage());
                builder.write(ao)
            },
            move |&ao, ctx| {
                let _normal = ctx.srv(gbuffer);
                let _ao = ctx.uav(ao);
                ctx.cmd().dispatch(8, 8, 1);
            },
        )
        .unwrap();
    write_pass(&mut graph, "unrelated", "unrelated");
    graph
        .add_pass(
            "lighting",
            |builder| {
                builder.read(ao);
                let out = builder.create("lit", color());
                builder.write(out);
            },
            |_, ctx| ctx.cmd().draw_instanced(3, 1, 0, 0),
        )
        .unwrap();

    let compiled = graph.compile().unwrap();
    assert_eq!(compiled.queue_of(1), GfxQueueType::Compute);
    assert_eq!(
        compiled.sync_points(),
        &[
            RgSyncPoint {
                producer: 0,
                consumer: 1,
                producer_queue: GfxQueueType::Graphics,
                consumer_queue: GfxQueueType::Compute,
            },
            RgSyncPoint {
                producer: 1,
                consumer: 3,
                producer_queue: GfxQueueType::Compute,
                consumer_queue: GfxQueueType::Graphics,
            },
        ]
    );

    // compute 队列不能从 RENDER_TARGET 开始转换，提前到 gbuffer 之后
    let hoisted = RgBarrier::Transition {
        resource: gbuffer,
        before: GfxResourceStates::RENDER_TARGET,
        after: GfxResourceStates::NON_PIXEL_SHADER_RESOURCE,
    };
    assert_eq!(compiled.barriers_before(0).post, vec![hoisted]);
    assert!(compiled.barriers_before(1).pre.iter().all(|b| b.resource() != gbuffer));

    let wait_point = graph.execute(&WaitPoint::invalid()).unwrap();
    assert!(wait_point.is_valid());
    assert!(wait_point.is_completed());

    // gbuffer 之后 signal 一次，帧尾 signal 一次
    assert_eq!(env.device.headless_queue("graphics").unwrap().signal_count(), 2);
    assert_eq!(env.device.headless_queue("compute").unwrap().signal_count(), 2);
    let dispatches = env.commands("compute").iter().filter(|c| matches!(c, GfxCommand::Dispatch { .. })).count();
    assert_eq!(dispatches, 1);
}

#[test]
fn test_cross_queue_war_sync() {
    let env = TestEnv::new();
    let mut graph = env.graph(PassGraphConfig::default());

    let x = write_pass(&mut graph, "draw", "x");
    graph
        .add_pass(
            "sample",
            |builder| {
                builder.async_compute_enable(true);
                builder.read(x);
            },
            move |_, ctx| {
                let _x = ctx.srv(x);
                ctx.cmd().dispatch(4, 4, 1);
            },
        )
        .unwrap();
    graph
        .add_pass(
            "overwrite",
            |builder| {
                builder.write(x);
            },
            |_, ctx| ctx.cmd().draw_instanced(3, 1, 0, 0),
        )
        .unwrap();

    let compiled = graph.compile().unwrap();
    assert_eq!(compiled.queue_of(1), GfxQueueType::Compute);
    // 覆盖写必须等 compute 读完
    assert_eq!(
        compiled.sync_points(),
        &[
            RgSyncPoint {
                producer: 0,
                consumer: 1,
                producer_queue: GfxQueueType::Graphics,
                consumer_queue: GfxQueueType::Compute,
            },
            RgSyncPoint {
                producer: 1,
                consumer: 2,
                producer_queue: GfxQueueType::Compute,
                consumer_queue: GfxQueueType::Graphics,
            },
        ]
    );
    assert!(compiled.barriers_before(2).pre.contains(&RgBarrier::Transition {
        resource: x,
        before: GfxResourceStates::NON_PIXEL_SHADER_RESOURCE,
        after: GfxResourceStates::RENDER_TARGET,
    }));

    graph.execute(&WaitPoint::invalid()).unwrap();
    // compute 读完之后 signal 一次，帧尾 signal 一次
    assert_eq!(env.device.headless_queue("compute").unwrap().signal_count(), 2);
}

#[test]
fn test_uav_barrier_between_compute_writers() {
    let env = TestEnv::new();
    let mut graph = env.graph(PassGraphConfig::default());

    let usage = GfxResourceUsage::UNORDERED_ACCESS | GfxResourceUsage::SHADER_RESOURCE;
    let particles = graph
        .add_pass(
            "emit",
            |builder| {
                builder.async_compute_enable(true);
                let buf = builder.create("particles", PassResourceDesc::buffer(256, 4, usage));
                builder.write(buf)
            },
            |&buf, ctx| {
                let _buf = ctx.uav(buf);
                ctx.cmd().dispatch(1, 1, 1);
            },
        )
        .unwrap();
    graph
        .add_pass(
            "simulate",
            |builder| {
                builder.async_compute_enable(true);
                builder.read_write(particles);
            },
            |_, ctx| ctx.cmd().dispatch(1, 1, 1),
        )
        .unwrap();

    let compiled = graph.compile().unwrap();
    assert_eq!(compiled.queue_of(0), GfxQueueType::Compute);
    assert_eq!(compiled.queue_of(1), GfxQueueType::Compute);
    assert_eq!(compiled.barriers_before(1).pre, vec![RgBarrier::Uav { resource: particles }]);
    let physical = compiled.physical_of(particles).unwrap();

    graph.execute(&WaitPoint::invalid()).unwrap();
    let compute = env.commands("compute");
    assert!(barriers_of(&compute).contains(&GfxBarrier::Uav { resource: physical }));
    assert!(barriers_of(&env.commands("graphics")).iter().all(|b| !matches!(b, GfxBarrier::Uav { .. })));
}

#[test]
fn test_resource_capacity() {
    let env = TestEnv::new();
    let config = PassGraphConfig {
        max_resource_count: 2,
        ..Default::default()
    };
    let mut graph = env.graph(config);

    let mut handles = Vec::new();
    let result = graph.add_pass(
        "greedy",
        |builder| {
            for i in 0..3 {
                handles.push(builder.create(format!("r{}", i), color()));
            }
        },
        |_, _| {},
    );
    assert!(matches!(result, Err(GraphError::ResourceCapacityExceeded { max: 2, .. })));
    assert!(!handles[0].is_null());
    assert!(!handles[1].is_null());
    assert!(handles[2].is_null());

    // 被拒绝的 Pass 创建的资源已回滚
    assert_eq!(graph.pass_count(), 0);
    assert_eq!(graph.resource_count(), 0);

    let a = write_pass(&mut graph, "a", "a");
    let b = write_pass(&mut graph, "b", "b");
    assert!(!a.is_null() && !b.is_null());
    assert!(graph.compile().is_ok());
}

#[test]
fn test_pass_capacity() {
    let env = TestEnv::new();
    let config = PassGraphConfig {
        max_pass_count: 1,
        ..Default::default()
    };
    let mut graph = env.graph(config);

    write_pass(&mut graph, "a", "a");
    let result = graph.add_pass("b", |_| {}, |_, _| {});
    assert!(matches!(result, Err(GraphError::PassCapacityExceeded { max: 1 })));
    assert_eq!(graph.pass_count(), 1);
}

#[test]
fn test_write_without_usage_refused() {
    let env = TestEnv::new();
    let mut graph = env.graph(PassGraphConfig::default());

    let texture = PassResourceDesc::texture_2d(16, 16, GfxFormat::R8G8B8A8Unorm, GfxResourceUsage::SHADER_RESOURCE);
    let result = graph.add_pass(
        "bad",
        |builder| {
            let res = builder.create("read-only", texture);
            builder.write(res);
        },
        |_, _| {},
    );
    assert!(matches!(result, Err(GraphError::WriteToReadOnlyUsage { .. })));
    assert_eq!(graph.resource_count(), 0);
}

#[test]
fn test_read_before_write() {
    let env = TestEnv::new();
    let mut graph = env.graph(PassGraphConfig::default());

    graph
        .add_pass(
            "reader",
            |builder| {
                let res = builder.create("garbage", color());
                builder.read(res);
            },
            |_, _| {},
        )
        .unwrap();

    let result = graph.compile();
    assert!(matches!(result, Err(GraphError::ReadBeforeWrite { .. })));

    // 编译失败丢弃这一帧
    assert_eq!(graph.pass_count(), 0);
    assert!(graph.compiled().is_none());
    assert!(matches!(graph.execute(&WaitPoint::invalid()), Err(GraphError::NotCompiled)));
}

#[test]
fn test_clear_before_first_read() {
    let env = TestEnv::new();
    let mut graph = env.graph(PassGraphConfig::default());

    let cleared = color().with_clear(GfxClearValue::BLACK);
    let res = graph
        .add_pass(
            "sample",
            |builder| {
                let res = builder.create("history", cleared);
                builder.read(res)
            },
            |&res, ctx| {
                let _srv = ctx.srv(res);
                ctx.cmd().draw_instanced(3, 1, 0, 0);
            },
        )
        .unwrap();

    let compiled = graph.compile().unwrap();
    let barriers = compiled.barriers_before(0);
    assert_eq!(
        barriers.clears,
        vec![RgClear {
            resource: res,
            value: GfxClearValue::BLACK,
            view: GfxViewKind::Rtv,
        }]
    );
    assert_eq!(
        barriers.pre,
        vec![RgBarrier::Transition {
            resource: res,
            before: GfxResourceStates::COMMON,
            after: GfxResourceStates::RENDER_TARGET,
        }]
    );
    assert_eq!(
        barriers.after_clear,
        vec![RgBarrier::Transition {
            resource: res,
            before: GfxResourceStates::RENDER_TARGET,
            after: GfxResourceStates::ALL_SHADER_RESOURCE,
        }]
    );

    graph.execute(&WaitPoint::invalid()).unwrap();
    let commands = env.commands("graphics");
    let clear = commands
        .iter()
        .position(|c| matches!(c, GfxCommand::ClearRenderTarget { color, .. } if *color == [0.0, 0.0, 0.0, 1.0]));
    assert!(clear.unwrap() < event_position(&commands, "sample"));
}

#[test]
fn test_invalid_clear() {
    let env = TestEnv::new();
    let mut graph = env.graph(PassGraphConfig::default());

    let depth_on_color = color().with_clear(GfxClearValue::DEPTH_ONE);
    graph
        .add_pass(
            "a",
            |builder| {
                let res = builder.create("mismatch", depth_on_color);
                builder.write(res);
            },
            |_, _| {},
        )
        .unwrap();

    assert!(matches!(graph.compile(), Err(GraphError::InvalidClear { .. })));
}

#[test]
fn test_compile_state_errors() {
    let env = TestEnv::new();
    let mut graph = env.graph(PassGraphConfig::default());

    assert!(matches!(graph.execute(&WaitPoint::invalid()), Err(GraphError::NotCompiled)));

    write_pass(&mut graph, "a", "a");
    graph.compile().unwrap();
    assert!(matches!(graph.compile(), Err(GraphError::AlreadyCompiled)));
    assert!(matches!(graph.add_pass("late", |_| {}, |_, _| {}), Err(GraphError::AlreadyCompiled)));

    graph.execute(&WaitPoint::invalid()).unwrap();
    assert!(graph.compiled().is_none());
    assert_eq!(graph.pass_count(), 0);
    assert_eq!(graph.frame_index(), 1);
}

#[test]
fn test_aliasing_disjoint_lifetimes() {
    let env = TestEnv::new();
    let config = PassGraphConfig {
        enable_aliasing: true,
        ..Default::default()
    };
    let mut graph = env.graph(config);

    let a = write_pass(&mut graph, "a", "a");
    let b = graph
        .add_pass(
            "b",
            |builder| {
                builder.read(a);
                let b = builder.create("b", color());
                builder.write(b)
            },
            |_, _| {},
        )
        .unwrap();
    let c = graph
        .add_pass(
            "c",
            |builder| {
                builder.read(b);
                let c = builder.create("c", color());
                builder.write(c)
            },
            |_, _| {},
        )
        .unwrap();
    graph
        .add_pass(
            "d",
            |builder| {
                builder.read(c);
            },
            |_, _| {},
        )
        .unwrap();

    let compiled = graph.compile().unwrap();
    assert_eq!(compiled.physical_of(c), compiled.physical_of(a));
    assert_ne!(compiled.physical_of(b), compiled.physical_of(a));
    assert_eq!(compiled.aliased_resource_count(), 1);
    assert_eq!(compiled.physical_resource_count(), 2);
    assert_eq!(
        compiled.barriers_before(2).pre.first(),
        Some(&RgBarrier::Aliasing {
            before: Some(a),
            after: c,
        })
    );

    graph.execute(&WaitPoint::invalid()).unwrap();
    assert_eq!(graph.transient_resource_count(), 2);
    assert_eq!(env.device.live_resource_count(), 2);
}

#[test]
fn test_aliasing_disabled_by_default() {
    let env = TestEnv::new();
    let mut graph = env.graph(PassGraphConfig::default());

    let a = write_pass(&mut graph, "a", "a");
    let b = graph
        .add_pass(
            "b",
            |builder| {
                builder.read(a);
                let b = builder.create("b", color());
                builder.write(b)
            },
            |_, _| {},
        )
        .unwrap();
    graph
        .add_pass(
            "c",
            |builder| {
                builder.read(b);
                let c = builder.create("c", color());
                builder.write(c);
            },
            |_, _| {},
        )
        .unwrap();

    let compiled = graph.compile().unwrap();
    assert_eq!(compiled.aliased_resource_count(), 0);
    assert_eq!(compiled.physical_resource_count(), 3);
}

#[test]
fn test_transients_reused_across_frames() {
    let env = TestEnv::new();
    let mut graph = env.graph(PassGraphConfig::default());

    let mut wait_point = WaitPoint::invalid();
    for _ in 0..3 {
        let x = write_pass(&mut graph, "scene", "scene-color");
        graph
            .add_pass(
                "post",
                |builder| {
                    builder.read(x);
                    let out = builder.create("post-color", color());
                    builder.write(out);
                },
                |_, _| {},
            )
            .unwrap();
        graph.compile().unwrap();
        wait_point = graph.execute(&wait_point).unwrap();
    }

    assert_eq!(graph.frame_index(), 3);
    assert_eq!(env.device.created_resource_count(), 2);
    assert_eq!(graph.transient_resource_count(), 2);
}

#[test]
fn test_idle_transients_retired() {
    let env = TestEnv::new();
    let config = PassGraphConfig {
        transient_retire_frames: 1,
        frames_in_flight: 1,
        ..Default::default()
    };
    let mut graph = env.graph(config);

    write_pass(&mut graph, "a", "a");
    graph.compile().unwrap();
    graph.execute(&WaitPoint::invalid()).unwrap();
    assert_eq!(env.device.live_resource_count(), 1);

    // 空帧：资源闲置超过阈值后进入延迟释放，再经过 frames_in_flight 帧销毁
    for _ in 0..2 {
        graph.compile().unwrap();
        graph.execute(&WaitPoint::invalid()).unwrap();
    }
    assert_eq!(graph.transient_resource_count(), 0);
    assert_eq!(env.device.live_resource_count(), 0);
}

struct BlurPass {
    input: PassResource,
    output: PassResource,
}

impl RgPass for BlurPass {
    fn setup(&mut self, builder: &mut PassGraphBuilder) {
        builder.read(self.input);
        self.output = builder.create("blurred", storage());
        builder.write(self.output);
    }

    fn execute(&self, ctx: &mut PassGraphContext<'_>) {
        let _src = ctx.srv(self.input);
        let _dst = ctx.uav(self.output);
        ctx.cmd().dispatch(8, 8, 1);
    }
}

#[test]
fn test_pass_node() {
    let env = TestEnv::new();
    let mut graph = env.graph(PassGraphConfig::default());

    let input = write_pass(&mut graph, "scene", "scene-color");
    graph
        .add_pass_node(
            "blur",
            BlurPass {
                input,
                output: PassResource::null(),
            },
        )
        .unwrap();
    assert_eq!(graph.resource_count(), 2);

    graph.compile().unwrap().print_execution_plan();
    graph.execute(&WaitPoint::invalid()).unwrap();

    let commands = env.commands("graphics");
    let blur = event_position(&commands, "blur");
    assert!(matches!(commands[blur + 1..].first(), Some(GfxCommand::Dispatch { x: 8, y: 8, z: 1 })));
}

#[test]
#[should_panic(expected = "undeclared")]
fn test_undeclared_lookup_panics() {
    let env = TestEnv::new();
    let mut graph = env.graph(PassGraphConfig::default());

    let x = write_pass(&mut graph, "a", "x");
    graph
        .add_pass(
            "b",
            |builder| {
                let y = builder.create("y", color());
                builder.write(y);
            },
            move |_, ctx| {
                let _ = ctx.srv(x);
            },
        )
        .unwrap();

    graph.compile().unwrap();
    let _ = graph.execute(&WaitPoint::invalid());
}

#[test]
fn test_release_destroys_transients_only() {
    let env = TestEnv::new();
    let mut graph = env.graph(PassGraphConfig::default());

    let (back_buffer, views) = env.back_buffer();
    let y = graph.import("back-buffer", back_buffer.clone(), GfxResourceStates::PRESENT, views.clone()).unwrap();
    // 重复导入同一个资源返回同一个句柄
    assert_eq!(graph.import("again", back_buffer, GfxResourceStates::PRESENT, views).unwrap(), y);

    let x = write_pass(&mut graph, "scene", "scene-color");
    graph
        .add_pass(
            "present",
            |builder| {
                builder.read(x);
                builder.write(y);
            },
            |_, _| {},
        )
        .unwrap();
    graph.compile().unwrap();
    graph.execute(&WaitPoint::invalid()).unwrap();
    assert_eq!(env.device.live_resource_count(), 2);

    assert!(graph.release());
    assert_eq!(env.device.live_resource_count(), 1);
}

#[test]
fn test_drop_does_not_block_on_gpu() {
    let env = TestEnv::manual();
    let mut graph = env.graph(PassGraphConfig::default());

    write_pass(&mut graph, "scene", "scene-color");
    graph.compile().unwrap();
    let wait_point = graph.execute(&WaitPoint::invalid()).unwrap();
    assert!(!wait_point.is_completed());

    let start = Instant::now();
    drop(graph);
    assert!(start.elapsed() < Duration::from_secs(1));

    // GPU 可能还在用，物理资源不销毁
    assert!(env.device.headless_queue("graphics").unwrap().pending_count() > 0);
    assert_eq!(env.device.live_resource_count(), 1);

    env.device.flush_gpu();
    assert!(wait_point.is_completed());
    assert_eq!(env.device.headless_queue("graphics").unwrap().pending_count(), 0);
}
