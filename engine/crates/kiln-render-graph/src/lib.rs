//! Kiln Pass Graph - 声明式的帧调度系统
//!
//! 每帧注册一组 Pass，每个 Pass 声明自己读写哪些资源；graph 据此推导执行顺序、
//! 临时资源的生命周期与物理分配、resource barrier、以及 graphics / compute
//! 两个队列之间的同步。
//!
//! # 核心概念
//!
//! - **PassResource**: 逻辑资源句柄，只在一帧内有效
//! - **PassResourceDesc**: 临时资源描述，包含初始化策略（不初始化 / Clear）
//! - **RgPass**: Pass trait，`setup` 声明依赖，`execute` 录制命令
//! - **PassGraphBuilder**: setup 阶段的构建器
//! - **PassGraphContext**: execute 阶段的上下文，查询物理资源与 view
//! - **CompiledPassGraph**: 编译结果，包含执行顺序、barrier 与同步点
//!
//! # 使用示例
//!
//! ```ignore
//! use kiln_render_graph::*;
//!
//! let mut graph = create_pass_graph(device, view_factory, PassGraphDesc::new(config, graphics_queue))?;
//!
//! let back_buffer = graph.import("back-buffer", back_buffer, GfxResourceStates::PRESENT, back_buffer_views)?;
//! graph.set_final_state(back_buffer, GfxResourceStates::PRESENT)?;
//!
//! let color = graph.add_pass(
//!     "scene",
//!     |builder| {
//!         let color = builder.create("scene-color", PassResourceDesc::texture_2d(1920, 1080, format, usage));
//!         builder.write(color)
//!     },
//!     |&color, ctx| {
//!         let rtv = ctx.rtv(color);
//!         ctx.cmd().set_render_targets(&[rtv], None);
//!         ctx.cmd().draw_instanced(3, 1, 0, 0);
//!     },
//! )?;
//!
//! graph.add_pass_node("tonemap", TonemapPass { input: color, output: back_buffer })?;
//!
//! graph.compile()?;
//! let wait_point = graph.execute(&WaitPoint::invalid())?;
//! ```
//!
//! # 模块结构
//!
//! - `handle`: 逻辑资源句柄
//! - `resource`: 资源描述、访问方式与生命周期
//! - `resource_registry`: 一帧内的资源注册表
//! - `pass`: Pass trait、builder 与 context
//! - `graph`: 依赖图和拓扑排序
//! - `barrier`: barrier 计算
//! - `compiler`: 编译
//! - `executor`: 录制与提交
//! - `transient_pool`: 跨帧复用的临时资源池

mod barrier;
mod compiler;
mod config;
mod error;
mod executor;
mod graph;
mod handle;
mod pass;
mod pass_graph;
mod resource;
mod resource_registry;
mod transient_pool;

// Re-exports
pub use barrier::{BarrierCalculator, PassBarriers, RgBarrier, RgClear};
pub use compiler::{CompiledPassGraph, RgSyncPoint};
pub use config::{PassGraphConfig, PassGraphDesc};
pub use error::{GraphError, GraphResult};
pub use graph::{DependencyAnalyzer, DependencyEdge, DependencyGraph, DependencyKind};
pub use handle::PassResource;
pub use pass::{PassGraphBuilder, PassGraphContext, RgPass, RgResourceUse};
pub use pass_graph::{PassGraph, create_pass_graph};
pub use resource::{PassResourceDesc, RgAccess, RgInitPolicy, RgLifetime};
