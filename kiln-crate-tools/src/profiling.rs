//! CPU profiling 宏
//!
//! 开启 `profiling` feature 后 `profile_scope!` 展开为 tracy span，
//! span 在作用域结束时自动关闭；未开启时展开为空，没有任何开销。
//!
//! ```ignore
//! fn compile(&mut self) {
//!     kiln_crate_tools::profile_scope!("PassGraph::compile");
//!     // ...
//! }
//! ```

#[cfg(feature = "profiling")]
pub use tracy_client;

/// 为当前作用域创建 profiling span
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {
        let _profile_span = $crate::profiling::tracy_client::span!($name);
    };
}

/// 为当前作用域创建 profiling span（未开启 profiling 时为空）
#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {};
}

/// 标记一帧结束
#[cfg(feature = "profiling")]
#[macro_export]
macro_rules! frame_mark {
    () => {
        if let Some(client) = $crate::profiling::tracy_client::Client::running() {
            client.frame_mark();
        }
    };
}

/// 标记一帧结束（未开启 profiling 时为空）
#[cfg(not(feature = "profiling"))]
#[macro_export]
macro_rules! frame_mark {
    () => {};
}
