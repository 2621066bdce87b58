use crate::commands::queue::GfxQueueType;
use crate::descriptors::descriptor_heap::GfxDescriptorHeapType;
use crate::resources::view::GfxViewKind;

/// GFX 层的错误类型
///
/// 设备级的创建失败只在出错的调用点返回，不做重试。
#[derive(Debug, thiserror::Error)]
pub enum GfxError {
    /// 描述符堆的空闲列表已耗尽（容量在创建堆时固定，不会增长）
    #[error("descriptor heap {heap_type:?} exhausted (capacity {capacity})")]
    DescriptorHeapExhausted {
        heap_type: GfxDescriptorHeapType,
        capacity: u32,
    },

    #[error("invalid descriptor heap desc: {0}")]
    InvalidDescriptorHeapDesc(String),

    #[error("failed to create resource \"{name}\": {reason}")]
    ResourceCreationFailed { name: String, reason: String },

    /// 资源的 usage 不允许创建该类型的 view
    #[error("resource \"{name}\" does not support {kind:?} views")]
    UnsupportedViewKind { name: String, kind: GfxViewKind },

    #[error("expected a {expected:?} queue, got {actual:?}")]
    QueueTypeMismatch {
        expected: GfxQueueType,
        actual: GfxQueueType,
    },

    #[error("device lost")]
    DeviceLost,
}

pub type GfxResult<T> = Result<T, GfxError>;
