//! Pass Graph 资源句柄
//!
//! 句柄只在一次 compile/execute 周期内有效，与物理资源 `GfxResourceId` 分离。

use slotmap::Key;

slotmap::new_key_type! {
    /// Graph 内部的逻辑资源句柄
    ///
    /// 创建失败时返回 `PassResource::null()`。
    pub struct PassResource;
}

impl PassResource {
    /// 无效句柄
    #[inline]
    pub fn null() -> Self {
        <Self as Key>::null()
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        Key::is_null(self)
    }

    /// 调试输出用的简短名字
    pub(crate) fn short_name(&self) -> String {
        if self.is_null() { "PassResource(null)".to_string() } else { format!("{:?}", self.data()) }
    }
}
