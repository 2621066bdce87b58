use kiln_gfx::GfxError;

/// Pass Graph 的错误类型
///
/// 配置错误在创建时返回；使用错误在注册 Pass 或编译时返回，该帧不应继续执行。
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("invalid pass graph desc: {0}")]
    InvalidDesc(String),

    #[error("pass capacity exceeded (max {max})")]
    PassCapacityExceeded { max: u32 },

    #[error("pass \"{pass}\": resource capacity exceeded (max {max})")]
    ResourceCapacityExceeded { pass: String, max: u32 },

    #[error("pass \"{pass}\": invalid resource {resource}")]
    InvalidResource { pass: String, resource: String },

    /// 通过 `create` 创建的资源在写入之前被读取
    #[error("pass \"{pass}\" reads \"{resource}\" before any pass writes it")]
    ReadBeforeWrite { pass: String, resource: String },

    #[error("pass \"{pass}\" writes \"{resource}\" as {access}, which its usage {usage} does not allow")]
    WriteToReadOnlyUsage {
        pass: String,
        resource: String,
        access: String,
        usage: String,
    },

    #[error("resource \"{resource}\" can not be cleared: {reason}")]
    InvalidClear { resource: String, reason: String },

    #[error("cyclic dependency between passes: {passes:?}")]
    CyclicDependency { passes: Vec<String> },

    #[error("pass graph is not compiled")]
    NotCompiled,

    #[error("pass graph is already compiled, execute it before registering or compiling again")]
    AlreadyCompiled,

    #[error(transparent)]
    Gfx(#[from] GfxError),
}

pub type GraphResult<T> = Result<T, GraphError>;
