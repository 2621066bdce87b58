use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::commands::command_list::{GfxCommand, GfxCommandList};
use crate::commands::fence::GfxFence;
use crate::commands::queue::{GfxQueueBackend, GfxQueueType};
use crate::error::{GfxError, GfxResult};
use crate::headless::fence::HeadlessFence;

/// 已经被模拟 GPU 处理过的提交
#[derive(Clone, Debug)]
pub enum HeadlessSubmission {
    CommandLists(Vec<GfxCommandList>),
    Signal { fence_id: u64, value: u64 },
    Wait { fence_id: u64, value: u64 },
}

enum HeadlessQueueOp {
    Execute(Vec<GfxCommandList>),
    Signal { fence_id: u64, value: u64 },
    Wait { fence: Arc<dyn GfxFence>, value: u64 },
}

/// 模拟 GPU：持有所有队列和 fence
#[derive(Default)]
pub(crate) struct HeadlessGpu {
    fences: Mutex<HashMap<u64, Arc<HeadlessFence>>>,
    queues: Mutex<Vec<Arc<HeadlessQueue>>>,
    next_fence_id: AtomicU64,
    auto_flush: bool,
}

impl HeadlessGpu {
    pub(crate) fn new(auto_flush: bool) -> Arc<Self> {
        Arc::new(Self {
            auto_flush,
            next_fence_id: AtomicU64::new(1),
            ..Default::default()
        })
    }

    pub(crate) fn register_queue(&self, queue: Arc<HeadlessQueue>) {
        self.queues.lock().push(queue);
    }

    pub(crate) fn queues(&self) -> Vec<Arc<HeadlessQueue>> {
        self.queues.lock().clone()
    }

    fn create_fence(&self) -> Arc<HeadlessFence> {
        let id = self.next_fence_id.fetch_add(1, Ordering::Relaxed);
        let fence = HeadlessFence::new(id);
        self.fences.lock().insert(id, fence.clone());
        fence
    }

    fn fence(&self, id: u64) -> Option<Arc<HeadlessFence>> {
        self.fences.lock().get(&id).cloned()
    }

    /// 轮流推进所有队列，直到没有队列可以继续前进
    pub(crate) fn flush(&self) {
        let queues = self.queues();
        loop {
            let mut progressed = false;
            for queue in &queues {
                progressed |= queue.process(self);
            }
            if !progressed {
                break;
            }
        }
    }
}

/// headless 队列
///
/// 提交的操作先进入 pending 列表，由 `HeadlessDevice::flush_gpu` 推进。
/// 遇到未满足的 wait 时，该队列后面的操作都会被阻塞。
pub struct HeadlessQueue {
    queue_type: GfxQueueType,
    name: String,
    gpu: Weak<HeadlessGpu>,
    pending: Mutex<VecDeque<HeadlessQueueOp>>,
    submissions: Mutex<Vec<HeadlessSubmission>>,
}

// new & init
impl HeadlessQueue {
    pub(crate) fn new(queue_type: GfxQueueType, name: impl Into<String>, gpu: &Arc<HeadlessGpu>) -> Arc<Self> {
        Arc::new(Self {
            queue_type,
            name: name.into(),
            gpu: Arc::downgrade(gpu),
            pending: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(Vec::new()),
        })
    }
}

// getters
impl HeadlessQueue {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 已经被 GPU 处理过的提交记录
    pub fn submissions(&self) -> Vec<HeadlessSubmission> {
        self.submissions.lock().clone()
    }

    /// 所有已执行命令列表中的命令，按提交顺序展开
    pub fn executed_commands(&self) -> Vec<GfxCommand> {
        self.submissions
            .lock()
            .iter()
            .filter_map(|submission| match submission {
                HeadlessSubmission::CommandLists(lists) => Some(lists),
                _ => None,
            })
            .flatten()
            .flat_map(|list| list.commands().iter().cloned())
            .collect()
    }

    pub fn signal_count(&self) -> usize {
        self.submissions.lock().iter().filter(|s| matches!(s, HeadlessSubmission::Signal { .. })).count()
    }

    pub fn wait_count(&self) -> usize {
        self.submissions.lock().iter().filter(|s| matches!(s, HeadlessSubmission::Wait { .. })).count()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

// tools
impl HeadlessQueue {
    fn enqueue(&self, op: HeadlessQueueOp) {
        self.pending.lock().push_back(op);

        if let Some(gpu) = self.gpu.upgrade() {
            if gpu.auto_flush {
                gpu.flush();
            }
        }
    }

    /// 处理 pending 操作，返回是否有进展
    fn process(&self, gpu: &HeadlessGpu) -> bool {
        let mut progressed = false;
        loop {
            let mut pending = self.pending.lock();
            let Some(op) = pending.front() else {
                break;
            };

            // 未满足的 wait 阻塞整个队列
            let blocked = matches!(op, HeadlessQueueOp::Wait { fence, value } if fence.completed_value() < *value);
            if blocked {
                break;
            }

            let Some(op) = pending.pop_front() else {
                break;
            };
            drop(pending);

            let submission = match op {
                HeadlessQueueOp::Execute(lists) => HeadlessSubmission::CommandLists(lists),
                HeadlessQueueOp::Signal { fence_id, value } => {
                    match gpu.fence(fence_id) {
                        Some(fence) => fence.set_value(value),
                        None => log::error!("queue \"{}\": signal on unknown fence#{}", self.name, fence_id),
                    }
                    HeadlessSubmission::Signal { fence_id, value }
                }
                HeadlessQueueOp::Wait { fence, value } => HeadlessSubmission::Wait {
                    fence_id: fence.id(),
                    value,
                },
            };
            self.submissions.lock().push(submission);
            progressed = true;
        }
        progressed
    }
}

impl GfxQueueBackend for HeadlessQueue {
    #[inline]
    fn queue_type(&self) -> GfxQueueType {
        self.queue_type
    }

    fn execute_command_lists(&self, lists: Vec<GfxCommandList>) {
        self.enqueue(HeadlessQueueOp::Execute(lists));
    }

    fn signal(&self, fence: &Arc<dyn GfxFence>, value: u64) {
        self.enqueue(HeadlessQueueOp::Signal {
            fence_id: fence.id(),
            value,
        });
    }

    fn wait(&self, fence: &Arc<dyn GfxFence>, value: u64) {
        self.enqueue(HeadlessQueueOp::Wait {
            fence: fence.clone(),
            value,
        });
    }

    fn create_fence(&self) -> GfxResult<Arc<dyn GfxFence>> {
        let gpu = self.gpu.upgrade().ok_or(GfxError::DeviceLost)?;
        let fence: Arc<dyn GfxFence> = gpu.create_fence();
        Ok(fence)
    }
}
