//! 依赖图构建和拓扑排序
//!
//! 分析 Pass 之间的资源依赖关系，构建 DAG 并进行拓扑排序。

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;

/// 依赖类型
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    /// 写后读：reader 依赖 writer
    ReadAfterWrite,
    /// 写后写：后一个 writer 依赖前一个 writer
    WriteAfterWrite,
    /// 读后写：writer 依赖之前的 reader
    WriteAfterRead,
}

/// 依赖边：从 producer 到 consumer
#[derive(Clone, Debug)]
pub struct DependencyEdge<K> {
    /// 生产者 Pass 索引（先执行）
    pub producer: usize,
    /// 消费者 Pass 索引（后执行）
    pub consumer: usize,
    /// 依赖的资源及依赖类型
    pub resources: Vec<(K, DependencyKind)>,
}

/// 依赖图
///
/// 表示 Pass 之间的依赖关系，用于拓扑排序和执行顺序计算。
pub struct DependencyGraph<K> {
    pass_count: usize,
    /// 邻接表（出边）：pass_index -> [consumer]
    adjacency: Vec<Vec<usize>>,
    in_degrees: Vec<usize>,
    edges: Vec<DependencyEdge<K>>,
    /// (producer, consumer) -> edges 中的位置
    edge_lookup: HashMap<(usize, usize), usize>,
}

impl<K: Copy> DependencyGraph<K> {
    pub fn new(pass_count: usize) -> Self {
        Self {
            pass_count,
            adjacency: vec![Vec::new(); pass_count],
            in_degrees: vec![0; pass_count],
            edges: Vec::new(),
            edge_lookup: HashMap::new(),
        }
    }

    /// 添加依赖边，同一对 Pass 之间的多个资源合并到一条边上
    pub fn add_edge(&mut self, producer: usize, consumer: usize, resource: K, kind: DependencyKind) {
        if let Some(&index) = self.edge_lookup.get(&(producer, consumer)) {
            self.edges[index].resources.push((resource, kind));
            return;
        }

        self.adjacency[producer].push(consumer);
        self.in_degrees[consumer] += 1;
        self.edge_lookup.insert((producer, consumer), self.edges.len());
        self.edges.push(DependencyEdge {
            producer,
            consumer,
            resources: vec![(resource, kind)],
        });
    }

    /// 执行拓扑排序
    ///
    /// 入度为 0 的节点中总是先取注册顺序最小的，结果是确定的。
    ///
    /// # 返回
    /// - `Ok(order)`: 拓扑排序后的 Pass 索引列表
    /// - `Err(cycle)`: 检测到循环依赖，返回参与循环的 Pass 索引
    pub fn topological_sort(&self) -> Result<Vec<usize>, Vec<usize>> {
        let mut in_degrees = self.in_degrees.clone();
        let mut ready = BinaryHeap::new();
        let mut result = Vec::with_capacity(self.pass_count);

        for (i, &degree) in in_degrees.iter().enumerate() {
            if degree == 0 {
                ready.push(Reverse(i));
            }
        }

        while let Some(Reverse(node)) = ready.pop() {
            result.push(node);

            for &neighbor in &self.adjacency[node] {
                in_degrees[neighbor] -= 1;
                if in_degrees[neighbor] == 0 {
                    ready.push(Reverse(neighbor));
                }
            }
        }

        if result.len() != self.pass_count {
            let remaining: Vec<usize> = (0..self.pass_count).filter(|&i| in_degrees[i] > 0).collect();
            Err(remaining)
        } else {
            Ok(result)
        }
    }

    /// 获取 Pass 的直接依赖（前驱）
    pub fn get_predecessors(&self, pass_index: usize) -> Vec<usize> {
        self.adjacency
            .iter()
            .enumerate()
            .filter(|(_, adj)| adj.contains(&pass_index))
            .map(|(i, _)| i)
            .collect()
    }

    /// 获取 Pass 的直接后继
    #[inline]
    pub fn get_successors(&self, pass_index: usize) -> &[usize] {
        &self.adjacency[pass_index]
    }

    #[inline]
    pub fn edges(&self) -> &[DependencyEdge<K>] {
        &self.edges
    }

    #[inline]
    pub fn pass_count(&self) -> usize {
        self.pass_count
    }
}

/// 依赖分析器
///
/// 从每个 Pass 的读写列表构建依赖图。
pub struct DependencyAnalyzer;

impl DependencyAnalyzer {
    /// 分析资源依赖，构建依赖图
    ///
    /// 按注册顺序处理每个 Pass，先处理读再处理写：
    /// - 写后读（RAW）：reader 依赖最后一个 writer
    /// - 写后写（WAW）：writer 依赖上一个 writer
    /// - 读后写（WAR）：writer 依赖上一次写入之后的所有 reader
    pub fn analyze<K: Copy + Eq + Hash>(pass_count: usize, reads: &[Vec<K>], writes: &[Vec<K>]) -> DependencyGraph<K> {
        let mut graph = DependencyGraph::new(pass_count);

        let mut last_writer: HashMap<K, usize> = HashMap::new();
        let mut readers_since_write: HashMap<K, Vec<usize>> = HashMap::new();

        for pass_idx in 0..pass_count {
            for &res in &reads[pass_idx] {
                if let Some(&writer) = last_writer.get(&res) {
                    if writer != pass_idx {
                        graph.add_edge(writer, pass_idx, res, DependencyKind::ReadAfterWrite);
                    }
                }
                let readers = readers_since_write.entry(res).or_default();
                if !readers.contains(&pass_idx) {
                    readers.push(pass_idx);
                }
            }

            for &res in &writes[pass_idx] {
                if let Some(&prev_writer) = last_writer.get(&res) {
                    if prev_writer != pass_idx {
                        graph.add_edge(prev_writer, pass_idx, res, DependencyKind::WriteAfterWrite);
                    }
                }
                if let Some(readers) = readers_since_write.get(&res) {
                    for &reader in readers {
                        if reader != pass_idx {
                            graph.add_edge(reader, pass_idx, res, DependencyKind::WriteAfterRead);
                        }
                    }
                }

                last_writer.insert(res, pass_idx);
                readers_since_write.insert(res, Vec::new());
            }
        }

        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_dependency() {
        // Pass 0 写入 0，Pass 1 读取 0
        let reads = vec![vec![], vec![0u32]];
        let writes = vec![vec![0u32], vec![]];

        let graph = DependencyAnalyzer::analyze(2, &reads, &writes);

        assert_eq!(graph.topological_sort().unwrap(), vec![0, 1]);
        assert_eq!(graph.edges()[0].resources, vec![(0, DependencyKind::ReadAfterWrite)]);
    }

    #[test]
    fn test_chain_dependency() {
        // Pass 0 -> Pass 1 -> Pass 2
        let reads = vec![vec![], vec![0u32], vec![1]];
        let writes = vec![vec![0u32], vec![1], vec![]];

        let graph = DependencyAnalyzer::analyze(3, &reads, &writes);

        assert_eq!(graph.topological_sort().unwrap(), vec![0, 1, 2]);
        assert_eq!(graph.get_predecessors(2), vec![1]);
        assert_eq!(graph.get_successors(0), &[1]);
    }

    #[test]
    fn test_parallel_passes_keep_registration_order() {
        // Pass 0 写入 0，Pass 1 写入 1（无依赖），Pass 2 读取两者
        let reads = vec![vec![], vec![], vec![0u32, 1]];
        let writes = vec![vec![0u32], vec![1], vec![]];

        let graph = DependencyAnalyzer::analyze(3, &reads, &writes);

        assert_eq!(graph.topological_sort().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_write_after_write_follows_registration() {
        let reads = vec![vec![], vec![], vec![]];
        let writes = vec![vec![7u32], vec![7], vec![7]];

        let graph = DependencyAnalyzer::analyze(3, &reads, &writes);

        assert_eq!(graph.topological_sort().unwrap(), vec![0, 1, 2]);
        assert!(
            graph
                .edges()
                .iter()
                .all(|e| e.resources.iter().all(|(_, kind)| *kind == DependencyKind::WriteAfterWrite))
        );
    }

    #[test]
    fn test_write_after_read() {
        // Pass 0 写，Pass 1 读，Pass 2 再写：Pass 2 必须在 Pass 1 之后
        let reads = vec![vec![], vec![0u32], vec![]];
        let writes = vec![vec![0u32], vec![], vec![0]];

        let graph = DependencyAnalyzer::analyze(3, &reads, &writes);

        let war = graph.edges().iter().find(|e| e.producer == 1 && e.consumer == 2).unwrap();
        assert_eq!(war.resources, vec![(0, DependencyKind::WriteAfterRead)]);
        assert_eq!(graph.topological_sort().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_read_write_same_pass_has_no_self_edge() {
        let reads = vec![vec![0u32], vec![0]];
        let writes = vec![vec![0u32], vec![0]];

        let graph = DependencyAnalyzer::analyze(2, &reads, &writes);

        assert!(graph.edges().iter().all(|e| e.producer != e.consumer));
        // RAW 和 WAW 合并到同一条边
        assert_eq!(graph.edges().len(), 1);
        assert_eq!(graph.edges()[0].resources.len(), 2);
    }

    #[test]
    fn test_cycle_detection() {
        let mut graph: DependencyGraph<u32> = DependencyGraph::new(3);
        graph.add_edge(0, 1, 0, DependencyKind::ReadAfterWrite);
        graph.add_edge(1, 2, 0, DependencyKind::ReadAfterWrite);
        graph.add_edge(2, 1, 0, DependencyKind::ReadAfterWrite);

        assert_eq!(graph.topological_sort(), Err(vec![1, 2]));
    }
}
