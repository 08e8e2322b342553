//! Agent dependency DAG, resolved into phases that run in parallel

use crate::agent::AgentKind;
use crate::error::{OrchestratorError, Result};
use crate::job::PipelineStage;
use crate::pipeline::StageHandler;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Agent node in DAG
#[derive(Debug, Clone)]
pub struct StageNode {
    pub id: AgentKind,
    pub name: &'static str,
    pub dependencies: Vec<AgentKind>,
}

impl StageNode {
    pub fn new(id: AgentKind, name: &'static str, dependencies: Vec<AgentKind>) -> Self {
        Self {
            id,
            name,
            dependencies,
        }
    }
}

/// Agent dependency graph, resolved into phases of agents that can run together
#[derive(Debug, Clone)]
pub struct PipelineDAG {
    stages: HashMap<AgentKind, StageNode>,
    execution_order: Vec<Vec<AgentKind>>, // Vec of parallel groups
}

impl PipelineDAG {
    /// Validate node dependencies and compute the phase order
    pub fn new(stages: Vec<StageNode>) -> Result<Self> {
        let stages: HashMap<AgentKind, StageNode> =
            stages.into_iter().map(|stage| (stage.id, stage)).collect();

        if let Some((stage, dep)) = stages.values().find_map(|stage| {
            stage
                .dependencies
                .iter()
                .find(|dep| !stages.contains_key(*dep))
                .map(|dep| (stage.id, *dep))
        }) {
            return Err(OrchestratorError::MissingDependency(format!(
                "Agent {} depends on unregistered agent {}",
                stage, dep
            )));
        }

        let execution_order = Self::topological_sort(&stages)?;
        Ok(Self {
            stages,
            execution_order,
        })
    }

    /// DAG of the agents `handlers` run, wired by their declared dependencies
    pub fn from_handlers(handlers: &[Arc<dyn StageHandler>]) -> Result<Self> {
        let mut nodes: Vec<StageNode> = handlers
            .iter()
            .map(|h| StageNode::new(h.agent(), h.agent().as_str(), h.dependencies()))
            .collect();
        nodes.sort_by_key(|node| node.id);
        Self::new(nodes)
    }

    /// Kahn's algorithm, one phase per frontier.
    /// Phases are sorted so the plan is deterministic.
    fn topological_sort(stages: &HashMap<AgentKind, StageNode>) -> Result<Vec<Vec<AgentKind>>> {
        let mut pending: HashMap<AgentKind, usize> = HashMap::new();
        let mut dependents: HashMap<AgentKind, Vec<AgentKind>> = HashMap::new();
        for stage in stages.values() {
            let unique: HashSet<AgentKind> = stage.dependencies.iter().copied().collect();
            pending.insert(stage.id, unique.len());
            for dep in unique {
                dependents.entry(dep).or_default().push(stage.id);
            }
        }

        let mut frontier: Vec<AgentKind> = pending
            .iter()
            .filter(|(_, &count)| count == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut phases = Vec::new();
        let mut placed = 0;

        while !frontier.is_empty() {
            frontier.sort();
            placed += frontier.len();

            let mut next = Vec::new();
            for agent in &frontier {
                for dependent in dependents.get(agent).into_iter().flatten() {
                    if let Some(count) = pending.get_mut(dependent) {
                        *count -= 1;
                        if *count == 0 {
                            next.push(*dependent);
                        }
                    }
                }
            }
            phases.push(std::mem::replace(&mut frontier, next));
        }

        // Anything never placed sits on a cycle
        if placed < stages.len() {
            return Err(OrchestratorError::DagCycleDetected);
        }
        Ok(phases)
    }

    pub fn execution_order(&self) -> &[Vec<AgentKind>] {
        &self.execution_order
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Pipeline stage a phase runs in. Every agent of a phase must map to the
    /// same stage.
    pub fn phase_stage(group: &[AgentKind]) -> Result<PipelineStage> {
        let mut stages = group.iter().map(|agent| {
            agent.stage().ok_or_else(|| {
                OrchestratorError::config(format!("Agent {} does not belong to a pipeline stage", agent))
            })
        });

        let first = match stages.next() {
            Some(stage) => stage?,
            None => return Err(OrchestratorError::config("Empty pipeline phase")),
        };
        for stage in stages {
            let stage = stage?;
            if stage != first {
                return Err(OrchestratorError::config(format!(
                    "Phase mixes stages {} and {}",
                    first, stage
                )));
            }
        }
        Ok(first)
    }

    /// One line per phase, e.g. `Phase 2: Behavior ∥ Semantic ∥ Risk (parallel)`
    pub fn execution_plan(&self) -> String {
        self.execution_order
            .iter()
            .enumerate()
            .map(|(i, group)| {
                let names: Vec<_> = group.iter().map(|id| self.stages[id].name).collect();

                if group.len() > 1 {
                    format!("Phase {}: {} (parallel)", i + 1, names.join(" ∥ "))
                } else {
                    format!("Phase {}: {}", i + 1, names[0])
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::default_handlers;

    fn default_dag() -> PipelineDAG {
        PipelineDAG::from_handlers(&default_handlers()).unwrap()
    }

    #[test]
    fn test_two_agent_chain() {
        let stages = vec![
            StageNode::new(AgentKind::Structure, "Structure", vec![]),
            StageNode::new(AgentKind::Execution, "Execution", vec![AgentKind::Structure]),
        ];

        let dag = PipelineDAG::new(stages).unwrap();
        let order = dag.execution_order();

        assert_eq!(order.len(), 2);
        assert_eq!(order[0], vec![AgentKind::Structure]);
        assert_eq!(order[1], vec![AgentKind::Execution]);
    }

    #[test]
    fn test_default_handler_phases() {
        let dag = default_dag();
        let order = dag.execution_order();

        assert_eq!(dag.len(), 6);
        assert_eq!(order.len(), 4);
        assert_eq!(order[0], vec![AgentKind::Structure]);
        assert_eq!(
            order[1],
            vec![AgentKind::Behavior, AgentKind::Semantic, AgentKind::Risk]
        );
        assert_eq!(order[2], vec![AgentKind::Execution]);
        assert_eq!(order[3], vec![AgentKind::Synthesizer]);
    }

    #[test]
    fn test_phase_stages() {
        let dag = default_dag();
        let stages: Vec<PipelineStage> = dag
            .execution_order()
            .iter()
            .map(|group| PipelineDAG::phase_stage(group).unwrap())
            .collect();

        assert_eq!(
            stages,
            vec![
                PipelineStage::Structure,
                PipelineStage::ParallelReasoning,
                PipelineStage::ExecutionSimulation,
                PipelineStage::Synthesis,
            ]
        );
        assert!(PipelineDAG::phase_stage(&[AgentKind::Structure, AgentKind::Risk]).is_err());
        assert!(PipelineDAG::phase_stage(&[AgentKind::Impact]).is_err());
        assert!(PipelineDAG::phase_stage(&[]).is_err());
    }

    #[test]
    fn test_unregistered_dependency() {
        let stages = vec![StageNode::new(
            AgentKind::Execution,
            "Execution",
            vec![AgentKind::Structure], // Structure not registered
        )];

        let result = PipelineDAG::new(stages);
        assert!(matches!(result, Err(OrchestratorError::MissingDependency(_))));
    }

    #[test]
    fn test_cycle_rejected() {
        let stages = vec![
            StageNode::new(AgentKind::Behavior, "Behavior", vec![AgentKind::Risk]),
            StageNode::new(AgentKind::Risk, "Risk", vec![AgentKind::Behavior]),
        ];

        let result = PipelineDAG::new(stages);
        assert!(matches!(result, Err(OrchestratorError::DagCycleDetected)));
    }

    #[test]
    fn test_plan_lines() {
        let dag = default_dag();
        let plan = dag.execution_plan();

        assert!(plan.contains("Phase 1: Structure"));
        assert!(plan.contains("Phase 2: Behavior ∥ Semantic ∥ Risk (parallel)"));
        assert!(plan.contains("Phase 4: Synthesizer"));
    }
}
