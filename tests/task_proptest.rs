//! Property-based tests for the task state machine
//!
//! Random request mixes are run twice: sequentially against a small model
//! of the lifecycle, and all at once on a multi-threaded runtime where only
//! the invariants can be checked.

#[cfg(feature = "ssr")]
mod common;

#[cfg(feature = "ssr")]
mod tests {
    use super::common::*;
    use futures_util::future::join_all;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use uuid::Uuid;

    use clawswarm::backend::store::TaskStore;
    use clawswarm::backend::tasks::{NewTask, TaskError, TaskService};
    use clawswarm::shared::{SpaceTask, TaskStatus};

    const BOTS: usize = 3;
    const TASKS: usize = 4;

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Accept { bot: usize, task: usize },
        Assign { bot: usize, task: usize },
        Complete { bot: usize, task: usize },
        Block { bot: usize, task: usize },
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        (0..4u8, 0..BOTS, 0..TASKS).prop_map(|(kind, bot, task)| match kind {
            0 => Op::Accept { bot, task },
            1 => Op::Assign { bot, task },
            2 => Op::Complete { bot, task },
            _ => Op::Block { bot, task },
        })
    }

    struct World {
        space: TestSpace,
        service: Arc<TaskService>,
        tasks: Vec<Uuid>,
    }

    async fn world() -> World {
        let space = TestSpace::seed(BOTS).await;
        let service = space.task_service();
        let mut tasks = Vec::new();
        for i in 0..TASKS {
            let task = service
                .create_task(
                    space.id,
                    &space.manager_identity(),
                    NewTask {
                        name: format!("task-{i}"),
                        description: String::new(),
                        bot_id: None,
                    },
                )
                .await
                .unwrap();
            tasks.push(task.id);
        }
        World { space, service, tasks }
    }

    async fn apply(world: &World, op: Op) -> Result<SpaceTask, TaskError> {
        let space = &world.space;
        match op {
            Op::Accept { bot, task } => {
                world
                    .service
                    .accept_task(space.id, &space.worker_identity(bot), world.tasks[task])
                    .await
            }
            Op::Assign { bot, task } => {
                world
                    .service
                    .assign_task(
                        space.id,
                        &space.manager_identity(),
                        world.tasks[task],
                        space.workers[bot].id,
                    )
                    .await
            }
            Op::Complete { bot, task } => {
                world
                    .service
                    .complete_task(space.id, &space.worker_identity(bot), world.tasks[task])
                    .await
            }
            Op::Block { bot, task } => {
                world
                    .service
                    .block_task(space.id, &space.worker_identity(bot), world.tasks[task])
                    .await
            }
        }
    }

    /// Reference lifecycle: (status, assignee) per task
    struct Model {
        tasks: Vec<(TaskStatus, Option<usize>)>,
    }

    impl Model {
        fn new() -> Self {
            Self {
                tasks: vec![(TaskStatus::Available, None); TASKS],
            }
        }

        fn busy(&self, bot: usize) -> bool {
            self.tasks
                .iter()
                .any(|&(status, owner)| status == TaskStatus::InProgress && owner == Some(bot))
        }

        /// Whether the op should succeed, updating the model if so
        fn step(&mut self, op: Op) -> bool {
            match op {
                Op::Accept { bot, task } | Op::Assign { bot, task } => {
                    if self.tasks[task].0 != TaskStatus::Available || self.busy(bot) {
                        return false;
                    }
                    self.tasks[task] = (TaskStatus::InProgress, Some(bot));
                    true
                }
                Op::Complete { bot, task } | Op::Block { bot, task } => {
                    let (status, owner) = self.tasks[task];
                    if status != TaskStatus::InProgress || owner != Some(bot) {
                        return false;
                    }
                    let outcome = if matches!(op, Op::Complete { .. }) {
                        TaskStatus::Completed
                    } else {
                        TaskStatus::Blocked
                    };
                    self.tasks[task] = (outcome, Some(bot));
                    true
                }
            }
        }
    }

    async fn stored_tasks(world: &World) -> Vec<SpaceTask> {
        TaskStore::list_by_space(world.space.store.as_ref(), world.space.id, None)
            .await
            .unwrap()
    }

    fn assert_invariants(tasks: &[SpaceTask]) -> Result<(), TestCaseError> {
        let mut active: HashMap<Uuid, usize> = HashMap::new();
        for task in tasks {
            match task.status {
                TaskStatus::Available => prop_assert!(task.bot_id.is_none()),
                TaskStatus::InProgress => {
                    let bot = task.bot_id.ok_or_else(|| TestCaseError::fail("in_progress without bot"))?;
                    *active.entry(bot).or_default() += 1;
                }
                TaskStatus::Completed => prop_assert!(task.completed_at.is_some()),
                TaskStatus::Blocked => prop_assert!(task.completed_at.is_none()),
            }
        }
        prop_assert!(active.values().all(|&n| n == 1), "bot with two active tasks: {:?}", active);
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn sequential_requests_follow_the_lifecycle(ops in prop::collection::vec(op_strategy(), 1..40)) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async {
                let world = world().await;
                let mut model = Model::new();

                for op in &ops {
                    let expected = model.step(*op);
                    let actual = apply(&world, *op).await;
                    prop_assert_eq!(actual.is_ok(), expected, "op {:?} gave {:?}", op, actual);
                }

                let tasks = stored_tasks(&world).await;
                assert_invariants(&tasks)?;
                for (i, id) in world.tasks.iter().enumerate() {
                    let stored = tasks.iter().find(|t| t.id == *id).unwrap();
                    let (status, owner) = model.tasks[i];
                    prop_assert_eq!(stored.status, status);
                    prop_assert_eq!(stored.bot_id, owner.map(|b| world.space.workers[b].id));
                }
                Ok::<(), TestCaseError>(())
            })?;
        }

        #[test]
        fn concurrent_requests_keep_one_active_task_per_bot(ops in prop::collection::vec(op_strategy(), 1..40)) {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(4)
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let world = Arc::new(world().await);
                let handles = ops.iter().map(|&op| {
                    let world = Arc::clone(&world);
                    tokio::spawn(async move { apply(&world, op).await })
                });
                for result in join_all(handles).await {
                    match result.unwrap() {
                        Ok(_) => {}
                        Err(TaskError::Conflict { .. }) => {}
                        Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
                    }
                }

                assert_invariants(&stored_tasks(&world).await)
            })?;
        }
    }
}
