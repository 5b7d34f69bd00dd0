//! Infrastructure wiring for the HTTP layer.

use std::sync::Arc;

use jobrelay_queue::{
    builtin_registry, InMemoryJobStore, InMemoryTransport, StatusService, SubmissionService,
    WorkerConfig, WorkerExecutor, WorkerHandle,
};

use crate::config::ApiConfig;

type Store = Arc<InMemoryJobStore>;
type Transport = Arc<InMemoryTransport>;

/// Services shared by all request handlers.
pub struct AppServices {
    pub submission: SubmissionService<Store, Transport>,
    pub status: StatusService<Store>,
}

/// Construct the store, transport, services, and worker pool.
///
/// Everything is passed in explicitly; there is no process-wide queue
/// client.
pub fn build_services(config: &ApiConfig) -> (AppServices, WorkerHandle) {
    let store = InMemoryJobStore::arc();
    let transport = InMemoryTransport::arc();
    let registry = Arc::new(builtin_registry(config.sample_task_delay));

    let executor = WorkerExecutor::new(store.clone(), transport.clone(), registry);
    let workers = executor.spawn(WorkerConfig {
        workers: config.workers,
        ..WorkerConfig::default()
    });

    let services = AppServices {
        submission: SubmissionService::new(store.clone(), transport),
        status: StatusService::new(store),
    };

    (services, workers)
}
