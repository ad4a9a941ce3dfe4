mod task;
mod workerservice;

pub mod jobrunner;
pub mod queue;

pub use queue::JobEntry;
pub use queue::JobQueue;
pub use task::Task;
pub use task::TaskError;
pub use task::TaskHandle;
pub use task::TaskRegistry;
pub use workerservice::WorkerService;
