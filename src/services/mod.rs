pub mod cascade;
pub mod tasks;
pub mod users;

pub use cascade::CascadeController;
pub use tasks::TaskService;
pub use users::UserDirectory;
