pub mod auth_api;
pub mod client;
pub mod config;
pub mod cookie;
pub mod error;
pub mod guard;
pub mod logging;
pub mod model;
pub mod notify;
pub mod session;
pub mod task_api;
pub mod task_form;
pub mod task_list;
