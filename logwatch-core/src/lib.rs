pub mod cli;
pub mod conf;
pub mod coordinator;
pub mod event;
pub mod fanout;
pub mod follower;
pub mod logging;
pub mod ring;
pub mod stats;
