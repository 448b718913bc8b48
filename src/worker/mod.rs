mod repair;

pub use repair::repair_process;
