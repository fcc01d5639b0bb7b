pub mod persist;
pub mod platforms;
pub mod run;
