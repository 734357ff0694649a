pub mod incident;
pub mod run;
