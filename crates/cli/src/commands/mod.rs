pub mod extract;
pub mod onboard;
pub mod run;
