pub mod answer;
pub mod assessment;
pub mod attempt;
pub mod choice;
pub mod enrollment;
pub mod metrics;
pub mod question;
